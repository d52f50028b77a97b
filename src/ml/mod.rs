/// Ticket classification: TF-IDF features feeding two logistic-regression
/// classifiers (department and urgency), plus persistence and the service
/// that serves predictions.
pub mod classifier;
pub mod encoder;
pub mod features;
pub mod models;
pub mod pipeline;
pub mod service;
pub mod split;
pub mod store;

pub use classifier::{Classifier, FitSummary, LogisticRegressionClassifier};
pub use encoder::LabelEncoder;
pub use features::{FeatureExtractor, TextPreprocessor};
pub use models::{
    ClassMetrics, ClassifierConfig, FeatureConfig, ModelMetrics, ModelType, Prediction,
    SparseVector, SplitConfig,
};
pub use pipeline::{PipelineConfig, TicketClassifier, TrainingReport};
pub use service::{train_and_save, ClassifierService, ModelInfo, ServiceState};
pub use split::{train_test_split, SplitStrategy, TrainTestSplit};
pub use store::{ArtifactManifest, ArtifactSet, ModelStore, ARTIFACT_SCHEMA_VERSION};
