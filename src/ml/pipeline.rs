use crate::data::{self, DataSource, RawTable};
use crate::error::{AppError, Result};
use crate::ml::classifier::{argmax, Classifier, FitSummary, LogisticRegressionClassifier};
use crate::ml::encoder::LabelEncoder;
use crate::ml::features::FeatureExtractor;
use crate::ml::models::{
    ClassifierConfig, FeatureConfig, ModelMetrics, ModelType, Prediction, SparseVector,
    SplitConfig,
};
use crate::ml::split::{train_test_split, SplitStrategy};
use crate::ml::store::{ArtifactManifest, ArtifactSet, ModelStore, ARTIFACT_SCHEMA_VERSION};
use crate::models::{TicketPrediction, TrainingRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Number of terms recorded in the manifest
const MANIFEST_TOP_FEATURES: usize = 20;

/// Everything needed to train a ticket classifier
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub features: FeatureConfig,
    pub classifier: ClassifierConfig,
    pub split: SplitConfig,
    pub canonicalize_labels: bool,
}

/// Summary of one training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub data_source: DataSource,
    pub total_samples: usize,
    pub training_samples: usize,
    pub test_samples: usize,
    pub split_strategy: SplitStrategy,
    pub evaluation_meaningful: bool,
    pub vocab_size: usize,
    pub type_metrics: ModelMetrics,
    pub urgency_metrics: ModelMetrics,
    pub type_fit: FitSummary,
    pub urgency_fit: FitSummary,
    pub duration_ms: u64,
}

/// Department + urgency classifier over a shared TF-IDF vectorizer
#[derive(Debug, Clone)]
pub struct TicketClassifier {
    config: PipelineConfig,
    artifacts: Option<Arc<ArtifactSet>>,
}

impl TicketClassifier {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            artifacts: None,
        }
    }

    /// Wrap an already trained or loaded artifact set
    pub fn from_artifacts(config: PipelineConfig, artifacts: ArtifactSet) -> Self {
        Self {
            config,
            artifacts: Some(Arc::new(artifacts)),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_ready(&self) -> bool {
        self.artifacts.is_some()
    }

    pub fn artifacts(&self) -> Option<&ArtifactSet> {
        self.artifacts.as_deref()
    }

    pub fn manifest(&self) -> Option<&ArtifactManifest> {
        self.artifacts.as_deref().map(|a| &a.manifest)
    }

    /// Clean a raw table with this pipeline's label policy
    pub fn prepare_data(&self, table: &RawTable) -> Result<Vec<TrainingRecord>> {
        data::prepare_data(table, self.config.canonicalize_labels)
    }

    /// Fit every component on all given rows, with no hold-out
    pub fn fit(&mut self, records: &[TrainingRecord]) -> Result<()> {
        let (artifacts, _, _) = self.fit_artifacts(records, 0)?;
        self.artifacts = Some(Arc::new(artifacts));
        Ok(())
    }

    /// Split, fit on the training part, evaluate on the hold-out
    pub fn train(
        &mut self,
        records: &[TrainingRecord],
        data_source: DataSource,
    ) -> Result<TrainingReport> {
        let start = Instant::now();
        info!(rows = records.len(), source = %data_source, "🏋️ Training ticket classifier");

        let type_labels: Vec<String> = records.iter().map(|r| r.category.clone()).collect();
        let urgency_labels: Vec<String> = records.iter().map(|r| r.urgency.clone()).collect();
        let split = train_test_split(&type_labels, &urgency_labels, &self.config.split)?;

        if !split.evaluation_meaningful() {
            warn!("Evaluation reuses the training rows; reported accuracy is not a hold-out score");
        }

        let train_rows: Vec<TrainingRecord> =
            split.train.iter().map(|&i| records[i].clone()).collect();
        let test_rows: Vec<TrainingRecord> =
            split.test.iter().map(|&i| records[i].clone()).collect();

        let (mut artifacts, type_fit, urgency_fit) =
            self.fit_artifacts(&train_rows, test_rows.len())?;

        let type_metrics = evaluate_dimension(&artifacts, &test_rows, Dimension::Department)?;
        let urgency_metrics = evaluate_dimension(&artifacts, &test_rows, Dimension::Urgency)?;

        artifacts.manifest.type_accuracy = Some(type_metrics.accuracy);
        artifacts.manifest.urgency_accuracy = Some(urgency_metrics.accuracy);
        artifacts.manifest.evaluation_meaningful = split.evaluation_meaningful();

        let report = TrainingReport {
            data_source,
            total_samples: records.len(),
            training_samples: train_rows.len(),
            test_samples: test_rows.len(),
            split_strategy: split.strategy,
            evaluation_meaningful: split.evaluation_meaningful(),
            vocab_size: artifacts.vectorizer.vocab_size(),
            type_metrics,
            urgency_metrics,
            type_fit,
            urgency_fit,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            split = %report.split_strategy,
            train = report.training_samples,
            test = report.test_samples,
            type_accuracy = report.type_metrics.accuracy,
            urgency_accuracy = report.urgency_metrics.accuracy,
            duration_ms = report.duration_ms,
            "✅ Ticket classifier trained"
        );

        self.artifacts = Some(Arc::new(artifacts));
        Ok(report)
    }

    fn fit_artifacts(
        &self,
        records: &[TrainingRecord],
        test_samples: usize,
    ) -> Result<(ArtifactSet, FitSummary, FitSummary)> {
        if records.is_empty() {
            return Err(AppError::DataShape("no training rows".to_string()));
        }

        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let mut vectorizer = FeatureExtractor::new(self.config.features.clone());
        let features = vectorizer.fit_transform(&texts)?;
        let n_features = vectorizer.n_features();

        let mut type_encoder = LabelEncoder::new();
        let type_labels: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        type_encoder.fit(&type_labels)?;
        let type_y = type_encoder.encode_all(&type_labels)?;

        let mut urgency_encoder = LabelEncoder::new();
        let urgency_labels: Vec<&str> = records.iter().map(|r| r.urgency.as_str()).collect();
        urgency_encoder.fit(&urgency_labels)?;
        let urgency_y = urgency_encoder.encode_all(&urgency_labels)?;

        let mut type_classifier = LogisticRegressionClassifier::new(self.config.classifier.clone());
        let type_fit =
            type_classifier.fit_with_dim(&features, &type_y, type_encoder.n_classes(), n_features)?;

        let mut urgency_classifier =
            LogisticRegressionClassifier::new(self.config.classifier.clone());
        let urgency_fit = urgency_classifier.fit_with_dim(
            &features,
            &urgency_y,
            urgency_encoder.n_classes(),
            n_features,
        )?;

        let manifest = ArtifactManifest {
            schema_version: ARTIFACT_SCHEMA_VERSION,
            model_type: type_classifier.model_type(),
            type_classes: type_encoder.classes().to_vec(),
            urgency_classes: urgency_encoder.classes().to_vec(),
            n_features,
            training_samples: records.len(),
            test_samples,
            type_accuracy: None,
            urgency_accuracy: None,
            evaluation_meaningful: false,
            trained_at: chrono::Utc::now(),
            top_features: vectorizer.top_features(MANIFEST_TOP_FEATURES),
        };

        let artifacts = ArtifactSet {
            vectorizer,
            type_classifier,
            urgency_classifier,
            type_encoder,
            urgency_encoder,
            manifest,
        };

        Ok((artifacts, type_fit, urgency_fit))
    }

    /// Classify one ticket text on both dimensions
    pub fn predict(&self, text: &str) -> Result<TicketPrediction> {
        let artifacts = self.artifacts.as_deref().ok_or_else(|| {
            AppError::NotReady("models have not been trained or loaded".to_string())
        })?;
        predict_with(artifacts, text)
    }

    pub fn save(&self, store: &ModelStore) -> Result<()> {
        let artifacts = self
            .artifacts
            .as_deref()
            .ok_or_else(|| AppError::NotReady("nothing to save: models not trained".to_string()))?;
        store.save(artifacts)
    }

    pub fn load(config: PipelineConfig, store: &ModelStore) -> Result<Self> {
        let artifacts = store.load()?;
        Ok(Self::from_artifacts(config, artifacts))
    }

    pub fn model_type(&self) -> ModelType {
        ModelType::TfidfLogisticRegression
    }
}

#[derive(Debug, Clone, Copy)]
enum Dimension {
    Department,
    Urgency,
}

fn evaluate_dimension(
    artifacts: &ArtifactSet,
    rows: &[TrainingRecord],
    dimension: Dimension,
) -> Result<ModelMetrics> {
    let (classifier, encoder) = match dimension {
        Dimension::Department => (&artifacts.type_classifier, &artifacts.type_encoder),
        Dimension::Urgency => (&artifacts.urgency_classifier, &artifacts.urgency_encoder),
    };

    let texts: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
    let features = artifacts.vectorizer.transform(&texts)?;

    // Hold-out labels unseen in training map past the last class: they count
    // as misses and stay out of the confusion matrix.
    let unseen = encoder.n_classes();
    let labels: Vec<usize> = rows
        .iter()
        .map(|r| {
            let label = match dimension {
                Dimension::Department => &r.category,
                Dimension::Urgency => &r.urgency,
            };
            encoder.encode(label).unwrap_or(unseen)
        })
        .collect();

    classifier.evaluate(&features, &labels, encoder.classes())
}

fn predict_with(artifacts: &ArtifactSet, text: &str) -> Result<TicketPrediction> {
    let features = artifacts.vectorizer.transform_one(text)?;

    let department = decode(
        &artifacts.type_classifier,
        &artifacts.type_encoder,
        &features,
    )?;
    let urgency = decode(
        &artifacts.urgency_classifier,
        &artifacts.urgency_encoder,
        &features,
    )?;

    Ok(TicketPrediction {
        ticket_type: department.value,
        urgency: urgency.value,
        confidence_type: department.confidence,
        confidence_urgency: urgency.confidence,
        type_probabilities: department.probabilities,
        urgency_probabilities: urgency.probabilities,
    })
}

fn decode(
    classifier: &LogisticRegressionClassifier,
    encoder: &LabelEncoder,
    features: &SparseVector,
) -> Result<Prediction<String>> {
    let proba = classifier.predict_proba(features)?;
    let best = argmax(&proba);
    let label = encoder.decode(best)?.to_string();
    let probabilities: BTreeMap<String, f64> = encoder
        .classes()
        .iter()
        .cloned()
        .zip(proba.iter().copied())
        .collect();

    Ok(Prediction::new(label, proba[best]).with_probabilities(probabilities))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(rows: &[(&str, &str, &str)]) -> Vec<TrainingRecord> {
        rows.iter()
            .map(|(text, category, urgency)| TrainingRecord {
                text: text.to_string(),
                category: category.to_string(),
                urgency: urgency.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_predict_before_fit_is_not_ready() {
        let clf = TicketClassifier::new(PipelineConfig::default());
        assert!(!clf.is_ready());
        assert!(matches!(clf.predict("anything"), Err(AppError::NotReady(_))));
    }

    #[test]
    fn test_fit_and_predict_closed_world() {
        let rows = records(&[
            ("printer jammed paper", "hardware", "low"),
            ("printer out of toner", "hardware", "low"),
            ("vpn tunnel down", "network", "high"),
            ("vpn keeps dropping", "network", "high"),
        ]);
        let mut clf = TicketClassifier::new(PipelineConfig::default());
        clf.fit(&rows).unwrap();

        let prediction = clf.predict("vpn down again").unwrap();
        assert_eq!(prediction.ticket_type, "network");
        assert_eq!(prediction.urgency, "high");
        assert!(["hardware", "network"].contains(&prediction.ticket_type.as_str()));

        let max = prediction
            .type_probabilities
            .values()
            .copied()
            .fold(f64::MIN, f64::max);
        assert_eq!(prediction.confidence_type, max);
        let total: f64 = prediction.urgency_probabilities.values().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_row_training_is_degenerate() {
        let rows = records(&[("monitor flickers", "hardware", "medium")]);
        let mut clf = TicketClassifier::new(PipelineConfig::default());
        let report = clf.train(&rows, DataSource::Sample).unwrap();

        assert_eq!(report.split_strategy, SplitStrategy::Degenerate);
        assert!(!report.evaluation_meaningful);
        assert_eq!(report.training_samples, 1);
        assert_eq!(report.test_samples, 1);

        let prediction = clf.predict("anything at all").unwrap();
        assert_eq!(prediction.ticket_type, "hardware");
        assert_eq!(prediction.confidence_type, 1.0);
    }

    #[test]
    fn test_empty_training_set_fails() {
        let mut clf = TicketClassifier::new(PipelineConfig::default());
        assert!(clf.fit(&[]).is_err());
        assert!(!clf.is_ready());
    }
}
