use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Feature extraction configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Maximum vocabulary size (top terms by document frequency)
    pub max_features: usize,

    /// Minimum document frequency (absolute count)
    pub min_df: usize,

    /// Maximum document frequency (fraction of documents)
    pub max_df: f64,

    /// N-gram range (min, max)
    pub ngram_range: (usize, usize),
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            max_features: 20_000,
            min_df: 1,
            max_df: 1.0,
            ngram_range: (1, 2), // Unigrams and bigrams
        }
    }
}

/// Logistic regression hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Inverse L2 regularization strength (C)
    pub regularization: f64,

    /// Iteration cap for the solver
    pub max_iter: usize,

    /// Gradient-norm convergence tolerance
    pub tolerance: f64,

    /// Weight samples by inverse class frequency
    pub class_weight_balanced: bool,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            regularization: 10.0,
            max_iter: 2000,
            tolerance: 1e-5,
            class_weight_balanced: true,
        }
    }
}

/// Train/test split configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Hold-out fraction
    pub test_fraction: f64,

    /// Shuffle seed
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Sparse feature row: sorted `(column, value)` pairs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SparseVector {
    pub indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseVector {
    pub fn new(indices: Vec<usize>, values: Vec<f64>) -> Self {
        debug_assert_eq!(indices.len(), values.len());
        Self { indices, values }
    }

    pub fn nnz(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.indices.iter().copied().zip(self.values.iter().copied())
    }

    pub fn norm(&self) -> f64 {
        self.values.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Prediction result with confidence score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction<T> {
    /// Predicted value
    pub value: T,

    /// Confidence score (0.0 - 1.0), the maximum class probability
    pub confidence: f64,

    /// All class probabilities keyed by label
    pub probabilities: BTreeMap<String, f64>,
}

impl<T> Prediction<T> {
    pub fn new(value: T, confidence: f64) -> Self {
        Self {
            value,
            confidence,
            probabilities: BTreeMap::new(),
        }
    }

    pub fn with_probabilities(mut self, probabilities: BTreeMap<String, f64>) -> Self {
        self.probabilities = probabilities;
        self
    }
}

/// Model evaluation metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Macro-averaged precision
    pub precision: f64,

    /// Macro-averaged recall
    pub recall: f64,

    /// Macro-averaged F1
    pub f1_score: f64,

    /// Confusion matrix (rows: true class, columns: predicted class)
    pub confusion_matrix: Option<Array2<usize>>,

    /// Per-class metrics keyed by label
    pub per_class_metrics: BTreeMap<String, ClassMetrics>,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    pub fn new() -> Self {
        Self {
            accuracy: 0.0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            confusion_matrix: None,
            per_class_metrics: BTreeMap::new(),
        }
    }

    /// Compute metrics from true and predicted class indices.
    ///
    /// Macro averages run over every class in `class_names`, including
    /// classes absent from `y_true`.
    pub fn from_predictions(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Self {
        let n_samples = y_true.len();
        let n_classes = class_names.len();
        if n_samples == 0 || n_classes == 0 {
            return Self::new();
        }

        let mut confusion = Array2::<usize>::zeros((n_classes, n_classes));
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t < n_classes && p < n_classes {
                confusion[[t, p]] += 1;
            }
        }

        let correct = (0..n_classes).map(|c| confusion[[c, c]]).sum::<usize>();
        let accuracy = correct as f64 / n_samples as f64;

        let mut per_class = BTreeMap::new();
        for (class_idx, name) in class_names.iter().enumerate() {
            let tp = confusion[[class_idx, class_idx]];
            let predicted = confusion.column(class_idx).sum();
            let support = confusion.row(class_idx).sum();

            let precision = if predicted > 0 {
                tp as f64 / predicted as f64
            } else {
                0.0
            };
            let recall = if support > 0 {
                tp as f64 / support as f64
            } else {
                0.0
            };
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            per_class.insert(
                name.clone(),
                ClassMetrics {
                    precision,
                    recall,
                    f1_score: f1,
                    support,
                },
            );
        }

        let k = n_classes as f64;
        let precision = per_class.values().map(|m| m.precision).sum::<f64>() / k;
        let recall = per_class.values().map(|m| m.recall).sum::<f64>() / k;
        let f1_score = per_class.values().map(|m| m.f1_score).sum::<f64>() / k;

        Self {
            accuracy,
            precision,
            recall,
            f1_score,
            confusion_matrix: Some(confusion),
            per_class_metrics: per_class,
        }
    }
}

impl Default for ModelMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Model type enumeration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ModelType {
    /// TF-IDF features + multinomial logistic regression
    TfidfLogisticRegression,
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelType::TfidfLogisticRegression => write!(f, "TF-IDF + Logistic Regression"),
        }
    }
}
