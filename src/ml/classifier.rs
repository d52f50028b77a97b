use crate::error::{AppError, Result};
use crate::ml::models::{ClassifierConfig, ModelMetrics, ModelType, SparseVector};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Sufficient-decrease constant for the backtracking line search
const ARMIJO_C: f64 = 1e-4;
const MIN_STEP: f64 = 1e-10;
const MAX_STEP: f64 = 1e3;

/// Trait for classifiers over sparse TF-IDF rows
pub trait Classifier: Send + Sync {
    /// Fit on rows and class indices in `0..n_classes`
    fn fit(&mut self, features: &[SparseVector], labels: &[usize], n_classes: usize)
        -> Result<FitSummary>;

    /// Class probability vector for one row (sums to 1)
    fn predict_proba(&self, features: &SparseVector) -> Result<Vec<f64>>;

    /// Most probable class index; ties resolve to the lowest index
    fn predict(&self, features: &SparseVector) -> Result<usize> {
        let proba = self.predict_proba(features)?;
        Ok(argmax(&proba))
    }

    /// Get model type
    fn model_type(&self) -> ModelType;

    /// Check if model is trained
    fn is_trained(&self) -> bool;
}

/// Outcome of a solver run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitSummary {
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
}

/// Multinomial logistic regression with L2 penalty and balanced class weights.
///
/// Minimizes the sample-weighted mean cross-entropy plus `||W||^2 / (2 C n)`;
/// the intercept is not penalized. Optimization is full-batch gradient descent
/// with Armijo backtracking, starting from zero weights, so a fit is fully
/// deterministic for a given input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegressionClassifier {
    config: ClassifierConfig,

    /// Class-by-feature weight matrix
    weights: Option<Array2<f64>>,

    /// Per-class intercept
    bias: Option<Array1<f64>>,

    n_features: usize,
    n_classes: usize,

    /// Last fit summary
    summary: Option<FitSummary>,
}

impl LogisticRegressionClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            weights: None,
            bias: None,
            n_features: 0,
            n_classes: 0,
            summary: None,
        }
    }

    /// Fit with an explicit feature dimension (the vocabulary size)
    pub fn fit_with_dim(
        &mut self,
        features: &[SparseVector],
        labels: &[usize],
        n_classes: usize,
        n_features: usize,
    ) -> Result<FitSummary> {
        if features.is_empty() {
            return Err(AppError::Training("no training rows".to_string()));
        }
        if features.len() != labels.len() {
            return Err(AppError::Training(format!(
                "{} rows but {} labels",
                features.len(),
                labels.len()
            )));
        }
        if n_classes == 0 {
            return Err(AppError::Training("no classes".to_string()));
        }
        if let Some(&bad) = labels.iter().find(|&&y| y >= n_classes) {
            return Err(AppError::Training(format!(
                "label {bad} out of range for {n_classes} classes"
            )));
        }
        let max_col = features
            .iter()
            .flat_map(|row| row.indices.iter().copied())
            .max();
        if let Some(col) = max_col {
            if col >= n_features {
                return Err(AppError::Training(format!(
                    "feature column {col} out of range for dimension {n_features}"
                )));
            }
        }
        if self.config.regularization <= 0.0 {
            return Err(AppError::Configuration(
                "regularization must be positive".to_string(),
            ));
        }

        let sample_weights = self.sample_weights(labels, n_classes);
        let problem = Problem {
            features,
            labels,
            sample_weights: &sample_weights,
            n_classes,
            n_features,
            penalty: 1.0 / (self.config.regularization * features.len() as f64),
        };

        let mut weights = Array2::<f64>::zeros((n_classes, n_features));
        let mut bias = Array1::<f64>::zeros(n_classes);
        let mut step = 1.0;
        let mut iterations = 0;
        let mut converged = false;
        let mut loss = problem.loss(&weights, &bias);

        while iterations < self.config.max_iter {
            let (current, grad_w, grad_b) = problem.loss_and_gradient(&weights, &bias);
            loss = current;
            let grad_sq = grad_w.iter().map(|g| g * g).sum::<f64>()
                + grad_b.iter().map(|g| g * g).sum::<f64>();

            if grad_sq.sqrt() < self.config.tolerance {
                converged = true;
                break;
            }

            let mut t = step;
            let accepted = loop {
                let candidate_w = &weights - &(&grad_w * t);
                let candidate_b = &bias - &(&grad_b * t);
                let candidate_loss = problem.loss(&candidate_w, &candidate_b);
                if candidate_loss <= current - ARMIJO_C * t * grad_sq {
                    break Some((candidate_w, candidate_b));
                }
                t *= 0.5;
                if t < MIN_STEP {
                    break None;
                }
            };

            // No step length decreases the loss any further
            let Some((next_w, next_b)) = accepted else {
                tracing::debug!(iterations = iterations, "Line search stalled");
                break;
            };

            weights = next_w;
            bias = next_b;
            step = (t * 2.0).min(MAX_STEP);
            iterations += 1;
        }

        if !converged {
            loss = problem.loss(&weights, &bias);
            tracing::warn!(
                iterations = iterations,
                loss = loss,
                "Logistic regression stopped before converging"
            );
        }

        let summary = FitSummary {
            iterations,
            converged,
            final_loss: loss,
        };

        self.weights = Some(weights);
        self.bias = Some(bias);
        self.n_features = n_features;
        self.n_classes = n_classes;
        self.summary = Some(summary);

        tracing::debug!(
            iterations = iterations,
            converged = converged,
            loss = loss,
            n_classes = n_classes,
            n_features = n_features,
            "Logistic regression fitted"
        );

        Ok(summary)
    }

    /// Inverse-frequency weights `n / (k * n_c)` over the classes present
    fn sample_weights(&self, labels: &[usize], n_classes: usize) -> Vec<f64> {
        if !self.config.class_weight_balanced {
            return vec![1.0; labels.len()];
        }

        let mut counts = vec![0usize; n_classes];
        for &y in labels {
            counts[y] += 1;
        }
        let present = counts.iter().filter(|&&c| c > 0).count() as f64;
        let n = labels.len() as f64;

        labels
            .iter()
            .map(|&y| n / (present * counts[y] as f64))
            .collect()
    }

    /// Evaluate on held-out rows
    pub fn evaluate(
        &self,
        features: &[SparseVector],
        labels: &[usize],
        class_names: &[String],
    ) -> Result<ModelMetrics> {
        let predicted = features
            .iter()
            .map(|row| self.predict(row))
            .collect::<Result<Vec<_>>>()?;
        Ok(ModelMetrics::from_predictions(labels, &predicted, class_names))
    }

    /// Check that the parameters have the recorded shape
    pub fn check_consistency(&self) -> std::result::Result<(), String> {
        let (Some(weights), Some(bias)) = (&self.weights, &self.bias) else {
            return Err("classifier is not trained".to_string());
        };
        if self.n_classes == 0 {
            return Err("classifier has no classes".to_string());
        }
        if weights.dim() != (self.n_classes, self.n_features) {
            return Err(format!(
                "weights are {:?}, expected ({}, {})",
                weights.dim(),
                self.n_classes,
                self.n_features
            ));
        }
        if bias.len() != self.n_classes {
            return Err(format!(
                "{} intercepts for {} classes",
                bias.len(),
                self.n_classes
            ));
        }
        if weights.iter().chain(bias.iter()).any(|v| !v.is_finite()) {
            return Err("non-finite parameter".to_string());
        }
        Ok(())
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn summary(&self) -> Option<FitSummary> {
        self.summary
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }
}

impl Classifier for LogisticRegressionClassifier {
    fn fit(
        &mut self,
        features: &[SparseVector],
        labels: &[usize],
        n_classes: usize,
    ) -> Result<FitSummary> {
        let n_features = features
            .iter()
            .flat_map(|row| row.indices.iter().copied())
            .max()
            .map_or(0, |c| c + 1);
        self.fit_with_dim(features, labels, n_classes, n_features)
    }

    fn predict_proba(&self, features: &SparseVector) -> Result<Vec<f64>> {
        let (weights, bias) = match (&self.weights, &self.bias) {
            (Some(w), Some(b)) => (w, b),
            _ => {
                return Err(AppError::NotReady(
                    "Logistic regression model not trained".to_string(),
                ))
            }
        };

        let scores = scores(weights, bias, features);
        Ok(softmax(&scores))
    }

    fn model_type(&self) -> ModelType {
        ModelType::TfidfLogisticRegression
    }

    fn is_trained(&self) -> bool {
        self.weights.is_some()
    }
}

/// Fixed inputs of one optimization run
struct Problem<'a> {
    features: &'a [SparseVector],
    labels: &'a [usize],
    sample_weights: &'a [f64],
    n_classes: usize,
    n_features: usize,
    penalty: f64,
}

impl Problem<'_> {
    fn loss(&self, weights: &Array2<f64>, bias: &Array1<f64>) -> f64 {
        let n = self.features.len() as f64;
        let mut loss = 0.0;
        for ((row, &y), &sw) in self
            .features
            .iter()
            .zip(self.labels)
            .zip(self.sample_weights)
        {
            let proba = softmax(&scores(weights, bias, row));
            loss -= sw * proba[y].max(f64::MIN_POSITIVE).ln() / n;
        }
        loss + 0.5 * self.penalty * weights.iter().map(|w| w * w).sum::<f64>()
    }

    fn loss_and_gradient(
        &self,
        weights: &Array2<f64>,
        bias: &Array1<f64>,
    ) -> (f64, Array2<f64>, Array1<f64>) {
        let n = self.features.len() as f64;
        let mut loss = 0.0;
        let mut grad_w = Array2::<f64>::zeros((self.n_classes, self.n_features));
        let mut grad_b = Array1::<f64>::zeros(self.n_classes);

        for ((row, &y), &sw) in self
            .features
            .iter()
            .zip(self.labels)
            .zip(self.sample_weights)
        {
            let proba = softmax(&scores(weights, bias, row));
            loss -= sw * proba[y].max(f64::MIN_POSITIVE).ln() / n;

            for (k, &p) in proba.iter().enumerate() {
                let target = if k == y { 1.0 } else { 0.0 };
                let residual = sw * (p - target) / n;
                grad_b[k] += residual;
                for (col, x) in row.iter() {
                    grad_w[[k, col]] += residual * x;
                }
            }
        }

        loss += 0.5 * self.penalty * weights.iter().map(|w| w * w).sum::<f64>();
        grad_w.scaled_add(self.penalty, weights);

        (loss, grad_w, grad_b)
    }
}

fn scores(weights: &Array2<f64>, bias: &Array1<f64>, row: &SparseVector) -> Vec<f64> {
    (0..bias.len())
        .map(|k| {
            bias[k]
                + row
                    .iter()
                    .filter(|(col, _)| *col < weights.ncols())
                    .map(|(col, x)| weights[[k, col]] * x)
                    .sum::<f64>()
        })
        .collect()
}

fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exp: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let sum: f64 = exp.iter().sum();
    exp.into_iter().map(|e| e / sum).collect()
}

/// Index of the largest value, first one on ties
pub fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(usize, f64)]) -> SparseVector {
        SparseVector::new(
            pairs.iter().map(|p| p.0).collect(),
            pairs.iter().map(|p| p.1).collect(),
        )
    }

    fn separable() -> (Vec<SparseVector>, Vec<usize>) {
        let x = vec![
            row(&[(0, 1.0)]),
            row(&[(0, 0.8), (2, 0.6)]),
            row(&[(1, 1.0)]),
            row(&[(1, 0.6), (2, 0.8)]),
        ];
        (x, vec![0, 0, 1, 1])
    }

    #[test]
    fn test_untrained_is_not_ready() {
        let clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        assert!(!clf.is_trained());
        assert!(matches!(
            clf.predict_proba(&row(&[(0, 1.0)])),
            Err(AppError::NotReady(_))
        ));
    }

    #[test]
    fn test_fit_separable_data() {
        let (x, y) = separable();
        let mut clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        let summary = clf.fit(&x, &y, 2).unwrap();

        assert!(clf.is_trained());
        assert!(summary.iterations > 0);
        assert_eq!(clf.predict(&row(&[(0, 1.0)])).unwrap(), 0);
        assert_eq!(clf.predict(&row(&[(1, 1.0)])).unwrap(), 1);

        let metrics = clf.evaluate(&x, &y, &["a".into(), "b".into()]).unwrap();
        assert_eq!(metrics.accuracy, 1.0);
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable();
        let mut clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        clf.fit(&x, &y, 2).unwrap();

        for r in x.iter().chain(std::iter::once(&SparseVector::default())) {
            let proba = clf.predict_proba(r).unwrap();
            assert_eq!(proba.len(), 2);
            assert!((proba.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let mut a = LogisticRegressionClassifier::new(ClassifierConfig::default());
        let mut b = LogisticRegressionClassifier::new(ClassifierConfig::default());
        a.fit(&x, &y, 2).unwrap();
        b.fit(&x, &y, 2).unwrap();

        let probe = row(&[(0, 0.5), (1, 0.5), (2, 0.7)]);
        assert_eq!(a.predict_proba(&probe).unwrap(), b.predict_proba(&probe).unwrap());
    }

    #[test]
    fn test_consistency_checks_parameter_shapes() {
        let (x, y) = separable();
        let mut clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        assert!(clf.check_consistency().is_err());

        clf.fit(&x, &y, 2).unwrap();
        assert!(clf.check_consistency().is_ok());

        clf.bias = Some(Array1::zeros(3));
        assert!(clf.check_consistency().is_err());

        clf.bias = Some(Array1::zeros(2));
        clf.weights = Some(Array2::zeros((1, clf.n_features)));
        assert!(clf.check_consistency().is_err());
    }

    #[test]
    fn test_loss_never_increases_with_more_iterations() {
        let (x, y) = separable();
        let mut previous = f64::INFINITY;
        for max_iter in 1..=25 {
            let config = ClassifierConfig {
                max_iter,
                ..ClassifierConfig::default()
            };
            let mut clf = LogisticRegressionClassifier::new(config);
            let summary = clf.fit(&x, &y, 2).unwrap();

            assert!(summary.final_loss <= previous);
            previous = summary.final_loss;
        }
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let x = vec![row(&[(0, 1.0)]), row(&[(1, 1.0)])];
        let mut clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        clf.fit(&x, &[0, 0], 1).unwrap();

        let proba = clf.predict_proba(&row(&[(1, 1.0)])).unwrap();
        assert_eq!(proba, vec![1.0]);
    }

    #[test]
    fn test_balanced_weights_favor_minority() {
        let clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        let weights = clf.sample_weights(&[0, 0, 0, 1], 2);
        assert!((weights[0] - 4.0 / 6.0).abs() < 1e-12);
        assert!((weights[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_mismatched_input() {
        let mut clf = LogisticRegressionClassifier::new(ClassifierConfig::default());
        assert!(clf.fit(&[row(&[(0, 1.0)])], &[0, 1], 2).is_err());
        assert!(clf.fit(&[row(&[(0, 1.0)])], &[3], 2).is_err());
        assert!(clf.fit(&[], &[], 2).is_err());
    }

    #[test]
    fn test_argmax_prefers_first_on_ties() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[]), 0);
    }
}
