use crate::config::ClassifierSettings;
use crate::data::{resolve_training_data, DataSource};
use crate::error::{AppError, Result};
use crate::metrics::{
    CLASSIFY_REQUESTS_TOTAL, MODELS_READY, PREDICTION_DURATION_SECONDS, TRAINING_RUNS_TOTAL,
};
use crate::ml::pipeline::{TicketClassifier, TrainingReport};
use crate::ml::store::{ArtifactManifest, ModelStore};
use crate::models::{Classification, Ticket, TicketPrediction};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Lifecycle of the prediction service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceState {
    /// No load attempt yet
    Uninitialized,
    /// Load (and optional training) failed; predictions are refused
    NotReady,
    /// A complete artifact set is loaded
    Ready,
}

impl std::fmt::Display for ServiceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceState::Uninitialized => "uninitialized",
            ServiceState::NotReady => "not_ready",
            ServiceState::Ready => "ready",
        };
        f.write_str(s)
    }
}

/// Snapshot of what the service is serving
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub state: ServiceState,
    pub manifest: Option<ArtifactManifest>,
    pub last_training: Option<TrainingReport>,
    pub last_error: Option<String>,
}

struct Inner {
    state: ServiceState,
    classifier: Option<Arc<TicketClassifier>>,
    last_training: Option<TrainingReport>,
    last_error: Option<String>,
}

/// Ticket classification service shared by the HTTP handlers
pub struct ClassifierService {
    settings: ClassifierSettings,
    store: ModelStore,
    inner: Arc<RwLock<Inner>>,
}

impl ClassifierService {
    /// Create a service that has not yet loaded anything
    pub fn new(settings: ClassifierSettings) -> Self {
        let store = ModelStore::new(settings.model_dir.clone());
        Self {
            settings,
            store,
            inner: Arc::new(RwLock::new(Inner {
                state: ServiceState::Uninitialized,
                classifier: None,
                last_training: None,
                last_error: None,
            })),
        }
    }

    /// Create a service already serving the given classifier
    pub fn with_classifier(settings: ClassifierSettings, classifier: TicketClassifier) -> Self {
        let store = ModelStore::new(settings.model_dir.clone());
        let ready = classifier.is_ready();
        MODELS_READY.set(i64::from(ready));

        Self {
            settings,
            store,
            inner: Arc::new(RwLock::new(Inner {
                state: if ready {
                    ServiceState::Ready
                } else {
                    ServiceState::NotReady
                },
                classifier: ready.then(|| Arc::new(classifier)),
                last_training: None,
                last_error: None,
            })),
        }
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub async fn state(&self) -> ServiceState {
        self.inner.read().await.state
    }

    pub async fn is_ready(&self) -> bool {
        self.state().await == ServiceState::Ready
    }

    /// Load persisted models, training from scratch when none exist and
    /// `train_on_startup` is set. Failures leave the service NotReady.
    pub async fn initialize(&self) -> ServiceState {
        info!(dir = %self.store.dir().display(), "🚀 Initializing classifier service");

        let store = self.store.clone();
        let config = self.settings.pipeline_config();
        let loaded =
            tokio::task::spawn_blocking(move || TicketClassifier::load(config, &store)).await;

        let result = match loaded {
            Ok(result) => result,
            Err(e) => Err(AppError::Internal(format!("model loading task failed: {e}"))),
        };

        match result {
            Ok(classifier) => {
                self.install(classifier, None).await;
                info!("✅ Loaded trained models");
            }
            Err(AppError::NotFound(msg)) if self.settings.train_on_startup => {
                info!(reason = %msg, "No trained models found; training at startup");
                if let Err(e) = self.train(None).await {
                    error!(error = %e, "Startup training failed; serving without models");
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to load models; serving without models");
                self.mark_failed(e.to_string()).await;
            }
        }

        self.state().await
    }

    /// Resolve data, train, persist, and swap in the new models.
    ///
    /// On failure the previously served models (if any) stay in place.
    pub async fn train(&self, training_data: Option<PathBuf>) -> Result<TrainingReport> {
        let settings = self.settings.clone();
        let store = self.store.clone();
        let explicit = training_data.or_else(|| settings.training_data.clone());

        let outcome = tokio::task::spawn_blocking(move || {
            train_and_save(&settings, &store, explicit.as_deref())
        })
        .await
        .map_err(|e| AppError::Internal(format!("training task failed: {e}")))
        .and_then(|r| r);

        match outcome {
            Ok((classifier, report)) => {
                TRAINING_RUNS_TOTAL.with_label_values(&["success"]).inc();
                self.install(classifier, Some(report.clone())).await;
                Ok(report)
            }
            Err(e) => {
                TRAINING_RUNS_TOTAL.with_label_values(&["failure"]).inc();
                self.mark_failed(e.to_string()).await;
                Err(e)
            }
        }
    }

    /// Full prediction for one ticket text
    pub async fn predict(&self, text: &str) -> Result<TicketPrediction> {
        let classifier = self.classifier().await?;
        let timer = PREDICTION_DURATION_SECONDS.start_timer();
        let prediction = classifier.predict(text);
        timer.observe_duration();
        prediction
    }

    /// Department/priority for a portal ticket.
    ///
    /// Blank tickets get the fixed default answer without touching the models,
    /// so this works even before the service is ready.
    pub async fn classify(&self, title: Option<&str>, message: &str) -> Result<Classification> {
        let ticket = Ticket::from_parts(title, message);
        if ticket.text.is_empty() {
            warn!("Empty ticket text; returning default classification");
            CLASSIFY_REQUESTS_TOTAL
                .with_label_values(&["empty_default"])
                .inc();
            return Ok(Classification::empty_default());
        }

        match self.predict(&ticket.text).await {
            Ok(prediction) => {
                CLASSIFY_REQUESTS_TOTAL.with_label_values(&["classified"]).inc();
                Ok(prediction.into())
            }
            Err(e) => {
                let outcome = match e {
                    AppError::NotReady(_) => "not_ready",
                    _ => "error",
                };
                CLASSIFY_REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
                Err(e)
            }
        }
    }

    pub async fn model_info(&self) -> ModelInfo {
        let inner = self.inner.read().await;
        ModelInfo {
            state: inner.state,
            manifest: inner
                .classifier
                .as_ref()
                .and_then(|c| c.manifest().cloned()),
            last_training: inner.last_training.clone(),
            last_error: inner.last_error.clone(),
        }
    }

    async fn classifier(&self) -> Result<Arc<TicketClassifier>> {
        let inner = self.inner.read().await;
        inner.classifier.clone().ok_or_else(|| {
            AppError::NotReady(format!("classifier service is {}", inner.state))
        })
    }

    async fn install(&self, classifier: TicketClassifier, report: Option<TrainingReport>) {
        let mut inner = self.inner.write().await;
        inner.classifier = Some(Arc::new(classifier));
        inner.state = ServiceState::Ready;
        inner.last_error = None;
        if report.is_some() {
            inner.last_training = report;
        }
        MODELS_READY.set(1);
    }

    async fn mark_failed(&self, message: String) {
        let mut inner = self.inner.write().await;
        if inner.state != ServiceState::Ready {
            inner.state = ServiceState::NotReady;
            MODELS_READY.set(0);
        }
        inner.last_error = Some(message);
    }
}

/// Resolve training data, train a fresh classifier and persist it
pub fn train_and_save(
    settings: &ClassifierSettings,
    store: &ModelStore,
    explicit: Option<&std::path::Path>,
) -> Result<(TicketClassifier, TrainingReport)> {
    let (table, source): (_, DataSource) =
        resolve_training_data(explicit, settings.allow_sample_data)?;

    let mut classifier = TicketClassifier::new(settings.pipeline_config());
    let records = classifier.prepare_data(&table)?;
    let report = classifier.train(&records, source)?;
    classifier.save(store)?;

    Ok((classifier, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrainingRecord;

    fn settings(dir: &std::path::Path) -> ClassifierSettings {
        ClassifierSettings {
            model_dir: dir.join("models"),
            ..Default::default()
        }
    }

    fn trained() -> TicketClassifier {
        let rows: Vec<TrainingRecord> = [
            ("laptop screen cracked", "hardware", "high"),
            ("laptop battery swollen", "hardware", "high"),
            ("password reset needed", "account", "low"),
            ("password expired again", "account", "low"),
        ]
        .iter()
        .map(|(t, c, u)| TrainingRecord {
            text: t.to_string(),
            category: c.to_string(),
            urgency: u.to_string(),
        })
        .collect();

        let mut clf = TicketClassifier::new(Default::default());
        clf.fit(&rows).unwrap();
        clf
    }

    #[tokio::test]
    async fn test_new_service_is_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        let service = ClassifierService::new(settings(dir.path()));

        assert_eq!(service.state().await, ServiceState::Uninitialized);
        assert!(matches!(
            service.predict("laptop").await,
            Err(AppError::NotReady(_))
        ));
    }

    #[tokio::test]
    async fn test_blank_ticket_gets_default_without_models() {
        let dir = tempfile::tempdir().unwrap();
        let service = ClassifierService::new(settings(dir.path()));

        let result = service.classify(Some("  "), "\n\t").await.unwrap();
        assert_eq!(result, Classification::empty_default());
    }

    #[tokio::test]
    async fn test_initialize_without_data_is_not_ready() {
        let dir = tempfile::tempdir().unwrap();
        let mut s = settings(dir.path());
        s.training_data = Some(dir.path().join("missing.csv"));
        let service = ClassifierService::new(s);

        assert_eq!(service.initialize().await, ServiceState::NotReady);
        let info = service.model_info().await;
        assert!(info.manifest.is_none());
        assert!(info.last_error.is_some());
    }

    #[tokio::test]
    async fn test_classify_with_ready_service() {
        let dir = tempfile::tempdir().unwrap();
        let service = ClassifierService::with_classifier(settings(dir.path()), trained());

        assert!(service.is_ready().await);
        let result = service
            .classify(Some("Laptop"), "the screen is cracked")
            .await
            .unwrap();
        assert_eq!(result.department, "hardware");
        assert_eq!(result.priority, "high");
        assert!(result.confidence_type > 0.0 && result.confidence_type <= 1.0);
    }

    #[tokio::test]
    async fn test_training_from_file_makes_service_ready() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("tickets.csv");
        std::fs::write(
            &csv,
            "text,category,urgency\n\
             printer jammed,hardware,low\n\
             printer offline,hardware,low\n\
             vpn dropped,network,high\n\
             vpn slow,network,high\n",
        )
        .unwrap();

        let service = ClassifierService::new(settings(dir.path()));
        let report = service.train(Some(csv)).await.unwrap();

        assert_eq!(report.total_samples, 4);
        assert!(service.is_ready().await);
        assert!(service.store().exists());
        assert!(service.model_info().await.manifest.is_some());
    }
}
