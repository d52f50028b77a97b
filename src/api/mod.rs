pub mod auth;
pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::assistant::Assistant;
use crate::ml::ClassifierService;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub classifier: Arc<ClassifierService>,
    pub assistant: Arc<Assistant>,
    /// Required `x-classifier-key` value; `None` disables the check
    pub shared_secret: Option<Arc<str>>,
    pub prometheus_enabled: bool,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(classifier: Arc<ClassifierService>, assistant: Arc<Assistant>) -> Self {
        Self {
            classifier,
            assistant,
            shared_secret: None,
            prometheus_enabled: true,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Require the given shared secret on protected routes
    pub fn with_shared_secret(mut self, secret: Option<String>) -> Self {
        self.shared_secret = secret.filter(|s| !s.is_empty()).map(Arc::from);
        self
    }

    pub fn with_prometheus(mut self, enabled: bool) -> Self {
        self.prometheus_enabled = enabled;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
