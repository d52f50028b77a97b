use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::ml::models::{ClassifierConfig, FeatureConfig, SplitConfig};
use crate::ml::pipeline::PipelineConfig;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Classifier training and storage configuration
    #[serde(default)]
    pub classifier: ClassifierSettings,

    /// Shared-secret authentication
    #[serde(default)]
    pub auth: AuthConfig,

    /// Troubleshooting assistant configuration
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: TICKET_TRIAGE__)
            .add_source(
                config::Environment::with_prefix("TICKET_TRIAGE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Request timeout (seconds)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Flat classifier settings as they appear in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSettings {
    /// Directory holding the artifact set
    #[serde(default = "default_model_dir")]
    pub model_dir: PathBuf,

    /// Explicit training CSV
    #[serde(default)]
    pub training_data: Option<PathBuf>,

    /// Permit the bundled sample table when no CSV is found
    #[serde(default)]
    pub allow_sample_data: bool,

    /// Train when no artifacts are found at startup
    #[serde(default = "default_true")]
    pub train_on_startup: bool,

    /// Map raw labels onto the canonical department/urgency vocabularies
    #[serde(default)]
    pub canonicalize_labels: bool,

    #[serde(default = "default_max_features")]
    pub max_features: usize,

    #[serde(default = "default_min_df")]
    pub min_df: usize,

    #[serde(default = "default_max_df")]
    pub max_df: f64,

    #[serde(default = "default_ngram_min")]
    pub ngram_min: usize,

    #[serde(default = "default_ngram_max")]
    pub ngram_max: usize,

    #[serde(default = "default_test_fraction")]
    pub test_fraction: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Inverse L2 regularization strength (C)
    #[serde(default = "default_regularization")]
    pub regularization: f64,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            model_dir: default_model_dir(),
            training_data: None,
            allow_sample_data: false,
            train_on_startup: true,
            canonicalize_labels: false,
            max_features: default_max_features(),
            min_df: default_min_df(),
            max_df: default_max_df(),
            ngram_min: default_ngram_min(),
            ngram_max: default_ngram_max(),
            test_fraction: default_test_fraction(),
            seed: default_seed(),
            max_iter: default_max_iter(),
            regularization: default_regularization(),
            tolerance: default_tolerance(),
        }
    }
}

impl ClassifierSettings {
    pub fn feature_config(&self) -> FeatureConfig {
        FeatureConfig {
            max_features: self.max_features,
            min_df: self.min_df,
            max_df: self.max_df,
            ngram_range: (self.ngram_min, self.ngram_max),
        }
    }

    pub fn classifier_config(&self) -> ClassifierConfig {
        ClassifierConfig {
            regularization: self.regularization,
            max_iter: self.max_iter,
            tolerance: self.tolerance,
            class_weight_balanced: true,
        }
    }

    pub fn split_config(&self) -> SplitConfig {
        SplitConfig {
            test_fraction: self.test_fraction,
            seed: self.seed,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            features: self.feature_config(),
            classifier: self.classifier_config(),
            split: self.split_config(),
            canonicalize_labels: self.canonicalize_labels,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Name of the env var holding the shared secret
    #[serde(default = "default_shared_secret_env")]
    pub shared_secret_env: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            shared_secret_env: default_shared_secret_env(),
        }
    }
}

impl AuthConfig {
    /// Resolve the shared secret; empty values count as unset
    pub fn shared_secret(&self) -> Option<String> {
        std::env::var(&self.shared_secret_env)
            .ok()
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Enable the LLM backend (fallback responses are always available)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Name of the env var holding the Gemini API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Gemini model name
    #[serde(default = "default_assistant_model")]
    pub model: String,

    /// Generative Language API base URL
    #[serde(default = "default_assistant_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key_env: default_api_key_env(),
            model: default_assistant_model(),
            endpoint: default_assistant_endpoint(),
            timeout_secs: default_request_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    30
}

fn default_model_dir() -> PathBuf {
    PathBuf::from("models")
}

fn default_max_features() -> usize {
    20_000
}

fn default_min_df() -> usize {
    1
}

fn default_max_df() -> f64 {
    1.0
}

fn default_ngram_min() -> usize {
    1
}

fn default_ngram_max() -> usize {
    2
}

fn default_test_fraction() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_max_iter() -> usize {
    2000
}

fn default_regularization() -> f64 {
    10.0
}

fn default_tolerance() -> f64 {
    1e-5
}

fn default_shared_secret_env() -> String {
    "CLASSIFIER_KEY".to_string()
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_assistant_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_assistant_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_values() {
        assert_eq!(default_http_port(), 8000);
        assert_eq!(default_max_features(), 20_000);
        assert_eq!(default_seed(), 42);
        assert_eq!(default_log_level(), "info");
        assert!(default_true());
    }

    #[test]
    fn test_embedded_defaults_match_default_impl() {
        let parsed: Config = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        let defaults = Config::default();
        assert_eq!(parsed.server.http_port, defaults.server.http_port);
        assert_eq!(parsed.classifier.max_features, defaults.classifier.max_features);
        assert_eq!(parsed.classifier.model_dir, defaults.classifier.model_dir);
        assert!(!parsed.classifier.allow_sample_data);
        assert_eq!(parsed.auth.shared_secret_env, "CLASSIFIER_KEY");
        assert_eq!(parsed.assistant.api_key_env, "GEMINI_API_KEY");
    }

    #[test]
    fn test_settings_project_into_ml_configs() {
        let settings = ClassifierSettings {
            max_features: 10_000,
            min_df: 2,
            max_df: 0.95,
            ..Default::default()
        };

        let features = settings.feature_config();
        assert_eq!(features.max_features, 10_000);
        assert_eq!(features.min_df, 2);
        assert_eq!(features.ngram_range, (1, 2));

        let classifier = settings.classifier_config();
        assert!(classifier.class_weight_balanced);
        assert_eq!(classifier.max_iter, 2000);

        assert_eq!(settings.split_config().seed, 42);
        assert!(!settings.pipeline_config().canonicalize_labels);
    }
}
