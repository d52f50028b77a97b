use crate::config::AssistantConfig;
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A text-generation backend
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for the prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier reported with generated answers
    fn model_name(&self) -> &str;
}

/// Google Generative Language API client
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
            timeout_secs,
        })
    }

    /// Build a client from config; `None` when disabled or no key is set
    pub fn from_config(config: &AssistantConfig) -> Result<Option<Self>> {
        if !config.enabled {
            return Ok(None);
        }
        let Some(api_key) = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
        else {
            return Ok(None);
        };

        Self::new(&config.endpoint, &config.model, api_key, config.timeout_secs).map(Some)
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl LanguageModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![RequestPart { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let message = if e.is_timeout() {
                    format!("request timed out after {} seconds", self.timeout_secs)
                } else {
                    format!("request failed: {}", e)
                };
                AppError::Integration {
                    integration_source: "gemini".to_string(),
                    message,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Integration {
                integration_source: "gemini".to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        let body: GenerateResponse = response.json().await.map_err(|e| AppError::Integration {
            integration_source: "gemini".to_string(),
            message: format!("invalid response body: {}", e),
        })?;

        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        debug!(model = %self.model, chars = text.len(), "Gemini response received");
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_trims_trailing_slash() {
        let client = GeminiClient::new("http://localhost:1234/v1beta/", "gemini-2.0-flash", "k", 5)
            .unwrap();
        assert_eq!(
            client.url(),
            "http://localhost:1234/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert_eq!(client.model_name(), "gemini-2.0-flash");
    }

    #[test]
    fn test_disabled_config_builds_no_client() {
        let config = AssistantConfig {
            enabled: false,
            ..Default::default()
        };
        assert!(GeminiClient::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn test_missing_key_builds_no_client() {
        let config = AssistantConfig {
            api_key_env: "TICKET_TRIAGE_TEST_UNSET_GEMINI_KEY".to_string(),
            ..Default::default()
        };
        assert!(GeminiClient::from_config(&config).unwrap().is_none());
    }
}
