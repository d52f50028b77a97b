use crate::assistant::gemini::LanguageModel;
use crate::assistant::templates::DepartmentTemplate;
use crate::metrics::ASSISTANT_RESPONSES_TOTAL;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

const FALLBACK_NOTE: &str =
    "This is an automated response. For personalized assistance, please ensure Gemini AI is configured.";

/// Troubleshooting guidance for a ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Assistance {
    AiGenerated {
        ticket_type: String,
        response: String,
        model: String,
    },
    Fallback {
        ticket_type: String,
        analysis: String,
        recommended_steps: Vec<String>,
        escalation_guidance: String,
        note: String,
    },
}

impl Assistance {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Assistance::Fallback { .. })
    }

    pub fn ticket_type(&self) -> &str {
        match self {
            Assistance::AiGenerated { ticket_type, .. } | Assistance::Fallback { ticket_type, .. } => {
                ticket_type
            }
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Assistance::AiGenerated { .. } => "ai_generated",
            Assistance::Fallback { .. } => "fallback",
        }
    }
}

/// Department-aware troubleshooting assistant
#[derive(Clone, Default)]
pub struct Assistant {
    backend: Option<Arc<dyn LanguageModel>>,
}

impl Assistant {
    pub fn new(backend: Option<Arc<dyn LanguageModel>>) -> Self {
        match &backend {
            Some(model) => info!(model = model.model_name(), "🤖 Assistant backend configured"),
            None => warn!("No assistant backend configured; serving fallback responses"),
        }
        Self { backend }
    }

    /// Assistant that only ever answers from the fallback table
    pub fn fallback_only() -> Self {
        Self { backend: None }
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    /// Guidance for a ticket. Backend failures are logged and answered
    /// from the fallback table; they never surface as errors.
    pub async fn get_assistance(&self, ticket_text: &str, ticket_type: &str) -> Assistance {
        let template = DepartmentTemplate::for_label(ticket_type);

        let assistance = match &self.backend {
            None => fallback(template, ticket_type),
            Some(_) if ticket_text.trim().is_empty() => {
                warn!(ticket_type = ticket_type, "Empty ticket text; skipping assistant backend");
                fallback(template, ticket_type)
            }
            Some(backend) => match backend.generate(&template.render(ticket_text)).await {
                Ok(text) if !text.trim().is_empty() => Assistance::AiGenerated {
                    ticket_type: ticket_type.to_string(),
                    response: text.trim().to_string(),
                    model: backend.model_name().to_string(),
                },
                Ok(_) => {
                    warn!(ticket_type = ticket_type, "Empty response from assistant backend");
                    fallback(template, ticket_type)
                }
                Err(e) => {
                    warn!(ticket_type = ticket_type, error = %e, "Assistant backend error");
                    fallback(template, ticket_type)
                }
            },
        };

        ASSISTANT_RESPONSES_TOTAL
            .with_label_values(&[assistance.kind()])
            .inc();
        assistance
    }
}

fn fallback(template: &DepartmentTemplate, ticket_type: &str) -> Assistance {
    Assistance::Fallback {
        ticket_type: ticket_type.to_string(),
        analysis: template.fallback.analysis.to_string(),
        recommended_steps: template
            .fallback
            .steps
            .iter()
            .map(|s| s.to_string())
            .collect(),
        escalation_guidance: template.fallback.escalation.to_string(),
        note: FALLBACK_NOTE.to_string(),
    }
}
