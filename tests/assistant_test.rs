/// Assistant tests against a mocked Gemini endpoint
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use ticket_triage::assistant::{Assistance, Assistant, GeminiClient, LanguageModel};
use ticket_triage::{AppError, Result};

const MODEL: &str = "gemini-test";
const GENERATE_PATH: &str = "/models/gemini-test:generateContent";

fn client_for(server: &mockito::ServerGuard) -> Arc<dyn LanguageModel> {
    Arc::new(GeminiClient::new(server.url(), MODEL, "test-key", 5).unwrap())
}

#[tokio::test]
async fn test_gemini_response_is_ai_generated() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .match_header("x-goog-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "candidates": [{
                    "content": {"parts": [{"text": "1. Reseat the RAM. "}, {"text": "2. Check the PSU."}]}
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let assistant = Assistant::new(Some(client_for(&server)));
    let assistance = assistant
        .get_assistance("Laptop won't boot", "hardware")
        .await;

    mock.assert_async().await;
    match assistance {
        Assistance::AiGenerated {
            ticket_type,
            response,
            model,
        } => {
            assert_eq!(ticket_type, "hardware");
            assert_eq!(response, "1. Reseat the RAM. 2. Check the PSU.");
            assert_eq!(model, MODEL);
        }
        other => panic!("expected ai response, got {other:?}"),
    }
}

#[tokio::test]
async fn test_server_error_falls_back() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GENERATE_PATH)
        .with_status(500)
        .with_body("boom")
        .create_async()
        .await;

    let assistant = Assistant::new(Some(client_for(&server)));
    let assistance = assistant.get_assistance("VPN drops", "network").await;

    assert!(assistance.is_fallback());
    assert_eq!(assistance.ticket_type(), "network");
}

#[tokio::test]
async fn test_client_surfaces_integration_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", GENERATE_PATH)
        .with_status(403)
        .create_async()
        .await;

    let client = GeminiClient::new(server.url(), MODEL, "bad-key", 5).unwrap();
    let result = client.generate("prompt").await;

    assert!(matches!(result, Err(AppError::Integration { .. })));
}

#[tokio::test]
async fn test_empty_ticket_skips_backend() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", GENERATE_PATH)
        .expect(0)
        .create_async()
        .await;

    let assistant = Assistant::new(Some(client_for(&server)));
    let assistance = assistant.get_assistance("   ", "software").await;

    mock.assert_async().await;
    assert!(assistance.is_fallback());
}

struct CannedModel(&'static str);

#[async_trait]
impl LanguageModel for CannedModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.0.to_string())
    }

    fn model_name(&self) -> &str {
        "canned"
    }
}

#[tokio::test]
async fn test_custom_backend_and_blank_output() {
    let assistant = Assistant::new(Some(Arc::new(CannedModel("  Restart the router.  "))));
    let assistance = assistant.get_assistance("No internet", "network").await;
    assert_eq!(
        assistance,
        Assistance::AiGenerated {
            ticket_type: "network".to_string(),
            response: "Restart the router.".to_string(),
            model: "canned".to_string(),
        }
    );

    let blank = Assistant::new(Some(Arc::new(CannedModel("   "))));
    assert!(blank.get_assistance("No internet", "network").await.is_fallback());
}

#[tokio::test]
async fn test_unknown_department_uses_general_fallback() {
    let assistance = Assistant::fallback_only()
        .get_assistance("Where is my parcel?", "logistics")
        .await;

    match assistance {
        Assistance::Fallback {
            ticket_type,
            recommended_steps,
            note,
            ..
        } => {
            assert_eq!(ticket_type, "logistics");
            assert_eq!(recommended_steps.len(), 4);
            assert!(!note.is_empty());
        }
        other => panic!("expected fallback, got {other:?}"),
    }
}
