use crate::api::AppState;
use crate::assistant::Assistance;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::ml::{ModelInfo, ServiceState};
use crate::models::{Classification, Department, TicketPrediction};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>> {
    let service_state = state.classifier.state().await;
    Ok(Json(HealthResponse {
        ok: true,
        models_ready: service_state == ServiceState::Ready,
        state: service_state,
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub models_ready: bool,
    pub state: ServiceState,
    pub version: String,
}

/// Classify a portal ticket into department and priority
pub async fn classify(
    State(state): State<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<Classification>> {
    request.validate()?;

    let classification = state
        .classifier
        .classify(request.title.as_deref(), &request.message)
        .await?;

    Ok(Json(classification))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ClassifyRequest {
    #[validate(length(max = 500))]
    pub title: Option<String>,
    #[serde(default)]
    #[validate(length(max = 20000))]
    pub message: String,
}

/// Full prediction with probability maps
pub async fn predict(
    State(state): State<AppState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<TicketPrediction>> {
    request.validate()?;
    let prediction = state.classifier.predict(&request.text).await?;
    Ok(Json(prediction))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(length(max = 20000))]
    pub text: String,
}

/// Troubleshooting guidance; classifies the ticket first when no type is given
pub async fn assist(
    State(state): State<AppState>,
    Json(request): Json<AssistRequest>,
) -> Result<Json<Assistance>> {
    request.validate()?;

    let ticket_type = match request.ticket_type.filter(|t| !t.trim().is_empty()) {
        Some(ticket_type) => ticket_type.trim().to_lowercase(),
        None if request.text.trim().is_empty() => Department::Other.to_string(),
        None => match state.classifier.predict(&request.text).await {
            Ok(prediction) => prediction.ticket_type,
            Err(AppError::NotReady(_)) => {
                tracing::debug!("Classifier not ready; assisting as 'other'");
                Department::Other.to_string()
            }
            Err(e) => return Err(e),
        },
    };

    let assistance = state
        .assistant
        .get_assistance(&request.text, &ticket_type)
        .await;
    Ok(Json(assistance))
}

#[derive(Debug, Deserialize, Validate)]
pub struct AssistRequest {
    #[validate(length(max = 20000))]
    pub text: String,
    #[validate(length(max = 64))]
    pub ticket_type: Option<String>,
}

/// Manifest and lifecycle state of the served models
pub async fn model_info(State(state): State<AppState>) -> Result<Json<ModelInfo>> {
    Ok(Json(state.classifier.model_info().await))
}

/// Prometheus text exposition
pub async fn metrics_export(State(state): State<AppState>) -> Result<impl IntoResponse> {
    if !state.prometheus_enabled {
        return Err(AppError::NotFound("metrics are disabled".to_string()));
    }

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    ))
}
