use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Training data has no resolvable text/category/urgency columns, or no rows
    #[error("Data shape error: {0}")]
    DataShape(String),

    /// Prediction requested before a valid artifact set was loaded or trained
    #[error("Classifier not ready: {0}")]
    NotReady(String),

    /// One of the persisted artifacts is missing or corrupt
    #[error("Artifact load error ({artifact}): {message}")]
    ArtifactLoad { artifact: String, message: String },

    /// Persisted artifacts were written by an incompatible schema or disagree with each other
    #[error("Artifact schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// CSV parsing errors
    #[error("CSV error: {0}")]
    Csv(String),

    /// Authentication errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Model fitting errors
    #[error("Training error: {0}")]
    Training(String),

    /// Integration errors
    #[error("Integration error ({integration_source}): {message}")]
    Integration { integration_source: String, message: String },

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::DataShape(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotReady(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::ArtifactLoad { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::SchemaMismatch(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Csv(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Integration { .. } => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::DataShape(_) => "DATA_SHAPE_ERROR",
            AppError::NotReady(_) => "NOT_READY",
            AppError::ArtifactLoad { .. } => "ARTIFACT_LOAD_ERROR",
            AppError::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Authentication(_) => "AUTHENTICATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Csv(_) => "CSV_ERROR",
            AppError::Training(_) => "TRAINING_ERROR",
            AppError::Integration { .. } => "INTEGRATION_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Shorthand for an artifact failure
    pub fn artifact(artifact: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::ArtifactLoad {
            artifact: artifact.into(),
            message: message.to_string(),
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error
impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from csv::Error
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Csv(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotReady("test".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::Validation("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Authentication("test".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::DataShape("no text column".to_string()).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::SchemaMismatch("v1 != v2".to_string()).error_code(),
            "SCHEMA_MISMATCH"
        );
        assert_eq!(
            AppError::artifact("type_clf_lr.bin", "missing").error_code(),
            "ARTIFACT_LOAD_ERROR"
        );
        assert_eq!(AppError::NotReady("x".to_string()).error_code(), "NOT_READY");
    }

    #[test]
    fn test_artifact_error_message() {
        let err = AppError::artifact("tfidf_vectorizer.bin", "unexpected end of file");
        assert_eq!(
            err.to_string(),
            "Artifact load error (tfidf_vectorizer.bin): unexpected end of file"
        );
    }
}
