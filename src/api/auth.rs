use crate::api::AppState;
use crate::error::AppError;
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Header carrying the shared secret
pub const CLASSIFIER_KEY_HEADER: &str = "x-classifier-key";

/// Reject requests whose `x-classifier-key` does not match the configured
/// secret. Passes everything through when no secret is configured.
pub async fn require_shared_secret(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.shared_secret.as_deref() else {
        return next.run(req).await;
    };

    let matches = presented_key(req.headers())
        .map(|key| constant_time_eq(key.as_bytes(), expected.as_bytes()));

    match matches {
        Some(true) => next.run(req).await,
        Some(false) => {
            tracing::warn!(path = %req.uri().path(), "Rejected request: wrong classifier key");
            AppError::Authentication("invalid x-classifier-key".to_string()).into_response()
        }
        None => {
            tracing::warn!(path = %req.uri().path(), "Rejected request: missing classifier key");
            AppError::Authentication("missing x-classifier-key header".to_string()).into_response()
        }
    }
}

fn presented_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CLASSIFIER_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"secret", b"secret"));
        assert!(!constant_time_eq(b"secret", b"secreT"));
        assert!(!constant_time_eq(b"secret", b"secrets"));
    }

    #[test]
    fn test_presented_key() {
        let mut headers = HeaderMap::new();
        assert!(presented_key(&headers).is_none());
        headers.insert(CLASSIFIER_KEY_HEADER, "abc".parse().unwrap());
        assert_eq!(presented_key(&headers), Some("abc"));
    }
}
