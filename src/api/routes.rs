use crate::api::{auth, handlers, AppState};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    // Routes behind the shared-secret check
    let protected = Router::new()
        .route("/classify", post(handlers::classify))
        .route("/v1/predict", post(handlers::predict))
        .route("/v1/assist", post(handlers::assist))
        .route("/v1/model", get(handlers::model_info))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_shared_secret,
        ));

    let request_timeout = state.request_timeout;

    Router::new()
        // Infrastructure endpoints
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_export))
        .merge(protected)
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
}
