use std::sync::Arc;
use std::time::Duration;
use ticket_triage::{
    api::{build_router, AppState},
    assistant::{Assistant, GeminiClient, LanguageModel},
    config::Config,
    ml::ClassifierService,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        Config::default()
    });

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "ticket_triage={},tower_http=info",
            config.observability.log_level
        )
        .into()
    });
    let registry = tracing_subscriber::registry().with(filter);
    if config.observability.json_logs {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    tracing::info!("Starting ticket triage service v{}", env!("CARGO_PKG_VERSION"));

    // Initialize Prometheus metrics
    if config.observability.prometheus_enabled {
        if let Err(e) = ticket_triage::metrics::init_metrics() {
            tracing::warn!("Failed to initialize metrics: {}", e);
            tracing::warn!("Continuing without metrics");
        } else {
            tracing::info!("✅ Prometheus metrics initialized");
        }
    } else {
        tracing::info!("⚠️  Prometheus metrics disabled in configuration");
    }

    // Classifier: load or train in the background so the server answers
    // health checks while models are being prepared
    let classifier = Arc::new(ClassifierService::new(config.classifier.clone()));
    let init_service = classifier.clone();
    tokio::spawn(async move {
        let state = init_service.initialize().await;
        tracing::info!(state = %state, "Classifier service initialized");
    });

    // Assistant backend is optional
    let backend: Option<Arc<dyn LanguageModel>> = match GeminiClient::from_config(&config.assistant)
    {
        Ok(client) => client.map(|c| Arc::new(c) as Arc<dyn LanguageModel>),
        Err(e) => {
            tracing::warn!("⚠️  Assistant backend initialization failed: {}", e);
            None
        }
    };
    let assistant = Arc::new(Assistant::new(backend));

    let shared_secret = config.auth.shared_secret();
    if shared_secret.is_none() {
        tracing::warn!(
            env = %config.auth.shared_secret_env,
            "⚠️  No shared secret configured; classification endpoints are unauthenticated"
        );
    }

    let app_state = AppState::new(classifier, assistant)
        .with_shared_secret(shared_secret)
        .with_prometheus(config.observability.prometheus_enabled)
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs));
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("🚀 HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   Classify: http://{}/classify", http_addr);
    tracing::info!("Press Ctrl+C to shutdown");

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}
