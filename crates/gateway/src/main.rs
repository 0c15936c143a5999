//! PaperDesk API Gateway
//!
//! The entry point for all external API requests. Handles:
//! - Catalog CRUD (papers, authors, venues, tags, citations)
//! - Simple and complex filter search
//! - Tabular import (preview + commit)
//! - PDF upload/download and metadata extraction
//! - Observability (logging, metrics, tracing)

mod handlers;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use paperdesk_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    import::UploadSessionStore,
    metrics,
    storage::ObjectStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Uploads above this size are rejected outright
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub store: ObjectStore,
    pub uploads: Arc<UploadSessionStore>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;
    init_tracing(&config.observability);

    info!("Starting PaperDesk API Gateway v{}", paperdesk_common::VERSION);

    let config = Arc::new(config);

    // Initialize metrics
    metrics::register_metrics();
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()?;
        info!("Metrics exporter listening on {}", addr);
    }

    // Initialize database connection
    info!("Connecting to database...");
    let db = DbPool::new(&config.database).await?;

    // Initialize object storage
    let store = ObjectStore::new(&config.storage);
    if let Err(e) = store.ensure_bucket().await {
        tracing::warn!(error = %e, "Object storage bucket check failed; uploads may not work");
    }

    let state = AppState {
        uploads: Arc::new(UploadSessionStore::new(config.session_ttl())),
        config: config.clone(),
        db,
        store,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Paper endpoints
        .route(
            "/papers",
            post(handlers::papers::create_paper).get(handlers::papers::list_papers),
        )
        .route("/papers/search", get(handlers::search::search_simple))
        .route("/papers/search/complex", post(handlers::search::search_complex))
        .route("/papers/related", post(handlers::related::find_related))
        // Import endpoints
        .route("/papers/import", post(handlers::import::import_direct))
        .route("/papers/import/preview", post(handlers::import::preview_file))
        .route("/papers/import/commit", post(handlers::import::import_committed))
        // PDF metadata extraction (no persistence)
        .route("/papers/parse-pdf", post(handlers::files::parse_pdf))
        // Per-paper endpoints
        .route(
            "/papers/{id}",
            get(handlers::papers::get_paper)
                .put(handlers::papers::update_paper)
                .delete(handlers::papers::delete_paper),
        )
        .route("/papers/{id}/merge", post(handlers::related::merge_paper))
        .route(
            "/papers/{id}/tags",
            post(handlers::tags::add_paper_tags).delete(handlers::tags::remove_paper_tags),
        )
        .route(
            "/papers/{id}/pdf",
            post(handlers::files::upload_pdf).get(handlers::files::download_pdf),
        )
        .route("/papers/{id}/pdf/url", get(handlers::files::presigned_pdf_url))
        .route("/papers/{id}/citations", get(handlers::citations::paper_citations))
        // Entity endpoints
        .route("/citations", post(handlers::citations::create_citation))
        .route(
            "/authors",
            post(handlers::authors::create_author).get(handlers::authors::list_authors),
        )
        .route(
            "/venues",
            post(handlers::venues::create_venue).get(handlers::venues::list_venues),
        )
        .route(
            "/tags",
            post(handlers::tags::create_tag).get(handlers::tags::list_tags),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(request_id)
        .layer(propagate_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
