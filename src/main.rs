use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{http::Method, response::Json, routing::get, Router};
use serde_json::{json, Value};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod database;
mod dtos;
mod errors;
mod extractors;
mod handlers;
mod models;
mod routes;
mod services;
mod shutdown;
mod state;
#[cfg(test)]
mod test_support;

use config::{AppConfig, StorageBackend};
use database::{
    connection::get_db_client, memory_store::MemoryStore, mongo_store::MongoStore, store::Store,
};
use services::{
    notifier::{EmailNotifier, LogNotifier, TicketNotifier},
    razorpay_service::RazorpayService,
    ticket_workflow::TicketWorkflow,
};
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(AppConfig::from_env().context("loading configuration")?);
    info!("Configuration: {}", config.get_config_info());

    let app_state = initialize_app_state(config.clone()).await?;
    let workflow = app_state.workflow.clone();

    let app = build_router(app_state);
    start_server(app, &config).await?;

    info!("Waiting for outstanding notifications");
    workflow.drain_notifications().await;
    info!("Server stopped");
    Ok(())
}

async fn initialize_app_state(config: Arc<AppConfig>) -> anyhow::Result<AppState> {
    let store: Arc<dyn Store> = match config.storage_backend {
        StorageBackend::MongoDb => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL must be set")?;
            let db = get_db_client(url, &config.database_name)
                .await
                .context("connecting to MongoDB")?;
            Arc::new(MongoStore::new(db))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let gateway = Arc::new(RazorpayService::new(&config).context("building payment gateway")?);

    let notifier: Arc<dyn TicketNotifier> = match &config.smtp {
        Some(smtp) => {
            info!(host = %smtp.host, "Email notifications enabled");
            Arc::new(EmailNotifier::new(smtp).context("configuring SMTP")?)
        }
        None => {
            warn!("EMAIL_HOST/EMAIL_USER/EMAIL_PASS not set; confirmations are logged only");
            Arc::new(LogNotifier)
        }
    };

    let workflow = Arc::new(TicketWorkflow::new(store.clone(), gateway, notifier, &config));
    Ok(AppState::new(store, workflow, config))
}

fn build_router(app_state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    Router::new()
        .route("/", get(root_handler))
        .nest("/api", routes::api_routes())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(app_state)
}

async fn start_server(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid HOST/PORT {}:{}", config.host, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    info!("🚀 Server starting on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "service": "Bengaluru Bus System API",
        "health": "/api/health",
    }))
}
