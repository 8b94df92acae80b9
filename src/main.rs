//! Workflow Timeline Server - Binary Entry Point

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use workflow_timeline::api::{create_router, AppState, JwtAuth};
use workflow_timeline::timeline::TimelineService;
use workflow_timeline::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    let service = TimelineService::open(config.store_config())?;
    let secret_file = config.data_dir.join(JwtAuth::SECRET_FILE);
    let auth = JwtAuth::from_secret(config.jwt_secret.clone(), &secret_file)?;
    let state = Arc::new(AppState::new(Arc::new(service), Arc::new(auth)));

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;

    tracing::info!(
        version = workflow_timeline::VERSION,
        addr = %config.bind_addr(),
        data_dir = %config.data_dir.display(),
        "timeline server listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("timeline server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
