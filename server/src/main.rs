use processor::BedrockChatProcessor;
use server::{AppState, get_app, settings::Settings};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    info!("Initializing Bedrock chat processor server");

    let settings = Settings::load("config")?;
    let processor = BedrockChatProcessor::from_session(settings.processor, &settings.aws).await?;

    let state = Arc::new(AppState {
        processor: Arc::new(processor),
    });
    let app = get_app(state.clone());

    info!("Routes configured, binding to {}:{}", settings.host, settings.port);
    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", settings.host, settings.port)).await?;
    info!("Server started successfully, listening for messages");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.processor.close().await?;
    info!("Processor closed");

    Ok(())
}
