//! Inkboard WebSocket Relay Server

use inkboard_server::{RelayConfig, config::DEFAULT_LOG_FILTER};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = RelayConfig::from_env()?;
    inkboard_server::serve(config).await?;
    Ok(())
}
