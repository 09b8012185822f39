use duel::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), DuelError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::load(ServerConfig::path_from_env().as_deref())?;
    let server = DuelServer::builder().config(config).build().await?;
    tracing::info!(addr = ?server.local_addr().ok(), relay = ?server.relay_backend(), "listening");
    server.run().await
}
