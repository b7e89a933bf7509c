use meme_composer::config::{CompositorConfig, ServerConfig, MEMINATOR_PORT};
use meme_composer::{compositor, server, telemetry, CompositorState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let server_config = ServerConfig::from_env(MEMINATOR_PORT)?;
    let config = CompositorConfig::from_env()?;
    tracing::info!(work_dir = %config.work_dir.display(), renderer = %config.convert_bin, "meminator config");

    let app = compositor::router(CompositorState::from_config(&config)?);
    server::serve("meminator", &server_config, app).await
}
