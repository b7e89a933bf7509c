use meme_composer::config::{ServerConfig, PHRASE_PICKER_PORT};
use meme_composer::{pickers, server, telemetry, Catalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let server_config = ServerConfig::from_env(PHRASE_PICKER_PORT)?;
    let app = pickers::phrase_router(Catalog::phrases());
    server::serve("phrase-picker", &server_config, app).await
}
