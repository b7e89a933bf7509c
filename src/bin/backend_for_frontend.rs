use meme_composer::config::{OrchestratorConfig, ServerConfig, ORCHESTRATOR_PORT};
use meme_composer::{orchestrator, server, telemetry, OrchestratorState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let server_config = ServerConfig::from_env(ORCHESTRATOR_PORT)?;
    let config = OrchestratorConfig::from_env()?;
    tracing::info!(
        phrase_picker = %config.phrase_picker_url,
        image_picker = %config.image_picker_url,
        meminator = %config.meminator_url,
        "downstream services"
    );

    let app = orchestrator::router(OrchestratorState::new(&config)?);
    server::serve("backend-for-frontend", &server_config, app).await
}
