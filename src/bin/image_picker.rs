use meme_composer::config::{ImagePickerConfig, ServerConfig, IMAGE_PICKER_PORT};
use meme_composer::{pickers, server, telemetry, Catalog};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init();

    let server_config = ServerConfig::from_env(IMAGE_PICKER_PORT)?;
    let config = ImagePickerConfig::from_env();
    tracing::info!(bucket = %config.bucket_name, "image bucket");

    let app = pickers::image_router(Catalog::images(&config.bucket_name));
    server::serve("image-picker", &server_config, app).await
}
