//! Translation service binary.

use translation_service::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;

    translation_service::start_server(config).await?;

    Ok(())
}
