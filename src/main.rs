use std::path::PathBuf;

use anyhow::Context;
use serde_json::json;

const DATA_DIR_ENV: &str = "ASPIRE_DATA_DIR";

fn data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    dirs::data_dir()
        .map(|dir| dir.join("aspire"))
        .context("no platform data directory; set ASPIRE_DATA_DIR")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aspire_lib::init_logging();

    let data_dir = data_dir()?;
    log::info!("Aspire starting with data in {}", data_dir.display());
    let state = aspire_lib::AppState::open(&data_dir).await?;

    let report = state.progress.report().await;
    let alignment = state.store.alignment().await;
    let status = json!({
        "dataDir": data_dir,
        "llmEndpoint": state.settings.llm().endpoint,
        "progress": report,
        "alignment": {
            "overall": alignment.overall,
            "identity": alignment.identity.score,
            "wardrobe": alignment.wardrobe.score,
            "behavior": alignment.behavior.score,
            "updatedAt": alignment.updated_at,
        },
    });
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}
