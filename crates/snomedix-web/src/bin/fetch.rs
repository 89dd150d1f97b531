//! Download the encoder and tagger models into their configured local
//! directories so the server can start offline.
//!
//! Run with: cargo run -p snomedix-web --bin snomedix-fetch

use anyhow::Context;
use snomedix_embed::ModelFiles;
use snomedix_web::config::{Config, TaggerKind};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::load()?;

    let mut models = vec![(config.encoder.model_id.clone(), config.encoder.local_dir.clone())];
    if config.tagger.kind == TaggerKind::Bert {
        models.push((config.tagger.model_id.clone(), config.tagger.local_dir.clone()));
    }

    for (model_id, local_dir) in models {
        let files = ModelFiles::resolve(model_id.clone(), local_dir)
            .await
            .with_context(|| format!("Fetching {}", model_id))?;
        info!("{} ready: {:?}", model_id, files.weights);
    }

    Ok(())
}
