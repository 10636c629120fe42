//! Validate every engine in a config file, or a single URL template.
//!
//! ```text
//! cargo run --example validate_endpoint -- config.toml
//! cargo run --example validate_endpoint -- 'http://localhost:5000/tts?text={{text}}'
//! ```

use tracing::info;
use tracing_subscriber::EnvFilter;
use voxbridge_core::{
    build_engine, default_config_path, EngineSession, EngineSpec, EnglishLocalizer, VoxConfig,
};

const SAMPLE_TEXT: &str = "Hello from voxbridge.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let arg = std::env::args().nth(1);
    let (config, specs) = match arg.as_deref() {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => {
            let config = VoxConfig::default();
            let spec: EngineSpec = toml::from_str(&format!(
                "type = \"http\"\n[request]\nurl = {}\n",
                toml::Value::String(url.to_string())
            ))?;
            (config, vec![spec])
        }
        Some(path) => {
            let config = VoxConfig::load(path)?;
            let specs = config.engines.clone();
            (config, specs)
        }
        None => {
            let config = VoxConfig::load_default()?;
            info!("Using configuration from {:?}", default_config_path());
            let specs = config.engines.clone();
            (config, specs)
        }
    };

    if specs.is_empty() {
        anyhow::bail!("no engines configured");
    }

    for spec in &specs {
        let engine = build_engine(spec, &config)?;
        let session = EngineSession::new(engine, &config);
        println!("[{}] {}", session.type_tag(), session.bottom_content().await);
        println!("    {}", session.description(&EnglishLocalizer).await);

        let outcome = session.validate(SAMPLE_TEXT).await;
        println!("{}", outcome.to_json()?);
        session.destroy().await;
    }
    Ok(())
}
