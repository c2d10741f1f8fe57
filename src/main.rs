// src/main.rs

use anyhow::Result;
use referendum_map::{
    config::{PipelineConfig, DEFAULT_CONFIG_FILE},
    pipeline,
    report::format_results,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();
    info!("startup");

    // ─── 2) configure paths ──────────────────────────────────────────
    let config = PipelineConfig::load_or_default(DEFAULT_CONFIG_FILE)?;

    // ─── 3) run the pipeline ─────────────────────────────────────────
    let output = pipeline::run(&config)?;

    // ─── 4) report ───────────────────────────────────────────────────
    println!("{}", format_results(&output.results)?);
    info!(map = %config.map_path.display(), "map written");

    Ok(())
}
