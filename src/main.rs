use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transcript_archive::config::{
    ArchiveConfig, DEFAULT_ASSETS_DIR, DEFAULT_INPUT, DEFAULT_OUTPUT, DEFAULT_SCRIPT,
    DEFAULT_STYLESHEET, DEFAULT_TITLE,
};
use transcript_archive::compile;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Title shown in the browser tab.
    #[arg(short, long, default_value = DEFAULT_TITLE)]
    title: String,

    /// Scraped transcript HTML.
    #[arg(short, long, default_value = DEFAULT_INPUT)]
    src: PathBuf,

    /// Archive to write; must differ from --src.
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    out: PathBuf,

    /// Local woff2 embedded as the monospace font instead of fetching one.
    #[arg(long)]
    monofont: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_STYLESHEET)]
    css: PathBuf,

    #[arg(long, default_value = DEFAULT_SCRIPT)]
    js: PathBuf,

    /// Asset cache directory, reused across runs.
    #[arg(long, default_value = DEFAULT_ASSETS_DIR)]
    assets_dir: PathBuf,

    /// Per-request fetch timeout in seconds (none by default).
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl Args {
    fn into_config(self) -> ArchiveConfig {
        ArchiveConfig {
            title: self.title,
            input: self.src,
            output: self.out,
            mono_font: self.monofont,
            stylesheet: self.css,
            script: self.js,
            assets_dir: self.assets_dir,
            fetch_timeout: self.timeout_secs.map(Duration::from_secs),
            ..ArchiveConfig::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("transcript_archive=info")),
        )
        .init();

    let config = Args::parse().into_config();
    let report = compile(&config)
        .await
        .with_context(|| format!("compile {}", config.input.display()))?;

    info!(
        turns = report.turns,
        fetches = report.fetches,
        warnings = report.warnings,
        "saved {}",
        config.output.display()
    );
    Ok(())
}
