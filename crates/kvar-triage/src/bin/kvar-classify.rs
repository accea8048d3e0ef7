//! kvar-classify: classify one issue report from the command line.
//!
//! Prints the triage outcome as JSON on stdout; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use kvar_triage::{
    deterministic_outcome, ClassificationRequest, ImageBlob, ImageDescriptionCache, KvarConfig,
    TriageCoordinator,
};

#[derive(Parser)]
#[command(name = "kvar-classify")]
#[command(author, version, about = "Classify a building maintenance issue report")]
struct Cli {
    /// Short title of the report
    #[arg(short, long)]
    title: Option<String>,

    /// Free-text description
    #[arg(short, long)]
    description: Option<String>,

    /// Room selected in the form (e.g. "kupaonica")
    #[arg(short, long)]
    room: Option<String>,

    /// Attached photo (repeatable)
    #[arg(short, long = "image")]
    images: Vec<PathBuf>,

    /// Re-run image analysis even if the text is specific enough
    #[arg(long)]
    force_reanalysis: bool,

    /// Use the deterministic keyword rules only, without calling any service
    #[arg(long)]
    offline: bool,

    /// TOML file with [inference] and [triage] tables
    #[arg(short, long, env = "KVAR_CONFIG")]
    config: Option<PathBuf>,
}

fn init_logging() {
    // KVAR_LOG_FORMAT - "json" or "text" (default: "text")
    // RUST_LOG        - standard env filter (default: "kvar=info")
    let log_format = std::env::var("KVAR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "kvar=info".into());

    let registry = tracing_subscriber::registry().with(env_filter);
    if log_format == "json" {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn read_image(path: &Path) -> anyhow::Result<ImageBlob> {
    let data =
        std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("image")
        .to_string();
    Ok(ImageBlob::new(name, data))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();

    let mut request = ClassificationRequest::new();
    request.title = cli.title;
    request.description = cli.description;
    request.room = cli.room;
    request.force_reanalysis = cli.force_reanalysis;
    for path in &cli.images {
        request.images.push(read_image(path)?);
    }
    request.validate()?;

    let outcome = if cli.offline {
        info!("Offline mode, using deterministic rules");
        deterministic_outcome(&request.combined_text(), request.room_hint())
    } else {
        let config = match &cli.config {
            Some(path) => KvarConfig::from_file(path)?,
            None => KvarConfig::from_env(),
        };
        let analyzers = config.inference.build()?;
        let coordinator = TriageCoordinator::from_analyzers(analyzers, &config.triage);
        coordinator
            .triage(&request, &ImageDescriptionCache::new())
            .await?
    };

    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
