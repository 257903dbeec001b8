//! Spurhund command-line interface.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use spurhund::types::{ContentHandle, Source};
use spurhund::{Classifier, IngestConfig, Ingestor};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "spurhund")]
#[command(about = "Classify byte payloads and ingest remote or inline content", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (.toml, .yaml, .yml or .json). Defaults to a discovered spurhund.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify local files from their contents
    Classify {
        /// Files to classify
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Ingest remote targets or inline `data:` descriptors
    Ingest {
        /// URLs, `data:` descriptors or bare base64 blobs
        #[arg(required = true)]
        sources: Vec<String>,
    },
}

fn load_config(path: Option<&Path>) -> Result<IngestConfig> {
    match path {
        Some(path) => IngestConfig::from_file(path).with_context(|| format!("loading config {}", path.display())),
        None => Ok(IngestConfig::discover()?.unwrap_or_default()),
    }
}

fn render_classification(format: OutputFormat, path: &Path, mime_type: &str) -> String {
    match format {
        OutputFormat::Text => format!("{}: {}", path.display(), mime_type),
        OutputFormat::Json => json!({ "path": path.display().to_string(), "mime_type": mime_type }).to_string(),
    }
}

fn render_ingestion(format: OutputFormat, source: &Source, result: &spurhund::Result<ContentHandle>) -> String {
    let described = source.describe();
    match (format, result) {
        (OutputFormat::Text, Ok(ContentHandle::Inline(inline))) => {
            format!("{}\t{}\tinline", described, inline.mime_type)
        }
        (OutputFormat::Text, Ok(ContentHandle::Managed(managed))) => format!(
            "{}\t{}\tmanaged {} ({} bytes)",
            described, managed.mime_type, managed.token, managed.size_bytes
        ),
        (OutputFormat::Text, Err(e)) => format!("{}\terror\t{}", described, e),
        (OutputFormat::Json, Ok(handle)) => json!({ "source": described, "handle": handle }).to_string(),
        (OutputFormat::Json, Err(e)) => json!({ "source": described, "error": e.to_string() }).to_string(),
    }
}

fn classify_files(config: &IngestConfig, format: OutputFormat, files: &[PathBuf]) -> Result<bool> {
    let classifier = Classifier::new(config.use_infer_detector);
    let mut ok = true;

    for path in files {
        match std::fs::read(path) {
            Ok(bytes) => println!("{}", render_classification(format, path, &classifier.classify(&bytes))),
            Err(e) => {
                ok = false;
                eprintln!("{}: {}", path.display(), e);
            }
        }
    }

    Ok(ok)
}

async fn ingest_sources(config: IngestConfig, format: OutputFormat, raw: Vec<String>) -> Result<bool> {
    let ingestor = Ingestor::new(config)?;
    let sources: Vec<Source> = raw.iter().map(|s| Source::parse(s)).collect();

    let results = ingestor.batch_ingest(sources.clone()).await?;
    let mut ok = true;
    for (source, result) in sources.iter().zip(&results) {
        if result.is_err() {
            ok = false;
        }
        println!("{}", render_ingestion(format, source, result));
    }

    let released = ingestor.manager().release_all();
    tracing::debug!(released, "session finished");

    Ok(ok)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    config.validate()?;

    let ok = match cli.command {
        Commands::Classify { files } => classify_files(&config, cli.format, &files)?,
        Commands::Ingest { sources } => ingest_sources(config, cli.format, sources).await?,
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
