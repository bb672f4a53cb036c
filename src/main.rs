//! Omics Uploadr - resumable chunked dataset uploader
//!
//! Uploads a local file to the platform in server-acknowledged chunks and
//! finalizes it with an MD5 checksum.

use anyhow::Context;
use clap::{Parser, Subcommand};
use omics_uploadr::api::ApiClient;
use omics_uploadr::config::Config;
use omics_uploadr::upload::{checksum, ChunkedUploader, CompletionForm, FileSource, UploadOptions};
use omics_uploadr::{metrics, telemetry};
use std::path::PathBuf;
use tracing::info;

/// Omics Uploadr - resumable chunked uploads with MD5 completion
#[derive(Parser, Debug)]
#[command(name = "omics-uploadr")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file and print the created record
    Upload {
        /// File to upload
        file: PathBuf,

        /// Extra completion form field (repeatable)
        #[arg(short, long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,

        /// Override the configured chunk size in bytes
        #[arg(long)]
        chunk_size: Option<u64>,
    },

    /// Print the MD5 the uploader would send for a file
    Checksum {
        file: PathBuf,

        /// Read size in bytes
        #[arg(long, default_value_t = omics_uploadr::config::DEFAULT_CHUNK_SIZE)]
        chunk_size: u64,
    },
}

fn parse_field(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    telemetry::init_subscriber(&args.log_level, args.json_logs)?;

    info!("Starting Omics Uploadr v{}", omics_uploadr::VERSION);

    match args.command {
        Command::Checksum { file, chunk_size } => {
            let source = FileSource::open(&file)
                .await
                .with_context(|| format!("opening {}", file.display()))?;
            let digest = checksum::md5_hex(&source, chunk_size).await?;
            println!("{}  {}", digest, file.display());
        }
        Command::Upload {
            file,
            fields,
            chunk_size,
        } => {
            let config = Config::load(&args.config)
                .with_context(|| format!("loading {}", args.config.display()))?;
            info!("Loaded configuration from {:?}", args.config);

            let client = ApiClient::new(&config.api)?;
            let mut options = UploadOptions::from(&config.upload);
            if let Some(size) = chunk_size {
                options.chunk_size = size;
            }
            let uploader = ChunkedUploader::new(client, options)?;

            let form: CompletionForm = fields.into_iter().collect();
            let progress = |percent: u8| info!(percent, "Upload progress");

            let record: serde_json::Value =
                uploader.upload_path(&file, form, Some(&progress)).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);

            if config.metrics.enabled {
                eprint!("{}", metrics::render());
            }
        }
    }

    Ok(())
}
