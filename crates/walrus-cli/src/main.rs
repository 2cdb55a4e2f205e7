//! Walrus CLI - store and read blobs through a Walrus publisher and aggregator
//!
//! Reads go through the local blob cache; configuration comes from the
//! `WALRUS_*` environment variables, with flags taking precedence.

mod error;

use crate::error::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use walrus_client::{ClientConfig, ProgressFn, UploadOptions, WalrusClient};

#[derive(Parser, Debug)]
#[command(name = "walrus", version, about = "Walrus blob store client")]
struct Args {
    /// Publisher base URL (overrides WALRUS_PUBLISHER_URL)
    #[arg(long, global = true)]
    publisher: Option<String>,

    /// Aggregator base URL (overrides WALRUS_AGGREGATOR_URL)
    #[arg(long, global = true)]
    aggregator: Option<String>,

    /// Cache directory (overrides WALRUS_CACHE_DIR)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read a blob by blob id
    Get {
        blob_id: String,

        /// Write the blob to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Always fetch from the aggregator
        #[arg(long)]
        no_cache: bool,
    },

    /// Store a file as a blob
    Put {
        file: PathBuf,

        /// Number of epochs ahead of the current one to store the blob
        #[arg(long)]
        epochs: Option<u32>,

        /// Create a deletable blob instead of a permanent one
        #[arg(long)]
        deletable: bool,

        /// Storage encoding type
        #[arg(long)]
        encoding_type: Option<String>,

        /// Sui address that receives the blob object
        #[arg(long)]
        send_object_to: Option<String>,
    },

    /// Show the aggregator's metadata for a blob
    Head { blob_id: String },

    /// Read a blob by the id of its Sui object
    Object {
        object_id: String,

        /// Write the blob to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

impl Args {
    fn client_config(&self, mut config: ClientConfig) -> ClientConfig {
        if let Some(publisher) = &self.publisher {
            config.publisher_url.clone_from(publisher);
        }
        if let Some(aggregator) = &self.aggregator {
            config.aggregator_url.clone_from(aggregator);
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.dir = Some(dir.clone());
        }
        config
    }
}

fn upload_options(
    epochs: Option<u32>,
    deletable: bool,
    encoding_type: Option<String>,
    send_object_to: Option<String>,
) -> UploadOptions {
    UploadOptions {
        encoding_type,
        epochs,
        deletable: deletable.then_some(true),
        send_object_to,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries blob data
    let env_filter = EnvFilter::from_default_env().add_directive("walrus=info".parse()?);

    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    };

    let args = Args::parse();
    let config = args.client_config(ClientConfig::from_env());
    info!(
        publisher = %config.publisher_url,
        aggregator = %config.aggregator_url,
        cache_dir = ?config.cache.dir,
        policy = ?config.cache.policy,
        "Starting Walrus client"
    );

    let client = WalrusClient::new(config).await?;
    let result = run(&client, args.command).await;
    client.shutdown().await;
    result
}

async fn run(client: &WalrusClient, command: Command) -> Result<()> {
    match command {
        Command::Get {
            blob_id,
            output,
            no_cache,
        } => {
            match (output, no_cache) {
                (Some(path), false) => {
                    let progress: ProgressFn = Arc::new(|so_far: u64, total: u64| {
                        debug!(so_far, total, "Download progress");
                    });
                    client
                        .get_blob_as_file(&blob_id, &path, Some(progress))
                        .await?;
                    info!(blob_id = %blob_id, path = ?path, "Saved blob");
                }
                (output, no_cache) => {
                    let data = client.read(&blob_id, no_cache).await?;
                    write_output(output, &data).await?;
                }
            }
            debug!(stats = ?client.cache().stats().await, "Cache statistics");
        }
        Command::Put {
            file,
            epochs,
            deletable,
            encoding_type,
            send_object_to,
        } => {
            let options = upload_options(epochs, deletable, encoding_type, send_object_to);
            let response = client.put_blob_from_file(&file, &options).await?;
            if let Some(blob_id) = response.blob_id() {
                info!(blob_id, "Stored blob");
            }
            println!("{}", serde_json::to_string_pretty(response.as_json())?);
        }
        Command::Head { blob_id } => {
            let metadata = client.get_blob_metadata(&blob_id).await?;
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        }
        Command::Object { object_id, output } => {
            let data = client.get_blob_by_object_id(&object_id).await?;
            write_output(output, &data).await?;
        }
    }
    Ok(())
}

async fn write_output(output: Option<PathBuf>, data: &[u8]) -> Result<()> {
    match output {
        Some(path) => tokio::fs::write(&path, data).await?,
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(data).await?;
            stdout.flush().await?;
        }
    }
    Ok(())
}
