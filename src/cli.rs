use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::StageConfig;
use crate::error::{Error, Result};
use crate::transport::utils::OutputFormat;
use crate::transport::utils::path::{build_remote_path, normalize_remote_path};
use crate::transport::utils::size::format_size;
use crate::transport::{EntryKind, RemoteEntry, Transport, TransportHandle};
use crate::uploader::{OverwritePolicy, TransferRequest, TransferResult, Uploader};

#[derive(Parser, Debug)]
#[command(
    name = "hdfs-stage",
    version,
    about = "Stage a local file into a container-hosted HDFS cluster and verify it landed",
    long_about = "Transport and cluster settings are read from the environment: \
                  STAGE_TRANSPORT (shell|webhdfs|fs), STAGE_CONTAINER, STAGE_CONTAINER_TOOL, \
                  STAGE_WEBHDFS_ENDPOINT, STAGE_WEBHDFS_ATOMIC_DIR, STAGE_HDFS_USER, \
                  STAGE_FS_ROOT, STAGE_BASE_DIR, STAGE_TIMEOUT_SECS"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Upload a local file and verify the remote copy
    #[command(visible_alias = "put")]
    Upload(UploadArgs),

    /// Create a remote directory (and parents) if it does not exist
    Mkdir {
        /// Remote directory, absolute or relative to STAGE_BASE_DIR
        path: String,
    },

    /// Show type and size of a remote path
    Stat {
        /// Remote path, absolute or relative to STAGE_BASE_DIR
        path: String,
        /// Print a single JSON object
        #[arg(long)]
        json: bool,
    },

    /// Check that the configured transport can reach HDFS
    Check,
}

#[derive(clap::Args, Debug)]
pub struct UploadArgs {
    /// Local file to upload
    pub source: PathBuf,

    /// Remote file path; a trailing '/' or omission keeps the source file name
    pub destination: Option<String>,

    /// What to do when the destination already exists
    #[arg(
        long,
        value_enum,
        env = "STAGE_OVERWRITE",
        default_value_t = OverwritePolicy::Replace
    )]
    pub overwrite: OverwritePolicy,

    /// Print the result as a single JSON object
    #[arg(long)]
    pub json: bool,
}

/// Resolve a remote path given on the command line against the base directory.
fn resolve_remote(base_dir: &str, path: &str) -> String {
    if path.starts_with('/') {
        normalize_remote_path(path)
    } else {
        normalize_remote_path(&build_remote_path(base_dir, path))
    }
}

pub async fn run(args: Args, config: StageConfig) -> Result<()> {
    let transport = TransportHandle::connect(&config.transport)?;
    let uploader = Uploader::new(transport, config.timeout);

    match args.command {
        Command::Upload(upload) => run_upload(&uploader, &config, upload).await,
        Command::Mkdir { path } => {
            let path = resolve_remote(&config.base_dir, &path);
            uploader.ensure_directory(&path).await?;
            println!("Directory ready: {path}");
            Ok(())
        }
        Command::Stat { path, json } => {
            let path = resolve_remote(&config.base_dir, &path);
            let entry = uploader
                .stat(&path)
                .await?
                .ok_or(Error::RemotePathNotFound { path })?;
            print_entry(&entry, OutputFormat::from_json_flag(json));
            Ok(())
        }
        Command::Check => {
            uploader.probe().await?;
            println!("✅ {} transport is ready", uploader.transport().name());
            Ok(())
        }
    }
}

async fn run_upload(
    uploader: &Uploader<TransportHandle>,
    config: &StageConfig,
    args: UploadArgs,
) -> Result<()> {
    let request = TransferRequest::resolve(
        &args.source,
        args.destination.as_deref(),
        &config.base_dir,
        args.overwrite,
    )?;
    let result = uploader.upload(&request).await;

    match OutputFormat::from_json_flag(args.json) {
        OutputFormat::Json => println!("{}", result.to_json(request.destination())),
        OutputFormat::Human => print_result(&request, &result),
    }

    match result.error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_result(request: &TransferRequest, result: &TransferResult) {
    if !result.success {
        return;
    }
    let size = result.remote_size.unwrap_or_default();
    if result.transferred {
        println!(
            "✅ Upload: {} → {}",
            request.source().display(),
            request.destination()
        );
    } else {
        println!(
            "Skipped upload: {} already exists",
            request.destination()
        );
    }
    println!(
        "✅ Verified: {} ({size} bytes, {})",
        request.destination(),
        format_size(size)
    );
}

fn print_entry(entry: &RemoteEntry, format: OutputFormat) {
    match format {
        OutputFormat::Json => match serde_json::to_string(entry) {
            Ok(line) => println!("{line}"),
            Err(e) => log::warn!("failed to render stat output: {e}"),
        },
        OutputFormat::Human => {
            let kind = match entry.kind {
                EntryKind::File => "file",
                EntryKind::Dir => "dir",
                EntryKind::Other => "other",
            };
            println!("path={}", entry.path);
            println!("type={kind}");
            println!("size={}", entry.size);
        }
    }
}
