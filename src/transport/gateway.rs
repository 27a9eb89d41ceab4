use crate::error::{Error, RemoteWriteSnafu, Result, SourceUnreadableSnafu, Step};
use crate::transport::constants::{
    DEFAULT_BUFFER_SIZE, PROGRESS_UPDATE_INTERVAL, WRITE_BLOCK_SIZE,
};
use crate::transport::utils::error::StepContext;
use crate::transport::utils::path::{ensure_trailing_slash, normalize_remote_path, staging_path};
use crate::transport::utils::progress::ConsoleProgressReporter;
use crate::transport::{EntryKind, RemoteEntry, Transport, TransportConfig};
use futures::TryStreamExt;
use opendal::{EntryMode, Operator};
use snafu::{ResultExt, ensure};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, BufReader};

/// Talks to the filesystem through an OpenDAL operator: the WebHDFS REST
/// gateway in production, a local directory for development.
#[derive(Debug, Clone)]
pub struct GatewayTransport {
    operator: Operator,
    name: &'static str,
}

impl GatewayTransport {
    /// Wrap an already built operator.
    pub fn new(operator: Operator, name: &'static str) -> Self {
        Self { operator, name }
    }

    pub fn from_config(config: &TransportConfig) -> Result<Self> {
        let (operator, name) = Self::build_operator(config)?;
        Ok(Self::new(operator, name))
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    fn build_operator(config: &TransportConfig) -> Result<(Operator, &'static str)> {
        match config {
            TransportConfig::WebHdfs {
                endpoint,
                user,
                atomic_dir,
            } => {
                #[cfg(feature = "webhdfs")]
                {
                    // OpenDAL resolves the block directory against the root itself.
                    let block_dir = ensure_trailing_slash(atomic_dir.trim_start_matches('/'));
                    let builder = opendal::services::Webhdfs::default()
                        .root("/")
                        .endpoint(endpoint)
                        .user_name(user)
                        .atomic_write_dir(&block_dir);
                    let operator = Operator::new(builder)
                        .at_step(Step::Probe, "webhdfs")?
                        .finish();
                    Ok((operator, "webhdfs"))
                }

                #[cfg(not(feature = "webhdfs"))]
                {
                    let _ = (endpoint, user, atomic_dir);
                    Err(Error::UnsupportedTransport {
                        transport: "webhdfs (feature disabled)".to_string(),
                    })
                }
            }
            TransportConfig::Fs { root } => {
                #[cfg(feature = "fs")]
                {
                    let builder = opendal::services::Fs::default().root(root);
                    let operator = Operator::new(builder).at_step(Step::Probe, "fs")?.finish();
                    Ok((operator, "fs"))
                }

                #[cfg(not(feature = "fs"))]
                {
                    let _ = root;
                    Err(Error::UnsupportedTransport {
                        transport: "fs (feature disabled)".to_string(),
                    })
                }
            }
            TransportConfig::Shell(_) => Err(Error::UnsupportedTransport {
                transport: "shell is not an OpenDAL service".to_string(),
            }),
        }
    }

    /// Stream the local file into `target` with progress reporting.
    ///
    /// With `block_size` set the writer hands the backend blocks of exactly
    /// that many bytes (the last one may be shorter).
    async fn write_streaming(
        &self,
        source: &Path,
        target: &str,
        block_size: Option<usize>,
    ) -> Result<u64> {
        let file = fs::File::open(source)
            .await
            .context(SourceUnreadableSnafu { path: source })?;
        let file_size = file
            .metadata()
            .await
            .context(SourceUnreadableSnafu { path: source })?
            .len();
        let mut reader = BufReader::new(file);
        let mut buffer = vec![0u8; DEFAULT_BUFFER_SIZE];
        let mut total_bytes = 0u64;
        let mut writer = match block_size {
            Some(size) => self.operator.writer_with(target).chunk(size).await,
            None => self.operator.writer(target).await,
        }
        .at_step(Step::Transfer, self.name)?;

        let reporter = ConsoleProgressReporter::new(
            format!("Uploading {}", source.display()),
            file_size,
            DEFAULT_BUFFER_SIZE as u64 * PROGRESS_UPDATE_INTERVAL,
        );

        loop {
            let bytes_read = match reader.read(&mut buffer).await {
                Ok(n) => n,
                Err(e) => {
                    let _ = writer.abort().await;
                    return Err(Error::SourceUnreadable {
                        path: source.to_path_buf(),
                        source: e,
                    });
                }
            };
            if bytes_read == 0 {
                break;
            }
            if let Err(e) = writer.write(buffer[..bytes_read].to_vec()).await {
                let _ = writer.abort().await;
                return Err(e).at_step(Step::Transfer, self.name);
            }
            total_bytes += bytes_read as u64;
            reporter.maybe_report(total_bytes);
        }
        writer.close().await.at_step(Step::Transfer, self.name)?;
        reporter.finish();
        Ok(total_bytes)
    }

    /// Write to `<destination>._COPYING_` and rename it over `destination`.
    async fn put_renamed(&self, source: &Path, destination: &str, replace: bool) -> Result<()> {
        let staged = staging_path(destination);
        if let Err(e) = self.write_streaming(source, &staged, None).await {
            self.discard(&staged).await;
            return Err(e);
        }

        let existing = self
            .stat(destination)
            .await
            .map_err(|e| e.with_step(Step::Transfer))?;
        if !replace && existing.is_some() {
            self.discard(&staged).await;
            return Err(Error::DestinationExists {
                path: destination.to_string(),
            });
        }

        if let Err(e) = self.operator.rename(&staged, destination).await {
            self.discard(&staged).await;
            return Err(e).at_step(Step::Transfer, self.name);
        }
        Ok(())
    }

    async fn discard(&self, path: &str) {
        if let Err(e) = self.operator.delete(path).await {
            log::warn!("failed to remove staging object {path}: {e}");
        }
    }
}

impl Transport for GatewayTransport {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn probe(&self) -> Result<()> {
        // Root stat is answered locally by OpenDAL; listing forces a round trip.
        let mut lister = self
            .operator
            .lister("/")
            .await
            .at_step(Step::Probe, self.name)?;
        lister.try_next().await.at_step(Step::Probe, self.name)?;
        log::info!("{} gateway is reachable", self.name);
        Ok(())
    }

    async fn ensure_directory(&self, path: &str) -> Result<()> {
        let dir = normalize_remote_path(path);
        if dir == "/" {
            return Ok(());
        }
        let dir = ensure_trailing_slash(&dir);

        match self.operator.create_dir(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == opendal::ErrorKind::AlreadyExists => {
                let existing = self
                    .stat(&dir)
                    .await
                    .map_err(|e| e.with_step(Step::EnsureDirectory))?;
                match existing {
                    Some(entry) if entry.kind == EntryKind::Dir => Ok(()),
                    _ => Err(Error::RemoteWrite {
                        step: Step::EnsureDirectory,
                        message: format!("'{path}' exists and is not a directory"),
                    }),
                }
            }
            Err(e) => Err(e).at_step(Step::EnsureDirectory, self.name),
        }
    }

    async fn put(&self, source: &Path, destination: &str, replace: bool) -> Result<()> {
        let capability = self.operator.info().full_capability();
        if capability.rename {
            return self.put_renamed(source, destination, replace).await;
        }

        let existing = self
            .stat(destination)
            .await
            .map_err(|e| e.with_step(Step::Transfer))?;
        if !replace && existing.is_some() {
            return Err(Error::DestinationExists {
                path: destination.to_string(),
            });
        }

        let file_size = fs::metadata(source)
            .await
            .context(SourceUnreadableSnafu { path: source })?
            .len();
        if capability.write_can_multi && file_size >= 2 {
            // Blocks land in the atomic write directory; closing the writer
            // concatenates them and renames the result over `destination`.
            let block_size = block_size_for(file_size);
            log::debug!(
                "{} writing {destination} in blocks of {block_size} bytes",
                self.name
            );
            self.write_streaming(source, destination, Some(block_size))
                .await?;
            return Ok(());
        }

        // A single-shot write lands on the destination name directly.
        ensure!(
            existing.is_none(),
            RemoteWriteSnafu {
                step: Step::Transfer,
                message: format!(
                    "'{destination}' exists and {} cannot replace it without exposing a partial file",
                    self.name
                ),
            }
        );
        self.write_streaming(source, destination, None).await?;
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>> {
        let meta = match self.operator.stat(path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => {
                if path.ends_with('/') {
                    return Ok(None);
                }
                // Directories may only answer to their slash-terminated form.
                match self.operator.stat(&ensure_trailing_slash(path)).await {
                    Ok(meta) => meta,
                    Err(e) if e.kind() == opendal::ErrorKind::NotFound => return Ok(None),
                    Err(e) => return Err(e).at_step(Step::Verify, self.name),
                }
            }
            Err(e) => return Err(e).at_step(Step::Verify, self.name),
        };

        let kind = match meta.mode() {
            EntryMode::FILE => EntryKind::File,
            EntryMode::DIR => EntryKind::Dir,
            _ => EntryKind::Other,
        };
        Ok(Some(RemoteEntry {
            path: path.to_string(),
            kind,
            size: meta.content_length(),
        }))
    }
}

/// Block size that splits a file of `file_size` bytes into at least two blocks.
fn block_size_for(file_size: u64) -> usize {
    let half = usize::try_from(file_size.div_ceil(2)).unwrap_or(WRITE_BLOCK_SIZE);
    half.clamp(1, WRITE_BLOCK_SIZE)
}
