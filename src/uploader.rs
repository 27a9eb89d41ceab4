use crate::error::{
    Error, ErrorKind, InvalidDestinationSnafu, RemoteWriteSnafu, Result, SourceNotAFileSnafu,
    SourceNotFoundSnafu, SourceUnreadableSnafu, Step,
};
use crate::transport::utils::path::{
    has_dot_segments, normalize_remote_path, parent_dir, resolve_destination,
};
use crate::transport::{EntryKind, RemoteEntry, Transport};
use serde::Serialize;
use snafu::{ResultExt, ensure};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do when the destination already holds an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum OverwritePolicy {
    /// Refuse to touch an existing destination.
    Fail,
    /// Swap the existing object for the new one.
    #[default]
    Replace,
    /// Keep the existing object and only verify it.
    Skip,
}

/// One file to stage. Built once per invocation and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    source: PathBuf,
    destination: String,
    overwrite: OverwritePolicy,
}

impl TransferRequest {
    /// Create a request for an absolute remote `destination` file path.
    pub fn new(
        source: impl Into<PathBuf>,
        destination: &str,
        overwrite: OverwritePolicy,
    ) -> Result<Self> {
        let normalized = normalize_remote_path(destination);
        ensure!(
            destination.starts_with('/')
                && !destination.ends_with('/')
                && normalized != "/"
                && !has_dot_segments(destination),
            InvalidDestinationSnafu { path: destination }
        );
        Ok(Self {
            source: source.into(),
            destination: normalized,
            overwrite,
        })
    }

    /// Create a request whose destination may be omitted, relative to
    /// `base_dir`, or a directory ending in '/'.
    pub fn resolve(
        source: impl Into<PathBuf>,
        destination: Option<&str>,
        base_dir: &str,
        overwrite: OverwritePolicy,
    ) -> Result<Self> {
        let source = source.into();
        let file_name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let destination = resolve_destination(base_dir, destination, &file_name)?;
        Self::new(source, &destination, overwrite)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    pub fn overwrite(&self) -> OverwritePolicy {
        self.overwrite
    }
}

/// How the transfer step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred,
    Skipped,
}

/// Outcome of one [`Uploader::upload`] call.
///
/// `success` is only ever set after the remote object was stat'ed
/// independently and matched the source size.
#[derive(Debug)]
pub struct TransferResult {
    pub success: bool,
    pub remote_size: Option<u64>,
    pub transferred: bool,
    pub error: Option<Error>,
}

#[derive(Serialize)]
struct TransferReport<'a> {
    success: bool,
    remote_size: Option<u64>,
    transferred: bool,
    error_kind: Option<ErrorKind>,
    error: Option<String>,
    destination: &'a str,
}

impl TransferResult {
    fn verified(remote_size: u64, transferred: bool) -> Self {
        Self {
            success: true,
            remote_size: Some(remote_size),
            transferred,
            error: None,
        }
    }

    fn failed(error: Error, transferred: bool) -> Self {
        let remote_size = match &error {
            Error::VerificationMismatch { actual, .. } => *actual,
            _ => None,
        };
        Self {
            success: false,
            remote_size,
            transferred,
            error: Some(error),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    /// Single-line JSON rendering for machine consumers.
    pub fn to_json(&self, destination: &str) -> String {
        let report = TransferReport {
            success: self.success,
            remote_size: self.remote_size,
            transferred: self.transferred,
            error_kind: self.error_kind(),
            error: self.error.as_ref().map(|e| e.to_string()),
            destination,
        };
        serde_json::to_string(&report).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Check that `path` is a readable regular file and return its size.
pub async fn inspect_source(path: &Path) -> Result<u64> {
    let meta = match tokio::fs::metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return SourceNotFoundSnafu { path }.fail();
        }
        Err(e) => return Err(e).context(SourceUnreadableSnafu { path }),
    };
    ensure!(meta.is_file(), SourceNotAFileSnafu { path });
    tokio::fs::File::open(path)
        .await
        .context(SourceUnreadableSnafu { path })?;
    Ok(meta.len())
}

/// Moves one local file into the cluster through a [`Transport`] and
/// confirms it landed.
pub struct Uploader<T> {
    transport: T,
    timeout: Duration,
}

impl<T: Transport> Uploader<T> {
    /// Create an uploader that bounds every transport call by `timeout`.
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn bounded<R>(&self, step: Step, fut: impl Future<Output = Result<R>>) -> Result<R> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(Error::TransportUnavailable {
                step,
                transport: self.transport.name(),
                message: format!("no response within {:?}", self.timeout),
            }),
        }
    }

    /// Check that the transport can reach the filesystem.
    pub async fn probe(&self) -> Result<()> {
        log::debug!("probe transport={}", self.transport.name());
        self.bounded(Step::Probe, self.transport.probe()).await
    }

    /// Idempotently create `path`; an existing directory is success.
    pub async fn ensure_directory(&self, path: &str) -> Result<()> {
        log::debug!(
            "ensure_directory transport={} path={path}",
            self.transport.name()
        );
        self.bounded(Step::EnsureDirectory, self.transport.ensure_directory(path))
            .await
    }

    /// Stat a remote path.
    pub async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>> {
        self.bounded(Step::Verify, self.transport.stat(path)).await
    }

    /// Copy `source` to `destination`, honoring the overwrite policy.
    pub async fn transfer(
        &self,
        source: &Path,
        destination: &str,
        overwrite: OverwritePolicy,
    ) -> Result<TransferOutcome> {
        log::debug!(
            "transfer transport={} source={} destination={destination} overwrite={overwrite:?}",
            self.transport.name(),
            source.display()
        );
        inspect_source(source).await?;

        let existing = self
            .stat(destination)
            .await
            .map_err(|e| e.with_step(Step::Transfer))?;
        if let Some(entry) = existing {
            ensure!(
                entry.kind == EntryKind::File,
                RemoteWriteSnafu {
                    step: Step::Transfer,
                    message: format!("'{destination}' exists and is not a file"),
                }
            );
            match overwrite {
                OverwritePolicy::Fail => {
                    return Err(Error::DestinationExists {
                        path: destination.to_string(),
                    });
                }
                OverwritePolicy::Skip => {
                    log::info!("{destination} already exists, skipping transfer");
                    return Ok(TransferOutcome::Skipped);
                }
                OverwritePolicy::Replace => {
                    log::info!("{destination} already exists, replacing");
                }
            }
        }

        let replace = overwrite == OverwritePolicy::Replace;
        self.bounded(
            Step::Transfer,
            self.transport.put(source, destination, replace),
        )
        .await?;
        Ok(TransferOutcome::Transferred)
    }

    /// Stat `destination` and require a regular file of exactly `expected_size` bytes.
    pub async fn verify(&self, destination: &str, expected_size: u64) -> Result<u64> {
        log::debug!(
            "verify transport={} destination={destination} expected_size={expected_size}",
            self.transport.name()
        );
        let actual = self
            .stat(destination)
            .await?
            .filter(RemoteEntry::is_file)
            .map(|entry| entry.size);
        match actual {
            Some(size) if size == expected_size => Ok(size),
            _ => Err(Error::VerificationMismatch {
                path: destination.to_string(),
                expected: expected_size,
                actual,
            }),
        }
    }

    /// Stage `request.source` at `request.destination` and verify the result.
    pub async fn upload(&self, request: &TransferRequest) -> TransferResult {
        let mut transferred = false;
        match self.run_upload(request, &mut transferred).await {
            Ok(size) => TransferResult::verified(size, transferred),
            Err(e) => {
                log::debug!("upload of {} failed: {e}", request.destination());
                TransferResult::failed(e, transferred)
            }
        }
    }

    async fn run_upload(&self, request: &TransferRequest, transferred: &mut bool) -> Result<u64> {
        let source = request.source();
        let destination = request.destination();

        // A missing source must fail before anything touches the cluster.
        let expected_size = inspect_source(source).await?;
        log::info!(
            "staging {} ({expected_size} bytes) -> {destination} via {}",
            source.display(),
            self.transport.name()
        );

        self.probe().await?;

        let parent = parent_dir(destination);
        self.ensure_directory(&parent).await?;
        log::info!("directory {parent} is ready");

        let outcome = self
            .transfer(source, destination, request.overwrite())
            .await?;
        *transferred = outcome == TransferOutcome::Transferred;

        let size = self.verify(destination, expected_size).await?;
        log::info!("verified {destination} ({size} bytes)");
        Ok(size)
    }
}
