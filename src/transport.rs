use crate::error::{Error, Result};
use serde::Serialize;
use std::path::Path;
use std::str::FromStr;

pub mod constants;
pub mod gateway;
pub mod shell;
pub mod utils;

use self::gateway::GatewayTransport;
use self::shell::ShellBridge;

/// Transport kinds that can be selected by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    Shell,
    WebHdfs,
    Fs,
}

impl FromStr for TransportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "shell" | "docker" | "podman" => Ok(Self::Shell),
            "webhdfs" | "http" => Ok(Self::WebHdfs),
            "fs" => Ok(Self::Fs),
            _ => Err(Error::UnsupportedTransport {
                transport: s.to_string(),
            }),
        }
    }
}

/// Settings for executing `hdfs dfs` inside a running container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub container: String,
    pub container_tool: String,
    pub container_tmp: String,
}

/// Per-transport configuration, resolved once before any operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Shell(ShellConfig),
    WebHdfs {
        endpoint: String,
        user: String,
        /// Absolute directory that holds the blocks of in-flight writes.
        atomic_dir: String,
    },
    Fs { root: String },
}

impl TransportConfig {
    pub fn kind(&self) -> TransportKind {
        match self {
            TransportConfig::Shell(_) => TransportKind::Shell,
            TransportConfig::WebHdfs { .. } => TransportKind::WebHdfs,
            TransportConfig::Fs { .. } => TransportKind::Fs,
        }
    }
}

/// Type of a remote filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
    Other,
}

/// Metadata returned by [`Transport::stat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteEntry {
    pub path: String,
    pub kind: EntryKind,
    pub size: u64,
}

impl RemoteEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }
}

/// A way of executing filesystem operations against the cluster.
///
/// Implementations translate their own failures: anything that means the
/// bridge or gateway could not be reached becomes
/// [`Error::TransportUnavailable`], anything the filesystem itself rejected
/// becomes [`Error::RemoteWrite`].
pub trait Transport {
    /// Short name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Check that the transport can reach the filesystem at all.
    async fn probe(&self) -> Result<()>;

    /// Create `path` and any missing parents. An existing directory is success.
    async fn ensure_directory(&self, path: &str) -> Result<()>;

    /// Copy the local `source` to the remote `destination`.
    ///
    /// With `replace` set, an existing destination is swapped out without a
    /// partially written object ever being visible under its name.
    async fn put(&self, source: &Path, destination: &str, replace: bool) -> Result<()>;

    /// Stat `path`, returning `None` if nothing exists there.
    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>>;
}

/// The configured transport, owned by the uploader for one run.
#[derive(Debug, Clone)]
pub enum TransportHandle {
    Shell(ShellBridge),
    Gateway(GatewayTransport),
}

impl TransportHandle {
    pub fn connect(config: &TransportConfig) -> Result<Self> {
        log::debug!("connect transport={:?}", config.kind());
        match config {
            TransportConfig::Shell(shell) => Ok(Self::Shell(ShellBridge::new(shell.clone()))),
            TransportConfig::WebHdfs { .. } | TransportConfig::Fs { .. } => {
                Ok(Self::Gateway(GatewayTransport::from_config(config)?))
            }
        }
    }
}

impl Transport for TransportHandle {
    fn name(&self) -> &'static str {
        match self {
            Self::Shell(t) => t.name(),
            Self::Gateway(t) => t.name(),
        }
    }

    async fn probe(&self) -> Result<()> {
        match self {
            Self::Shell(t) => t.probe().await,
            Self::Gateway(t) => t.probe().await,
        }
    }

    async fn ensure_directory(&self, path: &str) -> Result<()> {
        match self {
            Self::Shell(t) => t.ensure_directory(path).await,
            Self::Gateway(t) => t.ensure_directory(path).await,
        }
    }

    async fn put(&self, source: &Path, destination: &str, replace: bool) -> Result<()> {
        match self {
            Self::Shell(t) => t.put(source, destination, replace).await,
            Self::Gateway(t) => t.put(source, destination, replace).await,
        }
    }

    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>> {
        match self {
            Self::Shell(t) => t.stat(path).await,
            Self::Gateway(t) => t.stat(path).await,
        }
    }
}
