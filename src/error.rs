use serde::Serialize;
use snafu::Snafu;
use std::fmt;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

/// The stage of an upload that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Probe,
    EnsureDirectory,
    Transfer,
    Verify,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Probe => "probe",
            Step::EnsureDirectory => "ensure directory",
            Step::Transfer => "transfer",
            Step::Verify => "verify",
        };
        f.write_str(name)
    }
}

/// Coarse classification of every [`Error`], used for exit codes and reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    SourceNotFound,
    TransportUnavailable,
    RemoteWrite,
    VerificationMismatch,
    Config,
}

impl ErrorKind {
    /// Process exit code reported by the CLI for this kind of failure.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorKind::Config => 1,
            ErrorKind::SourceNotFound => 2,
            ErrorKind::TransportUnavailable => 3,
            ErrorKind::RemoteWrite => 4,
            ErrorKind::VerificationMismatch => 5,
        }
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("Source file not found: {}", path.display()))]
    SourceNotFound { path: PathBuf },

    #[snafu(display("Source is not a regular file: {}", path.display()))]
    SourceNotAFile { path: PathBuf },

    #[snafu(display("Source file '{}' is not readable: {source}", path.display()))]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("{step} failed: {transport} transport unavailable: {message}"))]
    TransportUnavailable {
        step: Step,
        transport: &'static str,
        message: String,
    },

    #[snafu(display("{step} failed: remote filesystem error: {message}"))]
    RemoteWrite { step: Step, message: String },

    #[snafu(display(
        "transfer failed: destination '{path}' already exists (use --overwrite replace or skip)"
    ))]
    DestinationExists { path: String },

    #[snafu(display(
        "verify failed: '{path}' expected {expected} bytes, found {}",
        describe_remote(*actual)
    ))]
    VerificationMismatch {
        path: String,
        expected: u64,
        actual: Option<u64>,
    },

    #[snafu(display("Remote path does not exist: {path}"))]
    RemotePathNotFound { path: String },

    #[snafu(display("Invalid destination path: '{path}'"))]
    InvalidDestination { path: String },

    #[snafu(display("Unsupported transport: {transport}"))]
    UnsupportedTransport { transport: String },

    #[snafu(display("Invalid value for '{key}': {message}"))]
    InvalidConfig { key: String, message: String },
}

fn describe_remote(actual: Option<u64>) -> String {
    match actual {
        Some(size) => format!("{size} bytes"),
        None => "no regular file".to_string(),
    }
}

impl Error {
    /// Re-attribute a transport error to the step that triggered it.
    pub fn with_step(self, step: Step) -> Self {
        match self {
            Error::TransportUnavailable {
                transport, message, ..
            } => Error::TransportUnavailable {
                step,
                transport,
                message,
            },
            Error::RemoteWrite { message, .. } => Error::RemoteWrite { step, message },
            other => other,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::SourceNotFound { .. }
            | Error::SourceNotAFile { .. }
            | Error::SourceUnreadable { .. } => ErrorKind::SourceNotFound,
            Error::TransportUnavailable { .. } => ErrorKind::TransportUnavailable,
            Error::RemoteWrite { .. }
            | Error::DestinationExists { .. }
            | Error::RemotePathNotFound { .. } => ErrorKind::RemoteWrite,
            Error::VerificationMismatch { .. } => ErrorKind::VerificationMismatch,
            Error::InvalidDestination { .. }
            | Error::UnsupportedTransport { .. }
            | Error::InvalidConfig { .. } => ErrorKind::Config,
        }
    }
}
