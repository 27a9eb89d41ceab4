use crate::error::{Error, Result, SourceUnreadableSnafu, Step};
use crate::transport::constants::HDFS_BIN;
use crate::transport::utils::error::StepContext;
use crate::transport::utils::path::build_remote_path;
use crate::transport::{EntryKind, RemoteEntry, ShellConfig, Transport};
use snafu::ResultExt;
use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitStatus;
use tokio::process::Command;
use uuid::Uuid;

const NAME: &str = "shell";

/// Stderr fragments that mean the container runtime or the namenode could not
/// be reached, as opposed to HDFS rejecting the operation.
const UNAVAILABLE_MARKERS: &[&str] = &[
    "is not running",
    "No such container",
    "No such object",
    "Cannot connect to the Docker daemon",
    "Error response from daemon",
    "Connection refused",
    "executable file not found",
];

/// Exit codes reserved by `docker exec`/`podman exec` for their own failures.
const RUNTIME_EXIT_CODES: &[i32] = &[125, 126, 127];

const MISSING_PATH_MARKER: &str = "No such file or directory";

/// Runs `hdfs dfs` inside a named container through the container tool's
/// `exec`/`cp` subcommands.
#[derive(Debug, Clone)]
pub struct ShellBridge {
    config: ShellConfig,
}

struct CommandOutput {
    status: ExitStatus,
    stdout: String,
    stderr: String,
}

#[derive(Debug, PartialEq, Eq)]
enum Failure {
    Unavailable,
    Filesystem,
}

fn classify_failure(code: Option<i32>, stderr: &str) -> Failure {
    let Some(code) = code else {
        // killed by a signal
        return Failure::Unavailable;
    };
    if RUNTIME_EXIT_CODES.contains(&code)
        || UNAVAILABLE_MARKERS.iter().any(|m| stderr.contains(m))
    {
        Failure::Unavailable
    } else {
        Failure::Filesystem
    }
}

/// Parse the output of `hdfs dfs -stat "%F|%b"`.
fn parse_stat(path: &str, stdout: &str) -> Option<RemoteEntry> {
    let (kind, size) = stdout.trim().rsplit_once('|')?;
    let size = size.trim().parse().ok()?;
    let kind = match kind.trim() {
        "regular file" | "empty file" => EntryKind::File,
        "directory" => EntryKind::Dir,
        _ => EntryKind::Other,
    };
    Some(RemoteEntry {
        path: path.to_string(),
        kind,
        size,
    })
}

impl ShellBridge {
    pub fn new(config: ShellConfig) -> Self {
        Self { config }
    }

    /// Run the container tool with `args` and capture its output.
    async fn run<I, S>(&self, step: Step, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.config.container_tool);
        command.args(args).kill_on_drop(true);
        log::debug!("shell step={step} command={command:?}");

        let output = command.output().await.at_step(step, NAME)?;
        Ok(CommandOutput {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }

    /// Run `hdfs dfs <args>` inside the container.
    async fn hdfs(&self, step: Step, args: &[&str]) -> Result<CommandOutput> {
        let mut full = vec!["exec", self.config.container.as_str(), HDFS_BIN, "dfs"];
        full.extend_from_slice(args);
        self.run(step, full).await
    }

    fn failure(&self, step: Step, output: &CommandOutput) -> Error {
        let message = if output.stderr.is_empty() {
            format!("command exited with {}", output.status)
        } else {
            output.stderr.clone()
        };
        match classify_failure(output.status.code(), &output.stderr) {
            Failure::Unavailable => Error::TransportUnavailable {
                step,
                transport: NAME,
                message,
            },
            Failure::Filesystem => Error::RemoteWrite { step, message },
        }
    }

    fn check(&self, step: Step, output: CommandOutput) -> Result<CommandOutput> {
        if output.status.success() {
            Ok(output)
        } else {
            Err(self.failure(step, &output))
        }
    }

    async fn remove_staged_copy(&self, staged: &str) {
        let args = ["exec", self.config.container.as_str(), "rm", "-f", staged];
        match self.run(Step::Transfer, args).await {
            Ok(out) if out.status.success() => {}
            Ok(out) => log::warn!("failed to remove staged copy {staged}: {}", out.stderr),
            Err(e) => log::warn!("failed to remove staged copy {staged}: {e}"),
        }
    }
}

impl Transport for ShellBridge {
    fn name(&self) -> &'static str {
        NAME
    }

    async fn probe(&self) -> Result<()> {
        let container = self.config.container.as_str();
        let inspect = self
            .run(
                Step::Probe,
                ["inspect", "--format", "{{.State.Running}}", container],
            )
            .await?;
        if !inspect.status.success() || inspect.stdout.trim() != "true" {
            let detail = if inspect.stderr.is_empty() {
                "not running".to_string()
            } else {
                inspect.stderr
            };
            return Err(Error::TransportUnavailable {
                step: Step::Probe,
                transport: NAME,
                message: format!("container '{container}' is unavailable: {detail}"),
            });
        }

        let ls = self.hdfs(Step::Probe, &["-test", "-d", "/"]).await?;
        if !ls.status.success() {
            return Err(Error::TransportUnavailable {
                step: Step::Probe,
                transport: NAME,
                message: format!("HDFS not accessible in '{container}': {}", ls.stderr),
            });
        }
        log::info!("container {container} is running and HDFS is accessible");
        Ok(())
    }

    async fn ensure_directory(&self, path: &str) -> Result<()> {
        let output = self
            .hdfs(Step::EnsureDirectory, &["-mkdir", "-p", path])
            .await?;
        self.check(Step::EnsureDirectory, output)?;
        Ok(())
    }

    async fn put(&self, source: &Path, destination: &str, replace: bool) -> Result<()> {
        let local = tokio::fs::canonicalize(source)
            .await
            .context(SourceUnreadableSnafu { path: source })?;
        let file_name = local
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let staged = build_remote_path(
            &self.config.container_tmp,
            &format!("{}-{file_name}", Uuid::new_v4()),
        );
        let target = format!("{}:{staged}", self.config.container);

        let copy_args = [OsStr::new("cp"), local.as_os_str(), OsStr::new(&target)];
        let copy = self.run(Step::Transfer, copy_args).await?;
        self.check(Step::Transfer, copy)?;
        log::info!("copied {} into {target}", local.display());

        // `-put` writes to `<dest>._COPYING_` and renames, so readers never
        // observe a partial file even with `-f`.
        let mut args = vec!["-put"];
        if replace {
            args.push("-f");
        }
        args.push(staged.as_str());
        args.push(destination);
        let put = self.hdfs(Step::Transfer, &args).await;

        self.remove_staged_copy(&staged).await;
        self.check(Step::Transfer, put?)?;
        Ok(())
    }

    async fn stat(&self, path: &str) -> Result<Option<RemoteEntry>> {
        let output = self.hdfs(Step::Verify, &["-stat", "%F|%b", path]).await?;
        if !output.status.success() {
            if output.stderr.contains(MISSING_PATH_MARKER) {
                return Ok(None);
            }
            return Err(self.failure(Step::Verify, &output));
        }
        parse_stat(path, &output.stdout)
            .map(Some)
            .ok_or_else(|| Error::RemoteWrite {
                step: Step::Verify,
                message: format!("unexpected stat output: {}", output.stdout.trim()),
            })
    }
}
