use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::constants::{
    DEFAULT_BASE_DIR, DEFAULT_CONTAINER, DEFAULT_CONTAINER_TMP, DEFAULT_CONTAINER_TOOL,
    DEFAULT_FS_ROOT, DEFAULT_HDFS_USER, DEFAULT_TIMEOUT_SECS, DEFAULT_WEBHDFS_ATOMIC_DIR,
    DEFAULT_WEBHDFS_ENDPOINT,
};
use crate::transport::utils::path::{ensure_trailing_slash, normalize_remote_path};
use crate::transport::{ShellConfig, TransportConfig, TransportKind};

/// Everything an invocation needs before it touches the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageConfig {
    pub transport: TransportConfig,
    /// Remote directory that relative or omitted destinations resolve against.
    pub base_dir: String,
    /// Upper bound for each individual transport operation.
    pub timeout: Duration,
}

// Helper function to reduce repetitive environment variable loading logic.
fn get_var<F>(lookup: &F, primary_key: &str, secondary_key: Option<&str>, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(primary_key)
        .or_else(|| secondary_key.and_then(|key| lookup(key)))
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Load stage configuration from environment variables
pub fn load_stage_config() -> Result<StageConfig> {
    load_stage_config_from(|key| env::var(key).ok())
}

/// Load stage configuration through an arbitrary variable lookup.
pub fn load_stage_config_from<F>(lookup: F) -> Result<StageConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let kind_str = get_var(&lookup, "STAGE_TRANSPORT", None, "shell");
    let kind = TransportKind::from_str(&kind_str)?;

    let transport = match kind {
        TransportKind::Shell => load_shell_config(&lookup),
        TransportKind::WebHdfs => load_webhdfs_config(&lookup)?,
        TransportKind::Fs => load_fs_config(&lookup),
    };

    let base_dir = get_var(&lookup, "STAGE_BASE_DIR", None, DEFAULT_BASE_DIR);
    if !base_dir.starts_with('/') {
        return Err(Error::InvalidConfig {
            key: "STAGE_BASE_DIR".to_string(),
            message: format!("'{base_dir}' must be an absolute path"),
        });
    }

    let timeout_str = get_var(
        &lookup,
        "STAGE_TIMEOUT_SECS",
        None,
        &DEFAULT_TIMEOUT_SECS.to_string(),
    );
    let timeout_secs = match timeout_str.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => secs,
        _ => {
            return Err(Error::InvalidConfig {
                key: "STAGE_TIMEOUT_SECS".to_string(),
                message: format!("'{timeout_str}' is not a positive number of seconds"),
            });
        }
    };

    Ok(StageConfig {
        transport,
        base_dir: normalize_remote_path(&base_dir),
        timeout: Duration::from_secs(timeout_secs),
    })
}

/// Load shell bridge configuration (container exec)
fn load_shell_config<F>(lookup: &F) -> TransportConfig
where
    F: Fn(&str) -> Option<String>,
{
    TransportConfig::Shell(ShellConfig {
        container: get_var(
            lookup,
            "STAGE_CONTAINER",
            Some("HDFS_CONTAINER"),
            DEFAULT_CONTAINER,
        ),
        container_tool: get_var(
            lookup,
            "STAGE_CONTAINER_TOOL",
            Some("CONTAINER_TOOL"),
            DEFAULT_CONTAINER_TOOL,
        ),
        container_tmp: get_var(lookup, "STAGE_CONTAINER_TMP", None, DEFAULT_CONTAINER_TMP),
    })
}

/// Load WebHDFS gateway configuration
fn load_webhdfs_config<F>(lookup: &F) -> Result<TransportConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let endpoint = get_var(
        lookup,
        "STAGE_WEBHDFS_ENDPOINT",
        Some("WEBHDFS_ENDPOINT"),
        DEFAULT_WEBHDFS_ENDPOINT,
    );
    if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
        return Err(Error::InvalidConfig {
            key: "STAGE_WEBHDFS_ENDPOINT".to_string(),
            message: format!("'{endpoint}' is not an http(s) URL"),
        });
    }

    let user = get_var(
        lookup,
        "STAGE_HDFS_USER",
        Some("HADOOP_USER_NAME"),
        DEFAULT_HDFS_USER,
    );

    let atomic_dir = get_var(
        lookup,
        "STAGE_WEBHDFS_ATOMIC_DIR",
        None,
        DEFAULT_WEBHDFS_ATOMIC_DIR,
    );
    if !atomic_dir.starts_with('/') || normalize_remote_path(&atomic_dir) == "/" {
        return Err(Error::InvalidConfig {
            key: "STAGE_WEBHDFS_ATOMIC_DIR".to_string(),
            message: format!("'{atomic_dir}' must be an absolute directory below '/'"),
        });
    }

    Ok(TransportConfig::WebHdfs {
        endpoint,
        user,
        atomic_dir: ensure_trailing_slash(&normalize_remote_path(&atomic_dir)),
    })
}

/// Load filesystem configuration (for development and testing)
fn load_fs_config<F>(lookup: &F) -> TransportConfig
where
    F: Fn(&str) -> Option<String>,
{
    TransportConfig::Fs {
        root: get_var(lookup, "STAGE_FS_ROOT", None, DEFAULT_FS_ROOT),
    }
}
