// Remote path helpers shared by the uploader and both transports
use crate::error::{InvalidDestinationSnafu, Result};
use crate::transport::constants::STAGING_SUFFIX;
use snafu::ensure;

/// Join a remote base directory and a relative name with exactly one '/'.
pub fn build_remote_path(base: &str, name: &str) -> String {
    let name = name.trim_start_matches('/');
    if base.ends_with('/') {
        format!("{base}{name}")
    } else {
        format!("{base}/{name}")
    }
}

/// Collapse repeated separators and make the path absolute.
pub fn normalize_remote_path(path: &str) -> String {
    let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    format!("/{}", parts.join("/"))
}

/// Whether any segment of `path` is `.` or `..`.
pub fn has_dot_segments(path: &str) -> bool {
    path.split('/').any(|segment| segment == "." || segment == "..")
}

/// Parent directory of an absolute remote path; the root is its own parent.
pub fn parent_dir(path: &str) -> String {
    let normalized = normalize_remote_path(path);
    match normalized.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => normalized[..idx].to_string(),
    }
}

/// Last component of a remote path.
pub fn basename(path: &str) -> String {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Return a new String that guarantees a trailing '/'.
pub fn ensure_trailing_slash(path: &str) -> String {
    if path.ends_with('/') {
        path.to_string()
    } else {
        format!("{path}/")
    }
}

/// Sibling path a write lands on before it is renamed over `path`.
pub fn staging_path(path: &str) -> String {
    format!("{path}{STAGING_SUFFIX}")
}

/// Resolve the user supplied destination into an absolute remote file path.
///
/// * missing destination: `<base_dir>/<file_name>`
/// * trailing '/': treated as a directory, `<dest>/<file_name>`
/// * relative path: resolved against `base_dir`
pub fn resolve_destination(
    base_dir: &str,
    destination: Option<&str>,
    file_name: &str,
) -> Result<String> {
    let joined = match destination {
        None => build_remote_path(base_dir, file_name),
        Some(dest) => {
            let dest = if dest.starts_with('/') {
                dest.to_string()
            } else {
                build_remote_path(base_dir, dest)
            };
            if dest.ends_with('/') {
                build_remote_path(&dest, file_name)
            } else {
                dest
            }
        }
    };

    let resolved = normalize_remote_path(&joined);
    ensure!(
        resolved != "/" && !basename(&resolved).is_empty(),
        InvalidDestinationSnafu { path: joined }
    );
    Ok(resolved)
}
