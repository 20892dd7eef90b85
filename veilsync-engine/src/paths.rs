//! Remote path normalization.
//!
//! Remote paths are `/`-separated strings. Callers may pass Windows-style
//! backslashes or paths relative to the application base; everything is
//! brought to one canonical form before it reaches the connector.

/// Normalizes separators and strips any trailing slash.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Resolves `path` under `base` unless it already lies under it.
///
/// `base` must itself be normalized.
pub fn resolve(base: &str, path: &str) -> String {
    let path = normalize(path);
    if path == base || path.starts_with(&format!("{base}/")) {
        path
    } else {
        format!("{base}/{}", path.trim_start_matches('/'))
    }
}

/// Joins a directory path and a child name.
pub fn join(dir: &str, name: &str) -> String {
    format!("{}/{name}", dir.trim_end_matches('/'))
}
