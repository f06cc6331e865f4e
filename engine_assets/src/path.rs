//! Asset path normalization.
//!
//! Normalized paths are the dedup key of the cache, so two spellings of the
//! same relative path must collapse to one string:
//! - `\` becomes `/`
//! - empty and `.` components are dropped
//! - `..` pops the previous component, never above the data root
//!
//! Case is preserved; only the extension is lower-cased.

/// Normalizes a data-root-relative asset path.
pub fn normalize_path(path: &str) -> String {
    let unified = path.trim().replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in unified.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Lower-cased extension of a normalized path, without the dot.
///
/// Returns an empty string for paths with no extension, including
/// dot-files such as `.hidden`.
pub fn extension_of(normalized: &str) -> String {
    let file_name = normalized.rsplit('/').next().unwrap_or(normalized);
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => file_name[idx + 1..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// Normalizes an extension key for the dispatch table.
///
/// Accepts an optional leading dot; returns `None` for keys that could never
/// match a path suffix.
pub fn normalize_extension(extension: &str) -> Option<String> {
    let trimmed = extension.trim();
    let trimmed = trimmed.strip_prefix('.').unwrap_or(trimmed);
    if trimmed.is_empty() || trimmed.contains(&['.', '/', '\\'][..]) {
        return None;
    }
    Some(trimmed.to_ascii_lowercase())
}
