//! Path utilities for the loader
//!
//! Resource paths handed over by the host may use either separator, so every
//! helper here works on `/`-normalised strings.

use std::path::{Path, PathBuf};

/// Normalises Windows separators to `/`
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

/// Calculates a relative path from one directory to another
///
/// # Arguments
///
/// * `from_dir` - The directory the relative path starts from
/// * `to_dir` - The target directory
///
/// # Returns
///
/// The relative path as an `Option<String>`, `./`-prefixed when the target
/// is not above `from_dir`
pub fn resolve_relative_path(from_dir: &str, to_dir: &str) -> Option<String> {
    let diff = pathdiff::diff_paths(to_dir, from_dir)?;
    let diff = to_slash(diff.to_str()?);

    if diff.is_empty() {
        return Some(".".to_string());
    }
    if diff.starts_with("..") {
        return Some(diff);
    }

    let mut relative_diff = PathBuf::from("./");
    relative_diff.push(diff);
    relative_diff.to_str().map(to_slash)
}

/// Gets the directory name of a path
///
/// Returns an empty string if the path has no parent.
pub fn dirname(path: &str) -> String {
    let path = to_slash(path);
    Path::new(&path)
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .to_string_lossy()
        .to_string()
}

/// Gets the final component of a path
pub fn file_name(path: &str) -> String {
    let path = to_slash(path);
    path.rsplit('/').next().unwrap_or_default().to_string()
}

/// Gets the name of the directory directly containing `path`
pub fn parent_dir_name(path: &str) -> Option<String> {
    let parent = dirname(path);
    if parent.is_empty() {
        return None;
    }
    Some(file_name(&parent))
}

/// Splits a path at the first directory named `dir_name`
///
/// # Returns
///
/// The directory containing `dir_name` and the number of path segments
/// (including the file itself) below `dir_name`
pub fn split_at_dir(path: &str, dir_name: &str) -> Option<(String, usize)> {
    let path = to_slash(path);
    let segments: Vec<&str> = path.split('/').collect();
    let index = segments
        .iter()
        .take(segments.len().saturating_sub(1))
        .position(|segment| *segment == dir_name)?;

    let ancestor = segments[..index].join("/");
    Some((ancestor, segments.len() - index - 1))
}
