//! Cache module for theme variables
//!
//! The component loader runs once per component file, so the theme file is
//! parsed once and re-read only when its modification time changes.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::theme::{parse_theme_variables, ThemeVariables};

/// A cache of parsed theme files keyed by path
#[derive(Debug, Default)]
pub struct ThemeCache {
    /// Map of file paths to their parsed variables and last modified time
    cache: HashMap<PathBuf, (ThemeVariables, SystemTime)>,
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

impl ThemeCache {
    pub fn new() -> Self {
        ThemeCache::default()
    }

    /// Gets cached variables or returns None if not in cache or if modified
    pub fn get(&self, path: &Path) -> Option<ThemeVariables> {
        let (variables, last_modified) = self.cache.get(path)?;
        let current_modified = modified_time(path)?;

        if current_modified == *last_modified {
            return Some(variables.clone());
        }

        None
    }

    /// Returns the variables of `path`, parsing the file on a cache miss
    ///
    /// Unreadable files yield no variables and are not cached.
    pub fn load(&mut self, path: &Path) -> ThemeVariables {
        if let Some(variables) = self.get(path) {
            return variables;
        }

        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "theme file is not readable, ignoring it"
                );
                self.cache.remove(path);
                return ThemeVariables::new();
            }
        };

        let variables = parse_theme_variables(&content);
        if let Some(last_modified) = modified_time(path) {
            self.cache
                .insert(path.to_path_buf(), (variables.clone(), last_modified));
        }
        variables
    }

    /// Clears the cache
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Returns the number of entries in the cache
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_and_reuse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("theme.less");
        fs::write(&path, "@color: red;\n").unwrap();

        let mut cache = ThemeCache::new();
        assert!(cache.is_empty());

        let variables = cache.load(&path);
        assert_eq!(variables.get("color"), Some(&"red".to_string()));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&path), Some(variables));

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_missing_file_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ThemeCache::new();
        assert!(cache.load(&dir.path().join("missing.less")).is_empty());
        assert!(cache.is_empty());
    }
}
