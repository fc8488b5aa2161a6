//! Component map of the UI kit
//!
//! A JSON manifest shipped with the kit, mapping each exported component name
//! to the file that implements it.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::Options;
use crate::error::{LoaderError, Result};

/// Location of the manifest inside the kit package
pub const COMPONENT_MAP_PATH: &str = "src/components/map.json";

/// Component name to file path mapping, read-only once loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentMap(IndexMap<String, String>);

impl ComponentMap {
    /// Parses a manifest from JSON text
    pub fn from_json(path: &Path, content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|source| LoaderError::ComponentMap {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Reads and parses a manifest file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| LoaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let map = Self::from_json(path, &content)?;
        tracing::debug!(path = %path.display(), components = map.len(), "loaded component map");
        Ok(map)
    }

    /// Returns the manifest location for the given options
    ///
    /// While developing the kit itself the manifest is read from the project,
    /// otherwise from the installed package.
    pub fn default_path(options: &Options) -> PathBuf {
        if options.kit_dev {
            options.project_root().join(COMPONENT_MAP_PATH)
        } else {
            options.kit_root().join(COMPONENT_MAP_PATH)
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ComponentMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ComponentMap(
            iter.into_iter()
                .map(|(name, path)| (name.into(), path.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_manifest() {
        let json = r#"{
            "Alert": "src/components/alert/index.vue",
            "AlertPlugin": "src/plugins/alert/index.js"
        }"#;
        let map = ComponentMap::from_json(Path::new("map.json"), json).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("Alert"), Some("src/components/alert/index.vue"));
        assert_eq!(map.get("Toast"), None);
    }

    #[test]
    fn test_invalid_manifest() {
        let err = ComponentMap::from_json(Path::new("map.json"), "[1, 2]").unwrap_err();
        assert!(err.to_string().starts_with("E_INVALID_COMPONENT_MAP: map.json"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("map.json");
        fs::write(&path, r#"{"Group": "src/components/group/index.vue"}"#).unwrap();

        let map = ComponentMap::load(&path).unwrap();
        assert_eq!(map.get("Group"), Some("src/components/group/index.vue"));

        let err = ComponentMap::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, LoaderError::Io { .. }));
    }

    #[test]
    fn test_default_path() {
        let mut options = Options {
            project_root: Some(PathBuf::from("/p")),
            ..Options::default()
        };
        assert_eq!(
            ComponentMap::default_path(&options),
            PathBuf::from("/p/node_modules/vux/src/components/map.json")
        );

        options.kit_dev = true;
        assert_eq!(
            ComponentMap::default_path(&options),
            PathBuf::from("/p/src/components/map.json")
        );
    }
}
