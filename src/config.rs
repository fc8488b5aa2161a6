use std::path::PathBuf;

use path_absolutize::Absolutize;
use serde::Deserialize;

/// Options of the loader, as supplied in the descriptor passed to the merge
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Options {
    /// Root of the consuming project (optional, defaults to the current directory)
    pub project_root: Option<PathBuf>,

    /// Forces the modern (`rules`) or legacy (`loaders`) module format
    pub is_webpack2: Option<bool>,

    /// Silences the merge banner
    pub is_test: bool,

    /// Current build environment, matched against descriptor `envs`
    pub env: Option<String>,

    /// Package name of the UI kit whose imports are expanded
    pub ui_kit: String,

    /// Directory inside the kit package that mapped paths are rooted at (optional)
    pub source_root: Option<String>,

    /// Expands named kit imports into direct file imports
    pub use_kit_ui: bool,

    /// Development mode: kit imports become relative paths into the kit sources
    pub kit_dev: bool,

    /// Relative directory that replaces the kit prefix in development mode (optional)
    pub resolve_kit_dir: Option<String>,

    /// File name of the application's root entry component
    pub root_entry: String,

    /// Adds a transpiler rule for the kit's own script sources
    pub compile_kit_source: bool,

    /// Server-side rendering build
    pub ssr: bool,

    /// Loader chain used for component files
    pub loader_string: String,

    /// Rewrites the host's component rule (optional, defaults to `true`)
    pub rewrite_loader_string: Option<bool>,

    /// Stylesheet preprocessor stage that receives theme overrides
    pub preprocessor: String,

    pub script_stage: String,
    pub style_stage: String,
    pub template_stage: String,
    /// Stage that runs on the compiled template output
    pub before_template_stage: String,
    /// Stage appended after secondary transpilers
    pub js_stage: String,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            project_root: None,
            is_webpack2: None,
            is_test: false,
            env: None,
            ui_kit: "vux".to_string(),
            source_root: None,
            use_kit_ui: false,
            kit_dev: false,
            resolve_kit_dir: None,
            root_entry: "App.vue".to_string(),
            compile_kit_source: false,
            ssr: false,
            loader_string: "vux-loader!vue-loader".to_string(),
            rewrite_loader_string: None,
            preprocessor: "less-loader".to_string(),
            script_stage: "vux-loader/src/script-loader.js".to_string(),
            style_stage: "vux-loader/src/style-loader.js".to_string(),
            template_stage: "vux-loader/src/template-loader.js".to_string(),
            before_template_stage: "vux-loader/src/before-template-compiler-loader.js"
                .to_string(),
            js_stage: "vux-loader/src/js-loader.js".to_string(),
        }
    }
}

impl Options {
    /// Returns the absolute project root, falling back to the current directory
    pub fn project_root(&self) -> PathBuf {
        let root = self
            .project_root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();

        match root.absolutize() {
            Ok(absolute) => absolute.into_owned(),
            Err(_) => root,
        }
    }

    /// Returns the root directory of the kit package
    pub fn kit_root(&self) -> PathBuf {
        self.project_root().join("node_modules").join(&self.ui_kit)
    }

    /// Returns the `<kit>[/<source_root>]` prefix that mapped paths are emitted under
    pub fn kit_prefix(&self) -> String {
        match self.source_root.as_deref() {
            Some(root) if !root.is_empty() => format!("{}/{}", self.ui_kit, root),
            _ => self.ui_kit.clone(),
        }
    }

    pub fn rewrites_loader_string(&self) -> bool {
        self.rewrite_loader_string.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_parsing() {
        let config_json = r#"{
            "project_root": "/home/user/project",
            "ui_kit": "kit",
            "source_root": "src",
            "use_kit_ui": true,
            "kit_dev": true,
            "resolve_kit_dir": "../../src",
            "env": "production"
        }"#;

        let options: Options =
            serde_json::from_str(config_json).expect("Failed to parse config JSON");

        assert_eq!(options.project_root, Some(PathBuf::from("/home/user/project")));
        assert_eq!(options.ui_kit, "kit");
        assert!(options.use_kit_ui);
        assert!(options.kit_dev);
        assert_eq!(options.resolve_kit_dir.as_deref(), Some("../../src"));
        assert_eq!(options.env.as_deref(), Some("production"));
        assert_eq!(options.kit_prefix(), "kit/src");
        assert_eq!(
            options.kit_root(),
            PathBuf::from("/home/user/project/node_modules/kit")
        );

        // Unspecified keys keep their defaults
        assert_eq!(options.root_entry, "App.vue");
        assert_eq!(options.preprocessor, "less-loader");
        assert_eq!(options.loader_string, "vux-loader!vue-loader");
        assert!(options.rewrites_loader_string());
    }

    #[test]
    fn test_project_root_is_normalised() {
        let options = Options {
            project_root: Some(PathBuf::from("/home/user/project/build/..")),
            ..Options::default()
        };
        assert_eq!(options.project_root(), PathBuf::from("/home/user/project"));
    }

    #[test]
    fn test_empty_config() {
        let options: Options = serde_json::from_str("{}").expect("Failed to parse config JSON");
        assert_eq!(options.ui_kit, "vux");
        assert_eq!(options.kit_prefix(), "vux");
        assert!(!options.use_kit_ui);
        assert_eq!(options.is_webpack2, None);
    }
}
