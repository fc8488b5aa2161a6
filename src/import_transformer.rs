//! On-demand import expansion
//!
//! Replaces `import { A, B as C } from '<kit>'` with one direct import per
//! symbol, resolved through the kit's component map.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::component_map::ComponentMap;
use crate::config::Options;
use crate::error::{LoaderError, Result};
use crate::import_parser::{rewrite_imports, ImportStatement};
use crate::paths::{
    dirname, file_name, parent_dir_name, resolve_relative_path, split_at_dir, to_slash,
};

/// Quick check for `} from '...` so the import parser only runs when needed
static FROM_CLAUSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\}\s*from\s*['"]([^'"\n]+)['"]"#).expect("valid from pattern"));

/// How expanded imports address the kit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildMode {
    /// `import X from '<kit>/<mapped path>'`
    Production,
    /// Relative imports into the kit sources, used while developing the kit itself
    Development,
}

/// Per-file settings of the expansion
#[derive(Debug, Clone)]
pub struct ExpandOptions<'a> {
    /// Package name of the kit
    pub kit: &'a str,
    /// `<kit>[/<source_root>]`, replaced by a relative prefix in development mode
    pub kit_prefix: String,
    pub mode: BuildMode,
    /// Path of the file being transformed
    pub resource_path: &'a str,
    /// File name of the application's root entry component
    pub root_entry: &'a str,
    /// Relative directory used instead of the computed one (optional)
    pub override_dir: Option<&'a str>,
    /// Directory name of the kit sources, used to recognise kit files
    pub source_dir: &'a str,
}

impl<'a> ExpandOptions<'a> {
    pub fn new(options: &'a Options, resource_path: &'a str) -> Self {
        ExpandOptions {
            kit: &options.ui_kit,
            kit_prefix: options.kit_prefix(),
            mode: if options.kit_dev {
                BuildMode::Development
            } else {
                BuildMode::Production
            },
            resource_path,
            root_entry: &options.root_entry,
            override_dir: options.resolve_kit_dir.as_deref(),
            source_dir: options.source_root.as_deref().unwrap_or("src"),
        }
    }

    fn is_kit_file(&self) -> bool {
        to_slash(self.resource_path).contains(&format!("/{}/{}/", self.kit, self.source_dir))
    }
}

/// Checks whether `source` contains a named import from `kit`
pub fn has_kit_import(source: &str, kit: &str) -> bool {
    FROM_CLAUSE_RE.captures_iter(source).any(|captures| {
        let module = &captures[1];
        module == kit || module.starts_with(&format!("{}/", kit))
    })
}

/// Computes the relative directory that replaces the kit prefix in development mode
///
/// The first matching rule wins:
/// 1. the root entry component gets `.`
/// 2. a configured override directory is used as is
/// 3. files below a `demos` directory climb one level per segment below it
/// 4. kit files not directly inside `components` get `../..`
/// 5. everything else gets `..`
pub fn dev_relative_prefix(options: &ExpandOptions<'_>) -> String {
    if file_name(options.resource_path) == options.root_entry {
        return ".".to_string();
    }

    if let Some(dir) = options.override_dir {
        return dir.trim_end_matches('/').to_string();
    }

    if let Some((demos_parent, depth)) = split_at_dir(options.resource_path, "demos") {
        let consumer_dir = dirname(options.resource_path);
        return resolve_relative_path(&consumer_dir, &demos_parent)
            .unwrap_or_else(|| vec![".."; depth].join("/"));
    }

    if options.is_kit_file()
        && parent_dir_name(options.resource_path).as_deref() != Some("components")
    {
        return "../..".to_string();
    }

    "..".to_string()
}

/// Rewrites a `<kit>/...` path according to the build mode
pub fn rewrite_kit_path(full_path: &str, options: &ExpandOptions<'_>) -> String {
    if options.mode == BuildMode::Production {
        return full_path.to_string();
    }

    let prefix = format!("{}/", options.kit_prefix);
    match full_path.strip_prefix(&prefix) {
        Some(rest) => format!("{}/{}", dev_relative_prefix(options), rest),
        None => full_path.to_string(),
    }
}

fn expand_statement(
    statement: &ImportStatement<'_>,
    map: &ComponentMap,
    options: &ExpandOptions<'_>,
) -> Result<String> {
    let mut lines = Vec::with_capacity(statement.components.len());

    for component in &statement.components {
        // An empty alias asks for the symbol to be dropped
        if component.new_name.is_empty() {
            continue;
        }

        let mapped = map.get(&component.original_name).ok_or_else(|| {
            LoaderError::UnresolvedComponent {
                name: component.original_name.clone(),
                module: options.kit.to_string(),
                resource: options.resource_path.to_string(),
            }
        })?;

        let full_path = format!("{}/{}", options.kit, mapped.trim_start_matches("./"));
        lines.push(format!(
            "import {} from '{}'",
            component.new_name,
            rewrite_kit_path(&full_path, options)
        ));
    }

    Ok(lines.join("\n"))
}

/// Expands named kit imports into direct file imports
///
/// # Arguments
///
/// * `source` - The script source
/// * `map` - The kit's component name to file mapping
/// * `options` - Per-file expansion settings
///
/// # Returns
///
/// The rewritten source, or `E_UNRESOLVED_COMPONENT` for an unmapped symbol
pub fn expand_imports(
    source: &str,
    map: &ComponentMap,
    options: &ExpandOptions<'_>,
) -> Result<String> {
    if !has_kit_import(source, options.kit) {
        return Ok(source.to_string());
    }

    rewrite_imports(source, Some(options.kit), |statement| {
        expand_statement(statement, map, options)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kit_map() -> ComponentMap {
        ComponentMap::from_iter([
            ("A", "components/a.vue"),
            ("B", "components/b.vue"),
        ])
    }

    fn options(mode: BuildMode, resource_path: &str) -> ExpandOptions<'_> {
        ExpandOptions {
            kit: "kit",
            kit_prefix: "kit".to_string(),
            mode,
            resource_path,
            root_entry: "App.vue",
            override_dir: None,
            source_dir: "src",
        }
    }

    #[test]
    fn test_production_expansion() {
        let source = "import { A, B as C } from 'kit'";
        let result = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Production, "/p/src/views/Home.vue"),
        )
        .unwrap();
        assert_eq!(
            result,
            "import A from 'kit/components/a.vue'\nimport C from 'kit/components/b.vue'"
        );
    }

    #[test]
    fn test_surrounding_source_is_kept() {
        let source = "import Vue from 'vue'\nimport { A } from 'kit'\nVue.use(A)";
        let result = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Production, "/p/src/main.js"),
        )
        .unwrap();
        assert_eq!(
            result,
            "import Vue from 'vue'\nimport A from 'kit/components/a.vue'\nVue.use(A)"
        );
    }

    #[test]
    fn test_development_root_entry() {
        let source = "import { A } from 'kit'";
        let result = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Development, "/p/src/App.vue"),
        )
        .unwrap();
        assert_eq!(result, "import A from './components/a.vue'");
    }

    #[test]
    fn test_development_ordinary_consumer() {
        let source = "import { A } from 'kit'";
        let result = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Development, "/p/src/views/Home.vue"),
        )
        .unwrap();
        assert_eq!(result, "import A from '../components/a.vue'");
    }

    #[test]
    fn test_development_prefix_rules() {
        // Kit component file not directly inside `components`
        let opts = options(BuildMode::Development, "/p/kit/src/components/alert/index.vue");
        assert_eq!(dev_relative_prefix(&opts), "../..");

        // Kit file directly inside `components`
        let opts = options(BuildMode::Development, "/p/kit/src/components/index.js");
        assert_eq!(dev_relative_prefix(&opts), "..");

        // Demos climb one level per segment below `demos`
        let opts = options(BuildMode::Development, "/p/src/demos/Alert.vue");
        assert_eq!(dev_relative_prefix(&opts), "..");
        let opts = options(BuildMode::Development, "/p/src/demos/alert/Basic.vue");
        assert_eq!(dev_relative_prefix(&opts), "../..");

        // Override directory wins over computed rules
        let mut opts = options(BuildMode::Development, "/p/src/demos/alert/Basic.vue");
        opts.override_dir = Some("../../src/");
        assert_eq!(dev_relative_prefix(&opts), "../../src");

        // The root entry wins over everything
        let mut opts = options(BuildMode::Development, "C:\\p\\src\\App.vue");
        opts.override_dir = Some("../lib");
        assert_eq!(dev_relative_prefix(&opts), ".");
    }

    #[test]
    fn test_source_root_prefix_is_stripped() {
        let map = ComponentMap::from_iter([("Alert", "src/components/alert/index.vue")]);
        let mut opts = options(BuildMode::Development, "/p/src/App.vue");
        opts.kit_prefix = "kit/src".to_string();
        let result = expand_imports("import { Alert } from 'kit'", &map, &opts).unwrap();
        assert_eq!(result, "import Alert from './components/alert/index.vue'");

        opts.mode = BuildMode::Production;
        let result = expand_imports("import { Alert } from 'kit'", &map, &opts).unwrap();
        assert_eq!(result, "import Alert from 'kit/src/components/alert/index.vue'");
    }

    #[test]
    fn test_unmapped_symbol_is_an_error() {
        let source = "import { A, Missing } from 'kit'";
        let err = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Production, "/p/src/App.vue"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LoaderError::UnresolvedComponent { ref name, .. } if name == "Missing"
        ));
    }

    #[test]
    fn test_empty_alias_is_skipped() {
        let source = "import { A, Marker as } from 'kit'";
        let result = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Production, "/p/src/App.vue"),
        )
        .unwrap();
        assert_eq!(result, "import A from 'kit/components/a.vue'");
    }

    #[test]
    fn test_no_kit_import_is_noop() {
        let source = "import { mapState } from 'vuex'\nimport kit from 'kit'";
        let result = expand_imports(
            source,
            &kit_map(),
            &options(BuildMode::Production, "/p/src/App.vue"),
        )
        .unwrap();
        assert_eq!(result, source);
    }

    #[test]
    fn test_has_kit_import() {
        assert!(has_kit_import("import { A } from 'kit'", "kit"));
        assert!(has_kit_import("import {A} from \"kit\"", "kit"));
        assert!(!has_kit_import("import { A } from 'kitchen'", "kit"));
        assert!(!has_kit_import("import A from 'kit'", "kit"));
    }
}
