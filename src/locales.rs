//! Locale tables
//!
//! The kit ships a YAML file mapping `<kit>.<component>.<key>` to one string
//! per locale. A project level file of the same shape overrides whole entries.

use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::attributes::parse_attributes;
use crate::config::Options;
use crate::error::{LoaderError, Result};

/// Location of the kit's locale table inside the kit package
pub const KIT_LOCALES_PATH: &str = "src/locales/all.yml";

/// Location of the project's override table
pub const PROJECT_LOCALES_PATH: &str = "src/global_locales.yml";

/// Location of the project's table collected from component `<i18n>` blocks
pub const COMPONENT_LOCALES_PATH: &str = "src/locales/components_locales.yml";

static I18N_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<i18n[^>]*>(.*?)</i18n>").expect("valid i18n block pattern"));

/// Dotted key to (locale to translated string)
pub type LocaleTable = IndexMap<String, IndexMap<String, String>>;

/// Parses a YAML locale table
pub fn parse_locale_table(content: &str) -> std::result::Result<LocaleTable, serde_yaml::Error> {
    if content.trim().is_empty() {
        return Ok(LocaleTable::new());
    }
    let table: Option<LocaleTable> = serde_yaml::from_str(content)?;
    Ok(table.unwrap_or_default())
}

fn read_locale_table(path: &Path) -> Option<LocaleTable> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "locale file is not readable");
            return None;
        }
    };

    match parse_locale_table(&content) {
        Ok(table) => Some(table),
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "locale file is not valid YAML, ignoring it"
            );
            None
        }
    }
}

/// Merges `overrides` into `base`; override entries replace base entries
pub fn merge_locale_tables(mut base: LocaleTable, overrides: LocaleTable) -> LocaleTable {
    for (key, translations) in overrides {
        base.insert(key, translations);
    }
    base
}

/// Loads the kit table merged with the project overrides
///
/// Unreadable or malformed files count as empty tables.
pub fn load_locale_table(kit_path: &Path, project_path: &Path) -> LocaleTable {
    let base = read_locale_table(kit_path).unwrap_or_default();
    let overrides = read_locale_table(project_path).unwrap_or_default();
    let table = merge_locale_tables(base, overrides);
    tracing::debug!(entries = table.len(), "loaded locale table");
    table
}

/// Returns the kit and project table locations for the given options
pub fn default_paths(options: &Options) -> (PathBuf, PathBuf) {
    (
        options.kit_root().join(KIT_LOCALES_PATH),
        options.project_root().join(PROJECT_LOCALES_PATH),
    )
}

/// Top level entries of a component table, kept as written
type ComponentTable = IndexMap<String, serde_yaml::Value>;

fn parse_component_table(content: &str, path: &Path) -> Result<ComponentTable> {
    if content.trim().is_empty() {
        return Ok(ComponentTable::new());
    }
    let table: Option<ComponentTable> =
        serde_yaml::from_str(content).map_err(|source| LoaderError::Locales {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(table.unwrap_or_default())
}

/// Copies the `<i18n>` block of a component file into the project table
///
/// Top level keys of the block replace the same keys of the table. Blocks
/// declaring a `lang` other than YAML are skipped. A missing table file is
/// created.
///
/// # Arguments
///
/// * `component_source` - Raw text of the component file
/// * `table_path` - The project's component table
///
/// # Returns
///
/// `true` when the table file was written
pub fn sync_component_locales(component_source: &str, table_path: &Path) -> Result<bool> {
    let Some(captures) = I18N_BLOCK_RE.captures(component_source) else {
        return Ok(false);
    };

    let attributes = parse_attributes(&captures[0]);
    let lang = attributes.get("lang").map(String::as_str);
    if let Some(lang) = lang.filter(|lang| !matches!(*lang, "yaml" | "yml")) {
        tracing::debug!(lang, "skipping i18n block that is not YAML");
        return Ok(false);
    }

    let block = parse_component_table(&captures[1], table_path)?;
    if block.is_empty() {
        return Ok(false);
    }

    let current = match fs::read_to_string(table_path) {
        Ok(content) => parse_component_table(&content, table_path)?,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ComponentTable::new(),
        Err(source) => {
            return Err(LoaderError::Io {
                path: table_path.to_path_buf(),
                source,
            })
        }
    };

    let mut merged = current.clone();
    merged.extend(block);
    if merged == current {
        return Ok(false);
    }

    let io_error = |source| LoaderError::Io {
        path: table_path.to_path_buf(),
        source,
    };
    let content = serde_yaml::to_string(&merged).map_err(|source| LoaderError::Locales {
        path: table_path.to_path_buf(),
        source,
    })?;
    if let Some(parent) = table_path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }
    fs::write(table_path, content).map_err(io_error)?;
    tracing::debug!(
        path = %table_path.display(),
        entries = merged.len(),
        "updated component locales"
    );
    Ok(true)
}

/// Looks up one translation
pub fn translate<'a>(table: &'a LocaleTable, key: &str, locale: &str) -> Option<&'a str> {
    table.get(key)?.get(locale).map(String::as_str)
}
