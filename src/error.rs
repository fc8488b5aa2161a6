//! Error types for the loader
//!
//! Every message starts with a stable `E_*` code so the host build tool can
//! match on it without parsing prose.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LoaderError>;

#[derive(Debug, Error)]
pub enum LoaderError {
    /// Two descriptors with the same name were passed to a single merge.
    #[error("E_DUPLICATE_PLUGIN: plugin `{0}` is declared more than once")]
    DuplicatePlugin(String),

    /// An imported kit symbol has no entry in the component map.
    #[error(
        "E_UNRESOLVED_COMPONENT: `{name}` is not exported by `{module}` (imported in {resource})"
    )]
    UnresolvedComponent {
        name: String,
        module: String,
        resource: String,
    },

    #[error("E_FILE_READ: failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("E_INVALID_COMPONENT_MAP: {path}: {source}")]
    ComponentMap {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("E_INVALID_LOCALES: {path}: {source}")]
    Locales {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("E_INVALID_PATTERN: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Non-fatal problems surfaced to the caller alongside a transformed source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoaderWarning {
    #[error("W_MISSING_TRANSLATION: no `{locale}` translation for `{key}`")]
    MissingTranslation { key: String, locale: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = LoaderError::DuplicatePlugin("i18n".to_string());
        assert_eq!(
            err.to_string(),
            "E_DUPLICATE_PLUGIN: plugin `i18n` is declared more than once"
        );

        let err = LoaderError::UnresolvedComponent {
            name: "Foo".to_string(),
            module: "vux".to_string(),
            resource: "src/App.vue".to_string(),
        };
        assert!(err.to_string().starts_with("E_UNRESOLVED_COMPONENT: `Foo`"));

        let warning = LoaderWarning::MissingTranslation {
            key: "vux.x-button.label".to_string(),
            locale: "en".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "W_MISSING_TRANSLATION: no `en` translation for `vux.x-button.label`"
        );
    }
}
