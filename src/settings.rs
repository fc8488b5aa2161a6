//! Settings shared with the per-file loaders
//!
//! Produced once by the merge and read by every loader invocation. Nothing
//! in here is mutated after setup apart from the theme cache.

use std::sync::Mutex;

use indexmap::IndexMap;

use crate::cache::ThemeCache;
use crate::component_map::ComponentMap;
use crate::config::Options;
use crate::locales::LocaleTable;
use crate::plugin::{Plugin, PluginDescriptor};
use crate::theme::{remap_variables, ThemeVariables};

/// Locale used when no i18n plugin is configured
pub const DEFAULT_LOCALE: &str = "zh-CN";

#[derive(Debug)]
pub struct LoaderSettings {
    pub options: Options,
    /// Descriptors active in the current build environment
    pub plugins: Vec<PluginDescriptor>,
    pub component_map: Option<ComponentMap>,
    pub locales: LocaleTable,
    theme_cache: Mutex<ThemeCache>,
}

impl LoaderSettings {
    pub fn new(options: Options, plugins: Vec<PluginDescriptor>) -> Self {
        LoaderSettings {
            options,
            plugins,
            component_map: None,
            locales: LocaleTable::new(),
            theme_cache: Mutex::new(ThemeCache::new()),
        }
    }

    pub fn with_component_map(mut self, map: ComponentMap) -> Self {
        self.component_map = Some(map);
        self
    }

    pub fn with_locales(mut self, locales: LocaleTable) -> Self {
        self.locales = locales;
        self
    }

    /// Active plugins applying to `resource_path`, in declaration order
    pub fn plugins_for<'a>(
        &'a self,
        resource_path: &'a str,
    ) -> impl Iterator<Item = &'a Plugin> + 'a {
        self.plugins
            .iter()
            .filter(move |descriptor| descriptor.applies_to(resource_path))
            .map(|descriptor| &descriptor.plugin)
    }

    fn first_plugin<'a, T>(&'a self, select: impl Fn(&'a Plugin) -> Option<T>) -> Option<T> {
        self.plugins
            .iter()
            .find_map(|descriptor| select(&descriptor.plugin))
    }

    /// Whether named kit imports are expanded
    pub fn uses_kit_ui(&self) -> bool {
        self.options.use_kit_ui
            || self
                .plugins
                .iter()
                .any(|descriptor| matches!(descriptor.plugin, Plugin::KitUi))
    }

    /// Locale and dynamic flag of the first i18n plugin
    pub fn i18n(&self) -> (&str, bool) {
        self.first_plugin(|plugin| match plugin {
            Plugin::I18n { locale, dynamic } => Some((locale.as_str(), *dynamic)),
            _ => None,
        })
        .map(|(locale, dynamic)| {
            let locale = if locale.is_empty() { DEFAULT_LOCALE } else { locale };
            (locale, dynamic)
        })
        .unwrap_or((DEFAULT_LOCALE, false))
    }

    /// Feature flags of the first feature switch plugin
    pub fn feature_flags(&self) -> Option<&IndexMap<String, bool>> {
        self.first_plugin(|plugin| match plugin {
            Plugin::FeatureSwitch { features } => Some(features),
            _ => None,
        })
    }

    /// Variables of the configured theme file, empty when there is none
    ///
    /// Relative theme paths are resolved against the project root.
    pub fn theme_variables(&self) -> ThemeVariables {
        let Some((path, aliases)) = self.first_plugin(|plugin| match plugin {
            Plugin::LessTheme { path, aliases } => Some((path, aliases)),
            _ => None,
        }) else {
            return ThemeVariables::new();
        };

        let path = self.options.project_root().join(path);
        let variables = self
            .theme_cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .load(&path);

        remap_variables(variables, aliases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults_without_plugins() {
        let settings = LoaderSettings::new(Options::default(), Vec::new());
        assert_eq!(settings.i18n(), ("zh-CN", false));
        assert!(settings.feature_flags().is_none());
        assert!(settings.theme_variables().is_empty());
        assert!(!settings.uses_kit_ui());
    }

    #[test]
    fn test_plugin_lookups() {
        let features = IndexMap::from([("beta".to_string(), true)]);
        let settings = LoaderSettings::new(
            Options::default(),
            vec![
                PluginDescriptor::new(Plugin::KitUi),
                PluginDescriptor::new(Plugin::I18n {
                    locale: "en".to_string(),
                    dynamic: true,
                }),
                PluginDescriptor::new(Plugin::FeatureSwitch { features }),
            ],
        );

        assert!(settings.uses_kit_ui());
        assert_eq!(settings.i18n(), ("en", true));
        assert_eq!(settings.feature_flags().and_then(|flags| flags.get("beta")), Some(&true));
    }

    #[test]
    fn test_theme_variables_with_aliases() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("theme.less"), "@primary: #09bb07;\n@radius: 4px;\n").unwrap();

        let options = Options {
            project_root: Some(dir.path().to_path_buf()),
            ..Options::default()
        };
        let aliases = IndexMap::from([(
            "primary".to_string(),
            "button-primary-bg-color".to_string(),
        )]);
        let settings = LoaderSettings::new(
            options,
            vec![PluginDescriptor::new(Plugin::LessTheme {
                path: "theme.less".into(),
                aliases,
            })],
        );

        let variables = settings.theme_variables();
        assert_eq!(variables.get("button-primary-bg-color"), Some(&"#09bb07".to_string()));
        assert_eq!(variables.get("radius"), Some(&"4px".to_string()));
    }
}
