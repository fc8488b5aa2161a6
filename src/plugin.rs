//! Plugin descriptors
//!
//! Each plugin kind carries exactly the data its consumer needs. Descriptors
//! wrap a plugin with the name used for duplicate detection, an optional
//! resource path filter and the build environments it is active in.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::Regex;

use crate::error::Result;

/// Rewrites a block's source
pub type SourceFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Produces text appended to a template, `None` to append nothing
pub type AppendFn = Arc<dyn Fn(&AppendContext<'_>) -> Option<String> + Send + Sync>;

/// Runs when a build has finished
pub type DoneFn = Arc<dyn Fn() + Send + Sync>;

/// Emitted asset name to content
pub type EmitAssets = IndexMap<String, String>;

/// Inspects or changes assets right before they are written
pub type EmitFn = Arc<dyn Fn(&mut EmitAssets) + Send + Sync>;

/// Rewrites a generated HTML page
pub type HtmlFn = Arc<dyn Fn(&mut String) + Send + Sync>;

/// Data handed to a template append generator
#[derive(Debug, Clone, Copy)]
pub struct AppendContext<'a> {
    pub resource_path: &'a str,
    pub basename: &'a str,
}

#[derive(Clone)]
pub enum Plugin {
    /// Rewrites component scripts
    ScriptParser { transform: SourceFn },
    /// Rewrites component templates, then applies a list of replacements
    TemplateParser {
        transform: Option<SourceFn>,
        replace_list: Vec<(Regex, String)>,
    },
    /// Rewrites component styles
    StyleParser { transform: SourceFn },
    /// Rewrites plain script files passing through the secondary transpilers
    ImportParser { transform: SourceFn },
    /// Keeps or strips `<on>`/`<off>` template blocks
    FeatureSwitch { features: IndexMap<String, bool> },
    DoneCallback { callback: DoneFn },
    EmitCallback { callback: EmitFn },
    /// Locale of kit templates; `dynamic` keeps translations as runtime lookups
    I18n { locale: String, dynamic: bool },
    /// Theme file whose variables override the kit's stylesheet variables
    LessTheme {
        path: PathBuf,
        aliases: IndexMap<String, String>,
    },
    /// Enables on-demand expansion of kit imports
    KitUi,
    DuplicateStyle,
    /// Appends generated text to matching templates
    TemplateStringAppend { generate: AppendFn },
    HtmlBuildCallback { callback: HtmlFn },
}

impl Plugin {
    /// Canonical descriptor name of the plugin kind
    pub fn name(&self) -> &'static str {
        match self {
            Plugin::ScriptParser { .. } => "script-parser",
            Plugin::TemplateParser { .. } => "template-parser",
            Plugin::StyleParser { .. } => "style-parser",
            Plugin::ImportParser { .. } => "js-parser",
            Plugin::FeatureSwitch { .. } => "template-feature-switch",
            Plugin::DoneCallback { .. } => "build-done-callback",
            Plugin::EmitCallback { .. } => "build-emit-callback",
            Plugin::I18n { .. } => "i18n",
            Plugin::LessTheme { .. } => "less-theme",
            Plugin::KitUi => "vux-ui",
            Plugin::DuplicateStyle => "duplicate-style",
            Plugin::TemplateStringAppend { .. } => "template-string-append",
            Plugin::HtmlBuildCallback { .. } => "html-build-callback",
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::FeatureSwitch { features } => f
                .debug_struct("FeatureSwitch")
                .field("features", features)
                .finish(),
            Plugin::I18n { locale, dynamic } => f
                .debug_struct("I18n")
                .field("locale", locale)
                .field("dynamic", dynamic)
                .finish(),
            Plugin::LessTheme { path, aliases } => f
                .debug_struct("LessTheme")
                .field("path", path)
                .field("aliases", aliases)
                .finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// A named, optionally filtered plugin
#[derive(Debug, Clone)]
pub struct PluginDescriptor {
    pub name: String,
    pub plugin: Plugin,
    /// Resource paths the plugin applies to (optional, all when absent)
    pub test: Option<Regex>,
    /// Build environments the plugin is active in (all when empty)
    pub envs: Vec<String>,
}

impl PluginDescriptor {
    pub fn new(plugin: Plugin) -> Self {
        PluginDescriptor {
            name: plugin.name().to_string(),
            plugin,
            test: None,
            envs: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_test(mut self, test: Regex) -> Self {
        self.test = Some(test);
        self
    }

    /// Like [`PluginDescriptor::with_test`], compiling the pattern first
    pub fn with_test_pattern(self, pattern: &str) -> Result<Self> {
        Ok(self.with_test(Regex::new(pattern)?))
    }

    pub fn with_envs<I, S>(mut self, envs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.envs = envs.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the descriptor takes part in a build for `env`
    pub fn is_active(&self, env: Option<&str>) -> bool {
        if self.envs.is_empty() {
            return true;
        }
        env.is_some_and(|env| self.envs.iter().any(|one| one == env))
    }

    /// Whether the descriptor applies to `resource_path`
    pub fn applies_to(&self, resource_path: &str) -> bool {
        self.test
            .as_ref()
            .map_or(true, |test| test.is_match(resource_path))
    }
}
