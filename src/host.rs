//! Host build configuration
//!
//! The slice of the host's configuration the merge reads and writes: module
//! rules under either the modern (`rules`) or legacy (`loaders`) key, the
//! plugin list, and the merge state that makes repeated merges idempotent.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::plugin::{DoneFn, EmitAssets, EmitFn, HtmlFn, PluginDescriptor};
use crate::settings::LoaderSettings;

/// Which key the host keeps its module rules under
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFormat {
    /// `module.rules`
    Modern,
    /// `module.loaders`
    Legacy,
}

impl RuleFormat {
    /// An explicit override wins over probing the module configuration
    pub fn detect(module: &ModuleConfig, is_modern: Option<bool>) -> Self {
        match is_modern {
            Some(true) => RuleFormat::Modern,
            Some(false) => RuleFormat::Legacy,
            None if module.rules.is_some() => RuleFormat::Modern,
            None if module.loaders.is_some() => RuleFormat::Legacy,
            None => RuleFormat::Modern,
        }
    }

    pub fn loader_key(self) -> &'static str {
        match self {
            RuleFormat::Modern => "rules",
            RuleFormat::Legacy => "loaders",
        }
    }
}

/// An entry of a rule's `use` list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UseEntry {
    Name(String),
    Loader {
        loader: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        options: Option<Value>,
    },
}

impl UseEntry {
    pub fn loader_name(&self) -> &str {
        match self {
            UseEntry::Name(name) => name,
            UseEntry::Loader { loader, .. } => loader,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Resource pattern, as regex source
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loader: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub use_entries: Option<Vec<UseEntry>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
}

impl Rule {
    pub fn new(test: impl Into<String>, loader: impl Into<String>) -> Self {
        Rule {
            test: Some(test.into()),
            loader: Some(loader.into()),
            ..Rule::default()
        }
    }

    /// First stage named by `loader`, e.g. `babel-loader` for `babel-loader?x!y`
    pub fn loader_head(&self) -> Option<&str> {
        let loader = self.loader.as_deref()?;
        loader.split('!').next()?.split('?').next()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<Rule>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loaders: Option<Vec<Rule>>,
}

impl ModuleConfig {
    pub fn rules(&self, format: RuleFormat) -> &[Rule] {
        let rules = match format {
            RuleFormat::Modern => &self.rules,
            RuleFormat::Legacy => &self.loaders,
        };
        rules.as_deref().unwrap_or_default()
    }

    pub fn rules_mut(&mut self, format: RuleFormat) -> &mut Vec<Rule> {
        let rules = match format {
            RuleFormat::Modern => &mut self.rules,
            RuleFormat::Legacy => &mut self.loaders,
        };
        rules.get_or_insert_with(Vec::new)
    }
}

#[derive(Clone)]
pub enum HostPlugin {
    /// Hands the loader settings to the loaders (modern hosts)
    LoaderOptions(Arc<LoaderSettings>),
    /// Global constants replaced at build time
    Define(IndexMap<String, Value>),
    BuildDone(Vec<DoneFn>),
    Emit(EmitFn),
    /// Removes repeated rule blocks from emitted stylesheets
    DuplicateStyle,
    HtmlBuild(HtmlFn),
    /// A plugin owned by the host, kept untouched
    Other(String),
}

impl HostPlugin {
    /// Plugins derived from build hook descriptors, rebuilt on every merge
    pub fn is_build_hook(&self) -> bool {
        matches!(
            self,
            HostPlugin::BuildDone(_)
                | HostPlugin::Emit(_)
                | HostPlugin::DuplicateStyle
                | HostPlugin::HtmlBuild(_)
        )
    }
}

impl fmt::Debug for HostPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostPlugin::LoaderOptions(_) => f.write_str("LoaderOptions"),
            HostPlugin::Define(defines) => f.debug_tuple("Define").field(defines).finish(),
            HostPlugin::BuildDone(callbacks) => {
                write!(f, "BuildDone({} callbacks)", callbacks.len())
            }
            HostPlugin::Emit(_) => f.write_str("Emit"),
            HostPlugin::DuplicateStyle => f.write_str("DuplicateStyle"),
            HostPlugin::HtmlBuild(_) => f.write_str("HtmlBuild"),
            HostPlugin::Other(name) => f.debug_tuple("Other").field(name).finish(),
        }
    }
}

/// Marker left by the merge on the configuration it modified
#[derive(Debug, Clone, Default)]
pub struct MergeState {
    /// Number of completed merges
    pub merges: u32,
    /// Every descriptor merged so far, superseded by name
    pub plugins: Vec<PluginDescriptor>,
}

#[derive(Debug, Default)]
pub struct HostConfig {
    pub module: ModuleConfig,
    pub plugins: Vec<HostPlugin>,
    /// Loader settings of legacy hosts, which read them from the configuration
    pub loader_settings: Option<Arc<LoaderSettings>>,
    pub merge_state: Option<MergeState>,
}

impl HostConfig {
    pub fn with_module(module: ModuleConfig) -> Self {
        HostConfig {
            module,
            ..HostConfig::default()
        }
    }

    /// Settings handed to the loaders, wherever the merge put them
    pub fn loader_settings(&self) -> Option<&Arc<LoaderSettings>> {
        self.plugins
            .iter()
            .rev()
            .find_map(|plugin| match plugin {
                HostPlugin::LoaderOptions(settings) => Some(settings),
                _ => None,
            })
            .or(self.loader_settings.as_ref())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.plugins.iter().any(|plugin| match plugin {
            HostPlugin::Define(defines) => defines.contains_key(name),
            _ => false,
        })
    }

    /// Runs every build done callback
    pub fn build_done(&self) {
        for plugin in &self.plugins {
            if let HostPlugin::BuildDone(callbacks) = plugin {
                callbacks.iter().for_each(|callback| callback());
            }
        }
    }

    /// Passes the assets about to be written through the emit plugins
    pub fn emit(&self, assets: &mut EmitAssets) {
        for plugin in &self.plugins {
            match plugin {
                HostPlugin::Emit(callback) => callback(assets),
                HostPlugin::DuplicateStyle => {
                    for (name, content) in assets.iter_mut() {
                        if name.ends_with(".css") {
                            *content = dedupe_css_rules(content);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Passes a generated HTML page through the html plugins
    pub fn html_built(&self, html: &mut String) {
        for plugin in &self.plugins {
            if let HostPlugin::HtmlBuild(callback) = plugin {
                callback(html);
            }
        }
    }
}

/// Drops top level blocks that repeat an earlier block verbatim
///
/// At-rule blocks such as `@media (…) { … }` are compared as a whole, so a
/// rule repeated inside two different media queries is kept in both.
pub fn dedupe_css_rules(css: &str) -> String {
    let mut seen = HashSet::new();
    let mut output = String::with_capacity(css.len());
    let mut depth = 0usize;
    let mut start = 0;

    for (index, ch) in css.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    let block = &css[start..=index];
                    if seen.insert(block.trim()) {
                        output.push_str(block);
                    }
                    start = index + 1;
                }
            }
            _ => {}
        }
    }

    output.push_str(&css[start..]);
    output
}
