//! Configuration merge
//!
//! Merges the loader's options and plugin descriptors into the host build
//! configuration. Everything that can fail runs before the host is touched,
//! so a failed merge leaves the configuration as it was.

use std::collections::HashSet;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::component_map::ComponentMap;
use crate::config::Options;
use crate::error::{LoaderError, Result};
use crate::host::{HostConfig, HostPlugin, MergeState, Rule, RuleFormat, UseEntry};
use crate::locales::{default_paths, load_locale_table, LocaleTable};
use crate::plugin::{Plugin, PluginDescriptor};
use crate::settings::LoaderSettings;

const COMPONENT_RULE_TEST: &str = r"\.vue$";
const LOCALE_DEFINE: &str = "__VUX_LOCALE__";
const SSR_DEFINE: &str = "__VUX_SSR__";

/// Options and plugins handed to [`merge_config`]
#[derive(Debug, Clone, Default)]
pub struct Descriptor {
    pub options: Options,
    pub plugins: Vec<PluginDescriptor>,
}

impl Descriptor {
    pub fn new(options: Options) -> Self {
        Descriptor {
            options,
            plugins: Vec::new(),
        }
    }

    pub fn with_plugin(mut self, plugin: PluginDescriptor) -> Self {
        self.plugins.push(plugin);
        self
    }
}

/// Loader name without its query, e.g. `babel-loader` for `babel-loader?cacheDirectory`
fn loader_head(name: &str) -> &str {
    name.split('?').next().unwrap_or(name)
}

fn is_component_loader(name: &str) -> bool {
    matches!(loader_head(name), "vue" | "vue-loader")
}

fn is_transpiler(name: &str) -> bool {
    matches!(loader_head(name), "babel" | "babel-loader" | "ts-loader")
}

fn ensure_unique_names(plugins: &[PluginDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for descriptor in plugins {
        if !seen.insert(descriptor.name.as_str()) {
            return Err(LoaderError::DuplicatePlugin(descriptor.name.clone()));
        }
    }
    Ok(())
}

/// Adds `incoming` to the accumulated descriptors; same names are replaced in place
fn accumulate(
    mut merged: Vec<PluginDescriptor>,
    incoming: Vec<PluginDescriptor>,
) -> Vec<PluginDescriptor> {
    for descriptor in incoming {
        match merged.iter_mut().find(|one| one.name == descriptor.name) {
            Some(existing) => *existing = descriptor,
            None => merged.push(descriptor),
        }
    }
    merged
}

/// Rewrites a component rule so the loader runs ahead of the component compiler
///
/// # Returns
///
/// `true` when the rule handles component files, rewritten or already rewritten
fn rewrite_component_rule(rule: &mut Rule, options: &Options, format: RuleFormat) -> bool {
    let own_loader = options
        .loader_string
        .split('!')
        .next()
        .unwrap_or_default()
        .to_string();

    if let Some(entries) = rule.use_entries.as_mut() {
        let Some(index) = entries
            .iter()
            .position(|entry| is_component_loader(entry.loader_name()))
        else {
            return false;
        };
        if !entries.iter().any(|entry| entry.loader_name() == own_loader) {
            entries.insert(index, UseEntry::Name(own_loader));
        }
        return true;
    }

    let Some(head) = rule.loader_head() else {
        return false;
    };
    if head == own_loader {
        return true;
    }
    if !is_component_loader(head) {
        return false;
    }

    match (rule.options.take(), format) {
        (Some(options), RuleFormat::Modern) => {
            let loader = rule.loader.take().unwrap_or_default();
            rule.use_entries = Some(vec![
                UseEntry::Name(own_loader),
                UseEntry::Loader {
                    loader,
                    options: Some(options),
                },
            ]);
        }
        (rule_options, _) => {
            rule.options = rule_options;
            rule.loader = Some(options.loader_string.clone());
        }
    }
    true
}

/// Appends the js stage to a transpiler rule
fn append_js_stage(rule: &mut Rule, js_stage: &str, format: RuleFormat) {
    if let Some(entries) = rule.use_entries.as_mut() {
        let transpiles = entries.iter().any(|entry| is_transpiler(entry.loader_name()));
        if transpiles && !entries.iter().any(|entry| entry.loader_name() == js_stage) {
            entries.push(UseEntry::Name(js_stage.to_string()));
        }
        return;
    }

    if !rule.loader_head().is_some_and(is_transpiler) {
        return;
    }
    let Some(loader) = rule.loader.take() else {
        return;
    };
    if loader.split('!').any(|segment| segment == js_stage) {
        rule.loader = Some(loader);
        return;
    }

    match (rule.options.take(), format) {
        (Some(options), RuleFormat::Modern) => {
            rule.use_entries = Some(vec![
                UseEntry::Loader {
                    loader,
                    options: Some(options),
                },
                UseEntry::Name(js_stage.to_string()),
            ]);
        }
        (rule_options, _) => {
            rule.options = rule_options;
            rule.loader = Some(format!("{}!{}", loader, js_stage));
        }
    }
}

fn kit_source_rule(options: &Options) -> Rule {
    Rule {
        include: Some(options.kit_root().to_string_lossy().into_owned()),
        ..Rule::new(
            format!("node_modules.*{}.src.*?js$", regex::escape(&options.ui_kit)),
            "babel-loader",
        )
    }
}

fn rewrite_rules(host: &mut HostConfig, options: &Options, format: RuleFormat) {
    let kit_rule = options.compile_kit_source.then(|| kit_source_rule(options));
    let rules = host.module.rules_mut(format);

    if options.rewrites_loader_string() {
        let mut handled = false;
        for rule in rules.iter_mut() {
            handled |= rewrite_component_rule(rule, options, format);
        }
        if !handled {
            rules.push(Rule::new(COMPONENT_RULE_TEST, options.loader_string.clone()));
        }
    }

    // The kit's own sources only go through the transpiler
    let is_kit_rule = |rule: &Rule| kit_rule.as_ref().is_some_and(|kit| kit.test == rule.test);
    for rule in rules.iter_mut().filter(|rule| !is_kit_rule(rule)) {
        append_js_stage(rule, &options.js_stage, format);
    }

    if let Some(kit_rule) = kit_rule {
        if !rules.iter().any(|rule| rule.test == kit_rule.test) {
            rules.push(kit_rule);
        }
    }
}

fn inject_defines(host: &mut HostConfig, settings: &LoaderSettings) {
    let (locale, _) = settings.i18n();
    let candidates = [
        (LOCALE_DEFINE, Value::String(locale.to_string())),
        (SSR_DEFINE, Value::Bool(settings.options.ssr)),
    ];

    let defines: IndexMap<String, Value> = candidates
        .into_iter()
        .filter(|(name, _)| !host.is_defined(name))
        .map(|(name, value)| (name.to_string(), value))
        .collect();

    if !defines.is_empty() {
        host.plugins.push(HostPlugin::Define(defines));
    }
}

fn build_hook_plugins(active: &[PluginDescriptor]) -> Vec<HostPlugin> {
    let mut plugins = Vec::new();

    let done: Vec<_> = active
        .iter()
        .filter_map(|descriptor| match &descriptor.plugin {
            Plugin::DoneCallback { callback } => Some(Arc::clone(callback)),
            _ => None,
        })
        .collect();
    if !done.is_empty() {
        plugins.push(HostPlugin::BuildDone(done));
    }

    for descriptor in active {
        match &descriptor.plugin {
            Plugin::DuplicateStyle
                if !plugins.iter().any(|p| matches!(p, HostPlugin::DuplicateStyle)) =>
            {
                plugins.push(HostPlugin::DuplicateStyle)
            }
            Plugin::EmitCallback { callback }
                if !plugins.iter().any(|p| matches!(p, HostPlugin::Emit(_))) =>
            {
                plugins.push(HostPlugin::Emit(Arc::clone(callback)))
            }
            Plugin::HtmlBuildCallback { callback }
                if !plugins.iter().any(|p| matches!(p, HostPlugin::HtmlBuild(_))) =>
            {
                plugins.push(HostPlugin::HtmlBuild(Arc::clone(callback)))
            }
            _ => {}
        }
    }

    plugins
}

/// Builds the settings handed to the loaders, reading the kit's component
/// map and locale tables when kit imports are expanded
fn build_settings(options: Options, active: Vec<PluginDescriptor>) -> Result<LoaderSettings> {
    let settings = LoaderSettings::new(options, active);
    if !settings.uses_kit_ui() {
        return Ok(settings);
    }

    let map = ComponentMap::load(&ComponentMap::default_path(&settings.options))?;
    let (kit_path, project_path) = default_paths(&settings.options);
    let locales: LocaleTable = load_locale_table(&kit_path, &project_path);

    Ok(settings.with_component_map(map).with_locales(locales))
}

fn hand_off_settings(host: &mut HostConfig, settings: Arc<LoaderSettings>, format: RuleFormat) {
    match format {
        RuleFormat::Modern => {
            let existing = host
                .plugins
                .iter_mut()
                .find(|plugin| matches!(plugin, HostPlugin::LoaderOptions(_)));
            match existing {
                Some(plugin) => *plugin = HostPlugin::LoaderOptions(settings),
                None => host.plugins.push(HostPlugin::LoaderOptions(settings)),
            }
        }
        RuleFormat::Legacy => host.loader_settings = Some(settings),
    }
}

/// Merges a descriptor into the host configuration
///
/// # Arguments
///
/// * `host` - The host build configuration, modified in place
/// * `descriptor` - Loader options and plugin descriptors
///
/// # Returns
///
/// An error when the descriptor names a plugin twice or the component map
/// cannot be read; the host configuration is unchanged in both cases
pub fn merge_config(host: &mut HostConfig, descriptor: Descriptor) -> Result<()> {
    let Descriptor { options, plugins } = descriptor;
    ensure_unique_names(&plugins)?;

    if !options.is_test {
        tracing::info!("vux-loader: bug reports https://github.com/airyland/vux-loader/issues");
    }

    let format = RuleFormat::detect(&host.module, options.is_webpack2);
    let previous = host.merge_state.as_ref();
    let merges = previous.map_or(0, |state| state.merges) + 1;
    let accumulated = accumulate(
        previous.map(|state| state.plugins.clone()).unwrap_or_default(),
        plugins,
    );

    let env = options.env.clone();
    let active: Vec<PluginDescriptor> = accumulated
        .iter()
        .filter(|descriptor| descriptor.is_active(env.as_deref()))
        .cloned()
        .collect();
    let hooks = build_hook_plugins(&active);
    let settings = Arc::new(build_settings(options, active)?);

    host.merge_state = Some(MergeState {
        merges,
        plugins: accumulated,
    });

    rewrite_rules(host, &settings.options, format);
    inject_defines(host, &settings);
    host.plugins.retain(|plugin| !plugin.is_build_hook());
    host.plugins.extend(hooks);

    tracing::info!(
        merges,
        plugins = settings.plugins.len(),
        key = format.loader_key(),
        "merged loader configuration"
    );
    hand_off_settings(host, settings, format);

    Ok(())
}
