//! Per-file loaders
//!
//! `component_loader` runs on the intermediate source of a component file and
//! splices the block loaders below into its requests. The host then runs each
//! block loader on the matching block.

use std::fs;

use crate::error::Result;
use crate::import_transformer::{dev_relative_prefix, expand_imports, ExpandOptions};
use crate::loader_chain::{inject_loader, BlockKind, InjectParams};
use crate::locales::{sync_component_locales, COMPONENT_LOCALES_PATH};
use crate::paths::to_slash;
use crate::plugin::Plugin;
use crate::settings::LoaderSettings;
use crate::template::{
    component_name, process_template, AppendRule, I18nContext, LocaleMode, TemplateContext,
    TemplateOutput, TemplateRewrite,
};

/// The file being processed and the settings of the build
#[derive(Debug, Clone, Copy)]
pub struct LoaderContext<'a> {
    pub resource_path: &'a str,
    pub settings: &'a LoaderSettings,
}

impl<'a> LoaderContext<'a> {
    pub fn new(resource_path: &'a str, settings: &'a LoaderSettings) -> Self {
        LoaderContext {
            resource_path,
            settings,
        }
    }

    fn source_dir(&self) -> &'a str {
        self.settings.options.source_root.as_deref().unwrap_or("src")
    }

    /// Whether the file is one of the kit's own components
    fn is_kit_component(&self) -> bool {
        let kit = &self.settings.options.ui_kit;
        let marker = format!("/{}/{}/components/", kit, self.source_dir());
        to_slash(self.resource_path).contains(&marker)
    }
}

/// Adds the block loaders to the requests of a component file
pub fn component_loader(source: &str, ctx: &LoaderContext<'_>) -> String {
    if source.is_empty() {
        return String::new();
    }

    let options = &ctx.settings.options;
    let variables = ctx.settings.theme_variables();
    let params = InjectParams {
        preprocessor: &options.preprocessor,
        ..InjectParams::default()
    };

    let source = inject_loader(source, BlockKind::Script, &options.script_stage, &params);
    let source = inject_loader(
        &source,
        BlockKind::Style,
        &options.style_stage,
        &InjectParams {
            modify_vars: Some(&variables),
            ..params
        },
    );
    inject_loader(
        &source,
        BlockKind::Template,
        &options.template_stage,
        &InjectParams {
            post_compile_stage: Some(&options.before_template_stage),
            ..params
        },
    )
}

fn expand_kit_imports(source: String, ctx: &LoaderContext<'_>) -> Result<String> {
    if !ctx.settings.uses_kit_ui() {
        return Ok(source);
    }
    let Some(map) = ctx.settings.component_map.as_ref() else {
        tracing::debug!(
            resource = ctx.resource_path,
            "no component map loaded, skipping expansion"
        );
        return Ok(source);
    };

    expand_imports(&source, map, &ExpandOptions::new(&ctx.settings.options, ctx.resource_path))
}

/// Runs the script parsers, then expands kit imports
pub fn script_loader(source: &str, ctx: &LoaderContext<'_>) -> Result<String> {
    let mut source = source.to_string();
    for plugin in ctx.settings.plugins_for(ctx.resource_path) {
        if let Plugin::ScriptParser { transform } = plugin {
            source = transform(&source);
        }
    }

    expand_kit_imports(source, ctx)
}

/// Expands kit imports of plain script files, then runs the import parsers
pub fn js_loader(source: &str, ctx: &LoaderContext<'_>) -> Result<String> {
    let mut source = expand_kit_imports(source.to_string(), ctx)?;
    for plugin in ctx.settings.plugins_for(ctx.resource_path) {
        if let Plugin::ImportParser { transform } = plugin {
            source = transform(&source);
        }
    }
    Ok(source)
}

/// Runs the style parsers; while developing the kit, `~<kit>/<src>` imports
/// are made relative
pub fn style_loader(source: &str, ctx: &LoaderContext<'_>) -> String {
    let mut source = source.to_string();
    for plugin in ctx.settings.plugins_for(ctx.resource_path) {
        if let Plugin::StyleParser { transform } = plugin {
            source = transform(&source);
        }
    }

    let options = &ctx.settings.options;
    if options.kit_dev {
        let kit_import = format!("~{}/{}", options.ui_kit, ctx.source_dir());
        if source.contains(&kit_import) {
            let prefix = dev_relative_prefix(&ExpandOptions::new(options, ctx.resource_path));
            source = source.replace(&kit_import, &prefix);
        }
    }

    source
}

/// Copies the `<i18n>` block of a project component into the project's
/// component table; failures are logged and the build goes on
fn collect_component_locales(ctx: &LoaderContext<'_>) {
    let source = match fs::read_to_string(ctx.resource_path) {
        Ok(source) => source,
        Err(err) => {
            tracing::debug!(
                resource = ctx.resource_path,
                error = %err,
                "component file is not readable"
            );
            return;
        }
    };

    let table = ctx.settings.options.project_root().join(COMPONENT_LOCALES_PATH);
    if let Err(err) = sync_component_locales(&source, &table) {
        tracing::warn!(resource = ctx.resource_path, error = %err, "i18n block was not collected");
    }
}

/// Runs the template passes configured by the plugins
///
/// With dynamic i18n, project components also have their `<i18n>` block
/// collected into the project's component table.
pub fn template_loader(source: &str, ctx: &LoaderContext<'_>) -> TemplateOutput {
    let settings = ctx.settings;
    let (locale, dynamic) = settings.i18n();
    if dynamic && !ctx.is_kit_component() {
        collect_component_locales(ctx);
    }

    let component = if ctx.is_kit_component() {
        component_name(ctx.resource_path)
    } else {
        None
    };
    let i18n = component.as_deref().map(|component| I18nContext {
        module: &settings.options.ui_kit,
        component,
        locale,
        mode: if dynamic {
            LocaleMode::Dynamic
        } else {
            LocaleMode::Static
        },
        table: &settings.locales,
    });

    let rewrites = settings
        .plugins_for(ctx.resource_path)
        .filter_map(|plugin| match plugin {
            Plugin::TemplateParser {
                transform,
                replace_list,
            } => Some(TemplateRewrite {
                transform: transform.as_ref(),
                replace_list,
            }),
            _ => None,
        })
        .collect();

    let appends = settings
        .plugins
        .iter()
        .filter_map(|descriptor| match &descriptor.plugin {
            Plugin::TemplateStringAppend { generate } => Some(AppendRule {
                test: descriptor.test.as_ref(),
                generate,
            }),
            _ => None,
        })
        .collect();

    let template_ctx = TemplateContext {
        resource_path: ctx.resource_path,
        features: settings.feature_flags(),
        i18n,
        rewrites,
        appends,
    };
    process_template(source, &template_ctx)
}
