//! Template directives
//!
//! Passes over a component's template text: `<on>`/`<off>` feature blocks,
//! `$t()` translation calls, caller supplied replacements and appended text.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::attributes::replace_tags;
use crate::error::LoaderWarning;
use crate::locales::{translate as lookup_translation, LocaleTable};
use crate::paths::{file_name, to_slash};
use crate::plugin::{AppendContext, AppendFn, SourceFn};

/// `$t('key')` or `$t(identifier)`
static TRANSLATE_CALL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\$t\(\s*(?:'([^'\n]*)'|([A-Za-z_$][\w$.]*))\s*\)"#)
        .expect("valid translation pattern")
});

static CLOSING_TAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"</[A-Za-z][\w-]*>$").expect("valid closing tag pattern"));

pub type FeatureFlags = IndexMap<String, bool>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocaleMode {
    /// Translations are inlined as string literals at build time
    Static,
    /// Keys are prefixed and resolved at runtime
    Dynamic,
}

/// Translation settings for one kit component
#[derive(Debug, Clone, Copy)]
pub struct I18nContext<'a> {
    /// First segment of every key, the kit name
    pub module: &'a str,
    /// Second segment of every key
    pub component: &'a str,
    pub locale: &'a str,
    pub mode: LocaleMode,
    pub table: &'a LocaleTable,
}

/// A template rewrite supplied by a template parser plugin
#[derive(Clone, Copy)]
pub struct TemplateRewrite<'a> {
    pub transform: Option<&'a SourceFn>,
    pub replace_list: &'a [(Regex, String)],
}

/// Text appended to templates whose path matches `test`
#[derive(Clone, Copy)]
pub struct AppendRule<'a> {
    pub test: Option<&'a Regex>,
    pub generate: &'a AppendFn,
}

/// Everything [`process_template`] needs to know about the file
#[derive(Clone, Default)]
pub struct TemplateContext<'a> {
    pub resource_path: &'a str,
    pub features: Option<&'a FeatureFlags>,
    pub i18n: Option<I18nContext<'a>>,
    pub rewrites: Vec<TemplateRewrite<'a>>,
    pub appends: Vec<AppendRule<'a>>,
}

/// The processed template and the non-fatal problems found on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateOutput {
    pub code: String,
    pub warnings: Vec<LoaderWarning>,
}

/// Derives a kit component's name from its path
///
/// `…/components/x-button/index.vue` yields `x-button`.
pub fn component_name(resource_path: &str) -> Option<String> {
    let path = to_slash(resource_path);
    let (_, rest) = path.rsplit_once("/components/")?;
    let name = rest.replace("index.vue", "").replace('/', "");
    if name.is_empty() {
        return None;
    }
    Some(name)
}

/// Keeps or removes `<on feature="F">` and `<off feature="F">` blocks
///
/// `<on>` blocks survive only when `F` is `true`; `<off>` blocks survive
/// when `F` is `false` or unset.
pub fn strip_features(source: &str, flags: &FeatureFlags) -> String {
    let enabled = |tag: &crate::attributes::Tag<'_>| {
        tag.attribute("feature")
            .and_then(|feature| flags.get(feature))
            .copied()
            .unwrap_or(false)
    };

    let source = replace_tags(source, "on", |tag| {
        if enabled(tag) {
            tag.inner.unwrap_or_default().to_string()
        } else {
            String::new()
        }
    });

    replace_tags(&source, "off", |tag| {
        if enabled(tag) {
            String::new()
        } else {
            tag.inner.unwrap_or_default().to_string()
        }
    })
}

/// Resolves or prefixes `$t()` calls
///
/// Missing static translations are pushed to `warnings` and the call is left
/// as written.
pub fn translate(
    source: &str,
    i18n: &I18nContext<'_>,
    warnings: &mut Vec<LoaderWarning>,
) -> String {
    if !source.contains("$t(") {
        return source.to_string();
    }

    TRANSLATE_CALL_RE
        .replace_all(source, |captures: &Captures<'_>| {
            let call = &captures[0];
            let Some(key) = captures.get(1).map(|m| m.as_str()) else {
                // Identifiers can only be resolved at runtime
                return call.to_string();
            };
            let full_key = format!("{}.{}.{}", i18n.module, i18n.component, key);

            match i18n.mode {
                LocaleMode::Dynamic => format!("$t('{}')", full_key),
                LocaleMode::Static => {
                    match lookup_translation(i18n.table, &full_key, i18n.locale) {
                        Some(text) => format!("'{}'", text.replace('\'', "\\'")),
                        None => {
                            tracing::warn!(
                                key = %full_key,
                                locale = i18n.locale,
                                "missing translation"
                            );
                            warnings.push(LoaderWarning::MissingTranslation {
                                key: full_key,
                                locale: i18n.locale.to_string(),
                            });
                            call.to_string()
                        }
                    }
                }
            }
        })
        .into_owned()
}

/// Splices `text` in front of the template's final closing tag
///
/// Trailing whitespace and literal `\n` tokens are removed first. Templates
/// without a final closing tag are returned unchanged.
pub fn append_before_closing_tag(source: &str, text: &str) -> String {
    let trimmed = source.trim_end().replace("\\n", "");
    match CLOSING_TAG_RE.find(&trimmed) {
        Some(tag) => format!("{}{}{}", &trimmed[..tag.start()], text, tag.as_str()),
        None => source.to_string(),
    }
}

fn apply_rewrite(source: String, rewrite: &TemplateRewrite<'_>) -> String {
    let mut source = match rewrite.transform {
        Some(transform) => transform(&source),
        None => source,
    };
    for (pattern, replacement) in rewrite.replace_list {
        source = pattern.replace_all(&source, replacement.as_str()).into_owned();
    }
    source
}

/// Runs every template pass in order: translations, feature blocks,
/// rewrites, appended text
pub fn process_template(source: &str, ctx: &TemplateContext<'_>) -> TemplateOutput {
    let mut warnings = Vec::new();

    let mut code = match &ctx.i18n {
        Some(i18n) => translate(source, i18n, &mut warnings),
        None => source.to_string(),
    };

    if let Some(flags) = ctx.features {
        if code.contains("<on") || code.contains("<off") {
            code = strip_features(&code, flags);
        }
    }

    for rewrite in &ctx.rewrites {
        code = apply_rewrite(code, rewrite);
    }

    let basename = file_name(ctx.resource_path);
    for rule in &ctx.appends {
        if !rule.test.map_or(true, |test| test.is_match(ctx.resource_path)) {
            continue;
        }
        let append_ctx = AppendContext {
            resource_path: ctx.resource_path,
            basename: &basename,
        };
        if let Some(text) = (rule.generate)(&append_ctx).filter(|text| !text.is_empty()) {
            code = append_before_closing_tag(&code, &text);
        }
    }

    TemplateOutput { code, warnings }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn flags(entries: &[(&str, bool)]) -> FeatureFlags {
        entries
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    fn table() -> LocaleTable {
        let mut translations = IndexMap::new();
        translations.insert("en".to_string(), "OK".to_string());
        let mut table = LocaleTable::new();
        table.insert("kit.button.label".to_string(), translations);
        table
    }

    #[test]
    fn test_feature_switch() {
        let enabled = flags(&[("beta", true)]);
        assert_eq!(strip_features(r#"<on feature="beta">X</on>"#, &enabled), "X");
        assert_eq!(strip_features(r#"<off feature="beta">Y</off>"#, &enabled), "");

        let disabled = flags(&[("beta", false)]);
        assert_eq!(strip_features(r#"<on feature="beta">X</on>"#, &disabled), "");
        assert_eq!(strip_features(r#"<off feature="beta">Y</off>"#, &disabled), "Y");

        let unset = flags(&[]);
        assert_eq!(strip_features(r#"<on feature="beta">X</on>"#, &unset), "");
        assert_eq!(strip_features(r#"<off feature="beta">Y</off>"#, &unset), "Y");
    }

    #[test]
    fn test_feature_switch_per_occurrence() {
        let source = r#"<div><on feature="a">A</on><on feature="b">B</on><off feature="a">!A</off><on feature="a">A2</on></div>"#;
        let result = strip_features(source, &flags(&[("a", true)]));
        assert_eq!(result, "<div>AA2</div>");
    }

    #[test]
    fn test_static_translation() {
        let table = table();
        let i18n = I18nContext {
            module: "kit",
            component: "button",
            locale: "en",
            mode: LocaleMode::Static,
            table: &table,
        };
        let mut warnings = Vec::new();
        let result = translate(
            r#"<button :text="$t('label')" :title="$t(title)"></button>"#,
            &i18n,
            &mut warnings,
        );
        assert_eq!(result, r#"<button :text="'OK'" :title="$t(title)"></button>"#);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_missing_translation_is_reported() {
        let table = table();
        let i18n = I18nContext {
            module: "kit",
            component: "button",
            locale: "en",
            mode: LocaleMode::Static,
            table: &table,
        };
        let mut warnings = Vec::new();
        let source = "<span>{{ $t('missing') }}</span>";
        let result = translate(source, &i18n, &mut warnings);
        assert_eq!(result, source);
        assert_eq!(
            warnings,
            vec![LoaderWarning::MissingTranslation {
                key: "kit.button.missing".to_string(),
                locale: "en".to_string(),
            }]
        );
    }

    #[test]
    fn test_dynamic_translation() {
        let table = table();
        let i18n = I18nContext {
            module: "kit",
            component: "button",
            locale: "en",
            mode: LocaleMode::Dynamic,
            table: &table,
        };
        let mut warnings = Vec::new();
        let result = translate("{{ $t('label') }} {{ $t(text) }}", &i18n, &mut warnings);
        assert_eq!(result, "{{ $t('kit.button.label') }} {{ $t(text) }}");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_append_before_closing_tag() {
        assert_eq!(
            append_before_closing_tag("<div>\n  <p>x</p>\n</div>\n\n", "<i>!</i>"),
            "<div>\n  <p>x</p>\n<i>!</i></div>"
        );
        assert_eq!(
            append_before_closing_tag("<section>a\\n</section>\\n", "B"),
            "<section>aB</section>"
        );
        assert_eq!(append_before_closing_tag("plain text", "B"), "plain text");
    }

    #[test]
    fn test_component_name() {
        assert_eq!(
            component_name("/p/node_modules/vux/src/components/x-button/index.vue"),
            Some("x-button".to_string())
        );
        assert_eq!(
            component_name("C:\\p\\node_modules\\vux\\src\\components\\datetime\\index.vue"),
            Some("datetime".to_string())
        );
        assert_eq!(component_name("/p/src/App.vue"), None);
    }

    #[test]
    fn test_process_template() {
        let table = table();
        let features = flags(&[("beta", true)]);
        let replace_list = vec![(Regex::new("weui").unwrap(), "vux".to_string())];
        let generate: AppendFn = Arc::new(|ctx: &AppendContext<'_>| {
            Some(format!("<!-- {} -->", ctx.basename))
        });
        let test = Regex::new(r"button").unwrap();

        let ctx = TemplateContext {
            resource_path: "/p/kit/src/components/button/index.vue",
            features: Some(&features),
            i18n: Some(I18nContext {
                module: "kit",
                component: "button",
                locale: "en",
                mode: LocaleMode::Static,
                table: &table,
            }),
            rewrites: vec![TemplateRewrite {
                transform: None,
                replace_list: &replace_list,
            }],
            appends: vec![AppendRule {
                test: Some(&test),
                generate: &generate,
            }],
        };

        let source = r#"<div class="weui-btn"><on feature="beta">{{ $t('label') }}</on><off feature="beta">old</off></div>"#;
        let output = process_template(source, &ctx);
        assert_eq!(
            output.code,
            r#"<div class="vux-btn">{{ 'OK' }}<!-- index.vue --></div>"#
        );
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn test_plain_template_is_unchanged() {
        let source = "<div>\n  <p>hello</p>\n</div>\n";
        let output = process_template(source, &TemplateContext::default());
        assert_eq!(output.code, source);
    }
}
