//! Import declaration parser
//!
//! Locates single-line `import { a, b as c } from 'module'` statements and
//! lets a caller decide what each statement is replaced with.
//!
//! A match never crosses a line break and the brace group may not contain
//! braces, so one match is always one complete single-line statement. Named
//! import lists spanning several lines are left untouched.

use std::convert::Infallible;

use once_cell::sync::Lazy;
use regex::Regex;

/// Pattern for the module specifier when no module name is given
const ANY_MODULE: &str = r#"[^'"\n]*"#;

static ANY_MODULE_RE: Lazy<Regex> =
    Lazy::new(|| build_import_regex(ANY_MODULE).expect("valid import pattern"));

/// A single name of a named import clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedName {
    /// Name exported by the module
    pub original_name: String,
    /// Local binding; equal to `original_name` without alias, empty for `A as`
    pub new_name: String,
}

impl ImportedName {
    fn parse(entry: &str) -> Self {
        let tokens: Vec<&str> = entry.split_whitespace().collect();
        match tokens.as_slice() {
            [original, "as", alias] => ImportedName {
                original_name: original.to_string(),
                new_name: alias.to_string(),
            },
            [original, "as"] => ImportedName {
                original_name: original.to_string(),
                new_name: String::new(),
            },
            _ => ImportedName {
                original_name: entry.to_string(),
                new_name: entry.to_string(),
            },
        }
    }
}

/// A located import statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportStatement<'a> {
    /// The whole matched statement, including the `from` clause
    pub raw: &'a str,
    /// The module specifier without quotes
    pub module_name: &'a str,
    /// Names of the brace clause in declaration order
    pub components: Vec<ImportedName>,
}

fn build_import_regex(module_pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r#"import[^{{}};\n]*\{{([^{{}}\n]*)\}}[^{{}};\n]*?from[^\S\n]*['"]({})['"]"#,
        module_pattern
    ))
}

fn split_names(clause: &str) -> Vec<ImportedName> {
    clause
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(ImportedName::parse)
        .collect()
}

/// Rewrites every import statement naming `module_name`
///
/// # Arguments
///
/// * `source` - The source text
/// * `module_name` - The module to look for, `None` matches any module
/// * `rewrite` - Produces the replacement for a whole statement
///
/// # Returns
///
/// The rewritten source, or the first error returned by `rewrite`
pub fn rewrite_imports<F, E>(
    source: &str,
    module_name: Option<&str>,
    mut rewrite: F,
) -> Result<String, E>
where
    F: FnMut(&ImportStatement<'_>) -> Result<String, E>,
{
    if !source.contains("import") {
        return Ok(source.to_string());
    }

    let owned_re;
    let import_re = match module_name {
        Some(name) => {
            if !source.contains(name) {
                return Ok(source.to_string());
            }
            owned_re = match build_import_regex(&regex::escape(name)) {
                Ok(re) => re,
                Err(_) => return Ok(source.to_string()),
            };
            &owned_re
        }
        None => &*ANY_MODULE_RE,
    };

    let mut result = String::with_capacity(source.len());
    let mut last_end = 0;

    for captures in import_re.captures_iter(source) {
        let (Some(whole), Some(clause), Some(module)) =
            (captures.get(0), captures.get(1), captures.get(2))
        else {
            continue;
        };

        let statement = ImportStatement {
            raw: whole.as_str(),
            module_name: module.as_str(),
            components: split_names(clause.as_str()),
        };

        result.push_str(&source[last_end..whole.start()]);
        result.push_str(&rewrite(&statement)?);
        last_end = whole.end();
    }

    result.push_str(&source[last_end..]);
    Ok(result)
}

/// Infallible form of [`rewrite_imports`]
pub fn parse_imports<F>(source: &str, module_name: Option<&str>, mut rewrite: F) -> String
where
    F: FnMut(&ImportStatement<'_>) -> String,
{
    match rewrite_imports::<_, Infallible>(source, module_name, |statement| Ok(rewrite(statement)))
    {
        Ok(result) => result,
        Err(never) => match never {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(source: &str, module_name: Option<&str>) -> Vec<Vec<(String, String)>> {
        let mut found = Vec::new();
        parse_imports(source, module_name, |statement| {
            found.push(
                statement
                    .components
                    .iter()
                    .map(|c| (c.original_name.clone(), c.new_name.clone()))
                    .collect(),
            );
            statement.raw.to_string()
        });
        found
    }

    fn pair(a: &str, b: &str) -> (String, String) {
        (a.to_string(), b.to_string())
    }

    #[test]
    fn test_whitespace_variants() {
        for source in [
            "import {a,b} from 'vux'",
            "import { a,b} from 'vux'",
            "import {  a, b } from 'vux'",
        ] {
            assert_eq!(
                names(source, Some("vux")),
                vec![vec![pair("a", "a"), pair("b", "b")]],
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_aliases() {
        assert_eq!(
            names("import {  a,  b  as  c } from 'vux'", Some("vux")),
            vec![vec![pair("a", "a"), pair("b", "c")]]
        );
        // Names containing `as` are not split
        assert_eq!(
            names("import { Masker, Toast as T } from 'vux'", Some("vux")),
            vec![vec![pair("Masker", "Masker"), pair("Toast", "T")]]
        );
        // An empty alias is kept as the skip signal
        assert_eq!(
            names("import { Marker as } from 'vux'", Some("vux")),
            vec![vec![pair("Marker", "")]]
        );
        // Trailing comma
        assert_eq!(
            names("import { a, } from 'vux'", Some("vux")),
            vec![vec![pair("a", "a")]]
        );
    }

    #[test]
    fn test_replacement_covers_whole_statement() {
        let source = "import Vue from 'vue'\nimport { Group, Cell } from 'vux'\nexport default {}";
        let result = parse_imports(source, Some("vux"), |statement| {
            assert_eq!(statement.raw, "import { Group, Cell } from 'vux'");
            assert_eq!(statement.module_name, "vux");
            "// replaced".to_string()
        });
        assert_eq!(result, "import Vue from 'vue'\n// replaced\nexport default {}");
    }

    #[test]
    fn test_multiple_modules_with_wildcard() {
        let source = "import {a,b} from 'vux1'\n  import {  a as AA,  b  as  BB } from 'vux2'";
        let mut modules = Vec::new();
        let result = parse_imports(source, None, |statement| {
            modules.push(statement.module_name.to_string());
            format!("<{}>", statement.components.len())
        });
        assert_eq!(modules, vec!["vux1", "vux2"]);
        assert_eq!(result, "<2>\n  <2>");
    }

    #[test]
    fn test_braces_on_one_line_are_not_mispaired() {
        let source = "import { a } from 'other'; import { b } from 'vux'";
        assert_eq!(names(source, Some("vux")), vec![vec![pair("b", "b")]]);
    }

    #[test]
    fn test_module_name_must_match_exactly() {
        let source = "import { a } from 'vux/src/components/a'";
        assert!(names(source, Some("vux")).is_empty());
    }

    #[test]
    fn test_multiline_import_is_not_matched() {
        let source = "import {\n  Group,\n  Cell\n} from 'vux'";
        let result = parse_imports(source, Some("vux"), |_| "replaced".to_string());
        assert_eq!(result, source);
    }

    #[test]
    fn test_prefilters() {
        // No `import` keyword
        let source = "const { a } = require('vux')";
        assert_eq!(parse_imports(source, Some("vux"), |_| unreachable!()), source);

        // Module name absent from the source
        let source = "import { a } from 'other'";
        assert_eq!(parse_imports(source, Some("vux"), |_| unreachable!()), source);
    }

    #[test]
    fn test_rewrite_error_propagates() {
        let source = "import { a } from 'vux'";
        let result: Result<String, String> =
            rewrite_imports(source, Some("vux"), |_| Err("boom".to_string()));
        assert_eq!(result, Err("boom".to_string()));
    }
}
