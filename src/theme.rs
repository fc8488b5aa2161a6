//! Theme variable files
//!
//! A theme is a line oriented `@name: value;` file. The parsed variables are
//! handed to the stylesheet preprocessor as `modifyVars`.

use indexmap::IndexMap;

pub type ThemeVariables = IndexMap<String, String>;

fn strip_trailing_comment<'a>(line: &'a str, marker: &str) -> &'a str {
    match line.find(marker) {
        Some(index) if index > 0 => line[..index].trim(),
        _ => line,
    }
}

/// Parses `@name: value;` declarations, one per line
///
/// Lines starting with `//` or `/*` are skipped and trailing comments removed.
pub fn parse_theme_variables(content: &str) -> ThemeVariables {
    let mut variables = ThemeVariables::new();

    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("//") || trimmed.starts_with("/*") {
            continue;
        }

        let line = strip_trailing_comment(trimmed, "//");
        let line = strip_trailing_comment(line, "/*");

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim().trim_start_matches('@');
        if key.is_empty() {
            continue;
        }

        let value = value.trim().trim_end_matches(';').trim();
        variables.insert(key.to_string(), value.to_string());
    }

    variables
}

/// Renames variables through an alias table (`old name -> new name`)
pub fn remap_variables(
    variables: ThemeVariables,
    aliases: &IndexMap<String, String>,
) -> ThemeVariables {
    if aliases.is_empty() {
        return variables;
    }

    variables
        .into_iter()
        .map(|(name, value)| match aliases.get(&name) {
            Some(alias) => (alias.clone(), value),
            None => (name, value),
        })
        .collect()
}
