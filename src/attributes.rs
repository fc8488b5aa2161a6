//! Attribute and tag micro-parser
//!
//! Finds pseudo-tags such as `<on feature="beta">…</on>` or `<x-icon type="x"/>`
//! in template text and exposes their attributes as an ordered map.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

static ATTRIBUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"\s([^\s=<>"/]+)="([^"]*)""#).expect("valid attribute pattern"));

/// A pseudo-tag occurrence in a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag<'a> {
    /// The whole matched text, opening to closing tag
    pub raw: &'a str,
    /// Attributes of the opening tag, in source order
    pub attributes: IndexMap<String, String>,
    /// Text between the opening and closing tag, `None` when self-closing
    pub inner: Option<&'a str>,
}

impl Tag<'_> {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

/// Parses the `name="value"` pairs of an opening tag
///
/// `.native` modifiers are dropped from attribute names and values may
/// contain `=`.
pub fn parse_attributes(tag: &str) -> IndexMap<String, String> {
    let opening = match tag.find('>') {
        Some(end) => &tag[..end],
        None => tag,
    };

    ATTRIBUTE_RE
        .captures_iter(opening)
        .map(|captures| {
            let name = captures[1].replace(".native", "");
            (name, captures[2].to_string())
        })
        .collect()
}

/// Replaces every `<name …>…</name>` and `<name …/>` occurrence
///
/// The tag name must be followed by whitespace, `/` or `>`, so `on` never
/// matches `<option>`. Nested tags of the same name are not supported.
pub fn replace_tags<F>(source: &str, name: &str, mut replace: F) -> String
where
    F: FnMut(&Tag<'_>) -> String,
{
    if !source.contains(&format!("<{}", name)) {
        return source.to_string();
    }

    let name = regex::escape(name);
    let pattern = format!(
        r#"(?s)<{name}(?:\s[^>]*?)?(?:/>|>(.*?)</{name}>)"#,
        name = name
    );
    let tag_re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return source.to_string(),
    };

    tag_re
        .replace_all(source, |captures: &regex::Captures<'_>| {
            let raw = captures.get(0).map_or("", |m| m.as_str());
            let tag = Tag {
                raw,
                attributes: parse_attributes(raw),
                inner: captures.get(1).map(|m| m.as_str()),
            };
            replace(&tag)
        })
        .into_owned()
}
