//! Loader chain injection
//!
//! The upstream component compiler emits one request per block, e.g.
//!
//! ```text
//! require("!!vue-style-loader!css-loader!less-loader!./selector?type=styles&index=0!./App.vue")
//! ```
//!
//! Segments are separated by `!` and the rightmost stage runs first. This
//! module splices extra stages into those chains next to the segment tagged
//! with the block kind, without changing the order of existing segments.

use std::fmt;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use crate::theme::ThemeVariables;

/// Stands in for `\"` while chains are matched and split
const ESCAPED_QUOTE_PLACEHOLDER: &str = "__VUX_LOADER_ESCAPED_QUOTE__";

/// `require("…")`, `import x from "…"` and bare `"!!…"` requests
static REQUEST_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"require\("([^"]*)"\)|import\s+[\w$]+\s+from\s+"([^"]*)"|"(!![^"]*)""#)
        .expect("valid request pattern")
});

/// Segment of the compiled template that the post-compile stage follows
const TEMPLATE_COMPILER: &str = "template-compiler";

/// The three blocks of a component file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Script,
    Template,
    Style,
}

impl BlockKind {
    /// Query marker of the block's selector segment
    ///
    /// `type=style` also covers the `type=styles` marker of newer compilers.
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Script => "type=script",
            BlockKind::Template => "type=template",
            BlockKind::Style => "type=style",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Script => "script",
            BlockKind::Template => "template",
            BlockKind::Style => "style",
        };
        f.write_str(name)
    }
}

/// Extra settings of an injection
#[derive(Debug, Clone, Copy)]
pub struct InjectParams<'a> {
    /// Stage placed right after the template compiler (template only)
    pub post_compile_stage: Option<&'a str>,
    /// Name of the stylesheet preprocessor stage
    pub preprocessor: &'a str,
    /// Variables merged into the preprocessor query (style only)
    pub modify_vars: Option<&'a ThemeVariables>,
}

impl Default for InjectParams<'_> {
    fn default() -> Self {
        InjectParams {
            post_compile_stage: None,
            preprocessor: "less-loader",
            modify_vars: None,
        }
    }
}

#[derive(Serialize)]
struct PreprocessorQuery<'a> {
    #[serde(rename = "modifyVars")]
    modify_vars: &'a ThemeVariables,
    #[serde(rename = "sourceMap", skip_serializing_if = "std::ops::Not::not")]
    source_map: bool,
}

/// A `!`-delimited loader chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderChain {
    segments: Vec<String>,
}

impl LoaderChain {
    pub fn parse(chain: &str) -> Self {
        LoaderChain {
            segments: chain.split('!').map(str::to_string).collect(),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn contains_stage(&self, stage: &str) -> bool {
        self.segments.iter().any(|segment| segment == stage)
    }

    /// Index of the first segment carrying the block's type marker
    pub fn tagged_index(&self, kind: BlockKind) -> Option<usize> {
        self.segments
            .iter()
            .position(|segment| segment.contains(kind.tag()))
    }

    /// Inserts `stage` right before the segment at `index`
    pub fn insert_before(&mut self, index: usize, stage: &str) {
        self.segments.insert(index, stage.to_string());
    }

    /// Inserts `stage` after every segment containing `marker`
    pub fn insert_after_matching(&mut self, marker: &str, stage: &str) {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        for segment in self.segments.drain(..) {
            let matched = segment.contains(marker);
            segments.push(segment);
            if matched {
                segments.push(stage.to_string());
            }
        }
        self.segments = segments;
    }

    /// Replaces the query of every loader segment named like `preprocessor`
    ///
    /// An existing `sourceMap` flag is preserved.
    pub fn merge_preprocessor_vars(&mut self, preprocessor: &str, vars: &ThemeVariables) {
        let last = self.segments.len().saturating_sub(1);
        for segment in self.segments.iter_mut().take(last) {
            let name = segment.split('?').next().unwrap_or_default();
            if !name.contains(preprocessor) {
                continue;
            }

            let query = PreprocessorQuery {
                modify_vars: vars,
                source_map: segment.contains("sourceMap"),
            };
            if let Ok(json) = serde_json::to_string(&query) {
                *segment = format!("{}?{}", name, json.replace('"', "'"));
            }
        }
    }
}

impl fmt::Display for LoaderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("!"))
    }
}

/// Position of the style stage: right before the last preprocessor ahead of
/// the tagged segment, or right before the tagged segment without one
fn style_insert_index(chain: &LoaderChain, tagged: usize, preprocessor: &str) -> usize {
    chain.segments()[..tagged]
        .iter()
        .rposition(|segment| {
            let name = segment.split('?').next().unwrap_or_default();
            !name.is_empty() && name.contains(preprocessor)
        })
        .unwrap_or(tagged)
}

/// Rewrites a single chain; chains without the block's marker are returned as is
pub fn rewrite_chain(
    chain: &str,
    kind: BlockKind,
    stage: &str,
    params: &InjectParams<'_>,
) -> String {
    let mut parsed = LoaderChain::parse(chain);
    let Some(tagged) = parsed.tagged_index(kind) else {
        return chain.to_string();
    };
    if parsed.contains_stage(stage) {
        return chain.to_string();
    }

    match kind {
        BlockKind::Script => parsed.insert_before(tagged, stage),
        BlockKind::Template => {
            parsed.insert_before(tagged, stage);
            if let Some(post) = params.post_compile_stage {
                if !parsed.contains_stage(post) {
                    parsed.insert_after_matching(TEMPLATE_COMPILER, post);
                }
            }
        }
        BlockKind::Style => {
            let index = style_insert_index(&parsed, tagged, params.preprocessor);
            parsed.insert_before(index, stage);
            if let Some(vars) = params.modify_vars.filter(|vars| !vars.is_empty()) {
                parsed.merge_preprocessor_vars(params.preprocessor, vars);
            }
        }
    }

    parsed.to_string()
}

/// Injects `stage` into every request of the given block kind
///
/// # Arguments
///
/// * `source` - Intermediate component source
/// * `kind` - The block whose requests are rewritten
/// * `stage` - The stage to splice in
/// * `params` - Post-compile stage and preprocessor settings
///
/// # Returns
///
/// The rewritten source; requests that already carry `stage` are unchanged
pub fn inject_loader(
    source: &str,
    kind: BlockKind,
    stage: &str,
    params: &InjectParams<'_>,
) -> String {
    if !source.contains(kind.tag()) {
        return source.to_string();
    }

    let escaped = source.replace("\\\"", ESCAPED_QUOTE_PLACEHOLDER);

    let rewritten = REQUEST_RE.replace_all(&escaped, |captures: &Captures<'_>| {
        let whole = &captures[0];
        let Some(chain) = captures
            .get(1)
            .or_else(|| captures.get(2))
            .or_else(|| captures.get(3))
        else {
            return whole.to_string();
        };

        let offset = captures.get(0).map_or(0, |m| m.start());
        let (start, end) = (chain.start() - offset, chain.end() - offset);
        format!(
            "{}{}{}",
            &whole[..start],
            rewrite_chain(chain.as_str(), kind, stage, params),
            &whole[end..]
        )
    });

    rewritten.replace(ESCAPED_QUOTE_PLACEHOLDER, "\\\"")
}
