//! Extraction of dependency facts from descriptor text.
//!
//! Only descriptors rooted at `<idea-plugin>` are understood. Anything else
//! parses as empty, which callers detect as a non-standard root (see
//! [`looks_like_dependency_markup`]).

use regex::Regex;
use std::sync::LazyLock;

use crate::constants::SKIP_GENERATION_MARKER;

static COMMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment pattern is valid"));
static ROOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*(?:<\?xml.*?\?>\s*)?(?:<!DOCTYPE[^>]*>\s*)?<([A-Za-z_][\w:.-]*)")
        .expect("root pattern is valid")
});
static DEPENDENCIES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dependencies\s*>(.*?)</dependencies\s*>").expect("dependencies pattern is valid")
});
static CONTENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<content\b[^>]*>(.*?)</content\s*>").expect("content pattern is valid")
});
static MODULE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<module\b[^>]*?\bname\s*=\s*"([^"]+)""#).expect("module pattern is valid")
});
static MODULE_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<module\b[^>]*?\bvalue\s*=\s*"([^"]+)""#).expect("alias pattern is valid")
});
static PLUGIN_ID_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<plugin\b[^>]*?\bid\s*=\s*"([^"]+)""#).expect("plugin pattern is valid")
});
static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<xi:include\b[^>]*?\bhref\s*=\s*"([^"]+)""#).expect("include pattern is valid")
});
static ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<id>\s*([^<]+?)\s*</id>").expect("id pattern is valid"));

/// Root element of a standard descriptor.
pub const DESCRIPTOR_ROOT: &str = "idea-plugin";

/// Facts extracted from one descriptor file (includes not followed).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDescriptor {
    /// `<id>` of a plugin descriptor
    pub plugin_id: Option<String>,
    /// `<module value="..."/>` alias declarations
    pub aliases: Vec<String>,
    /// `<module name="..."/>` entries of the `<dependencies>` block
    pub module_dependencies: Vec<String>,
    /// `<plugin id="..."/>` entries of the `<dependencies>` block
    pub plugin_dependencies: Vec<String>,
    /// `<module name="..."/>` entries of `<content>` blocks
    pub content_modules: Vec<String>,
    /// `href`s of `<xi:include>` elements
    pub includes: Vec<String>,
}

impl ParsedDescriptor {
    /// Whether neither dependencies nor aliases were found.
    pub fn has_no_dependency_facts(&self) -> bool {
        self.aliases.is_empty()
            && self.module_dependencies.is_empty()
            && self.plugin_dependencies.is_empty()
    }

    /// Merge facts of an included fragment.
    pub fn merge(&mut self, other: Self) {
        extend_unique(&mut self.aliases, other.aliases);
        extend_unique(&mut self.module_dependencies, other.module_dependencies);
        extend_unique(&mut self.plugin_dependencies, other.plugin_dependencies);
        extend_unique(&mut self.content_modules, other.content_modules);
        if self.plugin_id.is_none() {
            self.plugin_id = other.plugin_id;
        }
    }
}

fn extend_unique(target: &mut Vec<String>, items: Vec<String>) {
    for item in items {
        if !target.contains(&item) {
            target.push(item);
        }
    }
}

fn captures(re: &Regex, text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for cap in re.captures_iter(text) {
        let value = cap[1].trim().to_string();
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Name of the root element, if any.
pub fn root_element(text: &str) -> Option<String> {
    let stripped = COMMENT_RE.replace_all(text, "");
    ROOT_RE.captures(&stripped).map(|cap| cap[1].to_string())
}

/// Parse a descriptor, ignoring commented-out markup.
///
/// Fragments pulled in through `xi:include` are rooted at `<idea-plugin>` as
/// well, so the same rule applies to them.
pub fn parse_descriptor(text: &str) -> ParsedDescriptor {
    let stripped = COMMENT_RE.replace_all(text, "");
    let standard_root = ROOT_RE.captures(&stripped).is_some_and(|cap| &cap[1] == DESCRIPTOR_ROOT);
    if !standard_root {
        return ParsedDescriptor::default();
    }

    let mut parsed = ParsedDescriptor {
        plugin_id: ID_RE.captures(&stripped).map(|cap| cap[1].to_string()),
        aliases: captures(&MODULE_ALIAS_RE, &stripped),
        includes: captures(&INCLUDE_RE, &stripped),
        ..ParsedDescriptor::default()
    };

    for block in DEPENDENCIES_RE.captures_iter(&stripped) {
        extend_unique(&mut parsed.module_dependencies, captures(&MODULE_NAME_RE, &block[1]));
        extend_unique(&mut parsed.plugin_dependencies, captures(&PLUGIN_ID_REF_RE, &block[1]));
    }
    for block in CONTENT_RE.captures_iter(&stripped) {
        extend_unique(&mut parsed.content_modules, captures(&MODULE_NAME_RE, &block[1]));
    }

    parsed
}

/// Whether the descriptor opts out of dependency generation.
pub fn has_skip_marker(text: &str) -> bool {
    text.contains(SKIP_GENERATION_MARKER)
}

/// Whether the raw text plainly contains dependency markup.
pub fn looks_like_dependency_markup(text: &str) -> bool {
    let stripped = COMMENT_RE.replace_all(text, "");
    DEPENDENCIES_RE.is_match(&stripped) || MODULE_ALIAS_RE.is_match(&stripped)
}
