//! Rewriting of a descriptor's `<dependencies>` block.
//!
//! Everything outside the block is preserved byte for byte. Existing
//! `<plugin>` entries are never dropped; existing `<module>` entries survive
//! only when the caller's `preserve_existing_module` predicate accepts them.

use regex::Regex;
use std::sync::LazyLock;

use super::parser::{DESCRIPTOR_ROOT, parse_descriptor};
use crate::core::{DepgenError, DepgenResult};

static BLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<dependencies\s*(?:/>|>.*?</dependencies\s*>)").expect("block pattern is valid")
});
static CONTENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<content\b").expect("content pattern is valid"));
static ROOT_CLOSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"</{DESCRIPTOR_ROOT}\s*>")).expect("root close pattern is valid")
});
static SELF_CLOSING_ROOT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"<{DESCRIPTOR_ROOT}\b([^>]*?)\s*/>")).expect("self-closing root pattern is valid")
});
static CHILD_INDENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)<{DESCRIPTOR_ROOT}\b[^>]*>[ \t]*\r?\n([ \t]+)<"))
        .expect("child indent pattern is valid")
});

const DEFAULT_INDENT: &str = "  ";

/// Replace the dependency block of `text` with `desired_modules`.
///
/// Returns the updated text, which equals `text` when nothing changes. When
/// the resulting block would be empty an existing block is removed and a
/// missing one is not created.
///
/// Blocks on a line of their own are rendered one entry per line; a block
/// sharing its line with other markup (`<idea-plugin><dependencies>...`) is
/// rendered on a single line. A self-closing `<idea-plugin/>` root is expanded
/// before inserting.
///
/// # Errors
///
/// Returns [`DepgenError::DescriptorRewriteError`] when modules must be
/// inserted but the descriptor has neither a `<content>` element nor a
/// closing root tag.
pub fn update_dependencies<F>(
    text: &str,
    desired_modules: &[String],
    preserve_existing_module: F,
) -> DepgenResult<String>
where
    F: Fn(&str) -> bool,
{
    let existing = BLOCK_RE.find(text);

    let (existing_modules, existing_plugins) = match &existing {
        Some(block) => {
            let parsed = parse_descriptor(&format!("<{DESCRIPTOR_ROOT}>{}</{DESCRIPTOR_ROOT}>", block.as_str()));
            (parsed.module_dependencies, parsed.plugin_dependencies)
        }
        None => (Vec::new(), Vec::new()),
    };

    let mut modules: Vec<String> = desired_modules.to_vec();
    modules.extend(existing_modules.into_iter().filter(|m| preserve_existing_module(m)));
    modules.sort();
    modules.dedup();

    let unit = CHILD_INDENT_RE
        .captures(text)
        .map_or_else(|| DEFAULT_INDENT.to_string(), |cap| cap[1].to_string());

    if let Some(block) = existing {
        let remove = modules.is_empty() && existing_plugins.is_empty();
        let (start, end) = (block.start(), block.end());
        let updated = match own_line(text, start, end) {
            Some((line_start, line_end)) => {
                let replacement = if remove {
                    String::new()
                } else {
                    render_block(&text[line_start..start], &unit, &modules, &existing_plugins)
                };
                format!("{}{}{}", &text[..line_start], replacement, &text[line_end..])
            }
            None => {
                let replacement = if remove {
                    String::new()
                } else {
                    render_inline(&modules, &existing_plugins)
                };
                format!("{}{}{}", &text[..start], replacement, &text[end..])
            }
        };
        return Ok(updated);
    }

    if modules.is_empty() {
        return Ok(text.to_string());
    }

    let expanded = expand_self_closing_root(text);
    let text = expanded.as_str();

    let (at, closes_root) = match CONTENT_RE.find(text) {
        Some(content) => (content.start(), false),
        None => match ROOT_CLOSE_RE.find_iter(text).last() {
            Some(close) => (close.start(), true),
            None => {
                return Err(DepgenError::DescriptorRewriteError {
                    reason: format!("no <content> or </{DESCRIPTOR_ROOT}> to insert dependencies before"),
                });
            }
        },
    };

    let updated = match line_start(text, at) {
        Some(line) => {
            let indent = if closes_root {
                format!("{}{unit}", &text[line..at])
            } else {
                text[line..at].to_string()
            };
            let block = render_block(&indent, &unit, &modules, &[]);
            format!("{}{}{}", &text[..line], block, &text[line..])
        }
        None => format!("{}{}{}", &text[..at], render_inline(&modules, &[]), &text[at..]),
    };
    Ok(updated)
}

/// `<idea-plugin attrs/>` becomes an open and a close tag.
fn expand_self_closing_root(text: &str) -> String {
    let Some(cap) = SELF_CLOSING_ROOT_RE.captures(text) else {
        return text.to_string();
    };
    let Some(root) = cap.get(0) else {
        return text.to_string();
    };
    let close = match line_start(text, root.start()) {
        Some(line) => format!("\n{}</{DESCRIPTOR_ROOT}>", &text[line..root.start()]),
        None => format!("</{DESCRIPTOR_ROOT}>"),
    };
    format!(
        "{}<{DESCRIPTOR_ROOT}{}>{}{}",
        &text[..root.start()],
        &cap[1],
        close,
        &text[root.end()..]
    )
}

/// Start of the line containing `at` when only indentation precedes it.
fn line_start(text: &str, at: usize) -> Option<usize> {
    let line = text[..at].rfind('\n').map_or(0, |i| i + 1);
    text[line..at].chars().all(|c| c == ' ' || c == '\t').then_some(line)
}

/// Line span of `start..end` including its newline, when nothing else shares those lines.
fn own_line(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let line = line_start(text, start)?;
    let rest = &text[end..];
    let eol = rest.find('\n');
    if !rest[..eol.unwrap_or(rest.len())].trim().is_empty() {
        return None;
    }
    Some((line, end + eol.map_or(rest.len(), |i| i + 1)))
}

fn render_block(indent: &str, unit: &str, modules: &[String], plugins: &[String]) -> String {
    let mut block = format!("{indent}<dependencies>\n");
    for module in modules {
        block.push_str(&format!("{indent}{unit}<module name=\"{module}\"/>\n"));
    }
    for plugin in plugins {
        block.push_str(&format!("{indent}{unit}<plugin id=\"{plugin}\"/>\n"));
    }
    block.push_str(&format!("{indent}</dependencies>\n"));
    block
}

fn render_inline(modules: &[String], plugins: &[String]) -> String {
    let mut block = String::from("<dependencies>");
    for module in modules {
        block.push_str(&format!("<module name=\"{module}\"/>"));
    }
    for plugin in plugins {
        block.push_str(&format!("<plugin id=\"{plugin}\"/>"));
    }
    block.push_str("</dependencies>");
    block
}
