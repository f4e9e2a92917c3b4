//! Format-preserving edits of `module.toml` files.
//!
//! Scope corrections must not reformat the rest of a hand-maintained build
//! file, so edits go through `toml_edit` instead of a serde round-trip.

use toml_edit::{DocumentMut, Item, value};

use super::DependencyScope;
use crate::core::DepgenResult;

/// Which array of a build file an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// `[[dependencies]]`
    Module,
    /// `[[libraries]]`
    Library,
}

impl DependencyKind {
    fn section(self) -> &'static str {
        match self {
            Self::Module => "dependencies",
            Self::Library => "libraries",
        }
    }
}

/// A requested scope change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeChange {
    /// Targeted array
    pub kind: DependencyKind,
    /// Dependency name
    pub name: String,
    /// New scope
    pub scope: DependencyScope,
}

/// Apply scope changes to build file text.
///
/// Entries that do not exist are ignored. A `compile` scope is written
/// explicitly even though it is the default, so the fix is visible.
pub fn set_dependency_scopes(content: &str, changes: &[ScopeChange]) -> DepgenResult<String> {
    let mut doc: DocumentMut = content.parse()?;

    for change in changes {
        let Some(Item::ArrayOfTables(array)) = doc.get_mut(change.kind.section()) else {
            continue;
        };
        for table in array.iter_mut() {
            if table.get("name").and_then(Item::as_str) == Some(change.name.as_str()) {
                table.insert("scope", value(change.scope.as_str()));
            }
        }
    }

    Ok(doc.to_string())
}

/// Render a minimal line diff (`-old` / `+new` lines) between two texts.
pub fn line_diff(old: &str, new: &str) -> String {
    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();
    let (n, m) = (old_lines.len(), new_lines.len());

    // lcs[i][j]: longest common subsequence of old[i..] and new[j..]
    let mut lcs = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if old_lines[i] == new_lines[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut out = String::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old_lines[i] == new_lines[j] {
            i += 1;
            j += 1;
        } else if i < n && (j == m || lcs[i + 1][j] >= lcs[i][j + 1]) {
            out.push_str(&format!("-{}\n", old_lines[i]));
            i += 1;
        } else {
            out.push_str(&format!("+{}\n", new_lines[j]));
            j += 1;
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILD_FILE: &str = r#"name = "m" # the module

[[dependencies]]
name = "intellij.libraries.junit4"

[[libraries]]
name = "junit4"
scope = "runtime"
"#;

    #[test]
    fn test_set_scope_preserves_formatting() {
        let updated = set_dependency_scopes(
            BUILD_FILE,
            &[ScopeChange {
                kind: DependencyKind::Library,
                name: "junit4".to_string(),
                scope: DependencyScope::Test,
            }],
        )
        .unwrap();

        assert!(updated.starts_with("name = \"m\" # the module\n"));
        assert!(updated.contains("scope = \"test\""));
        assert!(!updated.contains("runtime"));
    }

    #[test]
    fn test_set_scope_inserts_missing_key() {
        let updated = set_dependency_scopes(
            BUILD_FILE,
            &[ScopeChange {
                kind: DependencyKind::Module,
                name: "intellij.libraries.junit4".to_string(),
                scope: DependencyScope::Test,
            }],
        )
        .unwrap();

        let diff = line_diff(BUILD_FILE, &updated);
        assert!(diff.contains("+scope = \"test\""));
        assert!(diff.lines().all(|l| l.starts_with('+')));
    }

    #[test]
    fn test_line_diff_replacement() {
        assert_eq!(line_diff("a\nb\nc\n", "a\nx\nc\n"), "-b\n+x\n");
        assert_eq!(line_diff("a\n", "a\n"), "");
    }

    #[test]
    fn test_unknown_entry_is_ignored() {
        let updated = set_dependency_scopes(
            BUILD_FILE,
            &[ScopeChange {
                kind: DependencyKind::Library,
                name: "nope".to_string(),
                scope: DependencyScope::Test,
            }],
        )
        .unwrap();
        assert_eq!(updated, BUILD_FILE);
        assert!(line_diff(BUILD_FILE, &updated).is_empty());
    }
}
