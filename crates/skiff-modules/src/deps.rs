//! Local dependency discovery.
//!
//! Dependencies are found with a line-based scan of import statements, not a
//! full parse. Only relative specifiers are kept; package imports are never
//! resolved. Statements spanning several lines, dynamic imports and
//! re-exports are missed.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

static IMPORT_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:import\b|\{%-?\s*(?:include|import|from|extends)\b)")
        .expect("Invalid import line regex")
});

/// Resolve `.` and `..` components without touching the file system, so
/// that paths of deleted files normalize too.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }

    out
}

/// Extract the specifier between the first and last quote of an import line.
fn quoted_specifier(line: &str) -> Option<String> {
    let normalized = line.replace(['"', '`'], "'");
    let start = normalized.find('\'')?;
    let end = normalized.rfind('\'')?;

    if end <= start + 1 {
        return None;
    }

    Some(normalized[start + 1..end].to_string())
}

/// List the local dependencies of the file at `source` with contents
/// `content`, as absolute paths in order of appearance.
///
/// Specifiers not ending in `.{extension}` get that suffix appended.
pub fn local_dependencies(source: &Path, content: &str, extension: &str) -> Vec<PathBuf> {
    let dir = source.parent().unwrap_or(Path::new(""));
    let suffix = format!(".{}", extension);
    let mut dependencies: Vec<PathBuf> = Vec::new();

    for line in content.lines() {
        if !IMPORT_LINE_RE.is_match(line) {
            continue;
        }

        let Some(specifier) = quoted_specifier(line) else {
            continue;
        };

        if !specifier.starts_with('.') {
            continue;
        }

        let specifier = if specifier.ends_with(&suffix) {
            specifier
        } else {
            specifier + &suffix
        };

        let path = normalize_path(&dir.join(specifier));
        if !dependencies.contains(&path) {
            dependencies.push(path);
        }
    }

    dependencies
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn keeps_only_relative_specifiers() {
        let content = r#"
{% include "./nav.html" %}
{% import '../macros/forms.html' as forms %}
{%- from "../lib/card" import card %}
{% include "shared/footer.html" %}
<p>import "./not-a-statement.html"</p>
"#;

        let deps = local_dependencies(Path::new("/site/pages/blog/post.html"), content, "html");

        assert_eq!(
            deps,
            vec![
                PathBuf::from("/site/pages/blog/nav.html"),
                PathBuf::from("/site/pages/macros/forms.html"),
                PathBuf::from("/site/pages/lib/card.html"),
            ]
        );
    }

    #[test]
    fn scans_script_style_imports() {
        let content = "import Project from '../components/Project'\nimport fs from 'fs'\n";

        let deps = local_dependencies(Path::new("/site/pages/index.js"), content, "js");

        assert_eq!(deps, vec![PathBuf::from("/site/components/Project.js")]);
    }

    #[test]
    fn misses_multi_line_statements() {
        let content = "{% include\n  \"./nav.html\" %}";

        let deps = local_dependencies(Path::new("/site/pages/index.html"), content, "html");

        assert!(deps.is_empty());
    }

    #[test]
    fn normalizes_without_file_system() {
        assert_eq!(
            normalize_path(Path::new("/a/b/./c/../../d.html")),
            PathBuf::from("/a/d.html")
        );
    }
}
