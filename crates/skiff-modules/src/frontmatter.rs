//! Frontmatter extraction and parsing.

use serde::de::DeserializeOwned;

/// Errors that can occur when parsing frontmatter.
#[derive(Debug, thiserror::Error)]
pub enum FrontmatterError {
    #[error("Unclosed frontmatter block - missing closing ---")]
    Unclosed,

    #[error("Invalid YAML in frontmatter: {0}")]
    InvalidYaml(String),
}

/// Split a `---` fenced YAML block off the start of `source`.
///
/// Returns the parsed frontmatter and the remaining content after the block.
/// Sources without a leading fence are returned untouched.
pub fn extract_frontmatter<T: DeserializeOwned>(
    source: &str,
) -> Result<(Option<T>, &str), FrontmatterError> {
    let trimmed = source.trim_start();

    if !trimmed.starts_with("---") {
        return Ok((None, source));
    }

    let after_open = &trimmed[3..];
    let Some(close_pos) = after_open.find("\n---") else {
        return Err(FrontmatterError::Unclosed);
    };

    let yaml = after_open[..close_pos].trim();
    let remaining = &after_open[close_pos + 4..];

    // An empty block deserializes as null, which most targets reject.
    let parsed = if yaml.is_empty() {
        serde_yaml::from_str("{}")
    } else {
        serde_yaml::from_str(yaml)
    }
    .map_err(|e| FrontmatterError::InvalidYaml(e.to_string()))?;

    Ok((Some(parsed), remaining.trim_start()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Post {
        title: String,
        #[serde(default)]
        draft: bool,
    }

    #[test]
    fn extracts_valid_frontmatter() {
        let source = "---\ntitle: Hello\ndraft: true\n---\n\n# Hello\n";

        let (fm, content) = extract_frontmatter::<Post>(source).unwrap();

        assert_eq!(
            fm,
            Some(Post {
                title: "Hello".to_string(),
                draft: true
            })
        );
        assert_eq!(content, "# Hello\n");
    }

    #[test]
    fn handles_no_frontmatter() {
        let source = "<h1>No frontmatter</h1>";

        let (fm, content) = extract_frontmatter::<serde_yaml::Value>(source).unwrap();

        assert!(fm.is_none());
        assert_eq!(content, source);
    }

    #[test]
    fn empty_block_is_an_empty_mapping() {
        let (fm, content) =
            extract_frontmatter::<std::collections::BTreeMap<String, String>>("---\n---\nbody")
                .unwrap();

        assert_eq!(fm, Some(Default::default()));
        assert_eq!(content, "body");
    }

    #[test]
    fn errors_on_unclosed_frontmatter() {
        let result = extract_frontmatter::<Post>("---\ntitle: Test\n<p>no closing</p>");

        assert!(matches!(result, Err(FrontmatterError::Unclosed)));
    }

    #[test]
    fn errors_on_invalid_yaml() {
        let result = extract_frontmatter::<Post>("---\ntitle: [invalid yaml\n---\n");

        assert!(matches!(result, Err(FrontmatterError::InvalidYaml(_))));
    }
}
