//! YAML front matter between `---` fences.
//!
//! ```text
//! ---
//! title: Hello
//! published: 2024-01-15
//! category: story
//! tags: rust, async
//! ---
//! First paragraph becomes the excerpt.
//! ```

use super::FrontmatterExtractor;
use crate::data::{File, RawFrontmatter, name_of};
use anyhow::{Context, Result, anyhow};
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;

static FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^---[ \t]*\r?$").unwrap());

/// Split a document into its metadata block and body.
///
/// Documents that do not open with a fence have no metadata. An opening
/// fence without a closing one is an error.
pub fn split_frontmatter(content: &str) -> Result<(Option<&str>, &str)> {
    let mut fences = FENCE.find_iter(content);
    match fences.next() {
        Some(open) if open.start() == 0 => {
            let close = fences
                .next()
                .ok_or_else(|| anyhow!("front matter block is never closed"))?;
            let meta = &content[open.end()..close.start()];
            let body = content[close.end()..].trim_start_matches(['\r', '\n']);
            Ok((Some(meta), body))
        }
        _ => Ok((None, content)),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Meta {
    category: Option<String>,
    excerpt: Option<String>,
    published: Option<String>,
    slug: Option<String>,
    subtitle: Option<String>,
    tags: Option<Tags>,
    title: Option<String>,
    layout: Option<String>,
}

/// `tags: a, b` or `tags: [a, b]`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Tags {
    List(Vec<String>),
    Csv(String),
}

impl Tags {
    fn into_vec(self) -> Vec<String> {
        let tags = match self {
            Self::List(tags) => tags,
            Self::Csv(s) => s.split(',').map(String::from).collect(),
        };
        tags.into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Default extractor for posts written in markdown with YAML metadata.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFrontmatter;

impl FrontmatterExtractor for YamlFrontmatter {
    fn extract(&self, file: &File) -> Result<RawFrontmatter> {
        let (meta, body) = split_frontmatter(&file.content)?;
        let meta: Meta = match meta {
            Some(yaml) if !yaml.trim().is_empty() => {
                serde_yaml::from_str(yaml).context("invalid YAML front matter")?
            }
            _ => Meta::default(),
        };

        let excerpt = meta.excerpt.unwrap_or_else(|| {
            body.lines()
                .map(str::trim)
                .find(|line| !line.is_empty())
                .unwrap_or_default()
                .to_string()
        });

        Ok(RawFrontmatter {
            category: meta.category,
            excerpt,
            published: meta.published,
            slug: meta.slug.unwrap_or_else(|| name_of(&file.filepath)),
            subtitle: meta.subtitle,
            tags: meta.tags.map(Tags::into_vec).unwrap_or_default(),
            title: meta.title,
            layout: meta.layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(path: &str, content: &str) -> Result<RawFrontmatter> {
        YamlFrontmatter.extract(&File::new(path, content))
    }

    #[test]
    fn test_extract_full_block() {
        let content = "---\ntitle: Hello\nsubtitle: World\npublished: 2024-01-15\ncategory: story\ntags: rust, async \nslug: hi\nlayout: wide\n---\n\nBody text.\n";
        let meta = extract("/posts/hello.md", content).unwrap();

        assert_eq!(meta.title.as_deref(), Some("Hello"));
        assert_eq!(meta.subtitle.as_deref(), Some("World"));
        assert_eq!(meta.published.as_deref(), Some("2024-01-15"));
        assert_eq!(meta.category.as_deref(), Some("story"));
        assert_eq!(meta.tags, vec!["rust", "async"]);
        assert_eq!(meta.slug, "hi");
        assert_eq!(meta.layout.as_deref(), Some("wide"));
        assert_eq!(meta.excerpt, "Body text.");
    }

    #[test]
    fn test_defaults() {
        let meta = extract("/posts/my-post.draft.md", "---\ntitle: T\n---\n\n\n  Opening line  \nMore").unwrap();

        assert_eq!(meta.slug, "my-post");
        assert_eq!(meta.excerpt, "Opening line");
        assert!(meta.tags.is_empty());
        assert_eq!(meta.category, None);
    }

    #[test]
    fn test_tags_as_list() {
        let meta = extract("/p.md", "---\ntags: [a, \" b \"]\n---\n").unwrap();
        assert_eq!(meta.tags, vec!["a", "b"]);
    }

    #[test]
    fn test_explicit_excerpt_wins() {
        let meta = extract("/p.md", "---\nexcerpt: Short\n---\nLong body").unwrap();
        assert_eq!(meta.excerpt, "Short");
    }

    #[test]
    fn test_no_metadata_block() {
        let meta = extract("/p.md", "Just text\n---\nafter a rule").unwrap();
        assert_eq!(meta.title, None);
        assert_eq!(meta.excerpt, "Just text");
    }

    #[test]
    fn test_unclosed_block_fails() {
        assert!(extract("/p.md", "---\ntitle: T\n\nbody").is_err());
    }

    #[test]
    fn test_invalid_yaml_fails() {
        let err = extract("/p.md", "---\ntitle: [unclosed\n---\n").unwrap_err();
        assert!(format!("{err:#}").contains("invalid YAML"));
    }

    #[test]
    fn test_split_crlf() {
        let (meta, body) = split_frontmatter("---\r\ntitle: T\r\n---\r\nBody").unwrap();
        assert_eq!(meta.map(str::trim), Some("title: T"));
        assert_eq!(body, "Body");
    }
}
