//! Posts: markdown documents with front matter.

use super::{File, Frontmatter, RawFrontmatter, parse_date};
use crate::{
    compiler::{FrontmatterExtractor, HtmlRenderer},
    config::Config,
    validation::{Failures, Message, Validation, Validator, fail, pass, validate, validate_all},
};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

// ============================================================================
// Types
// ============================================================================

/// A post straight out of the extractor and renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPost {
    pub frontmatter: RawFrontmatter,
    /// Rendered HTML body
    pub post_content: String,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

/// A post that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub frontmatter: Frontmatter,
    pub post_content: String,
    pub source_path: PathBuf,
    pub destination_path: PathBuf,
}

/// Every successfully built post, keyed by title.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PostContext {
    pub posts: BTreeMap<String, Post>,
}

impl PostContext {
    /// Posts ordered newest first, ties broken by title.
    pub fn sorted(&self) -> Vec<&Post> {
        let mut posts: Vec<_> = self.posts.values().collect();
        posts.sort_by(|a, b| {
            b.frontmatter
                .published
                .cmp(&a.frontmatter.published)
                .then_with(|| a.frontmatter.title.cmp(&b.frontmatter.title))
        });
        posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }
}

// ============================================================================
// Construction
// ============================================================================

/// Extract the front matter and render the body of a post file.
///
/// Extractor and renderer errors become failures tagged with the file path.
pub fn file_to_post(
    extractor: &dyn FrontmatterExtractor,
    renderer: &dyn HtmlRenderer,
    post_output: &Path,
    file: &File,
) -> Validation<RawPost> {
    let tagged = |what: &str, err: anyhow::Error| {
        Failures::new(
            Message::new(format!("Could not {what}: {err:#}"))
                .with_context(file.filepath.display().to_string()),
        )
    };

    let frontmatter = extractor
        .extract(file)
        .map_err(|e| tagged("extract front matter", e))?;
    let post_content = renderer
        .render(file)
        .map_err(|e| tagged("render markdown", e))?;
    let destination_path = post_output.join(format!("{}.html", frontmatter.slug));

    pass(RawPost {
        frontmatter,
        post_content,
        source_path: file.filepath.clone(),
        destination_path,
    })
}

/// Required fields, date format and category whitelist, all reported at once
/// and tagged with the post's source path.
pub fn validate_post(config: &Config) -> Validator<RawPost> {
    let checks = validate_all([
        title_is_required(),
        published_is_required(),
        published_is_date(),
        category_is_allowed(config.categories.clone()),
    ]);

    Validator::new(move |raw: &RawPost| {
        checks
            .check(raw)
            .map_err(|failures| failures.with_context(raw.source_path.display().to_string()))
    })
}

/// Normalize a validated post: parse the date and default the subtitle.
pub fn to_post(raw: RawPost) -> Validation<Post> {
    let RawPost {
        frontmatter: f,
        post_content,
        source_path,
        destination_path,
    } = raw;

    let published = f.published.as_deref().and_then(parse_date);
    let (Some(title), Some(category), Some(published)) = (f.title, f.category, published) else {
        return fail(
            Message::new("Post is missing its title, category or publication date")
                .with_context(source_path.display().to_string()),
        );
    };

    pass(Post {
        frontmatter: Frontmatter {
            category,
            excerpt: f.excerpt,
            published,
            slug: f.slug,
            subtitle: f.subtitle.unwrap_or_default(),
            tags: f.tags,
            title,
            layout: f.layout,
        },
        post_content,
        source_path,
        destination_path,
    })
}

/// Insert or replace `post` under its title.
pub fn reduce_post_context(context: &mut PostContext, post: Post) -> &mut PostContext {
    context
        .posts
        .insert(post.frontmatter.title.clone(), post);
    context
}

// ============================================================================
// Validators
// ============================================================================

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|s| s.trim().is_empty())
}

fn title_is_required() -> Validator<RawPost> {
    validate(
        |raw: &RawPost| !is_blank(raw.frontmatter.title.as_deref()),
        |_| "Field \"title\" is required".to_string(),
    )
}

fn published_is_required() -> Validator<RawPost> {
    validate(
        |raw: &RawPost| !is_blank(raw.frontmatter.published.as_deref()),
        |_| "Field \"published\" is required".to_string(),
    )
}

/// Only judges dates that are present; absence is reported above.
fn published_is_date() -> Validator<RawPost> {
    validate(
        |raw: &RawPost| {
            let published = raw.frontmatter.published.as_deref();
            is_blank(published) || published.and_then(parse_date).is_some()
        },
        |raw| {
            format!(
                "Field \"published\" must be a date (YYYY-MM-DD), but was \"{}\"",
                raw.frontmatter.published.as_deref().unwrap_or_default()
            )
        },
    )
}

fn category_is_allowed(categories: Vec<String>) -> Validator<RawPost> {
    let allowed = categories.join(", ");
    validate(
        move |raw: &RawPost| {
            raw.frontmatter
                .category
                .as_ref()
                .is_some_and(|c| categories.contains(c))
        },
        move |raw| match &raw.frontmatter.category {
            Some(category) => {
                format!("Category \"{category}\" is not allowed, must be one of {allowed}")
            }
            None => format!("Field \"category\" is required and must be one of {allowed}"),
        },
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct FixedExtractor(RawFrontmatter);

    impl FrontmatterExtractor for FixedExtractor {
        fn extract(&self, _file: &File) -> anyhow::Result<RawFrontmatter> {
            Ok(self.0.clone())
        }
    }

    struct Broken;

    impl FrontmatterExtractor for Broken {
        fn extract(&self, _file: &File) -> anyhow::Result<RawFrontmatter> {
            anyhow::bail!("unterminated block")
        }
    }

    impl HtmlRenderer for Broken {
        fn render(&self, _file: &File) -> anyhow::Result<String> {
            anyhow::bail!("boom")
        }
    }

    struct Echo;

    impl HtmlRenderer for Echo {
        fn render(&self, file: &File) -> anyhow::Result<String> {
            Ok(format!("<p>{}</p>", file.content))
        }
    }

    fn config(categories: &[&str]) -> Config {
        let mut config = Config::fixture(Path::new("/site"));
        config.categories = categories.iter().map(|c| c.to_string()).collect();
        config
    }

    fn raw(title: Option<&str>, published: Option<&str>, category: Option<&str>) -> RawPost {
        RawPost {
            frontmatter: RawFrontmatter {
                category: category.map(String::from),
                excerpt: "First line".into(),
                published: published.map(String::from),
                slug: "first".into(),
                subtitle: None,
                tags: vec!["rust".into()],
                title: title.map(String::from),
                layout: None,
            },
            post_content: "<p>Hi</p>".into(),
            source_path: PathBuf::from("/site/posts/first.md"),
            destination_path: PathBuf::from("/site/dist/posts/first.html"),
        }
    }

    fn post(title: &str, date: (i32, u32, u32), body: &str) -> Post {
        let raw = raw(Some(title), None, Some("story"));
        let mut post = to_post(RawPost {
            frontmatter: RawFrontmatter {
                published: Some(format!("{}-{:02}-{:02}", date.0, date.1, date.2)),
                ..raw.frontmatter
            },
            ..raw
        })
        .unwrap();
        post.post_content = body.into();
        post
    }

    fn texts(result: Validation<RawPost>) -> Vec<String> {
        result
            .unwrap_err()
            .iter()
            .map(|m| m.text.clone())
            .collect()
    }

    #[test]
    fn test_valid_post_passes() {
        let validator = validate_post(&config(&["story"]));
        let raw = raw(Some("First"), Some("2024-01-15"), Some("story"));
        assert_eq!(validator.run(raw.clone()), Ok(raw));
    }

    #[test]
    fn test_disallowed_category_names_it_and_the_whitelist() {
        let validator = validate_post(&config(&["opinion", "story"]));
        let messages = texts(validator.run(raw(Some("T"), Some("2024-01-15"), Some("haiku"))));

        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("haiku"));
        assert!(messages[0].contains("opinion"));
        assert!(messages[0].contains("story"));
    }

    #[test]
    fn test_every_problem_is_reported() {
        let validator = validate_post(&config(&["story"]));
        let messages = texts(validator.run(raw(None, None, None)));

        assert_eq!(
            messages,
            vec![
                "Field \"title\" is required",
                "Field \"published\" is required",
                "Field \"category\" is required and must be one of story",
            ]
        );
    }

    #[test]
    fn test_bad_date_is_reported_once() {
        let validator = validate_post(&config(&["story"]));
        let messages = texts(validator.run(raw(Some("T"), Some("someday"), Some("story"))));

        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("\"someday\""));
    }

    #[test]
    fn test_messages_are_tagged_with_source_path() {
        let validator = validate_post(&config(&["story"]));
        let failures = validator.run(raw(None, Some("2024-01-15"), Some("story"))).unwrap_err();

        assert_eq!(
            failures.messages()[0].context.as_deref(),
            Some("/site/posts/first.md")
        );
    }

    #[test]
    fn test_to_post_normalizes() {
        let post = to_post(raw(Some("First"), Some("2024/01/15"), Some("story"))).unwrap();

        assert_eq!(post.frontmatter.published, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(post.frontmatter.subtitle, "");
        assert_eq!(post.frontmatter.tags, vec!["rust"]);
    }

    #[test]
    fn test_to_post_without_validation_fails_instead_of_panicking() {
        assert!(to_post(raw(None, Some("2024-01-15"), Some("story"))).is_err());
    }

    #[test]
    fn test_reduce_is_last_write_wins_per_title() {
        let mut context = PostContext::default();
        reduce_post_context(&mut context, post("A", (2024, 1, 1), "one"));
        reduce_post_context(&mut context, post("B", (2024, 1, 2), "two"));
        reduce_post_context(&mut context, post("A", (2024, 1, 1), "three"));

        assert_eq!(context.len(), 2);
        assert_eq!(context.posts["A"].post_content, "three");
        assert_eq!(context.posts["B"].post_content, "two");
    }

    #[test]
    fn test_sorted_newest_first_then_title() {
        let mut context = PostContext::default();
        reduce_post_context(&mut context, post("Old", (2023, 5, 1), ""));
        reduce_post_context(&mut context, post("Zeta", (2024, 1, 1), ""));
        reduce_post_context(&mut context, post("Alpha", (2024, 1, 1), ""));

        let titles: Vec<_> = context
            .sorted()
            .iter()
            .map(|p| p.frontmatter.title.as_str())
            .collect();
        assert_eq!(titles, vec!["Alpha", "Zeta", "Old"]);
    }

    #[test]
    fn test_file_to_post_derives_destination_from_slug() {
        let extractor = FixedExtractor(RawFrontmatter {
            slug: "hello-world".into(),
            ..RawFrontmatter::default()
        });
        let file = File::new("/site/posts/hello.md", "Hi");
        let raw = file_to_post(&extractor, &Echo, Path::new("/site/dist/posts"), &file).unwrap();

        assert_eq!(raw.destination_path, PathBuf::from("/site/dist/posts/hello-world.html"));
        assert_eq!(raw.source_path, file.filepath);
        assert_eq!(raw.post_content, "<p>Hi</p>");
    }

    #[test]
    fn test_file_to_post_tags_capability_errors() {
        let file = File::new("/site/posts/bad.md", "");

        let failures = file_to_post(&Broken, &Echo, Path::new("/out"), &file).unwrap_err();
        assert!(failures.messages()[0].text.contains("unterminated block"));
        assert_eq!(failures.messages()[0].context.as_deref(), Some("/site/posts/bad.md"));

        let extractor = FixedExtractor(RawFrontmatter::default());
        let failures = file_to_post(&extractor, &Broken, Path::new("/out"), &file).unwrap_err();
        assert!(failures.messages()[0].text.contains("render markdown"));
    }
}
