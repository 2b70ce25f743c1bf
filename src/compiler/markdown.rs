//! Markdown to HTML with `pulldown-cmark`.

use super::{HtmlRenderer, frontmatter::split_frontmatter};
use crate::data::File;
use anyhow::Result;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, html as md_html};

/// CommonMark renderer with tables, footnotes, strikethrough and task lists.
///
/// Fenced code blocks keep their `language-*` class only for languages listed
/// in `highlight`; the class is what client-side highlighters key on.
#[derive(Debug, Clone, Default)]
pub struct MarkdownRenderer {
    highlight: Vec<String>,
}

impl MarkdownRenderer {
    pub fn new(highlight: Vec<String>) -> Self {
        Self { highlight }
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
    }

    /// `rust,ignore` → `rust` if highlighted, otherwise no language at all.
    fn filter_language<'a>(&self, lang: CowStr<'a>) -> CowStr<'a> {
        let name = lang.split([' ', ',']).next().unwrap_or_default();
        if self.highlight.iter().any(|h| h == name) {
            CowStr::from(name.to_string())
        } else {
            CowStr::Borrowed("")
        }
    }
}

impl HtmlRenderer for MarkdownRenderer {
    fn render(&self, file: &File) -> Result<String> {
        let (_, body) = split_frontmatter(&file.content)?;

        let parser = Parser::new_ext(body, Self::options()).map(|event| match event {
            Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => Event::Start(
                Tag::CodeBlock(CodeBlockKind::Fenced(self.filter_language(lang))),
            ),
            other => other,
        });

        let mut html = String::with_capacity(body.len() * 3 / 2);
        md_html::push_html(&mut html, parser);
        Ok(html)
    }
}
