//! Document transforms behind narrow capability traits.
//!
//! The pipeline never talks to a markdown parser or a template engine
//! directly. It receives a [`Transforms`] bundle and calls through these
//! traits, so tests can swap in fakes.
//!
//! | Capability               | Default            | Crate            |
//! |--------------------------|--------------------|------------------|
//! | [`FrontmatterExtractor`] | [`YamlFrontmatter`] | `serde_yaml`    |
//! | [`HtmlRenderer`]         | [`MarkdownRenderer`] | `pulldown-cmark` |
//! | [`TemplateCompiler`]     | [`JinjaTemplates`] | `minijinja`      |
//! | [`StyleCompiler`]        | [`ScssCompiler`]   | `grass`          |
//!
//! # Build Flow
//!
//! ```text
//! post.md ──extract──► RawFrontmatter
//!    │
//!    └────render────► HTML body ──compile(layout)──► post.html
//!
//! page.html ──compile(page, post context)──► page.html
//!
//! index.scss ──compile(include paths)──► styles.css
//! ```

mod frontmatter;
mod markdown;
mod minify;
mod style;
mod template;

pub use frontmatter::YamlFrontmatter;
pub use markdown::MarkdownRenderer;
pub use minify::minify;
pub use style::ScssCompiler;
pub use template::JinjaTemplates;

use crate::{
    config::Config,
    data::{File, RawFrontmatter},
};
use anyhow::Result;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

// ============================================================================
// Capabilities
// ============================================================================

/// Reads the metadata block of a post.
pub trait FrontmatterExtractor: Send + Sync {
    fn extract(&self, file: &File) -> Result<RawFrontmatter>;
}

/// Renders the body of a post to HTML, skipping the metadata block.
pub trait HtmlRenderer: Send + Sync {
    fn render(&self, file: &File) -> Result<String>;
}

/// Compiles a template file against a JSON context.
///
/// Implementations re-read `template` on every call, so edits to layouts and
/// pages show up on the next compilation.
pub trait TemplateCompiler: Send + Sync {
    fn compile(&self, template: &Path, context: &serde_json::Value) -> Result<String>;
}

/// Compiles a stylesheet. Runs on the blocking pool.
pub trait StyleCompiler: Send + Sync {
    /// `filepath` is where the resulting CSS will be written.
    fn compile(&self, content: &str, include_paths: &[PathBuf], filepath: &Path) -> Result<File>;
}

// ============================================================================
// Bundle
// ============================================================================

/// The four transforms the pipeline is built with.
#[derive(Clone)]
pub struct Transforms {
    pub frontmatter: Arc<dyn FrontmatterExtractor>,
    pub renderer: Arc<dyn HtmlRenderer>,
    pub templates: Arc<dyn TemplateCompiler>,
    pub styles: Arc<dyn StyleCompiler>,
}

impl Transforms {
    /// Default transforms configured from `config`.
    pub fn standard(config: &Config) -> Self {
        Self {
            frontmatter: Arc::new(YamlFrontmatter),
            renderer: Arc::new(MarkdownRenderer::new(config.highlight.clone())),
            templates: Arc::new(JinjaTemplates::new(vec![
                config.pages.clone(),
                config.layouts.clone(),
            ])),
            styles: Arc::new(ScssCompiler),
        }
    }
}

impl std::fmt::Debug for Transforms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Transforms")
    }
}
