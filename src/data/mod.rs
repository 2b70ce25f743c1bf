//! Domain model: posts, pages and layouts.
//!
//! Everything here is pure. File contents come in as [`File`] values, the
//! capability traits in [`crate::compiler`] do the parsing, and the reducers
//! fold validated entities into the accumulated contexts.
//!
//! ```text
//! File ──file_to_post──► RawPost ──validate_post──► RawPost ──to_post──► Post
//!                                                                          │
//!                                                 reduce_post_context ◄────┘
//!                                                          │
//!                                                          ▼
//!                                                     PostContext
//!
//! template path ──to_page──► Page ──reduce_pages──► PageContext
//! layout path ──to_layout──► Layout ──reduce_layouts──► LayoutContext
//! ```
//!
//! Every context is keyed by a derived name and is last-write-wins.

mod frontmatter;
mod layout;
mod page;
mod post;

pub use frontmatter::{Frontmatter, RawFrontmatter, parse_date};
pub use layout::{Layout, LayoutContext, reduce_layouts, to_layout};
pub use page::{Page, PageContext, reduce_pages, to_page};
pub use post::{Post, PostContext, RawPost, file_to_post, reduce_post_context, to_post, validate_post};

use std::path::{Component, Path, PathBuf};

/// A file path and its text content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub filepath: PathBuf,
    pub content: String,
}

impl File {
    pub fn new(filepath: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            content: content.into(),
        }
    }
}

/// File name with everything from the first `.` removed.
///
/// `pages/index.en.html` → `index`
pub fn name_of(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    name.split_once('.')
        .map_or(name.as_ref(), |(stem, _)| stem)
        .to_string()
}

/// Whether any path segment below `root` starts with `_`.
///
/// Partials are include-only templates and never become pages or layouts.
/// Paths outside `root` are judged on all of their segments.
pub fn is_partial(path: &Path, root: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .any(|c| matches!(c, Component::Normal(s) if s.to_string_lossy().starts_with('_')))
}
