//! Layouts: templates that wrap a post.
//!
//! A post picks a layout by name through its `layout` front matter field;
//! posts without one use the configured `postTemplate`.

use super::{Post, name_of};
use crate::validation::{Message, Validation, fail, pass};
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub name: String,
    pub path: PathBuf,
}

/// Every known layout, keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayoutContext {
    pub layouts: BTreeMap<String, PathBuf>,
}

impl LayoutContext {
    /// Snapshot of the layouts found by a directory scan.
    pub fn scan(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut context = Self::default();
        for path in paths {
            reduce_layouts(&mut context, to_layout(path));
        }
        context
    }

    /// Template to compile `post` with.
    pub fn resolve(&self, post: &Post, default: &Path) -> Validation<PathBuf> {
        let Some(name) = &post.frontmatter.layout else {
            return pass(default.to_path_buf());
        };

        match self.layouts.get(name) {
            Some(path) => pass(path.clone()),
            None => {
                let known: Vec<_> = self.layouts.keys().map(String::as_str).collect();
                fail(
                    Message::new(format!(
                        "Layout \"{name}\" does not exist, known layouts are: {}",
                        known.join(", ")
                    ))
                    .with_context(post.source_path.display().to_string()),
                )
            }
        }
    }
}

pub fn to_layout(path: PathBuf) -> Layout {
    Layout {
        name: name_of(&path),
        path,
    }
}

pub fn reduce_layouts(context: &mut LayoutContext, layout: Layout) -> &mut LayoutContext {
    context.layouts.insert(layout.name, layout.path);
    context
}
