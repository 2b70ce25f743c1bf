//! Pages: standalone templates rendered against the post context.

use super::name_of;
use serde::Serialize;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: String,
    pub template_path: PathBuf,
    pub destination_path: PathBuf,
}

/// Every known page, keyed by title.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageContext {
    pub pages: BTreeMap<String, Page>,
}

impl PageContext {
    pub fn iter(&self) -> impl Iterator<Item = &Page> {
        self.pages.values()
    }
}

/// `{pages}/about.html` → `Page { title: "about", destination: {destination}/about.html }`
pub fn to_page(destination: &Path, template_path: PathBuf) -> Page {
    let title = name_of(&template_path);
    let destination_path = destination.join(format!("{title}.html"));
    Page {
        title,
        template_path,
        destination_path,
    }
}

pub fn reduce_pages(context: &mut PageContext, page: Page) -> &mut PageContext {
    context.pages.insert(page.title.clone(), page);
    context
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::is_partial;

    #[test]
    fn test_to_page() {
        let page = to_page(Path::new("/dist"), PathBuf::from("/src/pages/about.html"));

        assert_eq!(page.title, "about");
        assert_eq!(page.destination_path, PathBuf::from("/dist/about.html"));
        assert_eq!(page.template_path, PathBuf::from("/src/pages/about.html"));
    }

    #[test]
    fn test_nested_page_lands_at_destination_root() {
        let page = to_page(Path::new("/dist"), PathBuf::from("/src/pages/blog/archive.html"));
        assert_eq!(page.destination_path, PathBuf::from("/dist/archive.html"));
    }

    #[test]
    fn test_reduce_pages_last_write_wins() {
        let mut context = PageContext::default();
        reduce_pages(&mut context, to_page(Path::new("/dist"), "/a/index.html".into()));
        reduce_pages(&mut context, to_page(Path::new("/dist"), "/b/index.html".into()));

        assert_eq!(context.pages.len(), 1);
        assert_eq!(context.pages["index"].template_path, PathBuf::from("/b/index.html"));
    }

    #[test]
    fn test_partials_never_become_pages() {
        let root = Path::new("/src/pages");
        let paths = [
            "/src/pages/index.html",
            "/src/pages/_layout.html",
            "/src/pages/_parts/nav.html",
        ];

        let mut context = PageContext::default();
        for path in paths.map(PathBuf::from) {
            if !is_partial(&path, root) {
                reduce_pages(&mut context, to_page(Path::new("/dist"), path));
            }
        }

        assert_eq!(context.pages.keys().collect::<Vec<_>>(), vec!["index"]);
    }
}
