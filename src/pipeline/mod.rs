//! The reactive build graph.
//!
//! # Topology
//!
//! ```text
//!  posts/ ──read──► file_to_post ──► validate_post ──► to_post ──tee──┐
//!                                                                     │
//!        ┌────────────────────────────────────────────────────────────┤
//!        │                                                            │
//!        ▼                                                            ▼
//!  combine_latest ◄── LayoutContext ◄─debounce─ scan ◄── layouts/  filter ok
//!        │                                                            │
//!        ▼                                                          scan
//!   compile post                                                      │
//!        │                                                         debounce
//!        │                                                            │
//!        │                       PageContext ──┐                      ▼
//!        │  pages/ ─► to_page ─► scan ─► debounce      PostContext ◄──┘
//!        │                                     │            │
//!        │                                     ▼            ▼
//!        │                                  combine_signals(pages, posts)
//!        │                                              │
//!        │                                   compile every page
//!        │                                              │
//!        │  styles/ ─► debounce ─► compile index ─► debounce
//!        │                                              │
//!        └────────────────────► merge ◄─────────────────┘
//!                                 │
//!                                 ▼
//!                          Stream<Artifact>
//! ```
//!
//! Each accumulator is owned by its `scan` task. Joins only ever read the
//! `Arc` snapshots published through `watch` signals.
//!
//! Failures travel as values: a broken post yields one failed artifact and
//! is left out of the post context; every other document is unaffected.

pub mod stream;

pub use stream::{Signal, Stream};

use crate::{
    compiler::{StyleCompiler, TemplateCompiler, Transforms, minify},
    config::Config,
    data::{
        File, LayoutContext, Page, PageContext, Post, PostContext, RawPost, file_to_post, is_partial,
        reduce_layouts, reduce_pages, reduce_post_context, to_layout, to_page, to_post,
        validate_post,
    },
    log,
    validation::{Failures, Message, Validation, fail, flat_map, map},
    watch::{EventSource, read_file},
};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

/// A compiled output file, or why it could not be produced.
pub type Artifact = Validation<File>;

/// Quiet period before a changed context is published.
const CONTEXT_DEBOUNCE: Duration = Duration::from_millis(200);
/// Quiet period before a burst of stylesheet changes triggers a compile.
const STYLE_CHANGE_DEBOUNCE: Duration = Duration::from_millis(100);
/// Quiet period before a compiled stylesheet is emitted.
const STYLE_OUTPUT_DEBOUNCE: Duration = Duration::from_millis(200);

// ============================================================================
// Pipeline
// ============================================================================

/// A running build graph.
pub struct Pipeline {
    /// Every compiled post, page and stylesheet
    pub output: Stream<Artifact>,
    /// Latest published post context
    pub posts: Signal<Arc<PostContext>>,
    /// Latest published page context
    pub pages: Signal<Arc<PageContext>>,
    /// Latest published layout context
    pub layouts: Signal<Arc<LayoutContext>>,
}

impl Pipeline {
    /// Wire up the graph and start watching.
    ///
    /// Fails only if a source directory cannot be scanned or watched.
    pub fn build(
        config: Arc<Config>,
        transforms: Transforms,
        source: &dyn EventSource,
    ) -> Result<Self> {
        let layouts = layout_context(&config, source)?;

        let (to_compile, to_fold) = stream::tee(posts(&config, &transforms, source)?);
        let compiled_posts = compile_posts(
            config.clone(),
            transforms.templates.clone(),
            to_compile,
            layouts.clone(),
        );
        let posts = post_context(to_fold);

        let pages = page_context(&config, source)?;
        let compiled_pages = compile_pages(
            config.clone(),
            transforms.templates.clone(),
            pages.clone(),
            posts.clone(),
        );

        let compiled_styles = styles(config, transforms.styles, source)?;

        Ok(Self {
            output: stream::merge([compiled_posts, compiled_pages, compiled_styles]),
            posts,
            pages,
            layouts,
        })
    }
}

// ============================================================================
// Posts
// ============================================================================

/// One `Validation<Post>` per post file event.
fn posts(
    config: &Config,
    transforms: &Transforms,
    source: &dyn EventSource,
) -> Result<Stream<Validation<Post>>> {
    let files = stream::then(source.watch(&config.posts)?, read_file);

    let Transforms {
        frontmatter,
        renderer,
        ..
    } = transforms.clone();
    let post_output = config.post_output.clone();
    let validator = validate_post(config);

    let extract = flat_map(move |file: File| {
        file_to_post(&*frontmatter, &*renderer, &post_output, &file)
    });
    let check = flat_map(move |raw: RawPost| validator.run(raw));
    let normalize = flat_map(to_post);

    Ok(stream::map(files, move |file| normalize(check(extract(file)))))
}

/// Successful posts folded into the published post context.
fn post_context(results: Stream<Validation<Post>>) -> Signal<Arc<PostContext>> {
    let posts = stream::filter_map(results, Result::ok);
    let snapshots = stream::scan(posts, PostContext::default(), |context, post| {
        reduce_post_context(context, post);
    });
    let published = stream::inspect(stream::debounce(snapshots, CONTEXT_DEBOUNCE), |context| {
        log!("posts"; "{} known", context.len());
    });
    stream::hold(published, Arc::default())
}

/// Compile each post, and the latest post again whenever layouts change.
fn compile_posts(
    config: Arc<Config>,
    templates: Arc<dyn TemplateCompiler>,
    posts: Stream<Validation<Post>>,
    layouts: Signal<Arc<LayoutContext>>,
) -> Stream<Artifact> {
    stream::map(stream::combine_latest(posts, layouts), move |(post, layouts)| {
        post.and_then(|post| compile_post(&config, &*templates, &layouts, &post))
    })
}

fn compile_post(
    config: &Config,
    templates: &dyn TemplateCompiler,
    layouts: &LayoutContext,
    post: &Post,
) -> Artifact {
    let template = layouts.resolve(post, &config.post_template)?;
    let scope = post_scope(post).map_err(tagged(&post.source_path, "prepare template data"))?;
    let html = templates
        .compile(&template, &scope)
        .map_err(tagged(&post.source_path, "compile post"));

    map(|html: String| File::new(&post.destination_path, minify(&html, config)))(html)
}

/// Template data for a post: its front matter fields plus `post_content`.
fn post_scope(post: &Post) -> Result<Value> {
    let mut scope = serde_json::to_value(&post.frontmatter)?;
    if let Value::Object(fields) = &mut scope {
        fields.insert(
            "post_content".to_string(),
            Value::String(post.post_content.clone()),
        );
    }
    Ok(scope)
}

// ============================================================================
// Layouts
// ============================================================================

/// Layouts seeded from the initial scan, then folded from live events.
fn layout_context(
    config: &Config,
    source: &dyn EventSource,
) -> Result<Signal<Arc<LayoutContext>>> {
    let root = config.layouts.clone();
    let seed = LayoutContext::scan(
        source
            .scan(&root)?
            .into_iter()
            .filter(|path| !is_partial(path, &root)),
    );

    let paths = stream::filter(source.watch(&root)?, move |path| !is_partial(path, &root));
    let snapshots = stream::scan(stream::map(paths, to_layout), seed.clone(), |context, layout| {
        reduce_layouts(context, layout);
    });
    Ok(stream::hold(
        stream::debounce(snapshots, CONTEXT_DEBOUNCE),
        Arc::new(seed),
    ))
}

// ============================================================================
// Pages
// ============================================================================

fn page_context(config: &Config, source: &dyn EventSource) -> Result<Signal<Arc<PageContext>>> {
    let root = config.pages.clone();
    let destination = config.destination.clone();

    let paths = stream::filter(source.watch(&root)?, move |path| !is_partial(path, &root));
    let pages = stream::map(paths, move |path| to_page(&destination, path));
    let snapshots = stream::scan(pages, PageContext::default(), |context, page| {
        reduce_pages(context, page);
    });
    Ok(stream::hold(
        stream::debounce(snapshots, CONTEXT_DEBOUNCE),
        Arc::default(),
    ))
}

/// Recompile every known page whenever pages or posts change.
fn compile_pages(
    config: Arc<Config>,
    templates: Arc<dyn TemplateCompiler>,
    pages: Signal<Arc<PageContext>>,
    posts: Signal<Arc<PostContext>>,
) -> Stream<Artifact> {
    stream::flat_map_iter(
        stream::combine_signals(pages, posts),
        move |(pages, posts)| {
            pages
                .iter()
                .map(|page| compile_page(&config, &*templates, page, &posts))
                .collect::<Vec<_>>()
        },
    )
}

/// Template data for a page.
#[derive(Serialize)]
struct PageScope<'a> {
    page: &'a Page,
    /// Posts by title
    posts: &'a BTreeMap<String, Post>,
    /// Posts newest first
    post_list: Vec<&'a Post>,
}

fn compile_page(
    config: &Config,
    templates: &dyn TemplateCompiler,
    page: &Page,
    posts: &PostContext,
) -> Artifact {
    let scope = serde_json::to_value(PageScope {
        page,
        posts: &posts.posts,
        post_list: posts.sorted(),
    })
    .map_err(|e| tagged(&page.template_path, "prepare template data")(e.into()))?;

    let html = templates
        .compile(&page.template_path, &scope)
        .map_err(tagged(&page.template_path, "compile page"));

    map(|html: String| File::new(&page.destination_path, minify(&html, config)))(html)
}

// ============================================================================
// Styles
// ============================================================================

/// Recompile the entry stylesheet whenever anything under `styles` changes.
fn styles(
    config: Arc<Config>,
    compiler: Arc<dyn StyleCompiler>,
    source: &dyn EventSource,
) -> Result<Stream<Artifact>> {
    let changes = stream::debounce(source.watch(&config.styles)?, STYLE_CHANGE_DEBOUNCE);
    let compiled = stream::then(changes, move |_changed: PathBuf| {
        compile_styles(config.clone(), compiler.clone())
    });
    Ok(stream::debounce(compiled, STYLE_OUTPUT_DEBOUNCE))
}

async fn compile_styles(config: Arc<Config>, compiler: Arc<dyn StyleCompiler>) -> Artifact {
    let index = read_file(config.style_index.clone()).await?;

    let mut include_paths = vec![config.styles.clone()];
    if let Some(dir) = index.filepath.parent()
        && dir != config.styles
    {
        include_paths.push(dir.to_path_buf());
    }

    let source_path = index.filepath.clone();
    let output = config.style_output.clone();
    let compiled = tokio::task::spawn_blocking(move || {
        compiler.compile(&index.content, &include_paths, &output)
    })
    .await;

    match compiled {
        Ok(result) => result.map_err(tagged(&source_path, "compile stylesheet")),
        Err(err) => fail(
            Message::new(format!("Stylesheet compiler stopped unexpectedly: {err}"))
                .with_context(source_path.display().to_string()),
        ),
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Turn a capability error into a failure tagged with the document path.
fn tagged(path: &Path, what: &'static str) -> impl FnOnce(anyhow::Error) -> Failures {
    let context = path.display().to_string();
    move |err| Failures::new(Message::new(format!("Could not {what}: {err:#}")).with_context(context))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::name_of, watch::NotifySource};
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use std::{
        collections::{BTreeSet, HashMap},
        fs,
    };
    use tempfile::TempDir;
    use tokio::{sync::mpsc, time::timeout};

    const WAIT: Duration = Duration::from_secs(10);

    struct Site {
        _dir: TempDir,
        config: Arc<Config>,
    }

    fn site() -> Site {
        let dir = TempDir::new().unwrap();
        let config = Config::fixture(dir.path());
        for path in [
            &config.posts,
            &config.pages,
            &config.styles,
            &config.layouts,
            &config.destination,
        ] {
            fs::create_dir_all(path).unwrap();
        }
        fs::write(&config.style_index, "body { margin: 0 }").unwrap();
        fs::write(
            &config.post_template,
            "<h1>{{ title }}</h1>{{ post_content | safe }}",
        )
        .unwrap();
        Site {
            _dir: dir,
            config: Arc::new(config),
        }
    }

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn post_source(title: Option<&str>, published: &str, extra: &str) -> String {
        let title = title.map(|t| format!("title: {t}\n")).unwrap_or_default();
        format!("---\n{title}published: {published}\ncategory: story\n{extra}---\nBody of the post.\n")
    }

    /// Every artifact until the output closes.
    async fn drain(mut output: Stream<Artifact>) -> Vec<Artifact> {
        let mut artifacts = Vec::new();
        while let Some(artifact) = timeout(WAIT, output.recv()).await.unwrap() {
            artifacts.push(artifact);
        }
        artifacts
    }

    async fn next_n(output: &mut Stream<Artifact>, n: usize) -> Vec<Artifact> {
        let mut artifacts = Vec::new();
        for _ in 0..n {
            artifacts.push(timeout(WAIT, output.recv()).await.unwrap().unwrap());
        }
        artifacts
    }

    /// Latest successful content per output path.
    fn written(artifacts: &[Artifact]) -> HashMap<PathBuf, String> {
        artifacts
            .iter()
            .filter_map(|a| a.as_ref().ok())
            .map(|f| (f.filepath.clone(), f.content.clone()))
            .collect()
    }

    /// Directory source driven by the test.
    #[derive(Default)]
    struct ChannelSource {
        streams: Mutex<HashMap<PathBuf, Stream<PathBuf>>>,
    }

    impl ChannelSource {
        fn open(&self, dir: &Path) -> mpsc::UnboundedSender<PathBuf> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.streams.lock().insert(dir.to_path_buf(), rx);
            tx
        }
    }

    impl EventSource for ChannelSource {
        fn scan(&self, _dir: &Path) -> Result<Vec<PathBuf>> {
            Ok(Vec::new())
        }

        fn watch(&self, dir: &Path) -> Result<Stream<PathBuf>> {
            self.streams
                .lock()
                .remove(dir)
                .ok_or_else(|| anyhow!("{} is not open", dir.display()))
        }
    }

    /// Renders `{template name}:{titles of post_list}`.
    struct Titles;

    impl TemplateCompiler for Titles {
        fn compile(&self, template: &Path, context: &Value) -> Result<String> {
            let titles: Vec<_> = context["post_list"]
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|post| post["frontmatter"]["title"].as_str())
                .collect();
            Ok(format!("{}:{}", name_of(template), titles.join(",")))
        }
    }

    #[tokio::test]
    async fn test_one_bad_post_does_not_affect_others() {
        let site = site();
        let config = &site.config;
        write(&config.posts, "1.md", &post_source(Some("One"), "2024-01-01", ""));
        let second = write(&config.posts, "2.md", &post_source(None, "2024-01-02", ""));
        write(&config.posts, "3.md", &post_source(Some("Three"), "2024-01-03", ""));

        let Pipeline { output, posts, .. } = Pipeline::build(
            config.clone(),
            Transforms::standard(config),
            &NotifySource::scan_only(),
        )
        .unwrap();
        let artifacts = drain(output).await;

        let failed: BTreeSet<_> = artifacts
            .iter()
            .filter_map(|a| a.as_ref().err())
            .flat_map(|f| f.iter().map(|m| (m.context.clone(), m.text.clone())))
            .collect();
        assert_eq!(
            failed,
            BTreeSet::from([(
                Some(second.display().to_string()),
                "Field \"title\" is required".to_string()
            )])
        );

        let compiled: BTreeSet<_> = written(&artifacts)
            .into_keys()
            .filter(|p| p.starts_with(&config.post_output))
            .collect();
        assert_eq!(
            compiled,
            BTreeSet::from([
                config.post_output.join("1.html"),
                config.post_output.join("3.html")
            ])
        );

        let context = posts.borrow().clone();
        assert_eq!(
            context.posts.keys().collect::<Vec<_>>(),
            vec!["One", "Three"]
        );
    }

    #[tokio::test]
    async fn test_new_post_recompiles_every_known_page() {
        let site = site();
        let config = &site.config;
        let source = ChannelSource::default();
        let posts_tx = source.open(&config.posts);
        let pages_tx = source.open(&config.pages);
        let _layouts_tx = source.open(&config.layouts);
        let _styles_tx = source.open(&config.styles);

        let transforms = Transforms {
            templates: Arc::new(Titles),
            ..Transforms::standard(config)
        };
        let mut pipeline = Pipeline::build(config.clone(), transforms, &source).unwrap();

        pages_tx.send(config.pages.join("about.html")).unwrap();
        pages_tx.send(config.pages.join("index.html")).unwrap();
        let first = written(&next_n(&mut pipeline.output, 2).await);
        assert_eq!(first[&config.destination.join("about.html")], "about:");
        assert_eq!(first[&config.destination.join("index.html")], "index:");

        let post = write(&config.posts, "hello.md", &post_source(Some("Hello"), "2024-01-01", ""));
        posts_tx.send(post).unwrap();
        let next = written(&next_n(&mut pipeline.output, 3).await);

        assert_eq!(next[&config.post_output.join("hello.html")], "post:");
        assert_eq!(next[&config.destination.join("about.html")], "about:Hello");
        assert_eq!(next[&config.destination.join("index.html")], "index:Hello");
        assert_eq!(pipeline.pages.borrow().pages.len(), 2);
    }

    #[tokio::test]
    async fn test_full_build() {
        let site = site();
        let config = &site.config;
        write(&config.layouts, "wide.html", "<main>{{ title }}</main>");
        write(&config.pages, "_nav.html", "<nav></nav>");
        write(
            &config.pages,
            "index.html",
            "{% include '_nav.html' %}{% for post in post_list %}<a href=\"posts/{{ post.frontmatter.slug }}.html\">{{ post.frontmatter.title }}</a>{% endfor %}",
        );
        write(&config.styles, "_colors.scss", "$fg: #333;");
        write(&config.styles, "index.scss", "@import 'colors'; body { color: $fg; }");
        write(&config.posts, "a.md", &post_source(Some("A"), "2024-01-01", "layout: wide\n"));
        write(&config.posts, "b.md", &post_source(Some("B"), "2024-02-01", ""));

        let Pipeline {
            output, layouts, ..
        } = Pipeline::build(
            config.clone(),
            Transforms::standard(config),
            &NotifySource::scan_only(),
        )
        .unwrap();
        let artifacts = drain(output).await;

        assert!(artifacts.iter().all(Result::is_ok));
        let files = written(&artifacts);

        assert_eq!(files[&config.post_output.join("a.html")], "<main>A</main>");
        let b = &files[&config.post_output.join("b.html")];
        assert!(b.starts_with("<h1>B</h1>"));
        assert!(b.contains("<p>Body of the post.</p>"));

        let index = &files[&config.destination.join("index.html")];
        assert!(index.starts_with("<nav></nav>"));
        let (a_at, b_at) = (index.find(">A<").unwrap(), index.find(">B<").unwrap());
        assert!(b_at < a_at);

        assert!(!files.contains_key(&config.destination.join("_nav.html")));
        assert!(files[&config.style_output].contains("color:#333"));
        assert_eq!(layouts.borrow().layouts.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_layout_fails_the_post() {
        let site = site();
        let config = &site.config;
        let path = write(
            &config.posts,
            "odd.md",
            &post_source(Some("Odd"), "2024-01-01", "layout: nope\n"),
        );

        let Pipeline { output, posts, .. } = Pipeline::build(
            config.clone(),
            Transforms::standard(config),
            &NotifySource::scan_only(),
        )
        .unwrap();
        let artifacts = drain(output).await;

        let failure = artifacts
            .iter()
            .find_map(|a| a.as_ref().err())
            .unwrap();
        assert!(failure.messages()[0].text.contains("\"nope\""));
        assert_eq!(
            failure.messages()[0].context.as_deref(),
            Some(path.display().to_string().as_str())
        );
        // Valid post, so it is still known to pages.
        assert!(posts.borrow().posts.contains_key("Odd"));
    }

    #[tokio::test]
    async fn test_broken_stylesheet_is_reported() {
        let site = site();
        let config = &site.config;
        fs::write(&config.style_index, "body { color: ").unwrap();

        let pipeline = Pipeline::build(
            config.clone(),
            Transforms::standard(config),
            &NotifySource::scan_only(),
        )
        .unwrap();
        let artifacts = drain(pipeline.output).await;

        let failure = artifacts
            .iter()
            .find_map(|a| a.as_ref().err())
            .unwrap();
        let message = &failure.messages()[0];
        assert!(message.text.starts_with("Could not compile stylesheet"));
        assert_eq!(
            message.context.as_deref(),
            Some(config.style_index.display().to_string().as_str())
        );
    }

    #[tokio::test]
    async fn test_minified_output() {
        let site = site();
        let mut config = Config::clone(&site.config);
        config.minify = true;
        let config = Arc::new(config);
        write(&config.pages, "index.html", "<div>\n    <p>Hi</p>\n</div>");

        let pipeline = Pipeline::build(
            config.clone(),
            Transforms::standard(&config),
            &NotifySource::scan_only(),
        )
        .unwrap();
        let files = written(&drain(pipeline.output).await);

        let index = &files[&config.destination.join("index.html")];
        assert!(index.contains("<p>Hi</p>"));
        assert!(!index.contains('\n'));
    }
}
