//! Site configuration loaded from a JSON file (`scribe.json` by default).
//!
//! # Properties
//!
//! | Property       | Required | Resolved against      | Must exist as |
//! |----------------|----------|-----------------------|---------------|
//! | `posts`        | yes      | config file directory | directory     |
//! | `pages`        | yes      | config file directory | directory     |
//! | `styles`       | yes      | config file directory | directory     |
//! | `layouts`      | yes      | config file directory | directory     |
//! | `destination`  | yes      | config file directory | directory     |
//! | `styleIndex`   | no       | resolved `styles`     | file          |
//! | `postTemplate` | no       | resolved `layouts`    | file          |
//! | `categories`   | no       |                       |               |
//! | `highlight`    | no       |                       |               |
//! | `minify`       | no       |                       |               |
//!
//! # Loading stages
//!
//! ```text
//! read + parse JSON
//!     │
//!     ├── keys present      (all required keys, every missing one reported)
//!     ├── keys typed        (only reached when every key is present)
//!     │
//!     ├── resolve paths     (two-hop for styleIndex / postTemplate)
//!     ├── paths exist       (every missing path reported)
//!     │
//!     └── merge defaults ──► Config
//! ```
//!
//! # Example
//!
//! ```json
//! {
//!   "posts": "~/writing/posts",
//!   "pages": "src/pages",
//!   "styles": "src/styles",
//!   "layouts": "src/layouts",
//!   "destination": "dist",
//!   "styleIndex": "main.scss",
//!   "categories": ["opinion", "story"]
//! }
//! ```

mod defaults;
mod error;
pub mod paths;

pub use error::ConfigError;

use crate::validation::{
    Failures, Validation, Validator, fail, pass, validate, validate_all, validate_sequence,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Context attached to every configuration message.
pub const CONTEXT: &str = "While parsing and generating the configuration";

// ============================================================================
// Properties
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prop {
    Posts,
    Pages,
    Styles,
    Layouts,
    Destination,
    StyleIndex,
    PostTemplate,
    Categories,
    Highlight,
    Minify,
}

impl Prop {
    const fn key(self) -> &'static str {
        match self {
            Self::Posts => "posts",
            Self::Pages => "pages",
            Self::Styles => "styles",
            Self::Layouts => "layouts",
            Self::Destination => "destination",
            Self::StyleIndex => "styleIndex",
            Self::PostTemplate => "postTemplate",
            Self::Categories => "categories",
            Self::Highlight => "highlight",
            Self::Minify => "minify",
        }
    }
}

const REQUIRED: [Prop; 5] = [
    Prop::Posts,
    Prop::Pages,
    Prop::Styles,
    Prop::Layouts,
    Prop::Destination,
];
const OPTIONAL_PATHS: [Prop; 2] = [Prop::StyleIndex, Prop::PostTemplate];
const OPTIONAL_LISTS: [Prop; 2] = [Prop::Categories, Prop::Highlight];

type RawConfig = Map<String, Value>;

// ============================================================================
// Resolved Configuration
// ============================================================================

/// Fully resolved, validated configuration.
///
/// Every path is absolute and was verified to exist when the configuration
/// was loaded. Built once, then shared read-only by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Absolute path of the file this configuration was loaded from
    pub config_path: PathBuf,

    pub posts: PathBuf,
    pub pages: PathBuf,
    pub styles: PathBuf,
    pub layouts: PathBuf,
    pub destination: PathBuf,

    /// Directory receiving compiled posts (`{destination}/posts`)
    pub post_output: PathBuf,
    /// Compiled stylesheet (`{destination}/css/styles.css`)
    pub style_output: PathBuf,

    /// Entry stylesheet recompiled whenever anything under `styles` changes
    pub style_index: PathBuf,
    /// Layout used for posts that do not name one
    pub post_template: PathBuf,

    /// Allowed post categories
    pub categories: Vec<String>,
    /// Code block languages that keep their `language-*` class
    pub highlight: Vec<String>,
    /// Minify compiled HTML
    pub minify: bool,
}

/// Shape of the file once keys and types are known to be right.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserConfig {
    posts: PathBuf,
    pages: PathBuf,
    styles: PathBuf,
    layouts: PathBuf,
    destination: PathBuf,
    style_index: Option<PathBuf>,
    post_template: Option<PathBuf>,
    categories: Option<Vec<String>>,
    highlight: Option<Vec<String>>,
    minify: Option<bool>,
}

/// `UserConfig` after path resolution, before existence checks.
#[derive(Debug)]
struct ResolvedConfig {
    posts: PathBuf,
    pages: PathBuf,
    styles: PathBuf,
    layouts: PathBuf,
    destination: PathBuf,
    style_index: PathBuf,
    post_template: PathBuf,
    categories: Option<Vec<String>>,
    highlight: Option<Vec<String>>,
    minify: Option<bool>,
}

impl ResolvedConfig {
    fn path(&self, prop: Prop) -> &Path {
        match prop {
            Prop::Posts => &self.posts,
            Prop::Pages => &self.pages,
            Prop::Styles => &self.styles,
            Prop::Layouts => &self.layouts,
            Prop::Destination => &self.destination,
            Prop::StyleIndex => &self.style_index,
            Prop::PostTemplate => &self.post_template,
            // Only path properties are ever looked up.
            Prop::Categories | Prop::Highlight | Prop::Minify => Path::new(""),
        }
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Load, validate and default the configuration at `path`.
///
/// Every message in a failure carries [`CONTEXT`].
pub fn load_config(path: &Path) -> Validation<Config> {
    let path = paths::absolute(path);
    let base = paths::base_dir(&path);

    read_raw(&path)
        .and_then(|raw| validate_keys().run(raw))
        .and_then(to_user_config)
        .map(|user| resolve_config_paths(&base, user))
        .and_then(|resolved| validate_config_paths().run(resolved))
        .map(|resolved| merge_with_defaults(path.clone(), resolved))
        .map_err(|failures| failures.with_context(CONTEXT))
}

impl Config {
    /// Build a configuration rooted at `root` without touching the disk.
    #[cfg(test)]
    pub fn fixture(root: &Path) -> Self {
        let destination = root.join("dist");
        Self {
            config_path: root.join("scribe.json"),
            posts: root.join("posts"),
            pages: root.join("pages"),
            styles: root.join("styles"),
            layouts: root.join("layouts"),
            post_output: destination.join(defaults::POST_OUTPUT_DIR),
            style_output: destination.join(defaults::STYLE_OUTPUT),
            destination,
            style_index: root.join("styles").join(defaults::STYLE_INDEX),
            post_template: root.join("layouts").join(defaults::POST_TEMPLATE),
            categories: defaults::categories(),
            highlight: defaults::highlight(),
            minify: defaults::minify(),
        }
    }
}

// ============================================================================
// Stages
// ============================================================================

fn read_raw(path: &Path) -> Validation<RawConfig> {
    let content = fs::read_to_string(path)
        .map_err(|err| ConfigError::Io(path.to_path_buf(), err))
        .map_err(config_failure)?;

    match serde_json::from_str::<Value>(&content) {
        Ok(Value::Object(map)) => pass(map),
        Ok(_) => Err(config_failure(ConfigError::NotAnObject(path.to_path_buf()))),
        Err(err) => Err(config_failure(ConfigError::Json(path.to_path_buf(), err))),
    }
}

fn config_failure(err: ConfigError) -> Failures {
    let cause = std::error::Error::source(&err)
        .map(|source| format!(": {source}"))
        .unwrap_or_default();
    Failures::new(format!("{err}{cause}"))
}

/// Presence first, types second: a missing key never also reports its type.
fn validate_keys() -> Validator<RawConfig> {
    let presence = REQUIRED.map(prop_is_required);

    let types = REQUIRED
        .into_iter()
        .map(prop_is_string)
        .chain(OPTIONAL_PATHS.into_iter().map(optional_prop_is_string))
        .chain(OPTIONAL_LISTS.into_iter().map(optional_prop_is_string_list))
        .chain([optional_prop_is_bool(Prop::Minify)]);

    validate_sequence([validate_all(presence), validate_all(types)])
}

fn to_user_config(raw: RawConfig) -> Validation<UserConfig> {
    serde_json::from_value(Value::Object(raw))
        .or_else(|err| fail(format!("Unexpected configuration shape: {err}")))
}

/// Resolve every path; `styleIndex` and `postTemplate` hop through the
/// already resolved `styles` and `layouts` directories.
fn resolve_config_paths(base: &Path, c: UserConfig) -> ResolvedConfig {
    let styles = paths::resolve(base, &c.styles);
    let layouts = paths::resolve(base, &c.layouts);

    let style_index = c
        .style_index
        .as_deref()
        .unwrap_or(Path::new(defaults::STYLE_INDEX));
    let post_template = c
        .post_template
        .as_deref()
        .unwrap_or(Path::new(defaults::POST_TEMPLATE));

    ResolvedConfig {
        posts: paths::resolve(base, &c.posts),
        pages: paths::resolve(base, &c.pages),
        destination: paths::resolve(base, &c.destination),
        style_index: paths::resolve(&styles, style_index),
        post_template: paths::resolve(&layouts, post_template),
        styles,
        layouts,
        categories: c.categories,
        highlight: c.highlight,
        minify: c.minify,
    }
}

fn validate_config_paths() -> Validator<ResolvedConfig> {
    validate_all(
        REQUIRED
            .into_iter()
            .map(prop_is_directory)
            .chain(OPTIONAL_PATHS.into_iter().map(prop_is_file)),
    )
}

fn merge_with_defaults(config_path: PathBuf, c: ResolvedConfig) -> Config {
    Config {
        config_path,
        post_output: c.destination.join(defaults::POST_OUTPUT_DIR),
        style_output: c.destination.join(defaults::STYLE_OUTPUT),
        posts: c.posts,
        pages: c.pages,
        styles: c.styles,
        layouts: c.layouts,
        destination: c.destination,
        style_index: c.style_index,
        post_template: c.post_template,
        categories: c.categories.unwrap_or_else(defaults::categories),
        highlight: c.highlight.unwrap_or_else(defaults::highlight),
        minify: c.minify.unwrap_or_else(defaults::minify),
    }
}

// ============================================================================
// Validators
// ============================================================================

fn prop_is_required(prop: Prop) -> Validator<RawConfig> {
    let k = prop.key();
    validate(
        move |c: &RawConfig| c.contains_key(k),
        move |_| format!("The property \"{k}\" is required in configuration."),
    )
}

fn prop_is_string(prop: Prop) -> Validator<RawConfig> {
    let k = prop.key();
    validate(
        move |c: &RawConfig| c.get(k).is_some_and(Value::is_string),
        move |c| {
            format!(
                "The property \"{k}\" must be a string, but was {}.",
                type_name(c.get(k))
            )
        },
    )
}

fn optional_prop_is_string(prop: Prop) -> Validator<RawConfig> {
    let k = prop.key();
    validate(
        move |c: &RawConfig| c.get(k).is_none_or(Value::is_string),
        move |c| {
            format!(
                "The property \"{k}\" must be a string, but was {}.",
                type_name(c.get(k))
            )
        },
    )
}

fn optional_prop_is_string_list(prop: Prop) -> Validator<RawConfig> {
    let k = prop.key();
    validate(
        move |c: &RawConfig| {
            c.get(k).is_none_or(|v| {
                v.as_array()
                    .is_some_and(|items| items.iter().all(Value::is_string))
            })
        },
        move |c| {
            format!(
                "The property \"{k}\" must be an array of strings, but was {}.",
                type_name(c.get(k))
            )
        },
    )
}

fn optional_prop_is_bool(prop: Prop) -> Validator<RawConfig> {
    let k = prop.key();
    validate(
        move |c: &RawConfig| c.get(k).is_none_or(Value::is_boolean),
        move |c| {
            format!(
                "The property \"{k}\" must be a boolean, but was {}.",
                type_name(c.get(k))
            )
        },
    )
}

fn prop_is_directory(prop: Prop) -> Validator<ResolvedConfig> {
    let k = prop.key();
    validate(
        move |c: &ResolvedConfig| c.path(prop).is_dir(),
        move |c| {
            format!(
                "The path at \"{}\", from property \"{k}\" must point to a directory, but none was found.",
                c.path(prop).display()
            )
        },
    )
}

fn prop_is_file(prop: Prop) -> Validator<ResolvedConfig> {
    let k = prop.key();
    validate(
        move |c: &ResolvedConfig| c.path(prop).is_file(),
        move |c| {
            format!(
                "The path at \"{}\", from property \"{k}\" must point to a file, but none was found.",
                c.path(prop).display()
            )
        },
    )
}

/// JSON type name used in messages.
fn type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "boolean",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================
