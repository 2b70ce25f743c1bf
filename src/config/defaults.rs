//! Default values for optional configuration properties.

// ============================================================================
// Files
// ============================================================================

/// Entry stylesheet, relative to the `styles` directory.
pub const STYLE_INDEX: &str = "index.scss";

/// Post layout, relative to the `layouts` directory.
pub const POST_TEMPLATE: &str = "post.html";

// ============================================================================
// Output Layout
// ============================================================================

/// Sub-directory of `destination` receiving compiled posts.
pub const POST_OUTPUT_DIR: &str = "posts";

/// Compiled stylesheet, relative to `destination`.
pub const STYLE_OUTPUT: &str = "css/styles.css";

// ============================================================================
// Lists
// ============================================================================

pub fn categories() -> Vec<String> {
    ["opinion", "story", "tutorial", "concept", "review"]
        .into_iter()
        .map(String::from)
        .collect()
}

pub fn highlight() -> Vec<String> {
    [
        "bash",
        "css",
        "html",
        "javascript",
        "json",
        "rust",
        "typescript",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

pub const fn minify() -> bool {
    false
}
