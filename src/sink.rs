//! Writes artifacts to disk and reports failures.
//!
//! ```text
//! Ok(File)       ──► mkdir -p parent ──► write content + "\n" ──► [write] path
//! Err(Failures)  ──► [error] header + (1) message, (2) message, ...
//! ```
//!
//! Nothing is retried; the next change to the source document produces a
//! fresh artifact.

use crate::{
    data::File,
    log,
    logger::log_failures,
    pipeline::{Artifact, Stream},
};
use anyhow::{Context, Result};

/// Outcome counts of a drained output stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SinkReport {
    pub written: usize,
    pub failed: usize,
}

/// Create parent directories and overwrite `file.filepath`.
pub async fn write_file(file: &File) -> Result<()> {
    if let Some(parent) = file.filepath.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut content = String::with_capacity(file.content.len() + 1);
    content.push_str(&file.content);
    content.push('\n');

    tokio::fs::write(&file.filepath, content)
        .await
        .with_context(|| format!("Failed to write {}", file.filepath.display()))
}

/// Write a successful artifact or log a failed one. Returns whether a file
/// was written.
pub async fn write_artifact(artifact: Artifact) -> bool {
    match artifact {
        Ok(file) => match write_file(&file).await {
            Ok(()) => {
                log!("write"; "{}", file.filepath.display());
                true
            }
            Err(err) => {
                log!("error"; "{err:#}");
                false
            }
        },
        Err(failures) => {
            log_failures("error", "build failed", &failures);
            false
        }
    }
}

/// Write every artifact until `output` closes.
pub async fn drain(mut output: Stream<Artifact>) -> SinkReport {
    let mut report = SinkReport::default();
    while let Some(artifact) = output.recv().await {
        if write_artifact(artifact).await {
            report.written += 1;
        } else {
            report.failed += 1;
        }
    }
    report
}
