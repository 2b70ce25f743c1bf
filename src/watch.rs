//! File-event sources.
//!
//! A source turns a directory into a stream of file paths: every file found by
//! the initial scan, followed by every file created or modified afterwards.
//!
//! ```text
//!   walkdir scan ──┐
//!                  ├──► UnboundedReceiver<PathBuf> ──► pipeline
//!  notify events ──┘    (live mode only)
//! ```
//!
//! In scan-only mode the stream ends after the scan, which lets a one-shot
//! build run the same pipeline to completion.

use crate::{
    data::File,
    log,
    pipeline::Stream,
    validation::{Failures, Message, Validation, pass},
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use walkdir::WalkDir;

// =============================================================================
// Path Utilities
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

const fn is_relevant(event: &Event) -> bool {
    matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_))
}

// =============================================================================
// Sources
// =============================================================================

/// Where file paths come from.
pub trait EventSource: Send + Sync {
    /// Every file currently under `dir`, sorted.
    fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>>;

    /// The scan followed by live changes under `dir`.
    fn watch(&self, dir: &Path) -> Result<Stream<PathBuf>>;
}

/// Directory walk plus `notify` watchers.
///
/// Watchers stop when dropped, so the source keeps them for its lifetime.
pub struct NotifySource {
    live: bool,
    watchers: Mutex<Vec<RecommendedWatcher>>,
}

impl NotifySource {
    /// Scan, then keep reporting changes.
    pub fn live() -> Self {
        Self {
            live: true,
            watchers: Mutex::new(Vec::new()),
        }
    }

    /// Scan once; streams close when the scan is delivered.
    pub fn scan_only() -> Self {
        Self {
            live: false,
            watchers: Mutex::new(Vec::new()),
        }
    }

    fn start_watcher(&self, dir: &Path, tx: mpsc::UnboundedSender<PathBuf>) -> Result<()> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_relevant(&event) => {
                for path in event.paths {
                    if path.is_file() && !is_temp_file(&path) {
                        // Receiver gone means the pipeline shut down.
                        let _ = tx.send(path);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => log!("watch"; "error: {e}"),
        })
        .context("Failed to create file watcher")?;

        watcher
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("Failed to watch {}", dir.display()))?;

        log!("watch"; "{}", dir.display());
        self.watchers.lock().push(watcher);
        Ok(())
    }
}

impl EventSource for NotifySource {
    fn scan(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in WalkDir::new(dir) {
            let entry = entry.with_context(|| format!("Failed to scan {}", dir.display()))?;
            if entry.file_type().is_file() && !is_temp_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn watch(&self, dir: &Path) -> Result<Stream<PathBuf>> {
        let (tx, rx) = mpsc::unbounded_channel();

        if self.live {
            self.start_watcher(dir, tx.clone())?;
        }
        for path in self.scan(dir)? {
            let _ = tx.send(path);
        }

        Ok(rx)
    }
}

// =============================================================================
// Reading
// =============================================================================

/// Read a UTF-8 file; failures are tagged with its path.
pub async fn read_file(path: PathBuf) -> Validation<File> {
    match tokio::fs::read_to_string(&path).await {
        Ok(content) => pass(File {
            filepath: path,
            content,
        }),
        Err(err) => Err(Failures::new(
            Message::new(format!("Could not read file: {err}")).with_context(path.display().to_string()),
        )),
    }
}

// =============================================================================
// Tests
// =============================================================================
