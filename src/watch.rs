//! File system watcher for live reload.
//!
//! Watches the site root recursively, coalesces bursts of change events
//! through a short debounce window, and triggers one full rebuild per burst.
//! Successful rebuilds notify the dev server's reload state; failed rebuilds
//! log and keep watching. There is no incremental rebuild path — every
//! trigger runs the whole pipeline.

use crate::serve::ReloadState;
use crate::{build::build_site, config::SiteConfig, log};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

/// Quiet period after the last event before a rebuild fires.
const DEBOUNCE_MS: u64 = 100;

// =============================================================================
// Path Filtering
// =============================================================================

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Whether a changed path should trigger a rebuild.
///
/// The output tree, hidden directories, `node_modules`, configured ignore
/// names, and editor temp files never trigger.
fn is_watched(config: &SiteConfig, path: &Path) -> bool {
    if path.starts_with(config.output_dir()) {
        return false;
    }
    if is_temp_file(path) {
        return false;
    }

    let relative = path.strip_prefix(config.get_root()).unwrap_or(path);
    for component in relative.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.starts_with('.')
            || name == "node_modules"
            || config.serve.watch_ignore.iter().any(|i| name == i.as_str())
        {
            return false;
        }
    }
    true
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events into one rebuild trigger.
struct Debouncer {
    pending: HashSet<PathBuf>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: HashSet::new(),
            last_event: None,
        }
    }

    fn add(&mut self, path: PathBuf) {
        self.pending.insert(path);
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<PathBuf> {
        self.last_event = None;
        self.pending.drain().collect()
    }

    /// Next receive timeout. The idle poll also bounds how long shutdown
    /// waits for the loop to notice the stop flag.
    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_millis(500)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

const fn is_relevant(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
    )
}

// =============================================================================
// Public API
// =============================================================================

/// Start the blocking watch loop: recursive watch on the site root,
/// debounced full rebuilds, reload notification on success. Runs until the
/// reload state's stop flag is set.
pub fn watch_for_changes_blocking(
    config: &'static SiteConfig,
    reload: Arc<ReloadState>,
) -> Result<()> {
    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher =
        notify::recommended_watcher(tx).context("failed to create file watcher")?;

    let root = config.get_root();
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;
    log!("watch"; "watching {}", root.display());

    let mut debouncer = Debouncer::new();

    loop {
        if reload.is_stopping() {
            break;
        }
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) if is_relevant(&event) => {
                for path in event.paths {
                    if is_watched(config, &path) {
                        debouncer.add(path);
                    }
                }
            }
            Ok(Err(e)) => log!("watch"; "error: {e}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                let changed = debouncer.take();
                log!("watch"; "{} path(s) changed, rebuilding...", changed.len());
                match build_site(config) {
                    Ok(()) => reload.notify(),
                    Err(e) => log!("error"; "rebuild failed: {e:#}"),
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // irrelevant events, timeouts with nothing pending
            _ => {}
        }
    }

    Ok(())
}
