use anyhow::{Context, Result};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_types::event::{Event, EventKind};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::cache::MergeDispatcher;
use crate::debug_log;
use crate::report::{FoldOptions, parse_report};
use crate::utils::{fast_hash, warn_once};

#[derive(Debug, Clone)]
pub enum WatcherEvent {
    /// The report file was created or modified
    ReportChanged(PathBuf),
    /// The report file was deleted
    ReportRemoved(PathBuf),
    /// An error occurred
    Error(String),
}

pub struct ReportWatcher {
    _watcher: RecommendedWatcher,
    event_rx: UnboundedReceiver<WatcherEvent>,
}

impl ReportWatcher {
    /// Watch the directory holding `report_path` and forward events that
    /// concern the report file itself.
    pub fn new(report_path: &Path) -> Result<Self> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let target = report_path.to_path_buf();
        let watched_dir = report_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));

        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => handle_fs_event(event, &event_tx, &target),
                Err(e) => {
                    let _ = event_tx.send(WatcherEvent::Error(format!("Watch error: {e}")));
                }
            })?;

        watcher
            .watch(&watched_dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("Could not watch directory {}", watched_dir.display()))?;

        Ok(Self {
            _watcher: watcher,
            event_rx,
        })
    }

    pub async fn recv(&mut self) -> Option<WatcherEvent> {
        self.event_rx.recv().await
    }
}

fn handle_fs_event(event: Event, tx: &UnboundedSender<WatcherEvent>, target: &Path) {
    let wrap: fn(PathBuf) -> WatcherEvent = match event.kind {
        EventKind::Create(_) | EventKind::Modify(_) => WatcherEvent::ReportChanged,
        EventKind::Remove(_) => WatcherEvent::ReportRemoved,
        _ => return,
    };

    for path in &event.paths {
        if is_watched_report(path, target) {
            let _ = tx.send(wrap(path.clone()));
        }
    }
}

/// Editors and extractors often replace files by rename, so events are
/// matched by file name within the watched directory.
fn is_watched_report(path: &Path, target: &Path) -> bool {
    path == target || (path.file_name().is_some() && path.file_name() == target.file_name())
}

/// Keeps one report file merged as it changes on disk.
pub struct WatchSession {
    input: PathBuf,
    dispatcher: MergeDispatcher,
    last_hash: Option<u64>,
}

impl WatchSession {
    pub fn new(input: PathBuf, options: FoldOptions) -> Self {
        Self {
            input,
            dispatcher: MergeDispatcher::new(options),
            last_hash: None,
        }
    }

    pub fn dispatcher(&self) -> &MergeDispatcher {
        &self.dispatcher
    }

    /// Re-read the report and queue a merge pass if its content changed.
    /// Returns whether a new pass was queued.
    pub async fn refresh(&mut self) -> Result<bool> {
        let mut bytes = tokio::fs::read(&self.input)
            .await
            .with_context(|| format!("Failed to read {}", self.input.display()))?;

        let hash = fast_hash(&bytes);
        if self.last_hash == Some(hash) {
            debug_log::log("WATCH", "UNCHANGED", &self.input.display().to_string());
            return Ok(false);
        }

        let report = parse_report(&mut bytes)
            .with_context(|| format!("Failed to load {}", self.input.display()))?;
        self.last_hash = Some(hash);

        Ok(self.dispatcher.submit(report).is_some())
    }

    pub async fn handle_watcher_event(&mut self, event: WatcherEvent) -> Result<()> {
        match event {
            WatcherEvent::ReportChanged(path) => {
                debug_log::log("WATCH", "CHANGED", &path.display().to_string());
                if let Err(e) = self.refresh().await {
                    // Partially written files fail to parse; the next write
                    // event retries.
                    eprintln!("Skipping update: {e:#}");
                }
            }
            WatcherEvent::ReportRemoved(path) => {
                warn_once(format!(
                    "Report {} was removed; waiting for it to reappear",
                    path.display()
                ));
                self.last_hash = None;
            }
            WatcherEvent::Error(err) => {
                eprintln!("File watcher error: {err}");
            }
        }

        Ok(())
    }
}
