//! Result reuse and background delivery for merge passes.
//!
//! A pass is a pure function of its input snapshot, so a snapshot that looks
//! unchanged (same record count and generation stamp) reuses the previous
//! result. Background passes publish whole reports on a watch channel and
//! are dropped if a newer snapshot was submitted while they ran.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::debug_log;
use crate::merge::merge_chats;
use crate::report::{FoldOptions, finish_report};
use crate::types::{ChatStats, Report};

/// Cheap identity of an input snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnapshotFingerprint {
    pub record_count: usize,
    pub generated_at: String,
}

impl SnapshotFingerprint {
    /// Reports without a generation stamp cannot be told apart cheaply and
    /// are never fingerprinted.
    pub fn of(report: &Report) -> Option<Self> {
        let generated_at = report.generated_at.as_deref()?.trim();
        if generated_at.is_empty() {
            return None;
        }
        Some(Self {
            record_count: report.chats.len(),
            generated_at: generated_at.to_string(),
        })
    }
}

/// Remembers the most recent pass.
#[derive(Default)]
pub struct MergeCache {
    last: Mutex<Option<(SnapshotFingerprint, Arc<Vec<ChatStats>>)>>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the report's chats, reusing the last result for an unchanged
    /// snapshot.
    pub fn merge(&self, report: &Report) -> Arc<Vec<ChatStats>> {
        let fingerprint = SnapshotFingerprint::of(report);

        if let Some(fingerprint) = &fingerprint
            && let Some(cached) = self.lookup(fingerprint)
        {
            debug_log::log("CACHE", "HIT", &fingerprint.generated_at);
            return cached;
        }

        let merged = Arc::new(merge_chats(&report.chats));
        if let Some(fingerprint) = fingerprint {
            debug_log::log("CACHE", "STORE", &fingerprint.generated_at);
            *self.last.lock() = Some((fingerprint, Arc::clone(&merged)));
        } else {
            debug_log::log("CACHE", "SKIP", "snapshot has no generation stamp");
        }
        merged
    }

    fn lookup(&self, fingerprint: &SnapshotFingerprint) -> Option<Arc<Vec<ChatStats>>> {
        match &*self.last.lock() {
            Some((cached, merged)) if cached == fingerprint => Some(Arc::clone(merged)),
            _ => None,
        }
    }
}

/// A completed pass as seen by subscribers.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub generation: u64,
    pub report: Arc<Report>,
}

struct DispatcherState {
    cache: MergeCache,
    options: FoldOptions,
    latest_generation: AtomicU64,
    /// Snapshot of the most recent submission still being merged.
    in_flight: Mutex<Option<(SnapshotFingerprint, u64)>>,
    update_tx: watch::Sender<Option<MergeOutcome>>,
}

/// Runs merge passes off the caller's task and publishes the newest result.
pub struct MergeDispatcher {
    state: Arc<DispatcherState>,
    update_rx: watch::Receiver<Option<MergeOutcome>>,
}

impl MergeDispatcher {
    pub fn new(options: FoldOptions) -> Self {
        let (update_tx, update_rx) = watch::channel(None);
        Self {
            state: Arc::new(DispatcherState {
                cache: MergeCache::new(),
                options,
                latest_generation: AtomicU64::new(0),
                in_flight: Mutex::new(None),
                update_tx,
            }),
            update_rx,
        }
    }

    pub fn get_update_receiver(&self) -> watch::Receiver<Option<MergeOutcome>> {
        self.update_rx.clone()
    }

    /// Generation of the most recent accepted submission.
    pub fn latest_generation(&self) -> u64 {
        self.state.latest_generation.load(Ordering::SeqCst)
    }

    /// Queue a pass over `report`.
    ///
    /// Returns `None` when the same snapshot is already being merged; its
    /// pending result will be published instead. Otherwise the handle
    /// resolves to whether the result was published (`false` when a newer
    /// submission superseded it).
    pub fn submit(&self, report: Report) -> Option<JoinHandle<bool>> {
        let fingerprint = SnapshotFingerprint::of(&report);

        let generation = {
            let mut in_flight = self.state.in_flight.lock();
            if let (Some(fingerprint), Some((pending, generation))) = (&fingerprint, &*in_flight)
                && pending == fingerprint
            {
                debug_log::log(
                    "DISPATCH",
                    "COALESCE",
                    &format!("generation {generation} already merging"),
                );
                return None;
            }

            let generation = self.state.latest_generation.fetch_add(1, Ordering::SeqCst) + 1;
            *in_flight = fingerprint.map(|fingerprint| (fingerprint, generation));
            generation
        };

        let state = Arc::clone(&self.state);
        Some(tokio::spawn(async move {
            let worker_state = Arc::clone(&state);
            let folded = tokio::task::spawn_blocking(move || {
                let chats = if worker_state.options.merge {
                    worker_state.cache.merge(&report).as_ref().clone()
                } else {
                    report.chats
                };
                finish_report(
                    chats,
                    report.generated_at,
                    report.filters,
                    worker_state.options.top,
                )
            })
            .await;

            {
                let mut in_flight = state.in_flight.lock();
                if matches!(&*in_flight, Some((_, pending)) if *pending == generation) {
                    *in_flight = None;
                }
            }

            let folded = match folded {
                Ok(folded) => folded,
                Err(e) => {
                    eprintln!("Merge pass failed: {e}");
                    return false;
                }
            };

            if state.latest_generation.load(Ordering::SeqCst) != generation {
                debug_log::log(
                    "DISPATCH",
                    "DISCARD",
                    &format!("generation {generation} superseded"),
                );
                return false;
            }

            debug_log::log("DISPATCH", "PUBLISH", &format!("generation {generation}"));
            state.update_tx.send_replace(Some(MergeOutcome {
                generation,
                report: Arc::new(folded),
            }));
            true
        }))
    }
}
