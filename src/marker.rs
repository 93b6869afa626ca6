//! Creation marker store keyed by task identity.
//!
//! A [`CreationMarker`] is the lightweight context captured when a task is
//! spawned (or re-captured at a genuine suspension boundary): the spawner's
//! logical frames plus a display label. Markers are immutable after capture
//! and `Arc`-shared; the engine references them, never copies them.
//!
//! The [`MarkerStore`] is process-wide state with an explicit lifecycle:
//! entries hold a `Weak` liveness token owned by the task handle, so a
//! marker is reclaimable exactly when its task handle becomes unreachable.
//! Dead entries are purged opportunistically during `record`; a recovery
//! call never triggers deletion, so a marker stays valid for anyone still
//! holding the task handle.
//!
//! The map is sharded to keep concurrent `record`/`lookup` from locking out
//! unrelated tasks.

use crate::config::RecoveryConfig;
use crate::frame::Frame;
use crate::task::{TaskId, TaskToken};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Number of independently locked shards.
const SHARD_COUNT: usize = 8;

/// How many records between opportunistic dead-entry purges, per shard.
const PURGE_INTERVAL: usize = 64;

/// Context captured at task creation: frames and a display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreationMarker {
    captured: Vec<Frame>,
    label: String,
}

impl CreationMarker {
    /// Creates a marker from a label and the spawner's logical frames.
    #[must_use]
    pub fn new(label: impl Into<String>, captured: Vec<Frame>) -> Self {
        Self {
            captured,
            label: label.into(),
        }
    }

    /// Returns the captured frames, spawn site outermost.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.captured
    }

    /// Returns the task's display label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// One entry: the marker plus the liveness of its task handle.
#[derive(Debug)]
struct MarkerEntry {
    marker: Arc<CreationMarker>,
    liveness: Weak<TaskToken>,
}

impl MarkerEntry {
    fn is_live(&self) -> bool {
        self.liveness.strong_count() > 0
    }
}

#[derive(Debug, Default)]
struct Shard {
    entries: RwLock<HashMap<TaskId, MarkerEntry>>,
    record_count: AtomicUsize,
}

/// Process-wide weak mapping from task identity to creation marker.
#[derive(Debug)]
pub struct MarkerStore {
    shards: [Shard; SHARD_COUNT],
    enabled: bool,
    max_marker_frames: usize,
}

impl MarkerStore {
    /// Creates a store from the recovery configuration.
    ///
    /// When recovery is disabled, `record` is a no-op and `lookup` always
    /// returns `None`; later recovery degrades instead of failing.
    #[must_use]
    pub fn new(config: &RecoveryConfig) -> Self {
        Self {
            shards: std::array::from_fn(|_| Shard::default()),
            enabled: config.enabled,
            max_marker_frames: config.max_marker_frames,
        }
    }

    /// Returns true if marker capture is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Captures a marker for `task` from the caller's logical frames.
    ///
    /// Recording again for the same task (a suspension boundary re-capture)
    /// replaces the previous marker; the last capture wins. Returns the
    /// stored marker, or `None` when capture is disabled.
    pub fn record(
        &self,
        task: TaskId,
        token: &Arc<TaskToken>,
        label: &str,
        mut frames: Vec<Frame>,
    ) -> Option<Arc<CreationMarker>> {
        if !self.enabled {
            return None;
        }
        if frames.len() > self.max_marker_frames {
            // Keep the innermost frames; the spawn site outranks distant roots.
            frames.drain(..frames.len() - self.max_marker_frames);
        }
        let marker = Arc::new(CreationMarker::new(label, frames));
        let shard = self.shard_for(task);
        {
            let mut entries = shard.entries.write().expect("marker store lock poisoned");
            entries.insert(
                task,
                MarkerEntry {
                    marker: Arc::clone(&marker),
                    liveness: Arc::downgrade(token),
                },
            );
        }
        if shard.record_count.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL
            == PURGE_INTERVAL - 1
        {
            Self::purge(shard);
        }
        Some(marker)
    }

    /// Looks up the marker for `task`.
    ///
    /// Returns `None` if the task was never registered, capture is disabled,
    /// or the task handle has been dropped.
    #[must_use]
    pub fn lookup(&self, task: TaskId) -> Option<Arc<CreationMarker>> {
        let shard = self.shard_for(task);
        let entries = shard.entries.read().expect("marker store lock poisoned");
        entries
            .get(&task)
            .filter(|entry| entry.is_live())
            .map(|entry| Arc::clone(&entry.marker))
    }

    /// Returns the number of live entries across all shards.
    #[must_use]
    pub fn live_len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| {
                shard
                    .entries
                    .read()
                    .expect("marker store lock poisoned")
                    .values()
                    .filter(|entry| entry.is_live())
                    .count()
            })
            .sum()
    }

    /// Returns true if no live entries remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live_len() == 0
    }

    fn shard_for(&self, task: TaskId) -> &Shard {
        let index = usize::try_from(task.raw()).unwrap_or(usize::MAX) % SHARD_COUNT;
        &self.shards[index]
    }

    fn purge(shard: &Shard) {
        let mut entries = shard.entries.write().expect("marker store lock poisoned");
        entries.retain(|_, entry| entry.is_live());
    }
}
