//! The exception recovery engine.
//!
//! Given a stored failure, the marker of the task it is propagating from,
//! and the frames of the present blocking call, [`RecoveryEngine::recover`]
//! produces a caller-specific copy:
//!
//! 1. structural copy of the stored failure (no aliasing, ever);
//! 2. throw-site frames filtered of internal machinery;
//! 3. one synthetic caller-context link, built from the marker's frames
//!    followed by the caller's frames, appended at the deepest unset cause
//!    slot — after any genuine cause set at throw time.
//!
//! `recover` never fails and never mutates its inputs. Degradations (engine
//! disabled, filter misconfigured, depth limit hit) fall back to a less
//! enriched but always valid result, recorded in the log collector.

use crate::config::RecoveryConfig;
use crate::exception::ExceptionValue;
use crate::filter::FrameFilter;
use crate::frame::Frame;
use crate::log::{LogCollector, LogEntry};
use crate::marker::CreationMarker;

/// Pure, concurrency-safe recovery of stored failures.
///
/// The engine holds only immutable configuration and a shared log collector;
/// calling [`recover`](Self::recover) concurrently against the same stored
/// failure is safe by construction.
#[derive(Debug)]
pub struct RecoveryEngine {
    filter: FrameFilter,
    config: RecoveryConfig,
    log: LogCollector,
}

impl RecoveryEngine {
    /// Creates an engine from the given configuration.
    #[must_use]
    pub fn new(config: RecoveryConfig) -> Self {
        let filter = FrameFilter::new().with_internal_prefixes(config.internal_prefixes.clone());
        Self {
            filter,
            config,
            log: LogCollector::new(),
        }
    }

    /// Replaces the log collector (shared with the host for draining).
    #[must_use]
    pub fn with_collector(mut self, log: LogCollector) -> Self {
        self.log = log;
        self
    }

    /// Returns the log collector.
    #[must_use]
    pub const fn collector(&self) -> &LogCollector {
        &self.log
    }

    /// Returns the frame filter.
    #[must_use]
    pub const fn filter(&self) -> &FrameFilter {
        &self.filter
    }

    /// Returns true if recovery enrichment is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Recovers a presentable exception for one await/join/receive call.
    ///
    /// Returns a fresh copy of `stored`; the original is left untouched for
    /// future callers. With `marker` absent or recovery disabled the result
    /// is the filtered copy alone, a degraded but valid outcome.
    #[must_use]
    pub fn recover(
        &self,
        stored: &ExceptionValue,
        marker: Option<&CreationMarker>,
        caller_frames: &[Frame],
    ) -> ExceptionValue {
        let mut copy = stored.clone();

        if let Err(error) = self.filter.validate() {
            // Masking the real failure is worse than losing the elision.
            self.log.record(
                LogEntry::warn("frame filter misconfigured; returning unfiltered copy")
                    .with_field("error", error.to_string()),
            );
            return copy;
        }
        copy.set_frames(self.filter.filter(copy.frames()));

        if !self.config.enabled {
            self.log
                .record(LogEntry::debug("recovery disabled; returning filtered copy"));
            return copy;
        }
        let Some(marker) = marker else {
            self.log.record(
                LogEntry::debug("no creation marker; returning filtered copy without context"),
            );
            return copy;
        };

        let mut synthetic_frames = marker.frames().to_vec();
        synthetic_frames.extend_from_slice(caller_frames);
        let synthetic_frames = self.filter.filter(&synthetic_frames);
        let link = ExceptionValue::caller_context(marker.label(), synthetic_frames);

        if !copy.append_cause(link, self.config.max_cause_depth) {
            self.log.record(
                LogEntry::warn("cause chain at depth limit; skipping caller context")
                    .with_field("max_cause_depth", self.config.max_cause_depth.to_string())
                    .with_field("task", marker.label().to_string()),
            );
        }
        copy
    }
}
