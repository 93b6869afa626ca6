//! Logical call-chain tracking across call boundaries.
//!
//! Continuation-passing runtimes cannot rely on the physical stack to name
//! their logical callers, so the chain is recorded explicitly: each logical
//! call boundary pushes a [`Frame`] through an RAII guard, and each spawned
//! task inherits its spawner's full chain through its creation marker.
//!
//! That inheritance is what makes marker chaining transitive: a context's
//! [`logical_frames`](CallContext::logical_frames) starts with the frames of
//! the marker it was created under, so a deep graph of awaits is fully
//! represented rather than truncated to one hop.
//!
//! A `CallContext` is pure data plus a mutex; it is thread-agnostic and
//! stays valid when a task resumes on a different worker thread.

use crate::frame::Frame;
use crate::marker::CreationMarker;
use std::sync::{Arc, Mutex};

/// The current logical caller chain at one point of execution.
#[derive(Debug, Default)]
pub struct CallContext {
    /// Marker of the task this context runs under, if any.
    marker: Option<Arc<CreationMarker>>,
    /// Frames entered since the task body started, innermost last.
    frames: Mutex<Vec<Frame>>,
}

impl CallContext {
    /// Creates a root context with no inherited marker.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Creates a context for a task body running under `marker`.
    ///
    /// `None` means the task was spawned with recovery disabled; recovery
    /// from this context degrades to filtered-copy-only.
    #[must_use]
    pub fn under_marker(marker: Option<Arc<CreationMarker>>) -> Self {
        Self {
            marker,
            frames: Mutex::new(Vec::new()),
        }
    }

    /// Pushes a frame for a logical call boundary.
    ///
    /// The frame is popped when the returned guard drops; guards must be
    /// dropped in LIFO order, which scoped usage gives for free.
    #[must_use]
    pub fn enter(&self, frame: Frame) -> FrameGuard<'_> {
        self.frames
            .lock()
            .expect("call context lock poisoned")
            .push(frame);
        FrameGuard { context: self }
    }

    /// Returns the frames entered in this context, outermost first.
    #[must_use]
    pub fn entered_frames(&self) -> Vec<Frame> {
        self.frames
            .lock()
            .expect("call context lock poisoned")
            .clone()
    }

    /// Returns the full logical chain: inherited marker frames, then the
    /// frames entered in this context.
    #[must_use]
    pub fn logical_frames(&self) -> Vec<Frame> {
        let mut frames = self
            .marker
            .as_ref()
            .map(|marker| marker.frames().to_vec())
            .unwrap_or_default();
        frames.extend(self.entered_frames());
        frames
    }

    /// Returns the marker this context runs under, if any.
    #[must_use]
    pub fn marker(&self) -> Option<&Arc<CreationMarker>> {
        self.marker.as_ref()
    }
}

/// RAII guard returned by [`CallContext::enter`]; pops its frame on drop.
#[derive(Debug)]
pub struct FrameGuard<'a> {
    context: &'a CallContext,
}

impl Drop for FrameGuard<'_> {
    fn drop(&mut self) {
        let mut frames = self
            .context
            .frames
            .lock()
            .expect("call context lock poisoned");
        let _ = frames.pop();
    }
}
