//! Spawn/join integration harness.
//!
//! The scheduler proper is an external collaborator; this module is the
//! minimal integration that exercises the engine's two hooks end-to-end:
//!
//! - at spawn, [`Supervisor::spawn`] records a creation marker built from
//!   the spawner's transitive logical frames;
//! - at join, [`TaskHandle::join`] calls the engine exactly once per join
//!   invocation with the joiner's own context.
//!
//! Task bodies run on plain worker threads. A panicking body is caught and
//! converted into a stored failure rather than unwinding through the
//! harness. Completion slots follow first-failure-wins: a stored failure is
//! observable by any number of joins, while a success value is taken by the
//! first successful join.

use crate::config::RecoveryConfig;
use crate::context::CallContext;
use crate::exception::{ExceptionKind, ExceptionValue};
use crate::marker::MarkerStore;
use crate::recover::RecoveryEngine;
use core::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// A unique identifier for a spawned task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Allocates the next task ID.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw numeric identity.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

/// Liveness anchor for a task's marker store entry.
///
/// The task handle owns the only `Arc` of this token; the marker store
/// holds a `Weak`. Dropping the handle makes the entry reclaimable without
/// the store ever extending the task's lifetime.
#[derive(Debug)]
pub struct TaskToken {
    _private: (),
}

impl TaskToken {
    /// Creates a fresh token.
    #[must_use]
    pub const fn new() -> Self {
        Self { _private: () }
    }
}

impl Default for TaskToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Error returned when joining a spawned task fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinError {
    /// The task failed; this is the recovered copy for this join call.
    Failed(Box<ExceptionValue>),
    /// The task succeeded but its result was taken by an earlier join.
    ResultTaken,
}

impl JoinError {
    /// Returns the recovered exception, if the task failed.
    #[must_use]
    pub fn into_failure(self) -> Option<ExceptionValue> {
        match self {
            Self::Failed(exception) => Some(*exception),
            Self::ResultTaken => None,
        }
    }
}

impl fmt::Display for JoinError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(exception) => write!(f, "task failed: {exception}"),
            Self::ResultTaken => write!(f, "task result already taken"),
        }
    }
}

impl std::error::Error for JoinError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Failed(exception) => Some(exception.as_ref()),
            Self::ResultTaken => None,
        }
    }
}

#[derive(Debug)]
enum SlotState<T> {
    Running,
    Finished {
        value: Option<T>,
        failure: Option<ExceptionValue>,
    },
}

#[derive(Debug)]
struct CompletionSlot<T> {
    state: Mutex<SlotState<T>>,
    done: Condvar,
}

impl<T> CompletionSlot<T> {
    fn new() -> Self {
        Self {
            state: Mutex::new(SlotState::Running),
            done: Condvar::new(),
        }
    }

    fn complete(&self, value: T) {
        let mut state = self.state.lock().expect("completion slot lock poisoned");
        if matches!(*state, SlotState::Running) {
            *state = SlotState::Finished {
                value: Some(value),
                failure: None,
            };
        }
        drop(state);
        self.done.notify_all();
    }

    fn fail(&self, exception: ExceptionValue) {
        let mut state = self.state.lock().expect("completion slot lock poisoned");
        match &mut *state {
            SlotState::Running => {
                *state = SlotState::Finished {
                    value: None,
                    failure: Some(exception),
                };
            }
            // First failure wins; a later one joins the suppressed list.
            SlotState::Finished {
                failure: Some(stored),
                ..
            } => stored.absorb(exception),
            SlotState::Finished { failure: None, .. } => {}
        }
        drop(state);
        self.done.notify_all();
    }
}

/// Owns the marker store and recovery engine and spawns tasks against them.
#[derive(Debug, Clone)]
pub struct Supervisor {
    store: Arc<MarkerStore>,
    engine: Arc<RecoveryEngine>,
}

impl Supervisor {
    /// Creates a supervisor with a fresh store and engine for `config`.
    #[must_use]
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            store: Arc::new(MarkerStore::new(&config)),
            engine: Arc::new(RecoveryEngine::new(config)),
        }
    }

    /// Returns the marker store.
    #[must_use]
    pub fn store(&self) -> &Arc<MarkerStore> {
        &self.store
    }

    /// Returns the recovery engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<RecoveryEngine> {
        &self.engine
    }

    /// Spawns `body` on a worker thread under a fresh creation marker.
    ///
    /// The marker captures the spawner's full logical chain, so markers
    /// chain transitively through nested spawns. The body receives a child
    /// context carrying the marker.
    pub fn spawn<T, F>(&self, ctx: &CallContext, label: &str, body: F) -> TaskHandle<T>
    where
        T: Send + 'static,
        F: FnOnce(&CallContext) -> Result<T, ExceptionValue> + Send + 'static,
    {
        let id = TaskId::next();
        let token = Arc::new(TaskToken::new());
        let marker = self
            .store
            .record(id, &token, label, ctx.logical_frames());

        let slot = Arc::new(CompletionSlot::new());
        let body_slot = Arc::clone(&slot);
        let child_ctx = CallContext::under_marker(marker);
        let label_owned = label.to_string();

        std::thread::spawn(move || {
            let outcome = std::panic::catch_unwind(AssertUnwindSafe(|| body(&child_ctx)));
            match outcome {
                Ok(Ok(value)) => body_slot.complete(value),
                Ok(Err(exception)) => body_slot.fail(exception),
                Err(payload) => body_slot.fail(panic_failure(&label_owned, payload.as_ref())),
            }
        });

        TaskHandle {
            id,
            token,
            slot,
            store: Arc::clone(&self.store),
            engine: Arc::clone(&self.engine),
        }
    }
}

fn panic_failure(label: &str, payload: &(dyn std::any::Any + Send)) -> ExceptionValue {
    let message = payload.downcast_ref::<&str>().map_or_else(
        || {
            payload
                .downcast_ref::<String>()
                .cloned()
                .unwrap_or_else(|| format!("task '{label}' panicked"))
        },
        |message| (*message).to_string(),
    );
    ExceptionValue::new(ExceptionKind::PANIC, message)
}

/// A handle to a spawned task that can be used to await its result.
///
/// The handle anchors the task's marker store entry: once every handle is
/// dropped, the entry becomes reclaimable. Dropping the handle does not
/// stop the task.
#[derive(Debug)]
pub struct TaskHandle<T> {
    id: TaskId,
    token: Arc<TaskToken>,
    slot: Arc<CompletionSlot<T>>,
    store: Arc<MarkerStore>,
    engine: Arc<RecoveryEngine>,
}

impl<T> TaskHandle<T> {
    /// Returns the task ID.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.id
    }

    /// Returns true if the task has completed.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let state = self
            .slot
            .state
            .lock()
            .expect("completion slot lock poisoned");
        matches!(*state, SlotState::Finished { .. })
    }

    /// Waits for the task to complete and returns its result.
    ///
    /// Each join invocation recovers independently: the returned failure is
    /// a fresh copy enriched with this caller's own logical chain. The
    /// stored failure stays in the slot for any future join.
    ///
    /// # Errors
    ///
    /// - `JoinError::Failed(recovered)` if the task failed or panicked
    /// - `JoinError::ResultTaken` if the success value was already taken
    pub fn join(&self, ctx: &CallContext) -> Result<T, JoinError> {
        let claimed = {
            let mut state = self
                .slot
                .state
                .lock()
                .expect("completion slot lock poisoned");
            while matches!(*state, SlotState::Running) {
                state = self
                    .slot
                    .done
                    .wait(state)
                    .expect("completion slot lock poisoned");
            }
            Self::claim(&mut *state)
        };
        self.resolve(claimed, ctx)
    }

    /// Attempts to get the task's result without waiting.
    ///
    /// # Errors
    ///
    /// Same as [`join`](Self::join); `Ok(None)` means still running.
    pub fn try_join(&self, ctx: &CallContext) -> Result<Option<T>, JoinError> {
        let claimed = {
            let mut state = self
                .slot
                .state
                .lock()
                .expect("completion slot lock poisoned");
            if matches!(*state, SlotState::Running) {
                return Ok(None);
            }
            Self::claim(&mut *state)
        };
        self.resolve(claimed, ctx).map(Some)
    }

    /// Extracts the outcome under the slot lock. Failures are cloned out so
    /// recovery can run without the lock held.
    fn claim(state: &mut SlotState<T>) -> Claim<T> {
        match state {
            SlotState::Running => unreachable!("caller checked completion"),
            SlotState::Finished {
                failure: Some(stored),
                ..
            } => Claim::Failed(stored.clone()),
            SlotState::Finished { value, .. } => match value.take() {
                Some(value) => Claim::Value(value),
                None => Claim::Taken,
            },
        }
    }

    fn resolve(&self, claimed: Claim<T>, ctx: &CallContext) -> Result<T, JoinError> {
        match claimed {
            Claim::Value(value) => Ok(value),
            Claim::Taken => Err(JoinError::ResultTaken),
            Claim::Failed(stored) => {
                let marker = self.store.lookup(self.id);
                let recovered =
                    self.engine
                        .recover(&stored, marker.as_deref(), &ctx.logical_frames());
                Err(JoinError::Failed(Box::new(recovered)))
            }
        }
    }
}

/// Outcome extracted from a completion slot, pending recovery.
enum Claim<T> {
    Value(T),
    Taken,
    Failed(ExceptionValue),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn boom() -> ExceptionValue {
        ExceptionValue::new(ExceptionKind::from_static("app::Boom"), "exploded")
            .with_frame(Frame::named("app::worker_body"))
    }

    #[test]
    fn join_success() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let handle = supervisor.spawn(&ctx, "adder", |_| Ok(40 + 2));
        assert_eq!(handle.join(&ctx), Ok(42));
    }

    #[test]
    fn second_join_after_success_reports_taken() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let handle = supervisor.spawn(&ctx, "once", |_| Ok(1));
        assert_eq!(handle.join(&ctx), Ok(1));
        assert_eq!(handle.join(&ctx), Err(JoinError::ResultTaken));
    }

    #[test]
    fn join_failure_carries_spawn_and_join_sites() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let _spawn_guard = ctx.enter(Frame::named("app::spawn_site"));
        let handle = supervisor.spawn(&ctx, "worker", |_| Err::<(), _>(boom()));
        drop(_spawn_guard);

        let _join_guard = ctx.enter(Frame::named("app::join_site"));
        let err = handle.join(&ctx).expect_err("task failed");
        let Some(recovered) = err.into_failure() else {
            panic!("expected failure");
        };

        assert_eq!(recovered.kind().as_str(), "app::Boom");
        let link = recovered.cause().expect("synthetic link");
        let names: Vec<&str> = link.frames().iter().map(Frame::qualified_name).collect();
        assert_eq!(names, vec!["app::spawn_site", "app::join_site"]);
        assert!(link.message().contains("worker"));
    }

    #[test]
    fn repeated_joins_recover_independently() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let handle = supervisor.spawn(&ctx, "worker", |_| Err::<(), _>(boom()));

        let first = {
            let _guard = ctx.enter(Frame::named("app::first_join"));
            handle.join(&ctx).expect_err("failed").into_failure()
        }
        .expect("failure");
        let second = {
            let _guard = ctx.enter(Frame::named("app::second_join"));
            handle.join(&ctx).expect_err("failed").into_failure()
        }
        .expect("failure");

        assert_eq!(first.kind(), second.kind());
        assert_eq!(first.message(), second.message());
        assert_ne!(
            first.cause().expect("link").frames(),
            second.cause().expect("link").frames()
        );
    }

    #[test]
    fn concurrent_joins_recover_without_contention() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let handle = Arc::new(supervisor.spawn(&ctx, "worker", |_| Err::<(), _>(boom())));

        let mut joiners = Vec::new();
        for i in 0..4 {
            let handle = Arc::clone(&handle);
            joiners.push(std::thread::spawn(move || {
                let ctx = CallContext::root();
                let _guard = ctx.enter(Frame::named(format!("app::joiner_{i}")));
                handle
                    .join(&ctx)
                    .expect_err("failed")
                    .into_failure()
                    .expect("failure")
            }));
        }

        let recovered: Vec<ExceptionValue> = joiners
            .into_iter()
            .map(|joiner| joiner.join().expect("joiner panicked"))
            .collect();
        for failure in &recovered {
            assert_eq!(failure.kind().as_str(), "app::Boom");
        }
        // Each joiner's synthetic link carries its own frames.
        let links: Vec<_> = recovered
            .iter()
            .map(|failure| failure.cause().expect("link").frames())
            .collect();
        for (i, frames) in links.iter().enumerate() {
            for (j, other) in links.iter().enumerate() {
                if i != j {
                    assert_ne!(frames, other);
                }
            }
        }
    }

    #[test]
    fn panic_is_contained_as_stored_failure() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let handle = supervisor.spawn(&ctx, "panicky", |_| -> Result<(), ExceptionValue> {
            panic!("boom");
        });

        let err = handle.join(&ctx).expect_err("panicked");
        let recovered = err.into_failure().expect("failure");
        assert_eq!(*recovered.kind(), ExceptionKind::PANIC);
        assert!(recovered.message().contains("boom"));
    }

    #[test]
    fn nested_spawn_chains_markers_transitively() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let _guard = ctx.enter(Frame::named("app::outer_spawn_site"));

        let inner_supervisor = supervisor.clone();
        let handle = supervisor.spawn(&ctx, "outer", move |outer_ctx| {
            let _guard = outer_ctx.enter(Frame::named("app::inner_spawn_site"));
            let inner = inner_supervisor.spawn(outer_ctx, "inner", |_| Err::<(), _>(boom()));
            inner
                .join(outer_ctx)
                .map_err(|err| err.into_failure().expect("inner task failed"))
        });

        let err = handle.join(&ctx).expect_err("failed");
        let recovered = err.into_failure().expect("failure");
        // The inner task's synthetic link names both spawn sites, in order.
        let report = recovered.render();
        let outer = report.find("app::outer_spawn_site").expect("outer site");
        let inner = report.find("app::inner_spawn_site").expect("inner site");
        assert!(outer < inner, "outer spawn site renders before inner: {report}");
    }

    #[test]
    fn dropping_handle_releases_marker() {
        let supervisor = Supervisor::new(RecoveryConfig::default());
        let ctx = CallContext::root();
        let handle = supervisor.spawn(&ctx, "short", |_| Ok(()));
        let id = handle.task_id();
        let _ = handle.join(&ctx);
        assert!(supervisor.store().lookup(id).is_some());
        drop(handle);
        assert!(supervisor.store().lookup(id).is_none());
    }

    #[test]
    fn disabled_recovery_still_reports_original() {
        let supervisor = Supervisor::new(RecoveryConfig::disabled());
        let ctx = CallContext::root();
        let handle = supervisor.spawn(&ctx, "worker", |_| Err::<(), _>(boom()));

        let err = handle.join(&ctx).expect_err("failed");
        let recovered = err.into_failure().expect("failure");
        assert_eq!(recovered.kind().as_str(), "app::Boom");
        assert_eq!(recovered.message(), "exploded");
        assert!(recovered.cause().is_none());
    }
}
