//! Resurface: logical stack-trace recovery for suspending task runtimes.
//!
//! # Overview
//!
//! Cooperative task runtimes compile suspending code into continuation-passing
//! state machines. When a failure surfaces from a resumed task, the physical
//! stack shows only the scheduler frames at the resumption point; the chain of
//! logical callers that launched or awaited the task is gone. Resurface
//! reconstructs a readable, logically-ordered exception chain by combining:
//!
//! - the frames captured at the original throw site, and
//! - a synthetic "logical caller" trace rebuilt from markers recorded when
//!   tasks were spawned or when blocking join/receive calls were made.
//!
//! # Core Guarantees
//!
//! - **No aliasing**: recovery always works on a structural copy; the stored
//!   failure is never mutated, and independent awaiters never share state
//! - **First failure wins**: later failures are suppressed-list members,
//!   never replacements
//! - **Purely additive**: callers always receive at least the original kind
//!   and message; synthetic context is best-effort and degrades gracefully
//! - **Thread-agnostic**: markers are pure data (frames and labels), valid
//!   across suspension boundaries and thread hops
//!
//! # Module Structure
//!
//! - [`frame`]: Stack frame values and cheap call-site capture
//! - [`filter`]: Internal-frame elision with explicit placeholders
//! - [`exception`]: Immutable exception values and rendering
//! - [`context`]: Logical call-chain tracking across call boundaries
//! - [`marker`]: Creation marker store keyed by task identity
//! - [`recover`]: The exception recovery engine
//! - [`channel`]: Failure propagation from closed channels
//! - [`task`]: Spawn/join integration harness
//! - [`config`]: Recovery configuration and environment overrides
//! - [`log`]: Structured logging for degradation events

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]

pub mod channel;
pub mod config;
pub mod context;
pub mod exception;
pub mod filter;
pub mod frame;
pub mod log;
pub mod marker;
pub mod recover;
pub mod task;

pub use config::{ConfigError, RecoveryConfig};
pub use context::CallContext;
pub use exception::{ExceptionKind, ExceptionValue};
pub use filter::FrameFilter;
pub use frame::{Frame, SourceLocation};
pub use marker::{CreationMarker, MarkerStore};
pub use recover::RecoveryEngine;
pub use task::{JoinError, Supervisor, TaskHandle, TaskId};
