//! Failure propagation from closed channels.
//!
//! A channel closed with a failure holds exactly one stored failure, set at
//! close time under first-failure-wins semantics and never altered by later
//! receive attempts. Every receive that observes the closed-with-failure
//! state recovers independently, using that receiver's own call-site
//! context — not the closer's — so two receivers (or the same receiver
//! twice) each get their own recovered exception.
//!
//! The recovery path does not distinguish "closed before the receiver ever
//! waited" from "closed while a receiver was waiting"; both take the same
//! branch.
//!
//! Values buffered before the failure close are still delivered first.

use crate::context::CallContext;
use crate::exception::ExceptionValue;
use crate::recover::RecoveryEngine;
use core::fmt;
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};

/// Error returned when sending fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendError<T> {
    /// The channel was closed before the value could be sent.
    Closed(T),
}

impl<T> fmt::Display for SendError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed(_) => write!(f, "sending on a closed channel"),
        }
    }
}

impl<T: fmt::Debug> std::error::Error for SendError<T> {}

/// Error returned when a blocking receive fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvError {
    /// The channel closed cleanly and the buffer is drained.
    Closed,
    /// The channel closed with a failure; this is the recovered copy,
    /// specific to this receive call.
    Failed(Box<ExceptionValue>),
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "receiving on a closed channel"),
            Self::Failed(exception) => write!(f, "channel closed with failure: {exception}"),
        }
    }
}

impl std::error::Error for RecvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Closed => None,
            Self::Failed(exception) => Some(exception.as_ref()),
        }
    }
}

/// Error returned when a non-blocking receive fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TryRecvError {
    /// No value available yet, but the channel is still open.
    Empty,
    /// The channel closed cleanly and the buffer is drained.
    Closed,
    /// The channel closed with a failure; recovered for this call.
    Failed(Box<ExceptionValue>),
}

impl fmt::Display for TryRecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "channel is empty"),
            Self::Closed => write!(f, "channel is closed"),
            Self::Failed(exception) => write!(f, "channel closed with failure: {exception}"),
        }
    }
}

impl std::error::Error for TryRecvError {}

#[derive(Debug)]
struct ChannelInner<T> {
    queue: VecDeque<T>,
    /// Live `Sender` clones. Zero with `closed` unset means clean close.
    senders: usize,
    /// Set by an explicit close or failure close.
    closed: bool,
    /// The stored failure, set at most once; later failures are absorbed.
    failure: Option<ExceptionValue>,
}

impl<T> ChannelInner<T> {
    fn is_closed(&self) -> bool {
        self.closed || self.senders == 0
    }
}

#[derive(Debug)]
struct Shared<T> {
    inner: Mutex<ChannelInner<T>>,
    ready: Condvar,
}

/// Creates an unbounded channel whose receiver recovers stored failures
/// through `engine`.
#[must_use]
pub fn channel<T>(engine: Arc<RecoveryEngine>) -> (Sender<T>, Receiver<T>) {
    let shared = Arc::new(Shared {
        inner: Mutex::new(ChannelInner {
            queue: VecDeque::new(),
            senders: 1,
            closed: false,
            failure: None,
        }),
        ready: Condvar::new(),
    });
    (
        Sender {
            shared: Arc::clone(&shared),
        },
        Receiver { shared, engine },
    )
}

/// The sending half of the channel. Cloneable.
#[derive(Debug)]
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Sender<T> {
    /// Sends a value.
    ///
    /// # Errors
    ///
    /// Returns `Err(SendError::Closed(value))` if the channel was closed.
    pub fn send(&self, value: T) -> Result<(), SendError<T>> {
        let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
        if inner.closed {
            return Err(SendError::Closed(value));
        }
        inner.queue.push_back(value);
        drop(inner);
        self.shared.ready.notify_one();
        Ok(())
    }

    /// Closes the channel cleanly. Buffered values remain receivable.
    pub fn close(&self) {
        let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
        inner.closed = true;
        drop(inner);
        self.shared.ready.notify_all();
    }

    /// Closes the channel with a failure.
    ///
    /// The first close wins: after a clean close the failure is discarded
    /// and receivers keep observing `Closed`; after a failure close the
    /// later failure is absorbed into the stored failure's suppressed list
    /// and never replaces it.
    pub fn close_with(&self, failure: ExceptionValue) {
        let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
        if inner.closed {
            if let Some(stored) = inner.failure.as_mut() {
                stored.absorb(failure);
            }
        } else {
            inner.closed = true;
            inner.failure = Some(failure);
        }
        drop(inner);
        self.shared.ready.notify_all();
    }

    /// Returns true if the channel has been closed, explicitly or by every
    /// sender dropping.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared
            .inner
            .lock()
            .expect("channel lock poisoned")
            .is_closed()
    }
}

impl<T> Clone for Sender<T> {
    fn clone(&self) -> Self {
        let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
        inner.senders += 1;
        drop(inner);
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> Drop for Sender<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
        inner.senders -= 1;
        let last = inner.senders == 0;
        drop(inner);
        if last {
            self.shared.ready.notify_all();
        }
    }
}

/// The receiving half of the channel.
///
/// Receive methods take `&self` so one receiver can be shared and called
/// from multiple call sites; each call recovers independently.
#[derive(Debug)]
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
    engine: Arc<RecoveryEngine>,
}

impl<T> Receiver<T> {
    /// Receives a value, blocking until one arrives or the channel closes.
    ///
    /// # Errors
    ///
    /// - `RecvError::Closed` on clean close with the buffer drained
    /// - `RecvError::Failed(recovered)` if the channel closed with a
    ///   failure; the recovered copy reflects this call's own context
    pub fn recv(&self, ctx: &CallContext) -> Result<T, RecvError> {
        let stored = {
            let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
            loop {
                if let Some(value) = inner.queue.pop_front() {
                    return Ok(value);
                }
                if inner.is_closed() {
                    match &inner.failure {
                        Some(stored) => break stored.clone(),
                        None => return Err(RecvError::Closed),
                    }
                }
                inner = self
                    .shared
                    .ready
                    .wait(inner)
                    .expect("channel lock poisoned");
            }
        };
        // Recover outside the lock; the stored original stays in place for
        // every future receiver.
        Err(RecvError::Failed(Box::new(self.recover(&stored, ctx))))
    }

    /// Attempts to receive without blocking.
    ///
    /// # Errors
    ///
    /// - `TryRecvError::Empty` if no value is available yet
    /// - `TryRecvError::Closed` on clean close with the buffer drained
    /// - `TryRecvError::Failed(recovered)` on failure close
    pub fn try_recv(&self, ctx: &CallContext) -> Result<T, TryRecvError> {
        let stored = {
            let mut inner = self.shared.inner.lock().expect("channel lock poisoned");
            if let Some(value) = inner.queue.pop_front() {
                return Ok(value);
            }
            if !inner.is_closed() {
                return Err(TryRecvError::Empty);
            }
            match &inner.failure {
                Some(stored) => stored.clone(),
                None => return Err(TryRecvError::Closed),
            }
        };
        Err(TryRecvError::Failed(Box::new(self.recover(&stored, ctx))))
    }

    /// Returns true if the channel has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared
            .inner
            .lock()
            .expect("channel lock poisoned")
            .is_closed()
    }

    fn recover(&self, stored: &ExceptionValue, ctx: &CallContext) -> ExceptionValue {
        let marker = ctx.marker().map(AsRef::as_ref);
        self.engine.recover(stored, marker, &ctx.entered_frames())
    }
}
