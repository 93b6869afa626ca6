//! Immutable exception values and rendering.
//!
//! [`ExceptionValue`] is the logical representation of a propagating failure:
//! kind, message, throw-site frames, an optional cause chain, and a suppressed
//! list. Values are logically immutable once thrown; `Clone` performs the
//! structural deep copy that the recovery engine relies on, so a recovered
//! copy never aliases the stored original.
//!
//! Rendering follows the host convention: `Display` gives the one-line
//! `kind: message` header and `std::error::Error::source` exposes the cause
//! chain, while [`ExceptionValue::render`] produces the full multi-line
//! report with frames, `Caused by:` sections, and suppressed failures.

use crate::frame::Frame;
use core::fmt;
use std::borrow::Cow;
use std::fmt::Write as _;

/// The kind of an exception, comparable and cheap to copy around.
///
/// Application kinds are arbitrary names. The single distinguished kind,
/// [`ExceptionKind::CALLER_CONTEXT`], is reserved for synthetic cause links
/// appended by the recovery engine and is never thrown by user code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExceptionKind(Cow<'static, str>);

impl ExceptionKind {
    /// Distinguished kind for synthetic recovered-caller-context links.
    pub const CALLER_CONTEXT: Self = Self(Cow::Borrowed("resurface::CallerContext"));

    /// Kind assigned to failures converted from caught panics.
    pub const PANIC: Self = Self(Cow::Borrowed("core::panic"));

    /// Creates a kind from an owned name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Creates a kind from a static name without allocating.
    #[must_use]
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// Returns the kind name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this is the synthetic caller-context kind.
    #[must_use]
    pub fn is_caller_context(&self) -> bool {
        *self == Self::CALLER_CONTEXT
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An immutable exception value.
///
/// The recovery engine never mutates a stored failure; every observer gets
/// its own structural copy. The only mutation this type offers is
/// [`absorb`](Self::absorb), which implements first-failure-wins by pushing
/// a later failure onto the suppressed list before the value is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionValue {
    kind: ExceptionKind,
    message: String,
    frames: Vec<Frame>,
    cause: Option<Box<ExceptionValue>>,
    suppressed: Vec<ExceptionValue>,
}

impl ExceptionValue {
    /// Creates an exception with the given kind and message.
    #[must_use]
    pub fn new(kind: ExceptionKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            frames: Vec::new(),
            cause: None,
            suppressed: Vec::new(),
        }
    }

    /// Creates a synthetic caller-context link for a recovered exception.
    ///
    /// Used only by the recovery engine; the kind is the distinguished
    /// [`ExceptionKind::CALLER_CONTEXT`].
    #[must_use]
    pub fn caller_context(label: &str, frames: Vec<Frame>) -> Self {
        Self {
            kind: ExceptionKind::CALLER_CONTEXT,
            message: format!("logical caller of '{label}'"),
            frames,
            cause: None,
            suppressed: Vec::new(),
        }
    }

    /// Sets the throw-site frames.
    #[must_use]
    pub fn with_frames(mut self, frames: Vec<Frame>) -> Self {
        self.frames = frames;
        self
    }

    /// Appends one throw-site frame.
    #[must_use]
    pub fn with_frame(mut self, frame: Frame) -> Self {
        self.frames.push(frame);
        self
    }

    /// Sets a genuine application-level cause.
    #[must_use]
    pub fn with_cause(mut self, cause: ExceptionValue) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// Returns the kind.
    #[must_use]
    pub const fn kind(&self) -> &ExceptionKind {
        &self.kind
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the throw-site frames.
    #[must_use]
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns the direct cause, if any.
    #[must_use]
    pub fn cause(&self) -> Option<&ExceptionValue> {
        self.cause.as_deref()
    }

    /// Returns the suppressed failures.
    #[must_use]
    pub fn suppressed(&self) -> &[ExceptionValue] {
        &self.suppressed
    }

    /// Absorbs a later failure under first-failure-wins semantics.
    ///
    /// The later failure joins the suppressed list; it never replaces this
    /// value.
    pub fn absorb(&mut self, later: ExceptionValue) {
        self.suppressed.push(later);
    }

    /// Returns the cause chain from this value down, self included.
    #[must_use]
    pub fn cause_chain(&self) -> Vec<&ExceptionValue> {
        let mut chain = Vec::new();
        let mut current = Some(self);
        while let Some(value) = current {
            chain.push(value);
            current = value.cause();
        }
        chain
    }

    /// Replaces the throw-site frames (engine use, applied to copies only).
    pub(crate) fn set_frames(&mut self, frames: Vec<Frame>) {
        self.frames = frames;
    }

    /// Appends a link at the deepest unset cause slot.
    ///
    /// A genuine cause set at throw time stays ahead of the appended link.
    /// Returns false without modifying anything if the existing chain is
    /// already `max_depth` links long.
    pub(crate) fn append_cause(&mut self, link: ExceptionValue, max_depth: usize) -> bool {
        if max_depth <= 1 {
            return false;
        }
        match self.cause.as_mut() {
            Some(next) => next.append_cause(link, max_depth - 1),
            None => {
                self.cause = Some(Box::new(link));
                true
            }
        }
    }

    /// Renders the full report: header, frames, cause chain, suppressed.
    ///
    /// The original failure comes first; each synthetic caller-context link
    /// follows as a `Caused by:` section with its own frames. Elided regions
    /// appear as explicit placeholder lines.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0, false);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize, caused_by: bool) {
        let pad = "    ".repeat(indent);
        if caused_by {
            let _ = writeln!(out, "{pad}Caused by: {self}");
        } else {
            let _ = writeln!(out, "{pad}{self}");
        }
        for frame in &self.frames {
            let _ = writeln!(out, "{pad}    {frame}");
        }
        for suppressed in &self.suppressed {
            let _ = writeln!(out, "{pad}    Suppressed: {suppressed}");
            for frame in suppressed.frames() {
                let _ = writeln!(out, "{pad}        {frame}");
            }
        }
        if let Some(cause) = self.cause() {
            cause.render_into(out, indent, true);
        }
    }
}

impl fmt::Display for ExceptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for ExceptionValue {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause().map(|cause| cause as &(dyn std::error::Error + 'static))
    }
}
