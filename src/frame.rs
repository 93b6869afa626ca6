//! Stack frame values and cheap call-site capture.
//!
//! A [`Frame`] is an immutable record of one logical call site: a qualified
//! name plus an optional source location. Frames are the currency of the
//! whole recovery pipeline: creation markers, caller chains, and recovered
//! exception traces are all ordered sequences of frames.
//!
//! Capture must stay cheap because it runs on every spawn. [`Frame::here`]
//! uses `#[track_caller]` so the location is resolved at compile time; no
//! backtrace is ever materialized.

use core::fmt;
use std::panic::Location;

/// Qualified name used for the elision placeholder frame.
///
/// Rendered verbatim so a reader can see that internal frames were removed
/// without seeing their content.
pub const ELIDED_FRAME_NAME: &str = "[... internal frames elided ...]";

/// A source file and line pair attached to a frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    /// Source file path as reported by the compiler.
    file: String,
    /// 1-based line number.
    line: u32,
}

impl SourceLocation {
    /// Creates a source location from a file path and line number.
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Returns the source file path.
    #[must_use]
    pub fn file(&self) -> &str {
        &self.file
    }

    /// Returns the 1-based line number.
    #[must_use]
    pub const fn line(&self) -> u32 {
        self.line
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One logical stack frame: a qualified name plus an optional location.
///
/// Frames are immutable values. Equality is structural, which lets tests
/// compare filtered sequences directly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    qualified_name: String,
    location: Option<SourceLocation>,
}

impl Frame {
    /// Creates a frame with a qualified name and no source location.
    #[must_use]
    pub fn named(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            location: None,
        }
    }

    /// Creates a frame with an explicit source location.
    #[must_use]
    pub fn with_location(qualified_name: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            location: Some(location),
        }
    }

    /// Creates a frame for the current call site.
    ///
    /// The location comes from `#[track_caller]`, so this is a constant-cost
    /// capture suitable for the spawn hot path.
    #[must_use]
    #[track_caller]
    pub fn here(qualified_name: impl Into<String>) -> Self {
        let caller = Location::caller();
        Self {
            qualified_name: qualified_name.into(),
            location: Some(SourceLocation::new(caller.file(), caller.line())),
        }
    }

    /// Creates the elision placeholder frame.
    ///
    /// The frame filter inserts one of these wherever a contiguous run of
    /// internal frames was removed.
    #[must_use]
    pub fn elided() -> Self {
        Self {
            qualified_name: ELIDED_FRAME_NAME.to_string(),
            location: None,
        }
    }

    /// Returns true if this is the elision placeholder frame.
    #[must_use]
    pub fn is_elision_marker(&self) -> bool {
        self.qualified_name == ELIDED_FRAME_NAME
    }

    /// Returns the qualified name of the call site.
    #[must_use]
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Returns the source location, if one was captured.
    #[must_use]
    pub const fn location(&self) -> Option<&SourceLocation> {
        self.location.as_ref()
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_elision_marker() {
            return write!(f, "{}", self.qualified_name);
        }
        match &self.location {
            Some(location) => write!(f, "at {} ({location})", self.qualified_name),
            None => write!(f, "at {}", self.qualified_name),
        }
    }
}
