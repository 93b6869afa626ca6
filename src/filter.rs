//! Internal-frame elision with explicit placeholders.
//!
//! The frame filter classifies each frame as internal (scheduler, dispatcher,
//! engine machinery) or user code, based on qualified-name prefixes. Each
//! contiguous internal run is replaced by exactly one elision placeholder so
//! the reader can see that frames were removed without seeing their content.
//!
//! Filtering is a pure function over frame sequences:
//!
//! - relative order of surviving frames is preserved
//! - user frames are never removed, even adjacent to removed runs
//! - the result is stable under re-filtering (no double elision markers)

use crate::frame::Frame;
use core::fmt;

/// Error returned when the filter configuration is unusable.
///
/// The recovery engine treats this as a degradation signal and falls back to
/// an unfiltered copy rather than propagating a secondary failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// A configured prefix is empty and would classify every frame internal.
    EmptyPrefix,
}

impl fmt::Display for FilterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPrefix => write!(f, "internal-namespace prefix must not be empty"),
        }
    }
}

impl std::error::Error for FilterError {}

/// Classifies frames as internal or user code and elides internal runs.
///
/// # Example
///
/// ```
/// use resurface::filter::FrameFilter;
/// use resurface::frame::Frame;
///
/// let filter = FrameFilter::new().with_internal_prefix("runtime::");
/// let frames = vec![
///     Frame::named("runtime::dispatch"),
///     Frame::named("app::handler"),
/// ];
/// let filtered = filter.filter(&frames);
/// assert!(filtered[0].is_elision_marker());
/// assert_eq!(filtered[1].qualified_name(), "app::handler");
/// ```
#[derive(Debug, Clone, Default)]
pub struct FrameFilter {
    /// Qualified-name prefixes treated as internal machinery.
    internal_prefixes: Vec<String>,
}

impl FrameFilter {
    /// Creates a filter with no internal prefixes (pass-through).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a filter that elides this crate's own machinery.
    #[must_use]
    pub fn engine_internals() -> Self {
        Self::new().with_internal_prefix("resurface::")
    }

    /// Adds one internal-namespace prefix.
    #[must_use]
    pub fn with_internal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.internal_prefixes.push(prefix.into());
        self
    }

    /// Sets the internal-namespace prefixes.
    #[must_use]
    pub fn with_internal_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.internal_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Returns the configured internal prefixes.
    #[must_use]
    pub fn internal_prefixes(&self) -> &[String] {
        &self.internal_prefixes
    }

    /// Returns true if no prefixes are configured (filtering is a no-op).
    #[must_use]
    pub fn is_pass_through(&self) -> bool {
        self.internal_prefixes.is_empty()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FilterError::EmptyPrefix`] if any configured prefix is empty.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.internal_prefixes.iter().any(String::is_empty) {
            return Err(FilterError::EmptyPrefix);
        }
        Ok(())
    }

    /// Returns true if the frame belongs to internal machinery.
    ///
    /// The elision placeholder is never classified internal, which is what
    /// makes filtering idempotent.
    #[must_use]
    pub fn is_internal(&self, frame: &Frame) -> bool {
        !frame.is_elision_marker()
            && self
                .internal_prefixes
                .iter()
                .any(|prefix| frame.qualified_name().starts_with(prefix.as_str()))
    }

    /// Elides internal runs, replacing each with one placeholder frame.
    ///
    /// Pure function: the input sequence is not modified.
    #[must_use]
    pub fn filter(&self, frames: &[Frame]) -> Vec<Frame> {
        if self.is_pass_through() {
            return frames.to_vec();
        }
        let mut out: Vec<Frame> = Vec::with_capacity(frames.len());
        for frame in frames {
            if self.is_internal(frame) || frame.is_elision_marker() {
                // One marker per run, even when the input already carries
                // markers next to raw internal frames.
                let last_is_marker = out.last().is_some_and(Frame::is_elision_marker);
                if !last_is_marker {
                    out.push(Frame::elided());
                }
            } else {
                out.push(frame.clone());
            }
        }
        out
    }
}
