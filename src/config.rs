//! Recovery configuration and environment overrides.
//!
//! # Configuration Precedence
//!
//! Settings are resolved in this order (highest priority first):
//!
//! 1. **Programmatic** — values set via builder methods (`.disabled()`)
//! 2. **Environment variables** — values from `RESURFACE_*` env vars
//! 3. **Defaults** — built-in defaults from [`RecoveryConfig::default()`]
//!
//! # Supported Environment Variables
//!
//! | Variable | Type | Maps to |
//! |----------|------|---------|
//! | `RESURFACE_STACK_RECOVERY` | `bool` | `enabled` |
//! | `RESURFACE_MAX_CAUSE_DEPTH` | `usize` | `max_cause_depth` |
//! | `RESURFACE_MAX_MARKER_FRAMES` | `usize` | `max_marker_frames` |
//! | `RESURFACE_INTERNAL_PREFIXES` | comma list | `internal_prefixes` |

use core::fmt;

/// Environment variable for the recovery on/off switch.
pub const ENV_STACK_RECOVERY: &str = "RESURFACE_STACK_RECOVERY";
/// Environment variable for the maximum synthetic cause-chain depth.
pub const ENV_MAX_CAUSE_DEPTH: &str = "RESURFACE_MAX_CAUSE_DEPTH";
/// Environment variable for the maximum frames retained per marker.
pub const ENV_MAX_MARKER_FRAMES: &str = "RESURFACE_MAX_MARKER_FRAMES";
/// Environment variable for internal-namespace prefixes (comma separated).
pub const ENV_INTERNAL_PREFIXES: &str = "RESURFACE_INTERNAL_PREFIXES";

/// Error produced when a configuration value cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value of the wrong shape.
    InvalidValue {
        /// The variable that failed to parse.
        var: &'static str,
        /// The raw value found in the environment.
        value: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { var, value } => {
                write!(f, "invalid value for {var}: {value:?}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for the stack-trace recovery engine.
///
/// The single on/off switch is `enabled`: disabling it makes marker
/// recording a no-op and degrades recovery to filtered-copy-only; it never
/// causes a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Whether stack-trace recovery is active.
    pub enabled: bool,
    /// Maximum length of a cause chain after synthetic links are appended.
    pub max_cause_depth: usize,
    /// Maximum frames retained per creation marker (oldest dropped first).
    pub max_marker_frames: usize,
    /// Qualified-name prefixes elided by the frame filter.
    pub internal_prefixes: Vec<String>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_cause_depth: 32,
            max_marker_frames: 64,
            internal_prefixes: vec!["resurface::".to_string()],
        }
    }
}

impl RecoveryConfig {
    /// Creates the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with recovery switched off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Sets the on/off switch.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the maximum cause-chain depth.
    #[must_use]
    pub fn with_max_cause_depth(mut self, depth: usize) -> Self {
        self.max_cause_depth = depth;
        self
    }

    /// Sets the maximum frames retained per marker.
    #[must_use]
    pub fn with_max_marker_frames(mut self, frames: usize) -> Self {
        self.max_marker_frames = frames;
        self
    }

    /// Adds an internal-namespace prefix for the frame filter.
    #[must_use]
    pub fn with_internal_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.internal_prefixes.push(prefix.into());
        self
    }

    /// Builds a configuration from defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if a set variable holds an
    /// unparseable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        apply_env_overrides(&mut config)?;
        Ok(config)
    }
}

/// Applies `RESURFACE_*` environment overrides to a configuration.
///
/// Only variables that are set are applied.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] if a variable is set but holds an
/// unparseable value.
pub fn apply_env_overrides(config: &mut RecoveryConfig) -> Result<(), ConfigError> {
    apply_overrides_from(config, |var| std::env::var(var).ok())
}

/// Applies overrides read through `lookup`; the testable core of
/// [`apply_env_overrides`].
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] on an unparseable value.
pub fn apply_overrides_from<F>(
    config: &mut RecoveryConfig,
    lookup: F,
) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_STACK_RECOVERY) {
        config.enabled = parse_bool(ENV_STACK_RECOVERY, &value)?;
    }
    if let Some(value) = lookup(ENV_MAX_CAUSE_DEPTH) {
        config.max_cause_depth = parse_usize(ENV_MAX_CAUSE_DEPTH, &value)?;
    }
    if let Some(value) = lookup(ENV_MAX_MARKER_FRAMES) {
        config.max_marker_frames = parse_usize(ENV_MAX_MARKER_FRAMES, &value)?;
    }
    if let Some(value) = lookup(ENV_INTERNAL_PREFIXES) {
        config.internal_prefixes = value
            .split(',')
            .map(str::trim)
            .filter(|prefix| !prefix.is_empty())
            .map(str::to_string)
            .collect();
    }
    Ok(())
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_usize(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue {
            var,
            value: value.to_string(),
        })
}
