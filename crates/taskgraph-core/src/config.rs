// taskgraph-core/src/config.rs
// ============================================================================
// Module: Taskgraph Engine Configuration
// Description: Strict, fail-closed TOML configuration for the engine.
// Purpose: Bound the knobs that affect checksum compatibility and report
//          rendering, without reaching for a process-wide global.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file or string with hard size and
//! range limits. Missing configuration falls back to [`EngineConfig::default`];
//! present-but-invalid configuration fails closed via [`ConfigError`] rather
//! than silently clamping out-of-range values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::core::CHECKSUM_SCHEME;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum configuration file size accepted by [`EngineConfig::load_from_path`].
pub const MAX_CONFIG_FILE_SIZE: u64 = 256 * 1024;
/// Minimum allowed gap width between report columns.
pub const MIN_REPORT_GAP_WIDTH: usize = 1;
/// Maximum allowed gap width between report columns.
pub const MAX_REPORT_GAP_WIDTH: usize = 16;
/// Minimum allowed task count per run.
pub const MIN_MAX_TASKS: usize = 1;
/// Maximum allowed task count per run, a hard safety ceiling rather than an
/// expected operating point.
pub const MAX_MAX_TASKS: usize = 100_000;

fn default_report_gap_width() -> usize {
    2
}

fn default_max_tasks() -> usize {
    10_000
}

fn default_checksum_scheme() -> String {
    CHECKSUM_SCHEME.to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(String),
    /// The configuration file exceeded [`MAX_CONFIG_FILE_SIZE`].
    #[error("config file exceeds maximum size of {MAX_CONFIG_FILE_SIZE} bytes")]
    TooLarge,
    /// The TOML body could not be parsed into [`EngineConfig`].
    #[error("failed to parse config: {0}")]
    Parse(String),
    /// A parsed value failed range or membership validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Top-level engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Canonicalization and hash scheme used for spec/resource checksums.
    /// Currently only `"jcs-sha256"` is supported; present so a future
    /// scheme migration has a versioned field to branch on.
    #[serde(default = "default_checksum_scheme")]
    pub checksum_scheme: String,
    /// Number of spaces between adjacent report columns.
    #[serde(default = "default_report_gap_width")]
    pub report_gap_width: usize,
    /// Whether `TaskState::to_map`/`column_string` render checksums by
    /// default when a caller doesn't specify otherwise.
    #[serde(default)]
    pub show_checksums_by_default: bool,
    /// Hard ceiling on the number of tasks a single `TaskSet` may hold.
    #[serde(default = "default_max_tasks")]
    pub max_tasks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            checksum_scheme: default_checksum_scheme(),
            report_gap_width: default_report_gap_width(),
            show_checksums_by_default: false,
            max_tasks: default_max_tasks(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML and
    /// [`ConfigError::Invalid`] when a parsed value fails validation.
    pub fn load_from_str(body: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(body).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates configuration from a file on disk, enforcing
    /// [`MAX_CONFIG_FILE_SIZE`] before parsing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::TooLarge`] if it exceeds the size limit, and the same
    /// parse/validation errors as [`EngineConfig::load_from_str`].
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let metadata = fs::metadata(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::TooLarge);
        }
        let body = fs::read_to_string(path).map_err(|err| ConfigError::Io(err.to_string()))?;
        Self::load_from_str(&body)
    }

    /// Validates that every field is within its documented bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first failing field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.checksum_scheme != CHECKSUM_SCHEME {
            return Err(ConfigError::Invalid(format!(
                "unsupported checksum_scheme '{}', expected '{CHECKSUM_SCHEME}'",
                self.checksum_scheme
            )));
        }
        if !(MIN_REPORT_GAP_WIDTH..=MAX_REPORT_GAP_WIDTH).contains(&self.report_gap_width) {
            return Err(ConfigError::Invalid(format!(
                "report_gap_width {} out of range [{MIN_REPORT_GAP_WIDTH}, {MAX_REPORT_GAP_WIDTH}]",
                self.report_gap_width
            )));
        }
        if !(MIN_MAX_TASKS..=MAX_MAX_TASKS).contains(&self.max_tasks) {
            return Err(ConfigError::Invalid(format!(
                "max_tasks {} out of range [{MIN_MAX_TASKS}, {MAX_MAX_TASKS}]",
                self.max_tasks
            )));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
