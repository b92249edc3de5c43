//! # Report Error Types
//!
//! Failures of the report binary. The engine itself has no fatal
//! conditions; everything here happens at the edges (files, config, flags).
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │  Configuration  │  │     Input       │  │      Engine             │ │
//! │  │                 │  │                 │  │                         │ │
//! │  │  InvalidConfig  │  │  Io             │  │  Core (CoreError)       │ │
//! │  │  ConfigParse    │  │  Json           │  │                         │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use repairdesk_core::CoreError;
use thiserror::Error;

/// Result type alias for report operations.
pub type ReportResult<T> = Result<T, ReportError>;

#[derive(Debug, Error)]
pub enum ReportError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// A configuration value is out of range or unknown.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The TOML file did not parse.
    #[error("Failed to parse config file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    // =========================================================================
    // Input Errors
    // =========================================================================
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot file is not valid JSON, or the report failed to serialize.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // =========================================================================
    // Engine Errors
    // =========================================================================
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ReportError {
    /// Process exit code: 2 for bad configuration or flags, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        match self {
            ReportError::InvalidConfig(_) | ReportError::ConfigParse(_) => 2,
            ReportError::Core(CoreError::UnknownPreset(_))
            | ReportError::Core(CoreError::InvalidDateRange { .. }) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_conversion() {
        let err: ReportError = CoreError::UnknownPreset("fortnight".to_string()).into();
        assert_eq!(err.to_string(), "Unknown date range preset: 'fortnight'");
        assert_eq!(err.exit_code(), 2);

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "snapshot.json");
        let err: ReportError = io.into();
        assert_eq!(err.exit_code(), 1);
    }
}
