//! Configuration error types.

use std::io;

use thiserror::Error;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config file at {path}: {source}")]
    Read {
        /// Path of the unreadable file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A config source is not valid TOML, or does not fit the schema.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        /// Which source failed, a file path or `<embedded defaults>`.
        path: String,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A config file exceeds the size cap.
    #[error("config file at {path} is {size} bytes, over the {limit} byte limit")]
    Oversized {
        /// Path of the rejected file.
        path: String,
        /// Actual size in bytes.
        size: usize,
        /// The cap it exceeded.
        limit: usize,
    },

    /// A value is outside its accepted range.
    #[error("invalid config field '{field}': {message}")]
    Validation {
        /// Dotted path of the offending field, e.g. `notify.max_attempts`.
        field: String,
        /// What is wrong with it.
        message: String,
    },
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
