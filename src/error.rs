//! Error handling for the frequency meter
//!
//! This module defines the crate error type and a Result alias used by the
//! serial controller, configuration loader and filter scripting.

use thiserror::Error;

/// Main error type for freqmeter-rs operations
#[derive(Error, Debug)]
pub enum FreqMeterError {
    /// Errors raised by the serial port driver
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Connection state machine refused an operation
    #[error("Connection error: {0}")]
    Connection(String),

    /// Errors related to Rhai filter scripts
    #[error("Script error: {0}")]
    Script(String),

    /// Errors related to configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed TOML configuration
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<FreqMeterError>,
    },
}

impl FreqMeterError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        FreqMeterError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create a script error from a Rhai error
    pub fn from_rhai_error(err: Box<rhai::EvalAltResult>) -> Self {
        FreqMeterError::Script(err.to_string())
    }
}

/// Result type alias for freqmeter-rs operations
pub type Result<T> = std::result::Result<T, FreqMeterError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, Box<rhai::EvalAltResult>> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| FreqMeterError::from_rhai_error(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| FreqMeterError::from_rhai_error(e).with_context(f()))
    }
}
