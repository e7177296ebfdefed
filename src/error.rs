use thiserror::Error;

/// Errors that can occur while building or running chassis button controls.
///
/// Per-control errors (`Config`, `HardwareAcquisition`, `DecodeMapping`,
/// `Publish`) are isolated: the offending control is skipped or the update is
/// dropped, and the rest of the service keeps running. Loop-level and
/// startup errors (`Reactor`, `Io`, `Json`) are fatal. Use [`Error::is_fatal`]
/// to make that decision.
#[derive(Error, Debug)]
pub enum Error {
    /// A control descriptor is malformed or misses a required field.
    #[error("{form_factor}: configuration error: {message}")]
    Config {
        /// Form factor of the control whose descriptor was rejected.
        form_factor: String,
        /// What was wrong with the descriptor.
        message: String,
    },
    /// A GPIO line could not be claimed (busy, missing, permission denied).
    #[error("{form_factor}: cannot acquire GPIO line {line}: {message}")]
    HardwareAcquisition {
        /// Form factor of the control that requested the line.
        form_factor: String,
        /// Kernel line number that failed.
        line: u32,
        /// Underlying reason reported by the line source.
        message: String,
    },
    /// A raw index has no entry in the position map, or maps out of range.
    #[error("{form_factor}: raw index {raw} has no valid position mapping")]
    DecodeMapping {
        /// Form factor of the control doing the lookup.
        form_factor: String,
        /// The unmapped raw index.
        raw: u32,
    },
    /// The event loop could not register a source or wait for readiness.
    #[error("event loop failure: {0}")]
    Reactor(String),
    /// The state sink refused an update.
    #[error("publish failed: {0}")]
    Publish(String),
    /// I/O error while reading configuration or line values.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns `true` when the error must stop the process rather than a
    /// single control.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Reactor(_) | Error::Io(_) | Error::Json(_))
    }

    /// Returns the form factor name attached to per-control errors.
    pub fn form_factor(&self) -> Option<&str> {
        match self {
            Error::Config { form_factor, .. }
            | Error::HardwareAcquisition { form_factor, .. }
            | Error::DecodeMapping { form_factor, .. } => Some(form_factor),
            _ => None,
        }
    }
}

/// Result type alias for chassis button operations.
pub type Result<T> = std::result::Result<T, Error>;

// Helpers for the errors raised from many places
pub(crate) fn config_error(form_factor: &str, message: impl Into<String>) -> Error {
    Error::Config {
        form_factor: form_factor.to_string(),
        message: message.into(),
    }
}

pub(crate) fn acquisition_error(form_factor: &str, line: u32, message: impl Into<String>) -> Error {
    Error::HardwareAcquisition {
        form_factor: form_factor.to_string(),
        line,
        message: message.into(),
    }
}
