//! Shared error type across otelpush crates.

use thiserror::Error;

use crate::instrument::InstrumentKind;

/// Stable error codes (used as log fields and in operator-facing output).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Bad instrument use, e.g. a negative Counter delta.
    InvalidArgument,
    /// Instrument name already registered under another kind.
    DuplicateInstrument,
    /// Invalid configuration.
    Config,
    /// Operation not allowed in the current lifecycle state.
    InvalidState,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::DuplicateInstrument => "DUPLICATE_INSTRUMENT",
            ErrorCode::Config => "CONFIG",
            ErrorCode::InvalidState => "INVALID_STATE",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and runtime.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("duplicate instrument: {name} is already registered as {existing}, requested {requested}")]
    DuplicateInstrument {
        name: String,
        existing: InstrumentKind,
        requested: InstrumentKind,
    },
    #[error("invalid config: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map the error to a stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            MetricsError::DuplicateInstrument { .. } => ErrorCode::DuplicateInstrument,
            MetricsError::Config(_) => ErrorCode::Config,
            MetricsError::InvalidState(_) => ErrorCode::InvalidState,
            MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
