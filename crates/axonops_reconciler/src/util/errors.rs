use std::fmt;
use thiserror::Error;

use crate::controllers::scheduled_repair::PlanReport;

#[derive(Error, Debug)]
pub enum StdError {
    #[error("TransportError: {url} returned HTTP {status}")]
    TransportError { url: String, status: u16 },

    #[error("HttpError: {0}")]
    HttpError(String),

    #[error("RemoteStateError: {0}")]
    RemoteStateError(String),

    #[error("ConflictError: dashboard '{0}' already exists, use overwrite to replace it")]
    ConflictError(String),

    #[error("InvalidEnumValue: invalid {field} '{value}', choose one of: {}", .choices.join(", "))]
    InvalidEnumValue {
        field: &'static str,
        value: String,
        choices: Vec<&'static str>,
    },

    #[error("ValidationError: {0}")]
    ValidationError(String),

    #[error("JsonSerializationError: {0}")]
    JsonSerializationError(#[source] serde_json::Error),

    #[error("IoError: {0}")]
    IoError(#[source] std::io::Error),
}

impl StdError {
    /// Short snake_case label for structured output.
    pub fn kind_label(&self) -> &'static str {
        match self {
            StdError::TransportError { .. } => "transport_error",
            StdError::HttpError(_) => "http_error",
            StdError::RemoteStateError(_) => "remote_state_error",
            StdError::ConflictError(_) => "conflict_error",
            StdError::InvalidEnumValue { .. } => "invalid_enum_value",
            StdError::ValidationError(_) => "validation_error",
            StdError::JsonSerializationError(_) => "json_serialization_error",
            StdError::IoError(_) => "io_error",
        }
    }
}

/// An error raised part-way through a scheduled repair plan. Steps listed in
/// `progress` were applied before `error` stopped the run and stay applied.
#[derive(Error, Debug)]
pub struct ErrorWithProgress {
    pub progress: PlanReport,
    #[source]
    pub error: StdError,
}

impl ErrorWithProgress {
    pub fn new(error: StdError, progress: PlanReport) -> ErrorWithProgress {
        ErrorWithProgress { progress, error }
    }

    pub fn kind_label(&self) -> &'static str {
        self.error.kind_label()
    }
}

impl fmt::Display for ErrorWithProgress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.progress.deleted.is_empty() {
            write!(f, "{}", self.error)
        } else {
            write!(
                f,
                "{} (already deleted: {})",
                self.error,
                self.progress.deleted.join(", ")
            )
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    StdError(StdError),

    #[error(transparent)]
    ErrorWithProgress(ErrorWithProgress),
}

impl Error {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Error::StdError(e) => e.kind_label(),
            Error::ErrorWithProgress(e) => e.kind_label(),
        }
    }

    /// The underlying error kind, looking through any progress wrapper.
    pub fn std_error(&self) -> &StdError {
        match self {
            Error::StdError(e) => e,
            Error::ErrorWithProgress(e) => &e.error,
        }
    }
}

impl From<StdError> for Error {
    fn from(e: StdError) -> Self {
        Error::StdError(e)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
