//! Error types for payslip generation.
//!
//! None of these are fatal: the form controller catches every one of them,
//! reports it through its [`Notifier`](crate::controller::Notifier) and keeps
//! running.

use thiserror::Error;

/// Result type alias for crate operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A form field failed validation; blocks preview.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("required field `{0}` is empty")]
    MissingField(&'static str),

    /// A numeric field is not a finite, non-negative number.
    #[error("field `{field}` must be a non-negative number, got {value:?}")]
    InvalidNumber { field: &'static str, value: String },

    /// A date field is not `YYYY-MM-DD`.
    #[error("field `{field}` is not a valid date (expected YYYY-MM-DD), got {value:?}")]
    InvalidDate { field: &'static str, value: String },

    /// The pay month is not `YYYY-MM`.
    #[error("field `{field}` is not a valid month (expected YYYY-MM), got {value:?}")]
    InvalidMonth { field: &'static str, value: String },
}

impl ValidationError {
    /// Name of the offending form field.
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::InvalidNumber { field, .. }
            | ValidationError::InvalidDate { field, .. }
            | ValidationError::InvalidMonth { field, .. } => field,
        }
    }
}

/// An image reference could not be read or decoded. The image is simply
/// left out of the view.
#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("failed to read image '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{0}' is not a recognised image format")]
    UnknownFormat(String),

    #[error("invalid data URI: {0}")]
    InvalidDataUri(String),

    #[error("image decode error: {0}")]
    Decode(String),

    /// Cross-origin loading is disabled for this capture.
    #[error("remote image skipped (cross-origin loading disabled): {0}")]
    RemoteDisabled(String),

    #[error("failed to fetch '{url}': {message}")]
    Fetch { url: String, message: String },
}

/// Export failed or was refused; no file is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExportError {
    /// No payslip has been previewed yet.
    #[error("no payslip preview to export")]
    NothingToExport,

    /// Another export has not resolved yet.
    #[error("an export is already in progress")]
    InFlight,

    /// The rendered view could not be captured.
    #[error("capture failed: {0}")]
    Capture(String),

    /// The PDF document could not be encoded.
    #[error("PDF encoding failed: {0}")]
    Encode(String),
}

/// Umbrella error for the CLI and library entry points.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or form file.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}
