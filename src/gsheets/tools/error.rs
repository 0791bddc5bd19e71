use std::path::PathBuf;

use thiserror::Error;

/// Convenient alias for fallible results returned throughout the crate.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Error type covering the different failure cases that can occur while the
/// tool reads from, writes to, or imports Google Sheets documents.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Wrapper for IO failures such as reading or writing files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Raised when JSON parsing or serialization fails.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Raised when a tab-separated dataset cannot be read or written.
    #[error("TSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Errors bubbled up from the Excel writer implementation.
    #[error("Excel write error: {0}")]
    ExcelWrite(#[from] rust_xlsxwriter::XlsxError),

    /// Errors bubbled up from the Excel reader implementation.
    #[error("Excel read error: {0}")]
    ExcelRead(#[from] calamine::XlsxError),

    /// Transport-level HTTP failures (connection, TLS, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Raised when the configuration is incomplete or inconsistent.
    #[error("{0}")]
    Config(String),

    /// Raised when credentials cannot be resolved from the configuration.
    #[error("{0}")]
    Credentials(String),

    /// Raised when an access token cannot be obtained.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// User-facing translation of a Google Sheets API failure.
    #[error("{0}")]
    Spreadsheet(String),

    /// Raised for modes the tool deliberately does not implement.
    #[error("unimplemented: {0}")]
    Unimplemented(String),

    /// Raised for option combinations that are not supported.
    #[error("{0}")]
    NotSupported(String),

    /// Raised when a local dataset does not follow the expected layout.
    #[error("invalid dataset: {0}")]
    InvalidDataset(String),

    /// Raised when the user provides a path that does not exist.
    #[error("input file not found: {0}")]
    MissingInput(PathBuf),

    /// Raised when the tracing subscriber fails to initialise.
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}
