//! Owned seam between the tool and whichever Sheets client backs it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gsheets::tools::batch::CellRow;
use crate::gsheets::tools::config::ValueInputOption;

/// Spreadsheet metadata needed to address its worksheets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SpreadsheetMeta {
    pub title: String,
    pub sheets: Vec<SheetProperties>,
}

/// Properties of one worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
    pub index: usize,
    pub row_count: usize,
    pub column_count: usize,
}

/// Failure reported by a Sheets client, before translation into a
/// user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// The document id did not resolve. The HTTP client reports this for a
    /// metadata 404 that carries no Google error status.
    SpreadsheetNotFound,
    /// The requested worksheet title does not exist.
    WorksheetNotFound(String),
    /// The API answered with an error payload.
    Status {
        code: u16,
        status: String,
        message: String,
    },
    /// The request never produced an API answer.
    Transport(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::SpreadsheetNotFound => write!(f, "spreadsheet not found"),
            ApiError::WorksheetNotFound(title) => write!(f, "worksheet '{title}' not found"),
            ApiError::Status {
                code,
                status,
                message,
            } => write!(f, "APIError: [{code}]: {message} ({status})"),
            ApiError::Transport(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for ApiError {}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// The spreadsheet operations the tool relies on. Ranges are A1 ranges
/// prefixed with the quoted worksheet title.
pub trait SheetsApi {
    /// Title and worksheet list of a document.
    fn spreadsheet(&self, doc_id: &str) -> ApiResult<SpreadsheetMeta>;

    /// Formatted cell values of a range. Trailing empty cells may be omitted.
    fn get_values(&self, doc_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>>;

    /// Appends rows after the last non-empty row of the range's table.
    fn append_values(
        &self,
        doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()>;

    /// Overwrites the cells of a range.
    fn update_values(
        &self,
        doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()>;

    /// Changes the grid size of a worksheet.
    fn resize(&self, doc_id: &str, sheet_id: i64, rows: usize, columns: usize) -> ApiResult<()>;

    /// Clears every value of a range.
    fn clear_values(&self, doc_id: &str, range: &str) -> ApiResult<()>;
}

impl<T: SheetsApi + ?Sized> SheetsApi for Box<T> {
    fn spreadsheet(&self, doc_id: &str) -> ApiResult<SpreadsheetMeta> {
        (**self).spreadsheet(doc_id)
    }

    fn get_values(&self, doc_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>> {
        (**self).get_values(doc_id, range)
    }

    fn append_values(
        &self,
        doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()> {
        (**self).append_values(doc_id, range, rows, option)
    }

    fn update_values(
        &self,
        doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()> {
        (**self).update_values(doc_id, range, rows, option)
    }

    fn resize(&self, doc_id: &str, sheet_id: i64, rows: usize, columns: usize) -> ApiResult<()> {
        (**self).resize(doc_id, sheet_id, rows, columns)
    }

    fn clear_values(&self, doc_id: &str, range: &str) -> ApiResult<()> {
        (**self).clear_values(doc_id, range)
    }
}
