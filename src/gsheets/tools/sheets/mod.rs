//! Google Sheets access: the owned client seam, its HTTP implementation and
//! the session/worksheet handles the rest of the crate works with.

pub mod a1;
pub mod api;
pub mod auth;
pub mod http;
pub mod session;

pub use api::{ApiError, SheetProperties, SheetsApi, SpreadsheetMeta};
pub use session::{SheetsSession, Worksheet, translate_error};
