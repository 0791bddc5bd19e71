use tracing::{debug, error};

use crate::gsheets::tools::batch::CellRow;
use crate::gsheets::tools::config::ValueInputOption;
use crate::gsheets::tools::credentials::Credentials;
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::sheets::a1;
use crate::gsheets::tools::sheets::api::{ApiError, SheetProperties, SheetsApi};
use crate::gsheets::tools::sheets::http::HttpSheetsClient;

/// Authorized access to Google Sheets documents.
///
/// Every operation funnels upstream failures through [`translate_error`], so
/// callers only ever see [`ToolError::Spreadsheet`] with a readable message.
#[derive(Debug)]
pub struct SheetsSession<A = HttpSheetsClient> {
    api: A,
    email: String,
}

impl SheetsSession<HttpSheetsClient> {
    /// Authorizes a session against the Sheets REST API.
    pub fn authorize(credentials: &Credentials) -> Result<Self> {
        let api = HttpSheetsClient::new(credentials)?;
        let email = api.email().to_string();
        debug!(kind = %credentials.kind, %email, "authorized Sheets session");
        Ok(Self { api, email })
    }
}

impl<A: SheetsApi> SheetsSession<A> {
    /// Wraps an already authorized client.
    pub fn with_api(api: A, email: impl Into<String>) -> Self {
        Self {
            api,
            email: email.into(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    /// Opens one worksheet by title.
    pub fn open_worksheet(&self, doc_id: &str, tab_id: &str) -> Result<Worksheet<'_, A>> {
        let meta = self
            .api
            .spreadsheet(doc_id)
            .map_err(|err| self.translate(err, doc_id, Some(tab_id)))?;
        let properties = meta
            .sheets
            .into_iter()
            .find(|sheet| sheet.title == tab_id)
            .ok_or_else(|| {
                self.translate(
                    ApiError::WorksheetNotFound(tab_id.to_string()),
                    doc_id,
                    Some(tab_id),
                )
            })?;
        Ok(Worksheet::new(self, doc_id, properties))
    }

    /// Opens every worksheet of a document in tab order, keeping only the
    /// titles listed in `tab_ids` when it is not empty.
    pub fn open_worksheets(
        &self,
        doc_id: &str,
        tab_ids: &[String],
    ) -> Result<Vec<Worksheet<'_, A>>> {
        let meta = self
            .api
            .spreadsheet(doc_id)
            .map_err(|err| self.translate(err, doc_id, None))?;
        let mut sheets = meta.sheets;
        sheets.sort_by_key(|sheet| sheet.index);
        Ok(sheets
            .into_iter()
            .filter(|sheet| tab_ids.is_empty() || tab_ids.contains(&sheet.title))
            .map(|properties| Worksheet::new(self, doc_id, properties))
            .collect())
    }

    /// Display title of a document.
    pub fn spreadsheet_title(&self, doc_id: &str) -> Result<String> {
        self.api
            .spreadsheet(doc_id)
            .map(|meta| meta.title)
            .map_err(|err| self.translate(err, doc_id, None))
    }

    fn translate(&self, err: ApiError, doc_id: &str, tab_id: Option<&str>) -> ToolError {
        error!(%err, doc_id, "Google Sheets API call failed");
        ToolError::Spreadsheet(translate_error(&err, doc_id, tab_id, &self.email))
    }
}

/// Maps an upstream failure to the message shown to the user.
pub fn translate_error(err: &ApiError, doc_id: &str, tab_id: Option<&str>, email: &str) -> String {
    match err {
        ApiError::SpreadsheetNotFound => {
            "Trying to open non-existent or inaccessible spreadsheet document.".to_string()
        }
        ApiError::WorksheetNotFound(title) => format!(
            "Trying to open non-existent sheet. Verify that the sheet name exists ({}).",
            tab_id.unwrap_or(title)
        ),
        ApiError::Status {
            status, message, ..
        } if status == "PERMISSION_DENIED" => format!(
            "Access was denied with the following error: {message}. \
             Have you enabled the Sheets API? Have you shared the spreadsheet with {email}?"
        ),
        ApiError::Status { status, .. } if status == "NOT_FOUND" => format!(
            "Trying to open non-existent spreadsheet document. \
             Verify the document id exists ({doc_id})."
        ),
        ApiError::Status { status, .. } if status == "FAILED_PRECONDITION" => {
            "This document is not a Google Sheet. Please use the Google Drive plugin instead."
                .to_string()
        }
        other => format!("The Google API returned an error: {other}"),
    }
}

/// Handle on one worksheet of a document.
#[derive(Debug)]
pub struct Worksheet<'s, A> {
    session: &'s SheetsSession<A>,
    doc_id: String,
    properties: SheetProperties,
}

impl<'s, A: SheetsApi> Worksheet<'s, A> {
    fn new(session: &'s SheetsSession<A>, doc_id: &str, properties: SheetProperties) -> Self {
        Self {
            session,
            doc_id: doc_id.to_string(),
            properties,
        }
    }

    pub fn title(&self) -> &str {
        &self.properties.title
    }

    pub fn doc_id(&self) -> &str {
        &self.doc_id
    }

    pub fn properties(&self) -> &SheetProperties {
        &self.properties
    }

    /// Every cell of the worksheet, rows padded to the widest row.
    pub fn get_all_values(&self) -> Result<Vec<Vec<String>>> {
        let range = a1::quote_title(self.title());
        let mut rows = self
            .session
            .api
            .get_values(&self.doc_id, &range)
            .map_err(|err| self.translate(err))?;
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, String::new());
        }
        Ok(rows)
    }

    /// Appends rows after the last filled row.
    pub fn append_rows(&self, rows: &[CellRow], option: ValueInputOption) -> Result<()> {
        let range = a1::quote_title(self.title());
        self.session
            .api
            .append_values(&self.doc_id, &range, rows, option)
            .map_err(|err| self.translate(err))
    }

    /// Writes rows into an A1 range of this worksheet.
    pub fn update(&self, range: &str, rows: &[CellRow], option: ValueInputOption) -> Result<()> {
        let range = a1::sheet_range(self.title(), range);
        self.session
            .api
            .update_values(&self.doc_id, &range, rows, option)
            .map_err(|err| self.translate(err))
    }

    /// Sets the grid size of the worksheet.
    pub fn resize(&mut self, rows: usize, columns: usize) -> Result<()> {
        self.session
            .api
            .resize(&self.doc_id, self.properties.sheet_id, rows, columns)
            .map_err(|err| self.translate(err))?;
        self.properties.row_count = rows;
        self.properties.column_count = columns;
        Ok(())
    }

    /// Removes every value of the worksheet.
    pub fn clear(&self) -> Result<()> {
        let range = a1::quote_title(self.title());
        self.session
            .api
            .clear_values(&self.doc_id, &range)
            .map_err(|err| self.translate(err))
    }

    /// Replaces the worksheet content with `rows`: clears it, resizes the
    /// grid to exactly fit the rows and writes them in a single call.
    pub fn overwrite(&mut self, rows: &[CellRow], option: ValueInputOption) -> Result<()> {
        self.clear()?;
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
        if rows.is_empty() || columns == 0 {
            return Ok(());
        }
        self.resize(rows.len(), columns)?;
        self.update(&a1::full_range(rows.len(), columns), rows, option)
    }

    fn translate(&self, err: ApiError) -> ToolError {
        self.session
            .translate(err, &self.doc_id, Some(&self.properties.title))
    }
}
