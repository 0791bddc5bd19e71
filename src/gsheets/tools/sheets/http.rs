use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, trace};
use url::Url;

use crate::gsheets::tools::batch::CellRow;
use crate::gsheets::tools::config::ValueInputOption;
use crate::gsheets::tools::credentials::Credentials;
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::sheets::api::{
    ApiError, ApiResult, SheetProperties, SheetsApi, SpreadsheetMeta,
};
use crate::gsheets::tools::sheets::auth::TokenSource;

/// Base endpoint of the Sheets v4 REST API.
pub const SHEETS_ENDPOINT: &str = "https://sheets.googleapis.com/v4/spreadsheets/";

const USER_AGENT: &str = concat!("gsheets-tools/", env!("CARGO_PKG_VERSION"));

/// Blocking client for the Sheets v4 REST API.
#[derive(Debug)]
pub struct HttpSheetsClient {
    client: Client,
    tokens: TokenSource,
    endpoint: Url,
}

impl HttpSheetsClient {
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let tokens = TokenSource::from_credentials(credentials)?;
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent(USER_AGENT)
            .build()?;
        let endpoint = Url::parse(SHEETS_ENDPOINT)
            .map_err(|err| ToolError::Config(format!("invalid Sheets endpoint: {err}")))?;
        Ok(Self {
            client,
            tokens,
            endpoint,
        })
    }

    /// Account email used in permission errors.
    pub fn email(&self) -> &str {
        self.tokens.email()
    }

    /// Builds `<endpoint>/<doc_id>/<segments...>`, percent-encoding each segment.
    fn url(&self, doc_id: &str, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.endpoint.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| ApiError::Transport("Sheets endpoint cannot be a base".into()))?;
            path.pop_if_empty().push(doc_id);
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    fn authorized(&self, request: RequestBuilder) -> ApiResult<RequestBuilder> {
        let token = self
            .tokens
            .token(&self.client)
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        Ok(request.bearer_auth(token))
    }

    fn send(&self, request: RequestBuilder) -> ApiResult<Response> {
        let response = self
            .authorized(request)?
            .send()
            .map_err(|err| ApiError::Transport(err.to_string()))?;
        trace!(status = %response.status(), url = %response.url(), "sheets response");
        if response.status().is_success() {
            return Ok(response);
        }
        Err(status_error(response))
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

fn status_error(response: Response) -> ApiError {
    let code = response.status().as_u16();
    let body = response.text().unwrap_or_default();
    parse_error_body(&body, code)
}

/// Reads a Google error envelope, keeping the raw body as the message when
/// it is not one.
fn parse_error_body(body: &str, code: u16) -> ApiError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => ApiError::Status {
            code: if envelope.error.code == 0 {
                code
            } else {
                envelope.error.code
            },
            status: envelope.error.status,
            message: envelope.error.message,
        },
        Err(_) => ApiError::Status {
            code,
            status: String::new(),
            message: body.to_string(),
        },
    }
}

/// A 404 on the metadata call without a Google status means the document
/// id did not resolve at all. Google's own `NOT_FOUND` payload is kept so
/// the message can name the document id.
fn metadata_error(error: ApiError) -> ApiError {
    match error {
        ApiError::Status { code: 404, status, .. } if status.is_empty() => {
            ApiError::SpreadsheetNotFound
        }
        other => other,
    }
}

#[derive(Debug, Deserialize)]
struct SpreadsheetResponse {
    #[serde(default)]
    properties: SpreadsheetProperties,
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetEntryProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetEntryProperties {
    #[serde(default)]
    sheet_id: i64,
    #[serde(default)]
    title: String,
    #[serde(default)]
    index: usize,
    #[serde(default)]
    grid_properties: GridProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GridProperties {
    #[serde(default)]
    row_count: usize,
    #[serde(default)]
    column_count: usize,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn decode<T: serde::de::DeserializeOwned>(response: Response) -> ApiResult<T> {
    response
        .json()
        .map_err(|err| ApiError::Transport(format!("invalid Sheets API response: {err}")))
}

impl SheetsApi for HttpSheetsClient {
    fn spreadsheet(&self, doc_id: &str) -> ApiResult<SpreadsheetMeta> {
        let url = self.url(doc_id, &[])?;
        let request = self
            .client
            .get(url)
            .query(&[("fields", "properties.title,sheets.properties")]);
        let response = self.send(request).map_err(metadata_error)?;
        let response: SpreadsheetResponse = decode(response)?;
        let sheets = response
            .sheets
            .into_iter()
            .map(|entry| SheetProperties {
                sheet_id: entry.properties.sheet_id,
                title: entry.properties.title,
                index: entry.properties.index,
                row_count: entry.properties.grid_properties.row_count,
                column_count: entry.properties.grid_properties.column_count,
            })
            .collect();
        Ok(SpreadsheetMeta {
            title: response.properties.title,
            sheets,
        })
    }

    fn get_values(&self, doc_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>> {
        let url = self.url(doc_id, &["values", range])?;
        let response: ValueRange = decode(self.send(self.client.get(url))?)?;
        Ok(response
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    fn append_values(
        &self,
        doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()> {
        let url = self.url(doc_id, &["values", &format!("{range}:append")])?;
        let request = self
            .client
            .post(url)
            .query(&[("valueInputOption", option.as_str())])
            .json(&json!({ "values": rows }));
        self.send(request)?;
        debug!(rows = rows.len(), range, "appended values");
        Ok(())
    }

    fn update_values(
        &self,
        doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()> {
        let url = self.url(doc_id, &["values", range])?;
        let request = self
            .client
            .put(url)
            .query(&[("valueInputOption", option.as_str())])
            .json(&json!({
                "range": range,
                "majorDimension": "ROWS",
                "values": rows,
            }));
        self.send(request)?;
        debug!(rows = rows.len(), range, "updated values");
        Ok(())
    }

    fn resize(&self, doc_id: &str, sheet_id: i64, rows: usize, columns: usize) -> ApiResult<()> {
        let url = self.url(&format!("{doc_id}:batchUpdate"), &[])?;
        let request = self.client.post(url).json(&json!({
            "requests": [{
                "updateSheetProperties": {
                    "properties": {
                        "sheetId": sheet_id,
                        "gridProperties": { "rowCount": rows, "columnCount": columns },
                    },
                    "fields": "gridProperties/rowCount,gridProperties/columnCount",
                }
            }]
        }));
        self.send(request)?;
        debug!(sheet_id, rows, columns, "resized worksheet");
        Ok(())
    }

    fn clear_values(&self, doc_id: &str, range: &str) -> ApiResult<()> {
        let url = self.url(doc_id, &["values", &format!("{range}:clear")])?;
        self.send(self.client.post(url).json(&json!({})))?;
        debug!(range, "cleared values");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn google_error_envelopes_keep_status_and_message() {
        let body = json!({"error": {
            "code": 403,
            "message": "The caller does not have permission",
            "status": "PERMISSION_DENIED"
        }});
        assert_eq!(
            parse_error_body(&body.to_string(), 403),
            ApiError::Status {
                code: 403,
                status: "PERMISSION_DENIED".into(),
                message: "The caller does not have permission".into(),
            }
        );

        let body = json!({"error": {
            "message": "Requested entity was not found.",
            "status": "NOT_FOUND"
        }});
        assert_eq!(
            parse_error_body(&body.to_string(), 404),
            ApiError::Status {
                code: 404,
                status: "NOT_FOUND".into(),
                message: "Requested entity was not found.".into(),
            }
        );
    }

    #[test]
    fn other_bodies_become_the_message() {
        assert_eq!(
            parse_error_body("<html>Bad Gateway</html>", 502),
            ApiError::Status {
                code: 502,
                status: String::new(),
                message: "<html>Bad Gateway</html>".into(),
            }
        );
        assert_eq!(
            parse_error_body("", 500),
            ApiError::Status {
                code: 500,
                status: String::new(),
                message: String::new(),
            }
        );
    }

    #[test]
    fn bare_metadata_404_is_a_missing_spreadsheet() {
        assert_eq!(
            metadata_error(parse_error_body("Not Found", 404)),
            ApiError::SpreadsheetNotFound
        );

        let body = json!({"error": {"code": 404, "status": "NOT_FOUND"}});
        let google = parse_error_body(&body.to_string(), 404);
        assert_eq!(metadata_error(google.clone()), google);

        let denied = parse_error_body("", 403);
        assert_eq!(metadata_error(denied.clone()), denied);
    }
}
