#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};

use gsheets_tools::batch::CellRow;
use gsheets_tools::config::{PluginConfig, ValueInputOption};
use gsheets_tools::dataset::{DatasetSink, DatasetSource};
use gsheets_tools::model::{Row, Schema, Value};
use gsheets_tools::sheets::api::ApiResult;
use gsheets_tools::sheets::{ApiError, SheetProperties, SheetsApi, SheetsSession, SpreadsheetMeta};
use serde_json::json;

pub const DOC_ID: &str = "doc-1";
pub const EMAIL: &str = "robot@project.iam.gserviceaccount.com";

/// One call received by [`FakeSheets`].
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Spreadsheet,
    GetValues(String),
    Append {
        range: String,
        rows: Vec<CellRow>,
        option: ValueInputOption,
    },
    Update {
        range: String,
        rows: Vec<CellRow>,
        option: ValueInputOption,
    },
    Resize {
        sheet_id: i64,
        rows: usize,
        columns: usize,
    },
    Clear(String),
}

/// In-memory spreadsheet recording every call made against it.
#[derive(Debug, Default)]
pub struct FakeSheets {
    pub title: String,
    pub sheets: Vec<SheetProperties>,
    pub values: HashMap<String, Vec<Vec<String>>>,
    pub failure: Option<ApiError>,
    pub calls: RefCell<Vec<Call>>,
}

impl FakeSheets {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            ..Self::default()
        }
    }

    /// Adds a worksheet holding `rows`.
    pub fn with_sheet(mut self, title: &str, rows: &[&[&str]]) -> Self {
        let index = self.sheets.len();
        self.sheets.push(SheetProperties {
            sheet_id: 100 + index as i64,
            title: title.to_string(),
            index,
            row_count: 1000,
            column_count: 26,
        });
        let rows = rows
            .iter()
            .map(|row| row.iter().map(|cell| cell.to_string()).collect())
            .collect();
        self.values.insert(title.to_string(), rows);
        self
    }

    pub fn failing(mut self, failure: ApiError) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn appends(&self) -> Vec<Vec<CellRow>> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Append { rows, .. } => Some(rows),
                _ => None,
            })
            .collect()
    }

    pub fn value_reads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::GetValues(_)))
            .count()
    }

    fn record(&self, call: Call) -> ApiResult<()> {
        self.calls.borrow_mut().push(call);
        match &self.failure {
            Some(failure) => Err(failure.clone()),
            None => Ok(()),
        }
    }
}

fn unquote(range: &str) -> String {
    let title = range.split('!').next().unwrap_or(range);
    title.trim_matches('\'').replace("''", "'")
}

impl SheetsApi for FakeSheets {
    fn spreadsheet(&self, _doc_id: &str) -> ApiResult<SpreadsheetMeta> {
        self.record(Call::Spreadsheet)?;
        Ok(SpreadsheetMeta {
            title: self.title.clone(),
            sheets: self.sheets.clone(),
        })
    }

    fn get_values(&self, _doc_id: &str, range: &str) -> ApiResult<Vec<Vec<String>>> {
        self.record(Call::GetValues(range.to_string()))?;
        Ok(self.values.get(&unquote(range)).cloned().unwrap_or_default())
    }

    fn append_values(
        &self,
        _doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()> {
        self.record(Call::Append {
            range: range.to_string(),
            rows: rows.to_vec(),
            option,
        })
    }

    fn update_values(
        &self,
        _doc_id: &str,
        range: &str,
        rows: &[CellRow],
        option: ValueInputOption,
    ) -> ApiResult<()> {
        self.record(Call::Update {
            range: range.to_string(),
            rows: rows.to_vec(),
            option,
        })
    }

    fn resize(&self, _doc_id: &str, sheet_id: i64, rows: usize, columns: usize) -> ApiResult<()> {
        self.record(Call::Resize {
            sheet_id,
            rows,
            columns,
        })
    }

    fn clear_values(&self, _doc_id: &str, range: &str) -> ApiResult<()> {
        self.record(Call::Clear(range.to_string()))
    }
}

pub fn session(api: FakeSheets) -> SheetsSession<FakeSheets> {
    SheetsSession::with_api(api, EMAIL)
}

/// Configuration pointing at [`DOC_ID`] with an inline service account.
pub fn config(extra: serde_json::Value) -> PluginConfig {
    let mut value = json!({
        "credentials": "{\"client_email\": \"robot@project.iam.gserviceaccount.com\"}",
        "doc_id": DOC_ID,
    });
    if let (Some(base), Some(extra)) = (value.as_object_mut(), extra.as_object()) {
        for (key, item) in extra {
            base.insert(key.clone(), item.clone());
        }
    }
    PluginConfig::from_value(&value).expect("configuration parsed")
}

/// Dataset held in memory.
pub struct MemorySource {
    schema: Schema,
    rows: VecDeque<Row>,
}

impl MemorySource {
    pub fn new(schema: Schema, rows: Vec<Row>) -> Self {
        Self {
            schema,
            rows: rows.into(),
        }
    }

    /// Dataset of `count` rows with a `name` and an `index` column.
    pub fn numbered(count: usize) -> Self {
        let rows = (0..count)
            .map(|idx| vec![Value::from(format!("row {idx}")), Value::Integer(idx as i64)])
            .collect();
        Self::new(Schema::of_strings(["name", "index"]), rows)
    }
}

impl DatasetSource for MemorySource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_row(&mut self) -> gsheets_tools::Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}

/// Sink collecting rows in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub rows: Vec<Row>,
    pub closed: bool,
}

impl DatasetSink for MemorySink {
    fn write_row(&mut self, row: &[Value]) -> gsheets_tools::Result<()> {
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn close(&mut self) -> gsheets_tools::Result<()> {
        self.closed = true;
        Ok(())
    }
}
