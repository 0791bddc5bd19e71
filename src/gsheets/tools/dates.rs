use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::gsheets::tools::config::ValueInputOption;
use crate::gsheets::tools::model::{Row, Schema, Value};

/// Text format parsed as a date by the spreadsheet locale in `USER_ENTERED` mode.
pub const GSPREAD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Indices of the schema columns holding dates or timestamps.
pub fn mark_date_columns(schema: &Schema) -> Vec<usize> {
    schema
        .columns
        .iter()
        .enumerate()
        .filter(|(_, column)| column.column_type.is_date_like())
        .map(|(idx, _)| idx)
        .collect()
}

/// Rewrites the marked positions of `row` as spreadsheet date text. Values
/// that are neither timestamps nor parseable date strings are left alone.
pub fn convert_dates_in_row(mut row: Row, date_columns: &[usize]) -> Row {
    for idx in date_columns {
        let Some(value) = row.get_mut(*idx) else {
            continue;
        };
        if let Some(timestamp) = as_timestamp(value) {
            *value = Value::String(timestamp.format(GSPREAD_DATE_FORMAT).to_string());
        }
    }
    row
}

/// Converts a dataset row into the cells sent to the Sheets API.
///
/// In `USER_ENTERED` mode the marked columns are converted to spreadsheet
/// date text. Any remaining timestamp is sent as ISO-8601.
pub fn row_to_cells(
    row: Row,
    date_columns: &[usize],
    option: ValueInputOption,
) -> Vec<serde_json::Value> {
    let row = match option {
        ValueInputOption::UserEntered if !date_columns.is_empty() => {
            convert_dates_in_row(row, date_columns)
        }
        _ => row,
    };
    row.iter().map(Value::to_json).collect()
}

/// Interprets a value as a timestamp when it holds one.
pub fn as_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Date(timestamp) => Some(*timestamp),
        Value::String(text) => parse_timestamp(text),
        _ => None,
    }
}

/// Parses the timestamp notations produced by the data platform.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(text) {
        return Some(timestamp.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, GSPREAD_DATE_FORMAT) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
