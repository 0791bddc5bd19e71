use std::collections::VecDeque;
use std::path::Path;

use calamine::{DataType, Reader, Xlsx, open_workbook};
use chrono::{DateTime, NaiveDate, TimeDelta, Utc};

use crate::gsheets::tools::dataset::DatasetSource;
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::model::{Column, ColumnType, Row, Schema, Value};

/// Dataset backed by one worksheet of an Excel workbook. The first row holds
/// the column names; column types are inferred from the data cells.
pub struct XlsxSource {
    schema: Schema,
    rows: VecDeque<Row>,
}

impl XlsxSource {
    /// Opens `sheet`, or the first worksheet when `None`.
    pub fn open(path: &Path, sheet: Option<&str>) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let mut workbook: Xlsx<_> = open_workbook(path)?;
        let name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| ToolError::InvalidDataset("workbook has no sheet".into()))?,
        };
        let range = workbook
            .worksheet_range(&name)
            .ok_or_else(|| ToolError::InvalidDataset(format!("missing sheet '{name}'")))??;

        let mut lines = range.rows();
        let headers: Vec<String> = match lines.next() {
            Some(first_row) => first_row
                .iter()
                .map(|cell| cell_to_value(cell).to_string())
                .collect(),
            None => Vec::new(),
        };
        let rows: VecDeque<Row> = lines
            .map(|line| {
                (0..headers.len())
                    .map(|idx| line.get(idx).map(cell_to_value).unwrap_or(Value::Null))
                    .collect()
            })
            .collect();

        let columns = headers
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Column::new(name, infer_type(rows.iter().map(|row| &row[idx]))))
            .collect();

        Ok(Self {
            schema: Schema::new(columns),
            rows,
        })
    }
}

impl DatasetSource for XlsxSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.pop_front())
    }
}

fn cell_to_value(cell: &DataType) -> Value {
    match cell {
        DataType::String(value) => Value::String(value.clone()),
        DataType::Float(value) => Value::Float(*value),
        DataType::Int(value) => Value::Integer(*value),
        DataType::Bool(value) => Value::Boolean(*value),
        DataType::DateTime(serial) => excel_serial_to_utc(*serial)
            .map(Value::Date)
            .unwrap_or(Value::Float(*serial)),
        DataType::Empty => Value::Null,
        other => Value::String(other.to_string()),
    }
}

/// Excel stores timestamps as fractional days since 1899-12-30.
fn excel_serial_to_utc(serial: f64) -> Option<DateTime<Utc>> {
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch
        .checked_add_signed(TimeDelta::milliseconds(millis))
        .map(|naive| naive.and_utc())
}

fn infer_type<'a>(values: impl Iterator<Item = &'a Value>) -> ColumnType {
    let mut inferred: Option<ColumnType> = None;
    for value in values {
        let current = match value {
            Value::Null => continue,
            Value::String(_) => return ColumnType::String,
            Value::Integer(_) => ColumnType::Bigint,
            Value::Float(_) => ColumnType::Double,
            Value::Boolean(_) => ColumnType::Boolean,
            Value::Date(_) => ColumnType::Date,
        };
        inferred = match inferred {
            None => Some(current),
            Some(previous) if previous == current => Some(previous),
            Some(ColumnType::Bigint) if current == ColumnType::Double => Some(ColumnType::Double),
            Some(ColumnType::Double) if current == ColumnType::Bigint => Some(ColumnType::Double),
            Some(_) => return ColumnType::String,
        };
    }
    inferred.unwrap_or(ColumnType::String)
}
