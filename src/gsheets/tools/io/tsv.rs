use std::ffi::OsString;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecord, Terminator, WriterBuilder};

use crate::gsheets::tools::dataset::{DatasetSink, DatasetSource};
use crate::gsheets::tools::dates::parse_timestamp;
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::model::{ColumnType, Row, Schema, Value};

/// Location of the schema stored next to a TSV file (`data.tsv.schema.json`).
pub fn schema_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".schema.json");
    PathBuf::from(name)
}

/// Reads a tab-separated dataset. Column types come from the schema sidecar
/// when present, otherwise every column is a string.
pub struct TsvSource {
    reader: csv::Reader<File>,
    schema: Schema,
    record: StringRecord,
}

impl TsvSource {
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ToolError::MissingInput(path.to_path_buf()));
        }
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .flexible(true)
            .from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let sidecar = schema_path(path);
        let schema = if sidecar.exists() {
            let schema: Schema = serde_json::from_str(&std::fs::read_to_string(&sidecar)?)?;
            if schema.column_names() != headers {
                return Err(ToolError::InvalidDataset(format!(
                    "schema of '{}' does not match its header",
                    path.display()
                )));
            }
            schema
        } else {
            Schema::of_strings(headers)
        };

        Ok(Self {
            reader,
            schema,
            record: StringRecord::new(),
        })
    }
}

impl DatasetSource for TsvSource {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        let row = self
            .schema
            .columns
            .iter()
            .enumerate()
            .map(|(idx, column)| parse_cell(self.record.get(idx).unwrap_or(""), column.column_type))
            .collect();
        Ok(Some(row))
    }
}

fn parse_cell(text: &str, column_type: ColumnType) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    let parsed = match column_type {
        ColumnType::Tinyint | ColumnType::Smallint | ColumnType::Int | ColumnType::Bigint => {
            text.parse().ok().map(Value::Integer)
        }
        ColumnType::Float | ColumnType::Double => text.parse().ok().map(Value::Float),
        ColumnType::Boolean => text.parse().ok().map(Value::Boolean),
        column_type if column_type.is_date_like() => parse_timestamp(text).map(Value::Date),
        _ => None,
    };
    parsed.unwrap_or_else(|| Value::String(text.to_string()))
}

/// Writes a tab-separated dataset with unix line endings, plus its schema
/// sidecar.
pub struct TsvSink {
    writer: csv::Writer<File>,
    width: usize,
}

impl TsvSink {
    pub fn create(path: &Path, schema: &Schema) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(schema_path(path), serde_json::to_string_pretty(schema)?)?;

        let mut writer = WriterBuilder::new()
            .delimiter(b'\t')
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .from_path(path)?;
        writer.write_record(schema.columns.iter().map(|column| column.name.as_str()))?;
        Ok(Self {
            writer,
            width: schema.len(),
        })
    }
}

impl DatasetSink for TsvSink {
    fn write_row(&mut self, row: &[Value]) -> Result<()> {
        let mut cells: Vec<String> = row.iter().map(Value::to_string).collect();
        if cells.len() < self.width {
            cells.resize(self.width, String::new());
        }
        self.writer.write_record(&cells)?;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
