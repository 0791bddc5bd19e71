use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;

use crate::gsheets::tools::dataset::DatasetSink;
use crate::gsheets::tools::error::Result;
use crate::gsheets::tools::model::{Row, Schema, Value};

/// Dataset written as a single-sheet Excel workbook. Rows are buffered and
/// the file is produced on [`close`](DatasetSink::close).
pub struct XlsxSink {
    path: PathBuf,
    sheet_name: String,
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl XlsxSink {
    pub fn create(path: &Path, schema: &Schema) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let sheet_name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().chars().take(31).collect::<String>())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Sheet1".to_string());
        Ok(Self {
            path: path.to_path_buf(),
            sheet_name,
            columns: schema.column_names(),
            rows: Vec::new(),
        })
    }
}

impl DatasetSink for XlsxSink {
    fn write_row(&mut self, row: &[Value]) -> Result<()> {
        self.rows.push(row.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.sheet_name)?;

        for (col_idx, header) in self.columns.iter().enumerate() {
            worksheet.write_string(0, col_idx as u16, header)?;
        }

        for (row_idx, row) in self.rows.iter().enumerate() {
            let excel_row = (row_idx + 1) as u32;
            for (col_idx, cell) in row.iter().enumerate() {
                let col = col_idx as u16;
                match cell {
                    Value::Null => {}
                    Value::Integer(value) => {
                        worksheet.write_number(excel_row, col, *value as f64)?;
                    }
                    Value::Float(value) => {
                        worksheet.write_number(excel_row, col, *value)?;
                    }
                    Value::Boolean(value) => {
                        worksheet.write_boolean(excel_row, col, *value)?;
                    }
                    other => {
                        worksheet.write_string(excel_row, col, &other.to_string())?;
                    }
                }
            }
        }

        workbook.save(&self.path)?;
        Ok(())
    }
}
