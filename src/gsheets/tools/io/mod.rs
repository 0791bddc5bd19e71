//! Local, file-backed implementations of the dataset seams.

pub mod excel_read;
pub mod excel_write;
pub mod project;
pub mod tsv;

use std::path::Path;

use crate::gsheets::tools::dataset::{DatasetSink, DatasetSource};
use crate::gsheets::tools::error::Result;
use crate::gsheets::tools::model::Schema;

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"))
}

/// Opens a local dataset, picking the format from the file extension
/// (`.xlsx` workbook, anything else tab-separated).
pub fn open_source(path: &Path) -> Result<Box<dyn DatasetSource>> {
    if is_workbook(path) {
        Ok(Box::new(excel_read::XlsxSource::open(path, None)?))
    } else {
        Ok(Box::new(tsv::TsvSource::open(path)?))
    }
}

/// Creates a local dataset, picking the format from the file extension.
pub fn create_sink(path: &Path, schema: &Schema) -> Result<Box<dyn DatasetSink>> {
    if is_workbook(path) {
        Ok(Box::new(excel_write::XlsxSink::create(path, schema)?))
    } else {
        Ok(Box::new(tsv::TsvSink::create(path, schema)?))
    }
}
