//! Platform-side seams: where rows come from, where they go, and the project
//! holding datasets and flow zones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::gsheets::tools::error::Result;
use crate::gsheets::tools::model::{Row, Schema, Value};

/// Sequential reader over a dataset.
pub trait DatasetSource {
    fn schema(&self) -> &Schema;

    /// Next row, or `None` at end of stream.
    fn next_row(&mut self) -> Result<Option<Row>>;
}

/// Sequential writer into a dataset. `close` must be called once all rows
/// are written.
pub trait DatasetSink {
    fn write_row(&mut self, row: &[Value]) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

impl<T: DatasetSource + ?Sized> DatasetSource for Box<T> {
    fn schema(&self) -> &Schema {
        (**self).schema()
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        (**self).next_row()
    }
}

impl<T: DatasetSink + ?Sized> DatasetSink for Box<T> {
    fn write_row(&mut self, row: &[Value]) -> Result<()> {
        (**self).write_row(row)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Runs `body` against `sink` and closes the sink whatever the outcome. The
/// error of `body` takes precedence over a close failure.
pub fn write_scoped<S, T, F>(sink: &mut S, body: F) -> Result<T>
where
    S: DatasetSink + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    let outcome = body(sink);
    let closed = sink.close();
    let value = outcome?;
    closed?;
    Ok(value)
}

/// Definition of a dataset to create inside a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub dataset_type: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub format_type: String,
    #[serde(default)]
    pub format_params: BTreeMap<String, String>,
}

impl DatasetSpec {
    /// Tab-separated filesystem dataset stored under `<project_key>/<name>`.
    pub fn filesystem_tsv(project_key: &str, name: &str) -> Self {
        let params = BTreeMap::from([
            ("connection".to_string(), "filesystem_folders".to_string()),
            ("path".to_string(), format!("{project_key}/{name}")),
        ]);
        let format_params = BTreeMap::from([
            ("separator".to_string(), "\t".to_string()),
            ("style".to_string(), "unix".to_string()),
            ("compress".to_string(), String::new()),
        ]);
        Self {
            name: name.to_string(),
            dataset_type: "Filesystem".to_string(),
            params,
            format_type: "csv".to_string(),
            format_params,
        }
    }
}

/// Named grouping of datasets within a project flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
}

/// The project a runnable operates in.
pub trait Project {
    fn project_key(&self) -> &str;

    fn list_dataset_names(&self) -> Result<Vec<String>>;

    fn create_dataset(&mut self, spec: &DatasetSpec) -> Result<()>;

    /// Flags a dataset as managed by the platform.
    fn set_managed(&mut self, name: &str) -> Result<()>;

    fn list_zones(&self) -> Result<Vec<Zone>>;

    fn create_zone(&mut self, name: &str) -> Result<Zone>;

    fn move_to_zone(&mut self, dataset: &str, zone_id: &str) -> Result<()>;

    /// Replaces the schema and content of a dataset.
    fn dataset_writer(&mut self, name: &str, schema: &Schema) -> Result<Box<dyn DatasetSink>>;
}
