use std::path::Path;

use serde_json::Value as JsonValue;
use tracing::{debug, info, instrument};

use crate::gsheets::tools::browse::{self, Choices};
use crate::gsheets::tools::config::{PluginConfig, WriteMode};
use crate::gsheets::tools::connector::SheetsConnector;
use crate::gsheets::tools::credentials::extract_credentials;
use crate::gsheets::tools::dataset::{DatasetSink, write_scoped};
use crate::gsheets::tools::error::Result;
use crate::gsheets::tools::importer::{ResultTable, SheetsImporter};
use crate::gsheets::tools::io::{self, project::LocalProject};
use crate::gsheets::tools::model::{Record, Row, Schema, Value};
use crate::gsheets::tools::recipe::{self, RecipeKind, RecipeReport};
use crate::gsheets::tools::sheets::SheetsSession;

/// Reads the configured worksheets and stores the records in a local dataset.
#[instrument(level = "info", skip_all, fields(output = %output.display()))]
pub fn sheets_to_dataset(config: &PluginConfig, output: &Path) -> Result<usize> {
    let connector = SheetsConnector::new(config)?;
    let records = connector.generate_rows()?.collect::<Result<Vec<Record>>>()?;
    info!(record_count = records.len(), "read records from spreadsheet");

    let (schema, rows) = records_to_rows(&records);
    debug!(column_count = schema.len(), "dataset schema built");
    let mut sink = io::create_sink(output, &schema)?;
    write_scoped(&mut sink, |sink| {
        for row in &rows {
            sink.write_row(row)?;
        }
        Ok(rows.len())
    })
}

/// Aligns records whose keys vary across worksheets on the union of their
/// keys, in order of first appearance.
pub fn records_to_rows(records: &[Record]) -> (Schema, Vec<Row>) {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !columns.iter().any(|column| column == key) {
                columns.push(key.to_string());
            }
        }
    }
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or(Value::Null))
                .collect()
        })
        .collect();
    (Schema::of_strings(columns), rows)
}

/// Writes a local dataset into the configured worksheet through the
/// connector writer.
#[instrument(level = "info", skip_all, fields(input = %input.display(), ?mode))]
pub fn dataset_to_sheets(config: &PluginConfig, input: &Path, mode: WriteMode) -> Result<usize> {
    let mut source = io::open_source(input)?;
    let connector = SheetsConnector::new(config)?;
    let schema = source.schema().clone();
    let mut writer = connector.get_writer(&schema, mode)?;
    let written = write_scoped(&mut writer, |writer| {
        let mut written = 0usize;
        while let Some(row) = source.next_row()? {
            writer.write_row(&row)?;
            written += 1;
        }
        Ok(written)
    })?;
    info!(row_count = written, "wrote rows to spreadsheet");
    Ok(written)
}

/// Runs one of the recipes from a local input dataset to a local output
/// dataset.
#[instrument(
    level = "info",
    skip_all,
    fields(input = %input.display(), output = %output.display(), ?kind)
)]
pub fn run_recipe(
    kind: RecipeKind,
    config: &PluginConfig,
    input: &Path,
    output: &Path,
) -> Result<RecipeReport> {
    let mut source = io::open_source(input)?;
    let credentials = extract_credentials(config)?;
    let session = SheetsSession::authorize(&credentials)?;
    let mut sink = io::create_sink(output, source.schema())?;
    recipe::run_recipe(kind, config, &session, &mut source, &mut sink)
}

/// Imports the spreadsheet's worksheets into a local project directory.
#[instrument(level = "info", skip_all, fields(project = %project_dir.display()))]
pub fn import_into_project(
    config: &PluginConfig,
    project_dir: &Path,
    project_key: &str,
) -> Result<ResultTable> {
    let credentials = extract_credentials(config)?;
    let session = SheetsSession::authorize(&credentials)?;
    let mut project = LocalProject::open(project_dir, project_key)?;
    let mut importer = SheetsImporter::new(config, &session, &mut project)?;
    importer.run()
}

/// Answers the tab picker against the live API.
#[instrument(level = "debug", skip_all)]
pub fn browse_tabs(payload: &JsonValue, config: &JsonValue) -> Choices {
    browse::browse_tabs(payload, config, SheetsSession::authorize)
}
