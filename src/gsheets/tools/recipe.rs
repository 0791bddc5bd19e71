//! Recipes copying an input dataset into a worksheet while mirroring every
//! row into an output dataset.

use std::time::Duration;

use tracing::info;

use crate::gsheets::tools::batch::{AppendBatcher, CellRow};
use crate::gsheets::tools::config::{DEFAULT_BATCH_SIZE, LEGACY_BATCH_SIZE};
use crate::gsheets::tools::config::{PluginConfig, ValueInputOption, WriteMode};
use crate::gsheets::tools::dataset::{DatasetSink, DatasetSource, write_scoped};
use crate::gsheets::tools::dates::{mark_date_columns, row_to_cells};
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::logging::redact_secrets;
use crate::gsheets::tools::sheets::{SheetsApi, SheetsSession, Worksheet};

/// The two generations of the append recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeKind {
    /// Fixed batches of 50 rows; overwrite clears the worksheet and appends
    /// the header first.
    LegacyAppend,
    /// Configurable batches and pause; overwrite resizes the worksheet and
    /// writes everything in one call.
    Batched,
}

/// What a recipe run sent to the spreadsheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecipeReport {
    /// Data rows written to both the worksheet and the output dataset.
    pub rows: usize,
    /// Append calls made against the worksheet.
    pub append_calls: usize,
}

struct RecipeSettings {
    doc_id: String,
    tab_id: String,
    write_mode: WriteMode,
    option: ValueInputOption,
    batch_size: usize,
    delay: Duration,
}

impl RecipeSettings {
    fn resolve(kind: RecipeKind, config: &PluginConfig) -> Result<Self> {
        let doc_id = config.require_doc_id()?.to_string();
        let tab_id = config
            .tab_ids()
            .into_iter()
            .next()
            .ok_or_else(|| ToolError::Config("The sheet name is not provided".into()))?;
        let (batch_size, delay) = match kind {
            RecipeKind::LegacyAppend => (LEGACY_BATCH_SIZE, Duration::ZERO),
            RecipeKind::Batched => (
                config.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
                config.insertion_pause(),
            ),
        };
        Ok(Self {
            doc_id,
            tab_id,
            write_mode: config.write_mode.unwrap_or_default(),
            option: config.insert_option(),
            batch_size,
            delay,
        })
    }
}

/// Copies `input` into the configured worksheet and mirrors every row into
/// `output`, which must have been created with the input schema. `output`
/// is closed whatever the outcome.
pub fn run_recipe<A, S, O>(
    kind: RecipeKind,
    config: &PluginConfig,
    session: &SheetsSession<A>,
    input: &mut S,
    output: &mut O,
) -> Result<RecipeReport>
where
    A: SheetsApi,
    S: DatasetSource + ?Sized,
    O: DatasetSink + ?Sized,
{
    info!(
        version = env!("CARGO_PKG_VERSION"),
        ?kind,
        config = %redact_secrets(&serde_json::to_value(config)?),
        "GoogleSheets recipe starting"
    );
    let settings = RecipeSettings::resolve(kind, config)?;

    let report = write_scoped(output, |output| {
        let mut worksheet = session.open_worksheet(&settings.doc_id, &settings.tab_id)?;
        match (kind, settings.write_mode) {
            (RecipeKind::Batched, WriteMode::Overwrite) => {
                overwrite_rows(&settings, &mut worksheet, input, output)
            }
            (_, WriteMode::Overwrite) => {
                worksheet.clear()?;
                append_rows(&settings, &worksheet, input, output, true)
            }
            (_, WriteMode::Append) => append_rows(&settings, &worksheet, input, output, false),
        }
    })?;

    info!(
        worksheet = %settings.tab_id,
        rows = report.rows,
        append_calls = report.append_calls,
        "recipe finished"
    );
    Ok(report)
}

fn header_cells<S: DatasetSource + ?Sized>(input: &S) -> CellRow {
    input
        .schema()
        .columns
        .iter()
        .map(|column| serde_json::Value::String(column.name.clone()))
        .collect()
}

fn date_columns<S: DatasetSource + ?Sized>(settings: &RecipeSettings, input: &S) -> Vec<usize> {
    match settings.option {
        ValueInputOption::UserEntered => mark_date_columns(input.schema()),
        ValueInputOption::Raw => Vec::new(),
    }
}

fn append_rows<A, S, O>(
    settings: &RecipeSettings,
    worksheet: &Worksheet<'_, A>,
    input: &mut S,
    output: &mut O,
    with_header: bool,
) -> Result<RecipeReport>
where
    A: SheetsApi,
    S: DatasetSource + ?Sized,
    O: DatasetSink + ?Sized,
{
    let date_columns = date_columns(settings, input);
    let mut batcher = AppendBatcher::new(settings.batch_size, settings.delay);
    let send = |batch: Vec<CellRow>| worksheet.append_rows(&batch, settings.option);

    if with_header {
        batcher.push(header_cells(input), send)?;
    }
    let mut rows = 0;
    while let Some(row) = input.next_row()? {
        batcher.push(row_to_cells(row.clone(), &date_columns, settings.option), send)?;
        output.write_row(&row)?;
        rows += 1;
    }
    batcher.flush(send)?;

    Ok(RecipeReport {
        rows,
        append_calls: batcher.sent_batches(),
    })
}

fn overwrite_rows<A, S, O>(
    settings: &RecipeSettings,
    worksheet: &mut Worksheet<'_, A>,
    input: &mut S,
    output: &mut O,
) -> Result<RecipeReport>
where
    A: SheetsApi,
    S: DatasetSource + ?Sized,
    O: DatasetSink + ?Sized,
{
    let date_columns = date_columns(settings, input);
    let mut cells = vec![header_cells(input)];
    let mut rows = 0;
    while let Some(row) = input.next_row()? {
        cells.push(row_to_cells(row.clone(), &date_columns, settings.option));
        output.write_row(&row)?;
        rows += 1;
    }
    worksheet.overwrite(&cells, settings.option)?;

    Ok(RecipeReport {
        rows,
        append_calls: 0,
    })
}
