//! Dataset connector: reads worksheets as records and writes dataset rows
//! back into a single worksheet.

use tracing::{debug, info};

use crate::gsheets::tools::batch::{AppendBatcher, CellRow};
use crate::gsheets::tools::config::{
    DEFAULT_BATCH_SIZE, PluginConfig, ResultFormat, ValueInputOption, WriteMode,
};
use crate::gsheets::tools::credentials::extract_credentials;
use crate::gsheets::tools::dataset::DatasetSink;
use crate::gsheets::tools::dates::{mark_date_columns, row_to_cells};
use crate::gsheets::tools::error::{Result, ToolError};
use crate::gsheets::tools::logging::redact_secrets;
use crate::gsheets::tools::model::{Record, Schema, Value};
use crate::gsheets::tools::sheets::http::HttpSheetsClient;
use crate::gsheets::tools::sheets::{SheetsApi, SheetsSession, Worksheet};
use crate::gsheets::tools::slug::SlugRegistry;

/// Key of the leading field holding the worksheet title.
pub const SHEET_NAME_COLUMN: &str = "Sheet name";
/// Key of the single field emitted in `json` mode.
pub const JSON_COLUMN: &str = "json";
/// Maximum length of a column slug produced from a header cell.
pub const COLUMN_SLUG_MAX_LENGTH: usize = 25;

/// Google Sheets dataset connector.
#[derive(Debug)]
pub struct SheetsConnector<A = HttpSheetsClient> {
    session: SheetsSession<A>,
    doc_id: String,
    tab_ids: Vec<String>,
    result_format: Option<String>,
    write_format: ValueInputOption,
    lines_to_skip: usize,
    add_sheet_name_column: bool,
    append_header: bool,
    batch_size: usize,
    insertion_delay: std::time::Duration,
}

impl SheetsConnector<HttpSheetsClient> {
    /// Resolves credentials and authorizes a session against the Sheets API.
    pub fn new(config: &PluginConfig) -> Result<Self> {
        let credentials = extract_credentials(config)?;
        let session = SheetsSession::authorize(&credentials)?;
        Self::with_session(config, session)
    }
}

impl<A: SheetsApi> SheetsConnector<A> {
    pub fn with_session(config: &PluginConfig, session: SheetsSession<A>) -> Result<Self> {
        info!(
            version = env!("CARGO_PKG_VERSION"),
            config = %redact_secrets(&serde_json::to_value(config)?),
            "GoogleSheets connector starting"
        );
        let doc_id = config.require_doc_id()?.to_string();
        Ok(Self {
            session,
            doc_id,
            tab_ids: config.tab_ids(),
            result_format: config.result_format.clone(),
            write_format: config.write_format.unwrap_or_default(),
            lines_to_skip: config.lines_to_skip,
            add_sheet_name_column: config.add_sheet_name_column,
            append_header: config.append_header,
            batch_size: config.batch_size.unwrap_or(DEFAULT_BATCH_SIZE),
            insertion_delay: config.insertion_pause(),
        })
    }

    pub fn session(&self) -> &SheetsSession<A> {
        &self.session
    }

    /// Worksheets have their own, varying columns: the schema is left to the
    /// host to infer.
    pub fn read_schema(&self) -> Option<Schema> {
        None
    }

    /// The API only reports grid sizes rounded up to whole pages of rows, so
    /// an exact count is not available.
    pub fn records_count(&self) -> Result<u64> {
        Err(ToolError::Unimplemented("Count records".into()))
    }

    fn result_format(&self) -> Result<ResultFormat> {
        match self.result_format.as_deref() {
            None => Ok(ResultFormat::FirstRowHeader),
            Some(format) => format.parse(),
        }
    }

    /// Lazily yields the records of every selected worksheet, fetching one
    /// worksheet grid at a time.
    pub fn generate_rows(&self) -> Result<RowGenerator<'_, A>> {
        let format = self.result_format()?;
        let worksheets = self.session.open_worksheets(&self.doc_id, &self.tab_ids)?;
        debug!(worksheets = worksheets.len(), %format, "reading worksheets");
        Ok(RowGenerator {
            connector: self,
            format,
            worksheets: worksheets.into_iter(),
            current: Vec::new().into_iter(),
        })
    }

    fn worksheet_records(
        &self,
        format: ResultFormat,
        worksheet: &Worksheet<'_, A>,
    ) -> Result<Vec<Record>> {
        let rows: Vec<Vec<String>> = worksheet
            .get_all_values()?
            .into_iter()
            .skip(self.lines_to_skip)
            .collect();
        let title = worksheet.title();
        let sheet_name = self.add_sheet_name_column.then_some(title);

        let records = match format {
            ResultFormat::FirstRowHeader => {
                let mut rows = rows.into_iter();
                let header = rows.next().unwrap_or_default();
                let mut slugs = SlugRegistry::new(Some(COLUMN_SLUG_MAX_LENGTH));
                if sheet_name.is_some() {
                    slugs.claim(SHEET_NAME_COLUMN);
                }
                let keys: Vec<String> = header.iter().map(|name| slugs.assign(name)).collect();
                rows.map(|row| {
                    let mut record = Record::new();
                    if let Some(title) = sheet_name {
                        record.push(SHEET_NAME_COLUMN, title);
                    }
                    for (key, cell) in keys.iter().zip(row) {
                        record.push(key.clone(), cell);
                    }
                    record
                })
                .collect()
            }
            ResultFormat::NoHeader => rows
                .into_iter()
                .map(|row| {
                    let mut record = Record::new();
                    if let Some(title) = sheet_name {
                        record.push(SHEET_NAME_COLUMN, title);
                    }
                    for (idx, cell) in row.into_iter().enumerate() {
                        record.push((idx + 1).to_string(), cell);
                    }
                    record
                })
                .collect(),
            ResultFormat::Json => rows
                .into_iter()
                .map(|mut row| {
                    if let Some(title) = sheet_name {
                        row.insert(0, title.to_string());
                    }
                    let mut record = Record::new();
                    record.push(JSON_COLUMN, serde_json::to_string(&row)?);
                    Ok(record)
                })
                .collect::<Result<Vec<_>>>()?,
        };
        debug!(worksheet = title, records = records.len(), "read worksheet");
        Ok(records)
    }

    /// Opens a writer into the single selected worksheet.
    pub fn get_writer(
        &self,
        schema: &Schema,
        write_mode: WriteMode,
    ) -> Result<SheetsDatasetWriter<'_, A>> {
        let format = self.result_format()?;
        if format == ResultFormat::Json {
            return Err(ToolError::NotSupported(
                "JSON format not supported in write mode".into(),
            ));
        }
        let tab_id = match self.tab_ids.as_slice() {
            [] => {
                return Err(ToolError::Config(
                    "The name of the target sheet should be set".into(),
                ));
            }
            [tab_id] => tab_id,
            _ => {
                return Err(ToolError::Config(
                    "Only one target sheet can be selected for writing".into(),
                ));
            }
        };

        let worksheet = self.session.open_worksheet(&self.doc_id, tab_id)?;
        let date_columns = match self.write_format {
            ValueInputOption::UserEntered => {
                let columns = mark_date_columns(schema);
                info!(?columns, "columns marked for date conversion");
                columns
            }
            ValueInputOption::Raw => Vec::new(),
        };
        let header = (format == ResultFormat::FirstRowHeader).then(|| {
            schema
                .columns
                .iter()
                .map(|column| serde_json::Value::String(column.name.clone()))
                .collect::<CellRow>()
        });

        let mut writer = SheetsDatasetWriter {
            worksheet,
            write_mode,
            option: self.write_format,
            date_columns,
            batcher: AppendBatcher::new(self.batch_size, self.insertion_delay),
            buffer: Vec::new(),
            closed: false,
        };
        if let Some(header) = header {
            match write_mode {
                WriteMode::Overwrite => writer.buffer.push(header),
                WriteMode::Append if self.append_header => writer.buffer_append(header)?,
                WriteMode::Append => {}
            }
        }
        Ok(writer)
    }
}

/// Iterator over the records of the selected worksheets.
pub struct RowGenerator<'c, A> {
    connector: &'c SheetsConnector<A>,
    format: ResultFormat,
    worksheets: std::vec::IntoIter<Worksheet<'c, A>>,
    current: std::vec::IntoIter<Record>,
}

impl<A: SheetsApi> Iterator for RowGenerator<'_, A> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.current.next() {
                return Some(Ok(record));
            }
            let worksheet = self.worksheets.next()?;
            match self.connector.worksheet_records(self.format, &worksheet) {
                Ok(records) => self.current = records.into_iter(),
                Err(err) => {
                    self.worksheets = Vec::new().into_iter();
                    return Some(Err(err));
                }
            }
        }
    }
}

/// Writes dataset rows into a worksheet, appending in batches or replacing
/// the whole worksheet on close.
pub struct SheetsDatasetWriter<'c, A> {
    worksheet: Worksheet<'c, A>,
    write_mode: WriteMode,
    option: ValueInputOption,
    date_columns: Vec<usize>,
    batcher: AppendBatcher,
    buffer: Vec<CellRow>,
    closed: bool,
}

impl<A: SheetsApi> SheetsDatasetWriter<'_, A> {
    fn buffer_append(&mut self, cells: CellRow) -> Result<()> {
        let worksheet = &self.worksheet;
        let option = self.option;
        self.batcher
            .push(cells, |batch| worksheet.append_rows(&batch, option))
    }

    /// Number of append calls made so far.
    pub fn append_calls(&self) -> usize {
        self.batcher.sent_batches()
    }
}

impl<A: SheetsApi> DatasetSink for SheetsDatasetWriter<'_, A> {
    fn write_row(&mut self, row: &[Value]) -> Result<()> {
        let cells = row_to_cells(row.to_vec(), &self.date_columns, self.option);
        match self.write_mode {
            WriteMode::Append => self.buffer_append(cells),
            WriteMode::Overwrite => {
                self.buffer.push(cells);
                Ok(())
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.write_mode {
            WriteMode::Append => {
                let worksheet = &self.worksheet;
                let option = self.option;
                self.batcher
                    .flush(|batch| worksheet.append_rows(&batch, option))?;
                info!(
                    worksheet = self.worksheet.title(),
                    rows = self.batcher.sent_rows(),
                    "appended rows"
                );
            }
            WriteMode::Overwrite => {
                let rows = std::mem::take(&mut self.buffer);
                self.worksheet.overwrite(&rows, self.option)?;
                info!(worksheet = self.worksheet.title(), rows = rows.len(), "overwrote worksheet");
            }
        }
        Ok(())
    }
}
