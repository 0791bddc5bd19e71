//! One-shot runnable importing every worksheet of a spreadsheet as a
//! dataset of the current project.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::gsheets::tools::config::{CreationMode, PluginConfig};
use crate::gsheets::tools::dataset::{DatasetSpec, Project, write_scoped};
use crate::gsheets::tools::error::Result;
use crate::gsheets::tools::model::{Schema, Value};
use crate::gsheets::tools::sheets::{SheetsApi, SheetsSession, Worksheet};
use crate::gsheets::tools::slug::unique_slugs;

/// Zone name used when the spreadsheet has no title.
pub const NAMELESS_SPREADSHEET: &str = "Nameless spreadsheet";

const DRY_RUN_PREFIX: &str = "[dry run] ";

/// Column definition of a [`ResultTable`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultColumn {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub column_type: String,
}

/// Tabular report returned to the user by the runnable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResultTable {
    pub columns: Vec<ResultColumn>,
    pub records: Vec<Vec<String>>,
}

impl ResultTable {
    /// Single-column table listing the actions taken.
    pub fn actions() -> Self {
        Self {
            columns: vec![ResultColumn {
                name: "actions".into(),
                label: "Actions".into(),
                column_type: "STRING".into(),
            }],
            records: Vec::new(),
        }
    }

    pub fn add_record(&mut self, record: Vec<String>) {
        self.records.push(record);
    }

    /// First cell of every record.
    pub fn lines(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter_map(|record| record.first().map(String::as_str))
            .collect()
    }
}

/// What happens to one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Plan {
    Create(String),
    Update(String),
    Skip(String),
}

/// Imports worksheets into a project according to the creation policy.
pub struct SheetsImporter<'a, A, P: ?Sized> {
    session: &'a SheetsSession<A>,
    project: &'a mut P,
    doc_id: String,
    tab_ids: Vec<String>,
    creation_mode: CreationMode,
    dry_run: bool,
}

impl<'a, A: SheetsApi, P: Project + ?Sized> SheetsImporter<'a, A, P> {
    pub fn new(
        config: &PluginConfig,
        session: &'a SheetsSession<A>,
        project: &'a mut P,
    ) -> Result<Self> {
        Ok(Self {
            session,
            project,
            doc_id: config.require_doc_id()?.to_string(),
            tab_ids: config.tab_ids(),
            creation_mode: config.creation_mode.unwrap_or_default(),
            dry_run: config.is_dry_run,
        })
    }

    /// Runs the import and reports every decision. In dry-run mode nothing is
    /// created or written and no worksheet values are fetched.
    pub fn run(&mut self) -> Result<ResultTable> {
        let session = self.session;
        let worksheets = session.open_worksheets(&self.doc_id, &[])?;
        let mut spreadsheet_title = session.spreadsheet_title(&self.doc_id)?;
        if spreadsheet_title.is_empty() {
            spreadsheet_title = NAMELESS_SPREADSHEET.to_string();
        }
        info!(
            spreadsheet = %spreadsheet_title,
            worksheets = worksheets.len(),
            dry_run = self.dry_run,
            "importing spreadsheet"
        );

        let candidates: Vec<String> = worksheets
            .iter()
            .map(|worksheet| format!("{spreadsheet_title}_{}", worksheet.title()))
            .collect();
        let dataset_names = unique_slugs(&candidates, None);

        let mut taken: HashSet<String> = self.project.list_dataset_names()?.into_iter().collect();
        let mut reserved: HashSet<String> = taken.clone();
        reserved.extend(dataset_names.iter().cloned());

        let mut zone_id = self
            .project
            .list_zones()?
            .into_iter()
            .find(|zone| zone.name == spreadsheet_title)
            .map(|zone| zone.id);
        let mut zone_reported = false;

        let mut table = ResultTable::actions();
        for (worksheet, name) in worksheets.iter().zip(dataset_names) {
            if !self.tab_ids.is_empty()
                && !self.tab_ids.iter().any(|tab| tab == worksheet.title())
            {
                continue;
            }

            let plan = self.plan(name, &taken, &mut reserved);
            debug!(worksheet = worksheet.title(), ?plan, "planned worksheet import");
            match plan {
                Plan::Skip(name) => {
                    self.report(
                        &mut table,
                        format!(
                            "Skipping sheet {}: dataset {name} already exists",
                            worksheet.title()
                        ),
                    );
                }
                Plan::Update(name) => {
                    if !self.dry_run {
                        self.project.set_managed(&name)?;
                        self.write_dataset(worksheet, &name)?;
                    }
                    self.report(&mut table, format!("Updating dataset {name}"));
                }
                Plan::Create(name) => {
                    if zone_id.is_none() && !zone_reported {
                        if !self.dry_run {
                            zone_id = Some(self.project.create_zone(&spreadsheet_title)?.id);
                        }
                        self.report(&mut table, format!("Creating zone {spreadsheet_title}"));
                        zone_reported = true;
                    }
                    if !self.dry_run {
                        let spec = DatasetSpec::filesystem_tsv(self.project.project_key(), &name);
                        self.project.create_dataset(&spec)?;
                        if let Some(zone_id) = &zone_id {
                            self.project.move_to_zone(&name, zone_id)?;
                        }
                        self.project.set_managed(&name)?;
                        self.write_dataset(worksheet, &name)?;
                    }
                    self.report(&mut table, format!("Adding dataset {name} to the flow"));
                    taken.insert(name);
                }
            }
        }
        Ok(table)
    }

    fn plan(&self, name: String, taken: &HashSet<String>, reserved: &mut HashSet<String>) -> Plan {
        if !taken.contains(&name) {
            return Plan::Create(name);
        }
        match self.creation_mode {
            CreationMode::Skip => Plan::Skip(name),
            CreationMode::UpdateExisting => Plan::Update(name),
            CreationMode::CreateNew => {
                let mut counter = 1;
                loop {
                    let candidate = format!("{name}_{counter}");
                    if reserved.insert(candidate.clone()) {
                        return Plan::Create(candidate);
                    }
                    counter += 1;
                }
            }
        }
    }

    fn report(&self, table: &mut ResultTable, line: String) {
        let line = if self.dry_run {
            format!("{DRY_RUN_PREFIX}{line}")
        } else {
            line
        };
        info!("{line}");
        table.add_record(vec![line]);
    }

    /// Writes the worksheet into the dataset: header row as `string` schema,
    /// remaining rows as data.
    fn write_dataset(&mut self, worksheet: &Worksheet<'_, A>, name: &str) -> Result<()> {
        let mut rows = worksheet.get_all_values()?.into_iter();
        let schema = Schema::of_strings(rows.next().unwrap_or_default());
        let mut writer = self.project.dataset_writer(name, &schema)?;
        let written = write_scoped(&mut writer, |writer| {
            let mut written = 0usize;
            for row in rows {
                let values: Vec<Value> = row.into_iter().map(Value::String).collect();
                writer.write_row(&values)?;
                written += 1;
            }
            Ok(written)
        })?;
        debug!(dataset = name, rows = written, "wrote dataset");
        Ok(())
    }
}
