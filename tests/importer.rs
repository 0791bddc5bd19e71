mod common;

use std::fs;
use std::path::Path;

use common::{FakeSheets, config, session};
use gsheets_tools::dataset::Project;
use gsheets_tools::importer::{ResultTable, SheetsImporter};
use gsheets_tools::io::project::LocalProject;
use serde_json::json;
use tempfile::tempdir;

fn budget() -> FakeSheets {
    FakeSheets::new("Budget")
        .with_sheet("Q1", &[&["item", "cost"], &["rent", "900"]])
        .with_sheet("Q2", &[&["item", "cost"], &["food", "250"], &["gas", "80"]])
}

fn import(root: &Path, extra: serde_json::Value) -> (ResultTable, usize) {
    let session = session(budget());
    let mut project = LocalProject::open(root, "PROJ").expect("project opened");
    let table = SheetsImporter::new(&config(extra), &session, &mut project)
        .expect("importer built")
        .run()
        .expect("import ran");
    (table, session.api().value_reads())
}

#[test]
fn first_import_creates_zone_and_datasets() {
    let dir = tempdir().expect("temporary directory");
    let (table, reads) = import(dir.path(), json!({}));

    assert_eq!(
        table.lines(),
        vec![
            "Creating zone Budget",
            "Adding dataset Budget_Q1 to the flow",
            "Adding dataset Budget_Q2 to the flow",
        ]
    );
    assert_eq!(reads, 2);

    let project = LocalProject::open(dir.path(), "PROJ").expect("project reopened");
    let zones = project.list_zones().expect("zones listed");
    assert_eq!(zones.len(), 1);
    assert_eq!(zones[0].name, "Budget");
    let datasets = &project.manifest().datasets;
    assert_eq!(datasets.len(), 2);
    assert!(datasets.iter().all(|entry| entry.managed));
    assert!(
        datasets
            .iter()
            .all(|entry| entry.zone.as_deref() == Some(zones[0].id.as_str()))
    );
    assert_eq!(datasets[0].spec.params["path"], "PROJ/Budget_Q1");

    let data = fs::read_to_string(project.data_path("Budget_Q2").expect("data path"))
        .expect("data file read");
    assert_eq!(data, "item\tcost\nfood\t250\ngas\t80\n");
}

#[test]
fn skip_mode_leaves_existing_datasets_alone() {
    let dir = tempdir().expect("temporary directory");
    import(dir.path(), json!({}));
    let (table, reads) = import(dir.path(), json!({"creation_mode": "skip"}));

    assert_eq!(
        table.lines(),
        vec![
            "Skipping sheet Q1: dataset Budget_Q1 already exists",
            "Skipping sheet Q2: dataset Budget_Q2 already exists",
        ]
    );
    assert_eq!(reads, 0);
}

#[test]
fn update_mode_rewrites_existing_datasets() {
    let dir = tempdir().expect("temporary directory");
    import(dir.path(), json!({}));
    let (table, reads) = import(dir.path(), json!({"creation_mode": "update-existing"}));

    assert_eq!(
        table.lines(),
        vec!["Updating dataset Budget_Q1", "Updating dataset Budget_Q2"]
    );
    assert_eq!(reads, 2);
    let project = LocalProject::open(dir.path(), "PROJ").expect("project reopened");
    assert_eq!(project.manifest().datasets.len(), 2);
}

#[test]
fn create_new_mode_picks_the_next_free_name_and_reuses_the_zone() {
    let dir = tempdir().expect("temporary directory");
    import(dir.path(), json!({}));
    let (table, _) = import(dir.path(), json!({"creation_mode": "create-new", "tab_id": "Q1"}));

    assert_eq!(table.lines(), vec!["Adding dataset Budget_Q1_1 to the flow"]);
    let project = LocalProject::open(dir.path(), "PROJ").expect("project reopened");
    assert_eq!(project.list_zones().expect("zones listed").len(), 1);
    let names = project.list_dataset_names().expect("names listed");
    assert_eq!(names, vec!["Budget_Q1", "Budget_Q2", "Budget_Q1_1"]);
}

#[test]
fn dry_run_reports_without_touching_anything() {
    let dir = tempdir().expect("temporary directory");
    let (table, reads) = import(dir.path(), json!({"is_dry_run": true}));

    assert_eq!(
        table.lines(),
        vec![
            "[dry run] Creating zone Budget",
            "[dry run] Adding dataset Budget_Q1 to the flow",
            "[dry run] Adding dataset Budget_Q2 to the flow",
        ]
    );
    assert_eq!(reads, 0);
    let project = LocalProject::open(dir.path(), "PROJ").expect("project reopened");
    assert!(project.manifest().datasets.is_empty());
    assert!(project.manifest().zones.is_empty());
}

#[test]
fn selected_tabs_limit_the_import() {
    let dir = tempdir().expect("temporary directory");
    let (table, reads) = import(dir.path(), json!({"tabs_ids": ["Q2"]}));

    assert_eq!(
        table.lines(),
        vec!["Creating zone Budget", "Adding dataset Budget_Q2 to the flow"]
    );
    assert_eq!(reads, 1);
}

#[test]
fn result_table_serialises_with_action_column() {
    let dir = tempdir().expect("temporary directory");
    let (table, _) = import(dir.path(), json!({"tab_id": "Q1"}));
    let value = serde_json::to_value(&table).expect("table serialised");
    assert_eq!(
        value["columns"],
        json!([{"name": "actions", "label": "Actions", "type": "STRING"}])
    );
    assert_eq!(value["records"][0][0], "Creating zone Budget");
}
