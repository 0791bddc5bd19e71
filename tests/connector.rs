mod common;

use chrono::{TimeZone, Utc};
use common::{Call, FakeSheets, config, session};
use gsheets_tools::ToolError;
use gsheets_tools::config::{ValueInputOption, WriteMode};
use gsheets_tools::connector::{SHEET_NAME_COLUMN, SheetsConnector};
use gsheets_tools::dataset::{DatasetSink, write_scoped};
use gsheets_tools::model::{Column, ColumnType, Record, Schema, Value};
use serde_json::json;

fn people() -> FakeSheets {
    FakeSheets::new("Staff").with_sheet(
        "People",
        &[
            &["Name", "Age"],
            &["Ann", "30"],
            &["Bob", "41"],
            &["Cy", "5"],
        ],
    )
}

fn read_all(connector: &SheetsConnector<FakeSheets>) -> Vec<Record> {
    connector
        .generate_rows()
        .expect("rows generated")
        .collect::<gsheets_tools::Result<Vec<_>>>()
        .expect("records read")
}

#[test]
fn first_row_header_reads_one_record_per_data_row() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People", "add_sheet_name_column": true})),
        session(people()),
    )
    .expect("connector built");

    let records = read_all(&connector);
    assert_eq!(records.len(), 3);
    let first = &records[0];
    assert_eq!(first.len(), 3);
    assert_eq!(
        first.keys().collect::<Vec<_>>(),
        vec![SHEET_NAME_COLUMN, "Name", "Age"]
    );
    assert_eq!(first.get(SHEET_NAME_COLUMN), Some(&Value::from("People")));
    assert_eq!(records[2].get("Age"), Some(&Value::from("5")));
}

#[test]
fn header_cells_are_slugged_and_deduplicated() {
    let api = FakeSheets::new("Doc").with_sheet(
        "Raw",
        &[
            &["Total (€)", "Total (€)", "", "Sheet name"],
            &["1", "2", "3", "4"],
        ],
    );
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "Raw", "add_sheet_name_column": true})),
        session(api),
    )
    .expect("connector built");

    let records = read_all(&connector);
    assert_eq!(
        records[0].keys().collect::<Vec<_>>(),
        vec![SHEET_NAME_COLUMN, "Total_EUR", "Total_EUR_1", "none", "Sheet_name"]
    );
}

#[test]
fn lines_to_skip_drops_leading_rows_before_the_header() {
    let api = FakeSheets::new("Doc").with_sheet(
        "Report",
        &[&["Quarterly report", ""], &["City", "Count"], &["Oslo", "3"]],
    );
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "Report", "lines_to_skip": 1})),
        session(api),
    )
    .expect("connector built");

    let records = read_all(&connector);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].get("City"), Some(&Value::from("Oslo")));
}

#[test]
fn no_header_keys_are_column_positions() {
    let connector = SheetsConnector::with_session(
        &config(json!({
            "tab_id": "People",
            "result_format": "no-header",
            "add_sheet_name_column": true
        })),
        session(people()),
    )
    .expect("connector built");

    let records = read_all(&connector);
    assert_eq!(records.len(), 4);
    assert_eq!(
        records[0].keys().collect::<Vec<_>>(),
        vec![SHEET_NAME_COLUMN, "1", "2"]
    );
    assert_eq!(records[0].get("1"), Some(&Value::from("Name")));
}

#[test]
fn json_format_serialises_each_row() {
    let connector = SheetsConnector::with_session(
        &config(json!({
            "tab_id": "People",
            "result_format": "json",
            "add_sheet_name_column": true
        })),
        session(people()),
    )
    .expect("connector built");

    let records = read_all(&connector);
    assert_eq!(records.len(), 4);
    assert_eq!(
        records[1].get("json"),
        Some(&Value::from(r#"["People","Ann","30"]"#))
    );
}

#[test]
fn reads_every_selected_worksheet_in_tab_order() {
    let api = people()
        .with_sheet("Pets", &[&["Name"], &["Rex"]])
        .with_sheet("Ignored", &[&["Name"], &["Nope"]]);
    let connector = SheetsConnector::with_session(
        &config(json!({"tabs_ids": ["Pets", "People"]})),
        session(api),
    )
    .expect("connector built");

    let records = read_all(&connector);
    let names: Vec<_> = records
        .iter()
        .filter_map(|record| record.get("Name").cloned())
        .collect();
    assert_eq!(
        names,
        vec![
            Value::from("Ann"),
            Value::from("Bob"),
            Value::from("Cy"),
            Value::from("Rex")
        ]
    );
}

#[test]
fn unknown_result_format_is_unimplemented() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People", "result_format": "xml"})),
        session(people()),
    )
    .expect("connector built");

    let err = connector.generate_rows().err().expect("format rejected");
    assert!(matches!(err, ToolError::Unimplemented(_)));
}

#[test]
fn records_count_and_schema_are_not_provided() {
    let connector = SheetsConnector::with_session(&config(json!({})), session(people()))
        .expect("connector built");
    assert!(connector.read_schema().is_none());
    assert!(matches!(
        connector.records_count(),
        Err(ToolError::Unimplemented(_))
    ));
}

#[test]
fn missing_document_id_is_rejected() {
    let mut config = config(json!({}));
    config.doc_id = None;
    let err = SheetsConnector::with_session(&config, session(people()))
        .err()
        .expect("config rejected");
    assert_eq!(err.to_string(), "The document id is not provided");
}

fn two_columns() -> Schema {
    Schema::of_strings(["city", "count"])
}

#[test]
fn append_mode_batches_rows_without_header() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People", "batch_size": 2})),
        session(people()),
    )
    .expect("connector built");

    let mut writer = connector
        .get_writer(&two_columns(), WriteMode::Append)
        .expect("writer opened");
    write_scoped(&mut writer, |writer| {
        for city in ["Oslo", "Rome", "Lima"] {
            writer.write_row(&[Value::from(city), Value::Integer(1)])?;
        }
        Ok(())
    })
    .expect("rows written");
    assert_eq!(writer.append_calls(), 2);

    let appends = connector.session().api().appends();
    assert_eq!(appends.len(), 2);
    assert_eq!(appends[0][0], vec![json!("Oslo"), json!(1)]);
    assert_eq!(appends[1], vec![vec![json!("Lima"), json!(1)]]);
}

#[test]
fn append_header_sends_header_with_first_batch() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People", "append_header": true})),
        session(people()),
    )
    .expect("connector built");

    let mut writer = connector
        .get_writer(&two_columns(), WriteMode::Append)
        .expect("writer opened");
    writer
        .write_row(&[Value::from("Oslo"), Value::Integer(3)])
        .expect("row written");
    writer.close().expect("writer closed");
    writer.close().expect("second close is a no-op");

    let appends = connector.session().api().appends();
    assert_eq!(
        appends,
        vec![vec![
            vec![json!("city"), json!("count")],
            vec![json!("Oslo"), json!(3)]
        ]]
    );
}

#[test]
fn overwrite_mode_resizes_and_writes_in_one_call() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People"})),
        session(people()),
    )
    .expect("connector built");

    let mut writer = connector
        .get_writer(&two_columns(), WriteMode::Overwrite)
        .expect("writer opened");
    write_scoped(&mut writer, |writer| {
        writer.write_row(&[Value::from("Oslo"), Value::Integer(3)])?;
        writer.write_row(&[Value::from("Rome"), Value::Null])
    })
    .expect("rows written");

    let calls = connector.session().api().calls();
    let writes: Vec<_> = calls
        .into_iter()
        .filter(|call| !matches!(call, Call::Spreadsheet))
        .collect();
    assert_eq!(
        writes,
        vec![
            Call::Clear("'People'".into()),
            Call::Resize {
                sheet_id: 100,
                rows: 3,
                columns: 2
            },
            Call::Update {
                range: "'People'!A1:B3".into(),
                rows: vec![
                    vec![json!("city"), json!("count")],
                    vec![json!("Oslo"), json!(3)],
                    vec![json!("Rome"), json!("")],
                ],
                option: ValueInputOption::Raw,
            },
        ]
    );
}

#[test]
fn user_entered_mode_rewrites_date_columns() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People", "write_format": "USER_ENTERED"})),
        session(people()),
    )
    .expect("connector built");
    let schema = Schema::new(vec![
        Column::string("event"),
        Column::new("at", ColumnType::Date),
    ]);
    let at = Utc
        .with_ymd_and_hms(2024, 3, 9, 14, 5, 0)
        .single()
        .expect("valid timestamp");

    let mut writer = connector
        .get_writer(&schema, WriteMode::Append)
        .expect("writer opened");
    writer
        .write_row(&[Value::from("launch"), Value::Date(at)])
        .expect("row written");
    writer.close().expect("writer closed");

    let calls = connector.session().api().calls();
    let Some(Call::Append { rows, option, .. }) = calls.last() else {
        panic!("expected an append call, got {calls:?}");
    };
    assert_eq!(*option, ValueInputOption::UserEntered);
    assert_eq!(rows[0], vec![json!("launch"), json!("2024-03-09 14:05:00")]);
}

#[test]
fn raw_mode_keeps_iso_timestamps() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People"})),
        session(people()),
    )
    .expect("connector built");
    let schema = Schema::new(vec![Column::new("at", ColumnType::Date)]);
    let at = Utc
        .with_ymd_and_hms(2024, 3, 9, 14, 5, 0)
        .single()
        .expect("valid timestamp");

    let mut writer = connector
        .get_writer(&schema, WriteMode::Append)
        .expect("writer opened");
    writer.write_row(&[Value::Date(at)]).expect("row written");
    writer.close().expect("writer closed");

    let appends = connector.session().api().appends();
    assert_eq!(appends[0][0], vec![json!("2024-03-09T14:05:00.000Z")]);
}

#[test]
fn writer_requires_exactly_one_target_sheet() {
    let none = SheetsConnector::with_session(&config(json!({})), session(people()))
        .expect("connector built");
    let err = none
        .get_writer(&two_columns(), WriteMode::Append)
        .err()
        .expect("no target rejected");
    assert_eq!(err.to_string(), "The name of the target sheet should be set");

    let many = SheetsConnector::with_session(
        &config(json!({"tabs_ids": ["People", "Other"]})),
        session(people()),
    )
    .expect("connector built");
    let err = many
        .get_writer(&two_columns(), WriteMode::Append)
        .err()
        .expect("several targets rejected");
    assert_eq!(err.to_string(), "Only one target sheet can be selected for writing");
}

#[test]
fn json_format_cannot_be_written() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "People", "result_format": "json"})),
        session(people()),
    )
    .expect("connector built");
    let err = connector
        .get_writer(&two_columns(), WriteMode::Append)
        .err()
        .expect("json rejected");
    assert_eq!(err.to_string(), "JSON format not supported in write mode");
}

#[test]
fn missing_worksheet_is_reported_with_its_name() {
    let connector = SheetsConnector::with_session(
        &config(json!({"tab_id": "Nope"})),
        session(people()),
    )
    .expect("connector built");
    let err = connector
        .get_writer(&two_columns(), WriteMode::Append)
        .err()
        .expect("missing sheet rejected");
    assert_eq!(
        err.to_string(),
        "Trying to open non-existent sheet. Verify that the sheet name exists (Nope)."
    );
}
