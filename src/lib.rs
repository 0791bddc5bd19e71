//! Core library for the gsheets-tools command line application.
//!
//! The library moves tabular data between datasets and Google Sheets
//! documents. Spreadsheet access sits behind the [`sheets::SheetsApi`] seam
//! under [`gsheets::tools::sheets`], platform-side datasets and projects
//! behind the traits of [`gsheets::tools::dataset`] with local file-backed
//! implementations in [`gsheets::tools::io`]. The connector, recipes,
//! importer and tab picker orchestrate the two sides, and
//! [`gsheets::tools::sync`] wires them to file paths for the CLI.

pub mod gsheets;

pub use gsheets::tools::{
    Result, ToolError, batch, browse, config, connector, credentials, dataset, dates, error,
    importer, io, logging, model, recipe, sheets, slug, sync,
};
