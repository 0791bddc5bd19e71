use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use gsheets_tools::config::{PluginConfig, WriteMode};
use gsheets_tools::recipe::RecipeKind;
use gsheets_tools::{Result, ToolError, logging, sync};
use serde_json::Value;
use tracing::info;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    logging::init(cli.verbose)?;
    match cli.command {
        Command::Read(args) => execute_read(args),
        Command::Write(args) => execute_write(args),
        Command::Append(args) => execute_recipe(RecipeKind::LegacyAppend, args),
        Command::Export(args) => execute_recipe(RecipeKind::Batched, args),
        Command::Import(args) => execute_import(args),
        Command::BrowseTabs(args) => execute_browse(args),
    }
}

fn execute_read(args: ReadArgs) -> Result<()> {
    let config = PluginConfig::load(&args.config)?;
    let rows = sync::sheets_to_dataset(&config, &args.output)?;
    info!(rows, output = %args.output.display(), "dataset written");
    Ok(())
}

fn execute_write(args: WriteArgs) -> Result<()> {
    require_input(&args.input)?;
    let config = PluginConfig::load(&args.config)?;
    let mode = args
        .mode
        .map(WriteMode::from)
        .or(config.write_mode)
        .unwrap_or_default();
    sync::dataset_to_sheets(&config, &args.input, mode)?;
    Ok(())
}

fn execute_recipe(kind: RecipeKind, args: RecipeArgs) -> Result<()> {
    require_input(&args.input)?;
    let mut config = PluginConfig::load(&args.config)?;
    if let Some(mode) = args.mode {
        config.write_mode = Some(mode.into());
    }
    let report = sync::run_recipe(kind, &config, &args.input, &args.output)?;
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "rows": report.rows,
        "append_calls": report.append_calls,
    }))?);
    Ok(())
}

fn execute_import(args: ImportArgs) -> Result<()> {
    let mut config = PluginConfig::load(&args.config)?;
    if args.dry_run {
        config.is_dry_run = true;
    }
    let table = sync::import_into_project(&config, &args.project, &args.project_key)?;
    println!("{}", serde_json::to_string_pretty(&table)?);
    Ok(())
}

fn execute_browse(args: BrowseArgs) -> Result<()> {
    let config = load_json(&args.config)?;
    let payload = match &args.payload {
        Some(path) => load_json(path)?,
        None => serde_json::json!({ "parameterName": "tabs_ids", "rootModel": config }),
    };
    let choices = sync::browse_tabs(&payload, &config);
    println!("{}", serde_json::to_string_pretty(&choices)?);
    Ok(())
}

fn require_input(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(ToolError::MissingInput(path.to_path_buf()));
    }
    Ok(())
}

fn load_json(path: &PathBuf) -> Result<Value> {
    require_input(path)?;
    let data = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Move tabular data between local datasets and Google Sheets."
)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read the selected worksheets into a local dataset.
    Read(ReadArgs),
    /// Write a local dataset into the selected worksheet.
    Write(WriteArgs),
    /// Append a dataset to a worksheet in fixed batches, mirroring rows to an
    /// output dataset.
    Append(RecipeArgs),
    /// Same as `append` with configurable batches and a single-call overwrite.
    Export(RecipeArgs),
    /// Import every worksheet as a dataset of a local project.
    Import(ImportArgs),
    /// List the worksheet titles for the tab selector.
    BrowseTabs(BrowseArgs),
}

#[derive(clap::Args)]
struct ReadArgs {
    /// Configuration file (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Output dataset path (.tsv or .xlsx).
    #[arg(long)]
    output: PathBuf,
}

#[derive(clap::Args)]
struct WriteArgs {
    /// Configuration file (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Input dataset path (.tsv or .xlsx).
    #[arg(long)]
    input: PathBuf,

    /// Overrides the configured write mode.
    #[arg(long, value_enum)]
    mode: Option<ModeKind>,
}

#[derive(clap::Args)]
struct RecipeArgs {
    /// Configuration file (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Input dataset path (.tsv or .xlsx).
    #[arg(long)]
    input: PathBuf,

    /// Output dataset receiving a copy of every row.
    #[arg(long)]
    output: PathBuf,

    /// Overrides the configured write mode.
    #[arg(long, value_enum)]
    mode: Option<ModeKind>,
}

#[derive(clap::Args)]
struct ImportArgs {
    /// Configuration file (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Project directory holding the manifest and datasets.
    #[arg(long)]
    project: PathBuf,

    /// Key of the project, used in dataset paths.
    #[arg(long, default_value = "PROJECT")]
    project_key: String,

    /// Report what would happen without touching the project.
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Args)]
struct BrowseArgs {
    /// Configuration file (JSON).
    #[arg(long)]
    config: PathBuf,

    /// Form payload with `parameterName` and `rootModel`. Defaults to a tab
    /// request against the configuration itself.
    #[arg(long)]
    payload: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeKind {
    Append,
    Overwrite,
}

impl From<ModeKind> for WriteMode {
    fn from(kind: ModeKind) -> Self {
        match kind {
            ModeKind::Append => WriteMode::Append,
            ModeKind::Overwrite => WriteMode::Overwrite,
        }
    }
}
