// sheetsort - resequence worksheet rows by column sort keys

use std::path::{Path, PathBuf};

use clap::error::ErrorKind as ClapErrorKind;
use clap::{Parser, ValueEnum};
use sheetsort_cli::exit_codes::{
    exit_code_name, EXIT_ARGS_FAILURE, EXIT_CHECKED_FAILURE, EXIT_RUNTIME_FAILURE, EXIT_SUCCESS,
};
use sheetsort_cli::logging::init_file_logging;
use sheetsort_cli::spec_arg::parse_sheet_sort;
use sheetsort_config::Settings;
use sheetsort_engine::diff::{diff_workbooks, DiffCallback, LoggingDiffCallback};
use sheetsort_engine::sort::{sort_workbook, SheetSort, SortError, SortOptions, SortStrategy};
use sheetsort_io::xlsx;

const INSTRUCTIONS: &str = "\
LOG_FILE: The name of the log file to use, created under <root-dir>/logs/.
WORKBOOK: The path to the Excel workbook you want to sort.
SHEET_SORT: The sheet to sort, the columns to sort by and the first row to sort.
    Each sheet sort argument has the following format:
    [Sheet Index:{Column Index!A (Ascending) or D (Descending),...}:Start Row Index]
        Sort the first sheet by the first column ascending and the second column
        descending, starting at row 1:
        [0:{0!A,1!D}:1]
        Sort the second sheet by the first column ascending, starting at row 2:
        [1:{0!A}:2]
        Sort the fourth sheet by columns 0 (ascending), 1 (descending) and 4
        (ascending), starting at row 0:
        [3:{0!A,1!D,4!A}:0]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    /// Bubble-exchange for small ranges, materialize-and-replace otherwise
    Auto,
    /// Sort through a scratch sheet
    Materialize,
    /// Swap adjacent rows in place
    Bubble,
}

impl From<StrategyArg> for SortStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Auto => SortStrategy::Auto,
            StrategyArg::Materialize => SortStrategy::MaterializeReplace,
            StrategyArg::Bubble => SortStrategy::BubbleExchange,
        }
    }
}

#[derive(Parser)]
#[command(name = "sheetsort")]
#[command(about = "Resequence worksheet rows by column sort keys")]
#[command(version)]
#[command(after_help = INSTRUCTIONS)]
struct Cli {
    /// Log file name (written to <root-dir>/logs/)
    log_file: String,

    /// Workbook to sort
    workbook: PathBuf,

    /// One or more sheet sorts: [sheet:{col!A|D,...}:startRow]
    #[arg(required = true, value_name = "SHEET_SORT")]
    sheet_sorts: Vec<String>,

    /// Resequencing strategy
    #[arg(long, value_enum, env = "SHEETSORT_STRATEGY")]
    strategy: Option<StrategyArg>,

    /// Largest row count that auto sorts with bubble-exchange
    #[arg(long, value_name = "ROWS")]
    bubble_threshold: Option<usize>,

    /// Output file (default: sorted_<name> next to the workbook)
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Directory holding logs/ (default: current directory)
    #[arg(long, env = "SHEETSORT_ROOT_DIR")]
    root_dir: Option<PathBuf>,

    /// Settings file (default: <config dir>/sheetsort/settings.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Diff the original against the sorted workbook and print every change
    #[arg(long)]
    report_diff: bool,
}

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn args(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ARGS_FAILURE, message: msg.into(), hint: None }
    }

    pub fn runtime(msg: impl Into<String>) -> Self {
        Self { code: EXIT_RUNTIME_FAILURE, message: msg.into(), hint: None }
    }

    pub fn checked(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CHECKED_FAILURE, message: msg.into(), hint: None }
    }

    /// Requests that do not fit the workbook are argument failures; a sort
    /// that breaks down midway is a runtime failure.
    pub fn sort(err: SortError) -> Self {
        match err {
            SortError::ScratchSheetUnavailable { .. } => Self::runtime(err.to_string()),
            SortError::SheetOutOfRange { sheet_count, .. } => Self::args(err.to_string())
                .with_hint(format!("the workbook has {} sheet(s), indexed from 0", sheet_count)),
            SortError::NoSortKeys { .. } | SortError::ColumnOutOfRange { .. } => {
                Self::args(err.to_string())
            }
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn main() {
    let code = match Cli::try_parse() {
        Ok(cli) => match run(cli) {
            Ok(()) => EXIT_SUCCESS,
            Err(err) => report(err),
        },
        Err(e) if matches!(e.kind(), ClapErrorKind::DisplayHelp | ClapErrorKind::DisplayVersion) => {
            let _ = e.print();
            EXIT_SUCCESS
        }
        Err(e) => report(CliError::args(e.to_string().trim_end().trim_start_matches("error: "))),
    };

    log::logger().flush();
    std::process::exit(code);
}

fn report(err: CliError) -> i32 {
    let CliError { code, message, hint } = err;
    log::error!("{} ({}): {}", exit_code_name(code), code, message);

    match code {
        EXIT_ARGS_FAILURE => {
            println!("Unable to process the arguments.");
            println!("{}", INSTRUCTIONS);
        }
        EXIT_RUNTIME_FAILURE => println!("An unexpected runtime failure occurred."),
        _ => {}
    }
    if !message.is_empty() {
        eprintln!("error: {}", message);
    }
    if let Some(hint) = hint {
        eprintln!("hint:  {}", hint);
    }
    code
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let settings = Settings::load_from(&config_path).map_err(|e| CliError::checked(e.to_string()))?;

    let root = cli.root_dir.clone().unwrap_or_else(|| settings.effective_log_root());
    let log_path = init_file_logging(&root, &cli.log_file).map_err(|e| {
        CliError::checked(e.to_string()).with_hint("check --root-dir or SHEETSORT_ROOT_DIR")
    })?;
    log::debug!("logging to {}", log_path.display());

    let requests = cli
        .sheet_sorts
        .iter()
        .map(|arg| parse_sheet_sort(arg))
        .collect::<Result<Vec<SheetSort>, _>>()
        .map_err(|e| CliError::args(e.to_string()))?;

    let options = SortOptions {
        strategy: cli.strategy.map(SortStrategy::from).unwrap_or(settings.strategy),
        bubble_threshold: cli.bubble_threshold.unwrap_or(settings.bubble_threshold),
    };

    let (mut workbook, import_report) =
        xlsx::import(&cli.workbook).map_err(|e| CliError::runtime(e.to_string()))?;
    for warning in &import_report.warnings {
        log::warn!("{}", warning);
    }

    let original = cli.report_diff.then(|| workbook.clone());

    let reports = sort_workbook(&mut workbook, &requests, &options).map_err(CliError::sort)?;
    for r in &reports {
        log::info!(
            "sorted sheet {} '{}' with {}: {} rows, {} relocations, {} passes",
            r.sheet_index,
            r.sheet_name,
            r.strategy,
            r.rows_considered,
            r.relocations,
            r.passes
        );
    }

    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| xlsx::output_path_with_prefix(&cli.workbook, &settings.output_prefix));
    let export_report = xlsx::export(&workbook, &output).map_err(|e| CliError::runtime(e.to_string()))?;
    for warning in &export_report.warnings {
        log::warn!("{}", warning);
    }

    if let Some(original) = original {
        report_diff(&original, &workbook, &cli.workbook, &output);
    }

    println!("Sorted {} sheet(s) into {}", reports.len(), output.display());
    Ok(())
}

fn report_diff(
    original: &sheetsort_engine::workbook::Workbook,
    sorted: &sheetsort_engine::workbook::Workbook,
    input: &Path,
    output: &Path,
) {
    let mut callback = LoggingDiffCallback::new().with_echo(true);
    callback.init(&input.display().to_string(), &output.display().to_string());
    diff_workbooks(original, sorted, &mut callback);
}
