//! Row resequencing.
//!
//! A [`SheetSort`] names a sheet, an ordered list of [`SortKey`]s and the
//! first row to sort. [`sort_sheet`] builds a [`RowComparator`] from the keys
//! and runs one of two strategies over the sheet's row-shift-only store:
//!
//! - materialize-and-replace: stable sort of row handles, staged through a
//!   scratch sheet that is removed again before returning
//! - bubble-exchange: in-place adjacent swaps, no scratch sheet
//!
//! Rows before `start_row` are never read or moved.

pub mod bubble;
pub mod compare;
pub mod materialize;
pub mod relocate;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sheet::MAX_COLS;
use crate::store::RowStore;
use crate::workbook::Workbook;

pub use bubble::bubble_exchange;
pub use compare::{compare_cells, compare_values, RowComparator};
pub use materialize::materialize_and_replace;
pub use relocate::{relocate, relocate_within, RowSnapshot};

/// Row counts at or below this use bubble-exchange under [`SortStrategy::Auto`]
pub const DEFAULT_BUBBLE_THRESHOLD: usize = 32;

// =============================================================================
// Sort requests
// =============================================================================

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One level of a multi-column sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: usize,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn new(column: usize, direction: SortDirection) -> Self {
        Self { column, direction }
    }
}

/// Sort one sheet by `keys`, leaving rows before `start_row` alone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSort {
    pub sheet_index: usize,
    pub keys: Vec<SortKey>,
    pub start_row: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortStrategy {
    /// Bubble-exchange for small ranges, materialize-and-replace otherwise
    #[default]
    Auto,
    #[serde(rename = "materialize")]
    MaterializeReplace,
    #[serde(rename = "bubble")]
    BubbleExchange,
}

impl SortStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortStrategy::Auto => "auto",
            SortStrategy::MaterializeReplace => "materialize",
            SortStrategy::BubbleExchange => "bubble",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Some(SortStrategy::Auto),
            "materialize" | "materialize-replace" => Some(SortStrategy::MaterializeReplace),
            "bubble" | "bubble-exchange" => Some(SortStrategy::BubbleExchange),
            _ => None,
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    pub strategy: SortStrategy,
    pub bubble_threshold: usize,
}

impl Default for SortOptions {
    fn default() -> Self {
        Self {
            strategy: SortStrategy::Auto,
            bubble_threshold: DEFAULT_BUBBLE_THRESHOLD,
        }
    }
}

impl SortOptions {
    /// Concrete strategy for a range of `rows` rows
    pub fn resolve(&self, rows: usize) -> SortStrategy {
        match self.strategy {
            SortStrategy::Auto if rows <= self.bubble_threshold => SortStrategy::BubbleExchange,
            SortStrategy::Auto => SortStrategy::MaterializeReplace,
            explicit => explicit,
        }
    }
}

// =============================================================================
// Results and errors
// =============================================================================

/// Progress of one resequencing call, used in trace logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Sorting,
    Materializing,
    Cleanup,
    Done,
}

/// Counters returned by both strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResequenceStats {
    /// Materialized rows at or after the start row
    pub rows_considered: usize,
    pub relocations: usize,
    pub passes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortReport {
    pub sheet_index: usize,
    pub sheet_name: String,
    /// Strategy actually run (never `Auto`)
    pub strategy: SortStrategy,
    pub rows_considered: usize,
    pub relocations: usize,
    pub passes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortError {
    NoSortKeys { sheet_index: usize },
    SheetOutOfRange { sheet_index: usize, sheet_count: usize },
    ColumnOutOfRange { sheet_index: usize, column: usize },
    ScratchSheetUnavailable { sheet_index: usize },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortError::NoSortKeys { sheet_index } => {
                write!(f, "sheet {}: at least one sort key is required", sheet_index)
            }
            SortError::SheetOutOfRange { sheet_index, sheet_count } => write!(
                f,
                "sheet index {} out of range (workbook has {} sheets)",
                sheet_index, sheet_count
            ),
            SortError::ColumnOutOfRange { sheet_index, column } => write!(
                f,
                "sheet {}: column {} out of range (max {})",
                sheet_index,
                column,
                MAX_COLS - 1
            ),
            SortError::ScratchSheetUnavailable { sheet_index } => {
                write!(f, "sheet {}: could not allocate a scratch sheet", sheet_index)
            }
        }
    }
}

impl std::error::Error for SortError {}

// =============================================================================
// Driver
// =============================================================================

/// Check a request against the workbook without touching it
pub fn validate(workbook: &Workbook, request: &SheetSort) -> Result<(), SortError> {
    let sheet_index = request.sheet_index;
    if request.keys.is_empty() {
        return Err(SortError::NoSortKeys { sheet_index });
    }
    if sheet_index >= workbook.sheet_count() {
        return Err(SortError::SheetOutOfRange {
            sheet_index,
            sheet_count: workbook.sheet_count(),
        });
    }
    if let Some(key) = request.keys.iter().find(|k| k.column >= MAX_COLS) {
        return Err(SortError::ColumnOutOfRange { sheet_index, column: key.column });
    }
    Ok(())
}

/// Sort one sheet in place.
pub fn sort_sheet(
    workbook: &mut Workbook,
    request: &SheetSort,
    options: &SortOptions,
) -> Result<SortReport, SortError> {
    log::trace!("sort: {:?}", Phase::Idle);
    validate(workbook, request)?;
    let sheet_index = request.sheet_index;
    let sheet_count = workbook.sheet_count();
    let missing = SortError::SheetOutOfRange { sheet_index, sheet_count };

    let sheet = workbook.sheet(sheet_index).ok_or_else(|| missing.clone())?;
    let sheet_name = sheet.name.clone();
    let rows = sheet.row_indices_from(request.start_row).len();
    let strategy = options.resolve(rows);
    let comparator = RowComparator::new(request.keys.clone());

    log::info!(
        "sorting sheet {} '{}' from row {} by {} key(s) using {} ({} rows)",
        sheet_index,
        sheet_name,
        request.start_row,
        request.keys.len(),
        strategy,
        rows
    );

    let stats = match strategy {
        SortStrategy::BubbleExchange | SortStrategy::Auto => {
            let sheet = workbook.sheet_mut(sheet_index).ok_or(missing)?;
            bubble_exchange(sheet, request.start_row, &comparator)
        }
        SortStrategy::MaterializeReplace => {
            let scratch_index = workbook
                .add_scratch_sheet(&sheet_name)
                .ok_or(SortError::ScratchSheetUnavailable { sheet_index })?;
            let outcome = match workbook.sheet_pair_mut(sheet_index, scratch_index) {
                Some((sheet, scratch)) => {
                    Ok(materialize_and_replace(sheet, scratch, request.start_row, &comparator))
                }
                None => Err(SortError::ScratchSheetUnavailable { sheet_index }),
            };
            log::trace!("sort: {:?} removing scratch sheet {}", Phase::Cleanup, scratch_index);
            workbook.delete_sheet(scratch_index);
            outcome?
        }
    };

    log::debug!(
        "sheet {} sorted: {} relocations over {} pass(es)",
        sheet_index,
        stats.relocations,
        stats.passes
    );
    Ok(SortReport {
        sheet_index,
        sheet_name,
        strategy,
        rows_considered: stats.rows_considered,
        relocations: stats.relocations,
        passes: stats.passes,
    })
}

/// Sort several sheets one after another. Every request is validated before
/// the first sheet is touched.
pub fn sort_workbook(
    workbook: &mut Workbook,
    requests: &[SheetSort],
    options: &SortOptions,
) -> Result<Vec<SortReport>, SortError> {
    for request in requests {
        validate(workbook, request)?;
    }
    requests
        .iter()
        .map(|request| sort_sheet(workbook, request, options))
        .collect()
}
