//! Cell-level workbook comparison.
//!
//! [`diff_workbooks`] pairs sheets by index and reports every cell that holds
//! a value on one side only, or different values on both sides, to a
//! [`DiffCallback`]. [`LoggingDiffCallback`] aggregates those events and logs
//! them under the `display` target.

use std::collections::HashSet;
use std::fmt;

use crate::cell::CellValue;
use crate::sheet::{col_to_letters, Sheet};
use crate::workbook::Workbook;

/// Log target for diff events
pub const DISPLAY_TARGET: &str = "display";

/// A cell location plus the value shown there
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellPos {
    pub sheet_name: String,
    pub row: usize,
    pub col: usize,
    pub value: String,
}

impl CellPos {
    /// `Sheet!B3` style address (1-based row)
    pub fn address(&self) -> String {
        format!("{}!{}{}", self.sheet_name, col_to_letters(self.col), self.row + 1)
    }
}

pub trait DiffCallback {
    fn init(&mut self, _file1: &str, _file2: &str) {}

    /// Cell with a value in only one workbook; `in_first` names which
    fn report_extra_cell(&mut self, in_first: bool, cell: &CellPos);

    fn report_diff_cell(&mut self, first: &CellPos, second: &CellPos);

    /// Called once, after every cell has been visited
    fn report_workbooks_differ(&mut self, differ: bool);
}

/// Compare two workbooks cell by cell. Returns true if they differ.
pub fn diff_workbooks(a: &Workbook, b: &Workbook, callback: &mut dyn DiffCallback) -> bool {
    let mut differ = false;
    let sheet_count = a.sheet_count().max(b.sheet_count());
    for index in 0..sheet_count {
        match (a.sheet(index), b.sheet(index)) {
            (Some(sa), Some(sb)) => differ |= diff_sheets(sa, sb, callback),
            (Some(only), None) => differ |= report_whole_sheet(only, true, callback),
            (None, Some(only)) => differ |= report_whole_sheet(only, false, callback),
            (None, None) => {}
        }
    }
    callback.report_workbooks_differ(differ);
    differ
}

fn cell_pos(sheet: &Sheet, row: usize, col: usize, value: &CellValue) -> CellPos {
    CellPos {
        sheet_name: sheet.name.clone(),
        row,
        col,
        value: value.raw_display(),
    }
}

/// Non-blank values of a sheet in row-major order
fn values(sheet: &Sheet) -> impl Iterator<Item = (usize, usize, &CellValue)> {
    sheet.rows_iter().flat_map(|(r, row)| {
        row.cells()
            .filter(|(_, cell)| !cell.value.is_blank())
            .map(move |(c, cell)| (r, c, &cell.value))
    })
}

fn value_at(sheet: &Sheet, row: usize, col: usize) -> Option<&CellValue> {
    sheet.cell(row, col).map(|c| &c.value).filter(|v| !v.is_blank())
}

fn diff_sheets(a: &Sheet, b: &Sheet, callback: &mut dyn DiffCallback) -> bool {
    let mut differ = false;
    for (row, col, va) in values(a) {
        match value_at(b, row, col) {
            Some(vb) => {
                if va.raw_display() != vb.raw_display() {
                    callback.report_diff_cell(&cell_pos(a, row, col, va), &cell_pos(b, row, col, vb));
                    differ = true;
                }
            }
            None => {
                callback.report_extra_cell(true, &cell_pos(a, row, col, va));
                differ = true;
            }
        }
    }
    for (row, col, vb) in values(b) {
        if value_at(a, row, col).is_none() {
            callback.report_extra_cell(false, &cell_pos(b, row, col, vb));
            differ = true;
        }
    }
    differ
}

fn report_whole_sheet(sheet: &Sheet, in_first: bool, callback: &mut dyn DiffCallback) -> bool {
    let mut any = false;
    for (row, col, value) in values(sheet) {
        callback.report_extra_cell(in_first, &cell_pos(sheet, row, col, value));
        any = true;
    }
    any
}

// =============================================================================
// Logging callback
// =============================================================================

/// Sheets, rows and columns touched by one kind of event, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    pub sheets: Vec<String>,
    pub rows: Vec<usize>,
    pub cols: Vec<usize>,
    seen_sheets: HashSet<String>,
    seen_rows: HashSet<usize>,
    seen_cols: HashSet<usize>,
}

impl Footprint {
    fn record(&mut self, cell: &CellPos) {
        if self.seen_sheets.insert(cell.sheet_name.clone()) {
            self.sheets.push(cell.sheet_name.clone());
        }
        if self.seen_rows.insert(cell.row) {
            self.rows.push(cell.row);
        }
        if self.seen_cols.insert(cell.col) {
            self.cols.push(cell.col);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }
}

impl fmt::Display for Footprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows: Vec<String> = self.rows.iter().map(|r| (r + 1).to_string()).collect();
        let cols: Vec<String> = self.cols.iter().map(|c| col_to_letters(*c)).collect();
        write!(
            f,
            "Sheets: [{}] Rows: [{}] Cols: [{}]",
            self.sheets.join(", "),
            rows.join(", "),
            cols.join(", ")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffSummary {
    pub diff: Footprint,
    pub extra_first: Footprint,
    pub extra_second: Footprint,
    pub diff_cells: usize,
    pub extra_cells: usize,
    /// Set by `report_workbooks_differ`
    pub differ: Option<bool>,
}

/// Aggregates diff events and logs each one, then a summary.
#[derive(Debug, Default)]
pub struct LoggingDiffCallback {
    file1: String,
    file2: String,
    echo: bool,
    summary: DiffSummary,
}

impl LoggingDiffCallback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print every line to stdout
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn summary(&self) -> &DiffSummary {
        &self.summary
    }

    fn emit(&self, line: &str) {
        log::info!(target: DISPLAY_TARGET, "{}", line);
        if self.echo {
            println!("{}", line);
        }
    }

    fn emit_footprint(&self, what: &str, footprint: &Footprint) {
        self.emit(&format!("----------------- {} -------------------", what));
        self.emit(&footprint.to_string());
    }
}

fn side(in_first: bool) -> &'static str {
    if in_first {
        "WB1"
    } else {
        "WB2"
    }
}

impl DiffCallback for LoggingDiffCallback {
    fn init(&mut self, file1: &str, file2: &str) {
        self.file1 = file1.to_string();
        self.file2 = file2.to_string();
        self.summary = DiffSummary::default();
    }

    fn report_extra_cell(&mut self, in_first: bool, cell: &CellPos) {
        if in_first {
            self.summary.extra_first.record(cell);
        } else {
            self.summary.extra_second.record(cell);
        }
        self.summary.extra_cells += 1;
        self.emit(&format!(
            "EXTRA Cell in {} {} => '{}'",
            side(in_first),
            cell.address(),
            cell.value
        ));
    }

    fn report_diff_cell(&mut self, first: &CellPos, second: &CellPos) {
        self.summary.diff.record(first);
        self.summary.diff_cells += 1;
        self.emit(&format!(
            "DIFF  Cell at     {} => '{}' v/s '{}'",
            first.address(),
            first.value,
            second.value
        ));
    }

    fn report_workbooks_differ(&mut self, differ: bool) {
        self.summary.differ = Some(differ);
        self.emit_footprint("DIFF", &self.summary.diff);
        self.emit_footprint("EXTRA WB1", &self.summary.extra_first);
        self.emit_footprint("EXTRA WB2", &self.summary.extra_second);
        self.emit("-----------------------------------------");
        self.emit(&format!(
            "Excel files {} and {} {}",
            self.file1,
            self.file2,
            if differ { "differ" } else { "match" }
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Cell;

    fn workbook(cells: &[(usize, usize, &str)]) -> Workbook {
        let mut wb = Workbook::new();
        let idx = wb.add_sheet_named("Data").unwrap();
        let sheet = wb.sheet_mut(idx).unwrap();
        for (r, c, v) in cells {
            sheet.set_cell(*r, *c, Cell::text(*v));
        }
        wb
    }

    #[derive(Default)]
    struct Recorder {
        extra: Vec<(bool, String)>,
        diff: Vec<(String, String, String)>,
        finished: Option<bool>,
    }

    impl DiffCallback for Recorder {
        fn report_extra_cell(&mut self, in_first: bool, cell: &CellPos) {
            self.extra.push((in_first, cell.address()));
        }

        fn report_diff_cell(&mut self, first: &CellPos, second: &CellPos) {
            self.diff.push((first.address(), first.value.clone(), second.value.clone()));
        }

        fn report_workbooks_differ(&mut self, differ: bool) {
            self.finished = Some(differ);
        }
    }

    #[test]
    fn test_identical_workbooks_match() {
        let a = workbook(&[(0, 0, "x"), (1, 1, "y")]);
        let b = a.clone();
        let mut rec = Recorder::default();

        assert!(!diff_workbooks(&a, &b, &mut rec));
        assert_eq!(rec.finished, Some(false));
        assert!(rec.extra.is_empty());
        assert!(rec.diff.is_empty());
    }

    #[test]
    fn test_reports_diff_and_extra_cells() {
        let a = workbook(&[(0, 0, "x"), (2, 1, "only a")]);
        let b = workbook(&[(0, 0, "z"), (3, 2, "only b")]);
        let mut rec = Recorder::default();

        assert!(diff_workbooks(&a, &b, &mut rec));
        assert_eq!(rec.diff, vec![("Data!A1".to_string(), "x".to_string(), "z".to_string())]);
        assert_eq!(
            rec.extra,
            vec![(true, "Data!B3".to_string()), (false, "Data!C4".to_string())]
        );
        assert_eq!(rec.finished, Some(true));
    }

    #[test]
    fn test_extra_sheet_reported_cell_by_cell() {
        let a = workbook(&[(0, 0, "x")]);
        let mut b = a.clone();
        let extra = b.add_sheet_named("More").unwrap();
        b.sheet_mut(extra).unwrap().set_cell(4, 0, Cell::text("new"));
        let mut rec = Recorder::default();

        assert!(diff_workbooks(&a, &b, &mut rec));
        assert_eq!(rec.extra, vec![(false, "More!A5".to_string())]);
    }

    #[test]
    fn test_blank_cells_ignored() {
        let a = workbook(&[(0, 0, "x")]);
        let mut b = a.clone();
        b.sheet_mut(0).unwrap().set_cell(5, 5, Cell::default());
        let mut rec = Recorder::default();

        assert!(!diff_workbooks(&a, &b, &mut rec));
    }

    #[test]
    fn test_logging_callback_summary() {
        let a = workbook(&[(0, 0, "x"), (1, 0, "y"), (2, 3, "gone")]);
        let b = workbook(&[(0, 0, "X"), (1, 0, "Y")]);
        let mut cb = LoggingDiffCallback::new();
        cb.init("a.xlsx", "b.xlsx");

        diff_workbooks(&a, &b, &mut cb);

        let summary = cb.summary();
        assert_eq!(summary.differ, Some(true));
        assert_eq!(summary.diff_cells, 2);
        assert_eq!(summary.extra_cells, 1);
        assert_eq!(summary.diff.sheets, vec!["Data"]);
        assert_eq!(summary.diff.rows, vec![0, 1]);
        assert_eq!(summary.diff.cols, vec![0]);
        assert_eq!(summary.extra_first.cols, vec![3]);
        assert!(summary.extra_second.is_empty());
        assert_eq!(
            summary.extra_first.to_string(),
            "Sheets: [Data] Rows: [3] Cols: [D]"
        );
    }

    #[test]
    fn test_footprint_keeps_first_seen_order_once() {
        let mut footprint = Footprint::default();
        for (row, col) in [(4, 2), (1, 2), (4, 0), (1, 2), (4, 2)] {
            footprint.record(&CellPos { sheet_name: "S".to_string(), row, col, value: String::new() });
        }

        assert_eq!(footprint.sheets, vec!["S"]);
        assert_eq!(footprint.rows, vec![4, 1]);
        assert_eq!(footprint.cols, vec![2, 0]);
    }
}
