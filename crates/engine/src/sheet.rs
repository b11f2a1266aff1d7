use std::collections::BTreeMap;

use super::cell::{Cell, CellValue};

/// Column limit of the xlsx grid (A..XFD)
pub const MAX_COLS: usize = 16_384;

/// Sheet names longer than this are rejected by Excel
pub const MAX_SHEET_NAME_LEN: usize = 31;

const INVALID_NAME_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Normalize a sheet name for case-insensitive comparison
pub fn normalize_sheet_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A valid name is non-empty after trimming, at most 31 chars, and avoids []:*?/\
pub fn is_valid_sheet_name(name: &str) -> bool {
    let trimmed = name.trim();
    !trimmed.is_empty()
        && trimmed.chars().count() <= MAX_SHEET_NAME_LEN
        && !trimmed.contains(INVALID_NAME_CHARS)
}

/// Convert 0-based column index to Excel-style letter(s): 0=A, 25=Z, 26=AA
pub fn col_to_letters(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// A rectangular merged area. The first row is the anchor: the region belongs
/// to that row and moves with it, always keeping its row span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MergedRegion {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

impl MergedRegion {
    /// Build a region from two corners in any order
    pub fn new(row_a: usize, col_a: usize, row_b: usize, col_b: usize) -> Self {
        Self {
            first_row: row_a.min(row_b),
            last_row: row_a.max(row_b),
            first_col: col_a.min(col_b),
            last_col: col_a.max(col_b),
        }
    }

    /// Number of rows past the anchor
    pub fn row_span(&self) -> usize {
        self.last_row - self.first_row
    }

    pub fn is_anchored_at(&self, row: usize) -> bool {
        self.first_row == row
    }

    /// Same shape, re-anchored at `row`
    pub fn with_anchor(&self, row: usize) -> Self {
        Self {
            first_row: row,
            last_row: row + self.row_span(),
            first_col: self.first_col,
            last_col: self.last_col,
        }
    }

    pub fn overlaps(&self, other: &MergedRegion) -> bool {
        self.first_row <= other.last_row
            && other.first_row <= self.last_row
            && self.first_col <= other.last_col
            && other.first_col <= self.last_col
    }

    pub fn contains(&self, row: usize, col: usize) -> bool {
        row >= self.first_row && row <= self.last_row && col >= self.first_col && col <= self.last_col
    }

    /// Single-cell regions carry no merge and are dropped on import
    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

/// One materialized row: sparse cells keyed by column, plus row-level presentation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<usize, Cell>,
    /// Custom height in points
    pub height: Option<f64>,
    pub hidden: bool,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cell(&self, col: usize) -> Option<&Cell> {
        self.cells.get(&col)
    }

    pub fn cell_mut(&mut self, col: usize) -> Option<&mut Cell> {
        self.cells.get_mut(&col)
    }

    pub fn set_cell(&mut self, col: usize, cell: Cell) {
        self.cells.insert(col, cell);
    }

    /// Cells in column order
    pub fn cells(&self) -> impl Iterator<Item = (usize, &Cell)> {
        self.cells.iter().map(|(col, cell)| (*col, cell))
    }
}

#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    /// Cached normalized name for case-insensitive lookup
    pub(crate) name_key: String,
    rows: BTreeMap<usize, Row>,
    merged_regions: Vec<MergedRegion>,
}

impl Sheet {
    pub fn new_with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
            name_key: normalize_sheet_name(name),
            rows: BTreeMap::new(),
            merged_regions: Vec::new(),
        }
    }

    pub fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
        self.name_key = normalize_sheet_name(name);
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(&index)
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut Row> {
        self.rows.get_mut(&index)
    }

    /// Get the row at `index`, materializing an empty one if absent
    pub fn ensure_row(&mut self, index: usize) -> &mut Row {
        self.rows.entry(index).or_default()
    }

    /// Materialized rows in ascending index order
    pub fn rows_iter(&self) -> impl DoubleEndedIterator<Item = (usize, &Row)> + '_ {
        self.rows.iter().map(|(index, row)| (*index, row))
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(&row).and_then(|r| r.cell(col))
    }

    pub fn set_cell(&mut self, row: usize, col: usize, cell: Cell) {
        self.ensure_row(row).set_cell(col, cell);
    }

    pub fn set_value(&mut self, row: usize, col: usize, value: CellValue) {
        let target = self.ensure_row(row);
        match target.cell_mut(col) {
            Some(cell) => cell.value = value,
            None => target.set_cell(col, Cell::new(value)),
        }
    }

    pub fn get_raw(&self, row: usize, col: usize) -> String {
        self.cell(row, col).map(|c| c.value.raw_display()).unwrap_or_default()
    }

    pub fn merged_regions(&self) -> &[MergedRegion] {
        &self.merged_regions
    }

    /// Add a merge, rejecting overlap with an existing one
    pub fn add_merge(&mut self, region: MergedRegion) -> Result<(), String> {
        if region.last_col >= MAX_COLS {
            return Err(format!("merge column {} out of range", region.last_col));
        }
        if let Some(existing) = self.merged_regions.iter().find(|m| m.overlaps(&region)) {
            return Err(format!(
                "merge R{}C{}:R{}C{} overlaps R{}C{}:R{}C{}",
                region.first_row + 1,
                region.first_col + 1,
                region.last_row + 1,
                region.last_col + 1,
                existing.first_row + 1,
                existing.first_col + 1,
                existing.last_row + 1,
                existing.last_col + 1,
            ));
        }
        self.merged_regions.push(region);
        Ok(())
    }

    /// Add a merge without the overlap check
    pub(crate) fn push_merge(&mut self, region: MergedRegion) {
        self.merged_regions.push(region);
    }

    /// Insert rows at the specified position, shifting existing rows down.
    /// Merges anchored at or below `at_row` move with their anchor; merges
    /// anchored above are left as they are.
    pub fn insert_rows(&mut self, at_row: usize, count: usize) {
        if count == 0 {
            return;
        }
        let moved = self.rows.split_off(&at_row);
        for (index, row) in moved {
            self.rows.insert(index + count, row);
        }
        for region in &mut self.merged_regions {
            if region.first_row >= at_row {
                *region = region.with_anchor(region.first_row + count);
            }
        }
    }

    /// Delete rows at the specified position, shifting remaining rows up.
    /// Merges anchored inside the deleted block are dropped.
    pub fn delete_rows(&mut self, start_row: usize, count: usize) {
        if count == 0 {
            return;
        }
        let end = start_row.saturating_add(count);
        let mut tail = self.rows.split_off(&start_row);
        let after = tail.split_off(&end);
        for (index, row) in after {
            self.rows.insert(index - count, row);
        }

        self.merged_regions
            .retain(|m| m.first_row < start_row || m.first_row >= end);
        for region in &mut self.merged_regions {
            if region.first_row >= end {
                *region = region.with_anchor(region.first_row - count);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_at(sheet: &Sheet, row: usize, col: usize) -> String {
        sheet.get_raw(row, col)
    }

    #[test]
    fn test_sheet_name_validation() {
        assert!(is_valid_sheet_name("Data"));
        assert!(is_valid_sheet_name("  Padded  "));
        assert!(!is_valid_sheet_name(""));
        assert!(!is_valid_sheet_name("   "));
        assert!(!is_valid_sheet_name("a/b"));
        assert!(!is_valid_sheet_name("[x]"));
        assert!(is_valid_sheet_name(&"x".repeat(31)));
        assert!(!is_valid_sheet_name(&"x".repeat(32)));
    }

    #[test]
    fn test_col_to_letters() {
        assert_eq!(col_to_letters(0), "A");
        assert_eq!(col_to_letters(25), "Z");
        assert_eq!(col_to_letters(26), "AA");
        assert_eq!(col_to_letters(701), "ZZ");
        assert_eq!(col_to_letters(MAX_COLS - 1), "XFD");
    }

    #[test]
    fn test_insert_rows_shifts_down() {
        let mut sheet = Sheet::new_with_name("S");
        sheet.set_value(0, 0, CellValue::Text("a".into()));
        sheet.set_value(1, 0, CellValue::Text("b".into()));
        sheet.set_value(2, 0, CellValue::Text("c".into()));

        sheet.insert_rows(1, 2);

        assert_eq!(text_at(&sheet, 0, 0), "a");
        assert!(sheet.row(1).is_none());
        assert!(sheet.row(2).is_none());
        assert_eq!(text_at(&sheet, 3, 0), "b");
        assert_eq!(text_at(&sheet, 4, 0), "c");
    }

    #[test]
    fn test_delete_rows_shifts_up() {
        let mut sheet = Sheet::new_with_name("S");
        for (i, s) in ["a", "b", "c", "d"].iter().enumerate() {
            sheet.set_value(i, 0, CellValue::Text(s.to_string()));
        }

        sheet.delete_rows(1, 2);

        assert_eq!(text_at(&sheet, 0, 0), "a");
        assert_eq!(text_at(&sheet, 1, 0), "d");
        assert_eq!(sheet.row_count(), 2);
    }

    #[test]
    fn test_merges_follow_anchor_on_insert() {
        let mut sheet = Sheet::new_with_name("S");
        sheet.add_merge(MergedRegion::new(0, 0, 2, 1)).unwrap();
        sheet.add_merge(MergedRegion::new(4, 0, 5, 3)).unwrap();

        // Insert inside the first region's span: it does not grow
        sheet.insert_rows(1, 1);

        assert_eq!(sheet.merged_regions()[0], MergedRegion::new(0, 0, 2, 1));
        assert_eq!(sheet.merged_regions()[1], MergedRegion::new(5, 0, 6, 3));
    }

    #[test]
    fn test_merges_dropped_with_anchor_on_delete() {
        let mut sheet = Sheet::new_with_name("S");
        sheet.add_merge(MergedRegion::new(1, 0, 2, 0)).unwrap();
        sheet.add_merge(MergedRegion::new(5, 2, 7, 4)).unwrap();
        sheet.add_merge(MergedRegion::new(0, 5, 3, 5)).unwrap();

        sheet.delete_rows(1, 2);

        assert_eq!(
            sheet.merged_regions(),
            &[MergedRegion::new(3, 2, 5, 4), MergedRegion::new(0, 5, 3, 5)]
        );
    }

    #[test]
    fn test_add_merge_rejects_overlap() {
        let mut sheet = Sheet::new_with_name("S");
        sheet.add_merge(MergedRegion::new(0, 0, 1, 1)).unwrap();
        assert!(sheet.add_merge(MergedRegion::new(1, 1, 2, 2)).is_err());
        assert!(sheet.add_merge(MergedRegion::new(2, 0, 3, 1)).is_ok());
        assert_eq!(sheet.merged_regions().len(), 2);
    }

    #[test]
    fn test_row_height_and_hidden_shift_with_row() {
        let mut sheet = Sheet::new_with_name("S");
        let row = sheet.ensure_row(3);
        row.height = Some(30.0);
        row.hidden = true;

        sheet.insert_rows(0, 1);

        let moved = sheet.row(4).unwrap();
        assert_eq!(moved.height, Some(30.0));
        assert!(moved.hidden);
        assert!(sheet.row(3).is_none());
    }

    #[test]
    fn test_region_helpers() {
        let region = MergedRegion::new(5, 3, 2, 1);
        assert_eq!(region.first_row, 2);
        assert_eq!(region.last_col, 3);
        assert_eq!(region.row_span(), 3);
        assert!(region.contains(4, 2));
        assert!(!region.contains(6, 2));
        assert_eq!(region.with_anchor(10), MergedRegion::new(10, 1, 13, 3));
        assert!(MergedRegion::new(1, 1, 1, 1).is_single_cell());
    }
}
