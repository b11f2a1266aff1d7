//! Materialize-and-replace: stable-sort row handles, stage the rows in sorted
//! order on a scratch store, drop the original range and copy the staged rows
//! back. O(n log n) comparisons and 2n relocations.

use crate::store::RowStore;

use super::compare::RowComparator;
use super::relocate::relocate;
use super::{Phase, ResequenceStats};

/// Reorder rows at or after `start_row` of `sheet`, staging through `scratch`.
///
/// `scratch` must be empty on entry; it holds the sorted copy on return and
/// the caller disposes of it. Gaps inside the range are closed: the sorted
/// rows land contiguously from `start_row`.
pub fn materialize_and_replace<S, T>(
    sheet: &mut S,
    scratch: &mut T,
    start_row: usize,
    comparator: &RowComparator,
) -> ResequenceStats
where
    S: RowStore + ?Sized,
    T: RowStore + ?Sized,
{
    log::trace!("materialize: {:?}", Phase::Collecting);
    let mut handles = sheet.row_indices_from(start_row);
    let mut stats = ResequenceStats {
        rows_considered: handles.len(),
        relocations: 0,
        passes: 1,
    };
    if handles.is_empty() {
        log::trace!("materialize: {:?} (nothing at or after row {})", Phase::Done, start_row);
        return stats;
    }

    log::trace!("materialize: {:?} {} rows", Phase::Sorting, handles.len());
    // Vec::sort_by is stable: full ties keep their original order
    handles.sort_by(|&a, &b| comparator.compare(sheet.row_at(a), sheet.row_at(b)));

    log::trace!("materialize: {:?}", Phase::Materializing);
    for (position, &source_row) in handles.iter().enumerate() {
        if relocate(&*sheet, source_row, scratch, position) {
            stats.relocations += 1;
        } else {
            log::debug!("materialize: row {} vanished before staging, skipped", source_row);
        }
    }

    if let Some(last) = sheet.last_row_index() {
        if last >= start_row {
            sheet.delete_shift(start_row, last - start_row + 1);
        }
    }

    for (offset, staged_row) in scratch.row_indices_from(0).into_iter().enumerate() {
        if relocate(&*scratch, staged_row, sheet, start_row + offset) {
            stats.relocations += 1;
        }
    }

    log::trace!("materialize: {:?}", Phase::Done);
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellValue};
    use crate::sheet::{MergedRegion, Sheet};
    use crate::sort::{SortDirection, SortKey};

    fn column(sheet: &Sheet, col: usize) -> Vec<String> {
        sheet.rows_iter().map(|(i, _)| sheet.get_raw(i, col)).collect()
    }

    fn asc(col: usize) -> RowComparator {
        RowComparator::new(vec![SortKey::new(col, SortDirection::Ascending)])
    }

    #[test]
    fn test_sorts_names() {
        let mut sheet = Sheet::new_with_name("S");
        let mut scratch = Sheet::new_with_name("scratch");
        for (i, name) in ["Charlie", "Alice", "Bob"].iter().enumerate() {
            sheet.set_cell(i, 1, Cell::text(*name));
        }

        let stats = materialize_and_replace(&mut sheet, &mut scratch, 0, &asc(1));

        assert_eq!(column(&sheet, 1), vec!["Alice", "Bob", "Charlie"]);
        assert_eq!(stats.rows_considered, 3);
        assert_eq!(stats.relocations, 6);
    }

    #[test]
    fn test_rows_before_start_untouched() {
        let mut sheet = Sheet::new_with_name("S");
        let mut scratch = Sheet::new_with_name("scratch");
        sheet.set_cell(0, 0, Cell::text("Header"));
        sheet.add_merge(MergedRegion::new(0, 0, 0, 3)).unwrap();
        sheet.set_value(1, 0, CellValue::Number(3.0));
        sheet.set_value(2, 0, CellValue::Number(1.0));
        sheet.set_value(3, 0, CellValue::Number(2.0));

        materialize_and_replace(&mut sheet, &mut scratch, 1, &asc(0));

        assert_eq!(column(&sheet, 0), vec!["Header", "1", "2", "3"]);
        assert_eq!(sheet.merged_regions(), &[MergedRegion::new(0, 0, 0, 3)]);
    }

    #[test]
    fn test_gaps_are_closed() {
        let mut sheet = Sheet::new_with_name("S");
        let mut scratch = Sheet::new_with_name("scratch");
        sheet.set_value(0, 0, CellValue::Number(9.0));
        sheet.set_value(4, 0, CellValue::Number(5.0));
        sheet.set_value(7, 0, CellValue::Number(1.0));

        materialize_and_replace(&mut sheet, &mut scratch, 0, &asc(0));

        let indices: Vec<usize> = sheet.rows_iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(column(&sheet, 0), vec!["1", "5", "9"]);
    }

    #[test]
    fn test_merges_follow_rows() {
        let mut sheet = Sheet::new_with_name("S");
        let mut scratch = Sheet::new_with_name("scratch");
        sheet.set_value(0, 0, CellValue::Number(2.0));
        sheet.set_value(1, 0, CellValue::Number(1.0));
        sheet.add_merge(MergedRegion::new(0, 1, 0, 4)).unwrap();

        materialize_and_replace(&mut sheet, &mut scratch, 0, &asc(0));

        assert_eq!(column(&sheet, 0), vec!["1", "2"]);
        assert_eq!(sheet.merged_regions(), &[MergedRegion::new(1, 1, 1, 4)]);
    }

    #[test]
    fn test_empty_range() {
        let mut sheet = Sheet::new_with_name("S");
        let mut scratch = Sheet::new_with_name("scratch");
        sheet.set_value(0, 0, CellValue::Number(1.0));

        let stats = materialize_and_replace(&mut sheet, &mut scratch, 5, &asc(0));

        assert_eq!(stats.rows_considered, 0);
        assert_eq!(stats.relocations, 0);
        assert_eq!(sheet.row_count(), 1);
    }
}
