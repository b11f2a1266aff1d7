//! Row relocation: the insert-and-deep-copy step every reorder is built from.
//!
//! A relocation never touches the source row. Moving a row means relocating
//! it and then removing the stale original with `delete_shift`.

use crate::sheet::{MergedRegion, Row};
use crate::store::RowStore;

/// Detached copy of one row and the merges anchored at it.
#[derive(Debug, Clone)]
pub struct RowSnapshot {
    row: Row,
    merges: Vec<MergedRegion>,
}

impl RowSnapshot {
    /// None if no row is materialized at `index`
    pub fn capture<S: RowStore + ?Sized>(store: &S, index: usize) -> Option<Self> {
        let row = store.row_at(index)?.clone();
        let merges = store.merges_anchored_at(index);
        Some(Self { row, merges })
    }

    pub fn row(&self) -> &Row {
        &self.row
    }

    pub fn merges(&self) -> &[MergedRegion] {
        &self.merges
    }

    /// Write the snapshot at `dest_row`. An occupied destination is pushed
    /// down one row first.
    pub fn place<D: RowStore + ?Sized>(self, dest: &mut D, dest_row: usize) {
        if dest.row_at(dest_row).is_some() {
            dest.insert_shift(dest_row, 1);
        }
        let target = dest.create_row(dest_row);
        for (col, cell) in self.row.cells() {
            target.set_cell(col, cell.clone());
        }
        target.height = self.row.height;
        target.hidden = self.row.hidden;

        for region in self.merges {
            dest.add_merged_region(region.with_anchor(dest_row));
        }
    }
}

/// Copy `source_row` of `source` to `dest_row` of another store.
/// Returns false (and does nothing) when the source row is absent.
pub fn relocate<S, D>(source: &S, source_row: usize, dest: &mut D, dest_row: usize) -> bool
where
    S: RowStore + ?Sized,
    D: RowStore + ?Sized,
{
    match RowSnapshot::capture(source, source_row) {
        Some(snapshot) => {
            snapshot.place(dest, dest_row);
            true
        }
        None => false,
    }
}

/// Copy a row to another position of the same store. The source is read in
/// full before the destination shifts.
pub fn relocate_within<S: RowStore + ?Sized>(store: &mut S, source_row: usize, dest_row: usize) -> bool {
    match RowSnapshot::capture(store, source_row) {
        Some(snapshot) => {
            snapshot.place(store, dest_row);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, CellStyle, Comment, Hyperlink};
    use crate::sheet::Sheet;

    fn rich_row(sheet: &mut Sheet, index: usize, label: &str) {
        let style = CellStyle { bold: true, font_family: Some("Arial".into()), ..CellStyle::default() };
        sheet.set_cell(
            index,
            0,
            Cell::text(label)
                .with_style(style)
                .with_comment(Comment::new("note").with_author("me"))
                .with_hyperlink(Hyperlink::url("https://example.com")),
        );
        sheet.set_cell(index, 3, Cell::number(7.5));
        let row = sheet.ensure_row(index);
        row.height = Some(24.0);
    }

    #[test]
    fn test_relocate_into_empty_destination() {
        let mut src = Sheet::new_with_name("src");
        let mut dst = Sheet::new_with_name("dst");
        rich_row(&mut src, 2, "x");
        src.add_merged_region(MergedRegion::new(2, 0, 4, 1));

        assert!(relocate(&src, 2, &mut dst, 0));

        let copied = dst.row(0).unwrap();
        assert_eq!(copied, src.row(2).unwrap());
        assert_eq!(dst.merged_regions(), &[MergedRegion::new(0, 0, 2, 1)]);
        // Source untouched
        assert_eq!(src.get_raw(2, 0), "x");
        assert_eq!(src.merged_regions().len(), 1);
    }

    #[test]
    fn test_relocate_onto_occupied_row_shifts_down() {
        let mut src = Sheet::new_with_name("src");
        let mut dst = Sheet::new_with_name("dst");
        rich_row(&mut src, 0, "new");
        dst.set_cell(0, 0, Cell::text("old0"));
        dst.set_cell(1, 0, Cell::text("old1"));

        assert!(relocate(&src, 0, &mut dst, 1));

        assert_eq!(dst.get_raw(0, 0), "old0");
        assert_eq!(dst.get_raw(1, 0), "new");
        assert_eq!(dst.get_raw(2, 0), "old1");
    }

    #[test]
    fn test_relocate_absent_source_is_noop() {
        let src = Sheet::new_with_name("src");
        let mut dst = Sheet::new_with_name("dst");
        dst.set_cell(0, 0, Cell::text("keep"));

        assert!(!relocate(&src, 5, &mut dst, 0));
        assert_eq!(dst.row_count(), 1);
        assert_eq!(dst.get_raw(0, 0), "keep");
    }

    #[test]
    fn test_relocate_within_upwards() {
        let mut sheet = Sheet::new_with_name("S");
        sheet.set_cell(0, 0, Cell::text("a"));
        rich_row(&mut sheet, 1, "b");
        sheet.add_merged_region(MergedRegion::new(1, 0, 1, 2));

        assert!(relocate_within(&mut sheet, 1, 0));

        // b copied to 0; a and the original b pushed down
        assert_eq!(sheet.get_raw(0, 0), "b");
        assert_eq!(sheet.get_raw(1, 0), "a");
        assert_eq!(sheet.get_raw(2, 0), "b");
        let mut merges = sheet.merged_regions().to_vec();
        merges.sort_by_key(|m| m.first_row);
        assert_eq!(merges, vec![MergedRegion::new(0, 0, 0, 2), MergedRegion::new(2, 0, 2, 2)]);
    }

    #[test]
    fn test_copied_style_does_not_alias_source() {
        let mut src = Sheet::new_with_name("src");
        let mut dst = Sheet::new_with_name("dst");
        rich_row(&mut src, 0, "x");
        relocate(&src, 0, &mut dst, 0);

        dst.ensure_row(0).cell_mut(0).unwrap().style.bold = false;
        assert!(src.cell(0, 0).unwrap().style.bold);
    }
}
