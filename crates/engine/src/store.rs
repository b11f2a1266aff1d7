//! Row-shift-only store.
//!
//! Rows cannot be moved directly: the only structural mutations are
//! "insert `count` empty rows at `at`, pushing later rows down" and
//! "delete `count` rows at `at`, pulling later rows up". Every reorder in
//! [`crate::sort`] is expressed in those terms, so the strategies run
//! unchanged against a [`Sheet`] or any other store.

use crate::sheet::{MergedRegion, Row, Sheet};

pub trait RowStore {
    /// Row at `index`, or None if nothing is materialized there
    fn row_at(&self, index: usize) -> Option<&Row>;

    /// Highest materialized row index
    fn last_row_index(&self) -> Option<usize>;

    /// Materialized row indices at or after `start`, ascending
    fn row_indices_from(&self, start: usize) -> Vec<usize>;

    /// Row at `index`, allocating an empty one if absent
    fn create_row(&mut self, index: usize) -> &mut Row;

    /// Push rows at or after `at` down by `count`
    fn insert_shift(&mut self, at: usize, count: usize);

    /// Remove `count` rows starting at `at`, pulling later rows up
    fn delete_shift(&mut self, at: usize, count: usize);

    fn merged_regions(&self) -> &[MergedRegion];

    /// Record a merge without overlap checking; relocation recreates regions
    /// that already existed at their source.
    fn add_merged_region(&mut self, region: MergedRegion);

    fn merges_anchored_at(&self, row: usize) -> Vec<MergedRegion> {
        self.merged_regions()
            .iter()
            .filter(|m| m.is_anchored_at(row))
            .copied()
            .collect()
    }
}

impl RowStore for Sheet {
    fn row_at(&self, index: usize) -> Option<&Row> {
        self.row(index)
    }

    fn last_row_index(&self) -> Option<usize> {
        self.rows_iter().next_back().map(|(index, _)| index)
    }

    fn row_indices_from(&self, start: usize) -> Vec<usize> {
        self.rows_iter()
            .map(|(index, _)| index)
            .filter(|index| *index >= start)
            .collect()
    }

    fn create_row(&mut self, index: usize) -> &mut Row {
        self.ensure_row(index)
    }

    fn insert_shift(&mut self, at: usize, count: usize) {
        self.insert_rows(at, count);
    }

    fn delete_shift(&mut self, at: usize, count: usize) {
        self.delete_rows(at, count);
    }

    fn merged_regions(&self) -> &[MergedRegion] {
        Sheet::merged_regions(self)
    }

    fn add_merged_region(&mut self, region: MergedRegion) {
        self.push_merge(region);
    }
}
