//! Adjacent bubble-exchange: in-place passes over the range, swapping
//! neighbours that compare out of order. Quadratic, but needs no scratch
//! store.

use std::cmp::Ordering;

use crate::store::RowStore;

use super::compare::RowComparator;
use super::relocate::relocate_within;
use super::{Phase, ResequenceStats};

/// Reorder rows at or after `start_row` in place.
///
/// Each pass walks the materialized rows of the range and compares
/// neighbours, skipping blank rows between them. Blank rows keep their
/// positions; only row contents are exchanged around them.
/// Ties never swap, so rows that compare `Equal` keep their relative order.
/// Stops after `n + 1` passes even if the last pass swapped, which only
/// happens when mixed value kinds make the ordering intransitive.
pub fn bubble_exchange<S: RowStore + ?Sized>(
    sheet: &mut S,
    start_row: usize,
    comparator: &RowComparator,
) -> ResequenceStats {
    log::trace!("bubble: {:?}", Phase::Collecting);
    // swaps keep the set of materialized indices, so one listing serves every pass
    let indices = sheet.row_indices_from(start_row);
    let mut stats = ResequenceStats {
        rows_considered: indices.len(),
        relocations: 0,
        passes: 0,
    };
    if indices.len() < 2 {
        return stats;
    }
    let max_passes = stats.rows_considered + 1;

    log::trace!(
        "bubble: {:?} {} rows in {}..={}",
        Phase::Sorting,
        indices.len(),
        indices[0],
        indices[indices.len() - 1]
    );
    loop {
        stats.passes += 1;
        let mut swapped = false;
        for pair in indices.windows(2) {
            let (upper, lower) = (pair[0], pair[1]);
            if comparator.compare(sheet.row_at(upper), sheet.row_at(lower)) == Ordering::Greater {
                swap_rows(sheet, upper, lower);
                stats.relocations += 1;
                swapped = true;
            }
        }
        if !swapped {
            break;
        }
        if stats.passes >= max_passes {
            log::warn!(
                "bubble: still swapping after {} passes over {} rows, ordering is not consistent; stopping",
                stats.passes,
                stats.rows_considered
            );
            break;
        }
    }

    log::trace!("bubble: {:?} after {} passes", Phase::Done, stats.passes);
    stats
}

/// Exchange the contents of rows `upper < lower`, where every row strictly
/// between them is blank.
///
/// First `upper` moves below `lower`: open a gap after `lower`, copy `upper`
/// into it, delete the stale original. That pulls `lower` up to
/// `lower - 1`. When the rows were not adjacent, `lower`'s content is then
/// moved back up to `upper` the same way so the blank rows stay put.
fn swap_rows<S: RowStore + ?Sized>(sheet: &mut S, upper: usize, lower: usize) {
    sheet.insert_shift(lower + 1, 1);
    relocate_within(sheet, upper, lower + 1);
    sheet.delete_shift(upper, 1);

    if lower > upper + 1 {
        // now: former lower at lower - 1, former upper at lower
        sheet.insert_shift(upper, 1);
        relocate_within(sheet, lower, upper);
        sheet.delete_shift(lower, 1);
    }
}
