//! Cell and row comparators.
//!
//! The ordering is deliberately weak: absent cells and cells of different
//! value kinds compare `Equal`, so a key only orders rows where both sides
//! hold the same kind of value. Ties fall through to the next key and then
//! to original row order (callers must sort stably).

use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use crate::cell::{Cell, CellValue};
use crate::sheet::Row;

use super::{SortDirection, SortKey};

/// Compare two values of the same kind. Mismatched kinds, formulas,
/// errors and blanks are all `Equal`.
pub fn compare_values(a: &CellValue, b: &CellValue) -> Ordering {
    match (a, b) {
        (CellValue::Boolean(x), CellValue::Boolean(y)) => x.cmp(y),
        (CellValue::Number(x), CellValue::Number(y)) => OrderedFloat(*x).cmp(&OrderedFloat(*y)),
        (CellValue::Text(x), CellValue::Text(y)) => compare_text(x, y),
        _ => Ordering::Equal,
    }
}

/// Case-insensitive lexicographic order
fn compare_text(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

/// Compare two (possibly absent) cells under one direction
pub fn compare_cells(a: Option<&Cell>, b: Option<&Cell>, direction: SortDirection) -> Ordering {
    let (Some(a), Some(b)) = (a, b) else {
        return Ordering::Equal;
    };
    let ord = compare_values(&a.value, &b.value);
    match direction {
        SortDirection::Ascending => ord,
        SortDirection::Descending => ord.reverse(),
    }
}

/// Ordered list of sort keys; the leftmost non-`Equal` key decides.
#[derive(Debug, Clone)]
pub struct RowComparator {
    keys: Vec<SortKey>,
}

impl RowComparator {
    pub fn new(keys: Vec<SortKey>) -> Self {
        Self { keys }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn compare(&self, a: Option<&Row>, b: Option<&Row>) -> Ordering {
        let (Some(a), Some(b)) = (a, b) else {
            return Ordering::Equal;
        };
        for key in &self.keys {
            let ord = compare_cells(a.cell(key.column), b.cell(key.column), key.direction);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::ErrorKind;

    fn row(cells: &[(usize, Cell)]) -> Row {
        let mut row = Row::new();
        for (col, cell) in cells {
            row.set_cell(*col, cell.clone());
        }
        row
    }

    #[test]
    fn test_booleans_false_before_true() {
        let f = Cell::boolean(false);
        let t = Cell::boolean(true);
        assert_eq!(compare_cells(Some(&f), Some(&t), SortDirection::Ascending), Ordering::Less);
        assert_eq!(compare_cells(Some(&f), Some(&t), SortDirection::Descending), Ordering::Greater);
    }

    #[test]
    fn test_text_ignores_case() {
        let a = Cell::text("alice");
        let b = Cell::text("ALICE");
        let c = Cell::text("Bob");
        assert_eq!(compare_cells(Some(&a), Some(&b), SortDirection::Ascending), Ordering::Equal);
        assert_eq!(compare_cells(Some(&b), Some(&c), SortDirection::Ascending), Ordering::Less);
        assert_eq!(compare_cells(Some(&c), Some(&a), SortDirection::Ascending), Ordering::Greater);
    }

    #[test]
    fn test_nan_sorts_above_every_number() {
        let nan = Cell::number(f64::NAN);
        let big = Cell::number(f64::INFINITY);
        assert_eq!(compare_cells(Some(&nan), Some(&big), SortDirection::Ascending), Ordering::Greater);
        assert_eq!(compare_cells(Some(&nan), Some(&nan), SortDirection::Ascending), Ordering::Equal);
        assert_eq!(compare_cells(Some(&big), Some(&nan), SortDirection::Descending), Ordering::Greater);
    }

    #[test]
    fn test_mismatched_kinds_are_equal() {
        let b = Cell::boolean(true);
        let s = Cell::text("true");
        let n = Cell::number(1.0);
        assert_eq!(compare_cells(Some(&b), Some(&s), SortDirection::Ascending), Ordering::Equal);
        assert_eq!(compare_cells(Some(&n), Some(&s), SortDirection::Descending), Ordering::Equal);
    }

    #[test]
    fn test_absent_formula_and_error_are_equal() {
        let n = Cell::number(3.0);
        let f1 = Cell::new(CellValue::Formula("A1+1".into()));
        let f2 = Cell::new(CellValue::Formula("B9".into()));
        let e = Cell::new(CellValue::Error(ErrorKind::Div0));
        assert_eq!(compare_cells(None, Some(&n), SortDirection::Ascending), Ordering::Equal);
        assert_eq!(compare_cells(Some(&n), None, SortDirection::Ascending), Ordering::Equal);
        assert_eq!(compare_cells(Some(&f1), Some(&f2), SortDirection::Ascending), Ordering::Equal);
        assert_eq!(compare_cells(Some(&e), Some(&e), SortDirection::Ascending), Ordering::Equal);
    }

    #[test]
    fn test_leftmost_key_wins() {
        let cmp = RowComparator::new(vec![
            SortKey::new(1, SortDirection::Descending),
            SortKey::new(0, SortDirection::Ascending),
        ]);
        let bob_x = row(&[(0, Cell::text("Bob")), (1, Cell::number(1.0))]);
        let amy_y = row(&[(0, Cell::text("Amy")), (1, Cell::number(2.0))]);
        let ann_x = row(&[(0, Cell::text("Ann")), (1, Cell::number(1.0))]);

        assert_eq!(cmp.compare(Some(&amy_y), Some(&bob_x)), Ordering::Less);
        assert_eq!(cmp.compare(Some(&ann_x), Some(&bob_x)), Ordering::Less);
        assert_eq!(cmp.compare(Some(&bob_x), Some(&ann_x)), Ordering::Greater);
    }

    #[test]
    fn test_mismatched_key_falls_through() {
        let cmp = RowComparator::new(vec![
            SortKey::new(0, SortDirection::Ascending),
            SortKey::new(1, SortDirection::Ascending),
        ]);
        let a = row(&[(0, Cell::boolean(true)), (1, Cell::number(2.0))]);
        let b = row(&[(0, Cell::text("x")), (1, Cell::number(1.0))]);
        assert_eq!(cmp.compare(Some(&a), Some(&b)), Ordering::Greater);
    }

    #[test]
    fn test_absent_rows_are_equal() {
        let cmp = RowComparator::new(vec![SortKey::new(0, SortDirection::Ascending)]);
        let a = row(&[(0, Cell::number(1.0))]);
        assert_eq!(cmp.compare(None, Some(&a)), Ordering::Equal);
        assert_eq!(cmp.compare(None, None), Ordering::Equal);
    }
}
