use crate::sheet::{is_valid_sheet_name, normalize_sheet_name, Sheet, MAX_SHEET_NAME_LEN};

/// Prefix used for scratch sheets and sorted output files
pub const SORTED_PREFIX: &str = "sorted_";

/// A workbook containing multiple sheets
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Create an empty workbook
    pub fn new() -> Self {
        Self { sheets: Vec::new() }
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Get a reference to a sheet by index
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    /// Get a mutable reference to a sheet by index
    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        let key = normalize_sheet_name(name);
        self.sheets.iter().find(|s| s.name_key == key)
    }

    /// Check if a sheet name already exists (case-insensitive)
    pub fn sheet_name_exists(&self, name: &str) -> bool {
        self.sheet_by_name(name).is_some()
    }

    /// Add a new sheet with a specific name
    /// Returns None if name is invalid or already exists
    pub fn add_sheet_named(&mut self, name: &str) -> Option<usize> {
        if !is_valid_sheet_name(name) || self.sheet_name_exists(name) {
            return None;
        }
        self.sheets.push(Sheet::new_with_name(name.trim()));
        Some(self.sheets.len() - 1)
    }

    /// Append an empty staging sheet named `sorted_<base>`, suffixed `_2`, `_3`, ...
    /// until unique. Returns its index.
    pub fn add_scratch_sheet(&mut self, base: &str) -> Option<usize> {
        let stem = fit_name(&format!("{}{}", SORTED_PREFIX, base), "");
        if let Some(index) = self.add_sheet_named(&stem) {
            return Some(index);
        }
        for n in 2..=self.sheets.len() + 2 {
            let candidate = fit_name(&stem, &format!("_{}", n));
            if let Some(index) = self.add_sheet_named(&candidate) {
                return Some(index);
            }
        }
        None
    }

    /// Delete a sheet by index
    /// Returns false if the index is out of range
    pub fn delete_sheet(&mut self, index: usize) -> bool {
        if index >= self.sheets.len() {
            return false;
        }
        self.sheets.remove(index);
        true
    }

    /// Mutable access to two distinct sheets at once
    pub fn sheet_pair_mut(&mut self, a: usize, b: usize) -> Option<(&mut Sheet, &mut Sheet)> {
        if a == b || a >= self.sheets.len() || b >= self.sheets.len() {
            return None;
        }
        if a < b {
            let (left, right) = self.sheets.split_at_mut(b);
            Some((&mut left[a], &mut right[0]))
        } else {
            let (left, right) = self.sheets.split_at_mut(a);
            Some((&mut right[0], &mut left[b]))
        }
    }
}

/// Truncate `base` so that `base + suffix` fits the sheet name limit
fn fit_name(base: &str, suffix: &str) -> String {
    let keep = MAX_SHEET_NAME_LEN.saturating_sub(suffix.chars().count());
    let mut name: String = base.chars().take(keep).collect();
    name.push_str(suffix);
    name
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellValue;

    #[test]
    fn test_add_sheet_named_rejects_duplicates() {
        let mut wb = Workbook::new();
        assert_eq!(wb.add_sheet_named("Data"), Some(0));
        assert_eq!(wb.add_sheet_named("DATA"), None);
        assert_eq!(wb.add_sheet_named(""), None);
        assert_eq!(wb.add_sheet_named("Other"), Some(1));
        assert_eq!(wb.sheet_names(), vec!["Data", "Other"]);
    }

    #[test]
    fn test_scratch_sheet_names_are_unique() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("Data").unwrap();
        wb.add_sheet_named("sorted_Data").unwrap();

        let idx = wb.add_scratch_sheet("Data").unwrap();
        assert_eq!(wb.sheet(idx).unwrap().name, "sorted_Data_2");
    }

    #[test]
    fn test_scratch_sheet_name_truncated() {
        let mut wb = Workbook::new();
        let long = "A".repeat(31);
        wb.add_sheet_named(&long).unwrap();

        let first = wb.add_scratch_sheet(&long).unwrap();
        let second = wb.add_scratch_sheet(&long).unwrap();

        let first_name = &wb.sheet(first).unwrap().name;
        let second_name = &wb.sheet(second).unwrap().name;
        assert_eq!(first_name.chars().count(), 31);
        assert!(first_name.starts_with("sorted_"));
        assert!(second_name.ends_with("_2"));
        assert_eq!(second_name.chars().count(), 31);
    }

    #[test]
    fn test_sheet_pair_mut() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("A").unwrap();
        wb.add_sheet_named("B").unwrap();

        {
            let (b, a) = wb.sheet_pair_mut(1, 0).unwrap();
            a.set_value(0, 0, CellValue::Text("in a".into()));
            b.set_value(0, 0, CellValue::Text("in b".into()));
        }
        assert_eq!(wb.sheet(0).unwrap().get_raw(0, 0), "in a");
        assert_eq!(wb.sheet(1).unwrap().get_raw(0, 0), "in b");

        assert!(wb.sheet_pair_mut(0, 0).is_none());
        assert!(wb.sheet_pair_mut(0, 2).is_none());
    }

    #[test]
    fn test_delete_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet_named("A").unwrap();
        wb.add_sheet_named("B").unwrap();
        assert!(wb.delete_sheet(1));
        assert!(!wb.delete_sheet(1));
        assert_eq!(wb.sheet_count(), 1);
    }
}
