//! Sheet sort arguments.
//!
//! Each argument names a sheet, its sort keys and the first row to sort:
//! `[sheet:{col!A|D,...}:startRow]`, e.g. `[0:{0!A,1!D}:1]`.

use std::fmt;

use regex::Regex;
use sheetsort_engine::sort::{SheetSort, SortDirection, SortKey};

pub const SHEET_SORT_PATTERN: &str = r"\[(\d+):\{(.*?)\}:(\d+)\]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// The argument does not contain `[sheet:{keys}:startRow]`
    Malformed { arg: String },
    /// A sheet index or start row that does not fit in usize
    IndexOverflow { arg: String, value: String },
    /// `{}` with no column sorts
    NoKeys { arg: String },
    /// A column sort that is not `<col>!A` or `<col>!D`
    BadColumnSort { arg: String, token: String },
    Pattern(String),
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::Malformed { arg } => {
                write!(f, "'{}' is not a sheet sort ([sheet:{{col!A|D,...}}:startRow])", arg)
            }
            SpecError::IndexOverflow { arg, value } => {
                write!(f, "'{}': index {} is too large", arg, value)
            }
            SpecError::NoKeys { arg } => write!(f, "'{}': no column sorts given", arg),
            SpecError::BadColumnSort { arg, token } => {
                write!(f, "'{}': bad column sort '{}' (expected <col>!A or <col>!D)", arg, token)
            }
            SpecError::Pattern(e) => write!(f, "sheet sort pattern: {}", e),
        }
    }
}

impl std::error::Error for SpecError {}

fn parse_index(arg: &str, value: &str) -> Result<usize, SpecError> {
    value.parse().map_err(|_| SpecError::IndexOverflow {
        arg: arg.to_string(),
        value: value.to_string(),
    })
}

/// Parse `col!A` / `col!D` (case-insensitive direction letter)
pub fn parse_column_sort(arg: &str, token: &str) -> Result<SortKey, SpecError> {
    let bad = || SpecError::BadColumnSort {
        arg: arg.to_string(),
        token: token.to_string(),
    };
    let (col, dir) = token.trim().split_once('!').ok_or_else(bad)?;
    let column: usize = col.trim().parse().map_err(|_| bad())?;
    let direction = match dir.trim() {
        "A" | "a" => SortDirection::Ascending,
        "D" | "d" => SortDirection::Descending,
        _ => return Err(bad()),
    };
    Ok(SortKey::new(column, direction))
}

/// Parse one sheet sort argument. The bracketed form may appear anywhere
/// in the argument; the first occurrence is used.
pub fn parse_sheet_sort(arg: &str) -> Result<SheetSort, SpecError> {
    let re = Regex::new(SHEET_SORT_PATTERN).map_err(|e| SpecError::Pattern(e.to_string()))?;
    let caps = re.captures(arg).ok_or_else(|| SpecError::Malformed { arg: arg.to_string() })?;

    let sheet_index = parse_index(arg, &caps[1])?;
    let start_row = parse_index(arg, &caps[3])?;

    let keys_text = caps[2].trim();
    if keys_text.is_empty() {
        return Err(SpecError::NoKeys { arg: arg.to_string() });
    }
    let keys = keys_text
        .split(',')
        .map(|token| parse_column_sort(arg, token))
        .collect::<Result<Vec<_>, _>>()?;

    log::info!("Parse Argument:");
    log::info!("....sheetIndex:{}", sheet_index);
    log::info!("....columnSortList:{}", keys_text);
    log::info!("....rowStartIndex:{}", start_row);

    Ok(SheetSort { sheet_index, keys, start_row })
}
