// Excel file import (xlsx, xlsm, xls, xlsb, ods) and export (xlsx only)
//
// Import: calamine supplies values and formula text; for xlsx/xlsm the
//         side-channel parser in xlsx_parts layers styles, row layout,
//         merges, hyperlinks and comments on top.
// Export: everything the row model carries is written back, so a sorted
//         workbook keeps the presentation of its rows.

use std::path::{Path, PathBuf};
use std::time::Instant;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatUnderline, Note, Url, Workbook as XlsxWorkbook, Worksheet,
    XlsxError,
};
use sheetsort_engine::cell::{
    Alignment, Cell, CellStyle, CellValue, Comment, ErrorKind, Hyperlink, VerticalAlignment,
};
use sheetsort_engine::sheet::{MergedRegion, Sheet, MAX_COLS};
use sheetsort_engine::workbook::{Workbook, SORTED_PREFIX};

use crate::xlsx_parts::{self, SheetParts, StyleTable};
use crate::IoError;

/// Excel's row limit
const MAX_ROWS: usize = 1_048_576;

/// Prefix that marks a workbook-internal hyperlink for rust_xlsxwriter
const INTERNAL_URL_PREFIX: &str = "internal:";

// =============================================================================
// Import
// =============================================================================

/// Result of an Excel import operation
#[derive(Debug, Default)]
pub struct ImportReport {
    pub sheets_imported: usize,
    pub cells_imported: usize,
    pub formulas_imported: usize,
    pub styles_applied: usize,
    /// Rows with a custom height or hidden flag
    pub rows_with_layout: usize,
    pub merges_imported: usize,
    /// Single-cell or overlapping merges that were not kept
    pub merges_dropped: usize,
    pub comments_imported: usize,
    pub hyperlinks_imported: usize,
    pub unsupported_features: Vec<String>,
    pub warnings: Vec<String>,
    pub import_duration_ms: u128,
}

/// Import an Excel file (xlsx, xlsm, xls, xlsb, ods)
pub fn import(path: &Path) -> Result<(Workbook, ImportReport), IoError> {
    let start_time = Instant::now();

    let mut source: Sheets<_> = open_workbook_auto(path).map_err(|e| IoError::Open {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let sheet_names: Vec<String> = source.sheet_names().to_vec();
    if sheet_names.is_empty() {
        return Err(IoError::NoSheets { path: path.to_path_buf() });
    }

    let mut report = ImportReport::default();
    let mut sheets = Vec::with_capacity(sheet_names.len());

    for sheet_name in &sheet_names {
        let mut sheet = Sheet::new_with_name(sheet_name);

        let range = source.worksheet_range(sheet_name).map_err(|e| IoError::Read {
            sheet: sheet_name.clone(),
            message: e.to_string(),
        })?;
        let (data_start_row, data_start_col) = range.start().unwrap_or((0, 0));
        for (row_idx, row) in range.rows().enumerate() {
            let target_row = data_start_row as usize + row_idx;
            if target_row >= MAX_ROWS {
                break;
            }
            for (col_idx, data) in row.iter().enumerate() {
                let target_col = data_start_col as usize + col_idx;
                if target_col >= MAX_COLS {
                    break;
                }
                if let Some(value) = value_from_data(data) {
                    sheet.set_value(target_row, target_col, value);
                    report.cells_imported += 1;
                }
            }
        }

        // Formula range may start at a different offset than data range
        if let Ok(formula_range) = source.worksheet_formula(sheet_name) {
            let (formula_start_row, formula_start_col) = formula_range.start().unwrap_or((0, 0));
            for (row_idx, row) in formula_range.rows().enumerate() {
                let target_row = formula_start_row as usize + row_idx;
                for (col_idx, formula) in row.iter().enumerate() {
                    let target_col = formula_start_col as usize + col_idx;
                    if formula.is_empty() || target_row >= MAX_ROWS || target_col >= MAX_COLS {
                        continue;
                    }
                    let src = formula.strip_prefix('=').unwrap_or(formula);
                    // Error cells are exported as their literal
                    let value = match ErrorKind::parse(src) {
                        Some(kind) => CellValue::Error(kind),
                        None => {
                            report.formulas_imported += 1;
                            CellValue::Formula(src.to_string())
                        }
                    };
                    sheet.set_value(target_row, target_col, value);
                }
            }
        }

        sheets.push(sheet);
        report.sheets_imported += 1;
    }

    if has_xlsx_parts(path) {
        match xlsx_parts::parse_xlsx_parts(path, &sheet_names) {
            Ok((styles, parts, stats)) => {
                for (sheet, parts) in sheets.iter_mut().zip(parts) {
                    apply_parts(sheet, parts, &styles, &mut report);
                }
                report.unsupported_features = stats.unsupported_features;
            }
            Err(e) => {
                log::warn!("formatting not imported from {}: {}", path.display(), e);
                report.warnings.push(format!("Formatting not imported: {}", e));
            }
        }
    }

    report.import_duration_ms = start_time.elapsed().as_millis();
    log::info!(
        "imported {} ({} sheets, {} cells, {} merges) in {} ms",
        path.display(),
        report.sheets_imported,
        report.cells_imported,
        report.merges_imported,
        report.import_duration_ms
    );
    Ok((Workbook::from_sheets(sheets), report))
}

fn has_xlsx_parts(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"))
        .unwrap_or(false)
}

fn value_from_data(data: &Data) -> Option<CellValue> {
    let value = match data {
        Data::Empty => return None,
        Data::String(s) if s.is_empty() => return None,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(n) => CellValue::Number(*n),
        Data::Int(n) => CellValue::Number(*n as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::Error(e) => {
            let literal = e.to_string();
            match ErrorKind::parse(&literal) {
                Some(kind) => CellValue::Error(kind),
                None => CellValue::Text(literal),
            }
        }
        // Serial number; the date display comes back through the number format
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
    };
    Some(value)
}

/// Run `f` on the cell at (row, col), creating a blank one if needed
fn with_cell(sheet: &mut Sheet, row: usize, col: usize, f: impl FnOnce(&mut Cell)) {
    let row = sheet.ensure_row(row);
    if let Some(cell) = row.cell_mut(col) {
        f(cell);
        return;
    }
    let mut cell = Cell::default();
    f(&mut cell);
    row.set_cell(col, cell);
}

fn apply_parts(sheet: &mut Sheet, parts: SheetParts, styles: &StyleTable, report: &mut ImportReport) {
    for (row, col, style_id) in parts.cell_styles {
        let Some(style) = styles.get(style_id) else {
            continue;
        };
        if style.is_default() {
            continue;
        }
        let exists = sheet.cell(row, col).is_some();
        if exists || xlsx_parts::is_style_visually_relevant(style) {
            with_cell(sheet, row, col, |cell| cell.style = style.clone());
            report.styles_applied += 1;
        }
    }

    for meta in parts.rows {
        let row = sheet.ensure_row(meta.row);
        row.height = meta.height;
        row.hidden = meta.hidden;
        report.rows_with_layout += 1;
    }

    for (sr, sc, er, ec) in parts.merged_regions {
        let region = MergedRegion::new(sr, sc, er, ec);
        if region.is_single_cell() {
            report.merges_dropped += 1;
            continue;
        }
        match sheet.add_merge(region) {
            Ok(()) => report.merges_imported += 1,
            Err(e) => {
                report.merges_dropped += 1;
                report.warnings.push(format!("Sheet '{}': {}", sheet.name, e));
            }
        }
    }

    for link in parts.hyperlinks {
        let hyperlink = if link.internal {
            Hyperlink::internal(link.target)
        } else {
            Hyperlink::url(link.target)
        };
        with_cell(sheet, link.row, link.col, |cell| cell.hyperlink = Some(hyperlink));
        report.hyperlinks_imported += 1;
    }

    for parsed in parts.comments {
        let mut comment = Comment::new(parsed.text);
        if let Some(author) = parsed.author {
            comment = comment.with_author(author);
        }
        with_cell(sheet, parsed.row, parsed.col, |cell| cell.comment = Some(comment));
        report.comments_imported += 1;
    }
}

// =============================================================================
// Export
// =============================================================================

/// Result of an Excel export operation
#[derive(Debug, Default)]
pub struct ExportReport {
    pub sheets_exported: usize,
    pub cells_exported: usize,
    pub formulas_exported: usize,
    pub merges_exported: usize,
    pub notes_exported: usize,
    pub links_exported: usize,
    pub rows_with_layout: usize,
    pub warnings: Vec<String>,
    pub export_duration_ms: u128,
}

/// Export a workbook to XLSX
pub fn export(workbook: &Workbook, path: &Path) -> Result<ExportReport, IoError> {
    let start_time = Instant::now();
    let mut report = ExportReport::default();
    let write_error = |e: XlsxError| IoError::Write {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let mut xlsx_workbook = XlsxWorkbook::new();

    for sheet in workbook.sheets() {
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&sheet.name)
            .map_err(write_error)?;

        // merge_range() writes blanks to every cell in the range; the anchor
        // cell is overwritten with its typed value below
        let merge_format = Format::new();
        for merge in sheet.merged_regions() {
            let written = worksheet.merge_range(
                merge.first_row as u32,
                merge.first_col as u16,
                merge.last_row as u32,
                merge.last_col as u16,
                "",
                &merge_format,
            );
            match written {
                Ok(_) => report.merges_exported += 1,
                Err(e) => {
                    log::warn!("sheet '{}': merge skipped: {}", sheet.name, e);
                    report.warnings.push(format!("Sheet '{}': merge skipped: {}", sheet.name, e));
                }
            }
        }

        export_sheet_cells(sheet, worksheet, &mut report).map_err(write_error)?;

        for (index, row) in sheet.rows_iter() {
            if let Some(height) = row.height {
                worksheet.set_row_height(index as u32, height).map_err(write_error)?;
            }
            if row.hidden {
                worksheet.set_row_hidden(index as u32).map_err(write_error)?;
            }
            if row.height.is_some() || row.hidden {
                report.rows_with_layout += 1;
            }
        }

        report.sheets_exported += 1;
    }

    xlsx_workbook.save(path).map_err(write_error)?;

    report.export_duration_ms = start_time.elapsed().as_millis();
    log::info!(
        "exported {} ({} sheets, {} cells) in {} ms",
        path.display(),
        report.sheets_exported,
        report.cells_exported,
        report.export_duration_ms
    );
    Ok(report)
}

fn export_sheet_cells(
    sheet: &Sheet,
    worksheet: &mut Worksheet,
    report: &mut ExportReport,
) -> Result<(), XlsxError> {
    for (r, row) in sheet.rows_iter() {
        let row_num = r as u32;
        for (c, cell) in row.cells() {
            let col_num = c as u16;
            let format = build_excel_format(&cell.style);

            // The link goes first; the typed write below replaces its text
            if let Some(link) = &cell.hyperlink {
                let url = if link.internal {
                    Url::new(format!("{}{}", INTERNAL_URL_PREFIX, link.target))
                } else {
                    Url::new(link.target.as_str())
                };
                match worksheet.write_url(row_num, col_num, url) {
                    Ok(_) => report.links_exported += 1,
                    Err(e) => report.warnings.push(format!(
                        "Sheet '{}': link at row {} col {} skipped: {}",
                        sheet.name,
                        r + 1,
                        c + 1,
                        e
                    )),
                }
            }

            match &cell.value {
                CellValue::Blank => {
                    if !cell.style.is_default() {
                        worksheet.write_blank(row_num, col_num, &format)?;
                    }
                }
                CellValue::Text(s) => {
                    worksheet.write_string_with_format(row_num, col_num, s, &format)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number_with_format(row_num, col_num, *n, &format)?;
                }
                CellValue::Boolean(b) => {
                    worksheet.write_boolean_with_format(row_num, col_num, *b, &format)?;
                }
                CellValue::Formula(src) => {
                    worksheet.write_formula_with_format(row_num, col_num, src.as_str(), &format)?;
                    report.formulas_exported += 1;
                }
                CellValue::Error(ErrorKind::GettingData) => {
                    worksheet.write_string_with_format(
                        row_num,
                        col_num,
                        ErrorKind::GettingData.as_str(),
                        &format,
                    )?;
                }
                CellValue::Error(kind) => {
                    worksheet.write_formula_with_format(row_num, col_num, kind.as_str(), &format)?;
                }
            }
            if !cell.value.is_blank() {
                report.cells_exported += 1;
            }

            if let Some(comment) = &cell.comment {
                let mut note = Note::new(comment.text.as_str()).add_author_prefix(false);
                if let Some(author) = &comment.author {
                    note = note.set_author(author.as_str());
                }
                worksheet.insert_note(row_num, col_num, &note)?;
                report.notes_exported += 1;
            }
        }
    }
    Ok(())
}

fn rgba_to_color(rgba: [u8; 4]) -> Color {
    Color::RGB(((rgba[0] as u32) << 16) | ((rgba[1] as u32) << 8) | rgba[2] as u32)
}

/// Convert a cell style to an Excel Format
fn build_excel_format(style: &CellStyle) -> Format {
    let mut format = Format::new();

    if style.bold {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if style.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if style.strikethrough {
        format = format.set_font_strikethrough();
    }
    if let Some(size) = style.font_size {
        format = format.set_font_size(size);
    }
    if let Some(color) = style.font_color {
        format = format.set_font_color(rgba_to_color(color));
    }
    if let Some(family) = &style.font_family {
        format = format.set_font_name(family);
    }
    if let Some(color) = style.background_color {
        format = format.set_background_color(rgba_to_color(color));
    }
    if let Some(code) = &style.number_format {
        format = format.set_num_format(code);
    }

    format = match style.alignment {
        Alignment::General => format,
        Alignment::Left => format.set_align(FormatAlign::Left),
        Alignment::Center => format.set_align(FormatAlign::Center),
        Alignment::Right => format.set_align(FormatAlign::Right),
    };
    format = match style.vertical_alignment {
        VerticalAlignment::Bottom => format,
        VerticalAlignment::Top => format.set_align(FormatAlign::Top),
        VerticalAlignment::Middle => format.set_align(FormatAlign::VerticalCenter),
    };
    if style.wrap_text {
        format = format.set_text_wrap();
    }

    format
}

// =============================================================================
// Output naming
// =============================================================================

/// `<dir>/sorted_<name>`; inputs that are not xlsx get an .xlsx extension
/// because export only writes xlsx.
pub fn sorted_output_path(input: &Path) -> PathBuf {
    output_path_with_prefix(input, SORTED_PREFIX)
}

pub fn output_path_with_prefix(input: &Path, prefix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm") => ext,
        _ => "xlsx",
    };
    input.with_file_name(format!("{}{}.{}", prefix, stem, ext))
}
