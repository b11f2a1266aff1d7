//! XLSX side-channel parser: reads what calamine does not expose straight from
//! the ZIP parts. Styles come from styles.xml (cellXfs resolved against
//! numFmts, fonts and fills); per-sheet data comes from the worksheet XML
//! (cell style ids, row height/hidden, merges, hyperlinks) and from the
//! comments part linked through the worksheet rels.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use sheetsort_engine::cell::{Alignment, CellStyle, VerticalAlignment};
use sheetsort_engine::sheet::MAX_COLS;
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;
use zip::ZipArchive;

const REL_TYPE_COMMENTS: &str = "/comments";
const REL_TYPE_HYPERLINK: &str = "/hyperlink";

// =============================================================================
// Public types
// =============================================================================

/// cellXfs index → CellStyle
#[derive(Debug, Default)]
pub struct StyleTable {
    pub styles: Vec<CellStyle>,
}

impl StyleTable {
    pub fn get(&self, id: usize) -> Option<&CellStyle> {
        self.styles.get(id)
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RowMeta {
    pub row: usize,
    /// Only set when the row carries customHeight
    pub height: Option<f64>,
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedHyperlink {
    pub row: usize,
    pub col: usize,
    /// External URL (resolved through the sheet rels) or in-workbook location
    pub target: String,
    pub internal: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedComment {
    pub row: usize,
    pub col: usize,
    pub author: Option<String>,
    pub text: String,
}

/// Everything read from one worksheet's parts
#[derive(Debug, Default)]
pub struct SheetParts {
    /// (row, col, style_id) triples, style 0 omitted
    pub cell_styles: Vec<(usize, usize, usize)>,
    pub rows: Vec<RowMeta>,
    /// (start_row, start_col, end_row, end_col)
    pub merged_regions: Vec<(usize, usize, usize, usize)>,
    pub hyperlinks: Vec<ParsedHyperlink>,
    pub comments: Vec<ParsedComment>,
}

#[derive(Debug, Default)]
pub struct PartsStats {
    pub unique_styles: usize,
    pub unsupported_features: Vec<String>,
}

// =============================================================================
// XML helpers
// =============================================================================

/// Unescape the 5 predefined XML entities: &amp; &lt; &gt; &quot; &apos;
fn unescape_xml(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    s.replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn attr_string(value: &[u8]) -> String {
    unescape_xml(&String::from_utf8_lossy(value))
}

fn attr_parse<T: std::str::FromStr>(value: &[u8]) -> Option<T> {
    std::str::from_utf8(value).ok().and_then(|s| s.parse().ok())
}

fn attr_flag(value: &[u8]) -> bool {
    value == b"1" || value == b"true"
}

/// Local part of a possibly prefixed tag name (`x:row` → `row`)
fn local_name(e: &BytesStart) -> Vec<u8> {
    e.local_name().as_ref().to_vec()
}

fn unsupported_once(unsupported: &mut Vec<String>, feature: &str) {
    if !unsupported.iter().any(|s| s == feature) {
        unsupported.push(feature.to_string());
    }
}

// =============================================================================
// Number formats and colors
// =============================================================================

/// Format code of a built-in numFmtId. 0 (General) and unknown ids are None.
fn builtin_number_format(id: u16) -> Option<&'static str> {
    let code = match id {
        1 => "0",
        2 => "0.00",
        3 => "#,##0",
        4 => "#,##0.00",
        9 => "0%",
        10 => "0.00%",
        11 => "0.00E+00",
        12 => "# ?/?",
        13 => "# ??/??",
        14 => "mm-dd-yy",
        15 => "d-mmm-yy",
        16 => "d-mmm",
        17 => "mmm-yy",
        18 => "h:mm AM/PM",
        19 => "h:mm:ss AM/PM",
        20 => "h:mm",
        21 => "h:mm:ss",
        22 => "m/d/yy h:mm",
        37 => "#,##0 ;(#,##0)",
        38 => "#,##0 ;[Red](#,##0)",
        39 => "#,##0.00;(#,##0.00)",
        40 => "#,##0.00;[Red](#,##0.00)",
        45 => "mm:ss",
        46 => "[h]:mm:ss",
        47 => "mmss.0",
        48 => "##0.0E+0",
        49 => "@",
        _ => return None,
    };
    Some(code)
}

/// First 8 entries of the legacy indexed palette (0-7 repeat as 8-15)
fn indexed_color(idx: u8) -> Option<[u8; 4]> {
    let rgb = match idx % 8 {
        0 => [0x00, 0x00, 0x00],
        1 => [0xFF, 0xFF, 0xFF],
        2 => [0xFF, 0x00, 0x00],
        3 => [0x00, 0xFF, 0x00],
        4 => [0x00, 0x00, 0xFF],
        5 => [0xFF, 0xFF, 0x00],
        6 => [0xFF, 0x00, 0xFF],
        _ => [0x00, 0xFF, 0xFF],
    };
    if idx < 16 {
        Some([rgb[0], rgb[1], rgb[2], 0xFF])
    } else {
        None
    }
}

/// Parse AARRGGBB or RRGGBB hex to RGBA
fn parse_argb_hex(s: &str) -> Option<[u8; 4]> {
    let s = s.trim_start_matches('#');
    let byte = |i: usize| u8::from_str_radix(s.get(i..i + 2)?, 16).ok();
    match s.len() {
        8 => Some([byte(2)?, byte(4)?, byte(6)?, byte(0)?]),
        6 => Some([byte(0)?, byte(2)?, byte(4)?, 0xFF]),
        _ => None,
    }
}

/// rgb > indexed; theme colors are reported as unsupported
fn parse_color(e: &BytesStart, unsupported: &mut Vec<String>) -> Option<[u8; 4]> {
    let mut indexed = None;
    let mut themed = false;
    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"rgb" => return parse_argb_hex(&attr_string(&attr.value)),
            b"indexed" => indexed = attr_parse::<u8>(&attr.value),
            b"theme" => themed = true,
            _ => {}
        }
    }
    if let Some(idx) = indexed {
        return indexed_color(idx);
    }
    if themed {
        unsupported_once(unsupported, "theme colors");
    }
    None
}

// =============================================================================
// styles.xml
// =============================================================================

#[derive(Debug, Clone, Default)]
struct ParsedFont {
    bold: bool,
    italic: bool,
    underline: bool,
    strikethrough: bool,
    size: Option<f32>,
    color: Option<[u8; 4]>,
    family: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct ParsedFill {
    bg_color: Option<[u8; 4]>,
}

#[derive(Debug, Default)]
struct XfEntry {
    num_fmt_id: Option<u16>,
    font_id: Option<usize>,
    fill_id: Option<usize>,
    h_align: Option<String>,
    v_align: Option<String>,
    wrap_text: bool,
}

impl XfEntry {
    fn from_xf(e: &BytesStart) -> Self {
        let mut xf = XfEntry::default();
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"numFmtId" => xf.num_fmt_id = attr_parse(&attr.value),
                b"fontId" => xf.font_id = attr_parse(&attr.value),
                b"fillId" => xf.fill_id = attr_parse(&attr.value),
                _ => {}
            }
        }
        xf
    }

    fn read_alignment(&mut self, e: &BytesStart) {
        for attr in e.attributes().flatten() {
            match attr.key.as_ref() {
                b"horizontal" => self.h_align = Some(attr_string(&attr.value)),
                b"vertical" => self.v_align = Some(attr_string(&attr.value)),
                b"wrapText" => self.wrap_text = attr_flag(&attr.value),
                _ => {}
            }
        }
    }
}

/// Parse styles.xml into a StyleTable plus a list of unsupported features seen.
pub fn parse_styles_xml(xml: &str) -> (StyleTable, Vec<String>) {
    let mut unsupported = Vec::new();
    let num_fmts = parse_num_fmts(xml);
    let fonts = parse_fonts(xml, &mut unsupported);
    let fills = parse_fills(xml, &mut unsupported);
    let styles = parse_cell_xfs(xml, &num_fmts, &fonts, &fills);
    (StyleTable { styles }, unsupported)
}

fn parse_num_fmts(xml: &str) -> HashMap<u16, String> {
    let mut map = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e) == b"numFmt" => {
                let mut id = None;
                let mut code = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"numFmtId" => id = attr_parse::<u16>(&attr.value),
                        b"formatCode" => code = Some(attr_string(&attr.value)),
                        _ => {}
                    }
                }
                if let (Some(id), Some(code)) = (id, code) {
                    map.insert(id, code);
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"numFmts" => break,
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    map
}

fn parse_fonts(xml: &str, unsupported: &mut Vec<String>) -> Vec<ParsedFont> {
    let mut fonts = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fonts>, 2 = inside <font>
    let mut current = ParsedFont::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e).as_slice() {
                b"fonts" if depth == 0 => depth = 1,
                b"font" if depth == 1 => {
                    depth = 2;
                    current = ParsedFont::default();
                }
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => match local_name(e).as_slice() {
                b"b" => current.bold = true,
                b"i" => current.italic = true,
                b"u" => current.underline = true,
                b"strike" => current.strikethrough = true,
                b"sz" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            current.size = attr_parse(&attr.value);
                        }
                    }
                }
                b"color" => current.color = parse_color(e, unsupported),
                b"name" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"val" {
                            current.family = Some(attr_string(&attr.value));
                        }
                    }
                }
                _ => {}
            },
            // <font/> with no children
            Ok(Event::Empty(ref e)) if depth == 1 && local_name(e) == b"font" => {
                fonts.push(ParsedFont::default());
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"font" if depth == 2 => {
                    fonts.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"fonts" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    fonts
}

fn parse_fills(xml: &str, unsupported: &mut Vec<String>) -> Vec<ParsedFill> {
    let mut fills = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut depth = 0; // 0 = outside, 1 = inside <fills>, 2 = inside <fill>
    let mut solid = false;
    let mut current = ParsedFill::default();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e).as_slice() {
                b"fills" if depth == 0 => depth = 1,
                b"fill" if depth == 1 => {
                    depth = 2;
                    current = ParsedFill::default();
                    solid = false;
                }
                b"patternFill" if depth == 2 => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"patternType" {
                            solid = attr.value.as_ref() == b"solid";
                        }
                    }
                }
                b"gradientFill" if depth == 2 => unsupported_once(unsupported, "gradient fills"),
                _ => {}
            },
            Ok(Event::Empty(ref e)) if depth == 2 => {
                if local_name(e) == b"fgColor" && solid {
                    current.bg_color = parse_color(e, unsupported);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"fill" if depth == 2 => {
                    fills.push(std::mem::take(&mut current));
                    depth = 1;
                }
                b"fills" if depth == 1 => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    fills
}

fn parse_cell_xfs(
    xml: &str,
    num_fmts: &HashMap<u16, String>,
    fonts: &[ParsedFont],
    fills: &[ParsedFill],
) -> Vec<CellStyle> {
    let mut styles = Vec::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut in_cell_xfs = false;
    let mut current: Option<XfEntry> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e).as_slice() {
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => current = Some(XfEntry::from_xf(e)),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e).as_slice() {
                b"xf" if in_cell_xfs => {
                    styles.push(resolve_xf(&XfEntry::from_xf(e), num_fmts, fonts, fills));
                }
                b"alignment" => {
                    if let Some(xf) = current.as_mut() {
                        xf.read_alignment(e);
                    }
                }
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"xf" => {
                    if let Some(xf) = current.take() {
                        styles.push(resolve_xf(&xf, num_fmts, fonts, fills));
                    }
                }
                b"cellXfs" => break,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    styles
}

fn resolve_xf(
    xf: &XfEntry,
    num_fmts: &HashMap<u16, String>,
    fonts: &[ParsedFont],
    fills: &[ParsedFill],
) -> CellStyle {
    let mut style = CellStyle::default();

    if let Some(font) = xf.font_id.and_then(|id| fonts.get(id)) {
        style.bold = font.bold;
        style.italic = font.italic;
        style.underline = font.underline;
        style.strikethrough = font.strikethrough;
        style.font_size = font.size;
        style.font_color = font.color;
        style.font_family = font.family.clone();
    }

    if let Some(fill) = xf.fill_id.and_then(|id| fills.get(id)) {
        style.background_color = fill.bg_color;
    }

    if let Some(id) = xf.num_fmt_id {
        style.number_format = num_fmts
            .get(&id)
            .cloned()
            .or_else(|| builtin_number_format(id).map(str::to_string));
    }

    if let Some(h) = xf.h_align.as_deref() {
        style.alignment = match h {
            "left" => Alignment::Left,
            "center" | "centerContinuous" => Alignment::Center,
            "right" => Alignment::Right,
            _ => Alignment::General,
        };
    }
    if let Some(v) = xf.v_align.as_deref() {
        style.vertical_alignment = match v {
            "top" => VerticalAlignment::Top,
            "center" => VerticalAlignment::Middle,
            _ => VerticalAlignment::Bottom,
        };
    }
    style.wrap_text = xf.wrap_text;

    style
}

/// Empty cells are only materialized for styles that show without content
pub fn is_style_visually_relevant(style: &CellStyle) -> bool {
    style.background_color.is_some()
}

// =============================================================================
// Worksheet XML
// =============================================================================

/// Hyperlink as written in the sheet, before rels resolution
#[derive(Debug, Clone, PartialEq)]
struct RawHyperlink {
    row: usize,
    col: usize,
    rel_id: Option<String>,
    location: Option<String>,
}

#[derive(Debug, Default)]
struct SheetXml {
    cell_styles: Vec<(usize, usize, usize)>,
    rows: Vec<RowMeta>,
    merged_regions: Vec<(usize, usize, usize, usize)>,
    hyperlinks: Vec<RawHyperlink>,
}

fn parse_sheet_xml(xml: &str) -> SheetXml {
    let mut out = SheetXml::default();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match local_name(e).as_slice() {
                b"row" => {
                    let mut row = None;
                    let mut ht = None;
                    let mut custom_height = false;
                    let mut hidden = false;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"r" => row = attr_parse::<usize>(&attr.value).map(|r| r.saturating_sub(1)),
                            b"ht" => ht = attr_parse::<f64>(&attr.value),
                            b"customHeight" => custom_height = attr_flag(&attr.value),
                            b"hidden" => hidden = attr_flag(&attr.value),
                            _ => {}
                        }
                    }
                    let height = if custom_height { ht } else { None };
                    if let Some(row) = row {
                        if height.is_some() || hidden {
                            out.rows.push(RowMeta { row, height, hidden });
                        }
                    }
                }
                b"c" => {
                    let mut style_id = None;
                    let mut cell_ref = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"s" => style_id = attr_parse::<usize>(&attr.value),
                            b"r" => cell_ref = Some(attr_string(&attr.value)),
                            _ => {}
                        }
                    }
                    // style 0 is the default
                    if let (Some(style_id), Some(cell_ref)) = (style_id, cell_ref) {
                        if style_id > 0 {
                            if let Some((row, col)) = parse_cell_ref(&cell_ref) {
                                out.cell_styles.push((row, col, style_id));
                            }
                        }
                    }
                }
                b"mergeCell" => {
                    for attr in e.attributes().flatten() {
                        if attr.key.as_ref() == b"ref" {
                            if let Some(region) = parse_merge_ref(&attr_string(&attr.value)) {
                                out.merged_regions.push(region);
                            }
                        }
                    }
                }
                b"hyperlink" => {
                    let mut cell = None;
                    let mut rel_id = None;
                    let mut location = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"ref" => cell = parse_merge_ref(&attr_string(&attr.value))
                                .map(|(r, c, _, _)| (r, c))
                                .or_else(|| parse_cell_ref(&attr_string(&attr.value))),
                            b"r:id" => rel_id = Some(attr_string(&attr.value)),
                            b"location" => location = Some(attr_string(&attr.value)),
                            _ => {}
                        }
                    }
                    if let Some((row, col)) = cell {
                        out.hyperlinks.push(RawHyperlink { row, col, rel_id, location });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    out
}

/// Parse a range reference like "A1:C3" into (start_row, start_col, end_row, end_col).
pub fn parse_merge_ref(r: &str) -> Option<(usize, usize, usize, usize)> {
    let (start, end) = r.split_once(':')?;
    let (sr, sc) = parse_cell_ref(start)?;
    let (er, ec) = parse_cell_ref(end)?;
    Some((sr, sc, er, ec))
}

/// Parse a cell reference like "B5" (or "$B$5") into (row, col) = (4, 1).
pub fn parse_cell_ref(r: &str) -> Option<(usize, usize)> {
    let r = r.trim().replace('$', "");
    let split = r.find(|c: char| c.is_ascii_digit())?;
    let (col_part, row_part) = r.split_at(split);
    if col_part.is_empty() || !col_part.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    let mut col: usize = 0;
    for ch in col_part.chars() {
        let digit = ch.to_ascii_uppercase() as usize - 'A' as usize + 1;
        col = col.checked_mul(26)?.checked_add(digit)?;
        if col > MAX_COLS {
            return None;
        }
    }
    let row: usize = row_part.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

// =============================================================================
// Relationships and comments
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
struct Relationship {
    rel_type: String,
    target: String,
    external: bool,
}

fn parse_rels(xml: &str) -> HashMap<String, Relationship> {
    let mut rels = HashMap::new();
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e) == b"Relationship" => {
                let mut id = None;
                let mut rel = Relationship { rel_type: String::new(), target: String::new(), external: false };
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = Some(attr_string(&attr.value)),
                        b"Type" => rel.rel_type = attr_string(&attr.value),
                        b"Target" => rel.target = attr_string(&attr.value),
                        b"TargetMode" => rel.external = attr.value.as_ref() == b"External",
                        _ => {}
                    }
                }
                if let Some(id) = id {
                    rels.insert(id, rel);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    rels
}

/// Parse a comments part. Rich-text runs are flattened into plain text.
fn parse_comments_xml(xml: &str) -> Vec<ParsedComment> {
    let mut comments = Vec::new();
    let mut authors: Vec<String> = Vec::new();
    let mut reader = Reader::from_str(xml);
    // keep xml:space="preserve" whitespace
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut in_author = false;
    let mut in_t = false;
    let mut author_text = String::new();
    let mut current: Option<(usize, usize, Option<usize>)> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name(e).as_slice() {
                b"author" => {
                    in_author = true;
                    author_text.clear();
                }
                b"comment" => {
                    let mut cell = None;
                    let mut author_id = None;
                    for attr in e.attributes().flatten() {
                        match attr.key.as_ref() {
                            b"ref" => cell = parse_cell_ref(&attr_string(&attr.value)),
                            b"authorId" => author_id = attr_parse::<usize>(&attr.value),
                            _ => {}
                        }
                    }
                    current = cell.map(|(r, c)| (r, c, author_id));
                    text.clear();
                }
                b"t" if current.is_some() => in_t = true,
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                let chunk = unescape_xml(&String::from_utf8_lossy(e.as_ref()));
                if in_author {
                    author_text.push_str(&chunk);
                } else if in_t {
                    text.push_str(&chunk);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = false;
                    authors.push(std::mem::take(&mut author_text));
                }
                b"t" => in_t = false,
                b"comment" => {
                    if let Some((row, col, author_id)) = current.take() {
                        let author = author_id
                            .and_then(|id| authors.get(id))
                            .filter(|a| !a.is_empty())
                            .cloned();
                        comments.push(ParsedComment { row, col, author, text: std::mem::take(&mut text) });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }
    comments
}

/// Resolve a relationship target against the directory of the part that owns it.
/// "../comments1.xml" from "xl/worksheets/sheet1.xml" → "xl/comments1.xml";
/// absolute targets ("/xl/...") drop the leading slash.
fn resolve_part_path(owner: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = owner.split('/').collect();
    parts.pop();
    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// "xl/worksheets/sheet1.xml" → "xl/worksheets/_rels/sheet1.xml.rels"
fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

// =============================================================================
// Top-level entry point
// =============================================================================

/// Parse the side-channel parts of an XLSX file.
/// `sheet_names` must match the order of sheets in the workbook.
pub fn parse_xlsx_parts(
    path: &Path,
    sheet_names: &[String],
) -> Result<(StyleTable, Vec<SheetParts>, PartsStats), String> {
    let file = std::fs::File::open(path).map_err(|e| format!("Failed to open XLSX file: {}", e))?;
    let mut archive = ZipArchive::new(file).map_err(|e| format!("Failed to read XLSX as ZIP: {}", e))?;
    let mut stats = PartsStats::default();

    let style_table = match read_zip_file(&mut archive, "xl/styles.xml") {
        Ok(xml) => {
            let (table, unsupported) = parse_styles_xml(&xml);
            stats.unsupported_features = unsupported;
            table
        }
        Err(_) => StyleTable::default(),
    };
    stats.unique_styles = style_table.len();

    let workbook_xml = read_zip_file(&mut archive, "xl/workbook.xml").unwrap_or_default();
    let rels_xml = read_zip_file(&mut archive, "xl/_rels/workbook.xml.rels").unwrap_or_default();
    let worksheet_paths = resolve_worksheet_paths_for_sheets(&workbook_xml, &rels_xml, sheet_names);

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for ws_path in &worksheet_paths {
        let parts = match read_zip_file(&mut archive, ws_path) {
            Ok(xml) => sheet_parts(&mut archive, ws_path, &xml),
            Err(_) => SheetParts::default(),
        };
        sheets.push(parts);
    }
    while sheets.len() < sheet_names.len() {
        sheets.push(SheetParts::default());
    }

    Ok((style_table, sheets, stats))
}

fn sheet_parts<R: Read + Seek>(archive: &mut ZipArchive<R>, ws_path: &str, xml: &str) -> SheetParts {
    let parsed = parse_sheet_xml(xml);
    let rels = read_zip_file(archive, &rels_path_for(ws_path))
        .map(|x| parse_rels(&x))
        .unwrap_or_default();

    let hyperlinks = parsed
        .hyperlinks
        .into_iter()
        .filter_map(|link| {
            let external = link
                .rel_id
                .as_ref()
                .and_then(|id| rels.get(id))
                .filter(|rel| rel.rel_type.ends_with(REL_TYPE_HYPERLINK));
            match (external, link.location) {
                (Some(rel), _) => Some(ParsedHyperlink {
                    row: link.row,
                    col: link.col,
                    target: rel.target.clone(),
                    internal: !rel.external,
                }),
                (None, Some(location)) => Some(ParsedHyperlink {
                    row: link.row,
                    col: link.col,
                    target: location,
                    internal: true,
                }),
                (None, None) => None,
            }
        })
        .collect();

    let mut comments = Vec::new();
    for rel in rels.values().filter(|r| r.rel_type.ends_with(REL_TYPE_COMMENTS)) {
        let comments_path = resolve_part_path(ws_path, &rel.target);
        if let Ok(xml) = read_zip_file(archive, &comments_path) {
            comments.extend(parse_comments_xml(&xml));
        }
    }

    SheetParts {
        cell_styles: parsed.cell_styles,
        rows: parsed.rows,
        merged_regions: parsed.merged_regions,
        hyperlinks,
        comments,
    }
}

/// Read a file from a ZIP archive.
fn read_zip_file<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| format!("File '{}' not found in XLSX: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| format!("Failed to read '{}': {}", path, e))?;
    Ok(content)
}

/// Resolve worksheet XML paths for specific sheet names (in order).
fn resolve_worksheet_paths_for_sheets(
    workbook_xml: &str,
    rels_xml: &str,
    sheet_names: &[String],
) -> Vec<String> {
    let mut name_to_rid: HashMap<String, String> = HashMap::new();
    let mut reader = Reader::from_str(workbook_xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if local_name(e) == b"sheet" => {
                let mut name = None;
                let mut rid = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = Some(attr_string(&attr.value)),
                        b"r:id" => rid = Some(attr_string(&attr.value)),
                        _ => {}
                    }
                }
                if let (Some(name), Some(rid)) = (name, rid) {
                    name_to_rid.insert(name, rid);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    let rels = parse_rels(rels_xml);
    sheet_names
        .iter()
        .map(|name| {
            name_to_rid
                .get(name)
                .and_then(|rid| rels.get(rid))
                .map(|rel| resolve_part_path("xl/workbook.xml", &rel.target))
                .unwrap_or_default()
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="1"><numFmt numFmtId="164" formatCode="&quot;$&quot;#,##0.00"/></numFmts>
  <fonts count="2">
    <font><sz val="11"/><color theme="1"/><name val="Calibri"/></font>
    <font><b/><i/><sz val="14"/><color rgb="FFFF0000"/><name val="Arial"/></font>
  </fonts>
  <fills count="3">
    <fill><patternFill patternType="none"/></fill>
    <fill><patternFill patternType="gray125"/></fill>
    <fill><patternFill patternType="solid"><fgColor rgb="FF00FF00"/><bgColor indexed="64"/></patternFill></fill>
  </fills>
  <cellXfs count="4">
    <xf numFmtId="0" fontId="0" fillId="0"/>
    <xf numFmtId="164" fontId="1" fillId="0" applyFont="1"/>
    <xf numFmtId="10" fontId="0" fillId="2"><alignment horizontal="center" vertical="top" wrapText="1"/></xf>
    <xf numFmtId="14" fontId="0" fillId="0"/>
  </cellXfs>
</styleSheet>"#;

    #[test]
    fn test_parse_styles() {
        let (table, unsupported) = parse_styles_xml(STYLES);
        assert_eq!(table.len(), 4);

        let bold = table.get(1).unwrap();
        assert!(bold.bold && bold.italic);
        assert_eq!(bold.font_size, Some(14.0));
        assert_eq!(bold.font_color, Some([255, 0, 0, 255]));
        assert_eq!(bold.font_family.as_deref(), Some("Arial"));
        assert_eq!(bold.number_format.as_deref(), Some("\"$\"#,##0.00"));

        let filled = table.get(2).unwrap();
        assert_eq!(filled.background_color, Some([0, 255, 0, 255]));
        assert_eq!(filled.alignment, Alignment::Center);
        assert_eq!(filled.vertical_alignment, VerticalAlignment::Top);
        assert!(filled.wrap_text);
        assert_eq!(filled.number_format.as_deref(), Some("0.00%"));

        assert_eq!(table.get(3).unwrap().number_format.as_deref(), Some("mm-dd-yy"));
        assert!(table.get(0).unwrap().number_format.is_none());
        assert_eq!(unsupported, vec!["theme colors"]);
    }

    #[test]
    fn test_parse_sheet_xml() {
        let xml = r#"<worksheet xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
<sheetData>
  <row r="1"><c r="A1" s="1" t="s"><v>0</v></c><c r="B1"><v>2</v></c></row>
  <row r="2" ht="30" customHeight="1"><c r="A2" s="0"><v>1</v></c></row>
  <row r="3" hidden="1"/>
  <row r="4" ht="15"/>
</sheetData>
<mergeCells count="1"><mergeCell ref="A5:C6"/></mergeCells>
<hyperlinks>
  <hyperlink ref="A1" r:id="rId1"/>
  <hyperlink ref="B2" location="Other!A1" display="go"/>
</hyperlinks>
</worksheet>"#;
        let parsed = parse_sheet_xml(xml);

        assert_eq!(parsed.cell_styles, vec![(0, 0, 1)]);
        assert_eq!(
            parsed.rows,
            vec![
                RowMeta { row: 1, height: Some(30.0), hidden: false },
                RowMeta { row: 2, height: None, hidden: true },
            ]
        );
        assert_eq!(parsed.merged_regions, vec![(4, 0, 5, 2)]);
        assert_eq!(parsed.hyperlinks.len(), 2);
        assert_eq!(parsed.hyperlinks[0].rel_id.as_deref(), Some("rId1"));
        assert_eq!(parsed.hyperlinks[1].location.as_deref(), Some("Other!A1"));
    }

    #[test]
    fn test_parse_comments() {
        let xml = r#"<comments><authors><author>Ann</author><author>Bob</author></authors>
<commentList>
  <comment ref="B3" authorId="1"><text><r><rPr><b/></rPr><t xml:space="preserve">Check </t></r><r><t>this</t></r></text></comment>
  <comment ref="A1" authorId="0"><text><t>plain</t></text></comment>
</commentList></comments>"#;
        let comments = parse_comments_xml(xml);

        assert_eq!(
            comments,
            vec![
                ParsedComment { row: 2, col: 1, author: Some("Bob".into()), text: "Check this".into() },
                ParsedComment { row: 0, col: 0, author: Some("Ann".into()), text: "plain".into() },
            ]
        );
    }

    #[test]
    fn test_parse_rels() {
        let xml = r#"<Relationships>
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/>
<Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments1.xml"/>
</Relationships>"#;
        let rels = parse_rels(xml);

        let link = &rels["rId1"];
        assert!(link.external);
        assert_eq!(link.target, "https://example.com/?a=1&b=2");
        assert!(rels["rId2"].rel_type.ends_with(REL_TYPE_COMMENTS));
    }

    #[test]
    fn test_cell_refs() {
        assert_eq!(parse_cell_ref("A1"), Some((0, 0)));
        assert_eq!(parse_cell_ref("$AB$12"), Some((11, 27)));
        assert_eq!(parse_cell_ref("XFD1048576"), Some((1_048_575, 16_383)));
        assert_eq!(parse_cell_ref("A0"), None);
        assert_eq!(parse_cell_ref("12"), None);
        // past the last column, and long enough to overflow a usize
        assert_eq!(parse_cell_ref("XFE1"), None);
        assert_eq!(parse_cell_ref(&format!("{}1", "Z".repeat(40))), None);
        assert_eq!(parse_merge_ref(&format!("A1:{}2", "Q".repeat(30))), None);
        assert_eq!(parse_merge_ref("B2:D4"), Some((1, 1, 3, 3)));
        assert_eq!(parse_merge_ref("B2"), None);
    }

    #[test]
    fn test_part_paths() {
        assert_eq!(resolve_part_path("xl/worksheets/sheet1.xml", "../comments1.xml"), "xl/comments1.xml");
        assert_eq!(resolve_part_path("xl/workbook.xml", "worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_part_path("xl/workbook.xml", "/xl/worksheets/sheet3.xml"), "xl/worksheets/sheet3.xml");
        assert_eq!(rels_path_for("xl/worksheets/sheet1.xml"), "xl/worksheets/_rels/sheet1.xml.rels");
    }

    #[test]
    fn test_colors() {
        assert_eq!(parse_argb_hex("FF102030"), Some([0x10, 0x20, 0x30, 0xFF]));
        assert_eq!(parse_argb_hex("#102030"), Some([0x10, 0x20, 0x30, 0xFF]));
        assert_eq!(parse_argb_hex("12345"), None);
        assert_eq!(indexed_color(2), Some([255, 0, 0, 255]));
        assert_eq!(indexed_color(64), None);
    }
}
