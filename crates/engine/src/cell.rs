/// Horizontal text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    General,
    Left,
    Center,
    Right,
}

/// Vertical text alignment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VerticalAlignment {
    Top,
    Middle,
    #[default]
    Bottom,
}

/// Cell style. Owned by value: cloning a cell clones its style, so source and
/// destination of a relocation never share one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellStyle {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strikethrough: bool,
    pub font_size: Option<f32>,
    pub font_color: Option<[u8; 4]>,
    pub font_family: Option<String>,
    pub background_color: Option<[u8; 4]>,
    pub alignment: Alignment,
    pub vertical_alignment: VerticalAlignment,
    pub wrap_text: bool,
    /// Excel number format code. None = General.
    pub number_format: Option<String>,
}

impl CellStyle {
    pub fn is_default(&self) -> bool {
        *self == CellStyle::default()
    }
}

/// Spreadsheet error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Ref,
    Value,
    Div0,
    Name,
    Null,
    Num,
    Na,
    Spill,
    GettingData,
}

impl ErrorKind {
    /// Parse from error literal ("#DIV/0!", "#N/A", ...). Unknown literals are None.
    pub fn parse(s: &str) -> Option<Self> {
        let kind = match s.trim().to_uppercase().as_str() {
            "#REF!" => ErrorKind::Ref,
            "#VALUE!" => ErrorKind::Value,
            "#DIV/0!" => ErrorKind::Div0,
            "#NAME?" => ErrorKind::Name,
            "#NULL!" => ErrorKind::Null,
            "#NUM!" => ErrorKind::Num,
            "#N/A" => ErrorKind::Na,
            "#SPILL!" => ErrorKind::Spill,
            "#GETTING_DATA" => ErrorKind::GettingData,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Ref => "#REF!",
            ErrorKind::Value => "#VALUE!",
            ErrorKind::Div0 => "#DIV/0!",
            ErrorKind::Name => "#NAME?",
            ErrorKind::Null => "#NULL!",
            ErrorKind::Num => "#NUM!",
            ErrorKind::Na => "#N/A",
            ErrorKind::Spill => "#SPILL!",
            ErrorKind::GettingData => "#GETTING_DATA",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum CellValue {
    #[default]
    Blank,
    Boolean(bool),
    Number(f64),
    Text(String),
    /// Formula source without the leading '='
    Formula(String),
    Error(ErrorKind),
}

impl CellValue {
    pub fn raw_display(&self) -> String {
        match self {
            CellValue::Blank => String::new(),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Text(s) => s.clone(),
            CellValue::Formula(source) => format!("={}", source),
            CellValue::Error(e) => e.as_str().to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    pub author: Option<String>,
    pub text: String,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self { author: None, text: text.into() }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = Some(author.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hyperlink {
    /// URL, or a "Sheet!A1" style location when `internal` is set
    pub target: String,
    pub internal: bool,
}

impl Hyperlink {
    pub fn url(target: impl Into<String>) -> Self {
        Self { target: target.into(), internal: false }
    }

    pub fn internal(location: impl Into<String>) -> Self {
        Self { target: location.into(), internal: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: CellStyle,
    pub comment: Option<Comment>,
    pub hyperlink: Option<Hyperlink>,
}

impl Cell {
    pub fn new(value: CellValue) -> Self {
        Self { value, ..Self::default() }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::new(CellValue::Text(s.into()))
    }

    pub fn number(n: f64) -> Self {
        Self::new(CellValue::Number(n))
    }

    pub fn boolean(b: bool) -> Self {
        Self::new(CellValue::Boolean(b))
    }

    pub fn with_style(mut self, style: CellStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_comment(mut self, comment: Comment) -> Self {
        self.comment = Some(comment);
        self
    }

    pub fn with_hyperlink(mut self, hyperlink: Hyperlink) -> Self {
        self.hyperlink = Some(hyperlink);
        self
    }

    /// True if the cell carries nothing worth writing out
    pub fn is_empty(&self) -> bool {
        self.value.is_blank()
            && self.style.is_default()
            && self.comment.is_none()
            && self.hyperlink.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_round_trips_through_literal() {
        for kind in [
            ErrorKind::Ref,
            ErrorKind::Value,
            ErrorKind::Div0,
            ErrorKind::Name,
            ErrorKind::Null,
            ErrorKind::Num,
            ErrorKind::Na,
            ErrorKind::Spill,
            ErrorKind::GettingData,
        ] {
            assert_eq!(ErrorKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(ErrorKind::parse("#bogus"), None);
        assert_eq!(ErrorKind::parse(" #n/a "), Some(ErrorKind::Na));
    }

    #[test]
    fn test_raw_display() {
        assert_eq!(CellValue::Number(42.0).raw_display(), "42");
        assert_eq!(CellValue::Number(1.5).raw_display(), "1.5");
        assert_eq!(CellValue::Boolean(true).raw_display(), "TRUE");
        assert_eq!(CellValue::Formula("SUM(A1:A3)".into()).raw_display(), "=SUM(A1:A3)");
        assert_eq!(CellValue::Error(ErrorKind::Div0).raw_display(), "#DIV/0!");
        assert_eq!(CellValue::Blank.raw_display(), "");
    }

    #[test]
    fn test_cell_is_empty() {
        assert!(Cell::default().is_empty());
        assert!(!Cell::text("x").is_empty());

        let styled = Cell::default().with_style(CellStyle { bold: true, ..CellStyle::default() });
        assert!(!styled.is_empty());

        let commented = Cell::default().with_comment(Comment::new("note"));
        assert!(!commented.is_empty());
    }

    #[test]
    fn test_cloned_style_is_independent() {
        let original = Cell::text("a").with_style(CellStyle {
            font_family: Some("Arial".into()),
            ..CellStyle::default()
        });
        let mut copy = original.clone();
        copy.style.font_family = Some("Courier".into());
        assert_eq!(original.style.font_family.as_deref(), Some("Arial"));
    }
}
