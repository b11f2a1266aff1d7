use std::fmt;
use std::path::PathBuf;

/// Errors raised while reading or writing workbook files
#[derive(Debug)]
pub enum IoError {
    /// The file could not be opened as a workbook
    Open { path: PathBuf, message: String },
    /// A sheet inside an opened workbook could not be read
    Read { sheet: String, message: String },
    /// The output file could not be built or saved
    Write { path: PathBuf, message: String },
    NoSheets { path: PathBuf },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IoError::Open { path, message } => {
                write!(f, "Failed to open Excel file '{}': {}", path.display(), message)
            }
            IoError::Read { sheet, message } => {
                write!(f, "Failed to read sheet '{}': {}", sheet, message)
            }
            IoError::Write { path, message } => {
                write!(f, "Failed to write '{}': {}", path.display(), message)
            }
            IoError::NoSheets { path } => {
                write!(f, "Excel file '{}' contains no sheets", path.display())
            }
        }
    }
}

impl std::error::Error for IoError {}
