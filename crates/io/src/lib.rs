// Workbook file I/O: Excel import and export

mod error;
pub mod xlsx;
pub mod xlsx_parts;

pub use error::IoError;
