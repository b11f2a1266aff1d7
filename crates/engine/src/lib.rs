pub mod cell;
pub mod diff;
pub mod sheet;
pub mod sort;
pub mod store;
pub mod workbook;
