//! # xlcalc-core
//!
//! Core data structures hosting xlcalc formula evaluation.
//!
//! This crate provides the grid the function library reads from:
//! - [`CellValue`] and [`CellError`] - Stored cell values and the closed set of error codes
//! - [`CellAddress`] and [`CellRange`] - Cell addressing and rectangular areas
//! - [`Workbook`], [`Worksheet`] - Sheets of sparse cell storage
//! - [`WorkbookSettings`] and [`Locale`] - Date system and number text conventions
//!
//! ## Example
//!
//! ```rust
//! use xlcalc_core::{CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//!
//! sheet.set_cell_value("A1", "Region").unwrap();
//! sheet.set_cell_value("B1", 42.0).unwrap();
//! sheet.set_cell_value_at(1, 0, CellValue::string("West")).unwrap();
//!
//! assert_eq!(sheet.get_value_at(0, 1), CellValue::Number(42.0));
//! ```

pub mod cell;
pub mod error;
pub mod settings;
pub mod workbook;
pub mod worksheet;

pub use cell::{CellAddress, CellError, CellRange, CellStorage, CellValue, SharedString};
pub use error::{Error, Result};
pub use settings::{Locale, WorkbookSettings};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
