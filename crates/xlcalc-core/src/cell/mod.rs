//! Cell-related types
//!
//! - [`CellValue`] - The value stored in a cell
//! - [`CellError`] - The closed set of spreadsheet error codes
//! - [`CellAddress`] / [`CellRange`] - Locations and rectangular areas
//! - [`CellStorage`] - Sparse row/column storage backing a worksheet

mod address;
mod storage;
mod value;

pub use address::{CellAddress, CellRange, CellRangeIterator};
pub use storage::CellStorage;
pub use value::{CellError, CellValue, SharedString};
