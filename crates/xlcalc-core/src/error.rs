//! Library errors for xlcalc-core
//!
//! These cover misuse of the grid API. Spreadsheet errors such as `#REF!`
//! are values ([`crate::CellError`]), not `Error`s.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A1 text that does not name a cell
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// `A1:B2` text with a malformed corner
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    #[error("Row {0} is past the last row ({1})")]
    RowOutOfBounds(u32, u32),

    #[error("Column {0} is past the last column ({1})")]
    ColumnOutOfBounds(u16, u16),

    /// Index given, then the number of sheets
    #[error("No sheet at index {0} (workbook has {1})")]
    SheetOutOfBounds(usize, usize),

    /// Empty, too long or containing a character Excel rejects
    #[error("Invalid sheet name: {0}")]
    InvalidSheetName(String),

    /// Sheet names compare case-insensitively
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),
}
