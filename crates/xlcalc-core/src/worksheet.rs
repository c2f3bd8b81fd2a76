//! Worksheet type

use crate::cell::{CellAddress, CellRange, CellStorage, CellValue};
use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};

/// A named grid of evaluated cell values
#[derive(Debug)]
pub struct Worksheet {
    name: String,
    cells: CellStorage,
}

impl Worksheet {
    /// Create a new worksheet with the given name
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            cells: CellStorage::new(),
        }
    }

    /// Get the sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name<S: Into<String>>(&mut self, name: S) {
        self.name = name.into();
    }

    // === Cell Access ===

    /// Get a cell value by address string (e.g., "A1")
    pub fn get_value(&self, address: &str) -> Result<CellValue> {
        let addr = CellAddress::parse(address)?;
        Ok(self.get_value_at(addr.row, addr.col))
    }

    /// Get a cell value by 0-based indices; unset cells read as empty
    pub fn get_value_at(&self, row: u32, col: u16) -> CellValue {
        self.cells.get(row, col).cloned().unwrap_or_default()
    }

    /// Borrow a stored value without cloning
    pub fn value_ref(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.cells.get(row, col)
    }

    /// Set a cell value by address string
    pub fn set_cell_value<V: Into<CellValue>>(&mut self, address: &str, value: V) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.set_cell_value_at(addr.row, addr.col, value)
    }

    /// Set a cell value by 0-based indices
    pub fn set_cell_value_at<V: Into<CellValue>>(
        &mut self,
        row: u32,
        col: u16,
        value: V,
    ) -> Result<()> {
        check_bounds(row, col)?;
        self.cells.set(row, col, value.into());
        Ok(())
    }

    /// Fill a block starting at `top_left` from row-major values
    ///
    /// ```
    /// use xlcalc_core::{CellValue, Worksheet};
    ///
    /// let mut sheet = Worksheet::new("Data");
    /// sheet
    ///     .set_range_values("A1", vec![vec!["East".into(), 45678.into()]])
    ///     .unwrap();
    /// assert_eq!(sheet.get_value("B1").unwrap(), CellValue::Number(45678.0));
    /// ```
    pub fn set_range_values(&mut self, top_left: &str, rows: Vec<Vec<CellValue>>) -> Result<()> {
        let origin = CellAddress::parse(top_left)?;
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                let row_index = origin.row as u64 + r as u64;
                let col_index = origin.col as u64 + c as u64;
                if row_index >= MAX_ROWS as u64 {
                    return Err(Error::RowOutOfBounds(row_index.min(u32::MAX as u64) as u32, MAX_ROWS - 1));
                }
                if col_index >= MAX_COLS as u64 {
                    return Err(Error::ColumnOutOfBounds(col_index.min(u16::MAX as u64) as u16, MAX_COLS - 1));
                }
                self.cells.set(row_index as u32, col_index as u16, value);
            }
        }
        Ok(())
    }

    /// Clear a cell by address string
    pub fn clear_cell(&mut self, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.cells.remove(addr.row, addr.col);
        Ok(())
    }

    /// Bounding range of every stored cell
    pub fn used_range(&self) -> Option<CellRange> {
        self.cells
            .used_bounds()
            .map(|(r1, c1, r2, c2)| CellRange::from_indices(r1, c1, r2, c2))
    }

    // === Rows ===

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.cells.is_row_hidden(row)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        self.cells.set_row_hidden(row, hidden);
    }

    /// Access the underlying storage
    pub fn cells(&self) -> &CellStorage {
        &self.cells
    }
}

fn check_bounds(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}
