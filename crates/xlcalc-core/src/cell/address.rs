//! Cell address and range types

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A 0-based cell location on a sheet
///
/// Display and parsing use A1 notation; `$` markers are accepted and
/// dropped since evaluated references are always absolute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based internally, 1-based in display)
    pub row: u32,
    /// Column index (0-based, A=0, B=1, ..., XFD=16383)
    pub col: u16,
}

impl CellAddress {
    /// Create a new cell address
    pub fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use xlcalc_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$5").unwrap();
    /// assert_eq!((addr.row, addr.col), (4, 2));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let text = s.trim();
        let text = text.strip_prefix('$').unwrap_or(text);
        let letters_end = text
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(text.len());

        let letters = &text[..letters_end];
        let rest = &text[letters_end..];
        let digits = rest.strip_prefix('$').unwrap_or(rest);
        if letters.is_empty() {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        if digits.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }

        let col = Self::column_index(letters)?;
        let row: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }

        Ok(Self::new(row - 1, col))
    }

    /// Column letters for a 0-based index (0 = A, 26 = AA)
    pub fn column_name(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push((b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        letters.iter().rev().collect()
    }

    /// 0-based index for column letters, case-insensitive
    pub fn column_index(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(MAX_COLS, MAX_COLS - 1));
            }
        }

        Ok((col - 1) as u16)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_name(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular block of cells, always normalized top-left to bottom-right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range spanning two corners in any order
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse `A1:B10` or a lone `A1`
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().split_once(':') {
            Some((a, b)) => {
                let corner = |t: &str| {
                    CellAddress::parse(t).map_err(|e| Error::InvalidRange(format!("{} ({})", s.trim(), e)))
                };
                Ok(Self::new(corner(a)?, corner(b)?))
            }
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Number of rows
    pub fn height(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns
    pub fn width(&self) -> u32 {
        (self.end.col - self.start.col) as u32 + 1
    }

    /// Total number of cells
    pub fn cell_count(&self) -> u64 {
        self.height() as u64 * self.width() as u64
    }

    /// Whether the range covers exactly one cell
    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }

    /// Whether an absolute sheet position lies inside the range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Absolute address of the cell at a relative offset from the top-left
    pub fn cell_at(&self, rel_row: u32, rel_col: u32) -> Option<CellAddress> {
        if rel_row >= self.height() || rel_col >= self.width() {
            return None;
        }
        Some(CellAddress::new(
            self.start.row + rel_row,
            self.start.col + rel_col as u16,
        ))
    }

    /// A sub-block at a relative offset, clipped to nothing if it leaves the range
    pub fn sub_range(&self, rel_row: u32, rel_col: u32, height: u32, width: u32) -> Option<Self> {
        if height == 0 || width == 0 {
            return None;
        }
        let top_left = self.cell_at(rel_row, rel_col)?;
        let bottom_right = self.cell_at(rel_row + height - 1, rel_col + width - 1)?;
        Some(Self::new(top_left, bottom_right))
    }

    /// The overlapping block of two ranges, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        let top = self.start.row.max(other.start.row);
        let bottom = self.end.row.min(other.end.row);
        let left = self.start.col.max(other.start.col);
        let right = self.end.col.min(other.end.col);
        (top <= bottom && left <= right).then(|| Self::from_indices(top, left, bottom, right))
    }

    /// Iterate over all cell addresses in row-major order
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            next: Some(self.start),
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Row-major iterator over the cells of a [`CellRange`]
pub struct CellRangeIterator {
    range: CellRange,
    next: Option<CellAddress>,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = if current.col < self.range.end.col {
            Some(CellAddress::new(current.row, current.col + 1))
        } else if current.row < self.range.end.row {
            Some(CellAddress::new(current.row + 1, self.range.start.col))
        } else {
            None
        };
        Some(current)
    }
}
