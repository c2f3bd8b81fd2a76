//! Sparse cell storage
//!
//! Only non-empty cells are stored, keyed row first so that scans over an
//! area visit cells in the same row-major order the function library uses.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use ahash::AHashMap;

use super::{CellValue, SharedString};

/// Sparse row-based storage for worksheet cells
///
/// Structure: `BTreeMap<row_index, BTreeMap<col_index, CellValue>>`.
/// Text values are interned so repeated strings share one allocation.
#[derive(Debug, Default)]
pub struct CellStorage {
    rows: BTreeMap<u32, BTreeMap<u16, CellValue>>,
    strings: AHashMap<Arc<str>, SharedString>,
    hidden_rows: BTreeSet<u32>,
}

impl CellStorage {
    /// Create empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Value at a position, `None` when the cell was never written
    pub fn get(&self, row: u32, col: u16) -> Option<&CellValue> {
        self.rows.get(&row)?.get(&col)
    }

    /// Store a value; writing [`CellValue::Empty`] removes the cell
    pub fn set(&mut self, row: u32, col: u16, value: CellValue) {
        let value = match value {
            CellValue::Empty => {
                self.remove(row, col);
                return;
            }
            CellValue::String(s) => CellValue::String(self.intern(s.as_str())),
            other => other,
        };
        self.rows.entry(row).or_default().insert(col, value);
    }

    /// Remove a cell, returning its previous value
    pub fn remove(&mut self, row: u32, col: u16) -> Option<CellValue> {
        let cols = self.rows.get_mut(&row)?;
        let removed = cols.remove(&col);
        if cols.is_empty() {
            self.rows.remove(&row);
        }
        removed
    }

    /// Number of stored cells
    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `(min_row, min_col, max_row, max_col)` over stored cells
    pub fn used_bounds(&self) -> Option<(u32, u16, u32, u16)> {
        let first_row = *self.rows.keys().next()?;
        let last_row = *self.rows.keys().next_back()?;
        let mut min_col = u16::MAX;
        let mut max_col = 0;
        for cols in self.rows.values() {
            if let (Some(first), Some(last)) = (cols.keys().next(), cols.keys().next_back()) {
                min_col = min_col.min(*first);
                max_col = max_col.max(*last);
            }
        }
        Some((first_row, min_col, last_row, max_col))
    }

    /// Iterate over stored cells in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16, &CellValue)> {
        self.rows
            .iter()
            .flat_map(|(row, cols)| cols.iter().map(move |(col, value)| (*row, *col, value)))
    }

    /// Whether a row is hidden (consulted by SUBTOTAL codes 101-111)
    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(&row)
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) {
        if hidden {
            self.hidden_rows.insert(row);
        } else {
            self.hidden_rows.remove(&row);
        }
    }

    /// Number of distinct strings held by the intern table
    pub fn interned_strings(&self) -> usize {
        self.strings.len()
    }

    fn intern(&mut self, s: &str) -> SharedString {
        if let Some(shared) = self.strings.get(s) {
            return shared.clone();
        }
        let shared = SharedString::new(s);
        self.strings.insert(Arc::from(s), shared.clone());
        shared
    }
}
