//! Evaluation context: the invoking cell plus read access to the grid

use std::borrow::Cow;

use tracing::warn;
use xlcalc_core::{CellError, CellRange, Locale, Workbook, WorkbookSettings};

use crate::value::{Array, EvalResult, FormulaValue, Reference};

/// Read-only access to already-evaluated cells
///
/// Implemented for [`Workbook`]; other hosts (a recalculation engine, a
/// test fixture) can implement it to feed values to the function library.
pub trait CellResolver: Sync {
    /// Value of one cell, `None` when the sheet index does not exist
    fn cell_value(&self, sheet: usize, row: u32, col: u16) -> Option<FormulaValue>;

    /// Index of a sheet by name
    fn sheet_index(&self, name: &str) -> Option<usize>;

    /// Date system and locale
    fn settings(&self) -> &WorkbookSettings;

    /// Hidden rows are skipped by SUBTOTAL codes 101-111
    fn is_row_hidden(&self, _sheet: usize, _row: u32) -> bool {
        false
    }
}

impl CellResolver for Workbook {
    fn cell_value(&self, sheet: usize, row: u32, col: u16) -> Option<FormulaValue> {
        let worksheet = self.worksheet(sheet)?;
        Some(
            worksheet
                .value_ref(row, col)
                .map(FormulaValue::from)
                .unwrap_or(FormulaValue::Empty),
        )
    }

    fn sheet_index(&self, name: &str) -> Option<usize> {
        Workbook::sheet_index(self, name)
    }

    fn settings(&self) -> &WorkbookSettings {
        Workbook::settings(self)
    }

    fn is_row_hidden(&self, sheet: usize, row: u32) -> bool {
        self.worksheet(sheet)
            .map_or(false, |ws| ws.is_row_hidden(row))
    }
}

/// Context for formula evaluation
pub struct EvaluationContext<'a> {
    resolver: Option<&'a dyn CellResolver>,
    /// Current worksheet index
    pub current_sheet: usize,
    /// Row of the invoking cell, used for implicit intersection and ROW()
    pub current_row: u32,
    /// Column of the invoking cell
    pub current_col: u16,
    settings: WorkbookSettings,
}

impl<'a> EvaluationContext<'a> {
    /// Context for a cell evaluated against a grid
    pub fn new(resolver: &'a dyn CellResolver, sheet: usize, row: u32, col: u16) -> Self {
        Self {
            resolver: Some(resolver),
            current_sheet: sheet,
            current_row: row,
            current_col: col,
            settings: resolver.settings().clone(),
        }
    }

    /// Context without a grid; references resolve to `#REF!`
    pub fn simple() -> Self {
        Self {
            resolver: None,
            current_sheet: 0,
            current_row: 0,
            current_col: 0,
            settings: WorkbookSettings::default(),
        }
    }

    /// Override the date system and locale
    pub fn with_settings(mut self, settings: WorkbookSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    pub fn locale(&self) -> &Locale {
        &self.settings.locale
    }

    /// Whether serials count from 1904-01-01
    pub fn date_1904(&self) -> bool {
        self.settings.date_1904
    }

    /// Get a cell value; a missing sheet or grid gives `#REF!`
    pub fn cell_value(&self, sheet: Option<&str>, row: u32, col: u16) -> FormulaValue {
        match self.sheet_for(sheet) {
            Ok(index) => self.read(index, row, col),
            Err(e) => FormulaValue::Error(e),
        }
    }

    fn sheet_for(&self, sheet: Option<&str>) -> EvalResult<usize> {
        let resolver = self.resolver.ok_or(CellError::Ref)?;
        match sheet {
            None => Ok(self.current_sheet),
            Some(name) => resolver.sheet_index(name).ok_or_else(|| {
                warn!(sheet = name, "reference to unknown sheet");
                CellError::Ref
            }),
        }
    }

    fn read(&self, sheet: usize, row: u32, col: u16) -> FormulaValue {
        self.resolver
            .and_then(|r| r.cell_value(sheet, row, col))
            .unwrap_or(FormulaValue::Error(CellError::Ref))
    }

    /// Value at a relative offset inside a reference's single area
    pub fn reference_value(&self, reference: &Reference, rel_row: u32, rel_col: u32) -> FormulaValue {
        let Some(area) = reference.single_area() else {
            return FormulaValue::Error(CellError::Value);
        };
        match (self.sheet_for(reference.sheet.as_deref()), area.cell_at(rel_row, rel_col)) {
            (Ok(sheet), Some(addr)) => self.read(sheet, addr.row, addr.col),
            (Err(e), _) => FormulaValue::Error(e),
            (_, None) => FormulaValue::Error(CellError::Ref),
        }
    }

    /// Resolve an argument for a position that needs one value
    ///
    /// Single cells resolve directly. A one-column or one-row reference is
    /// intersected with the invoking cell's row or column. Multi-cell
    /// arrays cannot stand in for a scalar.
    pub fn scalar(&self, value: &FormulaValue) -> FormulaValue {
        match value {
            FormulaValue::Reference(reference) => {
                let Some(area) = reference.single_area() else {
                    return FormulaValue::Error(CellError::Value);
                };
                match self.intersect(area) {
                    Some((rel_row, rel_col)) => self.reference_value(reference, rel_row, rel_col),
                    None => FormulaValue::Error(CellError::Value),
                }
            }
            FormulaValue::Array(array) if array.is_single() => {
                array.get(0, 0).cloned().unwrap_or(FormulaValue::Empty)
            }
            FormulaValue::Array(_) => FormulaValue::Error(CellError::Value),
            other => other.clone(),
        }
    }

    fn intersect(&self, area: &CellRange) -> Option<(u32, u32)> {
        if area.is_single_cell() {
            return Some((0, 0));
        }
        if area.width() == 1 && area.contains(self.current_row, area.start.col) {
            return Some((self.current_row - area.start.row, 0));
        }
        if area.height() == 1 && area.contains(area.start.row, self.current_col) {
            return Some((0, (self.current_col - area.start.col) as u32));
        }
        None
    }

    /// Resolve an argument into a grid
    ///
    /// Scalars become 1x1 grids; references materialise their single area.
    /// Unions of several areas cannot be shaped and give `#VALUE!`.
    pub fn to_array<'v>(&self, value: &'v FormulaValue) -> EvalResult<Cow<'v, Array>> {
        match value {
            FormulaValue::Array(array) => Ok(Cow::Borrowed(array)),
            FormulaValue::Reference(reference) => {
                let area = reference.single_area().ok_or(CellError::Value)?;
                let sheet = self.sheet_for(reference.sheet.as_deref())?;
                let values = area
                    .cells()
                    .map(|addr| self.read(sheet, addr.row, addr.col))
                    .collect();
                Ok(Cow::Owned(Array::new(
                    area.height() as usize,
                    area.width() as usize,
                    values,
                )))
            }
            scalar => Ok(Cow::Owned(Array::new(1, 1, vec![scalar.clone()]))),
        }
    }

    /// Visit every value an argument covers, area by area in row-major order
    ///
    /// `skip_hidden` leaves out cells on hidden rows of referenced areas.
    pub fn visit<F>(&self, value: &FormulaValue, skip_hidden: bool, mut f: F) -> EvalResult<()>
    where
        F: FnMut(&FormulaValue) -> EvalResult<()>,
    {
        match value {
            FormulaValue::Array(array) => array.values().iter().try_for_each(f),
            FormulaValue::Reference(reference) => {
                let sheet = self.sheet_for(reference.sheet.as_deref())?;
                for area in &reference.areas {
                    for addr in area.cells() {
                        if skip_hidden && self.is_row_hidden(sheet, addr.row) {
                            continue;
                        }
                        f(&self.read(sheet, addr.row, addr.col))?;
                    }
                }
                Ok(())
            }
            scalar => f(scalar),
        }
    }

    fn is_row_hidden(&self, sheet: usize, row: u32) -> bool {
        self.resolver
            .map_or(false, |r| r.is_row_hidden(sheet, row))
    }
}

impl Default for EvaluationContext<'_> {
    fn default() -> Self {
        Self::simple()
    }
}
