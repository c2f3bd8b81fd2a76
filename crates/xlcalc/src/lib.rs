//! # xlcalc
//!
//! Excel-compatible evaluation of spreadsheet functions.
//!
//! xlcalc evaluates built-in functions the way Excel does, including its
//! numeric quirks: decimal half-away-from-zero rounding, the 1900 leap-year
//! serial, criteria strings with wildcards and error propagation.
//!
//! ## Features
//!
//! - Over 250 functions across math, statistics, distributions, finance,
//!   dates, text, logic, information, lookup and database aggregates
//! - Scalars, arrays and references broadcast the same way Excel does
//! - 1900 and 1904 date systems
//! - Locale-aware number text (TEXT, DOLLAR, FIXED, NUMBERVALUE)
//!
//! ## Example
//!
//! ```rust
//! use xlcalc::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", "West").unwrap();
//! sheet.set_cell_value("B1", 120.0).unwrap();
//! sheet.set_cell_value("A2", "East").unwrap();
//! sheet.set_cell_value("B2", 80.0).unwrap();
//!
//! let ctx = EvaluationContext::new(&workbook, 0, 0, 3);
//! let args = [FormulaValue::range("A1:A2"), "west".into(), FormulaValue::range("B1:B2")];
//! let total = evaluate_function("SUMIF", &args, &ctx).unwrap();
//! assert_eq!(total, FormulaValue::Number(120.0));
//! ```

pub mod prelude;

// Re-export core types
pub use xlcalc_core::{
    CellAddress,
    CellError,
    CellRange,
    CellValue,
    // Error types
    Error,
    Locale,
    Result,
    Workbook,
    WorkbookSettings,
    Worksheet,

    MAX_COLS,
    MAX_ROWS,
};

// Re-export formula types
pub use xlcalc_formula::{
    apply_binary, apply_unary, evaluate_function, format_general, get_function_registry, Array,
    BinaryOperator, CellResolver, Criterion, EvalResult, EvaluationContext, FormulaError,
    FormulaResult, FormulaValue, FunctionDef, FunctionImpl, FunctionRegistry, Reference,
    UnaryOperator,
};

/// Evaluate a function against a cell of a workbook
///
/// Shorthand for building an [`EvaluationContext`] at `sheet`, `row`, `col`
/// and calling [`evaluate_function`].
pub fn evaluate_at(
    workbook: &Workbook,
    sheet: usize,
    row: u32,
    col: u16,
    name: &str,
    args: &[FormulaValue],
) -> FormulaResult<FormulaValue> {
    let ctx = EvaluationContext::new(workbook, sheet, row, col);
    evaluate_function(name, args, &ctx)
}
