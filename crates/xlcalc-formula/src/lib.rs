//! # xlcalc-formula
//!
//! Excel-compatible function library for xlcalc.
//!
//! This crate provides:
//! - The value model functions operate on ([`FormulaValue`], [`Array`], [`Reference`])
//! - Coercion, broadcasting and comparison rules shared by every function
//! - The criteria language of SUMIF, COUNTIFS and the database functions
//! - Built-in functions (math, statistics, finance, dates, text, lookup, ...)
//!   behind a case-insensitive [`FunctionRegistry`]
//!
//! ## Example
//!
//! ```rust
//! use xlcalc_core::Workbook;
//! use xlcalc_formula::{evaluate_function, EvaluationContext, FormulaValue};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.worksheet_mut(0).unwrap();
//! sheet.set_cell_value("A1", 10.0).unwrap();
//! sheet.set_cell_value("A2", 32.0).unwrap();
//!
//! let ctx = EvaluationContext::new(&workbook, 0, 0, 1);
//! let total = evaluate_function("SUM", &[FormulaValue::range("A1:A2")], &ctx).unwrap();
//! assert_eq!(total, FormulaValue::Number(42.0));
//! ```

pub mod broadcast;
pub mod coerce;
pub mod context;
pub mod error;
pub mod functions;
pub mod operators;
pub mod value;

pub use context::{CellResolver, EvaluationContext};
pub use error::{FormulaError, FormulaResult};
pub use functions::criteria::Criterion;
pub use functions::{
    evaluate_function, get_function_registry, FunctionDef, FunctionImpl, FunctionRegistry,
};
pub use operators::{apply_binary, apply_unary, BinaryOperator, UnaryOperator};
pub use value::{format_general, Array, EvalResult, FormulaValue, Reference};
