//! Prelude module - common imports for xlcalc users
//!
//! ```rust
//! use xlcalc::prelude::*;
//! ```

pub use crate::{
    // Cell types
    CellAddress,
    CellError,
    CellRange,
    CellValue,

    // Evaluation
    evaluate_at,
    evaluate_function,
    Array,
    EvaluationContext,
    FormulaError,
    FormulaValue,
    Reference,

    // Main types
    Locale,
    Workbook,
    WorkbookSettings,
    Worksheet,
};
