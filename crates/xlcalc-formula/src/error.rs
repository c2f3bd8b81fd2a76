//! Formula error types
//!
//! Spreadsheet errors (`#DIV/0!`, `#N/A`, ...) are values, carried as
//! [`FormulaValue::Error`](crate::FormulaValue::Error) or as the `Err` side of
//! [`EvalResult`](crate::EvalResult). [`FormulaError`] covers misuse of the
//! library itself, which a caller has to handle before a value exists.

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors raised while dispatching a function call
#[derive(Debug, Error, PartialEq)]
pub enum FormulaError {
    /// Unknown function; callers usually surface this as `#NAME?`
    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    /// Wrong number of arguments
    #[error("Wrong number of arguments for {function}: expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Reference text that cannot be parsed
    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}
