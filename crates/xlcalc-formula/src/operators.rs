//! Arithmetic, text and comparison operators over the value model

use std::cmp::Ordering;
use std::fmt;

use xlcalc_core::{CellError, Locale};

use crate::broadcast;
use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Concat,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

impl BinaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Power => "^",
            BinaryOperator::Concat => "&",
            BinaryOperator::Equal => "=",
            BinaryOperator::NotEqual => "<>",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOperator::Add,
            "-" => BinaryOperator::Subtract,
            "*" => BinaryOperator::Multiply,
            "/" => BinaryOperator::Divide,
            "^" => BinaryOperator::Power,
            "&" => BinaryOperator::Concat,
            "=" => BinaryOperator::Equal,
            "<>" => BinaryOperator::NotEqual,
            "<" => BinaryOperator::LessThan,
            "<=" => BinaryOperator::LessEqual,
            ">" => BinaryOperator::GreaterThan,
            ">=" => BinaryOperator::GreaterEqual,
            _ => return None,
        })
    }

    /// Whether the operator yields a boolean
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Plus,
    Percent,
}

/// Evaluate a binary operator, broadcasting over arrays and ranges
pub fn apply_binary(
    op: BinaryOperator,
    left: &FormulaValue,
    right: &FormulaValue,
    ctx: &EvaluationContext,
) -> FormulaValue {
    let locale = ctx.locale();
    broadcast::zip_with(left, right, ctx, |a, b| binary_scalar(op, a, b, locale))
}

/// Evaluate a unary operator, element-wise over arrays and ranges
pub fn apply_unary(op: UnaryOperator, value: &FormulaValue, ctx: &EvaluationContext) -> FormulaValue {
    let locale = ctx.locale();
    broadcast::map(value, ctx, |v| match op {
        UnaryOperator::Plus => Ok(v.clone()),
        UnaryOperator::Negate => Ok(FormulaValue::Number(-v.to_number(locale)?)),
        UnaryOperator::Percent => Ok(FormulaValue::Number(v.to_number(locale)? / 100.0)),
    })
}

fn binary_scalar(
    op: BinaryOperator,
    a: &FormulaValue,
    b: &FormulaValue,
    locale: &Locale,
) -> EvalResult<FormulaValue> {
    if let Some(e) = a.error().or_else(|| b.error()) {
        return Err(e);
    }

    if op == BinaryOperator::Concat {
        return Ok(FormulaValue::String(a.to_text()? + &b.to_text()?));
    }

    if op.is_comparison() {
        let ord = compare_values(a, b);
        let result = match op {
            BinaryOperator::Equal => ord == Ordering::Equal,
            BinaryOperator::NotEqual => ord != Ordering::Equal,
            BinaryOperator::LessThan => ord == Ordering::Less,
            BinaryOperator::LessEqual => ord != Ordering::Greater,
            BinaryOperator::GreaterThan => ord == Ordering::Greater,
            _ => ord != Ordering::Less,
        };
        return Ok(FormulaValue::Boolean(result));
    }

    let x = a.to_number(locale)?;
    let y = b.to_number(locale)?;
    let n = match op {
        BinaryOperator::Add => x + y,
        BinaryOperator::Subtract => x - y,
        BinaryOperator::Multiply => x * y,
        BinaryOperator::Divide => {
            if y == 0.0 {
                return Err(CellError::Div0);
            }
            x / y
        }
        BinaryOperator::Power => power(x, y)?,
        _ => return Err(CellError::Value),
    };
    if n.is_finite() {
        Ok(FormulaValue::Number(n))
    } else {
        Err(CellError::Num)
    }
}

/// `x ^ y` with the spreadsheet's domain rules
pub fn power(x: f64, y: f64) -> EvalResult<f64> {
    if x == 0.0 && y == 0.0 {
        return Err(CellError::Num);
    }
    if x == 0.0 && y < 0.0 {
        return Err(CellError::Div0);
    }
    let n = x.powf(y);
    if n.is_finite() {
        Ok(n)
    } else {
        Err(CellError::Num)
    }
}

fn type_rank(value: &FormulaValue) -> u8 {
    match value {
        FormulaValue::Number(_) | FormulaValue::Empty => 0,
        FormulaValue::String(_) => 1,
        FormulaValue::Boolean(_) => 2,
        _ => 3,
    }
}

/// Total order used by the comparison operators, MATCH and sorting
///
/// Numbers sort before text, text before booleans. Text compares without
/// regard to case. A blank takes the zero value of the other side's type.
pub fn compare_values(a: &FormulaValue, b: &FormulaValue) -> Ordering {
    let blank_like = |other: &FormulaValue| match other {
        FormulaValue::String(_) => FormulaValue::String(String::new()),
        FormulaValue::Boolean(_) => FormulaValue::Boolean(false),
        _ => FormulaValue::Number(0.0),
    };
    match (a, b) {
        (FormulaValue::Empty, FormulaValue::Empty) => Ordering::Equal,
        (FormulaValue::Empty, other) => compare_values(&blank_like(other), other),
        (other, FormulaValue::Empty) => compare_values(other, &blank_like(other)),
        (FormulaValue::Number(x), FormulaValue::Number(y)) => {
            x.partial_cmp(y).unwrap_or(Ordering::Equal)
        }
        (FormulaValue::String(x), FormulaValue::String(y)) => compare_text(x, y),
        (FormulaValue::Boolean(x), FormulaValue::Boolean(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Case-insensitive text ordering
pub fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}
