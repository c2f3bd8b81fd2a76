//! Element-wise lifting of scalar operations over arrays and ranges
//!
//! Shape rules for two grid operands:
//! - equal shapes combine cell by cell, by offset from each top-left corner
//! - a `1 x w` row repeats down an `h x w` grid
//! - an `h x 1` column repeats across an `h x w` grid
//! - anything else yields a grid of `#VALUE!` covering both shapes
//!
//! A 1x1 grid always behaves as a scalar.

use std::borrow::Cow;

use xlcalc_core::CellError;

use crate::context::EvaluationContext;
use crate::value::{Array, EvalResult, FormulaValue};

static EMPTY: FormulaValue = FormulaValue::Empty;

/// Grid dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shape {
    pub rows: usize,
    pub cols: usize,
}

impl Shape {
    pub fn of(array: &Array) -> Self {
        Self {
            rows: array.rows(),
            cols: array.cols(),
        }
    }

    /// Output shape when combining two grids, `None` when incompatible
    pub fn broadcast(self, other: Shape) -> Option<Shape> {
        if self == other {
            Some(self)
        } else if self.rows == 1 && self.cols == other.cols {
            Some(other)
        } else if other.rows == 1 && other.cols == self.cols {
            Some(self)
        } else if self.cols == 1 && self.rows == other.rows {
            Some(other)
        } else if other.cols == 1 && other.rows == self.rows {
            Some(self)
        } else {
            None
        }
    }

    fn cover(self, other: Shape) -> Shape {
        Shape {
            rows: self.rows.max(other.rows),
            cols: self.cols.max(other.cols),
        }
    }
}

/// An argument resolved for element-wise use
#[derive(Debug)]
pub enum Operand<'v> {
    Scalar(FormulaValue),
    Grid(Cow<'v, Array>),
}

impl<'v> Operand<'v> {
    /// Single cells and 1x1 arrays become scalars, larger areas grids
    pub fn resolve(value: &'v FormulaValue, ctx: &EvaluationContext) -> Self {
        match value {
            FormulaValue::Reference(reference) if reference.is_single_cell() => {
                Operand::Scalar(ctx.scalar(value))
            }
            FormulaValue::Reference(_) | FormulaValue::Array(_) => match ctx.to_array(value) {
                Ok(grid) if grid.is_single() => {
                    Operand::Scalar(grid.get(0, 0).cloned().unwrap_or(FormulaValue::Empty))
                }
                Ok(grid) => Operand::Grid(grid),
                Err(e) => Operand::Scalar(FormulaValue::Error(e)),
            },
            other => Operand::Scalar(other.clone()),
        }
    }
}

/// Value of a grid at an output position, repeating single rows/columns
fn element(grid: &Array, row: usize, col: usize) -> &FormulaValue {
    let r = if grid.rows() == 1 { 0 } else { row };
    let c = if grid.cols() == 1 { 0 } else { col };
    grid.get(r, c).unwrap_or(&EMPTY)
}

fn flatten(result: EvalResult<FormulaValue>) -> FormulaValue {
    result.unwrap_or_else(FormulaValue::Error)
}

/// Apply `f` to a scalar, or to every cell of a grid
pub fn map<F>(value: &FormulaValue, ctx: &EvaluationContext, f: F) -> FormulaValue
where
    F: Fn(&FormulaValue) -> EvalResult<FormulaValue>,
{
    match Operand::resolve(value, ctx) {
        Operand::Scalar(v) => flatten(f(&v)),
        Operand::Grid(grid) => {
            let values = grid.values().iter().map(|v| flatten(f(v))).collect();
            FormulaValue::Array(Array::new(grid.rows(), grid.cols(), values))
        }
    }
}

/// Combine two operands element-wise
pub fn zip_with<F>(
    left: &FormulaValue,
    right: &FormulaValue,
    ctx: &EvaluationContext,
    f: F,
) -> FormulaValue
where
    F: Fn(&FormulaValue, &FormulaValue) -> EvalResult<FormulaValue>,
{
    match (Operand::resolve(left, ctx), Operand::resolve(right, ctx)) {
        (Operand::Scalar(a), Operand::Scalar(b)) => flatten(f(&a, &b)),
        (Operand::Grid(grid), Operand::Scalar(b)) => {
            let values = grid.values().iter().map(|a| flatten(f(a, &b))).collect();
            FormulaValue::Array(Array::new(grid.rows(), grid.cols(), values))
        }
        (Operand::Scalar(a), Operand::Grid(grid)) => {
            let values = grid.values().iter().map(|b| flatten(f(&a, b))).collect();
            FormulaValue::Array(Array::new(grid.rows(), grid.cols(), values))
        }
        (Operand::Grid(a), Operand::Grid(b)) => {
            let (sa, sb) = (Shape::of(&a), Shape::of(&b));
            let Some(shape) = sa.broadcast(sb) else {
                let cover = sa.cover(sb);
                return FormulaValue::Array(Array::filled(
                    cover.rows,
                    cover.cols,
                    FormulaValue::Error(CellError::Value),
                ));
            };
            let mut values = Vec::with_capacity(shape.rows * shape.cols);
            for row in 0..shape.rows {
                for col in 0..shape.cols {
                    values.push(flatten(f(element(&a, row, col), element(&b, row, col))));
                }
            }
            FormulaValue::Array(Array::new(shape.rows, shape.cols, values))
        }
    }
}

/// [`map`] for functions of one number
pub fn map_number<F>(value: &FormulaValue, ctx: &EvaluationContext, f: F) -> FormulaValue
where
    F: Fn(f64) -> EvalResult<f64>,
{
    let locale = ctx.locale();
    map(value, ctx, |v| {
        let n = v.to_number(locale)?;
        f(n).map(FormulaValue::Number)
    })
}

/// [`zip_with`] for functions of two numbers
pub fn zip_numbers<F>(
    left: &FormulaValue,
    right: &FormulaValue,
    ctx: &EvaluationContext,
    f: F,
) -> FormulaValue
where
    F: Fn(f64, f64) -> EvalResult<f64>,
{
    let locale = ctx.locale();
    zip_with(left, right, ctx, |a, b| {
        let x = a.to_number(locale)?;
        let y = b.to_number(locale)?;
        f(x, y).map(FormulaValue::Number)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn grid(rows: Vec<Vec<f64>>) -> FormulaValue {
        FormulaValue::Array(Array::from_rows(
            rows.into_iter()
                .map(|r| r.into_iter().map(FormulaValue::Number).collect())
                .collect(),
        ))
    }

    fn add(ctx: &EvaluationContext, a: &FormulaValue, b: &FormulaValue) -> FormulaValue {
        zip_numbers(a, b, ctx, |x, y| Ok(x + y))
    }

    #[test]
    fn test_scalar_and_grid() {
        let ctx = EvaluationContext::simple();
        let a = grid(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert_eq!(
            add(&ctx, &a, &FormulaValue::Number(10.0)),
            grid(vec![vec![11.0, 12.0], vec![13.0, 14.0]])
        );
        assert_eq!(
            add(&ctx, &FormulaValue::Number(1.0), &FormulaValue::Number(2.0)),
            FormulaValue::Number(3.0)
        );
    }

    #[test]
    fn test_row_and_column_broadcast() {
        let ctx = EvaluationContext::simple();
        let a = grid(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let row = grid(vec![vec![10.0, 20.0]]);
        let col = grid(vec![vec![100.0], vec![200.0]]);
        assert_eq!(
            add(&ctx, &a, &row),
            grid(vec![vec![11.0, 22.0], vec![13.0, 24.0]])
        );
        assert_eq!(
            add(&ctx, &col, &a),
            grid(vec![vec![101.0, 102.0], vec![203.0, 204.0]])
        );
    }

    #[test]
    fn test_mismatched_shapes_fill_value_errors() {
        let ctx = EvaluationContext::simple();
        let a = grid(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let b = grid(vec![vec![1.0, 2.0, 3.0]]);
        let expected = FormulaValue::Array(Array::filled(2, 3, FormulaValue::Error(CellError::Value)));
        assert_eq!(add(&ctx, &a, &b), expected);
    }

    #[test]
    fn test_single_cell_grid_is_scalar() {
        let ctx = EvaluationContext::simple();
        let a = grid(vec![vec![1.0, 2.0, 3.0]]);
        let one = grid(vec![vec![5.0]]);
        assert_eq!(add(&ctx, &a, &one), grid(vec![vec![6.0, 7.0, 8.0]]));
    }

    #[test]
    fn test_errors_stay_per_cell() {
        let ctx = EvaluationContext::simple();
        let a = FormulaValue::Array(Array::row(vec![
            1.0.into(),
            FormulaValue::Error(CellError::Na),
            "x".into(),
        ]));
        let out = map_number(&a, &ctx, |n| Ok(n * 2.0));
        assert_eq!(
            out,
            FormulaValue::Array(Array::row(vec![
                2.0.into(),
                FormulaValue::Error(CellError::Na),
                FormulaValue::Error(CellError::Value),
            ]))
        );
    }

    #[test]
    fn test_shape_rules() {
        let s = |rows, cols| Shape { rows, cols };
        assert_eq!(s(3, 2).broadcast(s(3, 2)), Some(s(3, 2)));
        assert_eq!(s(1, 2).broadcast(s(3, 2)), Some(s(3, 2)));
        assert_eq!(s(3, 2).broadcast(s(3, 1)), Some(s(3, 2)));
        assert_eq!(s(3, 2).broadcast(s(2, 3)), None);
        assert_eq!(s(1, 3).broadcast(s(3, 1)), None);
    }
}
