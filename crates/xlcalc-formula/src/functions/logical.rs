//! Logical functions

use xlcalc_core::CellError;

use super::FunctionRegistry;
use crate::broadcast::Operand;
use crate::coerce::{arg, boolean};
use crate::context::EvaluationContext;
use crate::value::{Array, EvalResult, FormulaValue};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("IF", 2, Some(3), fn_if);
    registry.add("AND", 1, None, fn_and);
    registry.add("OR", 1, None, fn_or);
    registry.add("XOR", 1, None, fn_xor);
    registry.add("NOT", 1, Some(1), fn_not);
    registry.add("TRUE", 0, Some(0), fn_true);
    registry.add("FALSE", 0, Some(0), fn_false);
    registry.add("IFERROR", 2, Some(2), fn_iferror);
    registry.add("IFNA", 2, Some(2), fn_ifna);
    registry.add("IFS", 2, None, fn_ifs);
    registry.add("SWITCH", 3, None, fn_switch);
}

/// Apply `f` to a scalar argument, or cell by cell to a grid argument
///
/// Values chosen from inside a grid are resolved to scalars so the result
/// stays a plain array.
fn per_cell<F>(value: &FormulaValue, ctx: &EvaluationContext, f: F) -> EvalResult<FormulaValue>
where
    F: Fn(&FormulaValue) -> EvalResult<FormulaValue>,
{
    match Operand::resolve(value, ctx) {
        Operand::Scalar(v) => f(&v),
        Operand::Grid(grid) => {
            let values = grid
                .values()
                .iter()
                .map(|v| f(v).map(|r| ctx.scalar(&r)).unwrap_or_else(FormulaValue::Error))
                .collect();
            Ok(FormulaValue::Array(Array::new(grid.rows(), grid.cols(), values)))
        }
    }
}

/// IF(logical_test, value_if_true, [value_if_false])
///
/// An array test picks a branch per element.
pub fn fn_if(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let condition = arg(args, 0)?;
    let if_true = arg(args, 1)?;
    let if_false = args.get(2).cloned().unwrap_or(FormulaValue::Boolean(false));
    per_cell(condition, ctx, |test| {
        Ok(if test.to_bool()? {
            if_true.clone()
        } else {
            if_false.clone()
        })
    })
}

/// Truth values of the arguments of AND, OR and XOR
///
/// Ranges contribute their booleans and numbers; text and blanks inside
/// them are skipped. Arguments typed directly must coerce. Nothing to
/// test is `#VALUE!`.
fn truth_values(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<bool>> {
    let mut values = Vec::new();
    for value in args {
        if value.is_range() {
            ctx.visit(value, false, |cell| {
                match cell {
                    FormulaValue::Boolean(b) => values.push(*b),
                    FormulaValue::Number(n) => values.push(*n != 0.0),
                    FormulaValue::Error(e) => return Err(*e),
                    _ => {}
                }
                Ok(())
            })?;
        } else if !value.is_empty() {
            values.push(value.to_bool()?);
        }
    }
    if values.is_empty() {
        return Err(CellError::Value);
    }
    Ok(values)
}

/// AND(logical1, [logical2], ...)
pub fn fn_and(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Boolean(truth_values(args, ctx)?.iter().all(|b| *b)))
}

/// OR(logical1, [logical2], ...)
pub fn fn_or(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Boolean(truth_values(args, ctx)?.iter().any(|b| *b)))
}

/// XOR(logical1, [logical2], ...) - TRUE when an odd number of values are TRUE
pub fn fn_xor(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let count = truth_values(args, ctx)?.iter().filter(|b| **b).count();
    Ok(FormulaValue::Boolean(count % 2 == 1))
}

/// NOT(logical)
pub fn fn_not(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Boolean(!boolean(arg(args, 0)?, ctx)?))
}

/// TRUE()
pub fn fn_true(_args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Boolean(true))
}

/// FALSE()
pub fn fn_false(_args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Boolean(false))
}

/// IFERROR(value, value_if_error) - Replace any error, element-wise over arrays
pub fn fn_iferror(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let fallback = arg(args, 1)?;
    per_cell(arg(args, 0)?, ctx, |v| {
        Ok(if v.is_error() { fallback.clone() } else { v.clone() })
    })
}

/// IFNA(value, value_if_na) - Replace `#N/A` only
pub fn fn_ifna(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let fallback = arg(args, 1)?;
    per_cell(arg(args, 0)?, ctx, |v| {
        Ok(match v {
            FormulaValue::Error(CellError::Na) => fallback.clone(),
            other => other.clone(),
        })
    })
}

/// IFS(condition1, value1, [condition2, value2], ...)
///
/// Value of the first true condition; `#N/A` when none holds.
pub fn fn_ifs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    if args.len() % 2 != 0 {
        return Err(CellError::Value);
    }
    for pair in args.chunks(2) {
        if boolean(&pair[0], ctx)? {
            return Ok(pair[1].clone());
        }
    }
    Err(CellError::Na)
}

/// Strict equality used by SWITCH: same type, text without regard to case
fn same_value(a: &FormulaValue, b: &FormulaValue) -> bool {
    match (a, b) {
        (FormulaValue::Number(x), FormulaValue::Number(y)) => x == y,
        (FormulaValue::String(x), FormulaValue::String(y)) => x.to_lowercase() == y.to_lowercase(),
        (FormulaValue::Boolean(x), FormulaValue::Boolean(y)) => x == y,
        (FormulaValue::Empty, FormulaValue::Empty) => true,
        _ => false,
    }
}

/// SWITCH(expression, value1, result1, [value2, result2], ..., [default])
pub fn fn_switch(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let expression = ctx.scalar(arg(args, 0)?);
    if let FormulaValue::Error(e) = expression {
        return Err(e);
    }

    let cases = &args[1..];
    for pair in cases.chunks_exact(2) {
        let candidate = ctx.scalar(&pair[0]);
        if let FormulaValue::Error(e) = candidate {
            return Err(e);
        }
        if same_value(&expression, &candidate) {
            return Ok(pair[1].clone());
        }
    }

    match cases.chunks_exact(2).remainder() {
        [default] => Ok(default.clone()),
        _ => Err(CellError::Na),
    }
}
