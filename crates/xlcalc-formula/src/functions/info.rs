//! Information functions

use xlcalc_core::CellError;

use super::FunctionRegistry;
use crate::broadcast::map;
use crate::coerce::arg;
use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("ISBLANK", 1, Some(1), fn_isblank);
    registry.add("ISNUMBER", 1, Some(1), fn_isnumber);
    registry.add("ISTEXT", 1, Some(1), fn_istext);
    registry.add("ISNONTEXT", 1, Some(1), fn_isnontext);
    registry.add("ISLOGICAL", 1, Some(1), fn_islogical);
    registry.add("ISERROR", 1, Some(1), fn_iserror);
    registry.add("ISERR", 1, Some(1), fn_iserr);
    registry.add("ISNA", 1, Some(1), fn_isna);
    registry.add("ISEVEN", 1, Some(1), fn_iseven);
    registry.add("ISODD", 1, Some(1), fn_isodd);
    registry.add("ISREF", 1, Some(1), fn_isref);
    registry.add("NA", 0, Some(0), fn_na);
    registry.add("ERROR.TYPE", 1, Some(1), fn_error_type);
    registry.add("TYPE", 1, Some(1), fn_type);
    registry.add("N", 1, Some(1), fn_n);
}

/// Test every value an argument covers; never an error itself
fn is(args: &[FormulaValue], ctx: &EvaluationContext, test: fn(&FormulaValue) -> bool) -> EvalResult<FormulaValue> {
    Ok(map(arg(args, 0)?, ctx, |v| Ok(FormulaValue::Boolean(test(v)))))
}

/// ISBLANK(value)
pub fn fn_isblank(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, FormulaValue::is_empty)
}

/// ISNUMBER(value)
pub fn fn_isnumber(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, |v| matches!(v, FormulaValue::Number(_)))
}

/// ISTEXT(value)
pub fn fn_istext(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, |v| matches!(v, FormulaValue::String(_)))
}

/// ISNONTEXT(value) - TRUE for blanks too
pub fn fn_isnontext(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, |v| !matches!(v, FormulaValue::String(_)))
}

/// ISLOGICAL(value)
pub fn fn_islogical(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, |v| matches!(v, FormulaValue::Boolean(_)))
}

/// ISERROR(value)
pub fn fn_iserror(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, FormulaValue::is_error)
}

/// ISERR(value) - Any error except `#N/A`
pub fn fn_iserr(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, |v| matches!(v, FormulaValue::Error(e) if *e != CellError::Na))
}

/// ISNA(value)
pub fn fn_isna(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    is(args, ctx, |v| matches!(v, FormulaValue::Error(CellError::Na)))
}

/// Whether the integer part of a number is even; booleans are `#VALUE!`
fn parity(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<bool> {
    let n = match value {
        FormulaValue::Boolean(_) => return Err(CellError::Value),
        other => other.to_number(ctx.locale())?,
    };
    Ok(n.trunc() % 2.0 == 0.0)
}

/// ISEVEN(number)
pub fn fn_iseven(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(map(arg(args, 0)?, ctx, |v| parity(v, ctx).map(FormulaValue::Boolean)))
}

/// ISODD(number)
pub fn fn_isodd(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(map(arg(args, 0)?, ctx, |v| parity(v, ctx).map(|even| FormulaValue::Boolean(!even))))
}

/// ISREF(value) - Whether the argument is a reference, before it is read
pub fn fn_isref(args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Boolean(matches!(arg(args, 0)?, FormulaValue::Reference(_))))
}

/// NA()
pub fn fn_na(_args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Err(CellError::Na)
}

/// ERROR.TYPE(error_val) - 1 for `#NULL!` through 7 for `#N/A`; `#N/A` otherwise
pub fn fn_error_type(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    match ctx.scalar(arg(args, 0)?) {
        FormulaValue::Error(e) => Ok(FormulaValue::Number(f64::from(e.code()))),
        _ => Err(CellError::Na),
    }
}

/// TYPE(value) - 1 number, 2 text, 4 logical, 16 error, 64 array
pub fn fn_type(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let value = arg(args, 0)?;
    let code = match value {
        FormulaValue::Reference(r) if !r.is_single_cell() => 64,
        FormulaValue::Reference(_) => ctx.scalar(value).type_code(),
        other => other.type_code(),
    };
    Ok(FormulaValue::Number(f64::from(code)))
}

/// N(value) - Numbers as is, TRUE as 1, errors propagate, anything else 0
pub fn fn_n(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let n = match ctx.scalar(arg(args, 0)?) {
        FormulaValue::Number(n) => n,
        FormulaValue::Boolean(true) => 1.0,
        FormulaValue::Error(e) => return Err(e),
        _ => 0.0,
    };
    Ok(FormulaValue::Number(n))
}
