//! Database functions (DSUM, DAVERAGE, DGET, ...)
//!
//! A database is a range whose first row holds field names. The criteria
//! range has field names in its first row and conditions below: conditions
//! on one row must all hold, and a record is selected when any row holds.
//! A blank criteria row selects every record.

use xlcalc_core::{CellError, Locale};

use super::criteria::Criterion;
use super::statistical::variance;
use super::FunctionRegistry;
use crate::coerce::{arg, parse_number};
use crate::context::EvaluationContext;
use crate::value::{Array, EvalResult, FormulaValue};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("DSUM", 3, Some(3), fn_dsum);
    registry.add("DAVERAGE", 3, Some(3), fn_daverage);
    registry.add("DCOUNT", 3, Some(3), fn_dcount);
    registry.add("DCOUNTA", 3, Some(3), fn_dcounta);
    registry.add("DMAX", 3, Some(3), fn_dmax);
    registry.add("DMIN", 3, Some(3), fn_dmin);
    registry.add("DGET", 3, Some(3), fn_dget);
    registry.add("DPRODUCT", 3, Some(3), fn_dproduct);
    registry.add("DSTDEV", 3, Some(3), fn_dstdev);
    registry.add("DSTDEVP", 3, Some(3), fn_dstdevp);
    registry.add("DVAR", 3, Some(3), fn_dvar);
    registry.add("DVARP", 3, Some(3), fn_dvarp);
}

/// One criteria row: (database column, condition) pairs that must all hold
type CriteriaRow = Vec<(usize, Criterion)>;

fn header_matches(header: &FormulaValue, name: &str, locale: &Locale) -> bool {
    match header {
        FormulaValue::String(s) => s.trim().eq_ignore_ascii_case(name.trim()),
        FormulaValue::Number(n) => parse_number(name, locale) == Some(*n),
        _ => false,
    }
}

fn column_named(headers: &[FormulaValue], name: &str, locale: &Locale) -> Option<usize> {
    headers.iter().position(|h| header_matches(h, name, locale))
}

/// Column of the field argument: a header name or a 1-based column number
fn field_column(field: &FormulaValue, headers: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<usize> {
    match ctx.scalar(field) {
        FormulaValue::Error(e) => Err(e),
        FormulaValue::String(name) => column_named(headers, &name, ctx.locale()).ok_or(CellError::Value),
        FormulaValue::Number(n) => {
            let index = n.trunc();
            if index < 1.0 || index > headers.len() as f64 {
                return Err(CellError::Value);
            }
            Ok(index as usize - 1)
        }
        _ => Err(CellError::Value),
    }
}

/// Condition of one criteria cell
///
/// Plain text selects values beginning with it; operators, numbers,
/// booleans and error codes parse as in SUMIF.
fn condition(cell: &FormulaValue, locale: &Locale) -> Criterion {
    if let FormulaValue::String(s) = cell {
        let plain = !s.starts_with(['<', '>', '='])
            && parse_number(s, locale).is_none()
            && !s.eq_ignore_ascii_case("TRUE")
            && !s.eq_ignore_ascii_case("FALSE")
            && s.parse::<CellError>().is_err();
        if plain {
            return Criterion::parse(&FormulaValue::String(format!("{}*", s)), locale);
        }
    }
    Criterion::parse(cell, locale)
}

fn criteria_rows(criteria: &Array, headers: &[FormulaValue], locale: &Locale) -> EvalResult<Vec<CriteriaRow>> {
    let mut columns = Vec::with_capacity(criteria.cols());
    for col in 0..criteria.cols() {
        let column = match criteria.get(0, col) {
            None | Some(FormulaValue::Empty) => None,
            Some(FormulaValue::Error(e)) => return Err(*e),
            Some(FormulaValue::Number(n)) => {
                let same = |h: &FormulaValue| match h {
                    FormulaValue::Number(m) => m == n,
                    FormulaValue::String(s) => parse_number(s, locale) == Some(*n),
                    _ => false,
                };
                Some(headers.iter().position(same).ok_or(CellError::Value)?)
            }
            Some(header) => {
                let name = header.to_text()?;
                Some(column_named(headers, &name, locale).ok_or(CellError::Value)?)
            }
        };
        columns.push(column);
    }

    let mut rows = Vec::new();
    for values in criteria.iter_rows().skip(1) {
        let row: CriteriaRow = values
            .iter()
            .zip(&columns)
            .filter(|(cell, _)| !cell.is_empty())
            .filter_map(|(cell, column)| column.map(|c| (c, condition(cell, locale))))
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

/// Field values of the selected records, top to bottom
fn selected_values(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<FormulaValue>> {
    let database = ctx.to_array(arg(args, 0)?)?;
    if database.rows() < 2 {
        return Err(CellError::Value);
    }
    let headers: Vec<FormulaValue> = database.iter_rows().next().map(<[_]>::to_vec).unwrap_or_default();
    let column = field_column(arg(args, 1)?, &headers, ctx)?;
    let criteria = ctx.to_array(arg(args, 2)?)?;
    let rows = criteria_rows(&criteria, &headers, ctx.locale())?;

    Ok(database
        .iter_rows()
        .skip(1)
        .filter(|record| {
            rows.iter().any(|conditions| {
                conditions
                    .iter()
                    .all(|(col, criterion)| record.get(*col).map_or(false, |v| criterion.matches(v)))
            })
        })
        .filter_map(|record| record.get(column).cloned())
        .collect())
}

/// Numbers among the selected field values; a selected error is returned
fn selected_numbers(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for value in selected_values(args, ctx)? {
        match value {
            FormulaValue::Number(n) => numbers.push(n),
            FormulaValue::Error(e) => return Err(e),
            _ => {}
        }
    }
    Ok(numbers)
}

/// DSUM(database, field, criteria)
pub fn fn_dsum(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(selected_numbers(args, ctx)?.iter().sum()))
}

/// DAVERAGE(database, field, criteria) - `#DIV/0!` when nothing numeric is selected
pub fn fn_daverage(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let numbers = selected_numbers(args, ctx)?;
    if numbers.is_empty() {
        return Err(CellError::Div0);
    }
    Ok(FormulaValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

/// DCOUNT(database, field, criteria) - Selected cells holding numbers
pub fn fn_dcount(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let count = selected_values(args, ctx)?
        .iter()
        .filter(|v| matches!(v, FormulaValue::Number(_)))
        .count();
    Ok(FormulaValue::Number(count as f64))
}

/// DCOUNTA(database, field, criteria) - Selected cells that are not blank
pub fn fn_dcounta(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let count = selected_values(args, ctx)?.iter().filter(|v| !v.is_empty()).count();
    Ok(FormulaValue::Number(count as f64))
}

/// DMAX(database, field, criteria)
pub fn fn_dmax(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let max = selected_numbers(args, ctx)?.into_iter().reduce(f64::max);
    Ok(FormulaValue::Number(max.unwrap_or(0.0)))
}

/// DMIN(database, field, criteria)
pub fn fn_dmin(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let min = selected_numbers(args, ctx)?.into_iter().reduce(f64::min);
    Ok(FormulaValue::Number(min.unwrap_or(0.0)))
}

/// DGET(database, field, criteria) - The single selected value
///
/// `#VALUE!` when no record is selected, `#NUM!` when more than one is.
pub fn fn_dget(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut values = selected_values(args, ctx)?;
    match values.len() {
        0 => Err(CellError::Value),
        1 => Ok(values.remove(0)),
        _ => Err(CellError::Num),
    }
}

/// DPRODUCT(database, field, criteria)
pub fn fn_dproduct(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let numbers = selected_numbers(args, ctx)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(numbers.iter().product()))
}

/// DSTDEV(database, field, criteria) - Sample standard deviation
pub fn fn_dstdev(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args, ctx)?, true)?.sqrt()))
}

/// DSTDEVP(database, field, criteria) - Population standard deviation
pub fn fn_dstdevp(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args, ctx)?, false)?.sqrt()))
}

/// DVAR(database, field, criteria) - Sample variance
pub fn fn_dvar(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args, ctx)?, true)?))
}

/// DVARP(database, field, criteria) - Population variance
pub fn fn_dvarp(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(variance(&selected_numbers(args, ctx)?, false)?))
}
