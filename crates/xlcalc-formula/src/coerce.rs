//! Argument coercion helpers used at the top of function bodies
//!
//! Every helper resolves references through the context first, then applies
//! the scalar coercion rules of [`FormulaValue`].

use lazy_regex::regex_is_match;
use xlcalc_core::{CellError, Locale};

use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

/// Parse text as a number the way cell entry does
///
/// Accepts surrounding spaces, a sign, the locale's grouping and decimal
/// separators, an exponent, a currency symbol, a trailing `%` and
/// accounting-style parentheses for negatives.
pub fn parse_number(text: &str, locale: &Locale) -> Option<f64> {
    let mut s = text.trim();
    if s.is_empty() {
        return None;
    }

    let mut negative = false;
    if let Some(inner) = s.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        negative = true;
        s = inner.trim();
    }

    let mut percent = false;
    if let Some(rest) = s.strip_suffix('%') {
        percent = true;
        s = rest.trim_end();
    }

    let mut sign = "";
    if let Some(rest) = s.strip_prefix('-') {
        sign = "-";
        s = rest.trim_start();
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest.trim_start();
    }

    let currency = locale.currency_symbol.as_str();
    if !currency.is_empty() {
        if let Some(rest) = s.strip_prefix(currency) {
            s = rest.trim_start();
        } else if let Some(rest) = s.strip_suffix(currency) {
            s = rest.trim_end();
        }
    }
    if sign.is_empty() && !negative {
        if let Some(rest) = s.strip_prefix('-') {
            sign = "-";
            s = rest;
        }
    }

    let mut canonical = String::with_capacity(s.len() + 1);
    canonical.push_str(sign);
    let mut seen_decimal = false;
    for c in s.chars() {
        if c == locale.decimal_separator && !seen_decimal {
            seen_decimal = true;
            canonical.push('.');
        } else if c == locale.group_separator && !seen_decimal {
            continue;
        } else {
            canonical.push(c);
        }
    }

    if !regex_is_match!(r"^-?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$", &canonical) {
        return None;
    }
    let mut n: f64 = canonical.parse().ok()?;
    if negative {
        n = -n;
    }
    if percent {
        n /= 100.0;
    }
    n.is_finite().then_some(n)
}

/// Positional argument; missing required arguments are `#VALUE!`
pub fn arg(args: &[FormulaValue], index: usize) -> EvalResult<&FormulaValue> {
    args.get(index).ok_or(CellError::Value)
}

/// Resolve an argument to one number
pub fn number(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<f64> {
    ctx.scalar(value).to_number(ctx.locale())
}

/// Optional numeric argument with a default when it is not supplied
pub fn number_or(
    args: &[FormulaValue],
    index: usize,
    default: f64,
    ctx: &EvaluationContext,
) -> EvalResult<f64> {
    match args.get(index) {
        Some(value) => number(value, ctx),
        None => Ok(default),
    }
}

/// Resolve an argument to one number truncated toward zero
pub fn integer(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<i64> {
    let n = number(value, ctx)?.trunc();
    if n.abs() > 9.007_199_254_740_992e15 {
        return Err(CellError::Num);
    }
    Ok(n as i64)
}

/// Optional integer argument with a default when it is not supplied
pub fn integer_or(
    args: &[FormulaValue],
    index: usize,
    default: i64,
    ctx: &EvaluationContext,
) -> EvalResult<i64> {
    match args.get(index) {
        Some(value) => integer(value, ctx),
        None => Ok(default),
    }
}

/// Resolve an argument to a boolean
pub fn boolean(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<bool> {
    ctx.scalar(value).to_bool()
}

/// Optional boolean argument with a default when it is not supplied
pub fn boolean_or(
    args: &[FormulaValue],
    index: usize,
    default: bool,
    ctx: &EvaluationContext,
) -> EvalResult<bool> {
    match args.get(index) {
        Some(value) => boolean(value, ctx),
        None => Ok(default),
    }
}

/// Resolve an argument to text
pub fn text(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<String> {
    ctx.scalar(value).to_text()
}

/// How values found inside references and arrays count toward numeric aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumberPolicy {
    /// Only numbers count (SUM, AVERAGE, STDEV, ...)
    NumbersOnly,
    /// Booleans count as 0/1 and text as 0 (AVERAGEA, STDEVA, ...)
    Logicals,
}

/// Gather the numbers a list of aggregate arguments contributes
///
/// Values typed directly as arguments always count: booleans become 0/1 and
/// text must parse, otherwise `#VALUE!`. Values inside ranges follow the
/// policy. The first error met, left to right, is returned.
pub fn collect_numbers(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
    policy: NumberPolicy,
) -> EvalResult<Vec<f64>> {
    collect_numbers_filtered(args, ctx, policy, false)
}

/// [`collect_numbers`] optionally skipping hidden rows
pub fn collect_numbers_filtered(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
    policy: NumberPolicy,
    skip_hidden: bool,
) -> EvalResult<Vec<f64>> {
    let mut numbers = Vec::new();
    for arg in args {
        if arg.is_range() {
            ctx.visit(arg, skip_hidden, |value| {
                if let Some(n) = range_number(value, policy)? {
                    numbers.push(n);
                }
                Ok(())
            })?;
        } else {
            numbers.push(arg.to_number(ctx.locale())?);
        }
    }
    Ok(numbers)
}

/// Number contributed by one value found inside a range
pub fn range_number(value: &FormulaValue, policy: NumberPolicy) -> EvalResult<Option<f64>> {
    match (value, policy) {
        (FormulaValue::Number(n), _) => Ok(Some(*n)),
        (FormulaValue::Error(e), _) => Err(*e),
        (FormulaValue::Boolean(b), NumberPolicy::Logicals) => Ok(Some(if *b { 1.0 } else { 0.0 })),
        (FormulaValue::String(_), NumberPolicy::Logicals) => Ok(Some(0.0)),
        _ => Ok(None),
    }
}
