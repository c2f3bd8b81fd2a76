//! Statistical functions
//!
//! The plain and `A` variants share one kernel and differ only in the
//! [`NumberPolicy`] applied to values found inside ranges.

use std::cmp::Ordering;
use std::slice;

use xlcalc_core::CellError;

use super::FunctionRegistry;
use crate::coerce::{arg, collect_numbers, number, NumberPolicy};
use crate::context::EvaluationContext;
use crate::value::{Array, EvalResult, FormulaValue};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("AVERAGE", 1, None, fn_average);
    registry.add("AVERAGEA", 1, None, fn_averagea);
    registry.add("MIN", 1, None, fn_min);
    registry.add("MINA", 1, None, fn_mina);
    registry.add("MAX", 1, None, fn_max);
    registry.add("MAXA", 1, None, fn_maxa);
    registry.add("COUNT", 1, None, fn_count);
    registry.add("COUNTA", 1, None, fn_counta);
    registry.add("COUNTBLANK", 1, Some(1), fn_countblank);
    registry.add("MEDIAN", 1, None, fn_median);
    registry.add("MODE", 1, None, fn_mode);
    registry.add("MODE.SNGL", 1, None, fn_mode);
    registry.add("LARGE", 2, Some(2), fn_large);
    registry.add("SMALL", 2, Some(2), fn_small);
    registry.add("RANK", 2, Some(3), fn_rank);
    registry.add("RANK.EQ", 2, Some(3), fn_rank);
    registry.add("PERCENTILE", 2, Some(2), fn_percentile);
    registry.add("PERCENTILE.INC", 2, Some(2), fn_percentile);
    registry.add("QUARTILE", 2, Some(2), fn_quartile);
    registry.add("QUARTILE.INC", 2, Some(2), fn_quartile);
    registry.add("AVEDEV", 1, None, fn_avedev);
    registry.add("DEVSQ", 1, None, fn_devsq);
    registry.add("GEOMEAN", 1, None, fn_geomean);
    registry.add("HARMEAN", 1, None, fn_harmean);
    registry.add("STANDARDIZE", 3, Some(3), fn_standardize);

    registry.add("VAR", 1, None, fn_var);
    registry.add("VAR.S", 1, None, fn_var);
    registry.add("VARP", 1, None, fn_varp);
    registry.add("VAR.P", 1, None, fn_varp);
    registry.add("VARA", 1, None, fn_vara);
    registry.add("VARPA", 1, None, fn_varpa);
    registry.add("STDEV", 1, None, fn_stdev);
    registry.add("STDEV.S", 1, None, fn_stdev);
    registry.add("STDEVP", 1, None, fn_stdevp);
    registry.add("STDEV.P", 1, None, fn_stdevp);
    registry.add("STDEVA", 1, None, fn_stdeva);
    registry.add("STDEVPA", 1, None, fn_stdevpa);

    registry.add("CORREL", 2, Some(2), fn_correl);
    registry.add("PEARSON", 2, Some(2), fn_correl);
    registry.add("COVAR", 2, Some(2), fn_covar);
    registry.add("COVARIANCE.P", 2, Some(2), fn_covar);
    registry.add("COVARIANCE.S", 2, Some(2), fn_covariance_s);
    registry.add("RSQ", 2, Some(2), fn_rsq);
    registry.add("SLOPE", 2, Some(2), fn_slope);
    registry.add("INTERCEPT", 2, Some(2), fn_intercept);
    registry.add("FORECAST", 3, Some(3), fn_forecast);
    registry.add("FORECAST.LINEAR", 3, Some(3), fn_forecast);
    registry.add("STEYX", 2, Some(2), fn_steyx);
    registry.add("FREQUENCY", 2, Some(2), fn_frequency);
}

/// Arithmetic mean; no values is `#DIV/0!`
pub(crate) fn mean(values: &[f64]) -> EvalResult<f64> {
    if values.is_empty() {
        return Err(CellError::Div0);
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of squared deviations from the mean, computed in two passes
fn sum_squared_deviations(values: &[f64]) -> EvalResult<f64> {
    let m = mean(values)?;
    Ok(values.iter().map(|x| (x - m) * (x - m)).sum())
}

/// Sample (n - 1) or population (n) variance
///
/// Too few values for the chosen divisor is `#DIV/0!`.
pub(crate) fn variance(values: &[f64], sample: bool) -> EvalResult<f64> {
    let n = values.len();
    let divisor = if sample { n.saturating_sub(1) } else { n };
    if divisor == 0 {
        return Err(CellError::Div0);
    }
    Ok(sum_squared_deviations(values)? / divisor as f64)
}

/// Numeric pairs from two equally sized arrays
///
/// Pairs where either side is not a number are skipped together. Differing
/// shapes are `#N/A`, even with the same cell count; the first error met on
/// either side propagates.
pub(crate) fn paired_numbers(
    xs: &FormulaValue,
    ys: &FormulaValue,
    ctx: &EvaluationContext,
) -> EvalResult<Vec<(f64, f64)>> {
    let xs = ctx.to_array(xs)?;
    let ys = ctx.to_array(ys)?;
    if (xs.rows(), xs.cols()) != (ys.rows(), ys.cols()) {
        return Err(CellError::Na);
    }
    let mut pairs = Vec::with_capacity(xs.len());
    for (x, y) in xs.values().iter().zip(ys.values()) {
        if let Some(e) = x.error().or_else(|| y.error()) {
            return Err(e);
        }
        if let (FormulaValue::Number(x), FormulaValue::Number(y)) = (x, y) {
            pairs.push((*x, *y));
        }
    }
    Ok(pairs)
}

fn sorted(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    values
}

fn numbers(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<f64>> {
    collect_numbers(args, ctx, NumberPolicy::NumbersOnly)
}

fn logicals(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<f64>> {
    collect_numbers(args, ctx, NumberPolicy::Logicals)
}

/// AVERAGE(number1, ...) - Arithmetic mean of the numbers
pub fn fn_average(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(mean(&numbers(args, ctx)?)?))
}

/// AVERAGEA(value1, ...) - Mean counting booleans and text found in ranges
pub fn fn_averagea(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(mean(&logicals(args, ctx)?)?))
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::min).unwrap_or(0.0)
}

fn max_of(values: &[f64]) -> f64 {
    values.iter().copied().reduce(f64::max).unwrap_or(0.0)
}

/// MIN(number1, ...) - Smallest number, 0 when there are none
pub fn fn_min(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(min_of(&numbers(args, ctx)?)))
}

pub fn fn_mina(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(min_of(&logicals(args, ctx)?)))
}

/// MAX(number1, ...) - Largest number, 0 when there are none
pub fn fn_max(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(max_of(&numbers(args, ctx)?)))
}

pub fn fn_maxa(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(max_of(&logicals(args, ctx)?)))
}

/// COUNT(value1, ...) - Counts numbers
///
/// Ranges contribute their numeric cells. Direct arguments count when they
/// coerce to a number. Errors are skipped rather than propagated.
pub fn fn_count(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut count = 0usize;
    for a in args {
        if a.is_range() {
            ctx.visit(a, false, |v| {
                if matches!(v, FormulaValue::Number(_)) {
                    count += 1;
                }
                Ok(())
            })?;
        } else if !a.is_empty() && a.to_number(ctx.locale()).is_ok() {
            count += 1;
        }
    }
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTA(value1, ...) - Counts non-empty values, errors included
pub fn fn_counta(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut count = 0usize;
    for a in args {
        ctx.visit(a, false, |v| {
            if !v.is_empty() {
                count += 1;
            }
            Ok(())
        })?;
    }
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTBLANK(range) - Counts blank cells and empty text
pub fn fn_countblank(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut count = 0usize;
    ctx.visit(arg(args, 0)?, false, |v| {
        match v {
            FormulaValue::Empty => count += 1,
            FormulaValue::String(s) if s.is_empty() => count += 1,
            _ => {}
        }
        Ok(())
    })?;
    Ok(FormulaValue::Number(count as f64))
}

/// MEDIAN(number1, ...) - Middle value; average of the two middles for even counts
pub fn fn_median(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = sorted(numbers(args, ctx)?);
    let n = values.len();
    if n == 0 {
        return Err(CellError::Num);
    }
    let median = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };
    Ok(FormulaValue::Number(median))
}

/// MODE(number1, ...) - Most frequent number, earliest on ties; `#N/A` without repeats
pub fn fn_mode(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = numbers(args, ctx)?;
    let mut best: Option<(f64, usize)> = None;
    for (i, &v) in values.iter().enumerate() {
        let count = values[i..].iter().filter(|&&w| w == v).count();
        if count > 1 && best.map_or(true, |(_, c)| count > c) {
            best = Some((v, count));
        }
    }
    best.map(|(v, _)| FormulaValue::Number(v))
        .ok_or(CellError::Na)
}

/// k-th element (1-based, fractional k rounded up) of the sorted values
fn kth(args: &[FormulaValue], ctx: &EvaluationContext, largest: bool) -> EvalResult<FormulaValue> {
    let mut values = sorted(numbers(slice::from_ref(arg(args, 0)?), ctx)?);
    if largest {
        values.reverse();
    }
    let k = number(arg(args, 1)?, ctx)?.ceil();
    if k < 1.0 || k > values.len() as f64 {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number(values[k as usize - 1]))
}

/// LARGE(array, k) - k-th largest value
pub fn fn_large(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    kth(args, ctx, true)
}

/// SMALL(array, k) - k-th smallest value
pub fn fn_small(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    kth(args, ctx, false)
}

/// RANK(number, ref, [order]) - Position of number in ref; order 0 ranks descending
pub fn fn_rank(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let values = numbers(slice::from_ref(arg(args, 1)?), ctx)?;
    let ascending = match args.get(2) {
        Some(order) => number(order, ctx)? != 0.0,
        None => false,
    };
    if !values.contains(&x) {
        return Err(CellError::Na);
    }
    let ahead = values
        .iter()
        .filter(|&&v| if ascending { v < x } else { v > x })
        .count();
    Ok(FormulaValue::Number((ahead + 1) as f64))
}

/// Inclusive percentile with linear interpolation between ranks
fn percentile_inc(values: &[f64], k: f64) -> EvalResult<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&k) {
        return Err(CellError::Num);
    }
    let rank = k * (values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let fraction = rank - rank.floor();
    let lo = values[lower];
    match values.get(lower + 1) {
        Some(hi) if fraction > 0.0 => Ok(lo + fraction * (hi - lo)),
        _ => Ok(lo),
    }
}

/// PERCENTILE(array, k) - k-th percentile, k in [0, 1]
pub fn fn_percentile(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = sorted(numbers(slice::from_ref(arg(args, 0)?), ctx)?);
    let k = number(arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Number(percentile_inc(&values, k)?))
}

/// QUARTILE(array, quart) - quart 0 to 4 selects min, Q1, median, Q3, max
pub fn fn_quartile(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = sorted(numbers(slice::from_ref(arg(args, 0)?), ctx)?);
    let quart = number(arg(args, 1)?, ctx)?.trunc();
    if !(0.0..=4.0).contains(&quart) {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number(percentile_inc(&values, quart / 4.0)?))
}

/// AVEDEV(number1, ...) - Mean absolute deviation
pub fn fn_avedev(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = numbers(args, ctx)?;
    let m = mean(&values).map_err(|_| CellError::Num)?;
    let total: f64 = values.iter().map(|x| (x - m).abs()).sum();
    Ok(FormulaValue::Number(total / values.len() as f64))
}

/// DEVSQ(number1, ...) - Sum of squared deviations
pub fn fn_devsq(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = numbers(args, ctx)?;
    let total = sum_squared_deviations(&values).map_err(|_| CellError::Num)?;
    Ok(FormulaValue::Number(total))
}

/// GEOMEAN(number1, ...) - Geometric mean of positive numbers
pub fn fn_geomean(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = numbers(args, ctx)?;
    if values.is_empty() || values.iter().any(|&v| v <= 0.0) {
        return Err(CellError::Num);
    }
    let log_mean = values.iter().map(|v| v.ln()).sum::<f64>() / values.len() as f64;
    Ok(FormulaValue::Number(log_mean.exp()))
}

/// HARMEAN(number1, ...) - Harmonic mean of positive numbers
pub fn fn_harmean(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = numbers(args, ctx)?;
    if values.is_empty() || values.iter().any(|&v| v <= 0.0) {
        return Err(CellError::Num);
    }
    let reciprocal_sum: f64 = values.iter().map(|v| 1.0 / v).sum();
    Ok(FormulaValue::Number(values.len() as f64 / reciprocal_sum))
}

/// STANDARDIZE(x, mean, standard_dev) - `#NUM!` unless standard_dev > 0
pub fn fn_standardize(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let m = number(arg(args, 1)?, ctx)?;
    let sd = number(arg(args, 2)?, ctx)?;
    if sd <= 0.0 {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number((x - m) / sd))
}

fn var_with(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
    policy: NumberPolicy,
    sample: bool,
    sqrt: bool,
) -> EvalResult<FormulaValue> {
    let v = variance(&collect_numbers(args, ctx, policy)?, sample)?;
    Ok(FormulaValue::Number(if sqrt { v.sqrt() } else { v }))
}

/// VAR(number1, ...) - Sample variance
pub fn fn_var(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::NumbersOnly, true, false)
}

/// VARP(number1, ...) - Population variance
pub fn fn_varp(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::NumbersOnly, false, false)
}

pub fn fn_vara(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::Logicals, true, false)
}

pub fn fn_varpa(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::Logicals, false, false)
}

/// STDEV(number1, ...) - Sample standard deviation
pub fn fn_stdev(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::NumbersOnly, true, true)
}

/// STDEVP(number1, ...) - Population standard deviation
pub fn fn_stdevp(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::NumbersOnly, false, true)
}

pub fn fn_stdeva(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::Logicals, true, true)
}

pub fn fn_stdevpa(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    var_with(args, ctx, NumberPolicy::Logicals, false, true)
}

/// Centered sums over paired data: (sxx, syy, sxy, n, mean_x, mean_y)
struct PairStats {
    n: f64,
    mean_x: f64,
    mean_y: f64,
    sxx: f64,
    syy: f64,
    sxy: f64,
}

impl PairStats {
    fn new(pairs: &[(f64, f64)]) -> EvalResult<Self> {
        if pairs.is_empty() {
            return Err(CellError::Div0);
        }
        let n = pairs.len() as f64;
        let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
        let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;
        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(x, y) in pairs {
            let (dx, dy) = (x - mean_x, y - mean_y);
            sxx += dx * dx;
            syy += dy * dy;
            sxy += dx * dy;
        }
        Ok(Self {
            n,
            mean_x,
            mean_y,
            sxx,
            syy,
            sxy,
        })
    }

    fn correlation(&self) -> EvalResult<f64> {
        let denominator = (self.sxx * self.syy).sqrt();
        if denominator == 0.0 {
            return Err(CellError::Div0);
        }
        Ok(self.sxy / denominator)
    }

    fn slope(&self) -> EvalResult<f64> {
        if self.sxx == 0.0 {
            return Err(CellError::Div0);
        }
        Ok(self.sxy / self.sxx)
    }
}

fn pair_stats(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<PairStats> {
    PairStats::new(&paired_numbers(arg(args, 0)?, arg(args, 1)?, ctx)?)
}

/// Regression statistics take (known_y, known_x)
fn regression_stats(ys: &FormulaValue, xs: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<PairStats> {
    PairStats::new(&paired_numbers(xs, ys, ctx)?)
}

/// CORREL(array1, array2) - Pearson correlation coefficient
pub fn fn_correl(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(pair_stats(args, ctx)?.correlation()?))
}

/// COVAR(array1, array2) - Population covariance
pub fn fn_covar(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let stats = pair_stats(args, ctx)?;
    Ok(FormulaValue::Number(stats.sxy / stats.n))
}

/// COVARIANCE.S(array1, array2) - Sample covariance
pub fn fn_covariance_s(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let stats = pair_stats(args, ctx)?;
    if stats.n < 2.0 {
        return Err(CellError::Div0);
    }
    Ok(FormulaValue::Number(stats.sxy / (stats.n - 1.0)))
}

/// RSQ(known_y, known_x) - Square of the correlation
pub fn fn_rsq(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let r = regression_stats(arg(args, 0)?, arg(args, 1)?, ctx)?.correlation()?;
    Ok(FormulaValue::Number(r * r))
}

/// SLOPE(known_y, known_x) - Slope of the least-squares line
pub fn fn_slope(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let stats = regression_stats(arg(args, 0)?, arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Number(stats.slope()?))
}

/// INTERCEPT(known_y, known_x) - Where the least-squares line crosses x = 0
pub fn fn_intercept(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let stats = regression_stats(arg(args, 0)?, arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Number(stats.mean_y - stats.slope()? * stats.mean_x))
}

/// FORECAST(x, known_y, known_x) - Linear prediction at x
pub fn fn_forecast(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let stats = regression_stats(arg(args, 1)?, arg(args, 2)?, ctx)?;
    let slope = stats.slope()?;
    Ok(FormulaValue::Number(stats.mean_y + slope * (x - stats.mean_x)))
}

/// STEYX(known_y, known_x) - Standard error of the regression prediction
pub fn fn_steyx(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let stats = regression_stats(arg(args, 0)?, arg(args, 1)?, ctx)?;
    if stats.n < 3.0 || stats.sxx == 0.0 {
        return Err(CellError::Div0);
    }
    let residual = stats.syy - stats.sxy * stats.sxy / stats.sxx;
    Ok(FormulaValue::Number((residual.max(0.0) / (stats.n - 2.0)).sqrt()))
}

/// FREQUENCY(data_array, bins_array) - Histogram counts as a column
///
/// Each value lands in the smallest bin at or above it; values above
/// every bin go to the extra last slot.
pub fn fn_frequency(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let data = numbers(slice::from_ref(arg(args, 0)?), ctx)?;
    let bins = numbers(slice::from_ref(arg(args, 1)?), ctx)?;
    let mut counts = vec![0usize; bins.len() + 1];
    for d in data {
        let slot = bins
            .iter()
            .enumerate()
            .filter(|(_, &b)| d <= b)
            .min_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
            .map_or(bins.len(), |(i, _)| i);
        counts[slot] += 1;
    }
    Ok(FormulaValue::Array(Array::column(
        counts.into_iter().map(|c| FormulaValue::Number(c as f64)).collect(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{assert_close, call, call_in, number_grid};
    use pretty_assertions::assert_eq;
    use xlcalc_core::Workbook;

    fn mixed_range() -> FormulaValue {
        FormulaValue::Array(Array::row(vec![
            2.0.into(),
            4.0.into(),
            true.into(),
            "text".into(),
            FormulaValue::Empty,
            6.0.into(),
        ]))
    }

    #[test]
    fn test_average_families() {
        assert_eq!(call("AVERAGE", &[mixed_range()]), FormulaValue::Number(4.0));
        assert_close(&call("AVERAGEA", &[mixed_range()]), 13.0 / 5.0, 1e-12);
        assert_eq!(call("AVERAGE", &[FormulaValue::Array(Array::row(vec!["x".into()]))]), CellError::Div0.into());
        assert_eq!(call("MAX", &[mixed_range()]), FormulaValue::Number(6.0));
        assert_eq!(call("MIN", &[mixed_range()]), FormulaValue::Number(2.0));
        assert_eq!(call("MINA", &[mixed_range()]), FormulaValue::Number(0.0));
        assert_eq!(call("MAX", &[FormulaValue::Array(Array::row(vec!["x".into()]))]), FormulaValue::Number(0.0));
    }

    #[test]
    fn test_counts() {
        let range = FormulaValue::Array(Array::row(vec![
            1.0.into(),
            "a".into(),
            FormulaValue::Empty,
            CellError::Na.into(),
            true.into(),
            "".into(),
        ]));
        assert_eq!(call("COUNT", &[range.clone()]), FormulaValue::Number(1.0));
        assert_eq!(call("COUNT", &[range.clone(), "3".into(), true.into(), "x".into()]), FormulaValue::Number(3.0));
        assert_eq!(call("COUNTA", &[range.clone()]), FormulaValue::Number(5.0));
        assert_eq!(call("COUNTBLANK", &[range]), FormulaValue::Number(2.0));
    }

    #[test]
    fn test_errors_in_ranges_propagate() {
        let range = FormulaValue::Array(Array::row(vec![1.0.into(), CellError::Ref.into()]));
        assert_eq!(call("AVERAGE", &[range.clone()]), CellError::Ref.into());
        assert_eq!(call("STDEV", &[range]), CellError::Ref.into());
    }

    #[test]
    fn test_order_statistics() {
        let data = number_grid(&[&[3.0, 5.0, 3.0, 5.0, 4.0], &[4.0, 2.0, 4.0, 6.0, 7.0]]);
        assert_eq!(call("MEDIAN", &[data.clone()]), FormulaValue::Number(4.0));
        assert_eq!(call("MEDIAN", &[1.0.into(), 2.0.into(), 3.0.into(), 4.0.into()]), FormulaValue::Number(2.5));
        assert_eq!(call("MODE", &[data.clone()]), FormulaValue::Number(4.0));
        assert_eq!(call("MODE", &[1.0.into(), 2.0.into()]), CellError::Na.into());
        assert_eq!(call("LARGE", &[data.clone(), 3.0.into()]), FormulaValue::Number(5.0));
        assert_eq!(call("SMALL", &[data.clone(), 4.0.into()]), FormulaValue::Number(4.0));
        assert_eq!(call("SMALL", &[data.clone(), 11.0.into()]), CellError::Num.into());
        assert_eq!(call("RANK", &[7.0.into(), data.clone()]), FormulaValue::Number(1.0));
        assert_eq!(call("RANK", &[3.0.into(), data.clone(), 1.0.into()]), FormulaValue::Number(2.0));
        assert_eq!(call("RANK", &[9.0.into(), data]), CellError::Na.into());
    }

    #[test]
    fn test_percentile_and_quartile() {
        let data = number_grid(&[&[1.0, 2.0, 3.0, 4.0]]);
        assert_close(&call("PERCENTILE", &[data.clone(), 0.3.into()]), 1.9, 1e-12);
        assert_eq!(call("PERCENTILE", &[data.clone(), 1.5.into()]), CellError::Num.into());
        let data = number_grid(&[&[1.0, 2.0, 4.0, 7.0, 8.0, 9.0, 10.0, 12.0]]);
        assert_eq!(call("QUARTILE", &[data.clone(), 1.0.into()]), FormulaValue::Number(3.5));
        assert_eq!(call("QUARTILE", &[data.clone(), 4.0.into()]), FormulaValue::Number(12.0));
        assert_eq!(call("QUARTILE", &[data, 5.0.into()]), CellError::Num.into());
    }

    #[test]
    fn test_dispersion() {
        let data = number_grid(&[&[4.0, 5.0, 6.0, 7.0, 5.0, 4.0, 3.0]]);
        assert_close(&call("AVEDEV", &[data.clone()]), 1.020408163, 1e-9);
        assert_close(&call("DEVSQ", &[data]), 76.0 / 7.0, 1e-9);

        let data = number_grid(&[&[4.0, 5.0, 8.0, 7.0, 11.0, 4.0, 3.0]]);
        assert_close(&call("DEVSQ", &[data.clone()]), 48.0, 1e-9);
        assert_close(&call("GEOMEAN", &[data.clone()]), 5.476986969, 1e-6);
        assert_close(&call("HARMEAN", &[data]), 5.028375962, 1e-6);
        assert_eq!(call("GEOMEAN", &[0.0.into()]), CellError::Num.into());
        assert_close(&call("STANDARDIZE", &[42.0.into(), 40.0.into(), 1.5.into()]), 1.333333333, 1e-9);
        assert_eq!(call("STANDARDIZE", &[42.0.into(), 40.0.into(), 0.0.into()]), CellError::Num.into());
    }

    #[test]
    fn test_variance_family() {
        let data = number_grid(&[&[1345.0, 1301.0, 1368.0, 1322.0, 1310.0, 1370.0, 1318.0, 1350.0, 1303.0, 1299.0]]);
        assert_close(&call("VAR", &[data.clone()]), 754.2666667, 1e-6);
        assert_close(&call("VARP", &[data.clone()]), 678.84, 1e-9);
        assert_close(&call("STDEV", &[data.clone()]), 27.46391572, 1e-8);
        assert_close(&call("STDEV.P", &[data]), 26.05455814, 1e-8);
        assert_eq!(call("VAR", &[1.0.into()]), CellError::Div0.into());
        assert_eq!(call("VARP", &[1.0.into()]), FormulaValue::Number(0.0));

        let with_bool = FormulaValue::Array(Array::row(vec![1.0.into(), true.into(), 4.0.into()]));
        assert_close(&call("VARA", &[with_bool.clone()]), 3.0, 1e-12);
        assert_close(&call("VAR", &[with_bool]), 4.5, 1e-12);
    }

    #[test]
    fn test_variance_is_stable_for_large_offsets() {
        let data = number_grid(&[&[1e9 + 4.0, 1e9 + 7.0, 1e9 + 13.0, 1e9 + 16.0]]);
        assert_close(&call("VAR", &[data]), 30.0, 1e-6);
    }

    #[test]
    fn test_paired_statistics() {
        let ys = number_grid(&[&[2.0, 3.0, 9.0, 1.0, 8.0, 7.0, 5.0]]);
        let xs = number_grid(&[&[6.0, 5.0, 11.0, 7.0, 5.0, 4.0, 4.0]]);
        assert_close(&call("SLOPE", &[ys.clone(), xs.clone()]), 0.305555556, 1e-9);
        assert_close(&call("INTERCEPT", &[ys.clone(), xs.clone()]), 3.166666667, 1e-9);
        assert_close(&call("RSQ", &[ys.clone(), xs.clone()]), 0.057950192, 1e-9);
        assert_close(&call("STEYX", &[ys.clone(), xs.clone()]), 3.305718950, 1e-9);
        assert_close(&call("FORECAST", &[30.0.into(), ys.clone(), xs.clone()]), 12.33333333, 1e-8);

        let a = number_grid(&[&[3.0, 2.0, 4.0, 5.0, 6.0]]);
        let b = number_grid(&[&[9.0, 7.0, 12.0, 15.0, 17.0]]);
        assert_close(&call("CORREL", &[a.clone(), b.clone()]), 0.997054486, 1e-9);
        assert_close(&call("PEARSON", &[a.clone(), b.clone()]), 0.997054486, 1e-9);
        assert_close(&call("COVAR", &[a.clone(), b.clone()]), 5.2, 1e-12);
        assert_close(&call("COVARIANCE.S", &[a.clone(), b]), 6.5, 1e-12);
        assert_eq!(call("CORREL", &[a, number_grid(&[&[1.0, 2.0]])]), CellError::Na.into());
    }

    #[test]
    fn test_pairs_need_matching_shapes() {
        let square = number_grid(&[&[1.0, 2.0], &[3.0, 4.0]]);
        let row = number_grid(&[&[2.0, 4.0, 6.0, 9.0]]);
        for name in ["CORREL", "PEARSON", "COVAR", "COVARIANCE.S", "SLOPE", "RSQ"] {
            assert_eq!(call(name, &[square.clone(), row.clone()]), CellError::Na.into(), "{}", name);
        }
    }

    #[test]
    fn test_pairs_skip_non_numbers_jointly() {
        let a = FormulaValue::Array(Array::row(vec![1.0.into(), "x".into(), 3.0.into(), 4.0.into()]));
        let b = FormulaValue::Array(Array::row(vec![2.0.into(), 100.0.into(), 6.0.into(), 8.0.into()]));
        assert_close(&call("CORREL", &[a, b]), 1.0, 1e-12);
    }

    #[test]
    fn test_missing_range_arguments_are_value_errors() {
        let ctx = EvaluationContext::simple();
        let data = number_grid(&[&[1.0, 2.0]]);
        assert_eq!(kth(&[], &ctx, true), Err(CellError::Value));
        assert_eq!(fn_rank(&[1.0.into()], &ctx), Err(CellError::Value));
        assert_eq!(fn_percentile(&[], &ctx), Err(CellError::Value));
        assert_eq!(fn_quartile(&[], &ctx), Err(CellError::Value));
        assert_eq!(fn_frequency(&[data], &ctx), Err(CellError::Value));
    }

    #[test]
    fn test_frequency() {
        let data = number_grid(&[&[79.0, 85.0, 78.0, 85.0, 50.0, 81.0, 95.0, 88.0, 97.0]]);
        let bins = number_grid(&[&[70.0, 79.0, 89.0]]);
        assert_eq!(
            call("FREQUENCY", &[data, bins]),
            number_grid(&[&[1.0], &[2.0], &[4.0], &[2.0]])
        );
    }

    #[test]
    fn test_statistics_over_sheet_range() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        sheet.set_cell_value("A1", 10.0).unwrap();
        sheet.set_cell_value("A2", "20").unwrap();
        sheet.set_cell_value("A3", 30.0).unwrap();
        let ctx = EvaluationContext::new(&wb, 0, 0, 1);
        let range = FormulaValue::range("A1:A4");
        assert_eq!(call_in("AVERAGE", &[range.clone()], &ctx), FormulaValue::Number(20.0));
        assert_eq!(call_in("COUNT", &[range.clone()], &ctx), FormulaValue::Number(2.0));
        assert_eq!(call_in("COUNTA", &[range.clone()], &ctx), FormulaValue::Number(3.0));
        assert_eq!(call_in("COUNTBLANK", &[range], &ctx), FormulaValue::Number(1.0));
    }
}
