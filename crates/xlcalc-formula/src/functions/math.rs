//! Math functions

use std::str::FromStr;

use rand::Rng;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use xlcalc_core::CellError;

use super::statistical::{mean, paired_numbers, variance};
use super::FunctionRegistry;
use crate::broadcast::{map_number, zip_numbers};
use crate::coerce::{
    arg, collect_numbers, collect_numbers_filtered, integer, number, NumberPolicy,
};
use crate::context::EvaluationContext;
use crate::operators::power;
use crate::value::{EvalResult, FormulaValue};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("SUM", 1, None, fn_sum);
    registry.add("PRODUCT", 1, None, fn_product);
    registry.add("SUMSQ", 1, None, fn_sumsq);
    registry.add("SUMPRODUCT", 1, None, fn_sumproduct);
    registry.add("SUMX2MY2", 2, Some(2), fn_sumx2my2);
    registry.add("SUMX2PY2", 2, Some(2), fn_sumx2py2);
    registry.add("SUMXMY2", 2, Some(2), fn_sumxmy2);
    registry.add("SUBTOTAL", 2, None, fn_subtotal);

    registry.add("ROUND", 2, Some(2), fn_round);
    registry.add("ROUNDUP", 2, Some(2), fn_roundup);
    registry.add("ROUNDDOWN", 2, Some(2), fn_rounddown);
    registry.add("TRUNC", 1, Some(2), fn_trunc);
    registry.add("INT", 1, Some(1), fn_int);
    registry.add("EVEN", 1, Some(1), fn_even);
    registry.add("ODD", 1, Some(1), fn_odd);
    registry.add("CEILING", 2, Some(2), fn_ceiling);
    registry.add("FLOOR", 2, Some(2), fn_floor);
    registry.add("CEILING.MATH", 1, Some(3), fn_ceiling_math);
    registry.add("FLOOR.MATH", 1, Some(3), fn_floor_math);
    registry.add("CEILING.PRECISE", 1, Some(2), fn_ceiling_precise);
    registry.add("ISO.CEILING", 1, Some(2), fn_ceiling_precise);
    registry.add("FLOOR.PRECISE", 1, Some(2), fn_floor_precise);
    registry.add("MROUND", 2, Some(2), fn_mround);

    registry.add("MOD", 2, Some(2), fn_mod);
    registry.add("QUOTIENT", 2, Some(2), fn_quotient);
    registry.add("ABS", 1, Some(1), fn_abs);
    registry.add("SIGN", 1, Some(1), fn_sign);
    registry.add("SQRT", 1, Some(1), fn_sqrt);
    registry.add("SQRTPI", 1, Some(1), fn_sqrtpi);
    registry.add("POWER", 2, Some(2), fn_power);
    registry.add("EXP", 1, Some(1), fn_exp);
    registry.add("LN", 1, Some(1), fn_ln);
    registry.add("LOG", 1, Some(2), fn_log);
    registry.add("LOG10", 1, Some(1), fn_log10);

    registry.add("FACT", 1, Some(1), fn_fact);
    registry.add("FACTDOUBLE", 1, Some(1), fn_factdouble);
    registry.add("COMBIN", 2, Some(2), fn_combin);
    registry.add("COMBINA", 2, Some(2), fn_combina);
    registry.add("PERMUT", 2, Some(2), fn_permut);
    registry.add("MULTINOMIAL", 1, None, fn_multinomial);
    registry.add("GCD", 1, None, fn_gcd);
    registry.add("LCM", 1, None, fn_lcm);

    registry.add("PI", 0, Some(0), fn_pi);
    registry.add("DEGREES", 1, Some(1), fn_degrees);
    registry.add("RADIANS", 1, Some(1), fn_radians);
    registry.add("SIN", 1, Some(1), fn_sin);
    registry.add("COS", 1, Some(1), fn_cos);
    registry.add("TAN", 1, Some(1), fn_tan);
    registry.add("ASIN", 1, Some(1), fn_asin);
    registry.add("ACOS", 1, Some(1), fn_acos);
    registry.add("ATAN", 1, Some(1), fn_atan);
    registry.add("ATAN2", 2, Some(2), fn_atan2);
    registry.add("SINH", 1, Some(1), fn_sinh);
    registry.add("COSH", 1, Some(1), fn_cosh);
    registry.add("TANH", 1, Some(1), fn_tanh);
    registry.add("ASINH", 1, Some(1), fn_asinh);
    registry.add("ACOSH", 1, Some(1), fn_acosh);
    registry.add("ATANH", 1, Some(1), fn_atanh);
    registry.add("COT", 1, Some(1), fn_cot);
    registry.add("COTH", 1, Some(1), fn_coth);
    registry.add("CSC", 1, Some(1), fn_csc);
    registry.add("CSCH", 1, Some(1), fn_csch);
    registry.add("SEC", 1, Some(1), fn_sec);
    registry.add("SECH", 1, Some(1), fn_sech);
    registry.add("ACOT", 1, Some(1), fn_acot);
    registry.add("ACOTH", 1, Some(1), fn_acoth);

    registry.add_volatile("RAND", 0, Some(0), fn_rand);
    registry.add_volatile("RANDBETWEEN", 2, Some(2), fn_randbetween);
}

/// Results must be finite to be stored in a cell
pub(crate) fn checked(n: f64) -> EvalResult<f64> {
    if n.is_finite() {
        Ok(n)
    } else {
        Err(CellError::Num)
    }
}

/// One-number function lifted over arrays and ranges
pub(crate) fn unary<F>(args: &[FormulaValue], ctx: &EvaluationContext, f: F) -> EvalResult<FormulaValue>
where
    F: Fn(f64) -> EvalResult<f64>,
{
    Ok(map_number(arg(args, 0)?, ctx, |x| f(x).and_then(checked)))
}

/// Two-number function lifted over arrays and ranges; a missing second
/// argument takes `default`
fn binary<F>(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
    default: f64,
    f: F,
) -> EvalResult<FormulaValue>
where
    F: Fn(f64, f64) -> EvalResult<f64>,
{
    let first = arg(args, 0)?;
    match args.get(1) {
        Some(second) => Ok(zip_numbers(first, second, ctx, |x, y| f(x, y).and_then(checked))),
        None => Ok(map_number(first, ctx, |x| f(x, default).and_then(checked))),
    }
}

/// Round at a decimal digit through the shortest round-trip decimal form
///
/// Negative `digits` round to the left of the decimal point.
pub(crate) fn round_digits(x: f64, digits: i64, strategy: RoundingStrategy) -> f64 {
    if x == 0.0 || !x.is_finite() {
        return x;
    }
    if digits < 0 {
        let scale = 10f64.powi(digits.saturating_neg().min(308) as i32);
        return round_digits(x / scale, 0, strategy) * scale;
    }
    let dp = digits.min(28) as u32;
    if x.abs() < 1e-28 {
        return match strategy {
            RoundingStrategy::AwayFromZero => x.signum() * 10f64.powi(-(dp as i32)),
            _ => 0.0,
        };
    }
    match Decimal::from_str(&x.to_string()) {
        Ok(d) => d
            .round_dp_with_strategy(dp, strategy)
            .to_f64()
            .unwrap_or(x),
        Err(_) => x,
    }
}

/// Drop binary noise beyond 15 significant digits
fn tidy(n: f64) -> f64 {
    format!("{:.14e}", n).parse().unwrap_or(n)
}

/// Treat quotients within rounding noise of an integer as that integer
fn snap(q: f64) -> f64 {
    let r = q.round();
    if (q - r).abs() < 1e-12 * r.abs().max(1.0) {
        r
    } else {
        q
    }
}

/// SUM(number1, [number2], ...) - Adds its arguments
pub fn fn_sum(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx, NumberPolicy::NumbersOnly)?;
    Ok(FormulaValue::Number(numbers.iter().sum()))
}

/// PRODUCT(number1, [number2], ...) - Multiplies its arguments; 0 when nothing is numeric
pub fn fn_product(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx, NumberPolicy::NumbersOnly)?;
    if numbers.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    Ok(FormulaValue::Number(checked(numbers.iter().product())?))
}

/// SUMSQ(number1, ...) - Sum of squares
pub fn fn_sumsq(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx, NumberPolicy::NumbersOnly)?;
    Ok(FormulaValue::Number(numbers.iter().map(|n| n * n).sum()))
}

/// SUMPRODUCT(array1, [array2], ...) - Sum of element-wise products
///
/// All arrays must have the same shape. Non-numeric entries count as 0.
pub fn fn_sumproduct(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let arrays = args
        .iter()
        .map(|a| ctx.to_array(a))
        .collect::<EvalResult<Vec<_>>>()?;
    let Some(first) = arrays.first() else {
        return Err(CellError::Value);
    };
    let shape = (first.rows(), first.cols());
    if arrays.iter().any(|a| (a.rows(), a.cols()) != shape) {
        return Err(CellError::Value);
    }

    let mut total = 0.0;
    for i in 0..first.len() {
        let mut product = 1.0;
        for array in &arrays {
            match &array.values()[i] {
                FormulaValue::Number(n) => product *= n,
                FormulaValue::Error(e) => return Err(*e),
                _ => product = 0.0,
            }
        }
        total += product;
    }
    Ok(FormulaValue::Number(total))
}

fn sum_pairs<F>(args: &[FormulaValue], ctx: &EvaluationContext, f: F) -> EvalResult<FormulaValue>
where
    F: Fn(f64, f64) -> f64,
{
    let pairs = paired_numbers(arg(args, 0)?, arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Number(pairs.iter().map(|&(x, y)| f(x, y)).sum()))
}

/// SUMX2MY2(array_x, array_y) - Sum of x^2 - y^2
pub fn fn_sumx2my2(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    sum_pairs(args, ctx, |x, y| x * x - y * y)
}

/// SUMX2PY2(array_x, array_y) - Sum of x^2 + y^2
pub fn fn_sumx2py2(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    sum_pairs(args, ctx, |x, y| x * x + y * y)
}

/// SUMXMY2(array_x, array_y) - Sum of (x - y)^2
pub fn fn_sumxmy2(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    sum_pairs(args, ctx, |x, y| (x - y) * (x - y))
}

/// SUBTOTAL(function_num, ref1, ...) - Aggregate selected by code
///
/// Codes 1-11 pick AVERAGE, COUNT, COUNTA, MAX, MIN, PRODUCT, STDEV,
/// STDEVP, SUM, VAR, VARP. Adding 100 skips rows hidden in the grid.
pub fn fn_subtotal(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let code = integer(arg(args, 0)?, ctx)?;
    let skip_hidden = code > 100;
    let kind = if skip_hidden { code - 100 } else { code };
    if !(1..=11).contains(&kind) {
        return Err(CellError::Value);
    }
    let refs = &args[1..];

    if kind == 3 {
        let mut count = 0usize;
        for r in refs {
            ctx.visit(r, skip_hidden, |v| {
                if !v.is_empty() {
                    count += 1;
                }
                Ok(())
            })?;
        }
        return Ok(FormulaValue::Number(count as f64));
    }

    let numbers = collect_numbers_filtered(refs, ctx, NumberPolicy::NumbersOnly, skip_hidden)?;
    let n = match kind {
        1 => mean(&numbers)?,
        2 => numbers.len() as f64,
        4 => numbers.iter().copied().reduce(f64::max).unwrap_or(0.0),
        5 => numbers.iter().copied().reduce(f64::min).unwrap_or(0.0),
        6 if numbers.is_empty() => 0.0,
        6 => checked(numbers.iter().product())?,
        7 => variance(&numbers, true)?.sqrt(),
        8 => variance(&numbers, false)?.sqrt(),
        9 => numbers.iter().sum(),
        10 => variance(&numbers, true)?,
        _ => variance(&numbers, false)?,
    };
    Ok(FormulaValue::Number(n))
}

/// ROUND(number, num_digits) - Round half away from zero
pub fn fn_round(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |x, d| {
        Ok(round_digits(x, d.trunc() as i64, RoundingStrategy::MidpointAwayFromZero))
    })
}

/// ROUNDUP(number, num_digits) - Round away from zero
pub fn fn_roundup(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |x, d| {
        Ok(round_digits(x, d.trunc() as i64, RoundingStrategy::AwayFromZero))
    })
}

/// ROUNDDOWN(number, num_digits) - Round toward zero
pub fn fn_rounddown(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |x, d| {
        Ok(round_digits(x, d.trunc() as i64, RoundingStrategy::ToZero))
    })
}

/// TRUNC(number, [num_digits]) - Truncates toward zero
pub fn fn_trunc(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |x, d| {
        Ok(round_digits(x, d.trunc() as i64, RoundingStrategy::ToZero))
    })
}

/// INT(number) - Rounds down toward negative infinity
pub fn fn_int(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.floor()))
}

/// EVEN(number) - Rounds away from zero to the next even integer
pub fn fn_even(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.signum() * (snap(x.abs() / 2.0).ceil() * 2.0)))
}

/// ODD(number) - Rounds away from zero to the next odd integer
pub fn fn_odd(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        let mut n = snap(x.abs()).ceil();
        if n % 2.0 == 0.0 {
            n += 1.0;
        }
        Ok(if x < 0.0 { -n } else { n })
    })
}

/// CEILING(number, significance) - Round up to a multiple of significance
///
/// Opposite signs are `#NUM!`; a negative number with a negative
/// significance rounds away from zero.
pub fn fn_ceiling(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, |x, sig| {
        if x == 0.0 || sig == 0.0 {
            return Ok(0.0);
        }
        if (x > 0.0) != (sig > 0.0) {
            return Err(CellError::Num);
        }
        Ok(tidy(snap(x / sig).ceil() * sig))
    })
}

/// FLOOR(number, significance) - Round down to a multiple of significance
pub fn fn_floor(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, |x, sig| {
        if x == 0.0 {
            return Ok(0.0);
        }
        if sig == 0.0 {
            return Err(CellError::Div0);
        }
        if (x > 0.0) != (sig > 0.0) {
            return Err(CellError::Num);
        }
        Ok(tidy(snap(x / sig).floor() * sig))
    })
}

fn ceiling_math(x: f64, sig: f64, away_from_zero: bool) -> f64 {
    let sig = sig.abs();
    if sig == 0.0 || x == 0.0 {
        return 0.0;
    }
    let q = snap(x / sig);
    let steps = if x < 0.0 && away_from_zero {
        q.floor()
    } else {
        q.ceil()
    };
    tidy(steps * sig)
}

fn floor_math(x: f64, sig: f64, toward_zero: bool) -> f64 {
    let sig = sig.abs();
    if sig == 0.0 || x == 0.0 {
        return 0.0;
    }
    let q = snap(x / sig);
    let steps = if x < 0.0 && toward_zero {
        q.ceil()
    } else {
        q.floor()
    };
    tidy(steps * sig)
}

/// CEILING.MATH(number, [significance], [mode]) - Sign of significance ignored;
/// a non-zero mode rounds negative numbers away from zero
pub fn fn_ceiling_math(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mode = match args.get(2) {
        Some(m) => number(m, ctx)? != 0.0,
        None => false,
    };
    binary(args, ctx, 1.0, |x, sig| Ok(ceiling_math(x, sig, mode)))
}

/// FLOOR.MATH(number, [significance], [mode]) - A non-zero mode rounds
/// negative numbers toward zero
pub fn fn_floor_math(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mode = match args.get(2) {
        Some(m) => number(m, ctx)? != 0.0,
        None => false,
    };
    binary(args, ctx, 1.0, |x, sig| Ok(floor_math(x, sig, mode)))
}

/// CEILING.PRECISE(number, [significance]) - Always toward positive infinity
pub fn fn_ceiling_precise(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, |x, sig| Ok(ceiling_math(x, sig, false)))
}

/// FLOOR.PRECISE(number, [significance]) - Always toward negative infinity
pub fn fn_floor_precise(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, |x, sig| Ok(floor_math(x, sig, false)))
}

/// MROUND(number, multiple) - Round half away from zero to a multiple
pub fn fn_mround(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, |x, m| {
        if x == 0.0 || m == 0.0 {
            return Ok(0.0);
        }
        if (x > 0.0) != (m > 0.0) {
            return Err(CellError::Num);
        }
        let q = round_digits(x / m, 0, RoundingStrategy::MidpointAwayFromZero);
        Ok(tidy(q * m))
    })
}

/// Remainder with the sign of the divisor
pub(crate) fn excel_mod(n: f64, d: f64) -> EvalResult<f64> {
    if d == 0.0 {
        return Err(CellError::Div0);
    }
    let r = n - d * (n / d).floor();
    // a quotient rounded across an integer leaves r at d, or just past 0 on the wrong side
    if r == d || snap(r / d) == 1.0 || (r != 0.0 && r.signum() != d.signum()) {
        return Ok(0.0);
    }
    Ok(r)
}

/// MOD(number, divisor) - Remainder with the divisor's sign
pub fn fn_mod(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, excel_mod)
}

/// QUOTIENT(numerator, denominator) - Integer part of a division
pub fn fn_quotient(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, |n, d| {
        if d == 0.0 {
            return Err(CellError::Div0);
        }
        Ok((n / d).trunc())
    })
}

/// ABS(number) - Absolute value
pub fn fn_abs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.abs()))
}

/// SIGN(number) - 1, 0 or -1
pub fn fn_sign(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        Ok(if x > 0.0 {
            1.0
        } else if x < 0.0 {
            -1.0
        } else {
            0.0
        })
    })
}

/// SQRT(number) - `#NUM!` for negative numbers
pub fn fn_sqrt(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| if x < 0.0 { Err(CellError::Num) } else { Ok(x.sqrt()) })
}

/// SQRTPI(number) - Square root of number * pi
pub fn fn_sqrtpi(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x < 0.0 {
            Err(CellError::Num)
        } else {
            Ok((x * std::f64::consts::PI).sqrt())
        }
    })
}

/// POWER(number, power) - Same rules as the `^` operator
pub fn fn_power(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 1.0, power)
}

/// EXP(number) - e raised to a power
pub fn fn_exp(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.exp()))
}

/// LN(number) - Natural logarithm
pub fn fn_ln(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| if x <= 0.0 { Err(CellError::Num) } else { Ok(x.ln()) })
}

/// LOG(number, [base]) - Logarithm, base 10 by default
pub fn fn_log(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 10.0, |x, base| {
        if x <= 0.0 || base <= 0.0 {
            return Err(CellError::Num);
        }
        if base == 1.0 {
            return Err(CellError::Div0);
        }
        if base == 10.0 {
            return Ok(x.log10());
        }
        Ok(x.ln() / base.ln())
    })
}

/// LOG10(number) - Base-10 logarithm
pub fn fn_log10(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| if x <= 0.0 { Err(CellError::Num) } else { Ok(x.log10()) })
}

/// n! for a non-negative integer, saturating to infinity past 170
pub(crate) fn factorial(n: f64) -> f64 {
    if n > 170.0 {
        return f64::INFINITY;
    }
    (2..=n as u32).fold(1.0, |acc, k| acc * k as f64)
}

/// FACT(number) - Factorial of the truncated number
pub fn fn_fact(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x < 0.0 {
            return Err(CellError::Num);
        }
        Ok(factorial(x.trunc()))
    })
}

/// FACTDOUBLE(number) - n * (n-2) * (n-4) * ...
pub fn fn_factdouble(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x < 0.0 {
            return Err(CellError::Num);
        }
        let mut n = x.trunc();
        let mut result: f64 = 1.0;
        while n > 1.0 && result.is_finite() {
            result *= n;
            n -= 2.0;
        }
        Ok(result)
    })
}

/// Binomial coefficient for truncated non-negative arguments
pub(crate) fn combinations(n: f64, k: f64) -> EvalResult<f64> {
    let (n, k) = (n.trunc(), k.trunc());
    if n < 0.0 || k < 0.0 || k > n {
        return Err(CellError::Num);
    }
    let k = k.min(n - k);
    let mut result: f64 = 1.0;
    let mut i = 1.0;
    while i <= k {
        result = result * (n - k + i) / i;
        i += 1.0;
    }
    Ok(result.round())
}

/// COMBIN(number, number_chosen) - Combinations without repetition
pub fn fn_combin(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, combinations)
}

/// COMBINA(number, number_chosen) - Combinations with repetition
pub fn fn_combina(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |n, k| {
        let (n, k) = (n.trunc(), k.trunc());
        if n < 0.0 || k < 0.0 || (n == 0.0 && k > 0.0) {
            return Err(CellError::Num);
        }
        if n == 0.0 {
            return Ok(1.0);
        }
        combinations(n + k - 1.0, k)
    })
}

/// PERMUT(number, number_chosen) - Ordered selections
pub fn fn_permut(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |n, k| {
        let (n, k) = (n.trunc(), k.trunc());
        if n < 0.0 || k < 0.0 || k > n {
            return Err(CellError::Num);
        }
        let mut result: f64 = 1.0;
        let mut i = 0.0;
        while i < k {
            result *= n - i;
            i += 1.0;
        }
        Ok(result)
    })
}

/// MULTINOMIAL(number1, ...) - (a+b+...)! / (a! b! ...)
pub fn fn_multinomial(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let numbers = collect_numbers(args, ctx, NumberPolicy::NumbersOnly)?;
    let mut total = 0.0;
    let mut result: f64 = 1.0;
    for n in numbers {
        let n = n.trunc();
        if n < 0.0 {
            return Err(CellError::Num);
        }
        total += n;
        result *= combinations(total, n)?;
    }
    Ok(FormulaValue::Number(checked(result)?))
}

fn integer_operands(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<u64>> {
    collect_numbers(args, ctx, NumberPolicy::NumbersOnly)?
        .into_iter()
        .map(|n| {
            let n = n.trunc();
            if !(0.0..=9_007_199_254_740_992.0).contains(&n) {
                Err(CellError::Num)
            } else {
                Ok(n as u64)
            }
        })
        .collect()
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// GCD(number1, ...) - Greatest common divisor
pub fn fn_gcd(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = integer_operands(args, ctx)?;
    Ok(FormulaValue::Number(values.into_iter().fold(0, gcd) as f64))
}

/// LCM(number1, ...) - Least common multiple; any zero gives 0
pub fn fn_lcm(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = integer_operands(args, ctx)?;
    let mut lcm = 1.0f64;
    for v in values {
        if v == 0 {
            return Ok(FormulaValue::Number(0.0));
        }
        let l = lcm as u64;
        lcm = checked((l / gcd(l, v)) as f64 * v as f64)?;
    }
    Ok(FormulaValue::Number(lcm))
}

/// PI() - 3.14159265358979
pub fn fn_pi(_args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(std::f64::consts::PI))
}

pub fn fn_degrees(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.to_degrees()))
}

pub fn fn_radians(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.to_radians()))
}

pub fn fn_sin(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.sin()))
}

pub fn fn_cos(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.cos()))
}

pub fn fn_tan(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.tan()))
}

/// ASIN(number) - `#NUM!` outside [-1, 1]
pub fn fn_asin(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.asin()))
}

/// ACOS(number) - `#NUM!` outside [-1, 1]
pub fn fn_acos(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.acos()))
}

pub fn fn_atan(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.atan()))
}

/// ATAN2(x_num, y_num) - Angle of the point (x, y); the origin is `#DIV/0!`
pub fn fn_atan2(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    binary(args, ctx, 0.0, |x, y| {
        if x == 0.0 && y == 0.0 {
            return Err(CellError::Div0);
        }
        Ok(y.atan2(x))
    })
}

pub fn fn_sinh(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.sinh()))
}

pub fn fn_cosh(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.cosh()))
}

pub fn fn_tanh(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.tanh()))
}

pub fn fn_asinh(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(x.asinh()))
}

/// ACOSH(number) - `#NUM!` below 1
pub fn fn_acosh(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| if x < 1.0 { Err(CellError::Num) } else { Ok(x.acosh()) })
}

/// ATANH(number) - `#NUM!` unless strictly between -1 and 1
pub fn fn_atanh(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x.abs() >= 1.0 {
            Err(CellError::Num)
        } else {
            Ok(x.atanh())
        }
    })
}

fn reciprocal(x: f64) -> EvalResult<f64> {
    if x == 0.0 {
        Err(CellError::Div0)
    } else {
        Ok(1.0 / x)
    }
}

pub fn fn_cot(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| if x == 0.0 { Err(CellError::Div0) } else { reciprocal(x.tan()) })
}

pub fn fn_coth(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| reciprocal(x.tanh()))
}

pub fn fn_csc(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| reciprocal(x.sin()))
}

pub fn fn_csch(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| reciprocal(x.sinh()))
}

pub fn fn_sec(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| reciprocal(x.cos()))
}

pub fn fn_sech(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| reciprocal(x.cosh()))
}

pub fn fn_acot(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| Ok(std::f64::consts::FRAC_PI_2 - x.atan()))
}

/// ACOTH(number) - `#NUM!` unless |number| > 1
pub fn fn_acoth(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x.abs() <= 1.0 {
            Err(CellError::Num)
        } else {
            Ok(0.5 * ((x + 1.0) / (x - 1.0)).ln())
        }
    })
}

/// RAND() - Returns a random number between 0 and 1
/// This is a volatile function that returns a different value on each calculation.
pub fn fn_rand(_args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(rand::thread_rng().gen::<f64>()))
}

/// RANDBETWEEN(bottom, top) - Returns a random integer between bottom and top (inclusive)
pub fn fn_randbetween(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let bottom = number(arg(args, 0)?, ctx)?.ceil();
    let top = number(arg(args, 1)?, ctx)?.floor();
    if bottom > top {
        return Err(CellError::Num);
    }
    let n = rand::thread_rng().gen_range(bottom as i64..=top as i64);
    Ok(FormulaValue::Number(n as f64))
}
