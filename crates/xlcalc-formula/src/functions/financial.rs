//! Financial functions
//!
//! The annuity functions share one equation,
//! `pv * (1 + r)^n + pmt * (1 + r * type) * ((1 + r)^n - 1) / r + fv = 0`,
//! each isolating a different unknown. Rate solvers iterate with a bounded
//! Newton-Raphson loop.

use std::slice;

use tracing::debug;
use xlcalc_core::CellError;

use super::math::checked;
use super::FunctionRegistry;
use crate::coerce::{arg, collect_numbers, number, number_or, NumberPolicy};
use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

/// Iteration cap for the rate solvers
pub const MAX_ITERATIONS: usize = 100;

/// Step size at which a solver counts as converged
pub const EPSILON: f64 = 1e-10;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("PV", 3, Some(5), fn_pv);
    registry.add("FV", 3, Some(5), fn_fv);
    registry.add("PMT", 3, Some(5), fn_pmt);
    registry.add("NPER", 3, Some(5), fn_nper);
    registry.add("IPMT", 4, Some(6), fn_ipmt);
    registry.add("PPMT", 4, Some(6), fn_ppmt);
    registry.add("RATE", 3, Some(6), fn_rate);
    registry.add("NPV", 2, None, fn_npv);
    registry.add("XNPV", 3, Some(3), fn_xnpv);
    registry.add("IRR", 1, Some(2), fn_irr);
    registry.add("XIRR", 2, Some(3), fn_xirr);
    registry.add("MIRR", 3, Some(3), fn_mirr);
    registry.add("DOLLARDE", 2, Some(2), fn_dollarde);
    registry.add("DOLLARFR", 2, Some(2), fn_dollarfr);
    registry.add("EFFECT", 2, Some(2), fn_effect);
    registry.add("NOMINAL", 2, Some(2), fn_nominal);
    registry.add("SLN", 3, Some(3), fn_sln);
    registry.add("SYD", 4, Some(4), fn_syd);
    registry.add("DDB", 4, Some(5), fn_ddb);
}

/// Newton-Raphson from `guess`; `f` returns the value and derivative at a rate
///
/// Rates at or below -1, a vanishing derivative, or running out of
/// iterations give `#NUM!`.
fn newton<F>(function: &str, guess: f64, f: F) -> EvalResult<f64>
where
    F: Fn(f64) -> Option<(f64, f64)>,
{
    let mut rate = guess;
    for iteration in 0..MAX_ITERATIONS {
        let Some((value, slope)) = f(rate).filter(|(v, d)| v.is_finite() && d.is_finite() && *d != 0.0)
        else {
            debug!(function, iteration, rate, "solver hit a flat or undefined point");
            return Err(CellError::Num);
        };
        let next = rate - value / slope;
        if !next.is_finite() || next <= -1.0 {
            debug!(function, iteration, rate = next, "solver diverged");
            return Err(CellError::Num);
        }
        if (next - rate).abs() < EPSILON {
            return Ok(next);
        }
        rate = next;
    }
    debug!(function, guess, max = MAX_ITERATIONS, "solver did not converge");
    Err(CellError::Num)
}

/// Payment timing: 0 at period end, anything else at period start
fn payment_type(args: &[FormulaValue], index: usize, ctx: &EvaluationContext) -> EvalResult<f64> {
    Ok(if number_or(args, index, 0.0, ctx)? != 0.0 { 1.0 } else { 0.0 })
}

/// `(1 + rate)^nper` and `((1 + rate)^nper - 1) / rate`
fn growth(rate: f64, nper: f64) -> EvalResult<(f64, f64)> {
    let g = checked((1.0 + rate).powf(nper))?;
    Ok((g, (g - 1.0) / rate))
}

fn present_value(rate: f64, nper: f64, pmt: f64, fv: f64, kind: f64) -> EvalResult<f64> {
    if rate == 0.0 {
        return Ok(-(fv + pmt * nper));
    }
    let (g, annuity) = growth(rate, nper)?;
    if g == 0.0 {
        return Err(CellError::Div0);
    }
    Ok(-(fv + pmt * (1.0 + rate * kind) * annuity) / g)
}

fn future_value(rate: f64, nper: f64, pmt: f64, pv: f64, kind: f64) -> EvalResult<f64> {
    if rate == 0.0 {
        return Ok(-(pv + pmt * nper));
    }
    let (g, annuity) = growth(rate, nper)?;
    Ok(-(pv * g + pmt * (1.0 + rate * kind) * annuity))
}

fn payment(rate: f64, nper: f64, pv: f64, fv: f64, kind: f64) -> EvalResult<f64> {
    if nper == 0.0 {
        return Err(CellError::Num);
    }
    if rate == 0.0 {
        return Ok(-(pv + fv) / nper);
    }
    let (g, annuity) = growth(rate, nper)?;
    let factor = (1.0 + rate * kind) * annuity;
    if factor == 0.0 {
        return Err(CellError::Div0);
    }
    Ok(-(pv * g + fv) / factor)
}

fn periods(rate: f64, pmt: f64, pv: f64, fv: f64, kind: f64) -> EvalResult<f64> {
    if rate == 0.0 {
        if pmt == 0.0 {
            return Err(CellError::Num);
        }
        return Ok(-(pv + fv) / pmt);
    }
    if rate <= -1.0 {
        return Err(CellError::Num);
    }
    let a = pmt * (1.0 + rate * kind) / rate;
    if pv + a == 0.0 {
        return Err(CellError::Num);
    }
    let ratio = (a - fv) / (pv + a);
    if ratio <= 0.0 {
        return Err(CellError::Num);
    }
    checked(ratio.ln() / rate.ln_1p())
}

fn interest_payment(rate: f64, per: f64, nper: f64, pv: f64, fv: f64, kind: f64) -> EvalResult<f64> {
    if per < 1.0 || per > nper {
        return Err(CellError::Num);
    }
    if rate == 0.0 {
        return Ok(0.0);
    }
    let pmt = payment(rate, nper, pv, fv, kind)?;
    if kind == 1.0 {
        if per == 1.0 {
            return Ok(0.0);
        }
        let balance = future_value(rate, per - 1.0, pmt, pv, 1.0)?;
        Ok(balance * rate / (1.0 + rate))
    } else {
        Ok(future_value(rate, per - 1.0, pmt, pv, 0.0)? * rate)
    }
}

/// PV(rate, nper, pmt, [fv], [type]) - Present value of an annuity
pub fn fn_pv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    let nper = number(arg(args, 1)?, ctx)?;
    let pmt = number(arg(args, 2)?, ctx)?;
    let fv = number_or(args, 3, 0.0, ctx)?;
    let kind = payment_type(args, 4, ctx)?;
    Ok(FormulaValue::Number(checked(present_value(rate, nper, pmt, fv, kind)?)?))
}

/// FV(rate, nper, pmt, [pv], [type]) - Future value of an annuity
pub fn fn_fv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    let nper = number(arg(args, 1)?, ctx)?;
    let pmt = number(arg(args, 2)?, ctx)?;
    let pv = number_or(args, 3, 0.0, ctx)?;
    let kind = payment_type(args, 4, ctx)?;
    Ok(FormulaValue::Number(checked(future_value(rate, nper, pmt, pv, kind)?)?))
}

/// PMT(rate, nper, pv, [fv], [type]) - Periodic payment of an annuity
pub fn fn_pmt(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    let nper = number(arg(args, 1)?, ctx)?;
    let pv = number(arg(args, 2)?, ctx)?;
    let fv = number_or(args, 3, 0.0, ctx)?;
    let kind = payment_type(args, 4, ctx)?;
    Ok(FormulaValue::Number(checked(payment(rate, nper, pv, fv, kind)?)?))
}

/// NPER(rate, pmt, pv, [fv], [type]) - Number of periods of an annuity
pub fn fn_nper(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    let pmt = number(arg(args, 1)?, ctx)?;
    let pv = number(arg(args, 2)?, ctx)?;
    let fv = number_or(args, 3, 0.0, ctx)?;
    let kind = payment_type(args, 4, ctx)?;
    Ok(FormulaValue::Number(periods(rate, pmt, pv, fv, kind)?))
}

/// IPMT(rate, per, nper, pv, [fv], [type]) - Interest part of one payment
pub fn fn_ipmt(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    let per = number(arg(args, 1)?, ctx)?;
    let nper = number(arg(args, 2)?, ctx)?;
    let pv = number(arg(args, 3)?, ctx)?;
    let fv = number_or(args, 4, 0.0, ctx)?;
    let kind = payment_type(args, 5, ctx)?;
    Ok(FormulaValue::Number(checked(interest_payment(rate, per, nper, pv, fv, kind)?)?))
}

/// PPMT(rate, per, nper, pv, [fv], [type]) - Principal part of one payment
pub fn fn_ppmt(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    let per = number(arg(args, 1)?, ctx)?;
    let nper = number(arg(args, 2)?, ctx)?;
    let pv = number(arg(args, 3)?, ctx)?;
    let fv = number_or(args, 4, 0.0, ctx)?;
    let kind = payment_type(args, 5, ctx)?;
    let interest = interest_payment(rate, per, nper, pv, fv, kind)?;
    let pmt = payment(rate, nper, pv, fv, kind)?;
    Ok(FormulaValue::Number(checked(pmt - interest)?))
}

/// RATE(nper, pmt, pv, [fv], [type], [guess]) - Interest rate per period
pub fn fn_rate(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let nper = number(arg(args, 0)?, ctx)?;
    let pmt = number(arg(args, 1)?, ctx)?;
    let pv = number(arg(args, 2)?, ctx)?;
    let fv = number_or(args, 3, 0.0, ctx)?;
    let kind = payment_type(args, 4, ctx)?;
    let guess = number_or(args, 5, 0.1, ctx)?;
    if nper <= 0.0 || guess <= -1.0 {
        return Err(CellError::Num);
    }

    let rate = newton("RATE", guess, |r| {
        if r == 0.0 {
            let value = pv + pmt * nper + fv;
            let slope = nper * pv + pmt * (nper * (nper - 1.0) / 2.0 + kind * nper);
            return Some((value, slope));
        }
        let g = (1.0 + r).powf(nper);
        let annuity = (g - 1.0) / r;
        let value = pv * g + pmt * (1.0 + r * kind) * annuity + fv;
        let dg = nper * g / (1.0 + r);
        let dannuity = (dg * r - (g - 1.0)) / (r * r);
        let slope = pv * dg + pmt * (kind * annuity + (1.0 + r * kind) * dannuity);
        Some((value, slope))
    })?;
    Ok(FormulaValue::Number(rate))
}

/// NPV(rate, value1, ...) - Net present value of end-of-period cash flows
pub fn fn_npv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    if rate == -1.0 {
        return Err(CellError::Div0);
    }
    let flows = collect_numbers(&args[1..], ctx, NumberPolicy::NumbersOnly)?;
    let npv = flows
        .iter()
        .enumerate()
        .map(|(i, v)| v / (1.0 + rate).powi(i as i32 + 1))
        .sum();
    Ok(FormulaValue::Number(checked(npv)?))
}

/// Every value of an array argument as a number; blanks and text are `#VALUE!`
fn strict_numbers(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<Vec<f64>> {
    let array = ctx.to_array(value)?;
    array
        .values()
        .iter()
        .map(|v| match v {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Error(e) => Err(*e),
            _ => Err(CellError::Value),
        })
        .collect()
}

/// Cash flows paired with day offsets from the first date
fn dated_flows(
    values: &FormulaValue,
    dates: &FormulaValue,
    ctx: &EvaluationContext,
) -> EvalResult<Vec<(f64, f64)>> {
    let values = strict_numbers(values, ctx)?;
    let dates = strict_numbers(dates, ctx)?;
    if values.len() != dates.len() || values.is_empty() {
        return Err(CellError::Num);
    }
    let start = dates[0].trunc();
    values
        .into_iter()
        .zip(dates)
        .map(|(v, d)| {
            let days = d.trunc() - start;
            if d < 0.0 || days < 0.0 {
                Err(CellError::Num)
            } else {
                Ok((v, days / 365.0))
            }
        })
        .collect()
}

fn xnpv(rate: f64, flows: &[(f64, f64)]) -> f64 {
    flows.iter().map(|(v, t)| v / (1.0 + rate).powf(*t)).sum()
}

/// XNPV(rate, values, dates) - Net present value of dated cash flows
pub fn fn_xnpv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let rate = number(arg(args, 0)?, ctx)?;
    if rate <= -1.0 {
        return Err(CellError::Num);
    }
    let flows = dated_flows(arg(args, 1)?, arg(args, 2)?, ctx)?;
    Ok(FormulaValue::Number(checked(xnpv(rate, &flows))?))
}

fn has_sign_change(values: &[f64]) -> bool {
    values.iter().any(|v| *v > 0.0) && values.iter().any(|v| *v < 0.0)
}

/// IRR(values, [guess]) - Internal rate of return of periodic cash flows
pub fn fn_irr(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let flows = collect_numbers(slice::from_ref(arg(args, 0)?), ctx, NumberPolicy::NumbersOnly)?;
    let guess = number_or(args, 1, 0.1, ctx)?;
    if !has_sign_change(&flows) {
        return Err(CellError::Num);
    }
    let rate = newton("IRR", guess, |r| {
        let mut value = 0.0;
        let mut slope = 0.0;
        for (i, v) in flows.iter().enumerate() {
            let t = i as f64;
            value += v / (1.0 + r).powf(t);
            slope -= t * v / (1.0 + r).powf(t + 1.0);
        }
        Some((value, slope))
    })?;
    Ok(FormulaValue::Number(rate))
}

/// XIRR(values, dates, [guess]) - Internal rate of return of dated cash flows
pub fn fn_xirr(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let flows = dated_flows(arg(args, 0)?, arg(args, 1)?, ctx)?;
    let guess = number_or(args, 2, 0.1, ctx)?;
    let amounts: Vec<f64> = flows.iter().map(|(v, _)| *v).collect();
    if !has_sign_change(&amounts) {
        return Err(CellError::Num);
    }
    let rate = newton("XIRR", guess, |r| {
        let slope = flows
            .iter()
            .map(|(v, t)| -t * v / (1.0 + r).powf(t + 1.0))
            .sum();
        Some((xnpv(r, &flows), slope))
    })?;
    Ok(FormulaValue::Number(rate))
}

/// MIRR(values, finance_rate, reinvest_rate) - Modified internal rate of return
pub fn fn_mirr(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let flows = collect_numbers(slice::from_ref(arg(args, 0)?), ctx, NumberPolicy::NumbersOnly)?;
    let finance_rate = number(arg(args, 1)?, ctx)?;
    let reinvest_rate = number(arg(args, 2)?, ctx)?;
    let n = flows.len();
    if n < 2 {
        return Err(CellError::Div0);
    }

    let last = (n - 1) as f64;
    let mut negative = 0.0;
    let mut positive = 0.0;
    for (i, v) in flows.iter().enumerate() {
        let t = i as f64;
        if *v < 0.0 {
            negative += v / (1.0 + finance_rate).powf(t);
        } else {
            positive += v * (1.0 + reinvest_rate).powf(last - t);
        }
    }
    if negative == 0.0 {
        return Err(CellError::Div0);
    }
    let mirr = (positive / -negative).powf(1.0 / last) - 1.0;
    Ok(FormulaValue::Number(checked(mirr)?))
}

/// Decimal digits the fraction's denominator occupies
fn fraction_scale(fraction: f64) -> f64 {
    10f64.powf(fraction.log10().ceil())
}

fn fraction_denominator(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<f64> {
    let fraction = number(value, ctx)?.trunc();
    if fraction < 0.0 {
        return Err(CellError::Num);
    }
    if fraction == 0.0 {
        return Err(CellError::Div0);
    }
    Ok(fraction)
}

/// DOLLARDE(fractional_dollar, fraction) - Fractional price notation to decimal
pub fn fn_dollarde(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let dollar = number(arg(args, 0)?, ctx)?;
    let fraction = fraction_denominator(arg(args, 1)?, ctx)?;
    let whole = dollar.trunc();
    let result = whole + (dollar - whole) * fraction_scale(fraction) / fraction;
    Ok(FormulaValue::Number(checked(result)?))
}

/// DOLLARFR(decimal_dollar, fraction) - Decimal price to fractional notation
pub fn fn_dollarfr(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let dollar = number(arg(args, 0)?, ctx)?;
    let fraction = fraction_denominator(arg(args, 1)?, ctx)?;
    let whole = dollar.trunc();
    let result = whole + (dollar - whole) * fraction / fraction_scale(fraction);
    Ok(FormulaValue::Number(checked(result)?))
}

/// EFFECT(nominal_rate, npery) - Effective annual rate
pub fn fn_effect(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let nominal = number(arg(args, 0)?, ctx)?;
    let npery = number(arg(args, 1)?, ctx)?.trunc();
    if nominal <= 0.0 || npery < 1.0 {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number(checked((1.0 + nominal / npery).powf(npery) - 1.0)?))
}

/// NOMINAL(effect_rate, npery) - Nominal annual rate
pub fn fn_nominal(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let effect = number(arg(args, 0)?, ctx)?;
    let npery = number(arg(args, 1)?, ctx)?.trunc();
    if effect <= 0.0 || npery < 1.0 {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number(checked(npery * ((1.0 + effect).powf(1.0 / npery) - 1.0))?))
}

/// SLN(cost, salvage, life) - Straight-line depreciation
pub fn fn_sln(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let cost = number(arg(args, 0)?, ctx)?;
    let salvage = number(arg(args, 1)?, ctx)?;
    let life = number(arg(args, 2)?, ctx)?;
    if life == 0.0 {
        return Err(CellError::Div0);
    }
    Ok(FormulaValue::Number((cost - salvage) / life))
}

/// SYD(cost, salvage, life, per) - Sum-of-years' digits depreciation
pub fn fn_syd(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let cost = number(arg(args, 0)?, ctx)?;
    let salvage = number(arg(args, 1)?, ctx)?;
    let life = number(arg(args, 2)?, ctx)?;
    let per = number(arg(args, 3)?, ctx)?;
    if life <= 0.0 || per <= 0.0 || per > life {
        return Err(CellError::Num);
    }
    let depreciation = (cost - salvage) * (life - per + 1.0) * 2.0 / (life * (life + 1.0));
    Ok(FormulaValue::Number(depreciation))
}

/// DDB(cost, salvage, life, period, [factor]) - Declining-balance depreciation
///
/// The book value never drops below salvage.
pub fn fn_ddb(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let cost = number(arg(args, 0)?, ctx)?;
    let salvage = number(arg(args, 1)?, ctx)?;
    let life = number(arg(args, 2)?, ctx)?;
    let period = number(arg(args, 3)?, ctx)?;
    let factor = number_or(args, 4, 2.0, ctx)?;
    if cost < 0.0 || salvage < 0.0 || life <= 0.0 || factor <= 0.0 || period <= 0.0 || period > life
    {
        return Err(CellError::Num);
    }

    let rate = (factor / life).min(1.0);
    let mut book = cost;
    let mut depreciation = 0.0;
    for _ in 0..period.ceil() as u64 {
        depreciation = (book * rate).min((book - salvage).max(0.0));
        book -= depreciation;
    }
    Ok(FormulaValue::Number(depreciation))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{assert_close, call, number_grid};
    use pretty_assertions::assert_eq;

    fn nums(values: &[f64]) -> Vec<FormulaValue> {
        values.iter().map(|&n| FormulaValue::Number(n)).collect()
    }

    #[test]
    fn test_annuity_functions() {
        assert_close(&call("PMT", &nums(&[0.08 / 12.0, 10.0, 10000.0])), -1037.032089, 1e-6);
        assert_close(&call("PMT", &nums(&[0.08 / 12.0, 10.0, 10000.0, 0.0, 1.0])), -1030.164327, 1e-6);
        assert_close(&call("PV", &nums(&[0.08 / 12.0, 240.0, 500.0])), -59777.14585, 1e-5);
        assert_close(&call("FV", &nums(&[0.06 / 12.0, 10.0, -200.0, -500.0, 1.0])), 2581.403374, 1e-6);
        assert_close(&call("NPER", &nums(&[0.01, -100.0, -1000.0, 10000.0, 1.0])), 59.67386567, 1e-7);
        assert_close(&call("NPER", &nums(&[0.01, -100.0, 1000.0])), 10.58864446, 1e-7);
    }

    #[test]
    fn test_zero_rate_is_linear() {
        assert_eq!(call("PMT", &nums(&[0.0, 10.0, 1000.0])), FormulaValue::Number(-100.0));
        assert_eq!(call("PV", &nums(&[0.0, 10.0, -100.0])), FormulaValue::Number(1000.0));
        assert_eq!(call("FV", &nums(&[0.0, 10.0, -100.0, -50.0])), FormulaValue::Number(1050.0));
        assert_eq!(call("NPER", &nums(&[0.0, -100.0, 1000.0])), FormulaValue::Number(10.0));
        assert_eq!(call("PMT", &nums(&[0.05, 0.0, 1000.0])), CellError::Num.into());
    }

    #[test]
    fn test_payment_split() {
        assert_close(&call("IPMT", &nums(&[0.1 / 12.0, 1.0, 36.0, 8000.0])), -66.66666667, 1e-7);
        assert_close(&call("IPMT", &nums(&[0.1, 3.0, 3.0, 8000.0])), -292.4471299, 1e-6);
        assert_close(&call("PPMT", &nums(&[0.1 / 12.0, 1.0, 24.0, 2000.0])), -75.62318601, 1e-7);
        assert_eq!(call("IPMT", &nums(&[0.1, 4.0, 3.0, 8000.0])), CellError::Num.into());
        assert_eq!(call("IPMT", &nums(&[0.1, 1.0, 3.0, 8000.0, 0.0, 1.0])), FormulaValue::Number(0.0));
    }

    #[test]
    fn test_rate() {
        assert_close(&call("RATE", &nums(&[48.0, -200.0, 8000.0])), 0.007701472, 1e-9);
        assert_close(&call("RATE", &nums(&[10.0, 0.0, -100.0, 200.0])), 0.071773463, 1e-9);
        assert_eq!(call("RATE", &nums(&[0.0, -200.0, 8000.0])), CellError::Num.into());
    }

    #[test]
    fn test_npv() {
        assert_close(&call("NPV", &nums(&[0.1, -10000.0, 3000.0, 4200.0, 6800.0])), 1188.443412, 1e-6);
        let flows = FormulaValue::Array(crate::value::Array::row(vec![
            8000.0.into(),
            "skip".into(),
            9200.0.into(),
            10000.0.into(),
            12000.0.into(),
            14500.0.into(),
        ]));
        let npv = call("NPV", &[0.08.into(), flows]);
        assert_close(&npv, 41922.06155, 1e-5);
        assert_eq!(call("NPV", &nums(&[-1.0, 5.0])), CellError::Div0.into());
    }

    #[test]
    fn test_irr() {
        let flows = number_grid(&[&[-4000.0, 1200.0, 1410.0, 1875.0, 1050.0]]);
        assert_close(&call("IRR", &[flows]), 0.143, 1e-3);

        let flows = number_grid(&[&[-70000.0, 12000.0, 15000.0, 18000.0, 21000.0, 26000.0]]);
        assert_close(&call("IRR", &[flows.clone()]), 0.086630948, 1e-8);
        let flows = number_grid(&[&[-70000.0, 12000.0, 15000.0]]);
        assert_close(&call("IRR", &[flows, (-0.1).into()]), -0.443506941, 1e-8);

        let no_sign_change = number_grid(&[&[100.0, 200.0]]);
        assert_eq!(call("IRR", &[no_sign_change]), CellError::Num.into());
    }

    #[test]
    fn test_dated_cash_flows() {
        let values = number_grid(&[&[-10000.0, 2750.0, 4250.0, 3250.0, 2750.0]]);
        let dates = number_grid(&[&[39448.0, 39508.0, 39751.0, 39859.0, 39904.0]]);
        assert_close(&call("XNPV", &[0.09.into(), values.clone(), dates.clone()]), 2086.647602, 1e-6);
        assert_close(&call("XIRR", &[values.clone(), dates]), 0.373362535, 1e-8);

        let short = number_grid(&[&[39448.0, 39508.0]]);
        assert_eq!(call("XNPV", &[0.09.into(), values, short]), CellError::Num.into());
    }

    #[test]
    fn test_mirr() {
        let flows = number_grid(&[&[-120000.0, 39000.0, 30000.0, 21000.0, 37000.0, 46000.0]]);
        assert_close(&call("MIRR", &[flows, 0.1.into(), 0.12.into()]), 0.126094, 1e-6);
        let positive = number_grid(&[&[100.0, 200.0]]);
        assert_eq!(call("MIRR", &[positive, 0.1.into(), 0.12.into()]), CellError::Div0.into());
    }

    #[test]
    fn test_fractional_dollars() {
        assert_close(&call("DOLLARDE", &nums(&[1.02, 16.0])), 1.125, 1e-12);
        assert_close(&call("DOLLARDE", &nums(&[1.1, 32.0])), 1.3125, 1e-12);
        assert_close(&call("DOLLARFR", &nums(&[1.125, 16.0])), 1.02, 1e-12);
        assert_close(&call("DOLLARFR", &nums(&[1.125, 32.0])), 1.04, 1e-12);
        assert_eq!(call("DOLLARDE", &nums(&[1.02, 0.0])), CellError::Div0.into());
        assert_eq!(call("DOLLARDE", &nums(&[1.02, -1.0])), CellError::Num.into());
    }

    #[test]
    fn test_rate_conversion() {
        assert_close(&call("EFFECT", &nums(&[0.0525, 4.0])), 0.053542667, 1e-9);
        assert_close(&call("NOMINAL", &nums(&[0.053543, 4.0])), 0.052500319, 1e-9);
        assert_eq!(call("EFFECT", &nums(&[0.0525, 0.5])), CellError::Num.into());
    }

    #[test]
    fn test_depreciation() {
        assert_eq!(call("SLN", &nums(&[30000.0, 7500.0, 10.0])), FormulaValue::Number(2250.0));
        assert_close(&call("SYD", &nums(&[30000.0, 7500.0, 10.0, 1.0])), 4090.909091, 1e-6);
        assert_close(&call("SYD", &nums(&[30000.0, 7500.0, 10.0, 10.0])), 409.0909091, 1e-7);
        assert_close(&call("DDB", &nums(&[2400.0, 300.0, 3650.0, 1.0])), 1.315068493, 1e-9);
        assert_close(&call("DDB", &nums(&[2400.0, 300.0, 120.0, 1.0, 2.0])), 40.0, 1e-9);
        assert_close(&call("DDB", &nums(&[2400.0, 300.0, 10.0, 1.0, 2.0])), 480.0, 1e-9);
        assert_close(&call("DDB", &nums(&[2400.0, 300.0, 10.0, 2.0, 1.5])), 306.0, 1e-9);
        assert_close(&call("DDB", &nums(&[2400.0, 300.0, 10.0, 10.0])), 22.1225472, 1e-7);
        assert_eq!(call("DDB", &nums(&[2400.0, 300.0, 10.0, 11.0])), CellError::Num.into());
    }

    #[test]
    fn test_missing_cash_flows_are_value_errors() {
        let ctx = EvaluationContext::simple();
        assert_eq!(fn_irr(&[], &ctx), Err(CellError::Value));
        assert_eq!(fn_mirr(&[], &ctx), Err(CellError::Value));
    }
}
