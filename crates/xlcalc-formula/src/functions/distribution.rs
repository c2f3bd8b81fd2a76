//! Probability distribution functions
//!
//! Continuous and discrete distributions come from `statrs`; parameters are
//! validated here first so invalid inputs surface as `#NUM!` instead of
//! reaching the library's constructors.

use statrs::distribution::{
    Binomial, Continuous, ContinuousCDF, Discrete, DiscreteCDF, Exp, Normal, Poisson, StudentsT,
};
use statrs::function::gamma::ln_gamma;
use xlcalc_core::CellError;

use super::math::{checked, unary};
use super::FunctionRegistry;
use crate::coerce::{arg, boolean, boolean_or, number};
use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("NORMDIST", 4, Some(4), fn_normdist);
    registry.add("NORM.DIST", 4, Some(4), fn_normdist);
    registry.add("NORMSDIST", 1, Some(1), fn_normsdist);
    registry.add("NORM.S.DIST", 1, Some(2), fn_normsdist);
    registry.add("NORMINV", 3, Some(3), fn_norminv);
    registry.add("NORM.INV", 3, Some(3), fn_norminv);
    registry.add("NORMSINV", 1, Some(1), fn_normsinv);
    registry.add("NORM.S.INV", 1, Some(1), fn_normsinv);
    registry.add("TDIST", 3, Some(3), fn_tdist);
    registry.add("T.DIST.2T", 2, Some(2), fn_t_dist_2t);
    registry.add("T.DIST.RT", 2, Some(2), fn_t_dist_rt);
    registry.add("POISSON", 3, Some(3), fn_poisson);
    registry.add("POISSON.DIST", 3, Some(3), fn_poisson);
    registry.add("EXPONDIST", 3, Some(3), fn_expondist);
    registry.add("EXPON.DIST", 3, Some(3), fn_expondist);
    registry.add("BINOMDIST", 4, Some(4), fn_binomdist);
    registry.add("BINOM.DIST", 4, Some(4), fn_binomdist);
    registry.add("BESSELJ", 2, Some(2), fn_besselj);
    registry.add("FISHER", 1, Some(1), fn_fisher);
    registry.add("FISHERINV", 1, Some(1), fn_fisherinv);
    registry.add("GAMMALN", 1, Some(1), fn_gammaln);
    registry.add("GAMMALN.PRECISE", 1, Some(1), fn_gammaln);
}

fn normal(mean: f64, sd: f64) -> EvalResult<Normal> {
    if sd <= 0.0 {
        return Err(CellError::Num);
    }
    Normal::new(mean, sd).map_err(|_| CellError::Num)
}

/// Probability strictly inside (0, 1), as the inverse functions require
fn open_probability(p: f64) -> EvalResult<f64> {
    if p > 0.0 && p < 1.0 {
        Ok(p)
    } else {
        Err(CellError::Num)
    }
}

/// Degrees of freedom truncated to an integer of at least 1
fn degrees_of_freedom(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<f64> {
    let df = number(value, ctx)?.trunc();
    if df < 1.0 {
        return Err(CellError::Num);
    }
    Ok(df)
}

fn students_t(df: f64) -> EvalResult<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|_| CellError::Num)
}

/// NORMDIST(x, mean, standard_dev, cumulative) - Normal distribution
pub fn fn_normdist(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let mean = number(arg(args, 1)?, ctx)?;
    let sd = number(arg(args, 2)?, ctx)?;
    let cumulative = boolean(arg(args, 3)?, ctx)?;
    let dist = normal(mean, sd)?;
    let p = if cumulative { dist.cdf(x) } else { dist.pdf(x) };
    Ok(FormulaValue::Number(checked(p)?))
}

/// NORMSDIST(z) - Standard normal cumulative distribution
///
/// NORM.S.DIST takes a second `cumulative` argument; the density is
/// returned when it is FALSE.
pub fn fn_normsdist(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let z = number(arg(args, 0)?, ctx)?;
    let cumulative = boolean_or(args, 1, true, ctx)?;
    let dist = normal(0.0, 1.0)?;
    let p = if cumulative { dist.cdf(z) } else { dist.pdf(z) };
    Ok(FormulaValue::Number(checked(p)?))
}

/// NORMINV(probability, mean, standard_dev) - Inverse of the normal CDF
pub fn fn_norminv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let p = open_probability(number(arg(args, 0)?, ctx)?)?;
    let mean = number(arg(args, 1)?, ctx)?;
    let sd = number(arg(args, 2)?, ctx)?;
    Ok(FormulaValue::Number(checked(normal(mean, sd)?.inverse_cdf(p))?))
}

/// NORMSINV(probability) - Inverse of the standard normal CDF
pub fn fn_normsinv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let p = open_probability(number(arg(args, 0)?, ctx)?)?;
    Ok(FormulaValue::Number(checked(normal(0.0, 1.0)?.inverse_cdf(p))?))
}

/// TDIST(x, degrees_freedom, tails) - Student's t tail probability
pub fn fn_tdist(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let df = degrees_of_freedom(arg(args, 1)?, ctx)?;
    let tails = number(arg(args, 2)?, ctx)?.trunc();
    if x < 0.0 || !(tails == 1.0 || tails == 2.0) {
        return Err(CellError::Num);
    }
    let p = tails * students_t(df)?.sf(x);
    Ok(FormulaValue::Number(checked(p)?))
}

/// T.DIST.2T(x, degrees_freedom) - Two-tailed t probability, x >= 0
pub fn fn_t_dist_2t(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let df = degrees_of_freedom(arg(args, 1)?, ctx)?;
    if x < 0.0 {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number(checked(2.0 * students_t(df)?.sf(x))?))
}

/// T.DIST.RT(x, degrees_freedom) - Right-tailed t probability
pub fn fn_t_dist_rt(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let df = degrees_of_freedom(arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Number(checked(students_t(df)?.sf(x))?))
}

/// POISSON(x, mean, cumulative) - Poisson probability of x events
pub fn fn_poisson(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?.trunc();
    let mean = number(arg(args, 1)?, ctx)?;
    let cumulative = boolean(arg(args, 2)?, ctx)?;
    if x < 0.0 || mean < 0.0 {
        return Err(CellError::Num);
    }
    if mean == 0.0 {
        // All mass sits on zero events
        let p = if cumulative || x == 0.0 { 1.0 } else { 0.0 };
        return Ok(FormulaValue::Number(p));
    }
    let dist = Poisson::new(mean).map_err(|_| CellError::Num)?;
    let k = x as u64;
    let p = if cumulative { dist.cdf(k) } else { dist.pmf(k) };
    Ok(FormulaValue::Number(checked(p)?))
}

/// EXPONDIST(x, lambda, cumulative) - Exponential distribution
pub fn fn_expondist(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let lambda = number(arg(args, 1)?, ctx)?;
    let cumulative = boolean(arg(args, 2)?, ctx)?;
    if x < 0.0 || lambda <= 0.0 {
        return Err(CellError::Num);
    }
    let dist = Exp::new(lambda).map_err(|_| CellError::Num)?;
    let p = if cumulative { dist.cdf(x) } else { dist.pdf(x) };
    Ok(FormulaValue::Number(checked(p)?))
}

/// BINOMDIST(number_s, trials, probability_s, cumulative) - Binomial distribution
pub fn fn_binomdist(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let successes = number(arg(args, 0)?, ctx)?.trunc();
    let trials = number(arg(args, 1)?, ctx)?.trunc();
    let p = number(arg(args, 2)?, ctx)?;
    let cumulative = boolean(arg(args, 3)?, ctx)?;
    if successes < 0.0 || successes > trials || !(0.0..=1.0).contains(&p) {
        return Err(CellError::Num);
    }
    let dist = Binomial::new(p, trials as u64).map_err(|_| CellError::Num)?;
    let k = successes as u64;
    let value = if cumulative { dist.cdf(k) } else { dist.pmf(k) };
    Ok(FormulaValue::Number(checked(value)?))
}

/// Bessel function of the first kind of integer order
///
/// Power series near the origin, Hankel's asymptotic expansion far from it.
fn bessel_j(x: f64, n: u32) -> f64 {
    if x < 0.0 {
        let value = bessel_j(-x, n);
        return if n % 2 == 0 { value } else { -value };
    }
    if x <= 20.0 + n as f64 {
        bessel_j_series(x, n)
    } else {
        bessel_j_asymptotic(x, n)
    }
}

fn bessel_j_series(x: f64, n: u32) -> f64 {
    let half = x / 2.0;
    let mut term = 1.0;
    for k in 1..=n {
        term *= half / k as f64;
    }
    let mut sum = term;
    let squared = half * half;
    for k in 1..500 {
        term *= -squared / (k as f64 * (k + n) as f64);
        sum += term;
        if term.abs() <= sum.abs() * 1e-17 {
            break;
        }
    }
    sum
}

fn bessel_j_asymptotic(x: f64, n: u32) -> f64 {
    let mu = 4.0 * (n as f64) * (n as f64);
    let eight_x = 8.0 * x;
    let (mut p, mut q) = (1.0, 0.0);
    let mut term = 1.0;
    let mut previous = f64::INFINITY;
    for k in 1..60u32 {
        let odd = (2 * k - 1) as f64;
        term *= (mu - odd * odd) / (k as f64 * eight_x);
        if term.abs() >= previous || term == 0.0 {
            break;
        }
        previous = term.abs();
        // Signs cycle +Q, -P, -Q, +P for k = 1, 2, 3, 4
        match k % 4 {
            1 => q += term,
            2 => p -= term,
            3 => q -= term,
            _ => p += term,
        }
    }
    let chi = x - (n as f64 / 2.0 + 0.25) * std::f64::consts::PI;
    (2.0 / (std::f64::consts::PI * x)).sqrt() * (p * chi.cos() - q * chi.sin())
}

/// BESSELJ(x, n) - Bessel function J of order n (truncated, n >= 0)
pub fn fn_besselj(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let x = number(arg(args, 0)?, ctx)?;
    let n = number(arg(args, 1)?, ctx)?.trunc();
    if n < 0.0 || n > f64::from(u16::MAX) {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number(checked(bessel_j(x, n as u32))?))
}

/// FISHER(x) - Fisher transformation, -1 < x < 1
pub fn fn_fisher(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x <= -1.0 || x >= 1.0 {
            return Err(CellError::Num);
        }
        Ok(0.5 * ((1.0 + x) / (1.0 - x)).ln())
    })
}

/// FISHERINV(y) - Inverse of the Fisher transformation
pub fn fn_fisherinv(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |y| Ok(y.tanh()))
}

/// GAMMALN(x) - Natural log of the gamma function, x > 0
pub fn fn_gammaln(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    unary(args, ctx, |x| {
        if x <= 0.0 {
            return Err(CellError::Num);
        }
        Ok(ln_gamma(x))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{assert_close, call};
    use crate::value::Array;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normal() {
        assert_close(&call("NORMSDIST", &[1.333333.into()]), 0.908788726, 1e-8);
        assert_close(&call("NORM.S.DIST", &[0.0.into(), false.into()]), 0.398942280, 1e-8);
        assert_close(
            &call("NORMDIST", &[42.0.into(), 40.0.into(), 1.5.into(), true.into()]),
            0.908788780,
            1e-8,
        );
        assert_close(
            &call("NORM.DIST", &[42.0.into(), 40.0.into(), 1.5.into(), false.into()]),
            0.109340050,
            1e-8,
        );
        assert_eq!(
            call("NORMDIST", &[42.0.into(), 40.0.into(), 0.0.into(), true.into()]),
            CellError::Num.into()
        );
    }

    #[test]
    fn test_normal_inverse() {
        assert_close(&call("NORMINV", &[0.908789.into(), 40.0.into(), 1.5.into()]), 42.000002, 1e-5);
        assert_close(&call("NORMSINV", &[0.908789.into()]), 1.3333347, 1e-6);
        assert_close(&call("NORM.S.INV", &[0.5.into()]), 0.0, 1e-12);
        assert_eq!(call("NORMSINV", &[0.0.into()]), CellError::Num.into());
        assert_eq!(call("NORMSINV", &[1.0.into()]), CellError::Num.into());
    }

    #[test]
    fn test_students_t() {
        let x = FormulaValue::Number(1.959999998);
        assert_close(&call("T.DIST.2T", &[x.clone(), 60.0.into()]), 0.054644930, 1e-8);
        assert_close(&call("T.DIST.RT", &[x.clone(), 60.0.into()]), 0.027322465, 1e-8);
        assert_close(&call("TDIST", &[x.clone(), 60.0.into(), 1.0.into()]), 0.027322465, 1e-8);
        assert_close(&call("TDIST", &[x.clone(), 60.0.into(), 2.0.into()]), 0.054644930, 1e-8);
        assert_eq!(call("TDIST", &[x.clone(), 60.0.into(), 3.0.into()]), CellError::Num.into());
        assert_eq!(call("TDIST", &[(-1.0).into(), 60.0.into(), 1.0.into()]), CellError::Num.into());
        assert_eq!(call("T.DIST.2T", &[x, 0.5.into()]), CellError::Num.into());
    }

    #[test]
    fn test_discrete() {
        assert_close(&call("POISSON", &[2.0.into(), 5.0.into(), false.into()]), 0.084224337, 1e-9);
        assert_close(&call("POISSON.DIST", &[2.0.into(), 5.0.into(), true.into()]), 0.124652019, 1e-9);
        assert_eq!(call("POISSON", &[0.0.into(), 0.0.into(), false.into()]), FormulaValue::Number(1.0));
        assert_eq!(call("POISSON", &[(-1.0).into(), 5.0.into(), false.into()]), CellError::Num.into());

        let args = [6.0.into(), 10.0.into(), 0.5.into(), false.into()];
        assert_close(&call("BINOMDIST", &args), 0.205078125, 1e-12);
        let args = [6.0.into(), 10.0.into(), 0.5.into(), true.into()];
        assert_close(&call("BINOM.DIST", &args), 0.828125, 1e-12);
        let args = [11.0.into(), 10.0.into(), 0.5.into(), true.into()];
        assert_eq!(call("BINOMDIST", &args), CellError::Num.into());
    }

    #[test]
    fn test_exponential() {
        assert_close(&call("EXPONDIST", &[0.2.into(), 10.0.into(), true.into()]), 0.864664717, 1e-9);
        assert_close(&call("EXPON.DIST", &[0.2.into(), 10.0.into(), false.into()]), 1.353352832, 1e-9);
        assert_eq!(call("EXPONDIST", &[0.2.into(), 0.0.into(), true.into()]), CellError::Num.into());
    }

    #[test]
    fn test_bessel() {
        assert_close(&call("BESSELJ", &[1.9.into(), 2.0.into()]), 0.329925728, 1e-8);
        assert_close(&call("BESSELJ", &[0.0.into(), 0.0.into()]), 1.0, 1e-15);
        assert_close(&call("BESSELJ", &[(-1.9).into(), 1.0.into()]), -0.581157072, 1e-8);
        // J0(50) from tables
        assert_close(&call("BESSELJ", &[50.0.into(), 0.0.into()]), 0.055812327669, 1e-9);
        assert_eq!(call("BESSELJ", &[1.0.into(), (-1.0).into()]), CellError::Num.into());
    }

    #[test]
    fn test_fisher_and_gamma() {
        assert_close(&call("FISHER", &[0.75.into()]), 0.972955075, 1e-9);
        assert_close(&call("FISHERINV", &[0.972955.into()]), 0.75, 1e-6);
        assert_eq!(call("FISHER", &[1.0.into()]), CellError::Num.into());
        assert_close(&call("GAMMALN", &[4.0.into()]), 6f64.ln(), 1e-12);
        assert_eq!(call("GAMMALN", &[0.0.into()]), CellError::Num.into());

        let spilled = call("FISHERINV", &[FormulaValue::Array(Array::row(vec![0.0.into(), 0.0.into()]))]);
        assert_eq!(spilled, FormulaValue::Array(Array::row(vec![0.0.into(), 0.0.into()])));
    }
}
