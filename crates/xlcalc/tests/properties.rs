//! Property tests for function evaluation

use proptest::prelude::*;
use xlcalc::prelude::*;

fn eval(name: &str, args: &[FormulaValue]) -> FormulaValue {
    evaluate_function(name, args, &EvaluationContext::simple()).unwrap()
}

fn any_error() -> impl Strategy<Value = CellError> {
    prop::sample::select(CellError::ALL.to_vec())
}

fn row(values: &[f64]) -> FormulaValue {
    FormulaValue::Array(Array::row(values.iter().map(|n| FormulaValue::Number(*n)).collect()))
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(values in prop::collection::vec(-1e9f64..1e9, 1..20)) {
        for name in ["SUM", "AVERAGE", "MEDIAN", "STDEV.P", "MAX"] {
            let first = eval(name, &[row(&values)]);
            let second = eval(name, &[row(&values)]);
            prop_assert_eq!(first, second);
        }
    }

    #[test]
    fn errors_propagate_unchanged(error in any_error(), x in -1e6f64..1e6) {
        let e = FormulaValue::Error(error);
        prop_assert_eq!(eval("ABS", &[e.clone()]), e.clone());
        prop_assert_eq!(eval("ROUND", &[e.clone(), 2.0.into()]), e.clone());
        prop_assert_eq!(eval("SUM", &[x.into(), e.clone()]), e.clone());
        prop_assert_eq!(eval("UPPER", &[e.clone()]), e);
    }

    #[test]
    fn round_is_idempotent(x in -1e6f64..1e6, digits in 0i32..5) {
        let once = eval("ROUND", &[x.into(), f64::from(digits).into()]);
        let twice = eval("ROUND", &[once.clone(), f64::from(digits).into()]);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn mod_takes_the_sign_of_the_divisor(n in -1e6f64..1e6, d in prop_oneof![-1e3f64..-1e-3, 1e-3f64..1e3]) {
        match eval("MOD", &[n.into(), d.into()]) {
            FormulaValue::Number(r) => {
                prop_assert!(r == 0.0 || r.signum() == d.signum(), "MOD({}, {}) = {}", n, d, r);
                prop_assert!(r.abs() <= d.abs());
            }
            other => prop_assert!(false, "MOD({}, {}) gave {:?}", n, d, other),
        }
    }

    #[test]
    fn variances_are_never_negative(values in prop::collection::vec(-1e6f64..1e6, 2..30)) {
        for name in ["VAR", "VARP", "VAR.S", "VAR.P", "DEVSQ"] {
            match eval(name, &[row(&values)]) {
                FormulaValue::Number(v) => prop_assert!(v >= 0.0, "{} gave {}", name, v),
                other => prop_assert!(false, "{} gave {:?}", name, other),
            }
        }
    }
}
