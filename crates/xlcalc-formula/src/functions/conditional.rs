//! Conditional aggregates: SUMIF, COUNTIF, AVERAGEIF and their multi-criteria forms
//!
//! A criteria range is paired cell by cell with the range being aggregated.
//! The single-criterion forms size the aggregate range from its top-left
//! cell to the shape of the criteria range; the `*IFS` forms require every
//! range to have the same shape.

use std::borrow::Cow;

use xlcalc_core::{CellError, CellRange, MAX_COLS, MAX_ROWS};

use super::criteria::Criterion;
use super::FunctionRegistry;
use crate::coerce::arg;
use crate::context::EvaluationContext;
use crate::value::{Array, EvalResult, FormulaValue, Reference};

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("SUMIF", 2, Some(3), fn_sumif);
    registry.add("SUMIFS", 3, None, fn_sumifs);
    registry.add("COUNTIF", 2, Some(2), fn_countif);
    registry.add("COUNTIFS", 2, None, fn_countifs);
    registry.add("AVERAGEIF", 2, Some(3), fn_averageif);
    registry.add("AVERAGEIFS", 3, None, fn_averageifs);
    registry.add("MAXIFS", 3, None, fn_maxifs);
    registry.add("MINIFS", 3, None, fn_minifs);
}

/// The aggregate range of SUMIF/AVERAGEIF, reshaped to `rows x cols`
///
/// A reference grows or shrinks from its top-left cell; an array keeps its
/// values and positions outside it read as blank.
fn sized_like<'v>(
    value: &'v FormulaValue,
    rows: usize,
    cols: usize,
    ctx: &EvaluationContext,
) -> EvalResult<Cow<'v, Array>> {
    let FormulaValue::Reference(reference) = value else {
        return ctx.to_array(value);
    };
    let area = reference.single_area().ok_or(CellError::Value)?;
    let end_row = (area.start.row as usize + rows.max(1) - 1).min(MAX_ROWS as usize - 1) as u32;
    let end_col = (area.start.col as usize + cols.max(1) - 1).min(MAX_COLS as usize - 1) as u16;
    let mut resized = Reference::new(CellRange::from_indices(
        area.start.row,
        area.start.col,
        end_row,
        end_col,
    ));
    resized.sheet = reference.sheet.clone();
    let resized = FormulaValue::Reference(resized);
    let grid = ctx.to_array(&resized)?.into_owned();
    Ok(Cow::Owned(grid))
}

/// Values of `target` whose position satisfies every criteria pair
///
/// `pairs` alternates criteria range and criterion. All ranges must match
/// the target's shape.
fn selected(
    target: &Array,
    pairs: &[FormulaValue],
    ctx: &EvaluationContext,
) -> EvalResult<Vec<FormulaValue>> {
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(CellError::Value);
    }

    let mut mask = vec![true; target.len()];
    for pair in pairs.chunks(2) {
        let range = ctx.to_array(&pair[0])?;
        if range.rows() != target.rows() || range.cols() != target.cols() {
            return Err(CellError::Value);
        }
        let criterion = Criterion::from_arg(&pair[1], ctx);
        for (keep, cell) in mask.iter_mut().zip(range.values()) {
            *keep = *keep && criterion.matches(cell);
        }
    }

    Ok(target
        .values()
        .iter()
        .zip(mask)
        .filter(|(_, keep)| *keep)
        .map(|(value, _)| value.clone())
        .collect())
}

/// Values of the aggregate range at positions where the single criterion matches
fn selected_single(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<Vec<FormulaValue>> {
    let range = ctx.to_array(arg(args, 0)?)?;
    let criterion = Criterion::from_arg(arg(args, 1)?, ctx);
    let target = match args.get(2) {
        Some(value) => sized_like(value, range.rows(), range.cols(), ctx)?,
        None => Cow::Borrowed(&*range),
    };

    let mut values = Vec::new();
    for row in 0..range.rows() {
        for col in 0..range.cols() {
            let matched = range.get(row, col).map_or(false, |cell| criterion.matches(cell));
            if matched {
                values.push(target.get(row, col).cloned().unwrap_or(FormulaValue::Empty));
            }
        }
    }
    Ok(values)
}

/// Numbers among the selected values; an error selected is returned
fn numbers(values: &[FormulaValue]) -> EvalResult<Vec<f64>> {
    let mut numbers = Vec::with_capacity(values.len());
    for value in values {
        match value {
            FormulaValue::Number(n) => numbers.push(*n),
            FormulaValue::Error(e) => return Err(*e),
            _ => {}
        }
    }
    Ok(numbers)
}

fn average(numbers: &[f64]) -> EvalResult<FormulaValue> {
    if numbers.is_empty() {
        return Err(CellError::Div0);
    }
    Ok(FormulaValue::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
}

/// SUMIF(range, criteria, [sum_range]) - Sum of the cells meeting a criterion
pub fn fn_sumif(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = selected_single(args, ctx)?;
    Ok(FormulaValue::Number(numbers(&values)?.iter().sum()))
}

/// SUMIFS(sum_range, criteria_range1, criteria1, ...) - Sum where all criteria hold
pub fn fn_sumifs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let target = ctx.to_array(arg(args, 0)?)?;
    let values = selected(&target, &args[1..], ctx)?;
    Ok(FormulaValue::Number(numbers(&values)?.iter().sum()))
}

/// COUNTIF(range, criteria) - Number of cells meeting a criterion
pub fn fn_countif(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let range = ctx.to_array(arg(args, 0)?)?;
    let criterion = Criterion::from_arg(arg(args, 1)?, ctx);
    let count = range.values().iter().filter(|cell| criterion.matches(cell)).count();
    Ok(FormulaValue::Number(count as f64))
}

/// COUNTIFS(criteria_range1, criteria1, ...) - Number of positions meeting all criteria
pub fn fn_countifs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let first = ctx.to_array(arg(args, 0)?)?;
    let count = selected(&first, args, ctx)?.len();
    Ok(FormulaValue::Number(count as f64))
}

/// AVERAGEIF(range, criteria, [average_range]) - Mean of the cells meeting a criterion
pub fn fn_averageif(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let values = selected_single(args, ctx)?;
    average(&numbers(&values)?)
}

/// AVERAGEIFS(average_range, criteria_range1, criteria1, ...)
pub fn fn_averageifs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let target = ctx.to_array(arg(args, 0)?)?;
    let values = selected(&target, &args[1..], ctx)?;
    average(&numbers(&values)?)
}

/// MAXIFS(max_range, criteria_range1, criteria1, ...) - 0 when nothing matches
pub fn fn_maxifs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let target = ctx.to_array(arg(args, 0)?)?;
    let values = numbers(&selected(&target, &args[1..], ctx)?)?;
    Ok(FormulaValue::Number(values.into_iter().reduce(f64::max).unwrap_or(0.0)))
}

/// MINIFS(min_range, criteria_range1, criteria1, ...) - 0 when nothing matches
pub fn fn_minifs(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let target = ctx.to_array(arg(args, 0)?)?;
    let values = numbers(&selected(&target, &args[1..], ctx)?)?;
    Ok(FormulaValue::Number(values.into_iter().reduce(f64::min).unwrap_or(0.0)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{assert_close, call, call_in, number_grid};
    use pretty_assertions::assert_eq;
    use xlcalc_core::Workbook;

    fn column(values: &[FormulaValue]) -> FormulaValue {
        FormulaValue::Array(Array::column(values.to_vec()))
    }

    fn regions() -> FormulaValue {
        column(&[
            "East".into(),
            "West".into(),
            "North".into(),
            "South (New Office)".into(),
            "Midwest".into(),
        ])
    }

    fn profits() -> FormulaValue {
        number_grid(&[&[45678.0], &[23789.0], &[-4789.0], &[0.0], &[9678.0]])
    }

    #[test]
    fn test_sumif_regions() {
        assert_eq!(call("SUMIF", &[regions(), "West".into(), profits()]), 23789.0.into());
        assert_eq!(call("SUMIF", &[regions(), "=*West".into(), profits()]), 33467.0.into());
        assert_eq!(call("SUMIF", &[regions(), "<>*West".into(), profits()]), 40889.0.into());
        assert_eq!(call("SUMIF", &[profits(), ">0".into()]), 79145.0.into());
        assert_eq!(call("SUMIF", &[profits(), "<0".into()]), (-4789.0).into());
    }

    #[test]
    fn test_countif_reads_numeric_text_in_the_workbook_locale() {
        let mut wb = Workbook::new();
        wb.settings_mut().locale = xlcalc_core::Locale::de_de();
        let ctx = EvaluationContext::new(&wb, 0, 0, 0);
        let comma = FormulaValue::Array(Array::row(vec!["1,5".into()]));
        let point = FormulaValue::Array(Array::row(vec!["1.5".into()]));

        assert_eq!(call_in("COUNTIF", &[comma.clone(), 1.5.into()], &ctx), 1.0.into());
        assert_eq!(call_in("COUNTIF", &[point.clone(), 1.5.into()], &ctx), 0.0.into());
        assert_eq!(call_in("COUNTIF", &[comma.clone(), "1,5".into()], &ctx), 1.0.into());
        assert_eq!(call_in("VALUE", &["1,5".into()], &ctx), 1.5.into());

        assert_eq!(call("COUNTIF", &[point, 1.5.into()]), 1.0.into());
        assert_eq!(call("COUNTIF", &[comma, 1.5.into()]), 0.0.into());
    }

    #[test]
    fn test_sumif_sum_range_from_sheet() {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        for (i, (name, amount)) in [("a", 1.0), ("b", 2.0), ("a", 4.0)].iter().enumerate() {
            sheet.set_cell_value_at(i as u32, 0, *name).unwrap();
            sheet.set_cell_value_at(i as u32, 1, *amount).unwrap();
        }
        let ctx = EvaluationContext::new(&wb, 0, 10, 5);
        let args = [FormulaValue::range("A1:A3"), "a".into(), FormulaValue::range("B1")];
        assert_eq!(call_in("SUMIF", &args, &ctx), 5.0.into());
        assert_eq!(call_in("COUNTIF", &[FormulaValue::range("A1:A3"), "A".into()], &ctx), 2.0.into());
    }

    #[test]
    fn test_sumif_errors() {
        let values = column(&[1.0.into(), CellError::Div0.into(), 3.0.into()]);
        assert_eq!(call("SUMIF", &[values.clone(), ">2".into()]), 3.0.into());
        assert_eq!(call("SUMIF", &[values, "<>3".into()]), CellError::Div0.into());
    }

    #[test]
    fn test_sumifs_all_criteria() {
        let amounts = number_grid(&[&[5.0], &[4.0], &[15.0], &[3.0], &[22.0], &[12.0], &[10.0], &[33.0]]);
        let fruit = column(&[
            "Apples".into(),
            "Apples".into(),
            "Artichokes".into(),
            "Artichokes".into(),
            "Bananas".into(),
            "Bananas".into(),
            "Carrots".into(),
            "Carrots".into(),
        ]);
        let staff = column(&[
            "Tom".into(),
            "Sarah".into(),
            "Tom".into(),
            "Sarah".into(),
            "Tom".into(),
            "Sarah".into(),
            "Tom".into(),
            "Sarah".into(),
        ]);
        let args = [amounts.clone(), fruit.clone(), "=A*".into(), staff.clone(), "Tom".into()];
        assert_eq!(call("SUMIFS", &args), 20.0.into());
        let args = [amounts.clone(), fruit.clone(), "<>Bananas".into(), staff.clone(), "Tom".into()];
        assert_eq!(call("SUMIFS", &args), 30.0.into());
        assert_eq!(call("COUNTIFS", &[fruit.clone(), "A*".into(), staff.clone(), "Sarah".into()]), 2.0.into());
        assert_eq!(call("MAXIFS", &[amounts.clone(), staff.clone(), "Sarah".into()]), 33.0.into());
        assert_eq!(call("MINIFS", &[amounts.clone(), staff.clone(), "Tom".into()]), 5.0.into());
        assert_eq!(call("MAXIFS", &[amounts.clone(), staff.clone(), "Nobody".into()]), 0.0.into());
        assert_close(&call("AVERAGEIFS", &[amounts.clone(), fruit.clone(), "Carrots".into()]), 21.5, 1e-12);

        let short = number_grid(&[&[1.0], &[2.0]]);
        assert_eq!(call("SUMIFS", &[amounts.clone(), short, ">0".into()]), CellError::Value.into());
        assert_eq!(call("SUMIFS", &[amounts, staff, "Tom".into(), fruit]), CellError::Value.into());
    }

    #[test]
    fn test_countif_forms() {
        let cells = column(&[
            "apples".into(),
            "oranges".into(),
            "peaches".into(),
            "apples".into(),
            FormulaValue::Empty,
            "".into(),
            32.0.into(),
            86.0.into(),
        ]);
        assert_eq!(call("COUNTIF", &[cells.clone(), "apples".into()]), 2.0.into());
        assert_eq!(call("COUNTIF", &[cells.clone(), "*es".into()]), 4.0.into());
        assert_eq!(call("COUNTIF", &[cells.clone(), "?????es".into()]), 2.0.into());
        assert_eq!(call("COUNTIF", &[cells.clone(), ">55".into()]), 1.0.into());
        assert_eq!(call("COUNTIF", &[cells.clone(), "<>apples".into()]), 6.0.into());
        assert_eq!(call("COUNTIF", &[cells.clone(), "".into()]), 2.0.into());
        assert_eq!(call("COUNTIF", &[cells, 32.0.into()]), 1.0.into());
    }

    #[test]
    fn test_averageif_zero_matches() {
        let values = number_grid(&[&[100000.0], &[200000.0], &[300000.0], &[400000.0]]);
        let commission = number_grid(&[&[7000.0], &[14000.0], &[21000.0], &[28000.0]]);
        assert_eq!(call("AVERAGEIF", &[commission.clone(), "<23000".into()]), 14000.0.into());
        assert_eq!(call("AVERAGEIF", &[values.clone(), "<95000".into()]), CellError::Div0.into());
        assert_eq!(
            call("AVERAGEIF", &[values, ">250000".into(), commission]),
            24500.0.into()
        );
    }
}
