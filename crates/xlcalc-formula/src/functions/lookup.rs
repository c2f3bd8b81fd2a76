//! Lookup and reference functions

use std::cmp::Ordering;

use xlcalc_core::CellError;

use super::criteria::TextPattern;
use super::FunctionRegistry;
use crate::coerce::{arg, boolean_or, integer, integer_or};
use crate::context::EvaluationContext;
use crate::operators::compare_text;
use crate::value::{Array, EvalResult, FormulaValue, Reference};

static EMPTY: FormulaValue = FormulaValue::Empty;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("INDEX", 2, Some(4), fn_index);
    registry.add("MATCH", 2, Some(3), fn_match);
    registry.add("VLOOKUP", 3, Some(4), fn_vlookup);
    registry.add("HLOOKUP", 3, Some(4), fn_hlookup);
    registry.add("LOOKUP", 2, Some(3), fn_lookup);
    registry.add("CHOOSE", 2, None, fn_choose);
    registry.add("ROWS", 1, Some(1), fn_rows);
    registry.add("COLUMNS", 1, Some(1), fn_columns);
    registry.add("ROW", 0, Some(1), fn_row);
    registry.add("COLUMN", 0, Some(1), fn_column);
}

/// How a lookup compares candidates with the lookup value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchMode {
    /// First equal value; text keys may hold wildcards
    Exact,
    /// Largest value not above the key, candidates sorted ascending
    NotAbove,
    /// Smallest value not below the key, candidates sorted descending
    NotBelow,
}

/// Ordering of a candidate against the key; values of different types never compare
fn lookup_order(candidate: &FormulaValue, key: &FormulaValue) -> Option<Ordering> {
    match (candidate, key) {
        (FormulaValue::Number(a), FormulaValue::Number(b)) => a.partial_cmp(b),
        (FormulaValue::String(a), FormulaValue::String(b)) => Some(compare_text(a, b)),
        (FormulaValue::Boolean(a), FormulaValue::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// 0-based position of the matching candidate, or `#N/A`
fn find_position<'a, I>(candidates: I, key: &FormulaValue, mode: MatchMode) -> EvalResult<usize>
where
    I: IntoIterator<Item = &'a FormulaValue>,
{
    if let FormulaValue::Error(e) = key {
        return Err(*e);
    }

    let mut found = None;
    match mode {
        MatchMode::Exact => {
            let pattern = match key {
                FormulaValue::String(s) => Some(TextPattern::new(s)),
                _ => None,
            };
            found = candidates.into_iter().position(|candidate| match (candidate, &pattern) {
                (FormulaValue::String(text), Some(pattern)) => pattern.matches(text),
                _ => lookup_order(candidate, key) == Some(Ordering::Equal),
            });
        }
        MatchMode::NotAbove | MatchMode::NotBelow => {
            let past = if mode == MatchMode::NotAbove {
                Ordering::Greater
            } else {
                Ordering::Less
            };
            for (i, candidate) in candidates.into_iter().enumerate() {
                match lookup_order(candidate, key) {
                    Some(order) if order == past => break,
                    Some(_) => found = Some(i),
                    None => {}
                }
            }
        }
    }
    found.ok_or(CellError::Na)
}

/// Requested row and column of INDEX, 0 meaning the whole column or row
fn index_position(args: &[FormulaValue], rows: usize, cols: usize, ctx: &EvaluationContext) -> EvalResult<(usize, usize)> {
    let row = integer(arg(args, 1)?, ctx)?;
    let col = match args.get(2) {
        Some(v) => Some(integer(v, ctx)?),
        None => None,
    };
    if row < 0 || col.map_or(false, |c| c < 0) {
        return Err(CellError::Value);
    }
    let (row, col) = match col {
        Some(col) => (row as usize, col as usize),
        // A single row is indexed by the one number given
        None if rows == 1 && cols > 1 => (1, row as usize),
        None => (row as usize, 0),
    };
    if row > rows || col > cols {
        return Err(CellError::Ref);
    }
    Ok((row, col))
}

/// INDEX(array, row_num, [column_num], [area_num])
///
/// A reference yields a reference to the selected cell, row or column;
/// an array yields the value or a row/column slice.
pub fn fn_index(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    match arg(args, 0)? {
        FormulaValue::Reference(reference) => {
            let area_num = integer_or(args, 3, 1, ctx)?;
            if area_num < 1 {
                return Err(CellError::Value);
            }
            let area = reference
                .areas
                .get((area_num - 1) as usize)
                .ok_or(CellError::Ref)?;
            let (height, width) = (area.height(), area.width());
            let (row, col) = index_position(args, height as usize, width as usize, ctx)?;
            let (row, col) = (row as u32, col as u32);
            let selected = match (row, col) {
                (0, 0) => Some(*area),
                (0, c) => area.sub_range(0, c - 1, height, 1),
                (r, 0) => area.sub_range(r - 1, 0, 1, width),
                (r, c) => area.sub_range(r - 1, c - 1, 1, 1),
            }
            .ok_or(CellError::Ref)?;
            Ok(FormulaValue::Reference(Reference {
                sheet: reference.sheet.clone(),
                areas: vec![selected],
            }))
        }
        FormulaValue::Error(e) => Err(*e),
        value => {
            let grid = ctx.to_array(value)?;
            let (row, col) = index_position(args, grid.rows(), grid.cols(), ctx)?;
            let cell = |r: usize, c: usize| grid.get(r, c).cloned().unwrap_or(FormulaValue::Empty);
            let result = match (row, col) {
                (0, 0) => FormulaValue::Array(grid.as_ref().clone()),
                (0, c) => FormulaValue::Array(Array::column((0..grid.rows()).map(|r| cell(r, c - 1)).collect())),
                (r, 0) => FormulaValue::Array(Array::row((0..grid.cols()).map(|c| cell(r - 1, c)).collect())),
                (r, c) => cell(r - 1, c - 1),
            };
            Ok(match result {
                FormulaValue::Array(array) if array.is_single() => array.get(0, 0).cloned().unwrap_or(FormulaValue::Empty),
                other => other,
            })
        }
    }
}

/// A one-row or one-column grid as a list; anything wider is `#N/A`
fn vector(grid: &Array) -> EvalResult<&[FormulaValue]> {
    if grid.rows() == 1 || grid.cols() == 1 {
        Ok(grid.values())
    } else {
        Err(CellError::Na)
    }
}

/// MATCH(lookup_value, lookup_array, [match_type])
///
/// `match_type` 1 (default) finds the largest value not above the key in
/// ascending data, 0 the first exact match, -1 the smallest value not
/// below the key in descending data.
pub fn fn_match(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let key = ctx.scalar(arg(args, 0)?);
    let grid = ctx.to_array(arg(args, 1)?)?;
    let mode = match integer_or(args, 2, 1, ctx)? {
        0 => MatchMode::Exact,
        t if t > 0 => MatchMode::NotAbove,
        _ => MatchMode::NotBelow,
    };
    let position = find_position(vector(&grid)?, &key, mode)?;
    Ok(FormulaValue::Number((position + 1) as f64))
}

/// Shared body of VLOOKUP and HLOOKUP over a table laid out row-wise
fn table_lookup(args: &[FormulaValue], ctx: &EvaluationContext, table: &Array) -> EvalResult<FormulaValue> {
    let key = ctx.scalar(arg(args, 0)?);
    let index = integer(arg(args, 2)?, ctx)?;
    let approximate = boolean_or(args, 3, true, ctx)?;
    if index < 1 {
        return Err(CellError::Value);
    }
    if index as usize > table.cols() {
        return Err(CellError::Ref);
    }

    let mode = if approximate {
        MatchMode::NotAbove
    } else {
        MatchMode::Exact
    };
    let keys = table.iter_rows().map(|row| row.first().unwrap_or(&EMPTY));
    let row = find_position(keys, &key, mode)?;
    Ok(table
        .get(row, index as usize - 1)
        .cloned()
        .unwrap_or(FormulaValue::Empty))
}

/// VLOOKUP(lookup_value, table_array, col_index_num, [range_lookup])
pub fn fn_vlookup(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let table = ctx.to_array(arg(args, 1)?)?;
    table_lookup(args, ctx, &table)
}

/// HLOOKUP(lookup_value, table_array, row_index_num, [range_lookup])
pub fn fn_hlookup(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let table = ctx.to_array(arg(args, 1)?)?.transpose();
    table_lookup(args, ctx, &table)
}

/// LOOKUP(lookup_value, lookup_vector, [result_vector])
///
/// Without a result vector a wide array searches its first row and returns
/// from its last row; a tall array searches its first column and returns
/// from its last column.
pub fn fn_lookup(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let key = ctx.scalar(arg(args, 0)?);
    let grid = ctx.to_array(arg(args, 1)?)?;

    if let Some(result) = args.get(2) {
        let position = find_position(vector(&grid)?, &key, MatchMode::NotAbove)?;
        let result = ctx.to_array(result)?;
        return vector(&result)?
            .get(position)
            .cloned()
            .ok_or(CellError::Na);
    }

    let table = if grid.cols() > grid.rows() {
        grid.transpose()
    } else {
        grid.into_owned()
    };
    let keys = table.iter_rows().map(|row| row.first().unwrap_or(&EMPTY));
    let position = find_position(keys, &key, MatchMode::NotAbove)?;
    Ok(table
        .get(position, table.cols().saturating_sub(1))
        .cloned()
        .unwrap_or(FormulaValue::Empty))
}

/// CHOOSE(index_num, value1, ...) - The chosen argument as given, references included
pub fn fn_choose(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let index = integer(arg(args, 0)?, ctx)?;
    if index < 1 || index as usize >= args.len() {
        return Err(CellError::Value);
    }
    Ok(args[index as usize].clone())
}

/// Height and width of an argument; unions of areas are `#REF!`
fn dimensions(value: &FormulaValue) -> EvalResult<(usize, usize)> {
    match value {
        FormulaValue::Reference(reference) => {
            let area = reference.single_area().ok_or(CellError::Ref)?;
            Ok((area.height() as usize, area.width() as usize))
        }
        FormulaValue::Array(array) => Ok((array.rows(), array.cols())),
        FormulaValue::Error(e) => Err(*e),
        _ => Ok((1, 1)),
    }
}

/// ROWS(array)
pub fn fn_rows(args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (rows, _) = dimensions(arg(args, 0)?)?;
    Ok(FormulaValue::Number(rows as f64))
}

/// COLUMNS(array)
pub fn fn_columns(args: &[FormulaValue], _ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (_, cols) = dimensions(arg(args, 0)?)?;
    Ok(FormulaValue::Number(cols as f64))
}

/// ROW([reference]) - 1-based row; a taller reference gives a column of rows
pub fn fn_row(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let Some(value) = args.first() else {
        return Ok(FormulaValue::Number(f64::from(ctx.current_row) + 1.0));
    };
    match value {
        FormulaValue::Reference(reference) => {
            let area = reference.single_area().ok_or(CellError::Ref)?;
            let rows: Vec<FormulaValue> = (area.start.row..=area.end.row)
                .map(|r| FormulaValue::Number(f64::from(r) + 1.0))
                .collect();
            Ok(match rows.len() {
                1 => rows[0].clone(),
                _ => FormulaValue::Array(Array::column(rows)),
            })
        }
        FormulaValue::Error(e) => Err(*e),
        _ => Err(CellError::Value),
    }
}

/// COLUMN([reference]) - 1-based column; a wider reference gives a row of columns
pub fn fn_column(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let Some(value) = args.first() else {
        return Ok(FormulaValue::Number(f64::from(ctx.current_col) + 1.0));
    };
    match value {
        FormulaValue::Reference(reference) => {
            let area = reference.single_area().ok_or(CellError::Ref)?;
            let cols: Vec<FormulaValue> = (area.start.col..=area.end.col)
                .map(|c| FormulaValue::Number(f64::from(c) + 1.0))
                .collect();
            Ok(match cols.len() {
                1 => cols[0].clone(),
                _ => FormulaValue::Array(Array::row(cols)),
            })
        }
        FormulaValue::Error(e) => Err(*e),
        _ => Err(CellError::Value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{call, call_in, number_grid};
    use pretty_assertions::assert_eq;
    use xlcalc_core::Workbook;

    fn words(items: &[&str]) -> FormulaValue {
        FormulaValue::Array(Array::column(items.iter().map(|&s| s.into()).collect()))
    }

    /// A1:C5 holds a density / viscosity / temperature table
    fn density_table() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.worksheet_mut(0).unwrap();
        let rows = [
            [0.457, 3.55, 500.0],
            [0.525, 3.25, 400.0],
            [0.616, 2.93, 300.0],
            [0.675, 2.75, 250.0],
            [0.746, 2.57, 200.0],
        ];
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                sheet.set_cell_value_at(r as u32, c as u16, *value).unwrap();
            }
        }
        wb
    }

    #[test]
    fn test_vlookup_approximate_and_exact() {
        let wb = density_table();
        let ctx = EvaluationContext::new(&wb, 0, 9, 9);
        let table = FormulaValue::range("A1:C5");

        assert_eq!(call_in("VLOOKUP", &[1.0.into(), table.clone(), 2.0.into()], &ctx), 2.57.into());
        assert_eq!(call_in("VLOOKUP", &[0.7.into(), table.clone(), 3.0.into()], &ctx), 250.0.into());
        assert_eq!(
            call_in("VLOOKUP", &[0.7.into(), table.clone(), 3.0.into(), false.into()], &ctx),
            CellError::Na.into()
        );
        assert_eq!(call_in("VLOOKUP", &[0.1.into(), table.clone(), 2.0.into()], &ctx), CellError::Na.into());
        assert_eq!(call_in("VLOOKUP", &[2.0.into(), table.clone(), 2.0.into()], &ctx), 2.57.into());
        assert_eq!(call_in("VLOOKUP", &[0.525.into(), table.clone(), 4.0.into()], &ctx), CellError::Ref.into());
        assert_eq!(call_in("VLOOKUP", &[0.525.into(), table, 0.0.into()], &ctx), CellError::Value.into());
    }

    #[test]
    fn test_vlookup_text_keys() {
        let table = FormulaValue::Array(Array::from_rows(vec![
            vec!["Apple".into(), 1.0.into()],
            vec!["banana".into(), 2.0.into()],
            vec!["Cherry".into(), 3.0.into()],
        ]));
        assert_eq!(call("VLOOKUP", &["BANANA".into(), table.clone(), 2.0.into(), false.into()]), 2.0.into());
        assert_eq!(call("VLOOKUP", &["ch*".into(), table.clone(), 2.0.into(), false.into()]), 3.0.into());
        assert_eq!(call("VLOOKUP", &["Blueberry".into(), table, 2.0.into()]), 2.0.into());
    }

    #[test]
    fn test_hlookup() {
        let table = FormulaValue::Array(Array::from_rows(vec![
            vec!["Axles".into(), "Bearings".into(), "Bolts".into()],
            vec![4.0.into(), 4.0.into(), 9.0.into()],
            vec![5.0.into(), 7.0.into(), 10.0.into()],
            vec![6.0.into(), 8.0.into(), 11.0.into()],
        ]));
        assert_eq!(call("HLOOKUP", &["Axles".into(), table.clone(), 2.0.into(), true.into()]), 4.0.into());
        assert_eq!(call("HLOOKUP", &["Bearings".into(), table.clone(), 3.0.into(), false.into()]), 7.0.into());
        assert_eq!(call("HLOOKUP", &["B".into(), table.clone(), 3.0.into(), true.into()]), 5.0.into());
        assert_eq!(call("HLOOKUP", &["Bolts".into(), table, 4.0.into()]), 11.0.into());
    }

    #[test]
    fn test_match_types() {
        let counts = number_grid(&[&[25.0], &[38.0], &[40.0], &[41.0]]);
        assert_eq!(call("MATCH", &[39.0.into(), counts.clone(), 1.0.into()]), 2.0.into());
        assert_eq!(call("MATCH", &[41.0.into(), counts.clone(), 0.0.into()]), 4.0.into());
        assert_eq!(call("MATCH", &[40.0.into(), counts.clone(), (-1.0).into()]), CellError::Na.into());
        assert_eq!(call("MATCH", &[10.0.into(), counts.clone()]), CellError::Na.into());
        assert_eq!(call("MATCH", &[100.0.into(), counts]), 4.0.into());

        let descending = number_grid(&[&[50.0, 40.0, 30.0, 20.0]]);
        assert_eq!(call("MATCH", &[35.0.into(), descending, (-1.0).into()]), 2.0.into());

        let names = words(&["Kiwi", "apple", "Pear"]);
        assert_eq!(call("MATCH", &["APPLE".into(), names.clone(), 0.0.into()]), 2.0.into());
        assert_eq!(call("MATCH", &["p*".into(), names.clone(), 0.0.into()]), 3.0.into());
        assert_eq!(call("MATCH", &[1.0.into(), names, 0.0.into()]), CellError::Na.into());

        let square = number_grid(&[&[1.0, 2.0], &[3.0, 4.0]]);
        assert_eq!(call("MATCH", &[1.0.into(), square, 0.0.into()]), CellError::Na.into());
    }

    #[test]
    fn test_match_skips_other_types() {
        let mixed = FormulaValue::Array(Array::row(vec![1.0.into(), "x".into(), 3.0.into(), true.into()]));
        assert_eq!(call("MATCH", &[2.0.into(), mixed.clone()]), 1.0.into());
        assert_eq!(call("MATCH", &[true.into(), mixed]), 4.0.into());
    }

    #[test]
    fn test_index_over_arrays() {
        let grid = FormulaValue::Array(Array::from_rows(vec![
            vec!["Apples".into(), "Lemons".into()],
            vec!["Bananas".into(), "Pears".into()],
        ]));
        assert_eq!(call("INDEX", &[grid.clone(), 2.0.into(), 2.0.into()]), "Pears".into());
        assert_eq!(call("INDEX", &[grid.clone(), 2.0.into(), 1.0.into()]), "Bananas".into());
        assert_eq!(
            call("INDEX", &[grid.clone(), 0.0.into(), 2.0.into()]),
            FormulaValue::Array(Array::column(vec!["Lemons".into(), "Pears".into()]))
        );
        assert_eq!(call("INDEX", &[grid.clone(), 3.0.into(), 1.0.into()]), CellError::Ref.into());
        assert_eq!(call("INDEX", &[grid, (-1.0).into(), 1.0.into()]), CellError::Value.into());

        let row = number_grid(&[&[10.0, 20.0, 30.0]]);
        assert_eq!(call("INDEX", &[row, 2.0.into()]), 20.0.into());
        let column = number_grid(&[&[10.0], &[20.0], &[30.0]]);
        assert_eq!(call("INDEX", &[column, 3.0.into()]), 30.0.into());
    }

    #[test]
    fn test_index_over_references() {
        let wb = density_table();
        let ctx = EvaluationContext::new(&wb, 0, 9, 9);

        let cell = call_in("INDEX", &[FormulaValue::range("A1:C5"), 3.0.into(), 2.0.into()], &ctx);
        assert_eq!(cell, FormulaValue::range("B3"));
        assert_eq!(ctx.scalar(&cell), 2.93.into());

        let row = call_in("INDEX", &[FormulaValue::range("A1:C5"), 2.0.into(), 0.0.into()], &ctx);
        assert_eq!(row, FormulaValue::range("A2:C2"));

        let union = FormulaValue::Reference(Reference::union(vec![
            xlcalc_core::CellRange::from_indices(0, 0, 1, 1),
            xlcalc_core::CellRange::from_indices(3, 0, 4, 1),
        ]));
        let second = call_in("INDEX", &[union.clone(), 1.0.into(), 1.0.into(), 2.0.into()], &ctx);
        assert_eq!(ctx.scalar(&second), 0.675.into());
        assert_eq!(
            call_in("INDEX", &[union, 1.0.into(), 1.0.into(), 3.0.into()], &ctx),
            CellError::Ref.into()
        );
    }

    #[test]
    fn test_lookup_forms() {
        let frequencies = number_grid(&[&[4.14], &[4.19], &[5.17], &[5.77], &[6.39]]);
        let colors = words(&["red", "orange", "yellow", "green", "blue"]);
        assert_eq!(call("LOOKUP", &[4.19.into(), frequencies.clone(), colors.clone()]), "orange".into());
        assert_eq!(call("LOOKUP", &[5.75.into(), frequencies.clone(), colors.clone()]), "yellow".into());
        assert_eq!(call("LOOKUP", &[7.66.into(), frequencies.clone(), colors.clone()]), "blue".into());
        assert_eq!(call("LOOKUP", &[0.0.into(), frequencies, colors]), CellError::Na.into());

        let wide = FormulaValue::Array(Array::from_rows(vec![
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            vec![1.0.into(), 2.0.into(), 3.0.into(), 4.0.into()],
        ]));
        assert_eq!(call("LOOKUP", &["c".into(), wide.clone()]), 3.0.into());
        assert_eq!(call("LOOKUP", &["bump".into(), wide]), 2.0.into());
    }

    #[test]
    fn test_choose() {
        let args: Vec<FormulaValue> = vec![2.0.into(), "1st".into(), "2nd".into(), "3rd".into()];
        assert_eq!(call("CHOOSE", &args), "2nd".into());
        assert_eq!(call("CHOOSE", &[3.9.into(), "a".into(), "b".into(), "c".into()]), "c".into());
        assert_eq!(call("CHOOSE", &[0.0.into(), "a".into()]), CellError::Value.into());
        assert_eq!(call("CHOOSE", &[2.0.into(), "a".into()]), CellError::Value.into());
        assert_eq!(
            call("CHOOSE", &[1.0.into(), FormulaValue::range("B2:B4")]),
            FormulaValue::range("B2:B4")
        );
    }

    #[test]
    fn test_dimensions() {
        assert_eq!(call("ROWS", &[FormulaValue::range("C1:E4")]), 4.0.into());
        assert_eq!(call("COLUMNS", &[FormulaValue::range("C1:E4")]), 3.0.into());
        assert_eq!(call("ROWS", &[number_grid(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]])]), 2.0.into());
        assert_eq!(call("COLUMNS", &[number_grid(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]])]), 3.0.into());
        assert_eq!(call("ROWS", &[7.0.into()]), 1.0.into());
    }

    #[test]
    fn test_row_and_column() {
        let wb = Workbook::new();
        let ctx = EvaluationContext::new(&wb, 0, 4, 2);
        assert_eq!(call_in("ROW", &[], &ctx), 5.0.into());
        assert_eq!(call_in("COLUMN", &[], &ctx), 3.0.into());
        assert_eq!(call("ROW", &[FormulaValue::range("C10")]), 10.0.into());
        assert_eq!(call("COLUMN", &[FormulaValue::range("D10")]), 4.0.into());
        assert_eq!(
            call("ROW", &[FormulaValue::range("A2:B4")]),
            FormulaValue::Array(Array::column(vec![2.0.into(), 3.0.into(), 4.0.into()]))
        );
        assert_eq!(
            call("COLUMN", &[FormulaValue::range("B1:C1")]),
            FormulaValue::Array(Array::row(vec![2.0.into(), 3.0.into()]))
        );
        assert_eq!(call("ROW", &[5.0.into()]), CellError::Value.into());
    }
}
