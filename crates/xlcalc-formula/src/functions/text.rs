//! Text functions
//!
//! Positions and lengths count characters, not bytes.

use regex::RegexBuilder;
use rust_decimal::RoundingStrategy;
use xlcalc_core::{CellError, Locale};

use super::criteria::wildcard_source;
use super::date::parse_date_time;
use super::math::round_digits;
use super::number_format::{fixed, format_number, format_text};
use super::FunctionRegistry;
use crate::broadcast::map;
use crate::coerce::{arg, boolean, boolean_or, integer, integer_or, number, parse_number, text};
use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

/// Longest text a cell can hold
const MAX_TEXT_LEN: usize = 32_767;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("LEN", 1, Some(1), fn_len);
    registry.add("LEFT", 1, Some(2), fn_left);
    registry.add("RIGHT", 1, Some(2), fn_right);
    registry.add("MID", 3, Some(3), fn_mid);
    registry.add("LOWER", 1, Some(1), fn_lower);
    registry.add("UPPER", 1, Some(1), fn_upper);
    registry.add("PROPER", 1, Some(1), fn_proper);
    registry.add("TRIM", 1, Some(1), fn_trim);
    registry.add("CLEAN", 1, Some(1), fn_clean);
    registry.add("CONCAT", 1, None, fn_concat);
    registry.add("CONCATENATE", 1, None, fn_concatenate);
    registry.add("TEXTJOIN", 3, None, fn_textjoin);
    registry.add("EXACT", 2, Some(2), fn_exact);
    registry.add("FIND", 2, Some(3), fn_find);
    registry.add("SEARCH", 2, Some(3), fn_search);
    registry.add("SUBSTITUTE", 3, Some(4), fn_substitute);
    registry.add("REPLACE", 4, Some(4), fn_replace);
    registry.add("REPT", 2, Some(2), fn_rept);
    registry.add("CHAR", 1, Some(1), fn_char);
    registry.add("CODE", 1, Some(1), fn_code);
    registry.add("T", 1, Some(1), fn_t);
    registry.add("VALUE", 1, Some(1), fn_value);
    registry.add("NUMBERVALUE", 1, Some(3), fn_numbervalue);
    registry.add("TEXT", 2, Some(2), fn_text);
    registry.add("DOLLAR", 1, Some(2), fn_dollar);
    registry.add("FIXED", 1, Some(3), fn_fixed);
}

fn take_left(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

fn take_right(s: &str, n: usize) -> String {
    let len = s.chars().count();
    s.chars().skip(len.saturating_sub(n)).collect()
}

fn take_mid(s: &str, start: usize, n: usize) -> String {
    s.chars().skip(start).take(n).collect()
}

/// Byte offset of the character at `index`, or the end of the string
fn byte_offset(s: &str, index: usize) -> usize {
    s.char_indices().nth(index).map_or(s.len(), |(at, _)| at)
}

/// A count of characters; negative is `#VALUE!`
fn count_arg(args: &[FormulaValue], index: usize, default: i64, ctx: &EvaluationContext) -> EvalResult<usize> {
    let n = integer_or(args, index, default, ctx)?;
    usize::try_from(n).map_err(|_| CellError::Value)
}

fn limited(s: String) -> EvalResult<FormulaValue> {
    if s.chars().count() > MAX_TEXT_LEN {
        return Err(CellError::Value);
    }
    Ok(FormulaValue::String(s))
}

/// Apply a text transformation to a scalar, or to every cell of a grid
fn per_text<F>(args: &[FormulaValue], ctx: &EvaluationContext, f: F) -> EvalResult<FormulaValue>
where
    F: Fn(&str) -> FormulaValue,
{
    Ok(map(arg(args, 0)?, ctx, |v| Ok(f(&v.to_text()?))))
}

/// LEN(text)
pub fn fn_len(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    per_text(args, ctx, |s| FormulaValue::Number(s.chars().count() as f64))
}

/// LEFT(text, [num_chars])
pub fn fn_left(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let n = count_arg(args, 1, 1, ctx)?;
    Ok(FormulaValue::String(take_left(&s, n)))
}

/// RIGHT(text, [num_chars])
pub fn fn_right(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let n = count_arg(args, 1, 1, ctx)?;
    Ok(FormulaValue::String(take_right(&s, n)))
}

/// MID(text, start_num, num_chars)
pub fn fn_mid(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let start = integer(arg(args, 1)?, ctx)?;
    let n = count_arg(args, 2, 0, ctx)?;
    if start < 1 {
        return Err(CellError::Value);
    }
    Ok(FormulaValue::String(take_mid(&s, (start - 1) as usize, n)))
}

/// LOWER(text)
pub fn fn_lower(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    per_text(args, ctx, |s| FormulaValue::String(s.to_lowercase()))
}

/// UPPER(text)
pub fn fn_upper(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    per_text(args, ctx, |s| FormulaValue::String(s.to_uppercase()))
}

/// Capitalize every letter that follows a non-letter, lowercase the rest
fn proper(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut after_letter = false;
    for c in s.chars() {
        if after_letter {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        after_letter = c.is_alphabetic();
    }
    out
}

/// PROPER(text)
pub fn fn_proper(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    per_text(args, ctx, |s| FormulaValue::String(proper(s)))
}

/// TRIM(text) - Strip spaces and collapse inner runs to one
pub fn fn_trim(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    per_text(args, ctx, |s| {
        FormulaValue::String(s.split(' ').filter(|w| !w.is_empty()).collect::<Vec<_>>().join(" "))
    })
}

/// CLEAN(text) - Remove control characters 0-31
pub fn fn_clean(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    per_text(args, ctx, |s| {
        FormulaValue::String(s.chars().filter(|c| u32::from(*c) >= 32).collect())
    })
}

/// CONCAT(text1, ...) - Ranges contribute every cell
pub fn fn_concat(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut out = String::new();
    for value in args {
        ctx.visit(value, false, |v| {
            out.push_str(&v.to_text()?);
            Ok(())
        })?;
    }
    limited(out)
}

/// CONCATENATE(text1, ...) - Each argument is one value
pub fn fn_concatenate(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut out = String::new();
    for value in args {
        out.push_str(&text(value, ctx)?);
    }
    limited(out)
}

/// TEXTJOIN(delimiter, ignore_empty, text1, ...)
///
/// A range of delimiters is used in turn.
pub fn fn_textjoin(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut delimiters = Vec::new();
    ctx.visit(arg(args, 0)?, false, |v| {
        delimiters.push(v.to_text()?);
        Ok(())
    })?;
    let ignore_empty = boolean(arg(args, 1)?, ctx)?;

    let mut parts = Vec::new();
    for value in &args[2..] {
        ctx.visit(value, false, |v| {
            let s = v.to_text()?;
            if !(ignore_empty && s.is_empty()) {
                parts.push(s);
            }
            Ok(())
        })?;
    }

    let mut out = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 && !delimiters.is_empty() {
            out.push_str(&delimiters[(i - 1) % delimiters.len()]);
        }
        out.push_str(part);
    }
    limited(out)
}

/// EXACT(text1, text2) - Case-sensitive comparison
pub fn fn_exact(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let a = text(arg(args, 0)?, ctx)?;
    let b = text(arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Boolean(a == b))
}

/// Text to search, the needle and the 0-based character to start from
fn search_args(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<(String, String, usize)> {
    let needle = text(arg(args, 0)?, ctx)?;
    let within = text(arg(args, 1)?, ctx)?;
    let start = integer_or(args, 2, 1, ctx)?;
    if start < 1 || start as usize > within.chars().count() + 1 {
        return Err(CellError::Value);
    }
    Ok((needle, within, start as usize - 1))
}

/// 1-based character position of a match found at `byte` in `within`
fn position_of(within: &str, byte: usize) -> FormulaValue {
    FormulaValue::Number((within[..byte].chars().count() + 1) as f64)
}

/// FIND(find_text, within_text, [start_num]) - Case-sensitive, no wildcards
pub fn fn_find(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (needle, within, start) = search_args(args, ctx)?;
    let offset = byte_offset(&within, start);
    within[offset..]
        .find(&needle)
        .map(|at| position_of(&within, offset + at))
        .ok_or(CellError::Value)
}

/// SEARCH(find_text, within_text, [start_num]) - Case-insensitive, wildcards honoured
pub fn fn_search(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (needle, within, start) = search_args(args, ctx)?;
    let offset = byte_offset(&within, start);
    let pattern = RegexBuilder::new(&wildcard_source(&needle))
        .case_insensitive(true)
        .build()
        .map_err(|_| CellError::Value)?;
    pattern
        .find(&within[offset..])
        .map(|m| position_of(&within, offset + m.start()))
        .ok_or(CellError::Value)
}

/// SUBSTITUTE(text, old_text, new_text, [instance_num])
pub fn fn_substitute(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let old = text(arg(args, 1)?, ctx)?;
    let new = text(arg(args, 2)?, ctx)?;
    let instance = match args.get(3) {
        Some(v) => Some(integer(v, ctx)?),
        None => None,
    };
    if old.is_empty() {
        return Ok(FormulaValue::String(s));
    }

    let replaced = match instance {
        None => s.replace(&old, &new),
        Some(n) if n < 1 => return Err(CellError::Value),
        Some(n) => {
            let found = s.match_indices(&old).nth((n - 1) as usize).map(|(at, _)| at);
            match found {
                Some(at) => format!("{}{}{}", &s[..at], new, &s[at + old.len()..]),
                None => s,
            }
        }
    };
    limited(replaced)
}

/// REPLACE(old_text, start_num, num_chars, new_text)
pub fn fn_replace(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let start = integer(arg(args, 1)?, ctx)?;
    let n = count_arg(args, 2, 0, ctx)?;
    let new = text(arg(args, 3)?, ctx)?;
    if start < 1 {
        return Err(CellError::Value);
    }
    let start = (start - 1) as usize;
    let mut out = take_left(&s, start);
    out.push_str(&new);
    out.extend(s.chars().skip(start.saturating_add(n)));
    limited(out)
}

/// REPT(text, number_times)
pub fn fn_rept(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let times = count_arg(args, 1, 0, ctx)?;
    if s.chars().count().saturating_mul(times) > MAX_TEXT_LEN {
        return Err(CellError::Value);
    }
    Ok(FormulaValue::String(s.repeat(times)))
}

/// Characters of codes 128-159 in the Windows Latin-1 code page
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{0081}', '\u{201A}', '\u{0192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{02C6}', '\u{2030}', '\u{0160}', '\u{2039}', '\u{0152}', '\u{008D}', '\u{017D}', '\u{008F}',
    '\u{0090}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{02DC}', '\u{2122}', '\u{0161}', '\u{203A}', '\u{0153}', '\u{009D}', '\u{017E}', '\u{0178}',
];

fn char_of_code(code: i64) -> Option<char> {
    match code {
        1..=127 | 160..=255 => char::from_u32(code as u32),
        128..=159 => WINDOWS_1252_HIGH.get((code - 128) as usize).copied(),
        _ => None,
    }
}

fn code_of_char(c: char) -> i64 {
    let code = u32::from(c);
    match code {
        1..=127 | 160..=255 => i64::from(code),
        _ => WINDOWS_1252_HIGH
            .iter()
            .position(|&w| w == c)
            .map_or(63, |at| 128 + at as i64),
    }
}

/// CHAR(number) - Windows Latin-1 character of a code 1-255
pub fn fn_char(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(map(arg(args, 0)?, ctx, |v| {
        let code = v.to_number(ctx.locale())?.trunc() as i64;
        char_of_code(code)
            .map(|c| FormulaValue::String(c.to_string()))
            .ok_or(CellError::Value)
    }))
}

/// CODE(text) - Code of the first character; empty text is `#VALUE!`
pub fn fn_code(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(map(arg(args, 0)?, ctx, |v| {
        let s = v.to_text()?;
        let first = s.chars().next().ok_or(CellError::Value)?;
        Ok(FormulaValue::Number(code_of_char(first) as f64))
    }))
}

/// T(value) - Text as is, errors propagate, anything else empty text
pub fn fn_t(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    match ctx.scalar(arg(args, 0)?) {
        FormulaValue::String(s) => Ok(FormulaValue::String(s)),
        FormulaValue::Error(e) => Err(e),
        _ => Ok(FormulaValue::String(String::new())),
    }
}

/// VALUE(text) - Numbers, percentages, currency, dates and times
pub fn fn_value(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(map(arg(args, 0)?, ctx, |v| match v {
        FormulaValue::Number(n) => Ok(FormulaValue::Number(*n)),
        FormulaValue::Empty => Ok(FormulaValue::Number(0.0)),
        FormulaValue::Error(e) => Err(*e),
        FormulaValue::String(s) => parse_number(s, ctx.locale())
            .or_else(|| parse_date_time(s, ctx.date_1904()))
            .map(FormulaValue::Number)
            .ok_or(CellError::Value),
        _ => Err(CellError::Value),
    }))
}

/// First character of an optional separator argument
fn separator_arg(args: &[FormulaValue], index: usize, default: char, ctx: &EvaluationContext) -> EvalResult<char> {
    match args.get(index) {
        Some(v) => text(v, ctx)?.chars().next().ok_or(CellError::Value),
        None => Ok(default),
    }
}

/// NUMBERVALUE(text, [decimal_separator], [group_separator])
///
/// Separators default to the workbook locale. Spaces are ignored and
/// empty text is 0.
pub fn fn_numbervalue(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let s = text(arg(args, 0)?, ctx)?;
    let locale = ctx.locale();
    let decimal = separator_arg(args, 1, locale.decimal_separator, ctx)?;
    let group = separator_arg(args, 2, locale.group_separator, ctx)?;
    if decimal == group {
        return Err(CellError::Value);
    }

    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Ok(FormulaValue::Number(0.0));
    }
    let conventions = Locale::new(decimal, group, &locale.currency_symbol);
    parse_number(&compact, &conventions)
        .map(FormulaValue::Number)
        .ok_or(CellError::Value)
}

/// TEXT(value, format_text)
pub fn fn_text(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let format = text(arg(args, 1)?, ctx)?;
    Ok(map(arg(args, 0)?, ctx, |v| {
        let number = match v {
            FormulaValue::Number(n) => *n,
            FormulaValue::Empty => 0.0,
            FormulaValue::Error(e) => return Err(*e),
            FormulaValue::String(s) => match parse_number(s, ctx.locale()) {
                Some(n) => n,
                None => return Ok(FormulaValue::String(format_text(s, &format))),
            },
            other => return Ok(FormulaValue::String(other.to_text()?)),
        };
        format_number(number, &format, ctx.locale(), ctx.date_1904()).map(FormulaValue::String)
    }))
}

/// Places argument for DOLLAR and FIXED; above 127 is `#VALUE!`
fn decimals_arg(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<i64> {
    let decimals = integer_or(args, 1, 2, ctx)?;
    if decimals > 127 {
        return Err(CellError::Value);
    }
    Ok(decimals)
}

/// DOLLAR(number, [decimals]) - Currency text, negatives in parentheses
pub fn fn_dollar(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let n = number(arg(args, 0)?, ctx)?;
    let decimals = decimals_arg(args, ctx)?;
    let locale = ctx.locale();
    let body = fixed(n.abs(), decimals, true, locale);
    let negative = round_digits(n, decimals, RoundingStrategy::MidpointAwayFromZero) < 0.0;
    let s = if negative {
        format!("({}{})", locale.currency_symbol, body)
    } else {
        format!("{}{}", locale.currency_symbol, body)
    };
    Ok(FormulaValue::String(s))
}

/// FIXED(number, [decimals], [no_commas])
pub fn fn_fixed(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let n = number(arg(args, 0)?, ctx)?;
    let decimals = decimals_arg(args, ctx)?;
    let no_commas = boolean_or(args, 2, false, ctx)?;
    Ok(FormulaValue::String(fixed(n, decimals, !no_commas, ctx.locale())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{call, call_in};
    use crate::value::Array;
    use pretty_assertions::assert_eq;
    use xlcalc_core::Workbook;

    fn s(v: &str) -> FormulaValue {
        FormulaValue::String(v.to_string())
    }

    #[test]
    fn test_len_left_right_mid() {
        assert_eq!(call("LEN", &["héllo".into()]), 5.0.into());
        assert_eq!(call("LEN", &[12.5.into()]), 4.0.into());
        assert_eq!(call("LEFT", &["Sale Price".into(), 4.0.into()]), s("Sale"));
        assert_eq!(call("LEFT", &["Sweden".into()]), s("S"));
        assert_eq!(call("RIGHT", &["Sale Price".into(), 5.0.into()]), s("Price"));
        assert_eq!(call("RIGHT", &["abc".into(), 10.0.into()]), s("abc"));
        assert_eq!(call("MID", &["Fluid Flow".into(), 7.0.into(), 20.0.into()]), s("Flow"));
        assert_eq!(call("MID", &["Fluid Flow".into(), 20.0.into(), 5.0.into()]), s(""));
        assert_eq!(call("MID", &["abc".into(), 0.0.into(), 1.0.into()]), CellError::Value.into());
        assert_eq!(call("LEFT", &["abc".into(), (-1.0).into()]), CellError::Value.into());
    }

    #[test]
    fn test_case_and_cleanup() {
        assert_eq!(call("UPPER", &["total".into()]), s("TOTAL"));
        assert_eq!(call("LOWER", &["E. E. Cummings".into()]), s("e. e. cummings"));
        assert_eq!(call("PROPER", &["this is a TITLE".into()]), s("This Is A Title"));
        assert_eq!(call("PROPER", &["2-way street".into()]), s("2-Way Street"));
        assert_eq!(call("PROPER", &["76BudGet".into()]), s("76Budget"));
        assert_eq!(call("TRIM", &[" First Quarter   Earnings ".into()]), s("First Quarter Earnings"));
        assert_eq!(call("CLEAN", &["a\u{9}b\u{7}".into()]), s("ab"));
    }

    #[test]
    fn test_transformations_spill_over_arrays() {
        let words = FormulaValue::Array(Array::row(vec!["ab".into(), "cde".into()]));
        let expected = FormulaValue::Array(Array::row(vec![2.0.into(), 3.0.into()]));
        assert_eq!(call("LEN", &[words]), expected);
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(
            call("CONCATENATE", &["Stream population for ".into(), "trout".into(), " is ".into(), 32.0.into()]),
            s("Stream population for trout is 32")
        );
        assert_eq!(call("CONCAT", &[true.into(), 1.5.into()]), s("TRUE1.5"));
        assert_eq!(call("CONCAT", &["a".into(), CellError::Na.into()]), CellError::Na.into());
    }

    #[test]
    fn test_textjoin() {
        let words = FormulaValue::Array(Array::row(vec!["a".into(), "".into(), "b".into()]));
        assert_eq!(call("TEXTJOIN", &[", ".into(), true.into(), words.clone()]), s("a, b"));
        assert_eq!(call("TEXTJOIN", &["-".into(), false.into(), words]), s("a--b"));

        let delimiters = FormulaValue::Array(Array::row(vec!["+".into(), "=".into()]));
        assert_eq!(
            call("TEXTJOIN", &[delimiters, true.into(), 1.0.into(), 2.0.into(), 3.0.into()]),
            s("1+2=3")
        );
    }

    #[test]
    fn test_find_and_search() {
        assert_eq!(call("FIND", &["M".into(), "Miriam McGovern".into()]), 1.0.into());
        assert_eq!(call("FIND", &["m".into(), "Miriam McGovern".into()]), 6.0.into());
        assert_eq!(call("FIND", &["M".into(), "Miriam McGovern".into(), 3.0.into()]), 8.0.into());
        assert_eq!(call("FIND", &["z".into(), "abc".into()]), CellError::Value.into());
        assert_eq!(call("FIND", &["".into(), "abc".into(), 2.0.into()]), 2.0.into());
        assert_eq!(call("FIND", &["a".into(), "abc".into(), 5.0.into()]), CellError::Value.into());

        assert_eq!(call("SEARCH", &["e".into(), "Statements".into(), 6.0.into()]), 7.0.into());
        assert_eq!(call("SEARCH", &["MARGIN".into(), "Profit Margin".into()]), 8.0.into());
        assert_eq!(call("SEARCH", &["p?o".into(), "Profit".into()]), 1.0.into());
        assert_eq!(call("SEARCH", &["f*t".into(), "Profit".into()]), 4.0.into());
        assert_eq!(call("SEARCH", &["~?".into(), "why?".into()]), 4.0.into());
    }

    #[test]
    fn test_substitute_and_replace() {
        assert_eq!(
            call("SUBSTITUTE", &["Sales Data".into(), "Sales".into(), "Cost".into()]),
            s("Cost Data")
        );
        assert_eq!(
            call("SUBSTITUTE", &["Quarter 1, 2008".into(), "1".into(), "2".into(), 1.0.into()]),
            s("Quarter 2, 2008")
        );
        assert_eq!(
            call("SUBSTITUTE", &["Quarter 1, 2011".into(), "1".into(), "2".into(), 3.0.into()]),
            s("Quarter 1, 2012")
        );
        assert_eq!(
            call("SUBSTITUTE", &["abc".into(), "x".into(), "y".into(), 0.0.into()]),
            CellError::Value.into()
        );
        assert_eq!(
            call("REPLACE", &["abcdefghijk".into(), 6.0.into(), 5.0.into(), "*".into()]),
            s("abcde*k")
        );
        assert_eq!(call("REPLACE", &["2009".into(), 3.0.into(), 2.0.into(), "10".into()]), s("2010"));
        assert_eq!(call("REPT", &["*-".into(), 3.0.into()]), s("*-*-*-"));
        assert_eq!(call("REPT", &["x".into(), 40_000.0.into()]), CellError::Value.into());
    }

    #[test]
    fn test_char_and_code() {
        assert_eq!(call("CHAR", &[65.0.into()]), s("A"));
        assert_eq!(call("CHAR", &[128.0.into()]), s("€"));
        assert_eq!(call("CHAR", &[0.0.into()]), CellError::Value.into());
        assert_eq!(call("CHAR", &[256.0.into()]), CellError::Value.into());
        assert_eq!(call("CODE", &["Alphabet".into()]), 65.0.into());
        assert_eq!(call("CODE", &["€".into()]), 128.0.into());
        assert_eq!(call("CODE", &["".into()]), CellError::Value.into());
        assert_eq!(call("EXACT", &["word".into(), "Word".into()]), false.into());
        assert_eq!(call("EXACT", &["word".into(), "word".into()]), true.into());
    }

    #[test]
    fn test_t_and_value() {
        assert_eq!(call("T", &["Rainfall".into()]), s("Rainfall"));
        assert_eq!(call("T", &[19.0.into()]), s(""));
        assert_eq!(call("T", &[CellError::Ref.into()]), CellError::Ref.into());
        assert_eq!(call("VALUE", &["$1,000".into()]), 1000.0.into());
        assert_eq!(call("VALUE", &["12%".into()]), 0.12.into());
        assert_eq!(call("VALUE", &["abc".into()]), CellError::Value.into());
        assert_eq!(call("VALUE", &["2023-03-15".into()]), 45000.0.into());
        assert_eq!(call("VALUE", &["18:00".into()]), 0.75.into());
    }

    #[test]
    fn test_numbervalue() {
        assert_eq!(
            call("NUMBERVALUE", &["2.500,27".into(), ",".into(), ".".into()]),
            2500.27.into()
        );
        assert_eq!(call("NUMBERVALUE", &["3.5%".into()]), 0.035.into());
        assert_eq!(call("NUMBERVALUE", &["1 234".into()]), 1234.0.into());
        assert_eq!(call("NUMBERVALUE", &["".into()]), 0.0.into());
        assert_eq!(
            call("NUMBERVALUE", &["1,5".into(), ",".into(), ",".into()]),
            CellError::Value.into()
        );
    }

    #[test]
    fn test_text_function() {
        assert_eq!(call("TEXT", &[1234.567.into(), "$#,##0.00".into()]), s("$1,234.57"));
        assert_eq!(call("TEXT", &[0.285.into(), "0.0%".into()]), s("28.5%"));
        assert_eq!(call("TEXT", &[45000.0.into(), "yyyy-mm-dd".into()]), s("2023-03-15"));
        assert_eq!(call("TEXT", &["1234".into(), "#,##0".into()]), s("1,234"));
        assert_eq!(call("TEXT", &["abc".into(), "\"<\"@\">\"".into()]), s("<abc>"));
        assert_eq!(call("TEXT", &[true.into(), "0".into()]), s("TRUE"));
        assert_eq!(call("TEXT", &[CellError::Num.into(), "0".into()]), CellError::Num.into());
    }

    #[test]
    fn test_dollar_and_fixed() {
        assert_eq!(call("DOLLAR", &[1234.567.into()]), s("$1,234.57"));
        assert_eq!(call("DOLLAR", &[1234.567.into(), (-2.0).into()]), s("$1,200"));
        assert_eq!(call("DOLLAR", &[(-1234.567).into(), 4.0.into()]), s("($1,234.5670)"));
        assert_eq!(call("DOLLAR", &[(-0.0001).into(), 2.0.into()]), s("$0.00"));
        assert_eq!(call("FIXED", &[1234.567.into(), 1.0.into()]), s("1,234.6"));
        assert_eq!(call("FIXED", &[1234.567.into(), (-1.0).into()]), s("1,230"));
        assert_eq!(call("FIXED", &[(-1234.567).into(), (-1.0).into(), true.into()]), s("-1230"));
        assert_eq!(call("FIXED", &[44.332.into()]), s("44.33"));
        assert_eq!(call("FIXED", &[1.0.into(), 128.0.into()]), CellError::Value.into());
    }

    #[test]
    fn test_locale_aware_functions() {
        let mut wb = Workbook::new();
        wb.settings_mut().locale = Locale::de_de();
        let ctx = EvaluationContext::new(&wb, 0, 0, 0);

        assert_eq!(call_in("DOLLAR", &[1234.567.into()], &ctx), s("€1.234,57"));
        assert_eq!(call_in("FIXED", &[1234.567.into(), 1.0.into()], &ctx), s("1.234,6"));
        assert_eq!(call_in("TEXT", &[1234.5.into(), "#,##0.00".into()], &ctx), s("1.234,50"));
        assert_eq!(call_in("NUMBERVALUE", &["2.500,27".into()], &ctx), 2500.27.into());
        assert_eq!(call_in("VALUE", &["1,5".into()], &ctx), 1.5.into());
    }
}
