//! Date/time functions
//!
//! Dates are serial numbers counting days from the workbook's epoch, with
//! the time of day as the fractional part.
//!
//! Notes:
//! - In the 1900 date system serial 1 is 1900-01-01 and serial 60 is the
//!   non-existent 1900-02-29, kept for compatibility with Lotus 1-2-3.
//! - In the 1904 date system serial 0 is 1904-01-01. Internally every
//!   serial is shifted onto the 1900 calendar, which is the same calendar
//!   from 1900-03-01 on.

use chrono::{Datelike, Local, NaiveDate, Timelike};
use lazy_regex::regex_captures;
use xlcalc_core::CellError;

use super::FunctionRegistry;
use crate::coerce::{arg, collect_numbers, number, number_or, parse_number, NumberPolicy};
use crate::context::EvaluationContext;
use crate::value::{EvalResult, FormulaValue};

/// 9999-12-31 in the 1900 date system
const MAX_SERIAL: i64 = 2_958_465;

/// 1904-01-01 in the 1900 date system
const OFFSET_1904: i64 = 1_462;

const SECONDS_PER_DAY: f64 = 86_400.0;

pub(crate) fn register(registry: &mut FunctionRegistry) {
    registry.add("DATE", 3, Some(3), fn_date);
    registry.add("TIME", 3, Some(3), fn_time);
    registry.add("YEAR", 1, Some(1), fn_year);
    registry.add("MONTH", 1, Some(1), fn_month);
    registry.add("DAY", 1, Some(1), fn_day);
    registry.add("HOUR", 1, Some(1), fn_hour);
    registry.add("MINUTE", 1, Some(1), fn_minute);
    registry.add("SECOND", 1, Some(1), fn_second);
    registry.add("WEEKDAY", 1, Some(2), fn_weekday);
    registry.add("WEEKNUM", 1, Some(2), fn_weeknum);
    registry.add("ISOWEEKNUM", 1, Some(1), fn_isoweeknum);
    registry.add("EDATE", 2, Some(2), fn_edate);
    registry.add("EOMONTH", 2, Some(2), fn_eomonth);
    registry.add("DAYS", 2, Some(2), fn_days);
    registry.add("DAYS360", 2, Some(3), fn_days360);
    registry.add("DATEVALUE", 1, Some(1), fn_datevalue);
    registry.add("TIMEVALUE", 1, Some(1), fn_timevalue);
    registry.add("NETWORKDAYS", 2, Some(3), fn_networkdays);
    registry.add("WORKDAY", 2, Some(3), fn_workday);
    registry.add("YEARFRAC", 2, Some(3), fn_yearfrac);
    registry.add_volatile("NOW", 0, Some(0), fn_now);
    registry.add_volatile("TODAY", 0, Some(0), fn_today);
}

/// Year, month and day on the spreadsheet calendar
///
/// Unlike `NaiveDate` this can hold 1900-02-29 and the day-0 date
/// 1900-01-00 that serial 0 displays as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CalendarDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

fn is_leap_year(year: i32) -> bool {
    year == 1900 || (year % 4 == 0 && (year % 100 != 0 || year % 400 == 0))
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

fn days_in_year(year: i32) -> i64 {
    if is_leap_year(year) {
        366
    } else {
        365
    }
}

fn epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 31)
}

/// Serial on the 1900 calendar of a workbook serial
fn to_1900(serial: i64, date_1904: bool) -> i64 {
    if date_1904 {
        serial.saturating_add(OFFSET_1904)
    } else {
        serial
    }
}

/// Workbook serial of a serial on the 1900 calendar; out of range is `#NUM!`
fn from_1900(serial: i64, date_1904: bool) -> EvalResult<i64> {
    let serial = if date_1904 { serial - OFFSET_1904 } else { serial };
    if serial < 0 || to_1900(serial, date_1904) > MAX_SERIAL {
        return Err(CellError::Num);
    }
    Ok(serial)
}

impl CalendarDate {
    /// Date of a serial on the 1900 calendar
    pub(crate) fn from_serial(serial: i64) -> EvalResult<Self> {
        match serial {
            s if !(0..=MAX_SERIAL).contains(&s) => Err(CellError::Num),
            0 => Ok(Self { year: 1900, month: 1, day: 0 }),
            60 => Ok(Self { year: 1900, month: 2, day: 29 }),
            s => {
                let shift = if s > 60 { s - 1 } else { s };
                let date = epoch()
                    .and_then(|e| e.checked_add_signed(chrono::Duration::days(shift)))
                    .ok_or(CellError::Num)?;
                Ok(Self {
                    year: date.year(),
                    month: date.month(),
                    day: date.day(),
                })
            }
        }
    }

    /// Serial on the 1900 calendar, normalising month and day overflow
    ///
    /// `month` and `day` may be zero, negative or past the end of the
    /// period; they roll into neighbouring months and years.
    pub(crate) fn serial_from_parts(year: i64, month: i64, day: i64) -> EvalResult<i64> {
        let months = year
            .checked_mul(12)
            .and_then(|m| m.checked_add(month))
            .and_then(|m| m.checked_sub(1))
            .ok_or(CellError::Num)?;
        let y = i32::try_from(months.div_euclid(12)).map_err(|_| CellError::Num)?;
        let m = months.rem_euclid(12) as u32 + 1;
        let first = NaiveDate::from_ymd_opt(y, m, 1).ok_or(CellError::Num)?;
        let mut start = (first - epoch().ok_or(CellError::Num)?).num_days();
        if start > 59 {
            start += 1;
        }
        let serial = start
            .checked_add(day)
            .and_then(|s| s.checked_sub(1))
            .ok_or(CellError::Num)?;
        if !(0..=MAX_SERIAL).contains(&serial) {
            return Err(CellError::Num);
        }
        Ok(serial)
    }

    fn serial(self) -> EvalResult<i64> {
        Self::serial_from_parts(self.year.into(), self.month.into(), self.day.into())
    }

    fn is_month_end(self) -> bool {
        self.day == days_in_month(self.year, self.month)
    }
}

/// Day of week with Sunday as 0, matching the serial calendar
fn day_of_week(serial: i64) -> i64 {
    (serial + 6).rem_euclid(7)
}

/// Calendar date and day of week (Sunday 0) of a whole workbook serial
pub(crate) fn calendar_of(serial: i64, date_1904: bool) -> EvalResult<(CalendarDate, i64)> {
    let serial = to_1900(serial, date_1904);
    Ok((CalendarDate::from_serial(serial)?, day_of_week(serial)))
}

/// Resolve a date argument to a serial on the 1900 calendar
///
/// Numbers are truncated to whole days; text goes through date parsing.
fn date_arg(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<i64> {
    let serial = serial_arg(value, ctx)?;
    if serial < 0.0 {
        return Err(CellError::Num);
    }
    let serial = to_1900(serial.floor() as i64, ctx.date_1904());
    if serial > MAX_SERIAL {
        return Err(CellError::Num);
    }
    Ok(serial)
}

/// A date or time argument as a workbook serial, keeping the time fraction
fn serial_arg(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<f64> {
    match ctx.scalar(value) {
        FormulaValue::String(s) => {
            if let Some(n) = parse_number(&s, ctx.locale()) {
                return Ok(n);
            }
            parse_date_time(&s, ctx.date_1904()).ok_or(CellError::Value)
        }
        other => other.to_number(ctx.locale()),
    }
}

fn date_result(serial_1900: i64, ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(from_1900(serial_1900, ctx.date_1904())? as f64))
}

/// DATE(year, month, day) - Serial number of a calendar date
///
/// Years 0-1899 are offset by 1900; month and day overflow roll over.
pub fn fn_date(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut year = number(arg(args, 0)?, ctx)?.trunc() as i64;
    let month = number(arg(args, 1)?, ctx)?.trunc() as i64;
    let day = number(arg(args, 2)?, ctx)?.trunc() as i64;

    if (0..1900).contains(&year) {
        year += 1900;
    }
    if !(0..=9999).contains(&year) {
        return Err(CellError::Num);
    }
    date_result(CalendarDate::serial_from_parts(year, month, day)?, ctx)
}

/// TIME(hour, minute, second) - Fraction of a day, wrapping past midnight
pub fn fn_time(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let hour = number(arg(args, 0)?, ctx)?.trunc();
    let minute = number(arg(args, 1)?, ctx)?.trunc();
    let second = number(arg(args, 2)?, ctx)?.trunc();
    if hour > 32767.0 || minute > 32767.0 || second > 32767.0 {
        return Err(CellError::Num);
    }
    let total = hour * 3600.0 + minute * 60.0 + second;
    if total < 0.0 {
        return Err(CellError::Num);
    }
    Ok(FormulaValue::Number((total % SECONDS_PER_DAY) / SECONDS_PER_DAY))
}

fn calendar_part(
    args: &[FormulaValue],
    ctx: &EvaluationContext,
    part: fn(CalendarDate) -> u32,
) -> EvalResult<FormulaValue> {
    let date = CalendarDate::from_serial(date_arg(arg(args, 0)?, ctx)?)?;
    Ok(FormulaValue::Number(part(date) as f64))
}

/// YEAR(serial_number)
pub fn fn_year(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let date = CalendarDate::from_serial(date_arg(arg(args, 0)?, ctx)?)?;
    Ok(FormulaValue::Number(date.year as f64))
}

/// MONTH(serial_number)
pub fn fn_month(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    calendar_part(args, ctx, |d| d.month)
}

/// DAY(serial_number)
pub fn fn_day(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    calendar_part(args, ctx, |d| d.day)
}

/// Hours, minutes and seconds of the time fraction, rounded at the millisecond
fn time_parts(value: &FormulaValue, ctx: &EvaluationContext) -> EvalResult<(i64, i64, i64)> {
    let serial = serial_arg(value, ctx)?;
    if serial < 0.0 {
        return Err(CellError::Num);
    }
    let millis = ((serial - serial.floor()) * SECONDS_PER_DAY * 1000.0).round() as i64;
    let seconds = (millis / 1000) % 86_400;
    Ok((seconds / 3600, seconds / 60 % 60, seconds % 60))
}

/// HOUR(serial_number)
pub fn fn_hour(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (h, _, _) = time_parts(arg(args, 0)?, ctx)?;
    Ok(FormulaValue::Number(h as f64))
}

/// MINUTE(serial_number)
pub fn fn_minute(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (_, m, _) = time_parts(arg(args, 0)?, ctx)?;
    Ok(FormulaValue::Number(m as f64))
}

/// SECOND(serial_number)
pub fn fn_second(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let (_, _, s) = time_parts(arg(args, 0)?, ctx)?;
    Ok(FormulaValue::Number(s as f64))
}

/// WEEKDAY(serial_number, [return_type])
///
/// Return types: 1 Sunday=1..Saturday=7, 2 Monday=1..Sunday=7,
/// 3 Monday=0..Sunday=6, 11-17 week starting Monday..Sunday numbered from 1.
pub fn fn_weekday(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let serial = date_arg(arg(args, 0)?, ctx)?;
    let return_type = number_or(args, 1, 1.0, ctx)?.trunc() as i64;
    let dow = day_of_week(serial);
    let value = match return_type {
        1 => dow + 1,
        2 => (dow + 6) % 7 + 1,
        3 => (dow + 6) % 7,
        11..=17 => {
            let first = (return_type - 10) % 7;
            (dow - first).rem_euclid(7) + 1
        }
        _ => return Err(CellError::Num),
    };
    Ok(FormulaValue::Number(value as f64))
}

/// ISO 8601 week of a serial on the 1900 calendar
fn iso_week(serial: i64) -> EvalResult<u32> {
    let date = CalendarDate::from_serial(serial)?;
    // 1900-01-00 and 1900-02-29 map onto their real neighbours
    let day = date.day.clamp(1, days_in_real_month(date));
    let real = NaiveDate::from_ymd_opt(date.year, date.month, day).ok_or(CellError::Num)?;
    Ok(real.iso_week().week())
}

fn days_in_real_month(date: CalendarDate) -> u32 {
    if date.year == 1900 && date.month == 2 {
        28
    } else {
        days_in_month(date.year, date.month)
    }
}

/// WEEKNUM(serial_number, [return_type])
///
/// The week holding January 1 is week 1; return types 1/17 start weeks on
/// Sunday, 2/11 on Monday, 12-16 on Tuesday..Saturday, 21 is the ISO week.
pub fn fn_weeknum(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let serial = date_arg(arg(args, 0)?, ctx)?;
    let return_type = number_or(args, 1, 1.0, ctx)?.trunc() as i64;
    let first_day = match return_type {
        1 | 17 => 0,
        2 | 11 => 1,
        12..=16 => return_type - 10,
        21 => return Ok(FormulaValue::Number(iso_week(serial)? as f64)),
        _ => return Err(CellError::Num),
    };
    let year = CalendarDate::from_serial(serial)?.year;
    let jan1 = CalendarDate::serial_from_parts(year.into(), 1, 1)?;
    let lead = (day_of_week(jan1) - first_day).rem_euclid(7);
    let week = (serial - jan1 + lead) / 7 + 1;
    Ok(FormulaValue::Number(week as f64))
}

/// ISOWEEKNUM(date) - ISO 8601 week number
pub fn fn_isoweeknum(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let serial = date_arg(arg(args, 0)?, ctx)?;
    Ok(FormulaValue::Number(iso_week(serial)? as f64))
}

/// Same day `months` later, clamped to the end of the target month
fn shift_months(serial: i64, months: i64, month_end: bool) -> EvalResult<i64> {
    let date = CalendarDate::from_serial(serial)?;
    let index = (i64::from(date.year) * 12 + i64::from(date.month) - 1)
        .checked_add(months)
        .ok_or(CellError::Num)?;
    let year = i32::try_from(index.div_euclid(12)).map_err(|_| CellError::Num)?;
    let month = index.rem_euclid(12) as u32 + 1;
    if !(1900..=9999).contains(&year) {
        return Err(CellError::Num);
    }
    let last = days_in_month(year, month);
    let day = if month_end { last } else { date.day.min(last) };
    CalendarDate { year, month, day }.serial()
}

/// EDATE(start_date, months) - Same day a number of months away
pub fn fn_edate(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let start = date_arg(arg(args, 0)?, ctx)?;
    let months = number(arg(args, 1)?, ctx)?.trunc() as i64;
    date_result(shift_months(start, months, false)?, ctx)
}

/// EOMONTH(start_date, months) - Last day of the month a number of months away
pub fn fn_eomonth(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let start = date_arg(arg(args, 0)?, ctx)?;
    let months = number(arg(args, 1)?, ctx)?.trunc() as i64;
    date_result(shift_months(start, months, true)?, ctx)
}

/// DAYS(end_date, start_date) - Whole days between two dates
pub fn fn_days(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let end = date_arg(arg(args, 0)?, ctx)?;
    let start = date_arg(arg(args, 1)?, ctx)?;
    Ok(FormulaValue::Number((end - start) as f64))
}

/// Day count between two dates on a 360-day year
///
/// The US method moves month-end start dates to the 30th and month-end
/// end dates to the 30th or the 1st of the next month. The European
/// method only moves the 31st to the 30th.
fn days_360(start: CalendarDate, end: CalendarDate, european: bool) -> i64 {
    let (sy, sm) = (i64::from(start.year), i64::from(start.month));
    let (mut ey, mut em) = (i64::from(end.year), i64::from(end.month));
    let mut sd = i64::from(start.day);
    let mut ed = i64::from(end.day);

    if european {
        sd = sd.min(30);
        ed = ed.min(30);
    } else {
        let start_eom = start.is_month_end();
        if start_eom {
            sd = 30;
        }
        if end.is_month_end() {
            if start_eom || sd >= 30 {
                ed = 30;
            } else {
                ed = 1;
                em += 1;
                if em > 12 {
                    em = 1;
                    ey += 1;
                }
            }
        }
    }
    (ey - sy) * 360 + (em - sm) * 30 + (ed - sd)
}

/// DAYS360(start_date, end_date, [method]) - Days on a 360-day calendar
pub fn fn_days360(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let start = CalendarDate::from_serial(date_arg(arg(args, 0)?, ctx)?)?;
    let end = CalendarDate::from_serial(date_arg(arg(args, 1)?, ctx)?)?;
    let european = match args.get(2) {
        Some(v) => ctx.scalar(v).to_bool()?,
        None => false,
    };
    Ok(FormulaValue::Number(days_360(start, end, european) as f64))
}

fn month_number(name: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
    ];
    let lower = name.to_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|m| lower.starts_with(m))
        .map(|i| i as u32 + 1)
}

fn full_year(text: &str) -> Option<i64> {
    let year: i64 = text.parse().ok()?;
    Some(match (text.len(), year) {
        (1 | 2, 0..=29) => 2000 + year,
        (1 | 2, _) => 1900 + year,
        _ => year,
    })
}

/// Serial on the 1900 calendar of date text such as `2008-08-22`,
/// `8/22/2008`, `22-Aug-2008` or `August 22, 2008`
fn parse_date(text: &str) -> Option<i64> {
    let (year, month, day) = if let Some((_, y, m, d)) =
        regex_captures!(r"^(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})$", text)
    {
        (y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
    } else if let Some((_, m, d, y)) = regex_captures!(r"^(\d{1,2})[-/](\d{1,2})[-/](\d{2,4})$", text) {
        (full_year(y)?, m.parse().ok()?, d.parse().ok()?)
    } else if let Some((_, d, m, y)) =
        regex_captures!(r"^(\d{1,2})[-\s]+([A-Za-z]+)[-\s,]+(\d{2,4})$", text)
    {
        (full_year(y)?, month_number(m)?, d.parse().ok()?)
    } else if let Some((_, m, d, y)) = regex_captures!(r"^([A-Za-z]+)\s+(\d{1,2}),?\s+(\d{2,4})$", text) {
        (full_year(y)?, month_number(m)?, d.parse().ok()?)
    } else {
        return None;
    };

    let month: u32 = month;
    let day: u32 = day;
    if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year as i32, month) {
        return None;
    }
    if !(1900..=9999).contains(&year) {
        return None;
    }
    CalendarDate::serial_from_parts(year, month.into(), day.into()).ok()
}

/// Fraction of a day of time text such as `18:45`, `6:45 PM` or `10:30:15.5`
fn parse_time(text: &str) -> Option<f64> {
    let (_, h, m, s, meridiem) = regex_captures!(
        r"^(\d{1,2}):(\d{1,2})(?::(\d{1,2}(?:\.\d+)?))?\s*([AaPp][Mm])?$",
        text
    )?;
    let mut hour: f64 = h.parse().ok()?;
    let minute: f64 = m.parse().ok()?;
    let second: f64 = if s.is_empty() { 0.0 } else { s.parse().ok()? };
    if minute >= 60.0 || second >= 60.0 {
        return None;
    }
    if meridiem.is_empty() {
        if hour >= 24.0 {
            return None;
        }
    } else {
        if hour == 0.0 || hour > 12.0 {
            return None;
        }
        hour %= 12.0;
        if meridiem.eq_ignore_ascii_case("pm") {
            hour += 12.0;
        }
    }
    Some((hour * 3600.0 + minute * 60.0 + second) / SECONDS_PER_DAY)
}

/// Split text into its date part and an optional trailing time part
fn split_date_time(text: &str) -> (&str, Option<&str>) {
    let text = text.trim();
    match regex_captures!(
        r"^(.*?)\s*(\d{1,2}:\d{1,2}(?::\d{1,2}(?:\.\d+)?)?\s*(?:[AaPp][Mm])?)$",
        text
    ) {
        Some((_, date, time)) => (date.trim_end_matches(|c: char| c == 'T' || c.is_whitespace()), Some(time)),
        None => (text, None),
    }
}

/// Workbook serial (date plus time fraction) of date and/or time text
pub(crate) fn parse_date_time(text: &str, date_1904: bool) -> Option<f64> {
    let (date_text, time_text) = split_date_time(text);
    let time = match time_text {
        Some(t) => parse_time(t)?,
        None => 0.0,
    };
    let date = if date_text.is_empty() {
        if time_text.is_none() {
            return None;
        }
        0.0
    } else {
        from_1900(parse_date(date_text)?, date_1904).ok()? as f64
    };
    Some(date + time)
}

/// DATEVALUE(date_text) - Serial number of date text, time part dropped
pub fn fn_datevalue(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let text = ctx.scalar(arg(args, 0)?).to_text()?;
    let (date_text, _) = split_date_time(&text);
    let serial = parse_date(date_text).ok_or(CellError::Value)?;
    date_result(serial, ctx)
}

/// TIMEVALUE(time_text) - Fraction of a day of time text, date part dropped
pub fn fn_timevalue(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let text = ctx.scalar(arg(args, 0)?).to_text()?;
    let (date_text, time_text) = split_date_time(&text);
    if !date_text.is_empty() && parse_date(date_text).is_none() {
        return Err(CellError::Value);
    }
    let time = time_text.and_then(parse_time).ok_or(CellError::Value)?;
    Ok(FormulaValue::Number(time))
}

fn is_weekend(serial: i64) -> bool {
    matches!(day_of_week(serial), 0 | 6)
}

/// Holiday serials on the 1900 calendar, sorted and deduplicated
fn holidays(args: &[FormulaValue], index: usize, ctx: &EvaluationContext) -> EvalResult<Vec<i64>> {
    let Some(value) = args.get(index) else {
        return Ok(Vec::new());
    };
    let mut days: Vec<i64> = collect_numbers(std::slice::from_ref(value), ctx, NumberPolicy::NumbersOnly)?
        .into_iter()
        .map(|n| {
            if n < 0.0 {
                Err(CellError::Num)
            } else {
                Ok(to_1900(n.floor() as i64, ctx.date_1904()))
            }
        })
        .collect::<EvalResult<_>>()?;
    days.sort_unstable();
    days.dedup();
    Ok(days)
}

fn working_days_between(start: i64, end: i64, holidays: &[i64]) -> i64 {
    let days = end - start + 1;
    let full_weeks = days / 7;
    let mut count = full_weeks * 5;
    for serial in start + full_weeks * 7..=end {
        if !is_weekend(serial) {
            count += 1;
        }
    }
    let off = holidays
        .iter()
        .filter(|&&h| h >= start && h <= end && !is_weekend(h))
        .count() as i64;
    count - off
}

/// NETWORKDAYS(start_date, end_date, [holidays]) - Working days inclusive
///
/// Negative when the end date precedes the start date.
pub fn fn_networkdays(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let start = date_arg(arg(args, 0)?, ctx)?;
    let end = date_arg(arg(args, 1)?, ctx)?;
    let holidays = holidays(args, 2, ctx)?;
    let count = if start <= end {
        working_days_between(start, end, &holidays)
    } else {
        -working_days_between(end, start, &holidays)
    };
    Ok(FormulaValue::Number(count as f64))
}

/// WORKDAY(start_date, days, [holidays]) - Date a number of working days away
pub fn fn_workday(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut serial = date_arg(arg(args, 0)?, ctx)?;
    let days = number(arg(args, 1)?, ctx)?.trunc();
    if days.abs() > MAX_SERIAL as f64 {
        return Err(CellError::Num);
    }
    let holidays = holidays(args, 2, ctx)?;
    let step = if days < 0.0 { -1 } else { 1 };
    let mut remaining = days.abs() as i64;
    while remaining > 0 {
        serial += step;
        if !(0..=MAX_SERIAL).contains(&serial) {
            return Err(CellError::Num);
        }
        if !is_weekend(serial) && holidays.binary_search(&serial).is_err() {
            remaining -= 1;
        }
    }
    date_result(serial, ctx)
}

/// Whether 29 February of `year` lies within `[start, end]`
fn spans_leap_day(year: i32, start: i64, end: i64) -> bool {
    if !is_leap_year(year) {
        return false;
    }
    CalendarDate::serial_from_parts(year.into(), 2, 29).map_or(false, |leap| start <= leap && leap <= end)
}

/// Actual/actual year fraction
fn actual_actual(start: i64, end: i64, from: CalendarDate, to: CalendarDate) -> EvalResult<f64> {
    let days = (end - start) as f64;
    if from.year == to.year {
        return Ok(days / days_in_year(from.year) as f64);
    }
    let one_year_later = CalendarDate::serial_from_parts(i64::from(from.year) + 1, from.month.into(), from.day.into())?;
    if end <= one_year_later {
        let leap = spans_leap_day(from.year, start, end) || spans_leap_day(to.year, start, end);
        return Ok(days / if leap { 366.0 } else { 365.0 });
    }
    let years = (from.year..=to.year).count() as f64;
    let total: i64 = (from.year..=to.year).map(days_in_year).sum();
    Ok(days / (total as f64 / years))
}

/// YEARFRAC(start_date, end_date, [basis]) - Fraction of a year between dates
///
/// Basis 0 US 30/360, 1 actual/actual, 2 actual/360, 3 actual/365,
/// 4 European 30/360.
pub fn fn_yearfrac(args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let mut start = date_arg(arg(args, 0)?, ctx)?;
    let mut end = date_arg(arg(args, 1)?, ctx)?;
    let basis = number_or(args, 2, 0.0, ctx)?.trunc();
    if start > end {
        std::mem::swap(&mut start, &mut end);
    }
    let from = CalendarDate::from_serial(start)?;
    let to = CalendarDate::from_serial(end)?;
    let days = (end - start) as f64;
    let fraction = match basis as i64 {
        0 => days_360(from, to, false) as f64 / 360.0,
        1 => actual_actual(start, end, from, to)?,
        2 => days / 360.0,
        3 => days / 365.0,
        4 => days_360(from, to, true) as f64 / 360.0,
        _ => return Err(CellError::Num),
    };
    Ok(FormulaValue::Number(fraction))
}

fn today_serial(date: NaiveDate, ctx: &EvaluationContext) -> EvalResult<i64> {
    let serial = CalendarDate::serial_from_parts(date.year().into(), date.month().into(), date.day().into())?;
    from_1900(serial, ctx.date_1904())
}

/// NOW() - Current date and time
pub fn fn_now(_args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    let now = Local::now();
    let serial = today_serial(now.date_naive(), ctx)?;
    let seconds = f64::from(now.num_seconds_from_midnight());
    Ok(FormulaValue::Number(serial as f64 + seconds / SECONDS_PER_DAY))
}

/// TODAY() - Current date
pub fn fn_today(_args: &[FormulaValue], ctx: &EvaluationContext) -> EvalResult<FormulaValue> {
    Ok(FormulaValue::Number(today_serial(Local::now().date_naive(), ctx)? as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::test_util::{assert_close, call, call_in, number_grid};
    use pretty_assertions::assert_eq;
    use xlcalc_core::WorkbookSettings;

    fn date(y: f64, m: f64, d: f64) -> FormulaValue {
        call("DATE", &[y.into(), m.into(), d.into()])
    }

    fn n(v: f64) -> FormulaValue {
        FormulaValue::Number(v)
    }

    #[test]
    fn test_date_serials() {
        assert_eq!(date(1900.0, 1.0, 1.0), n(1.0));
        assert_eq!(date(1900.0, 2.0, 28.0), n(59.0));
        assert_eq!(date(1900.0, 2.0, 29.0), n(60.0));
        assert_eq!(date(1900.0, 3.0, 1.0), n(61.0));
        assert_eq!(date(2008.0, 8.0, 22.0), n(39682.0));
        assert_eq!(date(9999.0, 12.0, 31.0), n(2958465.0));
        assert_eq!(date(108.0, 8.0, 22.0), n(39682.0));
        assert_eq!(date(10000.0, 1.0, 1.0), CellError::Num.into());
        assert_eq!(date(-1.0, 1.0, 1.0), CellError::Num.into());
    }

    #[test]
    fn test_date_overflow_rolls() {
        assert_eq!(date(2008.0, 14.0, 2.0), date(2009.0, 2.0, 2.0));
        assert_eq!(date(2008.0, -3.0, 2.0), date(2007.0, 9.0, 2.0));
        assert_eq!(date(2008.0, 1.0, 35.0), date(2008.0, 2.0, 4.0));
        assert_eq!(date(2008.0, 1.0, -15.0), date(2007.0, 12.0, 16.0));
        assert_eq!(date(1900.0, 1.0, 0.0), n(0.0));
        assert_eq!(date(1900.0, 0.0, 1.0), CellError::Num.into());
    }

    #[test]
    fn test_date_parts() {
        assert_eq!(call("YEAR", &[n(39682.0)]), n(2008.0));
        assert_eq!(call("MONTH", &[n(39682.0)]), n(8.0));
        assert_eq!(call("DAY", &[n(39682.75)]), n(22.0));
        assert_eq!(call("DAY", &[n(60.0)]), n(29.0));
        assert_eq!(call("MONTH", &[n(60.0)]), n(2.0));
        assert_eq!(call("DAY", &[n(61.0)]), n(1.0));
        assert_eq!(call("DAY", &[n(0.0)]), n(0.0));
        assert_eq!(call("YEAR", &[n(-1.0)]), CellError::Num.into());
        assert_eq!(call("YEAR", &["2008-08-22".into()]), n(2008.0));
        assert_eq!(call("YEAR", &["not a date".into()]), CellError::Value.into());
    }

    #[test]
    fn test_date_1904_system() {
        let settings = WorkbookSettings {
            date_1904: true,
            ..WorkbookSettings::default()
        };
        let ctx = EvaluationContext::simple().with_settings(settings);
        let d = call_in("DATE", &[2008.0.into(), 8.0.into(), 22.0.into()], &ctx);
        assert_eq!(d, n(38220.0));
        assert_eq!(call_in("YEAR", &[n(0.0)], &ctx), n(1904.0));
        assert_eq!(call_in("WEEKDAY", &[n(0.0)], &ctx), n(6.0));
        assert_eq!(call_in("DATE", &[1903.0.into(), 12.0.into(), 31.0.into()], &ctx), CellError::Num.into());
    }

    #[test]
    fn test_huge_date_arguments_are_num_errors() {
        let num: FormulaValue = CellError::Num.into();
        assert_eq!(date(2000.0, 1e300, 1.0), num);
        assert_eq!(date(2000.0, -1e300, 1.0), num);
        assert_eq!(date(2000.0, 1.0, 1e300), num);
        assert_eq!(date(2000.0, 1.0, -1e300), num);
        assert_eq!(call("EDATE", &[n(1.0), 1e300.into()]), num);
        assert_eq!(call("EOMONTH", &[n(1.0), (-1e300).into()]), num);
        assert_eq!(call("YEAR", &[n(1e300)]), num);

        let settings = WorkbookSettings {
            date_1904: true,
            ..WorkbookSettings::default()
        };
        let ctx = EvaluationContext::simple().with_settings(settings);
        assert_eq!(call_in("YEAR", &[n(1e300)], &ctx), num);
        assert_eq!(call_in("EDATE", &[n(1e300), 1.0.into()], &ctx), num);
    }

    #[test]
    fn test_time_functions() {
        assert_close(&call("TIME", &[12.0.into(), 0.0.into(), 0.0.into()]), 0.5, 1e-15);
        assert_close(&call("TIME", &[16.0.into(), 48.0.into(), 10.0.into()]), 0.700115741, 1e-9);
        assert_close(&call("TIME", &[27.0.into(), 0.0.into(), 0.0.into()]), 0.125, 1e-15);
        assert_close(&call("TIME", &[0.0.into(), 750.0.into(), 0.0.into()]), 0.520833333, 1e-9);
        assert_eq!(call("TIME", &[(-1.0).into(), 0.0.into(), 0.0.into()]), CellError::Num.into());

        let t = FormulaValue::Number(0.700115741);
        assert_eq!(call("HOUR", &[t.clone()]), n(16.0));
        assert_eq!(call("MINUTE", &[t.clone()]), n(48.0));
        assert_eq!(call("SECOND", &[t]), n(10.0));
        assert_eq!(call("HOUR", &[n(39682.75)]), n(18.0));
        assert_eq!(call("MINUTE", &["6:45 PM".into()]), n(45.0));
    }

    #[test]
    fn test_weekday_return_types() {
        let serial = n(39682.0); // Friday
        assert_eq!(call("WEEKDAY", &[serial.clone()]), n(6.0));
        assert_eq!(call("WEEKDAY", &[serial.clone(), 2.0.into()]), n(5.0));
        assert_eq!(call("WEEKDAY", &[serial.clone(), 3.0.into()]), n(4.0));
        assert_eq!(call("WEEKDAY", &[serial.clone(), 11.0.into()]), n(5.0));
        assert_eq!(call("WEEKDAY", &[serial.clone(), 15.0.into()]), n(1.0));
        assert_eq!(call("WEEKDAY", &[serial.clone(), 17.0.into()]), n(6.0));
        assert_eq!(call("WEEKDAY", &[serial, 4.0.into()]), CellError::Num.into());
        assert_eq!(call("WEEKDAY", &[n(1.0)]), n(1.0));
    }

    #[test]
    fn test_week_numbers() {
        let march_9 = n(40977.0);
        assert_eq!(call("WEEKNUM", &[march_9.clone()]), n(10.0));
        assert_eq!(call("WEEKNUM", &[march_9.clone(), 2.0.into()]), n(11.0));
        assert_eq!(call("WEEKNUM", &[march_9, 21.0.into()]), n(10.0));
        assert_eq!(call("WEEKNUM", &[n(40909.0), 2.0.into()]), n(1.0));
        assert_eq!(call("WEEKNUM", &[n(40909.0), 21.0.into()]), n(52.0));
        assert_eq!(call("WEEKNUM", &[n(40909.0), 5.0.into()]), CellError::Num.into());
        assert_eq!(call("ISOWEEKNUM", &[n(44199.0)]), n(53.0));
        assert_eq!(call("ISOWEEKNUM", &[n(45657.0)]), n(1.0));
    }

    #[test]
    fn test_month_shifts() {
        assert_eq!(call("EDATE", &[n(40558.0), 1.0.into()]), date(2011.0, 2.0, 15.0));
        assert_eq!(call("EDATE", &[n(40558.0), (-1.0).into()]), date(2010.0, 12.0, 15.0));
        assert_eq!(call("EDATE", &[n(40574.0), 1.0.into()]), n(40602.0));
        assert_eq!(call("EOMONTH", &[n(40558.0), 1.0.into()]), n(40602.0));
        assert_eq!(call("EOMONTH", &[n(40558.0), (-3.0).into()]), date(2010.0, 10.0, 31.0));
        assert_eq!(call("EDATE", &[n(40558.0), (-2000000.0).into()]), CellError::Num.into());
    }

    #[test]
    fn test_day_counts() {
        assert_eq!(call("DAYS", &[n(40602.0), n(40558.0)]), n(44.0));
        let days360 = |a: FormulaValue, b: FormulaValue, european: bool| {
            call("DAYS360", &[a, b, european.into()])
        };
        assert_eq!(days360(date(2011.0, 1.0, 1.0), date(2011.0, 12.0, 31.0), false), n(360.0));
        assert_eq!(days360(date(2011.0, 1.0, 1.0), date(2011.0, 12.0, 31.0), true), n(359.0));
        assert_eq!(days360(date(2020.0, 2.0, 28.0), date(2020.0, 3.0, 31.0), false), n(33.0));
        assert_eq!(days360(date(2020.0, 2.0, 28.0), date(2020.0, 2.0, 29.0), false), n(3.0));
        assert_eq!(days360(date(2020.0, 1.0, 31.0), date(2020.0, 2.0, 29.0), false), n(30.0));
        assert_eq!(days360(date(2020.0, 1.0, 31.0), date(2020.0, 2.0, 29.0), true), n(29.0));
        assert_eq!(days360(date(2019.0, 4.0, 29.0), date(2019.0, 5.0, 31.0), false), n(32.0));
    }

    #[test]
    fn test_text_dates() {
        assert_eq!(call("DATEVALUE", &["8/22/2008".into()]), n(39682.0));
        assert_eq!(call("DATEVALUE", &["22-MAY-2011".into()]), n(40685.0));
        assert_eq!(call("DATEVALUE", &["2011/02/23".into()]), n(40597.0));
        assert_eq!(call("DATEVALUE", &["August 22, 2008".into()]), n(39682.0));
        assert_eq!(call("DATEVALUE", &["22-Aug-2008 6:35 AM".into()]), n(39682.0));
        assert_eq!(call("DATEVALUE", &["2/30/2008".into()]), CellError::Value.into());
        assert_close(&call("TIMEVALUE", &["2:24 AM".into()]), 0.1, 1e-12);
        assert_close(&call("TIMEVALUE", &["22-Aug-2011 6:35 AM".into()]), 0.274305556, 1e-9);
        assert_close(&call("TIMEVALUE", &["18:45".into()]), 0.78125, 1e-12);
        assert_eq!(call("TIMEVALUE", &["25:00".into()]), CellError::Value.into());
    }

    #[test]
    fn test_working_days() {
        let holidays = number_grid(&[&[41235.0, 41247.0, 41295.0]]);
        assert_eq!(call("NETWORKDAYS", &[n(41183.0), n(41334.0)]), n(110.0));
        assert_eq!(call("NETWORKDAYS", &[n(41183.0), n(41334.0), n(41235.0)]), n(109.0));
        assert_eq!(call("NETWORKDAYS", &[n(41183.0), n(41334.0), holidays]), n(107.0));
        assert_eq!(call("NETWORKDAYS", &[n(41334.0), n(41183.0)]), n(-110.0));

        assert_eq!(call("WORKDAY", &[n(39722.0), n(151.0)]), n(39933.0));
        let holidays = number_grid(&[&[39778.0, 39786.0, 39834.0]]);
        assert_eq!(call("WORKDAY", &[n(39722.0), n(151.0), holidays]), n(39938.0));
        assert_eq!(call("WORKDAY", &[n(39933.0), n(-151.0)]), n(39722.0));
    }

    #[test]
    fn test_yearfrac_bases() {
        let (start, end) = (n(40909.0), n(41120.0));
        let frac = |basis: f64| call("YEARFRAC", &[start.clone(), end.clone(), basis.into()]);
        assert_close(&frac(0.0), 0.580555556, 1e-9);
        assert_close(&frac(1.0), 0.576502732, 1e-9);
        assert_close(&frac(2.0), 0.586111111, 1e-9);
        assert_close(&frac(3.0), 0.578082192, 1e-9);
        assert_close(&frac(4.0), 0.580555556, 1e-9);
        assert_eq!(frac(5.0), CellError::Num.into());
        assert_close(&call("YEARFRAC", &[end.clone(), start.clone()]), 0.580555556, 1e-9);
    }

    #[test]
    fn test_now_and_today() {
        let today = call("TODAY", &[]);
        let now = call("NOW", &[]);
        match (today, now) {
            (FormulaValue::Number(d), FormulaValue::Number(t)) => {
                assert!(d > 45000.0);
                assert_eq!(d.fract(), 0.0);
                assert!(t >= d && t < d + 2.0);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
