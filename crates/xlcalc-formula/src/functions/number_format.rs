//! Number format codes for TEXT, DOLLAR and FIXED
//!
//! Format codes use the `en-US` syntax (`.` marks the decimal point and
//! `,` the thousands separator); the rendered text uses the locale's
//! separators.

use rust_decimal::RoundingStrategy;
use xlcalc_core::{CellError, Locale};

use super::date::calendar_of;
use super::math::round_digits;
use crate::value::{format_general, EvalResult};

const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

/// One token of a format section
#[derive(Debug, Clone, PartialEq)]
enum Piece {
    Literal(String),
    /// `0`, `#` or `?`
    Digit(char),
    Point,
    Comma,
    Percent,
    Exponent { plus: bool },
    /// `@`
    Text,
    General,
    Year(usize),
    Month(usize),
    Day(usize),
    Hour(usize),
    Minute(usize),
    Second(usize),
    Meridiem { short: bool, lower: bool },
}

impl Piece {
    fn is_date(&self) -> bool {
        matches!(
            self,
            Piece::Year(_)
                | Piece::Month(_)
                | Piece::Day(_)
                | Piece::Hour(_)
                | Piece::Minute(_)
                | Piece::Second(_)
                | Piece::Meridiem { .. }
        )
    }
}

/// Split a format code at the `;` that are not quoted, escaped or bracketed
fn split_sections(format: &str) -> Vec<&str> {
    let mut sections = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut bracketed = false;
    let mut escaped = false;
    for (i, c) in format.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '"' => quoted = !quoted,
            '\\' if !quoted => escaped = true,
            '[' if !quoted => bracketed = true,
            ']' if !quoted => bracketed = false,
            ';' if !quoted && !bracketed => {
                sections.push(&format[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    sections.push(&format[start..]);
    sections
}

fn starts_with_ignore_case(chars: &[char], word: &str) -> bool {
    let mut rest = chars.iter();
    word.chars()
        .all(|w| rest.next().map_or(false, |c| c.eq_ignore_ascii_case(&w)))
}

fn lex(section: &str) -> Vec<Piece> {
    let chars: Vec<char> = section.chars().collect();
    let mut pieces = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            '"' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&q| q == '"')
                    .map_or(chars.len(), |p| i + 1 + p);
                pieces.push(Piece::Literal(chars[i + 1..end].iter().collect()));
                i = end + 1;
                continue;
            }
            '\\' | '_' | '*' => {
                match (c, chars.get(i + 1)) {
                    ('\\', Some(next)) => pieces.push(Piece::Literal(next.to_string())),
                    ('_', Some(_)) => pieces.push(Piece::Literal(" ".to_string())),
                    _ => {}
                }
                i += 2;
                continue;
            }
            '[' => {
                let end = chars[i + 1..]
                    .iter()
                    .position(|&b| b == ']')
                    .map_or(chars.len(), |p| i + 1 + p);
                let inner: String = chars[i + 1..end].iter().collect();
                // [$€-407] carries a currency symbol; colors and conditions render nothing
                if let Some(currency) = inner.strip_prefix('$') {
                    let symbol = currency.split('-').next().unwrap_or_default();
                    pieces.push(Piece::Literal(symbol.to_string()));
                }
                i = end + 1;
                continue;
            }
            '0' | '#' | '?' => pieces.push(Piece::Digit(c)),
            '.' => pieces.push(Piece::Point),
            ',' => pieces.push(Piece::Comma),
            '%' => pieces.push(Piece::Percent),
            '@' => pieces.push(Piece::Text),
            'E' | 'e' if matches!(chars.get(i + 1), Some(&'+') | Some(&'-')) => {
                pieces.push(Piece::Exponent {
                    plus: chars[i + 1] == '+',
                });
                i += 2;
                continue;
            }
            'G' | 'g' if starts_with_ignore_case(&chars[i..], "general") => {
                pieces.push(Piece::General);
                i += "general".len();
                continue;
            }
            'A' | 'a' if starts_with_ignore_case(&chars[i..], "am/pm") => {
                pieces.push(Piece::Meridiem {
                    short: false,
                    lower: c == 'a',
                });
                i += "am/pm".len();
                continue;
            }
            'A' | 'a' if starts_with_ignore_case(&chars[i..], "a/p") => {
                pieces.push(Piece::Meridiem {
                    short: true,
                    lower: c == 'a',
                });
                i += "a/p".len();
                continue;
            }
            'y' | 'Y' | 'm' | 'M' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => {
                let letter = c.to_ascii_lowercase();
                let run = chars[i..]
                    .iter()
                    .take_while(|x| x.to_ascii_lowercase() == letter)
                    .count();
                pieces.push(match letter {
                    'y' => Piece::Year(run),
                    'm' => Piece::Month(run),
                    'd' => Piece::Day(run),
                    'h' => Piece::Hour(run),
                    _ => Piece::Second(run),
                });
                i += run;
                continue;
            }
            other => pieces.push(Piece::Literal(other.to_string())),
        }
        i += 1;
    }
    resolve_minutes(&mut pieces);
    pieces
}

/// `m` and `mm` mean minutes right after an hour or right before a second
fn resolve_minutes(pieces: &mut [Piece]) {
    for i in 0..pieces.len() {
        let run = match pieces[i] {
            Piece::Month(run) if run <= 2 => run,
            _ => continue,
        };
        let before = pieces[..i].iter().rev().find(|p| p.is_date());
        let after = pieces[i + 1..].iter().find(|p| p.is_date());
        if matches!(before, Some(Piece::Hour(_))) || matches!(after, Some(Piece::Second(_))) {
            pieces[i] = Piece::Minute(run);
        }
    }
}

/// Render the literal-like pieces that read the same in every kind of section
fn render_literal(piece: &Piece, out: &mut String) {
    match piece {
        Piece::Literal(s) => out.push_str(s),
        Piece::Percent => out.push('%'),
        Piece::Point => out.push('.'),
        _ => {}
    }
}

/// Format a number with a format code
///
/// With two or more sections the second formats negatives (without a
/// sign) and the third formats zero. Date and time codes need a
/// non-negative serial in range, otherwise `#VALUE!`.
pub(crate) fn format_number(n: f64, format: &str, locale: &Locale, date_1904: bool) -> EvalResult<String> {
    let sections = split_sections(format);
    let (section, value) = if n < 0.0 && sections.len() >= 2 {
        (sections[1], -n)
    } else if n == 0.0 && sections.len() >= 3 {
        (sections[2], n)
    } else {
        (sections[0], n)
    };

    let pieces = lex(section);
    if pieces.iter().any(Piece::is_date) {
        if value < 0.0 {
            return Err(CellError::Value);
        }
        return render_date(value, &pieces, locale, date_1904);
    }
    Ok(render_number(value, &pieces, locale))
}

/// Format text with a format code; only a section holding `@` changes it
pub(crate) fn format_text(text: &str, format: &str) -> String {
    let sections = split_sections(format);
    let pieces = match sections.get(3) {
        Some(section) => lex(section),
        None => lex(sections[0]),
    };
    if sections.len() < 4 && !pieces.contains(&Piece::Text) {
        return text.to_string();
    }

    let mut out = String::new();
    for piece in &pieces {
        match piece {
            Piece::Text => out.push_str(text),
            Piece::Comma => out.push(','),
            other => render_literal(other, &mut out),
        }
    }
    out
}

fn render_number(value: f64, pieces: &[Piece], locale: &Locale) -> String {
    if pieces.contains(&Piece::General) {
        let general: String = format_general(value)
            .chars()
            .map(|c| if c == '.' { locale.decimal_separator } else { c })
            .collect();
        let mut out = String::new();
        for piece in pieces {
            match piece {
                Piece::General => out.push_str(&general),
                other => render_literal(other, &mut out),
            }
        }
        return out;
    }

    let exponent_at = pieces.iter().position(|p| matches!(p, Piece::Exponent { .. }));
    let mantissa_end = exponent_at.unwrap_or(pieces.len());
    let mantissa = &pieces[..mantissa_end];
    let last_digit = match mantissa.iter().rposition(|p| matches!(p, Piece::Digit(_))) {
        Some(at) => at,
        None => {
            let mut out = String::new();
            for piece in pieces {
                render_literal(piece, &mut out);
            }
            return out;
        }
    };

    let point_at = mantissa.iter().position(|p| *p == Piece::Point);
    let int_pieces = &mantissa[..point_at.unwrap_or(mantissa_end)];
    let frac_pieces = point_at.map_or(&[][..], |at| &mantissa[at + 1..]);

    let scale_commas = mantissa[last_digit + 1..]
        .iter()
        .take_while(|p| **p == Piece::Comma)
        .count();
    let grouping = int_pieces.iter().enumerate().any(|(i, p)| {
        *p == Piece::Comma
            && int_pieces[..i].iter().any(|q| matches!(q, Piece::Digit(_)))
            && int_pieces[i + 1..].iter().any(|q| matches!(q, Piece::Digit(_)))
    });
    let percent = pieces.iter().filter(|p| **p == Piece::Percent).count() as i32;
    let max_frac = frac_pieces.iter().filter(|p| matches!(p, Piece::Digit(_))).count();

    let scaled = value.abs() * 100f64.powi(percent) / 1000f64.powi(scale_commas as i32);
    let (mantissa_value, exponent) = match exponent_at {
        Some(_) => {
            let int_placeholders = int_pieces.iter().filter(|p| matches!(p, Piece::Digit(_))).count();
            let step = if int_placeholders > 1 && int_pieces.contains(&Piece::Digit('#')) {
                int_placeholders as i32
            } else {
                1
            };
            let (m, e) = scientific(scaled, max_frac, step);
            (m, Some(e))
        }
        None => (scaled, None),
    };

    let rounded = round_digits(mantissa_value, max_frac as i64, RoundingStrategy::MidpointAwayFromZero);
    let digits = format!("{:.*}", max_frac, rounded);
    let (int_digits, frac_digits) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
    let int_digits = if int_digits == "0" { "" } else { int_digits };

    let mut out = String::new();
    if value < 0.0 && rounded != 0.0 {
        out.push('-');
    }
    out.push_str(&render_integer(int_digits, int_pieces, grouping, locale.group_separator));
    if point_at.is_some() {
        out.push(locale.decimal_separator);
        out.push_str(&render_fraction(frac_digits, frac_pieces));
    }
    if let (Some(at), Some(exponent)) = (exponent_at, exponent) {
        out.push('E');
        if exponent < 0 {
            out.push('-');
        } else if matches!(pieces[at], Piece::Exponent { plus: true }) {
            out.push('+');
        }
        let exponent_digits = if exponent == 0 {
            String::new()
        } else {
            exponent.abs().to_string()
        };
        out.push_str(&render_integer(&exponent_digits, &pieces[at + 1..], false, locale.group_separator));
    }
    out
}

/// Mantissa and exponent, the exponent a multiple of `step`
fn scientific(value: f64, max_frac: usize, step: i32) -> (f64, i32) {
    if value == 0.0 {
        return (0.0, 0);
    }
    let mut exponent = (value.log10().floor() as i32).div_euclid(step) * step;
    let mut mantissa = value / 10f64.powi(exponent);
    let limit = 10f64.powi(step);
    if round_digits(mantissa, max_frac as i64, RoundingStrategy::MidpointAwayFromZero) >= limit {
        exponent += step;
        mantissa = value / 10f64.powi(exponent);
    }
    (mantissa, exponent)
}

/// Fill integer placeholders from the right; the leftmost takes any overflow
fn render_integer(digits: &str, pieces: &[Piece], grouping: bool, separator: char) -> String {
    let digits: Vec<char> = digits.chars().collect();
    let placeholders = pieces.iter().filter(|p| matches!(p, Piece::Digit(_))).count();
    let mut reversed: Vec<char> = Vec::new();
    let mut remaining = digits.len();
    let mut position = 0;
    let mut seen = 0;

    let mut push_digit = |reversed: &mut Vec<char>, d: char| {
        if grouping && position > 0 && position % 3 == 0 {
            reversed.push(separator);
        }
        reversed.push(d);
        position += 1;
    };

    for piece in pieces.iter().rev() {
        match piece {
            Piece::Digit(placeholder) => {
                seen += 1;
                let take = if seen == placeholders { remaining } else { remaining.min(1) };
                if take == 0 {
                    match placeholder {
                        '0' => push_digit(&mut reversed, '0'),
                        '?' => reversed.push(' '),
                        _ => {}
                    }
                }
                for &d in digits[remaining - take..remaining].iter().rev() {
                    push_digit(&mut reversed, d);
                }
                remaining -= take;
            }
            other => {
                let mut literal = String::new();
                render_literal(other, &mut literal);
                reversed.extend(literal.chars().rev());
            }
        }
    }
    reversed.iter().rev().collect()
}

/// Fill fraction placeholders from the left; `#` drops and `?` blanks trailing zeros
fn render_fraction(digits: &str, pieces: &[Piece]) -> String {
    let digits: Vec<char> = digits.chars().collect();
    let significant = digits.iter().rposition(|&d| d != '0').map_or(0, |at| at + 1);
    let mut out = String::new();
    let mut index = 0;
    for piece in pieces {
        match piece {
            Piece::Digit(placeholder) => {
                let d = digits.get(index).copied().unwrap_or('0');
                if index < significant || *placeholder == '0' {
                    out.push(d);
                } else if *placeholder == '?' {
                    out.push(' ');
                }
                index += 1;
            }
            other => render_literal(other, &mut out),
        }
    }
    out
}

fn render_date(serial: f64, pieces: &[Piece], locale: &Locale, date_1904: bool) -> EvalResult<String> {
    // Fractional seconds: `.0`, `.00` or `.000` after a seconds code
    let fraction = pieces
        .iter()
        .position(|p| *p == Piece::Point)
        .filter(|&at| pieces[..at].iter().any(|p| matches!(p, Piece::Second(_))))
        .map(|at| {
            let count = pieces[at + 1..]
                .iter()
                .take_while(|p| **p == Piece::Digit('0'))
                .count();
            (at, count.min(3))
        })
        .filter(|&(_, count)| count > 0);

    let places = fraction.map_or(0, |(_, count)| count as u32);
    let scale = 10i64.pow(places);
    let per_day = 86_400 * scale;
    let units = (serial * per_day as f64).round() as i64;
    let (date, weekday) =
        calendar_of(units.div_euclid(per_day), date_1904).map_err(|_| CellError::Value)?;
    let within_day = units.rem_euclid(per_day);
    let seconds = within_day / scale;
    let (hour, minute, second) = (seconds / 3600, seconds / 60 % 60, seconds % 60);
    let twelve_hour = pieces.iter().any(|p| matches!(p, Piece::Meridiem { .. }));

    let padded = |value: i64, run: usize| {
        if run >= 2 {
            format!("{:02}", value)
        } else {
            value.to_string()
        }
    };

    let mut out = String::new();
    let mut i = 0;
    while i < pieces.len() {
        match &pieces[i] {
            Piece::Year(run) if *run <= 2 => out.push_str(&format!("{:02}", date.year.rem_euclid(100))),
            Piece::Year(_) => out.push_str(&format!("{:04}", date.year)),
            Piece::Month(run) => {
                let name = MONTHS[(date.month as usize).saturating_sub(1) % 12];
                match run {
                    1 | 2 => out.push_str(&padded(i64::from(date.month), *run)),
                    3 => out.push_str(&name[..3]),
                    4 => out.push_str(name),
                    _ => out.push_str(&name[..1]),
                }
            }
            Piece::Day(run) => {
                let name = WEEKDAYS[weekday as usize % 7];
                match run {
                    1 | 2 => out.push_str(&padded(i64::from(date.day), *run)),
                    3 => out.push_str(&name[..3]),
                    _ => out.push_str(name),
                }
            }
            Piece::Hour(run) => {
                let shown = if twelve_hour { (hour + 11) % 12 + 1 } else { hour };
                out.push_str(&padded(shown, *run));
            }
            Piece::Minute(run) => out.push_str(&padded(minute, *run)),
            Piece::Second(run) => out.push_str(&padded(second, *run)),
            Piece::Meridiem { short, lower } => {
                let marker = match (short, hour < 12) {
                    (false, true) => "AM",
                    (false, false) => "PM",
                    (true, true) => "A",
                    (true, false) => "P",
                };
                if *lower {
                    out.push_str(&marker.to_lowercase());
                } else {
                    out.push_str(marker);
                }
            }
            Piece::Point => match fraction {
                Some((at, count)) if at == i => {
                    out.push(locale.decimal_separator);
                    out.push_str(&format!("{:0width$}", within_day % scale, width = count));
                    i += count + 1;
                    continue;
                }
                _ => out.push('.'),
            },
            Piece::Comma => out.push(','),
            other => render_literal(other, &mut out),
        }
        i += 1;
    }
    Ok(out)
}

/// Insert a group separator every three digits from the right
fn group_digits(digits: &str, separator: char) -> String {
    let count = digits.chars().count();
    let mut out = String::new();
    for (i, d) in digits.chars().enumerate() {
        if i > 0 && (count - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(d);
    }
    out
}

/// Round to `decimals` places and render with the locale's separators
///
/// Negative `decimals` round to the left of the decimal point and show no
/// fraction.
pub(crate) fn fixed(n: f64, decimals: i64, grouping: bool, locale: &Locale) -> String {
    let rounded = round_digits(n, decimals, RoundingStrategy::MidpointAwayFromZero);
    let places = decimals.clamp(0, 127) as usize;
    let digits = format!("{:.*}", places, rounded.abs());
    let (int_digits, frac_digits) = digits.split_once('.').unwrap_or((digits.as_str(), ""));

    let mut out = String::new();
    if rounded < 0.0 {
        out.push('-');
    }
    if grouping {
        out.push_str(&group_digits(int_digits, locale.group_separator));
    } else {
        out.push_str(int_digits);
    }
    if places > 0 {
        out.push(locale.decimal_separator);
        out.push_str(frac_digits);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn us(n: f64, format: &str) -> String {
        format_number(n, format, &Locale::en_us(), false).unwrap()
    }

    #[test]
    fn test_sections() {
        assert_eq!(split_sections("0;(0);\"zero\""), vec!["0", "(0)", "\"zero\""]);
        assert_eq!(split_sections("\"a;b\"0"), vec!["\"a;b\"0"]);
        assert_eq!(split_sections("0\\;0"), vec!["0\\;0"]);
    }

    #[test]
    fn test_fixed_formats() {
        assert_eq!(us(1234.567, "#,##0.00"), "1,234.57");
        assert_eq!(us(1234.567, "0"), "1235");
        assert_eq!(us(0.5, "#.##"), ".5");
        assert_eq!(us(3.1, "0.000"), "3.100");
        assert_eq!(us(1.5, "0.0#"), "1.5");
        assert_eq!(us(0.0, "#,###"), "");
        assert_eq!(us(1234567.0, "#,##0"), "1,234,567");
        assert_eq!(us(5.0, "0,000"), "0,005");
        assert_eq!(us(-42.0, "0"), "-42");
        assert_eq!(us(-0.001, "0.0"), "0.0");
    }

    #[test]
    fn test_literals_between_digits() {
        assert_eq!(us(5551234.0, "000-0000"), "555-1234");
        assert_eq!(us(1234.5, "$#,##0.00"), "$1,234.50");
        assert_eq!(us(-5.0, "$0"), "-$5");
        assert_eq!(us(7.0, "0 \"units\""), "7 units");
        assert_eq!(us(7.0, "[$€-407] 0"), "€ 7");
        assert_eq!(us(7.0, "[Red]0"), "7");
    }

    #[test]
    fn test_percent_and_scaling() {
        assert_eq!(us(0.285, "0.0%"), "28.5%");
        assert_eq!(us(0.5, "0%"), "50%");
        assert_eq!(us(12_345_678.0, "0.0,,"), "12.3");
        assert_eq!(us(12_345_678.0, "#,##0,"), "12,346");
    }

    #[test]
    fn test_negative_and_zero_sections() {
        assert_eq!(us(-5.0, "0;(0)"), "(5)");
        assert_eq!(us(5.0, "0;(0)"), "5");
        assert_eq!(us(0.0, "0;-0;\"zero\""), "zero");
        assert_eq!(us(-5.0, "0;"), "");
    }

    #[test]
    fn test_scientific() {
        assert_eq!(us(1234.5, "0.00E+00"), "1.23E+03");
        assert_eq!(us(0.000123, "0.0E+0"), "1.2E-4");
        assert_eq!(us(0.0, "0.00E+00"), "0.00E+00");
        assert_eq!(us(12345.0, "##0.0E+0"), "12.3E+3");
    }

    #[test]
    fn test_general_section() {
        assert_eq!(us(1.5, "General"), "1.5");
        assert_eq!(us(-1.5, "General"), "-1.5");
        assert_eq!(us(2.0, "General \"kg\""), "2 kg");
        let de = format_number(1.5, "General", &Locale::de_de(), false).unwrap();
        assert_eq!(de, "1,5");
    }

    #[test]
    fn test_dates() {
        assert_eq!(us(45000.0, "yyyy-mm-dd"), "2023-03-15");
        assert_eq!(us(45000.0, "dddd, mmmm d"), "Wednesday, March 15");
        assert_eq!(us(45000.0, "ddd d-mmm-yy"), "Wed 15-Mar-23");
        assert_eq!(us(45000.0, "mmmmm"), "M");
        assert_eq!(us(45000.0, "m/d/yyyy"), "3/15/2023");
        assert_eq!(format_number(-1.0, "yyyy", &Locale::en_us(), false), Err(CellError::Value));
    }

    #[test]
    fn test_times() {
        assert_eq!(us(0.75, "h:mm AM/PM"), "6:00 PM");
        assert_eq!(us(0.25, "h:mm a/p"), "6:00 a");
        assert_eq!(us(0.0, "hh:mm AM/PM"), "12:00 AM");
        let t = (13.0 * 3600.0 + 5.0 * 60.0 + 9.0) / 86_400.0;
        assert_eq!(us(t, "hh:mm:ss"), "13:05:09");
        assert_eq!(us(t, "mm:ss"), "05:09");
        let half = (1.5) / 86_400.0;
        assert_eq!(us(half, "s.0"), "1.5");
    }

    #[test]
    fn test_text_sections() {
        assert_eq!(format_text("abc", "\"<\"@\">\""), "<abc>");
        assert_eq!(format_text("abc", "0.00"), "abc");
        assert_eq!(format_text("abc", "0;0;0;\"[\"@\"]\""), "[abc]");
    }

    #[test]
    fn test_locale_separators() {
        let de = Locale::de_de();
        assert_eq!(format_number(1234.5, "#,##0.00", &de, false).unwrap(), "1.234,50");
        assert_eq!(fixed(1234.567, 1, true, &de), "1.234,6");
    }

    #[test]
    fn test_fixed_helper() {
        let us = Locale::en_us();
        assert_eq!(fixed(1234.567, 1, true, &us), "1,234.6");
        assert_eq!(fixed(1234.567, -1, true, &us), "1,230");
        assert_eq!(fixed(-1234.567, -1, false, &us), "-1230");
        assert_eq!(fixed(44.332, 2, true, &us), "44.33");
        assert_eq!(fixed(0.0, 2, true, &us), "0.00");
    }
}
