//! Criteria matching for SUMIF, COUNTIF, AVERAGEIF and the database functions
//!
//! Excel criteria can be:
//! - A number, boolean or error: exact match (e.g. `5`, `TRUE`, `#N/A`)
//! - A comparison expression: `">5"`, `">=10"`, `"<apple"`, `"<>0"`, `"=5"`
//! - Text, optionally with wildcards: `*` any run, `?` one character,
//!   `~` escapes the next wildcard
//! - Empty: matches blank cells and empty text

use regex::{Regex, RegexBuilder};
use xlcalc_core::{CellError, Locale};

use crate::coerce::parse_number;
use crate::context::EvaluationContext;
use crate::operators::compare_text;
use crate::value::FormulaValue;

/// Comparison operator of a criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

/// Case-insensitive text, compiled to an anchored pattern when it holds wildcards
#[derive(Debug, Clone)]
pub struct TextPattern {
    text: String,
    regex: Option<Regex>,
}

impl TextPattern {
    pub fn new(text: &str) -> Self {
        let regex = if text.contains(['*', '?', '~']) {
            wildcard_regex(text)
        } else {
            None
        };
        Self {
            text: text.to_string(),
            regex,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whole-string match, wildcards honoured
    pub fn matches(&self, candidate: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(candidate),
            None => candidate.to_lowercase() == self.text.to_lowercase(),
        }
    }
}

fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let source = format!("^(?s:{})$", wildcard_source(pattern));
    RegexBuilder::new(&source).case_insensitive(true).build().ok()
}

/// Regex source for a wildcard pattern
///
/// `*` matches any run and `?` any one character. `~` escapes a following
/// `*`, `?` or `~` and is literal before anything else.
pub(crate) fn wildcard_source(pattern: &str) -> String {
    let mut source = String::new();
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '~' => match chars.next_if(|next| matches!(next, '*' | '?' | '~')) {
                Some(escaped) => source.push_str(&regex::escape(&escaped.to_string())),
                None => source.push_str(&regex::escape("~")),
            },
            '*' => source.push_str("(?s:.*)"),
            '?' => source.push_str("(?s:.)"),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source
}

/// Operand of a criterion
#[derive(Debug, Clone)]
pub enum CriterionValue {
    Number(f64),
    Text(TextPattern),
    Boolean(bool),
    Error(CellError),
}

/// The test a criterion applies
#[derive(Debug, Clone)]
pub enum Condition {
    Equals(CriterionValue),
    Compare(CompareOp, CriterionValue),
    /// Blank cells and empty text
    Blank,
}

/// A parsed criterion
///
/// Keeps the locale it was parsed under so numeric text in cells reads the
/// same way as numeric text in the criterion.
#[derive(Debug, Clone)]
pub struct Criterion {
    condition: Condition,
    locale: Locale,
}

impl Criterion {
    /// Parse a criteria argument that has already been resolved to a scalar
    pub fn parse(raw: &FormulaValue, locale: &Locale) -> Self {
        let condition = match raw {
            FormulaValue::Number(n) => Condition::Equals(CriterionValue::Number(*n)),
            FormulaValue::Boolean(b) => Condition::Equals(CriterionValue::Boolean(*b)),
            FormulaValue::Error(e) => Condition::Equals(CriterionValue::Error(*e)),
            FormulaValue::String(s) => Self::parse_text(s, locale),
            FormulaValue::Empty | FormulaValue::Reference(_) | FormulaValue::Array(_) => {
                Condition::Blank
            }
        };
        Self {
            condition,
            locale: locale.clone(),
        }
    }


    /// Parse a criteria argument, resolving references through the context
    pub fn from_arg(raw: &FormulaValue, ctx: &EvaluationContext) -> Self {
        Self::parse(&ctx.scalar(raw), ctx.locale())
    }

    fn parse_text(s: &str, locale: &Locale) -> Condition {
        if s.is_empty() {
            return Condition::Blank;
        }

        let (op, rest) = if let Some(rest) = s.strip_prefix(">=") {
            (Some(CompareOp::GreaterEqual), rest)
        } else if let Some(rest) = s.strip_prefix("<=") {
            (Some(CompareOp::LessEqual), rest)
        } else if let Some(rest) = s.strip_prefix("<>") {
            (Some(CompareOp::NotEqual), rest)
        } else if let Some(rest) = s.strip_prefix('>') {
            (Some(CompareOp::GreaterThan), rest)
        } else if let Some(rest) = s.strip_prefix('<') {
            (Some(CompareOp::LessThan), rest)
        } else if let Some(rest) = s.strip_prefix('=') {
            (None, rest)
        } else {
            (None, s)
        };

        let operand = Self::parse_operand(rest, locale);
        match op {
            Some(op) => Condition::Compare(op, operand),
            None => Condition::Equals(operand),
        }
    }

    fn parse_operand(text: &str, locale: &Locale) -> CriterionValue {
        if let Some(n) = parse_number(text, locale) {
            return CriterionValue::Number(n);
        }
        if text.eq_ignore_ascii_case("TRUE") {
            return CriterionValue::Boolean(true);
        }
        if text.eq_ignore_ascii_case("FALSE") {
            return CriterionValue::Boolean(false);
        }
        if let Ok(e) = text.parse::<CellError>() {
            return CriterionValue::Error(e);
        }
        CriterionValue::Text(TextPattern::new(text))
    }

    /// Check whether a cell value satisfies the criterion
    pub fn matches(&self, cell: &FormulaValue) -> bool {
        match &self.condition {
            Condition::Blank => match cell {
                FormulaValue::Empty => true,
                FormulaValue::String(s) => s.is_empty(),
                _ => false,
            },
            Condition::Equals(operand) => self.equals(operand, cell),
            Condition::Compare(CompareOp::NotEqual, operand) => !self.equals(operand, cell),
            Condition::Compare(op, operand) => {
                let ord = match (operand, cell) {
                    (CriterionValue::Number(n), FormulaValue::Number(m)) => m.partial_cmp(n),
                    (CriterionValue::Text(p), FormulaValue::String(s)) => {
                        Some(compare_text(s, p.as_str()))
                    }
                    (CriterionValue::Boolean(b), FormulaValue::Boolean(c)) => Some(c.cmp(b)),
                    _ => None,
                };
                let Some(ord) = ord else {
                    return false;
                };
                match op {
                    CompareOp::LessThan => ord.is_lt(),
                    CompareOp::LessEqual => ord.is_le(),
                    CompareOp::GreaterThan => ord.is_gt(),
                    CompareOp::GreaterEqual => ord.is_ge(),
                    CompareOp::NotEqual => ord.is_ne(),
                }
            }
        }
    }

    fn equals(&self, operand: &CriterionValue, cell: &FormulaValue) -> bool {
        match (operand, cell) {
            (CriterionValue::Number(n), FormulaValue::Number(m)) => m == n,
            (CriterionValue::Number(n), FormulaValue::String(s)) => {
                parse_number(s, &self.locale) == Some(*n)
            }
            // "=" alone selects cells with nothing in them, not empty text
            (CriterionValue::Text(p), FormulaValue::String(s)) => {
                !p.as_str().is_empty() && p.matches(s)
            }
            (CriterionValue::Text(p), FormulaValue::Empty) => p.as_str().is_empty(),
            (CriterionValue::Boolean(b), FormulaValue::Boolean(c)) => b == c,
            (CriterionValue::Error(e), FormulaValue::Error(f)) => e == f,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criterion(raw: impl Into<FormulaValue>) -> Criterion {
        Criterion::parse(&raw.into(), &Locale::default())
    }

    #[test]
    fn test_number_criteria() {
        let c = criterion(5.0);
        assert!(c.matches(&FormulaValue::Number(5.0)));
        assert!(c.matches(&FormulaValue::text("5")));
        assert!(!c.matches(&FormulaValue::Number(4.0)));
        assert!(!c.matches(&FormulaValue::Boolean(true)));
        assert!(!c.matches(&FormulaValue::Empty));
    }

    #[test]
    fn test_numeric_text_cells_read_in_the_criterion_locale() {
        let de = Locale::de_de();
        let c = Criterion::parse(&FormulaValue::Number(1.5), &de);
        assert!(c.matches(&FormulaValue::text("1,5")));
        assert!(!c.matches(&FormulaValue::text("1.5")));

        let c = Criterion::parse(&"1,5".into(), &de);
        assert!(c.matches(&FormulaValue::Number(1.5)));
        assert!(c.matches(&FormulaValue::text("1,5")));

        assert!(criterion(1.5).matches(&FormulaValue::text("1.5")));
    }

    #[test]
    fn test_comparison_criteria() {
        let gt = criterion(">5");
        assert!(gt.matches(&FormulaValue::Number(6.0)));
        assert!(!gt.matches(&FormulaValue::Number(5.0)));
        assert!(!gt.matches(&FormulaValue::text("6")));
        assert!(!gt.matches(&FormulaValue::Empty));

        let le = criterion("<=5");
        assert!(le.matches(&FormulaValue::Number(5.0)));
        assert!(le.matches(&FormulaValue::Number(-1.0)));

        let ne = criterion("<>5");
        assert!(ne.matches(&FormulaValue::Number(4.0)));
        assert!(ne.matches(&FormulaValue::text("abc")));
        assert!(ne.matches(&FormulaValue::Empty));
        assert!(!ne.matches(&FormulaValue::Number(5.0)));

        let eq = criterion("=5");
        assert!(eq.matches(&FormulaValue::Number(5.0)));
        assert!(!eq.matches(&FormulaValue::Number(6.0)));
    }

    #[test]
    fn test_text_comparison() {
        let c = criterion("<m");
        assert!(c.matches(&FormulaValue::text("Apple")));
        assert!(!c.matches(&FormulaValue::text("pear")));
        assert!(!c.matches(&FormulaValue::Number(1.0)));
    }

    #[test]
    fn test_text_criteria() {
        let c = criterion("apple");
        assert!(c.matches(&FormulaValue::text("APPLE")));
        assert!(c.matches(&FormulaValue::text("Apple")));
        assert!(!c.matches(&FormulaValue::text("apples")));
        assert!(!c.matches(&FormulaValue::Empty));
    }

    #[test]
    fn test_wildcard_criteria() {
        let c = criterion("a*e");
        assert!(c.matches(&FormulaValue::text("apple")));
        assert!(c.matches(&FormulaValue::text("AE")));
        assert!(!c.matches(&FormulaValue::text("apples")));

        let c = criterion("a?ple");
        assert!(c.matches(&FormulaValue::text("apple")));
        assert!(!c.matches(&FormulaValue::text("aple")));

        let c = criterion("=*West");
        assert!(c.matches(&FormulaValue::text("West")));
        assert!(c.matches(&FormulaValue::text("Midwest")));
        assert!(!c.matches(&FormulaValue::text("North")));

        let c = criterion("<>*West");
        assert!(!c.matches(&FormulaValue::text("Midwest")));
        assert!(c.matches(&FormulaValue::text("East")));

        let c = criterion("*");
        assert!(c.matches(&FormulaValue::text("")));
        assert!(!c.matches(&FormulaValue::Empty));
        assert!(!c.matches(&FormulaValue::Number(1.0)));
    }

    #[test]
    fn test_escaped_wildcards() {
        let c = criterion("what~?");
        assert!(c.matches(&FormulaValue::text("What?")));
        assert!(!c.matches(&FormulaValue::text("whats")));

        let c = criterion("1~*2");
        assert!(c.matches(&FormulaValue::text("1*2")));
        assert!(!c.matches(&FormulaValue::text("1x2")));

        let c = criterion("(a.b)+");
        assert!(c.matches(&FormulaValue::text("(A.B)+")));
    }

    #[test]
    fn test_tilde_is_literal_before_ordinary_characters() {
        let c = criterion("a~b");
        assert!(c.matches(&FormulaValue::text("a~b")));
        assert!(!c.matches(&FormulaValue::text("ab")));

        let c = criterion("a~~*");
        assert!(c.matches(&FormulaValue::text("a~xyz")));
        assert!(!c.matches(&FormulaValue::text("axyz")));

        let c = criterion("end~");
        assert!(c.matches(&FormulaValue::text("End~")));
    }

    #[test]
    fn test_blank_criteria() {
        let c = criterion("");
        assert!(c.matches(&FormulaValue::Empty));
        assert!(c.matches(&FormulaValue::text("")));
        assert!(!c.matches(&FormulaValue::Number(0.0)));

        let only_empty = criterion("=");
        assert!(only_empty.matches(&FormulaValue::Empty));
        assert!(!only_empty.matches(&FormulaValue::text("")));

        let non_blank = criterion("<>");
        assert!(non_blank.matches(&FormulaValue::text("x")));
        assert!(non_blank.matches(&FormulaValue::Number(0.0)));
        assert!(!non_blank.matches(&FormulaValue::Empty));
    }

    #[test]
    fn test_boolean_and_error_criteria() {
        let c = criterion("TRUE");
        assert!(c.matches(&FormulaValue::Boolean(true)));
        assert!(!c.matches(&FormulaValue::text("TRUE")));
        assert!(!c.matches(&FormulaValue::Number(1.0)));

        let c = criterion(false);
        assert!(c.matches(&FormulaValue::Boolean(false)));

        let c = criterion("#N/A");
        assert!(c.matches(&FormulaValue::Error(CellError::Na)));
        assert!(!c.matches(&FormulaValue::Error(CellError::Div0)));

        let c = criterion(">=TRUE");
        assert!(c.matches(&FormulaValue::Boolean(true)));
        assert!(!c.matches(&FormulaValue::Boolean(false)));
    }
}
