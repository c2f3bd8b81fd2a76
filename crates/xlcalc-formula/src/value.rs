//! Runtime values flowing through formula functions

use std::fmt;

use xlcalc_core::{CellError, CellRange, CellValue, Locale};

use crate::coerce::parse_number;
use crate::error::{FormulaError, FormulaResult};

/// Result of evaluating a function body or a coercion step
///
/// `Err` carries the spreadsheet error that becomes the call's value.
pub type EvalResult<T> = std::result::Result<T, CellError>;

/// Value types during formula evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaValue {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
    /// Lazy handle into the hosting grid, resolved through the context
    Reference(Reference),
    /// Owned grid of scalar values
    Array(Array),
    Empty,
}

impl FormulaValue {
    /// Text value from anything string-like
    pub fn text<S: Into<String>>(s: S) -> Self {
        FormulaValue::String(s.into())
    }

    /// Reference value from A1 text such as `B2:C9` or `Data!A1:A5`
    ///
    /// Unparseable text yields `#REF!`, the value a formula would see.
    pub fn range(a1: &str) -> Self {
        match Reference::parse(a1) {
            Ok(reference) => FormulaValue::Reference(reference),
            Err(_) => FormulaValue::Error(CellError::Ref),
        }
    }

    /// The number held, without coercion
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FormulaValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FormulaValue::Error(_))
    }

    pub fn error(&self) -> Option<CellError> {
        match self {
            FormulaValue::Error(e) => Some(*e),
            _ => None,
        }
    }

    /// Blank, the empty cell
    pub fn is_empty(&self) -> bool {
        matches!(self, FormulaValue::Empty)
    }

    /// Whether the value is a reference or array rather than a scalar
    pub fn is_range(&self) -> bool {
        matches!(self, FormulaValue::Reference(_) | FormulaValue::Array(_))
    }

    /// Coerce a scalar to a number
    ///
    /// Blank is 0, booleans are 0/1, text must parse completely.
    /// References and arrays must be resolved to a scalar first.
    pub fn to_number(&self, locale: &Locale) -> EvalResult<f64> {
        match self {
            FormulaValue::Number(n) => Ok(*n),
            FormulaValue::Empty => Ok(0.0),
            FormulaValue::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FormulaValue::String(s) => parse_number(s, locale).ok_or(CellError::Value),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Reference(_) | FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    /// Coerce a scalar to a boolean
    pub fn to_bool(&self) -> EvalResult<bool> {
        match self {
            FormulaValue::Boolean(b) => Ok(*b),
            FormulaValue::Number(n) => Ok(*n != 0.0),
            FormulaValue::Empty => Ok(false),
            FormulaValue::String(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Ok(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Ok(false)
                } else {
                    Err(CellError::Value)
                }
            }
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Reference(_) | FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    /// Coerce a scalar to text; numbers use the General format
    pub fn to_text(&self) -> EvalResult<String> {
        match self {
            FormulaValue::String(s) => Ok(s.clone()),
            FormulaValue::Number(n) => Ok(format_general(*n)),
            FormulaValue::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
            FormulaValue::Empty => Ok(String::new()),
            FormulaValue::Error(e) => Err(*e),
            FormulaValue::Reference(_) | FormulaValue::Array(_) => Err(CellError::Value),
        }
    }

    /// The number TYPE() reports
    pub fn type_code(&self) -> u8 {
        match self {
            FormulaValue::Number(_) | FormulaValue::Empty => 1,
            FormulaValue::String(_) => 2,
            FormulaValue::Boolean(_) => 4,
            FormulaValue::Error(_) => 16,
            FormulaValue::Reference(_) | FormulaValue::Array(_) => 64,
        }
    }
}

impl fmt::Display for FormulaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaValue::Number(n) => f.write_str(&format_general(*n)),
            FormulaValue::String(s) => f.write_str(s),
            FormulaValue::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            FormulaValue::Error(e) => write!(f, "{}", e),
            FormulaValue::Reference(r) => write!(f, "{}", r),
            FormulaValue::Array(a) => write!(f, "{}", a),
            FormulaValue::Empty => Ok(()),
        }
    }
}

impl From<f64> for FormulaValue {
    fn from(n: f64) -> Self {
        FormulaValue::Number(n)
    }
}

impl From<bool> for FormulaValue {
    fn from(b: bool) -> Self {
        FormulaValue::Boolean(b)
    }
}

impl From<&str> for FormulaValue {
    fn from(s: &str) -> Self {
        FormulaValue::String(s.to_string())
    }
}

impl From<String> for FormulaValue {
    fn from(s: String) -> Self {
        FormulaValue::String(s)
    }
}

impl From<CellError> for FormulaValue {
    fn from(e: CellError) -> Self {
        FormulaValue::Error(e)
    }
}

impl From<Array> for FormulaValue {
    fn from(a: Array) -> Self {
        FormulaValue::Array(a)
    }
}

impl From<EvalResult<f64>> for FormulaValue {
    fn from(result: EvalResult<f64>) -> Self {
        match result {
            Ok(n) => FormulaValue::Number(n),
            Err(e) => FormulaValue::Error(e),
        }
    }
}

impl From<CellValue> for FormulaValue {
    fn from(value: CellValue) -> Self {
        FormulaValue::from(&value)
    }
}

impl From<&CellValue> for FormulaValue {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => FormulaValue::Empty,
            CellValue::Boolean(b) => FormulaValue::Boolean(*b),
            CellValue::Number(n) => FormulaValue::Number(*n),
            CellValue::String(s) => FormulaValue::String(s.as_str().to_string()),
            CellValue::Error(e) => FormulaValue::Error(*e),
        }
    }
}

impl From<FormulaValue> for CellValue {
    /// Store a result in a cell; arrays keep their top-left element
    fn from(value: FormulaValue) -> Self {
        match value {
            FormulaValue::Number(n) => CellValue::Number(n),
            FormulaValue::String(s) => CellValue::string(s),
            FormulaValue::Boolean(b) => CellValue::Boolean(b),
            FormulaValue::Error(e) => CellValue::Error(e),
            FormulaValue::Empty => CellValue::Empty,
            FormulaValue::Array(a) => a
                .get(0, 0)
                .cloned()
                .map(CellValue::from)
                .unwrap_or_default(),
            FormulaValue::Reference(_) => CellValue::Error(CellError::Value),
        }
    }
}

/// Format a number the way a General-formatted cell turns it into text
///
/// Up to 15 significant digits, trailing zeros dropped, scientific
/// notation only for very large or very small magnitudes.
pub fn format_general(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if !n.is_finite() {
        return CellError::Num.as_str().to_string();
    }

    // d.dddddddddddddde<exp>, 15 significant digits after rounding
    let sci = format!("{:.14e}", n);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some(parts) => parts,
        None => return sci,
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let negative = mantissa.starts_with('-');
    let digits: String = mantissa.chars().filter(char::is_ascii_digit).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    let mut out = String::new();
    if negative {
        out.push('-');
    }

    if !(-9..=19).contains(&exponent) {
        out.push_str(&digits[..1]);
        if digits.len() > 1 {
            out.push('.');
            out.push_str(&digits[1..]);
        }
        out.push_str(&format!(
            "E{}{:02}",
            if exponent < 0 { '-' } else { '+' },
            exponent.abs()
        ));
    } else if exponent < 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-exponent - 1) as usize));
        out.push_str(digits);
    } else {
        let int_len = exponent as usize + 1;
        if digits.len() <= int_len {
            out.push_str(digits);
            out.push_str(&"0".repeat(int_len - digits.len()));
        } else {
            out.push_str(&digits[..int_len]);
            out.push('.');
            out.push_str(&digits[int_len..]);
        }
    }
    out
}

/// Rectangular grid of scalar values stored row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    rows: usize,
    cols: usize,
    values: Vec<FormulaValue>,
}

impl Array {
    /// Build from row-major values; `values.len()` must be `rows * cols`
    pub fn new(rows: usize, cols: usize, values: Vec<FormulaValue>) -> Self {
        debug_assert_eq!(values.len(), rows * cols);
        Self { rows, cols, values }
    }

    /// Build from nested rows; short rows are padded with `#N/A`
    pub fn from_rows(rows: Vec<Vec<FormulaValue>>) -> Self {
        let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
        let height = rows.len();
        let mut values = Vec::with_capacity(height * cols);
        for mut row in rows {
            row.resize(cols, FormulaValue::Error(CellError::Na));
            values.extend(row);
        }
        Self::new(height, cols, values)
    }

    /// A single row
    pub fn row(values: Vec<FormulaValue>) -> Self {
        Self::new(1, values.len(), values)
    }

    /// A single column
    pub fn column(values: Vec<FormulaValue>) -> Self {
        Self::new(values.len(), 1, values)
    }

    /// Every cell holding a copy of `value`
    pub fn filled(rows: usize, cols: usize, value: FormulaValue) -> Self {
        Self::new(rows, cols, vec![value; rows * cols])
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 1x1 arrays behave as scalars
    pub fn is_single(&self) -> bool {
        self.rows == 1 && self.cols == 1
    }

    /// Value at a relative offset from the top-left corner
    pub fn get(&self, row: usize, col: usize) -> Option<&FormulaValue> {
        if row < self.rows && col < self.cols {
            self.values.get(row * self.cols + col)
        } else {
            None
        }
    }

    pub fn values(&self) -> &[FormulaValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<FormulaValue> {
        self.values
    }

    /// Iterate row by row
    pub fn iter_rows(&self) -> impl Iterator<Item = &[FormulaValue]> {
        self.values.chunks(self.cols.max(1))
    }

    /// Swap rows and columns
    pub fn transpose(&self) -> Self {
        let mut values = Vec::with_capacity(self.values.len());
        for c in 0..self.cols {
            for r in 0..self.rows {
                values.push(self.values[r * self.cols + c].clone());
            }
        }
        Self::new(self.cols, self.rows, values)
    }
}

impl fmt::Display for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (r, row) in self.iter_rows().enumerate() {
            if r > 0 {
                f.write_str(";")?;
            }
            for (c, value) in row.iter().enumerate() {
                if c > 0 {
                    f.write_str(",")?;
                }
                match value {
                    FormulaValue::String(s) => write!(f, "\"{}\"", s.replace('"', "\"\""))?,
                    other => write!(f, "{}", other)?,
                }
            }
        }
        f.write_str("}")
    }
}

/// A reference to one or more rectangular areas of a sheet
///
/// `sheet: None` means the sheet of the invoking cell. More than one area
/// models a union such as `(A1:A3,C1:C3)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Reference {
    pub sheet: Option<String>,
    pub areas: Vec<CellRange>,
}

impl Reference {
    /// Reference to a single area on the current sheet
    pub fn new(range: CellRange) -> Self {
        Self {
            sheet: None,
            areas: vec![range],
        }
    }

    /// Reference to one cell on the current sheet
    pub fn cell(row: u32, col: u16) -> Self {
        Self::new(CellRange::from_indices(row, col, row, col))
    }

    /// Several areas on one sheet
    pub fn union(areas: Vec<CellRange>) -> Self {
        Self { sheet: None, areas }
    }

    /// Pin the reference to a named sheet
    pub fn on_sheet<S: Into<String>>(mut self, sheet: S) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Parse `A1`, `A1:C3`, `Sheet2!B2:B9` or `'My Sheet'!A1`
    pub fn parse(text: &str) -> FormulaResult<Self> {
        let text = text.trim();
        let (sheet, area) = match text.rsplit_once('!') {
            Some((sheet, area)) => {
                let sheet = sheet.trim_matches('\'').replace("''", "'");
                (Some(sheet), area)
            }
            None => (None, text),
        };
        let range = CellRange::parse(area)
            .map_err(|e| FormulaError::InvalidReference(format!("{}: {}", text, e)))?;
        Ok(Self {
            sheet,
            areas: vec![range],
        })
    }

    /// The only area, if the reference is contiguous
    pub fn single_area(&self) -> Option<&CellRange> {
        match self.areas.as_slice() {
            [area] => Some(area),
            _ => None,
        }
    }

    pub fn is_single_cell(&self) -> bool {
        self.single_area().map_or(false, CellRange::is_single_cell)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet.replace('\'', "''"))?;
            }
        }
        let areas: Vec<String> = self.areas.iter().map(ToString::to_string).collect();
        if areas.len() == 1 {
            f.write_str(&areas[0])
        } else {
            write!(f, "({})", areas.join(","))
        }
    }
}
