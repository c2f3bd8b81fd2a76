//! Workbook-level settings consulted during evaluation

/// Workbook-level settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (Mac)
    pub date_1904: bool,
    /// Number text conventions for TEXT, DOLLAR, NUMBERVALUE and text coercion
    pub locale: Locale,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self {
            date_1904: false,
            locale: Locale::default(),
        }
    }
}

/// Separators and currency symbol used when numbers meet text
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Locale {
    pub decimal_separator: char,
    pub group_separator: char,
    pub currency_symbol: String,
}

impl Locale {
    pub fn new(decimal_separator: char, group_separator: char, currency_symbol: &str) -> Self {
        Self {
            decimal_separator,
            group_separator,
            currency_symbol: currency_symbol.to_string(),
        }
    }

    /// `1,234.56` with a `$` currency symbol
    pub fn en_us() -> Self {
        Self::new('.', ',', "$")
    }

    /// `1.234,56` with a `€` currency symbol
    pub fn de_de() -> Self {
        Self::new(',', '.', "€")
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::en_us()
    }
}
