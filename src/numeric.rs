use crate::schema::Cell;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum NumberParseError {
    #[error("empty cell")]
    Empty,

    #[error("'{0}' is not a number")]
    Invalid(String),

    #[error("'{0}' is not a finite number")]
    NonFinite(String),
}

/// Locale-tolerant numeric cell parser.
///
/// Holds the currency symbols to strip; the decimal-separator rule is fixed:
/// a string containing a comma is European (`.` groups thousands, `,` is the decimal
/// point), a string without one already uses `.` as the decimal point and is left as is.
#[derive(Debug, Clone)]
pub struct NumericNormalizer {
    currency_symbols: Vec<String>,
}

impl Default for NumericNormalizer {
    fn default() -> Self {
        Self::new(&["€".to_string(), "$".to_string(), "£".to_string()])
    }
}

impl NumericNormalizer {
    pub fn new(currency_symbols: &[String]) -> Self {
        Self {
            currency_symbols: currency_symbols
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
        }
    }

    pub fn try_parse(&self, cell: &Cell) -> Result<f64, NumberParseError> {
        match cell {
            Cell::Number(n) if n.is_finite() => Ok(*n),
            Cell::Number(n) => Err(NumberParseError::NonFinite(n.to_string())),
            Cell::Empty => Err(NumberParseError::Empty),
            Cell::Text(raw) => self.try_parse_str(raw),
        }
    }

    pub fn try_parse_str(&self, raw: &str) -> Result<f64, NumberParseError> {
        let mut s = raw.trim().to_string();
        if s.is_empty() {
            return Err(NumberParseError::Empty);
        }

        for symbol in &self.currency_symbols {
            s = s.replace(symbol.as_str(), "");
        }
        let mut s = s.trim().to_string();

        if s.contains(',') {
            s = s.replace('.', "").replace(',', ".");
        }

        let value: f64 = s
            .parse()
            .map_err(|_| NumberParseError::Invalid(raw.to_string()))?;

        // `f64::from_str` accepts "inf" and "NaN"
        if !value.is_finite() {
            return Err(NumberParseError::NonFinite(raw.to_string()));
        }

        Ok(value)
    }

    /// Degrading parse: any failure, including an empty cell, reads as `0.0`.
    pub fn parse(&self, cell: &Cell) -> f64 {
        self.try_parse(cell).unwrap_or(0.0)
    }
}

/// [`NumericNormalizer::parse`] with the default currency symbols.
pub fn parse_number(cell: &Cell) -> f64 {
    NumericNormalizer::default().parse(cell)
}
