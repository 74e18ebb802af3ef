//! Text state behind the two add forms.
//!
//! Fields are kept as the raw strings the user typed; parsing happens when
//! the portfolio admits the form.

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Ticker,
    Name,
    CurrentPrice,
    Eps,
    TargetPe,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Ticker => "Ticker",
            Field::Name => "Company Name",
            Field::CurrentPrice => "Current Price",
            Field::Eps => "EPS",
            Field::TargetPe => "Target P/E",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Field::Ticker => "AAPL",
            Field::Name => "Apple Inc.",
            Field::CurrentPrice => "175.50",
            Field::Eps => "6.14",
            Field::TargetPe => "25",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, Field::CurrentPrice | Field::Eps | Field::TargetPe)
    }
}

/// Full manual entry: every value typed by hand.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ManualForm {
    pub ticker: String,
    pub name: String,
    pub current_price: String,
    pub eps: String,
    pub target_pe: String,
}

/// Live entry: the quote provider fills in name, price and EPS.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteForm {
    pub ticker: String,
    pub target_pe: String,
}

/// Shared editing behaviour of both forms.
pub trait StockForm {
    fn fields(&self) -> &'static [Field];
    fn value(&self, field: Field) -> &str;
    fn value_mut(&mut self, field: Field) -> Option<&mut String>;
    fn clear(&mut self);

    /// Appends a typed character, filtering what the field cannot hold.
    fn push_char(&mut self, field: Field, c: char) {
        let Some(value) = self.value_mut(field) else {
            return;
        };
        match field {
            Field::Ticker => {
                if !c.is_whitespace() {
                    value.extend(c.to_uppercase());
                }
            }
            Field::Name => value.push(c),
            _ if field.is_numeric() => {
                let accept = c.is_ascii_digit()
                    || (c == '.' && !value.contains('.'))
                    || (c == '-' && field == Field::Eps && value.is_empty());
                if accept {
                    value.push(c);
                }
            }
            _ => {}
        }
    }

    fn pop_char(&mut self, field: Field) {
        if let Some(value) = self.value_mut(field) {
            value.pop();
        }
    }

    fn is_blank(&self) -> bool {
        self.fields().iter().all(|f| self.value(*f).trim().is_empty())
    }
}

impl StockForm for ManualForm {
    fn fields(&self) -> &'static [Field] {
        &[
            Field::Ticker,
            Field::Name,
            Field::CurrentPrice,
            Field::Eps,
            Field::TargetPe,
        ]
    }

    fn value(&self, field: Field) -> &str {
        match field {
            Field::Ticker => &self.ticker,
            Field::Name => &self.name,
            Field::CurrentPrice => &self.current_price,
            Field::Eps => &self.eps,
            Field::TargetPe => &self.target_pe,
        }
    }

    fn value_mut(&mut self, field: Field) -> Option<&mut String> {
        Some(match field {
            Field::Ticker => &mut self.ticker,
            Field::Name => &mut self.name,
            Field::CurrentPrice => &mut self.current_price,
            Field::Eps => &mut self.eps,
            Field::TargetPe => &mut self.target_pe,
        })
    }

    fn clear(&mut self) {
        *self = ManualForm::default();
    }
}

impl StockForm for QuoteForm {
    fn fields(&self) -> &'static [Field] {
        &[Field::Ticker, Field::TargetPe]
    }

    fn value(&self, field: Field) -> &str {
        match field {
            Field::Ticker => &self.ticker,
            Field::TargetPe => &self.target_pe,
            _ => "",
        }
    }

    fn value_mut(&mut self, field: Field) -> Option<&mut String> {
        match field {
            Field::Ticker => Some(&mut self.ticker),
            Field::TargetPe => Some(&mut self.target_pe),
            _ => None,
        }
    }

    fn clear(&mut self) {
        *self = QuoteForm::default();
    }
}

pub(crate) fn required<'a>(field: Field, value: &'a str) -> Result<&'a str, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(field.label()))
    } else {
        Ok(value)
    }
}

/// Parses a numeric field. `inf` and `NaN` parse as floats but are not
/// admitted.
pub(crate) fn parse_number(field: Field, value: &str) -> Result<f64, ValidationError> {
    let value = required(field, value)?;
    match value.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(n),
        _ => Err(ValidationError::InvalidNumber {
            field: field.label(),
            value: value.to_string(),
        }),
    }
}

pub(crate) fn parse_positive(field: Field, value: &str) -> Result<f64, ValidationError> {
    let n = parse_number(field, value)?;
    if n > 0.0 {
        Ok(n)
    } else {
        Err(ValidationError::NonPositive {
            field: field.label(),
            value: n,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_input_is_uppercased() {
        let mut form = QuoteForm::default();
        for c in "msft".chars() {
            form.push_char(Field::Ticker, c);
        }
        assert_eq!(form.ticker, "MSFT");
    }

    #[test]
    fn test_numeric_fields_filter_input() {
        let mut form = ManualForm::default();
        for c in "-1a2.5.0".chars() {
            form.push_char(Field::Eps, c);
        }
        assert_eq!(form.eps, "-12.50");

        for c in "-30".chars() {
            form.push_char(Field::TargetPe, c);
        }
        assert_eq!(form.target_pe, "30");
    }

    #[test]
    fn test_quote_form_ignores_manual_only_fields() {
        let mut form = QuoteForm::default();
        form.push_char(Field::Name, 'x');
        assert!(form.is_blank());
        assert_eq!(form.value(Field::Name), "");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut form = ManualForm {
            ticker: "AAPL".into(),
            name: "Apple Inc.".into(),
            current_price: "175.5".into(),
            eps: "6.14".into(),
            target_pe: "25".into(),
        };
        form.pop_char(Field::TargetPe);
        assert_eq!(form.target_pe, "2");
        form.clear();
        assert!(form.is_blank());
    }

    #[test]
    fn test_parse_number_rejects_non_finite() {
        assert!(matches!(
            parse_number(Field::Eps, "inf"),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert!(matches!(
            parse_number(Field::Eps, "NaN"),
            Err(ValidationError::InvalidNumber { .. })
        ));
        assert_eq!(parse_number(Field::Eps, " -2.5 "), Ok(-2.5));
        assert_eq!(
            parse_number(Field::Eps, "  "),
            Err(ValidationError::MissingField("EPS"))
        );
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(Field::TargetPe, "25"), Ok(25.0));
        assert!(matches!(
            parse_positive(Field::TargetPe, "0"),
            Err(ValidationError::NonPositive { .. })
        ));
    }
}
