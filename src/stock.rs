use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier handed out by the portfolio when an entry is admitted.
/// Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockId(pub u64);

impl fmt::Display for StockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockEntry {
    id: StockId,
    ticker: String,
    name: String,
    current_price: f64,
    eps: f64,
    #[serde(rename = "currentPE")]
    current_pe: Option<f64>,
    #[serde(rename = "targetPE")]
    target_pe: f64,
}

impl StockEntry {
    /// Builds an entry from already validated values. The ticker is
    /// normalized here so every stored entry carries an uppercase symbol.
    pub fn new(
        id: StockId,
        ticker: &str,
        name: &str,
        current_price: f64,
        eps: f64,
        current_pe: Option<f64>,
        target_pe: f64,
    ) -> StockEntry {
        StockEntry {
            id,
            ticker: normalize_ticker(ticker),
            name: name.to_string(),
            current_price,
            eps,
            current_pe,
            target_pe,
        }
    }

    pub fn get_id(&self) -> StockId {
        self.id
    }

    pub fn get_ticker(&self) -> &str {
        &self.ticker
    }

    pub fn get_name(&self) -> &str {
        &self.name
    }

    pub fn get_current_price(&self) -> f64 {
        self.current_price
    }

    pub fn get_eps(&self) -> f64 {
        self.eps
    }

    /// The stored P/E, if one was supplied. Use
    /// [`crate::valuation::resolve_current_pe`] for the effective value.
    pub fn get_current_pe(&self) -> Option<f64> {
        self.current_pe
    }

    pub fn get_target_pe(&self) -> f64 {
        self.target_pe
    }

    pub(crate) fn set_target_pe(&mut self, target_pe: f64) {
        self.target_pe = target_pe;
    }
}

pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_is_stored_uppercase() {
        let entry = StockEntry::new(StockId(1), " aapl ", "Apple Inc.", 175.5, 6.14, None, 25.0);
        assert_eq!(entry.get_ticker(), "AAPL");
    }

    #[test]
    fn test_serializes_with_camel_case_keys() {
        let entry = StockEntry::new(StockId(7), "MSFT", "Microsoft Corp.", 390.27, 11.02, Some(35.42), 30.0);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["currentPrice"], 390.27);
        assert_eq!(json["currentPE"], 35.42);
        assert_eq!(json["targetPE"], 30.0);
    }
}
