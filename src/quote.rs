//! Live price and EPS lookup against the Alpha Vantage HTTP API.

use crate::error::QuoteError;
use crate::stock::normalize_ticker;
use crate::valuation::pe_ratio;
use futures::future::try_join;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::future::Future;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_API_KEY_VAR: &str = "ALPHA_VANTAGE_API_KEY";

// One connection pool for the whole process
static CLIENT: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

/// A normalized quote, ready to be merged into a portfolio entry.
#[derive(Debug, Clone, PartialEq)]
pub struct StockQuote {
    pub ticker: String,
    pub name: String,
    pub current_price: f64,
    pub eps: f64,
    pub current_pe: f64,
}

/// Anything that can turn a ticker into a [`StockQuote`].
pub trait QuoteProvider {
    fn fetch_quote(&self, ticker: &str) -> impl Future<Output = Result<StockQuote, QuoteError>> + Send;
}

#[derive(Debug, Clone)]
pub struct AlphaVantage {
    base_url: String,
    api_key_var: String,
}

impl Default for AlphaVantage {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_KEY_VAR)
    }
}

impl AlphaVantage {
    pub fn new(base_url: &str, api_key_var: &str) -> AlphaVantage {
        AlphaVantage {
            base_url: base_url.to_string(),
            api_key_var: api_key_var.to_string(),
        }
    }

    // The key is looked up on every call so it can be exported while the
    // dashboard is running
    fn api_key(&self) -> Result<String, QuoteError> {
        match std::env::var(&self.api_key_var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(QuoteError::Configuration(self.api_key_var.clone())),
        }
    }

    async fn query(&self, function: &str, ticker: &str, api_key: &str) -> Result<Value, QuoteError> {
        debug!(function, ticker, "requesting quote provider");
        let response = CLIENT
            .get(&self.base_url)
            .query(&[("function", function), ("symbol", ticker), ("apikey", api_key)])
            .send()
            .await
            .map_err(|e| QuoteError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QuoteError::Transport(format!(
                "{function} request for {ticker} failed: HTTP {}",
                response.status()
            )));
        }

        response.json::<Value>().await.map_err(|e| QuoteError::NotFound {
            ticker: ticker.to_string(),
            detail: format!("{function} response is not JSON: {e}"),
        })
    }
}

impl QuoteProvider for AlphaVantage {
    async fn fetch_quote(&self, ticker: &str) -> Result<StockQuote, QuoteError> {
        let ticker = normalize_ticker(ticker);
        let api_key = self.api_key()?;

        // Both payloads are needed, so both requests go out together and
        // the first failure wins
        let result = try_join(
            self.query("OVERVIEW", &ticker, &api_key),
            self.query("GLOBAL_QUOTE", &ticker, &api_key),
        )
        .await
        .and_then(|(overview, quote)| parse_quote(&ticker, &overview, &quote));

        if let Err(e) = &result {
            warn!(%ticker, error = %e, "quote fetch failed");
        }
        result
    }
}

/// Combines an OVERVIEW and a GLOBAL_QUOTE payload into a quote.
pub fn parse_quote(ticker: &str, overview: &Value, quote: &Value) -> Result<StockQuote, QuoteError> {
    let not_found = |detail: String| QuoteError::NotFound {
        ticker: ticker.to_string(),
        detail,
    };
    let bad_data = |detail: &str| QuoteError::DataQuality {
        ticker: ticker.to_string(),
        detail: detail.to_string(),
    };

    for payload in [overview, quote] {
        if let Some(notice) = provider_notice(payload) {
            return Err(not_found(notice));
        }
    }

    let overview = match overview.as_object() {
        Some(o) if !o.is_empty() => o,
        _ => return Err(not_found("no company overview".to_string())),
    };
    let global_quote = match quote.get("Global Quote").and_then(Value::as_object) {
        Some(q) if !q.is_empty() => q,
        _ => return Err(not_found("no global quote".to_string())),
    };

    let price = global_quote
        .get("05. price")
        .and_then(parse_number)
        .ok_or_else(|| bad_data("price is missing or not a number"))?;
    let eps = overview
        .get("EPS")
        .and_then(parse_number)
        .ok_or_else(|| bad_data("EPS is missing or not a number"))?;

    if price <= 0.0 {
        return Err(bad_data("price is not positive"));
    }
    if eps == 0.0 {
        return Err(bad_data("EPS is zero"));
    }

    let name = match overview.get("Name").and_then(Value::as_str) {
        Some(n) if !n.trim().is_empty() => n.trim().to_string(),
        _ => ticker.to_string(),
    };

    Ok(StockQuote {
        ticker: ticker.to_string(),
        name,
        current_price: price,
        eps,
        current_pe: pe_ratio(price, eps),
    })
}

// The provider answers rate limits and bad calls with 200 and a message
fn provider_notice(payload: &Value) -> Option<String> {
    ["Error Message", "Note", "Information"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .map(str::to_string)
}

// Alpha Vantage sends numbers as strings ("6.14", "None", "-")
fn parse_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}
