//! Price/earnings arithmetic.
//!
//! Everything here is a pure function of an entry's price, EPS and target
//! multiple. Values keep full precision; [`round2`] is only for display.

use crate::stock::StockEntry;

/// The supplied P/E if the entry carries one, otherwise price / EPS.
///
/// A zero EPS yields an infinite (or NaN) ratio. The portfolio refuses such
/// entries on admission, so this only happens for hand-built entries.
pub fn resolve_current_pe(entry: &StockEntry) -> f64 {
    match entry.get_current_pe() {
        Some(pe) => pe,
        None => pe_ratio(entry.get_current_price(), entry.get_eps()),
    }
}

pub fn pe_ratio(price: f64, eps: f64) -> f64 {
    price / eps
}

pub fn target_price(entry: &StockEntry) -> f64 {
    entry.get_eps() * entry.get_target_pe()
}

pub fn price_change_percent(entry: &StockEntry) -> f64 {
    let price = entry.get_current_price();
    (target_price(entry) - price) / price * 100.0
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Visual treatment of an implied price change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outlook {
    Gain,
    Loss,
    Neutral,
}

impl Outlook {
    /// Classifies on the rounded value so the treatment matches the
    /// printed number ("-0.00%" is neutral, not a loss).
    pub fn of(price_change: f64) -> Outlook {
        let shown = round2(price_change);
        if shown > 0.0 {
            Outlook::Gain
        } else if shown < 0.0 {
            Outlook::Loss
        } else {
            Outlook::Neutral
        }
    }
}

/// Derived fields of one entry, recomputed on every read.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Valuation {
    pub current_pe: f64,
    pub target_price: f64,
    pub price_change: f64,
}

impl Valuation {
    pub fn of(entry: &StockEntry) -> Valuation {
        Valuation {
            current_pe: resolve_current_pe(entry),
            target_price: target_price(entry),
            price_change: price_change_percent(entry),
        }
    }

    pub fn outlook(&self) -> Outlook {
        Outlook::of(self.price_change)
    }
}

/// Formats a ratio or price for a table cell. Non-finite values show as "-".
pub fn format_value(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}")
    } else {
        "-".to_string()
    }
}

pub fn format_price(value: f64) -> String {
    if value.is_finite() {
        format!("${value:.2}")
    } else {
        "-".to_string()
    }
}

pub fn format_percent(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.2}%")
    } else {
        "-".to_string()
    }
}
