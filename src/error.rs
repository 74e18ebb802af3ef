//! Error types for pe_ratio_rs
//!
//! This module defines domain-specific error types that provide clear,
//! actionable error messages to users.

use thiserror::Error;

/// Validation errors for user input in the add forms and the table editor.
///
/// These errors are shown directly to users and should be clear and actionable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Please fill in all fields ({0} is missing)")]
    MissingField(&'static str),

    #[error("Invalid {field} format: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("EPS cannot be zero, the P/E ratio would be undefined")]
    ZeroEps,

    #[error("A quote is already being fetched, wait for it to finish")]
    FetchPending,
}

/// Failures of the quote provider.
///
/// None of these are fatal: they are surfaced to the user as a single
/// message and the portfolio stays as it was.
#[derive(Debug, Error)]
pub enum QuoteError {
    #[error("API key not found. Please set the {0} environment variable")]
    Configuration(String),

    #[error("Stock not found: {ticker} ({detail})")]
    NotFound { ticker: String, detail: String },

    #[error("Unable to fetch required stock data for {ticker}: {detail}")]
    DataQuality { ticker: String, detail: String },

    #[error("Failed to fetch stock data: {0}")]
    Transport(String),
}

/// Everything that can stop a live-quote addition.
#[derive(Debug, Error)]
pub enum AddStockError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Quote(#[from] QuoteError),
}
