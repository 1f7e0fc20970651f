//! Domain errors.
//!
//! Vendor and provider calls return `anyhow::Result`; failures that callers
//! need to inspect (aggregation, money validation) are typed here.

use crate::models::{Currency, Ticker};
use std::fmt;
use thiserror::Error;

/// Invalid price coming from a vendor
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MoneyError {
    #[error("negative {currency} price: {value}")]
    Negative { currency: Currency, value: f64 },

    #[error("non-finite {currency} price")]
    NotFinite { currency: Currency },
}

/// One provider's failure for one ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderFailure {
    pub provider: String,
    pub message: String,
}

impl fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

/// Failure of an on-demand aggregation
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("no providers configured")]
    NoProviders,

    #[error("load layout: {0:#}")]
    LoadLayout(#[source] anyhow::Error),

    #[error("all providers failed for ticker={ticker}: {}", join_failures(.details))]
    AllProvidersFailed {
        ticker: Ticker,
        details: Vec<ProviderFailure>,
    },

    #[error("incomplete quote for {ticker} (missing {})", join_currencies(.missing))]
    IncompleteQuote {
        ticker: Ticker,
        missing: Vec<Currency>,
    },

    #[error("invalid price for {ticker}: {source}")]
    InvalidPrice {
        ticker: Ticker,
        #[source]
        source: MoneyError,
    },

    #[error("aggregation task for {ticker} did not complete: {message}")]
    TaskFailed { ticker: Ticker, message: String },

    #[error("hydrate layout: {}", join_errors(.0))]
    Hydrate(Vec<AggregateError>),
}

impl AggregateError {
    /// Stable machine-readable name of the variant
    pub fn kind(&self) -> &'static str {
        match self {
            AggregateError::NoProviders => "no_providers",
            AggregateError::LoadLayout(_) => "load_layout",
            AggregateError::AllProvidersFailed { .. } => "all_providers_failed",
            AggregateError::IncompleteQuote { .. } => "incomplete_quote",
            AggregateError::InvalidPrice { .. } => "invalid_price",
            AggregateError::TaskFailed { .. } => "task_failed",
            AggregateError::Hydrate(_) => "hydrate",
        }
    }

    /// Per-instrument causes; a single-element slice for leaf errors
    pub fn causes(&self) -> &[AggregateError] {
        match self {
            AggregateError::Hydrate(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

fn join_failures(details: &[ProviderFailure]) -> String {
    details
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" | ")
}

fn join_currencies(missing: &[Currency]) -> String {
    missing
        .iter()
        .map(Currency::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_errors(errors: &[AggregateError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
