//! Vendor and Quote Provider traits
//!
//! Two capabilities are consumed by the engine:
//! - `VendorClient`: full USD/MXN price for a symbol, used by the poller
//! - `QuoteProvider`: possibly-partial quote for a ticker, used by the aggregator
//!
//! Implementations include Bitso (live REST), Coinbase (USD only) and the
//! synthetic mock client.

use crate::models::{Currency, Money, Ticker};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Vendor-agnostic, possibly-partial price observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub ticker: Ticker,
    /// When the vendor observed this price
    pub time: DateTime<Utc>,
    /// Display name, if the vendor supplies one
    pub name: Option<String>,
    /// A vendor may supply only one currency
    pub prices: HashMap<Currency, f64>,
}

impl Quote {
    pub fn new(ticker: Ticker, time: DateTime<Utc>) -> Self {
        Self {
            ticker,
            time,
            name: None,
            prices: HashMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_price(mut self, currency: Currency, value: f64) -> Self {
        self.prices.insert(currency, value);
        self
    }

    pub fn price(&self, currency: Currency) -> Option<f64> {
        self.prices.get(&currency).copied()
    }
}

/// Price source used by the refresh cycle
///
/// Implementations must be Send + Sync; one instance is shared by every
/// concurrent fetch of a cycle.
#[async_trait]
pub trait VendorClient: Send + Sync {
    /// Vendor name as referenced by the layout configuration (e.g. "bitso")
    fn name(&self) -> &str;

    /// Get the current price of `symbol` (e.g. "BTC") in both currencies
    async fn get_price(&self, symbol: &str) -> Result<Money>;
}

/// Quote source used by the on-demand aggregator
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Get a quote for `ticker`; may carry only a subset of currencies
    async fn get_quote(&self, ticker: &Ticker) -> Result<Quote>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_builder() {
        let quote = Quote::new(Ticker::new("btc"), Utc::now())
            .with_name("Bitcoin")
            .with_price(Currency::Usd, 10.0);

        assert_eq!(quote.ticker.as_str(), "BTC");
        assert_eq!(quote.name.as_deref(), Some("Bitcoin"));
        assert_eq!(quote.price(Currency::Usd), Some(10.0));
        assert_eq!(quote.price(Currency::Mxn), None);
    }
}
