//! Synthetic vendor.
//!
//! Deterministic base price per known symbol plus a jitter in `[0, 1)`.
//! Registered as the fallback vendor when a configured vendor is not loaded.

use super::vendor::{Quote, QuoteProvider, VendorClient};
use crate::models::{Currency, Money, Ticker};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;

pub const MOCK_VENDOR: &str = "mock";

const MXN_PER_USD: f64 = 20.0;

#[derive(Debug, Clone, Copy, Default)]
pub struct MockClient;

impl MockClient {
    pub fn new() -> Self {
        Self
    }

    pub fn base_price(symbol: &str) -> f64 {
        match symbol.to_uppercase().as_str() {
            "BTC" => 10_000.0,
            "ETH" => 100.0,
            "XRP" | "DOGE" => 0.2,
            _ => 100.0,
        }
    }

    fn sample(symbol: &str) -> Result<Money> {
        let base = Self::base_price(symbol);
        let mut rng = rand::thread_rng();
        let usd = base + rng.gen::<f64>();
        let mxn = base * MXN_PER_USD + rng.gen::<f64>();
        Ok(Money::new(usd, mxn)?)
    }
}

#[async_trait]
impl VendorClient for MockClient {
    fn name(&self) -> &str {
        MOCK_VENDOR
    }

    async fn get_price(&self, symbol: &str) -> Result<Money> {
        Self::sample(symbol)
    }
}

#[async_trait]
impl QuoteProvider for MockClient {
    fn name(&self) -> &str {
        MOCK_VENDOR
    }

    async fn get_quote(&self, ticker: &Ticker) -> Result<Quote> {
        let money = Self::sample(ticker.as_str())?;
        Ok(Quote::new(ticker.clone(), Utc::now())
            .with_price(Currency::Usd, money.usd)
            .with_price(Currency::Mxn, money.mxn))
    }
}
