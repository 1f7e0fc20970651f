//! Coinbase Exchange API Client
//!
//! USD spot quotes from the public ticker endpoint. No API key required.
//! Every call goes to the exchange; quotes are never reused.

use super::vendor::{Quote, QuoteProvider};
use crate::models::{Currency, Ticker};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub const BASE_URL: &str = "https://api.exchange.coinbase.com";

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    price: String,
    #[serde(default)]
    time: Option<String>,
}

/// Coinbase Exchange client implementing QuoteProvider (USD only)
pub struct CoinbaseClient {
    client: Client,
    base_url: String,
}

impl CoinbaseClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL, Duration::from_secs(10))
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("CryptoAggregator/1.0")
            .build()
            .context("Failed to create Coinbase HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// BTC -> BTC-USD
    fn product_id(ticker: &Ticker) -> String {
        format!("{}-USD", ticker)
    }
}

#[async_trait]
impl QuoteProvider for CoinbaseClient {
    fn name(&self) -> &str {
        "coinbase"
    }

    async fn get_quote(&self, ticker: &Ticker) -> Result<Quote> {
        let product_id = Self::product_id(ticker);
        let url = format!("{}/products/{}/ticker", self.base_url, product_id);

        debug!("Fetching {} from Coinbase", product_id);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} from Coinbase", product_id))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("coinbase api status {}: {}", status.as_u16(), body.trim()));
        }

        let payload: CoinbaseTicker = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Coinbase ticker for {}", product_id))?;

        let usd: f64 = payload
            .price
            .trim()
            .parse()
            .with_context(|| format!("parse price {:?}", payload.price))?;

        let time = payload
            .time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Quote::new(ticker.clone(), time).with_price(Currency::Usd, usd))
    }
}
