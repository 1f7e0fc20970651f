//! Bitso Exchange API Client
//!
//! Public ticker endpoint, no API key required. Bitso books are named
//! `<symbol>_<currency>` in lower case (e.g. `btc_mxn`).
//!
//! MXN is native to Bitso. USD books only exist for major coins, so a missing
//! USD book is approximated from the MXN price.

use super::vendor::{Quote, QuoteProvider, VendorClient};
use crate::models::{Currency, Money, Ticker};
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

pub const BASE_URL: &str = "https://api.bitso.com";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Approximate MXN per USD, used when a coin has no USD book
const MXN_PER_USD_FALLBACK: f64 = 20.0;

#[derive(Debug, Deserialize)]
struct BitsoTickerResponse {
    #[serde(default)]
    success: bool,
    payload: BitsoTicker,
}

#[derive(Debug, Deserialize)]
struct BitsoTicker {
    last: String,
    #[serde(default)]
    created_at: Option<String>,
}

/// Bitso REST client implementing both engine capabilities
pub struct BitsoClient {
    client: Client,
    base_url: String,
}

impl BitsoClient {
    /// Create a client against the public Bitso API
    pub fn new() -> Result<Self> {
        Self::with_base_url(BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Create a client against a custom base URL (staging, tests)
    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("CryptoAggregator/1.0")
            .build()
            .context("Failed to create Bitso HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn book(symbol: &str, currency: Currency) -> String {
        format!(
            "{}_{}",
            symbol.to_lowercase(),
            currency.as_str().to_lowercase()
        )
    }

    async fn fetch_book(&self, book: &str) -> Result<BitsoTicker> {
        let url = format!("{}/v3/ticker/", self.base_url);

        debug!("Fetching {} from Bitso", book);

        let response = self
            .client
            .get(&url)
            .query(&[("book", book)])
            .send()
            .await
            .with_context(|| format!("Failed to fetch {} from Bitso", book))?;

        if !response.status().is_success() {
            return Err(anyhow!("bitso api status {}", response.status().as_u16()));
        }

        let body: BitsoTickerResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse Bitso ticker for {}", book))?;

        if !body.success {
            bail!("bitso response success=false for {}", book);
        }

        Ok(body.payload)
    }

    async fn fetch_last(&self, book: &str) -> Result<f64> {
        let ticker = self.fetch_book(book).await?;
        parse_last(&ticker.last)
    }
}

fn parse_last(last: &str) -> Result<f64> {
    last.trim()
        .parse::<f64>()
        .with_context(|| format!("parse last {:?}", last))
}

#[async_trait]
impl VendorClient for BitsoClient {
    fn name(&self) -> &str {
        "bitso"
    }

    async fn get_price(&self, symbol: &str) -> Result<Money> {
        let mxn = self.fetch_last(&Self::book(symbol, Currency::Mxn)).await?;

        let usd = match self.fetch_last(&Self::book(symbol, Currency::Usd)).await {
            Ok(usd) => usd,
            Err(e) => {
                warn!(
                    "Bitso USD book unavailable for {}, estimating from MXN: {:#}",
                    symbol, e
                );
                mxn / MXN_PER_USD_FALLBACK
            }
        };

        Ok(Money::new(usd, mxn)?)
    }
}

#[async_trait]
impl QuoteProvider for BitsoClient {
    fn name(&self) -> &str {
        "bitso"
    }

    async fn get_quote(&self, ticker: &Ticker) -> Result<Quote> {
        let payload = self
            .fetch_book(&Self::book(ticker.as_str(), Currency::Mxn))
            .await?;
        let mxn = parse_last(&payload.last)?;

        let time = payload
            .created_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(Quote::new(ticker.clone(), time).with_price(Currency::Mxn, mxn))
    }
}
