//! Shared models for the crypto aggregator.
//!
//! A `Model` is the merged, currency-complete price record for one instrument.
//! It is built once per fetch or merge and replaced wholesale on each refresh.

use crate::error::MoneyError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod layout;

pub use layout::{Component, ComponentModel, ComponentType, InstrumentId, Layout, DEFAULT_SYMBOL};

// ============================================================================
// Ticker & Currency
// ============================================================================

/// Upper-case instrument symbol (e.g. "BTC")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn new(symbol: &str) -> Self {
        Self(symbol.to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ticker {
    fn from(symbol: &str) -> Self {
        Self::new(symbol)
    }
}

/// Currencies every published `Model` must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Mxn,
}

impl Currency {
    /// Required currencies, in the order they are reported when missing
    pub const REQUIRED: [Currency; 2] = [Currency::Usd, Currency::Mxn];

    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Mxn => "MXN",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Money & Model
// ============================================================================

/// Price of one instrument in both supported currencies.
///
/// Both values are finite and non-negative. Use [`Money::new`] to build one
/// from untrusted vendor data.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Money {
    pub usd: f64,
    pub mxn: f64,
}

impl Money {
    pub fn new(usd: f64, mxn: f64) -> Result<Self, MoneyError> {
        validate_price(Currency::Usd, usd)?;
        validate_price(Currency::Mxn, mxn)?;
        Ok(Self { usd, mxn })
    }

    pub fn get(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.usd,
            Currency::Mxn => self.mxn,
        }
    }
}

fn validate_price(currency: Currency, value: f64) -> Result<(), MoneyError> {
    if !value.is_finite() {
        return Err(MoneyError::NotFinite { currency });
    }
    if value < 0.0 {
        return Err(MoneyError::Negative { currency, value });
    }
    Ok(())
}

/// Materialized snapshot for one instrument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub date: DateTime<Utc>,
    pub name: String,
    pub ticker_symbol: Ticker,
    pub price: Money,
}
