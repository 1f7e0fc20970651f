//! Layout rows and component tag parsing.
//!
//! Rows are identified by a configured integer id and carry a component tag
//! such as `crypto_btc`. Only tags following the `crypto_<symbol>` convention
//! are ever priced; every other row is passed through untouched.

use super::{Model, Ticker};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Symbol used by the refresh cycle when a tag has no `_<symbol>` segment
pub const DEFAULT_SYMBOL: &str = "BTC";

const CRYPTO_PREFIX: &str = "crypto_";

/// Stable row identity assigned at configuration time
pub type InstrumentId = i64;

/// Component tag (e.g. "crypto_btc")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentType(String);

impl ComponentType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Strict parse: `crypto_<symbol>` with a non-empty symbol.
    ///
    /// Returns `None` for non-priced rows.
    pub fn ticker(&self) -> Option<Ticker> {
        let symbol = self.0.strip_prefix(CRYPTO_PREFIX)?;
        if symbol.is_empty() {
            return None;
        }
        Some(Ticker::new(symbol))
    }

    /// Lenient parse used by the poller: second `_` segment, upper-cased,
    /// or [`DEFAULT_SYMBOL`] when there is none.
    pub fn symbol_or_default(&self) -> Ticker {
        match self.0.split('_').nth(1) {
            Some(segment) => Ticker::new(segment),
            None => Ticker::new(DEFAULT_SYMBOL),
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// Payload carried by a row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum ComponentModel {
    /// Hydrated price record
    Priced(Model),
    /// Not hydrated yet (serialized as `null`)
    #[default]
    Empty,
    /// Payload of a non-priced row, kept verbatim
    Opaque(serde_json::Value),
}

impl ComponentModel {
    pub fn as_priced(&self) -> Option<&Model> {
        match self {
            ComponentModel::Priced(model) => Some(model),
            _ => None,
        }
    }
}

/// One row of the layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub id: InstrumentId,
    pub component: ComponentType,
    #[serde(default)]
    pub model: ComponentModel,
}

impl Component {
    pub fn new(id: InstrumentId, component: impl Into<String>) -> Self {
        Self {
            id,
            component: ComponentType::new(component),
            model: ComponentModel::Empty,
        }
    }
}

/// Ordered rows; order carries presentation meaning and is never reshuffled
pub type Layout = Vec<Component>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Money;
    use chrono::Utc;

    #[test]
    fn test_strict_ticker_parse() {
        assert_eq!(ComponentType::from("crypto_btc").ticker(), Some(Ticker::new("BTC")));
        assert_eq!(ComponentType::from("crypto_").ticker(), None);
        assert_eq!(ComponentType::from("news_feed").ticker(), None);
        assert_eq!(ComponentType::from("btc").ticker(), None);
    }

    #[test]
    fn test_lenient_symbol_parse() {
        assert_eq!(ComponentType::from("crypto_btc").symbol_or_default().as_str(), "BTC");
        assert_eq!(ComponentType::from("crypto_eth").symbol_or_default().as_str(), "ETH");
    }

    #[test]
    fn test_lenient_parse_without_underscore_falls_back() {
        assert_eq!(
            ComponentType::from("bitcoin").symbol_or_default().as_str(),
            DEFAULT_SYMBOL
        );
    }

    #[test]
    fn test_empty_model_serializes_as_null() {
        let component = Component::new(1, "crypto_btc");
        let json = serde_json::to_value(&component).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["component"], "crypto_btc");
        assert!(json["model"].is_null());
    }

    #[test]
    fn test_priced_model_round_trips_as_priced() {
        let model = Model {
            date: Utc::now(),
            name: "Ethereum".to_string(),
            ticker_symbol: Ticker::new("ETH"),
            price: Money::new(3000.0, 54000.0).unwrap(),
        };
        let component = Component {
            id: 2,
            component: ComponentType::from("crypto_eth"),
            model: ComponentModel::Priced(model.clone()),
        };

        let json = serde_json::to_string(&component).unwrap();
        let decoded: Component = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.model.as_priced(), Some(&model));
    }

    #[test]
    fn test_opaque_payload_is_kept() {
        let json = r#"{"id": 9, "component": "banner", "model": {"text": "hello"}}"#;
        let decoded: Component = serde_json::from_str(json).unwrap();
        assert_eq!(
            decoded.model,
            ComponentModel::Opaque(serde_json::json!({"text": "hello"}))
        );
    }
}
