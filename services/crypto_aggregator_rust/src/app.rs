//! Client construction from configuration

use crate::config::Config;
use anyhow::{anyhow, Context, Result};
use crypto_aggregator_core::clients::{BitsoClient, CoinbaseClient, MockClient};
use crypto_aggregator_core::{
    Aggregator, LayoutStore, Poller, QuoteProvider, StaticLayoutLoader, VendorRegistry,
};
use std::sync::Arc;
use tracing::info;

/// Loaded poller vendors: Bitso plus the mock fallback
pub fn build_registry(config: &Config) -> Result<VendorRegistry> {
    let mut registry = VendorRegistry::with_mock();
    let bitso = BitsoClient::with_base_url(&config.bitso_base_url, config.vendor_timeout())
        .context("Failed to initialize Bitso vendor")?;
    registry.register(Arc::new(bitso));
    Ok(registry)
}

/// Quote providers in configured order; unknown names are a config error
pub fn build_providers(config: &Config) -> Result<Vec<Arc<dyn QuoteProvider>>> {
    config
        .quote_providers
        .iter()
        .map(|name| -> Result<Arc<dyn QuoteProvider>> {
            match name.as_str() {
                "bitso" => Ok(Arc::new(
                    BitsoClient::with_base_url(&config.bitso_base_url, config.vendor_timeout())
                        .context("Failed to initialize Bitso provider")?,
                )),
                "coinbase" => Ok(Arc::new(
                    CoinbaseClient::with_base_url(
                        &config.coinbase_base_url,
                        config.vendor_timeout(),
                    )
                    .context("Failed to initialize Coinbase provider")?,
                )),
                "mock" => Ok(Arc::new(MockClient::new())),
                other => Err(anyhow!("unknown quote provider '{}'", other)),
            }
        })
        .collect()
}

/// Store, poller and aggregator sharing one configured layout
pub struct Engine {
    pub store: Arc<LayoutStore>,
    pub poller: Arc<Poller>,
    pub aggregator: Arc<Aggregator>,
}

impl Engine {
    pub fn from_config(config: &Config) -> Result<Self> {
        let layout = config.layout_components();
        let store = Arc::new(LayoutStore::new(&layout));

        let poller = Poller::new(store.clone(), build_registry(config)?, config.vendor_map())
            .with_fetch_timeout(config.vendor_timeout());

        let providers = build_providers(config)?;
        info!(
            "Configured {} layout rows, {} quote providers",
            layout.len(),
            providers.len()
        );
        let aggregator = Aggregator::new(
            Arc::new(StaticLayoutLoader::new(layout)),
            providers,
            config.aggregate_timeout(),
        );

        Ok(Self {
            store,
            poller: Arc::new(poller),
            aggregator: Arc::new(aggregator),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_layout;

    fn config(providers: &[&str]) -> Config {
        Config {
            server_port: 0,
            refresh_interval_secs: 5,
            vendor_timeout_secs: 3,
            aggregate_timeout_ms: 2000,
            quote_providers: providers.iter().map(|s| s.to_string()).collect(),
            bitso_base_url: "http://127.0.0.1:1".to_string(),
            coinbase_base_url: "http://127.0.0.1:1".to_string(),
            layout: parse_layout("1:crypto_btc:bitso,2:crypto_eth:mock").unwrap(),
        }
    }

    #[test]
    fn test_registry_has_bitso_and_mock() {
        let registry = build_registry(&config(&[])).unwrap();
        assert!(registry.resolve("bitso").is_some());
        assert!(registry.resolve("mock").is_some());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_providers_keep_configured_order() {
        let providers = build_providers(&config(&["coinbase", "mock", "bitso"])).unwrap();
        let names: Vec<_> = providers.iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["coinbase", "mock", "bitso"]);
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = build_providers(&config(&["kraken"])).err().unwrap();
        assert!(err.to_string().contains("kraken"));
    }

    #[test]
    fn test_engine_shares_layout() {
        let engine = Engine::from_config(&config(&["mock"])).unwrap();
        assert_eq!(engine.store.len(), 2);
        assert_eq!(engine.aggregator.provider_names(), vec!["mock"]);
    }
}
