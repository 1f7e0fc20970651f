//! Configuration for crypto_aggregator_rust

use anyhow::{anyhow, Context, Result};
use crypto_aggregator_core::clients::{bitso, coinbase};
use crypto_aggregator_core::{Component, InstrumentId};
use std::collections::{HashMap, HashSet};
use std::env;
use std::time::Duration;

const DEFAULT_LAYOUT: &str = "1:crypto_btc:bitso,2:crypto_eth:mock,3:crypto_xrp:bitso";
const DEFAULT_QUOTE_PROVIDERS: &str = "bitso,coinbase";

/// One configured layout row: `id:component:vendor`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutItemConfig {
    pub id: InstrumentId,
    pub component: String,
    pub vendor: String,
}

impl LayoutItemConfig {
    pub fn parse(item: &str) -> Result<Self> {
        let parts: Vec<&str> = item.split(':').map(str::trim).collect();
        let [id, component, vendor] = parts.as_slice() else {
            return Err(anyhow!(
                "layout item '{}' must be id:component:vendor",
                item
            ));
        };

        let id = id
            .parse()
            .with_context(|| format!("layout item '{}' has an invalid id", item))?;
        if component.is_empty() || vendor.is_empty() {
            return Err(anyhow!("layout item '{}' has an empty field", item));
        }

        Ok(Self {
            id,
            component: component.to_string(),
            vendor: vendor.to_lowercase(),
        })
    }

    pub fn to_domain(&self) -> Component {
        Component::new(self.id, self.component.as_str())
    }
}

/// Parse a comma separated list of layout items; ids must be unique
pub fn parse_layout(raw: &str) -> Result<Vec<LayoutItemConfig>> {
    let items = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(LayoutItemConfig::parse)
        .collect::<Result<Vec<_>>>()?;

    let mut seen = HashSet::new();
    for item in &items {
        if !seen.insert(item.id) {
            return Err(anyhow!("duplicate layout id {}", item.id));
        }
    }

    Ok(items)
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Clone)]
pub struct Config {
    // HTTP
    pub server_port: u16,

    // Refresh cycle
    pub refresh_interval_secs: u64,
    pub vendor_timeout_secs: u64,

    // Aggregator
    pub aggregate_timeout_ms: u64,
    pub quote_providers: Vec<String>,

    // Vendors
    pub bitso_base_url: String,
    pub coinbase_base_url: String,

    pub layout: Vec<LayoutItemConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let refresh_interval_secs = parse_u64("REFRESH_INTERVAL_SECS", 5)?;
        let vendor_timeout_secs = parse_u64("VENDOR_TIMEOUT_SECS", 3)?;

        if refresh_interval_secs == 0 {
            return Err(anyhow!("REFRESH_INTERVAL_SECS must be > 0"));
        }
        if vendor_timeout_secs == 0 {
            return Err(anyhow!("VENDOR_TIMEOUT_SECS must be > 0"));
        }

        let layout = parse_layout(
            &env::var("CRYPTO_LAYOUT").unwrap_or_else(|_| DEFAULT_LAYOUT.to_string()),
        )
        .context("CRYPTO_LAYOUT")?;

        Ok(Self {
            server_port: parse_u16("SERVER_PORT", 3000)?,

            refresh_interval_secs,
            vendor_timeout_secs,

            aggregate_timeout_ms: parse_u64("AGGREGATE_TIMEOUT_MS", 2000)?,
            quote_providers: parse_list(
                &env::var("QUOTE_PROVIDERS")
                    .unwrap_or_else(|_| DEFAULT_QUOTE_PROVIDERS.to_string()),
            ),

            bitso_base_url: env::var("BITSO_BASE_URL")
                .unwrap_or_else(|_| bitso::BASE_URL.to_string()),
            coinbase_base_url: env::var("COINBASE_BASE_URL")
                .unwrap_or_else(|_| coinbase::BASE_URL.to_string()),

            layout,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn vendor_timeout(&self) -> Duration {
        Duration::from_secs(self.vendor_timeout_secs)
    }

    pub fn aggregate_timeout(&self) -> Duration {
        Duration::from_millis(self.aggregate_timeout_ms)
    }

    /// Rows in configured order
    pub fn layout_components(&self) -> Vec<Component> {
        self.layout.iter().map(LayoutItemConfig::to_domain).collect()
    }

    /// Row id -> vendor name
    pub fn vendor_map(&self) -> HashMap<InstrumentId, String> {
        self.layout
            .iter()
            .map(|item| (item.id, item.vendor.clone()))
            .collect()
    }
}

/// Parse environment variable as u16 with default fallback
fn parse_u16(var_name: &str, default: u16) -> Result<u16> {
    match env::var(var_name) {
        Ok(val) => val.parse().map_err(|_| anyhow!("{} must be a valid u16", var_name)),
        Err(_) => Ok(default),
    }
}

/// Parse environment variable as u64 with default fallback
fn parse_u64(var_name: &str, default: u64) -> Result<u64> {
    match env::var(var_name) {
        Ok(val) => val.parse().map_err(|_| anyhow!("{} must be a valid u64", var_name)),
        Err(_) => Ok(default),
    }
}
