//! Layout definitions consumed by the aggregator.

use crate::models::{Component, Layout};
use anyhow::Result;
use async_trait::async_trait;

/// Supplies the static instrument definitions
#[async_trait]
pub trait LayoutLoader: Send + Sync {
    async fn load(&self) -> Result<Layout>;
}

/// Loader returning a fixed set of rows
#[derive(Debug, Clone)]
pub struct StaticLayoutLoader {
    layout: Layout,
}

impl StaticLayoutLoader {
    pub fn new(layout: Layout) -> Self {
        Self { layout }
    }
}

impl Default for StaticLayoutLoader {
    /// BTC, ETH and XRP rows with ids 1..=3
    fn default() -> Self {
        Self::new(vec![
            Component::new(1, "crypto_btc"),
            Component::new(2, "crypto_eth"),
            Component::new(3, "crypto_xrp"),
        ])
    }
}

#[async_trait]
impl LayoutLoader for StaticLayoutLoader {
    async fn load(&self) -> Result<Layout> {
        Ok(self.layout.clone())
    }
}
