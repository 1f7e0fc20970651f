//! Refresh cycle: timer-driven polling of each row's configured vendor.
//!
//! Each tick takes a snapshot of the store, dispatches one fetch task per row
//! and waits for all of them before the next tick can start. A failed row
//! keeps its previous model; it never fails the cycle.

use crate::clients::{VendorClient, VendorRegistry};
use crate::models::{InstrumentId, Model, Ticker};
use crate::store::LayoutStore;
use crate::telemetry;
use chrono::Utc;
use futures_util::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome counts of one refresh cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Rows whose model was replaced
    pub updated: usize,
    /// Rows whose fetch failed; previous model kept
    pub failed: usize,
    /// Rows without a resolvable vendor
    pub skipped: usize,
}

enum RowOutcome {
    Updated,
    Failed,
}

pub struct Poller {
    store: Arc<LayoutStore>,
    vendors: VendorRegistry,
    /// Row id -> vendor name
    vendor_map: HashMap<InstrumentId, String>,
    fetch_timeout: Duration,
    completed_cycles: AtomicU64,
}

impl Poller {
    pub fn new(
        store: Arc<LayoutStore>,
        vendors: VendorRegistry,
        vendor_map: HashMap<InstrumentId, String>,
    ) -> Self {
        Self {
            store,
            vendors,
            vendor_map,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            completed_cycles: AtomicU64::new(0),
        }
    }

    /// Bound on a single vendor call
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<LayoutStore> {
        &self.store
    }

    /// Refresh cycles that ran to completion
    pub fn completed_cycles(&self) -> u64 {
        self.completed_cycles.load(Ordering::Acquire)
    }

    /// Run refresh cycles every `interval` until `shutdown` flips to true or
    /// its sender is dropped.
    ///
    /// The first cycle runs immediately. Shutdown is observed while a cycle
    /// is in flight as well; already dispatched fetch tasks are detached and
    /// finish on their own.
    pub async fn run(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        info!("Starting poller service (interval: {:?})", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                _ = ticker.tick() => {}
            }

            tokio::select! {
                biased;
                _ = shutdown_requested(&mut shutdown) => break,
                report = self.refresh() => {
                    info!(
                        "Refresh cycle done: {} updated, {} failed, {} skipped",
                        report.updated, report.failed, report.skipped
                    );
                }
            }
        }

        info!("Poller stopped");
    }

    /// Run a single refresh cycle and wait for every dispatched fetch
    pub async fn refresh(&self) -> CycleReport {
        let layout = self.store.snapshot();
        info!("Refreshing layout (size: {})", layout.len());

        let mut report = CycleReport::default();
        let mut tasks = Vec::with_capacity(layout.len());

        for (index, component) in layout.iter().enumerate() {
            let vendor_name = match self.vendor_map.get(&component.id) {
                Some(name) => name,
                None => {
                    warn!("No vendor configured for component {}", component.id);
                    report.skipped += 1;
                    continue;
                }
            };

            let client = match self.vendors.resolve_or_fallback(vendor_name) {
                Some(client) => client,
                None => {
                    warn!(
                        "Vendor {} not loaded and no {} fallback for component {}",
                        vendor_name,
                        self.vendors.fallback_name(),
                        component.id
                    );
                    report.skipped += 1;
                    continue;
                }
            };

            if client.name() != vendor_name {
                debug!(
                    "Vendor {} not loaded, component {} uses {}",
                    vendor_name,
                    component.id,
                    client.name()
                );
            }

            let symbol = component.component.symbol_or_default();
            let store = Arc::clone(&self.store);
            let timeout = self.fetch_timeout;

            tasks.push(tokio::spawn(async move {
                fetch_row(store, index, symbol, client, timeout).await
            }));
        }

        for result in join_all(tasks).await {
            match result {
                Ok(RowOutcome::Updated) => report.updated += 1,
                Ok(RowOutcome::Failed) => report.failed += 1,
                Err(e) => {
                    error!("Fetch task aborted: {}", e);
                    report.failed += 1;
                }
            }
        }

        telemetry::record_cycle(&report);
        self.completed_cycles.fetch_add(1, Ordering::Release);
        report
    }
}

/// Resolves once `shutdown` holds true or its sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn fetch_row(
    store: Arc<LayoutStore>,
    index: usize,
    symbol: Ticker,
    client: Arc<dyn VendorClient>,
    timeout: Duration,
) -> RowOutcome {
    let result = match tokio::time::timeout(timeout, client.get_price(symbol.as_str())).await {
        Ok(result) => result,
        Err(_) => Err(anyhow::anyhow!(
            "timed out after {}ms",
            timeout.as_millis()
        )),
    };

    match result {
        Ok(price) => {
            debug!(
                "Got price for {} from {} (${:.2})",
                symbol,
                client.name(),
                price.usd
            );
            let model = Model {
                date: Utc::now(),
                name: symbol.to_string(),
                ticker_symbol: symbol,
                price,
            };
            store.update_at(index, model);
            RowOutcome::Updated
        }
        Err(e) => {
            error!(
                symbol = %symbol,
                vendor = client.name(),
                "Failed to fetch price: {:#}",
                e
            );
            RowOutcome::Failed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::MOCK_VENDOR;
    use crate::models::{Component, ComponentModel, Money};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Vendor returning a fixed price, or failing for listed symbols
    struct ScriptedVendor {
        name: &'static str,
        usd: f64,
        failing: Vec<&'static str>,
        seen: Mutex<Vec<String>>,
    }

    impl ScriptedVendor {
        fn new(name: &'static str, usd: f64) -> Self {
            Self {
                name,
                usd,
                failing: Vec::new(),
                seen: Mutex::new(Vec::new()),
            }
        }

        fn failing_on(mut self, symbol: &'static str) -> Self {
            self.failing.push(symbol);
            self
        }
    }

    #[async_trait]
    impl VendorClient for ScriptedVendor {
        fn name(&self) -> &str {
            self.name
        }

        async fn get_price(&self, symbol: &str) -> Result<Money> {
            self.seen.lock().push(symbol.to_string());
            if self.failing.iter().any(|s| *s == symbol) {
                return Err(anyhow!("vendor down"));
            }
            Ok(Money::new(self.usd, self.usd * 20.0)?)
        }
    }

    struct SlowVendor(Duration);

    #[async_trait]
    impl VendorClient for SlowVendor {
        fn name(&self) -> &str {
            "slow"
        }

        async fn get_price(&self, _symbol: &str) -> Result<Money> {
            tokio::time::sleep(self.0).await;
            Ok(Money::new(1.0, 20.0)?)
        }
    }

    /// Sleeping vendor tracking how many fetches overlap
    struct InFlightVendor {
        delay: Duration,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    impl InFlightVendor {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl VendorClient for InFlightVendor {
        fn name(&self) -> &str {
            "bitso"
        }

        async fn get_price(&self, _symbol: &str) -> Result<Money> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(Money::new(1.0, 20.0)?)
        }
    }

    fn prior_model(symbol: &str) -> Model {
        Model {
            date: Utc::now(),
            name: symbol.to_string(),
            ticker_symbol: Ticker::new(symbol),
            price: Money::new(1.0, 2.0).unwrap(),
        }
    }

    fn two_row_store() -> Arc<LayoutStore> {
        Arc::new(LayoutStore::new(&[
            Component::new(1, "crypto_btc"),
            Component::new(2, "crypto_eth"),
        ]))
    }

    fn vendor_map(entries: &[(InstrumentId, &str)]) -> HashMap<InstrumentId, String> {
        entries
            .iter()
            .map(|(id, name)| (*id, name.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_failed_row_keeps_prior_model() {
        let store = two_row_store();
        store.update_at(0, prior_model("BTC"));

        let mut vendors = VendorRegistry::new();
        vendors.register(Arc::new(ScriptedVendor::new("bitso", 50.0).failing_on("BTC")));

        let poller = Poller::new(
            Arc::clone(&store),
            vendors,
            vendor_map(&[(1, "bitso"), (2, "bitso")]),
        );
        let report = poller.refresh().await;

        assert_eq!(
            report,
            CycleReport {
                updated: 1,
                failed: 1,
                skipped: 0
            }
        );

        let snapshot = store.snapshot();
        let btc = snapshot[0].model.as_priced().unwrap();
        assert_eq!(btc.price.usd, 1.0);
        assert_eq!(btc.price.mxn, 2.0);

        let eth = snapshot[1].model.as_priced().unwrap();
        assert_eq!(eth.ticker_symbol.as_str(), "ETH");
        assert_eq!(eth.name, "ETH");
        assert_eq!(eth.price.usd, 50.0);
        assert_eq!(eth.price.mxn, 1000.0);
    }

    #[tokio::test]
    async fn test_unconfigured_row_is_skipped() {
        let store = two_row_store();
        let poller = Poller::new(
            Arc::clone(&store),
            VendorRegistry::with_mock(),
            vendor_map(&[(2, MOCK_VENDOR)]),
        );

        let report = poller.refresh().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.updated, 1);
        let snapshot = store.snapshot();
        assert_eq!(snapshot[0].model, ComponentModel::Empty);
        assert!(snapshot[1].model.as_priced().is_some());
    }

    #[tokio::test]
    async fn test_unloaded_vendor_falls_back_to_mock() {
        let store = two_row_store();
        let poller = Poller::new(
            Arc::clone(&store),
            VendorRegistry::with_mock(),
            vendor_map(&[(1, "binance"), (2, "binance")]),
        );

        let report = poller.refresh().await;

        assert_eq!(report.updated, 2);
        let btc = store.snapshot()[0].model.as_priced().cloned().unwrap();
        assert!(btc.price.usd >= 10_000.0 && btc.price.usd < 10_001.0);
    }

    #[tokio::test]
    async fn test_unloaded_vendor_without_fallback_is_skipped() {
        let store = two_row_store();
        let mut vendors = VendorRegistry::new();
        vendors.register(Arc::new(ScriptedVendor::new("bitso", 5.0)));

        let poller = Poller::new(
            Arc::clone(&store),
            vendors,
            vendor_map(&[(1, "binance"), (2, "bitso")]),
        );
        let report = poller.refresh().await;

        assert_eq!(report.skipped, 1);
        assert_eq!(report.updated, 1);
    }

    #[tokio::test]
    async fn test_tag_without_underscore_uses_default_symbol() {
        let store = Arc::new(LayoutStore::new(&[Component::new(7, "bitcoin")]));
        let vendor = Arc::new(ScriptedVendor::new("bitso", 5.0));
        let mut vendors = VendorRegistry::new();
        vendors.register(vendor.clone());

        let poller = Poller::new(Arc::clone(&store), vendors, vendor_map(&[(7, "bitso")]));
        poller.refresh().await;

        assert_eq!(*vendor.seen.lock(), vec!["BTC".to_string()]);
        let model = store.snapshot()[0].model.as_priced().cloned().unwrap();
        assert_eq!(model.ticker_symbol.as_str(), "BTC");
    }

    #[tokio::test]
    async fn test_slow_vendor_times_out_as_failure() {
        let store = two_row_store();
        let mut vendors = VendorRegistry::new();
        vendors.register(Arc::new(SlowVendor(Duration::from_secs(5))));

        let poller = Poller::new(
            Arc::clone(&store),
            vendors,
            vendor_map(&[(1, "slow")]),
        )
        .with_fetch_timeout(Duration::from_millis(50));

        let report = poller.refresh().await;

        assert_eq!(report.failed, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(store.snapshot()[0].model, ComponentModel::Empty);
    }

    #[tokio::test]
    async fn test_run_refreshes_immediately_and_stops_on_shutdown() {
        let store = two_row_store();
        let poller = Arc::new(Poller::new(
            Arc::clone(&store),
            VendorRegistry::with_mock(),
            vendor_map(&[(1, MOCK_VENDOR), (2, MOCK_VENDOR)]),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(&poller);
        let handle = tokio::spawn(async move {
            runner.run(Duration::from_secs(3600), shutdown_rx).await;
        });

        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while store.snapshot()[1].model.as_priced().is_none() {
            assert!(tokio::time::Instant::now() < deadline, "first cycle did not run");
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop")
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_running_cycle() {
        let store = two_row_store();
        let mut vendors = VendorRegistry::new();
        vendors.register(Arc::new(SlowVendor(Duration::from_secs(30))));
        let poller = Arc::new(
            Poller::new(Arc::clone(&store), vendors, vendor_map(&[(1, "slow")]))
                .with_fetch_timeout(Duration::from_secs(60)),
        );

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(&poller);
        let handle = tokio::spawn(async move {
            runner.run(Duration::from_secs(3600), shutdown_rx).await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("poller did not stop while a fetch was in flight")
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_exits_when_sender_dropped() {
        let poller = Poller::new(two_row_store(), VendorRegistry::with_mock(), HashMap::new());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        drop(shutdown_tx);

        tokio::time::timeout(
            Duration::from_secs(1),
            poller.run(Duration::from_secs(3600), shutdown_rx),
        )
        .await
        .expect("poller kept running without a shutdown sender");
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_never_overlap_when_fetches_outlast_interval() {
        let store = two_row_store();
        let vendor = Arc::new(InFlightVendor::new(Duration::from_secs(3)));
        let mut vendors = VendorRegistry::new();
        vendors.register(vendor.clone());

        let poller = Arc::new(Poller::new(
            Arc::clone(&store),
            vendors,
            vendor_map(&[(1, "bitso"), (2, "bitso")]),
        ));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let runner = Arc::clone(&poller);
        let handle = tokio::spawn(async move {
            runner.run(Duration::from_secs(1), shutdown_rx).await;
        });

        tokio::time::sleep(Duration::from_secs(20)).await;
        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();

        assert!(poller.completed_cycles() >= 3);
        assert!(vendor.calls.load(Ordering::SeqCst) >= 6);
        assert!(vendor.peak.load(Ordering::SeqCst) <= store.len());
    }

    #[tokio::test]
    async fn test_completed_cycles_counts_refreshes() {
        let poller = Poller::new(two_row_store(), VendorRegistry::with_mock(), HashMap::new());
        assert_eq!(poller.completed_cycles(), 0);

        poller.refresh().await;
        poller.refresh().await;

        assert_eq!(poller.completed_cycles(), 2);
    }
}
