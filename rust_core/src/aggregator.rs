//! On-demand multi-provider aggregation.
//!
//! Unlike the poller, which asks one assigned vendor per row, the aggregator
//! asks every registered quote provider for every priced instrument and
//! merges the (possibly partial) answers into one `Model` per instrument.
//!
//! Merge policy per instrument:
//! - observation time: latest timestamp among successful quotes
//! - display name: first non-empty provider name in provider order, then the
//!   static name dictionary, then the raw ticker
//! - each currency: first successful quote to arrive that carries it wins
//! - a currency still missing after the merge fails the instrument
//!
//! Failures are all-or-nothing at the layout level: one failed instrument
//! fails the whole call and no partial layout is returned.
//!
//! Work is split into task groups: one task per instrument, each owning a
//! nested group with one task per provider.

use crate::clients::{Quote, QuoteProvider};
use crate::error::{AggregateError, ProviderFailure};
use crate::layout::LayoutLoader;
use crate::models::{ComponentModel, Currency, Layout, Model, Money, Ticker};
use crate::telemetry;
use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub const DEFAULT_PER_TICKER_TIMEOUT: Duration = Duration::from_secs(2);

fn default_names() -> HashMap<Ticker, String> {
    [("BTC", "Bitcoin"), ("ETH", "Ethereum"), ("XRP", "XRP")]
        .into_iter()
        .map(|(ticker, name)| (Ticker::new(ticker), name.to_string()))
        .collect()
}

pub struct Aggregator {
    layout_loader: Arc<dyn LayoutLoader>,
    providers: Arc<[Arc<dyn QuoteProvider>]>,
    per_ticker_timeout: Duration,
    names: Arc<HashMap<Ticker, String>>,
}

impl Aggregator {
    /// A zero `per_ticker_timeout` selects [`DEFAULT_PER_TICKER_TIMEOUT`].
    pub fn new(
        layout_loader: Arc<dyn LayoutLoader>,
        providers: Vec<Arc<dyn QuoteProvider>>,
        per_ticker_timeout: Duration,
    ) -> Self {
        let per_ticker_timeout = if per_ticker_timeout.is_zero() {
            DEFAULT_PER_TICKER_TIMEOUT
        } else {
            per_ticker_timeout
        };

        Self {
            layout_loader,
            providers: providers.into(),
            per_ticker_timeout,
            names: Arc::new(default_names()),
        }
    }

    /// Replace the ticker -> display name dictionary
    pub fn with_names(mut self, names: HashMap<Ticker, String>) -> Self {
        self.names = Arc::new(names);
        self
    }

    pub fn per_ticker_timeout(&self) -> Duration {
        self.per_ticker_timeout
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Build a fully reconciled layout from every registered provider.
    ///
    /// Dropping the returned future aborts every in-flight provider call.
    pub async fn execute(&self) -> Result<Layout, AggregateError> {
        let result = self.hydrate().await;
        telemetry::record_aggregate(&result);
        result
    }

    async fn hydrate(&self) -> Result<Layout, AggregateError> {
        if self.providers.is_empty() {
            return Err(AggregateError::NoProviders);
        }

        let layout = self
            .layout_loader
            .load()
            .await
            .map_err(AggregateError::LoadLayout)?;

        let tickers = needed_tickers(&layout);
        info!(
            "Aggregating {} tickers across {} providers ({})",
            tickers.len(),
            self.providers.len(),
            self.provider_names().join(", ")
        );

        // One task per ticker; aborted on drop
        let mut tasks = JoinSet::new();
        for ticker in &tickers {
            let ticker = ticker.clone();
            let providers = Arc::clone(&self.providers);
            let names = Arc::clone(&self.names);
            let timeout = self.per_ticker_timeout;
            tasks.spawn(async move {
                let result = fetch_and_merge(&ticker, &providers, timeout, &names).await;
                (ticker, result)
            });
        }

        let mut results = HashMap::with_capacity(tickers.len());
        let mut join_errors = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((ticker, result)) => {
                    results.insert(ticker, result);
                }
                Err(e) => {
                    error!("Aggregation task aborted: {}", e);
                    join_errors.push(e.to_string());
                }
            }
        }

        let mut models: HashMap<Ticker, Model> = HashMap::with_capacity(tickers.len());
        let mut failed = Vec::new();
        for ticker in tickers {
            match results.remove(&ticker) {
                Some(Ok(model)) => {
                    models.insert(ticker, model);
                }
                Some(Err(e)) => {
                    warn!("Aggregation failed for {}: {}", ticker, e);
                    failed.push(e);
                }
                None => failed.push(AggregateError::TaskFailed {
                    ticker,
                    message: join_errors.join("; "),
                }),
            }
        }

        if !failed.is_empty() {
            return Err(AggregateError::Hydrate(failed));
        }

        Ok(layout
            .into_iter()
            .map(|mut component| {
                if let Some(model) = component.component.ticker().and_then(|t| models.get(&t)) {
                    component.model = ComponentModel::Priced(model.clone());
                }
                component
            })
            .collect())
    }
}

/// Query every provider for `ticker` in its own task and merge in completion order
async fn fetch_and_merge(
    ticker: &Ticker,
    providers: &[Arc<dyn QuoteProvider>],
    timeout: Duration,
    names: &HashMap<Ticker, String>,
) -> Result<Model, AggregateError> {
    let mut calls = JoinSet::new();
    for (rank, provider) in providers.iter().enumerate() {
        let provider = Arc::clone(provider);
        let ticker = ticker.clone();
        calls.spawn(async move {
            let result = match tokio::time::timeout(timeout, provider.get_quote(&ticker)).await {
                Ok(Ok(quote)) => Ok(quote),
                Ok(Err(e)) => Err(format!("{:#}", e)),
                Err(_) => Err(format!("timed out after {}ms", timeout.as_millis())),
            };
            (rank, result)
        });
    }

    let mut answered = vec![false; providers.len()];
    let mut merge = QuoteMerge::new(ticker.clone());
    while let Some(joined) = calls.join_next().await {
        let (rank, result) = match joined {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Provider task for {} aborted: {}", ticker, e);
                continue;
            }
        };
        answered[rank] = true;
        let provider = providers[rank].name();

        match result {
            Ok(quote) => {
                debug!(
                    "Quote for {} from {}: {} currencies",
                    ticker,
                    provider,
                    quote.prices.len()
                );
                merge.accept(rank, quote);
            }
            Err(message) => {
                warn!("{} failed for {}: {}", provider, ticker, message);
                telemetry::record_provider_failure(provider);
                merge.reject(ProviderFailure {
                    provider: provider.to_string(),
                    message,
                });
            }
        }
    }

    for (rank, _) in answered.iter().enumerate().filter(|(_, done)| !**done) {
        merge.reject(ProviderFailure {
            provider: providers[rank].name().to_string(),
            message: "provider task did not complete".to_string(),
        });
    }

    merge.finish(names)
}

/// Distinct priced tickers of a layout, in a stable order
pub fn needed_tickers(layout: &Layout) -> BTreeSet<Ticker> {
    layout
        .iter()
        .filter_map(|component| component.component.ticker())
        .collect()
}

/// Accumulates provider responses for one ticker.
///
/// `accept` and `reject` must be called in the order responses are
/// processed; currency values are first-writer-wins in that order.
#[derive(Debug)]
pub struct QuoteMerge {
    ticker: Ticker,
    latest: Option<DateTime<Utc>>,
    /// (provider rank, name)
    name: Option<(usize, String)>,
    prices: HashMap<Currency, f64>,
    succeeded: usize,
    failures: Vec<ProviderFailure>,
}

impl QuoteMerge {
    pub fn new(ticker: Ticker) -> Self {
        Self {
            ticker,
            latest: None,
            name: None,
            prices: HashMap::new(),
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    /// Fold in a successful quote from the provider at position `rank`
    pub fn accept(&mut self, rank: usize, quote: Quote) {
        self.succeeded += 1;

        if self.latest.map_or(true, |latest| quote.time > latest) {
            self.latest = Some(quote.time);
        }

        if let Some(name) = quote.name.filter(|n| !n.is_empty()) {
            let outranks = self.name.as_ref().map_or(true, |(best, _)| rank < *best);
            if outranks {
                self.name = Some((rank, name));
            }
        }

        for (currency, value) in quote.prices {
            self.prices.entry(currency).or_insert(value);
        }
    }

    pub fn reject(&mut self, failure: ProviderFailure) {
        self.failures.push(failure);
    }

    pub fn finish(self, names: &HashMap<Ticker, String>) -> Result<Model, AggregateError> {
        let date = match self.latest {
            Some(date) if self.succeeded > 0 => date,
            _ => {
                return Err(AggregateError::AllProvidersFailed {
                    ticker: self.ticker,
                    details: self.failures,
                })
            }
        };

        let missing: Vec<Currency> = Currency::REQUIRED
            .into_iter()
            .filter(|c| !self.prices.contains_key(c))
            .collect();
        if !missing.is_empty() {
            return Err(AggregateError::IncompleteQuote {
                ticker: self.ticker,
                missing,
            });
        }

        let price = match Money::new(self.prices[&Currency::Usd], self.prices[&Currency::Mxn]) {
            Ok(price) => price,
            Err(source) => {
                return Err(AggregateError::InvalidPrice {
                    ticker: self.ticker,
                    source,
                })
            }
        };

        let name = match self.name {
            Some((_, name)) => name,
            None => names
                .get(&self.ticker)
                .cloned()
                .unwrap_or_else(|| self.ticker.to_string()),
        };

        Ok(Model {
            date,
            name,
            ticker_symbol: self.ticker,
            price,
        })
    }
}
