//! Crypto Aggregator Core - price polling and multi-provider aggregation.
//!
//! This crate provides:
//! - Layout Store: concurrency-safe, row-indexed price state
//! - Poller: periodic refresh of every row from its assigned vendor
//! - Aggregator: on-demand merge of partial quotes from every provider
//! - Vendor clients (Bitso, Coinbase, mock) and the vendor registry

pub mod aggregator;
pub mod clients;
pub mod error;
pub mod layout;
pub mod models;
pub mod poller;
pub mod store;
pub mod telemetry;

pub use aggregator::{Aggregator, QuoteMerge, DEFAULT_PER_TICKER_TIMEOUT};
pub use clients::{Quote, QuoteProvider, VendorClient, VendorRegistry};
pub use error::{AggregateError, MoneyError, ProviderFailure};
pub use layout::{LayoutLoader, StaticLayoutLoader};
pub use models::{
    Component, ComponentModel, ComponentType, Currency, InstrumentId, Layout, Model, Money,
    Ticker,
};
pub use poller::{CycleReport, Poller};
pub use store::LayoutStore;
