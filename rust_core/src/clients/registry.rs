//! Vendor Registry
//!
//! Maps vendor names (as referenced by the layout configuration) to loaded
//! clients, with an explicit fallback vendor for names that are configured
//! but not loaded.

use super::mock::{MockClient, MOCK_VENDOR};
use super::vendor::VendorClient;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Registry of loaded vendor clients
#[derive(Clone)]
pub struct VendorRegistry {
    /// Clients indexed by vendor name
    vendors: HashMap<String, Arc<dyn VendorClient>>,
    /// Name of the vendor used when a configured vendor is not loaded
    fallback: String,
}

impl VendorRegistry {
    /// Create an empty registry; fallback name defaults to "mock"
    pub fn new() -> Self {
        Self {
            vendors: HashMap::new(),
            fallback: MOCK_VENDOR.to_string(),
        }
    }

    /// Create a registry holding only the synthetic mock vendor
    pub fn with_mock() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(MockClient::new()));
        registry
    }

    /// Use a different fallback vendor name
    pub fn with_fallback(mut self, name: &str) -> Self {
        self.fallback = name.to_string();
        self
    }

    /// Register a client under its own name, replacing any previous one
    pub fn register(&mut self, client: Arc<dyn VendorClient>) {
        let name = client.name().to_string();
        info!("Registering vendor: {}", name);
        self.vendors.insert(name, client);
    }

    /// Exact lookup
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn VendorClient>> {
        self.vendors.get(name).cloned()
    }

    /// Lookup falling back to the designated default vendor.
    ///
    /// `None` only when neither the named nor the fallback vendor is loaded.
    pub fn resolve_or_fallback(&self, name: &str) -> Option<Arc<dyn VendorClient>> {
        self.resolve(name).or_else(|| self.resolve(&self.fallback))
    }

    pub fn fallback_name(&self) -> &str {
        &self.fallback
    }

    pub fn len(&self) -> usize {
        self.vendors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }
}

impl Default for VendorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
