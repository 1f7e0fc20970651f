pub mod bitso;
pub mod coinbase;
pub mod mock;
pub mod registry;
pub mod vendor;

// Re-export commonly used types
pub use bitso::BitsoClient;
pub use coinbase::CoinbaseClient;
pub use mock::{MockClient, MOCK_VENDOR};
pub use registry::VendorRegistry;
pub use vendor::{Quote, QuoteProvider, VendorClient};
