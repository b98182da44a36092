//! Instrument catalog cache with scheduled refresh
//!
//! Pipeline: streaming download -> gzip decode -> whole-buffer parse ->
//! atomic snapshot swap. Lookups always read the currently active snapshot
//! and never wait on an in-flight refresh.

pub mod catalog;
pub mod error;
pub mod fetch;
pub mod service;
pub mod store;
pub mod types;

pub use catalog::{Catalog, CatalogStats};
pub use error::{LookupError, RefreshError};
pub use fetch::CatalogFetcher;
pub use service::{InstrumentService, RefdataConfig};
pub use store::CatalogStore;
pub use types::{Instrument, InstrumentFilter, InstrumentKind, OptionType};
