//! Instrument Reference-Data Service
//!
//! Periodically fetches the exchange's compressed instrument catalog, parses
//! it into an immutable in-memory snapshot, and serves point lookups against
//! it while background refreshes run concurrently.

pub mod instruments;

pub use instruments::{
    Catalog, CatalogFetcher, CatalogStats, CatalogStore, Instrument, InstrumentFilter,
    InstrumentKind, InstrumentService, LookupError, OptionType, RefdataConfig, RefreshError,
};
