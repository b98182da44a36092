//! Immutable catalog snapshot: one parse pass, then read-only lookups
//!
//! A refresh builds a brand-new `Catalog` and swaps it into the store; the
//! snapshot itself is never mutated after construction.

use rustc_hash::FxHashSet;
use services_common::{Px, Ts};
use tracing::debug;

use super::error::RefreshError;
use super::types::{CatalogRecordJson, Instrument, InstrumentFilter};

/// One fully-parsed snapshot of all instrument records
#[derive(Debug)]
pub struct Catalog {
    records: Vec<Instrument>,
    fetched_at: Ts,
}

impl Catalog {
    /// Parse the full decompressed payload (a single JSON array of
    /// instrument objects) into a catalog.
    ///
    /// All-or-nothing: malformed JSON fails the whole parse and leaves no
    /// partially populated catalog behind.
    pub fn parse(bytes: &[u8], fetched_at: Ts) -> Result<Self, RefreshError> {
        let wire: Vec<CatalogRecordJson> = serde_json::from_slice(bytes)?;
        let records: Vec<Instrument> = wire.into_iter().map(Instrument::from).collect();
        debug!("Parsed {} instrument records", records.len());
        Ok(Self {
            records,
            fetched_at,
        })
    }

    /// Number of instrument records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when the catalog holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records, in upstream catalog order
    #[must_use]
    pub fn records(&self) -> &[Instrument] {
        &self.records
    }

    /// When this snapshot's refresh cycle fetched the payload
    #[must_use]
    pub fn fetched_at(&self) -> Ts {
        self.fetched_at
    }

    /// Find the nearest-expiry option contract for an underlying, strike and
    /// option type.
    ///
    /// `asset_symbol` and `option_type` compare case-insensitively; the
    /// strike must match exactly in fixed point. Records without an expiry
    /// never match. Among matches the minimum expiry wins; on equal expiry
    /// the first record in catalog order wins (`min_by_key` keeps the first
    /// minimum). An empty result is `None`, a normal outcome.
    #[must_use]
    pub fn find_immediate_option(
        &self,
        asset_symbol: &str,
        strike: Px,
        option_type: &str,
    ) -> Option<&Instrument> {
        self.records
            .iter()
            .filter(|r| {
                r.asset_symbol.eq_ignore_ascii_case(asset_symbol)
                    && r.instrument_type.eq_ignore_ascii_case(option_type)
                    && r.strike == Some(strike)
                    && r.expiry.is_some()
            })
            .min_by_key(|r| r.expiry)
    }

    /// Scan the catalog with a filter
    #[must_use]
    pub fn query(&self, filter: &InstrumentFilter) -> Vec<&Instrument> {
        self.records.iter().filter(|r| filter.matches(r)).collect()
    }

    /// All distinct strikes with option contracts for an underlying,
    /// ascending
    #[must_use]
    pub fn available_strikes(&self, asset_symbol: &str) -> Vec<Px> {
        let mut strikes: Vec<Px> = self
            .records
            .iter()
            .filter(|r| r.is_option() && r.asset_symbol.eq_ignore_ascii_case(asset_symbol))
            .filter_map(|r| r.strike)
            .collect();
        strikes.sort_unstable();
        strikes.dedup();
        strikes
    }

    /// Snapshot statistics
    #[must_use]
    pub fn stats(&self) -> CatalogStats {
        let option_count = self.records.iter().filter(|r| r.is_option()).count();
        let underlyings: FxHashSet<String> = self
            .records
            .iter()
            .map(|r| r.asset_symbol.to_ascii_uppercase())
            .collect();

        CatalogStats {
            total_instruments: self.records.len(),
            option_count,
            underlying_count: underlyings.len(),
            last_refresh: Some(self.fetched_at),
        }
    }
}

/// Catalog statistics
#[derive(Debug, Clone, Default)]
pub struct CatalogStats {
    pub total_instruments: usize,
    pub option_count: usize,
    pub underlying_count: usize,
    pub last_refresh: Option<Ts>,
}
