//! Active-catalog store: concurrent reads, single-writer swap
//!
//! Holds the one shared mutable reference in the subsystem. The write lock
//! is held only for the pointer replacement; every pipeline stage runs
//! outside it, so lookups never wait on an in-flight refresh. A reader that
//! cloned the `Arc` before a swap keeps its snapshot until it drops it, at
//! which point the superseded catalog is reclaimed.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use super::catalog::{Catalog, CatalogStats};

/// Holds the currently-active catalog reference (or none before the first
/// successful refresh)
#[derive(Debug, Default)]
pub struct CatalogStore {
    active: RwLock<Option<Arc<Catalog>>>,
}

impl CatalogStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Atomically replace the active catalog.
    ///
    /// Called only after a parse has fully succeeded; in-flight reads keep
    /// the previous snapshot to completion.
    pub async fn swap(&self, catalog: Catalog) {
        let count = catalog.len();
        let mut active = self.active.write().await;
        *active = Some(Arc::new(catalog));
        drop(active);
        info!("Activated catalog snapshot with {} instruments", count);
    }

    /// Currently active catalog, or `None` before the first successful
    /// refresh. Never blocks on an in-progress refresh.
    pub async fn current(&self) -> Option<Arc<Catalog>> {
        self.active.read().await.clone()
    }

    /// True once any refresh has succeeded
    pub async fn is_populated(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// Statistics for the active catalog (zeros before the first refresh)
    pub async fn stats(&self) -> CatalogStats {
        match self.current().await {
            Some(catalog) => catalog.stats(),
            None => CatalogStats::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::types::Instrument;
    use services_common::Ts;

    fn catalog_with_symbol(symbol: &str) -> Catalog {
        let json = format!(
            r#"[{{"asset_symbol":"{symbol}","instrument_type":"CE","strike_price":100,"expiry":"2025-01-02"}}]"#
        );
        Catalog::parse(json.as_bytes(), Ts::now()).expect("valid json")
    }

    fn first_symbol(records: &[Instrument]) -> &str {
        &records[0].asset_symbol
    }

    #[tokio::test]
    async fn test_empty_store_is_not_populated() {
        let store = CatalogStore::new();
        assert!(!store.is_populated().await);
        assert!(store.current().await.is_none());
        assert_eq!(store.stats().await.total_instruments, 0);
    }

    #[tokio::test]
    async fn test_swap_populates() {
        let store = CatalogStore::new();
        store.swap(catalog_with_symbol("NIFTY")).await;
        assert!(store.is_populated().await);
        let current = store.current().await.expect("populated");
        assert_eq!(first_symbol(current.records()), "NIFTY");
    }

    #[tokio::test]
    async fn test_reader_keeps_old_snapshot_across_swap() {
        let store = CatalogStore::new();
        store.swap(catalog_with_symbol("NIFTY")).await;

        let before = store.current().await.expect("populated");
        store.swap(catalog_with_symbol("BANKNIFTY")).await;

        // The earlier reader still sees its full original snapshot
        assert_eq!(first_symbol(before.records()), "NIFTY");
        let after = store.current().await.expect("populated");
        assert_eq!(first_symbol(after.records()), "BANKNIFTY");
    }

    #[tokio::test]
    async fn test_concurrent_readers_during_swaps() {
        let store = Arc::new(CatalogStore::new());
        store.swap(catalog_with_symbol("NIFTY")).await;

        let reader = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                for _ in 0..200 {
                    // Every observed snapshot is internally consistent
                    let snapshot = store.current().await.expect("populated");
                    let symbol = first_symbol(snapshot.records()).to_string();
                    assert!(symbol == "NIFTY" || symbol == "BANKNIFTY");
                    assert_eq!(snapshot.len(), 1);
                }
            })
        };

        for i in 0..50 {
            let symbol = if i % 2 == 0 { "BANKNIFTY" } else { "NIFTY" };
            store.swap(catalog_with_symbol(symbol)).await;
        }

        reader.await.expect("reader task");
    }
}
