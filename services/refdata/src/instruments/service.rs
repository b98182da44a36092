//! Instrument service: startup refresh, daily scheduled refresh, lookups
//!
//! The refresh state machine has two states, idle and refreshing, realized
//! as a compare-exchange on an atomic flag: a trigger that arrives while a
//! cycle is still running is a logged no-op, so at most one refresh is ever
//! in flight. A failed cycle leaves the previously active catalog untouched;
//! the next scheduled trigger is the fallback retry.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDateTime};
use services_common::{Px, Ts};
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::catalog::{Catalog, CatalogStats};
use super::error::{LookupError, RefreshError};
use super::fetch::CatalogFetcher;
use super::store::CatalogStore;
use super::types::{Instrument, InstrumentFilter};

const DEFAULT_CATALOG_URL: &str =
    "https://assets.upstox.com/market-quote/instruments/exchange/complete.json.gz";
const DEFAULT_REFRESH_HOUR: u32 = 7;
const DEFAULT_REFRESH_MINUTE: u32 = 0;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 5;

// Fallback wait when the trigger delta cannot be represented
const SCHEDULE_RECHECK_SECS: u64 = services_common::constants::time::SECS_PER_MINUTE;

/// Instrument service configuration
#[derive(Debug, Clone)]
pub struct RefdataConfig {
    /// Catalog URL (gzip-compressed JSON array)
    pub catalog_url: String,

    /// Daily refresh trigger, local wall-clock hour (0-23)
    pub refresh_hour: u32,

    /// Daily refresh trigger, local wall-clock minute (0-59)
    pub refresh_minute: u32,

    /// Total HTTP timeout for one download attempt, in seconds
    pub http_timeout_secs: u64,

    /// Immediate retry attempts for a failed download
    pub max_retries: u32,

    /// Initial retry delay in seconds (doubles per attempt)
    pub retry_delay_secs: u64,

    /// Enable the daily background refresh loop
    pub enable_auto_refresh: bool,
}

impl Default for RefdataConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            refresh_hour: DEFAULT_REFRESH_HOUR,
            refresh_minute: DEFAULT_REFRESH_MINUTE,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            enable_auto_refresh: true,
        }
    }
}

impl RefdataConfig {
    /// Build configuration from `REFDATA_*` environment variables, falling
    /// back to defaults for anything unset or unparsable
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            catalog_url: std::env::var("REFDATA_CATALOG_URL").unwrap_or(defaults.catalog_url),
            refresh_hour: env_parse("REFDATA_REFRESH_HOUR", defaults.refresh_hour).min(23),
            refresh_minute: env_parse("REFDATA_REFRESH_MINUTE", defaults.refresh_minute).min(59),
            http_timeout_secs: env_parse("REFDATA_HTTP_TIMEOUT_SECS", defaults.http_timeout_secs),
            max_retries: env_parse("REFDATA_MAX_RETRIES", defaults.max_retries),
            retry_delay_secs: env_parse("REFDATA_RETRY_DELAY_SECS", defaults.retry_delay_secs),
            enable_auto_refresh: env_parse(
                "REFDATA_ENABLE_AUTO_REFRESH",
                defaults.enable_auto_refresh,
            ),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Instrument reference-data service with automatic daily refresh
pub struct InstrumentService {
    config: RefdataConfig,
    store: Arc<CatalogStore>,
    fetcher: Arc<CatalogFetcher>,
    refreshing: Arc<AtomicBool>,
}

impl InstrumentService {
    /// Create a new instrument service
    pub fn new(config: RefdataConfig) -> Result<Self> {
        let fetcher = CatalogFetcher::new(
            &config.catalog_url,
            Duration::from_secs(config.http_timeout_secs),
        )
        .context("Failed to create catalog HTTP client")?;

        Ok(Self {
            store: Arc::new(CatalogStore::new()),
            fetcher: Arc::new(fetcher),
            refreshing: Arc::new(AtomicBool::new(false)),
            config,
        })
    }

    /// Run the first refresh and start the daily background loop.
    ///
    /// Lookups report not-ready until the first cycle completes. A failed
    /// first cycle is logged and does not abort startup; the scheduled
    /// trigger retries it.
    pub async fn start(&self) {
        info!(
            "Starting instrument service, catalog source {}",
            self.fetcher.url()
        );

        if let Err(e) = self.force_refresh().await {
            error!("Initial catalog refresh failed: {}", e);
        }

        if self.config.enable_auto_refresh {
            self.spawn_refresh_loop();
        }

        info!("Instrument service started");
    }

    /// Handle to the catalog store, for collaborators that only read
    #[must_use]
    pub fn store(&self) -> Arc<CatalogStore> {
        Arc::clone(&self.store)
    }

    /// Run one refresh cycle now, through the same single-flight guard as
    /// the scheduler. A no-op returning Ok when a cycle is already running.
    pub async fn force_refresh(&self) -> Result<(), RefreshError> {
        Self::refresh_guarded(&self.store, &self.fetcher, &self.refreshing, &self.config).await
    }

    /// True once any refresh has succeeded
    pub async fn is_populated(&self) -> bool {
        self.store.is_populated().await
    }

    /// Find the nearest-expiry option for an underlying, strike and option
    /// type against the currently active catalog.
    ///
    /// `Ok(None)` means the catalog was searched and holds no match;
    /// `Err(LookupError::NotReady)` means no refresh has succeeded yet.
    pub async fn find_immediate_option(
        &self,
        asset_symbol: &str,
        strike: Px,
        option_type: &str,
    ) -> Result<Option<Instrument>, LookupError> {
        let catalog = self.store.current().await.ok_or(LookupError::NotReady)?;
        Ok(catalog
            .find_immediate_option(asset_symbol, strike, option_type)
            .cloned())
    }

    /// Query instruments with a filter
    pub async fn query(&self, filter: &InstrumentFilter) -> Result<Vec<Instrument>, LookupError> {
        let catalog = self.store.current().await.ok_or(LookupError::NotReady)?;
        Ok(catalog.query(filter).into_iter().cloned().collect())
    }

    /// All distinct strikes with option contracts for an underlying
    pub async fn available_strikes(&self, asset_symbol: &str) -> Result<Vec<Px>, LookupError> {
        let catalog = self.store.current().await.ok_or(LookupError::NotReady)?;
        Ok(catalog.available_strikes(asset_symbol))
    }

    /// Statistics for the active catalog
    pub async fn stats(&self) -> CatalogStats {
        self.store.stats().await
    }

    /// Start the daily refresh loop
    fn spawn_refresh_loop(&self) {
        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let refreshing = Arc::clone(&self.refreshing);
        let config = self.config.clone();

        tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = next_trigger_after(now, config.refresh_hour, config.refresh_minute);
                let wait = (next - now)
                    .to_std()
                    .unwrap_or(Duration::from_secs(SCHEDULE_RECHECK_SECS));
                debug!("Next catalog refresh scheduled at {}", next);
                sleep(wait).await;

                info!("Starting scheduled catalog refresh");
                if let Err(e) =
                    Self::refresh_guarded(&store, &fetcher, &refreshing, &config).await
                {
                    error!("Scheduled catalog refresh failed: {}", e);
                }
            }
        });
    }

    /// Single-flight wrapper around one refresh cycle.
    ///
    /// The idle -> refreshing transition is the compare-exchange; the flag
    /// drops back to idle regardless of outcome.
    async fn refresh_guarded(
        store: &CatalogStore,
        fetcher: &CatalogFetcher,
        refreshing: &AtomicBool,
        config: &RefdataConfig,
    ) -> Result<(), RefreshError> {
        if refreshing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("Catalog refresh already in flight, ignoring trigger");
            return Ok(());
        }

        let result = Self::run_refresh(store, fetcher, config).await;
        refreshing.store(false, Ordering::Release);
        result.map(|_count| ())
    }

    /// One full refresh cycle: fetch -> decompress -> parse -> swap.
    ///
    /// The swap happens only after the parse has fully succeeded, so a
    /// failure at any stage leaves the previous catalog in place.
    async fn run_refresh(
        store: &CatalogStore,
        fetcher: &CatalogFetcher,
        config: &RefdataConfig,
    ) -> Result<usize, RefreshError> {
        let start = Instant::now();

        let payload = Self::download_with_retry(fetcher, config).await?;
        let catalog = Catalog::parse(&payload, Ts::now())?;
        let count = catalog.len();
        store.swap(catalog).await;

        info!(
            "Catalog refresh completed: {} instruments in {:?}",
            count,
            start.elapsed()
        );
        Ok(count)
    }

    /// Download with bounded immediate retries and exponential backoff.
    ///
    /// Only the download stage retries; a parse failure is not transient and
    /// waits for the next scheduled cycle.
    async fn download_with_retry(
        fetcher: &CatalogFetcher,
        config: &RefdataConfig,
    ) -> Result<Vec<u8>, RefreshError> {
        let mut attempt = 0;
        let mut delay = config.retry_delay_secs;

        loop {
            match fetcher.download().await {
                Ok(payload) => return Ok(payload),
                Err(e) if attempt < config.max_retries => {
                    attempt += 1;
                    warn!(
                        "Catalog download failed (attempt {}/{}), retrying in {}s: {}",
                        attempt, config.max_retries, delay, e
                    );
                    sleep(Duration::from_secs(delay)).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Next occurrence of the daily `hour:minute` trigger strictly after `now`
pub(crate) fn next_trigger_after(now: NaiveDateTime, hour: u32, minute: u32) -> NaiveDateTime {
    let Some(candidate) = now.date().and_hms_opt(hour, minute, 0) else {
        return now + chrono::Duration::days(1);
    };
    if candidate > now {
        candidate
    } else {
        candidate + chrono::Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn naive(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .and_then(|date| date.and_hms_opt(h, min, s))
            .expect("valid test datetime")
    }

    #[test]
    fn test_next_trigger_later_today() {
        let now = naive(2025, 1, 2, 6, 0, 0);
        assert_eq!(next_trigger_after(now, 7, 0), naive(2025, 1, 2, 7, 0, 0));
    }

    #[test]
    fn test_next_trigger_rolls_to_tomorrow() {
        let now = naive(2025, 1, 2, 8, 30, 0);
        assert_eq!(next_trigger_after(now, 7, 0), naive(2025, 1, 3, 7, 0, 0));
    }

    #[test]
    fn test_next_trigger_exact_boundary_is_tomorrow() {
        // A trigger firing exactly at hh:mm must not re-fire the same instant
        let now = naive(2025, 1, 2, 7, 0, 0);
        assert_eq!(next_trigger_after(now, 7, 0), naive(2025, 1, 3, 7, 0, 0));
    }

    #[test]
    fn test_next_trigger_crosses_month_end() {
        let now = naive(2025, 1, 31, 9, 0, 0);
        assert_eq!(next_trigger_after(now, 7, 0), naive(2025, 2, 1, 7, 0, 0));
    }

    #[test]
    fn test_config_defaults() {
        let config = RefdataConfig::default();
        assert_eq!(config.refresh_hour, 7);
        assert_eq!(config.refresh_minute, 0);
        assert_eq!(config.max_retries, 3);
        assert!(config.enable_auto_refresh);
        assert!(config.catalog_url.ends_with(".json.gz"));
    }
}
