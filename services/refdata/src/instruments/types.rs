//! Instrument record types and wire-format parsing

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use services_common::constants::market::{NSE_CLOSE_HOUR, NSE_CLOSE_MINUTE, NSE_CLOSE_SECOND};
use services_common::constants::time::NANOS_PER_MILLI;
use services_common::{Px, Ts};

/// Instrument type classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstrumentKind {
    /// Equity/Stock instrument
    Equity,
    /// Index instrument
    Index,
    /// Future contract
    Future,
    /// Option contract
    Option,
}

/// Option type for derivatives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionType {
    /// Call option
    Call,
    /// Put option
    Put,
}

/// One tradable instrument's reference data
///
/// The four compare-relevant fields (`asset_symbol`, `instrument_type`,
/// `strike`, `expiry`) are stored exactly as received; case folding happens
/// at compare time. Everything else is opaque passthrough for callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    /// Venue-unique instrument identifier (opaque to the cache)
    pub instrument_key: Option<String>,

    /// Trading symbol (e.g. "NIFTY24DEC23300PE", opaque to the cache)
    pub trading_symbol: Option<String>,

    /// Underlying asset symbol (e.g. "NIFTY"), case-insensitive compare key
    pub asset_symbol: String,

    /// Instrument type string as received (e.g. "CE", "PE", "FUT", "EQ"),
    /// case-insensitive compare key
    pub instrument_type: String,

    /// Classification derived from `instrument_type`
    pub kind: InstrumentKind,

    /// Option type for CE/PE instruments
    pub option_type: Option<OptionType>,

    /// Strike price for options (fixed-point, exact-match compare key)
    pub strike: Option<Px>,

    /// Expiry for derivatives (nanoseconds since epoch, at exchange close)
    pub expiry: Option<u64>,

    /// Exchange (e.g. "NSE", opaque to the cache)
    pub exchange: Option<String>,

    /// Lot size (opaque to the cache)
    pub lot_size: Option<u32>,

    /// Remaining upstream fields, preserved verbatim
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Instrument {
    /// Check if this instrument is an option contract
    #[must_use]
    pub fn is_option(&self) -> bool {
        matches!(self.kind, InstrumentKind::Option)
    }

    /// Check if this instrument is active (not expired)
    #[must_use]
    pub fn is_active(&self) -> bool {
        match self.expiry {
            Some(expiry_ns) => expiry_ns > Ts::now().as_nanos(),
            None => true, // No expiry means always active
        }
    }
}

/// Expiry as it appears on the wire: some venues publish a date string,
/// others integer epoch milliseconds
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExpiryJson {
    /// "YYYY-MM-DD"
    Date(String),
    /// Milliseconds since epoch
    EpochMillis(i64),
}

/// Catalog JSON instrument format for parsing
///
/// NOTE: uses f64 for the strike as that is the external JSON format; it is
/// immediately converted to fixed-point in the From implementation. Fields
/// the cache does not recognize are collected verbatim into `extra`.
#[derive(Debug, Deserialize)]
pub struct CatalogRecordJson {
    pub asset_symbol: String,
    pub instrument_type: String,
    #[serde(rename = "strike_price", default)]
    pub strike_price_external: f64,
    #[serde(default)]
    pub expiry: Option<ExpiryJson>,
    #[serde(default)]
    pub instrument_key: Option<String>,
    #[serde(default)]
    pub trading_symbol: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default)]
    pub lot_size: Option<u32>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Normalize a wire expiry to nanoseconds since epoch at exchange close.
///
/// Date-only strings get the NSE close-of-day time so that "expires today"
/// remains active through the trading session.
fn expiry_nanos(expiry: &ExpiryJson) -> Option<u64> {
    match expiry {
        ExpiryJson::Date(s) => {
            if s.is_empty() {
                return None;
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(NSE_CLOSE_HOUR, NSE_CLOSE_MINUTE, NSE_CLOSE_SECOND))
                .and_then(|dt| {
                    chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc)
                        .timestamp_nanos_opt()
                })
                // SAFETY: max(0) ensures non-negative value safe to cast to u64
                .map(|n| n.max(0) as u64)
        }
        ExpiryJson::EpochMillis(ms) => {
            if *ms < 0 {
                return None;
            }
            // SAFETY: non-negative i64 widens losslessly into u64
            #[allow(clippy::cast_sign_loss)]
            let millis = *ms as u64;
            millis.checked_mul(NANOS_PER_MILLI)
        }
    }
}

impl From<CatalogRecordJson> for Instrument {
    fn from(r: CatalogRecordJson) -> Self {
        let kind = match r.instrument_type.to_ascii_uppercase().as_str() {
            "EQ" => InstrumentKind::Equity,
            "INDEX" => InstrumentKind::Index,
            "FUT" | "FUTIDX" | "FUTSTK" => InstrumentKind::Future,
            "CE" | "PE" => InstrumentKind::Option,
            _ => InstrumentKind::Equity,
        };

        let option_type = match r.instrument_type.to_ascii_uppercase().as_str() {
            "CE" => Some(OptionType::Call),
            "PE" => Some(OptionType::Put),
            _ => None,
        };

        let expiry = r.expiry.as_ref().and_then(expiry_nanos);

        Self {
            instrument_key: r.instrument_key,
            trading_symbol: r.trading_symbol,
            asset_symbol: r.asset_symbol,
            instrument_type: r.instrument_type,
            kind,
            option_type,
            strike: if r.strike_price_external > 0.0 {
                Some(Px::new(r.strike_price_external))
            } else {
                None
            },
            expiry,
            exchange: r.exchange,
            lot_size: r.lot_size,
            extra: r.extra,
        }
    }
}

/// Instrument query filter
#[derive(Debug, Clone, Default)]
pub struct InstrumentFilter {
    pub asset_symbol: Option<String>,
    pub kind: Option<InstrumentKind>,
    pub option_type: Option<OptionType>,
    pub active_only: bool,
}

impl InstrumentFilter {
    /// Create filter for option contracts of a specific underlying
    #[must_use]
    pub fn options(asset_symbol: &str) -> Self {
        Self {
            asset_symbol: Some(asset_symbol.to_string()),
            kind: Some(InstrumentKind::Option),
            active_only: true,
            ..Default::default()
        }
    }

    /// Check if instrument matches filter
    #[must_use]
    pub fn matches(&self, instrument: &Instrument) -> bool {
        if let Some(ref asset) = self.asset_symbol {
            if !instrument.asset_symbol.eq_ignore_ascii_case(asset) {
                return false;
            }
        }

        if let Some(kind) = self.kind {
            if instrument.kind != kind {
                return false;
            }
        }

        if let Some(option_type) = self.option_type {
            if instrument.option_type != Some(option_type) {
                return false;
            }
        }

        if self.active_only && !instrument.is_active() {
            return false;
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_from_json(json: &str) -> Instrument {
        let wire: CatalogRecordJson = serde_json::from_str(json).expect("valid record json");
        Instrument::from(wire)
    }

    #[test]
    fn test_option_record_conversion() {
        let inst = record_from_json(
            r#"{
                "asset_symbol": "NIFTY",
                "instrument_type": "PE",
                "strike_price": 23300.0,
                "expiry": "2025-01-02",
                "instrument_key": "NSE_FO|54321",
                "trading_symbol": "NIFTY25JAN23300PE",
                "exchange": "NSE",
                "lot_size": 75
            }"#,
        );

        assert_eq!(inst.kind, InstrumentKind::Option);
        assert_eq!(inst.option_type, Some(OptionType::Put));
        assert_eq!(inst.strike, Some(Px::new(23300.0)));
        assert_eq!(inst.instrument_key.as_deref(), Some("NSE_FO|54321"));
        assert!(inst.expiry.is_some());
    }

    #[test]
    fn test_expiry_date_normalized_to_close_of_day() {
        let inst = record_from_json(
            r#"{"asset_symbol":"NIFTY","instrument_type":"CE","strike_price":100.0,"expiry":"2025-01-02"}"#,
        );
        let expiry_ns = inst.expiry.expect("expiry parsed");
        // 2025-01-02T15:30:00 = midnight + 15.5h
        let midnight_ns = Ts::from_millis(1_735_776_000_000).as_nanos();
        assert_eq!(expiry_ns, midnight_ns + (15 * 3600 + 30 * 60) * 1_000_000_000);
    }

    #[test]
    fn test_expiry_epoch_millis_accepted() {
        let inst = record_from_json(
            r#"{"asset_symbol":"NIFTY","instrument_type":"CE","strike_price":100.0,"expiry":1735831800000}"#,
        );
        assert_eq!(inst.expiry, Some(Ts::from_millis(1_735_831_800_000).as_nanos()));
    }

    #[test]
    fn test_missing_and_empty_expiry() {
        let no_expiry = record_from_json(
            r#"{"asset_symbol":"NIFTY","instrument_type":"EQ","strike_price":0.0}"#,
        );
        assert_eq!(no_expiry.expiry, None);
        assert_eq!(no_expiry.strike, None);

        let empty_expiry = record_from_json(
            r#"{"asset_symbol":"NIFTY","instrument_type":"EQ","expiry":""}"#,
        );
        assert_eq!(empty_expiry.expiry, None);
    }

    #[test]
    fn test_instrument_type_stored_verbatim() {
        // Lower-case wire value must survive storage untouched
        let inst = record_from_json(
            r#"{"asset_symbol":"nifty","instrument_type":"pe","strike_price":100.0,"expiry":"2025-01-02"}"#,
        );
        assert_eq!(inst.instrument_type, "pe");
        assert_eq!(inst.asset_symbol, "nifty");
        assert_eq!(inst.option_type, Some(OptionType::Put));
    }

    #[test]
    fn test_unknown_fields_preserved_in_extra() {
        let inst = record_from_json(
            r#"{
                "asset_symbol": "NIFTY",
                "instrument_type": "CE",
                "strike_price": 100.0,
                "tick_size": 0.05,
                "segment": "NFO-OPT"
            }"#,
        );
        assert_eq!(
            inst.extra.get("segment").and_then(|v| v.as_str()),
            Some("NFO-OPT")
        );
        assert!(inst.extra.contains_key("tick_size"));
    }

    #[test]
    fn test_filter_matches_case_insensitively() {
        let inst = record_from_json(
            r#"{"asset_symbol":"NIFTY","instrument_type":"CE","strike_price":100.0,"expiry":"2099-01-02"}"#,
        );
        let filter = InstrumentFilter::options("nifty");
        assert!(filter.matches(&inst));

        let other = InstrumentFilter::options("BANKNIFTY");
        assert!(!other.matches(&inst));
    }

    #[test]
    fn test_filter_active_only_excludes_expired() {
        let expired = record_from_json(
            r#"{"asset_symbol":"NIFTY","instrument_type":"CE","strike_price":100.0,"expiry":"2001-01-02"}"#,
        );
        assert!(!InstrumentFilter::options("NIFTY").matches(&expired));

        let inactive_ok = InstrumentFilter {
            asset_symbol: Some("NIFTY".to_string()),
            active_only: false,
            ..Default::default()
        };
        assert!(inactive_ok.matches(&expired));
    }
}
