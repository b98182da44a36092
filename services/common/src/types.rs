//! Core fixed-point and timestamp types

use crate::constants::fixed_point::SCALE_4;
use crate::constants::time::{NANOS_PER_MILLI, NANOS_PER_SEC};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Price type (stored as i64 ticks for determinism, 4 decimal places)
///
/// Storing prices as integer ticks makes equality exact, which matters for
/// strike-price matching: two prices parsed from the same decimal always
/// compare equal, with no float tolerance involved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Px(i64); // Internal: price in ticks (1 tick = 0.0001)

impl Px {
    /// Create a new Price from a float value (external API boundary only)
    #[must_use]
    pub fn new(value: f64) -> Self {
        let scaled = (value * SCALE_4 as f64).round();
        const MAX_SAFE: f64 = 9_223_372_036_854_775_807.0;
        const MIN_SAFE: f64 = -9_223_372_036_854_775_808.0;

        let clamped = if scaled >= MAX_SAFE {
            i64::MAX
        } else if scaled <= MIN_SAFE {
            i64::MIN
        } else {
            // SAFETY: bounds checked above, cast cannot truncate
            #[allow(clippy::cast_possible_truncation)]
            let result = scaled as i64;
            result
        };
        Self(clamped)
    }

    /// Get price as f64 for external APIs only
    ///
    /// WARNING: for values > 2^53 / 10000 this may lose precision.
    /// Internal code should always compare in fixed point.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        // SAFETY: single conversion at the system boundary
        #[allow(clippy::cast_precision_loss)]
        let value = self.0 as f64 / SCALE_4 as f64;
        value
    }

    /// Get price as i64 ticks
    #[must_use]
    pub const fn as_i64(&self) -> i64 {
        self.0
    }

    /// Create from i64 ticks
    #[must_use]
    pub const fn from_i64(ticks: i64) -> Self {
        Self(ticks)
    }

    /// Zero price
    pub const ZERO: Self = Self(0);
}

impl fmt::Display for Px {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / SCALE_4;
        let frac = (self.0 % SCALE_4).abs();
        write!(f, "{whole}.{frac:04}")
    }
}

/// Timestamp in nanoseconds since UNIX epoch
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Ts(u64);

impl Ts {
    /// Get current timestamp
    #[must_use]
    pub fn now() -> Self {
        use std::time::{SystemTime, UNIX_EPOCH};
        // SAFETY: u128 nanos since 1970 fit in u64 until the year 2554
        #[allow(clippy::cast_possible_truncation)]
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_else(|_| std::time::Duration::from_secs(0))
            .as_nanos() as u64;
        Self(nanos)
    }

    /// Create timestamp from nanoseconds
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Create timestamp from milliseconds
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis * NANOS_PER_MILLI)
    }

    /// Get timestamp as nanoseconds
    #[must_use]
    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Get timestamp as milliseconds
    #[must_use]
    pub const fn as_millis(&self) -> u64 {
        self.0 / NANOS_PER_MILLI
    }

    /// Get timestamp as whole seconds
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.0 / NANOS_PER_SEC
    }
}

impl fmt::Display for Ts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ns", self.0)
    }
}
