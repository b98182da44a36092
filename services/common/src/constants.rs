//! Named constant namespaces used across services

/// Fixed-point arithmetic scales
pub mod fixed_point {
    /// Scale for 4 decimal places (1 tick = 0.0001)
    pub const SCALE_4: i64 = 10000;
}

/// Time conversion constants
pub mod time {
    /// Seconds per minute
    pub const SECS_PER_MINUTE: u64 = 60;

    /// Nanoseconds per second
    pub const NANOS_PER_SEC: u64 = 1_000_000_000;

    /// Nanoseconds per millisecond
    pub const NANOS_PER_MILLI: u64 = 1_000_000;
}

/// Market hours and session constants
pub mod market {
    /// NSE/BSE market close time - hour component
    pub const NSE_CLOSE_HOUR: u32 = 15;

    /// NSE/BSE market close time - minute component
    pub const NSE_CLOSE_MINUTE: u32 = 30;

    /// NSE/BSE market close time - second component
    pub const NSE_CLOSE_SECOND: u32 = 0;
}
