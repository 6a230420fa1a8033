//! Time/tick conversion helpers.

use std::time::Duration;

/// Number of microseconds in one millisecond.
pub const MICROS_PER_MS: u64 = 1_000;

/// Number of whole ticks of `period` covering `ms` milliseconds, rounded up.
/// - A zero period is treated as 1 µs to avoid division by zero.
/// - Always at least 1 so a configured threshold can never be "already met".
#[inline]
pub fn ticks_for_ms(ms: u64, period: Duration) -> u32 {
    let period_us = u64::try_from(period.as_micros()).unwrap_or(u64::MAX).max(1);
    let total_us = ms.saturating_mul(MICROS_PER_MS);
    let ticks = total_us.div_ceil(period_us).max(1);
    u32::try_from(ticks).unwrap_or(u32::MAX)
}
