//! Time utilities for the simulation host

use std::time::Duration;
use tokio::time::Instant;

/// Default host tick rate (ticks per second)
pub const DEFAULT_TICK_RATE: u32 = 64;

/// Calculate delta time for one tick (in seconds)
pub fn tick_delta(tick_rate: u32) -> f32 {
    1.0 / tick_rate.max(1) as f32
}

/// Longest configurable span: one day
pub const MAX_SPAN_SECS: f32 = 86_400.0;

/// Convert configured seconds into a `Duration`.
/// Negative, NaN and infinite values collapse to zero, anything longer
/// than [`MAX_SPAN_SECS`] saturates there.
pub fn secs(value: f32) -> Duration {
    if value.is_finite() && value > 0.0 {
        Duration::try_from_secs_f32(value.min(MAX_SPAN_SECS)).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

/// `now + after` without overflow. Spans are capped like [`secs`].
pub fn deadline(now: Instant, after: Duration) -> Instant {
    let after = after.min(Duration::from_secs(MAX_SPAN_SECS as u64));
    now.checked_add(after).unwrap_or(now)
}
