// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Retry timing constants and backoff calculation for the session actor.

use std::time::Duration;

/// Base delay for linear-growth initialization backoff.
pub const INIT_RETRY_BASE: Duration = Duration::from_secs(30);

/// Upper bound on the initialization retry delay.
pub const INIT_RETRY_CAP: Duration = Duration::from_secs(300);

/// Initialization attempts before the actor fail-stops.
pub const INIT_RETRY_CEILING: u32 = 5;

/// Cool-down before restarting after an authentication failure.
pub const AUTH_FAILURE_COOLDOWN: Duration = Duration::from_secs(10);

/// Delay before reconnecting after an unexpected disconnect.
///
/// Disconnect retries have no ceiling; disconnects are expected
/// operational noise.
pub const RECONNECT_DELAY: Duration = Duration::from_secs(15);

/// Delay before the next initialization attempt.
///
/// Grows with the attempt count and saturates at [`INIT_RETRY_CAP`].
pub fn init_retry_delay(attempt: u32) -> Duration {
    INIT_RETRY_BASE
        .saturating_mul(attempt.max(1))
        .min(INIT_RETRY_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempts() {
        assert_eq!(init_retry_delay(1), Duration::from_secs(30));
        assert_eq!(init_retry_delay(2), Duration::from_secs(60));
        assert_eq!(init_retry_delay(4), Duration::from_secs(120));
    }

    #[test]
    fn delay_saturates_at_cap() {
        assert_eq!(init_retry_delay(10), INIT_RETRY_CAP);
        assert_eq!(init_retry_delay(u32::MAX), INIT_RETRY_CAP);
    }

    #[test]
    fn zero_attempts_still_waits_base() {
        assert_eq!(init_retry_delay(0), INIT_RETRY_BASE);
    }
}
