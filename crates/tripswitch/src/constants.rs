// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

/// Default maximum number of trial requests admitted while half-open.
pub(crate) const DEFAULT_MAX_REQUESTS: u32 = 1;

/// Default duration of the open state before the breaker starts probing.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default number of consecutive failures tolerated before the closed breaker trips.
pub(crate) const DEFAULT_CONSECUTIVE_FAILURES: u32 = 5;

/// Code reported by [`execute_with_code`][crate::CircuitBreaker::execute_with_code] when a
/// half-open breaker has no trial slots left.
pub const ERR_TOO_MANY_REQUESTS: i32 = i32::MIN;

/// Code reported by [`execute_with_code`][crate::CircuitBreaker::execute_with_code] when the
/// breaker is open.
pub const ERR_OPEN_STATE: i32 = -0x7000_0000;

pub(crate) const ERR_POISONED_LOCK: &str =
    "poisoned lock - cannot continue execution because security and privacy guarantees can no longer be upheld";
