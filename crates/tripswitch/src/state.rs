// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fmt::{self, Display, Formatter};

/// The state of a circuit breaker.
///
/// ```text
///          failure & ready to trip          timeout elapsed
/// Closed ─────────────────────────▶ Open ─────────────────▶ HalfOpen
///   ▲  ▲                             ▲                         │  │
///   │  └─ interval elapsed           └──── any trial failure ──┘  │
///   └──────────────────── enough consecutive successes ───────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum State {
    /// Calls pass through and failures are tallied towards tripping.
    Closed = 0,
    /// A bounded number of trial calls are admitted to test recovery.
    HalfOpen = 1,
    /// Calls are rejected until the open timeout elapses.
    Open = 2,
}

impl State {
    /// Returns the human readable name of the state.
    ///
    /// ```
    /// use tripswitch::State;
    ///
    /// assert_eq!(State::Closed.as_str(), "close");
    /// assert_eq!(State::HalfOpen.as_str(), "half open");
    /// assert_eq!(State::Open.as_str(), "open");
    /// ```
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "close",
            Self::HalfOpen => "half open",
            Self::Open => "open",
        }
    }

    /// Name used for telemetry attributes.
    #[cfg(any(feature = "metrics", feature = "logs", test))]
    pub(crate) const fn as_label(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::HalfOpen => "half_open",
            Self::Open => "open",
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
