// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

use crate::constants::{ERR_OPEN_STATE, ERR_TOO_MANY_REQUESTS};

/// The reason a circuit breaker refused to admit a request.
///
/// A rejected request is never executed and is not recorded in the breaker's counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum Rejected {
    /// The circuit is open and the open timeout has not elapsed yet.
    #[error("circuit breaker is open")]
    Open,

    /// The circuit is half-open and all trial slots of the current generation are taken.
    #[error("too many requests")]
    TooManyRequests,
}

impl Rejected {
    /// Returns the reserved code reported for this rejection by
    /// [`execute_with_code`][crate::CircuitBreaker::execute_with_code].
    ///
    /// ```
    /// use tripswitch::{ERR_OPEN_STATE, ERR_TOO_MANY_REQUESTS, Rejected};
    ///
    /// assert_eq!(Rejected::Open.code(), ERR_OPEN_STATE);
    /// assert_eq!(Rejected::TooManyRequests.code(), ERR_TOO_MANY_REQUESTS);
    /// ```
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::Open => ERR_OPEN_STATE,
            Self::TooManyRequests => ERR_TOO_MANY_REQUESTS,
        }
    }
}

/// The error returned by [`CircuitBreaker::execute`][crate::CircuitBreaker::execute] and
/// [`CircuitBreaker::execute_async`][crate::CircuitBreaker::execute_async].
///
/// Distinguishes a request the breaker refused to run from a request that ran and failed.
#[derive(Debug, Error)]
pub enum Error<E> {
    /// The breaker rejected the request without running it.
    #[error(transparent)]
    Rejected(#[from] Rejected),

    /// The request ran and returned an error, which was recorded as a failure.
    #[error("{0}")]
    Inner(E),
}

impl<E> Error<E> {
    /// Returns the error of the operation, or `None` if the request was rejected.
    #[must_use]
    pub fn into_inner(self) -> Option<E> {
        match self {
            Self::Inner(e) => Some(e),
            Self::Rejected(_) => None,
        }
    }

    /// Returns the rejection reason, or `None` if the operation itself failed.
    #[must_use]
    pub const fn rejection(&self) -> Option<Rejected> {
        match self {
            Self::Rejected(r) => Some(*r),
            Self::Inner(_) => None,
        }
    }

    /// Returns `true` if the breaker rejected the request.
    #[must_use]
    pub const fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// An invalid value in a [`BreakerConfig`][crate::BreakerConfig].
#[cfg(any(feature = "serde", test))]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A duration setting is negative.
    #[error("{field} must not be negative, got {value}")]
    NegativeDuration {
        /// The name of the offending setting.
        field: &'static str,
        /// The configured value.
        value: jiff::SignedDuration,
    },
}
