// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::constants::DEFAULT_CONSECUTIVE_FAILURES;
use crate::{Counts, State};

/// Decides whether a closed circuit breaker should trip open.
///
/// The policy is evaluated after every failure recorded while the breaker is closed, with the
/// counts of the current generation (the failure is already included). Returning `true` opens
/// the circuit.
///
/// Policies are shared between all callers of a breaker and may be evaluated concurrently with
/// other breakers using the same policy. They run while the breaker's lock is held, so they
/// should be cheap and must not call back into the breaker.
///
/// Any `Fn(&Counts) -> bool + Send + Sync` closure is a policy:
///
/// ```
/// use tripswitch::{Counts, Settings};
///
/// let settings = Settings::new("payments").ready_to_trip(|counts: &Counts| counts.total_failures >= 10);
/// ```
pub trait TripPolicy: Send + Sync {
    /// Returns `true` if the breaker should open given the current `counts`.
    fn ready_to_trip(&self, counts: &Counts) -> bool;
}

impl<F> TripPolicy for F
where
    F: Fn(&Counts) -> bool + Send + Sync,
{
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        self(counts)
    }
}

/// Trips when the number of consecutive failures exceeds a limit.
///
/// This is the default policy of every breaker, with a limit of 5: the sixth failure in a row
/// opens the circuit.
///
/// ```
/// use tripswitch::{ConsecutiveFailures, Counts, TripPolicy};
///
/// let policy = ConsecutiveFailures::new(2);
/// let counts = Counts { requests: 3, total_failures: 3, consecutive_failures: 3, ..Counts::default() };
/// assert!(policy.ready_to_trip(&counts));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsecutiveFailures {
    limit: u32,
}

impl ConsecutiveFailures {
    /// Creates a policy that trips once `consecutive_failures > limit`.
    #[must_use]
    pub const fn new(limit: u32) -> Self {
        Self { limit }
    }

    /// Returns the number of consecutive failures that is still tolerated.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }
}

impl Default for ConsecutiveFailures {
    fn default() -> Self {
        Self::new(DEFAULT_CONSECUTIVE_FAILURES)
    }
}

impl TripPolicy for ConsecutiveFailures {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.consecutive_failures > self.limit
    }
}

/// Trips when the failure ratio of the current generation reaches a threshold, once enough
/// requests have been admitted.
///
/// Pair this policy with an [`interval`][crate::Settings::interval] so that the ratio is
/// computed over a rolling window instead of the whole lifetime of the closed state.
///
/// ```
/// use tripswitch::{Counts, FailureRatio, TripPolicy};
///
/// // at least 3 requests and 60% of them failed
/// let policy = FailureRatio::new(3, 0.6);
/// let counts = Counts { requests: 3, total_successes: 1, total_failures: 2, consecutive_failures: 1, ..Counts::default() };
/// assert!(policy.ready_to_trip(&counts));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRatio {
    min_requests: u32,
    threshold: f64,
}

impl FailureRatio {
    /// Creates a policy that trips once `requests >= min_requests` and
    /// `total_failures / requests >= threshold`.
    ///
    /// The threshold is clamped to the `0.0..=1.0` range.
    #[must_use]
    pub fn new(min_requests: u32, threshold: f64) -> Self {
        Self {
            min_requests,
            threshold: threshold.clamp(0.0, 1.0),
        }
    }
}

impl TripPolicy for FailureRatio {
    fn ready_to_trip(&self, counts: &Counts) -> bool {
        counts.requests >= self.min_requests && counts.requests > 0 && counts.failure_ratio() >= self.threshold
    }
}

/// Receives a notification for every state transition of a circuit breaker.
///
/// The listener is invoked synchronously with the breaker's name, the previous state and the new
/// state, after the new generation has started. Notifications are delivered in transition order
/// because they are issued while the breaker's lock is held; the listener must therefore not call
/// back into the same breaker and should return quickly.
///
/// Any `Fn(&str, State, State) + Send + Sync` closure is a listener:
///
/// ```
/// use tripswitch::{Settings, State};
///
/// let settings = Settings::new("payments").on_state_change(|name: &str, from: State, to: State| {
///     println!("circuit breaker({name}): state change from({from}) to({to})");
/// });
/// ```
pub trait StateListener: Send + Sync {
    /// Called after the breaker named `name` moved from `from` to `to`.
    fn on_state_change(&self, name: &str, from: State, to: State);
}

impl<F> StateListener for F
where
    F: Fn(&str, State, State) + Send + Sync,
{
    fn on_state_change(&self, name: &str, from: State, to: State) {
        self(name, from, to);
    }
}
