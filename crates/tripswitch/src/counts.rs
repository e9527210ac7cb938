// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// Request and outcome tallies for the current generation of a circuit breaker.
///
/// The breaker replaces its counts with a zeroed value every time a new generation begins,
/// i.e. on every state transition and on every periodic reset of the closed state. A copy of the
/// counts is handed to the [`TripPolicy`][crate::TripPolicy] after each failure in the closed
/// state.
///
/// The consecutive counters are mutually exclusive: recording a success zeroes
/// `consecutive_failures` and vice versa.
///
/// # Examples
///
/// ```
/// use tripswitch::Counts;
///
/// let counts = Counts::default();
/// assert_eq!(counts.requests, 0);
/// assert_eq!(counts.failure_ratio(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Counts {
    /// Number of requests admitted in the current generation.
    pub requests: u32,
    /// Number of successful outcomes recorded in the current generation.
    pub total_successes: u32,
    /// Number of failed outcomes recorded in the current generation.
    pub total_failures: u32,
    /// Length of the current streak of successes.
    pub consecutive_successes: u32,
    /// Length of the current streak of failures.
    pub consecutive_failures: u32,
}

impl Counts {
    /// Returns the fraction of admitted requests that failed, or `0.0` when nothing was admitted.
    #[must_use]
    pub fn failure_ratio(&self) -> f64 {
        if self.requests == 0 {
            return 0.0;
        }

        f64::from(self.total_failures) / f64::from(self.requests)
    }

    pub(crate) fn on_request(&mut self) {
        self.requests = self.requests.saturating_add(1);
    }

    pub(crate) fn on_success(&mut self) {
        self.total_successes = self.total_successes.saturating_add(1);
        self.consecutive_successes = self.consecutive_successes.saturating_add(1);
        self.consecutive_failures = 0;
    }

    pub(crate) fn on_failure(&mut self) {
        self.total_failures = self.total_failures.saturating_add(1);
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.consecutive_successes = 0;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }
}
