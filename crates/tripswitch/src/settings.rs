// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::borrow::Cow;
use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use crate::constants::{DEFAULT_MAX_REQUESTS, DEFAULT_TIMEOUT};
use crate::telemetry::Telemetry;
use crate::{ConsecutiveFailures, StateListener, TripPolicy};

/// Configuration of a [`CircuitBreaker`][crate::CircuitBreaker].
///
/// Settings are assembled with consuming setters and handed to
/// [`CircuitBreaker::new`][crate::CircuitBreaker::new], which applies the defaults to any value
/// left out or set to zero. The breaker never changes its settings afterwards.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tick::Clock;
/// use tripswitch::{CircuitBreaker, FailureRatio, Settings};
///
/// # fn example(clock: &Clock) {
/// let settings = Settings::new("payments")
///     .max_requests(3)
///     .interval(Duration::from_secs(600))
///     .timeout(Duration::from_secs(2))
///     .ready_to_trip(FailureRatio::new(10, 0.6));
///
/// let breaker = CircuitBreaker::new(settings, clock);
/// assert_eq!(breaker.name(), "payments");
/// # }
/// ```
#[derive(Clone)]
pub struct Settings {
    name: Cow<'static, str>,
    max_requests: u32,
    interval: Duration,
    timeout: Duration,
    ready_to_trip: Arc<dyn TripPolicy>,
    on_state_change: Option<Arc<dyn StateListener>>,
    pub(crate) telemetry: Telemetry,
}

impl Settings {
    /// Creates settings for a breaker called `name`, with every other value at its default.
    ///
    /// The name is surfaced in state change notifications, logs and metrics. It must not contain
    /// sensitive data.
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            max_requests: DEFAULT_MAX_REQUESTS,
            interval: Duration::ZERO,
            timeout: DEFAULT_TIMEOUT,
            ready_to_trip: Arc::new(ConsecutiveFailures::default()),
            on_state_change: None,
            telemetry: Telemetry::default(),
        }
    }

    /// Sets the maximum number of trial requests admitted while the breaker is half-open.
    ///
    /// The same number of consecutive successful trials closes the circuit again.
    ///
    /// **Default**: 1 (a value of 0 is replaced by the default)
    #[must_use]
    pub fn max_requests(mut self, max_requests: u32) -> Self {
        self.max_requests = max_requests;
        self
    }

    /// Sets the period after which a closed breaker clears its counts.
    ///
    /// Every reset starts a new generation, so outcomes of requests admitted before the reset are
    /// discarded when they are reported.
    ///
    /// **Default**: zero, counts are never cleared while the breaker stays closed
    #[must_use]
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets how long the breaker stays open before it starts admitting trial requests.
    ///
    /// **Default**: 60 seconds (a zero value is replaced by the default)
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the policy that decides when a closed breaker trips open.
    ///
    /// **Default**: [`ConsecutiveFailures::default()`], trips after the sixth failure in a row
    ///
    /// # Arguments
    ///
    /// * `policy` - A [`TripPolicy`] or a `Fn(&Counts) -> bool` closure
    #[must_use]
    pub fn ready_to_trip(mut self, policy: impl TripPolicy + 'static) -> Self {
        self.ready_to_trip = Arc::new(policy);
        self
    }

    /// Sets the listener notified of every state transition.
    ///
    /// **Default**: No listener
    ///
    /// # Arguments
    ///
    /// * `listener` - A [`StateListener`] or a `Fn(&str, State, State)` closure receiving the
    ///   breaker's name, the previous state and the new state
    #[must_use]
    pub fn on_state_change(mut self, listener: impl StateListener + 'static) -> Self {
        self.on_state_change = Some(Arc::new(listener));
        self
    }

    /// Reports transitions and rejections to the `resilience.event` counter of `provider`.
    ///
    /// **Default**: No metrics
    #[cfg(any(feature = "metrics", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "metrics")))]
    #[must_use]
    pub fn meter_provider(mut self, provider: &dyn opentelemetry::metrics::MeterProvider) -> Self {
        self.telemetry.event_reporter = Some(crate::telemetry::create_event_counter(provider));
        self
    }

    /// Emits `tracing` events for transitions, rejections and discarded outcomes.
    ///
    /// **Default**: No logs
    #[cfg(any(feature = "logs", test))]
    #[cfg_attr(docsrs, doc(cfg(feature = "logs")))]
    #[must_use]
    pub fn enable_logs(mut self) -> Self {
        self.telemetry.logs_enabled = true;
        self
    }

    /// Returns the name of the breaker.
    #[must_use]
    pub fn get_name(&self) -> &str {
        &self.name
    }

    /// Returns the maximum number of trial requests admitted while half-open.
    #[must_use]
    pub fn get_max_requests(&self) -> u32 {
        self.max_requests
    }

    /// Returns the reset period of the closed state, zero if counts are never reset.
    #[must_use]
    pub fn get_interval(&self) -> Duration {
        self.interval
    }

    /// Returns how long the breaker stays open.
    #[must_use]
    pub fn get_timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` if a state change listener is configured.
    #[must_use]
    pub fn has_on_state_change(&self) -> bool {
        self.on_state_change.is_some()
    }

    pub(crate) fn trip_policy(&self) -> &dyn TripPolicy {
        &*self.ready_to_trip
    }

    pub(crate) fn listener(&self) -> Option<&dyn StateListener> {
        self.on_state_change.as_deref()
    }

    /// Replaces zero values with their defaults.
    pub(crate) fn normalized(mut self) -> Self {
        if self.max_requests == 0 {
            self.max_requests = DEFAULT_MAX_REQUESTS;
        }

        if self.timeout.is_zero() {
            self.timeout = DEFAULT_TIMEOUT;
        }

        self
    }
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("name", &self.name)
            .field("max_requests", &self.max_requests)
            .field("interval", &self.interval)
            .field("timeout", &self.timeout)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish_non_exhaustive()
    }
}
