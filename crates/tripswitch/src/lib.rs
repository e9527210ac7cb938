// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(
    not(all(feature = "logs", feature = "metrics")),
    expect(
        rustdoc::broken_intra_doc_links,
        reason = "telemetry setters are only documented when their features are enabled"
    )
)]

//! A generation-aware circuit breaker that guards calls to unreliable operations.
//!
//! A [`CircuitBreaker`] wraps a unit of work, typically a remote call, and decides from the
//! recent outcome history whether the call should be attempted, rejected right away, or let
//! through as one of a few trial calls. It protects callers from repeatedly invoking an
//! operation that is likely to fail and lets the operation recover without a flood of traffic.
//!
//! # State Machine
//!
//! - **Closed**: every request is admitted and its outcome counted. After each failure the
//!   [`TripPolicy`] decides whether to open the circuit. With an
//!   [`interval`][Settings::interval], counts are cleared periodically.
//! - **Open**: every request is rejected with [`Rejected::Open`] until the
//!   [`timeout`][Settings::timeout] elapses.
//! - **Half-open**: at most [`max_requests`][Settings::max_requests] trial requests are
//!   admitted. That many consecutive successes close the circuit; any failure reopens it.
//!
//! Transitions driven by time are applied lazily when the breaker is next used, so there are no
//! background tasks.
//!
//! # Generations
//!
//! Every transition, and every periodic reset of the closed state, starts a new generation with
//! fresh [`Counts`]. A request remembers the generation that admitted it and its outcome is
//! dropped if that generation has ended by the time it completes. A slow request admitted
//! while closed can therefore never close, open or skew a circuit that has moved on.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use tick::Clock;
//! use tripswitch::{CircuitBreaker, Counts, Error, Settings, State};
//!
//! # fn call_backend() -> Result<u32, std::io::Error> { Ok(42) }
//! # fn example(clock: &Clock) {
//! let breaker = CircuitBreaker::new(
//!     Settings::new("backend")
//!         .max_requests(3)
//!         .interval(Duration::from_secs(600))
//!         .timeout(Duration::from_secs(2))
//!         .ready_to_trip(|counts: &Counts| counts.requests >= 10 && counts.failure_ratio() >= 0.6)
//!         .on_state_change(|name: &str, from: State, to: State| {
//!             println!("circuit breaker({name}): state change from({from}) to({to})");
//!         }),
//!     clock,
//! );
//!
//! match breaker.execute(call_backend) {
//!     Ok(value) => println!("got {value}"),
//!     Err(Error::Rejected(rejected)) => println!("not attempted: {rejected}"),
//!     Err(Error::Inner(e)) => println!("backend failed: {e}"),
//! }
//! # }
//! ```
//!
//! Work that does not fit in a closure can use the two phases directly: [`CircuitBreaker::before_request`]
//! hands out a [`Permit`] that reports the outcome later. Callers that use integer status codes
//! can use [`CircuitBreaker::execute_with_code`], which reports rejections as
//! [`ERR_OPEN_STATE`] and [`ERR_TOO_MANY_REQUESTS`].
//!
//! > **Note**: The breaker reads time from a [`Clock`][tick::Clock] of the [`tick`] crate. Use
//! > `ClockControl` from `tick`'s `test-util` feature to drive the breaker through its states in
//! > tests without sleeping.
//!
//! # Features
//!
//! - **`logs`**: `tracing` events for transitions, rejections and discarded outcomes, enabled
//!   per breaker with [`Settings::enable_logs`].
//! - **`metrics`**: an OpenTelemetry `resilience.event` counter, enabled per breaker with
//!   [`Settings::meter_provider`].
//! - **`serde`**: `BreakerConfig`, a serializable configuration that converts into [`Settings`].

mod breaker;
#[cfg(any(feature = "serde", test))]
mod config;
mod constants;
mod counts;
mod error;
mod machine;
mod policy;
mod settings;
mod state;
mod telemetry;

#[cfg(test)]
mod testing;

pub use breaker::{CircuitBreaker, Permit};
#[cfg(any(feature = "serde", test))]
pub use config::BreakerConfig;
pub use constants::{ERR_OPEN_STATE, ERR_TOO_MANY_REQUESTS};
pub use counts::Counts;
#[cfg(any(feature = "serde", test))]
pub use error::ConfigError;
pub use error::{Error, Rejected};
pub use policy::{ConsecutiveFailures, FailureRatio, StateListener, TripPolicy};
pub use settings::Settings;
pub use state::State;
