// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Structured logs and metrics emitted by circuit breakers.
//!
//! Both channels are opt-in per breaker and compiled in only with the matching crate feature:
//!
//! - `logs`: [`Settings::enable_logs`][crate::Settings::enable_logs] emits `tracing` events.
//! - `metrics`: [`Settings::meter_provider`][crate::Settings::meter_provider] reports to an
//!   OpenTelemetry `resilience.event` counter.

use crate::{Counts, Rejected, State};

/// Key used to annotate the name of the circuit breaker.
#[cfg(any(feature = "metrics", test))]
pub(crate) const STRATEGY_NAME: &str = "resilience.strategy.name";

/// Key used to annotate the specific resilience event being emitted.
#[cfg(any(feature = "metrics", test))]
pub(crate) const EVENT_NAME: &str = "resilience.event.name";

/// Key used to annotate the state of the circuit breaker when the event was emitted.
#[cfg(any(feature = "metrics", test))]
pub(crate) const CIRCUIT_STATE: &str = "resilience.circuit_breaker.state";

#[cfg(any(feature = "metrics", test))]
pub(crate) const CIRCUIT_OPENED_EVENT_NAME: &str = "circuit_opened";
#[cfg(any(feature = "metrics", test))]
pub(crate) const CIRCUIT_CLOSED_EVENT_NAME: &str = "circuit_closed";
#[cfg(any(feature = "metrics", test))]
pub(crate) const CIRCUIT_HALF_OPENED_EVENT_NAME: &str = "circuit_half_opened";
#[cfg(any(feature = "metrics", test))]
pub(crate) const CIRCUIT_REJECTED_EVENT_NAME: &str = "circuit_rejected";

#[cfg(any(feature = "metrics", test))]
const METER_NAME: &str = "tripswitch";
#[cfg(any(feature = "metrics", test))]
const VERSION: &str = "v0.1.0";
#[cfg(any(feature = "metrics", test))]
const SCHEMA_URL: &str = "https://opentelemetry.io/schemas/1.47.0";

#[cfg(any(feature = "metrics", test))]
pub(crate) fn create_event_counter(meter_provider: &dyn opentelemetry::metrics::MeterProvider) -> opentelemetry::metrics::Counter<u64> {
    meter_provider
        .meter_with_scope(
            opentelemetry::InstrumentationScope::builder(METER_NAME)
                .with_version(VERSION)
                .with_schema_url(SCHEMA_URL)
                .build(),
        )
        .u64_counter("resilience.event")
        .with_description("Emitted upon the occurrence of a resilience event.")
        .with_unit("u64")
        .build()
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Telemetry {
    #[cfg(any(feature = "metrics", test))]
    pub(crate) event_reporter: Option<opentelemetry::metrics::Counter<u64>>,
    #[cfg(any(feature = "logs", test))]
    pub(crate) logs_enabled: bool,
}

impl Telemetry {
    #[cfg(any(feature = "metrics", test))]
    fn report_metrics(&self, name: &str, event: &'static str, state: State) {
        if let Some(reporter) = &self.event_reporter {
            reporter.add(
                1,
                &[
                    opentelemetry::KeyValue::new(STRATEGY_NAME, name.to_owned()),
                    opentelemetry::KeyValue::new(EVENT_NAME, event),
                    opentelemetry::KeyValue::new(CIRCUIT_STATE, state.as_label()),
                ],
            );
        }
    }

    /// Reports a transition. `counts` are the counts of the generation that just ended.
    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when telemetry features not used")
    )]
    #[cfg_attr(
        all(feature = "metrics", not(any(feature = "logs", test))),
        expect(unused_variables, reason = "only logs read every argument")
    )]
    pub(crate) fn report_transition(&self, name: &str, from: State, to: State, counts: &Counts) {
        #[cfg(any(feature = "metrics", test))]
        self.report_metrics(
            name,
            match to {
                State::Closed => CIRCUIT_CLOSED_EVENT_NAME,
                State::HalfOpen => CIRCUIT_HALF_OPENED_EVENT_NAME,
                State::Open => CIRCUIT_OPENED_EVENT_NAME,
            },
            to,
        );

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            if to == State::Open {
                tracing::event!(
                    name: "tripswitch.circuit_breaker.state_changed",
                    tracing::Level::WARN,
                    circuit_breaker.name = %name,
                    circuit_breaker.from = from.as_label(),
                    circuit_breaker.to = to.as_label(),
                    circuit_breaker.requests = counts.requests,
                    circuit_breaker.total_failures = counts.total_failures,
                    circuit_breaker.consecutive_failures = counts.consecutive_failures,
                    "circuit breaker opened",
                );
            } else {
                tracing::event!(
                    name: "tripswitch.circuit_breaker.state_changed",
                    tracing::Level::INFO,
                    circuit_breaker.name = %name,
                    circuit_breaker.from = from.as_label(),
                    circuit_breaker.to = to.as_label(),
                    circuit_breaker.requests = counts.requests,
                    circuit_breaker.total_successes = counts.total_successes,
                    circuit_breaker.consecutive_successes = counts.consecutive_successes,
                    "circuit breaker state changed",
                );
            }
        }
    }

    #[cfg_attr(
        not(any(feature = "metrics", feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when telemetry features not used")
    )]
    #[cfg_attr(
        all(feature = "metrics", not(any(feature = "logs", test))),
        expect(unused_variables, reason = "only logs read every argument")
    )]
    pub(crate) fn report_rejected(&self, name: &str, state: State, rejected: Rejected) {
        #[cfg(any(feature = "metrics", test))]
        self.report_metrics(name, CIRCUIT_REJECTED_EVENT_NAME, state);

        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "tripswitch.circuit_breaker.rejected",
                tracing::Level::WARN,
                circuit_breaker.name = %name,
                circuit_breaker.state = state.as_label(),
                circuit_breaker.rejection = %rejected,
                "circuit breaker rejected request",
            );
        }
    }

    #[cfg_attr(
        not(any(feature = "logs", test)),
        expect(unused_variables, clippy::unused_self, reason = "unused when logs feature not used")
    )]
    pub(crate) fn report_stale(&self, name: &str, admitted: u64, current: u64) {
        #[cfg(any(feature = "logs", test))]
        if self.logs_enabled {
            tracing::event!(
                name: "tripswitch.circuit_breaker.stale_outcome",
                tracing::Level::DEBUG,
                circuit_breaker.name = %name,
                circuit_breaker.generation.admitted = admitted,
                circuit_breaker.generation.current = current,
                "discarding outcome of a request admitted by an expired generation",
            );
        }
    }
}
