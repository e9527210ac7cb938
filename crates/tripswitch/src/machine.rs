// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Instant;

use crate::{Counts, Rejected, Settings, State};

/// Outcome of an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Success,
    Failure,
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success { Self::Success } else { Self::Failure }
    }
}

/// The mutable part of a circuit breaker. Always accessed under the breaker's lock.
///
/// Time driven transitions are applied lazily: every entry point first brings the state up to
/// date with `now` before doing anything else.
#[derive(Debug)]
pub(crate) struct Machine {
    state: State,
    generation: u64,
    counts: Counts,
    // None means "no deadline": a closed breaker that never resets, or a half-open breaker.
    expiry: Option<Instant>,
}

impl Machine {
    pub(crate) fn new(now: Instant, settings: &Settings) -> Self {
        let mut machine = Self {
            state: State::Closed,
            generation: 0,
            counts: Counts::default(),
            expiry: None,
        };

        machine.start_generation(now, settings);
        machine
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    #[cfg(test)]
    pub(crate) fn expiry(&self) -> Option<Instant> {
        self.expiry
    }

    pub(crate) fn counts(&self) -> Counts {
        self.counts
    }

    /// Applies any transition that is due at `now` and returns the current generation and state.
    pub(crate) fn current_state(&mut self, now: Instant, settings: &Settings) -> (u64, State) {
        let expired = self.expiry.is_some_and(|expiry| expiry <= now);

        match self.state {
            State::Closed if expired => self.start_generation(now, settings),
            State::Open if expired => self.set_state(State::HalfOpen, now, settings),
            _ => {}
        }

        (self.generation, self.state)
    }

    /// Admits a request and returns the generation it belongs to.
    pub(crate) fn before_request(&mut self, now: Instant, settings: &Settings) -> Result<u64, Rejected> {
        let (generation, state) = self.current_state(now, settings);

        let rejected = match state {
            State::Open => Rejected::Open,
            State::HalfOpen if self.counts.requests >= settings.get_max_requests() => Rejected::TooManyRequests,
            _ => {
                self.counts.on_request();
                return Ok(generation);
            }
        };

        settings.telemetry.report_rejected(settings.get_name(), state, rejected);
        Err(rejected)
    }

    /// Records the outcome of a request admitted in generation `before`.
    ///
    /// Outcomes of requests admitted by a generation that has since ended are discarded.
    pub(crate) fn after_request(&mut self, before: u64, outcome: Outcome, now: Instant, settings: &Settings) {
        let (generation, state) = self.current_state(now, settings);

        if generation != before {
            settings.telemetry.report_stale(settings.get_name(), before, generation);
            return;
        }

        match outcome {
            Outcome::Success => self.on_success(state, now, settings),
            Outcome::Failure => self.on_failure(state, now, settings),
        }
    }

    fn on_success(&mut self, state: State, now: Instant, settings: &Settings) {
        match state {
            State::Closed => self.counts.on_success(),
            State::HalfOpen => {
                self.counts.on_success();

                if self.counts.consecutive_successes >= settings.get_max_requests() {
                    self.set_state(State::Closed, now, settings);
                }
            }
            State::Open => {}
        }
    }

    fn on_failure(&mut self, state: State, now: Instant, settings: &Settings) {
        match state {
            State::Closed => {
                self.counts.on_failure();

                if settings.trip_policy().ready_to_trip(&self.counts) {
                    self.set_state(State::Open, now, settings);
                }
            }
            State::HalfOpen => self.set_state(State::Open, now, settings),
            State::Open => {}
        }
    }

    fn set_state(&mut self, state: State, now: Instant, settings: &Settings) {
        if self.state == state {
            return;
        }

        let from = self.state;
        let ended = self.counts;

        self.state = state;
        self.start_generation(now, settings);

        settings.telemetry.report_transition(settings.get_name(), from, state, &ended);

        if let Some(listener) = settings.listener() {
            listener.on_state_change(settings.get_name(), from, state);
        }
    }

    fn start_generation(&mut self, now: Instant, settings: &Settings) {
        self.generation = self.generation.wrapping_add(1);
        self.counts.clear();

        self.expiry = match self.state {
            State::Closed if settings.get_interval().is_zero() => None,
            State::Closed => now.checked_add(settings.get_interval()),
            State::Open => now.checked_add(settings.get_timeout()),
            State::HalfOpen => None,
        };
    }
}
