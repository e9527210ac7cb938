// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Mutex;

use tick::Clock;

use crate::constants::ERR_POISONED_LOCK;
use crate::machine::{Machine, Outcome};
use crate::{Counts, Error, Rejected, Settings, State};

/// A circuit breaker guarding calls to an unreliable operation.
///
/// The breaker starts [`Closed`][State::Closed] and lets every request through while tallying
/// their outcomes. Once its [`TripPolicy`][crate::TripPolicy] decides there were too many
/// failures it opens and rejects every request until the open timeout elapses. It then turns
/// [`HalfOpen`][State::HalfOpen] and admits a limited number of trial requests: enough
/// consecutive successes close the circuit again while a single failure reopens it.
///
/// Every state transition, and every periodic reset of a closed breaker, starts a new
/// *generation*. Outcomes are only recorded against the generation that admitted the request,
/// so a slow request cannot affect the breaker after the state it was admitted in is gone.
///
/// The breaker is `Send + Sync`; share it between threads or tasks with an [`Arc`][std::sync::Arc].
/// The internal lock is never held while the guarded operation runs.
///
/// # Examples
///
/// ```
/// use tick::Clock;
/// use tripswitch::{CircuitBreaker, Error, Settings};
///
/// # fn fetch() -> Result<String, std::io::Error> { Ok("hello".to_string()) }
/// # fn example(clock: &Clock) {
/// let breaker = CircuitBreaker::new(Settings::new("fetch"), clock);
///
/// match breaker.execute(fetch) {
///     Ok(body) => println!("{body}"),
///     Err(Error::Rejected(rejected)) => println!("not attempted: {rejected}"),
///     Err(Error::Inner(e)) => println!("failed: {e}"),
/// }
/// # }
/// ```
#[derive(Debug)]
pub struct CircuitBreaker {
    settings: Settings,
    clock: Clock,
    machine: Mutex<Machine>,
}

impl CircuitBreaker {
    /// Creates a closed circuit breaker.
    ///
    /// A `max_requests` of 0 is replaced by 1 and a zero `timeout` by 60 seconds.
    #[must_use]
    pub fn new(settings: Settings, clock: &Clock) -> Self {
        let settings = settings.normalized();
        let machine = Machine::new(clock.instant(), &settings);

        Self {
            settings,
            clock: clock.clone(),
            machine: Mutex::new(machine),
        }
    }

    /// Returns the name of the breaker.
    #[must_use]
    pub fn name(&self) -> &str {
        self.settings.get_name()
    }

    /// Returns the effective settings, with defaults applied.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Returns the current state, applying any transition that is due first.
    ///
    /// An open breaker whose timeout has elapsed reports [`State::HalfOpen`].
    ///
    /// # Panics
    ///
    /// Panics if a trip policy or state change listener panicked earlier and poisoned the lock.
    #[must_use]
    pub fn state(&self) -> State {
        let now = self.clock.instant();

        self.machine.lock().expect(ERR_POISONED_LOCK).current_state(now, &self.settings).1
    }

    /// Returns a snapshot of the counts of the current generation.
    ///
    /// # Panics
    ///
    /// Panics if a trip policy or state change listener panicked earlier and poisoned the lock.
    #[must_use]
    pub fn counts(&self) -> Counts {
        let now = self.clock.instant();
        let mut machine = self.machine.lock().expect(ERR_POISONED_LOCK);

        _ = machine.current_state(now, &self.settings);
        machine.counts()
    }

    /// Asks the breaker to admit a request.
    ///
    /// On success the returned [`Permit`] must be used to report the outcome once the request
    /// completes. Use this two-phase form when the guarded work does not fit in a closure;
    /// otherwise prefer [`execute`][Self::execute].
    ///
    /// # Errors
    ///
    /// Returns [`Rejected::Open`] if the breaker is open, or [`Rejected::TooManyRequests`] if it
    /// is half-open and all trial slots are taken. Rejected requests are not counted.
    ///
    /// # Panics
    ///
    /// Panics if a trip policy or state change listener panicked earlier and poisoned the lock.
    ///
    /// # Examples
    ///
    /// ```
    /// use tick::Clock;
    /// use tripswitch::{CircuitBreaker, Settings};
    ///
    /// # fn example(clock: &Clock) -> Result<(), tripswitch::Rejected> {
    /// let breaker = CircuitBreaker::new(Settings::new("upload"), clock);
    ///
    /// let permit = breaker.before_request()?;
    /// let succeeded = true; // perform the request
    /// permit.record(succeeded);
    /// # Ok(())
    /// # }
    /// ```
    pub fn before_request(&self) -> Result<Permit<'_>, Rejected> {
        let now = self.clock.instant();

        // NOTE: Remember to execute all expensive operations (like time checks) outside the lock.
        let generation = self
            .machine
            .lock()
            .expect(ERR_POISONED_LOCK)
            .before_request(now, &self.settings)?;

        Ok(Permit {
            breaker: self,
            generation,
            reported: false,
        })
    }

    /// Runs `operation` if the breaker admits it and records its outcome.
    ///
    /// `Ok` is recorded as a success and `Err` as a failure. If `operation` panics, a failure is
    /// recorded and the panic resumes.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] without running `operation` if the breaker rejects the
    /// request, or [`Error::Inner`] with the error returned by `operation`.
    pub fn execute<T, E>(&self, operation: impl FnOnce() -> Result<T, E>) -> Result<T, Error<E>> {
        let permit = self.before_request()?;
        let result = operation();
        permit.record(result.is_ok());

        result.map_err(Error::Inner)
    }

    /// Runs the future produced by `operation` if the breaker admits it and records its outcome.
    ///
    /// The breaker's lock is not held while the future is pending. A future that is dropped
    /// before completion leaves its request counted but records no outcome.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] without calling `operation` if the breaker rejects the
    /// request, or [`Error::Inner`] with the error produced by the future.
    pub async fn execute_async<T, E, F, Fut>(&self, operation: F) -> Result<T, Error<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = self.before_request()?;
        let result = operation().await;
        permit.record(result.is_ok());

        result.map_err(Error::Inner)
    }

    /// Runs `operation` if the breaker admits it and records its outcome by code.
    ///
    /// `operation` returns a value and a code: `0` is a success and any other code a failure.
    /// Both are returned unchanged. When the breaker rejects the request, `operation` is not
    /// called and `R::default()` is returned with [`ERR_OPEN_STATE`][crate::ERR_OPEN_STATE] or
    /// [`ERR_TOO_MANY_REQUESTS`][crate::ERR_TOO_MANY_REQUESTS].
    ///
    /// ```
    /// use tick::Clock;
    /// use tripswitch::{CircuitBreaker, Settings};
    ///
    /// # fn example(clock: &Clock) {
    /// let breaker = CircuitBreaker::new(Settings::new("legacy"), clock);
    ///
    /// let (body, code) = breaker.execute_with_code(|| ("payload".to_string(), 0));
    /// assert_eq!((body.as_str(), code), ("payload", 0));
    /// # }
    /// ```
    pub fn execute_with_code<R: Default>(&self, operation: impl FnOnce() -> (R, i32)) -> (R, i32) {
        let permit = match self.before_request() {
            Ok(permit) => permit,
            Err(rejected) => return (R::default(), rejected.code()),
        };

        let (value, code) = operation();
        permit.record(code == 0);

        (value, code)
    }

    fn after_request(&self, generation: u64, outcome: Outcome) {
        let now = self.clock.instant();

        self.machine
            .lock()
            .expect(ERR_POISONED_LOCK)
            .after_request(generation, outcome, now, &self.settings);
    }
}

/// Admission of a single request by a [`CircuitBreaker`].
///
/// Report the outcome with [`success`][Self::success], [`failure`][Self::failure] or
/// [`record`][Self::record]. The outcome only counts if the generation that admitted the
/// request is still current.
///
/// A permit dropped without a report leaves its request counted in the generation. A permit
/// dropped while its thread is panicking records a failure.
#[derive(Debug)]
#[must_use = "the outcome of an admitted request must be reported through the permit"]
pub struct Permit<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    reported: bool,
}

impl Permit<'_> {
    /// Returns the generation that admitted the request.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Records a successful outcome.
    pub fn success(self) {
        self.record(true);
    }

    /// Records a failed outcome.
    pub fn failure(self) {
        self.record(false);
    }

    /// Records the outcome of the request.
    pub fn record(mut self, success: bool) {
        self.reported = true;
        self.breaker.after_request(self.generation, Outcome::from(success));
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        if self.reported || !std::thread::panicking() {
            return;
        }

        // A poisoned lock here would turn the unwinding panic into an abort.
        if let Ok(mut machine) = self.breaker.machine.lock() {
            let now = self.breaker.clock.instant();
            machine.after_request(self.generation, Outcome::Failure, now, &self.breaker.settings);
        }
    }
}
