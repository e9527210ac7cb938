// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Integration tests for the circuit breaker using only public API.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tick::{Clock, ClockControl};
use tripswitch::{
    CircuitBreaker, Counts, ERR_OPEN_STATE, ERR_TOO_MANY_REQUESTS, Error, FailureRatio, Permit, Rejected, Settings, State,
};

const FAILURE_CODE: i32 = 100;

type Transitions = Arc<Mutex<Vec<(String, State, State)>>>;

fn counts(
    requests: u32,
    total_successes: u32,
    total_failures: u32,
    consecutive_successes: u32,
    consecutive_failures: u32,
) -> Counts {
    Counts {
        requests,
        total_successes,
        total_failures,
        consecutive_successes,
        consecutive_failures,
    }
}

fn succeed(cb: &CircuitBreaker) -> i32 {
    cb.execute_with_code(|| ((), 0)).1
}

fn fail(cb: &CircuitBreaker) -> i32 {
    match cb.execute_with_code(|| ((), FAILURE_CODE)).1 {
        FAILURE_CODE => 0,
        code => code,
    }
}

fn custom_breaker(clock: &Clock) -> (CircuitBreaker, Transitions) {
    let transitions = Transitions::default();
    let transitions_clone = Arc::clone(&transitions);

    let settings = Settings::new("cb")
        .max_requests(3)
        .interval(Duration::from_secs(30))
        .timeout(Duration::from_secs(90))
        .ready_to_trip(FailureRatio::new(3, 0.6))
        .on_state_change(move |name: &str, from: State, to: State| {
            transitions_clone.lock().unwrap().push((name.to_string(), from, to));
        });

    (CircuitBreaker::new(settings, clock), transitions)
}

fn last_transition(transitions: &Transitions) -> Option<(String, State, State)> {
    transitions.lock().unwrap().last().cloned()
}

#[test]
fn state_discriminants() {
    assert_eq!(State::Closed as u8, 0);
    assert_eq!(State::HalfOpen as u8, 1);
    assert_eq!(State::Open as u8, 2);
}

#[test]
fn new_circuit_breaker() {
    let clock = Clock::new_frozen();

    let default_cb = CircuitBreaker::new(Settings::new(""), &clock);
    assert_eq!(default_cb.name(), "");
    assert_eq!(default_cb.settings().get_max_requests(), 1);
    assert_eq!(default_cb.settings().get_interval(), Duration::ZERO);
    assert_eq!(default_cb.settings().get_timeout(), Duration::from_secs(60));
    assert!(!default_cb.settings().has_on_state_change());
    assert_eq!(default_cb.state(), State::Closed);
    assert_eq!(default_cb.counts(), Counts::default());

    let (custom_cb, _) = custom_breaker(&clock);
    assert_eq!(custom_cb.name(), "cb");
    assert_eq!(custom_cb.settings().get_max_requests(), 3);
    assert_eq!(custom_cb.settings().get_interval(), Duration::from_secs(30));
    assert_eq!(custom_cb.settings().get_timeout(), Duration::from_secs(90));
    assert!(custom_cb.settings().has_on_state_change());
    assert_eq!(custom_cb.state(), State::Closed);
    assert_eq!(custom_cb.counts(), Counts::default());
}

#[test]
fn default_circuit_breaker() {
    let control = ClockControl::new();
    let cb = CircuitBreaker::new(Settings::new(""), &control.to_clock());

    for _ in 0..5 {
        assert_eq!(fail(&cb), 0);
    }
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), counts(5, 0, 5, 0, 5));

    assert_eq!(succeed(&cb), 0);
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), counts(6, 1, 5, 1, 0));

    assert_eq!(fail(&cb), 0);
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), counts(7, 1, 6, 0, 1));

    // closed to open
    for _ in 0..5 {
        assert_eq!(fail(&cb), 0);
    }
    assert_eq!(cb.state(), State::Open);
    assert_eq!(cb.counts(), Counts::default());

    assert_eq!(succeed(&cb), ERR_OPEN_STATE);
    assert_eq!(fail(&cb), ERR_OPEN_STATE);
    assert_eq!(cb.counts(), Counts::default());

    control.advance(Duration::from_secs(59));
    assert_eq!(cb.state(), State::Open);

    // open to half-open
    control.advance(Duration::from_secs(1));
    assert_eq!(cb.state(), State::HalfOpen);

    // half-open to open
    assert_eq!(fail(&cb), 0);
    assert_eq!(cb.state(), State::Open);
    assert_eq!(cb.counts(), Counts::default());

    // open to half-open
    control.advance(Duration::from_secs(60));
    assert_eq!(cb.state(), State::HalfOpen);

    // half-open to closed
    assert_eq!(succeed(&cb), 0);
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), Counts::default());
}

#[test]
fn custom_circuit_breaker() {
    let control = ClockControl::new();
    let (cb, transitions) = custom_breaker(&control.to_clock());

    for _ in 0..5 {
        assert_eq!(succeed(&cb), 0);
        assert_eq!(fail(&cb), 0);
    }
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), counts(10, 5, 5, 0, 1));

    control.advance(Duration::from_secs(29));
    assert_eq!(succeed(&cb), 0);
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), counts(11, 6, 5, 1, 0));

    // the interval elapses and the counts are cleared
    control.advance(Duration::from_secs(1));
    assert_eq!(fail(&cb), 0);
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), counts(1, 0, 1, 0, 1));

    // closed to open
    assert_eq!(succeed(&cb), 0);
    assert_eq!(fail(&cb), 0);
    assert_eq!(cb.state(), State::Open);
    assert_eq!(cb.counts(), Counts::default());
    assert_eq!(last_transition(&transitions), Some(("cb".to_string(), State::Closed, State::Open)));

    // open to half-open
    control.advance(Duration::from_secs(90));
    assert_eq!(cb.state(), State::HalfOpen);
    assert_eq!(last_transition(&transitions), Some(("cb".to_string(), State::Open, State::HalfOpen)));

    assert_eq!(succeed(&cb), 0);
    assert_eq!(succeed(&cb), 0);
    assert_eq!(cb.state(), State::HalfOpen);
    assert_eq!(cb.counts(), counts(2, 2, 0, 2, 0));

    // half-open to closed, the last trial slot is taken by a pending request
    let pending = cb.before_request().unwrap();
    assert_eq!(cb.counts(), counts(3, 2, 0, 2, 0));
    assert_eq!(succeed(&cb), ERR_TOO_MANY_REQUESTS);

    pending.success();
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), Counts::default());
    assert_eq!(last_transition(&transitions), Some(("cb".to_string(), State::HalfOpen, State::Closed)));
}

#[test]
fn in_flight_request_spanning_a_reset_is_discarded() {
    let control = ClockControl::new();
    let (cb, transitions) = custom_breaker(&control.to_clock());

    control.advance(Duration::from_secs(29));
    assert_eq!(succeed(&cb), 0);

    let pending: Permit<'_> = cb.before_request().unwrap();
    control.advance(Duration::from_millis(500));
    assert_eq!(cb.counts(), counts(2, 1, 0, 1, 0));

    control.advance(Duration::from_millis(500));
    assert_eq!(cb.state(), State::Closed);
    assert_eq!(cb.counts(), Counts::default());

    pending.success();
    assert_eq!(cb.counts(), Counts::default());
    assert!(transitions.lock().unwrap().is_empty());
}

#[test]
fn concurrent_successes_keep_a_consistent_count() {
    const REQUESTS: u32 = 10_000;

    let threads = u32::try_from(std::thread::available_parallelism().map_or(4, usize::from)).unwrap();
    let (cb, _) = custom_breaker(&Clock::new_frozen());
    let cb = Arc::new(cb);

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let cb = Arc::clone(&cb);
            std::thread::spawn(move || {
                for _ in 0..REQUESTS {
                    assert_eq!(succeed(&cb), 0);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total = threads * REQUESTS;
    assert_eq!(cb.counts(), counts(total, total, 0, total, 0));
}

#[test]
fn execute_maps_rejections_and_errors() {
    let clock = Clock::new_frozen();
    let cb = CircuitBreaker::new(Settings::new("execute").ready_to_trip(|c: &Counts| c.total_failures >= 1), &clock);

    let result: Result<u32, Error<String>> = cb.execute(|| Err("boom".to_string()));
    assert!(matches!(result, Err(Error::Inner(ref e)) if e == "boom"));

    let result: Result<u32, Error<String>> = cb.execute(|| Ok(1));
    assert_eq!(result.unwrap_err().rejection(), Some(Rejected::Open));
}

#[tokio::test]
async fn execute_async_shared_between_tasks() {
    let clock = Clock::new_frozen();
    let cb = Arc::new(CircuitBreaker::new(Settings::new("async"), &clock));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let cb = Arc::clone(&cb);
            tokio::spawn(async move { cb.execute_async(|| async move { Ok::<_, String>(i) }).await })
        })
        .collect();

    let mut sum = 0;
    for task in tasks {
        sum += task.await.unwrap().unwrap();
    }

    assert_eq!(sum, (0..16).sum::<i32>());
    assert_eq!(cb.counts(), counts(16, 16, 0, 16, 0));
}

#[tokio::test]
async fn execute_async_trips_and_recovers() {
    let control = ClockControl::new();
    let cb = CircuitBreaker::new(
        Settings::new("async").timeout(Duration::from_secs(2)),
        &control.to_clock(),
    );

    for _ in 0..6 {
        let result = cb.execute_async(|| async { Err::<(), _>("unavailable") }).await;
        assert!(matches!(result, Err(Error::Inner("unavailable"))));
    }

    let result = cb.execute_async(|| async { Ok::<_, &str>(()) }).await;
    assert!(matches!(result, Err(Error::Rejected(Rejected::Open))));

    control.advance(Duration::from_secs(2));
    let result = cb.execute_async(|| async { Ok::<_, &str>("recovered") }).await;
    assert_eq!(result.unwrap(), "recovered");
    assert_eq!(cb.state(), State::Closed);
}
