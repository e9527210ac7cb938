// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Circuit breaker example that trips a breaker and lets it recover by:
//!
//! 1. Sending requests to a backend that starts failing after the third call
//! 2. Opening the circuit once 60% of at least 10 requests have failed
//! 3. Waiting for the open timeout and letting trial requests through
//! 4. Closing the circuit after enough consecutive trial successes

use std::time::Duration;

use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_stdout::MetricExporter;
use tick::Clock;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tripswitch::{CircuitBreaker, Counts, Settings, State};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let meter_provider = configure_telemetry();
    let clock = Clock::new_tokio();

    let settings = Settings::new("demo_cb")
        // the maximum number of trial requests while half-open
        .max_requests(3)
        // clear the counts every 10 minutes while closed
        .interval(Duration::from_secs(600))
        // stay open for 2 seconds
        .timeout(Duration::from_secs(2))
        // open once at least 10 requests were made and 60% of them failed
        .ready_to_trip(|counts: &Counts| counts.requests >= 10 && counts.failure_ratio() >= 0.6)
        .on_state_change(|name: &str, from: State, to: State| {
            println!("circuit breaker({name}): state change from({from}) to({to})");
        })
        .meter_provider(&meter_provider)
        .enable_logs();

    let breaker = CircuitBreaker::new(settings, &clock);

    // closed to open
    for attempt in 0..10 {
        match breaker.execute_with_code(|| (0.4, mock_rpc_call(attempt))) {
            (_, 0) => println!("{attempt}: ok"),
            (_, code) => println!("{attempt}: error {code}"),
        }
    }
    println!("circuit breaker state: {}", breaker.state());

    // open to half-open
    clock.delay(Duration::from_secs(2)).await;

    // half-open to closed
    for attempt in 0..4 {
        let result = breaker
            .execute_async(|| async { Ok::<_, String>(call_backend(&clock, attempt).await) })
            .await;

        match result {
            Ok(output) => println!("{attempt}: {output}"),
            Err(e) => println!("{attempt}: {e}"),
        }
        println!("circuit breaker state: {}", breaker.state());
    }

    // Flush metrics to stdout before exiting
    meter_provider.force_flush()?;

    Ok(())
}

// Succeeds for the first three calls, fails afterwards.
fn mock_rpc_call(attempt: u32) -> i32 {
    i32::from(attempt >= 3)
}

// Answers after a short round trip.
async fn call_backend(clock: &Clock, attempt: u32) -> String {
    clock.delay(Duration::from_millis(50)).await;
    format!("hello from the backend, attempt {attempt}")
}

fn configure_telemetry() -> SdkMeterProvider {
    // Set up tracing subscriber for logs to console
    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).init();

    SdkMeterProvider::builder()
        .with_periodic_exporter(MetricExporter::default())
        .build()
}
