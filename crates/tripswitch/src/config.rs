// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::time::Duration;

use jiff::SignedDuration;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_REQUESTS, DEFAULT_TIMEOUT};
use crate::{ConfigError, Settings};

/// Serializable configuration of a circuit breaker.
///
/// Durations accept both the ISO 8601 (`"PT30S"`) and the friendly (`"30s"`) formats. Missing
/// fields take the same defaults as [`Settings::new`]. The trip policy and the state change
/// listener are code, so they are attached to the converted [`Settings`] afterwards.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use tripswitch::{BreakerConfig, Settings};
///
/// let config: BreakerConfig = serde_json::from_str(r#"{ "name": "payments", "timeout": "2s" }"#)?;
/// let settings = Settings::try_from(config)?;
///
/// assert_eq!(settings.get_name(), "payments");
/// assert_eq!(settings.get_timeout(), Duration::from_secs(2));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[cfg_attr(docsrs, doc(cfg(feature = "serde")))]
pub struct BreakerConfig {
    /// The name of the breaker.
    pub name: String,
    /// The maximum number of trial requests admitted while half-open.
    pub max_requests: u32,
    /// The reset period of the closed state; zero disables the reset.
    pub interval: SignedDuration,
    /// How long the breaker stays open.
    pub timeout: SignedDuration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            max_requests: DEFAULT_MAX_REQUESTS,
            interval: SignedDuration::ZERO,
            timeout: SignedDuration::try_from(DEFAULT_TIMEOUT).unwrap_or(SignedDuration::MAX),
        }
    }
}

impl TryFrom<BreakerConfig> for Settings {
    type Error = ConfigError;

    fn try_from(config: BreakerConfig) -> Result<Self, Self::Error> {
        Ok(Self::new(config.name)
            .max_requests(config.max_requests)
            .interval(to_duration("interval", config.interval)?)
            .timeout(to_duration("timeout", config.timeout)?))
    }
}

fn to_duration(field: &'static str, value: SignedDuration) -> Result<Duration, ConfigError> {
    if value.is_negative() {
        return Err(ConfigError::NegativeDuration { field, value });
    }

    Ok(value.unsigned_abs())
}
