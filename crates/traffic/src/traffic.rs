//! Synthetic web traffic model.
//!
//! Object sizes, inline object counts and reading times are drawn from the
//! distributions fitted by Pries et al. in "An HTTP Web Traffic Model Based on the
//! Top One Million Visited Web Pages" (Table II):
//!
//! | quantity            | distribution | parameters                        |
//! |---------------------|--------------|-----------------------------------|
//! | main object size    | Weibull      | scale 19104.9, shape 0.771807     |
//! | inline object count | Exponential  | mean 31.9291                      |
//! | inline object size  | Log-Normal   | mu 8.91365, sigma 1.24816         |
//! | reading time        | Log-Normal   | mu -0.495204, sigma 2.7731        |
//!
//! Reading times are capped at 10000 seconds; larger draws are truncated, not
//! resampled. Sizes and counts are floored to integers.
//!
//! # Determinism
//!
//! The model holds no random state. Every draw takes the generator as an argument,
//! so one model can be shared by any number of sessions and seeding the generator
//! (for example a `ChaCha8Rng`) makes a run reproducible.

use std::fmt::Display;
use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Exp, LogNormal, Weibull};
use thiserror::Error;

/// Upper bound of a client reading time, in seconds.
pub const MAX_READING_TIME_SECS: f64 = 10_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeibullParams {
    pub scale: f64,
    pub shape: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialParams {
    pub mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogNormalParams {
    pub mu: f64,
    pub sigma: f64,
}

/// Distribution parameters of the traffic model.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrafficConfig {
    pub main_object_size: WeibullParams,
    pub inline_object_count: ExponentialParams,
    pub inline_object_size: LogNormalParams,
    /// Reading time in seconds.
    pub reading_time: LogNormalParams,
    /// Reading times above this many seconds are truncated to it.
    pub max_reading_time: f64,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            main_object_size: WeibullParams { scale: 19104.9, shape: 0.771807 },
            inline_object_count: ExponentialParams { mean: 31.9291 },
            inline_object_size: LogNormalParams { mu: 8.91365, sigma: 1.24816 },
            reading_time: LogNormalParams { mu: -0.495204, sigma: 2.7731 },
            max_reading_time: MAX_READING_TIME_SECS,
        }
    }
}

#[derive(Debug, Error)]
#[error("invalid {distribution} parameters: {reason}")]
pub struct TrafficConfigError {
    distribution: &'static str,
    reason: String,
}

impl TrafficConfigError {
    fn invalid<E: Display>(distribution: &'static str, e: E) -> Self {
        Self { distribution, reason: e.to_string() }
    }
}

/// Builds a log-normal distribution. `LogNormal::new` lets a negative sigma through, so it is checked here.
fn log_normal(distribution: &'static str, params: LogNormalParams) -> Result<LogNormal<f64>, TrafficConfigError> {
    let LogNormalParams { mu, sigma } = params;
    if !(sigma.is_finite() && sigma > 0.0) {
        return Err(TrafficConfigError::invalid(distribution, format!("sigma {sigma} must be positive")));
    }
    LogNormal::new(mu, sigma).map_err(|e| TrafficConfigError::invalid(distribution, e))
}

/// The four traffic distributions, validated and ready to sample.
#[derive(Debug, Clone, Copy)]
pub struct TrafficModel {
    main_object_size: Weibull<f64>,
    inline_object_count: Exp<f64>,
    inline_object_size: LogNormal<f64>,
    reading_time: LogNormal<f64>,
    max_reading_time: f64,
}

impl TrafficModel {
    /// Builds the model from its parameters.
    ///
    /// # Errors
    ///
    /// Returns `TrafficConfigError` if a distribution rejects its parameters (for
    /// example a non-positive scale, mean or sigma), or if `max_reading_time` is
    /// negative or not finite.
    pub fn new(config: TrafficConfig) -> Result<Self, TrafficConfigError> {
        let WeibullParams { scale, shape } = config.main_object_size;
        let main_object_size = Weibull::new(scale, shape).map_err(|e| TrafficConfigError::invalid("main object size", e))?;

        let ExponentialParams { mean } = config.inline_object_count;
        if !(mean.is_finite() && mean > 0.0) {
            return Err(TrafficConfigError::invalid("inline object count", format!("mean {mean} must be positive")));
        }
        let inline_object_count = Exp::new(1.0 / mean).map_err(|e| TrafficConfigError::invalid("inline object count", e))?;

        let inline_object_size = log_normal("inline object size", config.inline_object_size)?;
        let reading_time = log_normal("reading time", config.reading_time)?;

        let max_reading_time = config.max_reading_time;
        if !(max_reading_time.is_finite() && max_reading_time >= 0.0) {
            return Err(TrafficConfigError::invalid("reading time", format!("maximum {max_reading_time} must be a finite, non-negative number")));
        }

        Ok(Self { main_object_size, inline_object_count, inline_object_size, reading_time, max_reading_time })
    }

    /// Size in bytes of a main object.
    pub fn draw_main_object_size<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        floor_to_u64(self.main_object_size.sample(rng))
    }

    /// Number of inline objects on a page.
    pub fn draw_inline_object_count<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        floor_to_u64(self.inline_object_count.sample(rng))
    }

    /// Size in bytes of an inline object.
    pub fn draw_inline_object_size<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        floor_to_u64(self.inline_object_size.sample(rng))
    }

    /// Pause between finishing a page and requesting the next one, capped at the
    /// configured maximum.
    pub fn draw_reading_time<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.clamp_reading_time(self.reading_time.sample(rng))
    }

    /// Truncates a reading time in seconds to the configured maximum.
    pub fn clamp_reading_time(&self, seconds: f64) -> Duration {
        if seconds.is_nan() {
            return Duration::ZERO;
        }
        secs_to_duration(seconds.clamp(0.0, self.max_reading_time))
    }

    pub fn max_reading_time(&self) -> Duration {
        secs_to_duration(self.max_reading_time)
    }
}

/// Builds a session generator. A seed makes the run reproducible, `None` seeds
/// from the thread-local generator.
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_rng(&mut rand::rng()),
    }
}

fn secs_to_duration(seconds: f64) -> Duration {
    Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "draws are non-negative, `as` saturates on overflow")]
fn floor_to_u64(value: f64) -> u64 {
    value.floor() as u64
}
