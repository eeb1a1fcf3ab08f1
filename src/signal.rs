//! # Signal Generator
//!
//! Synthesizes one reading per tick using a discretized Ornstein-Uhlenbeck
//! mean-reverting process:
//!
//! ```text
//! dX = theta * (mu - X) * dt + sigma * sqrt(dt) * eps,   eps ~ N(0, 1)
//! ```
//!
//! State is persistent: `x` is threaded across successive calls so the
//! output is a proper random walk around `mu`, not a memoryless snapshot.
//! Generation never fails; a non-finite draw is replaced by resampling.

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

use crate::batch::Reading;
use crate::config::SignalConfig;

/// Mean-reverting signal source with process-local mutable state
///
/// Owned by the single producer task; not shared across concurrent callers.
#[derive(Debug)]
pub struct SignalGenerator<R: Rng = StdRng> {
    config: SignalConfig,
    rng: R,
    /// Current process value, seeded to `mu` and advanced on every call
    x: f64,
}

impl SignalGenerator<StdRng> {
    /// Create a generator seeded from OS entropy
    pub fn new(config: SignalConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }
}

impl<R: Rng> SignalGenerator<R> {
    /// Create a generator with an injected randomness source
    ///
    /// Tests use a seeded `StdRng` for deterministic trajectories.
    pub fn with_rng(config: SignalConfig, rng: R) -> Self {
        let x = config.mu;
        Self { config, rng, x }
    }

    /// Current process value
    pub fn state(&self) -> f64 {
        self.x
    }

    /// Generate the next reading, advancing the process state
    pub fn next_reading(&mut self) -> Reading {
        let eps = self.sample_normal();

        let SignalConfig {
            mu,
            theta,
            sigma,
            dt,
        } = self.config;

        let dx = theta * (mu - self.x) * dt + sigma * dt.sqrt() * eps;
        self.x += dx;

        Reading::new(Utc::now(), self.x)
    }

    /// Draw from N(0, 1), resampling any non-finite value
    fn sample_normal(&mut self) -> f64 {
        loop {
            let eps: f64 = StandardNormal.sample(&mut self.rng);
            if eps.is_finite() {
                return eps;
            }
            tracing::debug!("Discarded non-finite normal draw, resampling");
        }
    }
}
