//! # Exploration noise
//!
//! Processes whose samples are added to the agent's proposed action before
//! clamping. Every process owns a seeded generator, so two processes built
//! with the same seed produce the same sequence.

use serde::{Deserialize, Serialize};

/// A noise source with optional per-episode state.
pub trait ExplorationProcess {
    /// Next noise vector.
    fn sample(&mut self) -> Vec<f32>;

    /// Clear any state carried between steps. Called at episode start.
    fn reset(&mut self);

    /// Dimension of the vectors returned by [`sample`](Self::sample).
    fn size(&self) -> usize;
}

/// Standard normal draw via the Box-Muller transform.
fn standard_normal(rng: &mut fastrand::Rng) -> f32 {
    let u1 = rng.f32().max(1e-10);
    let u2 = rng.f32();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

/// Mean-reverting, temporally correlated noise.
///
/// `x <- x + theta * (mu - x) * dt + sigma * sqrt(dt) * N(0, 1)`
#[derive(Clone, Debug)]
pub struct OrnsteinUhlenbeck {
    theta: f32,
    mu: f32,
    sigma: f32,
    dt: f32,
    x: Vec<f32>,
    rng: fastrand::Rng,
}

impl OrnsteinUhlenbeck {
    #[must_use]
    pub fn new(size: usize, theta: f32, mu: f32, sigma: f32, dt: f32, seed: u64) -> Self {
        Self { theta, mu, sigma, dt, x: vec![0.0; size], rng: fastrand::Rng::with_seed(seed) }
    }

    /// Current process value without advancing it.
    #[must_use]
    pub fn current(&self) -> &[f32] {
        &self.x
    }
}

impl ExplorationProcess for OrnsteinUhlenbeck {
    fn sample(&mut self) -> Vec<f32> {
        let diffusion = self.sigma * self.dt.sqrt();
        for x in &mut self.x {
            let drift = self.theta * (self.mu - *x) * self.dt;
            *x += drift + diffusion * standard_normal(&mut self.rng);
        }
        self.x.clone()
    }

    fn reset(&mut self) {
        self.x.fill(0.0);
    }

    fn size(&self) -> usize {
        self.x.len()
    }
}

/// Independent Gaussian noise, no state between steps.
#[derive(Clone, Debug)]
pub struct GaussianWhiteNoise {
    size: usize,
    mu: f32,
    sigma: f32,
    rng: fastrand::Rng,
}

impl GaussianWhiteNoise {
    #[must_use]
    pub fn new(size: usize, mu: f32, sigma: f32, seed: u64) -> Self {
        Self { size, mu, sigma, rng: fastrand::Rng::with_seed(seed) }
    }
}

impl ExplorationProcess for GaussianWhiteNoise {
    fn sample(&mut self) -> Vec<f32> {
        (0..self.size)
            .map(|_| self.mu + self.sigma * standard_normal(&mut self.rng))
            .collect()
    }

    fn reset(&mut self) {}

    fn size(&self) -> usize {
        self.size
    }
}

/// Serializable choice of exploration process.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExplorationConfig {
    OrnsteinUhlenbeck {
        theta: f32,
        #[serde(default)]
        mu: f32,
        sigma: f32,
        #[serde(default = "default_ou_dt")]
        dt: f32,
    },
    Gaussian {
        #[serde(default)]
        mu: f32,
        sigma: f32,
    },
}

fn default_ou_dt() -> f32 {
    0.01
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self::OrnsteinUhlenbeck { theta: 0.15, mu: 0.0, sigma: 0.3, dt: default_ou_dt() }
    }
}

impl ExplorationConfig {
    /// Checks that every parameter is finite and the scales are non-negative.
    ///
    /// # Errors
    ///
    /// Describes the offending parameter.
    pub fn validate(&self) -> Result<(), crate::error::ConfigError> {
        let (values, non_negative): (Vec<f32>, Vec<f32>) = match *self {
            Self::OrnsteinUhlenbeck { theta, mu, sigma, dt } => (vec![theta, mu, sigma, dt], vec![theta, sigma, dt]),
            Self::Gaussian { mu, sigma } => (vec![mu, sigma], vec![sigma]),
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(crate::error::ConfigError::NonFinite { field: "exploration" });
        }
        if non_negative.iter().any(|v| *v < 0.0) {
            return Err(crate::error::ConfigError::OutOfRange {
                field: "exploration",
                reason: "theta, sigma and dt must be non-negative".into(),
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn build(&self, size: usize, seed: u64) -> Box<dyn ExplorationProcess> {
        match *self {
            Self::OrnsteinUhlenbeck { theta, mu, sigma, dt } => {
                Box::new(OrnsteinUhlenbeck::new(size, theta, mu, sigma, dt, seed))
            }
            Self::Gaussian { mu, sigma } => Box::new(GaussianWhiteNoise::new(size, mu, sigma, seed)),
        }
    }
}
