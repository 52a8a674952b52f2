use physics::{Dynamics, Integrator, LinkParams, LinkState};
use serde::{Deserialize, Serialize};

use crate::env::{clamp_action, Env, Step, StepInfo};
use crate::error::{ConfigError, EnvError};
use crate::poses::PoseSequence;

/// Action bound given either once for every axis or per axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    Uniform(f32),
    PerAxis(Vec<f32>),
}

impl Bound {
    fn expand(&self, field: &'static str, n: usize) -> Result<Vec<f32>, ConfigError> {
        let values = match self {
            Self::Uniform(v) => vec![*v; n],
            Self::PerAxis(v) if v.len() == n => v.clone(),
            Self::PerAxis(v) => return Err(ConfigError::Length { field, expected: n, got: v.len() }),
        };
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field });
        }
        Ok(values)
    }
}

/// Reward as a pure function of the observation and the target pose.
///
/// `reward = -(angle_weight * |q - q_target|^2 + velocity_weight * |u|^2)`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardShaping {
    pub angle_weight: f32,
    pub velocity_weight: f32,
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self { angle_weight: 1.0, velocity_weight: 0.0 }
    }
}

impl RewardShaping {
    #[must_use]
    pub fn evaluate(&self, obs: &[f32], target: &[f32]) -> f32 {
        let n = target.len();
        let angle_err: f32 = obs[..n].iter().zip(target).map(|(q, t)| (q - t).powi(2)).sum();
        let speed: f32 = obs[n..2 * n].iter().map(|u| u * u).sum();
        -(self.angle_weight * angle_err + self.velocity_weight * speed)
    }
}

/// Where an episode starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetMode {
    /// Always `init_state`.
    #[default]
    Fixed,
    /// A pose drawn uniformly from the recorded sequence, at rest. The target
    /// sequence then continues from the drawn frame.
    SampledPose,
}

/// Configuration of a [`LinkageEnv`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkageConfig {
    #[serde(alias = "N_LINKS")]
    pub n_links: usize,
    #[serde(alias = "INIT_STATE")]
    pub init_state: Vec<f32>,
    #[serde(alias = "PARAM_VALS")]
    pub param_vals: Vec<f32>,
    #[serde(alias = "OBS_LOW")]
    pub obs_low: Vec<f32>,
    #[serde(alias = "OBS_HIGH")]
    pub obs_high: Vec<f32>,
    #[serde(alias = "ACT_LOW")]
    pub act_low: Bound,
    #[serde(alias = "ACT_HIGH")]
    pub act_high: Bound,
    /// Number of actuated joints, counted from the base. Defaults to all.
    pub action_dim: Option<usize>,
    #[serde(alias = "TIME_STEP")]
    pub time_step: f32,
    pub integrator: Integrator,
    pub max_episode_steps: usize,
    /// How far the raw state may leave `[obs_low, obs_high]` before the
    /// episode terminates. `None` never terminates early.
    pub termination_margin: Option<f32>,
    pub reward: RewardShaping,
    pub reset: ResetMode,
    pub seed: u64,
}

impl Default for LinkageConfig {
    fn default() -> Self {
        use std::f32::consts::PI;
        Self {
            n_links: 2,
            init_state: vec![PI / 2.0, PI / 2.0, 0.0, 0.0],
            param_vals: vec![9.81, 0.4, 1.0, 0.4, 1.0],
            obs_low: vec![0.0, 3.0 * PI / 8.0, -5.0 * PI, -5.0 * PI],
            obs_high: vec![5.0 * PI / 8.0, 3.0 * PI / 2.0, 5.0 * PI, 5.0 * PI],
            act_low: Bound::Uniform(-100.0),
            act_high: Bound::Uniform(100.0),
            action_dim: None,
            time_step: 0.01,
            integrator: Integrator::Rk4,
            max_episode_steps: 200,
            termination_margin: None,
            reward: RewardShaping::default(),
            reset: ResetMode::Fixed,
            seed: 0,
        }
    }
}

impl LinkageConfig {
    #[must_use]
    pub fn action_dim(&self) -> usize {
        self.action_dim.unwrap_or(self.n_links)
    }

    /// Expanded `(low, high)` action bounds.
    ///
    /// # Errors
    ///
    /// Length mismatch, non-finite or inverted bounds.
    pub fn action_bounds(&self) -> Result<(Vec<f32>, Vec<f32>), ConfigError> {
        let n = self.action_dim();
        let low = self.act_low.expand("act_low", n)?;
        let high = self.act_high.expand("act_high", n)?;
        check_ordered("act", &low, &high)?;
        Ok((low, high))
    }

    /// Check every field.
    ///
    /// # Errors
    ///
    /// The first malformed field found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let n = self.n_links;
        if n == 0 {
            return Err(ConfigError::OutOfRange { field: "n_links", reason: "must be at least 1".into() });
        }
        check_len("init_state", &self.init_state, 2 * n)?;
        if self.init_state.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::NonFinite { field: "init_state" });
        }
        LinkParams::from_values(n, &self.param_vals)?;
        check_len("obs_low", &self.obs_low, 2 * n)?;
        check_len("obs_high", &self.obs_high, 2 * n)?;
        if self.obs_low.iter().chain(&self.obs_high).any(|v| v.is_nan()) {
            return Err(ConfigError::NonFinite { field: "obs bounds" });
        }
        check_ordered("obs", &self.obs_low, &self.obs_high)?;
        let dim = self.action_dim();
        if dim == 0 || dim > n {
            return Err(ConfigError::OutOfRange {
                field: "action_dim",
                reason: format!("must be within 1..={n}, got {dim}"),
            });
        }
        self.action_bounds()?;
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "time_step",
                reason: format!("must be positive, got {}", self.time_step),
            });
        }
        if self.max_episode_steps == 0 {
            return Err(ConfigError::OutOfRange { field: "max_episode_steps", reason: "must be positive".into() });
        }
        if let Some(margin) = self.termination_margin {
            if !margin.is_finite() || margin < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field: "termination_margin",
                    reason: format!("must be a non-negative number, got {margin}"),
                });
            }
        }
        let weights = [self.reward.angle_weight, self.reward.velocity_weight];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ConfigError::OutOfRange { field: "reward", reason: "weights must be finite and non-negative".into() });
        }
        Ok(())
    }
}

fn check_len(field: &'static str, values: &[f32], expected: usize) -> Result<(), ConfigError> {
    if values.len() == expected {
        Ok(())
    } else {
        Err(ConfigError::Length { field, expected, got: values.len() })
    }
}

fn check_ordered(field: &'static str, low: &[f32], high: &[f32]) -> Result<(), ConfigError> {
    match low.iter().zip(high).position(|(lo, hi)| lo > hi) {
        Some(index) => Err(ConfigError::InvertedBound { field, index, low: low[index], high: high[index] }),
        None => Ok(()),
    }
}

/// N-link pendulum environment that tracks a target pose.
///
/// Observations are the simulator state clipped into `[obs_low, obs_high]`.
/// Clipping bounds the observation without ending the episode; only the
/// optional termination margin ends it early.
pub struct LinkageEnv {
    config: LinkageConfig,
    dynamics: Dynamics,
    state: LinkState,
    act_low: Vec<f32>,
    act_high: Vec<f32>,
    poses: Option<PoseSequence>,
    pose_start: usize,
    steps: usize,
    rng: fastrand::Rng,
}

impl LinkageEnv {
    /// Build an environment from a configuration and optional reference
    /// poses.
    ///
    /// # Errors
    ///
    /// Any [`LinkageConfig::validate`] failure, a pose width that differs
    /// from `n_links`, or [`ResetMode::SampledPose`] without poses.
    pub fn new(config: LinkageConfig, poses: Option<PoseSequence>) -> Result<Self, ConfigError> {
        config.validate()?;
        if let Some(p) = &poses {
            if p.width() != config.n_links {
                return Err(ConfigError::Length { field: "poses", expected: config.n_links, got: p.width() });
            }
        } else if config.reset == ResetMode::SampledPose {
            return Err(ConfigError::OutOfRange {
                field: "reset",
                reason: "sampled_pose needs a recorded pose sequence".into(),
            });
        }
        let dynamics = Dynamics::chain(config.n_links, &config.param_vals, config.integrator)?;
        let state = LinkState::from_vec(config.init_state.clone())?;
        let (act_low, act_high) = config.action_bounds()?;
        let rng = fastrand::Rng::with_seed(config.seed);
        Ok(Self { config, dynamics, state, act_low, act_high, poses, pose_start: 0, steps: 0, rng })
    }

    #[must_use]
    pub fn config(&self) -> &LinkageConfig {
        &self.config
    }

    #[must_use]
    pub fn dynamics(&self) -> &Dynamics {
        &self.dynamics
    }

    /// Raw simulator state, before clipping.
    #[must_use]
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Overwrite the simulator state. Does not touch the step counter.
    pub fn set_state(&mut self, state: LinkState) -> Result<(), EnvError> {
        if state.n_links() != self.config.n_links {
            return Err(physics::PhysicsError::DimensionMismatch {
                what: "state",
                expected: 2 * self.config.n_links,
                got: state.as_slice().len(),
            }
            .into());
        }
        self.state = state;
        Ok(())
    }

    #[must_use]
    pub fn steps(&self) -> usize {
        self.steps
    }

    /// Target joint angles for the current step.
    #[must_use]
    pub fn target_pose(&self) -> Vec<f32> {
        match &self.poses {
            Some(poses) => poses.get_clamped(self.pose_start + self.steps).to_vec(),
            None => self.config.init_state[..self.config.n_links].to_vec(),
        }
    }

    /// Clip the current state into the observation bounds.
    fn observe(&self) -> (Vec<f32>, usize) {
        let mut clipped = 0;
        let obs = self
            .state
            .as_slice()
            .iter()
            .zip(self.config.obs_low.iter().zip(&self.config.obs_high))
            .map(|(&x, (&lo, &hi))| {
                let c = x.clamp(lo, hi);
                if c != x {
                    clipped += 1;
                }
                c
            })
            .collect();
        (obs, clipped)
    }

    fn outside_envelope(&self) -> bool {
        let Some(margin) = self.config.termination_margin else {
            return false;
        };
        self.state
            .as_slice()
            .iter()
            .zip(self.config.obs_low.iter().zip(&self.config.obs_high))
            .any(|(&x, (&lo, &hi))| x < lo - margin || x > hi + margin)
    }
}

impl Env for LinkageEnv {
    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        if action.len() != self.act_low.len() {
            return Err(EnvError::ActionSize { expected: self.act_low.len(), got: action.len() });
        }
        let applied = clamp_action(action, &self.act_low, &self.act_high);
        let next = self.dynamics.integrate(&self.state, &applied, self.config.time_step)?;
        self.state = next;
        self.steps += 1;

        let (obs, clipped) = self.observe();
        let reward = self.config.reward.evaluate(&obs, &self.target_pose());
        let truncated = self.steps >= self.config.max_episode_steps;
        let terminated = self.outside_envelope();
        Ok(Step {
            obs,
            reward,
            done: truncated || terminated,
            info: StepInfo { step: self.steps, truncated, terminated, clipped, applied_action: applied },
        })
    }

    fn reset(&mut self) -> Vec<f32> {
        self.steps = 0;
        self.pose_start = 0;
        let mut values = self.config.init_state.clone();
        if let (ResetMode::SampledPose, Some(poses)) = (self.config.reset, &self.poses) {
            self.pose_start = self.rng.usize(..poses.len());
            let n = self.config.n_links;
            values[..n].copy_from_slice(poses.get_clamped(self.pose_start));
            values[n..].fill(0.0);
        }
        // both sources are validated as finite
        self.state = LinkState::from_vec(values).unwrap_or_else(|_| LinkState::zeros(self.config.n_links));
        self.observe().0
    }

    fn obs_size(&self) -> usize {
        2 * self.config.n_links
    }

    fn action_size(&self) -> usize {
        self.act_low.len()
    }

    fn action_bounds(&self) -> (&[f32], &[f32]) {
        (&self.act_low, &self.act_high)
    }
}
