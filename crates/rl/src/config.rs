//! # Training configuration
//!
//! One JSON document describes a run. Every section has defaults matching
//! the two-link lifting setup, so a config file only needs the fields it
//! changes. The whole tree is validated before the first episode.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use ml::{BufferConfig, ConfigError, ExplorationConfig, LinearAgentConfig, LinkageConfig};
use serde::{Deserialize, Serialize};

use crate::error::TrainError;
use crate::schedule::{DecayClock, DecaySchedule};

/// Steps collected before each half of the learner starts training.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmupConfig {
    pub actor: usize,
    pub critic: usize,
}

impl Default for WarmupConfig {
    fn default() -> Self {
        Self { actor: 100, critic: 100 }
    }
}

impl WarmupConfig {
    /// Steps after which the first update may fire.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.actor.min(self.critic)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Save after every this many completed episodes.
    pub every_episodes: Option<usize>,
    /// Save whenever the total step count is a multiple of this.
    pub every_steps: Option<usize>,
    pub model_dir: PathBuf,
    pub results_dir: PathBuf,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            every_episodes: Some(10),
            every_steps: None,
            model_dir: PathBuf::from("models"),
            results_dir: PathBuf::from("results"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Names every artifact of the run. Generated when absent.
    pub run_id: Option<String>,
    pub env: LinkageConfig,
    pub buffer: BufferConfig,
    pub exploration: ExplorationConfig,
    /// Multiplier applied to each noise sample.
    pub schedule: DecaySchedule,
    pub clock: DecayClock,
    pub warmup: WarmupConfig,
    pub agent: LinearAgentConfig,
    pub batch_size: usize,
    /// Steps between updates once warmed up.
    pub train_interval: usize,
    pub episodes: usize,
    pub max_total_steps: Option<usize>,
    pub checkpoint: CheckpointConfig,
    pub seed: u64,
    /// Reward recorded for a step whose dynamics failed.
    pub failure_penalty: f32,
    /// Noise-free episodes played after training. Zero skips evaluation.
    pub eval_episodes: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            run_id: None,
            env: LinkageConfig::default(),
            buffer: BufferConfig::default(),
            exploration: ExplorationConfig::default(),
            schedule: DecaySchedule::default(),
            clock: DecayClock::default(),
            warmup: WarmupConfig::default(),
            agent: LinearAgentConfig::default(),
            batch_size: 32,
            train_interval: 1,
            episodes: 250,
            max_total_steps: Some(50_000),
            checkpoint: CheckpointConfig::default(),
            seed: 0,
            failure_penalty: -100.0,
            eval_episodes: 5,
        }
    }
}

fn positive(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::OutOfRange { field, reason: "must be positive".into() })
    } else {
        Ok(())
    }
}

impl TrainConfig {
    /// # Errors
    ///
    /// [`TrainError::Parse`] for malformed JSON.
    pub fn from_json_str(text: &str) -> Result<Self, TrainError> {
        serde_json::from_str(text).map_err(|source| TrainError::Parse { path: PathBuf::from("<inline>"), source })
    }

    /// Read a configuration file. Validation is left to the caller so
    /// command-line overrides can be applied first.
    ///
    /// # Errors
    ///
    /// I/O and parse failures.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TrainError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| TrainError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&text).map_err(|source| TrainError::Parse { path: path.to_path_buf(), source })
    }

    /// # Errors
    ///
    /// The first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.env.validate()?;
        self.buffer.validate()?;
        self.exploration.validate()?;
        self.schedule.validate()?;
        self.agent.validate()?;
        positive("batch_size", self.batch_size)?;
        positive("train_interval", self.train_interval)?;
        positive("episodes", self.episodes)?;
        if let Some(max) = self.max_total_steps {
            positive("max_total_steps", max)?;
        }
        if let Some(n) = self.checkpoint.every_episodes {
            positive("checkpoint.every_episodes", n)?;
        }
        if let Some(n) = self.checkpoint.every_steps {
            positive("checkpoint.every_steps", n)?;
        }
        if !self.failure_penalty.is_finite() {
            return Err(ConfigError::NonFinite { field: "failure_penalty" });
        }
        if let Some(id) = &self.run_id {
            if id.is_empty() || id.contains(|c: char| c == '/' || c == '\\') || id.starts_with('.') {
                return Err(ConfigError::OutOfRange {
                    field: "run_id",
                    reason: format!("{id:?} is not usable as a file name"),
                });
            }
        }
        Ok(())
    }

    /// The configured run id, or a fresh one.
    #[must_use]
    pub fn resolved_run_id(&self) -> String {
        self.run_id.clone().unwrap_or_else(default_run_id)
    }
}

/// Seconds since the epoch plus the process id, so concurrent runs sharing
/// a results directory never collide.
#[must_use]
pub fn default_run_id() -> String {
    let secs = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or_default();
    format!("{secs}-{}", std::process::id())
}
