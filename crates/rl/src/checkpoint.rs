//! # Checkpoints
//!
//! A checkpoint is the agent's serialized parameters plus a small metadata
//! record, both under `<model_dir>/<run_id>/`:
//!
//! ```text
//! model_<run_id>_ep<episode>_<total_steps>.json       parameters
//! model_<run_id>_ep<episode>_<total_steps>_meta.json  CheckpointMeta
//! ```
//!
//! The results log goes to `<results_dir>/<run_id>/<run_id>_<total_steps>.json`.
//! Every file is written under a temporary name and renamed into place, so a
//! reader never observes a half-written checkpoint. Because the run id is
//! part of every path, runs sharing a directory never overwrite each other.

use std::fs;
use std::path::{Path, PathBuf};

use ml::Agent;
use serde::{Deserialize, Serialize};

use crate::config::CheckpointConfig;
use crate::error::CheckpointError;
use crate::metrics::TrainingLog;

const META_SUFFIX: &str = "_meta.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub run_id: String,
    /// Index of the episode that was running or had just finished.
    pub episode: usize,
    pub episodes_completed: usize,
    pub total_steps: usize,
    pub losses: Vec<f32>,
    /// Cumulative reward of every completed episode.
    pub episode_rewards: Vec<f32>,
    /// Parameter file name, relative to the metadata file.
    pub model_file: String,
}

impl CheckpointMeta {
    /// # Errors
    ///
    /// I/O or parse failures.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let bytes = fs::read(path).map_err(|source| CheckpointError::Io { path: path.to_path_buf(), source })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Parameter file belonging to the metadata stored at `meta_path`.
    #[must_use]
    pub fn params_path(&self, meta_path: &Path) -> PathBuf {
        meta_path.parent().unwrap_or_else(|| Path::new(".")).join(&self.model_file)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CheckpointError + '_ {
    move |source| CheckpointError::Io { path: path.to_path_buf(), source }
}

fn temp_path(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp"))
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), CheckpointError> {
    let tmp = temp_path(path);
    fs::write(&tmp, bytes).map_err(io_err(&tmp))?;
    fs::rename(&tmp, path).map_err(io_err(path))
}

pub struct Checkpointer {
    config: CheckpointConfig,
    run_id: String,
}

impl Checkpointer {
    /// Directories are created lazily on the first save, so a missing or
    /// unwritable location only surfaces as a recoverable save failure.
    #[must_use]
    pub fn new(config: CheckpointConfig, run_id: impl Into<String>) -> Self {
        Self { config, run_id: run_id.into() }
    }

    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    #[must_use]
    pub fn model_dir(&self) -> PathBuf {
        self.config.model_dir.join(&self.run_id)
    }

    #[must_use]
    pub fn results_dir(&self) -> PathBuf {
        self.config.results_dir.join(&self.run_id)
    }

    #[must_use]
    pub fn stem(&self, episode: usize, total_steps: usize) -> String {
        format!("model_{}_ep{episode}_{total_steps}", self.run_id)
    }

    #[must_use]
    pub fn due_after_episode(&self, episodes_completed: usize) -> bool {
        self.config.every_episodes.is_some_and(|n| episodes_completed > 0 && episodes_completed % n == 0)
    }

    #[must_use]
    pub fn due_at_step(&self, total_steps: usize) -> bool {
        self.config.every_steps.is_some_and(|n| total_steps > 0 && total_steps % n == 0)
    }

    /// Write agent parameters and metadata. Returns the metadata path.
    ///
    /// # Errors
    ///
    /// Any storage or serialization failure. Nothing is left under the
    /// final names when saving fails.
    pub fn save<A: Agent + ?Sized>(
        &self,
        agent: &A,
        episode: usize,
        episodes_completed: usize,
        total_steps: usize,
        log: &TrainingLog,
    ) -> Result<PathBuf, CheckpointError> {
        let dir = self.model_dir();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;

        let stem = self.stem(episode, total_steps);
        let model_file = format!("{stem}.json");
        let params_path = dir.join(&model_file);
        let tmp = temp_path(&params_path);
        agent
            .save(&tmp)
            .map_err(|e| CheckpointError::Agent { path: tmp.clone(), message: format!("{e:#}") })?;
        fs::rename(&tmp, &params_path).map_err(io_err(&params_path))?;

        let meta = CheckpointMeta {
            run_id: self.run_id.clone(),
            episode,
            episodes_completed,
            total_steps,
            losses: log.losses.clone(),
            episode_rewards: log.episode_rewards.clone(),
            model_file,
        };
        let meta_path = dir.join(format!("{stem}{META_SUFFIX}"));
        write_atomic(&meta_path, &serde_json::to_vec_pretty(&meta)?)?;
        Ok(meta_path)
    }

    /// Write the results log. Returns its path.
    ///
    /// # Errors
    ///
    /// Any storage or serialization failure.
    pub fn write_results(&self, log: &TrainingLog, total_steps: usize) -> Result<PathBuf, CheckpointError> {
        let dir = self.results_dir();
        fs::create_dir_all(&dir).map_err(io_err(&dir))?;
        let path = dir.join(format!("{}_{total_steps}.json", self.run_id));
        write_atomic(&path, &serde_json::to_vec(log)?)?;
        Ok(path)
    }

    /// Metadata file of the checkpoint with the most steps, if any.
    ///
    /// # Errors
    ///
    /// The model directory exists but cannot be listed.
    pub fn latest(&self) -> Result<Option<PathBuf>, CheckpointError> {
        let dir = self.model_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CheckpointError::Io { path: dir, source }),
        };
        let mut best: Option<(usize, PathBuf)> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_meta = path.file_name().and_then(|n| n.to_str()).is_some_and(|n| n.ends_with(META_SUFFIX));
            if !is_meta {
                continue;
            }
            match CheckpointMeta::load(&path) {
                Ok(meta) if best.as_ref().map_or(true, |(steps, _)| meta.total_steps > *steps) => {
                    best = Some((meta.total_steps, path));
                }
                Ok(_) => {}
                Err(e) => tracing::warn!(path = %path.display(), error = %e, "skipping unreadable checkpoint"),
            }
        }
        Ok(best.map(|(_, path)| path))
    }
}
