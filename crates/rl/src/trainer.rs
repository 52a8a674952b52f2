//! # Training loop
//!
//! [`Trainer`] drives one environment and one agent on a single thread:
//!
//! 1.  The agent proposes an action from the stacked recent observations.
//! 2.  Scheduled exploration noise is added and the sum is clamped into the
//!     environment's action bounds.
//! 3.  The environment steps and the transition is pushed to the buffer
//!     before anything else happens.
//! 4.  Past warmup, a batch sampled from the buffer as it stands feeds one
//!     agent update.
//!
//! A failed dynamics step or a non-finite reward ends the episode with a
//! penalty transition instead of ending the run. Checkpoint failures are
//! logged and retried at the next cadence point.
//!
//! [`Trainer::evaluate`] replays the current policy without noise, storage or
//! learning.

use std::path::{Path, PathBuf};

use ml::{
    clamp_action, Agent, Env, ExperienceBuffer, ExplorationProcess, FrameStack, Transition, UpdatePhase,
};
use tracing::{debug, info, warn};

use crate::checkpoint::{CheckpointMeta, Checkpointer};
use crate::config::TrainConfig;
use crate::error::{CheckpointError, TrainError};
use crate::metrics::{EpisodeSummary, TrainingLog};
use crate::schedule::DecayClock;
use crate::stop::StopSignal;

/// How a call to [`Trainer::run`] ended.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingReport {
    pub run_id: String,
    pub episodes_completed: usize,
    pub total_steps: usize,
    pub updates: usize,
    pub interrupted: bool,
    /// Metadata file of the most recent successful checkpoint.
    pub last_checkpoint: Option<PathBuf>,
}

/// How a call to [`Trainer::run_episode`] ended.
#[derive(Clone, Debug, PartialEq)]
pub enum EpisodeOutcome {
    Finished(EpisodeSummary),
    /// The stop signal was raised between two steps.
    Interrupted { steps: usize },
    /// The total step budget ran out mid-episode.
    BudgetExhausted { steps: usize },
}

pub struct Trainer<E: Env, A: Agent> {
    config: TrainConfig,
    env: E,
    agent: A,
    buffer: ExperienceBuffer,
    noise: Box<dyn ExplorationProcess>,
    frames: FrameStack,
    checkpointer: Checkpointer,
    log: TrainingLog,
    rng: fastrand::Rng,
    stop: StopSignal,
    episode: usize,
    total_steps: usize,
    updates: usize,
    /// Step count and metadata path of the last successful save.
    saved: Option<(usize, PathBuf)>,
}

impl<E: Env, A: Agent> Trainer<E, A> {
    /// Validate the configuration and assemble the run.
    ///
    /// # Errors
    ///
    /// [`TrainError::Config`] for any invalid field.
    pub fn new(config: TrainConfig, env: E, agent: A) -> Result<Self, TrainError> {
        config.validate()?;
        let run_id = config.resolved_run_id();
        let noise = config.exploration.build(env.action_size(), config.seed);
        let buffer = ExperienceBuffer::new(&config.buffer)?;
        let frames = FrameStack::new(config.buffer.window_length);
        let checkpointer = Checkpointer::new(config.checkpoint.clone(), run_id);
        let rng = fastrand::Rng::with_seed(config.seed.wrapping_add(1));
        Ok(Self {
            config,
            env,
            agent,
            buffer,
            noise,
            frames,
            checkpointer,
            log: TrainingLog::default(),
            rng,
            stop: StopSignal::new(),
            episode: 0,
            total_steps: 0,
            updates: 0,
            saved: None,
        })
    }

    /// Replace the exploration process built from the configuration.
    #[must_use]
    pub fn with_exploration(mut self, noise: Box<dyn ExplorationProcess>) -> Self {
        self.noise = noise;
        self
    }

    /// Replace the internal stop signal with one shared with the caller.
    #[must_use]
    pub fn with_stop_signal(mut self, stop: StopSignal) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn run_id(&self) -> &str {
        self.checkpointer.run_id()
    }

    pub fn checkpointer(&self) -> &Checkpointer {
        &self.checkpointer
    }

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn buffer(&self) -> &ExperienceBuffer {
        &self.buffer
    }

    pub fn log(&self) -> &TrainingLog {
        &self.log
    }

    pub fn episodes_completed(&self) -> usize {
        self.episode
    }

    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Continue from a checkpoint: restores agent parameters, counters, the
    /// loss and reward histories, and adopts the checkpoint's run id. The
    /// replay buffer starts empty.
    ///
    /// # Errors
    ///
    /// Unreadable metadata or parameters the agent rejects.
    pub fn resume(&mut self, meta_path: &Path) -> Result<(), TrainError> {
        let meta = CheckpointMeta::load(meta_path)?;
        let params = meta.params_path(meta_path);
        self.agent
            .load(&params)
            .map_err(|e| CheckpointError::Agent { path: params.clone(), message: format!("{e:#}") })?;
        self.checkpointer = Checkpointer::new(self.config.checkpoint.clone(), meta.run_id.clone());
        self.episode = meta.episodes_completed;
        self.total_steps = meta.total_steps;
        self.log.losses = meta.losses;
        self.log.episode_rewards = meta.episode_rewards;
        self.saved = Some((meta.total_steps, meta_path.to_path_buf()));
        info!(
            run_id = %meta.run_id,
            episodes = self.episode,
            total_steps = self.total_steps,
            "resumed from checkpoint"
        );
        Ok(())
    }

    fn budget_exhausted(&self) -> bool {
        self.config.max_total_steps.is_some_and(|max| self.total_steps >= max)
    }

    fn noise_scale(&self) -> f32 {
        let t = match self.config.clock {
            DecayClock::Steps => self.total_steps,
            DecayClock::Episodes => self.episode,
        };
        self.config.schedule.value(t)
    }

    /// Train until the episode count or step budget is reached or the stop
    /// signal is raised, then write a final checkpoint.
    pub fn run(&mut self) -> TrainingReport {
        info!(
            run_id = %self.run_id(),
            episodes = self.config.episodes,
            max_total_steps = ?self.config.max_total_steps,
            "starting training"
        );
        let mut interrupted = false;
        let mut last_episode = self.episode.saturating_sub(1);
        while self.episode < self.config.episodes && !self.budget_exhausted() {
            if self.stop.is_raised() {
                info!(episode = self.episode, "stop requested between episodes, finishing run");
                interrupted = true;
                break;
            }
            match self.run_episode() {
                EpisodeOutcome::Finished(summary) => last_episode = summary.episode,
                EpisodeOutcome::Interrupted { steps } => {
                    info!(episode = self.episode, steps, "stop requested, finishing run");
                    last_episode = self.episode;
                    interrupted = true;
                    break;
                }
                EpisodeOutcome::BudgetExhausted { .. } => {
                    last_episode = self.episode;
                    break;
                }
            }
        }

        if self.saved.as_ref().map(|(steps, _)| *steps) != Some(self.total_steps) {
            self.checkpoint(last_episode);
        }
        let report = TrainingReport {
            run_id: self.run_id().to_owned(),
            episodes_completed: self.episode,
            total_steps: self.total_steps,
            updates: self.updates,
            interrupted,
            last_checkpoint: self.saved.as_ref().map(|(_, path)| path.clone()),
        };
        info!(
            episodes = report.episodes_completed,
            total_steps = report.total_steps,
            updates = report.updates,
            interrupted,
            "training finished"
        );
        report
    }

    /// Play one episode, learning as it goes.
    pub fn run_episode(&mut self) -> EpisodeOutcome {
        let mut obs = self.env.reset();
        self.noise.reset();
        self.frames.reset(&obs);

        let mut steps = 0;
        let mut cumulative_reward = 0.0;
        let mut failed = false;
        let mut terminated = false;

        loop {
            if self.stop.is_raised() {
                self.buffer.end_episode();
                return EpisodeOutcome::Interrupted { steps };
            }
            if self.budget_exhausted() {
                self.buffer.end_episode();
                return EpisodeOutcome::BudgetExhausted { steps };
            }

            let stacked = self.frames.stacked();
            let action = self.explore(&stacked);
            let (next_obs, reward, done) = match self.env.step(&action) {
                Ok(step) if step.reward.is_finite() && step.obs.iter().all(|v| v.is_finite()) => {
                    terminated = step.info.terminated;
                    (step.obs, step.reward, step.done)
                }
                Ok(step) => {
                    warn!(episode = self.episode, step = steps + 1, reward = step.reward, "non-finite step, ending episode");
                    failed = true;
                    (obs.clone(), self.config.failure_penalty, true)
                }
                Err(err) => {
                    warn!(episode = self.episode, step = steps + 1, error = %err, "dynamics failed, ending episode");
                    failed = true;
                    (obs.clone(), self.config.failure_penalty, true)
                }
            };

            steps += 1;
            self.total_steps += 1;
            cumulative_reward += reward;
            self.buffer.push(Transition { obs, action, reward, next_obs: next_obs.clone(), done });
            self.log.record_step(self.episode, &next_obs);
            self.frames.push(&next_obs);
            obs = next_obs;

            self.maybe_update();
            if self.checkpointer.due_at_step(self.total_steps) {
                self.checkpoint(self.episode);
            }
            if done {
                break;
            }
        }

        let summary = EpisodeSummary {
            episode: self.episode,
            steps,
            total_steps: self.total_steps,
            cumulative_reward,
            last_loss: self.log.last_loss(),
            noise_scale: self.noise_scale(),
            failed,
            terminated,
        };
        info!(
            episode = summary.episode,
            steps,
            total_steps = self.total_steps,
            reward = cumulative_reward,
            loss = ?summary.last_loss,
            noise_scale = summary.noise_scale,
            failed,
            "episode finished"
        );
        self.log.record_episode(summary.clone());
        self.episode += 1;
        if self.checkpointer.due_after_episode(self.episode) {
            self.checkpoint(summary.episode);
        }
        EpisodeOutcome::Finished(summary)
    }

    /// Play `episodes` episodes with the current policy: no noise, nothing
    /// stored, no updates. Step and episode counters are left untouched.
    /// Stops early if the stop signal is raised.
    pub fn evaluate(&mut self, episodes: usize) -> Vec<EpisodeSummary> {
        let mut summaries = Vec::with_capacity(episodes);
        for episode in 0..episodes {
            if self.stop.is_raised() {
                break;
            }
            let obs = self.env.reset();
            self.frames.reset(&obs);
            let mut steps = 0;
            let mut cumulative_reward = 0.0;
            let mut failed = false;
            let mut terminated = false;
            while !self.stop.is_raised() {
                let proposal = self.agent.act(&self.frames.stacked());
                let (low, high) = self.env.action_bounds();
                let action = clamp_action(&without_nan(&proposal), low, high);
                steps += 1;
                match self.env.step(&action) {
                    Ok(step) if step.reward.is_finite() => {
                        cumulative_reward += step.reward;
                        terminated = step.info.terminated;
                        self.frames.push(&step.obs);
                        if step.done {
                            break;
                        }
                    }
                    Ok(_) | Err(_) => {
                        failed = true;
                        break;
                    }
                }
            }
            let summary = EpisodeSummary {
                episode,
                steps,
                total_steps: self.total_steps,
                cumulative_reward,
                last_loss: self.log.last_loss(),
                noise_scale: 0.0,
                failed,
                terminated,
            };
            info!(episode, steps, reward = cumulative_reward, failed, "evaluation episode finished");
            summaries.push(summary);
        }
        summaries
    }

    /// Agent proposal plus scaled noise, clamped into the action bounds.
    fn explore(&mut self, stacked: &[f32]) -> Vec<f32> {
        let proposal = self.agent.act(stacked);
        let scale = self.noise_scale();
        let noise = self.noise.sample();
        let (low, high) = self.env.action_bounds();
        let raw: Vec<f32> = without_nan(&proposal).iter().zip(&noise).map(|(a, n)| a + scale * n).collect();
        clamp_action(&raw, low, high)
    }

    fn maybe_update(&mut self) {
        let warmup = &self.config.warmup;
        let threshold = warmup.threshold();
        if self.total_steps <= threshold || (self.total_steps - threshold - 1) % self.config.train_interval != 0 {
            return;
        }
        let phase = UpdatePhase { critic: self.total_steps > warmup.critic, actor: self.total_steps > warmup.actor };
        match self.buffer.sample(self.config.batch_size, &mut self.rng) {
            Ok(batch) => {
                let loss = self.agent.update(&batch, phase);
                self.log.losses.push(loss);
                self.updates += 1;
            }
            Err(err) => debug!(total_steps = self.total_steps, error = %err, "skipping update"),
        }
    }

    /// Save parameters, metadata and results. Failures are logged and
    /// otherwise ignored.
    fn checkpoint(&mut self, episode: usize) {
        match self.checkpointer.save(&self.agent, episode, self.episode, self.total_steps, &self.log) {
            Ok(path) => {
                info!(path = %path.display(), total_steps = self.total_steps, "checkpoint saved");
                self.saved = Some((self.total_steps, path));
            }
            Err(err) => warn!(error = %err, total_steps = self.total_steps, "checkpoint failed, continuing"),
        }
        if let Err(err) = self.checkpointer.write_results(&self.log, self.total_steps) {
            warn!(error = %err, "writing results failed, continuing");
        }
    }
}

/// A NaN would survive clamping.
fn without_nan(action: &[f32]) -> Vec<f32> {
    action.iter().map(|a| if a.is_nan() { 0.0 } else { *a }).collect()
}
