use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ml::{
    Agent, BufferConfig, Env, EnvError, Experience, ExplorationProcess, LinkageEnv, Step, StepInfo, UpdatePhase,
};
use physics::PhysicsError;
use rl::{CheckpointConfig, CheckpointMeta, StopSignal, TrainConfig, Trainer, WarmupConfig};

/// Constant-magnitude policy that records when it was asked to learn.
#[derive(Default)]
struct CountingAgent {
    action_dim: usize,
    /// Proposals alternate between `+magnitude` and `-magnitude`.
    magnitude: f32,
    acts: usize,
    /// Value of `acts` at each update call.
    updates_at: Vec<usize>,
    phases: Vec<UpdatePhase>,
    stop_after: Option<(usize, StopSignal)>,
    loaded: bool,
}

impl CountingAgent {
    fn new(action_dim: usize) -> Self {
        Self { action_dim, ..Self::default() }
    }
}

impl Agent for CountingAgent {
    fn act(&mut self, _obs: &[f32]) -> Vec<f32> {
        self.acts += 1;
        if let Some((n, stop)) = &self.stop_after {
            if self.acts == *n {
                stop.raise();
            }
        }
        (0..self.action_dim)
            .map(|i| if (self.acts + i) % 2 == 0 { self.magnitude } else { -self.magnitude })
            .collect()
    }

    fn update(&mut self, batch: &[Experience], phase: UpdatePhase) -> f32 {
        assert!(!batch.is_empty());
        self.updates_at.push(self.acts);
        self.phases.push(phase);
        1.0
    }

    fn save(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.acts.to_string())?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> anyhow::Result<()> {
        std::fs::read_to_string(path)?;
        self.loaded = true;
        Ok(())
    }
}

/// Zero noise that counts how often it is used.
#[derive(Clone, Default)]
struct RecordingNoise {
    size: usize,
    samples: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl ExplorationProcess for RecordingNoise {
    fn sample(&mut self) -> Vec<f32> {
        self.samples.fetch_add(1, Ordering::SeqCst);
        vec![0.0; self.size]
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    fn size(&self) -> usize {
        self.size
    }
}

fn config(root: &Path, run_id: &str) -> TrainConfig {
    let mut config = TrainConfig {
        run_id: Some(run_id.into()),
        buffer: BufferConfig { limit: 1000, window_length: 1, allow_replacement: false },
        batch_size: 8,
        checkpoint: CheckpointConfig {
            every_episodes: None,
            every_steps: None,
            model_dir: root.join("models"),
            results_dir: root.join("results"),
        },
        ..TrainConfig::default()
    };
    config.env.max_episode_steps = 50;
    config
}

fn linkage_trainer(config: TrainConfig) -> Trainer<LinkageEnv, CountingAgent> {
    let env = LinkageEnv::new(config.env.clone(), None).unwrap();
    let agent = CountingAgent::new(env.action_size());
    Trainer::new(config, env, agent).unwrap()
}

#[test]
fn first_update_fires_on_the_step_after_warmup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "warmup");
    config.warmup = WarmupConfig { actor: 100, critic: 100 };
    config.episodes = 3;
    let mut trainer = linkage_trainer(config);
    let report = trainer.run();

    assert_eq!(report.total_steps, 150);
    let updates = &trainer.agent().updates_at;
    assert_eq!(updates.first(), Some(&101));
    // one update per step from then on, never two on the same step
    assert_eq!(*updates, (101..=150).collect::<Vec<_>>());
    assert_eq!(report.updates, 50);
}

#[test]
fn each_half_trains_only_past_its_own_warmup() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "halves");
    config.warmup = WarmupConfig { actor: 20, critic: 10 };
    config.episodes = 1;
    let mut trainer = linkage_trainer(config);
    trainer.run();

    let agent = trainer.agent();
    assert_eq!(agent.updates_at.first(), Some(&11));
    for (at, phase) in agent.updates_at.iter().zip(&agent.phases) {
        assert!(phase.critic);
        assert_eq!(phase.actor, *at > 20, "step {at}");
    }
}

#[test]
fn train_interval_spaces_updates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "interval");
    config.warmup = WarmupConfig { actor: 10, critic: 10 };
    config.train_interval = 5;
    config.episodes = 1;
    let mut trainer = linkage_trainer(config);
    trainer.run();
    assert_eq!(trainer.agent().updates_at, vec![11, 16, 21, 26, 31, 36, 41, 46]);
}

#[test]
fn insufficient_data_skips_updates() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "starved");
    config.warmup = WarmupConfig { actor: 0, critic: 0 };
    config.batch_size = 20;
    config.episodes = 1;
    let mut trainer = linkage_trainer(config);
    trainer.run();
    assert_eq!(trainer.agent().updates_at.first(), Some(&20));
}

#[test]
fn unwritable_checkpoint_location_does_not_stop_training() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not_a_dir");
    std::fs::write(&blocker, b"").unwrap();
    let mut config = config(dir.path(), "blocked");
    config.checkpoint.model_dir = blocker.join("models");
    config.checkpoint.results_dir = blocker.join("results");
    config.checkpoint.every_episodes = Some(1);
    config.episodes = 3;

    let report = linkage_trainer(config).run();
    assert_eq!(report.episodes_completed, 3);
    assert_eq!(report.total_steps, 150);
    assert_eq!(report.last_checkpoint, None);
}

#[test]
fn stop_signal_finishes_the_step_and_checkpoints() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "stopped");
    config.episodes = 10;
    let stop = StopSignal::new();
    let env = LinkageEnv::new(config.env.clone(), None).unwrap();
    let agent = CountingAgent { stop_after: Some((70, stop.clone())), ..CountingAgent::new(env.action_size()) };
    let mut trainer = Trainer::new(config, env, agent).unwrap().with_stop_signal(stop);

    let report = trainer.run();
    assert!(report.interrupted);
    assert_eq!(report.total_steps, 70);
    assert_eq!(report.episodes_completed, 1);
    assert_eq!(trainer.buffer().len(), 70);

    let meta_path = report.last_checkpoint.expect("final checkpoint");
    let meta = CheckpointMeta::load(&meta_path).unwrap();
    assert_eq!(meta.total_steps, 70);
    assert_eq!(meta.episode, 1);
    assert!(meta.params_path(&meta_path).is_file());
    assert!(dir.path().join("results/stopped/stopped_70.json").is_file());
}

#[test]
fn resume_restores_counters_and_parameters() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = config(dir.path(), "resumable");
    first.episodes = 2;
    let report = linkage_trainer(first).run();
    let meta_path = report.last_checkpoint.unwrap();

    let mut second = config(dir.path(), "ignored");
    second.episodes = 3;
    let mut trainer = linkage_trainer(second);
    trainer.resume(&meta_path).unwrap();
    assert!(trainer.agent().loaded);
    assert_eq!(trainer.run_id(), "resumable");
    assert_eq!(trainer.total_steps(), 100);
    assert_eq!(trainer.episodes_completed(), 2);

    let report = trainer.run();
    assert_eq!(report.episodes_completed, 3);
    assert_eq!(report.total_steps, 150);
    assert_eq!(trainer.checkpointer().latest().unwrap(), report.last_checkpoint);
}

#[test]
fn resume_keeps_the_reward_history() {
    let dir = tempfile::tempdir().unwrap();
    let mut first = config(dir.path(), "rewards");
    first.episodes = 2;
    let report = linkage_trainer(first).run();
    let before = CheckpointMeta::load(report.last_checkpoint.as_ref().unwrap()).unwrap();
    assert_eq!(before.episode_rewards.len(), 2);

    let mut second = config(dir.path(), "rewards");
    second.episodes = 3;
    let mut trainer = linkage_trainer(second);
    trainer.resume(report.last_checkpoint.as_ref().unwrap()).unwrap();
    let report = trainer.run();

    let after = CheckpointMeta::load(&report.last_checkpoint.unwrap()).unwrap();
    assert_eq!(after.episode_rewards.len(), 3);
    assert_eq!(after.episode_rewards[..2], before.episode_rewards[..]);
    assert_eq!(trainer.log().episodes.len(), 1);
}

#[test]
fn stop_on_an_episode_boundary_starts_no_new_episode() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "boundary");
    config.episodes = 10;
    let stop = StopSignal::new();
    let env = LinkageEnv::new(config.env.clone(), None).unwrap();
    let noise = RecordingNoise { size: env.action_size(), ..RecordingNoise::default() };
    let resets = Arc::clone(&noise.resets);
    // the 50th act is the last step of the first episode
    let agent = CountingAgent { stop_after: Some((50, stop.clone())), ..CountingAgent::new(env.action_size()) };
    let mut trainer =
        Trainer::new(config, env, agent).unwrap().with_exploration(Box::new(noise)).with_stop_signal(stop);

    let report = trainer.run();
    assert!(report.interrupted);
    assert_eq!(report.total_steps, 50);
    assert_eq!(report.episodes_completed, 1);
    assert_eq!(resets.load(Ordering::SeqCst), 1);
    let meta = CheckpointMeta::load(&report.last_checkpoint.unwrap()).unwrap();
    assert_eq!(meta.episode, 0);
    assert!(!dir.path().join("models/boundary/model_boundary_ep1_50.json").exists());
}

#[test]
fn applied_actions_stay_inside_bounds_for_extreme_proposals() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "extreme");
    config.episodes = 2;
    let env = LinkageEnv::new(config.env.clone(), None).unwrap();
    let agent = CountingAgent { magnitude: 1e6, ..CountingAgent::new(env.action_size()) };
    let mut trainer = Trainer::new(config, env, agent).unwrap();
    trainer.run();

    let (low, high) = trainer.env().action_bounds();
    assert!(!trainer.buffer().is_empty());
    for t in trainer.buffer().iter() {
        for (i, a) in t.action.iter().enumerate() {
            assert!((low[i]..=high[i]).contains(a), "action {a} outside [{}, {}]", low[i], high[i]);
        }
    }
    // both bounds were hit
    assert!(trainer.buffer().iter().any(|t| t.action[0] == low[0]));
    assert!(trainer.buffer().iter().any(|t| t.action[0] == high[0]));
}

#[test]
fn exploration_resets_once_per_episode() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "resets");
    config.episodes = 4;
    let env = LinkageEnv::new(config.env.clone(), None).unwrap();
    let noise = RecordingNoise { size: env.action_size(), ..RecordingNoise::default() };
    let (resets, samples) = (Arc::clone(&noise.resets), Arc::clone(&noise.samples));
    let agent = CountingAgent::new(env.action_size());
    let mut trainer = Trainer::new(config, env, agent).unwrap().with_exploration(Box::new(noise));

    let report = trainer.run();
    assert_eq!(report.episodes_completed, 4);
    assert_eq!(resets.load(Ordering::SeqCst), 4);
    assert_eq!(samples.load(Ordering::SeqCst), report.total_steps);
}

#[test]
fn evaluation_neither_explores_nor_learns() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "eval");
    config.warmup = WarmupConfig { actor: 10, critic: 10 };
    config.episodes = 2;
    let env = LinkageEnv::new(config.env.clone(), None).unwrap();
    let noise = RecordingNoise { size: env.action_size(), ..RecordingNoise::default() };
    let samples = Arc::clone(&noise.samples);
    let agent = CountingAgent::new(env.action_size());
    let mut trainer = Trainer::new(config, env, agent).unwrap().with_exploration(Box::new(noise));
    trainer.run();

    let updates = trainer.agent().updates_at.len();
    let stored = trainer.buffer().len();
    let sampled = samples.load(Ordering::SeqCst);
    assert!(updates > 0);

    let summaries = trainer.evaluate(3);
    assert_eq!(summaries.len(), 3);
    assert!(summaries.iter().all(|s| s.steps == 50 && s.noise_scale == 0.0));
    assert_eq!(trainer.agent().updates_at.len(), updates);
    assert_eq!(trainer.agent().acts, 100 + 150);
    assert_eq!(trainer.buffer().len(), stored);
    assert_eq!(samples.load(Ordering::SeqCst), sampled);
    assert_eq!(trainer.total_steps(), 100);
    assert_eq!(trainer.episodes_completed(), 2);
}

#[test]
fn step_budget_caps_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "budget");
    config.max_total_steps = Some(75);
    let report = linkage_trainer(config).run();
    assert_eq!(report.total_steps, 75);
    assert_eq!(report.episodes_completed, 1);
    assert!(!report.interrupted);
}

/// Integrates until `fail_at`, then reports a singular mass matrix.
struct FailingEnv {
    steps: usize,
    fail_at: usize,
    low: Vec<f32>,
    high: Vec<f32>,
}

impl Env for FailingEnv {
    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError> {
        if self.steps + 1 == self.fail_at {
            return Err(PhysicsError::IntegrationFailure("singular mass matrix".into()).into());
        }
        self.steps += 1;
        Ok(Step {
            obs: vec![self.steps as f32],
            reward: 1.0,
            done: self.steps == 100,
            info: StepInfo { step: self.steps, applied_action: action.to_vec(), ..StepInfo::default() },
        })
    }

    fn reset(&mut self) -> Vec<f32> {
        self.steps = 0;
        vec![0.0]
    }

    fn obs_size(&self) -> usize {
        1
    }

    fn action_size(&self) -> usize {
        1
    }

    fn action_bounds(&self) -> (&[f32], &[f32]) {
        (&self.low, &self.high)
    }
}

#[test]
fn integration_failure_ends_episode_with_penalty() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "failing");
    config.episodes = 2;
    config.failure_penalty = -50.0;
    let env = FailingEnv { steps: 0, fail_at: 5, low: vec![-1.0], high: vec![1.0] };
    let mut trainer = Trainer::new(config, env, CountingAgent::new(1)).unwrap();
    let report = trainer.run();

    assert_eq!(report.episodes_completed, 2);
    assert_eq!(report.total_steps, 10);
    let episodes = &trainer.log().episodes;
    assert!(episodes.iter().all(|e| e.failed && e.steps == 5));
    assert_eq!(episodes[0].cumulative_reward, 4.0 - 50.0);

    let transitions: Vec<_> = trainer.buffer().iter().collect();
    assert!(transitions.iter().all(|t| t.is_finite()));
    let penalty = transitions[4];
    assert_eq!(penalty.reward, -50.0);
    assert!(penalty.done);
    // no new state was produced, so the episode ends where it stood
    assert_eq!(penalty.next_obs, vec![4.0]);
    assert!(penalty.action.iter().all(|a| (-1.0..=1.0).contains(a)));
}

#[test]
fn invalid_config_is_rejected_before_training() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path(), "bad");
    config.env.obs_low[0] = 100.0;
    let env = FailingEnv { steps: 0, fail_at: 0, low: vec![-1.0], high: vec![1.0] };
    assert!(matches!(Trainer::new(config, env, CountingAgent::new(1)), Err(rl::TrainError::Config(_))));
}
