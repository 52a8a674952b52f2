//! # Training Application
//!
//! Turns command-line arguments into a configured [`rl::Trainer`] over a
//! [`ml::LinkageEnv`] and a [`ml::LinearAgent`], runs it and reports where
//! the results went.

use std::path::Path;

use anyhow::{Context, Result};
use ml::{Env, LinearAgent, LinkageEnv, PoseSequence};
use rl::{EpisodeSummary, TrainConfig, Trainer};

use crate::{watcher, EvalArgs, TrainArgs};

fn read_config(path: Option<&Path>) -> Result<TrainConfig> {
    Ok(match path {
        Some(path) => TrainConfig::from_path(path)?,
        None => TrainConfig::default(),
    })
}

/// Load the configuration and apply command-line overrides.
fn load_config(args: &TrainArgs) -> Result<TrainConfig> {
    let mut config = read_config(args.config.as_deref())?;
    if let Some(id) = &args.run_id {
        config.run_id = Some(id.clone());
    }
    if let Some(episodes) = args.episodes {
        config.episodes = episodes;
    }
    // fix the id now so the watcher and the trainer agree on it
    config.run_id = Some(config.resolved_run_id());
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Run training as described by `args`.
///
/// # Errors
///
/// Configuration, pose file and resume failures. Failures during training
/// are recovered by the loop itself.
pub fn train(args: &TrainArgs) -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = load_config(args)?;
    let eval_episodes = config.eval_episodes;
    let mut trainer = build_trainer(config, args.angles.as_deref())?;
    if let Some(meta) = &args.resume {
        trainer.resume(meta)?;
    }

    let _stop_watcher = if args.no_watch {
        None
    } else {
        match watcher::watch(&trainer.checkpointer().results_dir(), trainer.stop_signal()) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::error!("stop file watcher unavailable: {e:?}");
                None
            }
        }
    };

    let report = trainer.run();
    match &report.last_checkpoint {
        Some(path) => println!("{} steps, last checkpoint {}", report.total_steps, path.display()),
        None => println!("{} steps, no checkpoint was written", report.total_steps),
    }
    if let Some(reward) = trainer.log().recent_reward(10) {
        println!("mean reward over the last episodes: {reward:.3}");
    }
    if !report.interrupted && eval_episodes > 0 {
        report_evaluation(&trainer.evaluate(eval_episodes));
    }
    Ok(())
}

/// Replay a checkpoint without noise or learning.
///
/// # Errors
///
/// Configuration, pose file and checkpoint failures.
pub fn evaluate(args: &EvalArgs) -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut config = read_config(args.config.as_deref())?;
    let episodes = args.episodes.unwrap_or(config.eval_episodes);
    // evaluation never writes checkpoints
    config.checkpoint.every_episodes = None;
    config.checkpoint.every_steps = None;
    config.validate().context("invalid configuration")?;

    let mut trainer = build_trainer(config, args.angles.as_deref())?;
    trainer.resume(&args.resume)?;
    report_evaluation(&trainer.evaluate(episodes));
    Ok(())
}

/// Environment, agent and trainer for `config`.
fn build_trainer(config: TrainConfig, angles: Option<&Path>) -> Result<Trainer<LinkageEnv, LinearAgent>> {
    let poses = angles.map(|path| PoseSequence::from_path(path, config.env.n_links)).transpose()?;
    let env = LinkageEnv::new(config.env.clone(), poses)?;
    let obs_dim = env.obs_size() * config.buffer.window_length;
    let agent = LinearAgent::new(obs_dim, env.action_size(), config.agent.clone());
    tracing::info!(
        n_links = config.env.n_links,
        obs_dim,
        action_dim = env.action_size(),
        integrator = ?config.env.integrator,
        "environment ready"
    );
    Ok(Trainer::new(config, env, agent)?)
}

fn report_evaluation(summaries: &[EpisodeSummary]) {
    for s in summaries {
        println!("evaluation episode {}: reward {:.3} over {} steps", s.episode, s.cumulative_reward, s.steps);
    }
    if !summaries.is_empty() {
        let mean = summaries.iter().map(|s| s.cumulative_reward).sum::<f32>() / summaries.len() as f32;
        println!("mean evaluation reward: {mean:.3}");
    }
}

/// # Errors
///
/// Serialization failure.
pub fn print_default_config() -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&TrainConfig::default())?);
    Ok(())
}
