//! Linear deterministic actor/critic.
//!
//! Actor `a = W s + b`, critic `Q(s, a) = v . [s; a; 1]`. Both have target
//! copies that track the online parameters through a soft update with rate
//! `target_update`. The critic regresses onto
//! `r + gamma * (1 - done) * Q'(s', mu'(s'))`; the actor follows `dQ/da`
//! with a small L2 pull on the action to keep it bounded.

use std::path::Path;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::agent::{Agent, UpdatePhase};
use crate::error::ConfigError;
use crate::optim::Adam;
use crate::replay::Experience;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinearAgentConfig {
    /// Discount factor.
    pub gamma: f32,
    pub actor_lr: f32,
    pub critic_lr: f32,
    /// Soft target update rate `tau` in `(0, 1]`.
    pub target_update: f32,
    pub clip_norm: Option<f32>,
    pub action_l2: f32,
    pub seed: u64,
}

impl Default for LinearAgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            actor_lr: 1e-3,
            critic_lr: 1e-3,
            target_update: 1e-3,
            clip_norm: Some(1.0),
            action_l2: 1e-3,
            seed: 0,
        }
    }
}

impl LinearAgentConfig {
    /// # Errors
    ///
    /// `gamma` outside `[0, 1]`, non-positive learning rates, or a target
    /// update rate outside `(0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(ConfigError::OutOfRange { field: "agent.gamma", reason: format!("{} not in [0, 1]", self.gamma) });
        }
        for (field, lr) in [("agent.actor_lr", self.actor_lr), ("agent.critic_lr", self.critic_lr)] {
            if !lr.is_finite() || lr <= 0.0 {
                return Err(ConfigError::OutOfRange { field, reason: format!("must be positive, got {lr}") });
            }
        }
        if !(self.target_update > 0.0 && self.target_update <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "agent.target_update",
                reason: format!("{} not in (0, 1]", self.target_update),
            });
        }
        if let Some(c) = self.clip_norm {
            if !c.is_finite() || c <= 0.0 {
                return Err(ConfigError::OutOfRange { field: "agent.clip_norm", reason: "must be positive".into() });
            }
        }
        if !self.action_l2.is_finite() || self.action_l2 < 0.0 {
            return Err(ConfigError::OutOfRange { field: "agent.action_l2", reason: "must be non-negative".into() });
        }
        Ok(())
    }
}

/// Everything that defines the policy; the unit of persistence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
struct Params {
    obs_dim: usize,
    act_dim: usize,
    actor_w: Vec<f32>,
    actor_b: Vec<f32>,
    critic_v: Vec<f32>,
    target_actor_w: Vec<f32>,
    target_actor_b: Vec<f32>,
    target_critic_v: Vec<f32>,
}

pub struct LinearAgent {
    config: LinearAgentConfig,
    params: Params,
    actor_opt: Adam,
    critic_opt: Adam,
}

fn policy(w: &[f32], b: &[f32], obs: &[f32]) -> Vec<f32> {
    let obs_dim = obs.len();
    b.iter()
        .enumerate()
        .map(|(i, bias)| bias + w[i * obs_dim..(i + 1) * obs_dim].iter().zip(obs).map(|(w, s)| w * s).sum::<f32>())
        .collect()
}

fn value(v: &[f32], obs: &[f32], action: &[f32]) -> f32 {
    let features = obs.iter().chain(action).chain(std::iter::once(&1.0));
    v.iter().zip(features).map(|(v, x)| v * x).sum()
}

fn soft_update(target: &mut [f32], online: &[f32], tau: f32) {
    for (t, o) in target.iter_mut().zip(online) {
        *t = tau * o + (1.0 - tau) * *t;
    }
}

impl LinearAgent {
    /// Glorot-initialized actor, zero critic.
    #[must_use]
    pub fn new(obs_dim: usize, act_dim: usize, config: LinearAgentConfig) -> Self {
        let mut rng = fastrand::Rng::with_seed(config.seed);
        let limit = (6.0 / (obs_dim + act_dim) as f32).sqrt();
        let actor_w: Vec<f32> = (0..obs_dim * act_dim).map(|_| rng.f32() * 2.0 * limit - limit).collect();
        let actor_b = vec![0.0; act_dim];
        let critic_v = vec![0.0; obs_dim + act_dim + 1];
        let params = Params {
            obs_dim,
            act_dim,
            target_actor_w: actor_w.clone(),
            target_actor_b: actor_b.clone(),
            target_critic_v: critic_v.clone(),
            actor_w,
            actor_b,
            critic_v,
        };
        let actor_opt = Adam::new(&[obs_dim * act_dim, act_dim], config.actor_lr, config.clip_norm);
        let critic_opt = Adam::new(&[obs_dim + act_dim + 1], config.critic_lr, config.clip_norm);
        Self { config, params, actor_opt, critic_opt }
    }

    #[must_use]
    pub fn obs_dim(&self) -> usize {
        self.params.obs_dim
    }

    #[must_use]
    pub fn act_dim(&self) -> usize {
        self.params.act_dim
    }

    /// Online critic estimate.
    #[must_use]
    pub fn q_value(&self, obs: &[f32], action: &[f32]) -> f32 {
        value(&self.params.critic_v, obs, action)
    }

    /// Mean squared TD error and its gradient with respect to the critic.
    fn critic_step(&self, batch: &[Experience]) -> (f32, Vec<f32>) {
        let p = &self.params;
        let n = batch.len() as f32;
        let mut grad = vec![0.0; p.critic_v.len()];
        let mut loss = 0.0;
        for e in batch {
            let next_action = policy(&p.target_actor_w, &p.target_actor_b, &e.next_obs);
            let bootstrap = if e.done { 0.0 } else { value(&p.target_critic_v, &e.next_obs, &next_action) };
            let target = e.reward + self.config.gamma * bootstrap;
            let delta = value(&p.critic_v, &e.obs, &e.action) - target;
            loss += delta * delta / n;
            let features = e.obs.iter().chain(&e.action).chain(std::iter::once(&1.0));
            for (g, x) in grad.iter_mut().zip(features) {
                *g += 2.0 * delta * x / n;
            }
        }
        (loss, grad)
    }

    /// Gradient of `-Q(s, mu(s)) + l2 * |mu(s)|^2` with respect to the actor.
    fn actor_step(&self, batch: &[Experience]) -> (Vec<f32>, Vec<f32>) {
        let p = &self.params;
        let n = batch.len() as f32;
        let dq_da = &p.critic_v[p.obs_dim..p.obs_dim + p.act_dim];
        let mut grad_w = vec![0.0; p.actor_w.len()];
        let mut grad_b = vec![0.0; p.act_dim];
        for e in batch {
            let action = policy(&p.actor_w, &p.actor_b, &e.obs);
            for i in 0..p.act_dim {
                let d = (-dq_da[i] + 2.0 * self.config.action_l2 * action[i]) / n;
                grad_b[i] += d;
                for (j, s) in e.obs.iter().enumerate() {
                    grad_w[i * p.obs_dim + j] += d * s;
                }
            }
        }
        (grad_w, grad_b)
    }
}

impl Agent for LinearAgent {
    fn act(&mut self, obs: &[f32]) -> Vec<f32> {
        debug_assert_eq!(obs.len(), self.params.obs_dim);
        policy(&self.params.actor_w, &self.params.actor_b, obs)
    }

    fn update(&mut self, batch: &[Experience], phase: UpdatePhase) -> f32 {
        if batch.is_empty() || !phase.any() {
            return 0.0;
        }
        let (loss, critic_grad) = self.critic_step(batch);
        if phase.critic {
            self.critic_opt.step(&mut [&mut self.params.critic_v], &[&critic_grad]);
        }
        if phase.actor {
            let (grad_w, grad_b) = self.actor_step(batch);
            self.actor_opt.step(
                &mut [&mut self.params.actor_w, &mut self.params.actor_b],
                &[&grad_w, &grad_b],
            );
        }

        let tau = self.config.target_update;
        let p = &mut self.params;
        soft_update(&mut p.target_actor_w, &p.actor_w, tau);
        soft_update(&mut p.target_actor_b, &p.actor_b, tau);
        soft_update(&mut p.target_critic_v, &p.critic_v, tau);
        loss
    }

    fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_vec(&self.params)?;
        std::fs::write(path, json).with_context(|| format!("writing agent parameters to {}", path.display()))?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> anyhow::Result<()> {
        let bytes = std::fs::read(path).with_context(|| format!("reading agent parameters from {}", path.display()))?;
        let params: Params = serde_json::from_slice(&bytes)?;
        ensure!(
            params.obs_dim == self.params.obs_dim && params.act_dim == self.params.act_dim,
            "checkpoint is for a {}x{} policy, agent is {}x{}",
            params.obs_dim,
            params.act_dim,
            self.params.obs_dim,
            self.params.act_dim
        );
        ensure!(
            params.actor_w.len() == params.obs_dim * params.act_dim
                && params.critic_v.len() == params.obs_dim + params.act_dim + 1,
            "checkpoint parameter shapes are inconsistent"
        );
        self.params = params;
        Ok(())
    }
}
