use serde::{Deserialize, Serialize};

/// What happened in one episode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub steps: usize,
    pub total_steps: usize,
    pub cumulative_reward: f32,
    pub last_loss: Option<f32>,
    pub noise_scale: f32,
    /// Ended by a dynamics failure.
    pub failed: bool,
    /// Ended by leaving the safety envelope.
    pub terminated: bool,
}

/// Everything the run records besides the policy itself. Serialized as the
/// results file next to each checkpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingLog {
    /// Episodes played by this process.
    pub episodes: Vec<EpisodeSummary>,
    /// Cumulative reward of every completed episode of the run, including
    /// those restored from a checkpoint.
    pub episode_rewards: Vec<f32>,
    /// One entry per update call.
    pub losses: Vec<f32>,
    /// `[episode, obs...]` for every step taken.
    pub trajectory: Vec<Vec<f32>>,
}

impl TrainingLog {
    pub fn record_episode(&mut self, summary: EpisodeSummary) {
        self.episode_rewards.push(summary.cumulative_reward);
        self.episodes.push(summary);
    }

    pub fn record_step(&mut self, episode: usize, obs: &[f32]) {
        let mut row = Vec::with_capacity(obs.len() + 1);
        row.push(episode as f32);
        row.extend_from_slice(obs);
        self.trajectory.push(row);
    }

    #[must_use]
    pub fn last_loss(&self) -> Option<f32> {
        self.losses.last().copied()
    }

    /// Mean cumulative reward of the last `n` episodes.
    #[must_use]
    pub fn recent_reward(&self, n: usize) -> Option<f32> {
        let recent = &self.episode_rewards[self.episode_rewards.len().saturating_sub(n)..];
        if recent.is_empty() {
            return None;
        }
        Some(recent.iter().sum::<f32>() / recent.len() as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(episode: usize, reward: f32) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            steps: 1,
            total_steps: episode + 1,
            cumulative_reward: reward,
            last_loss: None,
            noise_scale: 1.0,
            failed: false,
            terminated: false,
        }
    }

    #[test]
    fn recent_reward_averages_the_tail() {
        let mut log = TrainingLog::default();
        assert_eq!(log.recent_reward(3), None);
        for (i, r) in [-10.0, -4.0, -2.0].into_iter().enumerate() {
            log.record_episode(summary(i, r));
        }
        assert_eq!(log.episodes.len(), 3);
        assert_eq!(log.recent_reward(2), Some(-3.0));
        assert_eq!(log.recent_reward(10), Some(-16.0 / 3.0));
    }

    #[test]
    fn restored_rewards_count_toward_the_tail() {
        let mut log = TrainingLog { episode_rewards: vec![-8.0, -6.0], ..TrainingLog::default() };
        log.record_episode(summary(2, -1.0));
        assert_eq!(log.episode_rewards, vec![-8.0, -6.0, -1.0]);
        assert_eq!(log.recent_reward(2), Some(-3.5));
    }

    #[test]
    fn trajectory_rows_lead_with_episode() {
        let mut log = TrainingLog::default();
        log.record_step(4, &[0.5, 1.5]);
        assert_eq!(log.trajectory, vec![vec![4.0, 0.5, 1.5]]);
    }
}
