//! # Experience Replay
//!
//! [`ExperienceBuffer`] is a bounded FIFO of [`Transition`]s. Once full, every
//! push evicts the oldest entry in constant time.
//!
//! With `window_length > 1` a sample is the window of consecutive
//! transitions ending at the drawn index. Each stored transition carries the
//! id of the episode it belongs to and only indices whose whole window lies
//! inside one episode are eligible, so a window never straddles an episode
//! boundary. The number of eligible windows is maintained on push, and
//! sampling draws indices and rejects ineligible ones.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SampleError};

/// One environment step.
#[derive(Clone, Debug, PartialEq)]
pub struct Transition {
    pub obs: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_obs: Vec<f32>,
    pub done: bool,
}

impl Transition {
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.reward.is_finite()
            && self
                .obs
                .iter()
                .chain(&self.action)
                .chain(&self.next_obs)
                .all(|v| v.is_finite())
    }
}

/// A sampled window, frames stacked oldest first.
#[derive(Clone, Debug, PartialEq)]
pub struct Experience {
    pub obs: Vec<f32>,
    pub action: Vec<f32>,
    pub reward: f32,
    pub next_obs: Vec<f32>,
    pub done: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Capacity in transitions.
    pub limit: usize,
    pub window_length: usize,
    /// Draw with replacement when fewer distinct windows than requested are
    /// eligible.
    pub allow_replacement: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self { limit: 1000, window_length: 2, allow_replacement: false }
    }
}

impl BufferConfig {
    /// # Errors
    ///
    /// Zero capacity, zero window, or a window longer than the buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit == 0 {
            return Err(ConfigError::OutOfRange { field: "buffer.limit", reason: "must be positive".into() });
        }
        if self.window_length == 0 || self.window_length > self.limit {
            return Err(ConfigError::OutOfRange {
                field: "buffer.window_length",
                reason: format!("must be within 1..={}, got {}", self.limit, self.window_length),
            });
        }
        Ok(())
    }
}

pub struct ExperienceBuffer {
    entries: VecDeque<(u64, Transition)>,
    capacity: usize,
    window_length: usize,
    allow_replacement: bool,
    episode: u64,
    /// Windows that lie inside a single episode.
    eligible: usize,
}

impl ExperienceBuffer {
    /// # Errors
    ///
    /// Any [`BufferConfig::validate`] failure.
    pub fn new(config: &BufferConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            entries: VecDeque::with_capacity(config.limit),
            capacity: config.limit,
            window_length: config.window_length,
            allow_replacement: config.allow_replacement,
            episode: 0,
            eligible: 0,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn window_length(&self) -> usize {
        self.window_length
    }

    /// Number of windows a sample can currently draw from.
    #[must_use]
    pub fn eligible_windows(&self) -> usize {
        self.eligible
    }

    /// Append a transition, evicting the oldest one if the buffer is full.
    /// A `done` transition closes the current episode.
    pub fn push(&mut self, transition: Transition) {
        debug_assert!(transition.is_finite(), "non-finite transition pushed");
        if self.entries.len() == self.capacity {
            // the window ending at w - 1 loses its first frame
            if self.entries.len() >= self.window_length && self.is_eligible(self.window_length - 1) {
                self.eligible -= 1;
            }
            self.entries.pop_front();
        }
        let done = transition.done;
        self.entries.push_back((self.episode, transition));
        let last = self.entries.len() - 1;
        if last + 1 >= self.window_length && self.is_eligible(last) {
            self.eligible += 1;
        }
        if done {
            self.episode += 1;
        }
    }

    /// Close the current episode without a terminal transition, e.g. when a
    /// run is interrupted mid-episode.
    pub fn end_episode(&mut self) {
        self.episode += 1;
    }

    /// Stored transitions, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.entries.iter().map(|(_, t)| t)
    }

    /// Whether the window ending at `end` lies inside a single episode.
    /// `end` must be at least `window_length - 1`.
    fn is_eligible(&self, end: usize) -> bool {
        self.entries[end + 1 - self.window_length].0 == self.entries[end].0
    }

    /// Uniform draw over eligible window ends.
    fn draw(&self, rng: &mut fastrand::Rng) -> usize {
        loop {
            let end = rng.usize(self.window_length - 1..self.entries.len());
            if self.is_eligible(end) {
                return end;
            }
        }
    }

    fn window(&self, end: usize) -> Experience {
        let frames = (end + 1 - self.window_length..=end).map(|i| &self.entries[i].1);
        let mut obs = Vec::new();
        let mut next_obs = Vec::new();
        for t in frames {
            obs.extend_from_slice(&t.obs);
            next_obs.extend_from_slice(&t.next_obs);
        }
        let last = &self.entries[end].1;
        Experience { obs, action: last.action.clone(), reward: last.reward, next_obs, done: last.done }
    }

    /// Draw `batch_size` windows uniformly at random.
    ///
    /// Windows are distinct whenever enough are eligible. Otherwise the draw
    /// falls back to sampling with replacement if the buffer allows it.
    ///
    /// # Errors
    ///
    /// [`SampleError::InsufficientData`] if too few windows are eligible.
    pub fn sample(&self, batch_size: usize, rng: &mut fastrand::Rng) -> Result<Vec<Experience>, SampleError> {
        let available = self.eligible;
        if available >= batch_size {
            let mut ends = Vec::with_capacity(batch_size);
            while ends.len() < batch_size {
                let end = self.draw(rng);
                if !ends.contains(&end) {
                    ends.push(end);
                }
            }
            Ok(ends.into_iter().map(|i| self.window(i)).collect())
        } else if self.allow_replacement && available > 0 {
            Ok((0..batch_size).map(|_| self.window(self.draw(rng))).collect())
        } else {
            Err(SampleError::InsufficientData { requested: batch_size, available })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(tag: usize, done: bool) -> Transition {
        Transition {
            obs: vec![tag as f32],
            action: vec![0.0],
            reward: tag as f32,
            next_obs: vec![tag as f32 + 1.0],
            done,
        }
    }

    fn buffer(limit: usize, window_length: usize, allow_replacement: bool) -> ExperienceBuffer {
        ExperienceBuffer::new(&BufferConfig { limit, window_length, allow_replacement }).unwrap()
    }

    #[test]
    fn never_exceeds_capacity() {
        let mut buf = buffer(10, 1, false);
        for i in 0..25 {
            buf.push(tagged(i, false));
            assert!(buf.len() <= 10);
        }
        let rewards: Vec<f32> = buf.iter().map(|t| t.reward).collect();
        assert_eq!(rewards, (15..25).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn insufficient_data_without_replacement() {
        let mut buf = buffer(10, 1, false);
        let mut rng = fastrand::Rng::with_seed(0);
        buf.push(tagged(0, false));
        buf.push(tagged(1, false));
        assert_eq!(
            buf.sample(3, &mut rng),
            Err(SampleError::InsufficientData { requested: 3, available: 2 })
        );
    }

    #[test]
    fn replacement_fills_the_batch() {
        let mut buf = buffer(10, 1, true);
        let mut rng = fastrand::Rng::with_seed(0);
        buf.push(tagged(0, false));
        assert_eq!(buf.sample(4, &mut rng).unwrap().len(), 4);
        assert!(buffer(10, 1, true).sample(1, &mut rng).is_err());
    }

    #[test]
    fn samples_are_distinct_when_possible() {
        let mut buf = buffer(10, 1, false);
        let mut rng = fastrand::Rng::with_seed(5);
        for i in 0..5 {
            buf.push(tagged(i, false));
        }
        let mut tags: Vec<f32> = buf.sample(5, &mut rng).unwrap().iter().map(|e| e.reward).collect();
        tags.sort_by(f32::total_cmp);
        assert_eq!(tags, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn window_stacks_frames_oldest_first() {
        let mut buf = buffer(10, 3, false);
        let mut rng = fastrand::Rng::with_seed(1);
        for i in 0..3 {
            buf.push(tagged(i, false));
        }
        let batch = buf.sample(1, &mut rng).unwrap();
        assert_eq!(batch[0].obs, vec![0.0, 1.0, 2.0]);
        assert_eq!(batch[0].next_obs, vec![1.0, 2.0, 3.0]);
        assert_eq!(batch[0].reward, 2.0);
    }

    #[test]
    fn end_episode_breaks_windows() {
        let mut buf = buffer(10, 2, false);
        let mut rng = fastrand::Rng::with_seed(1);
        buf.push(tagged(0, false));
        buf.end_episode();
        buf.push(tagged(1, false));
        assert!(buf.sample(1, &mut rng).is_err());
        buf.push(tagged(2, false));
        assert_eq!(buf.sample(1, &mut rng).unwrap()[0].obs, vec![1.0, 2.0]);
    }

    #[test]
    fn config_rejects_window_longer_than_buffer() {
        let config = BufferConfig { limit: 2, window_length: 3, allow_replacement: false };
        assert!(config.validate().is_err());
        assert!(matches!(ExperienceBuffer::new(&config), Err(ConfigError::OutOfRange { .. })));
        let empty = BufferConfig { limit: 0, window_length: 1, allow_replacement: false };
        assert!(ExperienceBuffer::new(&empty).is_err());
    }

    #[test]
    fn eligible_count_tracks_pushes_and_evictions() {
        let mut buf = buffer(4, 2, false);
        let brute = |b: &ExperienceBuffer| (1..b.len()).filter(|&i| b.is_eligible(i)).count();
        let mut rng = fastrand::Rng::with_seed(3);
        for i in 0..60 {
            buf.push(tagged(i, rng.usize(..3) == 0));
            if i % 7 == 0 {
                buf.end_episode();
            }
            assert_eq!(buf.eligible_windows(), brute(&buf), "after push {i}");
        }
    }
}
