use crate::error::EnvError;

/// Diagnostics attached to every step. Nothing in here feeds back into
/// control decisions.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepInfo {
    /// Steps taken in the current episode, including this one.
    pub step: usize,
    /// The episode hit its step ceiling.
    pub truncated: bool,
    /// The state left the safety envelope.
    pub terminated: bool,
    /// Number of state components clipped into the observation bounds.
    pub clipped: usize,
    /// Action after clamping, as handed to the simulator.
    pub applied_action: Vec<f32>,
}

/// Result of a successful [`Env::step`].
#[derive(Clone, Debug, PartialEq)]
pub struct Step {
    pub obs: Vec<f32>,
    pub reward: f32,
    pub done: bool,
    pub info: StepInfo,
}

/// Reinforcement learning environment trait.
///
/// Inspired by classic frameworks like OpenAI Gym, this trait defines the core
/// interface an environment must provide. Each call to [`step`] advances the
/// simulation by one action and returns the new observation vector, a reward
/// signal, whether the episode has ended and a diagnostic record.
///
/// [`step`]: Env::step
pub trait Env {
    /// Advance the environment by one action.
    ///
    /// # Errors
    ///
    /// [`EnvError::Integration`] when the simulator cannot advance. The
    /// environment state is left as it was before the call.
    fn step(&mut self, action: &[f32]) -> Result<Step, EnvError>;

    /// Reset the environment to its starting state and return the initial
    /// observation vector.
    fn reset(&mut self) -> Vec<f32>;

    /// Size of the observation vector.
    fn obs_size(&self) -> usize;

    /// Size of the action space.
    fn action_size(&self) -> usize;

    /// Per-axis `(low, high)` action bounds.
    fn action_bounds(&self) -> (&[f32], &[f32]);
}

/// Clamp `action` element-wise into `[low, high]`.
///
/// Clamping is idempotent: clamping an already clamped action returns it
/// unchanged.
#[must_use]
pub fn clamp_action(action: &[f32], low: &[f32], high: &[f32]) -> Vec<f32> {
    action
        .iter()
        .zip(low.iter().zip(high))
        .map(|(&a, (&lo, &hi))| a.clamp(lo, hi))
        .collect()
}
