use std::path::Path;

use crate::replay::Experience;

/// Which halves of an actor/critic learner may train on this update.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpdatePhase {
    pub critic: bool,
    pub actor: bool,
}

impl UpdatePhase {
    pub const BOTH: Self = Self { critic: true, actor: true };

    #[must_use]
    pub fn any(self) -> bool {
        self.critic || self.actor
    }
}

/// Policy capability driven by the training loop.
///
/// The loop never looks inside: any learner (tabular, linear, neural) that
/// maps observations to actions and consumes sampled batches fits.
pub trait Agent {
    /// Proposed action for a (possibly stacked) observation, before
    /// exploration noise and clamping.
    fn act(&mut self, obs: &[f32]) -> Vec<f32>;

    /// Learn from a batch and return a scalar training loss.
    fn update(&mut self, batch: &[Experience], phase: UpdatePhase) -> f32;

    /// Persist the policy parameters.
    ///
    /// # Errors
    ///
    /// Storage or serialization failures.
    fn save(&self, path: &Path) -> anyhow::Result<()>;

    /// Restore parameters written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Storage failures or parameters of the wrong shape.
    fn load(&mut self, path: &Path) -> anyhow::Result<()>;
}
