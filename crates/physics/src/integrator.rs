//! # Physics Integration
//!
//! Single-step ODE schemes for `x' = f(x)` where `x = [q, u]` and
//! `f(x) = [u, M(q)^-1 F(q, u, tau)]`.
//!
//! The scheme is part of the run configuration because it changes the
//! reward sequence a given action sequence produces.

use serde::{Deserialize, Serialize};

use crate::error::PhysicsError;
use crate::types::LinkState;

/// Integration scheme used by [`crate::Dynamics::integrate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Integrator {
    /// Explicit Euler on positions and velocities.
    Euler,
    /// Velocity first, then positions with the updated velocity.
    SemiImplicitEuler,
    /// Classic fourth-order Runge-Kutta.
    #[default]
    Rk4,
}

impl Integrator {
    /// Advance `state` by `dt` using `rate` to evaluate `x'`.
    pub(crate) fn advance<F>(self, state: &LinkState, dt: f32, mut rate: F) -> Result<LinkState, PhysicsError>
    where
        F: FnMut(&LinkState) -> Result<Vec<f32>, PhysicsError>,
    {
        match self {
            Self::Euler => {
                let k1 = rate(state)?;
                Ok(state.offset(&k1, dt))
            }
            Self::SemiImplicitEuler => {
                let n = state.n_links();
                let k1 = rate(state)?;
                let mut next = state.as_slice().to_vec();
                for i in 0..n {
                    next[n + i] += dt * k1[n + i];
                }
                for i in 0..n {
                    next[i] += dt * next[n + i];
                }
                LinkState::from_vec(next)
                    .map_err(|_| PhysicsError::IntegrationFailure("state diverged".into()))
            }
            Self::Rk4 => {
                let k1 = rate(state)?;
                let k2 = rate(&state.offset(&k1, 0.5 * dt))?;
                let k3 = rate(&state.offset(&k2, 0.5 * dt))?;
                let k4 = rate(&state.offset(&k3, dt))?;
                let combined: Vec<f32> = (0..k1.len())
                    .map(|i| (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]) / 6.0)
                    .collect();
                Ok(state.offset(&combined, dt))
            }
        }
    }
}
