//! # Equations of Motion
//!
//! Numeric mass-matrix and forcing-vector providers. The integrator only ever
//! sees these two callables, so any derivation (closed form, symbolic
//! preprocessing, lookup) can stand behind [`EquationsOfMotion`].
//!
//! [`ChainPendulum`] is the planar chain of point masses on massless links.
//! Angles are absolute and measured from the +x axis; gravity acts along -y.
//! With `mu_ij = sum_{k >= max(i, j)} m_k`:
//!
//! ```text
//! M_ij = mu_ij l_i l_j cos(q_i - q_j)
//! F_i  = tau_i - sum_j mu_ij l_i l_j sin(q_i - q_j) u_j^2 - g mu_ii l_i cos(q_i)
//! ```

use nalgebra::DMatrix;

use crate::error::PhysicsError;
use crate::types::{LinkParams, LinkState};

/// Mass matrix and forcing vector as functions of state and parameters.
pub trait EquationsOfMotion: Send + Sync {
    /// Number of generalized coordinates.
    fn n_coords(&self) -> usize;

    /// Configuration-dependent mass matrix `M(q)`.
    fn mass_matrix(&self, state: &LinkState, params: &LinkParams) -> DMatrix<f32>;

    /// Right-hand side `F(q, u, tau)` of `M(q) u' = F`.
    fn forcing(&self, state: &LinkState, params: &LinkParams, tau: &[f32]) -> Vec<f32>;
}

/// Closed-form equations of an `n`-link planar pendulum.
#[derive(Clone, Copy, Debug)]
pub struct ChainPendulum {
    n_links: usize,
}

impl ChainPendulum {
    /// Mass carried by link `i` and everything outboard of it.
    fn outboard_mass(params: &LinkParams, i: usize) -> f32 {
        params.masses[i..].iter().sum()
    }
}

/// Returns the equations of motion for a chain with `n_links` links.
///
/// # Errors
///
/// Fails for an empty chain.
pub fn derive_chain(n_links: usize) -> Result<ChainPendulum, PhysicsError> {
    if n_links == 0 {
        return Err(PhysicsError::InvalidParameter("a linkage needs at least one link".into()));
    }
    Ok(ChainPendulum { n_links })
}

impl EquationsOfMotion for ChainPendulum {
    fn n_coords(&self) -> usize {
        self.n_links
    }

    fn mass_matrix(&self, state: &LinkState, params: &LinkParams) -> DMatrix<f32> {
        let q = state.q();
        DMatrix::from_fn(self.n_links, self.n_links, |i, j| {
            let mu = Self::outboard_mass(params, i.max(j));
            mu * params.lengths[i] * params.lengths[j] * (q[i] - q[j]).cos()
        })
    }

    fn forcing(&self, state: &LinkState, params: &LinkParams, tau: &[f32]) -> Vec<f32> {
        let n = self.n_links;
        let q = state.q();
        let u = state.u();
        (0..n)
            .map(|i| {
                let centripetal: f32 = (0..n)
                    .map(|j| {
                        let mu = Self::outboard_mass(params, i.max(j));
                        mu * params.lengths[i] * params.lengths[j] * (q[i] - q[j]).sin() * u[j] * u[j]
                    })
                    .sum();
                let gravity =
                    params.gravity * Self::outboard_mass(params, i) * params.lengths[i] * q[i].cos();
                tau.get(i).copied().unwrap_or(0.0) - centripetal - gravity
            })
            .collect()
    }
}
