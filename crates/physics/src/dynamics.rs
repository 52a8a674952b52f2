//! # Linkage Dynamics
//!
//! [`Dynamics`] binds a set of equations of motion to fixed physical
//! parameters and an integration scheme, and advances a [`LinkState`] by one
//! time step. It holds no mutable state: the same inputs always give the same
//! output.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};

use crate::equations::{derive_chain, EquationsOfMotion};
use crate::error::PhysicsError;
use crate::integrator::Integrator;
use crate::types::{LinkParams, LinkState};

/// Solve `M a = F` for the accelerations.
///
/// The chain's mass matrix is symmetric positive definite, so Cholesky is
/// tried first; LU covers other providers.
fn solve_accelerations(m: DMatrix<f32>, f: Vec<f32>) -> Result<Vec<f32>, PhysicsError> {
    if f.len() != m.nrows() || !m.is_square() {
        return Err(PhysicsError::DimensionMismatch { what: "forcing vector", expected: m.nrows(), got: f.len() });
    }
    let rhs = DVector::from_vec(f);
    let accel = match m.clone().cholesky() {
        Some(cholesky) => cholesky.solve(&rhs),
        None => m
            .lu()
            .solve(&rhs)
            .ok_or_else(|| PhysicsError::IntegrationFailure("mass matrix is singular".into()))?,
    };
    Ok(accel.iter().copied().collect())
}

#[derive(Clone)]
pub struct Dynamics {
    equations: Arc<dyn EquationsOfMotion>,
    params: LinkParams,
    integrator: Integrator,
}

impl std::fmt::Debug for Dynamics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dynamics")
            .field("n_coords", &self.equations.n_coords())
            .field("params", &self.params)
            .field("integrator", &self.integrator)
            .finish()
    }
}

impl Dynamics {
    /// Bind `equations` to `params`.
    ///
    /// # Errors
    ///
    /// Fails if the parameter set describes a different number of links.
    pub fn new(
        equations: Arc<dyn EquationsOfMotion>,
        params: LinkParams,
        integrator: Integrator,
    ) -> Result<Self, PhysicsError> {
        if equations.n_coords() != params.n_links() {
            return Err(PhysicsError::DimensionMismatch {
                what: "link parameters",
                expected: equations.n_coords(),
                got: params.n_links(),
            });
        }
        Ok(Self { equations, params, integrator })
    }

    /// Planar point-mass chain built from a flat `[g, l_0, m_0, ...]` vector.
    ///
    /// # Errors
    ///
    /// Propagates parameter validation failures.
    pub fn chain(n_links: usize, param_vals: &[f32], integrator: Integrator) -> Result<Self, PhysicsError> {
        let params = LinkParams::from_values(n_links, param_vals)?;
        Self::new(Arc::new(derive_chain(n_links)?), params, integrator)
    }

    #[must_use]
    pub fn params(&self) -> &LinkParams {
        &self.params
    }

    #[must_use]
    pub fn integrator(&self) -> Integrator {
        self.integrator
    }

    #[must_use]
    pub fn n_links(&self) -> usize {
        self.params.n_links()
    }

    /// Time derivative `[u, M^-1 F]` of `state` under generalized force `tau`.
    ///
    /// # Errors
    ///
    /// [`PhysicsError::IntegrationFailure`] on a singular mass matrix or a
    /// non-finite acceleration.
    pub fn derivative(&self, state: &LinkState, tau: &[f32]) -> Result<Vec<f32>, PhysicsError> {
        let m = self.equations.mass_matrix(state, &self.params);
        let f = self.equations.forcing(state, &self.params, tau);
        let accel = solve_accelerations(m, f)?;
        if accel.iter().any(|a| !a.is_finite()) {
            return Err(PhysicsError::IntegrationFailure("non-finite acceleration".into()));
        }
        let mut rate = state.u().to_vec();
        rate.extend(accel);
        Ok(rate)
    }

    /// Advance `state` by `dt` with generalized force `action` held constant.
    ///
    /// `action` may be shorter than the number of links; missing entries are
    /// treated as unactuated (zero force).
    ///
    /// # Errors
    ///
    /// [`PhysicsError::DimensionMismatch`] for mis-sized inputs,
    /// [`PhysicsError::IntegrationFailure`] if the step cannot be computed or
    /// produces a non-finite state.
    pub fn integrate(&self, state: &LinkState, action: &[f32], dt: f32) -> Result<LinkState, PhysicsError> {
        let n = self.n_links();
        if state.n_links() != n {
            return Err(PhysicsError::DimensionMismatch {
                what: "state",
                expected: 2 * n,
                got: state.as_slice().len(),
            });
        }
        if action.len() > n {
            return Err(PhysicsError::DimensionMismatch {
                what: "action",
                expected: n,
                got: action.len(),
            });
        }
        if !dt.is_finite() || action.iter().any(|a| !a.is_finite()) {
            return Err(PhysicsError::IntegrationFailure("non-finite time step or action".into()));
        }

        let next = self
            .integrator
            .advance(state, dt, |s| self.derivative(s, action))?;
        if !next.is_finite() {
            return Err(PhysicsError::IntegrationFailure("state diverged".into()));
        }
        Ok(next)
    }

    /// Kinetic plus potential energy of the point-mass chain.
    #[must_use]
    pub fn energy(&self, state: &LinkState) -> f32 {
        let mut y = 0.0_f32;
        let (mut vx, mut vy) = (0.0_f32, 0.0_f32);
        let mut total = 0.0;
        for (i, (&q, &u)) in state.q().iter().zip(state.u()).enumerate() {
            let l = self.params.lengths[i];
            let m = self.params.masses[i];
            y += l * q.sin();
            vx -= l * u * q.sin();
            vy += l * u * q.cos();
            total += 0.5 * m * (vx * vx + vy * vy) + m * self.params.gravity * y;
        }
        total
    }

    /// Cartesian position of the last mass.
    #[must_use]
    pub fn tip_position(&self, state: &LinkState) -> [f32; 2] {
        state
            .q()
            .iter()
            .zip(&self.params.lengths)
            .fold([0.0, 0.0], |[x, y], (&q, &l)| [x + l * q.cos(), y + l * q.sin()])
    }
}
