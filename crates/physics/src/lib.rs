#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::cast_precision_loss)]
//! # Linkage Physics
//!
//! Discrete-time dynamics of a planar N-link pendulum.
//!
//! ## Key Components
//!
//! -   **State and parameters:** [`LinkState`] holds joint angles followed by
//!     joint velocities; [`LinkParams`] holds gravity and per-link lengths and
//!     masses. Both live in the [`types`] module.
//! -   **Equations of motion:** the [`EquationsOfMotion`] trait supplies the
//!     mass matrix and forcing vector. [`derive_chain`] returns the
//!     closed-form provider for a chain of point masses.
//! -   **Integration:** [`Dynamics::integrate`] advances a state by one fixed
//!     time step with the configured [`Integrator`], reporting
//!     [`PhysicsError::IntegrationFailure`] instead of returning a corrupted
//!     state.
//!
//! ## Usage
//!
//! ```rust
//! use physics::{Dynamics, Integrator, LinkState};
//!
//! let dynamics = Dynamics::chain(2, &[9.81, 0.4, 1.0, 0.4, 1.0], Integrator::Rk4)?;
//! let state = LinkState::from_vec(vec![1.0, 1.5, 0.0, 0.0])?;
//! let next = dynamics.integrate(&state, &[0.0, 0.0], 0.01)?;
//! assert!(next.is_finite());
//! # Ok::<(), physics::PhysicsError>(())
//! ```

pub mod dynamics;
pub mod equations;
pub mod error;
pub mod integrator;
pub mod types;

pub use dynamics::Dynamics;
pub use equations::{derive_chain, ChainPendulum, EquationsOfMotion};
pub use error::PhysicsError;
pub use integrator::Integrator;
pub use types::{LinkParams, LinkState};
