//! # Linkage
//!
//! Reinforcement learning for a planar N-link pendulum, from equations of
//! motion to a trained controller.
//!
//! ## The Crates
//!
//! -   **`linkage`:** The crate you are currently viewing. It is the
//!     documentation entry point and the `linkage` executable, which loads a
//!     configuration, wires the pieces together and trains.
//! -   **[`physics`]:** Equations of motion for a chain of point masses and
//!     fixed-step integrators that report failure instead of returning a
//!     corrupted state.
//! -   **[`ml`]:** The environment, exploration noise, experience replay and
//!     the agent interface with a linear actor/critic implementation.
//! -   **[`rl`]:** The training loop with warmup, noise schedules,
//!     checkpointing and cooperative cancellation.
//!
//! ## Getting Started
//!
//! `linkage config > run.json` prints the default configuration, a two-link
//! arm lifting from the upright pose. Edit it and start a run with
//! `linkage train --config run.json`. Creating a file named `STOP` in the
//! run's results directory ends the run after the current step, with a
//! final checkpoint that `linkage train --resume <meta.json>` picks up.
//! `linkage eval --resume <meta.json>` plays a checkpoint's policy without
//! noise or learning and prints the reward of each episode.

pub use ml;
pub use physics;
pub use rl;
