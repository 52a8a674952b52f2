#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]
//! # Learning Environment
//!
//! Everything an agent touches while it learns to drive a linkage.
//!
//! ## Key Components
//!
//! -   **Environment:** the [`Env`] trait and its [`LinkageEnv`]
//!     implementation, which wraps [`physics::Dynamics`] with observation
//!     clipping, action clamping, reward shaping and episode bookkeeping.
//! -   **Reference poses:** [`PoseSequence`] loads recorded target angles
//!     from CSV.
//! -   **Exploration:** [`ExplorationProcess`] with Ornstein-Uhlenbeck and
//!     Gaussian implementations.
//! -   **Replay:** [`ExperienceBuffer`] stores transitions and samples
//!     windowed batches; [`FrameStack`] builds the matching stacked
//!     observation at act time.
//! -   **Agents:** the [`Agent`] trait consumed by the training loop, and
//!     [`LinearAgent`], a small deterministic actor/critic trained with
//!     [`Adam`].

pub mod agent;
pub mod env;
pub mod error;
pub mod frames;
pub mod linear;
pub mod linkage_env;
pub mod noise;
pub mod optim;
pub mod poses;
pub mod replay;

pub use agent::{Agent, UpdatePhase};
pub use env::{clamp_action, Env, Step, StepInfo};
pub use error::{ConfigError, EnvError, PoseError, SampleError};
pub use frames::FrameStack;
pub use linear::{LinearAgent, LinearAgentConfig};
pub use linkage_env::{Bound, LinkageConfig, LinkageEnv, ResetMode, RewardShaping};
pub use noise::{ExplorationConfig, ExplorationProcess, GaussianWhiteNoise, OrnsteinUhlenbeck};
pub use optim::Adam;
pub use poses::PoseSequence;
pub use replay::{BufferConfig, Experience, ExperienceBuffer, Transition};
