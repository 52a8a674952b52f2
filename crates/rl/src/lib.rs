#![deny(clippy::all, clippy::pedantic)]
#![allow(
    clippy::module_name_repetitions,
    clippy::cast_precision_loss,
    clippy::must_use_candidate,
    clippy::missing_errors_doc
)]
//! # Linkage Training
//!
//! The loop that teaches an [`ml::Agent`] to drive an [`ml::Env`].
//!
//! ## Key Components
//!
//! -   **[`TrainConfig`]:** the whole run as one serde document, validated
//!     before the first episode.
//! -   **[`Trainer`]:** warmup, exploration, replay sampling, updates and
//!     cooperative cancellation through a [`StopSignal`].
//! -   **[`Checkpointer`]:** parameters, metadata and results written under
//!     run-specific names, with failures reported but never fatal.
//! -   **[`DecaySchedule`]:** annealing of the exploration noise scale.

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod metrics;
pub mod schedule;
pub mod stop;
pub mod trainer;

pub use checkpoint::{CheckpointMeta, Checkpointer};
pub use config::{default_run_id, CheckpointConfig, TrainConfig, WarmupConfig};
pub use error::{CheckpointError, TrainError};
pub use metrics::{EpisodeSummary, TrainingLog};
pub use schedule::{DecayClock, DecaySchedule};
pub use stop::StopSignal;
pub use trainer::{EpisodeOutcome, Trainer, TrainingReport};
