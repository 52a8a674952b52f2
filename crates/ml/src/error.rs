use physics::PhysicsError;
use thiserror::Error;

/// Malformed or out-of-range configuration. Always reported before the first
/// episode starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} has {got} entries, expected {expected}")]
    Length {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{field}[{index}]: lower bound {low} exceeds upper bound {high}")]
    InvertedBound {
        field: &'static str,
        index: usize,
        low: f32,
        high: f32,
    },
    #[error("{field} must be finite")]
    NonFinite { field: &'static str },
    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
    #[error("invalid physical parameters: {0}")]
    Physics(#[from] PhysicsError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EnvError {
    #[error(transparent)]
    Integration(#[from] PhysicsError),
    #[error("action has {got} entries, expected {expected}")]
    ActionSize { expected: usize, got: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SampleError {
    /// Fewer eligible transitions than the requested batch.
    #[error("insufficient data: requested {requested} samples, {available} eligible")]
    InsufficientData { requested: usize, available: usize },
}

#[derive(Error, Debug)]
pub enum PoseError {
    #[error("failed to read pose file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: expected at least {expected} joint angles, found {got}")]
    ShortRow { line: usize, expected: usize, got: usize },
    #[error("line {line}: non-finite joint angle")]
    NonFinite { line: usize },
    #[error("pose sequence is empty")]
    Empty,
}
