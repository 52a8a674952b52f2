use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// The step could not be advanced: singular mass matrix or non-finite
    /// acceleration/state. The input state is left untouched.
    #[error("integration failure: {0}")]
    IntegrationFailure(String),
    #[error("{what} has {got} entries, expected {expected}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("state contains non-finite values")]
    NonFiniteState,
    #[error("invalid physical parameter: {0}")]
    InvalidParameter(String),
}
