use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("unknown driving mode `{0}`")]
    UnknownMode(String),

    /// Fatal: the tick produced a state outside its documented bounds.
    #[error("invariant violated at tick {tick}: {detail}")]
    InvariantViolation { tick: u64, detail: String },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("subscriber limit of {0} reached")]
    SubscriberLimit(usize),
}
