use thiserror::Error;

/// A [`PartyConfig`](crate::PartyConfig) that cannot finish without deadlock.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("need at least 3 philosophers to seat a host, got {philosophers}")]
    TooFewPhilosophers { philosophers: usize },

    #[error("host capacity must be at least 1")]
    ZeroCapacity,

    #[error(
        "host capacity {capacity} must be less than half of {philosophers} philosophers"
    )]
    CapacityTooLarge { capacity: usize, philosophers: usize },

    #[error("retry limit must allow at least one admission attempt")]
    ZeroRetryLimit,
}

#[derive(Debug, Error)]
pub enum PartyError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request channel or a reply slot closed while a philosopher waited on it.
    #[error("philosopher {philosopher} lost contact with the host")]
    HostGone { philosopher: usize },

    #[error("philosopher {philosopher} was turned away {attempts} times in a row")]
    Starved { philosopher: usize, attempts: u64 },

    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
