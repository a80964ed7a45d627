/// Reasons a contract call fails before or during execution.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Contract not found")]
    ContractNotFound,
    #[error("Invalid message selector")]
    InvalidMessageSelector,
    /// The engine rejected the call while running it. Holds the engine's
    /// message verbatim.
    #[error("{0}")]
    ExecutionTrap(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Failures reported by an [ExecutionEngine](crate::ExecutionEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineFailure {
    /// The engine does not know the target contract.
    #[error("No such contract")]
    NoSuchContract,
    /// The engine could not enter the program at the given entry point.
    #[error("Invalid entry point")]
    InvalidEntryPoint,
    /// Execution reached a failing instruction or an explicit assertion.
    #[error("{0}")]
    Trap(String),
    /// Failure unrelated to the call itself, such as a dead engine process.
    #[error(transparent)]
    Internal(anyhow::Error),
}

impl From<EngineFailure> for CallError {
    fn from(value: EngineFailure) -> Self {
        match value {
            EngineFailure::NoSuchContract => Self::ContractNotFound,
            EngineFailure::InvalidEntryPoint => Self::InvalidMessageSelector,
            EngineFailure::Trap(message) => Self::ExecutionTrap(message),
            EngineFailure::Internal(e) => Self::Internal(e),
        }
    }
}
