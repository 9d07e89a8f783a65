//! Typed error enums for the three concerns of this crate: turning a wire
//! workflow into a graph (`ValidationError`), running one agent invocation
//! (`AgentError`), and driving the whole execution (`EngineError`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("node type '{0}' is not recognized")]
    UnknownNodeType(String),

    #[error("edge references unknown node id '{0}'")]
    DanglingEdge(String),

    #[error("duplicate node id '{0}'")]
    DuplicateNodeId(String),

    #[error("node '{0}' has a self-loop edge")]
    SelfLoop(String),

    #[error("graph contains a cycle reachable from node '{0}'")]
    Cycle(String),
}

/// Outcome of a single agent or tool invocation (§4.7.5, §4.8).
#[derive(Debug, Error)]
pub enum AgentError {
    /// Retried by the engine per the node's [`crate::retry::RetryPolicy`].
    #[error("{0}")]
    Recoverable(String),

    /// Never retried; fails the node (and, per exclusion policy, may exclude
    /// its downstream dependents) immediately.
    #[error("{0}")]
    Fatal(String),
}

impl AgentError {
    pub fn message(&self) -> &str {
        match self {
            AgentError::Recoverable(m) | AgentError::Fatal(m) => m,
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("no handler registered for node type '{0}'")]
    NoHandler(String),

    #[error("node '{0}' failed: {1}")]
    NodeFailed(String, String),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] weave_retrieval::RetrievalError),

    #[error("gateway error: {0}")]
    Gateway(#[from] weave_gateway::GatewayError),

    #[error("execution was cancelled")]
    Cancelled,
}
