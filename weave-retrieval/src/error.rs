use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("embedding provider error: {0}")]
    Gateway(#[from] weave_gateway::GatewayError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
