use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Peer unavailable: {0}")]
    PeerUnavailable(String),

    #[error("Task timed out after {0}ms")]
    TaskTimeout(u64),

    #[error("Task execution failed: {0}")]
    TaskExecution(String),

    #[error("Worker pool failure: {0}")]
    PoolFatal(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Fetch timed out: {0}")]
    FetchTimeout(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HarvestError>;
