use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("Invalid calendar document: {0}")]
    InvalidDocument(String),
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),
    #[error("State lock poisoned: {0}")]
    StatePoisoned(String),
}
