use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("config error: {0}")]
    Config(#[from] quarry_config::ConfigError),

    #[error("chunker error: {0}")]
    Chunker(#[from] quarry_chunker::ChunkerError),

    #[error("vector error: {0}")]
    Vector(#[from] quarry_vector::VectorError),

    #[error(
        "build lock at {path} is held by pid {pid} ({age_secs}s old); \
         inspect and remove it manually if the build is dead"
    )]
    LockHeld {
        path: PathBuf,
        pid: u32,
        age_secs: u64,
    },

    #[error("corrupt index: {0}")]
    CorruptIndex(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
