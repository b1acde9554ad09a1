use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    Missing(PathBuf),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("engine dimension must be a positive integer")]
    InvalidDimension,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
