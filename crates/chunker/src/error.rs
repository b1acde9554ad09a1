use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("invalid window parameters: max_lines must be positive")]
    InvalidWindow,
}
