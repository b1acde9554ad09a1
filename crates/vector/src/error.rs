use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorError>;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("vector row has {actual} values, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("vector buffer of {bytes} bytes is not a whole number of {dimension}-float rows")]
    MisalignedBuffer { bytes: usize, dimension: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
