use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("indexer error: {0}")]
    Indexer(#[from] quarry_indexer::IndexerError),

    #[error(
        "index engine mismatch: index built with {indexed}, config expects {expected}; \
         rebuild the index"
    )]
    EngineMismatch { indexed: String, expected: String },

    #[error("index is stale: git state changed since the last build (run `quarry build`)")]
    StaleIndex,

    #[error("index failed verification: {0}")]
    VerifyFailed(String),
}
