//! # Quarry Search
//!
//! Ranked retrieval over a persisted index: query vectorization, lexical
//! candidate filtering, and a weighted multi-signal score (vector similarity,
//! lexical overlap, symbol-name match, path match, recency).

mod error;
mod query;

pub use error::{Result, SearchError};
pub use query::{QueryEngine, ScoreBreakdown, SearchHit};
