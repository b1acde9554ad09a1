//! # Quarry Vector
//!
//! Model-free hash-trick vectorization and the flat f32 vector buffer.
//!
//! Tokens are hashed into a fixed number of buckets (32-bit FNV-1a), term
//! frequencies are log-dampened, and the result is L2-normalized so a plain
//! dot product equals cosine similarity. Reproducible across platforms; no
//! ML inference anywhere.

mod buffer;
mod error;
mod vectorize;

pub use buffer::VectorBuffer;
pub use error::{Result, VectorError};
pub use vectorize::{dot, fnv1a32, terms, tokenize, vectorize};
