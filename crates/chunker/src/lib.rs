//! # Quarry Chunker
//!
//! File structure extraction and chunking.
//!
//! ## Pipeline
//! 1. Detect the language from the file extension.
//! 2. Extract imports/exports/route hints and a symbol table with
//!    line-regex heuristics (no AST).
//! 3. Split the file into overlapping line windows: heading-bounded for
//!    docs, symbol-aligned for code, generic otherwise.

mod chunker;
mod error;
mod language;
mod structure;
mod types;

pub use chunker::{chunk_file, window_ranges, FileContext};
pub use error::{ChunkerError, Result};
pub use language::Language;
pub use structure::{FileStructure, LineHeuristicExtractor, SymbolExtractor};
pub use types::{
    estimate_tokens, sha256_hex, short_hash, ChunkRecord, ChunkType, SymbolKind, SymbolRecord,
};
