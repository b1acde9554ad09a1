//! # Quarry Indexer
//!
//! The incremental build engine and its supporting pieces.
//!
//! ## Pipeline
//! 1. Scan the include roots for candidate files (deterministic order).
//! 2. Hash each file; reuse prior chunks/symbols/vector rows for unchanged
//!    files when the cache is valid, recompute the rest.
//! 3. Sort everything, assign `vector_row` from the final order, and publish
//!    the four artifacts plus the manifest atomically under a build lock.
//!
//! Verification (structural integrity + source/git drift) lives here too,
//! since it checks the same artifacts the build publishes.

mod artifacts;
mod build;
mod error;
mod lock;
mod manifest;
mod records;
mod scanner;
mod stats;
mod verify;

pub use artifacts::{load_index, read_jsonl, write_jsonl_atomic, Index};
pub use build::{build_index, BuildOutcome};
pub use error::{IndexerError, Result};
pub use lock::{BuildLock, LockPayload, LOCK_FILE, LOCK_STALE};
pub use manifest::{
    ArtifactInfo, BuildMode, Manifest, ARTIFACT_FILES, CHUNKS_FILE, FILES_FILE, MANIFEST_FILE,
    SYMBOLS_FILE, VECTORS_FILE,
};
pub use records::{area_for_path, FileRecord};
pub use scanner::{FileScanner, ScanOutcome};
pub use stats::BuildStats;
pub use verify::{index_is_fresh, verify_index, VerifyReport, VerifyStatus};
