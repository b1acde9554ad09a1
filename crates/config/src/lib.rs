//! # Quarry Config
//!
//! Configuration loading, stable config hashing, and output-directory
//! identity resolution (per-branch/worktree isolation namespaces).

mod config;
mod error;
mod identity;

pub use config::{
    ChunkingConfig, Config, EngineConfig, IsolationConfig, IsolationMode, QueryConfig,
    QueryWeights,
};
pub use error::{ConfigError, Result};
pub use identity::{branch_slug, probe_git_state, resolve_output_dir, worktree_hash, GitState};
