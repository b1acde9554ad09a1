use crate::error::{IndexerError, Result};
use crate::stats::BuildStats;
use quarry_config::{EngineConfig, GitState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const FILES_FILE: &str = "files.jsonl";
pub const CHUNKS_FILE: &str = "chunks.jsonl";
pub const SYMBOLS_FILE: &str = "symbols.jsonl";
pub const VECTORS_FILE: &str = "vectors.f32";

pub const ARTIFACT_FILES: [&str; 4] = [FILES_FILE, CHUNKS_FILE, SYMBOLS_FILE, VECTORS_FILE];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Full,
    Incremental,
}

/// Recorded size and checksum of one published artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactInfo {
    pub sha256: String,
    pub bytes: u64,
}

/// Authoritative build metadata, written strictly after the artifacts it
/// describes so a reader never observes a manifest referencing artifacts
/// that do not yet match.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Manifest {
    pub schema_version: u32,
    pub index_format_version: u32,
    pub build_mode: BuildMode,
    pub created_at_ms: u64,
    pub repo_root: String,
    pub output_dir: String,
    pub config_hash: String,
    pub engine: EngineConfig,

    /// Captured VCS state, absent outside a git work tree.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub git: Option<GitState>,

    pub stats: BuildStats,
    pub artifacts: BTreeMap<String, ArtifactInfo>,

    /// Names the checks that are authoritative for staleness decisions.
    pub drift_contract: Vec<String>,
}

impl Manifest {
    pub fn drift_contract() -> Vec<String> {
        [
            "config_hash",
            "engine_identity",
            "index_format_version",
            "artifact_checksums",
            "file_content_hashes",
            "git_head_dirty",
        ]
        .iter()
        .map(|s| (*s).to_string())
        .collect()
    }

    pub fn load(output_dir: &Path) -> Result<Self> {
        let path = output_dir.join(MANIFEST_FILE);
        if !path.exists() {
            return Err(IndexerError::CorruptIndex(format!(
                "missing manifest: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(&path)?;
        serde_json::from_str(&raw).map_err(|err| {
            IndexerError::CorruptIndex(format!("unreadable manifest {}: {err}", path.display()))
        })
    }

    /// Atomic publish: temp file then rename.
    pub fn write(&self, output_dir: &Path) -> Result<()> {
        let path = output_dir.join(MANIFEST_FILE);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_string_pretty(self)?)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }
}
