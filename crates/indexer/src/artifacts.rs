use crate::error::{IndexerError, Result};
use crate::manifest::{
    ArtifactInfo, Manifest, CHUNKS_FILE, FILES_FILE, SYMBOLS_FILE, VECTORS_FILE,
};
use crate::records::FileRecord;
use quarry_chunker::{sha256_hex, ChunkRecord, SymbolRecord};
use quarry_vector::VectorBuffer;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

/// A fully loaded index: manifest plus the four row artifacts.
#[derive(Debug, Clone)]
pub struct Index {
    pub manifest: Manifest,
    pub files: Vec<FileRecord>,
    pub chunks: Vec<ChunkRecord>,
    pub symbols: Vec<SymbolRecord>,
    pub vectors: VectorBuffer,
}

/// Serialize items as newline-delimited JSON and publish atomically.
/// Returns the recorded artifact info (checksum over the exact bytes).
pub fn write_jsonl_atomic<T: Serialize>(path: &Path, items: &[T]) -> Result<ArtifactInfo> {
    let mut bytes = Vec::new();
    for item in items {
        bytes.extend_from_slice(serde_json::to_string(item)?.as_bytes());
        bytes.push(b'\n');
    }
    let tmp = path.with_extension("jsonl.tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(ArtifactInfo {
        sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
    })
}

pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let raw = std::fs::read_to_string(path)?;
    let mut items = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|err| {
            IndexerError::CorruptIndex(format!(
                "{} line {}: {err}",
                path.display(),
                idx + 1
            ))
        })?;
        items.push(item);
    }
    Ok(items)
}

/// Current checksum and size of an already-written artifact file.
pub fn file_artifact_info(path: &Path) -> Result<ArtifactInfo> {
    let bytes = std::fs::read(path)?;
    Ok(ArtifactInfo {
        sha256: sha256_hex(&bytes),
        bytes: bytes.len() as u64,
    })
}

/// Load the persisted index from an output directory. Missing or unreadable
/// artifacts surface as `CorruptIndex`.
pub fn load_index(output_dir: &Path) -> Result<Index> {
    let manifest = Manifest::load(output_dir)?;

    for name in [FILES_FILE, CHUNKS_FILE, SYMBOLS_FILE, VECTORS_FILE] {
        if !output_dir.join(name).exists() {
            return Err(IndexerError::CorruptIndex(format!(
                "missing artifact: {name}"
            )));
        }
    }

    let files: Vec<FileRecord> = read_jsonl(&output_dir.join(FILES_FILE))?;
    let chunks: Vec<ChunkRecord> = read_jsonl(&output_dir.join(CHUNKS_FILE))?;
    let symbols: Vec<SymbolRecord> = read_jsonl(&output_dir.join(SYMBOLS_FILE))?;
    let vectors =
        VectorBuffer::read_from(&output_dir.join(VECTORS_FILE), manifest.engine.dimension)?;

    if vectors.len() != chunks.len() * manifest.engine.dimension {
        return Err(IndexerError::CorruptIndex(format!(
            "vector buffer has {} floats, expected {} ({} chunks x dimension {})",
            vectors.len(),
            chunks.len() * manifest.engine.dimension,
            chunks.len(),
            manifest.engine.dimension
        )));
    }

    Ok(Index {
        manifest,
        files,
        chunks,
        symbols,
        vectors,
    })
}
