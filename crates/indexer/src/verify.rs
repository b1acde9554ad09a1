use crate::artifacts::{file_artifact_info, read_jsonl};
use crate::manifest::{
    Manifest, ARTIFACT_FILES, CHUNKS_FILE, FILES_FILE, SYMBOLS_FILE, VECTORS_FILE,
};
use crate::records::FileRecord;
use quarry_chunker::{sha256_hex, ChunkRecord, SymbolRecord};
use quarry_config::probe_git_state;
use quarry_vector::VectorBuffer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerifyStatus {
    Ok,
    Error,
}

/// Structured verification result. Structural corruption lands in `errors`;
/// source/git drift lands in `warnings` unless `strict` promoted it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyReport {
    pub status: VerifyStatus,
    pub strict: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub files_checked: usize,
    pub chunks_checked: usize,
    pub symbols_checked: usize,
}

impl VerifyReport {
    fn new(strict: bool) -> Self {
        Self {
            status: VerifyStatus::Ok,
            strict,
            errors: Vec::new(),
            warnings: Vec::new(),
            files_checked: 0,
            chunks_checked: 0,
            symbols_checked: 0,
        }
    }

    fn finish(mut self) -> Self {
        self.status = if self.errors.is_empty() {
            VerifyStatus::Ok
        } else {
            VerifyStatus::Error
        };
        self
    }

    fn drift(&mut self, message: String) {
        if self.strict {
            self.errors.push(message);
        } else {
            self.warnings.push(message);
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == VerifyStatus::Ok
    }
}

/// Validate structural integrity of a persisted index and, on top, detect
/// drift between the index and the live source tree / git state.
pub fn verify_index(repo_root: &Path, output_dir: &Path, strict: bool) -> VerifyReport {
    let mut report = VerifyReport::new(strict);

    let manifest = match Manifest::load(output_dir) {
        Ok(manifest) => manifest,
        Err(err) => {
            report.errors.push(err.to_string());
            return report.finish();
        }
    };

    let mut missing = false;
    for name in ARTIFACT_FILES {
        if !output_dir.join(name).exists() {
            report.errors.push(format!("missing artifact: {name}"));
            missing = true;
        }
    }
    if missing {
        return report.finish();
    }

    if manifest.engine.dimension == 0 {
        report
            .errors
            .push("manifest engine dimension must be a positive integer".to_string());
        return report.finish();
    }

    for name in ARTIFACT_FILES {
        match (
            file_artifact_info(&output_dir.join(name)),
            manifest.artifacts.get(name),
        ) {
            (Ok(current), Some(recorded)) => {
                if current.sha256 != recorded.sha256 {
                    report.errors.push(format!("checksum mismatch for {name}"));
                }
            }
            (Ok(_), None) => report
                .errors
                .push(format!("manifest records no checksum for {name}")),
            (Err(err), _) => report.errors.push(format!("cannot hash {name}: {err}")),
        }
    }

    let files: Vec<FileRecord> = match read_jsonl(&output_dir.join(FILES_FILE)) {
        Ok(files) => files,
        Err(err) => {
            report.errors.push(err.to_string());
            return report.finish();
        }
    };
    let chunks: Vec<ChunkRecord> = match read_jsonl(&output_dir.join(CHUNKS_FILE)) {
        Ok(chunks) => chunks,
        Err(err) => {
            report.errors.push(err.to_string());
            return report.finish();
        }
    };
    let symbols: Vec<SymbolRecord> = match read_jsonl(&output_dir.join(SYMBOLS_FILE)) {
        Ok(symbols) => symbols,
        Err(err) => {
            report.errors.push(err.to_string());
            return report.finish();
        }
    };
    let vectors = match VectorBuffer::read_from(
        &output_dir.join(VECTORS_FILE),
        manifest.engine.dimension,
    ) {
        Ok(vectors) => vectors,
        Err(err) => {
            report.errors.push(format!("unreadable vector buffer: {err}"));
            return report.finish();
        }
    };

    if vectors.len() != chunks.len() * manifest.engine.dimension {
        report.errors.push(format!(
            "vector buffer has {} floats, expected {} ({} chunks x dimension {})",
            vectors.len(),
            chunks.len() * manifest.engine.dimension,
            chunks.len(),
            manifest.engine.dimension
        ));
    }

    let files_by_path: HashMap<&str, &FileRecord> =
        files.iter().map(|file| (file.path.as_str(), file)).collect();

    for (idx, chunk) in chunks.iter().enumerate() {
        if chunk.vector_row != idx {
            report.errors.push(format!(
                "chunk {} has vector_row {}, expected {idx}",
                chunk.id, chunk.vector_row
            ));
        }
        match files_by_path.get(chunk.path.as_str()) {
            Some(file) => {
                if file.file_hash != chunk.file_hash {
                    report.errors.push(format!(
                        "chunk {} references stale file hash for {}",
                        chunk.id, chunk.path
                    ));
                }
            }
            None => report.errors.push(format!(
                "chunk {} references unknown file {}",
                chunk.id, chunk.path
            )),
        }
        if sha256_hex(chunk.text.as_bytes()) != chunk.text_hash {
            report
                .errors
                .push(format!("chunk {} text hash mismatch", chunk.id));
        }
    }

    for symbol in &symbols {
        if !files_by_path.contains_key(symbol.path.as_str()) {
            report.errors.push(format!(
                "symbol {} references unknown file {}",
                symbol.id, symbol.path
            ));
        }
    }

    // Source drift: warnings by default, errors under --strict.
    for file in &files {
        let live = repo_root.join(&file.path);
        match std::fs::read(&live) {
            Ok(bytes) => {
                if sha256_hex(&bytes) != file.file_hash {
                    report.drift(format!("source file changed: {}", file.path));
                }
            }
            Err(_) => report.drift(format!("source file missing: {}", file.path)),
        }
    }

    let live_git = probe_git_state(repo_root);
    match (&manifest.git, &live_git) {
        (Some(indexed), Some(current)) => {
            if indexed.head != current.head || indexed.dirty != current.dirty {
                report.drift(format!(
                    "git state drifted: indexed {}@{} (dirty={}), live {}@{} (dirty={})",
                    indexed.branch,
                    indexed.head,
                    indexed.dirty,
                    current.branch,
                    current.head,
                    current.dirty
                ));
            }
        }
        (Some(_), None) | (None, Some(_)) => {
            report.drift("git state drifted: repository visibility changed".to_string());
        }
        (None, None) => {}
    }

    report.files_checked = files.len();
    report.chunks_checked = chunks.len();
    report.symbols_checked = symbols.len();
    report.finish()
}

/// True when the manifest's captured git snapshot still matches the live
/// repo (head commit + dirty flag). Used as the `--strict-fresh` query gate.
pub fn index_is_fresh(repo_root: &Path, manifest: &Manifest) -> bool {
    match (&manifest.git, probe_git_state(repo_root)) {
        (Some(indexed), Some(current)) => {
            indexed.head == current.head && indexed.dirty == current.dirty
        }
        (None, None) => true,
        _ => false,
    }
}
