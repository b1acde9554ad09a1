use crate::artifacts::{file_artifact_info, load_index, write_jsonl_atomic, Index};
use crate::error::{IndexerError, Result};
use crate::lock::{unix_now_ms, BuildLock};
use crate::manifest::{
    ArtifactInfo, BuildMode, Manifest, CHUNKS_FILE, FILES_FILE, SYMBOLS_FILE, VECTORS_FILE,
};
use crate::records::{area_for_path, FileRecord};
use crate::scanner::FileScanner;
use crate::stats::BuildStats;
use quarry_chunker::{
    chunk_file, sha256_hex, ChunkRecord, FileContext, Language, LineHeuristicExtractor,
    SymbolExtractor, SymbolRecord,
};
use quarry_config::{probe_git_state, Config};
use quarry_vector::{vectorize, VectorBuffer};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Result of one build: the published manifest plus the warnings collected
/// along the way.
#[derive(Debug)]
pub struct BuildOutcome {
    pub manifest: Manifest,
    pub warnings: Vec<String>,
    pub output_dir: PathBuf,
}

/// Where a chunk's vector row comes from: freshly computed, or sliced out of
/// the prior build's buffer at its old row index.
enum RowSource {
    Fresh(Vec<f32>),
    Reused(usize),
}

/// Build (or incrementally refresh) the index for a repo.
///
/// Holds the exclusive build lock for the whole run; publishes all four
/// artifacts via temp-then-rename with the manifest strictly last.
pub fn build_index(
    repo_root: &Path,
    config: &Config,
    output_dir: &Path,
    full: bool,
) -> Result<BuildOutcome> {
    config.validate()?;
    let dimension = config.engine.dimension;
    let config_hash = config.config_hash();

    std::fs::create_dir_all(output_dir)?;
    let _lock = BuildLock::acquire(output_dir)?;

    // The prior index is only a reuse candidate, never the thing mutated.
    let prior: Option<Index> = if output_dir.join(crate::manifest::MANIFEST_FILE).exists() {
        match load_index(output_dir) {
            Ok(index) => Some(index),
            Err(err) => {
                log::warn!("ignoring unreadable prior index: {err}");
                None
            }
        }
    } else {
        None
    };

    let cache_valid = !full
        && prior.as_ref().is_some_and(|index| {
            index.manifest.config_hash == config_hash
                && index.manifest.engine == config.engine
                && index.manifest.index_format_version == config.index_format_version
        });
    if let Some(index) = prior.as_ref() {
        if !cache_valid && !full {
            log::info!(
                "prior index at {} is incompatible (engine/config/format changed), rebuilding",
                index.manifest.output_dir
            );
        }
    }

    let mut prior_files: HashMap<&str, &FileRecord> = HashMap::new();
    let mut prior_chunks: HashMap<&str, Vec<&ChunkRecord>> = HashMap::new();
    let mut prior_symbols: HashMap<&str, Vec<&SymbolRecord>> = HashMap::new();
    if let Some(index) = prior.as_ref() {
        for file in &index.files {
            prior_files.insert(file.path.as_str(), file);
        }
        for chunk in &index.chunks {
            prior_chunks.entry(chunk.path.as_str()).or_default().push(chunk);
        }
        for symbol in &index.symbols {
            prior_symbols
                .entry(symbol.path.as_str())
                .or_default()
                .push(symbol);
        }
    }

    let scan = FileScanner::new(repo_root, config)
        .exclude_output_dir(output_dir)
        .scan();
    let mut warnings = scan.warnings;
    let mut stats = BuildStats {
        files_scanned: scan.paths.len(),
        ..BuildStats::default()
    };

    let extractor = LineHeuristicExtractor::new();
    let mut files: Vec<FileRecord> = Vec::new();
    let mut symbols: Vec<SymbolRecord> = Vec::new();
    let mut pending: Vec<(ChunkRecord, RowSource)> = Vec::new();

    for path in &scan.paths {
        let abs = repo_root.join(path);
        let metadata = match std::fs::metadata(&abs) {
            Ok(metadata) => metadata,
            Err(err) => {
                warnings.push(format!("cannot stat {path}: {err}"));
                continue;
            }
        };

        if metadata.len() > config.chunking.max_file_bytes {
            warnings.push(format!(
                "skipping oversized file {path} ({} bytes > {})",
                metadata.len(),
                config.chunking.max_file_bytes
            ));
            continue;
        }

        let content = match std::fs::read_to_string(&abs) {
            Ok(content) => content,
            Err(err) => {
                warnings.push(format!("cannot read {path}: {err}"));
                continue;
            }
        };

        let mtime_ms = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let file_hash = sha256_hex(content.as_bytes());
        stats.observe_mtime(mtime_ms);

        if cache_valid {
            if let Some(prior_file) = prior_files.get(path.as_str()) {
                if prior_file.file_hash == file_hash {
                    let carried = prior_chunks.get(path.as_str()).cloned().unwrap_or_default();
                    if reuse_is_sound(prior_file, &carried, prior.as_ref()) {
                        for chunk in &carried {
                            let mut restamped = (*chunk).clone();
                            restamped.mtime_ms = mtime_ms;
                            let old_row = chunk.vector_row;
                            pending.push((restamped, RowSource::Reused(old_row)));
                        }
                        for symbol in prior_symbols.get(path.as_str()).into_iter().flatten() {
                            symbols.push((*symbol).clone());
                        }
                        let mut record = (*prior_file).clone();
                        record.mtime_ms = mtime_ms;
                        files.push(record);
                        stats.record_reused_file(carried.len());
                        continue;
                    }
                    warnings.push(format!(
                        "reuse misalignment for {path}, recomputing from source"
                    ));
                }
            }
        }

        let language = Language::from_path(path);
        let area = area_for_path(path);
        let weight = config.area_weight_for(path);
        let structure = extractor.extract(path, &content, language);

        let ctx = FileContext {
            path,
            area,
            language,
            file_hash: &file_hash,
            mtime_ms,
            weight,
        };
        let chunks = chunk_file(&ctx, &content, &structure.symbols, &config.chunking)?;

        files.push(FileRecord::new(
            path,
            language.as_str(),
            area,
            metadata.len(),
            mtime_ms,
            &file_hash,
            chunks.len(),
            &structure,
        ));
        symbols.extend(structure.symbols);
        for chunk in chunks {
            let vector = vectorize(&chunk.text, dimension);
            pending.push((chunk, RowSource::Fresh(vector)));
        }
        stats.record_indexed_file();
    }

    // Final deterministic ordering; vector_row follows it, never the order
    // files happened to be processed in.
    files.sort_by(|a, b| a.path.cmp(&b.path));
    symbols.sort_by(|a, b| {
        a.path
            .cmp(&b.path)
            .then_with(|| a.start_line.cmp(&b.start_line))
    });
    pending.sort_by(|a, b| {
        a.0.path
            .cmp(&b.0.path)
            .then_with(|| a.0.start_line.cmp(&b.0.start_line))
            .then_with(|| a.0.end_line.cmp(&b.0.end_line))
    });

    let mut chunks: Vec<ChunkRecord> = Vec::with_capacity(pending.len());
    let mut vectors = VectorBuffer::new(dimension);
    for (row, (mut chunk, source)) in pending.into_iter().enumerate() {
        chunk.vector_row = row;
        match source {
            RowSource::Fresh(vector) => vectors.push_row(&vector)?,
            RowSource::Reused(old_row) => {
                let slice = prior
                    .as_ref()
                    .and_then(|index| index.vectors.row(old_row))
                    .ok_or_else(|| {
                        IndexerError::CorruptIndex(format!(
                            "reused vector row {old_row} out of bounds"
                        ))
                    })?;
                vectors.push_row(slice)?;
            }
        }
        chunks.push(chunk);
    }

    stats.chunks_total = chunks.len();
    stats.symbols_total = symbols.len();
    stats.warning_count = warnings.len();

    let mut artifacts: BTreeMap<String, ArtifactInfo> = BTreeMap::new();
    artifacts.insert(
        FILES_FILE.to_string(),
        write_jsonl_atomic(&output_dir.join(FILES_FILE), &files)?,
    );
    artifacts.insert(
        CHUNKS_FILE.to_string(),
        write_jsonl_atomic(&output_dir.join(CHUNKS_FILE), &chunks)?,
    );
    artifacts.insert(
        SYMBOLS_FILE.to_string(),
        write_jsonl_atomic(&output_dir.join(SYMBOLS_FILE), &symbols)?,
    );
    vectors.write_to(&output_dir.join(VECTORS_FILE))?;
    artifacts.insert(
        VECTORS_FILE.to_string(),
        file_artifact_info(&output_dir.join(VECTORS_FILE))?,
    );

    let manifest = Manifest {
        schema_version: config.schema_version,
        index_format_version: config.index_format_version,
        build_mode: if cache_valid {
            BuildMode::Incremental
        } else {
            BuildMode::Full
        },
        created_at_ms: unix_now_ms(),
        repo_root: repo_root.to_string_lossy().into_owned(),
        output_dir: output_dir.to_string_lossy().into_owned(),
        config_hash,
        engine: config.engine.clone(),
        git: probe_git_state(repo_root),
        stats,
        artifacts,
        drift_contract: Manifest::drift_contract(),
    };
    manifest.write(output_dir)?;

    log::info!(
        "indexed {} files ({} reused), {} chunks, {} symbols",
        manifest.stats.files_indexed,
        manifest.stats.files_reused,
        manifest.stats.chunks_total,
        manifest.stats.symbols_total
    );

    Ok(BuildOutcome {
        manifest,
        warnings,
        output_dir: output_dir.to_path_buf(),
    })
}

/// Guard against silently misaligned reuse: the prior FileRecord's chunk
/// count must match the carried chunk list and every old vector row must be
/// in bounds before the old buffer is sliced.
fn reuse_is_sound(
    prior_file: &FileRecord,
    carried: &[&ChunkRecord],
    prior: Option<&Index>,
) -> bool {
    if prior_file.chunk_count != carried.len() {
        return false;
    }
    let Some(index) = prior else {
        return false;
    };
    carried
        .iter()
        .all(|chunk| chunk.vector_row < index.vectors.row_count())
}
