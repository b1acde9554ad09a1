use quarry_chunker::FileStructure;
use serde::{Deserialize, Serialize};

/// One indexed file. Identity = path (unique within an index).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileRecord {
    pub path: String,
    pub language: String,

    /// Coarse directory-derived tag (first path component).
    pub area: String,

    pub size_bytes: u64,
    pub mtime_ms: u64,

    /// SHA-256 of the whole file content; the incremental-reuse key.
    pub file_hash: String,

    pub chunk_count: usize,
    pub symbol_count: usize,
    pub import_count: usize,
    pub export_count: usize,
    pub route_hint_count: usize,

    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub route_hints: Vec<String>,
}

impl FileRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        path: &str,
        language: &str,
        area: &str,
        size_bytes: u64,
        mtime_ms: u64,
        file_hash: &str,
        chunk_count: usize,
        structure: &FileStructure,
    ) -> Self {
        Self {
            path: path.to_string(),
            language: language.to_string(),
            area: area.to_string(),
            size_bytes,
            mtime_ms,
            file_hash: file_hash.to_string(),
            chunk_count,
            symbol_count: structure.symbols.len(),
            import_count: structure.imports.len(),
            export_count: structure.exports.len(),
            route_hint_count: structure.route_hints.len(),
            imports: structure.imports.clone(),
            exports: structure.exports.clone(),
            route_hints: structure.route_hints.clone(),
        }
    }
}

/// First path component, "root" for bare file names.
pub fn area_for_path(path: &str) -> &str {
    match path.split_once('/') {
        Some((first, _)) => first,
        None => "root",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn area_is_first_component() {
        assert_eq!(area_for_path("backend/src/routes/playback.ts"), "backend");
        assert_eq!(area_for_path("README.md"), "root");
    }
}
