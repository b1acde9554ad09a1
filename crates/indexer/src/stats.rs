use serde::{Deserialize, Serialize};

/// Aggregate counters for one build, threaded through the build function and
/// returned with the manifest (never global state).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildStats {
    /// Candidate files the scanner produced.
    pub files_scanned: usize,

    /// Files that ended up in the index (reused or recomputed).
    pub files_indexed: usize,

    /// Subset of `files_indexed` carried forward from the prior build.
    pub files_reused: usize,

    pub chunks_total: usize,
    pub chunks_reused: usize,
    pub symbols_total: usize,
    pub warning_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime_min_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mtime_max_ms: Option<u64>,
}

impl BuildStats {
    pub fn observe_mtime(&mut self, mtime_ms: u64) {
        self.mtime_min_ms = Some(self.mtime_min_ms.map_or(mtime_ms, |min| min.min(mtime_ms)));
        self.mtime_max_ms = Some(self.mtime_max_ms.map_or(mtime_ms, |max| max.max(mtime_ms)));
    }

    pub fn record_reused_file(&mut self, chunk_count: usize) {
        self.files_indexed += 1;
        self.files_reused += 1;
        self.chunks_reused += chunk_count;
    }

    pub fn record_indexed_file(&mut self) {
        self.files_indexed += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn mtime_range_tracks_min_and_max() {
        let mut stats = BuildStats::default();
        stats.observe_mtime(50);
        stats.observe_mtime(10);
        stats.observe_mtime(90);
        assert_eq!(stats.mtime_min_ms, Some(10));
        assert_eq!(stats.mtime_max_ms, Some(90));
    }
}
