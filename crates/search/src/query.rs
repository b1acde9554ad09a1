use crate::error::{Result, SearchError};
use quarry_chunker::{ChunkType, SymbolKind};
use quarry_config::Config;
use quarry_indexer::{index_is_fresh, load_index, verify_index, Index, Manifest};
use quarry_vector::{dot, tokenize, vectorize};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

const SNIPPET_MAX_LINES: usize = 6;
const SNIPPET_MAX_CHARS: usize = 420;

/// Per-signal contribution of one hit, before weighting.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoreBreakdown {
    pub vector: f32,
    pub lexical: f32,
    pub symbol: f32,
    pub path: f32,
    pub recency: f32,
}

/// One ranked result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub chunk_id: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub chunk_type: ChunkType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<SymbolKind>,
    pub score: f32,
    pub breakdown: ScoreBreakdown,
    pub snippet: String,
}

/// Read-only query engine over a persisted index.
#[derive(Debug)]
pub struct QueryEngine {
    config: Config,
    index: Index,
    /// Lowercased symbol names per file, for the symbol-name signal.
    symbols_by_path: HashMap<String, Vec<String>>,
}

impl QueryEngine {
    /// Load the persisted index and validate it is compatible with the
    /// active config (engine identity + vector geometry are both fatal).
    pub fn load(config: &Config, output_dir: &Path) -> Result<Self> {
        let index = load_index(output_dir)?;
        if index.manifest.engine != config.engine {
            return Err(SearchError::EngineMismatch {
                indexed: format!(
                    "{}/{} dim {}",
                    index.manifest.engine.name,
                    index.manifest.engine.version,
                    index.manifest.engine.dimension
                ),
                expected: format!(
                    "{}/{} dim {}",
                    config.engine.name, config.engine.version, config.engine.dimension
                ),
            });
        }

        let mut symbols_by_path: HashMap<String, Vec<String>> = HashMap::new();
        for symbol in &index.symbols {
            symbols_by_path
                .entry(symbol.path.clone())
                .or_default()
                .push(symbol.name.to_lowercase());
        }

        Ok(Self {
            config: config.clone(),
            index,
            symbols_by_path,
        })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.index.manifest
    }

    /// `--strict-fresh` gate: refuse to answer when the captured git state no
    /// longer matches the live one.
    pub fn ensure_fresh(&self, repo_root: &Path) -> Result<()> {
        if index_is_fresh(repo_root, &self.index.manifest) {
            Ok(())
        } else {
            Err(SearchError::StaleIndex)
        }
    }

    /// `--verify` gate: run structural verification first and refuse on any
    /// error.
    pub fn ensure_verified(&self, repo_root: &Path, output_dir: &Path) -> Result<()> {
        let report = verify_index(repo_root, output_dir, false);
        if report.is_ok() {
            Ok(())
        } else {
            Err(SearchError::VerifyFailed(report.errors.join("; ")))
        }
    }

    /// Rank chunks against a free-text query. `top_k` is clamped to the
    /// configured maximum.
    pub fn search(&self, query: &str, top_k: usize) -> Vec<SearchHit> {
        let top_k = top_k.clamp(1, self.config.query.max_top_k.max(1));
        let dimension = self.config.engine.dimension;
        let weights = &self.config.query.weights;

        let query_vector = vectorize(query, dimension);
        let query_tokens = tokenize(query);
        let query_words: Vec<String> = query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();
        let path_fragments: Vec<String> = query_words
            .iter()
            .filter(|word| word.contains('/') || word.contains('.'))
            .cloned()
            .collect();

        let (mtime_min, mtime_max) = (
            self.index.manifest.stats.mtime_min_ms.unwrap_or(0),
            self.index.manifest.stats.mtime_max_ms.unwrap_or(0),
        );

        let mut hits: Vec<SearchHit> = Vec::new();
        for chunk in &self.index.chunks {
            let text_lower = chunk.text.to_lowercase();
            let path_lower = chunk.path.to_lowercase();
            let own_symbol = chunk.symbol.as_deref().map(str::to_lowercase);
            let file_symbols = self
                .symbols_by_path
                .get(&chunk.path)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let token_in_chunk = |token: &str| {
                text_lower.contains(token)
                    || path_lower.contains(token)
                    || own_symbol.as_deref().is_some_and(|name| name.contains(token))
                    || file_symbols.iter().any(|name| name.contains(token))
            };

            // With enough lexical signal, vector-only matches are excluded on
            // purpose: relevance and speed over recall.
            if query_tokens.len() >= 2 && !query_tokens.iter().any(|t| token_in_chunk(t)) {
                continue;
            }

            let vector_score = self
                .index
                .vectors
                .row(chunk.vector_row)
                .map(|row| dot(&query_vector, row))
                .unwrap_or(0.0);

            let lexical_score = if query_tokens.is_empty() {
                0.0
            } else {
                let found = query_tokens.iter().filter(|t| token_in_chunk(t)).count();
                found as f32 / query_tokens.len() as f32
            };

            let symbol_score = symbol_name_score(&query_words, own_symbol.as_deref(), file_symbols);

            let path_score = if !path_fragments.is_empty()
                && path_fragments.iter().any(|frag| path_lower.contains(frag))
            {
                1.0
            } else {
                chunk.weight
            };

            let recency_score = if mtime_max > mtime_min {
                (chunk.mtime_ms.saturating_sub(mtime_min)) as f32
                    / (mtime_max - mtime_min) as f32
            } else {
                1.0
            };

            let breakdown = ScoreBreakdown {
                vector: vector_score,
                lexical: lexical_score,
                symbol: symbol_score,
                path: path_score,
                recency: recency_score,
            };
            let score = weights.vector * vector_score
                + weights.lexical * lexical_score
                + weights.symbol * symbol_score
                + weights.path * path_score
                + weights.recency * recency_score;

            hits.push(SearchHit {
                chunk_id: chunk.id.clone(),
                path: chunk.path.clone(),
                start_line: chunk.start_line,
                end_line: chunk.end_line,
                chunk_type: chunk.chunk_type,
                symbol: chunk.symbol.clone(),
                symbol_kind: chunk.symbol_kind,
                score,
                breakdown,
                snippet: snippet(&chunk.text),
            });
        }

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        hits.truncate(top_k);
        log::debug!("query produced {} hits (top_k {top_k})", hits.len());
        hits
    }
}

/// 1.0 for an exact query-word match against any symbol name in scope, 0.7
/// for a substring match, 0 otherwise.
fn symbol_name_score(
    query_words: &[String],
    own_symbol: Option<&str>,
    file_symbols: &[String],
) -> f32 {
    let mut best = 0.0f32;
    let names = own_symbol.into_iter().chain(file_symbols.iter().map(String::as_str));
    for name in names {
        for word in query_words {
            if name == word {
                return 1.0;
            }
            if name.contains(word.as_str()) || word.contains(name) {
                best = best.max(0.7);
            }
        }
    }
    best
}

/// First few lines of the chunk, hard-capped in characters.
fn snippet(text: &str) -> String {
    let head: Vec<&str> = text.lines().take(SNIPPET_MAX_LINES).collect();
    let joined = head.join("\n");
    if joined.chars().count() <= SNIPPET_MAX_CHARS {
        joined
    } else {
        joined.chars().take(SNIPPET_MAX_CHARS).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quarry_indexer::build_index;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write fixture");
    }

    fn engine() -> (TempDir, QueryEngine) {
        let temp = TempDir::new().expect("tempdir");
        write(
            temp.path(),
            "backend/src/routes/playback.ts",
            r#"import { Router } from 'express';

const router = Router();

router.get('/playback/state', (req, res) => {
  // report playback state to the client
  res.json(playbackState());
});

export default router;
"#,
        );
        write(
            temp.path(),
            "frontend/components/badge.ts",
            "export function badgeColor(state) {\n  return state ? 'green' : 'gray';\n}\n",
        );

        let mut config = quarry_config::Config::default();
        config.engine.dimension = 64;
        let output_dir = temp.path().join("out");
        build_index(temp.path(), &config, &output_dir, true).expect("build");
        let engine = QueryEngine::load(&config, &output_dir).expect("load engine");
        (temp, engine)
    }

    #[test]
    fn relevant_route_ranks_first() {
        let (_temp, engine) = engine();
        let hits = engine.search("playback state route", 5);
        assert!(!hits.is_empty());
        assert!(
            hits[0].path.contains("routes/playback.ts"),
            "top hit was {}",
            hits[0].path
        );
        let unrelated_rank = hits.iter().position(|h| h.path.contains("badge"));
        if let Some(rank) = unrelated_rank {
            assert!(rank > 0, "unrelated file must not outrank the route");
        }
    }

    #[test]
    fn ranking_is_deterministic() {
        let (_temp, engine) = engine();
        let first = engine.search("playback state", 5);
        let second = engine.search("playback state", 5);
        assert_eq!(first, second);
    }

    #[test]
    fn top_k_is_clamped() {
        let (_temp, engine) = engine();
        let max = engine.config.query.max_top_k;
        let hits = engine.search("state", max + 100);
        assert!(hits.len() <= max);
    }

    #[test]
    fn engine_mismatch_is_fatal() {
        let (temp, _engine) = engine();
        let mut other = quarry_config::Config::default();
        other.engine.dimension = 64;
        other.engine.version = "2".to_string();
        let err = QueryEngine::load(&other, &temp.path().join("out")).unwrap_err();
        assert!(matches!(err, SearchError::EngineMismatch { .. }));
    }

    #[test]
    fn multi_token_query_filters_to_lexical_candidates() {
        let (_temp, engine) = engine();
        let hits = engine.search("completely unrelated nonsense words", 5);
        assert!(hits.is_empty());
    }

    #[test]
    fn snippet_is_capped() {
        let long = "x".repeat(2_000);
        let text = format!("{long}\nsecond line");
        let cut = snippet(&text);
        assert_eq!(cut.chars().count(), SNIPPET_MAX_CHARS);
    }
}
