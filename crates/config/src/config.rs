use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

/// Engine identity baked into every manifest. A change to any field is a
/// cache-invalidation boundary.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    pub name: String,
    pub version: String,
    pub dimension: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "quarry-hash-tf".to_string(),
            version: "1".to_string(),
            dimension: 256,
        }
    }
}

/// Per-strategy windowing parameters plus the oversize ceiling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChunkingConfig {
    pub code_max_lines: usize,
    pub code_overlap_lines: usize,
    pub doc_max_lines: usize,
    pub doc_overlap_lines: usize,
    pub text_max_lines: usize,
    pub text_overlap_lines: usize,
    pub max_file_bytes: u64,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            code_max_lines: 60,
            code_overlap_lines: 10,
            doc_max_lines: 40,
            doc_overlap_lines: 6,
            text_max_lines: 50,
            text_overlap_lines: 8,
            max_file_bytes: 1_048_576,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum IsolationMode {
    None,
    BranchWorktree,
}

/// Controls whether indexes are namespaced per branch/worktree so that
/// concurrent checkouts of the same repo never clobber each other.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct IsolationConfig {
    pub mode: IsolationMode,
    pub worktree_hash_length: usize,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            mode: IsolationMode::BranchWorktree,
            worktree_hash_length: 8,
        }
    }
}

/// Relative weights of the ranking signals. Vector-dominant by default with
/// lexical/symbol/path/recency as tie-breakers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryWeights {
    pub vector: f32,
    pub lexical: f32,
    pub symbol: f32,
    pub path: f32,
    pub recency: f32,
}

impl Default for QueryWeights {
    fn default() -> Self {
        Self {
            vector: 0.55,
            lexical: 0.20,
            symbol: 0.12,
            path: 0.08,
            recency: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryConfig {
    pub default_top_k: usize,
    pub max_top_k: usize,
    pub weights: QueryWeights,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_top_k: 8,
            max_top_k: 50,
            weights: QueryWeights::default(),
        }
    }
}

/// Root configuration, loaded from a camelCase JSON file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub output_dir: String,
    pub schema_version: u32,
    pub index_format_version: u32,
    pub engine: EngineConfig,
    pub include_roots: Vec<String>,
    pub extensions: Vec<String>,
    pub exclude_globs: Vec<String>,
    pub prune_directories: Vec<String>,
    pub area_weights: BTreeMap<String, f32>,
    pub chunking: ChunkingConfig,
    pub isolation: IsolationConfig,
    pub query: QueryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: ".quarry".to_string(),
            schema_version: 1,
            index_format_version: 1,
            engine: EngineConfig::default(),
            include_roots: vec![".".to_string()],
            extensions: [
                "ts", "tsx", "js", "jsx", "mjs", "cjs", "rs", "py", "go", "md", "json", "yaml",
                "yml", "toml", "sql",
            ]
            .iter()
            .map(|ext| (*ext).to_string())
            .collect(),
            exclude_globs: Vec::new(),
            prune_directories: vec![
                "node_modules".to_string(),
                ".git".to_string(),
                "target".to_string(),
                "dist".to_string(),
                "build".to_string(),
            ],
            area_weights: BTreeMap::new(),
            chunking: ChunkingConfig::default(),
            isolation: IsolationConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a JSON file. A missing file is fatal; the caller is
    /// expected to know where its config lives.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)
            .map_err(|err| ConfigError::Invalid(format!("{}: {err}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.engine.dimension == 0 {
            return Err(ConfigError::InvalidDimension);
        }
        Ok(())
    }

    /// Stable hash of the config contents. Keys are sorted before hashing so
    /// reordering entries in the file does not invalidate caches.
    pub fn config_hash(&self) -> String {
        let value = serde_json::to_value(self).unwrap_or(serde_json::Value::Null);
        let mut canonical = String::new();
        write_canonical(&value, &mut canonical);
        let digest = Sha256::digest(canonical.as_bytes());
        hex_string(&digest)
    }

    /// Longest `areaWeights` prefix match for a repo-relative path, 1.0 when
    /// nothing matches.
    pub fn area_weight_for(&self, path: &str) -> f32 {
        let mut best: Option<(usize, f32)> = None;
        for (prefix, weight) in &self.area_weights {
            if path.starts_with(prefix.as_str()) {
                match best {
                    Some((len, _)) if prefix.len() <= len => {}
                    _ => best = Some((prefix.len(), *weight)),
                }
            }
        }
        best.map_or(1.0, |(_, weight)| weight)
    }
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Deterministic JSON stringification: object keys emitted in sorted order,
/// no insignificant whitespace. Numbers/strings rendered by serde_json.
fn write_canonical(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (idx, key) in keys.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                write_canonical(&map[*key], out);
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn missing_config_file_is_fatal() {
        let err = Config::load("/nonexistent/quarry.json").unwrap_err();
        assert!(matches!(err, ConfigError::Missing(_)));
    }

    #[test]
    fn config_hash_ignores_key_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let a = dir.path().join("a.json");
        let b = dir.path().join("b.json");
        std::fs::write(&a, r#"{"outputDir": ".idx", "schemaVersion": 2}"#).expect("write a");
        std::fs::write(&b, r#"{"schemaVersion": 2, "outputDir": ".idx"}"#).expect("write b");

        let first = Config::load(&a).expect("load a");
        let second = Config::load(&b).expect("load b");
        assert_eq!(first.config_hash(), second.config_hash());
    }

    #[test]
    fn config_hash_changes_with_dimension() {
        let mut config = Config::default();
        let before = config.config_hash();
        config.engine.dimension = 128;
        assert_ne!(before, config.config_hash());
    }

    #[test]
    fn zero_dimension_rejected() {
        let mut config = Config::default();
        config.engine.dimension = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDimension)
        ));
    }

    #[test]
    fn area_weight_prefers_longest_prefix() {
        let mut config = Config::default();
        config.area_weights.insert("backend/".to_string(), 1.2);
        config
            .area_weights
            .insert("backend/src/routes/".to_string(), 1.5);

        assert_eq!(config.area_weight_for("backend/src/routes/playback.ts"), 1.5);
        assert_eq!(config.area_weight_for("backend/src/db.ts"), 1.2);
        assert_eq!(config.area_weight_for("docs/readme.md"), 1.0);
    }
}
