use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Kind of a detected declaration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Const,
    Route,
    Heading,
}

impl SymbolKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Interface => "interface",
            SymbolKind::Type => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Const => "const",
            SymbolKind::Route => "route",
            SymbolKind::Heading => "heading",
        }
    }
}

/// One detected declaration in a file.
///
/// Symbols for a path are ordered by start line and non-overlapping: each end
/// line is back-filled as one line before the next symbol's start (EOF for the
/// last one).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymbolRecord {
    pub id: String,
    pub path: String,
    pub kind: SymbolKind,
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
    pub signature: String,
}

impl SymbolRecord {
    pub fn new(
        path: &str,
        kind: SymbolKind,
        name: &str,
        start_line: usize,
        signature: &str,
    ) -> Self {
        let id = short_hash(&format!("{path}|{}|{name}|{start_line}", kind.as_str()));
        Self {
            id,
            path: path.to_string(),
            kind,
            name: name.to_string(),
            start_line,
            end_line: start_line,
            signature: truncate_signature(signature),
        }
    }
}

const MAX_SIGNATURE_CHARS: usize = 160;

fn truncate_signature(line: &str) -> String {
    let trimmed = line.trim();
    trimmed.chars().take(MAX_SIGNATURE_CHARS).collect()
}

/// Kind of a chunk: which strategy produced it and how it relates to the
/// surrounding structure.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Doc,
    Code,
    CodePreamble,
    Symbol,
    SymbolContinuation,
    Text,
}

/// The atomic retrieval unit: a line-range slice of one file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkRecord {
    /// Globally unique, derived from (path, start, end, text).
    pub id: String,
    pub path: String,
    pub area: String,
    pub language: String,
    pub chunk_type: ChunkType,

    /// 1-indexed, inclusive.
    pub start_line: usize,
    pub end_line: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_kind: Option<SymbolKind>,

    pub token_estimate: usize,

    /// Integrity anchor: SHA-256 of the exact chunk text.
    pub text_hash: String,
    pub text: String,

    /// Back-reference to the owning FileRecord's content hash.
    pub file_hash: String,
    pub mtime_ms: u64,
    pub weight: f32,

    /// 0-based row into the vector buffer; equals the chunk's position in the
    /// final sorted chunk list.
    pub vector_row: usize,
}

/// Rough token estimate (~4 chars per token), good enough for budget display.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Full SHA-256 as lowercase hex.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(64);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Truncated SHA-256, used for chunk and symbol ids.
pub fn short_hash(input: &str) -> String {
    let mut hex = sha256_hex(input.as_bytes());
    hex.truncate(16);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_hash_is_stable_and_short() {
        let a = short_hash("src/lib.rs|5|24|text");
        let b = short_hash("src/lib.rs|5|24|text");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, short_hash("src/lib.rs|5|24|other"));
    }

    #[test]
    fn signature_is_trimmed_and_capped() {
        let long = format!("  {}  ", "x".repeat(400));
        let symbol = SymbolRecord::new("a.ts", SymbolKind::Function, "f", 1, &long);
        assert_eq!(symbol.signature.len(), 160);
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
