use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::types::{
    estimate_tokens, sha256_hex, short_hash, ChunkRecord, ChunkType, SymbolKind, SymbolRecord,
};
use quarry_config::ChunkingConfig;

/// Everything about the owning file a chunk needs to carry.
#[derive(Debug, Clone, Copy)]
pub struct FileContext<'a> {
    pub path: &'a str,
    pub area: &'a str,
    pub language: Language,
    pub file_hash: &'a str,
    pub mtime_ms: u64,
    pub weight: f32,
}

/// Overlapping line windows over `[start, end]` (1-indexed, inclusive).
///
/// Each window is `[cursor, min(end, cursor + max_lines - 1)]`, except that a
/// window absorbs a remaining tail of at most `overlap_lines` lines instead
/// of emitting a fragment shorter than the overlap. The cursor advances to
/// `max(cursor + 1, window_end - overlap_lines + 1)`, which guarantees
/// progress even under a misconfigured overlap >= max_lines.
pub fn window_ranges(
    start: usize,
    end: usize,
    max_lines: usize,
    overlap_lines: usize,
) -> Vec<(usize, usize)> {
    let mut windows = Vec::new();
    if start == 0 || start > end || max_lines == 0 {
        return windows;
    }
    let mut cursor = start;
    loop {
        let mut window_end = end.min(cursor + max_lines - 1);
        if end - window_end <= overlap_lines {
            window_end = end;
        }
        windows.push((cursor, window_end));
        if window_end >= end {
            break;
        }
        let next = (cursor + 1).max((window_end + 1).saturating_sub(overlap_lines));
        if next <= cursor {
            break;
        }
        cursor = next;
    }
    windows
}

/// Split a file into chunks using one of three strategies: heading-bounded
/// doc sections, symbol-aligned code windows, or generic windowing.
pub fn chunk_file(
    ctx: &FileContext<'_>,
    content: &str,
    symbols: &[SymbolRecord],
    chunking: &ChunkingConfig,
) -> Result<Vec<ChunkRecord>> {
    if chunking.code_max_lines == 0 || chunking.doc_max_lines == 0 || chunking.text_max_lines == 0
    {
        return Err(ChunkerError::InvalidWindow);
    }

    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Ok(Vec::new());
    }

    let chunks = if ctx.language.is_doc() {
        chunk_doc(ctx, &lines, symbols, chunking)
    } else if ctx.language.is_code() && symbols.iter().any(|s| s.kind != SymbolKind::Heading) {
        chunk_code_with_symbols(ctx, &lines, symbols, chunking)
    } else {
        chunk_generic(ctx, &lines, chunking)
    };

    Ok(chunks)
}

/// Doc strategy: partition by heading line numbers, window each section
/// independently so no chunk straddles a heading boundary beyond the overlap.
fn chunk_doc(
    ctx: &FileContext<'_>,
    lines: &[&str],
    symbols: &[SymbolRecord],
    chunking: &ChunkingConfig,
) -> Vec<ChunkRecord> {
    let total = lines.len();
    let mut boundaries: Vec<usize> = vec![1];
    for symbol in symbols {
        if symbol.kind == SymbolKind::Heading && symbol.start_line > 1 {
            boundaries.push(symbol.start_line);
        }
    }
    boundaries.dedup();

    let mut chunks = Vec::new();
    for (idx, &section_start) in boundaries.iter().enumerate() {
        let section_end = boundaries
            .get(idx + 1)
            .map_or(total, |next_start| next_start - 1);
        for (start, end) in window_ranges(
            section_start,
            section_end,
            chunking.doc_max_lines,
            chunking.doc_overlap_lines,
        ) {
            push_chunk(&mut chunks, ctx, lines, start, end, ChunkType::Doc, None);
        }
    }
    chunks
}

/// Code strategy: a preamble before the first symbol, then per-symbol
/// windows. The first window of a symbol is the primary `symbol` chunk;
/// overflow windows are `symbol_continuation` so a long body stays searchable.
fn chunk_code_with_symbols(
    ctx: &FileContext<'_>,
    lines: &[&str],
    symbols: &[SymbolRecord],
    chunking: &ChunkingConfig,
) -> Vec<ChunkRecord> {
    let mut chunks = Vec::new();
    let code_symbols: Vec<&SymbolRecord> = symbols
        .iter()
        .filter(|s| s.kind != SymbolKind::Heading)
        .collect();

    let first_start = code_symbols
        .first()
        .map_or(1, |symbol| symbol.start_line);
    if first_start > 1 {
        for (start, end) in window_ranges(
            1,
            first_start - 1,
            chunking.code_max_lines,
            chunking.code_overlap_lines,
        ) {
            push_chunk(
                &mut chunks,
                ctx,
                lines,
                start,
                end,
                ChunkType::CodePreamble,
                None,
            );
        }
    }

    for symbol in code_symbols {
        let windows = window_ranges(
            symbol.start_line,
            symbol.end_line,
            chunking.code_max_lines,
            chunking.code_overlap_lines,
        );
        for (window_idx, (start, end)) in windows.into_iter().enumerate() {
            let chunk_type = if window_idx == 0 {
                ChunkType::Symbol
            } else {
                ChunkType::SymbolContinuation
            };
            push_chunk(&mut chunks, ctx, lines, start, end, chunk_type, Some(symbol));
        }
    }
    chunks
}

fn chunk_generic(
    ctx: &FileContext<'_>,
    lines: &[&str],
    chunking: &ChunkingConfig,
) -> Vec<ChunkRecord> {
    let (max_lines, overlap_lines, chunk_type) = if ctx.language.is_code() {
        (
            chunking.code_max_lines,
            chunking.code_overlap_lines,
            ChunkType::Code,
        )
    } else {
        (
            chunking.text_max_lines,
            chunking.text_overlap_lines,
            ChunkType::Text,
        )
    };

    let mut chunks = Vec::new();
    for (start, end) in window_ranges(1, lines.len(), max_lines, overlap_lines) {
        push_chunk(&mut chunks, ctx, lines, start, end, chunk_type, None);
    }
    chunks
}

fn push_chunk(
    chunks: &mut Vec<ChunkRecord>,
    ctx: &FileContext<'_>,
    lines: &[&str],
    start: usize,
    end: usize,
    chunk_type: ChunkType,
    symbol: Option<&SymbolRecord>,
) {
    let text = lines[start - 1..end].join("\n");
    if text.trim().is_empty() {
        return;
    }
    let id = short_hash(&format!("{}|{start}|{end}|{text}", ctx.path));
    chunks.push(ChunkRecord {
        id,
        path: ctx.path.to_string(),
        area: ctx.area.to_string(),
        language: ctx.language.as_str().to_string(),
        chunk_type,
        start_line: start,
        end_line: end,
        symbol: symbol.map(|s| s.name.clone()),
        symbol_kind: symbol.map(|s| s.kind),
        token_estimate: estimate_tokens(&text),
        text_hash: sha256_hex(text.as_bytes()),
        text,
        file_hash: ctx.file_hash.to_string(),
        mtime_ms: ctx.mtime_ms,
        weight: ctx.weight,
        vector_row: 0,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn ctx<'a>(path: &'a str, language: Language) -> FileContext<'a> {
        FileContext {
            path,
            area: "src",
            language,
            file_hash: "deadbeef",
            mtime_ms: 1_000,
            weight: 1.0,
        }
    }

    fn numbered_lines(count: usize) -> String {
        (1..=count)
            .map(|n| format!("line {n}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn windows_cover_range_without_gaps() {
        for (start, end, max_lines, overlap) in
            [(1, 100, 20, 5), (1, 7, 20, 5), (3, 41, 10, 3), (1, 1, 4, 1)]
        {
            let windows = window_ranges(start, end, max_lines, overlap);
            assert_eq!(windows.first().map(|w| w.0), Some(start));
            assert_eq!(windows.last().map(|w| w.1), Some(end));
            for pair in windows.windows(2) {
                // next window starts at or before the previous end + 1
                assert!(pair[1].0 <= pair[0].1 + 1, "gap between {pair:?}");
                assert!(pair[1].0 > pair[0].0, "no progress in {pair:?}");
            }
            for (window_start, window_end) in &windows {
                assert!(window_end - window_start + 1 <= max_lines + overlap);
            }
        }
    }

    #[test]
    fn bad_overlap_still_terminates() {
        let windows = window_ranges(1, 30, 5, 10);
        assert_eq!(windows.last().map(|w| w.1), Some(30));
        for pair in windows.windows(2) {
            assert!(pair[1].0 > pair[0].0);
        }
    }

    #[test]
    fn symbol_windows_match_documented_shape() {
        // 40-line file, one function spanning lines 5..40, windows (20, 5):
        // preamble [1,4], symbol [5,24], continuation [20,40].
        let content = numbered_lines(40);
        let mut symbol =
            SymbolRecord::new("src/a.ts", SymbolKind::Function, "handler", 5, "line 5");
        symbol.end_line = 40;

        let chunking = ChunkingConfig {
            code_max_lines: 20,
            code_overlap_lines: 5,
            ..ChunkingConfig::default()
        };
        let chunks = chunk_file(
            &ctx("src/a.ts", Language::TypeScript),
            &content,
            &[symbol],
            &chunking,
        )
        .expect("chunk");

        let shapes: Vec<(ChunkType, usize, usize)> = chunks
            .iter()
            .map(|c| (c.chunk_type, c.start_line, c.end_line))
            .collect();
        assert_eq!(
            shapes,
            vec![
                (ChunkType::CodePreamble, 1, 4),
                (ChunkType::Symbol, 5, 24),
                (ChunkType::SymbolContinuation, 20, 40),
            ]
        );
        assert_eq!(chunks[1].symbol.as_deref(), Some("handler"));
        assert_eq!(chunks[2].symbol.as_deref(), Some("handler"));
    }

    #[test]
    fn doc_chunks_do_not_straddle_headings() {
        let content = "intro line\n\n# First\nbody a\nbody b\n\n# Second\nbody c\n";
        let mut first = SymbolRecord::new("g.md", SymbolKind::Heading, "First", 3, "# First");
        first.end_line = 6;
        let mut second = SymbolRecord::new("g.md", SymbolKind::Heading, "Second", 7, "# Second");
        second.end_line = 8;

        let chunking = ChunkingConfig {
            doc_max_lines: 4,
            doc_overlap_lines: 1,
            ..ChunkingConfig::default()
        };
        let chunks = chunk_file(
            &ctx("g.md", Language::Markdown),
            content,
            &[first, second],
            &chunking,
        )
        .expect("chunk");

        assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Doc));
        // Sections: [1,2], [3,6], [7,8]; no window crosses a section edge.
        for chunk in &chunks {
            let crosses = (chunk.start_line < 3 && chunk.end_line >= 3)
                || (chunk.start_line < 7 && chunk.end_line >= 7);
            assert!(!crosses, "chunk {:?} straddles a heading", chunk.id);
        }
    }

    #[test]
    fn whitespace_only_windows_are_dropped() {
        let content = "\n\n\n\n";
        let chunks = chunk_file(
            &ctx("notes.txt", Language::Unknown),
            content,
            &[],
            &ChunkingConfig::default(),
        )
        .expect("chunk");
        assert!(chunks.is_empty());
    }

    #[test]
    fn generic_text_windowing_for_unknown_language() {
        let content = numbered_lines(12);
        let chunking = ChunkingConfig {
            text_max_lines: 5,
            text_overlap_lines: 1,
            ..ChunkingConfig::default()
        };
        let chunks = chunk_file(
            &ctx("notes.txt", Language::Unknown),
            &content,
            &[],
            &chunking,
        )
        .expect("chunk");
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chunk_type == ChunkType::Text));
        assert_eq!(chunks.last().map(|c| c.end_line), Some(12));
    }

    #[test]
    fn chunk_ids_are_unique_and_text_hash_matches() {
        let content = numbered_lines(30);
        let chunking = ChunkingConfig {
            code_max_lines: 10,
            code_overlap_lines: 2,
            ..ChunkingConfig::default()
        };
        let chunks = chunk_file(
            &ctx("src/a.rs", Language::Rust),
            &content,
            &[],
            &chunking,
        )
        .expect("chunk");

        let mut ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), chunks.len());
        for chunk in &chunks {
            assert_eq!(chunk.text_hash, sha256_hex(chunk.text.as_bytes()));
        }
    }
}
