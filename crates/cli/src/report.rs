//! Text and JSON rendering for the three subcommands. Text mode is a compact
//! human summary; warning/error lists are capped so a broken tree does not
//! scroll the terminal into oblivion.

use quarry_indexer::{BuildMode, BuildOutcome, VerifyReport};
use quarry_search::SearchHit;
use serde::Serialize;

const LIST_CAP: usize = 20;

/// `--json` payload for `quarry build`.
#[derive(Serialize)]
pub struct BuildPayload<'a> {
    pub manifest: &'a quarry_indexer::Manifest,
    pub warnings: &'a [String],
}

/// `--json` payload for `quarry query`.
#[derive(Serialize)]
pub struct QueryPayload<'a> {
    pub query: &'a str,
    pub top_k: usize,
    pub hits: &'a [SearchHit],
}

pub fn render_build(outcome: &BuildOutcome) -> String {
    let stats = &outcome.manifest.stats;
    let mode = match outcome.manifest.build_mode {
        BuildMode::Full => "full",
        BuildMode::Incremental => "incremental",
    };
    let mut out = String::new();
    out.push_str(&format!(
        "{mode} build -> {}\n",
        outcome.output_dir.display()
    ));
    out.push_str(&format!(
        "files: {} scanned, {} indexed, {} reused\n",
        stats.files_scanned, stats.files_indexed, stats.files_reused
    ));
    out.push_str(&format!(
        "chunks: {} ({} reused), symbols: {}\n",
        stats.chunks_total, stats.chunks_reused, stats.symbols_total
    ));
    push_capped(&mut out, "warning", &outcome.warnings);
    out
}

pub fn render_query(query: &str, hits: &[SearchHit]) -> String {
    let mut out = format!("{} hits for {query:?}\n", hits.len());
    for (rank, hit) in hits.iter().enumerate() {
        let symbol = hit
            .symbol
            .as_deref()
            .map(|name| format!(" [{name}]"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{:>2}. {}:{}-{} (score {:.3}){}\n",
            rank + 1,
            hit.path,
            hit.start_line,
            hit.end_line,
            hit.score,
            symbol
        ));
        for line in hit.snippet.lines() {
            out.push_str(&format!("    {line}\n"));
        }
    }
    out
}

pub fn render_verify(report: &VerifyReport) -> String {
    let status = if report.is_ok() { "ok" } else { "error" };
    let mut out = format!(
        "verify: {status}{}\n",
        if report.strict { " (strict)" } else { "" }
    );
    out.push_str(&format!(
        "checked: {} files, {} chunks, {} symbols\n",
        report.files_checked, report.chunks_checked, report.symbols_checked
    ));
    push_capped(&mut out, "error", &report.errors);
    push_capped(&mut out, "warning", &report.warnings);
    out
}

fn push_capped(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("{label}s ({}):\n", items.len()));
    for item in items.iter().take(LIST_CAP) {
        out.push_str(&format!("  - {item}\n"));
    }
    if items.len() > LIST_CAP {
        out.push_str(&format!("  ... and {} more\n", items.len() - LIST_CAP));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_lists_are_capped() {
        let items: Vec<String> = (0..30).map(|i| format!("warning {i}")).collect();
        let mut out = String::new();
        push_capped(&mut out, "warning", &items);

        assert!(out.starts_with("warnings (30):\n"));
        assert!(out.contains("warning 19"));
        assert!(!out.contains("warning 20\n"));
        assert!(out.ends_with("... and 10 more\n"));
    }

    #[test]
    fn empty_list_renders_nothing() {
        let mut out = String::new();
        push_capped(&mut out, "error", &[]);
        assert!(out.is_empty());
    }
}
