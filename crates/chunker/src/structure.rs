use crate::language::Language;
use crate::types::{SymbolKind, SymbolRecord};
use regex::Regex;
use std::collections::HashSet;

const MAX_IMPORTS: usize = 40;
const MAX_EXPORTS: usize = 40;

/// Heuristically extracted structure of one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileStructure {
    pub imports: Vec<String>,
    pub exports: Vec<String>,
    pub route_hints: Vec<String>,
    pub symbols: Vec<SymbolRecord>,
}

/// Structure extraction seam. The default implementation is line-regex
/// pattern matching; deliberately not an AST front end.
pub trait SymbolExtractor {
    fn extract(&self, path: &str, content: &str, language: Language) -> FileStructure;
}

/// Line-oriented regex extractor covering import/export specifiers, route
/// hints, declaration symbols, and markdown headings.
pub struct LineHeuristicExtractor {
    import_from: Regex,
    import_bare: Regex,
    require_call: Regex,
    export_decl: Regex,
    export_list: Regex,
    route_call: Regex,
    heading: Regex,
    ts_symbols: Vec<(Regex, SymbolKind)>,
    rust_symbols: Vec<(Regex, SymbolKind)>,
    python_symbols: Vec<(Regex, SymbolKind)>,
    go_symbols: Vec<(Regex, SymbolKind)>,
}

fn pattern(source: &str) -> Regex {
    Regex::new(source).expect("valid extractor pattern")
}

impl LineHeuristicExtractor {
    pub fn new() -> Self {
        Self {
            import_from: pattern(r#"^\s*import\s+.*?\s+from\s+['"]([^'"]+)['"]"#),
            import_bare: pattern(r#"^\s*import\s+['"]([^'"]+)['"]"#),
            require_call: pattern(r#"require\(\s*['"]([^'"]+)['"]\s*\)"#),
            export_decl: pattern(
                r"^\s*export\s+(?:default\s+)?(?:async\s+)?(?:abstract\s+)?(?:function|class|interface|type|enum|const|let|var)\s+([A-Za-z_$][\w$]*)",
            ),
            export_list: pattern(r"^\s*export\s*\{([^}]*)\}"),
            route_call: pattern(
                r#"\b(?:router|app)\.(get|post|put|patch|delete)\s*\(\s*['"]([^'"]+)['"]"#,
            ),
            heading: pattern(r"^(#{1,6})\s+(.*\S)"),
            ts_symbols: vec![
                (
                    pattern(
                        r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s+([A-Za-z_$][\w$]*)",
                    ),
                    SymbolKind::Function,
                ),
                (
                    pattern(
                        r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)",
                    ),
                    SymbolKind::Class,
                ),
                (
                    pattern(r"^\s*(?:export\s+)?interface\s+([A-Za-z_$][\w$]*)"),
                    SymbolKind::Interface,
                ),
                (
                    pattern(r"^\s*(?:export\s+)?type\s+([A-Za-z_$][\w$]*)\s*="),
                    SymbolKind::Type,
                ),
                (
                    pattern(r"^\s*(?:export\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)"),
                    SymbolKind::Enum,
                ),
                (
                    pattern(r"^\s*(?:export\s+)?const\s+([A-Za-z_$][\w$]*)\s*="),
                    SymbolKind::Const,
                ),
            ],
            rust_symbols: vec![
                (
                    pattern(r"^\s*(?:pub(?:\([^)]*\))?\s+)?(?:async\s+)?fn\s+(\w+)"),
                    SymbolKind::Function,
                ),
                (
                    pattern(r"^\s*(?:pub(?:\([^)]*\))?\s+)?struct\s+(\w+)"),
                    SymbolKind::Class,
                ),
                (
                    pattern(r"^\s*(?:pub(?:\([^)]*\))?\s+)?trait\s+(\w+)"),
                    SymbolKind::Interface,
                ),
                (
                    pattern(r"^\s*(?:pub(?:\([^)]*\))?\s+)?enum\s+(\w+)"),
                    SymbolKind::Enum,
                ),
                (
                    pattern(r"^\s*(?:pub(?:\([^)]*\))?\s+)?type\s+(\w+)\s*="),
                    SymbolKind::Type,
                ),
                (
                    pattern(r"^\s*(?:pub(?:\([^)]*\))?\s+)?const\s+(\w+)"),
                    SymbolKind::Const,
                ),
            ],
            python_symbols: vec![
                (
                    pattern(r"^\s*(?:async\s+)?def\s+(\w+)"),
                    SymbolKind::Function,
                ),
                (pattern(r"^\s*class\s+(\w+)"), SymbolKind::Class),
            ],
            go_symbols: vec![
                (
                    pattern(r"^func\s+(?:\([^)]+\)\s*)?(\w+)"),
                    SymbolKind::Function,
                ),
                (pattern(r"^type\s+(\w+)\s+struct"), SymbolKind::Class),
                (pattern(r"^type\s+(\w+)\s+interface"), SymbolKind::Interface),
            ],
        }
    }

    fn declaration_patterns(&self, language: Language) -> &[(Regex, SymbolKind)] {
        match language {
            Language::TypeScript | Language::JavaScript => &self.ts_symbols,
            Language::Rust => &self.rust_symbols,
            Language::Python => &self.python_symbols,
            Language::Go => &self.go_symbols,
            _ => &[],
        }
    }

    fn extract_imports(&self, line: &str, imports: &mut Vec<String>) {
        if imports.len() >= MAX_IMPORTS {
            return;
        }
        for regex in [&self.import_from, &self.import_bare, &self.require_call] {
            if let Some(caps) = regex.captures(line) {
                imports.push(caps[1].to_string());
                return;
            }
        }
    }

    fn extract_exports(&self, line: &str, exports: &mut Vec<String>) {
        if exports.len() >= MAX_EXPORTS {
            return;
        }
        if let Some(caps) = self.export_decl.captures(line) {
            exports.push(caps[1].to_string());
            return;
        }
        if let Some(caps) = self.export_list.captures(line) {
            for item in caps[1].split(',') {
                if exports.len() >= MAX_EXPORTS {
                    break;
                }
                // `a as b` exports `b`
                let name = item
                    .rsplit(" as ")
                    .next()
                    .unwrap_or(item)
                    .trim()
                    .to_string();
                if !name.is_empty() {
                    exports.push(name);
                }
            }
        }
    }
}

impl Default for LineHeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolExtractor for LineHeuristicExtractor {
    fn extract(&self, path: &str, content: &str, language: Language) -> FileStructure {
        let mut structure = FileStructure::default();
        let mut seen: HashSet<(usize, SymbolKind, String)> = HashSet::new();
        let lines: Vec<&str> = content.lines().collect();

        for (idx, line) in lines.iter().enumerate() {
            let line_no = idx + 1;

            if language.is_doc() {
                if let Some(caps) = self.heading.captures(line) {
                    let name = caps[2].trim().to_string();
                    if seen.insert((line_no, SymbolKind::Heading, name.clone())) {
                        structure.symbols.push(SymbolRecord::new(
                            path,
                            SymbolKind::Heading,
                            &name,
                            line_no,
                            line,
                        ));
                    }
                }
                continue;
            }

            self.extract_imports(line, &mut structure.imports);
            self.extract_exports(line, &mut structure.exports);

            if let Some(caps) = self.route_call.captures(line) {
                let method = caps[1].to_uppercase();
                let route_path = caps[2].to_string();
                let name = format!("{method} {route_path}");
                structure.route_hints.push(name.clone());
                if seen.insert((line_no, SymbolKind::Route, name.clone())) {
                    structure.symbols.push(SymbolRecord::new(
                        path,
                        SymbolKind::Route,
                        &name,
                        line_no,
                        line,
                    ));
                }
                continue;
            }

            for (regex, kind) in self.declaration_patterns(language) {
                if let Some(caps) = regex.captures(line) {
                    let name = caps[1].to_string();
                    if seen.insert((line_no, *kind, name.clone())) {
                        structure
                            .symbols
                            .push(SymbolRecord::new(path, *kind, &name, line_no, line));
                    }
                    break;
                }
            }
        }

        backfill_end_lines(&mut structure.symbols, lines.len());
        structure
    }
}

/// Each symbol ends one line before the next symbol starts; the last one runs
/// to EOF.
fn backfill_end_lines(symbols: &mut [SymbolRecord], total_lines: usize) {
    symbols.sort_by(|a, b| a.start_line.cmp(&b.start_line));
    let next_starts: Vec<usize> = symbols
        .iter()
        .skip(1)
        .map(|symbol| symbol.start_line)
        .collect();
    for (idx, symbol) in symbols.iter_mut().enumerate() {
        symbol.end_line = match next_starts.get(idx) {
            Some(next_start) => (next_start - 1).max(symbol.start_line),
            None => total_lines.max(symbol.start_line),
        };
    }
}
