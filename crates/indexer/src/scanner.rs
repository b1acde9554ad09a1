use quarry_config::Config;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Candidate files plus the non-fatal problems hit while collecting them.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// Repo-relative, `/`-separated, deduplicated, lexicographically sorted.
    pub paths: Vec<String>,
    pub warnings: Vec<String>,
}

/// Scanner for finding candidate files under the configured include roots.
///
/// Traversal is sorted so two runs over an unchanged tree produce an
/// identical ordered list.
pub struct FileScanner {
    repo_root: PathBuf,
    include_roots: Vec<String>,
    extensions: HashSet<String>,
    prune_names: HashSet<String>,
    /// Exact repo-relative output directories, never descended into. Exact
    /// paths, not name matches: an output dir nested inside a source tree
    /// must not shadow its siblings.
    output_dirs: HashSet<String>,
    exclude_patterns: Vec<Regex>,
}

impl FileScanner {
    pub fn new(repo_root: impl AsRef<Path>, config: &Config) -> Self {
        let prune_names: HashSet<String> =
            config.prune_directories.iter().cloned().collect();

        let mut output_dirs = HashSet::new();
        let configured = config
            .output_dir
            .trim_start_matches("./")
            .trim_matches('/');
        if !configured.is_empty() && configured != "." {
            output_dirs.insert(configured.to_string());
        }

        let exclude_patterns = config
            .exclude_globs
            .iter()
            .filter_map(|glob| match Regex::new(&glob_to_regex(glob)) {
                Ok(regex) => Some(regex),
                Err(err) => {
                    log::warn!("ignoring unusable exclude glob {glob:?}: {err}");
                    None
                }
            })
            .collect();

        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            include_roots: config.include_roots.clone(),
            extensions: config.extensions.iter().map(|e| e.to_lowercase()).collect(),
            prune_names,
            output_dirs,
            exclude_patterns,
        }
    }

    /// Also prune a resolved output directory (it may differ from the
    /// configured one when `--output` overrides it or isolation namespaces
    /// it).
    pub fn exclude_output_dir(mut self, output_dir: &Path) -> Self {
        if let Ok(rel) = output_dir.strip_prefix(&self.repo_root) {
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if !rel.is_empty() {
                self.output_dirs.insert(rel);
            }
        }
        self
    }

    pub fn scan(&self) -> ScanOutcome {
        let mut paths: BTreeSet<String> = BTreeSet::new();
        let mut warnings = Vec::new();

        for include_root in &self.include_roots {
            let root = if include_root == "." {
                self.repo_root.clone()
            } else {
                self.repo_root.join(include_root)
            };
            if !root.exists() {
                warnings.push(format!("include root missing: {include_root}"));
                continue;
            }

            let walker = WalkDir::new(&root)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| self.keep_entry(entry.path(), entry.file_type().is_dir()));

            for result in walker {
                let entry = match result {
                    Ok(entry) => entry,
                    Err(err) => {
                        warnings.push(format!("unreadable entry: {err}"));
                        continue;
                    }
                };
                if !entry.file_type().is_file() {
                    continue;
                }
                let path = entry.path();
                if !self.has_allowed_extension(path) {
                    continue;
                }
                if let Some(rel) = self.relative(path) {
                    if !self.is_excluded(&rel, false) {
                        paths.insert(rel);
                    }
                }
            }
        }

        ScanOutcome {
            paths: paths.into_iter().collect(),
            warnings,
        }
    }

    fn keep_entry(&self, path: &Path, is_dir: bool) -> bool {
        if !is_dir {
            return true;
        }
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if self.prune_names.contains(name) {
                return false;
            }
        }
        match self.relative(path) {
            // The walk root itself resolves to an empty relative path.
            Some(rel) if !rel.is_empty() => {
                !self.output_dirs.contains(&rel) && !self.is_excluded(&rel, true)
            }
            _ => true,
        }
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.contains(&ext.to_lowercase()))
            .unwrap_or(false)
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.repo_root).ok()?;
        let text = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        Some(text)
    }

    /// Directory paths are matched with a trailing slash so a glob like
    /// `**/dist/**` also prunes the directory itself.
    fn is_excluded(&self, rel: &str, is_dir: bool) -> bool {
        let candidate = if is_dir {
            format!("{rel}/")
        } else {
            rel.to_string()
        };
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(&candidate))
    }
}

/// Translate a simple `*`/`**` glob into an anchored regex: `**` matches
/// across separators, `*` within one path segment.
fn glob_to_regex(glob: &str) -> String {
    let mut out = String::from("^");
    let mut chars = glob.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '.' | '^' | '$' | '|' | '(' | ')' | '[' | ']' | '{' | '}' | '+' | '?' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            other => out.push(other),
        }
    }
    out.push('$');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use quarry_config::Config;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, content).expect("write fixture");
    }

    #[test]
    fn glob_translation() {
        assert_eq!(glob_to_regex("**/dist/**"), "^.*/dist/.*$");
        assert_eq!(glob_to_regex("*.min.js"), "^[^/]*\\.min\\.js$");
    }

    #[test]
    fn scan_is_sorted_filtered_and_deterministic() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "src/b.ts", "export const b = 1;\n");
        write(dir.path(), "src/a.ts", "export const a = 1;\n");
        write(dir.path(), "src/ignore.bin", "binary\n");
        write(dir.path(), "node_modules/pkg/index.js", "module.exports = {};\n");
        write(dir.path(), "web/dist/bundle.js", "var x;\n");
        write(dir.path(), "docs/guide.md", "# Guide\n");

        let mut config = Config::default();
        config.exclude_globs = vec!["**/dist/**".to_string()];

        let scanner = FileScanner::new(dir.path(), &config);
        let first = scanner.scan();
        assert_eq!(
            first.paths,
            vec!["docs/guide.md", "src/a.ts", "src/b.ts"]
        );
        assert!(first.warnings.is_empty());

        let second = scanner.scan();
        assert_eq!(first.paths, second.paths);
    }

    #[test]
    fn missing_include_root_warns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config.include_roots = vec!["src".to_string(), "missing".to_string()];
        write(dir.path(), "src/a.ts", "const a = 1;\n");

        let outcome = FileScanner::new(dir.path(), &config).scan();
        assert_eq!(outcome.paths, vec!["src/a.ts"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("missing"));
    }

    #[test]
    fn output_dir_is_never_scanned() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "src/a.ts", "const a = 1;\n");
        write(dir.path(), ".quarry/manifest.json", "{}\n");

        let config = Config::default();
        let outcome = FileScanner::new(dir.path(), &config).scan();
        assert_eq!(outcome.paths, vec!["src/a.ts"]);
    }

    #[test]
    fn nested_output_dir_does_not_shadow_siblings() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "backend/src/routes/playback.ts", "const a = 1;\n");
        write(dir.path(), "backend/src/util/state.ts", "const b = 1;\n");
        write(dir.path(), "backend/idx/manifest.json", "{}\n");
        write(dir.path(), "docs/guide.md", "# Guide\n");

        let mut config = Config::default();
        config.output_dir = "backend/idx".to_string();

        let outcome = FileScanner::new(dir.path(), &config).scan();
        assert_eq!(
            outcome.paths,
            vec![
                "backend/src/routes/playback.ts",
                "backend/src/util/state.ts",
                "docs/guide.md"
            ]
        );
    }

    #[test]
    fn resolved_output_dir_is_pruned_by_exact_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        write(dir.path(), "backend/src/a.ts", "const a = 1;\n");
        write(dir.path(), "backend/idx/manifest.json", "{}\n");

        let config = Config::default();
        let outcome = FileScanner::new(dir.path(), &config)
            .exclude_output_dir(&dir.path().join("backend/idx"))
            .scan();
        assert_eq!(outcome.paths, vec!["backend/src/a.ts"]);
    }
}
