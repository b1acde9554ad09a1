use crate::config::{hex_string, Config, IsolationMode};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured VCS state at build time. Absent entirely when the repo root is
/// not under git.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitState {
    pub branch: String,
    pub head: String,
    pub dirty: bool,
}

/// Probe the live git state for a repo root. Returns `None` when git is
/// unavailable or the directory is not a work tree.
pub fn probe_git_state(repo_root: &Path) -> Option<GitState> {
    let head = git_stdout(repo_root, &["rev-parse", "HEAD"])?;
    let branch =
        git_stdout(repo_root, &["rev-parse", "--abbrev-ref", "HEAD"]).unwrap_or_default();
    let status = git_stdout(repo_root, &["status", "--porcelain"]).unwrap_or_default();
    Some(GitState {
        branch,
        head,
        dirty: !status.is_empty(),
    })
}

fn git_stdout(repo_root: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .arg("-C")
        .arg(repo_root)
        .args(args)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn git_metadata_dir(repo_root: &Path) -> Option<PathBuf> {
    let raw = git_stdout(repo_root, &["rev-parse", "--git-dir"])?;
    let path = PathBuf::from(raw);
    if path.is_absolute() {
        Some(path)
    } else {
        Some(repo_root.join(path))
    }
}

/// Sanitize a branch name into `[a-z0-9._-]` so it is safe as a directory
/// component. Empty or detached states collapse to "detached".
pub fn branch_slug(branch: Option<&str>) -> String {
    let raw = match branch {
        Some(name) if !name.is_empty() && name != "HEAD" => name,
        _ => return "detached".to_string(),
    };
    let slug: String = raw
        .to_lowercase()
        .chars()
        .map(|ch| {
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || matches!(ch, '.' | '_' | '-') {
                ch
            } else {
                '-'
            }
        })
        .collect();
    let trimmed = slug.trim_matches('-');
    if trimmed.is_empty() {
        "detached".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Short stable hash of (real repo root path, real git metadata dir path).
/// Distinguishes worktrees of the same repo that share a branch name.
pub fn worktree_hash(repo_root: &Path, git_dir: Option<&Path>, length: usize) -> String {
    let real_root = canonical_or_self(repo_root);
    let mut hasher = Sha256::new();
    hasher.update(real_root.to_string_lossy().as_bytes());
    hasher.update(b"\n");
    if let Some(dir) = git_dir {
        hasher.update(canonical_or_self(dir).to_string_lossy().as_bytes());
    }
    let digest = hasher.finalize();
    let hex = hex_string(&digest);
    let length = length.clamp(4, hex.len());
    hex[..length].to_string()
}

fn canonical_or_self(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Resolve the directory all artifacts live in.
///
/// An explicit override wins and gets no isolation namespace. Otherwise the
/// configured output root is used, namespaced per branch+worktree unless
/// isolation is disabled.
pub fn resolve_output_dir(
    repo_root: &Path,
    config: &Config,
    override_dir: Option<&Path>,
) -> Result<PathBuf> {
    if let Some(dir) = override_dir {
        return Ok(dir.to_path_buf());
    }

    let base = repo_root.join(&config.output_dir);
    match config.isolation.mode {
        IsolationMode::None => Ok(base),
        IsolationMode::BranchWorktree => {
            let state = probe_git_state(repo_root);
            let slug = branch_slug(state.as_ref().map(|s| s.branch.as_str()));
            let git_dir = git_metadata_dir(repo_root);
            let hash = worktree_hash(
                repo_root,
                git_dir.as_deref(),
                config.isolation.worktree_hash_length,
            );
            let namespace = format!("{slug}-{hash}");
            log::debug!("resolved isolation namespace {namespace}");
            Ok(base.join(namespace))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn branch_slug_sanitizes() {
        assert_eq!(branch_slug(Some("feature/ABC-123_new")), "feature-abc-123_new");
        assert_eq!(branch_slug(Some("main")), "main");
        assert_eq!(branch_slug(Some("HEAD")), "detached");
        assert_eq!(branch_slug(Some("///")), "detached");
        assert_eq!(branch_slug(None), "detached");
    }

    #[test]
    fn worktree_hash_is_stable_and_truncated() {
        let root = Path::new("/tmp/repo");
        let first = worktree_hash(root, None, 8);
        let second = worktree_hash(root, None, 8);
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);

        let other = worktree_hash(Path::new("/tmp/other"), None, 8);
        assert_ne!(first, other);
    }

    #[test]
    fn explicit_override_skips_isolation() {
        let config = Config::default();
        let resolved = resolve_output_dir(
            Path::new("/tmp/repo"),
            &config,
            Some(Path::new("/tmp/custom-out")),
        )
        .expect("resolve");
        assert_eq!(resolved, PathBuf::from("/tmp/custom-out"));
    }

    #[test]
    fn isolation_none_uses_shared_root() {
        let mut config = Config::default();
        config.isolation.mode = IsolationMode::None;
        let resolved =
            resolve_output_dir(Path::new("/tmp/repo"), &config, None).expect("resolve");
        assert_eq!(resolved, PathBuf::from("/tmp/repo/.quarry"));
    }

    #[test]
    fn branch_worktree_namespaces_under_output_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = Config::default();
        let resolved = resolve_output_dir(dir.path(), &config, None).expect("resolve");
        let parent = resolved.parent().expect("namespace parent");
        assert_eq!(parent, dir.path().join(".quarry"));
        let namespace = resolved
            .file_name()
            .and_then(|n| n.to_str())
            .expect("namespace component");
        // Not a git repo: slug falls back to "detached".
        assert!(namespace.starts_with("detached-"), "got {namespace}");
    }
}
