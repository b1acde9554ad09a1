use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub const LOCK_FILE: &str = ".index.lock";

/// A lock older than this is treated as abandoned and reclaimed.
pub const LOCK_STALE: Duration = Duration::from_secs(600);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockPayload {
    pub pid: u32,
    pub started_at_ms: u64,
    pub cwd: String,
}

/// Exclusive build lock for one output directory. Released on drop, on both
/// success and error paths.
pub struct BuildLock {
    path: PathBuf,
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            log::warn!("failed to remove build lock {}: {err}", self.path.display());
        }
    }
}

impl BuildLock {
    /// Acquire the lock via exclusive file creation. A fresh foreign lock is
    /// a hard error telling the operator to intervene; a stale one is
    /// reclaimed automatically.
    pub fn acquire(output_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(LOCK_FILE);

        for attempt in 0..2 {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    let payload = LockPayload {
                        pid: std::process::id(),
                        started_at_ms: unix_now_ms(),
                        cwd: std::env::current_dir()
                            .map(|dir| dir.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                    };
                    file.write_all(serde_json::to_string_pretty(&payload)?.as_bytes())?;
                    return Ok(Self { path });
                }
                Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                    let holder = read_payload(&path);
                    let age = holder
                        .as_ref()
                        .map(|payload| {
                            Duration::from_millis(
                                unix_now_ms().saturating_sub(payload.started_at_ms),
                            )
                        })
                        // Unparseable payload: treat as abandoned.
                        .unwrap_or(LOCK_STALE);

                    if age < LOCK_STALE {
                        return Err(IndexerError::LockHeld {
                            path,
                            pid: holder.map(|payload| payload.pid).unwrap_or(0),
                            age_secs: age.as_secs(),
                        });
                    }
                    log::warn!(
                        "reclaiming stale build lock {} (age {}s, attempt {attempt})",
                        path.display(),
                        age.as_secs()
                    );
                    let _ = std::fs::remove_file(&path);
                }
                Err(err) => return Err(err.into()),
            }
        }

        Err(IndexerError::LockHeld {
            path,
            pid: 0,
            age_secs: 0,
        })
    }
}

fn read_payload(path: &Path) -> Option<LockPayload> {
    let raw = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&raw).ok()
}

pub(crate) fn unix_now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
