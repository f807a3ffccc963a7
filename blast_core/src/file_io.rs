//! # File I/O Module
//!
//! Round logs, loading schemes and design configs on disk:
//! - **Atomic saves**: write a sibling `.tmp`, sync, rename over the target
//! - **Log locking**: one writer per `.trn` log, even across machines on a
//!   shared drive
//! - **Format check**: logs written by a newer build are refused
//!
//! ## File Formats
//!
//! - Round logs: `.trn` files containing JSON, guarded by a `.trn.lock` file
//! - Loading schemes: JSON, shared by every round designed afterwards
//! - Design config: TOML (see [`DesignConfig`])
//!
//! ## Example
//!
//! ```rust,no_run
//! use blast_core::file_io::{load_round_log_or_new, save_round_log, FileLock};
//! use std::path::Path;
//!
//! let path = Path::new("rounds.trn");
//!
//! // Hold the lock across the whole read-modify-write
//! let lock = FileLock::acquire(path, "shiftboss").unwrap();
//! let log = load_round_log_or_new(path).unwrap();
//! save_round_log(&log, path).unwrap();
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::config::DesignConfig;
use crate::errors::{DesignError, DesignResult};
use crate::explosives::LoadingScheme;
use crate::round_log::{RoundLog, LOG_FORMAT};

/// Who holds a round-log lock, as recorded in the `.trn.lock` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockHolder {
    pub user: String,
    pub pid: u32,
    pub since: DateTime<Utc>,
}

impl LockHolder {
    fn describe(&self) -> String {
        format!("{} (pid {})", self.user, self.pid)
    }
}

/// Exclusive write access to a round log.
///
/// The OS lock (fs2) on the `.trn.lock` sidecar is the authority; it is
/// released by the OS if the process dies, so there are no stale locks to
/// clean up. The sidecar's contents only name the holder for error messages.
/// The sidecar stays on disk and is emptied on release.
///
/// The log itself is not locked directly because atomic saves replace it
/// with a new file.
pub struct FileLock {
    file: File,
    pub holder: LockHolder,
}

impl FileLock {
    /// Take the lock for `log_path`, failing at once if someone else has it.
    ///
    /// # Returns
    ///
    /// * `Ok(FileLock)` - Lock held until dropped
    /// * `Err(DesignError::FileLocked)` - Another process holds the lock
    /// * `Err(DesignError::FileError)` - The sidecar could not be opened or written
    pub fn acquire(log_path: &Path, user: impl Into<String>) -> DesignResult<Self> {
        let lock_path = sidecar_path(log_path, "lock");
        let io_err = |op: &str, e: std::io::Error| {
            DesignError::file_error(op, lock_path.display().to_string(), e.to_string())
        };

        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| io_err("open lock", e))?;

        if file.try_lock_exclusive().is_err() {
            let holder = read_holder(&mut file);
            tracing::debug!(path = %log_path.display(), ?holder, "round log busy");
            return Err(DesignError::file_locked(
                log_path.display().to_string(),
                holder
                    .as_ref()
                    .map(LockHolder::describe)
                    .unwrap_or_else(|| "another process".to_string()),
                holder
                    .map(|h| h.since.to_rfc3339())
                    .unwrap_or_else(|| "unknown".to_string()),
            ));
        }

        let holder = LockHolder {
            user: user.into(),
            pid: std::process::id(),
            since: Utc::now(),
        };
        let json = serde_json::to_vec(&holder).map_err(|e| DesignError::SerializationError {
            reason: e.to_string(),
        })?;
        file.set_len(0).map_err(|e| io_err("write lock", e))?;
        file.seek(SeekFrom::Start(0)).map_err(|e| io_err("write lock", e))?;
        file.write_all(&json).map_err(|e| io_err("write lock", e))?;
        file.sync_all().map_err(|e| io_err("sync lock", e))?;

        Ok(FileLock { file, holder })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.set_len(0);
        let _ = FileExt::unlock(&self.file);
    }
}

/// Best-effort read of the holder recorded in a busy lock file.
fn read_holder(file: &mut File) -> Option<LockHolder> {
    let mut contents = String::new();
    file.seek(SeekFrom::Start(0)).ok()?;
    file.read_to_string(&mut contents).ok()?;
    serde_json::from_str(&contents).ok()
}

/// `rounds.trn` -> `rounds.trn.<suffix>`
fn sidecar_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

fn read_file(path: &Path, operation: &str) -> DesignResult<String> {
    fs::read_to_string(path)
        .map_err(|e| DesignError::file_error(operation, path.display().to_string(), e.to_string()))
}

/// Write `contents` through a synced sibling temp file and a rename.
fn write_atomic(path: &Path, contents: &[u8]) -> DesignResult<()> {
    let tmp_path = sidecar_path(path, "tmp");
    let tmp_err = |op: &str, e: std::io::Error| {
        let _ = fs::remove_file(&tmp_path);
        DesignError::file_error(op, tmp_path.display().to_string(), e.to_string())
    };

    let mut tmp = File::create(&tmp_path).map_err(|e| tmp_err("create temp file", e))?;
    tmp.write_all(contents).map_err(|e| tmp_err("write temp file", e))?;
    tmp.sync_all().map_err(|e| tmp_err("sync temp file", e))?;
    drop(tmp);

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        DesignError::file_error("replace", path.display().to_string(), e.to_string())
    })
}

fn save_json<T: Serialize>(value: &T, path: &Path) -> DesignResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(|e| DesignError::SerializationError {
        reason: e.to_string(),
    })?;
    write_atomic(path, &json)
}

fn load_json<T: DeserializeOwned>(path: &Path) -> DesignResult<T> {
    let contents = read_file(path, "read")?;
    serde_json::from_str(&contents).map_err(|e| DesignError::SerializationError {
        reason: format!("Invalid JSON in {}: {}", path.display(), e),
    })
}

/// Save a round log atomically.
///
/// Callers that read, modify and save should hold a [`FileLock`] throughout.
pub fn save_round_log(log: &RoundLog, path: &Path) -> DesignResult<()> {
    save_json(log, path)?;
    tracing::info!(path = %path.display(), rounds = log.round_count(), "round log saved");
    Ok(())
}

/// Load a round log.
///
/// # Returns
///
/// * `Ok(RoundLog)` - Successfully loaded log
/// * `Err(DesignError::VersionMismatch)` - Written by a newer format
/// * `Err(DesignError::SerializationError)` - Invalid JSON
/// * `Err(DesignError::FileError)` - I/O error
pub fn load_round_log(path: &Path) -> DesignResult<RoundLog> {
    let log: RoundLog = load_json(path)?;
    if log.meta.format == 0 || log.meta.format > LOG_FORMAT {
        return Err(DesignError::VersionMismatch {
            file_version: log.meta.format.to_string(),
            expected_version: LOG_FORMAT.to_string(),
        });
    }
    Ok(log)
}

/// Load a round log, or start an empty one if the file does not exist yet.
pub fn load_round_log_or_new(path: &Path) -> DesignResult<RoundLog> {
    if path.exists() {
        load_round_log(path)
    } else {
        tracing::debug!(path = %path.display(), "no round log yet, starting a new one");
        Ok(RoundLog::new())
    }
}

/// Save the loading scheme.
pub fn save_scheme(scheme: &LoadingScheme, path: &Path) -> DesignResult<()> {
    save_json(scheme, path)
}

/// Load the loading scheme.
///
/// A missing file yields the reference scheme. A file that is not valid JSON,
/// or that holds negative or non-finite charges, is logged and also replaced
/// by the reference scheme.
pub fn load_scheme(path: &Path) -> DesignResult<LoadingScheme> {
    if !path.exists() {
        return Ok(LoadingScheme::default());
    }
    let loaded = load_json::<LoadingScheme>(path).and_then(|scheme| {
        scheme.validate()?;
        Ok(scheme)
    });
    match loaded {
        Ok(scheme) => Ok(scheme),
        Err(DesignError::SerializationError { reason }) | Err(DesignError::InvalidConfig { reason, .. }) => {
            tracing::warn!(path = %path.display(), %reason, "loading scheme unusable, using defaults");
            Ok(LoadingScheme::default())
        }
        Err(e) => Err(e),
    }
}

/// Load a TOML design config; a missing file yields the reference config.
pub fn load_config(path: &Path) -> DesignResult<DesignConfig> {
    if !path.exists() {
        return Ok(DesignConfig::default());
    }
    DesignConfig::from_toml_str(&read_file(path, "read config")?)
}
