//! Size bound for the daemon log file.
//!
//! The detached process appends its stdout and stderr to one file. Once per
//! control-loop tick the file is checked; past `max_bytes` it is truncated in
//! place. Old content is discarded, not rotated.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Truncate `log_path` to zero bytes if its size exceeds `max_bytes`.
///
/// Returns `true` if the file was truncated, `false` if it was at or under
/// the threshold (or did not exist yet).
///
/// # Errors
/// Returns `io::Error` only on unexpected filesystem failures; a missing file
/// is skipped.
pub fn check_and_truncate(log_path: &Path, max_bytes: u64) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if size <= max_bytes {
        return Ok(false);
    }

    // The daemon's own descriptors are O_APPEND, so later writes land at the
    // new end of file instead of leaving a sparse hole.
    fs::OpenOptions::new()
        .write(true)
        .open(log_path)?
        .set_len(0)?;

    Ok(true)
}

/// Per-tick housekeeping for one log file.
#[derive(Debug, Clone)]
pub struct LogGuard {
    path: PathBuf,
    max_bytes: u64,
}

impl LogGuard {
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
        }
    }

    /// Run one check. Failures are logged and never stop the daemon.
    pub fn check(&self) -> bool {
        match check_and_truncate(&self.path, self.max_bytes) {
            Ok(true) => {
                tracing::info!(path = %self.path.display(), "cleaning up log file");
                true
            }
            Ok(false) => false,
            Err(err) => {
                tracing::warn!(path = %self.path.display(), error = %err, "log size check failed");
                false
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const LIMIT: u64 = 4 * 1024;

    fn make_log(dir: &TempDir, name: &str, size_bytes: usize) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, vec![b'x'; size_bytes]).unwrap();
        path
    }

    #[test]
    fn noop_when_file_under_threshold() {
        let dir = TempDir::new().unwrap();
        let log = make_log(&dir, "stumfixer.log", 1024);
        assert!(!check_and_truncate(&log, LIMIT).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), 1024);
    }

    #[test]
    fn noop_when_file_exactly_at_threshold() {
        let dir = TempDir::new().unwrap();
        let log = make_log(&dir, "stumfixer.log", LIMIT as usize);
        assert!(!check_and_truncate(&log, LIMIT).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), LIMIT);
    }

    #[test]
    fn truncates_to_empty_once_over_threshold() {
        let dir = TempDir::new().unwrap();
        let log = make_log(&dir, "stumfixer.log", LIMIT as usize + 1);
        assert!(check_and_truncate(&log, LIMIT).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
        assert!(
            fs::read_dir(dir.path()).unwrap().count() == 1,
            "truncation must not leave rotated copies behind"
        );
    }

    #[test]
    fn missing_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("nonexistent.log");
        assert!(!check_and_truncate(&log, LIMIT).unwrap());
        assert!(!log.exists(), "check must not create the file");
    }

    #[test]
    fn appends_after_truncation_start_at_offset_zero() {
        let dir = TempDir::new().unwrap();
        let log = make_log(&dir, "stumfixer.log", 0);
        let mut appender = fs::OpenOptions::new().append(true).open(&log).unwrap();
        appender.write_all(&vec![b'x'; LIMIT as usize + 10]).unwrap();

        assert!(check_and_truncate(&log, LIMIT).unwrap());
        appender.write_all(b"after\n").unwrap();
        assert_eq!(fs::read_to_string(&log).unwrap(), "after\n");
    }

    #[test]
    fn guard_reports_truncation() {
        let dir = TempDir::new().unwrap();
        let log = make_log(&dir, "stumfixer.log", LIMIT as usize * 2);
        let guard = LogGuard::new(&log, LIMIT);
        assert!(guard.check());
        assert!(!guard.check(), "second check sees an empty file");
    }
}
