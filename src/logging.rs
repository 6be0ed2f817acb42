//! Tracing subscriber setup.
//!
//! The dashboard owns the terminal, so log output always goes to a file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// `<cache dir>/netbars/netbars.log`, or the temp dir when there is no
/// cache dir.
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("netbars"))
        .unwrap_or_else(std::env::temp_dir)
        .join("netbars.log")
}

/// Installs the global subscriber writing to `log_file_path`, or to the
/// temp dir when that path cannot be created. With neither writable the
/// dashboard runs without a log. Returns the file actually used.
pub fn init_global(log_file_path: &Path) -> Result<Option<PathBuf>> {
    let candidates = [
        log_file_path.to_path_buf(),
        std::env::temp_dir().join("netbars.log"),
    ];

    let Some((used, log_file)) = open_first_writable(&candidates) else {
        eprintln!(
            "warning: cannot create log file {}, continuing without a log",
            log_file_path.display()
        );
        return Ok(None);
    };

    build_subscriber(log_file)
        .try_init()
        .context("installing the tracing subscriber")?;

    if used != log_file_path {
        tracing::warn!(requested = %log_file_path.display(), "Log file not writable, using {}", used.display());
    }
    Ok(Some(used))
}

/// The first candidate that can be created, parent directories included.
pub fn open_first_writable(candidates: &[PathBuf]) -> Option<(PathBuf, File)> {
    candidates.iter().find_map(|path| match create_log_file(path) {
        Ok(file) => Some((path.clone(), file)),
        Err(e) => {
            eprintln!("warning: {:#}", e);
            None
        }
    })
}

fn create_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("creating log file {}", path.display()))
}

/// File logging filtered by `RUST_LOG`, `info` when unset.
pub fn build_subscriber(log_file: File) -> impl tracing::Subscriber + Send + Sync {
    let env_filter = EnvFilter::builder()
        .with_default_directive(tracing::Level::INFO.into())
        .from_env_lossy();

    let fmt_layer = fmt::layer().with_ansi(false).with_writer(Arc::new(log_file));

    tracing_subscriber::registry().with(fmt_layer).with(env_filter)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn default_path_ends_with_the_log_name() {
        let path = default_log_path();
        assert_eq!(path.file_name().unwrap(), "netbars.log");
    }

    #[test]
    fn unwritable_log_path_falls_back_to_the_next_candidate() {
        let dir = tempfile::tempdir().unwrap();
        // a regular file where a directory is needed
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let unwritable = blocker.join("netbars").join("netbars.log");
        let fallback = dir.path().join("fallback").join("netbars.log");

        let (used, _file) = open_first_writable(&[unwritable, fallback.clone()]).unwrap();
        assert_eq!(used, fallback);
        assert!(fallback.exists());
    }

    #[test]
    fn no_writable_candidate_means_no_log() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "").unwrap();

        assert!(open_first_writable(&[blocker.join("a.log")]).is_none());
    }

    #[test]
    fn subscriber_writes_to_the_file() {
        let log_file = NamedTempFile::new().unwrap();
        let subscriber = build_subscriber(log_file.reopen().unwrap());

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("counter went backwards");
        });

        let contents = std::fs::read_to_string(log_file.path()).unwrap();
        assert!(contents.contains("WARN"));
        assert!(contents.contains("counter went backwards"));
    }
}
