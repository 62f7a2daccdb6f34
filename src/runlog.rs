//! Append-only run log.
//!
//! A plain-text trail of what the process did with money, separate
//! from the tracing output: it survives log-level changes and is the
//! file to read after the fact. Logging failures are swallowed; a full
//! disk must not stop trading.

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Append one timestamped line.
    pub fn line(&self, message: &str) {
        let stamped = format!("[{}] {}\n", Utc::now().to_rfc3339(), message);
        if let Err(e) = self.append(&stamped) {
            warn!(path = %self.path.display(), error = %e, "run log write failed");
        }
    }

    fn append(&self, text: &str) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(text.as_bytes())
    }
}
