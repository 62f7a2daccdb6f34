//! Executed-pick ledger.
//!
//! At-most-once is the one guarantee this process makes with real
//! money on the line. The ledger is the set of pick identity keys that
//! already produced an order, persisted as a JSON string array and
//! reloaded at startup. A missing file is a fresh start; a corrupt
//! file is tolerated with a warning rather than blocking trading,
//! accepting the risk of a duplicate over the certainty of a halt.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Idempotency store for executed pick keys.
pub trait Ledger: Send + Sync {
    fn contains(&self, key: &str) -> bool;
    fn add(&mut self, key: String);
    /// Persist the full set. In-memory state is already current; a
    /// flush failure loses durability, not correctness within the run.
    fn flush(&self) -> Result<()>;
}

/// JSON-file-backed ledger.
pub struct FileLedger {
    path: PathBuf,
    keys: HashSet<String>,
}

impl FileLedger {
    /// Load from `path`, tolerating absence and corruption.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let keys = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<Vec<String>>(&raw) {
                Ok(list) => {
                    debug!(count = list.len(), path = %path.display(), "ledger loaded");
                    list.into_iter().collect()
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ledger unreadable — starting empty");
                    HashSet::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no ledger yet — starting empty");
                HashSet::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ledger unreadable — starting empty");
                HashSet::new()
            }
        };
        Self { path, keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Ledger for FileLedger {
    fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    fn add(&mut self, key: String) {
        self.keys.insert(key);
    }

    fn flush(&self) -> Result<()> {
        // Sorted so the file diffs cleanly between runs.
        let mut list: Vec<&String> = self.keys.iter().collect();
        list.sort();
        let json = serde_json::to_string_pretty(&list).context("serializing ledger")?;
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("creating ledger dir {}", dir.display()))?;
            }
        }
        fs::write(&self.path, json)
            .with_context(|| format!("writing ledger {}", self.path.display()))?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
