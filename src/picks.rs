//! Prediction feed.
//!
//! Picks arrive as dated JSON files, `predictions-YYYY-MM-DD.json`
//! plus an optional `predictions-early-YYYY-MM-DD.json` sibling
//! written hours earlier. The local directory is authoritative; when
//! it has nothing for today the feed falls back to the shared object
//! store over HTTP.
//!
//! Regular and early picks for the same game are merged keeping the
//! higher confidence, then filtered by the confidence floor, sorted
//! best-first, and capped at the per-day maximum.

use anyhow::{Context, Result};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::types::Pick;

/// Files smaller than this are header-only stubs from an aborted
/// prediction run.
const MIN_FILE_BYTES: u64 = 100;

/// Feed files are either a bare array or an envelope.
#[derive(Deserialize)]
#[serde(untagged)]
enum FeedFile {
    Envelope { picks: Vec<Pick> },
    Bare(Vec<Pick>),
}

impl FeedFile {
    fn into_picks(self) -> Vec<Pick> {
        match self {
            FeedFile::Envelope { picks } => picks,
            FeedFile::Bare(picks) => picks,
        }
    }
}

/// Object-store fallback for hosts without a local feed directory.
pub struct RemoteFeed {
    pub base_url: String,
    pub token: Secret<String>,
    pub bucket: String,
}

pub struct PickFeed {
    picks_dir: PathBuf,
    min_confidence: f64,
    max_picks: usize,
    remote: Option<RemoteFeed>,
    http: reqwest::Client,
}

impl PickFeed {
    pub fn new(
        picks_dir: impl Into<PathBuf>,
        min_confidence: f64,
        max_picks: usize,
        remote: Option<RemoteFeed>,
    ) -> Self {
        Self {
            picks_dir: picks_dir.into(),
            min_confidence,
            max_picks,
            remote,
            http: reqwest::Client::new(),
        }
    }

    /// Today's feed date, in the machine's local zone: games are
    /// scheduled on local calendars, not UTC ones.
    pub fn today() -> String {
        chrono::Local::now().format("%Y-%m-%d").to_string()
    }

    /// Load today's best picks. An empty result is a quiet day, not an
    /// error.
    pub async fn load(&self) -> Result<Vec<Pick>> {
        let mut picks = self.load_local()?;
        if picks.is_empty() {
            if let Some(remote) = &self.remote {
                picks = self.load_remote(remote, &Self::today()).await;
            }
        }
        Ok(self.select_best(picks))
    }

    /// Newest dated local file (plus its early sibling).
    fn load_local(&self) -> Result<Vec<Pick>> {
        let Some(date) = newest_feed_date(&self.picks_dir)? else {
            debug!(dir = %self.picks_dir.display(), "no local feed files");
            return Ok(Vec::new());
        };

        let mut picks = Vec::new();
        // Regular before early: the merge keeps the first entry on
        // equal confidence, and regular picks are fresher.
        for name in [
            format!("predictions-{date}.json"),
            format!("predictions-early-{date}.json"),
        ] {
            let path = self.picks_dir.join(&name);
            match read_feed_file(&path) {
                Ok(Some(loaded)) => {
                    info!(file = %name, count = loaded.len(), "loaded picks");
                    picks.extend(loaded);
                }
                Ok(None) => {}
                Err(e) => warn!(file = %name, error = %e, "unreadable feed file"),
            }
        }
        Ok(picks)
    }

    async fn load_remote(&self, remote: &RemoteFeed, date: &str) -> Vec<Pick> {
        info!(date, "no local picks — trying the object store");
        for name in [
            format!("predictions-{date}.json"),
            format!("predictions-early-{date}.json"),
        ] {
            let url = format!(
                "{}/storage/v1/object/{}/{}",
                remote.base_url.trim_end_matches('/'),
                remote.bucket,
                name
            );
            let response = self
                .http
                .get(&url)
                .header("apikey", remote.token.expose_secret())
                .bearer_auth(remote.token.expose_secret())
                .send()
                .await;
            let response = match response {
                Ok(r) if r.status().is_success() => r,
                Ok(r) => {
                    debug!(file = %name, status = %r.status(), "remote feed miss");
                    continue;
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "remote feed fetch failed");
                    continue;
                }
            };
            match response.json::<FeedFile>().await {
                Ok(feed) => {
                    let picks = feed.into_picks();
                    if !picks.is_empty() {
                        info!(file = %name, count = picks.len(), "loaded picks from object store");
                        return picks;
                    }
                }
                Err(e) => warn!(file = %name, error = %e, "remote feed parse failed"),
            }
        }
        Vec::new()
    }

    /// Merge, filter, rank, cap.
    fn select_best(&self, picks: Vec<Pick>) -> Vec<Pick> {
        let mut best: Vec<Pick> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();
        for pick in picks {
            let key = merge_key(&pick);
            match index.get(&key) {
                Some(&i) => {
                    if pick.confidence > best[i].confidence {
                        best[i] = pick;
                    }
                }
                None => {
                    index.insert(key, best.len());
                    best.push(pick);
                }
            }
        }

        best.retain(|p| p.confidence >= self.min_confidence);
        best.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
        });
        best.truncate(self.max_picks);
        best
    }
}

/// Game identity for the regular/early merge. Coarser than the ledger
/// key on purpose: both files describe the same game with different
/// pick ids.
fn merge_key(pick: &Pick) -> String {
    if let Some(gid) = &pick.game_id {
        return gid.clone();
    }
    if let Some(id) = &pick.id {
        return id.clone();
    }
    format!("{}|{}", pick.home_team, pick.away_team)
}

/// Date of the newest regular feed file that is big enough to be real.
fn newest_feed_date(dir: &Path) -> Result<Option<String>> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("reading feed dir {}", dir.display()))
        }
    };

    let mut dates: Vec<String> = Vec::new();
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        let Some(date) = feed_file_date(name) else {
            continue;
        };
        let big_enough = entry
            .metadata()
            .map(|m| m.len() > MIN_FILE_BYTES)
            .unwrap_or(false);
        if big_enough {
            dates.push(date);
        }
    }
    dates.sort();
    Ok(dates.pop())
}

/// Extract the date from `predictions-YYYY-MM-DD.json`; early files
/// never drive date selection.
fn feed_file_date(name: &str) -> Option<String> {
    let rest = name.strip_prefix("predictions-")?;
    let date = rest.strip_suffix(".json")?;
    if date.len() != 10 {
        return None;
    }
    let ok = date
        .char_indices()
        .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    ok.then(|| date.to_string())
}

fn read_feed_file(path: &Path) -> Result<Option<Vec<Pick>>> {
    let raw = match fs::read_to_string(path) {
        Ok(r) => r,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let feed: FeedFile =
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(feed.into_picks()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn pick_json(game_id: &str, selection: &str, confidence: f64) -> serde_json::Value {
        serde_json::json!({
            "game_id": game_id,
            "sport": "NBA",
            "league": "NBA",
            "home_team": "Boston Celtics",
            "away_team": "Miami Heat",
            "pick": selection,
            "confidence": confidence,
        })
    }

    fn write_feed(dir: &Path, name: &str, picks: Vec<serde_json::Value>) {
        // Padding keeps tiny fixtures above the stub-size floor.
        let body = serde_json::json!({ "picks": picks, "_pad": "x".repeat(120) });
        fs::write(dir.join(name), serde_json::to_string(&body).unwrap()).unwrap();
    }

    #[test]
    fn test_feed_file_date() {
        assert_eq!(
            feed_file_date("predictions-2026-02-21.json").as_deref(),
            Some("2026-02-21")
        );
        assert!(feed_file_date("predictions-early-2026-02-21.json").is_none());
        assert!(feed_file_date("predictions-21.json").is_none());
        assert!(feed_file_date("notes.txt").is_none());
    }

    #[tokio::test]
    async fn test_missing_dir_is_empty_feed() {
        let feed = PickFeed::new("/nonexistent/feed/dir", 57.0, 20, None);
        assert!(feed.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newest_file_wins() {
        let dir = tempdir().unwrap();
        write_feed(
            dir.path(),
            "predictions-2026-02-20.json",
            vec![pick_json("old", "Old Pick", 70.0)],
        );
        write_feed(
            dir.path(),
            "predictions-2026-02-21.json",
            vec![pick_json("new", "New Pick", 70.0)],
        );

        let feed = PickFeed::new(dir.path(), 57.0, 20, None);
        let picks = feed.load().await.unwrap();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].game_id.as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_stub_file_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("predictions-2026-02-21.json"), "{}").unwrap();

        let feed = PickFeed::new(dir.path(), 57.0, 20, None);
        assert!(feed.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bare_array_accepted() {
        let dir = tempdir().unwrap();
        let picks = serde_json::json!([pick_json("g1", "Boston Celtics", 61.0)]);
        let mut body = serde_json::to_string(&picks).unwrap();
        body.push_str(&" ".repeat(120));
        fs::write(dir.path().join("predictions-2026-02-21.json"), body).unwrap();

        let feed = PickFeed::new(dir.path(), 57.0, 20, None);
        assert_eq!(feed.load().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_merge_keeps_higher_confidence() {
        let dir = tempdir().unwrap();
        write_feed(
            dir.path(),
            "predictions-2026-02-21.json",
            vec![pick_json("g1", "Boston Celtics", 60.0)],
        );
        write_feed(
            dir.path(),
            "predictions-early-2026-02-21.json",
            vec![
                pick_json("g1", "Boston Celtics", 65.0),
                pick_json("g2", "Miami Heat", 58.0),
            ],
        );

        let feed = PickFeed::new(dir.path(), 57.0, 20, None);
        let picks = feed.load().await.unwrap();
        assert_eq!(picks.len(), 2);
        // g1 kept the early entry with the higher confidence, and the
        // result is sorted best-first.
        assert_eq!(picks[0].game_id.as_deref(), Some("g1"));
        assert_eq!(picks[0].confidence, 65.0);
        assert_eq!(picks[1].game_id.as_deref(), Some("g2"));
    }

    #[tokio::test]
    async fn test_confidence_floor_and_cap() {
        let dir = tempdir().unwrap();
        write_feed(
            dir.path(),
            "predictions-2026-02-21.json",
            vec![
                pick_json("g1", "A", 72.0),
                pick_json("g2", "B", 55.0), // below the floor
                pick_json("g3", "C", 64.0),
                pick_json("g4", "D", 61.0),
            ],
        );

        let feed = PickFeed::new(dir.path(), 57.0, 2, None);
        let picks = feed.load().await.unwrap();
        assert_eq!(picks.len(), 2);
        assert_eq!(picks[0].confidence, 72.0);
        assert_eq!(picks[1].confidence, 64.0);
    }
}
