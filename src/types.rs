//! Shared types for the PICKWIRE pipeline.
//!
//! These types form the data model used across all modules: picks from
//! the prediction feed, contracts from the exchange catalog, position
//! snapshots, and per-pick execution results. They are designed to be
//! stable so that exchange, matcher, and engine modules can depend on
//! them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Sport
// ---------------------------------------------------------------------------

/// Canonical sport/league tag for a pick or a catalog contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sport {
    Nba,
    Ncaab,
    Ncaaf,
    Nfl,
    Nhl,
    Mlb,
}

impl Sport {
    /// Normalize a loosely-formatted league/sport label.
    ///
    /// The feed writes anything from "NBA" to "College Basketball" to
    /// "cbb"; returns `None` for labels outside the supported set.
    pub fn from_label(label: &str) -> Option<Sport> {
        let u = label.to_uppercase();
        if u.contains("NBA") {
            return Some(Sport::Nba);
        }
        if u.contains("NCAAB") || u.contains("CBB") || u.contains("COLLEGE BASKETBALL") {
            return Some(Sport::Ncaab);
        }
        if u.contains("NCAAF") || u.contains("CFB") || u.contains("COLLEGE FOOTBALL") {
            return Some(Sport::Ncaaf);
        }
        if u.contains("NFL") {
            return Some(Sport::Nfl);
        }
        if u.contains("NHL") || u.contains("HOCKEY") {
            return Some(Sport::Nhl);
        }
        // College basketball is the most common collegiate sport on the
        // exchange, so bare "NCAA"/"College" resolves there.
        if u.contains("NCAA") || u.contains("COLLEGE") {
            return Some(Sport::Ncaab);
        }
        if u.contains("MLB") || u.contains("BASEBALL") {
            return Some(Sport::Mlb);
        }
        None
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sport::Nba => "NBA",
            Sport::Ncaab => "NCAAB",
            Sport::Ncaaf => "NCAAF",
            Sport::Nfl => "NFL",
            Sport::Nhl => "NHL",
            Sport::Mlb => "MLB",
        }
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Side
// ---------------------------------------------------------------------------

/// Which outcome of a binary contract a trade targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Wire value expected by the exchange order endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

// ---------------------------------------------------------------------------
// Bet type
// ---------------------------------------------------------------------------

/// Market flavor within an event. Winner markets are matched before
/// spread, spread before total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BetType {
    Winner,
    Spread,
    Total,
    Other,
}

impl BetType {
    /// Ranking priority for event-group ordering (lower matches first).
    pub fn priority(&self) -> u8 {
        match self {
            BetType::Winner => 0,
            BetType::Spread => 1,
            BetType::Total => 2,
            BetType::Other => 3,
        }
    }

    /// Classify an event-group or series ticker by its embedded marker.
    pub fn from_ticker(ticker: &str) -> BetType {
        let u = ticker.to_uppercase();
        if u.contains("GAME") {
            BetType::Winner
        } else if u.contains("SPREAD") {
            BetType::Spread
        } else if u.contains("TOTAL") {
            BetType::Total
        } else {
            BetType::Other
        }
    }
}

// ---------------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------------

/// One externally-produced prediction from the feed.
///
/// Immutable once read; the feed JSON calls the selection text `pick`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub game_id: Option<String>,
    #[serde(default)]
    pub sport: String,
    #[serde(default)]
    pub league: Option<String>,
    #[serde(default)]
    pub home_team: String,
    #[serde(default)]
    pub away_team: String,
    #[serde(rename = "pick")]
    pub selection: String,
    #[serde(default)]
    pub confidence: f64,
}

impl Pick {
    /// Stable identity key used for idempotency across runs.
    ///
    /// Explicit id wins, then the feed's game id, then a composite of
    /// sport, teams, and selection.
    pub fn identity_key(&self) -> String {
        if let Some(id) = &self.id {
            return id.clone();
        }
        if let Some(gid) = &self.game_id {
            return gid.clone();
        }
        format!(
            "{}-{}-{}-{}",
            self.sport, self.home_team, self.away_team, self.selection
        )
    }

    /// Sport tag normalized from the league label, falling back to the
    /// sport label.
    pub fn normalized_sport(&self) -> Option<Sport> {
        self.league
            .as_deref()
            .and_then(Sport::from_label)
            .or_else(|| Sport::from_label(&self.sport))
    }

    /// "away @ home" string for logs.
    pub fn matchup(&self) -> String {
        format!("{} @ {}", self.away_team, self.home_team)
    }
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// One open binary contract from the exchange catalog.
///
/// Ephemeral: refetched every cycle and never mutated locally. Prices
/// are integer cents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub ticker: String,
    pub title: String,
    /// Sport tag attached by the catalog; `None` for contracts that
    /// arrived via an untagged path.
    pub sport: Option<Sport>,
    pub yes_ask: i64,
    pub yes_bid: i64,
    pub no_ask: i64,
    pub no_bid: i64,
    pub close_time: Option<DateTime<Utc>>,
    /// Event-group id shared by sibling contracts of the same game.
    pub event_group: Option<String>,
}

impl Contract {
    /// Current ask for a side, in cents.
    pub fn ask(&self, side: Side) -> i64 {
        match side {
            Side::Yes => self.yes_ask,
            Side::No => self.no_ask,
        }
    }

    /// Last dash-separated ticker segment, uppercased.
    ///
    /// Ticker format: `KXNBAGAME-26FEB21HOUNYK-NYK`; the suffix is the
    /// team code for professional leagues.
    pub fn ticker_suffix(&self) -> String {
        self.ticker.rsplit('-').next().unwrap_or("").to_uppercase()
    }

    /// Grouping key: the event group when present, else the ticker
    /// itself (a group of one).
    pub fn group_key(&self) -> &str {
        self.event_group.as_deref().unwrap_or(&self.ticker)
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" (YES {}¢/{}¢ | NO {}¢/{}¢)",
            self.ticker, self.title, self.yes_bid, self.yes_ask, self.no_bid, self.no_ask,
        )
    }
}

// ---------------------------------------------------------------------------
// Position snapshot
// ---------------------------------------------------------------------------

/// Read-only snapshot of one open position, fetched once per cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub ticker: String,
    /// Signed quantity: positive = yes contracts held, negative = no.
    pub quantity: i64,
    pub close_time: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Execution result
// ---------------------------------------------------------------------------

/// Outcome classification for one pick in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Placed,
    Simulated,
    Skipped,
    Error,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionStatus::Placed => "placed",
            ExecutionStatus::Simulated => "simulated",
            ExecutionStatus::Skipped => "skipped",
            ExecutionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Created once per pick per cycle; never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub pick_id: String,
    pub selection: String,
    pub ticker: Option<String>,
    pub side: Option<Side>,
    pub stake_cents: i64,
    pub price_cents: i64,
    pub contract_count: i64,
    pub status: ExecutionStatus,
    pub reason: Option<String>,
    pub order_id: Option<String>,
}

impl ExecutionResult {
    /// A result for a pick that never reached sizing.
    pub fn skipped(pick: &Pick, reason: impl Into<String>) -> Self {
        Self {
            pick_id: pick.identity_key(),
            selection: pick.selection.clone(),
            ticker: None,
            side: None,
            stake_cents: 0,
            price_cents: 0,
            contract_count: 0,
            status: ExecutionStatus::Skipped,
            reason: Some(reason.into()),
            order_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Cycle summary
// ---------------------------------------------------------------------------

/// Counters for one orchestrator cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleSummary {
    pub picks_loaded: usize,
    pub placed: usize,
    pub simulated: usize,
    pub no_market: usize,
    pub skipped: usize,
    pub errors: usize,
    pub positions_swept: usize,
    pub contracts_in_catalog: usize,
}

impl CycleSummary {
    pub fn record(&mut self, result: &ExecutionResult) {
        match result.status {
            ExecutionStatus::Placed => self.placed += 1,
            ExecutionStatus::Simulated => self.simulated += 1,
            ExecutionStatus::Skipped => {
                if result.reason.as_deref() == Some("no match") {
                    self.no_market += 1;
                } else {
                    self.skipped += 1;
                }
            }
            ExecutionStatus::Error => self.errors += 1,
        }
    }
}

impl fmt::Display for CycleSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "picks={} placed={} simulated={} no_market={} skipped={} errors={} swept={}",
            self.picks_loaded,
            self.placed,
            self.simulated,
            self.no_market,
            self.skipped,
            self.errors,
            self.positions_swept,
        )
    }
}

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

#[cfg(test)]
impl Pick {
    /// A representative NBA pick for unit tests.
    pub fn sample() -> Self {
        Pick {
            id: None,
            game_id: Some("nba-2026-02-21-mia-bos".into()),
            sport: "NBA".into(),
            league: Some("NBA".into()),
            home_team: "Boston Celtics".into(),
            away_team: "Miami Heat".into(),
            selection: "Boston Celtics".into(),
            confidence: 61.5,
        }
    }
}

#[cfg(test)]
impl Contract {
    pub fn sample(ticker: &str, title: &str) -> Self {
        Contract {
            ticker: ticker.to_string(),
            title: title.to_string(),
            sport: Some(Sport::Nba),
            yes_ask: 55,
            yes_bid: 52,
            no_ask: 48,
            no_bid: 45,
            close_time: Some(Utc::now() + chrono::Duration::hours(6)),
            event_group: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
