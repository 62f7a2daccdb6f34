//! Pick-to-contract matching.
//!
//! Text matching between a feed pick (team names, selection string)
//! and the exchange catalog (tickers, titles). The catalog contracts
//! for one game share an event group; matching finds the group whose
//! contracts cover BOTH teams of the pick, then selects the specific
//! contract for the picked team within it. Both-team verification is
//! what keeps "Boston" from hitting every Boston game on the board.
//!
//! Professional teams resolve through the ticker-suffix alias table;
//! college teams have no codes and fall back to whole-word matching
//! against the suffix and title.

pub mod aliases;

use std::collections::HashMap;
use tracing::debug;

use crate::types::{BetType, Contract, Pick, Side};

/// A matched contract and the side the pick implies on it.
#[derive(Debug, Clone, Copy)]
pub struct MatchOutcome<'a> {
    pub contract: &'a Contract,
    pub side: Side,
}

pub struct PickMatcher;

impl PickMatcher {
    /// Find the contract (and side) for a pick, or `None`.
    ///
    /// Deterministic: the same pick against the same catalog slice
    /// always yields the same outcome. Group order follows catalog
    /// discovery order, reordered stably so winner markets are
    /// examined before spread, spread before total.
    pub fn find_market<'a>(&self, pick: &Pick, contracts: &'a [Contract]) -> Option<MatchOutcome<'a>> {
        let selection_lower = pick.selection.to_lowercase();
        let home_lower = pick.home_team.to_lowercase();
        let away_lower = pick.away_team.to_lowercase();
        let pick_sport = pick.normalized_sport();

        // Untagged contracts pass the sport filter; a wrong exclusion
        // costs a trade, a wrong inclusion is caught by team matching.
        let in_sport: Vec<&Contract> = contracts
            .iter()
            .filter(|c| c.sport.is_none() || c.sport == pick_sport)
            .collect();

        debug!(
            selection = %pick.selection,
            sport = ?pick_sport,
            total = contracts.len(),
            in_sport = in_sport.len(),
            "matching pick"
        );

        let mut groups: Vec<(&str, Vec<&'a Contract>)> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();
        for contract in in_sport {
            let key = contract.group_key();
            match index.get(key) {
                Some(&i) => groups[i].1.push(contract),
                None => {
                    index.insert(key, groups.len());
                    groups.push((key, vec![contract]));
                }
            }
        }
        groups.sort_by_key(|(key, _)| BetType::from_ticker(key).priority());

        for (key, group) in &groups {
            let title = group[0].title.to_lowercase().replace("winner?", "");
            if !title_matches_both_teams(&title, &home_lower, &away_lower, group) {
                continue;
            }
            debug!(event = key, title = %title, "both-teams hit");

            // Strategy 1: suffix alias keywords appear in the selection.
            for contract in group.iter() {
                let kws = aliases::keywords(&contract.ticker_suffix());
                if kws.iter().any(|kw| selection_lower.contains(kw)) {
                    return Some(MatchOutcome {
                        contract,
                        side: determine_side(pick, contract),
                    });
                }
            }
            // Strategy 2: suffix itself appears in the selection text.
            for contract in group.iter() {
                let sfx = contract.ticker_suffix().to_lowercase();
                if selection_lower.contains(&sfx) {
                    return Some(MatchOutcome {
                        contract,
                        side: determine_side(pick, contract),
                    });
                }
            }
            // Strategy 3: "AWAY at HOME" title position.
            if let Some(at_idx) = title.find(" at ") {
                let away_part = &title[..at_idx];
                let pick_is_away = significant_words(&selection_lower)
                    .any(|w| away_part.contains(w));
                for contract in group.iter() {
                    let sfx = contract.ticker_suffix();
                    let sfx_matches_away = aliases::keywords(&sfx)
                        .iter()
                        .any(|kw| away_lower.contains(kw))
                        || away_lower.contains(&sfx.to_lowercase());
                    if pick_is_away == sfx_matches_away {
                        return Some(MatchOutcome {
                            contract,
                            side: determine_side(pick, contract),
                        });
                    }
                }
            }
            // Last resort: first contract of the verified game.
            return Some(MatchOutcome {
                contract: group[0],
                side: determine_side(pick, group[0]),
            });
        }

        debug!(selection = %pick.selection, groups = groups.len(), "no match");
        None
    }
}

/// Words of 4+ characters, the unit of college-name matching.
fn significant_words(s: &str) -> impl Iterator<Item = &str> {
    s.split_whitespace().filter(|w| w.len() >= 4)
}

/// Does this event group cover both teams of the pick?
///
/// Pro path: some suffix in the group matches home AND some suffix
/// matches away. College path: the title contains a significant word
/// from each team name.
fn title_matches_both_teams(
    title: &str,
    home_lower: &str,
    away_lower: &str,
    group: &[&Contract],
) -> bool {
    let suffixes: Vec<String> = group.iter().map(|c| c.ticker_suffix()).collect();
    let home_hit = suffixes
        .iter()
        .any(|sfx| aliases::team_matches_suffix(home_lower, sfx));
    let away_hit = suffixes
        .iter()
        .any(|sfx| aliases::team_matches_suffix(away_lower, sfx));
    if home_hit && away_hit {
        return true;
    }

    let home_word = significant_words(home_lower).any(|w| title.contains(w));
    let away_word = significant_words(away_lower).any(|w| title.contains(w));
    home_word && away_word
}

/// YES when the contract resolves for the picked team, NO otherwise.
fn determine_side(pick: &Pick, contract: &Contract) -> Side {
    let selection_lower = pick.selection.to_lowercase();
    let sfx = contract.ticker_suffix();

    let kws = aliases::keywords(&sfx);
    if !kws.is_empty() {
        return if kws.iter().any(|kw| selection_lower.contains(kw)) {
            Side::Yes
        } else {
            Side::No
        };
    }

    if selection_lower.contains(&sfx.to_lowercase()) {
        return Side::Yes;
    }

    // "AWAY at HOME" title: picked team named before " at " means the
    // contract is for the away team.
    let title = contract.title.to_lowercase();
    if let Some(at_idx) = title.find(" at ") {
        let away_part = &title[..at_idx];
        if significant_words(&selection_lower).any(|w| away_part.contains(w)) {
            return Side::Yes;
        }
    }
    Side::No
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
