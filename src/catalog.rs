//! Market catalog.
//!
//! Produces the flat list of open, tradeable contracts for the fixed
//! allow-list of sports series. Primary path queries the structured
//! listing per series ticker (winner series before spread before
//! total, so the matcher sees winner markets first). If that yields
//! nothing, a broad unfiltered listing is walked and filtered down by
//! ticker prefix. Both paths log which one produced the catalog.
//!
//! Women's and alternate-category leagues sharing a prefix with the
//! men's series are excluded by ticker pattern: the feed only predicts
//! the men's leagues.

use anyhow::Result;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::exchange::{ExchangeApi, ExchangeError, MarketsQuery};
use crate::types::{Contract, Sport};

// ---------------------------------------------------------------------------
// Series allow-list
// ---------------------------------------------------------------------------

/// One supported (series prefix, sport) pair.
#[derive(Debug, Clone, Copy)]
pub struct SeriesSpec {
    pub prefix: &'static str,
    pub sport: Sport,
}

/// Supported series, in matching priority order: winner markets first,
/// then spread, then total.
pub const GAME_SERIES: &[SeriesSpec] = &[
    SeriesSpec { prefix: "KXNBAGAME", sport: Sport::Nba },
    SeriesSpec { prefix: "KXNCAAMBGAME", sport: Sport::Ncaab },
    SeriesSpec { prefix: "KXNCAABGAME", sport: Sport::Ncaab },
    SeriesSpec { prefix: "KXNFLGAME", sport: Sport::Nfl },
    SeriesSpec { prefix: "KXNHLGAME", sport: Sport::Nhl },
    SeriesSpec { prefix: "KXMLBGAME", sport: Sport::Mlb },
    SeriesSpec { prefix: "KXNCAAFGAME", sport: Sport::Ncaaf },
    SeriesSpec { prefix: "KXNBASPREAD", sport: Sport::Nba },
    SeriesSpec { prefix: "KXNCAAMBSPREAD", sport: Sport::Ncaab },
    SeriesSpec { prefix: "KXNFLSPREAD", sport: Sport::Nfl },
    SeriesSpec { prefix: "KXNHLSPREAD", sport: Sport::Nhl },
    SeriesSpec { prefix: "KXNBATOTAL", sport: Sport::Nba },
    SeriesSpec { prefix: "KXNCAAMBTOTAL", sport: Sport::Ncaab },
    SeriesSpec { prefix: "KXNFLTOTAL", sport: Sport::Nfl },
    SeriesSpec { prefix: "KXNHLTOTAL", sport: Sport::Nhl },
];

/// Ticker markers for leagues the feed never predicts.
const EXCLUDED_MARKERS: &[&str] = &["NCAAWB", "WNBA", "WCBB", "WOMEN"];

/// Hard cap on cursor-following per walk; a misbehaving API must not
/// spin us forever.
const MAX_PAGES: usize = 25;
const SERIES_PAGE_LIMIT: u32 = 200;
const BROAD_PAGE_LIMIT: u32 = 1000;

/// Sport for a ticker that starts with a known series prefix.
pub fn sport_for_ticker(ticker: &str) -> Option<Sport> {
    let u = ticker.to_uppercase();
    GAME_SERIES
        .iter()
        .find(|s| u.starts_with(s.prefix))
        .map(|s| s.sport)
}

/// Whether a ticker (or its event group) belongs to an excluded league.
pub fn is_excluded_ticker(ticker: &str) -> bool {
    let u = ticker.to_uppercase();
    EXCLUDED_MARKERS.iter().any(|m| u.contains(m))
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub struct MarketCatalog {
    page_delay: Duration,
}

impl MarketCatalog {
    pub fn new(page_delay_ms: u64) -> Self {
        Self {
            page_delay: Duration::from_millis(page_delay_ms),
        }
    }

    /// Fetch the full catalog for this cycle.
    ///
    /// Returns an empty catalog without touching the network when the
    /// exchange is unconfigured; the orchestrator decides whether that
    /// is fatal.
    pub async fn refresh(&self, api: &dyn ExchangeApi) -> Result<Vec<Contract>> {
        if !api.is_configured() {
            debug!("exchange unconfigured — empty catalog");
            return Ok(Vec::new());
        }

        let mut all = Vec::new();
        for spec in GAME_SERIES {
            let contracts = self.fetch_series(api, spec).await;
            if !contracts.is_empty() {
                debug!(series = spec.prefix, count = contracts.len(), "series fetched");
            }
            all.extend(contracts);
        }

        if all.is_empty() {
            warn!("series listing returned 0 contracts — falling back to broad fetch with prefix filter");
            all = self.fetch_broad(api).await;
            info!(count = all.len(), "catalog refreshed via broad fallback");
        } else {
            info!(count = all.len(), "catalog refreshed via series listing");
        }

        Ok(dedupe_and_screen(all))
    }

    /// Walk one series listing, following the cursor.
    ///
    /// Errors end the walk but keep whatever pages already arrived; a
    /// single bad series never fails the cycle.
    async fn fetch_series(&self, api: &dyn ExchangeApi, spec: &SeriesSpec) -> Vec<Contract> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;

        for _page in 0..MAX_PAGES {
            let query = MarketsQuery {
                series_ticker: Some(spec.prefix.to_string()),
                limit: SERIES_PAGE_LIMIT,
                cursor: cursor.clone(),
            };
            let page = match api.markets_page(query).await {
                Ok(p) => p,
                Err(ExchangeError::RateLimited) => break,
                Err(e) => {
                    warn!(series = spec.prefix, error = %e, "series page failed");
                    break;
                }
            };

            let page_len = page.contracts.len();
            out.extend(page.contracts.into_iter().map(|mut c| {
                c.sport = Some(spec.sport);
                c
            }));
            cursor = page.cursor;

            if page_len < SERIES_PAGE_LIMIT as usize || cursor.is_none() {
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        out
    }

    /// Broad fallback: walk the unfiltered open-markets listing and
    /// keep only tickers under a known series prefix.
    async fn fetch_broad(&self, api: &dyn ExchangeApi) -> Vec<Contract> {
        let mut out = Vec::new();
        let mut cursor: Option<String> = None;

        for _page in 0..MAX_PAGES {
            let query = MarketsQuery {
                series_ticker: None,
                limit: BROAD_PAGE_LIMIT,
                cursor: cursor.clone(),
            };
            let page = match api.markets_page(query).await {
                Ok(p) => p,
                Err(ExchangeError::RateLimited) => break,
                Err(e) => {
                    warn!(error = %e, "broad page failed");
                    break;
                }
            };

            let page_len = page.contracts.len();
            out.extend(page.contracts.into_iter().filter_map(|mut c| {
                let sport = sport_for_ticker(&c.ticker)?;
                c.sport = Some(sport);
                Some(c)
            }));
            cursor = page.cursor;

            if page_len < BROAD_PAGE_LIMIT as usize || cursor.is_none() {
                break;
            }
            tokio::time::sleep(self.page_delay).await;
        }

        out
    }
}

/// Drop excluded leagues and duplicate tickers, preserving discovery
/// order (the matcher relies on it for deterministic ties).
fn dedupe_and_screen(contracts: Vec<Contract>) -> Vec<Contract> {
    let mut seen = HashSet::new();
    contracts
        .into_iter()
        .filter(|c| {
            if is_excluded_ticker(&c.ticker) {
                return false;
            }
            if let Some(group) = &c.event_group {
                if is_excluded_ticker(group) {
                    return false;
                }
            }
            seen.insert(c.ticker.clone())
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{ExchangeResult, MarketsPage, OrderReceipt, OrderRequest};
    use crate::types::PositionSnapshot;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use mockall::mock;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    mock! {
        Exchange {}

        #[async_trait]
        impl ExchangeApi for Exchange {
            fn is_configured(&self) -> bool;
            async fn markets_page(&self, query: MarketsQuery) -> ExchangeResult<MarketsPage>;
            async fn positions(&self) -> ExchangeResult<Vec<PositionSnapshot>>;
            async fn market_close_time(&self, ticker: &str) -> ExchangeResult<Option<DateTime<Utc>>>;
            async fn best_yes_bid(&self, ticker: &str) -> ExchangeResult<Option<i64>>;
            async fn place_order(&self, order: OrderRequest) -> ExchangeResult<OrderReceipt>;
            async fn balance_cents(&self) -> ExchangeResult<i64>;
        }
    }

    fn contract(ticker: &str) -> Contract {
        Contract {
            ticker: ticker.to_string(),
            title: format!("{ticker} title"),
            sport: None,
            yes_ask: 50,
            yes_bid: 48,
            no_ask: 52,
            no_bid: 50,
            close_time: None,
            event_group: None,
        }
    }

    fn empty_page() -> MarketsPage {
        MarketsPage {
            contracts: Vec::new(),
            cursor: None,
        }
    }

    #[test]
    fn test_sport_for_ticker() {
        assert_eq!(sport_for_ticker("KXNBAGAME-26FEB21HOUNYK-NYK"), Some(Sport::Nba));
        assert_eq!(sport_for_ticker("kxnhlspread-xyz"), Some(Sport::Nhl));
        assert_eq!(sport_for_ticker("KXELECTION-2026"), None);
    }

    #[test]
    fn test_excluded_tickers() {
        assert!(is_excluded_ticker("KXWNBAGAME-26JUL01-LV"));
        assert!(is_excluded_ticker("KXNCAAWBGAME-26MAR01-UCONN"));
        assert!(!is_excluded_ticker("KXNBAGAME-26FEB21HOUNYK-NYK"));
    }

    #[test]
    fn test_dedupe_and_screen() {
        let mut dup = contract("KXNBAGAME-A-BOS");
        dup.event_group = Some("KXNBAGAME-A".into());
        let mut womens = contract("KXNCAAMBGAME-B-X");
        womens.event_group = Some("KXNCAAWBGAME-B".into());

        let out = dedupe_and_screen(vec![
            contract("KXNBAGAME-A-BOS"),
            dup,
            contract("KXWNBAGAME-C-LV"),
            womens,
            contract("KXNBAGAME-A-MIA"),
        ]);
        let tickers: Vec<&str> = out.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["KXNBAGAME-A-BOS", "KXNBAGAME-A-MIA"]);
    }

    #[tokio::test]
    async fn test_unconfigured_returns_empty_without_calls() {
        let mut api = MockExchange::new();
        api.expect_is_configured().return_const(false);
        // No markets_page expectation: any call would panic the mock.

        let catalog = MarketCatalog::new(0);
        let out = catalog.refresh(&api).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_series_path_tags_sport() {
        let mut api = MockExchange::new();
        api.expect_is_configured().return_const(true);
        api.expect_markets_page().returning(|q| {
            Ok(match q.series_ticker.as_deref() {
                Some("KXNBAGAME") => MarketsPage {
                    contracts: vec![contract("KXNBAGAME-A-BOS"), contract("KXNBAGAME-A-MIA")],
                    cursor: None,
                },
                Some("KXNHLGAME") => MarketsPage {
                    contracts: vec![contract("KXNHLGAME-B-BOS")],
                    cursor: None,
                },
                _ => empty_page(),
            })
        });

        let catalog = MarketCatalog::new(0);
        let out = catalog.refresh(&api).await.unwrap();
        assert_eq!(out.len(), 3);
        assert!(out
            .iter()
            .filter(|c| c.ticker.starts_with("KXNBAGAME"))
            .all(|c| c.sport == Some(Sport::Nba)));
        assert!(out
            .iter()
            .filter(|c| c.ticker.starts_with("KXNHLGAME"))
            .all(|c| c.sport == Some(Sport::Nhl)));
    }

    #[tokio::test]
    async fn test_cursor_followed_until_short_page() {
        let pages_seen = Arc::new(AtomicUsize::new(0));
        let counter = pages_seen.clone();

        let mut api = MockExchange::new();
        api.expect_is_configured().return_const(true);
        api.expect_markets_page().returning(move |q| {
            if q.series_ticker.as_deref() != Some("KXNBAGAME") {
                return Ok(empty_page());
            }
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                // Full page with a cursor: walk must continue.
                Ok(MarketsPage {
                    contracts: (0..SERIES_PAGE_LIMIT)
                        .map(|i| contract(&format!("KXNBAGAME-P{n}-{i}")))
                        .collect(),
                    cursor: Some(format!("cursor-{n}")),
                })
            } else {
                Ok(MarketsPage {
                    contracts: vec![contract("KXNBAGAME-LAST-BOS")],
                    cursor: None,
                })
            }
        });

        let catalog = MarketCatalog::new(0);
        let out = catalog.refresh(&api).await.unwrap();
        assert_eq!(pages_seen.load(Ordering::SeqCst), 3);
        assert_eq!(out.len(), 2 * SERIES_PAGE_LIMIT as usize + 1);
    }

    #[tokio::test]
    async fn test_page_cap_stops_runaway_walk() {
        let pages_seen = Arc::new(AtomicUsize::new(0));
        let counter = pages_seen.clone();

        let mut api = MockExchange::new();
        api.expect_is_configured().return_const(true);
        api.expect_markets_page().returning(move |q| {
            if q.series_ticker.as_deref() != Some("KXNBAGAME") {
                return Ok(empty_page());
            }
            let n = counter.fetch_add(1, Ordering::SeqCst);
            // Always full, always a cursor: only the cap can stop this.
            Ok(MarketsPage {
                contracts: (0..SERIES_PAGE_LIMIT)
                    .map(|i| contract(&format!("KXNBAGAME-P{n}-{i}")))
                    .collect(),
                cursor: Some(format!("cursor-{n}")),
            })
        });

        let catalog = MarketCatalog::new(0);
        let _ = catalog.refresh(&api).await.unwrap();
        assert_eq!(pages_seen.load(Ordering::SeqCst), MAX_PAGES);
    }

    #[tokio::test]
    async fn test_rate_limit_aborts_walk_keeps_partial() {
        let pages_seen = Arc::new(AtomicUsize::new(0));
        let counter = pages_seen.clone();

        let mut api = MockExchange::new();
        api.expect_is_configured().return_const(true);
        api.expect_markets_page().returning(move |q| {
            if q.series_ticker.as_deref() != Some("KXNBAGAME") {
                return Ok(empty_page());
            }
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n == 0 {
                Ok(MarketsPage {
                    contracts: (0..SERIES_PAGE_LIMIT)
                        .map(|i| contract(&format!("KXNBAGAME-P0-{i}")))
                        .collect(),
                    cursor: Some("cursor-0".into()),
                })
            } else {
                Err(ExchangeError::RateLimited)
            }
        });

        let catalog = MarketCatalog::new(0);
        let out = catalog.refresh(&api).await.unwrap();
        assert_eq!(out.len(), SERIES_PAGE_LIMIT as usize);
    }

    #[tokio::test]
    async fn test_broad_fallback_filters_by_prefix() {
        let mut api = MockExchange::new();
        api.expect_is_configured().return_const(true);
        api.expect_markets_page().returning(|q| {
            if q.series_ticker.is_some() {
                return Ok(empty_page());
            }
            Ok(MarketsPage {
                contracts: vec![
                    contract("KXNBAGAME-A-BOS"),
                    contract("KXELECTION-2028-DEM"),
                    contract("KXNHLGAME-B-NYR"),
                    contract("KXWNBAGAME-C-LV"),
                ],
                cursor: None,
            })
        });

        let catalog = MarketCatalog::new(0);
        let out = catalog.refresh(&api).await.unwrap();
        let tickers: Vec<&str> = out.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["KXNBAGAME-A-BOS", "KXNHLGAME-B-NYR"]);
        assert_eq!(out[0].sport, Some(Sport::Nba));
        assert_eq!(out[1].sport, Some(Sport::Nhl));
    }
}
