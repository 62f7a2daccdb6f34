//! Cycle orchestration.
//!
//! One cycle: load today's picks, note the balance, sweep long-term
//! positions, refresh the catalog, then walk the picks through the
//! ledger gate, the matcher, and the engine. Every pick gets exactly
//! one execution result per cycle, and every result lands in the run
//! log. Picks that found no market or whose order was rejected are NOT
//! ledgered, so a later cycle retries them once the market exists or
//! the balance recovers.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::catalog::MarketCatalog;
use crate::config::AppConfig;
use crate::engine::{OrderEngine, TradeMode};
use crate::exchange::ExchangeApi;
use crate::ledger::Ledger;
use crate::matcher::PickMatcher;
use crate::picks::PickFeed;
use crate::runlog::RunLog;
use crate::sweeper::PositionSweeper;
use crate::types::{CycleSummary, ExecutionResult, ExecutionStatus, Pick};

pub struct Runner {
    feed: PickFeed,
    catalog: MarketCatalog,
    matcher: PickMatcher,
    engine: OrderEngine,
    sweeper: PositionSweeper,
    runlog: RunLog,
    order_delay: Duration,
}

impl Runner {
    pub fn new(config: &AppConfig, mode: TradeMode) -> Self {
        Self {
            feed: PickFeed::new(
                &config.feed.picks_dir,
                config.trading.min_confidence,
                config.trading.max_picks_per_day,
                config.feed.remote(),
            ),
            catalog: MarketCatalog::new(config.runtime.page_delay_ms),
            matcher: PickMatcher,
            engine: OrderEngine::new(mode, config.trading.stake_cents),
            sweeper: PositionSweeper::new(mode, config.trading.long_term_days),
            runlog: RunLog::new(&config.state.run_log),
            order_delay: Duration::from_millis(config.runtime.order_delay_ms),
        }
    }

    /// Run one full cycle against the exchange.
    ///
    /// Errors abort the cycle, not the process; the watch loop logs
    /// and waits for the next tick.
    pub async fn cycle(
        &self,
        api: &dyn ExchangeApi,
        ledger: &mut dyn Ledger,
    ) -> Result<CycleSummary> {
        let mut summary = CycleSummary::default();

        let picks = self.feed.load().await.context("loading picks")?;
        summary.picks_loaded = picks.len();
        if picks.is_empty() {
            info!("no picks today");
            return Ok(summary);
        }
        self.runlog
            .line(&format!("cycle start: {} picks", picks.len()));

        match api.balance_cents().await {
            Ok(cents) => {
                info!(balance_cents = cents, "exchange balance");
                self.runlog
                    .line(&format!("balance: ${}.{:02}", cents / 100, cents % 100));
            }
            // A 401 here is survivable; orders will tell us for sure.
            Err(e) => warn!(error = %e, "balance unavailable"),
        }

        let sweep = self.sweeper.sweep(api).await;
        summary.positions_swept = sweep.sold;
        if sweep.sold > 0 {
            self.runlog
                .line(&format!("swept {} long-term position(s)", sweep.sold));
        }

        let catalog = self.catalog.refresh(api).await?;
        summary.contracts_in_catalog = catalog.len();
        if catalog.is_empty() && api.is_configured() {
            self.runlog.line("abort: catalog came back empty");
            anyhow::bail!("catalog empty on a configured exchange");
        }

        for pick in &picks {
            let key = pick.identity_key();
            let result = if ledger.contains(&key) {
                debug!(selection = %pick.selection, "already executed");
                ExecutionResult::skipped(pick, "dup")
            } else {
                match self.matcher.find_market(pick, &catalog) {
                    None => {
                        info!(
                            selection = %pick.selection,
                            matchup = %pick.matchup(),
                            "no market for pick"
                        );
                        ExecutionResult::skipped(pick, "no match")
                    }
                    Some(outcome) => {
                        let result = self.engine.execute(api, pick, &outcome).await;
                        if matches!(
                            result.status,
                            ExecutionStatus::Placed | ExecutionStatus::Simulated
                        ) {
                            ledger.add(key);
                        }
                        tokio::time::sleep(self.order_delay).await;
                        result
                    }
                }
            };
            self.runlog.line(&result_line(pick, &result));
            summary.record(&result);
        }

        if self.engine.mode() == TradeMode::Live {
            if let Err(e) = ledger.flush() {
                warn!(error = %e, "ledger flush failed — duplicates possible after restart");
                self.runlog.line("WARNING: ledger flush failed");
            }
        } else {
            debug!("dry-run: ledger not persisted");
        }

        info!(%summary, "cycle complete");
        self.runlog.line(&format!("cycle done: {summary}"));
        Ok(summary)
    }
}

fn result_line(pick: &Pick, result: &ExecutionResult) -> String {
    match (&result.ticker, &result.side) {
        (Some(ticker), Some(side)) => format!(
            "{}: \"{}\" -> {} {} {}x @ {}¢{}",
            result.status,
            pick.selection,
            ticker,
            side,
            result.contract_count,
            result.price_cents,
            result
                .reason
                .as_deref()
                .map(|r| format!(" ({r})"))
                .unwrap_or_default(),
        ),
        _ => format!(
            "{}: \"{}\" ({})",
            result.status,
            pick.selection,
            result.reason.as_deref().unwrap_or("-"),
        ),
    }
}
