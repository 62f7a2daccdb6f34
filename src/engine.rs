//! Order sizing and placement.
//!
//! Turns a matched pick into a limit order: price is the current ask
//! for the chosen side, contract count is the fixed stake divided by
//! that price (floored). Live mode submits; dry-run records the order
//! as simulated without touching the exchange.

use tracing::{info, warn};

use crate::exchange::{ExchangeApi, OrderRequest};
use crate::matcher::MatchOutcome;
use crate::types::{ExecutionResult, ExecutionStatus, Pick};

/// Whether this process may spend real money.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeMode {
    Live,
    DryRun,
}

pub struct OrderEngine {
    mode: TradeMode,
    stake_cents: i64,
}

impl OrderEngine {
    pub fn new(mode: TradeMode, stake_cents: i64) -> Self {
        Self { mode, stake_cents }
    }

    pub fn mode(&self) -> TradeMode {
        self.mode
    }

    /// Size and (in live mode) submit one order for a matched pick.
    ///
    /// Prices at or outside the 1..=99 cent band are junk quotes from
    /// dead markets and are skipped, never clamped.
    pub async fn execute(
        &self,
        api: &dyn ExchangeApi,
        pick: &Pick,
        outcome: &MatchOutcome<'_>,
    ) -> ExecutionResult {
        let contract = outcome.contract;
        let side = outcome.side;
        let price = contract.ask(side);

        if price <= 0 || price >= 100 {
            warn!(ticker = %contract.ticker, price, "unusable quote");
            return ExecutionResult::skipped(pick, format!("bad price {price}¢"));
        }

        let count = self.stake_cents / price;
        if count <= 0 {
            return ExecutionResult::skipped(
                pick,
                format!("stake {}¢ buys 0 contracts at {price}¢", self.stake_cents),
            );
        }

        let mut result = ExecutionResult {
            pick_id: pick.identity_key(),
            selection: pick.selection.clone(),
            ticker: Some(contract.ticker.clone()),
            side: Some(side),
            stake_cents: self.stake_cents,
            price_cents: price,
            contract_count: count,
            status: ExecutionStatus::Simulated,
            reason: None,
            order_id: None,
        };

        match self.mode {
            TradeMode::DryRun => {
                info!(
                    ticker = %contract.ticker,
                    side = %side,
                    count,
                    price,
                    "dry-run: order simulated"
                );
                result
            }
            TradeMode::Live => {
                let order = OrderRequest::limit_buy(&contract.ticker, side, count, price);
                match api.place_order(order).await {
                    Ok(receipt) => {
                        info!(
                            ticker = %contract.ticker,
                            side = %side,
                            count,
                            price,
                            order_id = receipt.order_id.as_deref().unwrap_or("-"),
                            "order placed"
                        );
                        result.status = ExecutionStatus::Placed;
                        result.order_id = receipt.order_id;
                        result
                    }
                    Err(e) => {
                        warn!(ticker = %contract.ticker, error = %e, "order rejected");
                        result.status = ExecutionStatus::Error;
                        result.reason = Some(e.reason());
                        result
                    }
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
