//! Long-term position sweep.
//!
//! Capital parked in contracts that settle weeks out earns nothing
//! while daily games come and go. Before each buying pass the sweeper
//! sells every open position whose market closes more than the
//! configured number of days away, pricing one cent under the best bid
//! so the sell fills immediately.
//!
//! Failures are isolated per position: one bad ticker never stops the
//! rest of the sweep, and a sweep that sells nothing is a normal
//! outcome most cycles.

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::engine::TradeMode;
use crate::exchange::{ExchangeApi, OrderRequest};
use crate::types::Side;

/// Fallback mid price when the order book is empty.
const DEFAULT_BID_CENTS: i64 = 50;
const INTER_SELL_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Default, Clone, Copy)]
pub struct SweepReport {
    pub examined: usize,
    pub sold: usize,
    pub errors: usize,
}

pub struct PositionSweeper {
    mode: TradeMode,
    long_term_days: i64,
}

impl PositionSweeper {
    pub fn new(mode: TradeMode, long_term_days: i64) -> Self {
        Self {
            mode,
            long_term_days,
        }
    }

    /// Sell every long-term position. Never fails the cycle; positions
    /// that cannot be priced or sold are logged and counted.
    pub async fn sweep(&self, api: &dyn ExchangeApi) -> SweepReport {
        let mut report = SweepReport::default();

        let positions = match api.positions().await {
            Ok(p) => p,
            Err(e) => {
                warn!(error = %e, "could not fetch positions — skipping sweep");
                return report;
            }
        };
        if positions.is_empty() {
            debug!("no open positions");
            return report;
        }

        let now = Utc::now();
        for pos in positions {
            if pos.quantity == 0 {
                continue;
            }
            report.examined += 1;

            let close_time = match pos.close_time {
                Some(ct) => Some(ct),
                None => match api.market_close_time(&pos.ticker).await {
                    Ok(ct) => ct,
                    Err(e) => {
                        warn!(ticker = %pos.ticker, error = %e, "close time lookup failed");
                        report.errors += 1;
                        continue;
                    }
                },
            };
            let close_time = match close_time {
                Some(ct) => ct,
                None => {
                    warn!(ticker = %pos.ticker, "no close time — leaving position alone");
                    continue;
                }
            };

            let days_out = (close_time - now).num_seconds() as f64 / 86_400.0;
            if days_out <= self.long_term_days as f64 {
                continue;
            }

            // Positive quantity is a yes holding, negative a no holding.
            let side = if pos.quantity > 0 { Side::Yes } else { Side::No };
            let count = pos.quantity.abs();
            info!(
                ticker = %pos.ticker,
                side = %side,
                count,
                days_out = days_out as i64,
                "selling long-term position"
            );

            if self.mode == TradeMode::DryRun {
                report.sold += 1;
                continue;
            }

            let yes_bid = match api.best_yes_bid(&pos.ticker).await {
                Ok(bid) => bid.unwrap_or(DEFAULT_BID_CENTS),
                Err(e) => {
                    debug!(ticker = %pos.ticker, error = %e, "order book unavailable");
                    DEFAULT_BID_CENTS
                }
            };
            // One cent under the bid; for no holdings the bid is
            // implied from the yes book.
            let price = match side {
                Side::Yes => (yes_bid - 1).max(1),
                Side::No => (99 - yes_bid).max(1),
            };

            let order = OrderRequest::limit_sell(&pos.ticker, side, count, price);
            match api.place_order(order).await {
                Ok(receipt) => {
                    info!(
                        ticker = %pos.ticker,
                        price,
                        order_id = receipt.order_id.as_deref().unwrap_or("-"),
                        "position sold"
                    );
                    report.sold += 1;
                }
                Err(e) => {
                    warn!(ticker = %pos.ticker, error = %e, "sell failed");
                    report.errors += 1;
                }
            }
            tokio::time::sleep(INTER_SELL_DELAY).await;
        }

        info!(
            examined = report.examined,
            sold = report.sold,
            errors = report.errors,
            "sweep complete"
        );
        report
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{
        ExchangeError, ExchangeResult, MarketsPage, MarketsQuery, OrderReceipt,
    };
    use crate::types::PositionSnapshot;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use std::sync::Mutex;

    struct SweepExchange {
        positions: Vec<PositionSnapshot>,
        yes_bid: Option<i64>,
        orders: Mutex<Vec<OrderRequest>>,
    }

    impl SweepExchange {
        fn with_positions(positions: Vec<PositionSnapshot>) -> Self {
            Self {
                positions,
                yes_bid: Some(62),
                orders: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ExchangeApi for SweepExchange {
        fn is_configured(&self) -> bool {
            true
        }
        async fn markets_page(&self, _query: MarketsQuery) -> ExchangeResult<MarketsPage> {
            Err(ExchangeError::Unconfigured)
        }
        async fn positions(&self) -> ExchangeResult<Vec<PositionSnapshot>> {
            Ok(self.positions.clone())
        }
        async fn market_close_time(
            &self,
            _ticker: &str,
        ) -> ExchangeResult<Option<DateTime<Utc>>> {
            Ok(None)
        }
        async fn best_yes_bid(&self, _ticker: &str) -> ExchangeResult<Option<i64>> {
            Ok(self.yes_bid)
        }
        async fn place_order(&self, order: OrderRequest) -> ExchangeResult<OrderReceipt> {
            self.orders.lock().unwrap().push(order);
            Ok(OrderReceipt {
                order_id: Some("sell-1".into()),
                status: Some("resting".into()),
            })
        }
        async fn balance_cents(&self) -> ExchangeResult<i64> {
            Ok(0)
        }
    }

    fn position(ticker: &str, quantity: i64, days_out: i64) -> PositionSnapshot {
        PositionSnapshot {
            ticker: ticker.to_string(),
            quantity,
            close_time: Some(Utc::now() + ChronoDuration::days(days_out)),
        }
    }

    #[tokio::test]
    async fn test_only_long_term_positions_sold() {
        let api = SweepExchange::with_positions(vec![
            position("NEAR", 5, 2),
            position("FAR", 3, 20),
            position("FLAT", 0, 30),
        ]);
        let sweeper = PositionSweeper::new(TradeMode::Live, 14);
        let report = sweeper.sweep(&api).await;

        assert_eq!(report.examined, 2); // zero-quantity row skipped
        assert_eq!(report.sold, 1);
        let orders = api.orders.lock().unwrap();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].ticker, "FAR");
        assert_eq!(orders[0].count, 3);
        assert_eq!(orders[0].side, Side::Yes);
        assert_eq!(orders[0].price_cents, 61); // bid 62 minus one
    }

    #[tokio::test]
    async fn test_threshold_boundary_not_sold() {
        // Exactly at the threshold stays; only strictly beyond sells.
        let api = SweepExchange::with_positions(vec![position("EDGE", 2, 14)]);
        let sweeper = PositionSweeper::new(TradeMode::Live, 14);
        let report = sweeper.sweep(&api).await;
        assert_eq!(report.sold, 0);
        assert!(api.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_holding_sells_no_side() {
        let api = SweepExchange::with_positions(vec![position("SHORT", -4, 30)]);
        let sweeper = PositionSweeper::new(TradeMode::Live, 14);
        let report = sweeper.sweep(&api).await;

        assert_eq!(report.sold, 1);
        let orders = api.orders.lock().unwrap();
        assert_eq!(orders[0].side, Side::No);
        assert_eq!(orders[0].count, 4);
        assert_eq!(orders[0].price_cents, 37); // 99 minus yes bid 62
    }

    #[tokio::test]
    async fn test_empty_book_uses_default_price() {
        let mut api = SweepExchange::with_positions(vec![position("FAR", 1, 30)]);
        api.yes_bid = None;
        let sweeper = PositionSweeper::new(TradeMode::Live, 14);
        sweeper.sweep(&api).await;

        let orders = api.orders.lock().unwrap();
        assert_eq!(orders[0].price_cents, DEFAULT_BID_CENTS - 1);
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_submitting() {
        let api = SweepExchange::with_positions(vec![position("FAR", 3, 20)]);
        let sweeper = PositionSweeper::new(TradeMode::DryRun, 14);
        let report = sweeper.sweep(&api).await;
        assert_eq!(report.sold, 1);
        assert!(api.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_close_time_skipped() {
        let api = SweepExchange::with_positions(vec![PositionSnapshot {
            ticker: "NOCT".into(),
            quantity: 2,
            close_time: None,
        }]);
        let sweeper = PositionSweeper::new(TradeMode::Live, 14);
        let report = sweeper.sweep(&api).await;
        assert_eq!(report.examined, 1);
        assert_eq!(report.sold, 0);
        assert_eq!(report.errors, 0);
    }
}
