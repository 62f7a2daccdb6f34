//! Signed HTTP client for the exchange trading API.
//!
//! Thin request layer: one markets page per call (the catalog owns the
//! pagination walk), positions, per-market close-time lookup, best-bid
//! lookup, order placement, and balance. All authenticated endpoints
//! attach the RSA-PSS headers from [`auth::RequestSigner`].
//!
//! Error posture per call: HTTP 429 sleeps two seconds and surfaces
//! `ExchangeError::RateLimited` so the caller aborts its walk; other
//! non-2xx responses surface `ExchangeError::Api` with a truncated
//! body. One failing call never takes down a cycle.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::exchange::auth::RequestSigner;
use crate::types::{Contract, PositionSnapshot, Side};

/// Production trading API host.
pub const DEFAULT_BASE_URL: &str = "https://api.elections.kalshi.com";

const API_PREFIX: &str = "/trade-api/v2";
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);
const ERROR_BODY_LIMIT: usize = 300;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Exchange call failures, distinguishable so pagination can abort on
/// rate limits without retry loops.
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("exchange client is not configured")]
    Unconfigured,
}

impl ExchangeError {
    /// Short reason string for execution results and the run log.
    pub fn reason(&self) -> String {
        match self {
            ExchangeError::Api { status, body } => {
                let mut b = body.clone();
                b.truncate(200);
                format!("HTTP {status}: {b}")
            }
            other => other.to_string(),
        }
    }
}

pub type ExchangeResult<T> = Result<T, ExchangeError>;

// ---------------------------------------------------------------------------
// Request/response model
// ---------------------------------------------------------------------------

/// Parameters for one page of the open-markets listing.
#[derive(Debug, Clone, Default)]
pub struct MarketsQuery {
    pub series_ticker: Option<String>,
    pub limit: u32,
    pub cursor: Option<String>,
}

/// One page of open contracts plus the cursor for the next page.
#[derive(Debug, Clone)]
pub struct MarketsPage {
    pub contracts: Vec<Contract>,
    pub cursor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAction {
    Buy,
    Sell,
}

impl OrderAction {
    fn as_str(&self) -> &'static str {
        match self {
            OrderAction::Buy => "buy",
            OrderAction::Sell => "sell",
        }
    }
}

/// A limit order to submit. Price is in cents for the named side.
#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub ticker: String,
    pub side: Side,
    pub action: OrderAction,
    pub count: i64,
    pub price_cents: i64,
}

impl OrderRequest {
    pub fn limit_buy(ticker: &str, side: Side, count: i64, price_cents: i64) -> Self {
        Self {
            ticker: ticker.to_string(),
            side,
            action: OrderAction::Buy,
            count,
            price_cents,
        }
    }

    pub fn limit_sell(ticker: &str, side: Side, count: i64, price_cents: i64) -> Self {
        Self {
            ticker: ticker.to_string(),
            side,
            action: OrderAction::Sell,
            count,
            price_cents,
        }
    }
}

/// What the exchange said about a submitted order.
#[derive(Debug, Clone, Default)]
pub struct OrderReceipt {
    pub order_id: Option<String>,
    pub status: Option<String>,
}

// -- wire types -------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiMarketsPage {
    #[serde(default)]
    markets: Vec<ApiMarket>,
    #[serde(default)]
    cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiMarket {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    yes_ask: i64,
    #[serde(default)]
    yes_bid: i64,
    #[serde(default)]
    no_ask: i64,
    #[serde(default)]
    no_bid: i64,
    #[serde(default)]
    close_time: Option<DateTime<Utc>>,
    #[serde(default)]
    event_ticker: Option<String>,
}

impl ApiMarket {
    fn into_contract(self) -> Contract {
        Contract {
            ticker: self.ticker,
            title: self.title,
            sport: None,
            yes_ask: self.yes_ask,
            yes_bid: self.yes_bid,
            no_ask: self.no_ask,
            no_bid: self.no_bid,
            close_time: self.close_time,
            event_group: self.event_ticker,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiMarketEnvelope {
    market: Option<ApiMarketDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiMarketDetail {
    #[serde(default)]
    close_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ApiPositionsResponse {
    #[serde(default)]
    market_positions: Vec<ApiPosition>,
}

#[derive(Debug, Deserialize)]
struct ApiPosition {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    position: i64,
    #[serde(default)]
    market: Option<ApiMarketDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiOrderbookEnvelope {
    orderbook: Option<ApiOrderbook>,
}

#[derive(Debug, Deserialize)]
struct ApiOrderbook {
    /// Resting yes bids as `[price_cents, count]` levels.
    #[serde(default)]
    yes: Option<Vec<(i64, i64)>>,
}

#[derive(Debug, Deserialize)]
struct ApiOrderEnvelope {
    order: Option<ApiOrder>,
}

#[derive(Debug, Deserialize)]
struct ApiOrder {
    #[serde(default)]
    order_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiBalance {
    #[serde(default)]
    balance: i64,
}

// ---------------------------------------------------------------------------
// ExchangeApi trait
// ---------------------------------------------------------------------------

/// Abstraction over the exchange, the seam for test doubles.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Whether valid signing credentials are loaded. False forces
    /// simulation everywhere downstream.
    fn is_configured(&self) -> bool;

    /// Fetch one page of open markets.
    async fn markets_page(&self, query: MarketsQuery) -> ExchangeResult<MarketsPage>;

    /// Current open positions, one snapshot per cycle.
    async fn positions(&self) -> ExchangeResult<Vec<PositionSnapshot>>;

    /// Close time for a single market (used when the position snapshot
    /// lacks one).
    async fn market_close_time(&self, ticker: &str) -> ExchangeResult<Option<DateTime<Utc>>>;

    /// Best resting yes bid in cents, if the book has one.
    async fn best_yes_bid(&self, ticker: &str) -> ExchangeResult<Option<i64>>;

    /// Submit a limit order.
    async fn place_order(&self, order: OrderRequest) -> ExchangeResult<OrderReceipt>;

    /// Account balance in cents.
    async fn balance_cents(&self) -> ExchangeResult<i64>;
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct ExchangeClient {
    http: reqwest::Client,
    base_url: String,
    signer: Option<RequestSigner>,
}

impl ExchangeClient {
    pub fn new(base_url: &str, signer: Option<RequestSigner>) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        match &signer {
            Some(s) => {
                let id = s.key_id();
                info!(
                    key_id = &id[..id.len().min(8)],
                    "exchange client configured"
                );
            }
            None => warn!("exchange credentials missing or invalid — simulation only"),
        }

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signer,
        })
    }

    fn signer(&self) -> ExchangeResult<&RequestSigner> {
        self.signer.as_ref().ok_or(ExchangeError::Unconfigured)
    }

    async fn check(resp: reqwest::Response) -> ExchangeResult<reqwest::Response> {
        let status = resp.status();
        if status.as_u16() == 429 {
            warn!("rate limited — backing off {:?}", RATE_LIMIT_BACKOFF);
            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
            return Err(ExchangeError::RateLimited);
        }
        if !status.is_success() {
            let mut body = resp.text().await.unwrap_or_default();
            body.truncate(ERROR_BODY_LIMIT);
            return Err(ExchangeError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ExchangeResult<T> {
        let signer = self.signer()?;
        let headers = signer.headers("GET", path);
        let resp = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header("KALSHI-ACCESS-KEY", &headers.key_id)
            .header("KALSHI-ACCESS-SIGNATURE", &headers.signature)
            .header("KALSHI-ACCESS-TIMESTAMP", &headers.timestamp_ms)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<T>().await?)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> ExchangeResult<T> {
        let signer = self.signer()?;
        let headers = signer.headers("POST", path);
        let resp = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .header("KALSHI-ACCESS-KEY", &headers.key_id)
            .header("KALSHI-ACCESS-SIGNATURE", &headers.signature)
            .header("KALSHI-ACCESS-TIMESTAMP", &headers.timestamp_ms)
            .json(body)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        Ok(resp.json::<T>().await?)
    }
}

#[async_trait]
impl ExchangeApi for ExchangeClient {
    fn is_configured(&self) -> bool {
        self.signer.is_some()
    }

    async fn markets_page(&self, query: MarketsQuery) -> ExchangeResult<MarketsPage> {
        let path = format!("{API_PREFIX}/markets");
        let mut params: Vec<(&str, String)> = vec![
            ("status", "open".to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(series) = &query.series_ticker {
            params.push(("series_ticker", series.clone()));
        }
        if let Some(cursor) = &query.cursor {
            params.push(("cursor", cursor.clone()));
        }

        let page: ApiMarketsPage = self.get_json(&path, &params).await?;
        let contracts = page
            .markets
            .into_iter()
            .filter(|m| !m.ticker.is_empty())
            .map(ApiMarket::into_contract)
            .collect();
        Ok(MarketsPage {
            contracts,
            cursor: page.cursor.filter(|c| !c.is_empty()),
        })
    }

    async fn positions(&self) -> ExchangeResult<Vec<PositionSnapshot>> {
        let path = format!("{API_PREFIX}/portfolio/positions");
        let resp: ApiPositionsResponse = self.get_json(&path, &[]).await?;
        Ok(resp
            .market_positions
            .into_iter()
            .map(|p| PositionSnapshot {
                ticker: p.ticker,
                quantity: p.position,
                close_time: p.market.and_then(|m| m.close_time),
            })
            .collect())
    }

    async fn market_close_time(&self, ticker: &str) -> ExchangeResult<Option<DateTime<Utc>>> {
        let path = format!("{API_PREFIX}/markets/{ticker}");
        let resp: ApiMarketEnvelope = self.get_json(&path, &[]).await?;
        Ok(resp.market.and_then(|m| m.close_time))
    }

    async fn best_yes_bid(&self, ticker: &str) -> ExchangeResult<Option<i64>> {
        let path = format!("{API_PREFIX}/markets/{ticker}/orderbook");
        let resp: ApiOrderbookEnvelope = self.get_json(&path, &[]).await?;
        Ok(resp
            .orderbook
            .and_then(|ob| ob.yes)
            .and_then(|levels| levels.iter().map(|(price, _)| *price).max()))
    }

    async fn place_order(&self, order: OrderRequest) -> ExchangeResult<OrderReceipt> {
        let path = format!("{API_PREFIX}/portfolio/orders");
        let price_key = match order.side {
            Side::Yes => "yes_price",
            Side::No => "no_price",
        };
        let body = serde_json::json!({
            "ticker": order.ticker,
            "client_order_id": format!("pickwire_{}", uuid::Uuid::new_v4()),
            "side": order.side.as_str(),
            "action": order.action.as_str(),
            "count": order.count,
            "type": "limit",
            price_key: order.price_cents,
        });

        debug!(
            ticker = %order.ticker,
            side = %order.side,
            action = order.action.as_str(),
            count = order.count,
            price = order.price_cents,
            "submitting order"
        );

        let resp: ApiOrderEnvelope = self.post_json(&path, &body).await?;
        let order = resp.order.unwrap_or(ApiOrder {
            order_id: None,
            status: None,
        });
        Ok(OrderReceipt {
            order_id: order.order_id,
            status: order.status,
        })
    }

    async fn balance_cents(&self) -> ExchangeResult<i64> {
        let path = format!("{API_PREFIX}/portfolio/balance");
        let resp: ApiBalance = self.get_json(&path, &[]).await?;
        Ok(resp.balance)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_client_is_flagged() {
        let client = ExchangeClient::new(DEFAULT_BASE_URL, None).unwrap();
        assert!(!client.is_configured());
    }

    #[tokio::test]
    async fn test_unconfigured_calls_fail_closed() {
        let client = ExchangeClient::new(DEFAULT_BASE_URL, None).unwrap();
        let err = client.positions().await.unwrap_err();
        assert!(matches!(err, ExchangeError::Unconfigured));

        let err = client
            .markets_page(MarketsQuery {
                limit: 200,
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ExchangeError::Unconfigured));
    }

    #[test]
    fn test_error_reason_truncates_body() {
        let err = ExchangeError::Api {
            status: 400,
            body: "x".repeat(500),
        };
        let reason = err.reason();
        assert!(reason.starts_with("HTTP 400"));
        assert!(reason.len() < 220);
    }

    #[test]
    fn test_market_conversion_keeps_event_group() {
        let api = ApiMarket {
            ticker: "KXNBAGAME-26FEB21HOUNYK-NYK".into(),
            title: "Houston at New York Winner?".into(),
            yes_ask: 60,
            yes_bid: 58,
            no_ask: 42,
            no_bid: 40,
            close_time: None,
            event_ticker: Some("KXNBAGAME-26FEB21HOUNYK".into()),
        };
        let c = api.into_contract();
        assert_eq!(c.group_key(), "KXNBAGAME-26FEB21HOUNYK");
        assert_eq!(c.sport, None);
        assert_eq!(c.yes_ask, 60);
    }

    #[test]
    fn test_order_request_builders() {
        let buy = OrderRequest::limit_buy("T-1", Side::No, 12, 40);
        assert_eq!(buy.action, OrderAction::Buy);
        assert_eq!(buy.count, 12);
        assert_eq!(buy.price_cents, 40);

        let sell = OrderRequest::limit_sell("T-1", Side::Yes, 3, 55);
        assert_eq!(sell.action, OrderAction::Sell);
        assert_eq!(sell.side, Side::Yes);
    }

    #[test]
    fn test_orderbook_best_bid_parsing() {
        let raw = r#"{"orderbook":{"yes":[[40,100],[43,25],[41,5]],"no":[[55,10]]}}"#;
        let parsed: ApiOrderbookEnvelope = serde_json::from_str(raw).unwrap();
        let best = parsed
            .orderbook
            .and_then(|ob| ob.yes)
            .and_then(|levels| levels.iter().map(|(p, _)| *p).max());
        assert_eq!(best, Some(43));
    }

    #[test]
    fn test_markets_page_parsing_defaults() {
        let raw = r#"{"markets":[{"ticker":"T-A-BOS","title":"x"}],"cursor":""}"#;
        let parsed: ApiMarketsPage = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.markets.len(), 1);
        assert_eq!(parsed.markets[0].yes_ask, 0);
        // Empty cursor means the walk is done.
        assert_eq!(parsed.cursor.as_deref(), Some(""));
    }
}
