//! Exchange integration.
//!
//! `auth` holds the RSA-PSS request signer; `client` the signed HTTP
//! client. The `ExchangeApi` trait is the seam the catalog, sweeper,
//! engine, and orchestrator depend on, so tests can substitute a
//! deterministic in-memory exchange.

pub mod auth;
pub mod client;

pub use auth::{normalize_pem, RequestSigner, SignedHeaders};
pub use client::{
    ExchangeApi, ExchangeClient, ExchangeError, ExchangeResult, MarketsPage, MarketsQuery,
    OrderAction, OrderReceipt, OrderRequest,
};
