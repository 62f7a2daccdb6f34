//! PICKWIRE — prediction-feed trade executor
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod exchange;
pub mod ledger;
pub mod matcher;
pub mod picks;
pub mod runlog;
pub mod runner;
pub mod sweeper;
pub mod types;
