//! Core domain types for the MT5 deal dispatch engine.
//!
//! This crate provides the fundamental types shared by the broker surface,
//! the dispatch engine, and the simulator front-end:
//! - `TradeRequest` / `TradeResult`: the unit of work and its outcome
//! - `TradeStatus`: the outcome taxonomy with retryability classification
//! - `Price`, `Volume`: precision-safe numeric types
//! - `SymbolInfo`, `AccountInfo`: broker metadata records

pub mod decimal;
pub mod market;
pub mod request;
pub mod result;

pub use decimal::{Price, Volume};
pub use market::{AccountInfo, SymbolInfo};
pub use request::{RequestId, TradeRequest, TradeSide};
pub use result::{TicketId, TradeResult, TradeStatus};
