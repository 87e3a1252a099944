//! Broker-agnostic trait for the MT5 Manager API surface the dispatch
//! engine consumes, plus a simulated implementation for demos and tests.
//!
//! In production the trait would wrap the real `IMTManagerAPI` from the
//! MetaQuotes SDK; [`MockBroker`] stands in for it here.

use mtdeal_core::{AccountInfo, SymbolInfo, TicketId, TradeRequest, TradeResult};

pub mod mock;

pub use mock::{MockBroker, MockBrokerConfig};

/// The MT5 Manager API surface consumed by the dispatch engine.
///
/// Implementations must be thread-safe: multiple workers call
/// [`execute_trade`](BrokerApi::execute_trade) concurrently. Calls may block
/// on network I/O; workers are OS threads and tolerate that.
///
/// Manager API mapping:
/// - `connect` / `disconnect` -> `IMTManagerAPI::Connect` / `Disconnect`
/// - `symbol_info`            -> `SymbolGet` + `SymbolInfoGet`
/// - `account_info`           -> `UserAccountGet`
/// - `execute_trade`          -> `DealerSend`
/// - `ticket_info`            -> `DealGet`
/// - `symbol_names`           -> `SymbolNext` iteration
pub trait BrokerApi: Send + Sync {
    /// Connect to the trade server. Returns false if the session could not
    /// be established.
    fn connect(&self, server: &str, login: u64, password: &str) -> bool;

    /// Tear down the server session.
    fn disconnect(&self);

    fn is_connected(&self) -> bool;

    /// Symbol specification with live quotes, or `None` for an unknown
    /// symbol.
    fn symbol_info(&self, symbol: &str) -> Option<SymbolInfo>;

    /// Account balance/margin state, or `None` for an unknown login.
    fn account_info(&self, login: u64) -> Option<AccountInfo>;

    /// Submit a trade through the dealer path.
    ///
    /// `DealerSend` is the correct submission path for manager-initiated
    /// trades: it passes through all server-side validations (margin,
    /// symbol limits, lot step, trade sessions) and returns a deal ticket
    /// on success. The returned result always carries a populated status
    /// and, on failure, an error message; the `retry_count` field is left
    /// for the caller's retry loop to fill in.
    fn execute_trade(&self, request: &TradeRequest) -> TradeResult;

    /// Look up a previously executed deal by ticket.
    fn ticket_info(&self, ticket_id: &TicketId) -> Option<TradeResult>;

    /// Names of all tradeable symbols known to the server.
    fn symbol_names(&self) -> Vec<String>;
}
