//! Simulated MT5 Manager API.
//!
//! Mimics realistic broker behavior for demos and tests:
//! - known symbols with bid/ask spreads and live quote jitter
//! - account margin tracking (free margin shrinks with each fill)
//! - random execution latency (network + server processing)
//! - configurable transient-failure rate
//!
//! Thread-safe: the symbol table is immutable after construction, account
//! state sits behind a mutex, and executed deals live in a concurrent map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, info};

use mtdeal_core::{
    AccountInfo, Price, SymbolInfo, TicketId, TradeRequest, TradeResult, TradeSide, TradeStatus,
    Volume,
};

use crate::BrokerApi;

/// Simplified margin requirement: $1,000 per lot.
const MARGIN_PER_LOT: Decimal = dec!(1000);

/// Tuning knobs for the simulated broker.
#[derive(Debug, Clone)]
pub struct MockBrokerConfig {
    /// Probability of a transient `CONNECTION_ERROR` per dealer call
    /// (0.0 to 1.0).
    pub failure_rate: f64,
    /// Lower bound of the simulated per-call latency.
    pub min_latency_ms: u64,
    /// Upper bound of the simulated per-call latency.
    pub max_latency_ms: u64,
}

impl Default for MockBrokerConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.05,
            min_latency_ms: 10,
            max_latency_ms: 100,
        }
    }
}

impl MockBrokerConfig {
    /// Deterministic configuration: no failures, no latency.
    #[must_use]
    pub fn reliable() -> Self {
        Self {
            failure_rate: 0.0,
            min_latency_ms: 0,
            max_latency_ms: 0,
        }
    }
}

/// Simulated MT5 server with a demo account and a fixed forex symbol table.
pub struct MockBroker {
    config: MockBrokerConfig,
    connected: AtomicBool,
    ticket_counter: AtomicU64,
    /// Symbol database with base quotes. Immutable after construction.
    symbols: HashMap<String, SymbolInfo>,
    /// Simulated account state; margin is reserved under this lock.
    account: Mutex<AccountInfo>,
    /// Executed deals, kept for `ticket_info` lookups.
    executed: DashMap<TicketId, TradeResult>,
}

impl MockBroker {
    pub fn new(config: MockBrokerConfig) -> Self {
        let mut symbols = HashMap::new();
        for info in seed_symbols() {
            symbols.insert(info.name.clone(), info);
        }

        let account = AccountInfo {
            login: 12345,
            balance: dec!(100000),
            equity: dec!(100000),
            free_margin: dec!(100000),
            margin_level: Decimal::ZERO,
            currency: "USD".to_string(),
        };

        Self {
            config,
            connected: AtomicBool::new(false),
            ticket_counter: AtomicU64::new(100_000),
            symbols,
            account: Mutex::new(account),
            executed: DashMap::new(),
        }
    }

    fn simulate_latency(&self) {
        if self.config.max_latency_ms == 0 {
            return;
        }
        let ms = if self.config.min_latency_ms >= self.config.max_latency_ms {
            self.config.max_latency_ms
        } else {
            thread_rng().gen_range(self.config.min_latency_ms..=self.config.max_latency_ms)
        };
        thread::sleep(Duration::from_millis(ms));
    }

    fn should_fail(&self) -> bool {
        self.config.failure_rate > 0.0 && thread_rng().gen::<f64>() < self.config.failure_rate
    }

    /// Fill price for a dealer request: buys cross the ask, sells hit the
    /// bid, with a small random slippage either way.
    fn fill_price(&self, info: &SymbolInfo, side: TradeSide) -> Price {
        let base = match side {
            TradeSide::Buy => info.ask,
            TradeSide::Sell => info.bid,
        };
        let slippage = Decimal::new(thread_rng().gen_range(-25..=25), 6);
        Price::new(base.inner() + slippage)
    }

    fn next_ticket(&self) -> TicketId {
        let id = self.ticket_counter.fetch_add(1, Ordering::Relaxed);
        TicketId::new(id.to_string())
    }
}

impl Default for MockBroker {
    fn default() -> Self {
        Self::new(MockBrokerConfig::default())
    }
}

impl BrokerApi for MockBroker {
    fn connect(&self, server: &str, login: u64, _password: &str) -> bool {
        self.simulate_latency();
        self.account.lock().login = login;
        self.connected.store(true, Ordering::Release);
        info!(server, login, "connected to simulated MT5 server");
        true
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        info!("disconnected from simulated MT5 server");
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    fn symbol_info(&self, symbol: &str) -> Option<SymbolInfo> {
        let mut info = self.symbols.get(symbol)?.clone();

        // Small quote jitter (about half a pip) to simulate a live market.
        let variation = Decimal::new(thread_rng().gen_range(-50..=50), 5);
        info.bid = Price::new(info.bid.inner() + variation);
        info.ask = Price::new(info.ask.inner() + variation);
        Some(info)
    }

    fn account_info(&self, login: u64) -> Option<AccountInfo> {
        let account = self.account.lock();
        if account.login != login {
            return None;
        }
        Some(account.clone())
    }

    fn execute_trade(&self, request: &TradeRequest) -> TradeResult {
        self.simulate_latency();

        if self.should_fail() {
            return TradeResult::failure(
                request,
                TradeStatus::ConnectionError,
                "MT5 server connection timeout during DealerSend()",
            );
        }

        let Some(info) = self.symbols.get(&request.symbol) else {
            return TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                format!("Symbol '{}' not found (SymbolGet failed)", request.symbol),
            );
        };

        if !info.trade_allowed {
            return TradeResult::failure(
                request,
                TradeStatus::Rejected,
                format!("Trading disabled for symbol '{}'", request.symbol),
            );
        }

        if !info.volume_in_range(request.volume) {
            return TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                format!(
                    "Volume {} outside allowed range [{}, {}]",
                    request.volume, info.min_volume, info.max_volume
                ),
            );
        }

        if !request.volume.is_aligned_to(info.volume_step) {
            return TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                format!(
                    "Volume {} not aligned to step {}",
                    request.volume, info.volume_step
                ),
            );
        }

        // Margin check and reservation are one critical section so two
        // concurrent fills cannot both pass on the same free margin.
        let required_margin = request.volume.inner() * MARGIN_PER_LOT;
        {
            let mut account = self.account.lock();
            if account.free_margin < required_margin {
                return TradeResult::failure(
                    request,
                    TradeStatus::MarginError,
                    format!(
                        "Insufficient margin. Required: ${required_margin}, Available: ${}",
                        account.free_margin
                    ),
                );
            }
            account.free_margin -= required_margin;
            account.equity -= required_margin * dec!(0.001);
        }

        let price = self.fill_price(info, request.side);
        let ticket = self.next_ticket();
        debug!(request_id = %request.request_id, ticket = %ticket, %price, "dealer fill");

        let result = TradeResult::success(request, ticket.clone(), price);
        self.executed.insert(ticket, result.clone());
        result
    }

    fn ticket_info(&self, ticket_id: &TicketId) -> Option<TradeResult> {
        self.executed.get(ticket_id).map(|entry| entry.value().clone())
    }

    fn symbol_names(&self) -> Vec<String> {
        self.symbols.keys().cloned().collect()
    }
}

/// Realistic forex seed data, mirroring what `SymbolGet` would return.
fn seed_symbols() -> Vec<SymbolInfo> {
    let fx = |name: &str, bid: Decimal, ask: Decimal, max: Decimal, digits: u32| SymbolInfo {
        name: name.to_string(),
        bid: Price::new(bid),
        ask: Price::new(ask),
        min_volume: Volume::new(dec!(0.01)),
        max_volume: Volume::new(max),
        volume_step: Volume::new(dec!(0.01)),
        digits,
        trade_allowed: true,
    };

    vec![
        fx("EURUSD", dec!(1.08450), dec!(1.08465), dec!(100), 5),
        fx("GBPUSD", dec!(1.26320), dec!(1.26340), dec!(100), 5),
        fx("USDJPY", dec!(149.850), dec!(149.865), dec!(100), 3),
        fx("AUDUSD", dec!(0.65230), dec!(0.65248), dec!(100), 5),
        fx("USDCAD", dec!(1.35720), dec!(1.35738), dec!(100), 5),
        fx("XAUUSD", dec!(2035.50), dec!(2036.00), dec!(50), 2),
    ]
}
