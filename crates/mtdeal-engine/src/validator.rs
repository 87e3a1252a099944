//! Pre-flight request validation.
//!
//! Deterministic, in-process checks performed before any dealer call,
//! catching obvious errors early the way a production system would ahead
//! of `DealerSend`.
//!
//! # Check Order (Strict)
//!
//! 1. duplicate request id        -> DUPLICATE (no dealer call, ever)
//! 2. empty client id / symbol    -> INVALID_PARAMS
//! 3. non-positive volume         -> INVALID_PARAMS
//! 4. unknown symbol              -> INVALID_PARAMS
//! 5. trading disabled            -> REJECTED
//! 6. volume outside [min, max]   -> INVALID_PARAMS
//! 7. non-positive SL/TP          -> INVALID_PARAMS
//!
//! First failure wins. Lot-step alignment is deliberately left to the
//! broker's server-side validation.

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use mtdeal_broker::BrokerApi;
use mtdeal_core::{RequestId, TradeRequest, TradeResult, TradeStatus};

/// Validates requests against broker symbol metadata and a process-wide
/// deduplication set.
///
/// The seen-id set grows for the life of the processor. There is no
/// eviction: expiring entries without coordinating with the broker would
/// let a replayed id execute twice.
pub struct Validator {
    broker: Arc<dyn BrokerApi>,
    seen: Mutex<HashSet<RequestId>>,
}

impl Validator {
    pub fn new(broker: Arc<dyn BrokerApi>) -> Self {
        Self {
            broker,
            seen: Mutex::new(HashSet::new()),
        }
    }

    /// Run all checks. Returns the rejection result on the first failed
    /// check, `Ok` if the request may proceed to execution.
    pub fn validate(&self, request: &TradeRequest) -> Result<(), TradeResult> {
        // Lookup and insert in one critical section so two submissions of
        // the same id cannot both pass.
        {
            let mut seen = self.seen.lock();
            if seen.contains(&request.request_id) {
                warn!(request_id = %request.request_id, "duplicate request detected");
                return Err(TradeResult::failure(
                    request,
                    TradeStatus::Duplicate,
                    format!("Duplicate request ID: {}", request.request_id),
                ));
            }
            seen.insert(request.request_id.clone());
        }

        if request.client_id.is_empty() {
            return Err(TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                "Empty client ID",
            ));
        }

        if request.symbol.is_empty() {
            return Err(TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                "Empty symbol",
            ));
        }

        if !request.volume.is_positive() {
            return Err(TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                format!("Invalid volume: {}", request.volume),
            ));
        }

        let Some(info) = self.broker.symbol_info(&request.symbol) else {
            return Err(TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                format!("Unknown symbol: {}", request.symbol),
            ));
        };

        if !info.trade_allowed {
            return Err(TradeResult::failure(
                request,
                TradeStatus::Rejected,
                format!("Trading not allowed for: {}", request.symbol),
            ));
        }

        if !info.volume_in_range(request.volume) {
            return Err(TradeResult::failure(
                request,
                TradeStatus::InvalidParams,
                format!(
                    "Volume {} outside range [{}, {}]",
                    request.volume, info.min_volume, info.max_volume
                ),
            ));
        }

        if let Some(sl) = request.stop_loss {
            if !sl.is_positive() {
                return Err(TradeResult::failure(
                    request,
                    TradeStatus::InvalidParams,
                    format!("Invalid stop loss: {sl}"),
                ));
            }
        }

        if let Some(tp) = request.take_profit {
            if !tp.is_positive() {
                return Err(TradeResult::failure(
                    request,
                    TradeStatus::InvalidParams,
                    format!("Invalid take profit: {tp}"),
                ));
            }
        }

        Ok(())
    }

    /// Number of distinct request ids observed so far.
    pub fn seen_count(&self) -> usize {
        self.seen.lock().len()
    }
}
