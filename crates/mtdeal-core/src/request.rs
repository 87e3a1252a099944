//! Trade request types and identifiers.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Price, Volume};

/// Direction of a trade. Buys fill at the ask price, sells at the bid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

impl fmt::Display for TradeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Client-assigned unique identifier for a trade request.
///
/// Primary key for deduplication and result tracking. Every request must
/// carry a globally unique id; resubmitting an id yields a duplicate
/// rejection rather than a second execution.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

impl RequestId {
    /// Create from an existing string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate the next id for a client.
    ///
    /// Format: `{client_id}-{counter:06}`, with a process-wide counter so
    /// ids stay unique across concurrently submitting clients.
    pub fn generate(client_id: &str) -> Self {
        let n = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{client_id}-{n:06}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for RequestId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A trade request submitted by a client. Immutable after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    /// Submitting client.
    pub client_id: String,
    /// Client-assigned unique request id.
    pub request_id: RequestId,
    /// Buy or sell.
    pub side: TradeSide,
    /// Instrument symbol (e.g. "EURUSD").
    pub symbol: String,
    /// Trade volume in lots.
    pub volume: Volume,
    /// Optional stop-loss price.
    pub stop_loss: Option<Price>,
    /// Optional take-profit price.
    pub take_profit: Option<Price>,
    /// Creation time.
    pub timestamp: DateTime<Utc>,
    /// Marks requests a simulator produced with deliberately bad parameters.
    /// Informational only; validation treats flagged requests like any other.
    #[serde(default)]
    pub intentionally_bad: bool,
}

impl TradeRequest {
    /// Create a request stamped with the current time and no SL/TP brackets.
    pub fn new(
        client_id: impl Into<String>,
        request_id: RequestId,
        side: TradeSide,
        symbol: impl Into<String>,
        volume: Volume,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            request_id,
            side,
            symbol: symbol.into(),
            volume,
            stop_loss: None,
            take_profit: None,
            timestamp: Utc::now(),
            intentionally_bad: false,
        }
    }

    /// Attach stop-loss / take-profit brackets.
    #[must_use]
    pub fn with_brackets(mut self, stop_loss: Option<Price>, take_profit: Option<Price>) -> Self {
        self.stop_loss = stop_loss;
        self.take_profit = take_profit;
        self
    }
}

impl fmt::Display for TradeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.intentionally_bad {
            write!(f, "[INTENTIONAL-BAD-REQUEST] ")?;
        }
        write!(
            f,
            "[{}] {} {} {} {} lots",
            self.request_id, self.client_id, self.side, self.symbol, self.volume
        )?;
        if let Some(sl) = self.stop_loss {
            write!(f, " SL={sl}")?;
        }
        if let Some(tp) = self.take_profit {
            write!(f, " TP={tp}")?;
        }
        Ok(())
    }
}
