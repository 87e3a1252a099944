//! Trade outcome types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Price;
use crate::request::{RequestId, TradeRequest};

/// Terminal status of a processed trade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeStatus {
    /// Trade accepted and ticketed by the broker.
    Success,
    /// Broker refused the trade (e.g. trading disabled). Retryable.
    Rejected,
    /// Deterministic parameter violation. Not retried.
    InvalidParams,
    /// Transient broker/transport failure. Retryable.
    ConnectionError,
    /// Insufficient free margin. Not retried.
    MarginError,
    /// Request id already seen; no broker call was made.
    Duplicate,
    /// Retry budget consumed on a retryable failure.
    RetryExhausted,
}

impl TradeStatus {
    /// Whether the retry loop should attempt this outcome again.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConnectionError | Self::Rejected)
    }
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Success => "SUCCESS",
            Self::Rejected => "REJECTED",
            Self::InvalidParams => "INVALID_PARAMS",
            Self::ConnectionError => "CONNECTION_ERROR",
            Self::MarginError => "MARGIN_ERROR",
            Self::Duplicate => "DUPLICATE",
            Self::RetryExhausted => "RETRY_EXHAUSTED",
        };
        write!(f, "{s}")
    }
}

/// Broker-assigned identifier for an executed deal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicketId(String);

impl TicketId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for TicketId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Outcome of a trade request. Produced exactly once per admitted request.
///
/// Field invariants: `ticket_id` is `Some` and `execution_price` positive
/// exactly when `status` is `Success`; `error_message` is non-empty exactly
/// when it is not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeResult {
    /// Copied from the request.
    pub request_id: RequestId,
    /// Copied from the request.
    pub client_id: String,
    /// Terminal status.
    pub status: TradeStatus,
    /// Broker deal ticket, present only on success.
    pub ticket_id: Option<TicketId>,
    /// Fill price; zero on failure.
    pub execution_price: Price,
    /// Human-readable failure description; empty on success.
    pub error_message: String,
    /// Number of executions beyond the first (0 for a first-attempt outcome
    /// or a pre-execution rejection).
    pub retry_count: u32,
    /// Time the result was finalized.
    pub timestamp: DateTime<Utc>,
}

impl TradeResult {
    /// Successful execution with a deal ticket and fill price.
    pub fn success(request: &TradeRequest, ticket_id: TicketId, execution_price: Price) -> Self {
        Self {
            request_id: request.request_id.clone(),
            client_id: request.client_id.clone(),
            status: TradeStatus::Success,
            ticket_id: Some(ticket_id),
            execution_price,
            error_message: String::new(),
            retry_count: 0,
            timestamp: Utc::now(),
        }
    }

    /// Failed outcome with the given status and error description.
    pub fn failure(
        request: &TradeRequest,
        status: TradeStatus,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request.request_id.clone(),
            client_id: request.client_id.clone(),
            status,
            ticket_id: None,
            execution_price: Price::ZERO,
            error_message: error_message.into(),
            retry_count: 0,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == TradeStatus::Success
    }

    /// Whether the retry loop should attempt again after this outcome.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.status.is_retryable()
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.request_id, self.status)?;
        if self.is_success() {
            let ticket = self.ticket_id.as_ref().map(TicketId::as_str).unwrap_or("");
            write!(f, " Ticket=#{ticket} Price={}", self.execution_price)?;
        } else {
            write!(f, " Error: {}", self.error_message)?;
        }
        if self.retry_count > 0 {
            write!(f, " (retries={})", self.retry_count)?;
        }
        Ok(())
    }
}
