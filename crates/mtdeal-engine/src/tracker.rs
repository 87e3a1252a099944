//! Concurrent result store.
//!
//! Maintains the mapping between client request ids and broker deal
//! tickets, queryable by request id or client id, with aggregate
//! statistics for reporting.

use std::collections::HashMap;

use parking_lot::Mutex;

use mtdeal_core::{Price, RequestId, TicketId, TradeResult, TradeStatus};

/// Aggregate counts over recorded results.
///
/// Bucket mapping: SUCCESS -> `successful`; DUPLICATE -> `duplicates`;
/// REJECTED, MARGIN_ERROR, RETRY_EXHAUSTED -> `rejected`;
/// CONNECTION_ERROR, INVALID_PARAMS -> `errors`. `total_requests` is the
/// sum of the four buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrackerStats {
    pub total_requests: usize,
    pub successful: usize,
    pub rejected: usize,
    pub errors: usize,
    pub duplicates: usize,
}

impl TrackerStats {
    fn count(&mut self, status: TradeStatus) {
        self.total_requests += 1;
        match status {
            TradeStatus::Success => self.successful += 1,
            TradeStatus::Duplicate => self.duplicates += 1,
            TradeStatus::Rejected | TradeStatus::MarginError | TradeStatus::RetryExhausted => {
                self.rejected += 1;
            }
            TradeStatus::ConnectionError | TradeStatus::InvalidParams => self.errors += 1,
        }
    }

    /// Fraction of recorded results that succeeded, as a percentage.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        100.0 * self.successful as f64 / self.total_requests as f64
    }
}

#[derive(Default)]
struct TrackerInner {
    /// request id -> result.
    results: HashMap<RequestId, TradeResult>,
    /// client id -> request ids in recording order.
    client_requests: HashMap<String, Vec<RequestId>>,
}

/// Thread-safe store of completed results with two indices: by request id
/// and by client id. Both indices are updated in a single critical
/// section, so a result visible through one is visible through the other.
#[derive(Default)]
pub struct ResultTracker {
    inner: Mutex<TrackerInner>,
}

impl ResultTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finalized result. Re-recording a request id overwrites the
    /// stored result and appends another entry to the client's list.
    pub fn record(&self, result: TradeResult) {
        let mut inner = self.inner.lock();
        inner
            .client_requests
            .entry(result.client_id.clone())
            .or_default()
            .push(result.request_id.clone());
        inner.results.insert(result.request_id.clone(), result);
    }

    pub fn get_by_request_id(&self, request_id: &RequestId) -> Option<TradeResult> {
        self.inner.lock().results.get(request_id).cloned()
    }

    /// Snapshot of a client's results in recording order.
    pub fn get_by_client_id(&self, client_id: &str) -> Vec<TradeResult> {
        let inner = self.inner.lock();
        let Some(request_ids) = inner.client_requests.get(client_id) else {
            return Vec::new();
        };
        request_ids
            .iter()
            .filter_map(|id| inner.results.get(id).cloned())
            .collect()
    }

    /// Aggregate statistics across all recorded results.
    pub fn stats(&self) -> TrackerStats {
        let inner = self.inner.lock();
        let mut stats = TrackerStats::default();
        for result in inner.results.values() {
            stats.count(result.status);
        }
        stats
    }

    /// Aggregate statistics for one client.
    pub fn client_stats(&self, client_id: &str) -> TrackerStats {
        let inner = self.inner.lock();
        let mut stats = TrackerStats::default();
        let Some(request_ids) = inner.client_requests.get(client_id) else {
            return stats;
        };
        for id in request_ids {
            if let Some(result) = inner.results.get(id) {
                stats.count(result.status);
            }
        }
        stats
    }

    /// Number of distinct recorded results.
    pub fn result_count(&self) -> usize {
        self.inner.lock().results.len()
    }

    /// All client ids with at least one recorded result, sorted.
    pub fn client_ids(&self) -> Vec<String> {
        let inner = self.inner.lock();
        let mut ids: Vec<String> = inner.client_requests.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Request id -> deal ticket -> fill price for every successful trade,
    /// sorted by request id.
    pub fn success_mappings(&self) -> Vec<(RequestId, TicketId, Price)> {
        let inner = self.inner.lock();
        let mut mappings: Vec<_> = inner
            .results
            .values()
            .filter(|r| r.is_success())
            .filter_map(|r| {
                r.ticket_id
                    .clone()
                    .map(|ticket| (r.request_id.clone(), ticket, r.execution_price))
            })
            .collect();
        mappings.sort_by(|a, b| a.0.cmp(&b.0));
        mappings
    }
}
