//! Deal processor: owns the queue, the worker pool, and the per-request
//! processing pipeline.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use mtdeal_broker::BrokerApi;
use mtdeal_core::{TradeRequest, TradeResult, TradeStatus};

use crate::error::{EngineError, EngineResult};
use crate::queue::WorkQueue;
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::tracker::ResultTracker;
use crate::validator::Validator;

/// Worker pool and retry tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Worker threads consuming the queue.
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
    /// Executions allowed beyond the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base backoff delay in milliseconds.
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,
}

fn default_num_workers() -> usize {
    4
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    100
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
        }
    }
}

impl ProcessorConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.num_workers == 0 {
            return Err(EngineError::InvalidConfig(
                "num_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Completion callback supplied with a submission. Runs on a worker
/// thread, so it must be thread-safe with respect to the submitter.
pub type ResultCallback = Box<dyn FnOnce(TradeResult) + Send + 'static>;

struct WorkItem {
    request: TradeRequest,
    callback: Option<ResultCallback>,
}

// Lifecycle: Fresh -> Running -> Stopping -> Stopped. One-way.
const STATE_FRESH: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;
const STATE_STOPPED: u8 = 3;

/// Orchestrates the dispatch pipeline: admission, queued hand-off, a pool
/// of worker threads, retry of transient dealer failures, and durable
/// result tracking.
///
/// Every request admitted by [`submit`](DealProcessor::submit) yields
/// exactly one recorded result and (when a callback was supplied) exactly
/// one callback invocation, including requests still queued when
/// [`stop`](DealProcessor::stop) is called: shutdown drains the queue
/// before the workers exit.
pub struct DealProcessor {
    config: ProcessorConfig,
    queue: Arc<WorkQueue<WorkItem>>,
    validator: Arc<Validator>,
    retry: Arc<RetryExecutor>,
    tracker: Arc<ResultTracker>,
    state: AtomicU8,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl DealProcessor {
    pub fn new(broker: Arc<dyn BrokerApi>, config: ProcessorConfig) -> Self {
        let policy = RetryPolicy::new(config.max_retries, config.retry_base_ms);
        Self {
            config,
            queue: Arc::new(WorkQueue::new()),
            validator: Arc::new(Validator::new(Arc::clone(&broker))),
            retry: Arc::new(RetryExecutor::new(broker, policy)),
            tracker: Arc::new(ResultTracker::new()),
            state: AtomicU8::new(STATE_FRESH),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the worker pool and begin accepting submissions. Calling
    /// `start` on an already started processor is a no-op.
    pub fn start(&self) {
        if self
            .state
            .compare_exchange(
                STATE_FRESH,
                STATE_RUNNING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        info!(workers = self.config.num_workers, "deal processor starting");

        let mut workers = self.workers.lock();
        for worker_id in 0..self.config.num_workers {
            let queue = Arc::clone(&self.queue);
            let validator = Arc::clone(&self.validator);
            let retry = Arc::clone(&self.retry);
            let tracker = Arc::clone(&self.tracker);

            let handle = thread::Builder::new()
                .name(format!("deal-worker-{worker_id}"))
                .spawn(move || worker_loop(worker_id, &queue, &validator, &retry, &tracker))
                .expect("failed to spawn worker thread");
            workers.push(handle);
        }

        info!("deal processor started");
    }

    /// Hand a request to the worker pool. Returns whether the request was
    /// admitted; submissions outside the Running state are logged and
    /// dropped without a result or callback.
    pub fn submit(&self, request: TradeRequest, callback: Option<ResultCallback>) -> bool {
        if self.state.load(Ordering::Acquire) != STATE_RUNNING {
            warn!(request_id = %request.request_id, "submission rejected: processor not running");
            return false;
        }

        info!(request = %request, "request received");
        self.queue.push(WorkItem { request, callback });
        true
    }

    /// Stop accepting submissions, drain everything already queued, and
    /// join the workers. Idempotent; a no-op unless currently running.
    pub fn stop(&self) {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPING,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_err()
        {
            return;
        }

        info!(pending = self.queue.len(), "deal processor draining");
        self.queue.shutdown();

        let handles: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if handle.join().is_err() {
                error!("worker thread panicked outside request processing");
            }
        }

        self.state.store(STATE_STOPPED, Ordering::Release);
        info!("deal processor stopped, all workers joined");
    }

    /// Instantaneous queue depth.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    pub fn tracker(&self) -> Arc<ResultTracker> {
        Arc::clone(&self.tracker)
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }
}

impl Drop for DealProcessor {
    fn drop(&mut self) {
        if self.state.load(Ordering::Acquire) == STATE_RUNNING {
            self.stop();
        }
    }
}

fn worker_loop(
    worker_id: usize,
    queue: &WorkQueue<WorkItem>,
    validator: &Validator,
    retry: &RetryExecutor,
    tracker: &ResultTracker,
) {
    info!(worker_id, "worker started");

    while let Some(item) = queue.pop() {
        let WorkItem { request, callback } = item;

        // A panic while processing one request must not take the worker
        // down with it; the request still gets a terminal result.
        let result = catch_unwind(AssertUnwindSafe(|| {
            process_request(worker_id, &request, validator, retry)
        }))
        .unwrap_or_else(|_| {
            error!(worker_id, request_id = %request.request_id, "request processing panicked");
            TradeResult::failure(
                &request,
                TradeStatus::ConnectionError,
                "Internal processing failure",
            )
        });

        tracker.record(result.clone());

        if let Some(callback) = callback {
            let request_id = result.request_id.clone();
            if catch_unwind(AssertUnwindSafe(move || callback(result))).is_err() {
                error!(worker_id, %request_id, "result callback panicked");
            }
        }
    }

    info!(worker_id, "worker stopped");
}

fn process_request(
    worker_id: usize,
    request: &TradeRequest,
    validator: &Validator,
    retry: &RetryExecutor,
) -> TradeResult {
    debug!(worker_id, request_id = %request.request_id, "validating");
    if let Err(rejection) = validator.validate(request) {
        warn!(worker_id, result = %rejection, "validation failed");
        return rejection;
    }

    let result = retry.execute(request);
    if result.is_success() {
        info!(worker_id, result = %result, "EXECUTED");
    } else {
        error!(worker_id, result = %result, "FAILED");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use rust_decimal_macros::dec;

    use mtdeal_broker::{MockBroker, MockBrokerConfig};
    use mtdeal_core::{
        AccountInfo, Price, RequestId, SymbolInfo, TicketId, TradeSide, Volume,
    };

    fn reliable_processor(config: ProcessorConfig) -> DealProcessor {
        let broker = Arc::new(MockBroker::new(MockBrokerConfig::reliable()));
        DealProcessor::new(broker, config)
    }

    fn single_worker_config() -> ProcessorConfig {
        ProcessorConfig {
            num_workers: 1,
            max_retries: 0,
            retry_base_ms: 0,
        }
    }

    fn request(id: &str, symbol: &str, volume: rust_decimal::Decimal) -> TradeRequest {
        TradeRequest::new(
            "C1",
            RequestId::new(id),
            TradeSide::Buy,
            symbol,
            Volume::new(volume),
        )
    }

    /// Collects callback results for assertions.
    fn collecting_callback(
        sink: &Arc<parking_lot::Mutex<Vec<TradeResult>>>,
    ) -> ResultCallback {
        let sink = Arc::clone(sink);
        Box::new(move |result| sink.lock().push(result))
    }

    #[test]
    fn test_config_validation() {
        assert!(ProcessorConfig::default().validate().is_ok());

        let bad = ProcessorConfig {
            num_workers: 0,
            ..ProcessorConfig::default()
        };
        assert!(matches!(
            bad.validate(),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_happy_path() {
        let processor = reliable_processor(single_worker_config());
        processor.start();

        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
        assert!(processor.submit(
            request("C1-000000", "EURUSD", dec!(0.10)),
            Some(collecting_callback(&results)),
        ));

        processor.stop();

        let results = results.lock();
        assert_eq!(results.len(), 1);
        let result = &results[0];
        assert_eq!(result.status, TradeStatus::Success);
        assert_eq!(result.retry_count, 0);
        assert!(result.ticket_id.is_some());
        assert!(result.execution_price.is_positive());

        let tracked = processor
            .tracker()
            .get_by_request_id(&RequestId::new("C1-000000"))
            .unwrap();
        assert_eq!(&tracked, result);
    }

    #[test]
    fn test_duplicate_submission() {
        let processor = reliable_processor(single_worker_config());
        processor.start();

        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
        processor.submit(
            request("C1-000000", "EURUSD", dec!(0.10)),
            Some(collecting_callback(&results)),
        );
        processor.submit(
            request("C1-000000", "EURUSD", dec!(0.10)),
            Some(collecting_callback(&results)),
        );

        processor.stop();

        let results = results.lock();
        assert_eq!(results.len(), 2);
        // Single worker, FIFO queue: first wins, second is the duplicate.
        assert_eq!(results[0].status, TradeStatus::Success);
        assert_eq!(results[1].status, TradeStatus::Duplicate);
        assert!(results[1].error_message.contains("C1-000000"));
    }

    #[test]
    fn test_invalid_volume_rejected_before_broker() {
        let processor = reliable_processor(single_worker_config());
        processor.start();

        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
        processor.submit(
            request("C1-000000", "EURUSD", dec!(0)),
            Some(collecting_callback(&results)),
        );
        processor.stop();

        let results = results.lock();
        assert_eq!(results[0].status, TradeStatus::InvalidParams);
        assert_eq!(results[0].retry_count, 0);
    }

    #[test]
    fn test_unknown_symbol_rejected() {
        let processor = reliable_processor(single_worker_config());
        processor.start();

        let results = Arc::new(parking_lot::Mutex::new(Vec::new()));
        processor.submit(
            request("C1-000000", "INVALID", dec!(0.10)),
            Some(collecting_callback(&results)),
        );
        processor.stop();

        assert_eq!(results.lock()[0].status, TradeStatus::InvalidParams);
    }

    #[test]
    fn test_submit_outside_running_rejected() {
        let processor = reliable_processor(single_worker_config());

        // Fresh: not yet started.
        assert!(!processor.submit(request("r0", "EURUSD", dec!(0.10)), None));

        processor.start();
        assert!(processor.submit(request("r1", "EURUSD", dec!(0.10)), None));
        processor.stop();

        // Stopped.
        assert!(!processor.submit(request("r2", "EURUSD", dec!(0.10)), None));
        assert_eq!(processor.tracker().result_count(), 1);
    }

    #[test]
    fn test_start_and_stop_idempotent() {
        let processor = reliable_processor(single_worker_config());
        processor.start();
        processor.start();

        processor.submit(request("r0", "EURUSD", dec!(0.10)), None);

        processor.stop();
        processor.stop();

        assert_eq!(processor.tracker().result_count(), 1);
    }

    #[test]
    fn test_stop_drains_queue() {
        let processor = reliable_processor(ProcessorConfig {
            num_workers: 2,
            max_retries: 0,
            retry_base_ms: 0,
        });
        processor.start();

        let callbacks = Arc::new(AtomicUsize::new(0));
        for i in 0..100 {
            let callbacks = Arc::clone(&callbacks);
            let admitted = processor.submit(
                request(&format!("r{i:03}"), "EURUSD", dec!(0.01)),
                Some(Box::new(move |_| {
                    callbacks.fetch_add(1, Ordering::AcqRel);
                })),
            );
            assert!(admitted);
        }

        processor.stop();

        assert_eq!(processor.queue_depth(), 0);
        assert_eq!(processor.tracker().result_count(), 100);
        assert_eq!(callbacks.load(Ordering::Acquire), 100);
    }

    #[test]
    fn test_drop_stops_running_processor() {
        let processor = reliable_processor(single_worker_config());
        processor.start();
        processor.submit(request("r0", "EURUSD", dec!(0.10)), None);
        drop(processor);
    }

    /// Broker whose dealer call always panics.
    struct PanickyBroker;

    impl BrokerApi for PanickyBroker {
        fn connect(&self, _server: &str, _login: u64, _password: &str) -> bool {
            true
        }

        fn disconnect(&self) {}

        fn is_connected(&self) -> bool {
            true
        }

        fn symbol_info(&self, symbol: &str) -> Option<SymbolInfo> {
            Some(SymbolInfo {
                name: symbol.to_string(),
                bid: Price::new(dec!(1.0)),
                ask: Price::new(dec!(1.0)),
                min_volume: Volume::new(dec!(0.01)),
                max_volume: Volume::new(dec!(100)),
                volume_step: Volume::new(dec!(0.01)),
                digits: 5,
                trade_allowed: true,
            })
        }

        fn account_info(&self, _login: u64) -> Option<AccountInfo> {
            None
        }

        fn execute_trade(&self, _request: &TradeRequest) -> TradeResult {
            panic!("broker exploded");
        }

        fn ticket_info(&self, _ticket_id: &TicketId) -> Option<TradeResult> {
            None
        }

        fn symbol_names(&self) -> Vec<String> {
            Vec::new()
        }
    }

    #[test]
    fn test_worker_survives_panicking_broker() {
        let processor = DealProcessor::new(Arc::new(PanickyBroker), single_worker_config());
        processor.start();

        processor.submit(request("r0", "EURUSD", dec!(0.10)), None);
        // The worker must still be alive to process this one.
        processor.submit(request("r1", "EURUSD", dec!(0.10)), None);

        processor.stop();

        let tracker = processor.tracker();
        assert_eq!(tracker.result_count(), 2);
        // Panicking attempts are transient failures; with a zero retry
        // budget they surface as exhausted.
        for id in ["r0", "r1"] {
            let result = tracker.get_by_request_id(&RequestId::new(id)).unwrap();
            assert_eq!(result.status, TradeStatus::RetryExhausted);
        }
    }

    #[test]
    fn test_worker_survives_panicking_callback() {
        let processor = reliable_processor(single_worker_config());
        processor.start();

        processor.submit(
            request("r0", "EURUSD", dec!(0.10)),
            Some(Box::new(|_| panic!("callback exploded"))),
        );

        let completed = Arc::new(AtomicUsize::new(0));
        {
            let completed = Arc::clone(&completed);
            processor.submit(
                request("r1", "EURUSD", dec!(0.10)),
                Some(Box::new(move |_| {
                    completed.fetch_add(1, Ordering::AcqRel);
                })),
            );
        }

        processor.stop();

        assert_eq!(processor.tracker().result_count(), 2);
        assert_eq!(completed.load(Ordering::Acquire), 1);
    }

    #[test]
    fn test_queue_depth_reports_backlog() {
        let broker = Arc::new(MockBroker::new(MockBrokerConfig {
            failure_rate: 0.0,
            min_latency_ms: 20,
            max_latency_ms: 20,
        }));
        let processor = DealProcessor::new(broker, single_worker_config());
        processor.start();

        for i in 0..5 {
            processor.submit(request(&format!("r{i}"), "EURUSD", dec!(0.01)), None);
        }
        // With one worker sleeping 20ms per fill, a backlog must be
        // observable before the drain completes.
        std::thread::sleep(Duration::from_millis(5));
        assert!(processor.queue_depth() > 0);

        processor.stop();
        assert_eq!(processor.queue_depth(), 0);
        assert_eq!(processor.tracker().result_count(), 5);
    }
}
