//! Full-pipeline stress tests: concurrent producers feeding the worker
//! pool through the queue, with exact accounting after shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use rust_decimal_macros::dec;

use mtdeal_broker::{MockBroker, MockBrokerConfig};
use mtdeal_core::{RequestId, TradeRequest, TradeSide, TradeStatus, Volume};
use mtdeal_engine::{DealProcessor, ProcessorConfig};

fn request(client: &str, id: String) -> TradeRequest {
    TradeRequest::new(
        client,
        RequestId::new(id),
        TradeSide::Buy,
        "EURUSD",
        Volume::new(dec!(0.01)),
    )
}

fn build_processor(broker_config: MockBrokerConfig, num_workers: usize) -> Arc<DealProcessor> {
    let broker = Arc::new(MockBroker::new(broker_config));
    Arc::new(DealProcessor::new(
        broker,
        ProcessorConfig {
            num_workers,
            max_retries: 0,
            retry_base_ms: 0,
        },
    ))
}

#[test]
fn stress_no_lost_requests() {
    const PRODUCERS: usize = 6;
    const PER_PRODUCER: usize = 50;
    const TOTAL: usize = PRODUCERS * PER_PRODUCER;

    let processor = build_processor(MockBrokerConfig::reliable(), 4);
    processor.start();

    let callbacks = Arc::new(AtomicUsize::new(0));
    let submitters: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let processor = Arc::clone(&processor);
            let callbacks = Arc::clone(&callbacks);
            thread::spawn(move || {
                let client = format!("Client-{p}");
                for i in 0..PER_PRODUCER {
                    let counter = Arc::clone(&callbacks);
                    let admitted = processor.submit(
                        request(&client, format!("{client}-{i:06}")),
                        Some(Box::new(move |_| {
                            counter.fetch_add(1, Ordering::AcqRel);
                        })),
                    );
                    assert!(admitted);
                }
            })
        })
        .collect();

    for submitter in submitters {
        submitter.join().unwrap();
    }

    processor.stop();

    assert_eq!(processor.queue_depth(), 0);
    assert_eq!(callbacks.load(Ordering::Acquire), TOTAL);

    let tracker = processor.tracker();
    assert_eq!(tracker.result_count(), TOTAL);

    let stats = tracker.stats();
    assert_eq!(stats.total_requests, TOTAL);
    assert_eq!(stats.successful, TOTAL, "unique ids on a reliable broker all fill");
    assert_eq!(
        stats.successful + stats.rejected + stats.errors + stats.duplicates,
        TOTAL
    );

    for p in 0..PRODUCERS {
        let client = format!("Client-{p}");
        assert_eq!(tracker.get_by_client_id(&client).len(), PER_PRODUCER);
        assert_eq!(tracker.client_stats(&client).total_requests, PER_PRODUCER);
    }
}

#[test]
fn single_worker_preserves_submission_order() {
    const COUNT: usize = 30;

    let processor = build_processor(MockBrokerConfig::reliable(), 1);
    processor.start();

    for i in 0..COUNT {
        processor.submit(request("C1", format!("C1-{i:06}")), None);
    }
    processor.stop();

    let results = processor.tracker().get_by_client_id("C1");
    let ids: Vec<&str> = results.iter().map(|r| r.request_id.as_str()).collect();
    let expected: Vec<String> = (0..COUNT).map(|i| format!("C1-{i:06}")).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn duplicate_race_exactly_one_executes() {
    const SUBMITTERS: usize = 8;

    let processor = build_processor(MockBrokerConfig::reliable(), 4);
    processor.start();

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let racers: Vec<_> = (0..SUBMITTERS)
        .map(|_| {
            let processor = Arc::clone(&processor);
            let statuses = Arc::clone(&statuses);
            thread::spawn(move || {
                let sink = Arc::clone(&statuses);
                processor.submit(
                    request("Racer", "Racer-000000".to_string()),
                    Some(Box::new(move |result| sink.lock().push(result.status))),
                );
            })
        })
        .collect();

    for racer in racers {
        racer.join().unwrap();
    }

    processor.stop();

    let statuses = statuses.lock();
    assert_eq!(statuses.len(), SUBMITTERS);

    let executed = statuses
        .iter()
        .filter(|s| **s != TradeStatus::Duplicate)
        .count();
    assert_eq!(executed, 1, "a shared request id must execute exactly once");
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == TradeStatus::Duplicate)
            .count(),
        SUBMITTERS - 1
    );
}

#[test]
fn stop_waits_for_slow_broker_backlog() {
    const COUNT: usize = 40;

    let processor = build_processor(
        MockBrokerConfig {
            failure_rate: 0.0,
            min_latency_ms: 2,
            max_latency_ms: 5,
        },
        2,
    );
    processor.start();

    for i in 0..COUNT {
        processor.submit(request("C1", format!("C1-{i:06}")), None);
    }

    // Most of the backlog is still queued at this point; stop must drain
    // every item before returning.
    processor.stop();

    assert_eq!(processor.queue_depth(), 0);
    assert_eq!(processor.tracker().result_count(), COUNT);
    assert_eq!(processor.tracker().stats().successful, COUNT);
}
