//! Synthetic client producers.
//!
//! Each simulator runs on its own thread and submits a configured number
//! of randomized requests, capturing results through the submit callback.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::ThreadRng;
use rand::{thread_rng, Rng};
use rust_decimal::Decimal;

use mtdeal_core::{Price, RequestId, TradeRequest, TradeResult, TradeSide, Volume};
use mtdeal_engine::DealProcessor;

/// Symbols the simulated clients trade.
const SYMBOLS: [&str; 6] = ["EURUSD", "GBPUSD", "USDJPY", "AUDUSD", "USDCAD", "XAUUSD"];

/// Chance a request carries SL/TP brackets.
const BRACKET_CHANCE: f64 = 0.40;

/// Chance a request is deliberately malformed when bad requests are on.
const BAD_REQUEST_CHANCE: f64 = 0.10;

/// Per-client simulator configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub client_id: String,
    pub num_requests: usize,
    /// Delay range between successive submissions.
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Mix in deliberately bad requests to exercise rejection paths.
    pub send_bad_requests: bool,
}

/// A single simulated client: generates requests, submits them, and
/// collects the results its callbacks receive.
pub struct ClientSimulator {
    config: ClientConfig,
    results: Arc<Mutex<Vec<TradeResult>>>,
}

impl ClientSimulator {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            results: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// Submit all configured requests, pausing a random delay between
    /// each. Blocks until the last request is handed off (results keep
    /// arriving asynchronously on worker threads).
    pub fn run(&self, processor: &DealProcessor) {
        let mut rng = thread_rng();

        for _ in 0..self.config.num_requests {
            let request = if self.config.send_bad_requests && rng.gen::<f64>() < BAD_REQUEST_CHANCE
            {
                self.generate_bad_request(&mut rng)
            } else {
                self.generate_request(&mut rng)
            };

            let sink = Arc::clone(&self.results);
            processor.submit(request, Some(Box::new(move |result| sink.lock().push(result))));

            let delay = if self.config.min_delay_ms >= self.config.max_delay_ms {
                self.config.max_delay_ms
            } else {
                rng.gen_range(self.config.min_delay_ms..=self.config.max_delay_ms)
            };
            thread::sleep(Duration::from_millis(delay));
        }
    }

    /// Snapshot of the results received so far.
    pub fn results(&self) -> Vec<TradeResult> {
        self.results.lock().clone()
    }

    fn generate_request(&self, rng: &mut ThreadRng) -> TradeRequest {
        let symbol = SYMBOLS[rng.gen_range(0..SYMBOLS.len())];
        let side = if rng.gen_bool(0.5) {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        };
        // 0.01 to 0.50 lots in 0.01 increments.
        let volume = Volume::new(Decimal::new(rng.gen_range(1..=50), 2));

        let mut request = TradeRequest::new(
            self.config.client_id.clone(),
            RequestId::generate(&self.config.client_id),
            side,
            symbol,
            volume,
        );

        if rng.gen::<f64>() < BRACKET_CHANCE {
            let base = bracket_base(symbol);
            let offset = base * Decimal::new(5, 3); // 0.5%
            let (sl, tp) = match side {
                TradeSide::Buy => (base - offset, base + offset),
                TradeSide::Sell => (base + offset, base - offset),
            };
            request = request.with_brackets(Some(Price::new(sl)), Some(Price::new(tp)));
        }

        request
    }

    /// One of four malformed shapes: unknown symbol, zero volume,
    /// oversized volume, negative stop-loss.
    fn generate_bad_request(&self, rng: &mut ThreadRng) -> TradeRequest {
        let request_id = RequestId::generate(&self.config.client_id);

        let mut request = match rng.gen_range(0..4) {
            0 => TradeRequest::new(
                self.config.client_id.clone(),
                request_id,
                TradeSide::Buy,
                "INVALID",
                Volume::new(Decimal::new(10, 2)),
            ),
            1 => TradeRequest::new(
                self.config.client_id.clone(),
                request_id,
                TradeSide::Sell,
                "EURUSD",
                Volume::ZERO,
            ),
            2 => TradeRequest::new(
                self.config.client_id.clone(),
                request_id,
                TradeSide::Buy,
                "EURUSD",
                Volume::new(Decimal::new(999, 0)),
            ),
            _ => TradeRequest::new(
                self.config.client_id.clone(),
                request_id,
                TradeSide::Sell,
                "GBPUSD",
                Volume::new(Decimal::new(10, 2)),
            )
            .with_brackets(Some(Price::new(Decimal::new(-1, 0))), None),
        };

        request.intentionally_bad = true;
        request
    }
}

/// Rough mid price used to place SL/TP brackets per symbol.
fn bracket_base(symbol: &str) -> Decimal {
    match symbol {
        "XAUUSD" => Decimal::new(2035, 0),
        "USDJPY" => Decimal::new(149, 0),
        _ => Decimal::ONE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use mtdeal_broker::{MockBroker, MockBrokerConfig};
    use mtdeal_core::TradeStatus;
    use mtdeal_engine::ProcessorConfig;

    fn client(id: &str, num_requests: usize, send_bad: bool) -> ClientSimulator {
        ClientSimulator::new(ClientConfig {
            client_id: id.to_string(),
            num_requests,
            min_delay_ms: 0,
            max_delay_ms: 0,
            send_bad_requests: send_bad,
        })
    }

    fn started_processor() -> DealProcessor {
        let broker = Arc::new(MockBroker::new(MockBrokerConfig::reliable()));
        let processor = DealProcessor::new(
            broker,
            ProcessorConfig {
                num_workers: 2,
                max_retries: 0,
                retry_base_ms: 0,
            },
        );
        processor.start();
        processor
    }

    #[test]
    fn test_every_submission_yields_a_result() {
        let processor = started_processor();
        let simulator = client("Client-1", 25, false);

        simulator.run(&processor);
        processor.stop();

        let results = simulator.results();
        assert_eq!(results.len(), 25);
        // Well-formed requests on a reliable broker all fill.
        assert!(results.iter().all(|r| r.status == TradeStatus::Success));
        assert!(results
            .iter()
            .all(|r| r.client_id == "Client-1" && r.request_id.as_str().starts_with("Client-1-")));
    }

    #[test]
    fn test_bad_requests_are_rejected_not_lost() {
        let processor = started_processor();
        let simulator = client("Client-2", 80, true);

        simulator.run(&processor);
        processor.stop();

        let results = simulator.results();
        assert_eq!(results.len(), 80);
        // Malformed shapes surface as rejections, never as fills.
        for result in results.iter().filter(|r| !r.is_success()) {
            assert!(matches!(
                result.status,
                TradeStatus::InvalidParams | TradeStatus::Rejected | TradeStatus::MarginError
            ));
        }
    }

    #[test]
    fn test_generated_volumes_within_client_range() {
        let simulator = client("Client-3", 1, false);
        let mut rng = thread_rng();

        for _ in 0..200 {
            let request = simulator.generate_request(&mut rng);
            assert!(request.volume >= Volume::new(Decimal::new(1, 2)));
            assert!(request.volume <= Volume::new(Decimal::new(50, 2)));
            assert!(SYMBOLS.contains(&request.symbol.as_str()));
            if let (Some(sl), Some(tp)) = (request.stop_loss, request.take_profit) {
                assert!(sl.is_positive());
                assert!(tp.is_positive());
                assert_ne!(sl, tp);
            }
        }
    }

    #[test]
    fn test_bad_request_shapes_marked() {
        let simulator = client("Client-4", 1, true);
        let mut rng = thread_rng();

        for _ in 0..50 {
            let request = simulator.generate_bad_request(&mut rng);
            assert!(request.intentionally_bad);

            let malformed = request.symbol == "INVALID"
                || !request.volume.is_positive()
                || request.volume > Volume::new(Decimal::new(100, 0))
                || request.stop_loss.is_some_and(|sl| !sl.is_positive());
            assert!(malformed, "bad request must violate at least one check");
        }
    }
}
