//! Simulation orchestration: processor bring-up, client fan-out, drain,
//! timing, and reporting.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::info;

use mtdeal_broker::BrokerApi;
use mtdeal_engine::DealProcessor;

use crate::client::{ClientConfig, ClientSimulator};
use crate::config::SimConfig;
use crate::error::AppResult;
use crate::summary;

/// Poll interval while waiting for the queue to drain.
const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Settle time after the queue reads empty, covering requests already
/// popped but still executing on workers.
const SETTLE: Duration = Duration::from_millis(500);

/// One full simulation run against a broker.
pub struct Simulation {
    config: SimConfig,
}

impl Simulation {
    pub fn new(config: SimConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, broker: Arc<dyn BrokerApi>) -> AppResult<()> {
        self.config.processor.validate()?;

        let clients = &self.config.clients;
        info!(
            clients = clients.count,
            requests_each = clients.requests_each,
            workers = self.config.processor.num_workers,
            "simulation starting"
        );

        let processor = Arc::new(DealProcessor::new(broker, self.config.processor));
        processor.start();

        let simulators: Vec<Arc<ClientSimulator>> = (0..clients.count)
            .map(|i| {
                Arc::new(ClientSimulator::new(ClientConfig {
                    client_id: format!("{}{}", clients.id_prefix, i + 1),
                    num_requests: clients.requests_each,
                    min_delay_ms: clients.min_delay_ms,
                    max_delay_ms: clients.max_delay_ms,
                    send_bad_requests: clients.send_bad_requests,
                }))
            })
            .collect();

        let started = Instant::now();
        info!(count = simulators.len(), "launching client threads");

        let submitters: Vec<_> = simulators
            .iter()
            .map(|simulator| {
                let simulator = Arc::clone(simulator);
                let processor = Arc::clone(&processor);
                thread::spawn(move || simulator.run(&processor))
            })
            .collect();

        for submitter in submitters {
            submitter.join().expect("client thread panicked");
        }

        let submit_elapsed = started.elapsed();
        info!("all clients finished submitting");

        // Let the workers drain the backlog, then allow in-flight dealer
        // calls to settle before measuring.
        while processor.queue_depth() > 0 {
            thread::sleep(DRAIN_POLL);
        }
        thread::sleep(SETTLE);
        let total_elapsed = started.elapsed();

        processor.stop();

        let total_requests = clients.count * clients.requests_each;
        print_timing(submit_elapsed, total_elapsed, total_requests);
        summary::print_summary(&processor.tracker());

        Ok(())
    }
}

fn print_timing(submit: Duration, total: Duration, requests: usize) {
    let total_ms = total.as_millis().max(1);
    println!("\n  Timing:");
    println!("    Client submission phase: {}ms", submit.as_millis());
    println!("    Total processing time:   {total_ms}ms");
    println!("    Requests processed:      {requests}");
    println!(
        "    Throughput:              {:.1} req/sec",
        1000.0 * requests as f64 / total_ms as f64
    );
}
