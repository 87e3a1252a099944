//! MT5 Deal Processor Simulator - Entry Point
//!
//! Concurrent client threads feed trade requests through a central deal
//! processor that interfaces with a simulated MetaTrader 5 server via the
//! Manager API surface:
//!
//! ```text
//! client threads -> work queue -> worker pool -> MT API (mocked)
//!                                             -> result tracker
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use mtdeal_broker::{BrokerApi, MockBroker};
use mtdeal_sim::{logging, SimConfig, Simulation};

/// MT5 deal processor simulator
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MTDEAL_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,

    /// Run the high-frequency burst scenario
    #[arg(long)]
    burst: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    logging::init_logging()?;
    info!("Starting MT5 deal processor simulator v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > MTDEAL_CONFIG env var > scenario default.
    let config_path = args
        .config
        .or_else(|| std::env::var("MTDEAL_CONFIG").ok())
        .unwrap_or_else(|| {
            if args.burst {
                "config/burst.toml".to_string()
            } else {
                "config/default.toml".to_string()
            }
        });

    info!(config_path = %config_path, "Loading configuration");
    let fallback = if args.burst {
        SimConfig::burst()
    } else {
        SimConfig::default()
    };
    let config = SimConfig::load(&config_path, fallback)?;

    let broker = Arc::new(MockBroker::new(config.broker.clone().into()));

    info!(server = %config.broker.server, "Connecting to MT5 server...");
    if !broker.connect(&config.broker.server, config.broker.login, &config.broker.password) {
        anyhow::bail!("failed to connect to MT5 server");
    }

    let mut symbols = broker.symbol_names();
    symbols.sort();
    info!(count = symbols.len(), "Available symbols");
    for name in &symbols {
        if let Some(info) = broker.symbol_info(name) {
            info!(
                symbol = %name,
                bid = %info.bid,
                ask = %info.ask,
                min_volume = %info.min_volume,
                max_volume = %info.max_volume,
                "symbol"
            );
        }
    }

    if let Some(account) = broker.account_info(config.broker.login) {
        info!(
            login = account.login,
            balance = %account.balance,
            free_margin = %account.free_margin,
            currency = %account.currency,
            "Account ready"
        );
    }

    let simulation = Simulation::new(config);
    simulation.run(Arc::clone(&broker) as Arc<dyn BrokerApi>)?;

    broker.disconnect();
    info!("Demo complete");

    Ok(())
}
