//! Concurrent trade dispatch engine.
//!
//! Sits between an unbounded set of client submitters and a broker API.
//! Submitted requests flow through a blocking work queue to a pool of
//! worker threads; each worker validates, executes with retry, records the
//! outcome, and notifies the submitter:
//!
//! ```text
//! submit(request, callback) -> WorkQueue -> worker pool
//!     -> Validator -> RetryExecutor -> ResultTracker -> callback
//! ```
//!
//! Per-producer submission order is preserved through the queue; results
//! completing on different workers have no global ordering.

pub mod error;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod tracker;
pub mod validator;

pub use error::{EngineError, EngineResult};
pub use processor::{DealProcessor, ProcessorConfig, ResultCallback};
pub use queue::WorkQueue;
pub use retry::{RetryExecutor, RetryPolicy};
pub use tracker::{ResultTracker, TrackerStats};
pub use validator::Validator;
