//! Fairgate admission core
//!
//! Seat-aware fair queuing for admitting requests into a server with a fixed
//! concurrency budget. Each request carries a flow identifier and a seat
//! count; requests wait in shuffle-sharded queues and are dispatched in
//! virtual-time order so no flow can crowd out the others.
//!
//! # Layout
//!
//! - [`scheduler`]: the queue set engine, its configs, and the dealer
//! - [`clock`]: time source abstraction (tokio or manually stepped)
//! - [`telemetry`]: logging setup, request spans, metrics observers
//! - [`config`]: environment and TOML configuration
//! - [`cli`]: subcommands behind the `fairgate-cli` binary
//!
//! # Example
//!
//! ```no_run
//! use fairgate_core::scheduler::{DispatchingConfig, QueueSet, QueuingConfig, WorkEstimate};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run() -> Result<(), fairgate_core::scheduler::ConfigError> {
//! let qs = QueueSet::new(QueuingConfig::default(), DispatchingConfig::default())?;
//! let (request, _idle) = qs
//!     .start_request(42, WorkEstimate::single_seat(), "tenant-a", CancellationToken::new())
//!     .await;
//! if let Some(request) = request {
//!     request.finish(|| { /* serve it */ });
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod clock;
pub mod config;
pub mod scheduler;
pub mod telemetry;

pub use clock::{Clock, FakeClock, TokioClock};
pub use scheduler::{
    DispatchingConfig, QueueSet, QueueSetObserver, QueuingConfig, RejectReason, Request,
    WorkEstimate,
};
