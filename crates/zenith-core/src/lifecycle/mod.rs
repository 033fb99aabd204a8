//! # Application Lifecycle & Orchestration
//!
//! The orchestrator ([`Zenith`]) drives the whole runtime: it loads configuration,
//! lets every registered System contribute its module tree, has the container
//! resolve and build every orb, then starts the Systems one after another.
//!
//! ## Ordering guarantees
//!
//! - Orbs are built in a topological order of their dependencies.
//! - Systems start in registration order; each `on_start` completes before the next begins.
//! - On shutdown Systems stop in registration order by default ([`StopOrder`]). A failing
//!   `on_stop` does not prevent the others from being stopped.
//!
//! ## Shutdown channel
//!
//! Shutdown is driven by a [`CancellationToken`](tokio_util::sync::CancellationToken) the
//! orchestrator owns. The signal listener installed at boot cancels it on Ctrl-C or
//! SIGTERM; embedders and tests can cancel it directly through
//! [`Zenith::shutdown_token`].
//!
//! ## Observability
//!
//! See [`tracing`] for the subscriber setup used by binaries.

pub mod shutdown;
pub mod tracing;
pub mod zenith;

pub use self::tracing::{error_chain, setup_tracing};
pub use shutdown::{install_signal_handlers, StopOrder};
pub use zenith::{BootReport, ShutdownReport, Zenith};
