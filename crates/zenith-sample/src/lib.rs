//! # Zenith Sample
//!
//! A small application booted by [`zenith_core::Zenith`]:
//!
//! - **[greeter]**: a `service` orb built from the `greeting` config section.
//! - **[settings]**: [`HeartbeatSettings`], a `config` orb read from the `heartbeat` section.
//! - **[heartbeat]**: [`HeartbeatService`] and the [`HeartbeatSystem`] that drives it.
//! - **[factories]**: the factory keys referenced by the `*.orb.toml` manifests.
//!
//! Application manifests live under `app/`, the heartbeat System's under
//! `systems/heartbeat/`.

use std::path::PathBuf;

use tracing::warn;
use zenith_core::Zenith;

pub mod factories;
pub mod greeter;
pub mod heartbeat;
pub mod settings;

pub use factories::register_factories;
pub use greeter::{Greeter, GreeterError};
pub use heartbeat::{HeartbeatService, HeartbeatSystem};
pub use settings::HeartbeatSettings;

/// Application root shipped with this crate.
pub fn app_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("app")
}

/// Boots `zenith`, waits for shutdown and stops every System.
///
/// Only a boot failure is an error. Stop failures are logged per System by
/// [`Zenith::shutdown`] and summarized here.
pub async fn run(zenith: Zenith) -> zenith_core::Result<()> {
    let report = zenith.run().await?;
    if !report.is_clean() {
        warn!(failed = report.failures.len(), "Some systems failed to stop");
    }
    Ok(())
}
