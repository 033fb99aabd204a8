//! # Heartbeat
//!
//! [`HeartbeatService`] is the `heartbeat` orb, declared in
//! `systems/heartbeat/heartbeat.orb.toml`. [`HeartbeatSystem`] owns the
//! background task that ticks it between start and stop.

mod service;
mod system;

pub use service::HeartbeatService;
pub(crate) use service::factory as service_factory;
pub use system::HeartbeatSystem;

/// Orb name of the [`HeartbeatService`].
pub const HEARTBEAT_ORB: &str = "heartbeat";
