//! Factory keys referenced by this crate's orb manifests.

use zenith_core::Zenith;

use crate::{greeter, heartbeat, settings};

pub const GREETER: &str = "sample::greeter";
pub const HEARTBEAT_SETTINGS: &str = "sample::heartbeat_settings";
pub const HEARTBEAT_SERVICE: &str = "sample::heartbeat_service";

/// Adds every factory this crate provides to the orchestrator's catalog.
pub fn register_factories(zenith: Zenith) -> Zenith {
    zenith
        .with_factory(GREETER, greeter::factory)
        .with_factory(HEARTBEAT_SETTINGS, settings::factory)
        .with_factory(HEARTBEAT_SERVICE, heartbeat::service_factory)
}
