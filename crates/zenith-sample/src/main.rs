use std::path::PathBuf;

use tracing::info;
use zenith_core::config::ROOT_VAR;
use zenith_core::lifecycle::error_chain;
use zenith_core::{setup_tracing, Zenith};
use zenith_sample::{app_root, register_factories, run, HeartbeatSystem};

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let root = std::env::var_os(ROOT_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(app_root);
    info!(root = %root.display(), "Starting zenith sample");

    let zenith = register_factories(Zenith::new(root)).with(HeartbeatSystem::new);
    run(zenith).await.map_err(|e| error_chain(&e))
}
