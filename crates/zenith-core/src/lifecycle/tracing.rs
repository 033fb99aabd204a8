//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG`, falling back to `info`.
//!
//! ```bash
//! RUST_LOG=info cargo run -p zenith-sample     # boot, system start/stop
//! RUST_LOG=debug cargo run -p zenith-sample    # every manifest, descriptor and construction
//! RUST_LOG=zenith_core=trace cargo run -p zenith-sample
//! ```
//!
//! The runtime logs with structured fields (`system`, `orb`, `root`, `environment`)
//! instead of module paths, so targets are hidden.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. Calling it again is a no-op.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Renders an error and every `source()` below it, `: `-separated.
pub fn error_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut rendered = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !rendered.ends_with(&text) {
            rendered.push_str(": ");
            rendered.push_str(&text);
        }
        source = cause.source();
    }
    rendered
}
