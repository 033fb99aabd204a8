//! # Zenith Core
//!
//! An application bootstrap runtime built around three pieces:
//!
//! 1. **The orb container** ([`OrbContainer`]) - a dependency-injection registry of named,
//!    optionally typed singletons ("orbs"). It resolves the dependency graph between them,
//!    rejects invalid graphs (duplicate names, missing or ambiguous references, cycles)
//!    before building anything, then builds each orb exactly once in dependency order.
//! 2. **Module discovery** ([`ModuleLoader`]) - walks a directory tree for `*.orb.toml`
//!    manifests and pairs each declared orb with a factory from a [`FactoryCatalog`].
//! 3. **Systems** ([`System`]) - pluggable subsystems with their own module root and an
//!    async start/stop lifecycle, composed by the orchestrator ([`Zenith`]).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use zenith_core::{setup_tracing, Zenith};
//!
//! #[tokio::main]
//! async fn main() -> std::process::ExitCode {
//!     setup_tracing();
//!     match Zenith::new("app").with(HeartbeatSystem::new).run().await {
//!         Ok(_) => std::process::ExitCode::SUCCESS,
//!         Err(_) => std::process::ExitCode::FAILURE,
//!     }
//! }
//! ```
//!
//! ## Writing an orb
//!
//! A factory receives its declared dependencies already built:
//!
//! ```rust
//! use zenith_core::{orb_value, Dependency, Injected, OrbContainer, OrbDescriptor};
//!
//! let container = OrbContainer::new();
//! container
//!     .register_descriptor(OrbDescriptor::new("greeting", |_| Ok(orb_value("hello".to_string()))))
//!     .unwrap();
//! container
//!     .register_descriptor(
//!         OrbDescriptor::new("greeter", |deps: &Injected| {
//!             let greeting = deps.one::<String>("greeting")?;
//!             Ok(orb_value(format!("{greeting}, world")))
//!         })
//!         .depends_on(Dependency::one("greeting")),
//!     )
//!     .unwrap();
//!
//! container.instantiate_orbs().unwrap();
//! assert_eq!(*container.get::<String>("greeter").unwrap(), "hello, world");
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p zenith-core
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod lifecycle;
pub mod loader;
pub mod mock;
pub mod orb;
pub mod system;

pub use config::{active_environment, Config, ConfigLoader, ORB_TYPE_CONFIG};
pub use container::{ContainerRef, OrbContainer, ZENITH_CONFIG_ORB, ZENITH_CONTAINER_ORB};
pub use error::{BoxError, Result, ZenithError};
pub use lifecycle::{setup_tracing, BootReport, ShutdownReport, StopOrder, Zenith};
pub use loader::{FactoryCatalog, FactoryEntry, Module, ModuleLoader, ModuleSet, OrbMetadata, ORB_FACTORIES};
pub use orb::{orb_value, Dependency, Injected, Orb, OrbDescriptor, OrbFactory, OrbValue, Resolved};
pub use system::{System, SystemState};
