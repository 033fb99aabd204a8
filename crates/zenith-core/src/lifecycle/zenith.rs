use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::shutdown::{install_signal_handlers, StopOrder};
use super::tracing::error_chain;
use crate::config::{active_environment, ConfigLoader, ORB_TYPE_CONFIG};
use crate::container::{OrbContainer, ZENITH_CONFIG_ORB};
use crate::error::{BoxError, Result, ZenithError};
use crate::loader::ModuleLoader;
use crate::orb::{Injected, OrbValue};
use crate::system::{System, SystemSlot, SystemState};

/// The orchestrator: owns the container, the loaders and the registered Systems.
///
/// # Boot sequence
///
/// [`Zenith::boot`] runs these steps and stops at the first failure:
///
/// 1. Register the container under `zenith:container`.
/// 2. Load configuration for the active environment, register it under `zenith:config`.
/// 3. For each System, in registration order: construct it, scan its root, register its modules.
/// 4. Scan the application root, register its modules.
/// 5. Instantiate every orb in dependency order.
/// 6. Install the termination-signal listener.
/// 7. Start every System in registration order, each `on_start` awaited before the next.
///
/// ```rust,ignore
/// let report = Zenith::new("app")
///     .with(HeartbeatSystem::new)
///     .run()
///     .await?;
/// ```
pub struct Zenith {
    root_dir: PathBuf,
    environment: String,
    loader: ModuleLoader,
    config_loader: ConfigLoader,
    container: OrbContainer,
    systems: Vec<SystemSlot>,
    stop_order: StopOrder,
    handle_signals: bool,
    shutdown: CancellationToken,
    signal_task: Option<JoinHandle<()>>,
}

/// Summary of a successful boot.
#[derive(Debug, Clone)]
pub struct BootReport {
    pub environment: String,
    pub elapsed: Duration,
    /// Orbs in the container, reserved ones included.
    pub orbs: usize,
    /// Names of orbs tagged `config`.
    pub config_orbs: Vec<String>,
    /// Started Systems, in start order.
    pub systems: Vec<String>,
}

/// Outcome of the stop loop.
#[derive(Debug, Default)]
pub struct ShutdownReport {
    pub stopped: Vec<String>,
    pub failures: Vec<ZenithError>,
}

impl ShutdownReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

impl Zenith {
    /// An orchestrator rooted at `root_dir`, using the environment from `ZENITH_ENV`.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let root_dir = root_dir.into();
        Self {
            config_loader: ConfigLoader::new(root_dir.clone()),
            root_dir,
            environment: active_environment(),
            loader: ModuleLoader::new(),
            container: OrbContainer::new(),
            systems: Vec::new(),
            stop_order: StopOrder::default(),
            handle_signals: true,
            shutdown: CancellationToken::new(),
            signal_task: None,
        }
    }

    /// Registers a System. Start order equals registration order.
    pub fn with<S, F>(mut self, factory: F) -> Self
    where
        S: System + 'static,
        F: FnOnce(OrbContainer) -> S + Send + 'static,
    {
        self.systems.push(SystemSlot::new(factory));
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_loader(mut self, loader: ModuleLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_config_loader(mut self, config_loader: ConfigLoader) -> Self {
        self.config_loader = config_loader;
        self
    }

    /// Adds a factory to the loader's catalog.
    pub fn with_factory<F>(mut self, key: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Injected) -> Result<OrbValue, BoxError> + Send + Sync + 'static,
    {
        self.loader.register_factory(key, factory);
        self
    }

    pub fn with_stop_order(mut self, stop_order: StopOrder) -> Self {
        self.stop_order = stop_order;
        self
    }

    /// When disabled, only [`Zenith::shutdown_token`] triggers shutdown.
    pub fn with_signal_handlers(mut self, enabled: bool) -> Self {
        self.handle_signals = enabled;
        self
    }

    pub fn container(&self) -> &OrbContainer {
        &self.container
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Cancelling this token triggers shutdown in [`Zenith::run`].
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn system_states(&self) -> Vec<(String, SystemState)> {
        self.systems
            .iter()
            .map(|slot| (slot.name().to_string(), slot.state()))
            .collect()
    }

    /// Boots, waits for the shutdown channel, then stops every System.
    pub async fn run(mut self) -> Result<ShutdownReport> {
        self.boot().await?;
        self.shutdown.cancelled().await;
        Ok(self.shutdown().await)
    }

    /// Runs the boot sequence. Failures are logged with their full cause chain.
    pub async fn boot(&mut self) -> Result<BootReport> {
        let started = Instant::now();
        info!(environment = %self.environment, root = %self.root_dir.display(), "Starting Zenith");

        match self.boot_sequence().await {
            Ok(mut report) => {
                report.elapsed = started.elapsed();
                info!(
                    orbs = report.orbs,
                    systems = report.systems.len(),
                    "Zenith started in {:.3} seconds",
                    report.elapsed.as_secs_f64()
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %error_chain(&e), "Could not start Zenith");
                Err(e)
            }
        }
    }

    async fn boot_sequence(&mut self) -> Result<BootReport> {
        self.container.register_self()?;

        let config = self.config_loader.load_config(&self.environment).await?;
        self.container
            .register_orb(ZENITH_CONFIG_ORB, None, Arc::new(config))?;

        self.prepare_systems().await?;

        let modules = self.loader.scan(&self.root_dir).await?;
        self.container.register_modules(modules)?;

        self.container.instantiate_orbs()?;

        let config_orbs: Vec<String> = self
            .container
            .get_orbs_by_type(ORB_TYPE_CONFIG)?
            .into_iter()
            .map(|orb| orb.name)
            .collect();
        for name in &config_orbs {
            info!(config = %name, "Registered config");
        }

        if self.handle_signals && self.signal_task.is_none() {
            self.signal_task = Some(install_signal_handlers(self.shutdown.clone()));
        }

        self.start_systems().await?;

        Ok(BootReport {
            environment: self.environment.clone(),
            elapsed: Duration::ZERO,
            orbs: self.container.len(),
            config_orbs,
            systems: self.systems.iter().map(|s| s.name().to_string()).collect(),
        })
    }

    async fn prepare_systems(&mut self) -> Result<()> {
        for slot in &mut self.systems {
            info!(system = %slot.name(), "Initializing system");
            let root = slot.prepare(self.container.clone())?;
            let root = if root.is_relative() {
                self.root_dir.join(root)
            } else {
                root
            };
            let modules = self.loader.scan(&root).await?;
            let count = self.container.register_modules(modules)?;
            info!(system = %slot.name(), root = %root.display(), modules = count, "System prepared");
        }
        Ok(())
    }

    async fn start_systems(&mut self) -> Result<()> {
        for slot in &mut self.systems {
            info!(system = %slot.name(), "Starting system");
            slot.start().await?;
        }
        Ok(())
    }

    /// Stops every started System. A failing `on_stop` is logged and the loop goes on.
    pub async fn shutdown(&mut self) -> ShutdownReport {
        let mut report = ShutdownReport::default();
        let order: Vec<usize> = match self.stop_order {
            StopOrder::Registration => (0..self.systems.len()).collect(),
            StopOrder::Reverse => (0..self.systems.len()).rev().collect(),
        };

        for index in order {
            let Some(slot) = self.systems.get_mut(index) else {
                continue;
            };
            if slot.state() != SystemState::Started {
                continue;
            }
            info!(system = %slot.name(), "Stopping system");
            match slot.stop().await {
                Ok(()) => report.stopped.push(slot.name().to_string()),
                Err(e) => {
                    warn!(system = %slot.name(), error = %error_chain(&e), "System failed to stop");
                    report.failures.push(e);
                }
            }
        }

        self.shutdown.cancel();
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
        info!(stopped = report.stopped.len(), failed = report.failures.len(), "Shutting down");
        report
    }
}
