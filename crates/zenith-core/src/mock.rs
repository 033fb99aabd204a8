//! # Test Doubles
//!
//! [`MockSystem`] is a [`System`] that records every lifecycle call into a shared
//! [`LifecycleLog`], so tests can assert on start and stop ordering without writing
//! a System per scenario. Failures and delays are injected through the builder.
//!
//! ```rust
//! use zenith_core::mock::{LifecycleLog, MockSystem};
//! use zenith_core::System;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let log = LifecycleLog::new();
//! let system = MockSystem::new("S1", "modules/s1", log.clone());
//!
//! system.on_start().await.unwrap();
//! assert_eq!(log.started(), vec!["S1".to_string()]);
//! # }
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::container::OrbContainer;
use crate::error::BoxError;
use crate::system::System;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    StartBegan(String),
    Started(String),
    StopBegan(String),
    Stopped(String),
}

/// Shared, append-only record of lifecycle events.
#[derive(Debug, Clone, Default)]
pub struct LifecycleLog(Arc<Mutex<Vec<LifecycleEvent>>>);

impl LifecycleLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, event: LifecycleEvent) {
        self.0.lock().push(event);
    }

    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.0.lock().clone()
    }

    /// Names whose `on_start` completed, in completion order.
    pub fn started(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::Started(name) => Some(name),
                _ => None,
            })
            .collect()
    }

    /// Names whose `on_stop` completed, in completion order.
    pub fn stopped(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                LifecycleEvent::Stopped(name) => Some(name),
                _ => None,
            })
            .collect()
    }
}

/// Configurable [`System`] for tests.
pub struct MockSystem {
    name: String,
    root: PathBuf,
    log: LifecycleLog,
    container: Option<OrbContainer>,
    required_orbs: Vec<String>,
    start_delay: Duration,
    start_error: Option<String>,
    stop_error: Option<String>,
}

impl MockSystem {
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>, log: LifecycleLog) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            log,
            container: None,
            required_orbs: Vec::new(),
            start_delay: Duration::ZERO,
            start_error: None,
            stop_error: None,
        }
    }

    pub fn with_container(mut self, container: OrbContainer) -> Self {
        self.container = Some(container);
        self
    }

    /// `on_start` fails unless the container holds a built orb with this name.
    pub fn requiring(mut self, orb: impl Into<String>) -> Self {
        self.required_orbs.push(orb.into());
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    pub fn failing_start(mut self, message: impl Into<String>) -> Self {
        self.start_error = Some(message.into());
        self
    }

    pub fn failing_stop(mut self, message: impl Into<String>) -> Self {
        self.stop_error = Some(message.into());
        self
    }
}

#[async_trait]
impl System for MockSystem {
    fn name(&self) -> &str {
        &self.name
    }

    fn root(&self) -> PathBuf {
        self.root.clone()
    }

    async fn on_start(&self) -> Result<(), BoxError> {
        self.log.record(LifecycleEvent::StartBegan(self.name.clone()));
        if !self.start_delay.is_zero() {
            tokio::time::sleep(self.start_delay).await;
        }
        if let Some(message) = &self.start_error {
            return Err(message.clone().into());
        }
        if !self.required_orbs.is_empty() {
            let container = self.container.as_ref().ok_or("no container injected")?;
            for orb in &self.required_orbs {
                container.get_orb(orb)?;
            }
        }
        self.log.record(LifecycleEvent::Started(self.name.clone()));
        Ok(())
    }

    async fn on_stop(&self) -> Result<(), BoxError> {
        self.log.record(LifecycleEvent::StopBegan(self.name.clone()));
        if let Some(message) = &self.stop_error {
            return Err(message.clone().into());
        }
        self.log.record(LifecycleEvent::Stopped(self.name.clone()));
        Ok(())
    }
}
