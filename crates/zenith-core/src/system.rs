//! # Systems
//!
//! A System is a pluggable subsystem with its own module root and an async
//! start/stop lifecycle. The embedding application supplies implementations and
//! registers them with [`Zenith::with`](crate::Zenith::with) before boot.
//!
//! Each System moves through a fixed sequence of states, driven only by the
//! orchestrator:
//!
//! ```text
//! Registered ──prepare──▶ Prepared ──start──▶ Started ──stop──▶ Stopped
//! ```

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::container::OrbContainer;
use crate::error::{BoxError, Result, ZenithError};

/// Capability set the orchestrator relies on.
#[async_trait]
pub trait System: Send + Sync {
    /// Display name used in logs and errors.
    fn name(&self) -> &str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Directory holding this System's orb manifests.
    fn root(&self) -> PathBuf;

    /// Called once every orb is instantiated. Errors abort the boot.
    async fn on_start(&self) -> Result<(), BoxError>;

    /// Called during shutdown.
    async fn on_stop(&self) -> Result<(), BoxError>;
}

/// `"zenith_sample::heartbeat::HeartbeatSystem"` → `"HeartbeatSystem"`.
pub(crate) fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemState {
    Registered,
    Prepared,
    Started,
    Stopped,
}

impl SystemState {
    pub fn as_str(self) -> &'static str {
        match self {
            SystemState::Registered => "Registered",
            SystemState::Prepared => "Prepared",
            SystemState::Started => "Started",
            SystemState::Stopped => "Stopped",
        }
    }
}

impl fmt::Display for SystemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type SystemFactory = Box<dyn FnOnce(OrbContainer) -> Box<dyn System> + Send>;

/// One registered System and where it is in its lifecycle.
pub struct SystemSlot {
    name: String,
    state: SystemState,
    factory: Option<SystemFactory>,
    instance: Option<Box<dyn System>>,
}

impl SystemSlot {
    pub(crate) fn new<S, F>(factory: F) -> Self
    where
        S: System + 'static,
        F: FnOnce(OrbContainer) -> S + Send + 'static,
    {
        Self {
            name: short_type_name(std::any::type_name::<S>()).to_string(),
            state: SystemState::Registered,
            factory: Some(Box::new(move |container| Box::new(factory(container)))),
            instance: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn instance(&self) -> Option<&dyn System> {
        self.instance.as_deref()
    }

    fn expect_state(&self, from: SystemState, to: SystemState) -> Result<()> {
        if self.state != from {
            return Err(ZenithError::InvalidLifecycle {
                system: self.name.clone(),
                from: self.state.as_str(),
                to: to.as_str(),
            });
        }
        Ok(())
    }

    fn transition(&mut self, from: SystemState, to: SystemState) -> Result<()> {
        self.expect_state(from, to)?;
        self.state = to;
        Ok(())
    }

    /// Constructs the instance. Returns its module root.
    pub(crate) fn prepare(&mut self, container: OrbContainer) -> Result<PathBuf> {
        let factory = self.factory.take().ok_or_else(|| ZenithError::InvalidLifecycle {
            system: self.name.clone(),
            from: self.state.as_str(),
            to: SystemState::Prepared.as_str(),
        })?;
        self.transition(SystemState::Registered, SystemState::Prepared)?;
        let instance = factory(container);
        self.name = instance.name().to_string();
        let root = instance.root();
        self.instance = Some(instance);
        Ok(root)
    }

    /// Runs `on_start`. The slot only becomes `Started` once the hook succeeds;
    /// on failure it stays `Prepared`.
    pub(crate) async fn start(&mut self) -> Result<()> {
        self.expect_state(SystemState::Prepared, SystemState::Started)?;
        let name = self.name.clone();
        let instance = self.instance_or_err(SystemState::Started)?;
        instance
            .on_start()
            .await
            .map_err(|source| ZenithError::SystemStartFailure { system: name, source })?;
        self.state = SystemState::Started;
        Ok(())
    }

    pub(crate) async fn stop(&mut self) -> Result<()> {
        self.transition(SystemState::Started, SystemState::Stopped)?;
        let name = self.name.clone();
        let instance = self.instance_or_err(SystemState::Stopped)?;
        instance
            .on_stop()
            .await
            .map_err(|source| ZenithError::SystemStopFailure { system: name, source })
    }

    fn instance_or_err(&self, to: SystemState) -> Result<&dyn System> {
        self.instance
            .as_deref()
            .ok_or_else(|| ZenithError::InvalidLifecycle {
                system: self.name.clone(),
                from: SystemState::Registered.as_str(),
                to: to.as_str(),
            })
    }
}

impl fmt::Debug for SystemSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemSlot")
            .field("name", &self.name)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;

    #[async_trait]
    impl System for Quiet {
        fn root(&self) -> PathBuf {
            PathBuf::from("quiet")
        }
        async fn on_start(&self) -> Result<(), BoxError> {
            Ok(())
        }
        async fn on_stop(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[test]
    fn short_type_name_strips_paths_and_generics() {
        assert_eq!(short_type_name("a::b::Heartbeat"), "Heartbeat");
        assert_eq!(short_type_name("a::Wrapper<b::Inner>"), "Wrapper");
        assert_eq!(short_type_name("Plain"), "Plain");
    }

    #[tokio::test]
    async fn slot_walks_the_lifecycle_in_order() {
        let mut slot = SystemSlot::new(|_| Quiet);
        assert_eq!(slot.name(), "Quiet");
        assert_eq!(slot.state(), SystemState::Registered);

        assert!(matches!(
            slot.start().await,
            Err(ZenithError::InvalidLifecycle { .. })
        ));

        let root = slot.prepare(OrbContainer::new()).unwrap();
        assert_eq!(root, PathBuf::from("quiet"));
        slot.start().await.unwrap();
        assert_eq!(slot.state(), SystemState::Started);
        slot.stop().await.unwrap();
        assert_eq!(slot.state(), SystemState::Stopped);

        assert!(slot.stop().await.is_err());
    }

    struct Broken;

    #[async_trait]
    impl System for Broken {
        fn root(&self) -> PathBuf {
            PathBuf::from("broken")
        }
        async fn on_start(&self) -> Result<(), BoxError> {
            Err("boom".into())
        }
        async fn on_stop(&self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_start_leaves_the_slot_prepared() {
        let mut slot = SystemSlot::new(|_| Broken);
        slot.prepare(OrbContainer::new()).unwrap();

        assert!(matches!(
            slot.start().await,
            Err(ZenithError::SystemStartFailure { ref system, .. }) if system == "Broken"
        ));
        assert_eq!(slot.state(), SystemState::Prepared);
        assert!(matches!(
            slot.stop().await,
            Err(ZenithError::InvalidLifecycle { .. })
        ));
    }
}
