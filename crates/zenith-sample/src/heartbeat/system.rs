use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use zenith_core::{BoxError, OrbContainer, System};

use super::{HeartbeatService, HEARTBEAT_ORB};

/// Ticks the [`HeartbeatService`] on its configured interval while started.
pub struct HeartbeatSystem {
    container: OrbContainer,
    root: PathBuf,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl HeartbeatSystem {
    pub fn new(container: OrbContainer) -> Self {
        Self {
            container,
            root: PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("systems/heartbeat"),
            cancel: CancellationToken::new(),
            task: Mutex::new(None),
        }
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }
}

#[async_trait]
impl System for HeartbeatSystem {
    fn root(&self) -> PathBuf {
        self.root.clone()
    }

    async fn on_start(&self) -> Result<(), BoxError> {
        let service: Arc<HeartbeatService> = self.container.get(HEARTBEAT_ORB)?;
        let period = service.settings().interval();
        let cancel = self.cancel.clone();
        info!(interval_ms = period.as_millis() as u64, "Heartbeat started");

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = interval.tick() => debug!("{}", service.beat()),
                }
            }
        });
        *self.task.lock().await = Some(handle);
        Ok(())
    }

    async fn on_stop(&self) -> Result<(), BoxError> {
        self.cancel.cancel();
        if let Some(handle) = self.task.lock().await.take() {
            handle.await?;
        }
        info!("Heartbeat stopped");
        Ok(())
    }
}
