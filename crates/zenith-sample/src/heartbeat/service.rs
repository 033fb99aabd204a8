use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use zenith_core::{orb_value, BoxError, Injected, OrbValue};

use crate::greeter::Greeter;
use crate::settings::HeartbeatSettings;

pub struct HeartbeatService {
    settings: Arc<HeartbeatSettings>,
    greeter: Arc<Greeter>,
    beats: AtomicU64,
}

impl HeartbeatService {
    pub fn new(settings: Arc<HeartbeatSettings>, greeter: Arc<Greeter>) -> Self {
        Self {
            settings,
            greeter,
            beats: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> &HeartbeatSettings {
        &self.settings
    }

    /// Counts one beat and returns its log line.
    pub fn beat(&self) -> String {
        let n = self.beats.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{} {} #{n}", self.greeter.greeting(), self.settings.message)
    }

    pub fn beats(&self) -> u64 {
        self.beats.load(Ordering::Relaxed)
    }
}

pub(crate) fn factory(deps: &Injected) -> Result<OrbValue, BoxError> {
    let settings = deps.one::<HeartbeatSettings>("HeartbeatSettings")?;
    let greeter = deps.one::<Greeter>("greeter")?;
    Ok(orb_value(HeartbeatService::new(settings, greeter)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beats_are_numbered() {
        let service = HeartbeatService::new(
            Arc::new(HeartbeatSettings::default()),
            Arc::new(Greeter::new("Hello", "ops")),
        );
        assert_eq!(service.beat(), "Hello, ops! alive #1");
        assert_eq!(service.beat(), "Hello, ops! alive #2");
        assert_eq!(service.beats(), 2);
    }
}
