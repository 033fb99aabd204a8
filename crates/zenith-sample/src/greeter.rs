//! The `greeter` orb.

use thiserror::Error;
use zenith_core::{orb_value, BoxError, Config, Injected, OrbValue, ZENITH_CONFIG_ORB};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GreeterError {
    #[error("Cannot greet an empty name")]
    EmptyName,
}

#[derive(Debug, Clone)]
pub struct Greeter {
    text: String,
    audience: String,
}

impl Greeter {
    pub fn new(text: impl Into<String>, audience: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            audience: audience.into(),
        }
    }

    /// Reads `greeting.text` (required) and `greeting.audience` (defaults to "world").
    pub fn from_config(config: &Config) -> zenith_core::Result<Self> {
        Ok(Self::new(
            config.get::<String>("greeting.text")?,
            config.get_or("greeting.audience", "world".to_string())?,
        ))
    }

    pub fn greet(&self, name: &str) -> Result<String, GreeterError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(GreeterError::EmptyName);
        }
        Ok(format!("{}, {name}!", self.text))
    }

    /// Greets the configured audience.
    pub fn greeting(&self) -> String {
        format!("{}, {}!", self.text, self.audience)
    }
}

pub(crate) fn factory(deps: &Injected) -> Result<OrbValue, BoxError> {
    let config = deps.one::<Config>(ZENITH_CONFIG_ORB)?;
    Ok(orb_value(Greeter::from_config(&config)?))
}
