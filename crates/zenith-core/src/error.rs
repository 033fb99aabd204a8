//! # Zenith Errors
//!
//! Every failure the runtime can report is a variant of [`ZenithError`]. Boot-time
//! variants are unrecoverable: they travel up to [`Zenith::boot`](crate::Zenith::boot),
//! get logged with their full source chain, and end the process.

use std::fmt;
use std::path::PathBuf;

/// Boxed error type used for failures raised by user code (factories, System hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Crate-wide result alias.
pub type Result<T, E = ZenithError> = std::result::Result<T, E>;

/// Errors raised by the container, the loaders and the orchestrator.
#[derive(Debug, thiserror::Error)]
pub enum ZenithError {
    /// An orb name was registered twice, or a module tried to take a reserved name.
    #[error("Orb '{name}' is already registered")]
    RegistrationConflict { name: String },

    /// A declared dependency matches no registered orb.
    #[error("Orb '{dependent}' depends on '{dependency}', which is not registered")]
    UnresolvedDependency { dependency: String, dependent: String },

    /// A one-to-one dependency matched several orbs by type tag.
    #[error("Orb '{dependent}' depends on '{dependency}', which matches several orbs: {}", .candidates.join(", "))]
    AmbiguousDependency {
        dependency: String,
        dependent: String,
        candidates: Vec<String>,
    },

    /// The descriptor graph contains a cycle. The path repeats its first name at the end.
    #[error("Cyclic dependency: {}", CyclePath(.cycle))]
    CyclicDependency { cycle: Vec<String> },

    /// A module root is missing or a manifest could not be loaded.
    #[error("Module discovery failed at {}: {reason}", .path.display())]
    DiscoveryFailure { path: PathBuf, reason: String },

    /// No usable configuration for the requested environment.
    #[error("Configuration for environment '{environment}' could not be loaded: {reason}")]
    ConfigurationFailure { environment: String, reason: String },

    /// A System's start hook failed.
    #[error("System '{system}' failed to start: {source}")]
    SystemStartFailure {
        system: String,
        #[source]
        source: BoxError,
    },

    /// A System's stop hook failed. Logged during shutdown, never fatal.
    #[error("System '{system}' failed to stop: {source}")]
    SystemStopFailure {
        system: String,
        #[source]
        source: BoxError,
    },

    /// An orb factory returned an error.
    #[error("Orb '{name}' could not be constructed: {source}")]
    OrbConstructionFailure {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Lookup of a name that is not registered.
    #[error("Unknown orb: {name}")]
    UnknownOrb { name: String },

    /// The orb exists but holds a value of another Rust type.
    #[error("Orb '{name}' is not a {expected}")]
    OrbTypeMismatch { name: String, expected: &'static str },

    /// The lookup needs built orbs but the container still has pending descriptors.
    #[error("Orbs are not instantiated yet{}", .name.as_deref().map(|n| format!(" (requested '{n}')")).unwrap_or_default())]
    NotInstantiated { name: Option<String> },

    /// A System was driven through an illegal state transition.
    #[error("System '{system}' cannot go from {from} to {to}")]
    InvalidLifecycle {
        system: String,
        from: &'static str,
        to: &'static str,
    },
}

impl ZenithError {
    pub(crate) fn discovery(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        ZenithError::DiscoveryFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn configuration(environment: &str, reason: impl fmt::Display) -> Self {
        ZenithError::ConfigurationFailure {
            environment: environment.to_string(),
            reason: reason.to_string(),
        }
    }
}

struct CyclePath<'a>(&'a [String]);

impl fmt::Display for CyclePath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" → "))
    }
}
