//! # Orbs & Descriptors
//!
//! An *orb* is a named, optionally typed singleton owned by the [`OrbContainer`].
//! Before it is built it exists only as an [`OrbDescriptor`]: a name, a type tag,
//! a factory and the ordered list of [`Dependency`] references the factory needs.
//!
//! Values are stored type-erased (`Arc<dyn Any + Send + Sync>`) and recovered with
//! [`Orb::downcast`], so a single registry can hold configuration objects, services
//! and the container itself.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::container::OrbContainer;
use crate::error::{BoxError, Result, ZenithError};

/// Type-erased orb value.
pub type OrbValue = Arc<dyn Any + Send + Sync>;

/// Constructor shared by every descriptor built from the same factory.
pub type OrbFactory = Arc<dyn Fn(&Injected) -> Result<OrbValue, BoxError> + Send + Sync>;

/// A built orb. Cloning is cheap; the value is shared.
#[derive(Clone)]
pub struct Orb {
    pub name: String,
    pub orb_type: Option<String>,
    pub value: OrbValue,
}

impl Orb {
    pub fn new(name: impl Into<String>, orb_type: Option<String>, value: OrbValue) -> Self {
        Self {
            name: name.into(),
            orb_type,
            value,
        }
    }

    /// Returns the value as `T`, or `None` when the orb holds something else.
    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Like [`Orb::downcast`] but reports a mismatch as [`ZenithError::OrbTypeMismatch`].
    pub fn value_as<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.downcast::<T>()
            .ok_or_else(|| ZenithError::OrbTypeMismatch {
                name: self.name.clone(),
                expected: std::any::type_name::<T>(),
            })
    }

    pub fn has_type(&self, orb_type: &str) -> bool {
        self.orb_type.as_deref() == Some(orb_type)
    }
}

impl fmt::Debug for Orb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orb")
            .field("name", &self.name)
            .field("orb_type", &self.orb_type)
            .finish_non_exhaustive()
    }
}

/// A reference declared by a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dependency {
    /// One-to-one: an exact orb name, or failing that a type tag carried by exactly one orb.
    One(String),
    /// One-to-many: every orb carrying the type tag, possibly none.
    All(String),
}

impl Dependency {
    pub fn one(reference: impl Into<String>) -> Self {
        Dependency::One(reference.into())
    }

    pub fn all(orb_type: impl Into<String>) -> Self {
        Dependency::All(orb_type.into())
    }

    pub fn reference(&self) -> &str {
        match self {
            Dependency::One(reference) | Dependency::All(reference) => reference,
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::One(reference) => f.write_str(reference),
            Dependency::All(orb_type) => write!(f, "all({orb_type})"),
        }
    }
}

/// Registration record for an orb that has not been built yet.
#[derive(Clone)]
pub struct OrbDescriptor {
    pub name: String,
    pub orb_type: Option<String>,
    pub dependencies: Vec<Dependency>,
    /// Factory key, kept for diagnostics only.
    pub factory_key: String,
    pub factory: OrbFactory,
}

impl OrbDescriptor {
    /// Builds a descriptor around a closure factory.
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn(&Injected) -> Result<OrbValue, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            factory_key: name.clone(),
            name,
            orb_type: None,
            dependencies: Vec::new(),
            factory: Arc::new(factory),
        }
    }

    pub fn with_type(mut self, orb_type: impl Into<String>) -> Self {
        self.orb_type = Some(orb_type.into());
        self
    }

    pub fn depends_on(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_factory_key(mut self, key: impl Into<String>) -> Self {
        self.factory_key = key.into();
        self
    }
}

impl fmt::Debug for OrbDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrbDescriptor")
            .field("name", &self.name)
            .field("orb_type", &self.orb_type)
            .field("dependencies", &self.dependencies)
            .field("factory_key", &self.factory_key)
            .finish_non_exhaustive()
    }
}

/// A resolved dependency as handed to a factory.
#[derive(Debug, Clone)]
pub enum Resolved {
    One(Orb),
    All(Vec<Orb>),
}

/// Dependencies injected into a factory, in declaration order.
pub struct Injected {
    dependent: String,
    entries: Vec<(Dependency, Resolved)>,
    container: OrbContainer,
}

impl Injected {
    pub(crate) fn new(
        dependent: impl Into<String>,
        entries: Vec<(Dependency, Resolved)>,
        container: OrbContainer,
    ) -> Self {
        Self {
            dependent: dependent.into(),
            entries,
            container,
        }
    }

    /// Name of the orb being constructed.
    pub fn dependent(&self) -> &str {
        &self.dependent
    }

    /// The orb injected for a one-to-one reference.
    pub fn orb(&self, reference: &str) -> Result<&Orb> {
        self.entries
            .iter()
            .find_map(|(dependency, resolved)| match (dependency, resolved) {
                (Dependency::One(r), Resolved::One(orb)) if r == reference => Some(orb),
                _ => None,
            })
            .ok_or_else(|| self.undeclared(reference))
    }

    /// The value injected for a one-to-one reference, downcast to `T`.
    pub fn one<T: Any + Send + Sync>(&self, reference: &str) -> Result<Arc<T>> {
        self.orb(reference)?.value_as::<T>()
    }

    /// Every orb injected for a one-to-many reference.
    pub fn all(&self, orb_type: &str) -> Result<&[Orb]> {
        self.entries
            .iter()
            .find_map(|(dependency, resolved)| match (dependency, resolved) {
                (Dependency::All(t), Resolved::All(orbs)) if t == orb_type => {
                    Some(orbs.as_slice())
                }
                _ => None,
            })
            .ok_or_else(|| self.undeclared(orb_type))
    }

    /// Handle to the container doing the injection.
    pub fn container(&self) -> OrbContainer {
        self.container.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn undeclared(&self, reference: &str) -> ZenithError {
        ZenithError::UnresolvedDependency {
            dependency: reference.to_string(),
            dependent: self.dependent.clone(),
        }
    }
}

/// Wraps a concrete value as an [`OrbValue`].
pub fn orb_value<T: Any + Send + Sync>(value: T) -> OrbValue {
    Arc::new(value)
}
