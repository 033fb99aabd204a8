//! # Orb Container
//!
//! The dependency-injection registry. It holds two kinds of entries:
//!
//! - **Descriptors** ([`OrbDescriptor`]) registered from discovered modules, waiting to be built.
//! - **Orbs** ([`Orb`]) already built, either by [`OrbContainer::instantiate_orbs`] or handed in
//!   pre-built through [`OrbContainer::register_orb`] (the reserved orbs).
//!
//! ## Resolution
//!
//! `instantiate_orbs` works in two phases. The *planning* phase resolves every declared
//! reference and computes a topological order (Kahn's algorithm, ties broken by registration
//! order). Any unresolved, ambiguous or cyclic reference aborts here, so no factory ever runs
//! for an invalid graph. The *construction* phase then calls each factory exactly once, in
//! order, with its dependencies already built.
//!
//! The registry lock is never held while a factory runs: factories get an [`Injected`] that
//! carries a container handle, and may query it freely.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Result, ZenithError};
use crate::loader::ModuleSet;
use crate::orb::{Dependency, Injected, Orb, OrbDescriptor, OrbValue, Resolved};

/// Reserved name of the container itself.
pub const ZENITH_CONTAINER_ORB: &str = "zenith:container";

/// Reserved name of the loaded configuration.
pub const ZENITH_CONFIG_ORB: &str = "zenith:config";

const RESERVED_NAMES: [&str; 2] = [ZENITH_CONTAINER_ORB, ZENITH_CONFIG_ORB];

pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

#[derive(Default)]
struct Registry {
    /// Every name ever registered, built or pending.
    claimed: HashSet<String>,
    orbs: HashMap<String, Orb>,
    /// Build order (registration order for pre-built orbs).
    built_order: Vec<String>,
    pending: Vec<OrbDescriptor>,
    instantiated: bool,
}

impl Registry {
    fn claim(&mut self, name: &str) -> Result<()> {
        if !self.claimed.insert(name.to_string()) {
            return Err(ZenithError::RegistrationConflict {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn insert_built(&mut self, orb: Orb) {
        self.built_order.push(orb.name.clone());
        self.orbs.insert(orb.name.clone(), orb);
    }

    fn built_of_type(&self, orb_type: &str) -> Vec<Orb> {
        self.built_order
            .iter()
            .filter_map(|name| self.orbs.get(name))
            .filter(|orb| orb.has_type(orb_type))
            .cloned()
            .collect()
    }
}

/// Where a declared dependency points once planning is done.
enum Target {
    One(String),
    All(String),
}

struct Planned {
    descriptor: OrbDescriptor,
    targets: Vec<Target>,
}

/// Shared handle to the orb registry. Clones point at the same registry.
#[derive(Clone, Default)]
pub struct OrbContainer {
    inner: Arc<RwLock<Registry>>,
}

/// Non-owning handle stored as the value of the reserved container orb.
#[derive(Clone)]
pub struct ContainerRef(Weak<RwLock<Registry>>);

impl ContainerRef {
    pub fn upgrade(&self) -> Option<OrbContainer> {
        self.0.upgrade().map(|inner| OrbContainer { inner })
    }
}

impl OrbContainer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn downgrade(&self) -> ContainerRef {
        ContainerRef(Arc::downgrade(&self.inner))
    }

    /// Registers the container under [`ZENITH_CONTAINER_ORB`].
    pub fn register_self(&self) -> Result<()> {
        self.register_orb(ZENITH_CONTAINER_ORB, None, Arc::new(self.downgrade()))
    }

    /// Registers a pre-built value.
    pub fn register_orb(
        &self,
        name: impl Into<String>,
        orb_type: Option<String>,
        value: OrbValue,
    ) -> Result<()> {
        let name = name.into();
        let mut registry = self.inner.write();
        registry.claim(&name)?;
        debug!(orb = %name, "Registered orb value");
        registry.insert_built(Orb::new(name, orb_type, value));
        Ok(())
    }

    /// Registers a descriptor to be built by the next [`OrbContainer::instantiate_orbs`].
    pub fn register_descriptor(&self, descriptor: OrbDescriptor) -> Result<()> {
        if is_reserved(&descriptor.name) {
            return Err(ZenithError::RegistrationConflict {
                name: descriptor.name,
            });
        }
        let mut registry = self.inner.write();
        registry.claim(&descriptor.name)?;
        debug!(orb = %descriptor.name, factory = %descriptor.factory_key, "Registered orb descriptor");
        registry.pending.push(descriptor);
        registry.instantiated = false;
        Ok(())
    }

    /// Registers every discovered module as a descriptor. Stops at the first conflict.
    pub fn register_modules(&self, modules: ModuleSet) -> Result<usize> {
        let count = modules.len();
        for module in modules {
            self.register_descriptor(module.into_descriptor())?;
        }
        Ok(count)
    }

    /// Builds every pending descriptor in dependency order. Returns how many were built.
    pub fn instantiate_orbs(&self) -> Result<usize> {
        let plan = {
            let mut registry = self.inner.write();
            let order = plan(&registry)?;
            let mut pending: Vec<Option<OrbDescriptor>> =
                std::mem::take(&mut registry.pending).into_iter().map(Some).collect();
            order
                .into_iter()
                .filter_map(|(index, targets)| {
                    pending
                        .get_mut(index)
                        .and_then(Option::take)
                        .map(|descriptor| Planned {
                            descriptor,
                            targets,
                        })
                })
                .collect::<Vec<_>>()
        };

        let total = plan.len();
        self.construct(plan)?;

        self.inner.write().instantiated = true;
        info!(count = total, "Orbs instantiated");
        Ok(total)
    }

    /// Runs the factories of an ordered plan. On failure the failing descriptor
    /// and every one after it go back to pending.
    fn construct(&self, plan: Vec<Planned>) -> Result<()> {
        let mut remaining = plan.into_iter();
        while let Some(Planned {
            descriptor,
            targets,
        }) = remaining.next()
        {
            let built = self.inject(&descriptor, targets).and_then(|injected| {
                debug!(orb = %descriptor.name, deps = injected.len(), "Constructing orb");
                (descriptor.factory)(&injected).map_err(|source| {
                    ZenithError::OrbConstructionFailure {
                        name: descriptor.name.clone(),
                        source,
                    }
                })
            });

            match built {
                Ok(value) => {
                    let orb = Orb::new(descriptor.name.clone(), descriptor.orb_type.clone(), value);
                    self.inner.write().insert_built(orb);
                }
                Err(e) => {
                    let mut registry = self.inner.write();
                    registry.pending.push(descriptor);
                    registry
                        .pending
                        .extend(remaining.map(|planned| planned.descriptor));
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn inject(&self, descriptor: &OrbDescriptor, targets: Vec<Target>) -> Result<Injected> {
        let registry = self.inner.read();
        let entries = descriptor
            .dependencies
            .iter()
            .cloned()
            .zip(targets)
            .map(|(dependency, target)| -> Result<(Dependency, Resolved)> {
                let resolved = match target {
                    Target::One(name) => Resolved::One(registry.orbs.get(&name).cloned().ok_or(
                        ZenithError::UnresolvedDependency {
                            dependency: name,
                            dependent: descriptor.name.clone(),
                        },
                    )?),
                    Target::All(orb_type) => Resolved::All(registry.built_of_type(&orb_type)),
                };
                Ok((dependency, resolved))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Injected::new(descriptor.name.clone(), entries, self.clone()))
    }

    /// Looks an orb up by exact name.
    pub fn get_orb(&self, name: &str) -> Result<Orb> {
        let registry = self.inner.read();
        if let Some(orb) = registry.orbs.get(name) {
            return Ok(orb.clone());
        }
        if registry.claimed.contains(name) {
            return Err(ZenithError::NotInstantiated {
                name: Some(name.to_string()),
            });
        }
        Err(ZenithError::UnknownOrb {
            name: name.to_string(),
        })
    }

    /// Looks an orb up by name and downcasts its value.
    pub fn get<T: std::any::Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.get_orb(name)?.value_as::<T>()
    }

    /// Every built orb carrying `orb_type`, in build order. Only valid after instantiation.
    pub fn get_orbs_by_type(&self, orb_type: &str) -> Result<Vec<Orb>> {
        let registry = self.inner.read();
        if !registry.instantiated || !registry.pending.is_empty() {
            return Err(ZenithError::NotInstantiated { name: None });
        }
        Ok(registry.built_of_type(orb_type))
    }

    /// The reserved configuration orb.
    pub fn config(&self) -> Result<Arc<Config>> {
        self.get::<Config>(ZENITH_CONFIG_ORB)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.read().claimed.contains(name)
    }

    /// Built names in build order, then pending names in registration order.
    pub fn names(&self) -> Vec<String> {
        let registry = self.inner.read();
        registry
            .built_order
            .iter()
            .cloned()
            .chain(registry.pending.iter().map(|d| d.name.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.read().claimed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending(&self) -> usize {
        self.inner.read().pending.len()
    }
}

/// Resolves references and returns pending indices in construction order.
fn plan(registry: &Registry) -> Result<Vec<(usize, Vec<Target>)>> {
    let pending = &registry.pending;
    let index: HashMap<&str, usize> = pending
        .iter()
        .enumerate()
        .map(|(i, d)| (d.name.as_str(), i))
        .collect();

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); pending.len()];
    let mut targets: Vec<Vec<Target>> = Vec::with_capacity(pending.len());

    for (i, descriptor) in pending.iter().enumerate() {
        let mut own = Vec::with_capacity(descriptor.dependencies.len());
        for dependency in &descriptor.dependencies {
            match dependency {
                Dependency::One(reference) => {
                    let name = resolve_one(registry, &index, descriptor, reference)?;
                    if let Some(&j) = index.get(name.as_str()) {
                        edges[i].push(j);
                    }
                    own.push(Target::One(name));
                }
                Dependency::All(orb_type) => {
                    edges[i].extend(
                        pending
                            .iter()
                            .enumerate()
                            .filter(|(j, d)| *j != i && d.orb_type.as_deref() == Some(orb_type))
                            .map(|(j, _)| j),
                    );
                    own.push(Target::All(orb_type.clone()));
                }
            }
        }
        edges[i].sort_unstable();
        edges[i].dedup();
        targets.push(own);
    }

    let order = topological_order(&edges).map_err(|cycle| ZenithError::CyclicDependency {
        cycle: cycle
            .into_iter()
            .map(|i| pending[i].name.clone())
            .collect(),
    })?;

    let mut targets: Vec<Option<Vec<Target>>> = targets.into_iter().map(Some).collect();
    Ok(order
        .into_iter()
        .map(|i| (i, targets[i].take().unwrap_or_default()))
        .collect())
}

/// Name first, then a unique type tag.
fn resolve_one(
    registry: &Registry,
    index: &HashMap<&str, usize>,
    descriptor: &OrbDescriptor,
    reference: &str,
) -> Result<String> {
    if index.contains_key(reference) || registry.orbs.contains_key(reference) {
        return Ok(reference.to_string());
    }

    let mut candidates: Vec<String> = registry
        .built_order
        .iter()
        .filter(|name| registry.orbs.get(*name).is_some_and(|o| o.has_type(reference)))
        .cloned()
        .collect();
    candidates.extend(
        registry
            .pending
            .iter()
            .filter(|d| d.name != descriptor.name && d.orb_type.as_deref() == Some(reference))
            .map(|d| d.name.clone()),
    );

    match candidates.len() {
        0 => Err(ZenithError::UnresolvedDependency {
            dependency: reference.to_string(),
            dependent: descriptor.name.clone(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(ZenithError::AmbiguousDependency {
            dependency: reference.to_string(),
            dependent: descriptor.name.clone(),
            candidates,
        }),
    }
}

/// Kahn's algorithm over `edges[node] = dependencies of node`.
///
/// On failure returns one cycle as a node path whose first node is repeated at the end.
fn topological_order(edges: &[Vec<usize>]) -> std::result::Result<Vec<usize>, Vec<usize>> {
    let n = edges.len();
    let mut missing: Vec<usize> = edges.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (node, deps) in edges.iter().enumerate() {
        for &dep in deps {
            dependents[dep].push(node);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| missing[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(node) = ready.pop_first() {
        order.push(node);
        for &dependent in &dependents[node] {
            missing[dependent] -= 1;
            if missing[dependent] == 0 {
                ready.insert(dependent);
            }
        }
    }

    if order.len() == n {
        return Ok(order);
    }

    let placed: HashSet<usize> = order.iter().copied().collect();
    Err(find_cycle(edges, &placed))
}

/// Every unplaced node still waits on an unplaced dependency, so walking those edges
/// from any unplaced node must revisit a node.
fn find_cycle(edges: &[Vec<usize>], placed: &HashSet<usize>) -> Vec<usize> {
    let Some(start) = (0..edges.len()).find(|i| !placed.contains(i)) else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut position: HashMap<usize, usize> = HashMap::new();
    let mut node = start;
    loop {
        if let Some(&at) = position.get(&node) {
            let mut cycle = path.split_off(at);
            cycle.push(node);
            return cycle;
        }
        position.insert(node, path.len());
        path.push(node);
        match edges[node].iter().find(|dep| !placed.contains(dep)) {
            Some(&next) => node = next,
            None => return path,
        }
    }
}
