//! Crate front door.

use std::collections::{HashMap, HashSet};

use flagstone_core::errors::AdapterError;
use flagstone_core::groups::GroupRegistry;
use flagstone_core::traits::{Actor, Adapter};
use flagstone_core::values::GateValues;

use crate::feature::Feature;

/// Owning handle over a storage adapter and the group registry.
///
/// ```
/// use flagstone_core::traits::{Actor, PlainActor};
/// use flagstone_engine::{Flags, MemoryAdapter};
///
/// let mut flags = Flags::new(MemoryAdapter::new());
/// flags.register_group("staff", |actor: &dyn Actor| {
///     actor.actor_id().starts_with("Staff;")
/// });
///
/// flags.feature("search").enable_default().unwrap();
/// assert!(flags.is_enabled("search", None).unwrap());
///
/// let user = PlainActor::new("User;1");
/// assert!(flags.is_enabled("search", Some(&user)).unwrap());
/// ```
pub struct Flags {
    adapter: Box<dyn Adapter>,
    groups: GroupRegistry,
}

impl Flags {
    pub fn new(adapter: impl Adapter + 'static) -> Self {
        Self {
            adapter: Box::new(adapter),
            groups: GroupRegistry::new(),
        }
    }

    /// Handle on one feature. Features need no declaration; an unknown
    /// key reads as off.
    pub fn feature(&self, name: impl Into<String>) -> Feature<'_> {
        Feature::new(name, self.adapter.as_ref(), &self.groups)
    }

    pub fn is_enabled(&self, name: &str, actor: Option<&dyn Actor>) -> Result<bool, AdapterError> {
        self.feature(name).is_enabled(actor)
    }

    pub fn enable(&self, name: &str) -> Result<bool, AdapterError> {
        self.feature(name).enable_default()
    }

    pub fn disable(&self, name: &str) -> Result<bool, AdapterError> {
        self.feature(name).disable_default()
    }

    /// Register a named membership predicate for the group gate.
    /// Registration happens at startup; the registry is read-only
    /// during checks.
    pub fn register_group(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&dyn Actor) -> bool + Send + Sync + 'static,
    ) {
        self.groups.register(name, predicate);
    }

    pub fn groups(&self) -> &GroupRegistry {
        &self.groups
    }

    /// Keys of every feature the adapter knows.
    pub fn features(&self) -> Result<HashSet<String>, AdapterError> {
        self.adapter.features()
    }

    /// Typed snapshots for a set of features in one adapter round-trip.
    pub fn preload(&self, names: &[&str]) -> Result<HashMap<String, GateValues>, AdapterError> {
        Ok(self
            .adapter
            .get_multi(names)?
            .iter()
            .map(|(name, raw)| (name.clone(), GateValues::from_raw(raw)))
            .collect())
    }

    /// Typed snapshots for every known feature.
    pub fn preload_all(&self) -> Result<HashMap<String, GateValues>, AdapterError> {
        Ok(self
            .adapter
            .get_all()?
            .iter()
            .map(|(name, raw)| (name.clone(), GateValues::from_raw(raw)))
            .collect())
    }

    pub fn adapter(&self) -> &dyn Adapter {
        self.adapter.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryAdapter;
    use flagstone_core::traits::PlainActor;

    #[test]
    fn front_door_enable_disable() {
        let flags = Flags::new(MemoryAdapter::new());
        assert!(!flags.is_enabled("search", None).unwrap());

        flags.enable("search").unwrap();
        assert!(flags.is_enabled("search", None).unwrap());

        flags.disable("search").unwrap();
        assert!(!flags.is_enabled("search", None).unwrap());
    }

    #[test]
    fn groups_flow_through_to_checks() {
        let mut flags = Flags::new(MemoryAdapter::new());
        flags.register_group("early_access", |actor: &dyn Actor| {
            actor.actor_id().ends_with(";1")
        });
        flags
            .feature("search")
            .enable_group(flagstone_core::types::GroupName::new("early_access").unwrap())
            .unwrap();

        let first = PlainActor::new("User;1");
        let second = PlainActor::new("User;2");
        assert!(flags.is_enabled("search", Some(&first)).unwrap());
        assert!(!flags.is_enabled("search", Some(&second)).unwrap());
    }

    #[test]
    fn preload_returns_typed_snapshots() {
        let flags = Flags::new(MemoryAdapter::new());
        flags.enable("search").unwrap();
        flags.feature("billing").add().unwrap();

        let loaded = flags.preload(&["search", "billing", "missing"]).unwrap();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded["search"].boolean, Some(true));
        assert_eq!(loaded["billing"], GateValues::default());

        let all = flags.preload_all().unwrap();
        assert_eq!(all.len(), 2);

        let mut features: Vec<String> = flags.features().unwrap().into_iter().collect();
        features.sort();
        assert_eq!(features, ["billing", "search"]);
    }
}
