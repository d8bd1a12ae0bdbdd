use std::collections::HashMap;
use std::fmt;

use crate::traits::Actor;

type GroupPredicate = Box<dyn Fn(&dyn Actor) -> bool + Send + Sync>;

/// Named membership predicates over actors, consumed by the group gate.
///
/// Registered once at startup and read-only afterwards. Names stored in
/// a feature's groups set that were never registered simply never match.
#[derive(Default)]
pub struct GroupRegistry {
    groups: HashMap<String, GroupPredicate>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: impl Into<String>,
        predicate: impl Fn(&dyn Actor) -> bool + Send + Sync + 'static,
    ) {
        self.groups.insert(name.into(), Box::new(predicate));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.groups.contains_key(name)
    }

    /// True iff `name` is registered and its predicate accepts `actor`.
    pub fn is_member(&self, name: &str, actor: &dyn Actor) -> bool {
        match self.groups.get(name) {
            Some(predicate) => predicate(actor),
            None => false,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }
}

impl fmt::Debug for GroupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.names().collect();
        names.sort_unstable();
        f.debug_struct("GroupRegistry").field("groups", &names).finish()
    }
}
