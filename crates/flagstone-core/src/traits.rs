use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::errors::AdapterError;
use crate::types::GateKey;
use crate::values::{RawGateValues, RawValue};

/// An external entity a feature can be checked against.
///
/// `actor_id` must be stable for the lifetime of the entity (it feeds
/// the consistent-hash rollout bucket); `properties` feeds `Property`
/// expression nodes.
pub trait Actor {
    fn actor_id(&self) -> String;

    fn properties(&self) -> HashMap<String, Value> {
        HashMap::new()
    }
}

/// A fixed actor built from plain data. Handy for checks where the
/// caller already has an id string rather than a domain type.
#[derive(Debug, Clone, Default)]
pub struct PlainActor {
    pub id: String,
    pub properties: HashMap<String, Value>,
}

impl PlainActor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            properties: HashMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }
}

impl Actor for PlainActor {
    fn actor_id(&self) -> String {
        self.id.clone()
    }

    fn properties(&self) -> HashMap<String, Value> {
        self.properties.clone()
    }
}

/// Storage collaborator contract.
///
/// Adapters persist a mapping from feature key to a flat structure of
/// raw per-gate values. The engine never caches reads; consistency
/// guarantees between concurrent readers and writers belong to the
/// adapter.
///
/// Write semantics by gate data type:
/// - boolean: `enable` stores `"true"`; `disable` resets every gate of
///   the feature (turning a feature fully off discards its targeting).
/// - number: `enable` and `disable` both overwrite the stored value.
/// - set: `enable` inserts the given member, `disable` removes it.
/// - json: `enable` stores the document, `disable` deletes it.
pub trait Adapter {
    /// Keys of all features ever added.
    fn features(&self) -> Result<HashSet<String>, AdapterError>;

    /// Ensure the feature record exists. Gate writes may be keyed by a
    /// reference to the feature row, so this runs before every enable.
    fn add(&self, feature: &str) -> Result<bool, AdapterError>;

    fn remove(&self, feature: &str) -> Result<bool, AdapterError>;

    /// Reset every gate of the feature without removing the record.
    fn clear(&self, feature: &str) -> Result<bool, AdapterError>;

    /// Raw per-gate values for one feature. Unknown features yield an
    /// empty map, not an error.
    fn get(&self, feature: &str) -> Result<RawGateValues, AdapterError>;

    fn get_multi(
        &self,
        features: &[&str],
    ) -> Result<HashMap<String, RawGateValues>, AdapterError> {
        let mut out = HashMap::with_capacity(features.len());
        for feature in features {
            out.insert((*feature).to_string(), self.get(feature)?);
        }
        Ok(out)
    }

    fn get_all(&self) -> Result<HashMap<String, RawGateValues>, AdapterError> {
        let features = self.features()?;
        let keys: Vec<&str> = features.iter().map(String::as_str).collect();
        self.get_multi(&keys)
    }

    fn enable(&self, feature: &str, key: GateKey, value: &RawValue)
        -> Result<bool, AdapterError>;

    fn disable(&self, feature: &str, key: GateKey, value: &RawValue)
        -> Result<bool, AdapterError>;
}
