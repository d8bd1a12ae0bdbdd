use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use flagstone_core::errors::AdapterError;
use flagstone_core::traits::Adapter;
use flagstone_core::types::{DataType, GateKey};
use flagstone_core::values::{RawGateValues, RawValue};

type Store = HashMap<String, RawGateValues>;

/// In-memory storage adapter.
///
/// The reference implementation of the adapter contract and the
/// fixture the test suites run against. Makes no persistence claims;
/// the lock only makes a shared instance usable across threads.
#[derive(Debug, Default)]
pub struct MemoryAdapter {
    store: RwLock<Store>,
}

impl MemoryAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Store>, AdapterError> {
        self.store.read().map_err(|_| AdapterError::Unavailable)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Store>, AdapterError> {
        self.store.write().map_err(|_| AdapterError::Unavailable)
    }
}

impl Adapter for MemoryAdapter {
    fn features(&self) -> Result<HashSet<String>, AdapterError> {
        Ok(self.read()?.keys().cloned().collect())
    }

    fn add(&self, feature: &str) -> Result<bool, AdapterError> {
        let mut store = self.write()?;
        let newly_added = !store.contains_key(feature);
        store.entry(feature.to_string()).or_default();
        Ok(newly_added)
    }

    fn remove(&self, feature: &str) -> Result<bool, AdapterError> {
        Ok(self.write()?.remove(feature).is_some())
    }

    fn clear(&self, feature: &str) -> Result<bool, AdapterError> {
        let mut store = self.write()?;
        store.entry(feature.to_string()).or_default().clear();
        Ok(true)
    }

    fn get(&self, feature: &str) -> Result<RawGateValues, AdapterError> {
        Ok(self.read()?.get(feature).cloned().unwrap_or_default())
    }

    fn enable(
        &self,
        feature: &str,
        key: GateKey,
        value: &RawValue,
    ) -> Result<bool, AdapterError> {
        let mut store = self.write()?;
        let gates = store.entry(feature.to_string()).or_default();
        match key.data_type() {
            DataType::Set => {
                let member = set_member(key, value)?;
                match gates
                    .entry(key)
                    .or_insert_with(|| RawValue::Set(HashSet::new()))
                {
                    RawValue::Set(set) => {
                        set.insert(member);
                    }
                    slot => *slot = RawValue::Set(HashSet::from([member])),
                }
            }
            DataType::Boolean | DataType::Number | DataType::Json => {
                gates.insert(key, value.clone());
            }
        }
        Ok(true)
    }

    fn disable(
        &self,
        feature: &str,
        key: GateKey,
        value: &RawValue,
    ) -> Result<bool, AdapterError> {
        let mut store = self.write()?;
        let gates = store.entry(feature.to_string()).or_default();
        match key.data_type() {
            // Turning a feature fully off discards its targeting.
            DataType::Boolean => gates.clear(),
            DataType::Number => {
                gates.insert(key, value.clone());
            }
            DataType::Set => {
                let member = set_member(key, value)?;
                if let Some(RawValue::Set(set)) = gates.get_mut(&key) {
                    set.remove(&member);
                }
            }
            DataType::Json => {
                gates.remove(&key);
            }
        }
        Ok(true)
    }
}

fn set_member(key: GateKey, value: &RawValue) -> Result<String, AdapterError> {
    match value {
        RawValue::Text(member) => Ok(member.clone()),
        other => Err(AdapterError::Backend(format!(
            "{key} expects a member string, got {other:?}"
        ))),
    }
}
