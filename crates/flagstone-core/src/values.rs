use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::GateKey;

/// Raw per-gate value as storage adapters hand it back.
///
/// Shape by data type: boolean and number gates use `Text`
/// (`"true"`, `"25"`), set gates use `Set`, the expression gate uses
/// `Json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Set(HashSet<String>),
    Json(Value),
}

impl RawValue {
    pub fn text(s: impl Into<String>) -> Self {
        RawValue::Text(s.into())
    }
}

/// Flat raw snapshot of one feature, keyed by gate.
pub type RawGateValues = HashMap<GateKey, RawValue>;

/// Typed read-only snapshot of a feature's stored gate configuration.
///
/// Built fresh from raw adapter values on every read; absent or
/// malformed raw values coerce to the empty value for their gate rather
/// than erroring.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateValues {
    #[serde(default)]
    pub boolean: Option<bool>,
    #[serde(default)]
    pub actors: HashSet<String>,
    #[serde(default)]
    pub groups: HashSet<String>,
    #[serde(default)]
    pub percentage_of_actors: Option<f64>,
    #[serde(default)]
    pub percentage_of_time: Option<f64>,
    #[serde(default)]
    pub expression: Option<Value>,
}

impl GateValues {
    pub fn from_raw(raw: &RawGateValues) -> Self {
        Self {
            boolean: to_boolean(raw.get(&GateKey::Boolean)),
            actors: to_set(raw.get(&GateKey::Actors)),
            groups: to_set(raw.get(&GateKey::Groups)),
            percentage_of_actors: to_number(raw.get(&GateKey::PercentageOfActors)),
            percentage_of_time: to_number(raw.get(&GateKey::PercentageOfTime)),
            expression: to_json(raw.get(&GateKey::Expression)),
        }
    }
}

fn to_boolean(raw: Option<&RawValue>) -> Option<bool> {
    match raw {
        Some(RawValue::Text(s)) if s == "true" => Some(true),
        _ => None,
    }
}

fn to_number(raw: Option<&RawValue>) -> Option<f64> {
    match raw {
        Some(RawValue::Text(s)) => s.parse::<f64>().ok(),
        Some(RawValue::Json(v)) => v.as_f64(),
        _ => None,
    }
}

fn to_set(raw: Option<&RawValue>) -> HashSet<String> {
    match raw {
        Some(RawValue::Set(s)) => s.clone(),
        _ => HashSet::new(),
    }
}

fn to_json(raw: Option<&RawValue>) -> Option<Value> {
    match raw {
        Some(RawValue::Json(v)) if !v.is_null() => Some(v.clone()),
        _ => None,
    }
}
