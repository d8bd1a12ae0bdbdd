//! The feature orchestrator.

use std::fmt;

use serde::{Deserialize, Serialize};

use flagstone_core::errors::AdapterError;
use flagstone_core::expression::coerce::format_number;
use flagstone_core::expression::Expression;
use flagstone_core::groups::GroupRegistry;
use flagstone_core::traits::{Actor, Adapter};
use flagstone_core::types::{
    ActorId, GateInput, GateKey, GroupName, PercentageOfActors, PercentageOfTime,
};
use flagstone_core::values::{GateValues, RawValue};

use crate::context::EvaluationContext;
use crate::gates::{Gate, GATE_ORDER};

/// Three-state summary of a feature's stored configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureState {
    On,
    Conditional,
    Off,
}

impl fmt::Display for FeatureState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FeatureState::On => "on",
            FeatureState::Conditional => "conditional",
            FeatureState::Off => "off",
        })
    }
}

/// One feature, identified by its key. Created per lookup and stateless
/// besides the key; every read fetches a fresh snapshot from the
/// adapter.
pub struct Feature<'a> {
    name: String,
    adapter: &'a dyn Adapter,
    groups: &'a GroupRegistry,
}

impl<'a> Feature<'a> {
    pub fn new(
        name: impl Into<String>,
        adapter: &'a dyn Adapter,
        groups: &'a GroupRegistry,
    ) -> Self {
        Self {
            name: name.into(),
            adapter,
            groups,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Typed snapshot of the stored per-gate values.
    pub fn gate_values(&self) -> Result<GateValues, AdapterError> {
        Ok(GateValues::from_raw(&self.adapter.get(&self.name)?))
    }

    /// Walk the gates in order and report whether any opens for this
    /// check. Any open gate enables the feature; the walk only decides
    /// which gate gets reported by `enabled_gate`.
    pub fn is_enabled(&self, actor: Option<&dyn Actor>) -> Result<bool, AdapterError> {
        Ok(self.enabled_gate(actor)?.is_some())
    }

    /// Key of the first open gate, for instrumentation.
    pub fn enabled_gate(&self, actor: Option<&dyn Actor>) -> Result<Option<GateKey>, AdapterError> {
        let values = self.gate_values()?;
        let ctx = EvaluationContext {
            feature_name: &self.name,
            values: &values,
            actor,
            groups: self.groups,
        };
        Ok(GATE_ORDER
            .into_iter()
            .find(|gate| gate.is_open(&ctx))
            .map(Gate::key))
    }

    /// `On` when fully enabled for everyone, `Conditional` when some
    /// targeting is configured, `Off` otherwise. A stored boolean that
    /// is not true never counts towards `Conditional`.
    pub fn state(&self) -> Result<FeatureState, AdapterError> {
        let values = self.gate_values()?;
        if Gate::Boolean.is_enabled(&values) || values.percentage_of_time == Some(100.0) {
            return Ok(FeatureState::On);
        }
        let conditional = GATE_ORDER
            .iter()
            .filter(|gate| **gate != Gate::Boolean)
            .any(|gate| gate.is_enabled(&values));
        if conditional {
            Ok(FeatureState::Conditional)
        } else {
            Ok(FeatureState::Off)
        }
    }

    /// Route a value to its owning gate and persist the enable. The
    /// feature record is ensured first: some backends key gate rows by
    /// a reference to the feature row.
    pub fn enable(&self, input: impl Into<GateInput>) -> Result<bool, AdapterError> {
        let input = input.into();
        let gate = Gate::owning(&input);
        self.adapter.add(&self.name)?;
        self.adapter
            .enable(&self.name, gate.key(), &wire_value(&input))
    }

    /// Route a value to its owning gate and persist the disable.
    pub fn disable(&self, input: impl Into<GateInput>) -> Result<bool, AdapterError> {
        let input = input.into();
        let gate = Gate::owning(&input);
        self.adapter.add(&self.name)?;
        self.adapter
            .disable(&self.name, gate.key(), &wire_value(&input))
    }

    /// Turn the feature fully on via the boolean gate.
    pub fn enable_default(&self) -> Result<bool, AdapterError> {
        self.enable(true)
    }

    /// Turn the feature fully off via the boolean gate, discarding any
    /// targeting the adapter had stored.
    pub fn disable_default(&self) -> Result<bool, AdapterError> {
        self.disable(false)
    }

    pub fn enable_actor(&self, id: ActorId) -> Result<bool, AdapterError> {
        self.enable(id)
    }

    pub fn disable_actor(&self, id: ActorId) -> Result<bool, AdapterError> {
        self.disable(id)
    }

    pub fn enable_group(&self, name: GroupName) -> Result<bool, AdapterError> {
        self.enable(name)
    }

    pub fn disable_group(&self, name: GroupName) -> Result<bool, AdapterError> {
        self.disable(name)
    }

    pub fn enable_percentage_of_actors(
        &self,
        percentage: PercentageOfActors,
    ) -> Result<bool, AdapterError> {
        self.enable(percentage)
    }

    pub fn disable_percentage_of_actors(&self) -> Result<bool, AdapterError> {
        self.disable(PercentageOfActors::default())
    }

    pub fn enable_percentage_of_time(
        &self,
        percentage: PercentageOfTime,
    ) -> Result<bool, AdapterError> {
        self.enable(percentage)
    }

    pub fn disable_percentage_of_time(&self) -> Result<bool, AdapterError> {
        self.disable(PercentageOfTime::default())
    }

    pub fn enable_expression(&self, expression: Expression) -> Result<bool, AdapterError> {
        self.enable(expression)
    }

    pub fn disable_expression(&self) -> Result<bool, AdapterError> {
        self.adapter.add(&self.name)?;
        self.adapter.disable(
            &self.name,
            GateKey::Expression,
            &RawValue::Json(serde_json::Value::Null),
        )
    }

    pub fn exists(&self) -> Result<bool, AdapterError> {
        Ok(self.adapter.features()?.contains(&self.name))
    }

    pub fn add(&self) -> Result<bool, AdapterError> {
        self.adapter.add(&self.name)
    }

    pub fn remove(&self) -> Result<bool, AdapterError> {
        self.adapter.remove(&self.name)
    }

    pub fn clear(&self) -> Result<bool, AdapterError> {
        self.adapter.clear(&self.name)
    }
}

/// Raw wire value for a write, by the input's data type: booleans and
/// percentages as strings, set members as the member string, the
/// expression as its object notation.
fn wire_value(input: &GateInput) -> RawValue {
    match input {
        GateInput::Boolean(b) => RawValue::text(b.to_string()),
        GateInput::Actor(id) => RawValue::text(id.as_str()),
        GateInput::Group(name) => RawValue::text(name.as_str()),
        GateInput::PercentageOfActors(p) => RawValue::text(format_number(p.value())),
        GateInput::PercentageOfTime(p) => RawValue::text(format_number(p.value())),
        GateInput::Expression(expr) => RawValue::Json(expr.value()),
    }
}
