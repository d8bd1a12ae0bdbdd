use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::ValueError;
use crate::expression::Expression;

/// Storage key for one gate of a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKey {
    Boolean,
    Expression,
    Actors,
    Groups,
    PercentageOfActors,
    PercentageOfTime,
}

impl GateKey {
    pub fn as_str(self) -> &'static str {
        match self {
            GateKey::Boolean => "boolean",
            GateKey::Expression => "expression",
            GateKey::Actors => "actors",
            GateKey::Groups => "groups",
            GateKey::PercentageOfActors => "percentage_of_actors",
            GateKey::PercentageOfTime => "percentage_of_time",
        }
    }

    /// Wire representation of this gate's stored value.
    pub fn data_type(self) -> DataType {
        match self {
            GateKey::Boolean => DataType::Boolean,
            GateKey::Expression => DataType::Json,
            GateKey::Actors | GateKey::Groups => DataType::Set,
            GateKey::PercentageOfActors | GateKey::PercentageOfTime => DataType::Number,
        }
    }
}

impl fmt::Display for GateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a gate's raw value is represented by storage adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    /// `"true"` string, or absent.
    Boolean,
    /// Set of strings.
    Set,
    /// String-encoded number in `[0, 100]`.
    Number,
    /// Arbitrary JSON object, or null.
    Json,
}

/// Stable identity of an actor, e.g. `"User;1"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> Result<Self, ValueError> {
        let id = id.into();
        if id.is_empty() {
            return Err(ValueError::EmptyActorId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a registered group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GroupName(String);

impl GroupName {
    pub fn new(name: impl Into<String>) -> Result<Self, ValueError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ValueError::EmptyGroupName);
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rollout percentage over the actor population, constrained to `[0, 100]`.
/// The default is zero, the value a disable writes back.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize)]
pub struct PercentageOfActors(f64);

impl PercentageOfActors {
    pub fn new(value: f64) -> Result<Self, ValueError> {
        if !(0.0..=100.0).contains(&value) {
            return Err(ValueError::PercentageOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Probability percentage per check, constrained to `[0, 100]`.
/// The default is zero, the value a disable writes back.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize)]
pub struct PercentageOfTime(f64);

impl PercentageOfTime {
    pub fn new(value: f64) -> Result<Self, ValueError> {
        if !(0.0..=100.0).contains(&value) {
            return Err(ValueError::PercentageOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for PercentageOfActors {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = f64::deserialize(deserializer)?;
        PercentageOfActors::new(v).map_err(serde::de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for PercentageOfTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let v = f64::deserialize(deserializer)?;
        PercentageOfTime::new(v).map_err(serde::de::Error::custom)
    }
}

/// Value routed to a gate by `gate_for`. Each variant is claimed by
/// exactly one gate; wrapping an already-wrapped value is a no-op by
/// construction.
#[derive(Debug, Clone, PartialEq)]
pub enum GateInput {
    Boolean(bool),
    Actor(ActorId),
    Group(GroupName),
    PercentageOfActors(PercentageOfActors),
    PercentageOfTime(PercentageOfTime),
    Expression(Expression),
}

impl GateInput {
    /// Short human description, used in routing errors.
    pub fn describe(&self) -> String {
        match self {
            GateInput::Boolean(b) => format!("boolean {b}"),
            GateInput::Actor(id) => format!("actor {id}"),
            GateInput::Group(name) => format!("group {name}"),
            GateInput::PercentageOfActors(p) => format!("{}% of actors", p.value()),
            GateInput::PercentageOfTime(p) => format!("{}% of time", p.value()),
            GateInput::Expression(_) => "expression".to_string(),
        }
    }
}

impl From<bool> for GateInput {
    fn from(b: bool) -> Self {
        GateInput::Boolean(b)
    }
}

impl From<ActorId> for GateInput {
    fn from(id: ActorId) -> Self {
        GateInput::Actor(id)
    }
}

impl From<GroupName> for GateInput {
    fn from(name: GroupName) -> Self {
        GateInput::Group(name)
    }
}

impl From<PercentageOfActors> for GateInput {
    fn from(p: PercentageOfActors) -> Self {
        GateInput::PercentageOfActors(p)
    }
}

impl From<PercentageOfTime> for GateInput {
    fn from(p: PercentageOfTime) -> Self {
        GateInput::PercentageOfTime(p)
    }
}

impl From<Expression> for GateInput {
    fn from(expr: Expression) -> Self {
        GateInput::Expression(expr)
    }
}
