//! The six gate variants.
//!
//! A gate answers three questions: is it configured at all
//! (`is_enabled`, from stored values alone), does it open for a given
//! check (`is_open`, against the evaluation context), and does it own
//! a given write input (`protects`).

use flagstone_core::errors::GateError;
use flagstone_core::expression::coerce::is_truthy;
use flagstone_core::expression::ExpressionRegistry;
use flagstone_core::rollout;
use flagstone_core::types::{DataType, GateInput, GateKey};
use flagstone_core::values::GateValues;
use rand::Rng;

use crate::context::EvaluationContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    Boolean,
    Expression,
    Actor,
    Group,
    PercentageOfActors,
    PercentageOfTime,
}

/// Fixed gate order. Writes route to the first gate claiming an input;
/// the read path stops at the first open gate, so this order decides
/// which gate is reported as having fired (the boolean outcome is an
/// OR and does not depend on it).
pub const GATE_ORDER: [Gate; 6] = [
    Gate::Boolean,
    Gate::Expression,
    Gate::Actor,
    Gate::Group,
    Gate::PercentageOfActors,
    Gate::PercentageOfTime,
];

impl Gate {
    pub fn key(self) -> GateKey {
        match self {
            Gate::Boolean => GateKey::Boolean,
            Gate::Expression => GateKey::Expression,
            Gate::Actor => GateKey::Actors,
            Gate::Group => GateKey::Groups,
            Gate::PercentageOfActors => GateKey::PercentageOfActors,
            Gate::PercentageOfTime => GateKey::PercentageOfTime,
        }
    }

    pub fn data_type(self) -> DataType {
        self.key().data_type()
    }

    /// True iff this gate has a non-empty stored configuration.
    pub fn is_enabled(self, values: &GateValues) -> bool {
        match self {
            Gate::Boolean => values.boolean == Some(true),
            Gate::Expression => values.expression.is_some(),
            Gate::Actor => !values.actors.is_empty(),
            Gate::Group => !values.groups.is_empty(),
            Gate::PercentageOfActors => values.percentage_of_actors.is_some_and(|p| p > 0.0),
            Gate::PercentageOfTime => values.percentage_of_time.is_some_and(|p| p > 0.0),
        }
    }

    /// True iff this gate's condition holds for the check at hand.
    pub fn is_open(self, ctx: &EvaluationContext<'_>) -> bool {
        match self {
            Gate::Boolean => ctx.values.boolean == Some(true),

            // Lenient mode: a stored expression that fails to build or
            // errors during evaluation resolves to closed rather than
            // failing the whole flag check.
            Gate::Expression => {
                let Some(raw) = &ctx.values.expression else {
                    return false;
                };
                let Ok(expr) = ExpressionRegistry::shared().build(raw) else {
                    return false;
                };
                match expr.evaluate(&ctx.expression_context()) {
                    Ok(result) => is_truthy(&result),
                    Err(_) => false,
                }
            }

            Gate::Actor => ctx
                .actor
                .is_some_and(|actor| ctx.values.actors.contains(&actor.actor_id())),

            // Unregistered group names stored in the set never match.
            Gate::Group => ctx.actor.is_some_and(|actor| {
                ctx.values
                    .groups
                    .iter()
                    .any(|name| ctx.groups.is_member(name, actor))
            }),

            Gate::PercentageOfActors => match (ctx.actor, ctx.values.percentage_of_actors) {
                (Some(actor), Some(percent)) => {
                    rollout::included(ctx.feature_name, &actor.actor_id(), percent)
                }
                _ => false,
            },

            Gate::PercentageOfTime => ctx
                .values
                .percentage_of_time
                .is_some_and(|percent| rand::rng().random::<f64>() * 100.0 < percent),
        }
    }

    /// True iff this gate owns the given write input.
    pub fn protects(self, input: &GateInput) -> bool {
        matches!(
            (self, input),
            (Gate::Boolean, GateInput::Boolean(_))
                | (Gate::Expression, GateInput::Expression(_))
                | (Gate::Actor, GateInput::Actor(_))
                | (Gate::Group, GateInput::Group(_))
                | (Gate::PercentageOfActors, GateInput::PercentageOfActors(_))
                | (Gate::PercentageOfTime, GateInput::PercentageOfTime(_))
        )
    }

    /// Owner of an input as a total match. Agrees with the ordered
    /// `gate_for` walk for every variant; the orchestrator uses this
    /// form so routing is infallible.
    pub fn owning(input: &GateInput) -> Gate {
        match input {
            GateInput::Boolean(_) => Gate::Boolean,
            GateInput::Expression(_) => Gate::Expression,
            GateInput::Actor(_) => Gate::Actor,
            GateInput::Group(_) => Gate::Group,
            GateInput::PercentageOfActors(_) => Gate::PercentageOfActors,
            GateInput::PercentageOfTime(_) => Gate::PercentageOfTime,
        }
    }
}

/// First gate in `GATE_ORDER` whose `protects` accepts the input.
pub fn gate_for(input: &GateInput) -> Result<Gate, GateError> {
    GATE_ORDER
        .into_iter()
        .find(|gate| gate.protects(input))
        .ok_or_else(|| GateError::NoGateFor(input.describe()))
}
