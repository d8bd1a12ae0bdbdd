use flagstone_core::expression::ExpressionContext;
use flagstone_core::groups::GroupRegistry;
use flagstone_core::traits::Actor;
use flagstone_core::values::GateValues;

/// Ambient inputs for one gate check: the feature under evaluation,
/// its typed gate values, the optional actor, and the group registry.
/// Built fresh per check and discarded afterwards.
#[derive(Clone, Copy)]
pub struct EvaluationContext<'a> {
    pub feature_name: &'a str,
    pub values: &'a GateValues,
    pub actor: Option<&'a dyn Actor>,
    pub groups: &'a GroupRegistry,
}

impl EvaluationContext<'_> {
    /// Narrower context handed to expression evaluation. The property
    /// bag is empty when the check has no actor.
    pub fn expression_context(&self) -> ExpressionContext {
        ExpressionContext {
            feature_name: self.feature_name.to_string(),
            properties: self
                .actor
                .map(|actor| actor.properties())
                .unwrap_or_default(),
        }
    }
}
