//! Expression tree: build, evaluate, round-trip.
//!
//! Expressions are stored and exchanged as JSON object notation
//! (`{"Any": [{"Property": ["admin"]}, {"Equal": [{"Property": ["plan"]},
//! "gold"]}]}`); primitives auto-promote to `Constant`. The node set is
//! closed but registry-extensible, and every tree round-trips back to
//! the notation that built it via [`Expression::value`].

mod build;
pub mod coerce;

pub use build::{ExpressionRegistry, NodeBuilder};

use std::collections::HashMap;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use rand::Rng;
use serde_json::Value;

use crate::errors::ExpressionError;
use crate::rollout;

use coerce::{is_truthy, to_number, to_string};

/// Ambient inputs for expression evaluation, derived from the wider
/// gate check: the feature under evaluation and the actor's property
/// bag (empty when the check has no actor).
#[derive(Debug, Clone, Default)]
pub struct ExpressionContext {
    pub feature_name: String,
    pub properties: HashMap<String, Value>,
}

/// Result of evaluating a node. A JS-faithful scalar domain:
/// `Undefined` models a missing property and `Number` is an `f64` so
/// date parsing can yield NaN without erroring.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Json(Value),
}

impl Evaluated {
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Evaluated::Null,
            Value::Bool(b) => Evaluated::Bool(*b),
            Value::Number(n) => Evaluated::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Evaluated::String(s.clone()),
            Value::Array(_) | Value::Object(_) => Evaluated::Json(value.clone()),
        }
    }

    fn is_nullish(&self) -> bool {
        matches!(self, Evaluated::Undefined | Evaluated::Null)
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Evaluated::Number(n) => Some(*n),
            _ => None,
        }
    }
}

/// Seconds per unit accepted by `Duration`.
const DURATION_UNITS: [(&str, f64); 7] = [
    ("second", 1.0),
    ("minute", 60.0),
    ("hour", 3600.0),
    ("day", 86_400.0),
    ("week", 604_800.0),
    ("month", 2_629_746.0),
    ("year", 31_556_952.0),
];

/// One node of an expression tree. Children are built eagerly from the
/// object notation, so a tree is always finite and acyclic.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    All(Vec<Expression>),
    Any(Vec<Expression>),
    Boolean(Box<Expression>),
    Constant(Value),
    Duration(Box<Expression>, Box<Expression>),
    Equal(Box<Expression>, Box<Expression>),
    GreaterThan(Box<Expression>, Box<Expression>),
    GreaterThanOrEqualTo(Box<Expression>, Box<Expression>),
    LessThan(Box<Expression>, Box<Expression>),
    LessThanOrEqualTo(Box<Expression>, Box<Expression>),
    NotEqual(Box<Expression>, Box<Expression>),
    Now,
    Number(Box<Expression>),
    Percentage(Box<Expression>, Box<Expression>),
    PercentageOfActors(Box<Expression>, Box<Expression>),
    Property(Box<Expression>),
    Random(Box<Expression>),
    String(Box<Expression>),
    Time(Box<Expression>),
}

impl Expression {
    /// Wire name of this node kind.
    pub fn name(&self) -> &'static str {
        match self {
            Expression::All(_) => "All",
            Expression::Any(_) => "Any",
            Expression::Boolean(_) => "Boolean",
            Expression::Constant(_) => "Constant",
            Expression::Duration(..) => "Duration",
            Expression::Equal(..) => "Equal",
            Expression::GreaterThan(..) => "GreaterThan",
            Expression::GreaterThanOrEqualTo(..) => "GreaterThanOrEqualTo",
            Expression::LessThan(..) => "LessThan",
            Expression::LessThanOrEqualTo(..) => "LessThanOrEqualTo",
            Expression::NotEqual(..) => "NotEqual",
            Expression::Now => "Now",
            Expression::Number(_) => "Number",
            Expression::Percentage(..) => "Percentage",
            Expression::PercentageOfActors(..) => "PercentageOfActors",
            Expression::Property(_) => "Property",
            Expression::Random(_) => "Random",
            Expression::String(_) => "String",
            Expression::Time(_) => "Time",
        }
    }

    /// Evaluate the tree against `ctx`.
    ///
    /// Missing data never errors: absent properties evaluate to
    /// `Undefined`, nullish comparison operands make the comparison
    /// false, and unparseable dates yield NaN. The only runtime errors
    /// are malformed `Duration` arguments.
    pub fn evaluate(&self, ctx: &ExpressionContext) -> Result<Evaluated, ExpressionError> {
        match self {
            Expression::Constant(v) => Ok(Evaluated::from_json(v)),

            Expression::Property(name) => {
                let key = to_string(&name.evaluate(ctx)?);
                Ok(ctx
                    .properties
                    .get(&key)
                    .map(Evaluated::from_json)
                    .unwrap_or(Evaluated::Undefined))
            }

            Expression::All(args) => {
                for arg in args {
                    if !is_truthy(&arg.evaluate(ctx)?) {
                        return Ok(Evaluated::Bool(false));
                    }
                }
                Ok(Evaluated::Bool(true))
            }

            Expression::Any(args) => {
                for arg in args {
                    if is_truthy(&arg.evaluate(ctx)?) {
                        return Ok(Evaluated::Bool(true));
                    }
                }
                Ok(Evaluated::Bool(false))
            }

            Expression::Boolean(arg) => Ok(Evaluated::Bool(is_truthy(&arg.evaluate(ctx)?))),
            Expression::Number(arg) => Ok(Evaluated::Number(to_number(&arg.evaluate(ctx)?))),
            Expression::String(arg) => Ok(Evaluated::String(to_string(&arg.evaluate(ctx)?))),

            Expression::Equal(left, right) => {
                let (l, r) = (left.evaluate(ctx)?, right.evaluate(ctx)?);
                Ok(Evaluated::Bool(strict_equal(&l, &r)))
            }
            Expression::NotEqual(left, right) => {
                let (l, r) = (left.evaluate(ctx)?, right.evaluate(ctx)?);
                if l.is_nullish() || r.is_nullish() {
                    return Ok(Evaluated::Bool(false));
                }
                Ok(Evaluated::Bool(l != r))
            }
            Expression::GreaterThan(left, right) => compare(left, right, ctx, |a, b| a > b),
            Expression::GreaterThanOrEqualTo(left, right) => {
                compare(left, right, ctx, |a, b| a >= b)
            }
            Expression::LessThan(left, right) => compare(left, right, ctx, |a, b| a < b),
            Expression::LessThanOrEqualTo(left, right) => compare(left, right, ctx, |a, b| a <= b),

            Expression::Duration(scalar, unit) => {
                let scalar = scalar.evaluate(ctx)?;
                let n = match scalar.as_number() {
                    Some(n) if !n.is_nan() => n,
                    _ => return Err(ExpressionError::NonNumericDuration(to_string(&scalar))),
                };
                let unit = to_string(&unit.evaluate(ctx)?);
                let factor = duration_factor(&unit)?;
                Ok(Evaluated::Number(n * factor))
            }

            Expression::Time(arg) => Ok(Evaluated::Number(parse_time(&arg.evaluate(ctx)?))),

            Expression::Now => Ok(Evaluated::Number(Utc::now().timestamp() as f64)),

            Expression::Random(max) => {
                let max = to_number(&max.evaluate(ctx)?);
                if max <= 1.0 {
                    return Ok(Evaluated::Number(0.0));
                }
                let drawn = rand::rng().random_range(0..max as i64);
                Ok(Evaluated::Number(drawn as f64))
            }

            Expression::Percentage(value, percent) => {
                let value = to_number(&value.evaluate(ctx)?);
                let percent = to_number(&percent.evaluate(ctx)?);
                Ok(Evaluated::Bool(value < percent))
            }

            Expression::PercentageOfActors(id, percent) => {
                let id = id.evaluate(ctx)?;
                if id.is_nullish() {
                    return Ok(Evaluated::Bool(false));
                }
                let id = to_string(&id);
                let percent = to_number(&percent.evaluate(ctx)?);
                Ok(Evaluated::Bool(rollout::included(
                    &ctx.feature_name,
                    &id,
                    percent,
                )))
            }
        }
    }

    /// Object-notation literal that rebuilds an equal tree.
    /// `Constant` is the bare literal; every other node wraps its
    /// children's values in an array under its name.
    pub fn value(&self) -> Value {
        match self {
            Expression::Constant(v) => v.clone(),
            Expression::All(args) | Expression::Any(args) => node(self.name(), values(args)),
            Expression::Now => node("Now", Vec::new()),
            Expression::Boolean(a)
            | Expression::Number(a)
            | Expression::Property(a)
            | Expression::Random(a)
            | Expression::String(a)
            | Expression::Time(a) => node(self.name(), vec![a.value()]),
            Expression::Duration(a, b)
            | Expression::Equal(a, b)
            | Expression::GreaterThan(a, b)
            | Expression::GreaterThanOrEqualTo(a, b)
            | Expression::LessThan(a, b)
            | Expression::LessThanOrEqualTo(a, b)
            | Expression::NotEqual(a, b)
            | Expression::Percentage(a, b)
            | Expression::PercentageOfActors(a, b) => {
                node(self.name(), vec![a.value(), b.value()])
            }
        }
    }
}

/// Strict type-and-value equality after the null short-circuit: a
/// nullish operand on either side makes the comparison false, so two
/// nulls do not compare equal. Kept bug-for-bug compatible with
/// sibling SDKs (see the null-equality tests).
fn strict_equal(l: &Evaluated, r: &Evaluated) -> bool {
    if l.is_nullish() || r.is_nullish() {
        return false;
    }
    l == r
}

fn compare(
    left: &Expression,
    right: &Expression,
    ctx: &ExpressionContext,
    op: fn(f64, f64) -> bool,
) -> Result<Evaluated, ExpressionError> {
    let (l, r) = (left.evaluate(ctx)?, right.evaluate(ctx)?);
    let result = match (l.as_number(), r.as_number()) {
        (Some(a), Some(b)) => op(a, b),
        _ => false,
    };
    Ok(Evaluated::Bool(result))
}

/// Case-insensitive unit lookup with a trailing `s` stripped, so
/// `"Minutes"` and `"minute"` both resolve.
fn duration_factor(unit: &str) -> Result<f64, ExpressionError> {
    let lowered = unit.to_lowercase();
    let singular = lowered.strip_suffix('s').unwrap_or(&lowered);
    DURATION_UNITS
        .iter()
        .find(|(name, _)| *name == singular)
        .map(|(_, factor)| *factor)
        .ok_or_else(|| ExpressionError::UnknownDurationUnit(unit.to_string()))
}

/// Unix seconds (floor) from a date string or numeric milliseconds;
/// anything unparseable is NaN.
fn parse_time(value: &Evaluated) -> f64 {
    match value {
        Evaluated::Number(ms) => (ms / 1000.0).floor(),
        Evaluated::String(s) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<f64>() {
                return (ms / 1000.0).floor();
            }
            if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
                return dt.timestamp() as f64;
            }
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return dt.and_utc().timestamp() as f64;
            }
            if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return d.and_time(chrono::NaiveTime::MIN).and_utc().timestamp() as f64;
            }
            f64::NAN
        }
        _ => f64::NAN,
    }
}

fn node(name: &str, args: Vec<Value>) -> Value {
    let mut map = serde_json::Map::with_capacity(1);
    map.insert(name.to_string(), Value::Array(args));
    Value::Object(map)
}

fn values(args: &[Expression]) -> Vec<Value> {
    args.iter().map(Expression::value).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> ExpressionContext {
        ExpressionContext {
            feature_name: "search".to_string(),
            properties: HashMap::from([
                ("plan".to_string(), json!("gold")),
                ("age".to_string(), json!(30)),
                ("admin".to_string(), json!(true)),
                ("score".to_string(), json!(null)),
            ]),
        }
    }

    fn constant(v: Value) -> Expression {
        Expression::Constant(v)
    }

    fn eval(expr: &Expression) -> Evaluated {
        expr.evaluate(&ctx()).unwrap()
    }

    #[test]
    fn constants_evaluate_to_themselves() {
        assert_eq!(eval(&constant(json!(22))), Evaluated::Number(22.0));
        assert_eq!(
            eval(&constant(json!("basic"))),
            Evaluated::String("basic".to_string())
        );
        assert_eq!(eval(&constant(json!(null))), Evaluated::Null);
        assert_eq!(eval(&constant(json!([1, 2]))), Evaluated::Json(json!([1, 2])));
    }

    #[test]
    fn property_reads_the_bag() {
        let expr = Expression::Property(Box::new(constant(json!("plan"))));
        assert_eq!(eval(&expr), Evaluated::String("gold".to_string()));
    }

    #[test]
    fn missing_property_is_undefined_not_an_error() {
        let expr = Expression::Property(Box::new(constant(json!("missing"))));
        assert_eq!(eval(&expr), Evaluated::Undefined);
    }

    #[test]
    fn all_requires_every_argument() {
        let t = constant(json!(true));
        let f = constant(json!(false));
        assert_eq!(
            eval(&Expression::All(vec![t.clone(), t.clone()])),
            Evaluated::Bool(true)
        );
        assert_eq!(
            eval(&Expression::All(vec![t.clone(), f.clone()])),
            Evaluated::Bool(false)
        );
        assert_eq!(eval(&Expression::All(vec![])), Evaluated::Bool(true));
        assert_eq!(eval(&Expression::Any(vec![])), Evaluated::Bool(false));
        assert_eq!(
            eval(&Expression::Any(vec![f, t])),
            Evaluated::Bool(true)
        );
    }

    // A Duration with a bad unit errors when evaluated, so reaching a
    // true result proves the later argument was never visited.
    #[test]
    fn all_and_any_short_circuit() {
        let bomb = Expression::Duration(
            Box::new(constant(json!(5))),
            Box::new(constant(json!("fortnights"))),
        );
        let all = Expression::All(vec![constant(json!(false)), bomb.clone()]);
        assert_eq!(all.evaluate(&ctx()).unwrap(), Evaluated::Bool(false));

        let any = Expression::Any(vec![constant(json!(true)), bomb.clone()]);
        assert_eq!(any.evaluate(&ctx()).unwrap(), Evaluated::Bool(true));

        let tripped = Expression::All(vec![constant(json!(true)), bomb]);
        assert!(tripped.evaluate(&ctx()).is_err());
    }

    #[test]
    fn coercion_nodes() {
        assert_eq!(
            eval(&Expression::Boolean(Box::new(constant(json!("yes"))))),
            Evaluated::Bool(true)
        );
        assert_eq!(
            eval(&Expression::Number(Box::new(constant(json!("25"))))),
            Evaluated::Number(25.0)
        );
        // Non-numeric input lands on 0, never NaN.
        assert_eq!(
            eval(&Expression::Number(Box::new(constant(json!("basic"))))),
            Evaluated::Number(0.0)
        );
        assert_eq!(
            eval(&Expression::String(Box::new(constant(json!(20))))),
            Evaluated::String("20".to_string())
        );
    }

    #[test]
    fn equal_is_strict() {
        let eq = |a: Value, b: Value| {
            eval(&Expression::Equal(
                Box::new(constant(a)),
                Box::new(constant(b)),
            ))
        };
        assert_eq!(eq(json!(20), json!(20)), Evaluated::Bool(true));
        assert_eq!(eq(json!(20), json!("20")), Evaluated::Bool(false));
        assert_eq!(eq(json!("basic"), json!("basic")), Evaluated::Bool(true));
        assert_eq!(eq(json!(true), json!(1)), Evaluated::Bool(false));
    }

    #[test]
    fn nullish_operands_never_compare() {
        let null = constant(json!(null));
        let missing = Expression::Property(Box::new(constant(json!("missing"))));
        let twenty = constant(json!(20));

        let cases: Vec<Expression> = vec![
            Expression::Equal(Box::new(null.clone()), Box::new(null.clone())),
            Expression::NotEqual(Box::new(null.clone()), Box::new(null.clone())),
            Expression::Equal(Box::new(missing.clone()), Box::new(twenty.clone())),
            Expression::NotEqual(Box::new(missing.clone()), Box::new(twenty.clone())),
            Expression::GreaterThan(Box::new(null), Box::new(twenty.clone())),
            Expression::LessThan(Box::new(missing), Box::new(twenty)),
        ];
        for case in cases {
            assert_eq!(eval(&case), Evaluated::Bool(false), "{case:?}");
        }
    }

    #[test]
    fn ordering_requires_numbers() {
        let gt = |a: Value, b: Value| {
            eval(&Expression::GreaterThan(
                Box::new(constant(a)),
                Box::new(constant(b)),
            ))
        };
        assert_eq!(gt(json!(21), json!(18)), Evaluated::Bool(true));
        assert_eq!(gt(json!(18), json!(21)), Evaluated::Bool(false));
        assert_eq!(gt(json!("21"), json!(18)), Evaluated::Bool(false));
        assert_eq!(
            eval(&Expression::GreaterThanOrEqualTo(
                Box::new(constant(json!(18))),
                Box::new(constant(json!(18)))
            )),
            Evaluated::Bool(true)
        );
        assert_eq!(
            eval(&Expression::LessThanOrEqualTo(
                Box::new(constant(json!(17))),
                Box::new(constant(json!(18)))
            )),
            Evaluated::Bool(true)
        );
    }

    #[test]
    fn duration_converts_to_seconds() {
        let dur = |scalar: Value, unit: &str| {
            Expression::Duration(Box::new(constant(scalar)), Box::new(constant(json!(unit))))
                .evaluate(&ctx())
        };
        assert_eq!(dur(json!(90), "minutes").unwrap(), Evaluated::Number(5400.0));
        assert_eq!(dur(json!(2), "Hour").unwrap(), Evaluated::Number(7200.0));
        assert_eq!(dur(json!(1), "year").unwrap(), Evaluated::Number(31_556_952.0));

        let err = dur(json!(5), "fortnights").unwrap_err();
        assert_eq!(
            err.to_string(),
            "'fortnights' is not a valid duration unit, valid units are: \
             second, minute, hour, day, week, month, year"
        );
        assert!(matches!(
            dur(json!("soon"), "minutes").unwrap_err(),
            ExpressionError::NonNumericDuration(_)
        ));
    }

    #[test]
    fn time_parses_dates_and_milliseconds() {
        let time = |v: Value| {
            match eval(&Expression::Time(Box::new(constant(v)))) {
                Evaluated::Number(n) => n,
                other => panic!("expected number, got {other:?}"),
            }
        };
        assert_eq!(time(json!("2021-01-01T00:00:00Z")), 1_609_459_200.0);
        assert_eq!(time(json!("2021-01-01")), 1_609_459_200.0);
        assert_eq!(time(json!("2021-01-01 06:30:00")), 1_609_482_600.0);
        assert_eq!(time(json!(1_609_459_200_500i64)), 1_609_459_200.0);
        assert_eq!(time(json!("1609459200500")), 1_609_459_200.0);
        assert!(time(json!("not a date")).is_nan());
        assert!(time(json!(true)).is_nan());
    }

    #[test]
    fn now_tracks_the_clock() {
        let before = Utc::now().timestamp() as f64;
        let now = match eval(&Expression::Now) {
            Evaluated::Number(n) => n,
            other => panic!("expected number, got {other:?}"),
        };
        let after = Utc::now().timestamp() as f64;
        assert!(now >= before && now <= after);
    }

    #[test]
    fn random_stays_in_range() {
        let expr = Expression::Random(Box::new(constant(json!(10))));
        for _ in 0..50 {
            match eval(&expr) {
                Evaluated::Number(n) => {
                    assert!((0.0..10.0).contains(&n));
                    assert_eq!(n.fract(), 0.0);
                }
                other => panic!("expected number, got {other:?}"),
            }
        }
        assert_eq!(
            eval(&Expression::Random(Box::new(constant(json!(1))))),
            Evaluated::Number(0.0)
        );
        assert_eq!(
            eval(&Expression::Random(Box::new(constant(json!(0))))),
            Evaluated::Number(0.0)
        );
    }

    #[test]
    fn percentage_is_strict_less_than() {
        let pct = |value: Value, percent: Value| {
            eval(&Expression::Percentage(
                Box::new(constant(value)),
                Box::new(constant(percent)),
            ))
        };
        assert_eq!(pct(json!(25), json!(50)), Evaluated::Bool(true));
        assert_eq!(pct(json!(50), json!(50)), Evaluated::Bool(false));
        assert_eq!(pct(json!("25"), json!(50)), Evaluated::Bool(true));
    }

    #[test]
    fn percentage_of_actors_matches_rollout_buckets() {
        // "search" + "User;6" buckets at 8_323; see rollout tests.
        let expr = Expression::PercentageOfActors(
            Box::new(Expression::Property(Box::new(constant(json!("id"))))),
            Box::new(constant(json!(25))),
        );
        let mut context = ctx();
        context
            .properties
            .insert("id".to_string(), json!("User;6"));
        assert_eq!(expr.evaluate(&context).unwrap(), Evaluated::Bool(true));
        // Deterministic across repeated evaluation.
        assert_eq!(expr.evaluate(&context).unwrap(), Evaluated::Bool(true));

        context.properties.insert("id".to_string(), json!("User;1"));
        assert_eq!(expr.evaluate(&context).unwrap(), Evaluated::Bool(false));
    }

    #[test]
    fn percentage_of_actors_without_id_is_false() {
        let expr = Expression::PercentageOfActors(
            Box::new(Expression::Property(Box::new(constant(json!("missing"))))),
            Box::new(constant(json!(100))),
        );
        assert_eq!(eval(&expr), Evaluated::Bool(false));

        let empty = Expression::PercentageOfActors(
            Box::new(constant(json!(""))),
            Box::new(constant(json!(100))),
        );
        assert_eq!(eval(&empty), Evaluated::Bool(false));
    }

    #[test]
    fn value_reconstructs_object_notation() {
        let expr = Expression::Any(vec![
            Expression::Property(Box::new(constant(json!("admin")))),
            Expression::Equal(
                Box::new(Expression::Property(Box::new(constant(json!("plan"))))),
                Box::new(constant(json!("gold"))),
            ),
        ]);
        assert_eq!(
            expr.value(),
            json!({"Any": [
                {"Property": ["admin"]},
                {"Equal": [{"Property": ["plan"]}, "gold"]},
            ]})
        );
        assert_eq!(constant(json!(22)).value(), json!(22));
        assert_eq!(Expression::Now.value(), json!({"Now": []}));
    }
}
