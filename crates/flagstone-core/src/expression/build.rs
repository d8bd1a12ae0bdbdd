//! Building expression trees from object notation.
//!
//! The factory table is explicit and immutable: constructed once via
//! [`ExpressionRegistry::standard`] (or the process-wide
//! [`ExpressionRegistry::shared`]) and passed by reference into
//! `build`. Arity and shape are validated before any node is
//! constructed.

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value;

use crate::errors::ExpressionError;

use super::Expression;

/// Constructs one node kind from its already-built children.
pub type NodeBuilder = fn(Vec<Expression>) -> Result<Expression, ExpressionError>;

/// Name-keyed factory table for expression nodes.
pub struct ExpressionRegistry {
    builders: HashMap<&'static str, NodeBuilder>,
}

impl ExpressionRegistry {
    /// The standard node set. Wire-format evolution is additive only:
    /// names are never renamed or removed once persisted expressions
    /// exist.
    pub fn standard() -> Self {
        let table: [(&'static str, NodeBuilder); 19] = [
            ("All", build_all),
            ("Any", build_any),
            ("Boolean", build_boolean),
            ("Constant", build_constant),
            ("Duration", build_duration),
            ("Equal", build_equal),
            ("GreaterThan", build_greater_than),
            ("GreaterThanOrEqualTo", build_greater_than_or_equal_to),
            ("LessThan", build_less_than),
            ("LessThanOrEqualTo", build_less_than_or_equal_to),
            ("NotEqual", build_not_equal),
            ("Now", build_now),
            ("Number", build_number),
            ("Percentage", build_percentage),
            ("PercentageOfActors", build_percentage_of_actors),
            ("Property", build_property),
            ("Random", build_random),
            ("String", build_string),
            ("Time", build_time),
        ];
        Self {
            builders: table.into_iter().collect(),
        }
    }

    /// Process-wide standard registry, built on first use.
    pub fn shared() -> &'static ExpressionRegistry {
        static SHARED: OnceLock<ExpressionRegistry> = OnceLock::new();
        SHARED.get_or_init(ExpressionRegistry::standard)
    }

    /// Extends the table with an additional name. New names must map
    /// onto existing node kinds; a genuinely new kind is a new
    /// `Expression` variant plus an entry here.
    pub fn with(mut self, name: &'static str, builder: NodeBuilder) -> Self {
        self.builders.insert(name, builder);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builders.contains_key(name)
    }

    /// Build a tree from object notation.
    ///
    /// Accepts a single-key object `{Name: arg | [args]}` whose
    /// arguments build recursively, or a bare primitive which promotes
    /// to `Constant`. Anything else is a build error.
    pub fn build(&self, literal: &Value) -> Result<Expression, ExpressionError> {
        match literal {
            Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_) => {
                Ok(Expression::Constant(literal.clone()))
            }
            Value::Object(map) if map.len() == 1 => {
                let (name, raw_args) = map.iter().next().ok_or_else(|| {
                    ExpressionError::InvalidLiteral(literal.to_string())
                })?;
                let builder = self
                    .builders
                    .get(name.as_str())
                    .ok_or_else(|| ExpressionError::UnknownNode(name.clone()))?;
                let raw_args: Vec<&Value> = match raw_args {
                    Value::Array(items) => items.iter().collect(),
                    single => vec![single],
                };
                let children = raw_args
                    .into_iter()
                    .map(|arg| self.build(arg))
                    .collect::<Result<Vec<_>, _>>()?;
                builder(children)
            }
            other => Err(ExpressionError::InvalidLiteral(other.to_string())),
        }
    }
}

fn one(
    name: &'static str,
    args: Vec<Expression>,
) -> Result<Box<Expression>, ExpressionError> {
    let got = args.len();
    let [arg]: [Expression; 1] = args.try_into().map_err(|_| ExpressionError::Arity {
        name,
        expected: "1",
        got,
    })?;
    Ok(Box::new(arg))
}

fn two(
    name: &'static str,
    args: Vec<Expression>,
) -> Result<(Box<Expression>, Box<Expression>), ExpressionError> {
    let got = args.len();
    let [a, b]: [Expression; 2] = args.try_into().map_err(|_| ExpressionError::Arity {
        name,
        expected: "2",
        got,
    })?;
    Ok((Box::new(a), Box::new(b)))
}

fn build_all(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::All(args))
}

fn build_any(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::Any(args))
}

fn build_boolean(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::Boolean(one("Boolean", args)?))
}

// A written-out `{"Constant": x}` carries its payload as the one child
// the recursive build already promoted; anything that built into a
// non-leaf node is not a constant payload.
fn build_constant(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let arg = one("Constant", args)?;
    match *arg {
        leaf @ Expression::Constant(_) => Ok(leaf),
        other => Err(ExpressionError::InvalidLiteral(other.value().to_string())),
    }
}

fn build_duration(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (scalar, unit) = two("Duration", args)?;
    Ok(Expression::Duration(scalar, unit))
}

fn build_equal(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (l, r) = two("Equal", args)?;
    Ok(Expression::Equal(l, r))
}

fn build_greater_than(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (l, r) = two("GreaterThan", args)?;
    Ok(Expression::GreaterThan(l, r))
}

fn build_greater_than_or_equal_to(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (l, r) = two("GreaterThanOrEqualTo", args)?;
    Ok(Expression::GreaterThanOrEqualTo(l, r))
}

fn build_less_than(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (l, r) = two("LessThan", args)?;
    Ok(Expression::LessThan(l, r))
}

fn build_less_than_or_equal_to(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (l, r) = two("LessThanOrEqualTo", args)?;
    Ok(Expression::LessThanOrEqualTo(l, r))
}

fn build_not_equal(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (l, r) = two("NotEqual", args)?;
    Ok(Expression::NotEqual(l, r))
}

fn build_now(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    if !args.is_empty() {
        return Err(ExpressionError::Arity {
            name: "Now",
            expected: "0",
            got: args.len(),
        });
    }
    Ok(Expression::Now)
}

fn build_number(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::Number(one("Number", args)?))
}

fn build_percentage(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (value, percent) = two("Percentage", args)?;
    Ok(Expression::Percentage(value, percent))
}

fn build_percentage_of_actors(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    let (id, percent) = two("PercentageOfActors", args)?;
    Ok(Expression::PercentageOfActors(id, percent))
}

fn build_property(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::Property(one("Property", args)?))
}

fn build_random(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::Random(one("Random", args)?))
}

fn build_string(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::String(one("String", args)?))
}

fn build_time(args: Vec<Expression>) -> Result<Expression, ExpressionError> {
    Ok(Expression::Time(one("Time", args)?))
}
