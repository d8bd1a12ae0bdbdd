#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("value must be a positive number less than or equal to 100, but was {0}")]
    PercentageOutOfRange(f64),
    #[error("actor id must be a non-empty string")]
    EmptyActorId,
    #[error("group name must be a non-empty string")]
    EmptyGroupName,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExpressionError {
    #[error("unknown expression node: {0}")]
    UnknownNode(String),
    #[error("cannot build an expression from: {0}")]
    InvalidLiteral(String),
    #[error("{name} expects {expected} argument(s), got {got}")]
    Arity {
        name: &'static str,
        expected: &'static str,
        got: usize,
    },
    #[error("Duration scalar must be a number, but was {0}")]
    NonNumericDuration(String),
    #[error("'{0}' is not a valid duration unit, valid units are: second, minute, hour, day, week, month, year")]
    UnknownDurationUnit(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GateError {
    #[error("no gate handles value: {0}")]
    NoGateFor(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("storage backend failure: {0}")]
    Backend(String),
    #[error("storage backend unavailable")]
    Unavailable,
}
