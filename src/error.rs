// Copyright (c) 2024 Mike Tsao

//! Typed errors for the two failure families: configuration-time problems,
//! which skip the offending declaration, and dispatch-time problems, which
//! drop the offending action.

use crate::events::EventType;
use thiserror::Error;

/// Something was wrong with a variable or binding declaration. The declaration
/// (or just the clause) is skipped and configuration continues.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("unknown event type '{0}'")]
    UnknownEvent(String),

    #[error("event '{event}' has no field named '{field}'")]
    UnknownField { event: &'static str, field: String },

    #[error("'{0}' is neither an event field nor a declared variable")]
    UnknownVariable(String),

    #[error("variable '{0}' was already declared")]
    DuplicateVariable(String),

    #[error("unsupported variable type '{0}'")]
    UnsupportedVariableType(String),

    #[error("clause '{0}' has no '='")]
    MissingEquals(String),

    #[error("expected ' and ' between clauses in '{0}'")]
    MissingSeparator(String),

    #[error("malformed token '{0}'")]
    MalformedToken(String),

    #[error("empty expression")]
    EmptyExpression,

    #[error("'{0}' must name a variable to pass by reference")]
    ReferenceNotVariable(String),

    #[error("binding has no '{0}' attribute")]
    MissingAttribute(&'static str),

    #[error("'{0}' is not a bindable input event")]
    NotBindable(&'static str),

    #[error("unrecognized binding attribute '{0}'")]
    UnknownAttribute(String),
}

/// Something went wrong while routing a live event. Only the affected action
/// is dropped.
#[allow(missing_docs)]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum DispatchError {
    #[error("event pool exhausted while synthesizing '{0}'")]
    PoolExhausted(EventType),

    #[error("indexed field of '{0}' does not hold a scalar value")]
    IndexNotScalar(EventType),

    #[error("variable '{0}' is a system variable and can't be written")]
    SystemVariable(String),

    #[error("'{event}' field '{field}' does not reference a variable")]
    MissingReference {
        event: EventType,
        field: &'static str,
    },

    #[error("assignment to '{0}' evaluated to an invalid value")]
    InvalidValue(&'static str),

    #[error("dispatch depth limit {0} reached; dropping '{1}'")]
    RecursionLimit(usize, EventType),
}
