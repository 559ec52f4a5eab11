// Copyright (c) 2024 Mike Tsao

use crate::{
    error::ConfigError,
    events::Event,
    expression::{Expression, Token},
    variables::VariableStore,
};

/// The text that joins clauses in a `conditions` or `parameters` attribute.
pub const CLAUSE_SEPARATOR: &str = " and ";

/// A target token paired with an expression. As a condition it tests whether
/// the target's value matches the expression; as an assignment it writes the
/// expression's value into an output field.
#[derive(Clone, Debug, PartialEq)]
pub struct CompiledClause {
    target: Token,
    expression: Expression,
}
impl CompiledClause {
    #[allow(missing_docs)]
    pub fn new(target: Token, expression: Expression) -> Self {
        Self { target, expression }
    }

    #[allow(missing_docs)]
    pub fn target(&self) -> &Token {
        &self.target
    }

    #[allow(missing_docs)]
    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    /// Evaluates the clause as a condition against a live event.
    pub fn matches(&self, event: &Event, vars: &VariableStore) -> bool {
        self.target
            .evaluate(event, vars)
            .matches(&self.expression.evaluate(event, vars))
    }

    /// Evaluates the clause as an assignment: the expression is computed
    /// against the input event, converted to the target field's kind, and
    /// written into the output event. A target that isn't a field is ignored.
    pub fn assign(&self, input: &Event, vars: &VariableStore, output: &mut Event) {
        if let Token::Field { index, kind } = self.target {
            output.set_field(index, self.expression.evaluate(input, vars).coerce(kind));
        }
    }
}

/// Splits an attribute into clauses. Blank clauses are dropped.
pub fn split_clauses(text: &str) -> impl Iterator<Item = &str> {
    text.split(CLAUSE_SEPARATOR)
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// Splits `name = expression` into its two halves.
pub fn split_clause(clause: &str) -> Result<(&str, &str), ConfigError> {
    let (name, rhs) = clause
        .split_once('=')
        .ok_or_else(|| ConfigError::MissingEquals(clause.to_string()))?;
    if rhs.contains('=') {
        return Err(ConfigError::MissingSeparator(clause.to_string()));
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(ConfigError::MalformedToken(clause.to_string()));
    }
    Ok((name, rhs.trim()))
}
