// Copyright (c) 2024 Mike Tsao

use super::{parse_token, ParseContext, Token};
use crate::{
    error::ConfigError,
    events::Event,
    variables::{Operator, Value, VarHandle, VariableStore},
};

/// A start token followed by `(operator, token)` pairs, applied strictly left
/// to right. `1+2*3` is 9.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Expression {
    start: Token,
    chain: Vec<(Operator, Token)>,
    is_static: bool,
}
impl Expression {
    /// An expression that always yields the given value.
    pub fn constant(value: Value) -> Self {
        Self {
            start: Token::Static(value),
            chain: Vec::default(),
            is_static: true,
        }
    }

    /// True when every token is a constant, so the expression never needs to
    /// be evaluated at dispatch time.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    #[allow(missing_docs)]
    pub fn start(&self) -> &Token {
        &self.start
    }

    /// If the whole expression is one variable name, that variable.
    pub fn as_variable(&self) -> Option<VarHandle> {
        match self.start {
            Token::Variable(handle) if self.chain.is_empty() => Some(handle),
            _ => None,
        }
    }

    /// Computes the value. The result has the kind of the start token.
    pub fn evaluate(&self, event: &Event, vars: &VariableStore) -> Value {
        self.chain
            .iter()
            .fold(self.start.evaluate(event, vars), |acc, (op, token)| {
                acc.apply(*op, token.evaluate(event, vars))
            })
    }

    /// The value of a static expression, computed without an event.
    pub fn fold(&self) -> Option<Value> {
        self.is_static
            .then(|| self.evaluate(&Event::default(), &VariableStore::default()))
    }
}

/// Parses `TOKEN (OP TOKEN)*`, where `OP` is one of `/ * + -`.
pub fn parse_expression(
    ctx: &ParseContext,
    text: &str,
    enable_key_names: bool,
) -> Result<Expression, ConfigError> {
    let mut pieces = Vec::default();
    let mut rest = text;
    let mut pending: Option<Operator> = None;
    loop {
        let split = rest
            .char_indices()
            .find_map(|(i, c)| Operator::from_char(c).map(|op| (i, op)));
        let (piece, next) = match split {
            Some((i, op)) => (&rest[..i], Some((op, &rest[i + 1..]))),
            None => (rest, None),
        };
        pieces.push((pending, parse_token(ctx, piece, enable_key_names)?));
        match next {
            Some((op, remainder)) => {
                pending = Some(op);
                rest = remainder;
            }
            None => break,
        }
    }

    let mut pieces = pieces.into_iter();
    let start = pieces
        .next()
        .map(|(_, token)| token)
        .ok_or(ConfigError::EmptyExpression)?;
    let chain: Vec<(Operator, Token)> = pieces
        .filter_map(|(op, token)| op.map(|op| (op, token)))
        .collect();
    let is_static = start.is_static() && chain.iter().all(|(_, t)| t.is_static());
    Ok(Expression {
        start,
        chain,
        is_static,
    })
}
