// Copyright (c) 2024 Mike Tsao

use crate::{
    error::ConfigError,
    events::{Event, EventSchema},
    traits::KeyNames,
    variables::{Value, ValueKind, VarHandle, VariableStore},
};

/// What an expression is parsed against: the event whose fields it may name,
/// the declared variables, and the key name table.
#[derive(Clone, Copy)]
pub struct ParseContext<'a> {
    /// The event type whose fields are in scope, if any.
    pub schema: Option<&'a EventSchema>,
    #[allow(missing_docs)]
    pub vars: &'a VariableStore,
    #[allow(missing_docs)]
    pub keys: &'a dyn KeyNames,
}
impl core::fmt::Debug for ParseContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ParseContext")
            .field("schema", &self.schema.map(|s| s.event_type()))
            .field("vars", &self.vars.len())
            .finish()
    }
}

/// One operand of an expression.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Token {
    /// Nothing. Evaluates to [Value::Invalid].
    #[default]
    None,
    /// The current value of a declared variable.
    Variable(VarHandle),
    /// A field of the event being routed.
    Field {
        /// Position in the event's fields.
        index: usize,
        /// The field's declared kind.
        kind: ValueKind,
    },
    /// A constant.
    Static(Value),
}
impl Token {
    /// Whether the token's value is known without an event or variables.
    pub fn is_static(&self) -> bool {
        matches!(self, Token::Static(_))
    }

    /// The token's current value.
    pub fn evaluate(&self, event: &Event, vars: &VariableStore) -> Value {
        match self {
            Token::None => Value::Invalid,
            Token::Variable(handle) => vars.value(*handle),
            Token::Field { index, .. } => event.field(*index),
            Token::Static(value) => *value,
        }
    }
}

/// Resolves one identifier or literal. In priority order, the text is a key
/// name (only when `enable_key_names` is set), a field of the context's
/// event, a declared variable, or a literal.
pub fn parse_token(
    ctx: &ParseContext,
    text: &str,
    enable_key_names: bool,
) -> Result<Token, ConfigError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ConfigError::EmptyExpression);
    }
    if enable_key_names {
        if let Some(code) = ctx.keys.keycode(text) {
            return Ok(Token::Static(Value::Int(code)));
        }
    }
    if let Some(p) = ctx.schema.and_then(|s| s.param(text)) {
        return Ok(Token::Field {
            index: p.index,
            kind: p.kind,
        });
    }
    if let Some(handle) = ctx.vars.lookup(text) {
        return Ok(Token::Variable(handle));
    }
    Value::parse_literal(text).map(Token::Static)
}
