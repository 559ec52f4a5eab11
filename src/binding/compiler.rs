// Copyright (c) 2024 Mike Tsao

use super::{split_clause, split_clauses, Binding, BindingTable, BucketSlot, CompiledClause};
use crate::{
    diagnostics::{Diagnostic, DiagnosticSink},
    error::ConfigError,
    events::{EventRegistry, EventSchema, INTERFACE_FIELD},
    expression::{parse_expression, Expression, ParseContext, Token},
    traits::KeyNames,
    variables::{Value, ValueKind, VariableStore},
};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One binding as it appears in configuration: attribute names mapped to
/// text. The attributes are `input`, `conditions`, `echo`, and numbered pairs
/// `output`/`parameters`, `output1`/`parameters1`, `output2`/`parameters2`,
/// and so on.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BindingDeclaration {
    attributes: FxHashMap<String, String>,
}
impl BindingDeclaration {
    /// Starts a declaration on the named input event.
    pub fn new(input: &str) -> Self {
        Self::default().with("input", input)
    }

    /// Sets any attribute.
    pub fn with(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    #[allow(missing_docs)]
    pub fn conditions(self, conditions: &str) -> Self {
        self.with("conditions", conditions)
    }

    #[allow(missing_docs)]
    pub fn echo(self, echo: bool) -> Self {
        self.with("echo", if echo { "yes" } else { "no" })
    }

    /// Adds the next numbered output with its parameters.
    pub fn output(self, event: &str, parameters: &str) -> Self {
        let suffix = match self.outputs().len() {
            0 => String::default(),
            n => n.to_string(),
        };
        self.with(&format!("output{suffix}"), event)
            .with(&format!("parameters{suffix}"), parameters)
    }

    /// Looks up an attribute.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// The `(output, parameters)` pairs in number order.
    pub fn outputs(&self) -> Vec<(&str, &str)> {
        let mut numbered: Vec<(u32, &str, &str)> = self
            .attributes
            .iter()
            .filter_map(|(name, event)| {
                let suffix = name.strip_prefix("output")?;
                let n = if suffix.is_empty() {
                    0
                } else {
                    suffix.parse().ok()?
                };
                let parameters = self
                    .get(&format!("parameters{suffix}"))
                    .unwrap_or_default();
                Some((n, event.as_str(), parameters))
            })
            .collect();
        numbered.sort_by_key(|(n, _, _)| *n);
        numbered.into_iter().map(|(_, e, p)| (e, p)).collect()
    }

    /// Attributes that nothing reads: misspelled names, an `output` suffix
    /// that isn't a number, or `parameters` without a matching `output`.
    pub fn stray_attributes(&self) -> Vec<&str> {
        let mut stray: Vec<&str> = self
            .attributes
            .keys()
            .map(String::as_str)
            .filter(|name| {
                if matches!(*name, "input" | "conditions" | "echo") {
                    false
                } else if let Some(suffix) = name.strip_prefix("output") {
                    !Self::is_output_suffix(suffix)
                } else if let Some(suffix) = name.strip_prefix("parameters") {
                    !Self::is_output_suffix(suffix)
                        || !self.attributes.contains_key(&format!("output{suffix}"))
                } else {
                    true
                }
            })
            .collect();
        stray.sort_unstable();
        stray
    }

    fn is_output_suffix(suffix: &str) -> bool {
        suffix.is_empty() || suffix.parse::<u32>().is_ok()
    }

    fn wants_echo(&self) -> bool {
        self.get("echo").is_some_and(|e| {
            matches!(
                e.trim().to_ascii_lowercase().as_str(),
                "yes" | "true" | "on" | "1"
            )
        })
    }
}

/// Turns [BindingDeclaration]s into [Binding]s in a [BindingTable].
///
/// A problem with the declaration as a whole (unknown input, no output) fails
/// the call. A problem with one clause or one output is reported to the sink
/// and only that piece is skipped.
pub struct BindingCompiler<'a> {
    registry: &'a EventRegistry,
    vars: &'a VariableStore,
    keys: &'a dyn KeyNames,
    sink: &'a dyn DiagnosticSink,
}
impl<'a> BindingCompiler<'a> {
    #[allow(missing_docs)]
    pub fn new(
        registry: &'a EventRegistry,
        vars: &'a VariableStore,
        keys: &'a dyn KeyNames,
        sink: &'a dyn DiagnosticSink,
    ) -> Self {
        Self {
            registry,
            vars,
            keys,
            sink,
        }
    }

    /// Compiles one declaration made under the given interface and appends
    /// it to the table. Returns how many bindings were added.
    pub fn compile(
        &self,
        table: &mut BindingTable,
        decl: &BindingDeclaration,
        interface_id: i32,
    ) -> Result<usize, ConfigError> {
        let input = decl
            .get("input")
            .ok_or(ConfigError::MissingAttribute("input"))?;
        let schema = self.registry.lookup(input)?;
        if !schema.event_type().is_bindable() {
            return Err(ConfigError::NotBindable(schema.event_type().into()));
        }
        let outputs = decl.outputs();
        if outputs.is_empty() {
            return Err(ConfigError::MissingAttribute("output"));
        }
        for name in decl.stray_attributes() {
            self.sink.report(Diagnostic::config(
                ConfigError::UnknownAttribute(name.to_string()),
                input,
            ));
        }
        let ctx = ParseContext {
            schema: Some(schema),
            vars: self.vars,
            keys: self.keys,
        };

        let (conditions, slot) =
            self.compile_conditions(&ctx, schema, decl.get("conditions").unwrap_or_default(), interface_id);

        let mut chain = Vec::default();
        for (output, parameters) in outputs {
            match self.compile_output(&ctx, output, parameters, interface_id) {
                Ok((prototype, assignments)) => {
                    let (echo, conditions) = if chain.is_empty() {
                        (decl.wants_echo(), conditions.clone())
                    } else {
                        (false, Vec::default())
                    };
                    chain.push(Binding::new(prototype, echo, conditions, assignments));
                }
                Err(e) => self.sink.report(Diagnostic::config(e, output)),
            }
        }
        let count = chain.len();
        if count > 0 {
            tracing::trace!("{input}: {count} binding(s) into {slot:?}");
            table.insert(schema, slot, chain);
        }
        Ok(count)
    }

    fn compile_conditions(
        &self,
        ctx: &ParseContext,
        schema: &EventSchema,
        text: &str,
        interface_id: i32,
    ) -> (Vec<CompiledClause>, BucketSlot) {
        let mut conditions = Vec::default();
        let mut slot = BucketSlot::Wildcard;
        let mut has_interface = false;
        for clause in split_clauses(text) {
            match self.compile_condition(ctx, schema, clause) {
                Ok((condition, bucket)) => {
                    if let Token::Field { index, .. } = condition.target() {
                        has_interface |= schema
                            .param(INTERFACE_FIELD)
                            .is_some_and(|p| p.index == *index);
                    }
                    if let (BucketSlot::Wildcard, Some(b)) = (slot, bucket) {
                        slot = BucketSlot::Indexed(b);
                    }
                    conditions.push(condition);
                }
                Err(e) => self.sink.report(Diagnostic::config(e, clause)),
            }
        }
        if !has_interface {
            if let Some(p) = schema.param(INTERFACE_FIELD) {
                conditions.push(CompiledClause::new(
                    Token::Field {
                        index: p.index,
                        kind: p.kind,
                    },
                    Expression::constant(Value::Int(interface_id)),
                ));
            }
        }
        (conditions, slot)
    }

    /// Compiles `name = expression`. When `name` is the indexed field and the
    /// expression is a constant scalar, also returns its bucket.
    fn compile_condition(
        &self,
        ctx: &ParseContext,
        schema: &EventSchema,
        clause: &str,
    ) -> Result<(CompiledClause, Option<usize>), ConfigError> {
        let (name, rhs) = split_clause(clause)?;
        if let Some(p) = schema.param(name) {
            let expression = parse_expression(ctx, rhs, p.key_names)?;
            let bucket = p.max_index.and_then(|max| {
                expression
                    .fold()
                    .filter(Value::is_scalar)
                    .and_then(|v| v.as_i64())
                    .map(|v| v.rem_euclid(max as i64) as usize)
            });
            let target = Token::Field {
                index: p.index,
                kind: p.kind,
            };
            return Ok((CompiledClause::new(target, expression), bucket));
        }
        let handle = self
            .vars
            .lookup(name)
            .ok_or_else(|| ConfigError::UnknownVariable(name.to_string()))?;
        let expression = parse_expression(ctx, rhs, false)?;
        Ok((CompiledClause::new(Token::Variable(handle), expression), None))
    }

    /// Builds the output prototype, folding every static assignment into it,
    /// and returns the assignments left for dispatch time.
    fn compile_output(
        &self,
        ctx: &ParseContext,
        output: &str,
        parameters: &str,
        interface_id: i32,
    ) -> Result<(crate::events::Event, Vec<CompiledClause>), ConfigError> {
        let schema = self.registry.lookup(output)?;
        let mut prototype = schema.prototype();
        if let Some(p) = schema.param(INTERFACE_FIELD) {
            prototype.set_field(p.index, Value::Int(interface_id));
        }
        let mut assignments = Vec::default();
        for clause in split_clauses(parameters) {
            let result = self.compile_assignment(ctx, schema, clause).map(|a| match a {
                Assignment::Static(index, value) => prototype.set_field(index, value),
                Assignment::Dynamic(clause) => assignments.push(clause),
            });
            if let Err(e) = result {
                self.sink.report(Diagnostic::config(e, clause));
            }
        }
        Ok((prototype, assignments))
    }

    fn compile_assignment(
        &self,
        ctx: &ParseContext,
        schema: &EventSchema,
        clause: &str,
    ) -> Result<Assignment, ConfigError> {
        let (name, rhs) = split_clause(clause)?;
        let p = schema.param(name).ok_or_else(|| ConfigError::UnknownField {
            event: schema.event_type().into(),
            field: name.to_string(),
        })?;
        let expression = parse_expression(ctx, rhs, false)?;
        if p.kind == ValueKind::VariableRef {
            return expression
                .as_variable()
                .map(|handle| Assignment::Static(p.index, Value::Ref(handle)))
                .ok_or_else(|| ConfigError::ReferenceNotVariable(rhs.to_string()));
        }
        Ok(match expression.fold() {
            Some(value) => Assignment::Static(p.index, value.coerce(p.kind)),
            None => Assignment::Dynamic(CompiledClause::new(
                Token::Field {
                    index: p.index,
                    kind: p.kind,
                },
                expression,
            )),
        })
    }
}

enum Assignment {
    Static(usize, Value),
    Dynamic(CompiledClause),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diagnostics::CollectingSink,
        events::EventType,
        keys::StandardKeys,
    };

    struct Fixture {
        registry: EventRegistry,
        vars: VariableStore,
        sink: CollectingSink,
        table: BindingTable,
    }
    impl Fixture {
        fn new() -> Self {
            let mut vars = VariableStore::default();
            vars.declare("VOL", "float", Some("0.5")).unwrap();
            vars.declare("SLOT", "int", Some("3")).unwrap();
            Self {
                registry: EventRegistry::default(),
                vars,
                sink: CollectingSink::default(),
                table: BindingTable::default(),
            }
        }

        fn compile(&mut self, decl: &BindingDeclaration) -> Result<usize, ConfigError> {
            let compiler =
                BindingCompiler::new(&self.registry, &self.vars, StandardKeys::global(), &self.sink);
            compiler.compile(&mut self.table, decl, 0)
        }
    }

    #[test]
    fn numbered_outputs_are_ordered() {
        let decl = BindingDeclaration::new("key")
            .output("trigger-loop", "index=1")
            .output("trigger-loop", "index=2")
            .with("output10", "set-master-volume")
            .output("trigger-loop", "index=3");
        let outputs = decl.outputs();
        assert_eq!(outputs.len(), 4);
        assert_eq!(outputs[0], ("trigger-loop", "index=1"));
        assert_eq!(outputs[1], ("trigger-loop", "index=2"));
        assert_eq!(outputs[3], ("set-master-volume", ""));
    }

    #[test]
    fn stray_attributes_are_reported() {
        let mut f = Fixture::new();
        let decl = BindingDeclaration::new("key")
            .output("trigger-loop", "index=1")
            .with("parameters4", "index=2")
            .with("outputx", "set-master-volume")
            .with("conditons", "down=1");
        assert_eq!(
            decl.stray_attributes(),
            vec!["conditons", "outputx", "parameters4"]
        );
        assert_eq!(f.compile(&decl), Ok(1));
        assert_eq!(
            f.sink.diagnostics(),
            vec![
                Diagnostic::config(ConfigError::UnknownAttribute("conditons".to_string()), "key"),
                Diagnostic::config(ConfigError::UnknownAttribute("outputx".to_string()), "key"),
                Diagnostic::config(
                    ConfigError::UnknownAttribute("parameters4".to_string()),
                    "key"
                ),
            ]
        );
        assert!(BindingDeclaration::new("key")
            .output("trigger-loop", "index=1")
            .output("trigger-loop", "index=2")
            .echo(true)
            .conditions("down=1")
            .stray_attributes()
            .is_empty());
    }

    #[test]
    fn static_key_condition_picks_a_bucket() {
        let mut f = Fixture::new();
        let decl = BindingDeclaration::new("key")
            .conditions("key=a and down=1")
            .output("set-master-volume", "amount = VOL+0.1");
        assert_eq!(f.compile(&decl), Ok(1));
        assert!(f.sink.is_empty(), "{:?}", f.sink.diagnostics());

        let bucket = f.table.bucket(EventType::Key, BucketSlot::Indexed(97));
        assert_eq!(bucket.len(), 1);
        let b = &bucket[0];
        // key, down, and the implicit interfaceid.
        assert_eq!(b.conditions().len(), 3);
        assert_eq!(b.assignments().len(), 1);
        assert!(!b.echo());
    }

    #[test]
    fn dynamic_or_range_index_goes_to_the_wildcard() {
        let mut f = Fixture::new();
        f.compile(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=SLOT")
                .output("trigger-loop", "index=1"),
        )
        .unwrap();
        f.compile(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=0>10")
                .output("trigger-loop", "index=2"),
        )
        .unwrap();
        f.compile(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=130")
                .output("trigger-loop", "index=3"),
        )
        .unwrap();
        assert_eq!(
            f.table
                .bucket(EventType::MidiController, BucketSlot::Wildcard)
                .len(),
            2
        );
        assert_eq!(
            f.table
                .bucket(EventType::MidiController, BucketSlot::Indexed(2))
                .len(),
            1
        );
    }

    #[test]
    fn static_parameters_are_folded_into_the_prototype() {
        let mut f = Fixture::new();
        f.compile(
            &BindingDeclaration::new("midi-key")
                .output("trigger-loop", "index = 2*5 and vol = vel/127.0 and engage=1"),
        )
        .unwrap();
        let b = &f.table.bucket(EventType::MidiKey, BucketSlot::Wildcard)[0];
        let proto = b.prototype();
        assert_eq!(f.registry.get(proto, "index"), Some(Value::Int(10)));
        assert_eq!(f.registry.get(proto, "engage"), Some(Value::Int(1)));
        assert_eq!(b.assignments().len(), 1);
    }

    #[test]
    fn references_must_name_a_variable() {
        let mut f = Fixture::new();
        f.compile(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=1")
                .output("set-variable", "var=VOL and value=val/127.0"),
        )
        .unwrap();
        let b = &f.table.bucket(EventType::MidiController, BucketSlot::Indexed(1))[0];
        let handle = f.vars.lookup("VOL").unwrap();
        assert_eq!(f.registry.get(b.prototype(), "var"), Some(Value::Ref(handle)));
        assert!(f.sink.is_empty());

        f.compile(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=2")
                .output("set-variable", "var=VOL+1 and value=1"),
        )
        .unwrap();
        assert_eq!(
            f.sink.diagnostics(),
            vec![Diagnostic::config(
                ConfigError::ReferenceNotVariable("VOL+1".to_string()),
                "var=VOL+1"
            )]
        );
    }

    #[test]
    fn bad_clauses_are_skipped_and_reported() {
        let mut f = Fixture::new();
        let decl = BindingDeclaration::new("midi-controller")
            .conditions("ctrl=7 and bogus=1 and val 3")
            .output("trigger-loop", "index=1 and nope=2");
        assert_eq!(f.compile(&decl), Ok(1));
        assert_eq!(f.sink.len(), 3);
        let b = &f.table.bucket(EventType::MidiController, BucketSlot::Indexed(7))[0];
        assert_eq!(b.conditions().len(), 2);
    }

    #[test]
    fn declaration_level_failures() {
        let mut f = Fixture::new();
        assert_eq!(
            f.compile(&BindingDeclaration::new("nonsense").output("trigger-loop", "")),
            Err(ConfigError::UnknownEvent("nonsense".to_string()))
        );
        assert_eq!(
            f.compile(&BindingDeclaration::new("set-variable").output("trigger-loop", "")),
            Err(ConfigError::NotBindable("set-variable"))
        );
        assert_eq!(
            f.compile(&BindingDeclaration::new("key")),
            Err(ConfigError::MissingAttribute("output"))
        );
        assert_eq!(
            f.compile(&BindingDeclaration::default().output("trigger-loop", "")),
            Err(ConfigError::MissingAttribute("input"))
        );
        assert!(f.table.is_empty());
    }

    #[test]
    fn explicit_interface_condition_replaces_the_implicit_one() {
        let mut f = Fixture::new();
        f.compile(
            &BindingDeclaration::new("go-sub")
                .conditions("sub=1 and interfaceid=4")
                .output("go-sub", "sub=2"),
        )
        .unwrap();
        let b = &f.table.bucket(EventType::GoSub, BucketSlot::Indexed(1))[0];
        assert_eq!(b.conditions().len(), 2);
        // Outputs that carry an interface id are stamped with the declaring
        // interface.
        assert_eq!(f.registry.get(b.prototype(), "interfaceid"), Some(Value::Int(0)));
        assert_eq!(f.registry.get(b.prototype(), "sub"), Some(Value::Int(2)));
    }

    #[test]
    fn echo_attribute() {
        let yes = BindingDeclaration::new("key").with("echo", " Yes ");
        let no = BindingDeclaration::new("key").with("echo", "nah");
        assert!(yes.wants_echo());
        assert!(!no.wants_echo());
        assert!(BindingDeclaration::new("key").echo(true).wants_echo());
    }
}
