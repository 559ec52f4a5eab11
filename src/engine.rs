// Copyright (c) 2024 Mike Tsao

//! Assembles configuration into a running engine.

use crate::{
    binding::{BindingCompiler, BindingDeclaration, BindingTable},
    config::InterfaceConfig,
    diagnostics::{Diagnostic, DiagnosticSink, TracingSink},
    dispatch::{Dispatcher, TRANSPOSE_VARIABLE},
    events::{Event, EventBus, EventRegistry},
    keys::StandardKeys,
    settings::EngineSettings,
    traits::{EventListener, KeyNames, LinkedStorage},
    variables::{Value, ValueCell, VarHandle, VariableStore},
};
use std::sync::Arc;

/// Collects variables, bindings and listeners during the single-threaded
/// configuration pass, then freezes them into an [Engine].
///
/// Problems with individual declarations are reported to the diagnostic sink
/// and the declaration is skipped, so one typo doesn't take down a whole
/// setup.
pub struct EngineBuilder {
    settings: EngineSettings,
    registry: EventRegistry,
    vars: VariableStore,
    table: BindingTable,
    sink: Arc<dyn DiagnosticSink>,
    keys: Arc<dyn KeyNames>,
    transpose: Arc<ValueCell>,
    interfaces: Vec<i32>,
    listeners: Vec<Arc<dyn EventListener>>,
}
impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}
impl EngineBuilder {
    #[allow(missing_docs)]
    pub fn new(settings: EngineSettings) -> Self {
        let mut r = Self {
            registry: EventRegistry::standard(settings.key_index_size),
            settings,
            vars: VariableStore::default(),
            table: BindingTable::default(),
            sink: Arc::new(TracingSink),
            keys: Arc::new(StandardKeys::default()),
            transpose: Arc::new(ValueCell::new(Value::Int(0))),
            interfaces: Vec::default(),
            listeners: Vec::default(),
        };
        let transpose: Arc<dyn LinkedStorage> = r.transpose.clone();
        r.link_variable(TRANSPOSE_VARIABLE, transpose);
        r
    }

    /// Sends diagnostics somewhere other than `tracing`.
    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replaces the keyboard name table.
    pub fn with_keys(mut self, keys: Arc<dyn KeyNames>) -> Self {
        self.keys = keys;
        self
    }

    /// Declares a variable. Returns None (and reports why) if the declaration
    /// is rejected.
    pub fn declare_variable(
        &mut self,
        name: &str,
        type_name: &str,
        initializer: Option<&str>,
    ) -> Option<VarHandle> {
        self.vars
            .declare(name, type_name, initializer)
            .map_err(|e| self.sink.report(Diagnostic::config(e, name)))
            .ok()
    }

    /// Makes a variable a system variable that reads through to another
    /// subsystem's storage, declaring it first if configuration hasn't.
    pub fn link_variable(
        &mut self,
        name: &str,
        storage: Arc<dyn LinkedStorage>,
    ) -> Option<VarHandle> {
        self.vars
            .declare_linked(name, storage)
            .map_err(|e| self.sink.report(Diagnostic::config(e, name)))
            .ok()
    }

    /// Compiles a binding declared under the given interface. Returns how
    /// many bindings it produced.
    pub fn add_binding(&mut self, decl: &BindingDeclaration, interface_id: i32) -> usize {
        self.note_interface(interface_id);
        let compiler = BindingCompiler::new(
            &self.registry,
            &self.vars,
            self.keys.as_ref(),
            self.sink.as_ref(),
        );
        match compiler.compile(&mut self.table, decl, interface_id) {
            Ok(count) => count,
            Err(e) => {
                let context = decl.get("input").unwrap_or("binding").to_string();
                self.sink.report(Diagnostic::config(e, context));
                0
            }
        }
    }

    /// Declares an interface's variables, then compiles its bindings. Returns
    /// how many bindings were added.
    pub fn load_interface(&mut self, config: &InterfaceConfig) -> usize {
        self.note_interface(config.id);
        for v in config.variables.iter() {
            self.declare_variable(&v.name, &v.type_name, v.value.as_deref());
        }
        let added = config
            .bindings
            .iter()
            .map(|b| self.add_binding(b, config.id))
            .sum();
        tracing::debug!(
            "interface {} ({}): {added} binding(s)",
            config.id,
            config.name.as_deref().unwrap_or("unnamed")
        );
        added
    }

    /// Adds a listener that hears every broadcast after the dispatcher does.
    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    #[allow(missing_docs)]
    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    fn note_interface(&mut self, id: i32) {
        if !self.interfaces.contains(&id) {
            self.interfaces.push(id);
        }
    }

    /// Freezes everything and wires the dispatcher to the bus.
    pub fn build(self) -> Engine {
        let mut bus = EventBus::new(self.settings.pool_size, self.registry.max_fields());
        let dispatcher = Arc::new(
            Dispatcher::new(self.registry, self.vars, self.table, self.sink)
                .with_settings(&self.settings)
                .with_transpose(self.transpose)
                .with_interfaces(self.interfaces),
        );
        bus.subscribe(dispatcher.clone());
        for listener in self.listeners {
            bus.subscribe(listener);
        }
        Engine { bus, dispatcher }
    }
}

/// A configured engine: the bus that input sources broadcast on, with the
/// dispatcher already listening. Share it between input threads with an
/// [Arc].
#[derive(Debug)]
pub struct Engine {
    bus: EventBus,
    dispatcher: Arc<Dispatcher>,
}
impl Engine {
    /// Broadcasts an event from an input source.
    pub fn send(&self, event: &Event) {
        self.bus.broadcast(event);
    }

    /// Announces every configured interface. Call once, after the input
    /// sources are ready.
    pub fn start_interfaces(&self) {
        self.dispatcher.start_interfaces(&self.bus);
    }

    #[allow(missing_docs)]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    #[allow(missing_docs)]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &EventRegistry {
        self.dispatcher.registry()
    }

    #[allow(missing_docs)]
    pub fn variables(&self) -> &VariableStore {
        self.dispatcher.variables()
    }
}
