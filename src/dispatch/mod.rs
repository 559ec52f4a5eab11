// Copyright (c) 2024 Mike Tsao

//! Routes live events through the binding table.

pub use control::{fader_to_linear, FADER_RANGE_DB};

use crate::{
    binding::{Binding, BindingTable},
    diagnostics::{Diagnostic, DiagnosticSink},
    error::DispatchError,
    events::{Event, EventBus, EventRegistry, EventType, INTERFACE_FIELD},
    settings::EngineSettings,
    traits::{EventListener, ModalHook},
    variables::{Value, ValueCell, VariableStore},
};
use core::{cell::Cell, fmt};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, RwLock,
};

mod control;

/// The name of the system variable that holds the MIDI transpose.
pub const TRANSPOSE_VARIABLE: &str = "SYSTEM_midi_transpose";

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Counts nested dispatches on the current thread for as long as it lives.
struct DepthGuard;
impl DepthGuard {
    fn enter(max_depth: usize) -> Option<Self> {
        DEPTH.with(|depth| {
            if depth.get() >= max_depth {
                None
            } else {
                depth.set(depth.get() + 1);
                Some(Self)
            }
        })
    }
}
impl Drop for DepthGuard {
    fn drop(&mut self) {
        DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Decides what every incoming event does.
///
/// For a bindable input, the dispatcher finds the first matching binding,
/// broadcasts an action for it and for each binding continued from it, and
/// then decides whether to echo the input so that its default behavior
/// happens. Reserved control events change variables directly. Everything
/// else is ignored.
///
/// A dispatcher is built once, during configuration. Dispatching needs only
/// `&self`, so any number of input threads may call it at the same time.
/// Variable values live in atomic cells; the modal hook slot is the one
/// lock read on the dispatch path. It is an uncontended `RwLock` read unless
/// a hook is being installed at that moment.
pub struct Dispatcher {
    registry: EventRegistry,
    vars: VariableStore,
    table: BindingTable,
    sink: Arc<dyn DiagnosticSink>,
    modal_hook: RwLock<Option<Arc<dyn ModalHook>>>,
    debug: AtomicBool,
    transpose: Arc<ValueCell>,
    interfaces: Vec<i32>,
    max_depth: usize,
}
impl Dispatcher {
    /// Assembles a dispatcher from finished configuration.
    pub fn new(
        registry: EventRegistry,
        vars: VariableStore,
        table: BindingTable,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let settings = EngineSettings::default();
        Self {
            registry,
            vars,
            table,
            sink,
            modal_hook: RwLock::default(),
            debug: AtomicBool::new(settings.debug),
            transpose: Arc::new(ValueCell::new(Value::Int(0))),
            interfaces: Vec::default(),
            max_depth: settings.max_dispatch_depth,
        }
    }

    /// Applies the dispatch-related settings.
    pub fn with_settings(mut self, settings: &EngineSettings) -> Self {
        self.debug = AtomicBool::new(settings.debug);
        self.max_depth = settings.max_dispatch_depth.max(1);
        self
    }

    /// Uses the given cell as the MIDI transpose. It should be the storage
    /// that [TRANSPOSE_VARIABLE] is linked to.
    pub fn with_transpose(mut self, transpose: Arc<ValueCell>) -> Self {
        self.transpose = transpose;
        self
    }

    /// The interfaces that [Dispatcher::start_interfaces()] announces.
    pub fn with_interfaces(mut self, interfaces: Vec<i32>) -> Self {
        self.interfaces = interfaces;
        self
    }

    /// Routes one event. Never fails; problems are reported to the sink and
    /// the affected action is dropped.
    pub fn dispatch(&self, event: &Event, bus: &EventBus) {
        if event.is_echo() {
            return;
        }
        let event_type = event.event_type();
        if !event_type.is_bindable() && !event_type.is_control() {
            return;
        }
        let Some(_depth) = DepthGuard::enter(self.max_depth) else {
            self.report(DispatchError::RecursionLimit(self.max_depth, event_type));
            return;
        };
        if self.is_debug() {
            tracing::info!("{event_type}: {}", self.describe_event(event));
        }

        if event_type.is_control() {
            if let Err(e) = self.handle_control(event) {
                self.report(e);
            }
            return;
        }

        if let Some(hook) = self.modal_hook() {
            if hook.claims(event) {
                tracing::trace!("{event_type} claimed by modal hook");
                return;
            }
        }

        let chain = self.table.find(event, &self.vars).unwrap_or_else(|e| {
            self.report(e);
            None
        });
        let echo = match chain {
            Some(chain) => {
                self.fire(chain, event, bus);
                chain.first().is_some_and(Binding::echo)
            }
            None => !event_type.is_self_referential(),
        };
        if echo {
            match bus.pool().try_acquire() {
                Some(mut copy) => {
                    copy.copy_from(event);
                    copy.set_echo(true);
                    bus.broadcast(&copy);
                }
                None => self.report(DispatchError::PoolExhausted(event_type)),
            }
        }
    }

    fn fire(&self, chain: &[Binding], input: &Event, bus: &EventBus) {
        for binding in chain {
            match bus.pool().try_acquire() {
                Some(mut output) => {
                    binding.synthesize(input, &self.vars, &mut output);
                    tracing::trace!(
                        "{} -> {}",
                        input.event_type(),
                        output.event_type()
                    );
                    bus.broadcast(&output);
                }
                None => self.report(DispatchError::PoolExhausted(
                    binding.prototype().event_type(),
                )),
            }
        }
    }

    /// Broadcasts one `start-interface` event per configured interface. This
    /// may wait for pool space, so don't call it from a time-critical thread.
    pub fn start_interfaces(&self, bus: &EventBus) {
        for id in self.interfaces.iter() {
            let announcement = self.registry.instance(
                EventType::StartInterface,
                &[(INTERFACE_FIELD, Value::Int(*id))],
            );
            match announcement {
                Ok(announcement) => {
                    let mut event = bus.pool().acquire_blocking();
                    event.copy_from(&announcement);
                    bus.broadcast(&event);
                }
                Err(e) => self.sink.report(e.into()),
            }
        }
    }

    /// Installs or removes the modal hook. Takes the hook slot's write lock,
    /// so a dispatch in flight finishes with the previous hook.
    pub fn set_modal_hook(&self, hook: Option<Arc<dyn ModalHook>>) {
        if let Ok(mut h) = self.modal_hook.write() {
            *h = hook;
        }
    }

    fn modal_hook(&self) -> Option<Arc<dyn ModalHook>> {
        self.modal_hook.read().ok().and_then(|h| h.clone())
    }

    /// Whether verbose dispatch tracing is on.
    pub fn is_debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    #[allow(missing_docs)]
    pub fn set_debug(&self, debug: bool) {
        self.debug.store(debug, Ordering::Relaxed);
    }

    /// The current MIDI transpose, in semitones.
    pub fn transpose(&self) -> i32 {
        self.transpose.get().as_i64().unwrap_or_default() as i32
    }

    #[allow(missing_docs)]
    pub fn registry(&self) -> &EventRegistry {
        &self.registry
    }

    #[allow(missing_docs)]
    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    #[allow(missing_docs)]
    pub fn table(&self) -> &BindingTable {
        &self.table
    }

    fn report(&self, error: DispatchError) {
        self.sink.report(Diagnostic::Dispatch(error));
    }

    fn describe_event(&self, event: &Event) -> String {
        match self.registry.schema(event.event_type()) {
            Some(schema) => schema
                .params()
                .iter()
                .map(|p| {
                    format!(
                        "{}={}",
                        p.name,
                        self.vars.display_value(&event.field(p.index))
                    )
                })
                .collect::<Vec<_>>()
                .join(" "),
            None => String::default(),
        }
    }
}
impl EventListener for Dispatcher {
    fn receive_event(&self, event: &Event, bus: &EventBus) {
        self.dispatch(event, bus);
    }
}
impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("bindings", &self.table.len())
            .field("variables", &self.vars.len())
            .field("interfaces", &self.interfaces)
            .field("debug", &self.is_debug())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        binding::{BindingCompiler, BindingDeclaration},
        diagnostics::CollectingSink,
        events::ChannelListener,
        keys::StandardKeys,
        variables::ValueKind,
    };

    struct Rig {
        bus: EventBus,
        dispatcher: Arc<Dispatcher>,
        heard: Arc<ChannelListener>,
        sink: Arc<CollectingSink>,
    }
    impl Rig {
        fn new(pool_size: usize, decls: &[BindingDeclaration]) -> Self {
            let registry = EventRegistry::default();
            let mut vars = VariableStore::default();
            vars.declare("COUNT", "int", Some("0")).unwrap();
            vars.declare("BIG", "int", Some("4660")).unwrap();
            vars.declare("HI", "int", None).unwrap();
            vars.declare("LO", "int", None).unwrap();
            vars.declare_value("HUGE", ValueKind::Long, Value::Long(i64::MAX)).unwrap();
            let sink = Arc::new(CollectingSink::default());
            let mut table = BindingTable::default();
            {
                let compiler =
                    BindingCompiler::new(&registry, &vars, StandardKeys::global(), sink.as_ref());
                for d in decls {
                    compiler.compile(&mut table, d, 0).unwrap();
                }
            }
            let mut bus = EventBus::new(pool_size, registry.max_fields());
            let dispatcher = Arc::new(
                Dispatcher::new(registry, vars, table, sink.clone()).with_interfaces(vec![0, 2]),
            );
            let heard = Arc::new(ChannelListener::default());
            bus.subscribe(dispatcher.clone());
            bus.subscribe(heard.clone());
            Self {
                bus,
                dispatcher,
                heard,
                sink,
            }
        }

        fn send(&self, event_type: EventType, values: &[(&str, Value)]) {
            let e = self
                .dispatcher
                .registry()
                .instance(event_type, values)
                .unwrap();
            self.bus.broadcast(&e);
        }

        fn value(&self, name: &str) -> Value {
            let vars = self.dispatcher.variables();
            vars.value(vars.lookup(name).unwrap())
        }
    }

    #[test]
    fn echoed_events_are_ignored() {
        let rig = Rig::new(
            4,
            &[BindingDeclaration::new("key").output("trigger-loop", "index=1")],
        );
        let mut e = rig.dispatcher.registry().instance(EventType::Key, &[]).unwrap();
        e.set_echo(true);
        rig.bus.broadcast(&e);
        let heard = rig.heard.drain();
        assert_eq!(heard.len(), 1, "only the original broadcast");
    }

    #[test]
    fn control_events_change_variables() {
        let rig = Rig::new(4, &[]);
        let vars = rig.dispatcher.variables();
        let count = Value::Ref(vars.lookup("COUNT").unwrap());

        for _ in 0..3 {
            rig.send(
                EventType::ToggleVariable,
                &[("var", count), ("maxvalue", Value::Int(1)), ("minvalue", Value::Int(0))],
            );
        }
        assert_eq!(rig.value("COUNT"), Value::Int(1));

        rig.send(
            EventType::SplitVariableMsbLsb,
            &[
                ("var", Value::Ref(vars.lookup("BIG").unwrap())),
                ("msb", Value::Ref(vars.lookup("HI").unwrap())),
                ("lsb", Value::Ref(vars.lookup("LO").unwrap())),
            ],
        );
        assert_eq!(rig.value("HI"), Value::Int(0x12));
        assert_eq!(rig.value("LO"), Value::Int(0x34));

        rig.send(EventType::SetDebugMode, &[("debug", Value::Int(1))]);
        assert!(rig.dispatcher.is_debug());

        rig.send(EventType::AdjustMidiTranspose, &[("adjust", Value::Int(-12))]);
        rig.send(EventType::AdjustMidiTranspose, &[("adjust", Value::Int(5))]);
        assert_eq!(rig.dispatcher.transpose(), -7);
        assert!(rig.sink.is_empty());

        // No reference in the var field.
        rig.send(EventType::SetVariable, &[("value", Value::Int(1))]);
        assert_eq!(
            rig.sink.diagnostics(),
            vec![Diagnostic::Dispatch(DispatchError::MissingReference {
                event: EventType::SetVariable,
                field: "var"
            })]
        );
    }

    #[test]
    fn toggle_wraps_instead_of_overflowing() {
        let rig = Rig::new(4, &[]);
        let huge = Value::Ref(rig.dispatcher.variables().lookup("HUGE").unwrap());
        rig.send(
            EventType::ToggleVariable,
            &[("var", huge), ("maxvalue", Value::Int(10)), ("minvalue", Value::Int(3))],
        );
        assert_eq!(rig.value("HUGE"), Value::Long(3));
        assert!(rig.sink.is_empty());
    }

    #[test]
    fn non_scalar_index_skips_the_wildcard() {
        let rig = Rig::new(
            4,
            &[BindingDeclaration::new("midi-controller").output("trigger-loop", "index=1")],
        );
        let mut e = rig
            .dispatcher
            .registry()
            .instance(EventType::MidiController, &[])
            .unwrap();
        e.set_field(3, Value::Range((1, 2).into()));
        rig.bus.broadcast(&e);

        let heard = rig.heard.drain();
        assert!(
            heard.iter().all(|e| e.event_type() != EventType::TriggerLoop),
            "the wildcard binding must not fire"
        );
        assert_eq!(heard.iter().filter(|e| e.is_echo()).count(), 1);
        assert_eq!(
            rig.sink.diagnostics(),
            vec![Diagnostic::Dispatch(DispatchError::IndexNotScalar(
                EventType::MidiController
            ))]
        );
        assert_eq!(rig.bus.pool().available(), 4);
    }

    #[test]
    fn runaway_recursion_is_cut_off() {
        let rig = Rig::new(
            64,
            &[BindingDeclaration::new("go-sub")
                .conditions("sub=1")
                .output("go-sub", "sub=1")],
        );
        rig.send(EventType::GoSub, &[("sub", Value::Int(1))]);
        let limits = rig
            .sink
            .diagnostics()
            .into_iter()
            .filter(|d| matches!(d, Diagnostic::Dispatch(DispatchError::RecursionLimit(..))))
            .count();
        assert_eq!(limits, 1);
        assert_eq!(rig.bus.pool().available(), 64);
    }

    #[test]
    fn interfaces_are_started_in_order() {
        let rig = Rig::new(4, &[]);
        rig.dispatcher.start_interfaces(&rig.bus);
        let ids: Vec<Value> = rig
            .heard
            .drain()
            .iter()
            .filter(|e| e.event_type() == EventType::StartInterface && !e.is_echo())
            .map(|e| e.field(0))
            .collect();
        assert_eq!(ids, vec![Value::Int(0), Value::Int(2)]);
    }
}
