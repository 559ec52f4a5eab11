// Copyright (c) 2024 Mike Tsao

use float_cmp::approx_eq;
use more_asserts::{assert_ge, assert_le};
use stagebind::{
    binding::BindingDeclaration,
    events::{midi::event_from_midi, ChannelListener},
    prelude::*,
    types::{u4, MidiUtils},
    CollectingSink, Diagnostic, DispatchError,
};
use std::sync::Arc;

struct Stage {
    engine: Engine,
    heard: Arc<ChannelListener>,
    sink: Arc<CollectingSink>,
}
impl Stage {
    fn new(settings: EngineSettings, setup: impl FnOnce(&mut EngineBuilder)) -> Self {
        let sink = Arc::new(CollectingSink::default());
        let heard = Arc::new(ChannelListener::default());
        let mut builder = EngineBuilder::new(settings).with_sink(sink.clone());
        setup(&mut builder);
        builder.subscribe(heard.clone());
        Self {
            engine: builder.build(),
            heard,
            sink,
        }
    }

    fn send(&self, event_type: EventType, values: &[(&str, Value)]) {
        let e = self.engine.registry().instance(event_type, values).unwrap();
        self.engine.send(&e);
    }

    /// Everything broadcast since the last call, in order. The dispatcher
    /// listens first, so an input shows up after the actions it caused.
    fn heard(&self) -> Vec<Event> {
        self.heard.drain()
    }

    fn heard_of(&self, event_type: EventType) -> Vec<Event> {
        self.heard()
            .into_iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    fn get(&self, event: &Event, field: &str) -> Value {
        self.engine.registry().get(event, field).unwrap()
    }

    fn var(&self, name: &str) -> Value {
        let vars = self.engine.variables();
        vars.value(vars.lookup(name).unwrap())
    }
}

fn float(v: Value) -> f32 {
    match v {
        Value::Float(f) => f,
        other => panic!("expected a float, got {other:?}"),
    }
}

#[test]
fn key_binding_computes_its_parameter() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.declare_variable("VOL", "float", Some("0.5"));
        b.add_binding(
            &BindingDeclaration::new("key")
                .conditions("key=A and down=1")
                .output("set-master-volume", "amount = VOL+0.1"),
            0,
        );
    });

    stage.send(EventType::Key, &[("key", Value::Int(97)), ("down", Value::Int(1))]);
    let heard = stage.heard();
    let volumes: Vec<&Event> = heard
        .iter()
        .filter(|e| e.event_type() == EventType::SetMasterVolume)
        .collect();
    assert_eq!(volumes.len(), 1);
    assert!(approx_eq!(
        f32,
        float(stage.get(volumes[0], "amount")),
        0.6,
        epsilon = 0.0001
    ));
    assert!(heard.iter().all(|e| !e.is_echo()), "matched without echo");

    // Key-up doesn't match, so it's echoed for default handling.
    stage.send(EventType::Key, &[("key", Value::Int(97)), ("down", Value::Int(0))]);
    let heard = stage.heard();
    assert!(heard.iter().all(|e| e.event_type() == EventType::Key));
    assert_eq!(heard.iter().filter(|e| e.is_echo()).count(), 1);
    assert!(stage.sink.is_empty(), "{:?}", stage.sink.diagnostics());
}

#[test]
fn unmatched_controller_falls_through_to_an_echo() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.add_binding(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=7")
                .echo(false)
                .output("trigger-loop", "index=1 and vol=val/2"),
            0,
        );
    });

    stage.send(
        EventType::MidiController,
        &[("ctrl", Value::Int(7)), ("val", Value::Int(100))],
    );
    let heard = stage.heard();
    assert_eq!(heard.len(), 2, "one action plus the original input");
    assert_eq!(heard[0].event_type(), EventType::TriggerLoop);
    // Integer arithmetic, because val is an integer; then stored as a float.
    assert_eq!(stage.get(&heard[0], "vol"), Value::Float(50.0));
    assert!(!heard[1].is_echo());

    stage.send(
        EventType::MidiController,
        &[("ctrl", Value::Int(8)), ("val", Value::Int(100))],
    );
    let heard = stage.heard();
    assert_eq!(heard.len(), 2);
    assert!(heard[0].is_echo());
    assert_eq!(stage.get(&heard[0], "ctrl"), Value::Int(8));
}

#[test]
fn echo_flag_echoes_a_matched_input() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.add_binding(
            &BindingDeclaration::new("midi-key")
                .conditions("notenum=60")
                .echo(true)
                .output("trigger-loop", "index=4"),
            0,
        );
    });
    stage.send(EventType::MidiKey, &[("notenum", Value::Int(60))]);
    let heard = stage.heard();
    let types: Vec<(EventType, bool)> = heard.iter().map(|e| (e.event_type(), e.is_echo())).collect();
    assert_eq!(
        types,
        vec![
            (EventType::TriggerLoop, false),
            (EventType::MidiKey, true),
            (EventType::MidiKey, false)
        ]
    );
}

#[test]
fn max_jump_refuses_big_leaps() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.declare_variable("LEVEL", "int", Some("50"));
        b.add_binding(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=1")
                .output(
                    "set-variable",
                    "var=LEVEL and value=val and maxjumpcheck=1 and maxjump=10",
                ),
            0,
        );
    });

    stage.send(EventType::MidiController, &[("ctrl", Value::Int(1)), ("val", Value::Int(70))]);
    assert_eq!(stage.var("LEVEL"), Value::Int(50));

    stage.send(EventType::MidiController, &[("ctrl", Value::Int(1)), ("val", Value::Int(55))]);
    assert_eq!(stage.var("LEVEL"), Value::Int(55));
    assert!(stage.sink.is_empty());
}

#[test]
fn continued_chain_fires_every_output_in_order() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        let decl = (1..=4).fold(
            BindingDeclaration::new("joystick-button").conditions("button=3"),
            |d, i| d.output("trigger-loop", &format!("index={i}")),
        );
        assert_eq!(b.add_binding(&decl, 0), 4);
    });

    stage.send(EventType::JoystickButton, &[("button", Value::Int(3))]);
    let indexes: Vec<Value> = stage
        .heard_of(EventType::TriggerLoop)
        .iter()
        .map(|e| stage.get(e, "index"))
        .collect();
    assert_eq!(
        indexes,
        vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
    );

    stage.send(EventType::JoystickButton, &[("button", Value::Int(4))]);
    assert!(stage.heard_of(EventType::TriggerLoop).is_empty());
}

#[test]
fn go_sub_reenters_and_is_never_echoed_when_unmatched() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.add_binding(
            &BindingDeclaration::new("key")
                .conditions("key=space and down=1")
                .output("go-sub", "sub=5 and param1=key"),
            0,
        );
        b.add_binding(
            &BindingDeclaration::new("go-sub")
                .conditions("sub=5")
                .output("trigger-loop", "index=param1"),
            0,
        );
    });

    stage.send(EventType::Key, &[("key", Value::Int(32)), ("down", Value::Int(1))]);
    let loops = stage.heard_of(EventType::TriggerLoop);
    assert_eq!(loops.len(), 1);
    assert_eq!(stage.get(&loops[0], "index"), Value::Int(32));

    stage.send(EventType::GoSub, &[("sub", Value::Int(6))]);
    let heard = stage.heard();
    assert_eq!(heard.len(), 1, "only the original, never an echo");
    assert!(!heard[0].is_echo());
}

#[test]
fn interfaces_are_independent() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.add_binding(
            &BindingDeclaration::new("key")
                .conditions("key=x")
                .output("go-sub", "sub=1 and interfaceid=2"),
            0,
        );
        b.add_binding(
            &BindingDeclaration::new("key")
                .conditions("key=x")
                .output("trigger-loop", "index=99"),
            2,
        );
        b.add_binding(
            &BindingDeclaration::new("go-sub")
                .conditions("sub=1")
                .output("trigger-loop", "index=2"),
            2,
        );
    });

    stage.send(EventType::Key, &[("key", Value::Int(120))]);
    let indexes: Vec<Value> = stage
        .heard_of(EventType::TriggerLoop)
        .iter()
        .map(|e| stage.get(e, "index"))
        .collect();
    assert_eq!(indexes, vec![Value::Int(2)]);
}

#[test]
fn pool_exhaustion_drops_the_action() {
    let settings = EngineSettings {
        pool_size: 1,
        ..Default::default()
    };
    let stage = Stage::new(settings, |b| {
        b.add_binding(
            &BindingDeclaration::new("key").output("go-sub", "sub=1"),
            0,
        );
        b.add_binding(
            &BindingDeclaration::new("go-sub")
                .conditions("sub=1")
                .output("trigger-loop", "index=1"),
            0,
        );
    });

    stage.send(EventType::Key, &[]);
    assert!(stage.heard_of(EventType::TriggerLoop).is_empty());
    assert_eq!(
        stage.sink.diagnostics(),
        vec![Diagnostic::Dispatch(DispatchError::PoolExhausted(
            EventType::TriggerLoop
        ))]
    );
    assert_eq!(stage.engine.bus().pool().available(), 1);
}

struct TextPrompt;
impl ModalHook for TextPrompt {
    fn claims(&self, event: &Event) -> bool {
        event.event_type() == EventType::Key
    }
}

#[test]
fn modal_hook_swallows_input() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.add_binding(&BindingDeclaration::new("key").output("trigger-loop", "index=1"), 0);
    });
    stage.engine.dispatcher().set_modal_hook(Some(Arc::new(TextPrompt)));
    stage.send(EventType::Key, &[("key", Value::Int(97))]);
    let heard = stage.heard();
    assert_eq!(heard.len(), 1);
    assert!(!heard[0].is_echo());

    // Other inputs still route.
    stage.send(EventType::MidiClock, &[]);
    assert_eq!(stage.heard().iter().filter(|e| e.is_echo()).count(), 1);

    stage.engine.dispatcher().set_modal_hook(None);
    stage.send(EventType::Key, &[("key", Value::Int(97))]);
    assert_eq!(stage.heard_of(EventType::TriggerLoop).len(), 1);
}

#[test]
fn system_variables_are_read_only_and_live() {
    let master = Arc::new(ValueCell::new(Value::Float(1.0)));
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.declare_variable("MASTER", "float", None);
        let storage: Arc<dyn LinkedStorage> = master.clone();
        b.link_variable("MASTER", storage);
        b.add_binding(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=2")
                .output("set-variable", "var=MASTER and value=0.25"),
            0,
        );
        b.add_binding(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=3")
                .output("trigger-loop", "vol=MASTER*2"),
            0,
        );
    });

    stage.send(EventType::MidiController, &[("ctrl", Value::Int(2))]);
    assert_eq!(stage.var("MASTER"), Value::Float(1.0));
    assert_eq!(
        stage.sink.diagnostics(),
        vec![Diagnostic::Dispatch(DispatchError::SystemVariable(
            "MASTER".to_string()
        ))]
    );

    // The owning subsystem changes it; bindings see the change.
    master.set(Value::Float(0.3));
    stage.heard();
    stage.send(EventType::MidiController, &[("ctrl", Value::Int(3))]);
    let loops = stage.heard_of(EventType::TriggerLoop);
    assert!(approx_eq!(
        f32,
        float(stage.get(&loops[0], "vol")),
        0.6,
        epsilon = 0.0001
    ));
}

#[test]
fn log_fader_and_transpose() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.declare_variable("FADER", "float", Some("0.0"));
        b.declare_variable("GAIN", "float", Some("0.0"));
        b.add_binding(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=9")
                .output("set-variable", "var=FADER and value=val")
                .output("log-fader-to-linear", "var=GAIN and fadervar=FADER and scale=127.0"),
            0,
        );
        b.add_binding(
            &BindingDeclaration::new("midi-program-change")
                .output("adjust-midi-transpose", "adjust=val-64"),
            0,
        );
    });

    stage.send(EventType::MidiController, &[("ctrl", Value::Int(9)), ("val", Value::Int(127))]);
    assert!(approx_eq!(f32, float(stage.var("GAIN")), 1.0, epsilon = 0.0001));
    stage.send(EventType::MidiController, &[("ctrl", Value::Int(9)), ("val", Value::Int(0))]);
    assert_eq!(stage.var("GAIN"), Value::Float(0.0));

    stage.send(EventType::MidiProgramChange, &[("val", Value::Int(76))]);
    assert_eq!(stage.engine.dispatcher().transpose(), 12);
    assert_eq!(stage.var("SYSTEM_midi_transpose"), Value::Int(12));
}

#[test]
fn midi_note_on_with_zero_velocity_releases() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.add_binding(
            &BindingDeclaration::new("midi-key")
                .conditions("notenum=60 and down=0")
                .output("trigger-loop", "index=7 and engage=0"),
            0,
        );
    });
    let e = event_from_midi(
        stage.engine.registry(),
        0,
        u4::from_int_lossy(0),
        MidiUtils::new_note_on(60, 0),
    )
    .unwrap();
    stage.engine.send(&e);
    assert_eq!(stage.heard_of(EventType::TriggerLoop).len(), 1);
}

#[test]
fn variables_round_trip_through_expressions() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.declare_variable("V", "range", Some("1>2"));
        b.add_binding(
            &BindingDeclaration::new("mouse-button")
                .conditions("button=1")
                .output("set-variable", "var=V and value=10>20"),
            0,
        );
        b.add_binding(
            &BindingDeclaration::new("mouse-button")
                .conditions("button=2 and x=V")
                .output("trigger-loop", "index=V"),
            0,
        );
    });
    stage.send(EventType::MouseButton, &[("button", Value::Int(1))]);
    assert_eq!(stage.var("V"), Value::Range((10, 20).into()));

    stage.send(EventType::MouseButton, &[("button", Value::Int(2)), ("x", Value::Int(15))]);
    let loops = stage.heard_of(EventType::TriggerLoop);
    assert_eq!(loops.len(), 1);
    assert_eq!(stage.get(&loops[0], "index"), Value::Int(10));

    stage.send(EventType::MouseButton, &[("button", Value::Int(2)), ("x", Value::Int(25))]);
    assert!(stage.heard_of(EventType::TriggerLoop).is_empty());
}

#[test]
fn dispatch_from_many_threads() {
    let stage = Stage::new(EngineSettings::default(), |b| {
        b.declare_variable("COUNT", "int", Some("0"));
        b.add_binding(
            &BindingDeclaration::new("midi-controller")
                .conditions("ctrl=1")
                .output("toggle-variable", "var=COUNT and maxvalue=1000000 and minvalue=0")
                .output("trigger-loop", "index=val"),
            0,
        );
    });
    let event = stage
        .engine
        .registry()
        .instance(EventType::MidiController, &[("ctrl", Value::Int(1))])
        .unwrap();

    std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                for _ in 0..100 {
                    stage.engine.send(&event);
                }
            });
        }
    });

    assert_eq!(stage.heard_of(EventType::TriggerLoop).len(), 400);
    // Toggles race; some increments may be lost, but never more than were
    // sent.
    let Value::Int(count) = stage.var("COUNT") else {
        panic!("COUNT should stay an int");
    };
    assert_ge!(count, 1);
    assert_le!(count, 400);
    assert!(stage.sink.is_empty());
}
