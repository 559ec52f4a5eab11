// Copyright (c) 2024 Mike Tsao

use super::{Event, EventType};
use crate::{
    error::ConfigError,
    variables::{Value, ValueKind},
};
use rustc_hash::FxHashMap;
use std::str::FromStr;
use strum::IntoEnumIterator;

/// The field every bindable event carries to say which interface it belongs
/// to.
pub const INTERFACE_FIELD: &str = "interfaceid";

/// The interface that hardware input belongs to unless a source says
/// otherwise.
pub const MAIN_INTERFACE_ID: i32 = 0;

/// The canonical name of a field that carries a live variable reference.
pub const REFERENCE_FIELD: &str = "var";

/// Describes one field of an event type.
#[derive(Clone, Debug, PartialEq)]
pub struct EventParameter {
    /// The name configuration uses for this field.
    pub name: &'static str,
    /// Position in [Event::fields()].
    pub index: usize,
    #[allow(missing_docs)]
    pub kind: ValueKind,
    /// Set on the one field per type that the binding table is hashed on.
    /// Values are reduced modulo this number to pick a bucket.
    pub max_index: Option<u32>,
    /// Whether expressions compared with this field may use keyboard key
    /// names.
    pub key_names: bool,
}

/// Describes the fields of one event type.
#[derive(Clone, Debug)]
pub struct EventSchema {
    event_type: EventType,
    params: Vec<EventParameter>,
    indexed: Option<usize>,
    prototype: Event,
}
impl EventSchema {
    /// Starts an empty schema for the given type.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            params: Vec::default(),
            indexed: None,
            prototype: Event::new(event_type, Vec::default()),
        }
    }

    /// Adds an ordinary field.
    pub fn field(self, name: &'static str, kind: ValueKind) -> Self {
        self.push(name, kind, None, false)
    }

    /// Adds the indexed field. A schema has at most one; a second call
    /// replaces the first.
    pub fn indexed_field(self, name: &'static str, kind: ValueKind, max_index: u32) -> Self {
        self.push(name, kind, Some(max_index.max(1)), false)
    }

    /// Adds the indexed field and lets it be compared with keyboard key names.
    pub fn key_field(self, name: &'static str, max_index: u32) -> Self {
        self.push(name, ValueKind::Int, Some(max_index.max(1)), true)
    }

    fn push(
        mut self,
        name: &'static str,
        kind: ValueKind,
        max_index: Option<u32>,
        key_names: bool,
    ) -> Self {
        let index = self.params.len();
        if max_index.is_some() {
            if let Some(old) = self.indexed.and_then(|i| self.params.get_mut(i)) {
                old.max_index = None;
            }
            self.indexed = Some(index);
        }
        self.params.push(EventParameter {
            name,
            index,
            kind,
            max_index,
            key_names,
        });
        self.prototype = Event::new(
            self.event_type,
            self.params.iter().map(|p| p.kind.zero()).collect(),
        );
        self
    }

    #[allow(missing_docs)]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    #[allow(missing_docs)]
    pub fn params(&self) -> &[EventParameter] {
        &self.params
    }

    /// Finds a field by name.
    pub fn param(&self, name: &str) -> Option<&EventParameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// The field the binding table hashes this type on, if any.
    pub fn indexed_param(&self) -> Option<&EventParameter> {
        self.indexed.and_then(|i| self.params.get(i))
    }

    /// A fresh instance with every field at its zero value.
    pub fn prototype(&self) -> Event {
        self.prototype.clone()
    }

    /// Builds an instance from `(name, value)` pairs, converting each value to
    /// its field's kind. Unnamed fields keep their zero value.
    pub fn instance(&self, values: &[(&str, Value)]) -> Result<Event, ConfigError> {
        let mut event = self.prototype();
        for (name, value) in values {
            let p = self.param(name).ok_or_else(|| ConfigError::UnknownField {
                event: self.event_type.into(),
                field: name.to_string(),
            })?;
            event.set_field(p.index, value.coerce(p.kind));
        }
        Ok(event)
    }

    /// Reads a field by name.
    pub fn get(&self, event: &Event, name: &str) -> Option<Value> {
        self.param(name).map(|p| event.field(p.index))
    }
}

/// The catalog of event types the engine knows about.
#[derive(Clone, Debug)]
pub struct EventRegistry {
    schemas: FxHashMap<EventType, EventSchema>,
    max_fields: usize,
}
impl Default for EventRegistry {
    fn default() -> Self {
        Self::standard(Self::DEFAULT_KEY_INDEX_SIZE)
    }
}
impl EventRegistry {
    /// Number of hash buckets for keyboard keycodes.
    pub const DEFAULT_KEY_INDEX_SIZE: u32 = 512;

    /// Buckets for anything indexed by a 7-bit MIDI number.
    pub const MIDI_INDEX_SIZE: u32 = 128;

    /// The stock catalog. `key_index_size` sets how many buckets keyboard
    /// bindings are spread over.
    pub fn standard(key_index_size: u32) -> Self {
        use ValueKind::{Float, Int, Variable, VariableRef};

        let mut r = Self {
            schemas: FxHashMap::default(),
            max_fields: 0,
        };
        for event_type in EventType::iter() {
            let s = EventSchema::new(event_type);
            let s = if event_type.is_bindable() {
                s.field(INTERFACE_FIELD, Int)
            } else {
                s
            };
            let s = match event_type {
                EventType::Key => s
                    .field("down", Int)
                    .key_field("key", key_index_size)
                    .field("unicode", Int),
                EventType::MouseButton => s
                    .field("down", Int)
                    .indexed_field("button", Int, 16)
                    .field("x", Int)
                    .field("y", Int),
                EventType::MouseMotion => s.field("x", Int).field("y", Int),
                EventType::JoystickButton => s
                    .field("down", Int)
                    .field("joystick", Int)
                    .indexed_field("button", Int, 32),
                EventType::MidiKey => s
                    .field("down", Int)
                    .field("port", Int)
                    .field("channel", Int)
                    .indexed_field("notenum", Int, Self::MIDI_INDEX_SIZE)
                    .field("vel", Int),
                EventType::MidiController => s
                    .field("port", Int)
                    .field("channel", Int)
                    .indexed_field("ctrl", Int, Self::MIDI_INDEX_SIZE)
                    .field("val", Int),
                EventType::MidiProgramChange => s
                    .field("port", Int)
                    .field("channel", Int)
                    .indexed_field("val", Int, Self::MIDI_INDEX_SIZE),
                EventType::MidiChannelPressure | EventType::MidiPitchBend => s
                    .field("port", Int)
                    .field("channel", Int)
                    .field("val", Int),
                EventType::MidiClock | EventType::StartInterface => s,
                EventType::MidiStartStop => s.field("start", Int),
                EventType::GoSub => s
                    .indexed_field("sub", Int, 64)
                    .field("param1", Variable)
                    .field("param2", Variable)
                    .field("param3", Variable),

                EventType::SetVariable => s
                    .field(REFERENCE_FIELD, VariableRef)
                    .field("value", Variable)
                    .field("maxjumpcheck", Int)
                    .field("maxjump", Float),
                EventType::ToggleVariable => s
                    .field(REFERENCE_FIELD, VariableRef)
                    .field("maxvalue", Int)
                    .field("minvalue", Int),
                EventType::SplitVariableMsbLsb => s
                    .field(REFERENCE_FIELD, VariableRef)
                    .field("msb", VariableRef)
                    .field("lsb", VariableRef),
                EventType::LogFaderToLinear => s
                    .field(REFERENCE_FIELD, VariableRef)
                    .field("fadervar", VariableRef)
                    .field("scale", Float),
                EventType::SetDebugMode => s.field("debug", Int),
                EventType::AdjustMidiTranspose => s.field("adjust", Int),

                EventType::TriggerLoop => s
                    .field("index", Int)
                    .field("vol", Float)
                    .field("engage", Int),
                EventType::SetMasterVolume => s.field("amount", Float),
                EventType::MidiOutNote => s
                    .field("port", Int)
                    .field("channel", Int)
                    .field("notenum", Int)
                    .field("vel", Int)
                    .field("down", Int),
                EventType::MidiOutController => s
                    .field("port", Int)
                    .field("channel", Int)
                    .field("ctrl", Int)
                    .field("val", Int),
            };
            r.register(s);
        }
        r
    }

    /// Adds or replaces a schema.
    pub fn register(&mut self, schema: EventSchema) {
        self.max_fields = self.max_fields.max(schema.params().len());
        self.schemas.insert(schema.event_type(), schema);
    }

    #[allow(missing_docs)]
    pub fn schema(&self, event_type: EventType) -> Option<&EventSchema> {
        self.schemas.get(&event_type)
    }

    /// Finds a schema by its configuration name.
    pub fn lookup(&self, name: &str) -> Result<&EventSchema, ConfigError> {
        EventType::from_str(name.trim())
            .ok()
            .and_then(|t| self.schema(t))
            .ok_or_else(|| ConfigError::UnknownEvent(name.trim().to_string()))
    }

    /// The widest schema, which is how much room pooled events need.
    pub fn max_fields(&self) -> usize {
        self.max_fields
    }

    /// Convenience for building events by type and field name.
    pub fn instance(
        &self,
        event_type: EventType,
        values: &[(&str, Value)],
    ) -> Result<Event, ConfigError> {
        self.schema(event_type)
            .ok_or_else(|| ConfigError::UnknownEvent(event_type.to_string()))?
            .instance(values)
    }

    /// Reads a field of an event by name.
    pub fn get(&self, event: &Event, name: &str) -> Option<Value> {
        self.schema(event.event_type())
            .and_then(|s| s.get(event, name))
    }
}
