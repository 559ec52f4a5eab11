// Copyright (c) 2024 Mike Tsao

use super::EventType;
use crate::variables::Value;

/// One event instance: a type plus one [Value] per field of that type's
/// schema, in schema order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Event {
    event_type: EventType,
    fields: Vec<Value>,
    echo: bool,
}
impl Event {
    /// Creates an event from already-ordered field values.
    pub fn new(event_type: EventType, fields: Vec<Value>) -> Self {
        Self {
            event_type,
            fields,
            echo: false,
        }
    }

    /// A blank event whose field storage is already sized, so that copying a
    /// prototype into it doesn't allocate.
    pub fn with_capacity(field_capacity: usize) -> Self {
        Self {
            event_type: EventType::default(),
            fields: Vec::with_capacity(field_capacity),
            echo: false,
        }
    }

    #[allow(missing_docs)]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// The value of the field at the given schema index, or [Value::Invalid].
    pub fn field(&self, index: usize) -> Value {
        self.fields.get(index).copied().unwrap_or_default()
    }

    /// Sets the field at the given schema index. Out-of-range indexes are
    /// ignored.
    pub fn set_field(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.fields.get_mut(index) {
            *slot = value;
        }
    }

    #[allow(missing_docs)]
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// True for the copy of an input event that the dispatcher rebroadcasts so
    /// that default behavior can happen.
    pub fn is_echo(&self) -> bool {
        self.echo
    }

    #[allow(missing_docs)]
    pub fn set_echo(&mut self, echo: bool) {
        self.echo = echo;
    }

    /// Overwrites this event with a copy of another, reusing this event's
    /// field storage.
    pub fn copy_from(&mut self, other: &Event) {
        self.event_type = other.event_type;
        self.fields.clone_from(&other.fields);
        self.echo = other.echo;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_from_reuses_storage() {
        let proto = Event::new(EventType::MidiKey, vec![Value::Int(1); 6]);
        let mut e = Event::with_capacity(8);
        let before = e.fields.capacity();
        e.copy_from(&proto);
        assert_eq!(e, proto);
        assert_eq!(e.fields.capacity(), before);
    }

    #[test]
    fn out_of_range_fields() {
        let mut e = Event::new(EventType::MidiClock, vec![Value::Int(0)]);
        e.set_field(5, Value::Int(1));
        assert_eq!(e.field(5), Value::Invalid);
        assert_eq!(e.fields().len(), 1);
    }
}
