// Copyright (c) 2024 Mike Tsao

//! The traits at the seams between the binding engine and the subsystems it
//! talks to.

use crate::{
    events::{Event, EventBus},
    variables::{Value, ValueCell, ValueKind},
};

/// Quick import of all important traits.
pub mod prelude {
    pub use super::{EventListener, KeyNames, LinkedStorage, ModalHook};
    pub use crate::diagnostics::DiagnosticSink;
}

/// Storage owned by another subsystem that a system variable reads through.
/// Only the owner writes to it.
pub trait LinkedStorage: Send + Sync {
    /// The kind of value this storage holds.
    fn kind(&self) -> ValueKind;

    /// The current value.
    fn value(&self) -> Value;
}
impl LinkedStorage for ValueCell {
    fn kind(&self) -> ValueKind {
        ValueCell::kind(self)
    }

    fn value(&self) -> Value {
        self.get()
    }
}

/// Something that wants to see events broadcast on the [EventBus].
///
/// Listeners that implement the default behavior of an input (what a key does
/// when no binding claims it) should act only on echoed copies, see
/// [Event::is_echo()]. The original input goes to everyone, but only the
/// dispatcher is supposed to act on it.
pub trait EventListener: Send + Sync {
    /// Called synchronously, on the broadcasting thread. The bus is passed
    /// along so that the listener may broadcast in turn.
    fn receive_event(&self, event: &Event, bus: &EventBus);
}

/// Maps keyboard key names to keycodes and back.
pub trait KeyNames: Send + Sync {
    /// The keycode for a key name, if the name is known.
    fn keycode(&self, name: &str) -> Option<i32>;

    /// The canonical name of a keycode, if there is one.
    fn key_name(&self, keycode: i32) -> Option<&str>;
}

/// A temporary owner of input, such as a text-entry prompt that wants every
/// keystroke. When a hook claims an event, the dispatcher stops routing it.
pub trait ModalHook: Send + Sync {
    /// Returns true to swallow the event.
    fn claims(&self, event: &Event) -> bool;
}
