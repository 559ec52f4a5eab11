// Copyright (c) 2024 Mike Tsao

//! Translation between `midly` messages and bus events.

use super::{Event, EventRegistry, EventType};
use crate::{
    types::{u4, u7, MidiChannel, MidiMessage, MidiUtils},
    variables::Value,
};

/// Turns an incoming MIDI message into the matching bindable input event. A
/// note-on with velocity zero is a key-up, as it is on the wire. Messages
/// that no event type covers (polyphonic aftertouch) return None.
pub fn event_from_midi(
    registry: &EventRegistry,
    port: u8,
    channel: u4,
    message: MidiMessage,
) -> Option<Event> {
    let port = Value::Int(port as i32);
    let channel = Value::Int(MidiChannel::from(channel).0 as i32);
    let int = |v: u7| Value::Int(v.as_int() as i32);
    let result = match message {
        MidiMessage::NoteOn { key, vel } => registry.instance(
            EventType::MidiKey,
            &[
                ("down", Value::Int((vel.as_int() != 0) as i32)),
                ("port", port),
                ("channel", channel),
                ("notenum", int(key)),
                ("vel", int(vel)),
            ],
        ),
        MidiMessage::NoteOff { key, vel } => registry.instance(
            EventType::MidiKey,
            &[
                ("down", Value::Int(0)),
                ("port", port),
                ("channel", channel),
                ("notenum", int(key)),
                ("vel", int(vel)),
            ],
        ),
        MidiMessage::Controller { controller, value } => registry.instance(
            EventType::MidiController,
            &[
                ("port", port),
                ("channel", channel),
                ("ctrl", int(controller)),
                ("val", int(value)),
            ],
        ),
        MidiMessage::ProgramChange { program } => registry.instance(
            EventType::MidiProgramChange,
            &[("port", port), ("channel", channel), ("val", int(program))],
        ),
        MidiMessage::ChannelAftertouch { vel } => registry.instance(
            EventType::MidiChannelPressure,
            &[("port", port), ("channel", channel), ("val", int(vel))],
        ),
        MidiMessage::PitchBend { bend } => registry.instance(
            EventType::MidiPitchBend,
            &[
                ("port", port),
                ("channel", channel),
                (
                    "val",
                    Value::Int(bend.0.as_int() as i32 - MidiUtils::PITCH_BEND_CENTER),
                ),
            ],
        ),
        MidiMessage::Aftertouch { .. } => return None,
    };
    result.ok()
}

/// Turns a `midi-out-note` or `midi-out-controller` action into the port it
/// should go to and the message to send. Notes are shifted by `transpose`
/// semitones. Other event types return None.
pub fn midi_from_event(
    registry: &EventRegistry,
    event: &Event,
    transpose: i32,
) -> Option<(u8, MidiChannel, MidiMessage)> {
    let get = |name: &str| registry.get(event, name).and_then(|v| v.as_i64());
    let port = get("port")? as u8;
    let channel = MidiChannel::new(get("channel")? as u8 & MidiChannel::MAX_VALUE);
    let message = match event.event_type() {
        EventType::MidiOutNote => {
            let note = (get("notenum")? + transpose as i64).clamp(0, 127) as u8;
            let vel = get("vel")?.clamp(0, 127) as u8;
            if get("down")? != 0 {
                MidiUtils::new_note_on(note, vel)
            } else {
                MidiUtils::new_note_off(note, vel)
            }
        }
        EventType::MidiOutController => MidiUtils::new_controller(
            get("ctrl")?.clamp(0, 127) as u8,
            get("val")?.clamp(0, 127) as u8,
        ),
        _ => return None,
    };
    Some((port, channel, message))
}
