// Copyright (c) 2024 Mike Tsao

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

/// Every kind of event that travels on the bus. Configuration refers to them
/// by their kebab-case names (`midi-controller`, `set-variable`, ...).
///
/// The variants fall into three groups: bindable inputs, which bindings can be
/// declared on; reserved control events, which the dispatcher acts on
/// directly; and actions, which the dispatcher only ever produces for other
/// subsystems to consume.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Display,
    EnumCount,
    EnumIter,
    EnumString,
    Eq,
    Hash,
    IntoStaticStr,
    Ord,
    PartialEq,
    PartialOrd,
    Serialize,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EventType {
    /// A computer keyboard key went down or up.
    #[default]
    Key,
    /// A mouse button went down or up.
    MouseButton,
    /// The mouse moved.
    MouseMotion,
    /// A joystick button went down or up.
    JoystickButton,
    /// A MIDI note-on or note-off.
    MidiKey,
    /// A MIDI continuous controller message.
    MidiController,
    /// A MIDI program change.
    MidiProgramChange,
    /// MIDI channel pressure (aftertouch).
    MidiChannelPressure,
    /// MIDI pitch bend.
    MidiPitchBend,
    /// A MIDI clock tick.
    MidiClock,
    /// MIDI start or stop.
    MidiStartStop,
    /// A user-defined subroutine call. Bindings produce these and bindings
    /// consume them.
    GoSub,
    /// Sent once per interface at startup.
    StartInterface,

    /// Writes a value into a variable.
    SetVariable,
    /// Steps a variable through a closed range, wrapping around.
    ToggleVariable,
    /// Splits a variable into its high and low bytes.
    SplitVariableMsbLsb,
    /// Converts a logarithmic fader position into a linear gain.
    LogFaderToLinear,
    /// Turns verbose dispatch tracing on or off.
    SetDebugMode,
    /// Moves the MIDI transpose up or down.
    AdjustMidiTranspose,

    /// Asks the loop engine to trigger a loop.
    TriggerLoop,
    /// Asks the loop engine to change the master output volume.
    SetMasterVolume,
    /// Asks the MIDI output to send a note.
    MidiOutNote,
    /// Asks the MIDI output to send a controller value.
    MidiOutController,
}
impl EventType {
    /// Whether bindings can be declared on this type.
    pub fn is_bindable(&self) -> bool {
        (*self as usize) <= (EventType::StartInterface as usize)
    }

    /// Whether the dispatcher handles this type directly, without consulting
    /// the binding table.
    pub fn is_control(&self) -> bool {
        matches!(
            self,
            EventType::SetVariable
                | EventType::ToggleVariable
                | EventType::SplitVariableMsbLsb
                | EventType::LogFaderToLinear
                | EventType::SetDebugMode
                | EventType::AdjustMidiTranspose
        )
    }

    /// Whether the dispatcher emits this type as an output while also routing
    /// it as an input. These must never be echoed when nothing matches them,
    /// or the dispatcher would feed itself forever.
    pub fn is_self_referential(&self) -> bool {
        matches!(self, EventType::GoSub)
    }
}
