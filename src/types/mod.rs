// Copyright (c) 2024 Mike Tsao

//! Common data types used throughout the system.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{CrossbeamChannel, MidiChannel, Range};
}

pub use {
    channels::CrossbeamChannel,
    midi::{u14, u4, u7, MidiChannel, MidiMessage, MidiUtils},
    range::Range,
};

mod channels;
mod midi;
mod range;
