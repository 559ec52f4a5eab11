// Copyright (c) 2024 Mike Tsao

//! Events, the catalog that describes their fields, the pool they are
//! allocated from, and the bus they travel on.

/// The most commonly used imports.
pub mod prelude {
    pub use super::{
        Event, EventBus, EventPool, EventRegistry, EventSchema, EventType, PooledEvent,
    };
}

pub use {
    bus::{ChannelListener, EventBus},
    event::Event,
    pool::{EventPool, PooledEvent},
    schema::{
        EventParameter, EventRegistry, EventSchema, INTERFACE_FIELD, MAIN_INTERFACE_ID,
        REFERENCE_FIELD,
    },
    types::EventType,
};

pub mod midi;

mod bus;
mod event;
mod pool;
mod schema;
mod types;
