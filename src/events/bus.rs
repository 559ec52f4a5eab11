// Copyright (c) 2024 Mike Tsao

use super::{Event, EventPool};
use crate::{traits::EventListener, types::CrossbeamChannel};
use core::fmt;
use crossbeam::channel::Receiver;
use std::sync::Arc;

/// Synchronous broadcast to every subscribed [EventListener], plus the
/// [EventPool] that broadcasters draw outgoing events from.
///
/// Subscriptions happen during configuration. After that the bus is shared
/// immutably, and any thread may broadcast on it.
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
    pool: EventPool,
}
impl EventBus {
    /// Creates a bus whose pool holds `pool_capacity` events of up to
    /// `field_capacity` fields each.
    pub fn new(pool_capacity: usize, field_capacity: usize) -> Self {
        Self {
            listeners: Vec::default(),
            pool: EventPool::new(pool_capacity, field_capacity),
        }
    }

    /// Adds a listener. Listeners hear broadcasts in subscription order.
    pub fn subscribe(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Hands the event to every listener before returning.
    pub fn broadcast(&self, event: &Event) {
        for listener in self.listeners.iter() {
            listener.receive_event(event, self);
        }
    }

    #[allow(missing_docs)]
    pub fn pool(&self) -> &EventPool {
        &self.pool
    }

    #[allow(missing_docs)]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("pool", &self.pool)
            .finish()
    }
}

/// A listener that copies every broadcast into a channel, so that another
/// thread (a loop engine, a display) can consume events at its own pace.
#[derive(Debug, Default)]
pub struct ChannelListener {
    channel: CrossbeamChannel<Event>,
}
impl ChannelListener {
    /// The receiving end. Clone it to hand to another thread.
    pub fn receiver(&self) -> &Receiver<Event> {
        &self.channel.receiver
    }

    /// Everything received so far that nobody has consumed yet.
    pub fn drain(&self) -> Vec<Event> {
        self.channel.receiver.try_iter().collect()
    }
}
impl EventListener for ChannelListener {
    fn receive_event(&self, event: &Event, _bus: &EventBus) {
        let _ = self.channel.sender.send(event.clone());
    }
}
