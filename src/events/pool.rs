// Copyright (c) 2024 Mike Tsao

use super::Event;
use crate::types::CrossbeamChannel;
use core::{
    fmt,
    ops::{Deref, DerefMut},
};

/// A fixed set of pre-allocated [Event]s. Time-critical callers take one with
/// [EventPool::try_acquire()], which never blocks and never allocates; it
/// fails when the pool is empty. Everyone else may wait with
/// [EventPool::acquire_blocking()].
///
/// The free list is a bounded crossbeam channel holding the idle events.
pub struct EventPool {
    free: CrossbeamChannel<Event>,
    capacity: usize,
}
impl EventPool {
    /// Creates `capacity` events, each with room for `field_capacity` fields.
    pub fn new(capacity: usize, field_capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let free = CrossbeamChannel::bounded(capacity);
        for _ in 0..capacity {
            let _ = free.sender.try_send(Event::with_capacity(field_capacity));
        }
        Self { free, capacity }
    }

    /// Takes an idle event without waiting. Returns None if all are in use.
    pub fn try_acquire(&self) -> Option<PooledEvent<'_>> {
        self.free
            .receiver
            .try_recv()
            .ok()
            .map(|event| PooledEvent { event, pool: self })
    }

    /// Takes an idle event, waiting for one to be returned if necessary. Not
    /// for use on time-critical threads.
    pub fn acquire_blocking(&self) -> PooledEvent<'_> {
        // The pool holds its own sender, so the channel can't disconnect.
        let event = self.free.receiver.recv().unwrap_or_default();
        PooledEvent { event, pool: self }
    }

    /// How many events are idle right now.
    pub fn available(&self) -> usize {
        self.free.receiver.len()
    }

    #[allow(missing_docs)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, mut event: Event) {
        event.set_echo(false);
        let _ = self.free.sender.try_send(event);
    }
}
impl fmt::Debug for EventPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventPool")
            .field("capacity", &self.capacity)
            .field("available", &self.available())
            .finish()
    }
}

/// An event on loan from an [EventPool]. It goes back when dropped.
pub struct PooledEvent<'a> {
    event: Event,
    pool: &'a EventPool,
}
impl Deref for PooledEvent<'_> {
    type Target = Event;

    fn deref(&self) -> &Self::Target {
        &self.event
    }
}
impl DerefMut for PooledEvent<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.event
    }
}
impl Drop for PooledEvent<'_> {
    fn drop(&mut self) {
        self.pool.release(core::mem::take(&mut self.event));
    }
}
impl fmt::Debug for PooledEvent<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PooledEvent").field(&self.event).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{events::EventType, variables::Value};

    #[test]
    fn pool_is_bounded_and_recycles() {
        let pool = EventPool::new(2, 4);
        assert_eq!(pool.available(), 2);

        let a = pool.try_acquire();
        let b = pool.try_acquire();
        assert!(a.is_some());
        assert!(b.is_some());
        assert!(pool.try_acquire().is_none(), "pool should be exhausted");

        drop(a);
        assert_eq!(pool.available(), 1);
        assert!(pool.try_acquire().is_some());
    }

    #[test]
    fn returned_events_lose_their_echo_mark() {
        let pool = EventPool::new(1, 4);
        {
            let mut e = pool.try_acquire().unwrap();
            e.copy_from(&Event::new(EventType::MidiClock, vec![Value::Int(0)]));
            e.set_echo(true);
            assert!(e.is_echo());
        }
        let e = pool.acquire_blocking();
        assert!(!e.is_echo());
    }

    #[test]
    fn blocking_acquire_waits_for_a_release() {
        let pool = std::sync::Arc::new(EventPool::new(1, 1));
        let held = pool.try_acquire().unwrap();
        std::thread::scope(|s| {
            let p = std::sync::Arc::clone(&pool);
            let waiter = s.spawn(move || {
                let e = p.acquire_blocking();
                e.event_type()
            });
            std::thread::sleep(std::time::Duration::from_millis(20));
            drop(held);
            assert_eq!(waiter.join().unwrap(), EventType::default());
        });
    }
}
