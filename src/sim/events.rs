//! Signals emitted by the simulation
//!
//! Components queue events while a tick runs. The queue is flushed once the
//! tick has finished, so listeners only ever see `&GameEvent` and cannot
//! reach back into simulation state mid-tick.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::state::{BeanId, SessionResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    CountdownStarted,
    CountdownUpdated(i32),
    CountdownFinished,
    /// Remaining session time after a timer step
    TimeChanged(f32),
    GameEnded(SessionResult),
    BeanSpawned { id: BeanId, position: Vec3 },
    /// A bean was run over; `speed_rate` is the vehicle's speed / max speed
    BeanCrushed {
        id: BeanId,
        position: Vec3,
        speed_rate: f32,
    },
    /// One bean was ground into coffee
    CoffeeGround { ground_coffee: u32 },
    /// The coffee gauge filled up and was converted to score
    CoffeeBrewed { score: u64 },
    CoffeeSpilled { ground_coffee: u32 },
    /// Sudden stop against an obstacle
    Impact { position: Vec3 },
    MillStarted,
    MillStopped,
}

/// Identifies a subscription so it can be removed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u32);

type Listener = Box<dyn FnMut(&GameEvent)>;

/// Observer registry with a per-tick event queue
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<(ListenerId, Listener)>,
    pending: Vec<GameEvent>,
    next_id: u32,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending)
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for every event
    pub fn subscribe(&mut self, listener: impl FnMut(&GameEvent) + 'static) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns false if it was not registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Queue an event for the next flush
    pub fn emit(&mut self, event: GameEvent) {
        log::trace!("event: {:?}", event);
        self.pending.push(event);
    }

    /// Events queued since the last flush
    pub fn pending(&self) -> &[GameEvent] {
        &self.pending
    }

    /// Drop queued events without delivering them
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Deliver queued events to every listener in emission order and return them
    pub fn flush(&mut self) -> Vec<GameEvent> {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            for (_, listener) in self.listeners.iter_mut() {
                listener(event);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_flush_delivers_in_order() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::new();
        let sink = seen.clone();
        bus.subscribe(move |e| sink.borrow_mut().push(e.clone()));

        bus.emit(GameEvent::CountdownStarted);
        bus.emit(GameEvent::CountdownUpdated(3));
        assert!(seen.borrow().is_empty(), "nothing delivered before flush");

        let flushed = bus.flush();
        assert_eq!(flushed.len(), 2);
        assert_eq!(*seen.borrow(), flushed);
        assert!(bus.pending().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let c = count.clone();
        let id = bus.subscribe(move |_| *c.borrow_mut() += 1);
        bus.emit(GameEvent::MillStarted);
        bus.flush();
        assert!(bus.unsubscribe(id));
        assert!(!bus.unsubscribe(id));
        bus.emit(GameEvent::MillStopped);
        bus.flush();
        assert_eq!(*count.borrow(), 1);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_clear_pending_skips_listeners() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::new();
        let c = count.clone();
        bus.subscribe(move |_| *c.borrow_mut() += 1);
        bus.emit(GameEvent::MillStarted);
        bus.clear_pending();
        assert!(bus.flush().is_empty());
        assert_eq!(*count.borrow(), 0);
    }
}
