//! # Event Bus
//!
//! A small typed publish/subscribe hub. Each bus carries one closed event
//! type `E`; listeners register against one of its kinds
//! ([`Event::kind`]) and are called synchronously, in registration order,
//! when an event of that kind is published.
//!
//! ## Dispatch Rules
//!
//! - A listener registered twice (same `Rc`) is stored once.
//! - Listener errors and panics are logged and contained. They never stop
//!   the remaining listeners and never reach the publisher.
//! - Dispatch iterates a snapshot of the listener list, so a listener may
//!   subscribe, unsubscribe or publish again while being called.
//!
//! Everything is single-threaded, so the bus uses `RefCell`/`Cell` and all
//! methods take `&self`. That is what lets a listener call back into the bus
//! (or into whatever owns it) during dispatch.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::Hash;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;

/// An event that can travel on an [`EventBus`].
pub trait Event {
    type Kind: Copy + Eq + Hash + fmt::Debug;

    fn kind(&self) -> Self::Kind;
}

pub type ListenerError = Box<dyn std::error::Error>;
pub type ListenerResult = std::result::Result<(), ListenerError>;
pub type Listener<E> = Rc<dyn Fn(&E) -> ListenerResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration<E> {
    id: ListenerId,
    listener: Listener<E>,
    once: bool,
}

impl<E> Clone for Registration<E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            listener: Rc::clone(&self.listener),
            once: self.once,
        }
    }
}

fn same_listener<E>(a: &Listener<E>, b: &Listener<E>) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

pub struct EventBus<E: Event> {
    // Kinds keep first-registration order so `event_types` is stable.
    listeners: RefCell<Vec<(E::Kind, Vec<Registration<E>>)>>,
    next_id: Cell<u64>,
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(1),
        }
    }
}

impl<E: Event> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a shared listener. Registering the same `Rc` again for the
    /// same kind returns the id it already has.
    pub fn subscribe(&self, kind: E::Kind, listener: Listener<E>) -> ListenerId {
        self.register(kind, listener, false)
    }

    /// Registers a closure.
    pub fn on<F>(&self, kind: E::Kind, f: F) -> ListenerId
    where
        F: Fn(&E) -> ListenerResult + 'static,
    {
        self.register(kind, Rc::new(f), false)
    }

    /// Registers a closure that is dropped after its first delivery.
    pub fn once<F>(&self, kind: E::Kind, f: F) -> ListenerId
    where
        F: Fn(&E) -> ListenerResult + 'static,
    {
        self.register(kind, Rc::new(f), true)
    }

    fn register(&self, kind: E::Kind, listener: Listener<E>, once: bool) -> ListenerId {
        let mut listeners = self.listeners.borrow_mut();
        let slot = match listeners.iter().position(|(k, _)| *k == kind) {
            Some(pos) => &mut listeners[pos].1,
            None => {
                listeners.push((kind, Vec::new()));
                let last = listeners.len() - 1;
                &mut listeners[last].1
            }
        };

        if let Some(existing) = slot
            .iter()
            .find(|reg| same_listener(&reg.listener, &listener))
        {
            return existing.id;
        }

        let id = ListenerId(self.next_id.get());
        self.next_id.set(id.0 + 1);
        slot.push(Registration { id, listener, once });
        id
    }

    pub fn unsubscribe(&self, kind: E::Kind, id: ListenerId) -> bool {
        self.remove_where(kind, |reg| reg.id == id)
    }

    pub fn unsubscribe_listener(&self, kind: E::Kind, listener: &Listener<E>) -> bool {
        self.remove_where(kind, |reg| same_listener(&reg.listener, listener))
    }

    fn remove_where(&self, kind: E::Kind, pred: impl Fn(&Registration<E>) -> bool) -> bool {
        let mut listeners = self.listeners.borrow_mut();
        let Some(pos) = listeners.iter().position(|(k, _)| *k == kind) else {
            return false;
        };
        let regs = &mut listeners[pos].1;
        let before = regs.len();
        regs.retain(|reg| !pred(reg));
        let removed = regs.len() != before;
        if regs.is_empty() {
            listeners.remove(pos);
        }
        removed
    }

    /// Delivers `event` to every listener of its kind. Returns how many
    /// listeners ran to completion without error.
    pub fn publish(&self, event: &E) -> usize {
        let kind = event.kind();
        let snapshot: Vec<Registration<E>> = {
            let listeners = self.listeners.borrow();
            match listeners.iter().find(|(k, _)| *k == kind) {
                Some((_, regs)) => regs.clone(),
                None => return 0,
            }
        };

        for reg in snapshot.iter().filter(|reg| reg.once) {
            self.unsubscribe(kind, reg.id);
        }

        let mut delivered = 0;
        for reg in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| (reg.listener)(event))) {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(err)) => {
                    tracing::warn!("listener {:?} for {:?} failed: {}", reg.id, kind, err);
                }
                Err(_) => {
                    tracing::error!("listener {:?} for {:?} panicked", reg.id, kind);
                }
            }
        }
        delivered
    }

    pub fn listener_count(&self, kind: E::Kind) -> usize {
        self.listeners
            .borrow()
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, regs)| regs.len())
            .unwrap_or(0)
    }

    /// Kinds that currently have at least one listener.
    pub fn event_types(&self) -> Vec<E::Kind> {
        self.listeners.borrow().iter().map(|(k, _)| *k).collect()
    }

    pub fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum Kind {
        Ping,
        Pong,
    }

    #[derive(Debug)]
    struct Msg(Kind, u32);

    impl Event for Msg {
        type Kind = Kind;
        fn kind(&self) -> Kind {
            self.0
        }
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Listener<Msg>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_for = log.clone();
        let make = move |name: &str| -> Listener<Msg> {
            let log = log_for.clone();
            let name = name.to_string();
            Rc::new(move |msg: &Msg| -> ListenerResult {
                log.borrow_mut().push(format!("{}:{}", name, msg.1));
                Ok(())
            })
        };
        (log, make)
    }

    #[test]
    fn test_delivers_in_registration_order() {
        let bus = EventBus::<Msg>::new();
        let (log, make) = recorder();
        bus.subscribe(Kind::Ping, make("a"));
        bus.subscribe(Kind::Ping, make("b"));
        bus.subscribe(Kind::Pong, make("c"));

        assert_eq!(bus.publish(&Msg(Kind::Ping, 1)), 2);
        assert_eq!(*log.borrow(), vec!["a:1", "b:1"]);
    }

    #[test]
    fn test_same_listener_is_stored_once() {
        let bus = EventBus::<Msg>::new();
        let (log, make) = recorder();
        let listener = make("a");
        let first = bus.subscribe(Kind::Ping, listener.clone());
        let second = bus.subscribe(Kind::Ping, listener.clone());
        assert_eq!(first, second);
        assert_eq!(bus.listener_count(Kind::Ping), 1);

        bus.publish(&Msg(Kind::Ping, 7));
        assert_eq!(log.borrow().len(), 1);

        assert!(bus.unsubscribe_listener(Kind::Ping, &listener));
        assert_eq!(bus.listener_count(Kind::Ping), 0);
    }

    #[test]
    fn test_failing_listener_does_not_stop_others() {
        let bus = EventBus::<Msg>::new();
        let (log, make) = recorder();
        bus.on(Kind::Ping, |_| Err("boom".into()));
        bus.on(Kind::Ping, |_| panic!("listener panic"));
        bus.subscribe(Kind::Ping, make("after"));

        assert_eq!(bus.publish(&Msg(Kind::Ping, 3)), 1);
        assert_eq!(*log.borrow(), vec!["after:3"]);
    }

    #[test]
    fn test_once_listener_fires_once() {
        let bus = EventBus::<Msg>::new();
        let hits = Rc::new(Cell::new(0));
        let h = hits.clone();
        bus.once(Kind::Ping, move |_| {
            h.set(h.get() + 1);
            Ok(())
        });
        bus.publish(&Msg(Kind::Ping, 1));
        bus.publish(&Msg(Kind::Ping, 2));
        assert_eq!(hits.get(), 1);
        assert_eq!(bus.listener_count(Kind::Ping), 0);
    }

    #[test]
    fn test_unsubscribe_by_id() {
        let bus = EventBus::<Msg>::new();
        let id = bus.on(Kind::Ping, |_| Ok(()));
        assert!(bus.unsubscribe(Kind::Ping, id));
        assert!(!bus.unsubscribe(Kind::Ping, id));
        assert!(bus.event_types().is_empty());
    }

    #[test]
    fn test_listeners_may_mutate_bus_during_dispatch() {
        let bus = Rc::new(EventBus::<Msg>::new());
        let (log, make) = recorder();
        let late = make("late");

        let weak = Rc::downgrade(&bus);
        bus.on(Kind::Ping, move |msg: &Msg| {
            if let Some(bus) = weak.upgrade() {
                bus.subscribe(Kind::Ping, late.clone());
                bus.publish(&Msg(Kind::Pong, msg.1 + 1));
            }
            Ok(())
        });
        bus.subscribe(Kind::Pong, make("pong"));

        bus.publish(&Msg(Kind::Ping, 1));
        // The listener added mid-dispatch is not part of the running snapshot.
        assert_eq!(*log.borrow(), vec!["pong:2"]);

        bus.publish(&Msg(Kind::Ping, 5));
        assert_eq!(*log.borrow(), vec!["pong:2", "pong:6", "late:5"]);
    }

    #[test]
    fn test_introspection_and_clear() {
        let bus = EventBus::<Msg>::new();
        bus.on(Kind::Pong, |_| Ok(()));
        bus.on(Kind::Ping, |_| Ok(()));
        assert_eq!(bus.event_types(), vec![Kind::Pong, Kind::Ping]);
        bus.clear();
        assert!(bus.event_types().is_empty());
        assert_eq!(bus.publish(&Msg(Kind::Ping, 0)), 0);
    }
}
