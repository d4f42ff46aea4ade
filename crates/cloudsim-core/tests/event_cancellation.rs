use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

use serde::Serialize;

use cloudsim_core::{cast, Event, EventHandler, EventId, Simulation};

#[derive(Clone, Serialize)]
struct Ping {
    tag: u32,
}

#[derive(Default)]
struct Counter {
    tags: Vec<u32>,
}

impl EventHandler for Counter {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            Ping { tag } => {
                self.tags.push(tag);
            }
        })
    }
}

#[test]
fn test_cancel_single_event() {
    let mut sim = Simulation::new(123);
    let counter = Rc::new(RefCell::new(Counter::default()));
    let id = sim.add_handler("counter", counter.clone());
    let ctx = sim.create_context("client");

    ctx.emit(Ping { tag: 1 }, id, 1.);
    let canceled = ctx.emit(Ping { tag: 2 }, id, 2.);
    ctx.emit(Ping { tag: 3 }, id, 3.);
    ctx.cancel_event(canceled);
    assert_eq!(sim.pending_event_count(), 2);

    sim.step_until_no_events();
    assert_eq!(counter.borrow().tags, vec![1, 3]);
    assert_eq!(sim.time(), 3.);
}

#[test]
fn test_cancel_processed_event_has_no_effect() {
    let mut sim = Simulation::new(123);
    let counter = Rc::new(RefCell::new(Counter::default()));
    let id = sim.add_handler("counter", counter.clone());
    let ctx = sim.create_context("client");

    let first = ctx.emit(Ping { tag: 1 }, id, 1.);
    sim.step();
    ctx.cancel_event(first);
    ctx.emit(Ping { tag: 2 }, id, 1.);
    assert_eq!(sim.pending_event_count(), 1);
    sim.step_until_no_events();
    assert_eq!(counter.borrow().tags, vec![1, 2]);
}

#[test]
fn test_cancel_events_by_predicate() {
    let mut sim = Simulation::new(123);
    let first = Rc::new(RefCell::new(Counter::default()));
    let second = Rc::new(RefCell::new(Counter::default()));
    let first_id = sim.add_handler("first", first.clone());
    let second_id = sim.add_handler("second", second.clone());
    let ctx = sim.create_context("client");

    for tag in 0..4 {
        ctx.emit(Ping { tag }, first_id, tag as f64);
        ctx.emit(Ping { tag }, second_id, tag as f64);
    }
    sim.cancel_events(|e| e.dst == first_id && e.time >= 2.);
    sim.step_until_no_events();

    assert_eq!(first.borrow().tags, vec![0, 1]);
    assert_eq!(second.borrow().tags, vec![0, 1, 2, 3]);
}

#[test]
fn test_remove_handler_cancels_incoming_events() {
    let mut sim = Simulation::new(123);
    let comp1 = sim.add_handler("comp1", Rc::new(RefCell::new(Counter::default())));
    let comp2 = sim.add_handler("comp2", Rc::new(RefCell::new(Counter::default())));
    let ctx = sim.create_context("main");
    ctx.emit_as(Ping { tag: 0 }, comp1, comp2, 0.);
    ctx.emit_as(Ping { tag: 1 }, comp2, comp1, 0.);
    ctx.emit_as(Ping { tag: 2 }, comp2, comp2, 0.);
    ctx.emit_as(Ping { tag: 3 }, comp1, comp1, 0.);

    sim.remove_handler("comp1");

    let left: HashSet<EventId> = sim.drain_events().iter().map(|e| e.id).collect();
    assert_eq!(left, HashSet::from([0, 2]));
    assert_eq!(sim.pending_event_count(), 0);
}

#[test]
fn test_drain_returns_dispatch_order() {
    let mut sim = Simulation::new(123);
    let id = sim.add_handler("counter", Rc::new(RefCell::new(Counter::default())));
    let ctx = sim.create_context("client");
    ctx.emit_with_priority(Ping { tag: 0 }, id, 1., 3);
    ctx.emit_with_priority(Ping { tag: 1 }, id, 1., 1);
    ctx.emit(Ping { tag: 2 }, id, 0.5);

    let drained: Vec<u32> = sim
        .drain_events()
        .into_iter()
        .filter_map(|e| e.data.downcast::<Ping>().ok().map(|p| p.tag))
        .collect();
    assert_eq!(drained, vec![2, 1, 0]);
    assert_eq!(sim.time(), 0.);
    assert!(!sim.step());
}
