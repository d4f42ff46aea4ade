use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use cloudsim_core::{cast, Event, EventHandler, Simulation};

#[derive(Clone, Serialize)]
struct Tagged {
    tag: u32,
}

#[derive(Default)]
struct Recorder {
    seen: Vec<(f64, u32)>,
}

impl EventHandler for Recorder {
    fn on(&mut self, event: Event) {
        let time = event.time;
        cast!(match event.data {
            Tagged { tag } => {
                self.seen.push((time, tag));
            }
        })
    }
}

fn setup() -> (Simulation, Rc<RefCell<Recorder>>, u32) {
    let mut sim = Simulation::new(42);
    let recorder = Rc::new(RefCell::new(Recorder::default()));
    let id = sim.add_handler("recorder", recorder.clone());
    (sim, recorder, id)
}

fn tags(recorder: &Rc<RefCell<Recorder>>) -> Vec<u32> {
    recorder.borrow().seen.iter().map(|(_, tag)| *tag).collect()
}

#[test]
fn test_events_follow_time_order() {
    let (mut sim, recorder, id) = setup();
    let ctx = sim.create_context("client");
    ctx.emit(Tagged { tag: 3 }, id, 3.);
    ctx.emit(Tagged { tag: 1 }, id, 1.);
    ctx.emit(Tagged { tag: 2 }, id, 2.);
    sim.step_until_no_events();
    assert_eq!(tags(&recorder), vec![1, 2, 3]);
    assert_eq!(sim.time(), 3.);
}

#[test]
fn test_lower_priority_value_goes_first() {
    let (mut sim, recorder, id) = setup();
    let ctx = sim.create_context("client");
    ctx.emit_with_priority(Tagged { tag: 4 }, id, 1., 4);
    ctx.emit_with_priority(Tagged { tag: 0 }, id, 1., 0);
    ctx.emit_with_priority(Tagged { tag: 2 }, id, 1., 2);
    ctx.emit_with_priority(Tagged { tag: 9 }, id, 0.5, 9);
    sim.step_until_no_events();
    assert_eq!(tags(&recorder), vec![9, 0, 2, 4]);
}

#[test]
fn test_equal_keys_are_fifo() {
    let (mut sim, recorder, id) = setup();
    let ctx = sim.create_context("client");
    for tag in 0..10 {
        ctx.emit_with_priority(Tagged { tag }, id, 1., 1);
    }
    sim.step_until_no_events();
    assert_eq!(tags(&recorder), (0..10).collect::<Vec<_>>());
}

#[test]
fn test_step_until_time() {
    let (mut sim, recorder, id) = setup();
    let ctx = sim.create_context("client");
    ctx.emit(Tagged { tag: 1 }, id, 1.);
    ctx.emit(Tagged { tag: 2 }, id, 2.);
    ctx.emit(Tagged { tag: 5 }, id, 5.);

    assert!(sim.step_until_time(2.));
    assert_eq!(tags(&recorder), vec![1, 2]);
    assert_eq!(sim.time(), 2.);

    assert!(sim.step_for_duration(1.5));
    assert_eq!(sim.time(), 3.5);
    assert_eq!(sim.pending_event_count(), 1);

    assert!(!sim.step_until_time(10.));
    assert_eq!(tags(&recorder), vec![1, 2, 5]);
    assert_eq!(sim.time(), 5.);
}

#[test]
fn test_event_ids_are_sequential() {
    let (mut sim, _recorder, id) = setup();
    let ctx = sim.create_context("client");
    let first = ctx.emit(Tagged { tag: 0 }, id, 1.);
    let second = ctx.emit_now(Tagged { tag: 1 }, id);
    assert_eq!(second, first + 1);
    assert_eq!(sim.event_count(), 2);
    sim.step_until_no_events();
    assert_eq!(sim.pending_event_count(), 0);
    assert_eq!(sim.event_count(), 2);
}

#[test]
#[should_panic]
fn test_negative_delay_is_rejected() {
    let (mut sim, _recorder, id) = setup();
    let ctx = sim.create_context("client");
    ctx.emit(Tagged { tag: 0 }, id, -1.);
}

#[test]
fn test_seeded_random_is_reproducible() {
    let mut first = Simulation::new(7);
    let mut second = Simulation::new(7);
    let a: Vec<f64> = (0..5).map(|_| first.rand()).collect();
    let b: Vec<f64> = (0..5).map(|_| second.rand()).collect();
    assert_eq!(a, b);
    assert!(a.iter().all(|x| (0.0..1.0).contains(x)));
}
