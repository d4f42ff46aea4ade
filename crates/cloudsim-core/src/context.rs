//! Per-component handle to the simulation.

use std::cell::RefCell;
use std::rc::Rc;

use rand::distributions::uniform::{SampleRange, SampleUniform};
use rand::prelude::Distribution;

use crate::component::Id;
use crate::event::{EventData, EventId, EventPriority, DEFAULT_PRIORITY};
use crate::state::SimulationState;

/// Handle through which a component (datacenter, broker, ...) reads the clock and schedules events.
///
/// Every event emitted through the context carries the component id as its source.
pub struct SimulationContext {
    id: Id,
    name: String,
    sim_state: Rc<RefCell<SimulationState>>,
    names: Rc<RefCell<Vec<String>>>,
}

impl SimulationContext {
    pub(crate) fn new(
        id: Id,
        name: &str,
        sim_state: Rc<RefCell<SimulationState>>,
        names: Rc<RefCell<Vec<String>>>,
    ) -> Self {
        Self {
            id,
            name: name.to_owned(),
            sim_state,
            names,
        }
    }

    /// Returns the identifier of component associated with this context.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Returns the name of component associated with this context.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> f64 {
        self.sim_state.borrow().time()
    }

    /// Returns a random float in `[0, 1)` from the simulation-wide generator.
    pub fn rand(&mut self) -> f64 {
        self.sim_state.borrow_mut().rand()
    }

    /// Returns a random value in the range from the simulation-wide generator.
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: SampleUniform,
        R: SampleRange<T>,
    {
        self.sim_state.borrow_mut().gen_range(range)
    }

    /// Samples the distribution with the simulation-wide generator.
    pub fn sample_from_distribution<T, Dist: Distribution<T>>(&mut self, dist: &Dist) -> T {
        self.sim_state.borrow_mut().sample_from_distribution(dist)
    }

    /// Creates new event with specified payload, destination and delay.
    pub fn emit<T>(&self, data: T, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.emit_with_priority(data, dst, delay, DEFAULT_PRIORITY)
    }

    /// Creates new immediate (zero-delay) event with specified payload and destination.
    pub fn emit_now<T>(&self, data: T, dst: Id) -> EventId
    where
        T: EventData,
    {
        self.emit_with_priority(data, dst, 0., DEFAULT_PRIORITY)
    }

    /// Creates new event for itself with specified payload and delay.
    pub fn emit_self<T>(&self, data: T, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.emit_with_priority(data, self.id, delay, DEFAULT_PRIORITY)
    }

    /// Creates new immediate event for itself with specified payload.
    pub fn emit_self_now<T>(&self, data: T) -> EventId
    where
        T: EventData,
    {
        self.emit_with_priority(data, self.id, 0., DEFAULT_PRIORITY)
    }

    /// Creates new event with specified payload, source, destination and delay.
    pub fn emit_as<T>(&self, data: T, src: Id, dst: Id, delay: f64) -> EventId
    where
        T: EventData,
    {
        self.schedule(data, src, dst, delay, DEFAULT_PRIORITY)
    }

    /// Creates new event with specified payload, destination, delay and dispatch priority.
    ///
    /// Among events scheduled at the same time, the ones with lower priority value are processed first.
    pub fn emit_with_priority<T>(&self, data: T, dst: Id, delay: f64, priority: EventPriority) -> EventId
    where
        T: EventData,
    {
        self.schedule(data, self.id, dst, delay, priority)
    }

    /// Creates new event for itself with specified payload, delay and dispatch priority.
    pub fn emit_self_with_priority<T>(&self, data: T, delay: f64, priority: EventPriority) -> EventId
    where
        T: EventData,
    {
        self.emit_with_priority(data, self.id, delay, priority)
    }

    /// Cancels the specified event.
    ///
    /// Canceling an event which has already been processed has no effect.
    pub fn cancel_event(&self, id: EventId) {
        self.sim_state.borrow_mut().cancel_event(id);
    }

    fn schedule<T: EventData>(&self, data: T, src: Id, dst: Id, delay: f64, priority: EventPriority) -> EventId {
        self.sim_state.borrow_mut().add_event(data, src, dst, delay, priority)
    }

    /// Lookup component name by its identifier.
    pub fn lookup_name(&self, id: Id) -> String {
        self.names.borrow()[id as usize].clone()
    }
}
