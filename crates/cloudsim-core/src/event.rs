//! Simulation events.

use std::cmp::Ordering;

use downcast_rs::{impl_downcast, Downcast};
use serde::ser::Serialize;

use crate::component::Id;

/// Event identifier, equal to the event's insertion sequence number.
pub type EventId = u64;

/// Dispatch priority of events scheduled at the same time.
///
/// Among events with equal timestamps, the event with the lower priority value is processed first.
pub type EventPriority = i32;

/// Priority assigned to events emitted without explicit priority.
pub const DEFAULT_PRIORITY: EventPriority = 0;

/// Trait that should be implemented by event payload.
pub trait EventData: Downcast + erased_serde::Serialize {}

impl_downcast!(EventData);

erased_serde::serialize_trait_object!(EventData);

impl<T: Serialize + 'static> EventData for T {}

/// Representation of event.
pub struct Event {
    /// Unique event identifier.
    ///
    /// Events are numbered sequentially starting from 0, so the identifier also gives the insertion order.
    pub id: EventId,
    /// Time of event occurrence.
    pub time: f64,
    /// Dispatch priority among events with the same time.
    pub priority: EventPriority,
    /// Identifier of event source.
    pub src: Id,
    /// Identifier of event destination.
    pub dst: Id,
    /// Event payload.
    pub data: Box<dyn EventData>,
}

impl Event {
    fn key_cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.priority.cmp(&other.priority))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl Eq for Event {}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

// Inverted to make BinaryHeap pop the earliest event.
impl Ord for Event {
    fn cmp(&self, other: &Self) -> Ordering {
        other.key_cmp(self)
    }
}

impl PartialOrd for Event {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
