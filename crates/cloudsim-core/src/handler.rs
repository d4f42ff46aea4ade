//! Event handling.

use crate::event::Event;

/// Trait for consuming events in simulation components.
pub trait EventHandler {
    /// Processes an event delivered to the component.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::cell::RefCell;
    /// use std::rc::Rc;
    /// use serde::Serialize;
    /// use cloudsim_core::{cast, Event, EventHandler, Simulation};
    ///
    /// #[derive(Clone, Serialize)]
    /// pub struct VmPlaced {
    ///     vm_id: u32,
    ///     host_id: u32,
    /// }
    ///
    /// #[derive(Default)]
    /// pub struct PlacementTracker {
    ///     placements: Vec<(u32, u32)>,
    /// }
    ///
    /// impl EventHandler for PlacementTracker {
    ///     fn on(&mut self, event: Event) {
    ///         cast!(match event.data {
    ///             VmPlaced { vm_id, host_id } => {
    ///                 self.placements.push((vm_id, host_id));
    ///             }
    ///         })
    ///     }
    /// }
    ///
    /// let mut sim = Simulation::new(123);
    /// let datacenter = sim.create_context("datacenter");
    /// let tracker = Rc::new(RefCell::new(PlacementTracker::default()));
    /// let tracker_id = sim.add_handler("tracker", tracker.clone());
    /// datacenter.emit(VmPlaced { vm_id: 3, host_id: 0 }, tracker_id, 0.5);
    /// sim.step_until_no_events();
    /// assert_eq!(tracker.borrow().placements, vec![(3, 0)]);
    /// ```
    fn on(&mut self, event: Event);
}

/// Dispatches an event to the first match arm whose struct type equals the payload type.
///
/// Each arm destructures the downcast [`EventData`](crate::event::EventData) payload. A payload matching
/// no arm is logged as an unhandled event at the error level.
#[macro_export]
macro_rules! cast {
    ( match $event:ident.data { $( $type:ident { $($tt:tt)* } => { $($expr:tt)* } )+ } ) => {
        $(
            if $event.data.is::<$type>() {
                if let Ok(__value) = $event.data.downcast::<$type>() {
                    let $type { $($tt)* } = *__value;
                    $($expr)*
                }
            } else
        )*
        {
            $crate::log::log_unhandled_event($event);
        }
    }
}
