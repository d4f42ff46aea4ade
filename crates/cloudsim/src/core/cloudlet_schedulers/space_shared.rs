//! Space-shared cloudlet scheduler.

use std::collections::{HashSet, VecDeque};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_scheduler::{CloudletScheduler, CloudletSchedulerState};
use crate::core::common::VmCapacity;

/// Gives each executing cloudlet dedicated VM PEs.
///
/// Waiting cloudlets are considered in order of decreasing priority and then arrival. Every cloudlet
/// which fits into the currently free PEs is started. A waiting cloudlet with strictly higher priority
/// than some executing ones preempts them if that frees enough PEs. Preempted cloudlets keep their
/// progress and rejoin the scan ahead of waiting cloudlets with equal priority. While a preempted
/// cloudlet cannot restart, cloudlets with lower priority are not started in its place.
#[derive(Default)]
pub struct SpaceSharedCloudletScheduler {
    state: CloudletSchedulerState,
    // preempted cloudlets which have not restarted yet
    preempted: HashSet<u32>,
}

impl SpaceSharedCloudletScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn free_pes(&self, capacity: &VmCapacity) -> u32 {
        capacity.pes.saturating_sub(self.used_pes())
    }

    /// Preempts lower priority cloudlets to make room for `needed` PEs.
    fn preempt_for(&mut self, priority: i32, needed: u32, capacity: &VmCapacity) -> bool {
        let reclaimable: u32 = self
            .state
            .executing
            .iter()
            .filter(|c| c.priority < priority)
            .map(|c| c.pes)
            .sum();
        if self.free_pes(capacity) + reclaimable < needed {
            return false;
        }
        while self.free_pes(capacity) < needed {
            // lowest priority first, latest started among equal
            let victim = self
                .state
                .executing
                .iter()
                .enumerate()
                .filter(|(_, c)| c.priority < priority)
                .min_by(|(i, a), (j, b)| a.priority.cmp(&b.priority).then(j.cmp(i)))
                .map(|(i, _)| i);
            match victim {
                Some(i) => {
                    let mut cloudlet = self.state.executing.remove(i);
                    cloudlet.set_status(CloudletStatus::Waiting);
                    self.state.waiting.push_front(cloudlet);
                }
                None => return false,
            }
        }
        true
    }
}

impl CloudletScheduler for SpaceSharedCloudletScheduler {
    fn state(&self) -> &CloudletSchedulerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CloudletSchedulerState {
        &mut self.state
    }

    fn execution_rate(&self, cloudlet: &Cloudlet, capacity: &VmCapacity) -> f64 {
        capacity.mips * cloudlet.pes as f64
    }

    fn admit_waiting(&mut self, time: f64, capacity: &VmCapacity) {
        if self.state.waiting.is_empty() {
            return;
        }
        let mut queue: VecDeque<Cloudlet> = self.state.waiting.drain(..).collect();
        queue.make_contiguous().sort_by(|a, b| b.priority.cmp(&a.priority));

        let mut rest = Vec::new();
        // highest priority among preempted cloudlets which could not restart
        let mut blocked_priority: Option<i32> = None;
        while let Some(mut cloudlet) = queue.pop_front() {
            if blocked_priority.map_or(false, |p| cloudlet.priority < p) {
                rest.push(cloudlet);
                continue;
            }
            let fits = cloudlet.pes <= self.free_pes(capacity)
                || self.preempt_for(cloudlet.priority, cloudlet.pes, capacity);
            if fits {
                self.preempted.remove(&cloudlet.id);
                cloudlet.start(time);
                self.state.executing.push(cloudlet);
                // preempted cloudlets compete for the remaining PEs ahead of equal priority ones
                while let Some(victim) = self.state.waiting.pop_back() {
                    self.preempted.insert(victim.id);
                    let pos = queue
                        .iter()
                        .position(|c| c.priority <= victim.priority)
                        .unwrap_or(queue.len());
                    queue.insert(pos, victim);
                }
            } else {
                if self.preempted.contains(&cloudlet.id) {
                    blocked_priority = Some(blocked_priority.map_or(cloudlet.priority, |p| p.max(cloudlet.priority)));
                }
                rest.push(cloudlet);
            }
        }
        self.state.waiting.extend(rest);
    }

    fn accepts(&self, cloudlet: &Cloudlet, capacity: &VmCapacity) -> bool {
        cloudlet.pes <= capacity.pes
    }

    fn name(&self) -> &str {
        "SpaceShared"
    }
}
