//! Time-shared cloudlet scheduler.

use crate::core::cloudlet::Cloudlet;
use crate::core::cloudlet_scheduler::{CloudletScheduler, CloudletSchedulerState};
use crate::core::common::VmCapacity;

/// Runs all submitted cloudlets concurrently.
///
/// When cloudlets request more PEs than the VM has, the VM capacity is divided among them
/// proportionally to their PE counts.
#[derive(Default)]
pub struct TimeSharedCloudletScheduler {
    state: CloudletSchedulerState,
}

impl TimeSharedCloudletScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CloudletScheduler for TimeSharedCloudletScheduler {
    fn state(&self) -> &CloudletSchedulerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut CloudletSchedulerState {
        &mut self.state
    }

    fn execution_rate(&self, cloudlet: &Cloudlet, capacity: &VmCapacity) -> f64 {
        let requested = self.used_pes();
        let share = if requested > capacity.pes {
            capacity.pes as f64 / requested as f64
        } else {
            1.
        };
        capacity.mips * cloudlet.pes as f64 * share
    }

    fn admit_waiting(&mut self, time: f64, _capacity: &VmCapacity) {
        while let Some(mut cloudlet) = self.state.waiting.pop_front() {
            cloudlet.start(time);
            self.state.executing.push(cloudlet);
        }
    }

    fn name(&self) -> &str {
        "TimeShared"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cloudlet::CloudletStatus;
    use crate::core::utilization_model::FullUtilization;

    #[test]
    fn test_oversubscribed_share() {
        let capacity = VmCapacity { pes: 2, mips: 1000. };
        let mut scheduler = TimeSharedCloudletScheduler::new();
        for id in 0..2 {
            scheduler.submit(Cloudlet::new(id, 3000., 2, Box::new(FullUtilization::new())), 0., &capacity);
        }
        scheduler.update_processing(0., &capacity);
        assert_eq!(scheduler.executing_count(), 2);
        assert_eq!(scheduler.next_completion_time(&capacity), Some(3.));
        scheduler.update_processing(3., &capacity);
        let finished = scheduler.take_finished();
        assert_eq!(finished.len(), 2);
        assert!(finished.iter().all(|c| c.status() == CloudletStatus::Finished));
    }
}
