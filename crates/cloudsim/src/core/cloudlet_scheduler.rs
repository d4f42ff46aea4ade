//! Sharing of VM processing capacity among cloudlets.

use std::collections::VecDeque;

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::cloudlet_schedulers::space_shared::SpaceSharedCloudletScheduler;
use crate::core::cloudlet_schedulers::time_shared::TimeSharedCloudletScheduler;
use crate::core::common::VmCapacity;
use crate::core::config::options::parse_config_value;
use crate::core::error::CloudSimError;

/// Cloudlets of a single VM grouped by their scheduling state.
#[derive(Default)]
pub struct CloudletSchedulerState {
    pub executing: Vec<Cloudlet>,
    pub waiting: VecDeque<Cloudlet>,
    pub paused: Vec<Cloudlet>,
    pub finished: Vec<Cloudlet>,
    pub last_update: f64,
}

/// Trait for implementation of cloudlet schedulers.
///
/// A scheduler defines two things: the processing rate of each executing cloudlet and the rule for
/// admitting waiting cloudlets. The progress accounting is shared by all schedulers and is implemented
/// by the provided methods.
///
/// Progress is settled lazily: [`update_processing`](Self::update_processing) advances every executing
/// cloudlet from the previous update time to the given time, using the rates and the CPU utilization
/// observed at the start of that interval. Capacity freed by cloudlets finished within the interval is
/// handed out only at the end of it.
pub trait CloudletScheduler {
    fn state(&self) -> &CloudletSchedulerState;

    fn state_mut(&mut self) -> &mut CloudletSchedulerState;

    /// Returns the MIPS rate of an executing cloudlet at full CPU utilization.
    fn execution_rate(&self, cloudlet: &Cloudlet, capacity: &VmCapacity) -> f64;

    /// Moves waiting cloudlets to the executing set.
    fn admit_waiting(&mut self, time: f64, capacity: &VmCapacity);

    /// Returns `false` if the cloudlet can never run on the VM with the given capacity.
    fn accepts(&self, _cloudlet: &Cloudlet, _capacity: &VmCapacity) -> bool {
        true
    }

    fn name(&self) -> &str;

    /// Enqueues a cloudlet. It starts executing on the next update.
    fn submit(&mut self, mut cloudlet: Cloudlet, time: f64, capacity: &VmCapacity) {
        if self.accepts(&cloudlet, capacity) {
            cloudlet.set_submitted(time);
            self.state_mut().waiting.push_back(cloudlet);
        } else {
            cloudlet.fail(time);
            self.state_mut().finished.push(cloudlet);
        }
    }

    /// Advances executing cloudlets to `time`, collects finished ones and admits waiting ones.
    ///
    /// Returns the number of cloudlets finished by this call.
    fn update_processing(&mut self, time: f64, capacity: &VmCapacity) -> usize {
        let interval_start = self.state().last_update;
        let dt = (time - interval_start).max(0.);
        let mut finished = 0;
        let progress: Vec<f64> = self
            .state()
            .executing
            .iter()
            .map(|c| {
                let rate = self.execution_rate(c, capacity) * c.cpu_utilization(interval_start);
                // matches the estimate of next_completion_time exactly
                if rate > 0. && interval_start + c.remaining_length() / rate <= time {
                    c.remaining_length()
                } else {
                    rate * dt
                }
            })
            .collect();
        let state = self.state_mut();
        for (cloudlet, length) in state.executing.iter_mut().zip(progress) {
            cloudlet.add_progress(length);
        }
        let mut i = 0;
        while i < state.executing.len() {
            if state.executing[i].add_progress(0.) {
                let mut cloudlet = state.executing.remove(i);
                cloudlet.finish(time);
                state.finished.push(cloudlet);
                finished += 1;
            } else {
                i += 1;
            }
        }
        state.last_update = time;
        self.admit_waiting(time, capacity);
        finished
    }

    /// Estimates the earliest time some executing cloudlet finishes if nothing changes.
    fn next_completion_time(&self, capacity: &VmCapacity) -> Option<f64> {
        let state = self.state();
        state
            .executing
            .iter()
            .filter_map(|c| {
                let rate = self.execution_rate(c, capacity) * c.cpu_utilization(state.last_update);
                if rate > 0. {
                    Some(state.last_update + c.remaining_length() / rate)
                } else {
                    None
                }
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    fn take_finished(&mut self) -> Vec<Cloudlet> {
        std::mem::take(&mut self.state_mut().finished)
    }

    /// Removes the cloudlet from the scheduler and marks it as failed.
    fn cancel(&mut self, cloudlet_id: u32, time: f64) -> Option<Cloudlet> {
        let state = self.state_mut();
        let mut cloudlet = if let Some(pos) = state.executing.iter().position(|c| c.id == cloudlet_id) {
            state.executing.remove(pos)
        } else if let Some(pos) = state.waiting.iter().position(|c| c.id == cloudlet_id) {
            state.waiting.remove(pos)?
        } else if let Some(pos) = state.paused.iter().position(|c| c.id == cloudlet_id) {
            state.paused.remove(pos)
        } else {
            return None;
        };
        cloudlet.fail(time);
        Some(cloudlet)
    }

    /// Suspends an executing or waiting cloudlet, releasing its PEs.
    fn pause(&mut self, cloudlet_id: u32) -> bool {
        let state = self.state_mut();
        let mut cloudlet = if let Some(pos) = state.executing.iter().position(|c| c.id == cloudlet_id) {
            state.executing.remove(pos)
        } else if let Some(pos) = state.waiting.iter().position(|c| c.id == cloudlet_id) {
            match state.waiting.remove(pos) {
                Some(cloudlet) => cloudlet,
                None => return false,
            }
        } else {
            return false;
        };
        cloudlet.set_status(CloudletStatus::Paused);
        state.paused.push(cloudlet);
        true
    }

    /// Puts a paused cloudlet back to the waiting queue.
    fn resume(&mut self, cloudlet_id: u32) -> bool {
        let state = self.state_mut();
        match state.paused.iter().position(|c| c.id == cloudlet_id) {
            Some(pos) => {
                let mut cloudlet = state.paused.remove(pos);
                cloudlet.set_status(CloudletStatus::Waiting);
                state.waiting.push_back(cloudlet);
                true
            }
            None => false,
        }
    }

    /// Removes all cloudlets from the scheduler keeping their status.
    fn drain(&mut self) -> Vec<Cloudlet> {
        let state = self.state_mut();
        let mut cloudlets: Vec<Cloudlet> = state.finished.drain(..).collect();
        cloudlets.extend(state.executing.drain(..));
        cloudlets.extend(state.waiting.drain(..));
        cloudlets.extend(state.paused.drain(..));
        cloudlets
    }

    fn find(&self, cloudlet_id: u32) -> Option<&Cloudlet> {
        let state = self.state();
        state
            .executing
            .iter()
            .chain(state.waiting.iter())
            .chain(state.paused.iter())
            .chain(state.finished.iter())
            .find(|c| c.id == cloudlet_id)
    }

    fn executing(&self) -> &[Cloudlet] {
        &self.state().executing
    }

    fn executing_count(&self) -> usize {
        self.state().executing.len()
    }

    fn waiting_count(&self) -> usize {
        self.state().waiting.len()
    }

    fn paused_count(&self) -> usize {
        self.state().paused.len()
    }

    /// Number of PEs requested by executing cloudlets.
    fn used_pes(&self) -> u32 {
        self.state().executing.iter().map(|c| c.pes).sum()
    }

    /// Returns `true` if the scheduler holds no cloudlets which may still run.
    fn is_idle(&self) -> bool {
        let state = self.state();
        state.executing.is_empty() && state.waiting.is_empty() && state.paused.is_empty()
    }

    /// Sum of RAM utilization fractions of executing cloudlets.
    fn ram_utilization(&self, time: f64) -> f64 {
        self.state().executing.iter().map(|c| c.ram_utilization(time)).sum()
    }

    /// Sum of bandwidth utilization fractions of executing cloudlets.
    fn bw_utilization(&self, time: f64) -> f64 {
        self.state().executing.iter().map(|c| c.bw_utilization(time)).sum()
    }
}

/// Creates cloudlet scheduler by its name (`SpaceShared` or `TimeShared`).
pub fn cloudlet_scheduler_resolver(config_str: &str) -> Result<Box<dyn CloudletScheduler>, CloudSimError> {
    let (name, _options) = parse_config_value(config_str);
    match name.as_str() {
        "SpaceShared" => Ok(Box::new(SpaceSharedCloudletScheduler::new())),
        "TimeShared" => Ok(Box::new(TimeSharedCloudletScheduler::new())),
        _ => Err(CloudSimError::Config(format!("Can't resolve cloudlet scheduler: {}", config_str))),
    }
}
