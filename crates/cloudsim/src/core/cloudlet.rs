//! Representation of cloudlet and its status.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::core::utilization_model::UtilizationModel;

/// Status of cloudlet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum CloudletStatus {
    Instantiated,
    Waiting,
    Executing,
    Paused,
    Finished,
    Failed,
}

impl Display for CloudletStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            CloudletStatus::Instantiated => write!(f, "instantiated"),
            CloudletStatus::Waiting => write!(f, "waiting"),
            CloudletStatus::Executing => write!(f, "executing"),
            CloudletStatus::Paused => write!(f, "paused"),
            CloudletStatus::Finished => write!(f, "finished"),
            CloudletStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Relative tolerance used to decide that a cloudlet has processed its whole length.
const LENGTH_TOLERANCE: f64 = 1e-9;

/// Workload unit executed on a VM.
///
// Length is measured in millions of instructions, so a cloudlet of length `L` running on `p` PEs
// of `m` MIPS each with full CPU utilization finishes in `L / (p * m)` time units.
#[derive(Clone, Serialize)]
pub struct Cloudlet {
    pub id: u32,
    pub length: f64,
    pub pes: u32,
    pub file_size: u64,
    pub output_size: u64,
    /// Higher value means higher priority for space-shared scheduling.
    pub priority: i32,
    pub broker_id: Option<u32>,
    pub vm_id: Option<u32>,
    pub host_id: Option<u32>,
    status: CloudletStatus,
    finished_length: f64,
    submission_time: Option<f64>,
    exec_start_time: Option<f64>,
    finish_time: Option<f64>,
    #[serde(skip)]
    cpu_model: Box<dyn UtilizationModel>,
    #[serde(skip)]
    ram_model: Box<dyn UtilizationModel>,
    #[serde(skip)]
    bw_model: Box<dyn UtilizationModel>,
}

impl Cloudlet {
    /// Creates cloudlet which uses the same utilization model for CPU, RAM and bandwidth.
    pub fn new(id: u32, length: f64, pes: u32, utilization_model: Box<dyn UtilizationModel>) -> Self {
        Self {
            id,
            length,
            pes: pes.max(1),
            file_size: 0,
            output_size: 0,
            priority: 0,
            broker_id: None,
            vm_id: None,
            host_id: None,
            status: CloudletStatus::Instantiated,
            finished_length: 0.,
            submission_time: None,
            exec_start_time: None,
            finish_time: None,
            cpu_model: utilization_model.clone(),
            ram_model: utilization_model.clone(),
            bw_model: utilization_model,
        }
    }

    pub fn with_file_size(mut self, file_size: u64) -> Self {
        self.file_size = file_size;
        self
    }

    pub fn with_output_size(mut self, output_size: u64) -> Self {
        self.output_size = output_size;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Binds the cloudlet to the specified VM, so the broker won't map it elsewhere.
    pub fn with_vm(mut self, vm_id: u32) -> Self {
        self.vm_id = Some(vm_id);
        self
    }

    pub fn with_cpu_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.cpu_model = model;
        self
    }

    pub fn with_ram_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.ram_model = model;
        self
    }

    pub fn with_bw_model(mut self, model: Box<dyn UtilizationModel>) -> Self {
        self.bw_model = model;
        self
    }

    pub fn status(&self) -> CloudletStatus {
        self.status
    }

    pub fn finished_length(&self) -> f64 {
        self.finished_length
    }

    pub fn remaining_length(&self) -> f64 {
        (self.length - self.finished_length).max(0.)
    }

    pub fn is_finished(&self) -> bool {
        self.status == CloudletStatus::Finished
    }

    pub fn submission_time(&self) -> Option<f64> {
        self.submission_time
    }

    pub fn exec_start_time(&self) -> Option<f64> {
        self.exec_start_time
    }

    pub fn finish_time(&self) -> Option<f64> {
        self.finish_time
    }

    /// Time between the first start of execution and finish.
    pub fn actual_cpu_time(&self) -> Option<f64> {
        Some(self.finish_time? - self.exec_start_time?)
    }

    /// Time elapsed since the cloudlet started executing, zero if it never started.
    pub fn elapsed(&self, time: f64) -> f64 {
        self.exec_start_time.map_or(0., |start| (time - start).max(0.))
    }

    pub fn cpu_utilization(&self, time: f64) -> f64 {
        self.cpu_model.utilization(self.elapsed(time)).clamp(0., 1.)
    }

    pub fn ram_utilization(&self, time: f64) -> f64 {
        self.ram_model.utilization(self.elapsed(time)).clamp(0., 1.)
    }

    pub fn bw_utilization(&self, time: f64) -> f64 {
        self.bw_model.utilization(self.elapsed(time)).clamp(0., 1.)
    }

    pub(crate) fn set_status(&mut self, status: CloudletStatus) {
        self.status = status;
    }

    pub(crate) fn set_submitted(&mut self, time: f64) {
        self.submission_time.get_or_insert(time);
        self.status = CloudletStatus::Waiting;
    }

    pub(crate) fn start(&mut self, time: f64) {
        self.exec_start_time.get_or_insert(time);
        self.status = CloudletStatus::Executing;
    }

    /// Adds processed length, returns `true` if the whole length is processed.
    pub(crate) fn add_progress(&mut self, length: f64) -> bool {
        if length > 0. {
            self.finished_length = (self.finished_length + length).min(self.length);
        }
        if self.length - self.finished_length <= self.length.max(1.) * LENGTH_TOLERANCE {
            self.finished_length = self.length;
        }
        self.finished_length >= self.length
    }

    pub(crate) fn finish(&mut self, time: f64) {
        self.status = CloudletStatus::Finished;
        self.finish_time = Some(time);
    }

    pub(crate) fn fail(&mut self, time: f64) {
        self.status = CloudletStatus::Failed;
        self.finish_time = Some(time);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utilization_model::FullUtilization;

    #[test]
    fn test_progress_is_capped() {
        let mut cloudlet = Cloudlet::new(0, 100., 1, Box::new(FullUtilization::new()));
        assert!(!cloudlet.add_progress(40.));
        assert!(!cloudlet.add_progress(-5.));
        assert_eq!(cloudlet.finished_length(), 40.);
        assert!(cloudlet.add_progress(100.));
        assert_eq!(cloudlet.finished_length(), 100.);
        assert_eq!(cloudlet.remaining_length(), 0.);
    }
}
