//! Simulation outcome summary and export of cloudlet records.

use std::fmt::{Display, Formatter};
use std::fs::File;

use serde::Serialize;

use crate::core::cloudlet::Cloudlet;
use crate::core::error::CloudSimError;

/// Counters describing the outcome of a simulation for a single broker.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub vms_submitted: usize,
    pub vms_placed: usize,
    pub vms_unplaced: usize,
    pub cloudlets_submitted: usize,
    pub cloudlets_finished: usize,
    pub cloudlets_failed: usize,
    pub cloudlets_unfinished: usize,
}

impl SimulationSummary {
    /// Sums up summaries of several brokers.
    pub fn merge(mut self, other: &SimulationSummary) -> Self {
        self.vms_submitted += other.vms_submitted;
        self.vms_placed += other.vms_placed;
        self.vms_unplaced += other.vms_unplaced;
        self.cloudlets_submitted += other.cloudlets_submitted;
        self.cloudlets_finished += other.cloudlets_finished;
        self.cloudlets_failed += other.cloudlets_failed;
        self.cloudlets_unfinished += other.cloudlets_unfinished;
        self
    }
}

impl Display for SimulationSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vms: {} submitted, {} placed, {} unplaced; cloudlets: {} submitted, {} finished, {} failed, {} unfinished",
            self.vms_submitted,
            self.vms_placed,
            self.vms_unplaced,
            self.cloudlets_submitted,
            self.cloudlets_finished,
            self.cloudlets_failed,
            self.cloudlets_unfinished
        )
    }
}

#[derive(Serialize)]
struct CloudletRecord {
    cloudlet_id: u32,
    status: String,
    broker_id: Option<u32>,
    vm_id: Option<u32>,
    host_id: Option<u32>,
    length: f64,
    finished_length: f64,
    pes: u32,
    submission_time: Option<f64>,
    exec_start_time: Option<f64>,
    finish_time: Option<f64>,
    cpu_time: Option<f64>,
}

impl From<&Cloudlet> for CloudletRecord {
    fn from(cloudlet: &Cloudlet) -> Self {
        Self {
            cloudlet_id: cloudlet.id,
            status: cloudlet.status().to_string(),
            broker_id: cloudlet.broker_id,
            vm_id: cloudlet.vm_id,
            host_id: cloudlet.host_id,
            length: cloudlet.length,
            finished_length: cloudlet.finished_length(),
            pes: cloudlet.pes,
            submission_time: cloudlet.submission_time(),
            exec_start_time: cloudlet.exec_start_time(),
            finish_time: cloudlet.finish_time(),
            cpu_time: cloudlet.actual_cpu_time(),
        }
    }
}

/// Writes one CSV row per cloudlet to the specified file.
pub fn save_cloudlet_records<'a, I>(path: &str, cloudlets: I) -> Result<(), CloudSimError>
where
    I: IntoIterator<Item = &'a Cloudlet>,
{
    let file = File::create(path)?;
    let mut wtr = csv::Writer::from_writer(file);
    for cloudlet in cloudlets {
        wtr.serialize(CloudletRecord::from(cloudlet))?;
    }
    wtr.flush()?;
    Ok(())
}
