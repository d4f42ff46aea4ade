//! Representations of virtual machine and its status.

use std::fmt::{Display, Formatter};

use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::core::cloudlet_scheduler::CloudletScheduler;
use crate::core::common::Allocation;

/// Status of virtual machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum VmStatus {
    Created,
    Placed,
    CreationFailed,
    Destroyed,
}

impl Display for VmStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            VmStatus::Created => write!(f, "created"),
            VmStatus::Placed => write!(f, "placed"),
            VmStatus::CreationFailed => write!(f, "creation_failed"),
            VmStatus::Destroyed => write!(f, "destroyed"),
        }
    }
}

/// Represents virtual machine (VM).
///
// A VM requests a number of PEs with the given MIPS each, and fixed amounts of RAM, bandwidth and storage.
// Once placed, it runs cloudlets using its own cloudlet scheduler.
pub struct Vm {
    pub id: u32,
    pub mips: f64,
    pub pes: u32,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
    pub broker_id: Option<u32>,
    host_id: Option<u32>,
    status: VmStatus,
    generation: u64,
    creation_attempts: u32,
    cloudlet_scheduler: Box<dyn CloudletScheduler>,
}

impl Serialize for Vm {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Vm", 8)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("mips", &self.mips)?;
        state.serialize_field("pes", &self.pes)?;
        state.serialize_field("ram", &self.ram)?;
        state.serialize_field("bw", &self.bw)?;
        state.serialize_field("storage", &self.storage)?;
        state.serialize_field("status", &self.status)?;
        state.serialize_field("host_id", &self.host_id)?;
        state.end()
    }
}

impl Vm {
    /// Creates virtual machine with specified parameters.
    pub fn new(
        id: u32,
        mips: f64,
        pes: u32,
        ram: u64,
        bw: u64,
        storage: u64,
        cloudlet_scheduler: Box<dyn CloudletScheduler>,
    ) -> Self {
        Self {
            id,
            mips,
            pes,
            ram,
            bw,
            storage,
            broker_id: None,
            host_id: None,
            status: VmStatus::Created,
            generation: 0,
            creation_attempts: 0,
            cloudlet_scheduler,
        }
    }

    /// Returns resources to be debited from a host on placement.
    pub fn allocation(&self) -> Allocation {
        Allocation {
            vm_id: self.id,
            pes: self.pes,
            mips: self.mips,
            ram: self.ram,
            bw: self.bw,
            storage: self.storage,
        }
    }

    pub fn status(&self) -> VmStatus {
        self.status
    }

    pub fn host_id(&self) -> Option<u32> {
        self.host_id
    }

    /// Returns the placement generation. It is unique among all placements in the datacenter.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn creation_attempts(&self) -> u32 {
        self.creation_attempts
    }

    pub fn cloudlet_scheduler(&self) -> &dyn CloudletScheduler {
        self.cloudlet_scheduler.as_ref()
    }

    pub fn cloudlet_scheduler_mut(&mut self) -> &mut dyn CloudletScheduler {
        self.cloudlet_scheduler.as_mut()
    }

    /// Returns RAM used by executing cloudlets according to their RAM utilization models.
    pub fn ram_in_use(&self, time: f64) -> u64 {
        let fraction = self.cloudlet_scheduler.ram_utilization(time).min(1.);
        (self.ram as f64 * fraction).round() as u64
    }

    /// Returns bandwidth used by executing cloudlets according to their bandwidth utilization models.
    pub fn bw_in_use(&self, time: f64) -> u64 {
        let fraction = self.cloudlet_scheduler.bw_utilization(time).min(1.);
        (self.bw as f64 * fraction).round() as u64
    }

    pub(crate) fn set_placed(&mut self, host_id: u32, generation: u64) {
        self.host_id = Some(host_id);
        self.generation = generation;
        self.status = VmStatus::Placed;
    }

    pub(crate) fn set_status(&mut self, status: VmStatus) {
        self.status = status;
    }

    pub(crate) fn record_creation_attempt(&mut self) {
        self.creation_attempts += 1;
    }
}
