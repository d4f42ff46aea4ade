use std::fmt::{Display, Formatter};

use serde::Serialize;

/// Resources requested by a VM at placement time.
///
/// The same values are debited from the host on placement and credited back on destruction.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Allocation {
    pub vm_id: u32,
    pub pes: u32,
    pub mips: f64,
    pub ram: u64,
    pub bw: u64,
    pub storage: u64,
}

/// Processing capacity granted to a VM by its host's VM scheduler.
#[derive(Serialize, Clone, Copy, Debug, PartialEq)]
pub struct VmCapacity {
    /// Number of PEs the VM may use.
    pub pes: u32,
    /// Effective per-PE rate in MIPS.
    pub mips: f64,
}

impl VmCapacity {
    pub fn total_mips(&self) -> f64 {
        self.pes as f64 * self.mips
    }
}

/// Outcome of a host admission test.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationVerdict {
    NotEnoughPes,
    PeTooSlow,
    NotEnoughRam,
    NotEnoughBw,
    NotEnoughStorage,
    Success,
}

impl Display for AllocationVerdict {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AllocationVerdict::NotEnoughPes => write!(f, "not enough PEs"),
            AllocationVerdict::PeTooSlow => write!(f, "PE rate too low"),
            AllocationVerdict::NotEnoughRam => write!(f, "not enough RAM"),
            AllocationVerdict::NotEnoughBw => write!(f, "not enough bandwidth"),
            AllocationVerdict::NotEnoughStorage => write!(f, "not enough storage"),
            AllocationVerdict::Success => write!(f, "success"),
        }
    }
}

/// Host resource dimension tracked by a [`ResourceLedger`](crate::core::ledger::ResourceLedger).
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    Pes,
    Ram,
    Bw,
    Storage,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            ResourceKind::Pes => write!(f, "pes"),
            ResourceKind::Ram => write!(f, "ram"),
            ResourceKind::Bw => write!(f, "bw"),
            ResourceKind::Storage => write!(f, "storage"),
        }
    }
}
