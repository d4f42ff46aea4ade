//! Time-shared VM scheduler.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::{Allocation, AllocationVerdict, VmCapacity};
use crate::core::error::CloudSimError;
use crate::core::pe::{PePool, PeStatus};
use crate::core::vm_scheduler::VmScheduler;

/// Lets all resident VMs share the host PEs.
///
/// Each VM is granted the requested number of PEs. While the total number of requested PEs does not
/// exceed the host PE count, every VM runs at its requested MIPS. Otherwise the per-PE rate is scaled by
/// `host_pes / requested_pes`, and is never above the requested MIPS.
#[derive(Default)]
pub struct TimeSharedVmScheduler {
    requests: BTreeMap<u32, (u32, f64)>,
}

impl TimeSharedVmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn requested_pes(&self) -> u32 {
        self.requests.values().map(|(pes, _)| *pes).sum()
    }

    fn share(&self, pes: &PePool) -> f64 {
        let requested = self.requested_pes();
        if requested > pes.len() {
            pes.len() as f64 / requested as f64
        } else {
            1.
        }
    }

    fn mark_pes(&self, pes: &mut PePool, busy: u32) {
        let used = self.requested_pes().min(pes.len());
        let busy = busy.min(used);
        for id in 0..pes.len() {
            let status = if id < busy {
                PeStatus::Busy
            } else if id < used {
                PeStatus::Allocated
            } else {
                PeStatus::Free
            };
            pes.set_status(id, status);
        }
    }
}

impl VmScheduler for TimeSharedVmScheduler {
    fn can_allocate(&self, pes: &PePool, alloc: &Allocation) -> AllocationVerdict {
        if alloc.mips > pes.pe_mips() {
            return AllocationVerdict::PeTooSlow;
        }
        if alloc.pes > pes.len() {
            return AllocationVerdict::NotEnoughPes;
        }
        AllocationVerdict::Success
    }

    fn allocate_pes(&mut self, pes: &mut PePool, alloc: &Allocation) -> Result<(), CloudSimError> {
        let verdict = self.can_allocate(pes, alloc);
        if verdict != AllocationVerdict::Success {
            return Err(CloudSimError::CapacityExceeded {
                host_id: pes.host_id(),
                verdict,
            });
        }
        self.requests.insert(alloc.vm_id, (alloc.pes, alloc.mips));
        let busy = pes.busy_count();
        self.mark_pes(pes, busy);
        Ok(())
    }

    fn deallocate_pes(&mut self, pes: &mut PePool, vm_id: u32) -> Result<(), CloudSimError> {
        self.requests
            .remove(&vm_id)
            .ok_or(CloudSimError::StaleEventReference { entity: "vm", id: vm_id })?;
        let busy = pes.busy_count();
        self.mark_pes(pes, busy);
        Ok(())
    }

    fn vm_capacity(&self, pes: &PePool, vm_id: u32) -> Option<VmCapacity> {
        let (vm_pes, vm_mips) = *self.requests.get(&vm_id)?;
        Some(VmCapacity {
            pes: vm_pes,
            mips: (pes.pe_mips() * self.share(pes)).min(vm_mips),
        })
    }

    fn refresh_pe_status(&mut self, pes: &mut PePool, busy_vms: &BTreeSet<u32>) {
        let busy = self
            .requests
            .iter()
            .filter(|(vm_id, _)| busy_vms.contains(vm_id))
            .map(|(_, (vm_pes, _))| *vm_pes)
            .sum();
        self.mark_pes(pes, busy);
    }

    fn name(&self) -> &str {
        "TimeShared"
    }
}
