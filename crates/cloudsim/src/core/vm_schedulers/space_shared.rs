//! Space-shared VM scheduler.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::common::{Allocation, AllocationVerdict, VmCapacity};
use crate::core::error::CloudSimError;
use crate::core::pe::{PeId, PePool, PeStatus};
use crate::core::vm_scheduler::VmScheduler;

struct PeAssignment {
    pes: Vec<PeId>,
    mips: f64,
}

/// Gives each VM a dedicated set of whole PEs for its full residency.
#[derive(Default)]
pub struct SpaceSharedVmScheduler {
    assignments: BTreeMap<u32, PeAssignment>,
}

impl SpaceSharedVmScheduler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VmScheduler for SpaceSharedVmScheduler {
    fn can_allocate(&self, pes: &PePool, alloc: &Allocation) -> AllocationVerdict {
        if alloc.mips > pes.pe_mips() {
            return AllocationVerdict::PeTooSlow;
        }
        if pes.free_count() < alloc.pes {
            return AllocationVerdict::NotEnoughPes;
        }
        AllocationVerdict::Success
    }

    fn allocate_pes(&mut self, pes: &mut PePool, alloc: &Allocation) -> Result<(), CloudSimError> {
        let ids = pes.allocate(alloc.pes, alloc.mips)?;
        self.assignments.insert(
            alloc.vm_id,
            PeAssignment {
                pes: ids,
                mips: alloc.mips,
            },
        );
        Ok(())
    }

    fn deallocate_pes(&mut self, pes: &mut PePool, vm_id: u32) -> Result<(), CloudSimError> {
        let assignment = self
            .assignments
            .remove(&vm_id)
            .ok_or(CloudSimError::StaleEventReference { entity: "vm", id: vm_id })?;
        pes.free(&assignment.pes)
    }

    fn vm_capacity(&self, _pes: &PePool, vm_id: u32) -> Option<VmCapacity> {
        self.assignments.get(&vm_id).map(|a| VmCapacity {
            pes: a.pes.len() as u32,
            mips: a.mips,
        })
    }

    fn refresh_pe_status(&mut self, pes: &mut PePool, busy_vms: &BTreeSet<u32>) {
        for (vm_id, assignment) in &self.assignments {
            let status = if busy_vms.contains(vm_id) {
                PeStatus::Busy
            } else {
                PeStatus::Allocated
            };
            for id in &assignment.pes {
                pes.set_status(*id, status);
            }
        }
    }

    fn name(&self) -> &str {
        "SpaceShared"
    }
}
