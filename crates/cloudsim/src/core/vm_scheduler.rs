//! Sharing of host PEs among VMs.

use std::collections::BTreeSet;

use crate::core::common::{Allocation, AllocationVerdict, VmCapacity};
use crate::core::config::options::parse_config_value;
use crate::core::error::CloudSimError;
use crate::core::pe::PePool;
use crate::core::vm_schedulers::space_shared::SpaceSharedVmScheduler;
use crate::core::vm_schedulers::time_shared::TimeSharedVmScheduler;

/// Trait for implementation of VM schedulers.
///
/// The scheduler decides whether a VM can be admitted to the host PEs and which processing capacity
/// each resident VM gets. The PE pool itself is owned by the host and passed in on every call.
pub trait VmScheduler {
    /// Admission test for the PE part of the allocation.
    fn can_allocate(&self, pes: &PePool, alloc: &Allocation) -> AllocationVerdict;

    /// Assigns PEs to the VM. Fails with `CapacityExceeded` if the admission test fails.
    fn allocate_pes(&mut self, pes: &mut PePool, alloc: &Allocation) -> Result<(), CloudSimError>;

    /// Releases PEs assigned to the VM.
    fn deallocate_pes(&mut self, pes: &mut PePool, vm_id: u32) -> Result<(), CloudSimError>;

    /// Returns the capacity currently granted to the VM.
    fn vm_capacity(&self, pes: &PePool, vm_id: u32) -> Option<VmCapacity>;

    /// Marks PEs of VMs with running cloudlets as busy and other assigned PEs as allocated.
    fn refresh_pe_status(&mut self, pes: &mut PePool, busy_vms: &BTreeSet<u32>);

    fn name(&self) -> &str;
}

/// Creates VM scheduler by its name (`SpaceShared` or `TimeShared`).
pub fn vm_scheduler_resolver(config_str: &str) -> Result<Box<dyn VmScheduler>, CloudSimError> {
    let (name, _options) = parse_config_value(config_str);
    match name.as_str() {
        "SpaceShared" => Ok(Box::new(SpaceSharedVmScheduler::new())),
        "TimeShared" => Ok(Box::new(TimeSharedVmScheduler::new())),
        _ => Err(CloudSimError::Config(format!("Can't resolve VM scheduler: {}", config_str))),
    }
}
