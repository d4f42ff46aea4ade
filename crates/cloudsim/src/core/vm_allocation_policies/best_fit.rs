//! Best Fit policy.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Uses the suitable host with the fewest free PEs. Ties go to the earlier host.
#[derive(Default)]
pub struct BestFit;

impl BestFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for BestFit {
    fn find_host_for_vm(&mut self, hosts: &[Host], vm: &Vm) -> Option<u32> {
        let mut result: Option<u32> = None;
        let mut min_free_pes = u32::MAX;
        for host in hosts {
            if host.is_suitable_for_vm(vm) && host.free_pes() < min_free_pes {
                min_free_pes = host.free_pes();
                result = Some(host.id);
            }
        }
        result
    }
}
