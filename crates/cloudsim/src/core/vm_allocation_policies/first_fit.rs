//! First Fit policy.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Uses the first suitable host in list order.
///
/// Finds a host whenever some suitable host exists.
#[derive(Default)]
pub struct FirstFit;

impl FirstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for FirstFit {
    fn find_host_for_vm(&mut self, hosts: &[Host], vm: &Vm) -> Option<u32> {
        hosts.iter().find(|host| host.is_suitable_for_vm(vm)).map(|host| host.id)
    }
}
