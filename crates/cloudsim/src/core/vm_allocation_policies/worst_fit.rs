//! Worst Fit policy.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Uses the suitable host with the most free PEs, which spreads VMs across hosts.
/// Ties go to the earlier host.
#[derive(Default)]
pub struct WorstFit;

impl WorstFit {
    pub fn new() -> Self {
        Self {}
    }
}

impl VmAllocationPolicy for WorstFit {
    fn find_host_for_vm(&mut self, hosts: &[Host], vm: &Vm) -> Option<u32> {
        let mut result: Option<(u32, u32)> = None;
        for host in hosts {
            if !host.is_suitable_for_vm(vm) {
                continue;
            }
            match result {
                Some((_, max_free_pes)) if host.free_pes() <= max_free_pes => {}
                _ => result = Some((host.id, host.free_pes())),
            }
        }
        result.map(|(id, _)| id)
    }
}
