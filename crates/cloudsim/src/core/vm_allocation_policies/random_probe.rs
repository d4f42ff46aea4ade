//! Random probing policy.

use crate::core::host::Host;
use crate::core::sampler::Sampler;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Probes uniformly random hosts and uses the first suitable one.
///
/// The number of probes equals the number of hosts, and hosts are drawn with replacement, so the
/// same host can be probed several times. The policy is **not exhaustive**: it can report failure while
/// a suitable host exists. With a single suitable host among `n`, it is found with probability
/// `1 - (1 - 1/n)^n`.
pub struct RandomProbe {
    sampler: Box<dyn Sampler>,
}

impl RandomProbe {
    pub fn new(sampler: Box<dyn Sampler>) -> Self {
        Self { sampler }
    }
}

impl VmAllocationPolicy for RandomProbe {
    fn find_host_for_vm(&mut self, hosts: &[Host], vm: &Vm) -> Option<u32> {
        for _ in 0..hosts.len() {
            let idx = ((self.sampler.sample() * hosts.len() as f64) as usize).min(hosts.len() - 1);
            if hosts[idx].is_suitable_for_vm(vm) {
                return Some(hosts[idx].id);
            }
        }
        None
    }
}
