//! Policy defined by a user function.

use crate::core::host::Host;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::VmAllocationPolicy;

/// Delegates host selection to the given closure.
///
/// The closure must return the ID of a suitable host or `None`.
pub struct CustomAllocationPolicy {
    find_host: Box<dyn FnMut(&[Host], &Vm) -> Option<u32>>,
}

impl CustomAllocationPolicy {
    pub fn new<F>(find_host: F) -> Self
    where
        F: FnMut(&[Host], &Vm) -> Option<u32> + 'static,
    {
        Self {
            find_host: Box::new(find_host),
        }
    }
}

impl VmAllocationPolicy for CustomAllocationPolicy {
    fn find_host_for_vm(&mut self, hosts: &[Host], vm: &Vm) -> Option<u32> {
        (self.find_host)(hosts, vm)
    }
}
