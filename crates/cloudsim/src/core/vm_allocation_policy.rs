//! Virtual machine allocation policies.

use crate::core::config::options::{parse_config_value, parse_options};
use crate::core::error::CloudSimError;
use crate::core::host::Host;
use crate::core::sampler::UniformSampler;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policies::best_fit::BestFit;
use crate::core::vm_allocation_policies::first_fit::FirstFit;
use crate::core::vm_allocation_policies::random_probe::RandomProbe;
use crate::core::vm_allocation_policies::worst_fit::WorstFit;

/// Trait for implementation of VM allocation policies.
///
/// The policy is defined as a function of the VM request and the current host list, which returns the ID
/// of the host selected for VM placement or `None` if there is no suitable host. The host list is
/// read-only: resources are debited by the datacenter after the host is selected.
///
/// Host IDs are equal to host positions in the list.
pub trait VmAllocationPolicy {
    fn find_host_for_vm(&mut self, hosts: &[Host], vm: &Vm) -> Option<u32>;
}

/// Creates allocation policy from config string, e.g. `FirstFit` or `RandomProbe[seed=42]`.
pub fn allocation_policy_resolver(config_str: &str) -> Result<Box<dyn VmAllocationPolicy>, CloudSimError> {
    let (policy_name, options) = parse_config_value(config_str);
    match policy_name.as_str() {
        "FirstFit" => Ok(Box::new(FirstFit::new())),
        "BestFit" => Ok(Box::new(BestFit::new())),
        "WorstFit" => Ok(Box::new(WorstFit::new())),
        "RandomProbe" => {
            let options = parse_options(&options.unwrap_or_default());
            let seed = match options.get("seed") {
                Some(value) => value
                    .parse::<u64>()
                    .map_err(|_| CloudSimError::Config(format!("Invalid seed in {}", config_str)))?,
                None => 0,
            };
            Ok(Box::new(RandomProbe::new(Box::new(UniformSampler::new(seed)))))
        }
        _ => Err(CloudSimError::Config(format!("Can't resolve allocation policy: {}", config_str))),
    }
}
