//! Simulation configuration.

use serde::{Deserialize, Serialize};

use crate::core::cloudlet_scheduler::cloudlet_scheduler_resolver;
use crate::core::error::CloudSimError;
use crate::core::vm_allocation_policy::allocation_policy_resolver;
use crate::core::vm_scheduler::vm_scheduler_resolver;

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Default)]
struct RawSimulationConfig {
    pub scheduling_interval: Option<f64>,
    pub message_delay: Option<f64>,
    pub vm_creation_retry_delay: Option<f64>,
    pub vm_creation_max_retries: Option<u32>,
    pub destroy_idle_vms: Option<bool>,
    pub simulation_end_time: Option<f64>,
    pub allocation_policy: Option<String>,
    pub cloudlet_scheduler: Option<String>,
    pub hosts: Option<Vec<HostConfig>>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct HostConfig {
    /// Number of PEs.
    pub pes: u32,
    /// Processing rate of each PE in MIPS.
    pub pe_mips: f64,
    /// RAM capacity in MB.
    pub ram: u64,
    /// Bandwidth capacity in Mbit/s.
    pub bw: u64,
    /// Storage capacity in MB.
    pub storage: u64,
    /// VM scheduler, `SpaceShared` if not set.
    pub vm_scheduler: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Period of forced processing updates. Non-positive value disables them.
    pub scheduling_interval: f64,
    /// Delay of messages between brokers and datacenter.
    pub message_delay: f64,
    /// Delay before the broker retries failed VM creation. No retries if not set.
    pub vm_creation_retry_delay: Option<f64>,
    /// Maximum number of retries per VM.
    pub vm_creation_max_retries: u32,
    /// Whether the broker destroys VMs which have no more work.
    pub destroy_idle_vms: bool,
    /// Time at which the simulation is stopped. Runs until there are no events if not set.
    pub simulation_end_time: Option<f64>,
    /// VM allocation policy used by datacenter.
    pub allocation_policy: String,
    /// Cloudlet scheduler used by VMs created from the brokers' defaults.
    pub cloudlet_scheduler: String,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self::from_raw(RawSimulationConfig::default())
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self, CloudSimError> {
        let data = std::fs::read_to_string(file_name)?;
        Self::from_yaml_str(&data)
    }

    /// Creates simulation config from YAML string.
    pub fn from_yaml_str(data: &str) -> Result<Self, CloudSimError> {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(data).map_err(|e| CloudSimError::Config(format!("Can't parse YAML: {}", e)))?;
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        Self {
            scheduling_interval: raw.scheduling_interval.unwrap_or(0.),
            message_delay: raw.message_delay.unwrap_or(0.),
            vm_creation_retry_delay: raw.vm_creation_retry_delay,
            vm_creation_max_retries: raw.vm_creation_max_retries.unwrap_or(0),
            destroy_idle_vms: raw.destroy_idle_vms.unwrap_or(true),
            simulation_end_time: raw.simulation_end_time,
            allocation_policy: raw.allocation_policy.unwrap_or_else(|| "FirstFit".to_string()),
            cloudlet_scheduler: raw.cloudlet_scheduler.unwrap_or_else(|| "TimeShared".to_string()),
            hosts: raw.hosts.unwrap_or_default(),
        }
    }

    /// Checks that all strategy names can be resolved and delays are non-negative.
    pub fn validate(&self) -> Result<(), CloudSimError> {
        if self.message_delay < 0. {
            return Err(CloudSimError::Config("message_delay must be non-negative".to_string()));
        }
        if matches!(self.vm_creation_retry_delay, Some(delay) if delay < 0.) {
            return Err(CloudSimError::Config(
                "vm_creation_retry_delay must be non-negative".to_string(),
            ));
        }
        allocation_policy_resolver(&self.allocation_policy)?;
        cloudlet_scheduler_resolver(&self.cloudlet_scheduler)?;
        for host in &self.hosts {
            vm_scheduler_resolver(host.vm_scheduler.as_deref().unwrap_or("SpaceShared"))?;
        }
        Ok(())
    }
}
