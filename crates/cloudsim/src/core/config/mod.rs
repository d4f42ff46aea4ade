//! Simulation configuration.

pub mod options;
pub mod sim_config;

pub use sim_config::{HostConfig, SimulationConfig};
