//! Error types.

use thiserror::Error;

use crate::core::common::{AllocationVerdict, ResourceKind};

/// Errors produced by the datacenter model.
///
/// `CapacityExceeded` and `UnplaceableVm` are expected outcomes of admission and placement.
/// `InvalidAllocationRelease` means the host accounting is corrupted.
#[derive(Error, Debug)]
pub enum CloudSimError {
    #[error("host #{host_id} cannot admit the request: {verdict}")]
    CapacityExceeded { host_id: u32, verdict: AllocationVerdict },

    #[error("cannot release {requested} of {resource}, only {allocated} is allocated")]
    InvalidAllocationRelease {
        resource: ResourceKind,
        requested: u64,
        allocated: u64,
    },

    #[error("event references stale {entity} #{id}")]
    StaleEventReference { entity: &'static str, id: u32 },

    #[error("no suitable host for vm #{vm_id}")]
    UnplaceableVm { vm_id: u32 },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
