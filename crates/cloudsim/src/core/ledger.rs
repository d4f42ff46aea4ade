//! Host resource accounting.

use serde::Serialize;

use crate::core::common::ResourceKind;
use crate::core::error::CloudSimError;

/// Tracks available and allocated amounts of a single host resource.
///
/// The allocated amount never exceeds the capacity. Releasing more than is allocated
/// is rejected and leaves the ledger unchanged.
#[derive(Serialize, Clone, Debug)]
pub struct ResourceLedger {
    kind: ResourceKind,
    capacity: u64,
    allocated: u64,
}

impl ResourceLedger {
    pub fn new(kind: ResourceKind, capacity: u64) -> Self {
        Self {
            kind,
            capacity,
            allocated: 0,
        }
    }

    /// Debits `amount` if it fits into the remaining capacity.
    pub fn try_allocate(&mut self, amount: u64) -> bool {
        if amount > self.available() {
            return false;
        }
        self.allocated += amount;
        true
    }

    /// Credits back `amount` previously debited by [`try_allocate`](Self::try_allocate).
    pub fn release(&mut self, amount: u64) -> Result<(), CloudSimError> {
        if amount > self.allocated {
            return Err(CloudSimError::InvalidAllocationRelease {
                resource: self.kind,
                requested: amount,
                allocated: self.allocated,
            });
        }
        self.allocated -= amount;
        Ok(())
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn allocated(&self) -> u64 {
        self.allocated
    }

    pub fn available(&self) -> u64 {
        self.capacity - self.allocated
    }

    /// Returns the fraction of capacity currently allocated.
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            return 0.;
        }
        self.allocated as f64 / self.capacity as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_within_capacity() {
        let mut ledger = ResourceLedger::new(ResourceKind::Ram, 100);
        assert!(ledger.try_allocate(60));
        assert!(!ledger.try_allocate(41));
        assert!(ledger.try_allocate(40));
        assert_eq!(ledger.available(), 0);
        assert_eq!(ledger.utilization(), 1.);
    }

    #[test]
    fn test_over_release_is_rejected() {
        let mut ledger = ResourceLedger::new(ResourceKind::Bw, 10);
        assert!(ledger.try_allocate(4));
        assert!(matches!(
            ledger.release(5),
            Err(CloudSimError::InvalidAllocationRelease {
                requested: 5,
                allocated: 4,
                ..
            })
        ));
        assert_eq!(ledger.allocated(), 4);
        assert!(ledger.release(4).is_ok());
        assert_eq!(ledger.available(), 10);
    }
}
