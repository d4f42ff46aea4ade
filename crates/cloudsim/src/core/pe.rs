//! Processing elements of a host.

use serde::Serialize;

use crate::core::common::{AllocationVerdict, ResourceKind};
use crate::core::error::CloudSimError;

pub type PeId = u32;

/// Status of processing element.
#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeStatus {
    Free,
    /// Assigned to some VM which currently has no running cloudlets.
    Allocated,
    /// Assigned to some VM which runs cloudlets.
    Busy,
}

/// Single compute lane with fixed processing rate.
#[derive(Serialize, Clone, Debug)]
pub struct Pe {
    pub id: PeId,
    pub mips: f64,
    pub status: PeStatus,
}

/// Set of identical processing elements owned by a single host.
#[derive(Serialize, Clone, Debug)]
pub struct PePool {
    host_id: u32,
    pe_mips: f64,
    pes: Vec<Pe>,
}

impl PePool {
    pub fn new(host_id: u32, count: u32, pe_mips: f64) -> Self {
        let pes = (0..count)
            .map(|id| Pe {
                id,
                mips: pe_mips,
                status: PeStatus::Free,
            })
            .collect();
        Self { host_id, pe_mips, pes }
    }

    /// Takes `count` free PEs whose rate is at least `mips`.
    ///
    /// Either all requested PEs are allocated or none.
    pub fn allocate(&mut self, count: u32, mips: f64) -> Result<Vec<PeId>, CloudSimError> {
        if mips > self.pe_mips {
            return Err(CloudSimError::CapacityExceeded {
                host_id: self.host_id,
                verdict: AllocationVerdict::PeTooSlow,
            });
        }
        if self.free_count() < count {
            return Err(CloudSimError::CapacityExceeded {
                host_id: self.host_id,
                verdict: AllocationVerdict::NotEnoughPes,
            });
        }
        let ids: Vec<PeId> = self
            .pes
            .iter()
            .filter(|pe| pe.status == PeStatus::Free)
            .take(count as usize)
            .map(|pe| pe.id)
            .collect();
        for id in &ids {
            self.pes[*id as usize].status = PeStatus::Allocated;
        }
        Ok(ids)
    }

    /// Returns the specified PEs to the free set.
    ///
    /// Fails without changes if some of them are unknown or already free.
    pub fn free(&mut self, ids: &[PeId]) -> Result<(), CloudSimError> {
        let valid = ids
            .iter()
            .all(|id| matches!(self.pes.get(*id as usize), Some(pe) if pe.status != PeStatus::Free));
        if !valid {
            return Err(CloudSimError::InvalidAllocationRelease {
                resource: ResourceKind::Pes,
                requested: ids.len() as u64,
                allocated: (self.len() - self.free_count()) as u64,
            });
        }
        for id in ids {
            self.pes[*id as usize].status = PeStatus::Free;
        }
        Ok(())
    }

    pub fn set_status(&mut self, id: PeId, status: PeStatus) {
        if let Some(pe) = self.pes.get_mut(id as usize) {
            pe.status = status;
        }
    }

    pub fn status(&self, id: PeId) -> Option<PeStatus> {
        self.pes.get(id as usize).map(|pe| pe.status)
    }

    pub fn free_count(&self) -> u32 {
        self.pes.iter().filter(|pe| pe.status == PeStatus::Free).count() as u32
    }

    pub fn busy_count(&self) -> u32 {
        self.pes.iter().filter(|pe| pe.status == PeStatus::Busy).count() as u32
    }

    pub fn len(&self) -> u32 {
        self.pes.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.pes.is_empty()
    }

    pub fn pe_mips(&self) -> f64 {
        self.pe_mips
    }

    pub fn total_mips(&self) -> f64 {
        self.pe_mips * self.pes.len() as f64
    }

    pub fn host_id(&self) -> u32 {
        self.host_id
    }

    pub fn pes(&self) -> &[Pe] {
        &self.pes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_free() {
        let mut pool = PePool::new(0, 4, 1000.);
        let ids = pool.allocate(3, 1000.).unwrap();
        assert_eq!(ids, vec![0, 1, 2]);
        assert_eq!(pool.free_count(), 1);
        assert!(pool.allocate(2, 500.).is_err());
        assert_eq!(pool.free_count(), 1);
        pool.free(&ids[..2]).unwrap();
        assert_eq!(pool.allocate(3, 10.).unwrap(), vec![0, 1, 3]);
    }

    #[test]
    fn test_double_free_is_rejected() {
        let mut pool = PePool::new(0, 2, 1000.);
        let ids = pool.allocate(1, 1000.).unwrap();
        pool.free(&ids).unwrap();
        assert!(pool.free(&ids).is_err());
        assert_eq!(pool.free_count(), 2);
    }

    #[test]
    fn test_slow_pes_are_rejected() {
        let mut pool = PePool::new(3, 8, 1000.);
        assert!(matches!(
            pool.allocate(1, 2000.),
            Err(CloudSimError::CapacityExceeded {
                host_id: 3,
                verdict: AllocationVerdict::PeTooSlow
            })
        ));
    }
}
