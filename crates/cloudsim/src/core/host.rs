//! Physical host.

use std::collections::{BTreeMap, BTreeSet};

use crate::core::cloudlet::Cloudlet;
use crate::core::common::{Allocation, AllocationVerdict, ResourceKind, VmCapacity};
use crate::core::error::CloudSimError;
use crate::core::ledger::ResourceLedger;
use crate::core::pe::{Pe, PePool};
use crate::core::vm::{Vm, VmStatus};
use crate::core::vm_scheduler::VmScheduler;

/// Physical machine composed of a PE pool, resource ledgers and a VM scheduler.
///
/// The host owns the VMs placed on it. Its ledgers and PE pool are changed only through
/// [`allocate_resources_for_vm`](Self::allocate_resources_for_vm) and [`destroy_vm`](Self::destroy_vm).
pub struct Host {
    pub id: u32,
    pes: PePool,
    ram: ResourceLedger,
    bw: ResourceLedger,
    storage: ResourceLedger,
    vm_scheduler: Box<dyn VmScheduler>,
    allocations: BTreeMap<u32, Allocation>,
    vms: BTreeMap<u32, Vm>,
}

impl Host {
    pub fn new(
        id: u32,
        pes: u32,
        pe_mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        vm_scheduler: Box<dyn VmScheduler>,
    ) -> Self {
        Self {
            id,
            pes: PePool::new(id, pes, pe_mips),
            ram: ResourceLedger::new(ResourceKind::Ram, ram),
            bw: ResourceLedger::new(ResourceKind::Bw, bw),
            storage: ResourceLedger::new(ResourceKind::Storage, storage),
            vm_scheduler,
            allocations: BTreeMap::new(),
            vms: BTreeMap::new(),
        }
    }

    /// Checks if the specified allocation is currently possible on this host.
    pub fn allocation_verdict(&self, alloc: &Allocation) -> AllocationVerdict {
        let verdict = self.vm_scheduler.can_allocate(&self.pes, alloc);
        if verdict != AllocationVerdict::Success {
            return verdict;
        }
        if self.ram.available() < alloc.ram {
            return AllocationVerdict::NotEnoughRam;
        }
        if self.bw.available() < alloc.bw {
            return AllocationVerdict::NotEnoughBw;
        }
        if self.storage.available() < alloc.storage {
            return AllocationVerdict::NotEnoughStorage;
        }
        AllocationVerdict::Success
    }

    pub fn is_suitable_for_vm(&self, vm: &Vm) -> bool {
        self.allocation_verdict(&vm.allocation()) == AllocationVerdict::Success
    }

    /// Debits the allocation from the ledgers and the PE pool.
    ///
    /// Either every resource is debited or none.
    pub fn allocate_resources_for_vm(&mut self, alloc: &Allocation) -> Result<(), CloudSimError> {
        let verdict = self.allocation_verdict(alloc);
        if verdict != AllocationVerdict::Success || self.allocations.contains_key(&alloc.vm_id) {
            return Err(CloudSimError::CapacityExceeded {
                host_id: self.id,
                verdict,
            });
        }
        if !self.ram.try_allocate(alloc.ram) {
            return Err(self.capacity_exceeded(AllocationVerdict::NotEnoughRam));
        }
        if !self.bw.try_allocate(alloc.bw) {
            self.ram.release(alloc.ram)?;
            return Err(self.capacity_exceeded(AllocationVerdict::NotEnoughBw));
        }
        if !self.storage.try_allocate(alloc.storage) {
            self.ram.release(alloc.ram)?;
            self.bw.release(alloc.bw)?;
            return Err(self.capacity_exceeded(AllocationVerdict::NotEnoughStorage));
        }
        if let Err(e) = self.vm_scheduler.allocate_pes(&mut self.pes, alloc) {
            self.ram.release(alloc.ram)?;
            self.bw.release(alloc.bw)?;
            self.storage.release(alloc.storage)?;
            return Err(e);
        }
        self.allocations.insert(alloc.vm_id, alloc.clone());
        Ok(())
    }

    /// Credits back the resources debited for the VM.
    pub fn release_resources_for_vm(&mut self, vm_id: u32) -> Result<Allocation, CloudSimError> {
        let alloc = self
            .allocations
            .remove(&vm_id)
            .ok_or(CloudSimError::StaleEventReference { entity: "vm", id: vm_id })?;
        self.vm_scheduler.deallocate_pes(&mut self.pes, vm_id)?;
        self.ram.release(alloc.ram)?;
        self.bw.release(alloc.bw)?;
        self.storage.release(alloc.storage)?;
        Ok(alloc)
    }

    fn capacity_exceeded(&self, verdict: AllocationVerdict) -> CloudSimError {
        CloudSimError::CapacityExceeded {
            host_id: self.id,
            verdict,
        }
    }

    /// Makes the VM resident. Its resources must be allocated beforehand.
    pub fn attach_vm(&mut self, vm: Vm) {
        self.vms.insert(vm.id, vm);
        self.refresh_pe_status();
    }

    /// Detaches the VM and releases its resources.
    ///
    /// Cloudlets stay inside the returned VM.
    pub fn destroy_vm(&mut self, vm_id: u32) -> Result<Vm, CloudSimError> {
        if !self.vms.contains_key(&vm_id) {
            return Err(CloudSimError::StaleEventReference { entity: "vm", id: vm_id });
        }
        self.release_resources_for_vm(vm_id)?;
        let mut vm = self
            .vms
            .remove(&vm_id)
            .ok_or(CloudSimError::StaleEventReference { entity: "vm", id: vm_id })?;
        vm.set_status(VmStatus::Destroyed);
        self.refresh_pe_status();
        Ok(vm)
    }

    /// Advances processing of all resident VMs to `time` and returns finished cloudlets.
    pub fn update_processing(&mut self, time: f64) -> Vec<Cloudlet> {
        let mut finished = Vec::new();
        for vm in self.vms.values_mut() {
            if let Some(capacity) = self.vm_scheduler.vm_capacity(&self.pes, vm.id) {
                let scheduler = vm.cloudlet_scheduler_mut();
                scheduler.update_processing(time, &capacity);
                finished.extend(scheduler.take_finished());
            }
        }
        self.refresh_pe_status();
        finished
    }

    /// Returns the earliest estimated completion time among cloudlets of resident VMs.
    pub fn next_completion_time(&self) -> Option<f64> {
        self.vms
            .values()
            .filter_map(|vm| {
                let capacity = self.vm_scheduler.vm_capacity(&self.pes, vm.id)?;
                vm.cloudlet_scheduler().next_completion_time(&capacity)
            })
            .min_by(|a, b| a.total_cmp(b))
    }

    /// Returns `true` if some resident VM has executing cloudlets.
    pub fn is_busy(&self) -> bool {
        self.vms.values().any(|vm| vm.cloudlet_scheduler().executing_count() > 0)
    }

    fn refresh_pe_status(&mut self) {
        let busy_vms: BTreeSet<u32> = self
            .vms
            .values()
            .filter(|vm| vm.cloudlet_scheduler().executing_count() > 0)
            .map(|vm| vm.id)
            .collect();
        self.vm_scheduler.refresh_pe_status(&mut self.pes, &busy_vms);
    }

    pub fn vm_capacity(&self, vm_id: u32) -> Option<VmCapacity> {
        self.vm_scheduler.vm_capacity(&self.pes, vm_id)
    }

    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        self.vms.get(&vm_id)
    }

    pub fn vm_mut(&mut self, vm_id: u32) -> Option<&mut Vm> {
        self.vms.get_mut(&vm_id)
    }

    pub fn vms(&self) -> impl Iterator<Item = &Vm> {
        self.vms.values()
    }

    pub(crate) fn vm_ids(&self) -> Vec<u32> {
        self.vms.keys().copied().collect()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn allocations(&self) -> impl Iterator<Item = &Allocation> {
        self.allocations.values()
    }

    pub fn allocation(&self, vm_id: u32) -> Option<&Allocation> {
        self.allocations.get(&vm_id)
    }

    pub fn pe_count(&self) -> u32 {
        self.pes.len()
    }

    pub fn pe_mips(&self) -> f64 {
        self.pes.pe_mips()
    }

    pub fn total_mips(&self) -> f64 {
        self.pes.total_mips()
    }

    pub fn free_pes(&self) -> u32 {
        self.pes.free_count()
    }

    pub fn busy_pes(&self) -> u32 {
        self.pes.busy_count()
    }

    pub fn pes(&self) -> &[Pe] {
        self.pes.pes()
    }

    pub fn ram(&self) -> &ResourceLedger {
        &self.ram
    }

    pub fn bw(&self) -> &ResourceLedger {
        &self.bw
    }

    pub fn storage(&self) -> &ResourceLedger {
        &self.storage
    }

    pub fn vm_scheduler_name(&self) -> &str {
        self.vm_scheduler.name()
    }
}
