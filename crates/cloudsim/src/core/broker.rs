//! Broker component acting on behalf of a cloud user.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use indexmap::IndexMap;

use cloudsim_core::cast;
use cloudsim_core::context::SimulationContext;
use cloudsim_core::event::Event;
use cloudsim_core::handler::EventHandler;
use cloudsim_core::{log_debug, log_info, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::SimulationConfig;
use crate::core::events::broker::{RetryVmCreation, SubmitCloudlets, SubmitVms};
use crate::core::events::cloudlet::{
    CloudletCancelRequest, CloudletPauseRequest, CloudletResumeRequest, CloudletReturned, CloudletSubmit,
};
use crate::core::events::priority;
use crate::core::events::vm::{VmCreateRequest, VmCreated, VmCreationFailed, VmDestroyRequest, VmDestroyed};
use crate::core::results::SimulationSummary;
use crate::core::vm::{Vm, VmStatus};

/// Broker-side view of a submitted VM.
#[derive(Clone, Debug)]
pub struct VmRecord {
    pub status: VmStatus,
    pub host_id: Option<u32>,
    pub generation: u64,
    pub was_placed: bool,
    destroy_requested: bool,
    running_cloudlets: u32,
}

impl VmRecord {
    fn new() -> Self {
        Self {
            status: VmStatus::Created,
            host_id: None,
            generation: 0,
            was_placed: false,
            destroy_requested: false,
            running_cloudlets: 0,
        }
    }
}

/// Submits VMs and cloudlets of a single user to the datacenter and collects the results.
///
/// Submissions are applied on the next event dispatch, not synchronously. Cloudlets are dispatched only
/// after every outstanding VM creation request has been answered. A cloudlet bound to a VM goes to that VM
/// once it is placed. Other cloudlets are mapped round-robin over the placed VMs in ID order. Cloudlets
/// which have no placed VM to go to stay waiting.
///
/// A failed VM creation is retried after `vm_creation_retry_delay` while the retry budget lasts,
/// otherwise the VM is permanently failed. A VM waiting for a retry does not hold back the dispatch of
/// cloudlets which are not bound to it.
pub struct Broker {
    pub id: u32,
    datacenter_id: u32,
    vm_records: IndexMap<u32, VmRecord>,
    retry_vms: HashMap<u32, Vm>,
    vms: BTreeMap<u32, Vm>,
    pending_vm_requests: usize,
    waiting: VecDeque<Cloudlet>,
    dispatched: HashMap<u32, u32>,
    submitted_ids: Vec<u32>,
    returned: IndexMap<u32, Cloudlet>,
    next_vm_index: usize,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Broker {
    pub fn new(datacenter_id: u32, ctx: SimulationContext, sim_config: Rc<SimulationConfig>) -> Self {
        Self {
            id: ctx.id(),
            datacenter_id,
            vm_records: IndexMap::new(),
            retry_vms: HashMap::new(),
            vms: BTreeMap::new(),
            pending_vm_requests: 0,
            waiting: VecDeque::new(),
            dispatched: HashMap::new(),
            submitted_ids: Vec::new(),
            returned: IndexMap::new(),
            next_vm_index: 0,
            ctx,
            sim_config,
        }
    }

    /// Queues VMs for creation.
    pub fn submit_vm_list(&mut self, mut vms: Vec<Vm>) {
        for vm in vms.iter_mut() {
            vm.broker_id = Some(self.id);
        }
        self.ctx
            .emit_self_with_priority(SubmitVms { vms }, 0., priority::SUBMISSION);
    }

    /// Queues cloudlets for execution.
    pub fn submit_cloudlet_list(&mut self, mut cloudlets: Vec<Cloudlet>) {
        for cloudlet in cloudlets.iter_mut() {
            cloudlet.broker_id = Some(self.id);
        }
        self.ctx
            .emit_self_with_priority(SubmitCloudlets { cloudlets }, 0., priority::SUBMISSION);
    }

    /// Requests destruction of a placed VM. Its unfinished cloudlets fail.
    pub fn destroy_vm(&mut self, vm_id: u32) -> bool {
        let record = match self.vm_records.get_mut(&vm_id) {
            Some(record) if record.status == VmStatus::Placed && !record.destroy_requested => record,
            _ => return false,
        };
        record.destroy_requested = true;
        let generation = record.generation;
        self.ctx.emit_with_priority(
            VmDestroyRequest { vm_id, generation },
            self.datacenter_id,
            self.sim_config.message_delay,
            priority::RELEASE,
        );
        true
    }

    /// Cancels a cloudlet. A cloudlet which is not dispatched yet fails immediately.
    pub fn cancel_cloudlet(&mut self, cloudlet_id: u32) -> bool {
        if let Some(pos) = self.waiting.iter().position(|c| c.id == cloudlet_id) {
            if let Some(mut cloudlet) = self.waiting.remove(pos) {
                cloudlet.fail(self.ctx.time());
                log_debug!(self.ctx, "cloudlet #{} canceled before dispatch", cloudlet_id);
                self.returned.insert(cloudlet.id, cloudlet);
                return true;
            }
        }
        match self.dispatch_target(cloudlet_id) {
            Some((vm_id, generation)) => {
                self.ctx.emit_with_priority(
                    CloudletCancelRequest {
                        cloudlet_id,
                        vm_id,
                        generation,
                    },
                    self.datacenter_id,
                    self.sim_config.message_delay,
                    priority::RELEASE,
                );
                true
            }
            None => false,
        }
    }

    /// Pauses a dispatched cloudlet, releasing its PEs.
    pub fn pause_cloudlet(&mut self, cloudlet_id: u32) -> bool {
        match self.dispatch_target(cloudlet_id) {
            Some((vm_id, generation)) => {
                self.ctx.emit_with_priority(
                    CloudletPauseRequest {
                        cloudlet_id,
                        vm_id,
                        generation,
                    },
                    self.datacenter_id,
                    self.sim_config.message_delay,
                    priority::RELEASE,
                );
                true
            }
            None => false,
        }
    }

    /// Resumes a paused cloudlet.
    pub fn resume_cloudlet(&mut self, cloudlet_id: u32) -> bool {
        match self.dispatch_target(cloudlet_id) {
            Some((vm_id, generation)) => {
                self.ctx.emit_with_priority(
                    CloudletResumeRequest {
                        cloudlet_id,
                        vm_id,
                        generation,
                    },
                    self.datacenter_id,
                    self.sim_config.message_delay,
                    priority::SUBMISSION,
                );
                true
            }
            None => false,
        }
    }

    fn dispatch_target(&self, cloudlet_id: u32) -> Option<(u32, u64)> {
        let vm_id = *self.dispatched.get(&cloudlet_id)?;
        let record = self.vm_records.get(&vm_id)?;
        Some((vm_id, record.generation))
    }

    fn send_vm_create_request(&mut self, vm: Vm) {
        self.pending_vm_requests += 1;
        self.ctx.emit_with_priority(
            VmCreateRequest { vm },
            self.datacenter_id,
            self.sim_config.message_delay,
            priority::PLACEMENT,
        );
    }

    fn on_submit_vms(&mut self, vms: Vec<Vm>) {
        log_info!(self.ctx, "submitting {} vms", vms.len());
        for vm in vms {
            self.vm_records.insert(vm.id, VmRecord::new());
            self.send_vm_create_request(vm);
        }
    }

    fn on_submit_cloudlets(&mut self, cloudlets: Vec<Cloudlet>) {
        log_info!(self.ctx, "submitting {} cloudlets", cloudlets.len());
        for mut cloudlet in cloudlets {
            cloudlet.set_status(CloudletStatus::Waiting);
            self.submitted_ids.push(cloudlet.id);
            self.waiting.push_back(cloudlet);
        }
        self.dispatch_cloudlets();
    }

    fn on_vm_created(&mut self, vm_id: u32, host_id: u32, generation: u64) {
        self.pending_vm_requests = self.pending_vm_requests.saturating_sub(1);
        if let Some(record) = self.vm_records.get_mut(&vm_id) {
            record.status = VmStatus::Placed;
            record.host_id = Some(host_id);
            record.generation = generation;
            record.was_placed = true;
        }
        log_debug!(self.ctx, "vm #{} placed on host #{}", vm_id, host_id);
        self.dispatch_cloudlets();
    }

    fn on_vm_creation_failed(&mut self, vm: Vm) {
        self.pending_vm_requests = self.pending_vm_requests.saturating_sub(1);
        let vm_id = vm.id;
        let retries_left = vm.creation_attempts() <= self.sim_config.vm_creation_max_retries;
        match self.sim_config.vm_creation_retry_delay {
            Some(delay) if retries_left => {
                log_debug!(self.ctx, "vm #{} creation failed, retry in {}", vm_id, delay);
                self.retry_vms.insert(vm_id, vm);
                self.ctx
                    .emit_self_with_priority(RetryVmCreation { vm_id }, delay, priority::PLACEMENT);
                // cloudlets bound to other VMs need not wait for the retry
                self.dispatch_cloudlets();
            }
            _ => {
                log_warn!(self.ctx, "vm #{} creation failed permanently", vm_id);
                if let Some(record) = self.vm_records.get_mut(&vm_id) {
                    record.status = VmStatus::CreationFailed;
                }
                self.vms.insert(vm_id, vm);
                self.dispatch_cloudlets();
            }
        }
    }

    fn on_retry_vm_creation(&mut self, vm_id: u32) {
        if let Some(vm) = self.retry_vms.remove(&vm_id) {
            self.send_vm_create_request(vm);
        }
    }

    fn on_vm_destroyed(&mut self, vm: Vm) {
        log_debug!(self.ctx, "vm #{} destroyed", vm.id);
        if let Some(record) = self.vm_records.get_mut(&vm.id) {
            record.status = VmStatus::Destroyed;
        }
        self.vms.insert(vm.id, vm);
        self.dispatch_cloudlets();
    }

    fn on_cloudlet_returned(&mut self, cloudlet: Cloudlet) {
        log_debug!(
            self.ctx,
            "cloudlet #{} returned with status {}",
            cloudlet.id,
            cloudlet.status()
        );
        self.dispatched.remove(&cloudlet.id);
        let vm_id = cloudlet.vm_id;
        if let Some(record) = vm_id.and_then(|vm_id| self.vm_records.get_mut(&vm_id)) {
            record.running_cloudlets = record.running_cloudlets.saturating_sub(1);
        }
        self.returned.insert(cloudlet.id, cloudlet);
        if let Some(vm_id) = vm_id {
            if self.sim_config.destroy_idle_vms && self.is_vm_idle(vm_id) {
                self.destroy_vm(vm_id);
            }
        }
    }

    fn is_vm_idle(&self, vm_id: u32) -> bool {
        let running = self
            .vm_records
            .get(&vm_id)
            .map_or(0, |record| record.running_cloudlets);
        running == 0 && !self.waiting.iter().any(|c| c.vm_id.map_or(true, |id| id == vm_id))
    }

    fn dispatch_cloudlets(&mut self) {
        if self.pending_vm_requests > 0 || self.waiting.is_empty() {
            return;
        }
        let placed: Vec<u32> = {
            let mut ids: Vec<u32> = self
                .vm_records
                .iter()
                .filter(|(_, record)| record.status == VmStatus::Placed && !record.destroy_requested)
                .map(|(id, _)| *id)
                .collect();
            ids.sort_unstable();
            ids
        };
        let mut still_waiting = VecDeque::new();
        while let Some(mut cloudlet) = self.waiting.pop_front() {
            let target = match cloudlet.vm_id {
                Some(vm_id) if placed.contains(&vm_id) => Some(vm_id),
                Some(_) => None,
                None if !placed.is_empty() => {
                    let vm_id = placed[self.next_vm_index % placed.len()];
                    self.next_vm_index += 1;
                    Some(vm_id)
                }
                None => None,
            };
            match target {
                Some(vm_id) => {
                    let record = &mut self.vm_records[&vm_id];
                    record.running_cloudlets += 1;
                    let generation = record.generation;
                    cloudlet.vm_id = Some(vm_id);
                    self.dispatched.insert(cloudlet.id, vm_id);
                    log_debug!(self.ctx, "sending cloudlet #{} to vm #{}", cloudlet.id, vm_id);
                    self.ctx.emit_with_priority(
                        CloudletSubmit { cloudlet, generation },
                        self.datacenter_id,
                        self.sim_config.message_delay,
                        priority::SUBMISSION,
                    );
                }
                None => still_waiting.push_back(cloudlet),
            }
        }
        self.waiting = still_waiting;
    }

    /// Takes back entities which were still in the datacenter or in flight when the simulation ended.
    pub fn on_simulation_end(&mut self, vms: Vec<Vm>, cloudlets: Vec<Cloudlet>) {
        for mut vm in vms {
            // creation requests still in flight never got an answer
            if vm.status() == VmStatus::Created {
                vm.set_status(VmStatus::CreationFailed);
            }
            // submissions which were not processed yet have no record
            let record = self.vm_records.entry(vm.id).or_insert_with(VmRecord::new);
            record.status = vm.status();
            record.host_id = vm.host_id();
            record.was_placed |= vm.generation() > 0;
            self.vms.insert(vm.id, vm);
        }
        for (vm_id, vm) in self.retry_vms.drain() {
            if let Some(record) = self.vm_records.get_mut(&vm_id) {
                record.status = VmStatus::CreationFailed;
            }
            self.vms.insert(vm_id, vm);
        }
        for cloudlet in cloudlets {
            if !self.dispatched.contains_key(&cloudlet.id) && !self.submitted_ids.contains(&cloudlet.id) {
                self.submitted_ids.push(cloudlet.id);
            }
            self.dispatched.remove(&cloudlet.id);
            self.returned.insert(cloudlet.id, cloudlet);
        }
        log_info!(self.ctx, "{}", self.summary());
    }

    /// Returns cloudlets which finished successfully, in order of completion.
    pub fn cloudlet_finished_list(&self) -> Vec<&Cloudlet> {
        self.returned.values().filter(|c| c.is_finished()).collect()
    }

    /// Returns submitted cloudlets held by the broker, in submission order.
    ///
    /// Cloudlets which are currently processed by the datacenter are included only after the simulation
    /// is finished.
    pub fn cloudlet_submitted_list(&self) -> Vec<&Cloudlet> {
        self.submitted_ids
            .iter()
            .filter_map(|id| {
                self.returned
                    .get(id)
                    .or_else(|| self.waiting.iter().find(|c| c.id == *id))
            })
            .collect()
    }

    /// Returns cloudlet held by the broker.
    pub fn cloudlet(&self, cloudlet_id: u32) -> Option<&Cloudlet> {
        self.returned
            .get(&cloudlet_id)
            .or_else(|| self.waiting.iter().find(|c| c.id == cloudlet_id))
    }

    pub fn waiting_cloudlets(&self) -> impl Iterator<Item = &Cloudlet> {
        self.waiting.iter()
    }

    pub fn vm_record(&self, vm_id: u32) -> Option<&VmRecord> {
        self.vm_records.get(&vm_id)
    }

    /// Returns VMs which came back to the broker (failed, destroyed or recovered at the end).
    pub fn vm_list(&self) -> impl Iterator<Item = &Vm> {
        self.vms.values()
    }

    pub fn summary(&self) -> SimulationSummary {
        let count_cloudlets = |status: CloudletStatus| self.returned.values().filter(|c| c.status() == status).count();
        let finished = count_cloudlets(CloudletStatus::Finished);
        let failed = count_cloudlets(CloudletStatus::Failed);
        SimulationSummary {
            vms_submitted: self.vm_records.len(),
            vms_placed: self.vm_records.values().filter(|r| r.was_placed).count(),
            vms_unplaced: self
                .vm_records
                .values()
                .filter(|r| r.status == VmStatus::CreationFailed)
                .count(),
            cloudlets_submitted: self.submitted_ids.len(),
            cloudlets_finished: finished,
            cloudlets_failed: failed,
            cloudlets_unfinished: self.submitted_ids.len().saturating_sub(finished + failed),
        }
    }
}

impl EventHandler for Broker {
    fn on(&mut self, event: Event) {
        cast!(match event.data {
            SubmitVms { vms } => {
                self.on_submit_vms(vms);
            }
            SubmitCloudlets { cloudlets } => {
                self.on_submit_cloudlets(cloudlets);
            }
            VmCreated {
                vm_id,
                host_id,
                generation,
            } => {
                self.on_vm_created(vm_id, host_id, generation);
            }
            VmCreationFailed { vm } => {
                self.on_vm_creation_failed(vm);
            }
            RetryVmCreation { vm_id } => {
                self.on_retry_vm_creation(vm_id);
            }
            VmDestroyed { vm } => {
                self.on_vm_destroyed(vm);
            }
            CloudletReturned { cloudlet } => {
                self.on_cloudlet_returned(cloudlet);
            }
        })
    }
}
