//! Datacenter component.

use std::collections::HashMap;
use std::rc::Rc;

use cloudsim_core::cast;
use cloudsim_core::context::SimulationContext;
use cloudsim_core::event::{Event, EventId};
use cloudsim_core::handler::EventHandler;
use cloudsim_core::{log_debug, log_error, log_trace, log_warn};

use crate::core::cloudlet::{Cloudlet, CloudletStatus};
use crate::core::config::SimulationConfig;
use crate::core::error::CloudSimError;
use crate::core::events::cloudlet::{
    CloudletCancelRequest, CloudletPauseRequest, CloudletResumeRequest, CloudletReturned, CloudletSubmit,
};
use crate::core::events::datacenter::UpdateProcessing;
use crate::core::events::priority;
use crate::core::events::vm::{VmCreateRequest, VmCreated, VmCreationFailed, VmDestroyRequest, VmDestroyed};
use crate::core::host::Host;
use crate::core::vm::{Vm, VmStatus};
use crate::core::vm_allocation_policy::VmAllocationPolicy;
use crate::core::vm_scheduler::VmScheduler;

/// Owns the hosts, places VMs using the allocation policy and drives cloudlet processing.
///
/// Every request is handled in three steps: the progress of all cloudlets is settled to the current time,
/// the request is applied, and then the waiting cloudlets are admitted and the finished ones are returned
/// to their brokers. A single pending [`UpdateProcessing`] event is kept at the earliest estimated
/// completion time (or the next scheduling interval tick, if it comes earlier).
///
/// Events referring to a VM carry its placement generation. Events with an outdated generation are
/// dropped.
pub struct Datacenter {
    pub id: u32,
    hosts: Vec<Host>,
    allocation_policy: Box<dyn VmAllocationPolicy>,
    vm_locations: HashMap<u32, (u32, u64)>,
    next_generation: u64,
    pending_update: Option<(EventId, f64)>,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
}

impl Datacenter {
    pub fn new(
        allocation_policy: Box<dyn VmAllocationPolicy>,
        ctx: SimulationContext,
        sim_config: Rc<SimulationConfig>,
    ) -> Self {
        Self {
            id: ctx.id(),
            hosts: Vec::new(),
            allocation_policy,
            vm_locations: HashMap::new(),
            next_generation: 1,
            pending_update: None,
            ctx,
            sim_config,
        }
    }

    /// Adds host and returns its ID, which equals its position in the host list.
    pub fn add_host(
        &mut self,
        pes: u32,
        pe_mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        vm_scheduler: Box<dyn VmScheduler>,
    ) -> u32 {
        let id = self.hosts.len() as u32;
        self.hosts
            .push(Host::new(id, pes, pe_mips, ram, bw, storage, vm_scheduler));
        log_debug!(
            self.ctx,
            "added host #{} with {} PEs of {} MIPS ({})",
            id,
            pes,
            pe_mips,
            self.hosts[id as usize].vm_scheduler_name()
        );
        id
    }

    pub fn set_allocation_policy(&mut self, allocation_policy: Box<dyn VmAllocationPolicy>) {
        self.allocation_policy = allocation_policy;
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn host(&self, host_id: u32) -> Option<&Host> {
        self.hosts.get(host_id as usize)
    }

    /// Returns placed VM.
    pub fn vm(&self, vm_id: u32) -> Option<&Vm> {
        let (host_id, _) = self.vm_locations.get(&vm_id)?;
        self.hosts.get(*host_id as usize)?.vm(vm_id)
    }

    pub fn placed_vm_count(&self) -> usize {
        self.vm_locations.len()
    }

    /// Looks up cloudlet among those held by placed VMs.
    ///
    /// Progress of the returned cloudlet is as of the last processing update.
    pub fn find_cloudlet(&self, cloudlet_id: u32) -> Option<&Cloudlet> {
        self.hosts
            .iter()
            .flat_map(|host| host.vms())
            .find_map(|vm| vm.cloudlet_scheduler().find(cloudlet_id))
    }

    fn check_generation(&self, vm_id: u32, generation: u64) -> Result<u32, CloudSimError> {
        match self.vm_locations.get(&vm_id) {
            Some((host_id, current)) if *current == generation => Ok(*host_id),
            _ => Err(CloudSimError::StaleEventReference { entity: "vm", id: vm_id }),
        }
    }

    fn on_accounting_failure(&self, error: CloudSimError) {
        log_error!(self.ctx, "resource accounting failure: {}", error);
        if cfg!(debug_assertions) {
            panic!("resource accounting failure: {}", error);
        }
    }

    fn return_cloudlet(&self, cloudlet: Cloudlet) {
        match cloudlet.broker_id {
            Some(broker_id) => {
                self.ctx.emit_with_priority(
                    CloudletReturned { cloudlet },
                    broker_id,
                    self.sim_config.message_delay,
                    priority::COMPLETION,
                );
            }
            None => {
                log_warn!(self.ctx, "cloudlet #{} has no broker, dropped", cloudlet.id);
            }
        }
    }

    /// Settles progress of all cloudlets to the current time and returns the finished ones.
    fn update_processing(&mut self) {
        let time = self.ctx.time();
        let mut finished = Vec::new();
        for host in self.hosts.iter_mut().filter(|host| host.vm_count() > 0) {
            finished.extend(host.update_processing(time));
        }
        for cloudlet in finished {
            log_debug!(
                self.ctx,
                "cloudlet #{} {} on vm #{}",
                cloudlet.id,
                cloudlet.status(),
                cloudlet.vm_id.unwrap_or_default()
            );
            self.return_cloudlet(cloudlet);
        }
    }

    fn schedule_next_update(&mut self) {
        let now = self.ctx.time();
        let mut next = self
            .hosts
            .iter()
            .filter_map(|host| host.next_completion_time())
            .min_by(|a, b| a.total_cmp(b));
        if self.sim_config.scheduling_interval > 0. && self.hosts.iter().any(|host| host.is_busy()) {
            let tick = now + self.sim_config.scheduling_interval;
            next = Some(next.map_or(tick, |t| t.min(tick)));
        }
        if let (Some((_, scheduled)), Some(next)) = (self.pending_update, next) {
            if scheduled == next {
                return;
            }
        }
        if let Some((event_id, _)) = self.pending_update.take() {
            self.ctx.cancel_event(event_id);
        }
        if let Some(next) = next {
            let delay = (next - now).max(0.);
            let event_id = self.ctx.emit_self_with_priority(UpdateProcessing {}, delay, priority::PROCESSING_UPDATE);
            self.pending_update = Some((event_id, now + delay));
            log_trace!(self.ctx, "next processing update at {:.3}", now + delay);
        }
    }

    fn reject_vm(&self, mut vm: Vm, broker_id: u32) {
        vm.set_status(VmStatus::CreationFailed);
        log_warn!(self.ctx, "{}", CloudSimError::UnplaceableVm { vm_id: vm.id });
        self.ctx.emit_with_priority(
            VmCreationFailed { vm },
            broker_id,
            self.sim_config.message_delay,
            priority::PLACEMENT,
        );
    }

    fn on_vm_create_request(&mut self, mut vm: Vm, broker_id: u32) {
        vm.record_creation_attempt();
        self.update_processing();
        let host_id = self.allocation_policy.find_host_for_vm(&self.hosts, &vm);
        let host = match host_id.and_then(|id| self.hosts.get_mut(id as usize)) {
            Some(host) => host,
            None => {
                self.reject_vm(vm, broker_id);
                return;
            }
        };
        if let Err(e) = host.allocate_resources_for_vm(&vm.allocation()) {
            log_debug!(self.ctx, "vm #{} is rejected: {}", vm.id, e);
            self.reject_vm(vm, broker_id);
            return;
        }
        let host_id = host.id;
        let generation = self.next_generation;
        self.next_generation += 1;
        vm.set_placed(host_id, generation);
        log_debug!(self.ctx, "vm #{} allocated on host #{}", vm.id, host_id);
        self.vm_locations.insert(vm.id, (host_id, generation));
        let vm_id = vm.id;
        host.attach_vm(vm);
        self.ctx.emit_with_priority(
            VmCreated {
                vm_id,
                host_id,
                generation,
            },
            broker_id,
            self.sim_config.message_delay,
            priority::PLACEMENT,
        );
        self.schedule_next_update();
    }

    fn on_vm_destroy_request(&mut self, vm_id: u32, generation: u64, broker_id: u32) {
        let host_id = match self.check_generation(vm_id, generation) {
            Ok(host_id) => host_id,
            Err(e) => {
                log_debug!(self.ctx, "{}, destroy request dropped", e);
                return;
            }
        };
        self.update_processing();
        let time = self.ctx.time();
        match self.hosts[host_id as usize].destroy_vm(vm_id) {
            Ok(mut vm) => {
                self.vm_locations.remove(&vm_id);
                for mut cloudlet in vm.cloudlet_scheduler_mut().drain() {
                    if !matches!(cloudlet.status(), CloudletStatus::Finished | CloudletStatus::Failed) {
                        log_debug!(self.ctx, "cloudlet #{} aborted", cloudlet.id);
                        cloudlet.fail(time);
                    }
                    self.return_cloudlet(cloudlet);
                }
                log_debug!(self.ctx, "vm #{} destroyed on host #{}", vm_id, host_id);
                self.ctx.emit_with_priority(
                    VmDestroyed { vm },
                    broker_id,
                    self.sim_config.message_delay,
                    priority::RELEASE,
                );
            }
            Err(e) => self.on_accounting_failure(e),
        }
        self.update_processing();
        self.schedule_next_update();
    }

    fn on_cloudlet_submit(&mut self, mut cloudlet: Cloudlet, generation: u64) {
        let time = self.ctx.time();
        let vm_id = cloudlet.vm_id.unwrap_or_default();
        let host_id = match self.check_generation(vm_id, generation) {
            Ok(host_id) if cloudlet.vm_id.is_some() => host_id,
            _ => {
                log_debug!(
                    self.ctx,
                    "{}, cloudlet #{} failed",
                    CloudSimError::StaleEventReference { entity: "vm", id: vm_id },
                    cloudlet.id
                );
                cloudlet.fail(time);
                self.return_cloudlet(cloudlet);
                return;
            }
        };
        self.update_processing();
        let host = &mut self.hosts[host_id as usize];
        let capacity = host.vm_capacity(vm_id);
        let rejected = match (capacity, host.vm_mut(vm_id)) {
            (Some(capacity), Some(vm)) => {
                cloudlet.host_id = Some(host_id);
                log_debug!(self.ctx, "cloudlet #{} submitted to vm #{}", cloudlet.id, vm_id);
                vm.cloudlet_scheduler_mut().submit(cloudlet, time, &capacity);
                None
            }
            _ => Some(cloudlet),
        };
        if let Some(mut cloudlet) = rejected {
            cloudlet.fail(time);
            self.return_cloudlet(cloudlet);
            return;
        }
        self.update_processing();
        self.schedule_next_update();
    }

    fn on_cloudlet_cancel_request(&mut self, cloudlet_id: u32, vm_id: u32, generation: u64) {
        let host_id = match self.check_generation(vm_id, generation) {
            Ok(host_id) => host_id,
            Err(e) => {
                log_debug!(self.ctx, "{}, cancel of cloudlet #{} dropped", e, cloudlet_id);
                return;
            }
        };
        self.update_processing();
        let time = self.ctx.time();
        let canceled = self.hosts[host_id as usize]
            .vm_mut(vm_id)
            .and_then(|vm| vm.cloudlet_scheduler_mut().cancel(cloudlet_id, time));
        match canceled {
            Some(cloudlet) => {
                log_debug!(self.ctx, "cloudlet #{} canceled", cloudlet_id);
                self.return_cloudlet(cloudlet);
            }
            None => log_debug!(self.ctx, "cloudlet #{} not found on vm #{}", cloudlet_id, vm_id),
        }
        self.update_processing();
        self.schedule_next_update();
    }

    fn on_cloudlet_pause_request(&mut self, cloudlet_id: u32, vm_id: u32, generation: u64, pause: bool) {
        let host_id = match self.check_generation(vm_id, generation) {
            Ok(host_id) => host_id,
            Err(e) => {
                log_debug!(self.ctx, "{}, request for cloudlet #{} dropped", e, cloudlet_id);
                return;
            }
        };
        self.update_processing();
        let done = self.hosts[host_id as usize].vm_mut(vm_id).map_or(false, |vm| {
            let scheduler = vm.cloudlet_scheduler_mut();
            if pause {
                scheduler.pause(cloudlet_id)
            } else {
                scheduler.resume(cloudlet_id)
            }
        });
        let action = if pause { "paused" } else { "resumed" };
        if done {
            log_debug!(self.ctx, "cloudlet #{} {}", cloudlet_id, action);
        } else {
            log_debug!(self.ctx, "cloudlet #{} can't be {}", cloudlet_id, action);
        }
        self.update_processing();
        self.schedule_next_update();
    }

    fn on_update_processing(&mut self) {
        self.pending_update = None;
        self.update_processing();
        self.schedule_next_update();
    }

    /// Settles progress and destroys all placed VMs without notifying brokers.
    ///
    /// Returns the destroyed VMs and their cloudlets. Cloudlets keep their status, so those which did not
    /// finish are reported as unfinished.
    pub fn shutdown(&mut self) -> (Vec<Vm>, Vec<Cloudlet>) {
        self.update_processing_silently();
        if let Some((event_id, _)) = self.pending_update.take() {
            self.ctx.cancel_event(event_id);
        }
        let mut vms = Vec::new();
        let mut cloudlets = Vec::new();
        for host_id in 0..self.hosts.len() {
            for vm_id in self.hosts[host_id].vm_ids() {
                match self.hosts[host_id].destroy_vm(vm_id) {
                    Ok(mut vm) => {
                        cloudlets.extend(vm.cloudlet_scheduler_mut().drain());
                        vms.push(vm);
                    }
                    Err(e) => self.on_accounting_failure(e),
                }
            }
        }
        self.vm_locations.clear();
        (vms, cloudlets)
    }

    fn update_processing_silently(&mut self) {
        let time = self.ctx.time();
        for host in self.hosts.iter_mut() {
            // finished cloudlets stay in their VM schedulers and are drained on destruction
            for cloudlet in host.update_processing(time) {
                if let Some(vm) = cloudlet.vm_id.and_then(|vm_id| host.vm_mut(vm_id)) {
                    vm.cloudlet_scheduler_mut().state_mut().finished.push(cloudlet);
                }
            }
        }
    }
}

impl EventHandler for Datacenter {
    fn on(&mut self, event: Event) {
        let src = event.src;
        cast!(match event.data {
            VmCreateRequest { vm } => {
                self.on_vm_create_request(vm, src);
            }
            VmDestroyRequest { vm_id, generation } => {
                self.on_vm_destroy_request(vm_id, generation, src);
            }
            CloudletSubmit { cloudlet, generation } => {
                self.on_cloudlet_submit(cloudlet, generation);
            }
            CloudletCancelRequest {
                cloudlet_id,
                vm_id,
                generation,
            } => {
                self.on_cloudlet_cancel_request(cloudlet_id, vm_id, generation);
            }
            CloudletPauseRequest {
                cloudlet_id,
                vm_id,
                generation,
            } => {
                self.on_cloudlet_pause_request(cloudlet_id, vm_id, generation, true);
            }
            CloudletResumeRequest {
                cloudlet_id,
                vm_id,
                generation,
            } => {
                self.on_cloudlet_pause_request(cloudlet_id, vm_id, generation, false);
            }
            UpdateProcessing {} => {
                self.on_update_processing();
            }
        })
    }
}
