//! Datacenter simulation facade.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use sugars::{rc, refcell};

use cloudsim_core::context::SimulationContext;
use cloudsim_core::event::EventData;
use cloudsim_core::log_info;
use cloudsim_core::simulation::Simulation;

use crate::core::broker::Broker;
use crate::core::cloudlet::Cloudlet;
use crate::core::cloudlet_scheduler::cloudlet_scheduler_resolver;
use crate::core::config::SimulationConfig;
use crate::core::datacenter::Datacenter;
use crate::core::error::CloudSimError;
use crate::core::events::broker::{SubmitCloudlets, SubmitVms};
use crate::core::events::cloudlet::{CloudletReturned, CloudletSubmit};
use crate::core::events::vm::{VmCreateRequest, VmCreationFailed, VmDestroyed};
use crate::core::results::SimulationSummary;
use crate::core::vm::Vm;
use crate::core::vm_allocation_policy::{allocation_policy_resolver, VmAllocationPolicy};
use crate::core::vm_scheduler::{vm_scheduler_resolver, VmScheduler};

/// Wires a single datacenter and any number of brokers into a simulation.
pub struct CloudSimulation {
    datacenter: Rc<RefCell<Datacenter>>,
    datacenter_id: u32,
    brokers: BTreeMap<u32, Rc<RefCell<Broker>>>,
    sim: Simulation,
    ctx: SimulationContext,
    sim_config: Rc<SimulationConfig>,
    finished: bool,
}

impl CloudSimulation {
    /// Creates simulation with the allocation policy and the hosts described by the config.
    pub fn new(sim: Simulation, sim_config: SimulationConfig) -> Result<Self, CloudSimError> {
        let allocation_policy = allocation_policy_resolver(&sim_config.allocation_policy)?;
        let mut cloud_sim = Self::with_allocation_policy(sim, sim_config, allocation_policy)?;
        let hosts = cloud_sim.sim_config.hosts.clone();
        for host in hosts {
            for _ in 0..host.count.unwrap_or(1) {
                let vm_scheduler = vm_scheduler_resolver(host.vm_scheduler.as_deref().unwrap_or("SpaceShared"))?;
                cloud_sim.add_host(host.pes, host.pe_mips, host.ram, host.bw, host.storage, vm_scheduler);
            }
        }
        Ok(cloud_sim)
    }

    /// Creates simulation with the given allocation policy and no hosts.
    ///
    /// The config is validated, but its `hosts` are not added.
    pub fn with_allocation_policy(
        mut sim: Simulation,
        sim_config: SimulationConfig,
        allocation_policy: Box<dyn VmAllocationPolicy>,
    ) -> Result<Self, CloudSimError> {
        sim_config.validate()?;
        let sim_config = rc!(sim_config);
        let datacenter = rc!(refcell!(Datacenter::new(
            allocation_policy,
            sim.create_context("datacenter"),
            sim_config.clone(),
        )));
        let datacenter_id = sim.add_handler("datacenter", datacenter.clone());
        let ctx = sim.create_context("simulation");
        Ok(Self {
            datacenter,
            datacenter_id,
            brokers: BTreeMap::new(),
            sim,
            ctx,
            sim_config,
            finished: false,
        })
    }

    /// Adds host to the datacenter and returns its ID.
    pub fn add_host(
        &mut self,
        pes: u32,
        pe_mips: f64,
        ram: u64,
        bw: u64,
        storage: u64,
        vm_scheduler: Box<dyn VmScheduler>,
    ) -> u32 {
        self.datacenter
            .borrow_mut()
            .add_host(pes, pe_mips, ram, bw, storage, vm_scheduler)
    }

    /// Adds broker with the given name and returns its ID.
    pub fn add_broker(&mut self, name: &str) -> u32 {
        let broker = rc!(refcell!(Broker::new(
            self.datacenter_id,
            self.sim.create_context(name),
            self.sim_config.clone(),
        )));
        let id = self.sim.add_handler(name, broker.clone());
        self.brokers.insert(id, broker);
        id
    }

    /// Creates VM with the cloudlet scheduler from the config.
    pub fn create_vm(
        &self,
        id: u32,
        mips: f64,
        pes: u32,
        ram: u64,
        bw: u64,
        storage: u64,
    ) -> Result<Vm, CloudSimError> {
        let cloudlet_scheduler = cloudlet_scheduler_resolver(&self.sim_config.cloudlet_scheduler)?;
        Ok(Vm::new(id, mips, pes, ram, bw, storage, cloudlet_scheduler))
    }

    /// Runs the simulation until the configured end time or until there are no events, then finishes it.
    pub fn start(&mut self) -> f64 {
        log_info!(self.ctx, "simulation started");
        match self.sim_config.simulation_end_time {
            Some(end_time) => {
                self.sim.step_until_time(end_time);
            }
            None => self.sim.step_until_no_events(),
        }
        self.finish();
        self.sim.time()
    }

    /// Stops the simulation and hands all VMs and cloudlets back to their brokers.
    ///
    /// Pending events are discarded. Entities carried by them are recovered, so that every submitted
    /// cloudlet ends up at its broker. Calling it more than once has no effect.
    pub fn finish(&mut self) {
        if self.finished {
            return;
        }
        self.finished = true;
        let (mut vms, mut cloudlets) = self.datacenter.borrow_mut().shutdown();
        for event in self.sim.drain_events() {
            recover_entities(event.data, &mut vms, &mut cloudlets);
        }

        let mut by_broker: BTreeMap<u32, (Vec<Vm>, Vec<Cloudlet>)> = BTreeMap::new();
        for vm in vms {
            if let Some(broker_id) = vm.broker_id {
                by_broker.entry(broker_id).or_default().0.push(vm);
            }
        }
        for cloudlet in cloudlets {
            if let Some(broker_id) = cloudlet.broker_id {
                by_broker.entry(broker_id).or_default().1.push(cloudlet);
            }
        }
        for (broker_id, broker) in self.brokers.iter() {
            let (vms, cloudlets) = by_broker.remove(broker_id).unwrap_or_default();
            broker.borrow_mut().on_simulation_end(vms, cloudlets);
        }
        log_info!(self.ctx, "simulation finished: {}", self.summary());
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn clock(&self) -> f64 {
        self.sim.time()
    }

    pub fn steps(&mut self, step_count: u64) -> bool {
        self.sim.steps(step_count)
    }

    pub fn step_for_duration(&mut self, duration: f64) -> bool {
        self.sim.step_for_duration(duration)
    }

    pub fn step_until_time(&mut self, time: f64) -> bool {
        self.sim.step_until_time(time)
    }

    pub fn step_until_no_events(&mut self) {
        self.sim.step_until_no_events()
    }

    pub fn event_count(&self) -> u64 {
        self.sim.event_count()
    }

    pub fn datacenter(&self) -> Rc<RefCell<Datacenter>> {
        self.datacenter.clone()
    }

    pub fn datacenter_id(&self) -> u32 {
        self.datacenter_id
    }

    pub fn broker(&self, broker_id: u32) -> Option<Rc<RefCell<Broker>>> {
        self.brokers.get(&broker_id).cloned()
    }

    pub fn context(&self) -> &SimulationContext {
        &self.ctx
    }

    pub fn sim_config(&self) -> Rc<SimulationConfig> {
        self.sim_config.clone()
    }

    /// Returns summary over all brokers.
    pub fn summary(&self) -> SimulationSummary {
        self.brokers
            .values()
            .fold(SimulationSummary::default(), |acc, broker| acc.merge(&broker.borrow().summary()))
    }
}

fn recover_entities(data: Box<dyn EventData>, vms: &mut Vec<Vm>, cloudlets: &mut Vec<Cloudlet>) {
    let data = match data.downcast::<VmCreateRequest>() {
        Ok(request) => return vms.push(request.vm),
        Err(data) => data,
    };
    let data = match data.downcast::<VmCreationFailed>() {
        Ok(reply) => return vms.push(reply.vm),
        Err(data) => data,
    };
    let data = match data.downcast::<VmDestroyed>() {
        Ok(reply) => return vms.push(reply.vm),
        Err(data) => data,
    };
    let data = match data.downcast::<SubmitVms>() {
        Ok(submit) => return vms.extend(submit.vms),
        Err(data) => data,
    };
    let data = match data.downcast::<CloudletSubmit>() {
        Ok(submit) => return cloudlets.push(submit.cloudlet),
        Err(data) => data,
    };
    let data = match data.downcast::<CloudletReturned>() {
        Ok(reply) => return cloudlets.push(reply.cloudlet),
        Err(data) => data,
    };
    if let Ok(submit) = data.downcast::<SubmitCloudlets>() {
        cloudlets.extend(submit.cloudlets);
    }
}
