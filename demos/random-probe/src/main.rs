use std::collections::BTreeMap;
use std::time::Instant;

use clap::Parser;
use rand::prelude::*;
use rand_pcg::Pcg64;

use cloudsim_core::log_info;
use cloudsim_core::simulation::Simulation;
use cloudsim::core::cloudlet::Cloudlet;
use cloudsim::core::config::SimulationConfig;
use cloudsim::core::results::save_cloudlet_records;
use cloudsim::core::sampler::UniformSampler;
use cloudsim::core::utilization_model::{DynamicUtilization, FullUtilization};
use cloudsim::core::vm_allocation_policies::random_probe::RandomProbe;
use cloudsim::core::vm_schedulers::time_shared::TimeSharedVmScheduler;
use cloudsim::simulation::CloudSimulation;

const HOST_PES: [u32; 5] = [4, 8, 16, 32, 64];
const HOST_MIPS: f64 = 2500.;
const HOST_RAM: u64 = 16384;
const HOST_BW: u64 = 10000;
const HOST_STORAGE: u64 = 1000000;

const VM_PES: u32 = 2;
const CLOUDLET_LENGTHS: [f64; 4] = [3000., 5000., 7000., 10000.];

fn init_logger() {
    use env_logger::Builder;
    use std::io::Write;
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();
}

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Number of hosts
    #[clap(long, default_value_t = 200)]
    num_hosts: u32,

    /// Number of VMs
    #[clap(long, default_value_t = 300)]
    num_vms: u32,

    /// Number of cloudlets
    #[clap(long, default_value_t = 500)]
    num_cloudlets: u32,

    /// Random seed
    #[clap(long, default_value_t = 123)]
    seed: u64,

    /// Optional path to save cloudlet records in CSV format
    #[clap(long)]
    output: Option<String>,
}

fn main() {
    init_logger();
    let args = Args::parse();
    let mut rand = Pcg64::seed_from_u64(args.seed);

    let mut sim_config = SimulationConfig::default();
    sim_config.cloudlet_scheduler = "SpaceShared".to_string();
    sim_config.vm_creation_retry_delay = Some(1.);
    sim_config.vm_creation_max_retries = 3;
    sim_config.destroy_idle_vms = true;
    let simulation_start = Instant::now();

    let sim = Simulation::new(args.seed);
    let policy = RandomProbe::new(Box::new(UniformSampler::new(args.seed)));
    let mut cloud_sim = match CloudSimulation::with_allocation_policy(sim, sim_config, Box::new(policy)) {
        Ok(cloud_sim) => cloud_sim,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let mut host_pes = BTreeMap::new();
    for _ in 0..args.num_hosts {
        let pes = *HOST_PES.choose(&mut rand).unwrap_or(&HOST_PES[0]);
        let host_id = cloud_sim.add_host(
            pes,
            HOST_MIPS,
            HOST_RAM,
            HOST_BW,
            HOST_STORAGE,
            Box::new(TimeSharedVmScheduler::new()),
        );
        host_pes.insert(host_id, pes);
    }
    let broker_id = cloud_sim.add_broker("broker");

    let mut vms = Vec::with_capacity(args.num_vms as usize);
    for id in 0..args.num_vms {
        match cloud_sim.create_vm(id, HOST_MIPS, VM_PES, 512, 1000, 10000) {
            Ok(vm) => vms.push(vm),
            Err(e) => {
                eprintln!("Can't create VM: {}", e);
                std::process::exit(1);
            }
        }
    }
    let cloudlets = (0..args.num_cloudlets)
        .map(|id| {
            let length = *CLOUDLET_LENGTHS.choose(&mut rand).unwrap_or(&CLOUDLET_LENGTHS[0]);
            Cloudlet::new(id, length, 1, Box::new(FullUtilization::new()))
                .with_ram_model(Box::new(DynamicUtilization::linear(0.2, 0.)))
                .with_bw_model(Box::new(DynamicUtilization::linear(0.2, 0.)))
        })
        .collect();

    let broker = match cloud_sim.broker(broker_id) {
        Some(broker) => broker,
        None => return,
    };
    broker.borrow_mut().submit_vm_list(vms);
    broker.borrow_mut().submit_cloudlet_list(cloudlets);

    let end_time = cloud_sim.start();

    // VMs placed per host size
    let mut placements: BTreeMap<u32, u32> = BTreeMap::new();
    for vm_id in 0..args.num_vms {
        let host_id = broker.borrow().vm_record(vm_id).and_then(|record| record.host_id);
        if let Some(pes) = host_id.and_then(|id| host_pes.get(&id)) {
            *placements.entry(*pes).or_default() += 1;
        }
    }
    for (pes, count) in placements.iter() {
        log_info!(cloud_sim.context(), "hosts with {} PEs received {} VMs", pes, count);
    }

    log_info!(cloud_sim.context(), "Simulation finished at {:.3}", end_time);
    log_info!(cloud_sim.context(), "{}", broker.borrow().summary());
    log_info!(
        cloud_sim.context(),
        "Simulation process time {:.2?}",
        simulation_start.elapsed()
    );
    log_info!(cloud_sim.context(), "Total events processed {}", cloud_sim.event_count());

    if let Some(path) = args.output {
        if let Err(e) = save_cloudlet_records(&path, broker.borrow().cloudlet_submitted_list()) {
            eprintln!("Can't save cloudlet records: {}", e);
        }
    }
}
