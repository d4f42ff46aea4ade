use std::time::Instant;

use clap::Parser;

use cloudsim_core::log_info;
use cloudsim_core::simulation::Simulation;
use cloudsim::core::cloudlet::Cloudlet;
use cloudsim::core::config::SimulationConfig;
use cloudsim::core::results::save_cloudlet_records;
use cloudsim::core::utilization_model::ConstantUtilization;
use cloudsim::core::vm_schedulers::space_shared::SpaceSharedVmScheduler;
use cloudsim::simulation::CloudSimulation;

const HOST_PES: u32 = 16;
const HOST_MIPS: f64 = 1000.;
const HOST_RAM: u64 = 2048;
const HOST_BW: u64 = 10000;
const HOST_STORAGE: u64 = 1000000;

const VMS_PER_HOST: u32 = 4;
const VM_PES: u32 = HOST_PES / VMS_PER_HOST;
const CLOUDLET_PES: u32 = VM_PES / 2;
const CLOUDLET_LENGTH: f64 = HOST_MIPS * 10.;

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
    #[clap(long, default_value_t = 2000)]
    num_hosts: u32,

    /// Allocation policy
    #[clap(long, default_value = "FirstFit")]
    allocation_policy: String,

    /// Optional path to save cloudlet records in CSV format
    #[clap(long)]
    output: Option<String>,
}

fn main() {
    init_logger();
    let args = Args::parse();

    let mut sim_config = SimulationConfig::default();
    sim_config.allocation_policy = args.allocation_policy.clone();
    let simulation_start = Instant::now();

    let sim = Simulation::new(123);
    let mut cloud_sim = match CloudSimulation::new(sim, sim_config) {
        Ok(cloud_sim) => cloud_sim,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    for _ in 0..args.num_hosts {
        cloud_sim.add_host(
            HOST_PES,
            HOST_MIPS,
            HOST_RAM,
            HOST_BW,
            HOST_STORAGE,
            Box::new(SpaceSharedVmScheduler::new()),
        );
    }
    let broker_id = cloud_sim.add_broker("broker");

    let vm_count = args.num_hosts * VMS_PER_HOST;
    let mut vms = Vec::with_capacity(vm_count as usize);
    for id in 0..vm_count {
        match cloud_sim.create_vm(id, HOST_MIPS, VM_PES, 512, 1000, 10000) {
            Ok(vm) => vms.push(vm),
            Err(e) => {
                eprintln!("Can't create VM: {}", e);
                std::process::exit(1);
            }
        }
    }
    let cloudlets = (0..vm_count)
        .map(|id| {
            Cloudlet::new(id, CLOUDLET_LENGTH, CLOUDLET_PES, Box::new(ConstantUtilization::new(0.5)))
                .with_file_size(1024)
                .with_output_size(1024)
        })
        .collect();

    let broker = match cloud_sim.broker(broker_id) {
        Some(broker) => broker,
        None => return,
    };
    log_info!(
        cloud_sim.context(),
        "Submitting {} VMs and {} cloudlets to {} hosts",
        vm_count,
        vm_count,
        args.num_hosts
    );
    broker.borrow_mut().submit_vm_list(vms);
    broker.borrow_mut().submit_cloudlet_list(cloudlets);

    let end_time = cloud_sim.start();

    log_info!(cloud_sim.context(), "Simulation finished at {:.3}", end_time);
    log_info!(cloud_sim.context(), "{}", broker.borrow().summary());
    log_info!(
        cloud_sim.context(),
        "Simulation process time {:.2?}",
        simulation_start.elapsed()
    );
    log_info!(cloud_sim.context(), "Total events processed {}", cloud_sim.event_count());
    log_info!(
        cloud_sim.context(),
        "Events per second {:.0}",
        cloud_sim.event_count() as f64 / simulation_start.elapsed().as_secs_f64()
    );

    if let Some(path) = args.output {
        if let Err(e) = save_cloudlet_records(&path, broker.borrow().cloudlet_submitted_list()) {
            eprintln!("Can't save cloudlet records: {}", e);
        }
    }
}
