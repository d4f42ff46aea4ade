use std::cell::RefCell;
use std::rc::Rc;

use approx::assert_abs_diff_eq;
use rstest::rstest;

use cloudsim_core::simulation::Simulation;

use cloudsim::core::broker::Broker;
use cloudsim::core::cloudlet::{Cloudlet, CloudletStatus};
use cloudsim::core::config::SimulationConfig;
use cloudsim::core::error::CloudSimError;
use cloudsim::core::events::vm::VmDestroyRequest;
use cloudsim::core::results::save_cloudlet_records;
use cloudsim::core::utilization_model::FullUtilization;
use cloudsim::core::vm::VmStatus;
use cloudsim::core::vm_allocation_policies::first_fit::FirstFit;
use cloudsim::core::vm_schedulers::space_shared::SpaceSharedVmScheduler;
use cloudsim::simulation::CloudSimulation;

fn init_logger() {
    use std::io::Write;
    let _ = env_logger::Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .is_test(true)
        .try_init();
}

fn name_wrapper(file_name: &str) -> String {
    format!("test-configs/{}", file_name)
}

fn space_shared_config() -> SimulationConfig {
    init_logger();
    let mut config = SimulationConfig::default();
    config.cloudlet_scheduler = "SpaceShared".to_string();
    config
}

fn cloudlet(id: u32, length: f64, pes: u32) -> Cloudlet {
    Cloudlet::new(id, length, pes, Box::new(FullUtilization::new()))
}

fn add_hosts(cloud_sim: &mut CloudSimulation, count: u32, pes: u32) {
    for _ in 0..count {
        cloud_sim.add_host(pes, 1000., 16384, 10000, 1000000, Box::new(SpaceSharedVmScheduler::new()));
    }
}

fn submit(
    cloud_sim: &mut CloudSimulation,
    vms: Vec<(u32, u32)>,
    cloudlets: Vec<Cloudlet>,
) -> Rc<RefCell<Broker>> {
    let broker_id = cloud_sim.add_broker("broker");
    let vms = vms
        .into_iter()
        .map(|(id, pes)| cloud_sim.create_vm(id, 1000., pes, 2048, 1000, 10000).unwrap())
        .collect();
    let broker = cloud_sim.broker(broker_id).unwrap();
    broker.borrow_mut().submit_vm_list(vms);
    broker.borrow_mut().submit_cloudlet_list(cloudlets);
    broker
}

fn free_pes(cloud_sim: &CloudSimulation, host_id: u32) -> u32 {
    cloud_sim.datacenter().borrow().host(host_id).unwrap().free_pes()
}

#[test]
// Two 4-PE VMs are packed onto the first host, both cloudlets run in parallel and finish at 2.5.
fn test_simple_scenario() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, space_shared_config()).unwrap();
    add_hosts(&mut cloud_sim, 2, 8);
    let broker = submit(
        &mut cloud_sim,
        vec![(0, 4), (1, 4)],
        vec![cloudlet(0, 10000., 4), cloudlet(1, 10000., 4)],
    );

    cloud_sim.step_until_time(1.);
    assert_eq!(free_pes(&cloud_sim, 0), 0);
    assert_eq!(free_pes(&cloud_sim, 1), 8);
    assert_eq!(cloud_sim.datacenter().borrow().host(0).unwrap().busy_pes(), 8);
    assert_eq!(cloud_sim.datacenter().borrow().placed_vm_count(), 2);

    let end_time = cloud_sim.start();
    assert_abs_diff_eq!(end_time, 2.5, epsilon = 1e-9);

    let broker = broker.borrow();
    let finished = broker.cloudlet_finished_list();
    assert_eq!(finished.len(), 2);
    for c in finished {
        assert_eq!(c.status(), CloudletStatus::Finished);
        assert_eq!(c.host_id, Some(0));
        assert_abs_diff_eq!(c.finish_time().unwrap(), 2.5, epsilon = 1e-9);
        assert_abs_diff_eq!(c.actual_cpu_time().unwrap(), 2.5, epsilon = 1e-9);
        assert_eq!(c.finished_length(), c.length);
    }
    assert_eq!(broker.vm_record(0).unwrap().status, VmStatus::Destroyed);
    assert_eq!(free_pes(&cloud_sim, 0), 8);
    assert_eq!(free_pes(&cloud_sim, 1), 8);

    let summary = cloud_sim.summary();
    assert_eq!(summary.vms_placed, 2);
    assert_eq!(summary.cloudlets_finished, 2);
    assert_eq!(summary.cloudlets_unfinished, 0);
}

#[test]
// Unbound cloudlets are spread round-robin over the placed VMs.
fn test_round_robin_mapping() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, space_shared_config()).unwrap();
    add_hosts(&mut cloud_sim, 1, 8);
    let cloudlets = (0..4).map(|id| cloudlet(id, 1000., 1)).collect();
    let broker = submit(&mut cloud_sim, vec![(0, 2), (1, 2)], cloudlets);
    cloud_sim.start();

    let broker = broker.borrow();
    let vms: Vec<Option<u32>> = broker.cloudlet_submitted_list().iter().map(|c| c.vm_id).collect();
    assert_eq!(vms, vec![Some(0), Some(1), Some(0), Some(1)]);
    assert_eq!(broker.cloudlet_finished_list().len(), 4);
}

#[test]
// A VM which fits no host fails, and the cloudlet with nowhere to run stays waiting.
fn test_unplaceable_vm() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, space_shared_config()).unwrap();
    add_hosts(&mut cloud_sim, 1, 4);
    let broker = submit(&mut cloud_sim, vec![(0, 8)], vec![cloudlet(0, 1000., 1)]);
    cloud_sim.start();

    let broker = broker.borrow();
    assert_eq!(broker.vm_record(0).unwrap().status, VmStatus::CreationFailed);
    let cloudlet = broker.cloudlet(0).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Waiting);
    assert_eq!(cloudlet.vm_id, None);

    let summary = broker.summary();
    assert_eq!(summary.vms_submitted, 1);
    assert_eq!(summary.vms_placed, 0);
    assert_eq!(summary.vms_unplaced, 1);
    assert_eq!(summary.cloudlets_unfinished, 1);
    assert_eq!(free_pes(&cloud_sim, 0), 4);
}

#[rstest]
#[case::enough_retries(2, Some(3.), 3)]
#[case::retries_exhausted(1, None, 2)]
// The second VM is placed only after the first one is destroyed at 1.5, i.e. on the retry at 2.0.
fn test_vm_creation_retry(#[case] max_retries: u32, #[case] finish_time: Option<f64>, #[case] attempts: u32) {
    let mut config = space_shared_config();
    config.vm_creation_retry_delay = Some(1.);
    config.vm_creation_max_retries = max_retries;
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, config).unwrap();
    add_hosts(&mut cloud_sim, 1, 4);
    let broker = submit(
        &mut cloud_sim,
        vec![(0, 4), (1, 4)],
        vec![cloudlet(0, 6000., 4).with_vm(0), cloudlet(1, 4000., 4).with_vm(1)],
    );
    cloud_sim.start();

    let broker = broker.borrow();
    let first = broker.cloudlet(0).unwrap();
    assert_abs_diff_eq!(first.finish_time().unwrap(), 1.5, epsilon = 1e-9);
    let second = broker.cloudlet(1).unwrap();
    match finish_time {
        Some(time) => {
            assert_eq!(second.status(), CloudletStatus::Finished);
            assert_abs_diff_eq!(second.finish_time().unwrap(), time, epsilon = 1e-9);
        }
        None => {
            assert_eq!(second.status(), CloudletStatus::Waiting);
            assert_eq!(broker.vm_record(1).unwrap().status, VmStatus::CreationFailed);
        }
    }
    let vm = broker.vm_list().find(|vm| vm.id == 1).unwrap();
    assert_eq!(vm.creation_attempts(), attempts);
}

#[test]
// Destroying a VM aborts its cloudlets, and a request with an outdated generation is ignored.
fn test_destroy_vm_and_stale_request() {
    let mut config = space_shared_config();
    config.destroy_idle_vms = false;
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, config).unwrap();
    add_hosts(&mut cloud_sim, 1, 8);
    let broker = submit(
        &mut cloud_sim,
        vec![(0, 4), (1, 4)],
        vec![cloudlet(0, 10000., 4).with_vm(0), cloudlet(1, 10000., 4).with_vm(1)],
    );
    cloud_sim.step_until_time(1.);
    let generation = broker.borrow().vm_record(1).unwrap().generation;
    assert!(generation > 0);

    // stale generation
    let dc_id = cloud_sim.datacenter_id();
    cloud_sim.context().emit(
        VmDestroyRequest {
            vm_id: 1,
            generation: generation + 100,
        },
        dc_id,
        0.,
    );
    assert!(broker.borrow_mut().destroy_vm(0));
    assert!(!broker.borrow_mut().destroy_vm(0));
    cloud_sim.step_until_time(1.5);
    assert!(cloud_sim.datacenter().borrow().vm(1).is_some());
    assert!(cloud_sim.datacenter().borrow().vm(0).is_none());
    assert_eq!(free_pes(&cloud_sim, 0), 4);

    cloud_sim.start();
    let broker = broker.borrow();
    let aborted = broker.cloudlet(0).unwrap();
    assert_eq!(aborted.status(), CloudletStatus::Failed);
    assert_abs_diff_eq!(aborted.finished_length(), 4000., epsilon = 1e-6);
    assert_eq!(broker.cloudlet(1).unwrap().status(), CloudletStatus::Finished);

    let summary = broker.summary();
    assert_eq!(summary.cloudlets_finished, 1);
    assert_eq!(summary.cloudlets_failed, 1);
    assert_eq!(summary.vms_placed, 2);
}

#[test]
fn test_pause_resume_and_cancel() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, space_shared_config()).unwrap();
    add_hosts(&mut cloud_sim, 1, 8);
    // the cloudlet on the second VM keeps the simulation going until 3.0
    let broker = submit(
        &mut cloud_sim,
        vec![(0, 4), (1, 4)],
        vec![
            cloudlet(0, 4000., 2).with_vm(0),
            cloudlet(1, 4000., 2).with_vm(0),
            cloudlet(2, 12000., 4).with_vm(1),
        ],
    );
    cloud_sim.step_until_time(1.);
    assert!(broker.borrow_mut().pause_cloudlet(0));
    assert!(broker.borrow_mut().cancel_cloudlet(1));
    cloud_sim.step_until_time(3.);
    assert_abs_diff_eq!(cloud_sim.clock(), 3., epsilon = 1e-9);
    assert_eq!(
        cloud_sim.datacenter().borrow().find_cloudlet(0).unwrap().status(),
        CloudletStatus::Paused
    );
    assert!(broker.borrow_mut().resume_cloudlet(0));
    cloud_sim.start();

    let broker = broker.borrow();
    let resumed = broker.cloudlet(0).unwrap();
    assert_eq!(resumed.status(), CloudletStatus::Finished);
    // 2000 MI done before the pause, the rest after the resume at 3.0
    assert_abs_diff_eq!(resumed.finish_time().unwrap(), 4., epsilon = 1e-9);
    let canceled = broker.cloudlet(1).unwrap();
    assert_eq!(canceled.status(), CloudletStatus::Failed);
    assert_abs_diff_eq!(canceled.finish_time().unwrap(), 1., epsilon = 1e-9);
}

#[test]
// Cloudlets still running at the end time are handed back unfinished.
fn test_simulation_end_time() {
    let mut config = space_shared_config();
    config.simulation_end_time = Some(1.);
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, config).unwrap();
    add_hosts(&mut cloud_sim, 1, 8);
    let broker = submit(&mut cloud_sim, vec![(0, 4)], vec![cloudlet(0, 10000., 4)]);
    let end_time = cloud_sim.start();
    assert_abs_diff_eq!(end_time, 1., epsilon = 1e-9);
    assert!(cloud_sim.is_finished());

    let broker = broker.borrow();
    let cloudlet = broker.cloudlet(0).unwrap();
    assert_eq!(cloudlet.status(), CloudletStatus::Executing);
    assert_abs_diff_eq!(cloudlet.finished_length(), 4000., epsilon = 1e-6);
    assert_eq!(broker.summary().cloudlets_unfinished, 1);
    assert_eq!(free_pes(&cloud_sim, 0), 8);
}

#[test]
// Entities carried by pending events are recovered when the simulation is finished early.
fn test_finish_recovers_in_flight_entities() {
    let mut config = space_shared_config();
    config.message_delay = 1.;
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, config).unwrap();
    add_hosts(&mut cloud_sim, 1, 8);
    let broker = submit(&mut cloud_sim, vec![(0, 4)], vec![cloudlet(0, 1000., 4)]);
    cloud_sim.step_until_time(0.5);
    cloud_sim.finish();

    let broker = broker.borrow();
    assert_eq!(broker.vm_list().count(), 1);
    assert_eq!(broker.cloudlet_submitted_list().len(), 1);
    assert_eq!(broker.summary().cloudlets_unfinished, 1);

    // the creation request was never answered, so the VM counts as unplaced
    let summary = broker.summary();
    assert_eq!(summary.vms_submitted, 1);
    assert_eq!(summary.vms_placed, 0);
    assert_eq!(summary.vms_unplaced, 1);
    assert_eq!(summary.vms_placed + summary.vms_unplaced, summary.vms_submitted);
    assert_eq!(broker.vm_record(0).unwrap().status, VmStatus::CreationFailed);
}

#[test]
fn test_config_from_file() {
    let config = SimulationConfig::from_file(&name_wrapper("config.yaml")).unwrap();
    assert_eq!(config.allocation_policy, "BestFit");
    assert_eq!(config.vm_creation_retry_delay, Some(1.));
    assert_eq!(config.hosts.len(), 2);

    let sim = Simulation::new(123);
    let cloud_sim = CloudSimulation::new(sim, config).unwrap();
    let datacenter = cloud_sim.datacenter();
    let datacenter = datacenter.borrow();
    assert_eq!(datacenter.hosts().len(), 3);
    assert_eq!(datacenter.hosts()[1].pe_count(), 8);
    assert_eq!(datacenter.hosts()[2].pe_count(), 16);
    assert_eq!(datacenter.hosts()[2].vm_scheduler_name(), "TimeShared");
}

#[rstest]
#[case("allocation_policy: NextFit")]
#[case("cloudlet_scheduler: Lottery")]
#[case("message_delay: -1.0")]
#[case("hosts: [{pes: 4, pe_mips: 1000, ram: 1024, bw: 100, storage: 1000, vm_scheduler: Fancy}]")]
fn test_invalid_config(#[case] yaml: &str) {
    assert!(SimulationConfig::from_yaml_str(yaml).is_err());
}

#[test]
// A config built in code is validated even when the allocation policy is passed explicitly.
fn test_explicit_policy_validates_config() {
    let mut config = space_shared_config();
    config.message_delay = -1.;
    let sim = Simulation::new(123);
    let result = CloudSimulation::with_allocation_policy(sim, config, Box::new(FirstFit::new()));
    assert!(matches!(result, Err(CloudSimError::Config(_))));

    let sim = Simulation::new(123);
    let result = CloudSimulation::with_allocation_policy(sim, space_shared_config(), Box::new(FirstFit::new()));
    assert!(result.is_ok());
}

#[test]
fn test_save_cloudlet_records() {
    let sim = Simulation::new(123);
    let mut cloud_sim = CloudSimulation::new(sim, space_shared_config()).unwrap();
    add_hosts(&mut cloud_sim, 1, 8);
    let broker = submit(
        &mut cloud_sim,
        vec![(0, 4)],
        vec![cloudlet(0, 1000., 2), cloudlet(1, 2000., 2)],
    );
    cloud_sim.start();

    let path = std::env::temp_dir().join("cloudsim_cloudlet_records.csv");
    let path = path.to_str().unwrap();
    save_cloudlet_records(path, broker.borrow().cloudlet_submitted_list()).unwrap();

    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert!(headers.iter().any(|h| h == "finish_time"));
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(records.len(), 2);
    assert_eq!(&records[0][0], "0");
    assert_eq!(&records[0][1], "finished");
    std::fs::remove_file(path).unwrap();
}
