use approx::assert_abs_diff_eq;
use rand::prelude::*;
use rand_pcg::Pcg64;
use rstest::rstest;

use cloudsim::core::cloudlet_schedulers::time_shared::TimeSharedCloudletScheduler;
use cloudsim::core::host::Host;
use cloudsim::core::sampler::UniformSampler;
use cloudsim::core::vm::Vm;
use cloudsim::core::vm_allocation_policies::best_fit::BestFit;
use cloudsim::core::vm_allocation_policies::custom::CustomAllocationPolicy;
use cloudsim::core::vm_allocation_policies::first_fit::FirstFit;
use cloudsim::core::vm_allocation_policies::random_probe::RandomProbe;
use cloudsim::core::vm_allocation_policies::worst_fit::WorstFit;
use cloudsim::core::vm_allocation_policy::{allocation_policy_resolver, VmAllocationPolicy};
use cloudsim::core::vm_schedulers::space_shared::SpaceSharedVmScheduler;

fn vm(id: u32, pes: u32) -> Vm {
    Vm::new(id, 1000., pes, 1024, 100, 1000, Box::new(TimeSharedCloudletScheduler::new()))
}

fn host(id: u32, pes: u32) -> Host {
    Host::new(id, pes, 1000., 16384, 10000, 1000000, Box::new(SpaceSharedVmScheduler::new()))
}

fn hosts_with_free_pes(free_pes: &[u32]) -> Vec<Host> {
    free_pes.iter().enumerate().map(|(id, pes)| host(id as u32, *pes)).collect()
}

#[test]
// First fit finds a host whenever some host is suitable, and it is always the earliest one.
fn test_first_fit_is_exhaustive() {
    let mut rand = Pcg64::seed_from_u64(42);
    let mut policy = FirstFit::new();
    for round in 0..200 {
        let host_count = rand.gen_range(1..=20);
        let mut hosts: Vec<Host> = (0..host_count).map(|id| host(id, rand.gen_range(1..=16))).collect();
        // occupy part of the hosts
        for (i, host) in hosts.iter_mut().enumerate() {
            let pes = rand.gen_range(0..=host.pe_count());
            if pes > 0 {
                let vm = vm(1000 + i as u32, pes);
                host.allocate_resources_for_vm(&vm.allocation()).unwrap();
                host.attach_vm(vm);
            }
        }
        let request = vm(round, rand.gen_range(1..=16));
        let expected = hosts.iter().find(|h| h.is_suitable_for_vm(&request)).map(|h| h.id);
        assert_eq!(policy.find_host_for_vm(&hosts, &request), expected);
    }
}

#[test]
fn test_first_fit_no_hosts() {
    let mut policy = FirstFit::new();
    assert_eq!(policy.find_host_for_vm(&[], &vm(0, 1)), None);
}

#[rstest]
#[case::best_fit(Box::new(BestFit::new()), Some(1))]
#[case::worst_fit(Box::new(WorstFit::new()), Some(0))]
#[case::first_fit(Box::new(FirstFit::new()), Some(0))]
fn test_packing_policies(#[case] policy: Box<dyn VmAllocationPolicy>, #[case] expected: Option<u32>) {
    let mut policy = policy;
    let hosts = hosts_with_free_pes(&[8, 4, 6, 1]);
    assert_eq!(policy.find_host_for_vm(&hosts, &vm(0, 2)), expected);
}

#[rstest]
#[case::best_fit(Box::new(BestFit::new()))]
#[case::worst_fit(Box::new(WorstFit::new()))]
#[case::first_fit(Box::new(FirstFit::new()))]
fn test_policies_report_no_suitable_host(#[case] policy: Box<dyn VmAllocationPolicy>) {
    let mut policy = policy;
    let hosts = hosts_with_free_pes(&[2, 4, 3]);
    assert_eq!(policy.find_host_for_vm(&hosts, &vm(0, 5)), None);
}

#[test]
fn test_worst_fit_ties_go_to_earlier_host() {
    let hosts = hosts_with_free_pes(&[4, 8, 8]);
    assert_eq!(WorstFit::new().find_host_for_vm(&hosts, &vm(0, 2)), Some(1));
}

#[test]
// With a single suitable host among N, random probing finds it with probability 1 - (1 - 1/N)^N.
fn test_random_probe_is_not_exhaustive() {
    let n = 10;
    let suitable = 7;
    let hosts: Vec<Host> = (0..n).map(|id| host(id, if id == suitable { 8 } else { 1 })).collect();
    let request = vm(0, 4);
    let mut policy = RandomProbe::new(Box::new(UniformSampler::new(123)));

    let trials = 2000;
    let mut found = 0;
    for _ in 0..trials {
        if let Some(host_id) = policy.find_host_for_vm(&hosts, &request) {
            assert_eq!(host_id, suitable);
            found += 1;
        }
    }
    let rate = found as f64 / trials as f64;
    let expected = 1. - (1. - 1. / n as f64).powi(n as i32);
    assert!(rate < 1.);
    assert_abs_diff_eq!(rate, expected, epsilon = 0.05);
}

#[test]
fn test_random_probe_is_reproducible() {
    let hosts: Vec<Host> = (0..20).map(|id| host(id, 1 + id % 5)).collect();
    let request = vm(0, 4);
    let run = |seed: u64| {
        let mut policy = RandomProbe::new(Box::new(UniformSampler::new(seed)));
        (0..50)
            .map(|_| policy.find_host_for_vm(&hosts, &request))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(7), run(7));
}

#[test]
fn test_custom_policy() {
    let hosts = hosts_with_free_pes(&[8, 8, 8]);
    let mut policy = CustomAllocationPolicy::new(|hosts: &[Host], vm: &Vm| {
        hosts
            .iter()
            .rev()
            .find(|h| h.is_suitable_for_vm(vm))
            .map(|h| h.id)
    });
    assert_eq!(policy.find_host_for_vm(&hosts, &vm(0, 2)), Some(2));
}

#[rstest]
#[case("FirstFit", true)]
#[case("BestFit", true)]
#[case("WorstFit", true)]
#[case("RandomProbe", true)]
#[case("RandomProbe[seed=42]", true)]
#[case("RandomProbe[seed=abc]", false)]
#[case("Unknown", false)]
fn test_resolver(#[case] config_str: &str, #[case] valid: bool) {
    assert_eq!(allocation_policy_resolver(config_str).is_ok(), valid);
}
