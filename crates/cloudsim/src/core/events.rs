//! Standard simulation events.

/// Dispatch priorities of events scheduled at the same time.
///
/// Processing updates and completions go before releases, which go before placements and
/// submissions, so that capacity freed at some time is visible to requests made at the same time.
pub mod priority {
    use cloudsim_core::EventPriority;

    pub const PROCESSING_UPDATE: EventPriority = 0;
    pub const COMPLETION: EventPriority = 1;
    pub const RELEASE: EventPriority = 2;
    pub const PLACEMENT: EventPriority = 3;
    pub const SUBMISSION: EventPriority = 4;
}

// VM LIFECYCLE EVENTS /////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use crate::core::vm::Vm;

    #[derive(Serialize)]
    pub struct VmCreateRequest {
        pub vm: Vm,
    }

    #[derive(Serialize)]
    pub struct VmCreated {
        pub vm_id: u32,
        pub host_id: u32,
        pub generation: u64,
    }

    #[derive(Serialize)]
    pub struct VmCreationFailed {
        pub vm: Vm,
    }

    #[derive(Serialize)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
        pub generation: u64,
    }

    #[derive(Serialize)]
    pub struct VmDestroyed {
        pub vm: Vm,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
        pub generation: u64,
    }

    /// Carries a cloudlet back to its broker, either finished or failed.
    #[derive(Serialize)]
    pub struct CloudletReturned {
        pub cloudlet: Cloudlet,
    }

    #[derive(Serialize)]
    pub struct CloudletCancelRequest {
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub generation: u64,
    }

    #[derive(Serialize)]
    pub struct CloudletPauseRequest {
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub generation: u64,
    }

    #[derive(Serialize)]
    pub struct CloudletResumeRequest {
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub generation: u64,
    }
}

// DATACENTER EVENTS ///////////////////////////////////////////////////////////////////////////////

pub mod datacenter {
    use serde::Serialize;

    #[derive(Serialize)]
    pub struct UpdateProcessing {}
}

// BROKER EVENTS ///////////////////////////////////////////////////////////////////////////////////

pub mod broker {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;
    use crate::core::vm::Vm;

    #[derive(Serialize)]
    pub struct SubmitVms {
        pub vms: Vec<Vm>,
    }

    #[derive(Serialize)]
    pub struct SubmitCloudlets {
        pub cloudlets: Vec<Cloudlet>,
    }

    #[derive(Serialize)]
    pub struct RetryVmCreation {
        pub vm_id: u32,
    }
}
