//! Resource utilization models of cloudlets.

use std::rc::Rc;

use dyn_clone::{clone_trait_object, DynClone};

/// Maps the time elapsed since the cloudlet started executing to the fraction of the
/// requested resource which is actually consumed.
///
/// Returned values are expected in `[0, 1]`, callers additionally clamp them.
pub trait UtilizationModel: DynClone {
    fn utilization(&self, elapsed: f64) -> f64;
}

clone_trait_object!(UtilizationModel);

/// Always uses the whole requested resource.
#[derive(Clone, Default)]
pub struct FullUtilization;

impl FullUtilization {
    pub fn new() -> Self {
        Self {}
    }
}

impl UtilizationModel for FullUtilization {
    fn utilization(&self, _elapsed: f64) -> f64 {
        1.
    }
}

/// Uses a constant fraction of the requested resource.
#[derive(Clone)]
pub struct ConstantUtilization {
    value: f64,
}

impl ConstantUtilization {
    pub fn new(value: f64) -> Self {
        Self {
            value: value.clamp(0., 1.),
        }
    }
}

impl UtilizationModel for ConstantUtilization {
    fn utilization(&self, _elapsed: f64) -> f64 {
        self.value
    }
}

/// Utilization defined by an arbitrary function of elapsed time.
#[derive(Clone)]
pub struct DynamicUtilization {
    func: Rc<dyn Fn(f64) -> f64>,
}

impl DynamicUtilization {
    pub fn from_fn<F>(func: F) -> Self
    where
        F: Fn(f64) -> f64 + 'static,
    {
        Self { func: Rc::new(func) }
    }

    /// `initial + slope * elapsed`, clamped to `[0, 1]`.
    pub fn linear(initial: f64, slope: f64) -> Self {
        Self::from_fn(move |elapsed| initial + slope * elapsed)
    }
}

impl UtilizationModel for DynamicUtilization {
    fn utilization(&self, elapsed: f64) -> f64 {
        let value = (self.func)(elapsed.max(0.));
        if value.is_nan() {
            return 0.;
        }
        value.clamp(0., 1.)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_are_clamped() {
        assert_eq!(ConstantUtilization::new(1.5).utilization(3.), 1.);
        assert_eq!(ConstantUtilization::new(-1.).utilization(3.), 0.);
        let model = DynamicUtilization::linear(0.2, 0.1);
        assert_eq!(model.utilization(0.), 0.2);
        assert!((model.utilization(3.) - 0.5).abs() < 1e-12);
        assert_eq!(model.utilization(100.), 1.);
    }
}
