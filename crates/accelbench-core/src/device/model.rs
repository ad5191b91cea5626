//! Latency and throughput policy per device family
//!
//! How configuration maps to expected latency is a property of the device
//! family, not of the session, so it sits behind [`LatencyModel`].

use super::config::DeviceConfig;
use std::time::Duration;

/// Expected performance of a device for a given configuration
pub trait LatencyModel: Send + Sync {
    /// Expected end-to-end latency of one operation
    fn base_latency(&self, config: &DeviceConfig) -> Duration;

    /// Expected sustained throughput in MB/s
    fn throughput_mbps(&self, config: &DeviceConfig) -> f64;
}

/// Linear core-scaling model
///
/// `base_latency = base + (max_cores - active_cores) * per_core_step`, so
/// every core taken away adds a fixed step; throughput grows linearly with
/// active cores.
///
/// # Example
/// ```
/// use accelbench_core::device::config::DeviceConfig;
/// use accelbench_core::device::model::{CoreScalingModel, LatencyModel};
/// use std::time::Duration;
///
/// let model = CoreScalingModel::default();
/// let config = DeviceConfig { active_cores: 6, ..Default::default() };
/// assert_eq!(model.base_latency(&config), Duration::from_micros(70));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoreScalingModel {
    /// Latency with every core active (B0)
    pub base: Duration,
    /// Added latency per inactive core (Cstep)
    pub per_core_step: Duration,
    /// Core count the model is calibrated for (Cmax)
    pub max_cores: u32,
    /// Throughput contributed by each active core (MB/s)
    pub per_core_throughput: f64,
}

impl Default for CoreScalingModel {
    fn default() -> Self {
        Self {
            base: Duration::from_micros(50),
            per_core_step: Duration::from_micros(10),
            max_cores: 8,
            per_core_throughput: 250.0,
        }
    }
}

impl LatencyModel for CoreScalingModel {
    fn base_latency(&self, config: &DeviceConfig) -> Duration {
        let missing = self.max_cores.saturating_sub(config.active_cores);
        self.base + self.per_core_step * missing
    }

    fn throughput_mbps(&self, config: &DeviceConfig) -> f64 {
        config.active_cores as f64 * self.per_core_throughput
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cores: u32) -> DeviceConfig {
        DeviceConfig {
            active_cores: cores,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_cores_hit_base() {
        let model = CoreScalingModel::default();
        assert_eq!(model.base_latency(&config(8)), Duration::from_micros(50));
        assert_eq!(model.throughput_mbps(&config(8)), 2000.0);
    }

    #[test]
    fn test_fewer_cores_raise_latency() {
        let model = CoreScalingModel::default();
        let mut previous = Duration::ZERO;
        for cores in (1..=8).rev() {
            let latency = model.base_latency(&config(cores));
            assert!(latency > previous);
            previous = latency;
        }
        assert_eq!(model.base_latency(&config(4)), Duration::from_micros(90));
    }

    #[test]
    fn test_cores_beyond_calibration_saturate() {
        let model = CoreScalingModel::default();
        assert_eq!(model.base_latency(&config(12)), Duration::from_micros(50));
    }
}
