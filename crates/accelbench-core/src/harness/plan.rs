//! Validation targets and test sizing

use super::HarnessError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::time::Duration;

fn default_max_mean_latency() -> Duration {
    Duration::from_micros(100)
}

fn default_max_jitter() -> Duration {
    Duration::from_micros(10)
}

fn default_cpu_baseline() -> Duration {
    Duration::from_micros(150)
}

/// Thresholds a device must meet
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationTargets {
    /// Mean stream latency must stay below this
    #[serde(
        rename = "max_mean_latency_us",
        with = "as_micros",
        default = "default_max_mean_latency"
    )]
    pub max_mean_latency: Duration,

    /// Largest latency jitter must stay below this
    #[serde(rename = "max_jitter_us", with = "as_micros", default = "default_max_jitter")]
    pub max_jitter: Duration,

    /// CPU-only latency the speedup figure is computed against
    #[serde(rename = "cpu_baseline_us", with = "as_micros", default = "default_cpu_baseline")]
    pub cpu_baseline: Duration,
}

impl Default for ValidationTargets {
    fn default() -> Self {
        Self {
            max_mean_latency: default_max_mean_latency(),
            max_jitter: default_max_jitter(),
            cpu_baseline: default_cpu_baseline(),
        }
    }
}

fn default_latency_iterations() -> u32 {
    1000
}

fn default_payload_size() -> usize {
    1024
}

fn default_test_duration() -> Duration {
    Duration::from_secs(30)
}

fn default_jitter_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_throughput_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_progress_every() -> u32 {
    100
}

/// How long and how often each validation test samples the device
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationPlan {
    #[serde(default = "default_latency_iterations")]
    pub latency_iterations: u32,

    /// Bytes streamed per latency iteration
    #[serde(default = "default_payload_size")]
    pub payload_size: usize,

    #[serde(rename = "jitter_duration_ms", with = "as_millis", default = "default_test_duration")]
    pub jitter_duration: Duration,

    #[serde(rename = "jitter_interval_ms", with = "as_millis", default = "default_jitter_interval")]
    pub jitter_interval: Duration,

    #[serde(
        rename = "throughput_duration_ms",
        with = "as_millis",
        default = "default_test_duration"
    )]
    pub throughput_duration: Duration,

    #[serde(
        rename = "throughput_interval_ms",
        with = "as_millis",
        default = "default_throughput_interval"
    )]
    pub throughput_interval: Duration,

    /// Log latency progress after this many iterations
    #[serde(default = "default_progress_every")]
    pub progress_every: u32,
}

impl Default for ValidationPlan {
    fn default() -> Self {
        Self {
            latency_iterations: default_latency_iterations(),
            payload_size: default_payload_size(),
            jitter_duration: default_test_duration(),
            jitter_interval: default_jitter_interval(),
            throughput_duration: default_test_duration(),
            throughput_interval: default_throughput_interval(),
            progress_every: default_progress_every(),
        }
    }
}

impl ValidationPlan {
    /// A short run for smoke checks (a few seconds instead of a minute)
    pub fn quick() -> Self {
        Self {
            latency_iterations: 200,
            jitter_duration: Duration::from_secs(3),
            throughput_duration: Duration::from_secs(3),
            ..Self::default()
        }
    }

    /// Reject plans that could never finish or never measure anything
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.payload_size == 0 {
            return Err(HarnessError::InvalidPlan(
                "payload_size must be at least 1 byte".into(),
            ));
        }
        if self.jitter_interval.is_zero() {
            return Err(HarnessError::InvalidPlan(
                "jitter_interval must be positive".into(),
            ));
        }
        if self.throughput_interval.is_zero() {
            return Err(HarnessError::InvalidPlan(
                "throughput_interval must be positive".into(),
            ));
        }
        if self.progress_every == 0 {
            return Err(HarnessError::InvalidPlan(
                "progress_every must be positive".into(),
            ));
        }
        Ok(())
    }
}

mod as_micros {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_micros()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_micros)
    }
}

mod as_millis {
    use super::*;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets() {
        let targets = ValidationTargets::default();
        assert_eq!(targets.max_mean_latency, Duration::from_micros(100));
        assert_eq!(targets.max_jitter, Duration::from_micros(10));
        assert_eq!(targets.cpu_baseline, Duration::from_micros(150));
    }

    #[test]
    fn test_default_plan() {
        let plan = ValidationPlan::default();
        assert_eq!(plan.latency_iterations, 1000);
        assert_eq!(plan.payload_size, 1024);
        assert_eq!(plan.jitter_duration, Duration::from_secs(30));
        assert_eq!(plan.jitter_interval, Duration::from_millis(100));
        assert_eq!(plan.throughput_interval, Duration::from_millis(500));
        assert!(plan.validate().is_ok());
        assert!(ValidationPlan::quick().validate().is_ok());
    }

    #[test]
    fn test_durations_serialize_as_integers() {
        let json = serde_json::to_value(ValidationTargets::default()).unwrap();
        assert_eq!(json["max_mean_latency_us"], 100);
        assert_eq!(json["max_jitter_us"], 10);

        let json = serde_json::to_value(ValidationPlan::default()).unwrap();
        assert_eq!(json["jitter_duration_ms"], 30_000);
        assert_eq!(json["throughput_interval_ms"], 500);
    }

    #[test]
    fn test_partial_plan_uses_defaults() {
        let plan: ValidationPlan =
            serde_json::from_str(r#"{"latency_iterations": 10, "jitter_interval_ms": 50}"#).unwrap();
        assert_eq!(plan.latency_iterations, 10);
        assert_eq!(plan.jitter_interval, Duration::from_millis(50));
        assert_eq!(plan.payload_size, 1024);
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let plan = ValidationPlan {
            jitter_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(matches!(plan.validate(), Err(HarnessError::InvalidPlan(_))));
    }

    #[test]
    fn test_validate_rejects_empty_payload() {
        let plan = ValidationPlan {
            payload_size: 0,
            ..Default::default()
        };
        assert!(matches!(plan.validate(), Err(HarnessError::InvalidPlan(_))));
    }
}
