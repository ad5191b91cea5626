//! Device configuration and validated partial updates
//!
//! The configuration is a fixed schema of four fields. Updates name fields
//! through [`ConfigUpdate`], never by string lookup, and are applied
//! all-or-nothing: every supplied field is checked before any is committed.

use super::transport::DeviceInfo;
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_window_size() -> u32 {
    1024
}

fn default_active_cores() -> u32 {
    4
}

fn default_data_rate() -> u32 {
    1000
}

fn default_filter_threshold() -> u32 {
    100
}

/// Accelerator configuration parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device-side processing window (samples)
    #[serde(default = "default_window_size")]
    pub window_size: u32,
    /// Compute cores enabled on the device
    #[serde(default = "default_active_cores")]
    pub active_cores: u32,
    /// Target data rate (MB/s)
    #[serde(default = "default_data_rate")]
    pub data_rate: u32,
    /// Filter threshold applied by the compute kernel
    #[serde(default = "default_filter_threshold")]
    pub filter_threshold: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            active_cores: default_active_cores(),
            data_rate: default_data_rate(),
            filter_threshold: default_filter_threshold(),
        }
    }
}

/// Known configuration fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigField {
    WindowSize,
    ActiveCores,
    DataRate,
    FilterThreshold,
}

impl ConfigField {
    /// All fields in schema order
    pub const ALL: [ConfigField; 4] = [
        Self::WindowSize,
        Self::ActiveCores,
        Self::DataRate,
        Self::FilterThreshold,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::WindowSize => "window_size",
            Self::ActiveCores => "active_cores",
            Self::DataRate => "data_rate",
            Self::FilterThreshold => "filter_threshold",
        }
    }
}

impl fmt::Display for ConfigField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A partial configuration update
///
/// Unset fields keep their current value.
///
/// # Example
/// ```
/// use accelbench_core::device::config::{ConfigUpdate, DeviceConfig};
///
/// let update = ConfigUpdate::new().active_cores(8).data_rate(2000);
/// let merged = update.merged_into(&DeviceConfig::default());
/// assert_eq!(merged.active_cores, 8);
/// assert_eq!(merged.window_size, 1024);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_threshold: Option<u32>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn window_size(mut self, value: u32) -> Self {
        self.window_size = Some(value);
        self
    }

    pub fn active_cores(mut self, value: u32) -> Self {
        self.active_cores = Some(value);
        self
    }

    pub fn data_rate(mut self, value: u32) -> Self {
        self.data_rate = Some(value);
        self
    }

    pub fn filter_threshold(mut self, value: u32) -> Self {
        self.filter_threshold = Some(value);
        self
    }

    /// Update that sets every field to the values of `config`
    pub fn from_config(config: &DeviceConfig) -> Self {
        Self {
            window_size: Some(config.window_size),
            active_cores: Some(config.active_cores),
            data_rate: Some(config.data_rate),
            filter_threshold: Some(config.filter_threshold),
        }
    }

    /// True when no field is supplied
    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }

    /// Supplied fields with their requested values, in schema order
    pub fn fields(&self) -> Vec<(ConfigField, u32)> {
        [
            (ConfigField::WindowSize, self.window_size),
            (ConfigField::ActiveCores, self.active_cores),
            (ConfigField::DataRate, self.data_rate),
            (ConfigField::FilterThreshold, self.filter_threshold),
        ]
        .into_iter()
        .filter_map(|(field, value)| value.map(|v| (field, v)))
        .collect()
    }

    /// Check every supplied field against its domain and the device limits
    ///
    /// Returns the first offending field and the reason.
    pub fn validate(&self, limits: &DeviceInfo) -> Result<(), (ConfigField, String)> {
        for (field, value) in self.fields() {
            validate_field(field, value, limits).map_err(|reason| (field, reason))?;
        }
        Ok(())
    }

    /// Apply the supplied fields on top of `base` without validation
    pub fn merged_into(&self, base: &DeviceConfig) -> DeviceConfig {
        DeviceConfig {
            window_size: self.window_size.unwrap_or(base.window_size),
            active_cores: self.active_cores.unwrap_or(base.active_cores),
            data_rate: self.data_rate.unwrap_or(base.data_rate),
            filter_threshold: self.filter_threshold.unwrap_or(base.filter_threshold),
        }
    }
}

fn validate_field(field: ConfigField, value: u32, limits: &DeviceInfo) -> Result<(), String> {
    match field {
        ConfigField::WindowSize if value == 0 => Err("must be a positive number of samples".into()),
        ConfigField::ActiveCores if value == 0 => Err("must be at least 1".into()),
        ConfigField::ActiveCores if value > limits.max_cores => Err(format!(
            "{} exceeds device capability of {} cores",
            value, limits.max_cores
        )),
        ConfigField::DataRate if value == 0 => Err("must be a positive rate in MB/s".into()),
        ConfigField::DataRate if value > limits.max_data_rate => Err(format!(
            "{} MB/s exceeds link bandwidth of {} MB/s",
            value, limits.max_data_rate
        )),
        // u32 already guarantees the threshold is non-negative
        _ => Ok(()),
    }
}

impl DeviceConfig {
    /// Fit the configuration to a device's capabilities
    ///
    /// Returns the fields that had to be lowered.
    pub fn clamp_to(&mut self, limits: &DeviceInfo) -> Vec<ConfigField> {
        let mut clamped = Vec::new();
        if self.active_cores > limits.max_cores {
            self.active_cores = limits.max_cores.max(1);
            clamped.push(ConfigField::ActiveCores);
        }
        if self.data_rate > limits.max_data_rate {
            self.data_rate = limits.max_data_rate.max(1);
            clamped.push(ConfigField::DataRate);
        }
        clamped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> DeviceInfo {
        DeviceInfo {
            name: "test".into(),
            link: "Gen3 x8".into(),
            max_cores: 8,
            max_data_rate: 7880,
        }
    }

    #[test]
    fn test_default_config() {
        let config = DeviceConfig::default();
        assert_eq!(config.window_size, 1024);
        assert_eq!(config.active_cores, 4);
        assert_eq!(config.data_rate, 1000);
        assert_eq!(config.filter_threshold, 100);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let json = r#"{"active_cores": 6}"#;
        let config: DeviceConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.active_cores, 6);
        assert_eq!(config.window_size, 1024);
        assert_eq!(config.filter_threshold, 100);
    }

    #[test]
    fn test_update_fields_in_schema_order() {
        let update = ConfigUpdate::new().filter_threshold(3).window_size(2048);
        assert_eq!(
            update.fields(),
            vec![(ConfigField::WindowSize, 2048), (ConfigField::FilterThreshold, 3)]
        );
        assert!(!update.is_empty());
        assert!(ConfigUpdate::new().is_empty());
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let base = DeviceConfig::default();
        let merged = ConfigUpdate::new().data_rate(1500).merged_into(&base);
        assert_eq!(merged.data_rate, 1500);
        assert_eq!(merged.active_cores, base.active_cores);
        assert_eq!(merged.window_size, base.window_size);
    }

    #[test]
    fn test_validate_rejects_zero_cores() {
        let err = ConfigUpdate::new().active_cores(0).validate(&limits()).unwrap_err();
        assert_eq!(err.0, ConfigField::ActiveCores);
    }

    #[test]
    fn test_validate_rejects_cores_beyond_capability() {
        let err = ConfigUpdate::new().active_cores(9).validate(&limits()).unwrap_err();
        assert_eq!(err.0, ConfigField::ActiveCores);
        assert!(err.1.contains("8 cores"));
    }

    #[test]
    fn test_validate_reports_first_bad_field() {
        let update = ConfigUpdate::new().window_size(0).data_rate(0);
        let err = update.validate(&limits()).unwrap_err();
        assert_eq!(err.0, ConfigField::WindowSize);
    }

    #[test]
    fn test_validate_accepts_zero_threshold() {
        assert!(ConfigUpdate::new().filter_threshold(0).validate(&limits()).is_ok());
    }

    #[test]
    fn test_clamp_to_capabilities() {
        let mut config = DeviceConfig {
            active_cores: 16,
            ..Default::default()
        };
        let small = DeviceInfo {
            max_cores: 2,
            ..limits()
        };
        assert_eq!(config.clamp_to(&small), vec![ConfigField::ActiveCores]);
        assert_eq!(config.active_cores, 2);
    }

    #[test]
    fn test_field_names() {
        let names: Vec<_> = ConfigField::ALL.iter().map(|f| f.to_string()).collect();
        assert_eq!(
            names,
            ["window_size", "active_cores", "data_rate", "filter_threshold"]
        );
    }
}
