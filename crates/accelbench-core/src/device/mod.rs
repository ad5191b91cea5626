//! Device control plane
//!
//! This module contains everything needed to talk to one accelerator:
//! - Lifecycle state machine and operations ([`session`])
//! - Validated device configuration ([`config`])
//! - Immutable performance samples ([`sample`])
//! - The consumed transport contract ([`transport`]) and a software device ([`simulated`])
//! - Pluggable latency policy per device family ([`model`])
//! - Injectable time and variation sources ([`clock`], [`source`])
//! - Structured operation events ([`event`])

pub mod clock;
pub mod config;
pub mod event;
pub mod model;
pub mod sample;
pub mod session;
pub mod simulated;
pub mod source;
pub mod transport;

use std::time::Duration;
use thiserror::Error;

pub use config::{ConfigField, ConfigUpdate, DeviceConfig};
pub use sample::{ComponentStatus, Sample, SubsystemStatus};
pub use transport::{DeviceInfo, Phase, Transport, TransportError};

/// Errors that can occur during device session operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Connection failed during {step}: {reason}")]
    Connection { step: &'static str, reason: String },

    #[error("Device not connected (session is {state})")]
    NotConnected { state: session::SessionState },

    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: ConfigField, reason: String },

    #[error("Stream failed in {phase} phase: {reason}")]
    Stream { phase: Phase, reason: String },

    #[error("{operation} exceeded timeout of {}µs", .limit.as_micros())]
    Timeout {
        operation: event::Operation,
        limit: Duration,
    },
}

impl SessionError {
    /// Whether this error left the session in the Error state
    ///
    /// Fatal errors require an explicit `disconnect()`/`connect()` cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Stream { .. } | Self::Timeout { .. }
        )
    }

    /// Short error kind name used in events and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "ConnectionError",
            Self::NotConnected { .. } => "NotConnectedError",
            Self::InvalidConfig { .. } => "InvalidConfigError",
            Self::Stream { .. } => "StreamError",
            Self::Timeout { .. } => "TimeoutError",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors() {
        let err = SessionError::Stream {
            phase: Phase::Compute,
            reason: "bus fault".into(),
        };
        assert!(err.is_fatal());
        assert_eq!(err.kind(), "StreamError");

        let err = SessionError::NotConnected {
            state: session::SessionState::Disconnected,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.kind(), "NotConnectedError");
    }

    #[test]
    fn test_error_display_names_field() {
        let err = SessionError::InvalidConfig {
            field: ConfigField::ActiveCores,
            reason: "must be at least 1".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("active_cores"));
        assert!(msg.contains("must be at least 1"));
    }

    #[test]
    fn test_timeout_display() {
        let err = SessionError::Timeout {
            operation: event::Operation::Stream,
            limit: Duration::from_micros(250),
        };
        assert_eq!(err.to_string(), "stream exceeded timeout of 250µs");
    }
}
