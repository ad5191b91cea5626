//! Host-to-device transport contract
//!
//! The session never touches registers or DMA descriptors itself. It drives
//! the device through this synchronous request/response interface and treats
//! every call as potentially failing. Backends (a PCIe driver, VFIO, or the
//! software [`SimulatedTransport`](super::simulated::SimulatedTransport))
//! implement it.

use super::config::DeviceConfig;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Opaque handle to an opened device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle(u32);

impl Handle {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u32 {
        self.0
    }
}

/// Capabilities reported by device detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    /// Device name
    pub name: String,
    /// Link description (e.g. "Gen3 x8")
    pub link: String,
    /// Number of compute cores available
    pub max_cores: u32,
    /// Link bandwidth ceiling in MB/s
    pub max_data_rate: u32,
}

/// Phases of one streaming operation, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    /// DMA write from host memory to the device
    HostToDevice,
    /// Compute kernel run on the device
    Compute,
    /// DMA read of results back to the host
    DeviceToHost,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Self::HostToDevice, Self::Compute, Self::DeviceToHost];

    /// Share of the expected operation latency spent in this phase
    ///
    /// Transfers each take a quarter, compute takes half.
    pub fn latency_share(&self) -> f64 {
        match self {
            Self::HostToDevice | Self::DeviceToHost => 0.25,
            Self::Compute => 0.5,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HostToDevice => write!(f, "host-to-device"),
            Self::Compute => write!(f, "compute"),
            Self::DeviceToHost => write!(f, "device-to-host"),
        }
    }
}

/// Errors reported by a transport backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("Device unavailable: {0}")]
    Unavailable(String),

    #[error("Transport fault: {0}")]
    Fault(String),

    #[error("Transport timed out after {after:?}")]
    Timeout { after: Duration },
}

/// Synchronous request/response channel to one device
///
/// Every call receives the time budget it may consume. Implementations that
/// cannot finish within it return [`TransportError::Timeout`].
pub trait Transport: Send {
    /// Initialise the link and open the device
    fn open(&mut self, timeout: Duration) -> Result<Handle, TransportError>;

    /// Detect the device and report its capabilities
    fn probe(&mut self, handle: Handle, timeout: Duration) -> Result<DeviceInfo, TransportError>;

    /// Set up the DMA engine
    fn init_dma(&mut self, handle: Handle, timeout: Duration) -> Result<(), TransportError>;

    /// Push a configuration to the device's control registers
    fn configure(
        &mut self,
        _handle: Handle,
        _config: &DeviceConfig,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        Ok(())
    }

    /// Run one phase of a streaming operation
    ///
    /// Transfer phases move `data` across the link; the compute phase
    /// receives the staged payload and returns the processed one.
    fn transfer(
        &mut self,
        handle: Handle,
        data: &[u8],
        phase: Phase,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;

    /// Release the device
    fn close(&mut self, handle: Handle) -> Result<(), TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self, timeout: Duration) -> Result<Handle, TransportError> {
        (**self).open(timeout)
    }

    fn probe(&mut self, handle: Handle, timeout: Duration) -> Result<DeviceInfo, TransportError> {
        (**self).probe(handle, timeout)
    }

    fn init_dma(&mut self, handle: Handle, timeout: Duration) -> Result<(), TransportError> {
        (**self).init_dma(handle, timeout)
    }

    fn configure(
        &mut self,
        handle: Handle,
        config: &DeviceConfig,
        timeout: Duration,
    ) -> Result<(), TransportError> {
        (**self).configure(handle, config, timeout)
    }

    fn transfer(
        &mut self,
        handle: Handle,
        data: &[u8],
        phase: Phase,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        (**self).transfer(handle, data, phase, timeout)
    }

    fn close(&mut self, handle: Handle) -> Result<(), TransportError> {
        (**self).close(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_shares_sum_to_one() {
        let total: f64 = Phase::ALL.iter().map(|p| p.latency_share()).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::HostToDevice.to_string(), "host-to-device");
        assert_eq!(Phase::Compute.to_string(), "compute");
        assert_eq!(Phase::DeviceToHost.to_string(), "device-to-host");
    }

    #[test]
    fn test_handle_id() {
        assert_eq!(Handle::new(7).id(), 7);
    }
}
