//! Software accelerator
//!
//! Stands in for real hardware: each call consumes modelled time on the
//! shared [`Clock`] instead of touching a bus. With a [`ManualClock`] and a
//! seeded source the whole device is deterministic.
//!
//! [`ManualClock`]: super::clock::ManualClock

use super::clock::Clock;
use super::config::DeviceConfig;
use super::model::{CoreScalingModel, LatencyModel};
use super::sample::micros;
use super::source::{LcgSource, SampleSource};
use super::transport::{DeviceInfo, Handle, Phase, Transport, TransportError};
use std::sync::Arc;
use std::time::Duration;

/// Link setup delays (init, detection, DMA) of the simulated device
const SETUP_DELAYS: [Duration; 3] = [
    Duration::from_millis(500),
    Duration::from_millis(300),
    Duration::from_millis(300),
];

/// Per-operation latency spread in µs, split across phases by their share
const LATENCY_SPREAD_US: (f64, f64) = (-5.0, 15.0);

/// Simulated PCIe accelerator
pub struct SimulatedTransport {
    clock: Arc<dyn Clock>,
    model: Box<dyn LatencyModel>,
    source: Box<dyn SampleSource>,
    info: DeviceInfo,
    config: DeviceConfig,
    setup_delays: [Duration; 3],
    handle: Option<Handle>,
    next_handle: u32,
    dma_ready: bool,
    present: bool,
}

impl std::fmt::Debug for SimulatedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedTransport")
            .field("info", &self.info)
            .field("config", &self.config)
            .field("handle", &self.handle)
            .field("dma_ready", &self.dma_ready)
            .finish_non_exhaustive()
    }
}

impl SimulatedTransport {
    /// Create a simulated 8-core Gen3 x8 device on the given clock
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            model: Box::new(CoreScalingModel::default()),
            source: Box::new(LcgSource::default()),
            info: DeviceInfo {
                name: "Simulated Accelerator".to_string(),
                link: "Gen3 x8".to_string(),
                max_cores: 8,
                max_data_rate: 7880,
            },
            config: DeviceConfig::default(),
            setup_delays: SETUP_DELAYS,
            handle: None,
            next_handle: 1,
            dma_ready: false,
            present: true,
        }
    }

    pub fn with_model(mut self, model: impl LatencyModel + 'static) -> Self {
        self.model = Box::new(model);
        self
    }

    pub fn with_source(mut self, source: impl SampleSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_info(mut self, info: DeviceInfo) -> Self {
        self.info = info;
        self
    }

    /// Override the init/detect/DMA setup delays
    pub fn with_setup_delays(mut self, delays: [Duration; 3]) -> Self {
        self.setup_delays = delays;
        self
    }

    /// Simulate an unplugged device: detection fails
    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    /// Configuration last pushed by the host
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Consume `cost` of the budget, or the whole budget if it does not fit
    fn spend(&self, cost: Duration, timeout: Duration) -> Result<(), TransportError> {
        if cost > timeout {
            self.clock.sleep(timeout);
            return Err(TransportError::Timeout { after: timeout });
        }
        self.clock.sleep(cost);
        Ok(())
    }

    fn check_handle(&self, handle: Handle) -> Result<(), TransportError> {
        match self.handle {
            Some(open) if open == handle => Ok(()),
            _ => Err(TransportError::Unavailable(format!(
                "handle {} is not open",
                handle.id()
            ))),
        }
    }

    fn phase_cost(&mut self, phase: Phase) -> Duration {
        let share = phase.latency_share();
        let base_us = self.model.base_latency(&self.config).as_secs_f64() * 1e6;
        let (low, high) = LATENCY_SPREAD_US;
        micros((base_us + self.source.uniform(low, high)) * share)
    }
}

impl Transport for SimulatedTransport {
    fn open(&mut self, timeout: Duration) -> Result<Handle, TransportError> {
        self.spend(self.setup_delays[0], timeout)?;
        let handle = Handle::new(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.handle = Some(handle);
        tracing::trace!(handle = handle.id(), "sim_open");
        Ok(handle)
    }

    fn probe(&mut self, handle: Handle, timeout: Duration) -> Result<DeviceInfo, TransportError> {
        self.check_handle(handle)?;
        self.spend(self.setup_delays[1], timeout)?;
        if !self.present {
            return Err(TransportError::Unavailable("no device on the link".into()));
        }
        Ok(self.info.clone())
    }

    fn init_dma(&mut self, handle: Handle, timeout: Duration) -> Result<(), TransportError> {
        self.check_handle(handle)?;
        self.spend(self.setup_delays[2], timeout)?;
        self.dma_ready = true;
        Ok(())
    }

    fn configure(
        &mut self,
        handle: Handle,
        config: &DeviceConfig,
        _timeout: Duration,
    ) -> Result<(), TransportError> {
        self.check_handle(handle)?;
        self.config = *config;
        Ok(())
    }

    fn transfer(
        &mut self,
        handle: Handle,
        data: &[u8],
        phase: Phase,
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        self.check_handle(handle)?;
        if !self.dma_ready {
            return Err(TransportError::Fault("DMA engine not initialised".into()));
        }
        let cost = self.phase_cost(phase);
        self.spend(cost, timeout)?;
        tracing::trace!(%phase, bytes = data.len(), cost_us = cost.as_micros() as u64, "sim_transfer");
        Ok(data.to_vec())
    }

    fn close(&mut self, handle: Handle) -> Result<(), TransportError> {
        self.check_handle(handle)?;
        self.handle = None;
        self.dma_ready = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::clock::ManualClock;
    use crate::device::source::ConstantSource;

    const BUDGET: Duration = Duration::from_secs(2);

    fn device(clock: &ManualClock) -> SimulatedTransport {
        SimulatedTransport::new(Arc::new(clock.clone())).with_source(ConstantSource::new(0.25))
    }

    #[test]
    fn test_setup_consumes_modelled_time() {
        let clock = ManualClock::new();
        let mut sim = device(&clock);
        let handle = sim.open(BUDGET).unwrap();
        sim.probe(handle, BUDGET).unwrap();
        sim.init_dma(handle, BUDGET).unwrap();
        assert_eq!(clock.now(), Duration::from_millis(1100));
    }

    #[test]
    fn test_setup_step_times_out() {
        let clock = ManualClock::new();
        let mut sim = device(&clock);
        let err = sim.open(Duration::from_millis(100)).unwrap_err();
        assert_eq!(
            err,
            TransportError::Timeout {
                after: Duration::from_millis(100)
            }
        );
    }

    #[test]
    fn test_absent_device_fails_probe() {
        let clock = ManualClock::new();
        let mut sim = device(&clock).absent();
        let handle = sim.open(BUDGET).unwrap();
        assert!(matches!(
            sim.probe(handle, BUDGET),
            Err(TransportError::Unavailable(_))
        ));
    }

    #[test]
    fn test_transfer_requires_dma() {
        let clock = ManualClock::new();
        let mut sim = device(&clock);
        let handle = sim.open(BUDGET).unwrap();
        let err = sim.transfer(handle, b"abc", Phase::HostToDevice, BUDGET).unwrap_err();
        assert!(matches!(err, TransportError::Fault(_)));
    }

    #[test]
    fn test_stream_phases_follow_model() {
        let clock = ManualClock::new();
        let mut sim = device(&clock).with_setup_delays([Duration::ZERO; 3]);
        let handle = sim.open(BUDGET).unwrap();
        sim.init_dma(handle, BUDGET).unwrap();
        sim.configure(
            handle,
            &DeviceConfig {
                active_cores: 8,
                ..Default::default()
            },
            BUDGET,
        )
        .unwrap();

        // ConstantSource(0.25) puts the spread at exactly 0µs
        let start = clock.now();
        for phase in Phase::ALL {
            let out = sim.transfer(handle, b"payload", phase, BUDGET).unwrap();
            assert_eq!(out, b"payload");
        }
        assert_eq!(clock.since(start), Duration::from_micros(50));
    }

    #[test]
    fn test_stale_handle_rejected() {
        let clock = ManualClock::new();
        let mut sim = device(&clock);
        let handle = sim.open(BUDGET).unwrap();
        sim.close(handle).unwrap();
        assert!(sim.close(handle).is_err());
    }
}
