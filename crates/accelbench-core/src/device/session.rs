//! Device session lifecycle
//!
//! A [`DeviceSession`] is the exclusive owner of one device connection. It
//! walks the connection state machine, keeps the active configuration, and
//! records one [`Sample`] per successful data-path operation.
//!
//! ```text
//!                connect()                  fatal error
//! Disconnected ───────────▶ Connected ───────────────────▶ Error
//!      ▲                        │                            │
//!      └────── disconnect() ────┴──────── disconnect() ──────┘
//! ```
//!
//! Time is read from an injected [`Clock`] and synthesized variation comes
//! from an injected [`SampleSource`], so a session over a simulated transport
//! with a [`ManualClock`](super::clock::ManualClock) is fully deterministic.

use super::clock::Clock;
use super::config::{ConfigUpdate, DeviceConfig};
use super::event::{Operation, Outcome, SessionEvent};
use super::model::{CoreScalingModel, LatencyModel};
use super::sample::{micros, Sample, SubsystemStatus};
use super::source::{LcgSource, SampleSource};
use super::transport::{DeviceInfo, Handle, Phase, Transport, TransportError};
use super::SessionError;
use crate::stats::window::SampleWindow;
use crate::stats::{StatsError, WindowStatistics};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::Serialize;
use std::fmt;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Budget for each step of the connect sequence
pub const CONNECT_STEP_TIMEOUT: Duration = Duration::from_secs(2);

/// Timeout used by [`DeviceSession::stream`] and [`DeviceSession::read_metrics`]
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(1);

/// Latency variation of a synthesized metrics sample (µs)
const METRICS_LATENCY_SPREAD_US: (f64, f64) = (-5.0, 15.0);

/// Throughput variation of a synthesized metrics sample (MB/s)
const METRICS_THROUGHPUT_SPREAD_MBPS: (f64, f64) = (-50.0, 50.0);

/// Range of self-reported jitter in a synthesized metrics sample (µs)
const METRICS_JITTER_US: (f64, f64) = (0.0, 5.0);

/// Connection state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No device handle held
    Disconnected,
    /// Device set up and accepting operations
    Connected,
    /// A fatal failure occurred; only `disconnect()` leaves this state
    Error,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connected => write!(f, "connected"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Exclusive owner of one accelerator connection
pub struct DeviceSession<T: Transport> {
    transport: T,
    clock: Arc<dyn Clock>,
    source: Box<dyn SampleSource>,
    model: Box<dyn LatencyModel>,
    window: SampleWindow,
    state: SessionState,
    config: DeviceConfig,
    device_info: Option<DeviceInfo>,
    handle: Option<Handle>,
    events: Option<Sender<SessionEvent>>,
}

impl<T: Transport> DeviceSession<T> {
    /// Create a disconnected session over `transport`
    ///
    /// Uses the default core-scaling latency model, a default-seeded LCG
    /// source, and a window of [`crate::DEFAULT_WINDOW_CAPACITY`] samples.
    pub fn new(transport: T, clock: Arc<dyn Clock>) -> Self {
        Self {
            transport,
            clock,
            source: Box::new(LcgSource::default()),
            model: Box::new(CoreScalingModel::default()),
            window: SampleWindow::default(),
            state: SessionState::Disconnected,
            config: DeviceConfig::default(),
            device_info: None,
            handle: None,
            events: None,
        }
    }

    pub fn with_source(mut self, source: impl SampleSource + 'static) -> Self {
        self.source = Box::new(source);
        self
    }

    pub fn with_model(mut self, model: impl LatencyModel + 'static) -> Self {
        self.model = Box::new(model);
        self
    }

    pub fn with_window_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.window = SampleWindow::new(capacity);
        self
    }

    /// Receive an event for every subsequent operation
    ///
    /// Replaces any earlier subscriber. Events are dropped, never queued
    /// without bound, when the receiver falls `capacity` events behind.
    pub fn subscribe(&mut self, capacity: usize) -> Receiver<SessionEvent> {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        self.events = Some(tx);
        rx
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Active configuration (defaults while disconnected)
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Capabilities reported by the device at connect time
    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.device_info.as_ref()
    }

    /// Recent samples, read-only
    pub fn window(&self) -> &SampleWindow {
        &self.window
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Summary of the current window against a CPU baseline latency (µs)
    pub fn statistics(&self, baseline_us: f64) -> Result<WindowStatistics, StatsError> {
        WindowStatistics::from_window(&self.window, baseline_us)
    }

    /// Bring the device up: open, probe, set up DMA, push the default config
    ///
    /// A no-op when already connected. From the Error state this fails until
    /// the session has been disconnected.
    pub fn connect(&mut self) -> Result<(), SessionError> {
        let started = self.clock.now();
        let result = match self.state {
            SessionState::Connected => {
                self.emit(Operation::Connect, started, Outcome::Unchanged);
                return Ok(());
            }
            SessionState::Error => Err(SessionError::Connection {
                step: "connect",
                reason: "session is in error state, disconnect first".into(),
            }),
            SessionState::Disconnected => self.establish(),
        };
        self.finish(Operation::Connect, started, result)
    }

    fn establish(&mut self) -> Result<(), SessionError> {
        tracing::info!("Connecting to device");
        let handle = self
            .transport
            .open(CONNECT_STEP_TIMEOUT)
            .map_err(|e| connection_error("open", e))?;
        tracing::debug!(handle = handle.id(), "Transport opened");

        match self.bring_up(handle) {
            Ok((info, config)) => {
                tracing::info!(
                    device = %info.name,
                    link = %info.link,
                    active_cores = config.active_cores,
                    "Device connected"
                );
                self.handle = Some(handle);
                self.device_info = Some(info);
                self.config = config;
                self.state = SessionState::Connected;
                Ok(())
            }
            Err(e) => {
                if let Err(close_err) = self.transport.close(handle) {
                    tracing::warn!("Failed to release handle after connect error: {}", close_err);
                }
                Err(e)
            }
        }
    }

    fn bring_up(&mut self, handle: Handle) -> Result<(DeviceInfo, DeviceConfig), SessionError> {
        let info = self
            .transport
            .probe(handle, CONNECT_STEP_TIMEOUT)
            .map_err(|e| connection_error("probe", e))?;
        tracing::debug!(
            device = %info.name,
            max_cores = info.max_cores,
            max_data_rate = info.max_data_rate,
            "Device detected"
        );

        self.transport
            .init_dma(handle, CONNECT_STEP_TIMEOUT)
            .map_err(|e| connection_error("init_dma", e))?;

        let mut config = DeviceConfig::default();
        for field in config.clamp_to(&info) {
            tracing::warn!(%field, "Default configuration exceeds device capability, clamped");
        }
        self.transport
            .configure(handle, &config, CONNECT_STEP_TIMEOUT)
            .map_err(|e| connection_error("configure", e))?;

        Ok((info, config))
    }

    /// Release the device and return to defaults
    ///
    /// Always succeeds. Errors closing the transport are logged only.
    pub fn disconnect(&mut self) {
        let started = self.clock.now();
        if self.state == SessionState::Disconnected {
            self.emit(Operation::Disconnect, started, Outcome::Unchanged);
            return;
        }

        if let Some(handle) = self.handle.take() {
            if let Err(e) = self.transport.close(handle) {
                tracing::warn!("Transport close failed: {}", e);
            }
        }
        self.window.clear();
        self.config = DeviceConfig::default();
        self.device_info = None;
        self.state = SessionState::Disconnected;
        tracing::info!("Device disconnected");
        self.emit(Operation::Disconnect, started, Outcome::Success);
    }

    /// Apply a partial configuration update
    ///
    /// Every supplied field is validated before anything changes; on any
    /// rejection the active configuration is left untouched.
    pub fn update_config(&mut self, update: ConfigUpdate) -> Result<(), SessionError> {
        let started = self.clock.now();
        let result = self.apply_update(update);
        self.finish(Operation::UpdateConfig, started, result)
    }

    fn apply_update(&mut self, update: ConfigUpdate) -> Result<(), SessionError> {
        let handle = self.require_connected()?;
        if let Some(info) = &self.device_info {
            update
                .validate(info)
                .map_err(|(field, reason)| SessionError::InvalidConfig { field, reason })?;
        }

        let candidate = update.merged_into(&self.config);
        self.transport
            .configure(handle, &candidate, DEFAULT_OPERATION_TIMEOUT)
            .map_err(|e| match e {
                TransportError::Timeout { .. } => SessionError::Timeout {
                    operation: Operation::UpdateConfig,
                    limit: DEFAULT_OPERATION_TIMEOUT,
                },
                other => SessionError::Stream {
                    phase: Phase::HostToDevice,
                    reason: format!("configuration write failed: {}", other),
                },
            })?;

        for (field, value) in update.fields() {
            tracing::info!(%field, value, "Configuration updated");
        }
        self.config = candidate;
        Ok(())
    }

    /// Push `payload` through the device with the default timeout
    pub fn stream(&mut self, payload: &[u8]) -> Result<Vec<u8>, SessionError> {
        self.stream_with_timeout(payload, DEFAULT_OPERATION_TIMEOUT)
    }

    /// Push `payload` through the host-to-device, compute, and
    /// device-to-host phases and return the processed data
    ///
    /// On success one sample is appended to the window. Any failure moves
    /// the session to Error and appends nothing.
    pub fn stream_with_timeout(
        &mut self,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, SessionError> {
        let started = self.clock.now();
        let result = self.run_stream(payload, timeout, started);
        self.finish(Operation::Stream, started, result)
    }

    fn run_stream(
        &mut self,
        payload: &[u8],
        timeout: Duration,
        started: Duration,
    ) -> Result<Vec<u8>, SessionError> {
        let handle = self.require_connected()?;
        let timed_out = SessionError::Timeout {
            operation: Operation::Stream,
            limit: timeout,
        };
        let expected = self.model.base_latency(&self.config);

        let mut data = payload.to_vec();
        for phase in Phase::ALL {
            let remaining = timeout
                .checked_sub(self.clock.since(started))
                .ok_or_else(|| timed_out.clone())?;
            tracing::trace!(
                %phase,
                expected_us = expected.mul_f64(phase.latency_share()).as_micros() as u64,
                "Stream phase"
            );
            data = self
                .transport
                .transfer(handle, &data, phase, remaining)
                .map_err(|e| match e {
                    TransportError::Timeout { .. } => timed_out.clone(),
                    other => SessionError::Stream {
                        phase,
                        reason: other.to_string(),
                    },
                })?;
        }

        let latency = self.clock.since(started);
        if latency > timeout {
            return Err(timed_out);
        }
        if data.len() != payload.len() {
            return Err(SessionError::Stream {
                phase: Phase::DeviceToHost,
                reason: format!(
                    "device returned {} bytes for a {} byte payload",
                    data.len(),
                    payload.len()
                ),
            });
        }

        let throughput_mbps = if payload.is_empty() || latency.is_zero() {
            self.model.throughput_mbps(&self.config)
        } else {
            payload.len() as f64 / latency.as_secs_f64() / 1e6
        };
        let jitter = self
            .window
            .latest()
            .map(|prev| abs_diff(latency, prev.latency()))
            .unwrap_or_default();

        self.window.push(Sample::new(
            self.clock.now(),
            latency,
            throughput_mbps,
            jitter,
            SubsystemStatus::active(),
        ));
        Ok(data)
    }

    /// Capture a metrics sample with the default timeout
    pub fn read_metrics(&mut self) -> Result<Sample, SessionError> {
        self.read_metrics_with_timeout(DEFAULT_OPERATION_TIMEOUT)
    }

    /// Synthesize a metrics sample from the latency model plus bounded
    /// variation, append it to the window, and return it
    pub fn read_metrics_with_timeout(&mut self, timeout: Duration) -> Result<Sample, SessionError> {
        let started = self.clock.now();
        let result = self.capture_metrics(timeout, started);
        self.finish(Operation::ReadMetrics, started, result)
    }

    fn capture_metrics(&mut self, timeout: Duration, started: Duration) -> Result<Sample, SessionError> {
        self.require_connected()?;

        let base_us = self.model.base_latency(&self.config).as_secs_f64() * 1e6;
        let (low, high) = METRICS_LATENCY_SPREAD_US;
        let latency = micros(base_us + self.source.uniform(low, high));

        let (low, high) = METRICS_THROUGHPUT_SPREAD_MBPS;
        let throughput_mbps =
            (self.model.throughput_mbps(&self.config) + self.source.uniform(low, high)).max(0.0);

        let (low, high) = METRICS_JITTER_US;
        let jitter = micros(self.source.uniform(low, high));

        if self.clock.since(started) > timeout {
            return Err(SessionError::Timeout {
                operation: Operation::ReadMetrics,
                limit: timeout,
            });
        }

        let sample = Sample::new(
            self.clock.now(),
            latency,
            throughput_mbps,
            jitter,
            SubsystemStatus::active(),
        );
        self.window.push(sample.clone());
        Ok(sample)
    }

    fn require_connected(&self) -> Result<Handle, SessionError> {
        match (self.state, self.handle) {
            (SessionState::Connected, Some(handle)) => Ok(handle),
            (state, _) => Err(SessionError::NotConnected { state }),
        }
    }

    /// Apply the state consequences of `result` and report it
    fn finish<R>(
        &mut self,
        operation: Operation,
        started: Duration,
        result: Result<R, SessionError>,
    ) -> Result<R, SessionError> {
        let outcome = match &result {
            Ok(_) => Outcome::Success,
            Err(err) => {
                if err.is_fatal() {
                    self.state = SessionState::Error;
                }
                Outcome::Failure {
                    kind: err.kind(),
                    message: err.to_string(),
                }
            }
        };
        self.emit(operation, started, outcome);
        result
    }

    fn emit(&mut self, operation: Operation, started: Duration, outcome: Outcome) {
        let event = SessionEvent {
            operation,
            outcome,
            duration: self.clock.since(started),
            session_state: self.state,
        };
        let duration_us = event.duration.as_micros() as u64;

        match &event.outcome {
            Outcome::Failure { kind, message } => tracing::warn!(
                %operation,
                kind,
                error = %message,
                duration_us,
                state = %event.session_state,
                "Session operation failed"
            ),
            // Data-path operations run thousands of times per validation
            _ if matches!(operation, Operation::Stream | Operation::ReadMetrics) => tracing::trace!(
                %operation,
                duration_us,
                "Session operation completed"
            ),
            outcome => tracing::info!(
                %operation,
                unchanged = matches!(outcome, Outcome::Unchanged),
                duration_us,
                state = %event.session_state,
                "Session operation completed"
            ),
        }

        if let Some(tx) = &self.events {
            match tx.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::trace!(%operation, "Event channel full, event dropped");
                }
                Err(TrySendError::Disconnected(_)) => {
                    tracing::debug!("Event subscriber gone");
                    self.events = None;
                }
            }
        }
    }
}

impl<T: Transport> fmt::Debug for DeviceSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceSession")
            .field("state", &self.state)
            .field("config", &self.config)
            .field("device_info", &self.device_info)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

fn connection_error(step: &'static str, err: TransportError) -> SessionError {
    SessionError::Connection {
        step,
        reason: err.to_string(),
    }
}

fn abs_diff(a: Duration, b: Duration) -> Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}
