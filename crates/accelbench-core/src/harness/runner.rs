//! Test execution
//!
//! Tests run strictly one after another on the caller's thread. All timing
//! is read from the session clock, so with a manual clock a full validation
//! completes instantly and reproducibly.

use super::plan::{ValidationPlan, ValidationTargets};
use super::report::{TargetVerdict, TestResult, ValidationReport};
use super::HarnessError;
use crate::device::session::DeviceSession;
use crate::device::Transport;
use crate::stats::engine::{self, Summary};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const LATENCY_TEST: &str = "latency";
const JITTER_TEST: &str = "jitter";
const THROUGHPUT_TEST: &str = "throughput";

/// Runs validation tests against a connected session
#[derive(Debug, Clone)]
pub struct ValidationHarness {
    plan: ValidationPlan,
    targets: ValidationTargets,
    stop: Arc<AtomicBool>,
}

impl Default for ValidationHarness {
    fn default() -> Self {
        Self {
            plan: ValidationPlan::default(),
            targets: ValidationTargets::default(),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ValidationHarness {
    pub fn new(plan: ValidationPlan, targets: ValidationTargets) -> Result<Self, HarnessError> {
        plan.validate()?;
        Ok(Self {
            plan,
            targets,
            stop: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Share a stop flag with the caller (e.g. a Ctrl+C handler)
    ///
    /// The flag is checked between device operations; raising it makes the
    /// running test return [`HarnessError::Cancelled`].
    pub fn with_stop_flag(mut self, stop: Arc<AtomicBool>) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn plan(&self) -> &ValidationPlan {
        &self.plan
    }

    pub fn targets(&self) -> &ValidationTargets {
        &self.targets
    }

    fn check_stop(&self, test: &'static str) -> Result<(), HarnessError> {
        if self.stop.load(Ordering::SeqCst) {
            tracing::warn!(test, "Validation cancelled");
            return Err(HarnessError::Cancelled { test });
        }
        Ok(())
    }

    /// Stream a fixed payload `iterations` times and score the mean latency
    pub fn latency_test<T: Transport>(
        &self,
        session: &mut DeviceSession<T>,
        iterations: u32,
    ) -> Result<TestResult, HarnessError> {
        tracing::info!(iterations, payload = self.plan.payload_size, "Running latency test");
        let payload = vec![b'x'; self.plan.payload_size];
        let clock = Arc::clone(session.clock());

        let mut latencies = Vec::with_capacity(iterations as usize);
        for i in 1..=iterations {
            self.check_stop(LATENCY_TEST)?;
            let start = clock.now();
            session.stream(&payload)?;
            latencies.push(clock.since(start).as_secs_f64() * 1e6);

            if i % self.plan.progress_every == 0 {
                tracing::info!(completed = i, total = iterations, "Latency test progress");
            }
        }

        let summary = Summary::from_values(&latencies)?;
        let baseline_us = self.targets.cpu_baseline.as_secs_f64() * 1e6;
        let speedup = engine::speedup(summary.mean, baseline_us)?;

        let mut statistics: BTreeMap<String, f64> = summary
            .entries()
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect();
        statistics.insert("speedup".to_string(), speedup);

        let verdict = TargetVerdict::below(
            "mean_latency_us",
            self.targets.max_mean_latency.as_secs_f64() * 1e6,
            summary.mean,
        );
        tracing::info!(
            mean_us = summary.mean,
            p99_us = summary.p99,
            speedup,
            passed = verdict.passed,
            "Latency test complete"
        );
        Ok(TestResult::scored(
            LATENCY_TEST,
            latencies.len(),
            statistics,
            vec![verdict],
        ))
    }

    /// Sample metrics every jitter interval for `duration` and score the
    /// largest latency change between consecutive samples
    pub fn jitter_test<T: Transport>(
        &self,
        session: &mut DeviceSession<T>,
        duration: Duration,
    ) -> Result<TestResult, HarnessError> {
        tracing::info!(duration_ms = duration.as_millis() as u64, "Running jitter test");
        let latencies = self.sample_for(session, duration, self.plan.jitter_interval, JITTER_TEST, |s| {
            s.latency_us()
        })?;

        let series = engine::jitter_series(&latencies)?;
        let mean = engine::mean(&series)?;
        let max = engine::max(&series)?;

        let mut statistics = BTreeMap::new();
        statistics.insert("mean".to_string(), mean);
        statistics.insert("max".to_string(), max);
        if series.len() >= 2 {
            statistics.insert("stdev".to_string(), engine::stdev(&series)?);
        }

        let verdict = TargetVerdict::below(
            "max_jitter_us",
            self.targets.max_jitter.as_secs_f64() * 1e6,
            max,
        );
        tracing::info!(
            samples = latencies.len(),
            mean_us = mean,
            max_us = max,
            passed = verdict.passed,
            "Jitter test complete"
        );
        Ok(TestResult::scored(
            JITTER_TEST,
            latencies.len(),
            statistics,
            vec![verdict],
        ))
    }

    /// Sample throughput every throughput interval for `duration`
    pub fn throughput_test<T: Transport>(
        &self,
        session: &mut DeviceSession<T>,
        duration: Duration,
    ) -> Result<TestResult, HarnessError> {
        tracing::info!(duration_ms = duration.as_millis() as u64, "Running throughput test");
        let throughputs = self.sample_for(
            session,
            duration,
            self.plan.throughput_interval,
            THROUGHPUT_TEST,
            |s| s.throughput_mbps(),
        )?;

        let mut statistics = BTreeMap::new();
        statistics.insert("mean".to_string(), engine::mean(&throughputs)?);
        statistics.insert("min".to_string(), engine::min(&throughputs)?);
        statistics.insert("max".to_string(), engine::max(&throughputs)?);

        tracing::info!(
            samples = throughputs.len(),
            mean_mbps = statistics["mean"],
            "Throughput test complete"
        );
        Ok(TestResult::informational(
            THROUGHPUT_TEST,
            throughputs.len(),
            statistics,
        ))
    }

    /// Read metrics every `interval` until `duration` has elapsed on the
    /// session clock, extracting one value per sample
    fn sample_for<T: Transport>(
        &self,
        session: &mut DeviceSession<T>,
        duration: Duration,
        interval: Duration,
        test: &'static str,
        value: impl Fn(&crate::Sample) -> f64,
    ) -> Result<Vec<f64>, HarnessError> {
        let clock = Arc::clone(session.clock());
        let start = clock.now();
        let mut values = Vec::new();
        while clock.since(start) < duration {
            self.check_stop(test)?;
            let sample = session.read_metrics()?;
            values.push(value(&sample));
            clock.sleep(interval);
        }
        Ok(values)
    }

    /// Run latency, jitter, and throughput tests with the plan's sizes
    ///
    /// Tests that lack data to be scored are reported as skipped; session
    /// failures and cancellation abort the run.
    pub fn full_validation<T: Transport>(
        &self,
        session: &mut DeviceSession<T>,
    ) -> Result<ValidationReport, HarnessError> {
        tracing::info!(
            iterations = self.plan.latency_iterations,
            jitter_ms = self.plan.jitter_duration.as_millis() as u64,
            throughput_ms = self.plan.throughput_duration.as_millis() as u64,
            "Starting full validation"
        );

        let latency = self.latency_test(session, self.plan.latency_iterations);
        let latency = skip_on_prerequisite(LATENCY_TEST, latency)?;

        let jitter = self.jitter_test(session, self.plan.jitter_duration);
        let jitter = skip_on_prerequisite(JITTER_TEST, jitter)?;

        let throughput = self.throughput_test(session, self.plan.throughput_duration);
        let throughput = skip_on_prerequisite(THROUGHPUT_TEST, throughput)?;

        let report = ValidationReport::new(vec![latency, jitter, throughput]);
        tracing::info!(passed = report.passed(), "Full validation complete");
        Ok(report)
    }
}

fn skip_on_prerequisite(
    name: &str,
    result: Result<TestResult, HarnessError>,
) -> Result<TestResult, HarnessError> {
    match result {
        Err(e) if e.is_prerequisite() => {
            tracing::warn!(test = name, reason = %e, "Test skipped");
            Ok(TestResult::skipped(name, e.to_string()))
        }
        other => other,
    }
}
