//! Validation results

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Outcome of one validation test
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TestStatus {
    Passed,
    Failed,
    /// Measured and reported, not scored
    Informational,
    /// Not enough data to score
    Skipped { reason: String },
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
            Self::Informational => write!(f, "INFO"),
            Self::Skipped { reason } => write!(f, "SKIP ({})", reason),
        }
    }
}

/// One statistic scored against a target
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetVerdict {
    pub target: String,
    pub limit: f64,
    pub observed: f64,
    pub passed: bool,
}

impl TargetVerdict {
    /// Pass when `observed` is strictly below `limit`
    pub fn below(target: impl Into<String>, limit: f64, observed: f64) -> Self {
        Self {
            target: target.into(),
            limit,
            observed,
            passed: observed < limit,
        }
    }
}

/// Result of a single validation test
///
/// Statistics are in µs for latency and jitter tests and MB/s for the
/// throughput test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    name: String,
    #[serde(flatten)]
    status: TestStatus,
    sample_count: usize,
    statistics: BTreeMap<String, f64>,
    verdicts: Vec<TargetVerdict>,
}

impl TestResult {
    /// A scored result: Passed when every verdict passed
    pub(crate) fn scored(
        name: &str,
        sample_count: usize,
        statistics: BTreeMap<String, f64>,
        verdicts: Vec<TargetVerdict>,
    ) -> Self {
        let status = if verdicts.iter().all(|v| v.passed) {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        Self {
            name: name.to_string(),
            status,
            sample_count,
            statistics,
            verdicts,
        }
    }

    pub(crate) fn informational(
        name: &str,
        sample_count: usize,
        statistics: BTreeMap<String, f64>,
    ) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Informational,
            sample_count,
            statistics,
            verdicts: Vec::new(),
        }
    }

    pub(crate) fn skipped(name: &str, reason: String) -> Self {
        Self {
            name: name.to_string(),
            status: TestStatus::Skipped { reason },
            sample_count: 0,
            statistics: BTreeMap::new(),
            verdicts: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> &TestStatus {
        &self.status
    }

    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    pub fn statistics(&self) -> &BTreeMap<String, f64> {
        &self.statistics
    }

    /// Look up one named statistic
    pub fn statistic(&self, name: &str) -> Option<f64> {
        self.statistics.get(name).copied()
    }

    pub fn verdicts(&self) -> &[TargetVerdict] {
        &self.verdicts
    }

    pub fn is_failed(&self) -> bool {
        self.status == TestStatus::Failed
    }
}

impl fmt::Display for TestResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} [{}] ({} samples)", self.name, self.status, self.sample_count)?;
        for (name, value) in &self.statistics {
            writeln!(f, "  {:<8} {:>12.2}", name, value)?;
        }
        for verdict in &self.verdicts {
            writeln!(
                f,
                "  {} {:.2} < {:.2}: {}",
                verdict.target,
                verdict.observed,
                verdict.limit,
                if verdict.passed { "ok" } else { "missed" }
            )?;
        }
        Ok(())
    }
}

/// Results of a full validation run, in execution order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    generated_at: DateTime<Utc>,
    results: Vec<TestResult>,
}

impl ValidationReport {
    pub(crate) fn new(results: Vec<TestResult>) -> Self {
        Self {
            generated_at: Utc::now(),
            results,
        }
    }

    pub fn generated_at(&self) -> DateTime<Utc> {
        self.generated_at
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    /// Result of the test called `name`
    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.results.iter().find(|r| r.name == name)
    }

    /// True when no test failed (skipped and informational tests count as passing)
    pub fn passed(&self) -> bool {
        !self.results.iter().any(TestResult::is_failed)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Validation report ({})",
            self.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        for result in &self.results {
            write!(f, "{}", result)?;
        }
        write!(
            f,
            "Overall: {}",
            if self.passed() { "PASS" } else { "FAIL" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_verdict_is_strict() {
        assert!(TargetVerdict::below("mean", 100.0, 99.9).passed);
        assert!(!TargetVerdict::below("mean", 100.0, 100.0).passed);
    }

    #[test]
    fn test_scored_status() {
        let passed = TestResult::scored(
            "latency",
            10,
            stats(&[("mean", 50.0)]),
            vec![TargetVerdict::below("mean", 100.0, 50.0)],
        );
        assert_eq!(passed.status(), &TestStatus::Passed);
        assert_eq!(passed.statistic("mean"), Some(50.0));
        assert_eq!(passed.statistic("p99"), None);

        let failed = TestResult::scored(
            "latency",
            10,
            stats(&[("mean", 150.0)]),
            vec![TargetVerdict::below("mean", 100.0, 150.0)],
        );
        assert!(failed.is_failed());
    }

    #[test]
    fn test_report_passed_ignores_skipped() {
        let report = ValidationReport::new(vec![
            TestResult::skipped("jitter", "not enough samples".into()),
            TestResult::informational("throughput", 3, stats(&[("mean", 1000.0)])),
        ]);
        assert!(report.passed());
        assert!(report.get("throughput").is_some());
        assert!(report.get("latency").is_none());
    }

    #[test]
    fn test_report_fails_on_any_failure() {
        let report = ValidationReport::new(vec![TestResult::scored(
            "jitter",
            5,
            stats(&[("max", 12.0)]),
            vec![TargetVerdict::below("max_jitter_us", 10.0, 12.0)],
        )]);
        assert!(!report.passed());
        assert!(report.to_string().ends_with("Overall: FAIL"));
    }

    #[test]
    fn test_result_serializes_status_inline() {
        let result = TestResult::skipped("jitter", "need 2 samples".into());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["name"], "jitter");
        assert_eq!(json["status"], "skipped");
        assert_eq!(json["reason"], "need 2 samples");
    }
}
