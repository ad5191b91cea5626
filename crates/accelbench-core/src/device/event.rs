//! Structured session events
//!
//! Every session operation produces one [`SessionEvent`]. The session logs it
//! through `tracing` and forwards it to subscribers over a bounded channel;
//! where events end up (log files, metrics export) is the subscriber's call.

use super::session::SessionState;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Session operation that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Connect,
    Disconnect,
    UpdateConfig,
    Stream,
    ReadMetrics,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
            Self::UpdateConfig => "update_config",
            Self::Stream => "stream",
            Self::ReadMetrics => "read_metrics",
        })
    }
}

/// Result of an operation as seen by observers
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    Success,
    /// Operation was a no-op in the current state
    Unchanged,
    Failure {
        kind: &'static str,
        message: String,
    },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failure { .. })
    }
}

/// One observed session operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub operation: Operation,
    pub outcome: Outcome,
    /// Time spent in the operation, on the session clock
    pub duration: Duration,
    /// State after the operation completed
    pub session_state: SessionState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_names() {
        assert_eq!(Operation::UpdateConfig.to_string(), "update_config");
        assert_eq!(Operation::ReadMetrics.to_string(), "read_metrics");
    }

    #[test]
    fn test_event_serializes() {
        let event = SessionEvent {
            operation: Operation::Stream,
            outcome: Outcome::Failure {
                kind: "StreamError",
                message: "bus fault".into(),
            },
            duration: Duration::from_micros(30),
            session_state: SessionState::Error,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["operation"], "stream");
        assert_eq!(json["outcome"]["result"], "failure");
        assert_eq!(json["outcome"]["kind"], "StreamError");
        assert_eq!(json["session_state"], "error");
        assert!(!event.outcome.is_success());
    }
}
