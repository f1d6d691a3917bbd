//! Result aggregation and reporting.
//!
//! One invocation accumulates a change flag and named result payloads in a
//! [`ResultAggregator`]. When it ends, the engine hands either an [`Outcome`]
//! or a [`Failure`] to the caller's [`Reporter`].

use crate::error::SqueezerError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error as _;

/// Collects the change flag and result payloads of one invocation.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    changed: bool,
    results: Map<String, Value>,
}

impl ResultAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the change flag. It is never lowered again.
    pub fn set_changed(&mut self) {
        self.changed = true;
    }

    /// Returns the change flag.
    pub fn changed(&self) -> bool {
        self.changed
    }

    /// Stores `value` under `key`, replacing an earlier value.
    pub fn set_result(&mut self, key: impl Into<String>, value: Value) {
        self.results.insert(key.into(), value);
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.results.get(key)
    }

    /// Converts the collected state into an outcome.
    pub fn into_outcome(self) -> Outcome {
        Outcome {
            changed: self.changed,
            results: self.results,
        }
    }
}

/// The successful result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Outcome {
    /// Whether server state changed (or would have, in check mode).
    pub changed: bool,
    /// Result payloads by key.
    #[serde(flatten)]
    pub results: Map<String, Value>,
}

/// The failed result of one invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// Always true.
    pub failed: bool,
    /// Error message.
    pub msg: String,
    /// Whether server state changed before the failure.
    pub changed: bool,
    /// Diagnostic trace, present for unexpected errors only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl Failure {
    /// Builds a failure report for `error`.
    pub fn from_error(error: &SqueezerError, changed: bool) -> Self {
        let exception = (!error.is_domain()).then(|| {
            let mut trace = format!("{error:?}");
            let mut source = error.source();
            while let Some(cause) = source {
                trace.push_str("\ncaused by: ");
                trace.push_str(&cause.to_string());
                source = cause.source();
            }
            trace
        });
        Self {
            failed: true,
            msg: error.to_string(),
            changed,
            exception,
        }
    }
}

/// Front-end capability receiving the end result of an invocation.
pub trait Reporter {
    /// Reports a successful invocation.
    fn report_result(&mut self, outcome: &Outcome);

    /// Reports a failed invocation.
    fn report_failure(&mut self, failure: &Failure);
}

/// A reporter that keeps whatever it is given. Useful in tests.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    /// Reported outcomes.
    pub outcomes: Vec<Outcome>,
    /// Reported failures.
    pub failures: Vec<Failure>,
}

impl Reporter for CollectingReporter {
    fn report_result(&mut self, outcome: &Outcome) {
        self.outcomes.push(outcome.clone());
    }

    fn report_failure(&mut self, failure: &Failure) {
        self.failures.push(failure.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::Capability;
    use serde_json::json;

    #[test]
    fn aggregator_collects() {
        let mut results = ResultAggregator::new();
        assert!(!results.changed());
        results.set_result("remote", json!({"name": "r1"}));
        results.set_changed();
        results.set_changed();
        results.set_result("remote", json!({"name": "r2"}));

        let outcome = results.into_outcome();
        assert!(outcome.changed);
        assert_eq!(outcome.results["remote"]["name"], "r2");
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({"changed": true, "remote": {"name": "r2"}})
        );
    }

    #[test]
    fn domain_failure_has_no_trace() {
        let error = SqueezerError::capability("file content", Capability::Update);
        let failure = Failure::from_error(&error, false);
        assert!(failure.failed);
        assert_eq!(failure.msg, "this file content is immutable");
        assert!(failure.exception.is_none());
        assert!(serde_json::to_value(&failure)
            .unwrap()
            .get("exception")
            .is_none());
    }

    #[test]
    fn unexpected_failure_has_trace() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "payload.bin");
        let error = SqueezerError::from(io);
        let failure = Failure::from_error(&error, true);
        assert!(failure.changed);
        let trace = failure.exception.unwrap();
        assert!(trace.contains("Io"));
        assert!(trace.contains("payload.bin"));
    }
}
