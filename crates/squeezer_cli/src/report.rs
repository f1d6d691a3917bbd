//! JSON reporting on stdout.

use serde::Serialize;
use squeezer_core::{Failure, Outcome, Reporter};
use std::io::{self, Write};
use tracing::error;

/// Writes each outcome or failure as one pretty-printed JSON document.
#[derive(Debug)]
pub struct JsonReporter<W: Write> {
    out: W,
}

impl JsonReporter<io::Stdout> {
    /// A reporter writing to stdout.
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonReporter<W> {
    /// A reporter writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Returns the underlying writer.
    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit<T: Serialize>(&mut self, value: &T) {
        let written = serde_json::to_writer_pretty(&mut self.out, value)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(self.out))
            .and_then(|()| self.out.flush());
        if let Err(e) = written {
            error!(error = %e, "failed to write report");
        }
    }
}

impl<W: Write> Reporter for JsonReporter<W> {
    fn report_result(&mut self, outcome: &Outcome) {
        self.emit(outcome);
    }

    fn report_failure(&mut self, failure: &Failure) {
        self.emit(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn outcome_is_flattened() {
        let mut results = serde_json::Map::new();
        results.insert("remote".into(), json!({"name": "r1"}));
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.report_result(&Outcome {
            changed: true,
            results,
        });

        let printed: Value = serde_json::from_slice(&reporter.into_inner()).unwrap();
        assert_eq!(printed, json!({"changed": true, "remote": {"name": "r1"}}));
    }

    #[test]
    fn domain_failure_has_no_exception() {
        let mut reporter = JsonReporter::new(Vec::new());
        reporter.report_failure(&Failure {
            failed: true,
            msg: "Remote 'r1' not found".into(),
            changed: false,
            exception: None,
        });

        let printed: Value = serde_json::from_slice(&reporter.into_inner()).unwrap();
        assert_eq!(
            printed,
            json!({"failed": true, "msg": "Remote 'r1' not found", "changed": false})
        );
    }
}
