//! The reconciliation engine.
//!
//! An [`Engine`] is the context shared by everything that happens during one
//! invocation: the transport, the configuration, the cancellation token for
//! task polling and the result aggregator.

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::error::{SqueezerError, SqueezerResult};
use crate::kind::Capability;
use crate::result::{Failure, Outcome, Reporter, ResultAggregator};
use crate::task::TaskMonitor;
use crate::transport::{Attributes, Parameters, Transport, Uploads};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, debug_span, warn};

/// Context of one reconciliation invocation.
pub struct Engine {
    transport: Arc<dyn Transport>,
    config: EngineConfig,
    cancellation: CancellationToken,
    results: Mutex<ResultAggregator>,
}

impl Engine {
    /// Creates an engine owning `transport`.
    pub fn new(config: EngineConfig, transport: impl Transport + 'static) -> Self {
        Self::shared(config, Arc::new(transport))
    }

    /// Creates an engine over a shared transport.
    pub fn shared(config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config,
            cancellation: CancellationToken::new(),
            results: Mutex::new(ResultAggregator::new()),
        }
    }

    /// Replaces the cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns true in check mode.
    pub fn check_mode(&self) -> bool {
        self.config.check_mode
    }

    /// Returns the cancellation token.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// Returns a task monitor bound to this engine.
    pub fn tasks(&self) -> TaskMonitor<'_> {
        TaskMonitor::new(self)
    }

    /// Invokes an operation through the transport.
    ///
    /// In check mode an operation that would change server state is refused
    /// with a protocol error before it reaches the transport.
    pub fn invoke(
        &self,
        operation_id: &str,
        parameters: &Parameters,
        body: Option<&Attributes>,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        let _span = debug_span!("invoke", operation = operation_id).entered();
        if self.check_mode() && is_mutating(operation_id) {
            return Err(SqueezerError::Protocol(format!(
                "{operation_id} refused in check mode"
            )));
        }
        debug!("invoking");
        self.transport
            .invoke(operation_id, parameters, body, uploads)
            .inspect_err(|e| debug!(operation = operation_id, error = %e, "call failed"))
    }

    /// Raises the change flag.
    pub fn set_changed(&self) {
        self.results.lock().set_changed();
    }

    /// Returns the change flag.
    pub fn changed(&self) -> bool {
        self.results.lock().changed()
    }

    /// Stores a result payload.
    pub fn set_result(&self, key: impl Into<String>, value: Value) {
        self.results.lock().set_result(key, value);
    }

    /// Returns a stored result payload.
    pub fn result(&self, key: &str) -> Option<Value> {
        self.results.lock().get(key).cloned()
    }

    /// Takes the collected outcome, leaving an empty aggregator behind.
    pub fn take_outcome(&self) -> Outcome {
        std::mem::take(&mut *self.results.lock()).into_outcome()
    }

    /// Runs `body` and reports its outcome or failure to `reporter`.
    ///
    /// Returns true on success.
    pub fn run<F>(&self, reporter: &mut dyn Reporter, body: F) -> bool
    where
        F: FnOnce(&Engine) -> SqueezerResult<()>,
    {
        match body(self) {
            Ok(()) => {
                reporter.report_result(&self.take_outcome());
                true
            }
            Err(error) => {
                warn!(error = %error, "invocation failed");
                reporter.report_failure(&Failure::from_error(&error, self.changed()));
                false
            }
        }
    }
}

/// Classifies an operation identifier by its capability suffix. Unknown
/// suffixes count as mutating.
fn is_mutating(operation_id: &str) -> bool {
    operation_id
        .rsplit('_')
        .next()
        .and_then(Capability::from_suffix)
        .is_none_or(|capability| capability.is_mutating())
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("changed", &self.changed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SqueezerError;
    use crate::result::CollectingReporter;
    use crate::transport::MockTransport;
    use serde_json::json;

    #[test]
    fn run_reports_outcome() {
        let engine = Engine::new(EngineConfig::new(), MockTransport::new());
        let mut reporter = CollectingReporter::default();

        let ok = engine.run(&mut reporter, |engine| {
            engine.set_result("summary", json!({"artifacts": 1}));
            engine.set_changed();
            Ok(())
        });

        assert!(ok);
        assert!(reporter.failures.is_empty());
        let outcome = &reporter.outcomes[0];
        assert!(outcome.changed);
        assert_eq!(outcome.results["summary"]["artifacts"], 1);
    }

    #[test]
    fn run_reports_failure_with_change_flag() {
        let engine = Engine::new(EngineConfig::new(), MockTransport::new());
        let mut reporter = CollectingReporter::default();

        let ok = engine.run(&mut reporter, |engine| {
            engine.set_changed();
            Err(SqueezerError::NotFound("Remote 'r1'".into()))
        });

        assert!(!ok);
        let failure = &reporter.failures[0];
        assert!(failure.changed);
        assert_eq!(failure.msg, "Remote 'r1' not found");
        assert!(failure.exception.is_none());
    }

    #[test]
    fn check_mode_refuses_mutations() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("remotes_file_file_list", json!({"count": 0, "results": []}));
        let engine = Engine::shared(EngineConfig::new().with_check_mode(true), mock.clone());

        engine
            .invoke("remotes_file_file_list", &Parameters::new(), None, &Uploads::new())
            .unwrap();
        let err = engine
            .invoke("orphans_delete", &Parameters::new(), None, &Uploads::new())
            .unwrap_err();

        assert!(matches!(err, SqueezerError::Protocol(_)));
        assert_eq!(mock.call_count(), 1);
    }

    #[test]
    fn invoke_passes_through() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("orphans_delete", json!({"task": "/t/"}));
        let engine = Engine::shared(EngineConfig::new(), mock.clone());

        let value = engine
            .invoke("orphans_delete", &Parameters::new(), None, &Uploads::new())
            .unwrap();
        assert_eq!(value["task"], "/t/");
        assert_eq!(mock.call_count(), 1);
    }
}
