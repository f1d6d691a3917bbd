//! Repository version repair.

use crate::entity::Entity;
use crate::error::{SqueezerError, SqueezerResult};
use crate::kind::Capability;
use crate::task::{Task, TaskState};
use crate::transport::{Parameters, Response, Uploads};
use serde::Serialize;
use tracing::info;

/// Progress code counting corrupted units.
pub const CORRUPTED_CODE: &str = "repair.corrupted";
/// Progress code counting repaired units.
pub const REPAIRED_CODE: &str = "repair.repaired";

/// Outcome of an integrity scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// Units found corrupted.
    pub corrupted: u64,
    /// Units repaired.
    pub repaired: u64,
}

impl RepairReport {
    fn from_task(task: &Task) -> SqueezerResult<Self> {
        let counter = |code: &str| {
            task.progress(code)
                .map(|report| report.done.unwrap_or(0))
                .ok_or_else(|| {
                    SqueezerError::Protocol(format!("task {} has no {code} report", task.href))
                })
        };
        Ok(Self {
            corrupted: counter(CORRUPTED_CODE)?,
            repaired: counter(REPAIRED_CODE)?,
        })
    }
}

impl Entity<'_> {
    /// Runs the integrity scan on a repository version.
    ///
    /// Raises the change flag only when units were repaired. Check mode
    /// returns zeros without contacting the server.
    pub fn repair(&self) -> SqueezerResult<RepairReport> {
        let operation_id = self.kind().require(Capability::Repair)?;
        let engine = self.engine();
        if engine.check_mode() {
            return Ok(RepairReport::default());
        }
        let parameters: Parameters = self.primary_key()?;
        let response = engine.invoke(&operation_id, &parameters, None, &Uploads::new())?;
        let task_href = Response::classify(response)?.into_task(&operation_id)?;
        let task = engine.tasks().wait_for(&task_href, TaskState::Completed)?;

        let report = RepairReport::from_task(&task)?;
        info!(corrupted = report.corrupted, repaired = report.repaired, "repair finished");
        if report.repaired > 0 {
            engine.set_changed();
        }
        Ok(report)
    }
}
