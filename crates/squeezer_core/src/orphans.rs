//! Orphan cleanup.

use crate::catalog;
use crate::engine::Engine;
use crate::error::SqueezerResult;
use crate::kind::Capability;
use crate::task::{ProgressReport, TaskState};
use crate::transport::{Parameters, Response, Uploads};
use std::collections::BTreeMap;
use tracing::info;

/// Deletes all orphaned content and artifacts.
///
/// Returns the number of removed entities per category, e.g.
/// `{"artifacts": 3, "content": 5}`. Check mode predicts zeros without
/// contacting the server. The change flag is always raised.
pub fn delete_orphans(engine: &Engine) -> SqueezerResult<BTreeMap<String, u64>> {
    let operation_id = catalog::ORPHANS.require(Capability::Delete)?;
    let summary = if engine.check_mode() {
        BTreeMap::from([("artifacts".to_string(), 0), ("content".to_string(), 0)])
    } else {
        let response = engine.invoke(&operation_id, &Parameters::new(), None, &Uploads::new())?;
        let task_href = Response::classify(response)?.into_task(&operation_id)?;
        let task = engine.tasks().wait_for(&task_href, TaskState::Completed)?;
        summarize(&task.progress_reports)
    };
    info!(?summary, "orphans deleted");
    engine.set_changed();
    Ok(summary)
}

/// Maps each report's last message word, lower-cased, to its total.
fn summarize(reports: &[ProgressReport]) -> BTreeMap<String, u64> {
    reports
        .iter()
        .filter_map(|report| {
            let category = report.message.split_whitespace().last()?.to_lowercase();
            Some((category, report.total.unwrap_or(0)))
        })
        .collect()
}
