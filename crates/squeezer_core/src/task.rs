//! Server-side tasks and the task monitor.
//!
//! Many operations answer with a task reference instead of a final object.
//! The [`TaskMonitor`] polls such a task until it reaches a terminal state and
//! turns an unexpected terminal state into an error.

use crate::catalog;
use crate::engine::Engine;
use crate::entity::Entity;
use crate::error::{SqueezerError, SqueezerResult};
use crate::hooks::KindHooks;
use crate::kind::Capability;
use crate::transport::{Attributes, Parameters, Uploads};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::time::Instant;
use tracing::{debug, info};

/// Lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// Queued, not yet picked up by a worker.
    Waiting,
    /// Being executed.
    Running,
    /// A cancel was requested and is being processed.
    Canceling,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled before completion.
    Canceled,
}

impl TaskState {
    /// Returns the wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Waiting => "waiting",
            TaskState::Running => "running",
            TaskState::Canceling => "canceling",
            TaskState::Completed => "completed",
            TaskState::Failed => "failed",
            TaskState::Canceled => "canceled",
        }
    }

    /// Returns true for completed, failed and canceled.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed | TaskState::Failed | TaskState::Canceled
        )
    }

    /// Returns true while the task may still change state.
    pub fn is_active(&self) -> bool {
        !self.is_terminal()
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskState {
    type Err = SqueezerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(TaskState::Waiting),
            "running" => Ok(TaskState::Running),
            "canceling" => Ok(TaskState::Canceling),
            "completed" => Ok(TaskState::Completed),
            "failed" => Ok(TaskState::Failed),
            "canceled" => Ok(TaskState::Canceled),
            other => Err(SqueezerError::Protocol(format!("unknown task state: {other}"))),
        }
    }
}

/// Error payload of a failed task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskError {
    /// Description reported by the server.
    #[serde(default)]
    pub description: String,
}

/// One progress report of a task.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressReport {
    /// Human readable message.
    #[serde(default)]
    pub message: String,
    /// Machine readable code, e.g. `repair.corrupted`.
    #[serde(default)]
    pub code: String,
    /// Expected number of items, if known.
    #[serde(default)]
    pub total: Option<u64>,
    /// Number of items processed.
    #[serde(default)]
    pub done: Option<u64>,
}

/// A resolved view of a task.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    /// Reference of the task.
    #[serde(rename = "pulp_href")]
    pub href: String,
    /// Current state.
    pub state: TaskState,
    /// References of the resources the task created.
    #[serde(default)]
    pub created_resources: Vec<String>,
    /// Error payload, set for failed tasks.
    #[serde(default)]
    pub error: Option<TaskError>,
    /// Progress reports.
    #[serde(default)]
    pub progress_reports: Vec<ProgressReport>,
    /// The full server representation.
    #[serde(skip)]
    pub raw: Attributes,
}

impl Task {
    /// Decodes a task from its server representation.
    pub fn from_snapshot(snapshot: Attributes) -> SqueezerResult<Self> {
        let mut task: Task = serde_json::from_value(Value::Object(snapshot.clone()))
            .map_err(|e| SqueezerError::Protocol(format!("malformed task: {e}")))?;
        task.raw = snapshot;
        Ok(task)
    }

    /// Returns the first created resource.
    pub fn first_created_resource(&self) -> SqueezerResult<&str> {
        self.created_resources
            .first()
            .map(String::as_str)
            .ok_or_else(|| {
                SqueezerError::Protocol(format!("task {} created no resource", self.href))
            })
    }

    /// Finds the progress report with `code`.
    pub fn progress(&self, code: &str) -> Option<&ProgressReport> {
        self.progress_reports.iter().find(|r| r.code == code)
    }
}

/// Polls tasks to a terminal state.
#[derive(Debug, Clone, Copy)]
pub struct TaskMonitor<'e> {
    engine: &'e Engine,
}

impl<'e> TaskMonitor<'e> {
    /// Creates a monitor bound to `engine`.
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Reads the current state of a task.
    pub fn read(&self, href: &str) -> SqueezerResult<Task> {
        let operation_id = catalog::TASK.require(Capability::Read)?;
        let mut parameters = Parameters::new();
        parameters.insert(catalog::TASK.href_param.to_string(), Value::from(href));
        match self
            .engine
            .invoke(&operation_id, &parameters, None, &Uploads::new())?
        {
            Value::Object(snapshot) => Task::from_snapshot(snapshot),
            other => Err(SqueezerError::Protocol(format!(
                "unexpected task representation: {other}"
            ))),
        }
    }

    /// Polls `href` until it is terminal and checks it ended in `desired`.
    ///
    /// Fails with [`SqueezerError::TaskFailed`] when the task failed and
    /// [`SqueezerError::TaskStateMismatch`] for any other unexpected terminal
    /// state. The poll policy's deadline and the engine's cancellation token
    /// are honored between polls.
    pub fn wait_for(&self, href: &str, desired: TaskState) -> SqueezerResult<Task> {
        let poll = self.engine.config().poll;
        let cancellation = self.engine.cancellation();
        let started = Instant::now();

        let mut task = self.read(href)?;
        let mut polls = 1u32;
        while task.state.is_active() {
            if poll.expired(started) {
                return Err(SqueezerError::Timeout(href.to_string()));
            }
            if cancellation.wait(poll.interval) {
                return Err(SqueezerError::Cancelled);
            }
            task = self.read(href)?;
            polls += 1;
        }
        debug!(task = href, state = %task.state, polls, "task finished");

        if task.state == desired {
            return Ok(task);
        }
        if task.state == TaskState::Failed {
            return Err(SqueezerError::TaskFailed {
                href: task.href,
                description: task.error.map(|e| e.description).unwrap_or_default(),
            });
        }
        Err(SqueezerError::TaskStateMismatch {
            href: task.href,
            expected: desired,
            actual: task.state,
        })
    }
}

/// Hooks for task entities: the `canceled` and `completed` states.
#[derive(Debug)]
pub struct TaskHooks;

impl KindHooks for TaskHooks {
    fn process_state(&self, entity: &mut Entity<'_>, state: &str) -> SqueezerResult<()> {
        let requested = match state {
            "canceled" => TaskState::Canceled,
            "completed" => TaskState::Completed,
            other => return Err(SqueezerError::InvalidStateRequest(other.to_string())),
        };
        let current = match entity.snapshot() {
            Some(snapshot) => snapshot
                .get("state")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .parse::<TaskState>()?,
            None => return Err(SqueezerError::NotFound("task".to_string())),
        };
        if !current.is_active() {
            return Ok(());
        }

        let engine = entity.engine();
        if engine.check_mode() {
            engine.set_changed();
            if let Some(snapshot) = entity.snapshot_mut() {
                snapshot.insert("state".to_string(), Value::from(requested.as_str()));
            }
            return Ok(());
        }

        let href = entity.href()?.to_string();
        if requested == TaskState::Canceled {
            info!(task = %href, "canceling task");
            entity.cancel()?;
            engine.set_changed();
        }
        let task = engine.tasks().wait_for(&href, requested)?;
        engine.set_changed();
        entity.set_snapshot(Some(task.raw));
        Ok(())
    }
}
