//! Task command implementation.

use clap::Args;
use squeezer_core::{catalog, Engine, Entity, NaturalKey, SqueezerResult};

/// Arguments of `squeezer task`.
#[derive(Debug, Clone, Args)]
pub struct TaskArgs {
    /// Reference of the task; omit to list all tasks
    #[arg(long)]
    pub pulp_href: Option<String>,

    /// Requested state (completed, canceled, absent); omit to report
    #[arg(long)]
    pub state: Option<String>,
}

/// Runs the task command.
pub fn run(engine: &Engine, args: &TaskArgs) -> SqueezerResult<()> {
    Entity::new(
        engine,
        &catalog::TASK,
        NaturalKey::new().with_optional("pulp_href", args.pulp_href.as_deref()),
    )
    .process(args.state.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeezer_core::{SqueezerError, TaskState};
    use squeezer_testkit::prelude::*;

    fn args(href: &str, state: &str) -> TaskArgs {
        TaskArgs {
            pulp_href: Some(href.to_string()),
            state: Some(state.to_string()),
        }
    }

    #[test]
    fn cancels_running_task() {
        let pulp = fake_pulp();
        let href = pulp.seed_task(TaskState::Waiting);
        let engine = engine_for(&pulp);

        run(&engine, &args(&href, "canceled")).unwrap();

        assert!(engine.changed());
        assert_eq!(pulp.get(&href).unwrap()["state"], "canceled");
    }

    #[test]
    fn unknown_state_is_rejected() {
        let pulp = fake_pulp();
        let href = pulp.seed_task(TaskState::Running);
        let engine = engine_for(&pulp);

        let err = run(&engine, &args(&href, "unknown")).unwrap_err();
        assert!(matches!(err, SqueezerError::InvalidStateRequest(_)));
        assert!(pulp.calls_to("tasks_cancel").is_empty());
    }

    #[test]
    fn unknown_task_is_reported_as_null() {
        let pulp = fake_pulp();
        let engine = engine_for(&pulp);
        run(
            &engine,
            &TaskArgs {
                pulp_href: Some("/pulp/api/v3/tasks/missing/".to_string()),
                state: None,
            },
        )
        .unwrap();
        assert_eq!(engine.result("task"), Some(serde_json::Value::Null));
    }

    #[test]
    fn deletes_finished_task() {
        let pulp = fake_pulp();
        let href = pulp.seed_task(TaskState::Completed);
        let engine = engine_for(&pulp);
        run(&engine, &args(&href, "absent")).unwrap();
        assert!(engine.changed());
        assert!(pulp.get(&href).is_none());
    }
}
