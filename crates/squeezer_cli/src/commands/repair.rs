//! Repair command implementation.

use clap::Args;
use squeezer_core::workflow::repair_repository_version;
use squeezer_core::{Engine, SqueezerResult};

/// Arguments of `squeezer repair`.
#[derive(Debug, Clone, Args)]
pub struct RepairArgs {
    /// Name of the file repository
    #[arg(long)]
    pub repository: String,

    /// Version number to repair; the latest version when omitted
    #[arg(long)]
    pub version: Option<u64>,
}

/// Runs the repair command.
pub fn run(engine: &Engine, args: &RepairArgs) -> SqueezerResult<()> {
    repair_repository_version(engine, &args.repository, args.version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use squeezer_core::catalog;
    use squeezer_testkit::prelude::*;

    #[test]
    fn reports_repaired_units() {
        let pulp = fake_pulp();
        pulp.set_repair_counts(1, 1);
        pulp.seed(&catalog::FILE_REPOSITORY, json!({"name": "files"}))
            .unwrap();
        let engine = engine_for(&pulp);

        run(
            &engine,
            &RepairArgs {
                repository: "files".to_string(),
                version: Some(0),
            },
        )
        .unwrap();

        assert!(engine.changed());
        assert_eq!(engine.result("repaired").unwrap(), 1);
    }
}
