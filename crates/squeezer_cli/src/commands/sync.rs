//! Sync command implementation.

use clap::Args;
use squeezer_core::workflow::sync_repository;
use squeezer_core::{Engine, Plugin, SqueezerResult};

/// Arguments of `squeezer sync`.
#[derive(Debug, Clone, Args)]
pub struct SyncArgs {
    /// Content plugin (file, ansible, python)
    #[arg(long, default_value_t = Plugin::File)]
    pub plugin: Plugin,

    /// Name of the remote to sync from
    #[arg(long)]
    pub remote: String,

    /// Name of the repository to sync into
    #[arg(long)]
    pub repository: String,
}

/// Runs the sync command.
pub fn run(engine: &Engine, args: &SyncArgs) -> SqueezerResult<()> {
    sync_repository(engine, args.plugin, &args.remote, &args.repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use squeezer_core::catalog;
    use squeezer_testkit::prelude::*;

    #[test]
    fn syncs_ansible_repository() {
        let pulp = fake_pulp();
        pulp.seed(&catalog::ANSIBLE_REMOTE, json!({"name": "galaxy"}))
            .unwrap();
        let repository = pulp
            .seed(&catalog::ANSIBLE_REPOSITORY, json!({"name": "collections"}))
            .unwrap();
        let engine = engine_for(&pulp);

        run(
            &engine,
            &SyncArgs {
                plugin: Plugin::Ansible,
                remote: "galaxy".to_string(),
                repository: "collections".to_string(),
            },
        )
        .unwrap();

        assert_eq!(
            engine.result("repository_version").unwrap(),
            format!("{repository}versions/1/")
        );
    }

    #[test]
    fn missing_repository_is_named() {
        let pulp = fake_pulp();
        pulp.seed(&catalog::FILE_REMOTE, json!({"name": "upstream"}))
            .unwrap();
        let engine = engine_for(&pulp);
        let err = run(
            &engine,
            &SyncArgs {
                plugin: Plugin::File,
                remote: "upstream".to_string(),
                repository: "nope".to_string(),
            },
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Repository 'nope' not found");
    }
}
