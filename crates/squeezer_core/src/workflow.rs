//! Multi-entity workflows.
//!
//! These combine several entities into one invocation and report their
//! outcome under dedicated result keys.

use crate::catalog::{self, Plugin};
use crate::engine::Engine;
use crate::entity::{Entity, NaturalKey};
use crate::error::{SqueezerError, SqueezerResult};
use crate::kind::{Capability, KindConfig};
use crate::orphans::delete_orphans;
use serde_json::Value;
use tracing::info;

fn find_by_name<'e>(
    engine: &'e Engine,
    kind: &'static KindConfig,
    label: &str,
    name: &str,
) -> SqueezerResult<Entity<'e>> {
    let mut entity = Entity::new(engine, kind, NaturalKey::new().with("name", name));
    if entity.find()? {
        Ok(entity)
    } else {
        Err(SqueezerError::NotFound(format!("{label} '{name}'")))
    }
}

fn string_field(entity: &Entity<'_>, field: &str) -> SqueezerResult<String> {
    entity
        .snapshot()
        .and_then(|snapshot| snapshot.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            SqueezerError::Protocol(format!("{} has no {field}", entity.kind().name))
        })
}

/// Synchronizes a repository from a remote, both looked up by name.
///
/// Reports the repository version the sync created under
/// `repository_version`, or the previous latest version when nothing
/// changed.
pub fn sync_repository(
    engine: &Engine,
    plugin: Plugin,
    remote_name: &str,
    repository_name: &str,
) -> SqueezerResult<()> {
    let repository_kind = plugin
        .repository()
        .ok_or_else(|| SqueezerError::capability(plugin.remote().name, Capability::Sync))?;

    let remote = find_by_name(engine, plugin.remote(), "Remote", remote_name)?;
    let repository = find_by_name(engine, repository_kind, "Repository", repository_name)?;

    let mut version = repository
        .snapshot()
        .and_then(|snapshot| snapshot.get("latest_version_href"))
        .cloned()
        .unwrap_or(Value::Null);
    if let Some(task) = repository.sync(remote.href()?)? {
        if let Some(created) = task.created_resources.first() {
            engine.set_changed();
            version = Value::from(created.as_str());
        }
    }
    info!(%plugin, repository = repository_name, %version, "sync finished");
    engine.set_result("repository_version", version);
    Ok(())
}

/// Repairs a version of a file repository.
///
/// Without `version` the repository's latest version is repaired. Reports
/// `corrupted` and `repaired`.
pub fn repair_repository_version(
    engine: &Engine,
    repository_name: &str,
    version: Option<u64>,
) -> SqueezerResult<()> {
    let repository = find_by_name(
        engine,
        &catalog::FILE_REPOSITORY,
        "Repository",
        repository_name,
    )?;
    let version_href = match version {
        Some(number) => format!("{}{number}/", string_field(&repository, "versions_href")?),
        None => string_field(&repository, "latest_version_href")?,
    };

    let mut repository_version =
        Entity::from_href(engine, &catalog::FILE_REPOSITORY_VERSION, &version_href);
    repository_version.read().map_err(|error| match error.status() {
        Some(404) => {
            let label = version.map_or_else(|| "latest".to_string(), |n| n.to_string());
            SqueezerError::NotFound(format!("Repository version {label}"))
        }
        _ => error,
    })?;
    let report = repository_version.repair()?;

    engine.set_result("corrupted", Value::from(report.corrupted));
    engine.set_result("repaired", Value::from(report.repaired));
    Ok(())
}

/// Deletes orphans and reports the per-category counts under `summary`.
pub fn cleanup_orphans(engine: &Engine) -> SqueezerResult<()> {
    let summary = delete_orphans(engine)?;
    let summary = summary
        .into_iter()
        .map(|(category, count)| (category, Value::from(count)))
        .collect();
    engine.set_result("summary", Value::Object(summary));
    Ok(())
}
