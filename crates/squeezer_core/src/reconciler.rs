//! The reconciliation state machine.
//!
//! Given an entity and the state requested for it, [`reconcile`] decides
//! which transition to run, runs it and stores the resulting snapshot in the
//! engine's results.

use crate::entity::Entity;
use crate::error::SqueezerResult;
use serde_json::Value;
use tracing::debug;

/// The state a caller asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestedState {
    /// The entity should exist with the desired attributes.
    Present,
    /// The entity should not exist.
    Absent,
    /// A kind-specific state such as `canceled`.
    Other(String),
}

impl RequestedState {
    /// Parses a caller-supplied state.
    pub fn parse(state: &str) -> Self {
        match state {
            "present" => RequestedState::Present,
            "absent" => RequestedState::Absent,
            other => RequestedState::Other(other.to_string()),
        }
    }
}

/// What [`reconcile`] does for a resolved entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Report the current state only.
    Report,
    /// Create the missing entity.
    Create,
    /// Diff and update the existing entity.
    Update,
    /// Delete the existing entity.
    Delete,
    /// Nothing to do.
    Keep,
    /// Hand over to the kind's extension point.
    Extension(String),
}

/// Decides the transition for an entity that does or does not exist.
pub fn decide(exists: bool, requested: Option<&RequestedState>) -> Transition {
    match (requested, exists) {
        (None, _) => Transition::Report,
        (Some(RequestedState::Present), false) => Transition::Create,
        (Some(RequestedState::Present), true) => Transition::Update,
        (Some(RequestedState::Absent), true) => Transition::Delete,
        (Some(RequestedState::Absent), false) => Transition::Keep,
        (Some(RequestedState::Other(state)), _) => Transition::Extension(state.clone()),
    }
}

/// Reconciles `entity` towards `state`.
///
/// An entity with unresolved natural-key fields is enumerated instead and the
/// listing is reported under the kind's plural key. Otherwise the entity is
/// looked up, the decided transition runs and the snapshot (or `null`) is
/// reported under the singular key.
pub fn reconcile(entity: &mut Entity<'_>, state: Option<&str>) -> SqueezerResult<()> {
    let kind = entity.kind();
    let engine = entity.engine();

    if !entity.natural_key().is_resolved() {
        let entities = entity.list()?;
        engine.set_result(
            kind.plural,
            Value::Array(entities.into_iter().map(Value::Object).collect()),
        );
        return Ok(());
    }

    let requested = state.map(RequestedState::parse);
    entity.find()?;
    let transition = decide(entity.exists(), requested.as_ref());
    debug!(kind = kind.name, ?transition, "reconciling");

    match transition {
        Transition::Report | Transition::Keep => {}
        Transition::Create => entity.create()?,
        Transition::Update => entity.update()?,
        Transition::Delete => entity.delete()?,
        Transition::Extension(state) => kind.hooks.process_state(entity, &state)?,
    }

    let snapshot = entity
        .snapshot()
        .cloned()
        .map(Value::Object)
        .unwrap_or(Value::Null);
    engine.set_result(kind.singular, snapshot);
    Ok(())
}
