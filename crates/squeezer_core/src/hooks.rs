//! Strategy objects for the reconciliation steps that differ per kind.
//!
//! The state machine in [`crate::reconciler`] is shared by every kind. A kind
//! customizes it only through the hooks below, which default to the plain
//! behavior.

use crate::entity::Entity;
use crate::error::{SqueezerError, SqueezerResult};
use crate::transport::Attributes;
use std::fmt;

/// Tells `create()` whether to continue after [`KindHooks::before_create`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateFlow {
    /// Submit the (possibly transformed) candidate body.
    Continue,
    /// The hook already established the snapshot and the change flag.
    Done,
}

/// Per-kind customization points.
pub trait KindHooks: Sync + fmt::Debug {
    /// Runs after the candidate body was assembled and before it is submitted.
    fn before_create(
        &self,
        _entity: &mut Entity<'_>,
        _body: &mut Attributes,
    ) -> SqueezerResult<CreateFlow> {
        Ok(CreateFlow::Continue)
    }

    /// Runs after the snapshot of a created entity was established.
    fn after_create(&self, _entity: &mut Entity<'_>) -> SqueezerResult<()> {
        Ok(())
    }

    /// Handles a requested state other than `present` and `absent`.
    fn process_state(&self, _entity: &mut Entity<'_>, state: &str) -> SqueezerResult<()> {
        Err(SqueezerError::InvalidStateRequest(state.to_string()))
    }
}

/// Hooks for kinds without special behavior.
#[derive(Debug)]
pub struct StandardHooks;

impl KindHooks for StandardHooks {}
