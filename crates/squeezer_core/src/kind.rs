//! Static per-kind configuration.
//!
//! Every resource kind of the API is described by one [`KindConfig`] value:
//! the parameter that carries its reference, the prefix of its operation
//! identifiers, its REST endpoint, the keys its results are reported under,
//! the set of operations it supports and the strategy objects for the steps
//! that differ from the generic flow.

use crate::error::{SqueezerError, SqueezerResult};
use crate::hooks::KindHooks;
use std::fmt;

/// One operation kind an entity may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Paginated listing with filters.
    Enumerate,
    /// Fetch by reference.
    Read,
    /// Create from natural key and desired attributes.
    Create,
    /// Full-body update by reference.
    Update,
    /// Delete by reference.
    Delete,
    /// Synchronize a repository from a remote.
    Sync,
    /// Cancel a running task.
    Cancel,
    /// Commit an upload session.
    Commit,
    /// Repair a repository version.
    Repair,
}

impl Capability {
    /// All capabilities, in bit order.
    pub const ALL: [Capability; 9] = [
        Capability::Enumerate,
        Capability::Read,
        Capability::Create,
        Capability::Update,
        Capability::Delete,
        Capability::Sync,
        Capability::Cancel,
        Capability::Commit,
        Capability::Repair,
    ];

    /// Suffix of the operation identifier implementing this capability.
    pub fn suffix(&self) -> &'static str {
        match self {
            Capability::Enumerate => "list",
            Capability::Read => "read",
            Capability::Create => "create",
            Capability::Update => "update",
            Capability::Delete => "delete",
            Capability::Sync => "sync",
            Capability::Cancel => "cancel",
            Capability::Commit => "commit",
            Capability::Repair => "repair",
        }
    }

    /// Adjective used in capability error messages.
    pub fn adjective(&self) -> &'static str {
        match self {
            Capability::Enumerate => "enumerable",
            Capability::Read => "readable",
            Capability::Create => "creatable",
            Capability::Update => "updatable",
            Capability::Delete => "deletable",
            Capability::Sync => "syncable",
            Capability::Cancel => "cancelable",
            Capability::Commit => "committable",
            Capability::Repair => "repairable",
        }
    }

    /// Returns true for capabilities that change server state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Capability::Enumerate | Capability::Read)
    }

    /// Looks a capability up by its operation suffix.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.suffix() == suffix)
    }

    const fn bit(self) -> u16 {
        1 << (self as u16)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// A set of capabilities, stored as a bitmask.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities(u16);

impl Capabilities {
    /// The empty set.
    pub const fn none() -> Self {
        Self(0)
    }

    /// Enumerate, read, create, update and delete.
    pub const fn crud() -> Self {
        Self::none()
            .with(Capability::Enumerate)
            .with(Capability::Read)
            .with(Capability::Create)
            .with(Capability::Update)
            .with(Capability::Delete)
    }

    /// Returns the set extended by `capability`.
    pub const fn with(self, capability: Capability) -> Self {
        Self(self.0 | capability.bit())
    }

    /// Returns the set without `capability`.
    pub const fn without(self, capability: Capability) -> Self {
        Self(self.0 & !capability.bit())
    }

    /// Returns true if `capability` is in the set.
    pub const fn contains(&self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    /// Iterates over the members of the set.
    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        Capability::ALL.into_iter().filter(|c| self.contains(*c))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// How `find()` locates an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// List call with `limit=1` and the natural key as filters.
    Filter,
    /// Direct read of the `pulp_href` carried in the natural key.
    Reference,
}

/// Static description of one resource kind.
#[derive(Debug)]
pub struct KindConfig {
    /// Human readable name, used in messages.
    pub name: &'static str,
    /// Name of the parameter carrying an instance reference.
    pub href_param: &'static str,
    /// Prefix shared by the kind's operation identifiers.
    pub operation_prefix: &'static str,
    /// Collection endpoint, relative to the API root unless it starts with
    /// a `{parameter}` placeholder.
    pub endpoint: &'static str,
    /// Result key for a single entity.
    pub singular: &'static str,
    /// Result key for a collection.
    pub plural: &'static str,
    /// Supported operations.
    pub capabilities: Capabilities,
    /// Lookup strategy.
    pub lookup: Lookup,
    /// Strategy objects for the steps that vary per kind.
    pub hooks: &'static dyn KindHooks,
}

impl KindConfig {
    /// Returns true if the kind supports `capability`.
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    /// Builds the operation identifier for `capability`, supported or not.
    pub fn operation_id(&self, capability: Capability) -> String {
        format!("{}_{}", self.operation_prefix, capability.suffix())
    }

    /// Returns the operation identifier for `capability`, or a capability
    /// error when the kind does not support it.
    pub fn require(&self, capability: Capability) -> SqueezerResult<String> {
        if self.supports(capability) {
            Ok(self.operation_id(capability))
        } else {
            Err(SqueezerError::capability(self.name, capability))
        }
    }
}
