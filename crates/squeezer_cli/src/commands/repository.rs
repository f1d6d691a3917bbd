//! Repository command implementation.

use super::{require_name, Desired};
use crate::error::CliError;
use clap::Args;
use squeezer_core::{Capability, Engine, Entity, NaturalKey, Plugin, SqueezerError, SqueezerResult};

/// Arguments of `squeezer repository`.
#[derive(Debug, Clone, Args)]
pub struct RepositoryArgs {
    /// Content plugin (file, ansible, python)
    #[arg(long, default_value_t = Plugin::File)]
    pub plugin: Plugin,

    /// Name of the repository; omit to list all repositories
    #[arg(long)]
    pub name: Option<String>,

    /// Requested state (present, absent); omit to report
    #[arg(long)]
    pub state: Option<String>,

    /// Description; empty to clear
    #[arg(long)]
    pub description: Option<String>,

    /// Remote used by default when syncing, by reference; empty to clear
    #[arg(long)]
    pub remote: Option<String>,
}

impl RepositoryArgs {
    /// Checks the argument combination.
    pub fn validate(&self) -> Result<(), CliError> {
        require_name(self.state.as_deref(), self.name.as_deref())?;
        if self.plugin.repository().is_none() {
            return Err(CliError::Usage(format!(
                "{} repositories are not managed",
                self.plugin
            )));
        }
        Ok(())
    }
}

/// Runs the repository command.
pub fn run(engine: &Engine, args: &RepositoryArgs) -> SqueezerResult<()> {
    let kind = args
        .plugin
        .repository()
        .ok_or_else(|| SqueezerError::capability(args.plugin.remote().name, Capability::Sync))?;
    let desired = Desired::new()
        .nullable("description", args.description.as_deref())
        .nullable("remote", args.remote.as_deref());
    Entity::new(
        engine,
        kind,
        NaturalKey::new().with_optional("name", args.name.as_deref()),
    )
    .with_desired(desired.into_attributes())
    .process(args.state.as_deref())
}
