//! Distribution command implementation.

use super::{require_name, Desired};
use crate::error::CliError;
use clap::Args;
use squeezer_core::{Capability, Engine, Entity, NaturalKey, Plugin, SqueezerError, SqueezerResult};

/// Arguments of `squeezer distribution`.
#[derive(Debug, Clone, Args)]
pub struct DistributionArgs {
    /// Content plugin (file, ansible, python)
    #[arg(long, default_value_t = Plugin::File)]
    pub plugin: Plugin,

    /// Name of the distribution; omit to list all distributions
    #[arg(long)]
    pub name: Option<String>,

    /// Requested state (present, absent); omit to report
    #[arg(long)]
    pub state: Option<String>,

    /// Base path the content is served below
    #[arg(long)]
    pub base_path: Option<String>,

    /// Content guard, by reference; empty to clear
    #[arg(long)]
    pub content_guard: Option<String>,

    /// Publication to serve, by reference; empty to clear
    #[arg(long)]
    pub publication: Option<String>,

    /// Repository whose latest version is served, by reference; empty to clear
    #[arg(long)]
    pub repository: Option<String>,
}

impl DistributionArgs {
    /// Checks the argument combination.
    pub fn validate(&self) -> Result<(), CliError> {
        require_name(self.state.as_deref(), self.name.as_deref())?;
        if self.plugin.distribution().is_none() {
            return Err(CliError::Usage(format!(
                "{} distributions are not managed",
                self.plugin
            )));
        }
        Ok(())
    }
}

/// Runs the distribution command.
pub fn run(engine: &Engine, args: &DistributionArgs) -> SqueezerResult<()> {
    let kind = args
        .plugin
        .distribution()
        .ok_or_else(|| SqueezerError::capability(args.plugin.remote().name, Capability::Create))?;
    let desired = Desired::new()
        .set("base_path", args.base_path.as_deref())
        .nullable("content_guard", args.content_guard.as_deref())
        .nullable("publication", args.publication.as_deref())
        .nullable("repository", args.repository.as_deref());
    Entity::new(
        engine,
        kind,
        NaturalKey::new().with_optional("name", args.name.as_deref()),
    )
    .with_desired(desired.into_attributes())
    .process(args.state.as_deref())
}
