//! X.509 content guard command implementation.

use super::{require_name, Desired};
use crate::error::CliError;
use clap::Args;
use squeezer_core::{catalog, Engine, Entity, NaturalKey, SqueezerResult};
use std::path::PathBuf;

/// Arguments of `squeezer x509-guard`.
#[derive(Debug, Clone, Args)]
pub struct X509GuardArgs {
    /// Name of the guard; omit to list all guards
    #[arg(long)]
    pub name: Option<String>,

    /// Requested state (present, absent); omit to report
    #[arg(long)]
    pub state: Option<String>,

    /// Description; empty to clear
    #[arg(long)]
    pub description: Option<String>,

    /// PEM file with the CA certificate client certificates must chain to
    #[arg(long)]
    pub ca_certificate: Option<PathBuf>,
}

impl X509GuardArgs {
    /// Checks the argument combination.
    pub fn validate(&self) -> Result<(), CliError> {
        require_name(self.state.as_deref(), self.name.as_deref())
    }
}

/// Runs the x509-guard command.
pub fn run(engine: &Engine, args: &X509GuardArgs) -> SqueezerResult<()> {
    let ca_certificate = args
        .ca_certificate
        .as_ref()
        .map(std::fs::read_to_string)
        .transpose()?;
    let desired = Desired::new()
        .nullable("description", args.description.as_deref())
        .set("ca_certificate", ca_certificate);
    Entity::new(
        engine,
        &catalog::X509_CERT_GUARD,
        NaturalKey::new().with_optional("name", args.name.as_deref()),
    )
    .with_desired(desired.into_attributes())
    .process(args.state.as_deref())
}
