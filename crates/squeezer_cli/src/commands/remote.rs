//! Remote command implementation.

use super::{require_name, Desired};
use crate::error::CliError;
use clap::Args;
use squeezer_core::{Engine, Entity, NaturalKey, Plugin, SqueezerResult};

/// Arguments of `squeezer remote`.
#[derive(Debug, Clone, Args)]
pub struct RemoteArgs {
    /// Content plugin (file, ansible, python, rpm)
    #[arg(long, default_value_t = Plugin::File)]
    pub plugin: Plugin,

    /// Name of the remote; omit to list all remotes
    #[arg(long)]
    pub name: Option<String>,

    /// Requested state (present, absent); omit to report
    #[arg(long)]
    pub state: Option<String>,

    /// URL to sync from
    #[arg(long)]
    pub url: Option<String>,

    /// Number of concurrent downloads
    #[arg(long)]
    pub download_concurrency: Option<u32>,

    /// Download policy
    #[arg(long)]
    pub policy: Option<String>,

    /// Verify the upstream TLS certificate
    #[arg(long)]
    pub tls_validation: Option<bool>,

    /// Proxy URL; empty to clear
    #[arg(long)]
    pub proxy_url: Option<String>,

    /// Proxy user; empty to clear
    #[arg(long)]
    pub proxy_username: Option<String>,

    /// Proxy password; empty to clear
    #[arg(long)]
    pub proxy_password: Option<String>,

    /// PEM CA certificate validating the upstream; empty to clear
    #[arg(long)]
    pub ca_cert: Option<String>,

    /// PEM client certificate; empty to clear
    #[arg(long)]
    pub client_cert: Option<String>,

    /// PEM client private key; empty to clear
    #[arg(long)]
    pub client_key: Option<String>,

    /// User for the upstream server; empty to clear
    #[arg(long)]
    pub remote_username: Option<String>,

    /// Password for the upstream server; empty to clear
    #[arg(long)]
    pub remote_password: Option<String>,
}

/// Download policies accepted by `plugin`.
pub fn policies(plugin: Plugin) -> &'static [&'static str] {
    match plugin {
        Plugin::Rpm => &["immediate", "on_demand", "streamed"],
        _ => &["immediate", "on-demand", "streamed"],
    }
}

impl RemoteArgs {
    /// Checks the argument combination.
    pub fn validate(&self) -> Result<(), CliError> {
        require_name(self.state.as_deref(), self.name.as_deref())?;
        if let Some(policy) = &self.policy {
            let accepted = policies(self.plugin);
            if !accepted.contains(&policy.as_str()) {
                return Err(CliError::Usage(format!(
                    "value of policy must be one of: {}, got: {policy}",
                    accepted.join(", ")
                )));
            }
        }
        Ok(())
    }

    fn desired(&self) -> Desired {
        Desired::new()
            .set("url", self.url.as_deref())
            .set("download_concurrency", self.download_concurrency)
            .set("policy", self.policy.as_deref())
            .set("tls_validation", self.tls_validation)
            .nullable("proxy_url", self.proxy_url.as_deref())
            .nullable("proxy_username", self.proxy_username.as_deref())
            .nullable("proxy_password", self.proxy_password.as_deref())
            .nullable("ca_cert", self.ca_cert.as_deref())
            .nullable("client_cert", self.client_cert.as_deref())
            .nullable("client_key", self.client_key.as_deref())
            .nullable("username", self.remote_username.as_deref())
            .nullable("password", self.remote_password.as_deref())
    }
}

/// Runs the remote command.
pub fn run(engine: &Engine, args: &RemoteArgs) -> SqueezerResult<()> {
    Entity::new(
        engine,
        args.plugin.remote(),
        NaturalKey::new().with_optional("name", args.name.as_deref()),
    )
    .with_desired(args.desired().into_attributes())
    .process(args.state.as_deref())
}
