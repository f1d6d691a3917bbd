//! File content command implementation.

use clap::Args;
use squeezer_core::{catalog, Engine, Entity, NaturalKey, SqueezerResult};

/// Arguments of `squeezer content`.
#[derive(Debug, Clone, Args)]
pub struct ContentArgs {
    /// SHA-256 digest of the artifact backing the content
    #[arg(long)]
    pub sha256: Option<String>,

    /// Path of the content inside a publication
    #[arg(long)]
    pub relative_path: Option<String>,

    /// Requested state (present); omit to report
    #[arg(long)]
    pub state: Option<String>,
}

/// Runs the content command.
pub fn run(engine: &Engine, args: &ContentArgs) -> SqueezerResult<()> {
    Entity::new(
        engine,
        &catalog::FILE_CONTENT,
        NaturalKey::new()
            .with_optional("sha256", args.sha256.as_deref())
            .with_optional("relative_path", args.relative_path.as_deref()),
    )
    .process(args.state.as_deref())
}
