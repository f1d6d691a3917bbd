//! Artifact command implementation.

use clap::Args;
use sha2::{Digest, Sha256};
use squeezer_core::{Engine, Entity, NaturalKey, Payload, SqueezerResult, FILE_FIELD};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Arguments of `squeezer artifact`.
#[derive(Debug, Clone, Args)]
pub struct ArtifactArgs {
    /// Local file to upload
    #[arg(long)]
    pub file: Option<PathBuf>,

    /// SHA-256 digest of the artifact; computed from `--file` when omitted
    #[arg(long)]
    pub sha256: Option<String>,

    /// Requested state (present, absent); omit to report
    #[arg(long)]
    pub state: Option<String>,
}

/// Computes the lower-case hex SHA-256 digest of the file at `path`.
pub fn file_digest(path: &Path) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut File::open(path)?, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

/// Runs the artifact command.
pub fn run(engine: &Engine, args: &ArtifactArgs) -> SqueezerResult<()> {
    let sha256 = match (&args.sha256, &args.file) {
        (Some(sha256), _) => Some(sha256.clone()),
        (None, Some(path)) => {
            let digest = file_digest(path)?;
            debug!(path = %path.display(), %digest, "computed digest");
            Some(digest)
        }
        (None, None) => None,
    };

    let mut entity = Entity::new(
        engine,
        &squeezer_core::catalog::ARTIFACT,
        NaturalKey::new().with_optional("sha256", sha256),
    );
    if let Some(path) = &args.file {
        entity = entity.with_payload(FILE_FIELD, Payload::File(path.clone()));
    }
    entity.process(args.state.as_deref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use squeezer_core::catalog;
    use squeezer_testkit::prelude::*;

    #[test]
    fn digest_matches_payload() {
        let (file, sha256) = payload_file(70_000);
        assert_eq!(file_digest(file.path()).unwrap(), sha256);
    }

    #[test]
    fn uploads_file_with_computed_digest() {
        let pulp = fake_pulp();
        let (file, sha256) = payload_file(10_000);
        let args = ArtifactArgs {
            file: Some(file.path().to_path_buf()),
            sha256: None,
            state: Some("present".to_string()),
        };

        let engine = engine_for(&pulp);
        run(&engine, &args).unwrap();

        assert!(engine.changed());
        let artifacts = pulp.entities(&catalog::ARTIFACT);
        assert_eq!(artifacts[0]["sha256"], sha256.as_str());
        let create = &pulp.calls_to("artifacts_create")[0];
        assert_eq!(create.body.as_ref().unwrap()["sha256"], sha256.as_str());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let pulp = fake_pulp();
        let args = ArtifactArgs {
            file: Some(PathBuf::from("/nonexistent/artifact.bin")),
            sha256: None,
            state: Some("present".to_string()),
        };
        let engine = engine_for(&pulp);
        let err = run(&engine, &args).unwrap_err();
        assert!(!err.is_domain());
        assert!(pulp.calls().is_empty());
    }

    #[test]
    fn lists_without_digest() {
        let pulp = fake_pulp();
        pulp.seed_artifact(b"one").unwrap();
        pulp.seed_artifact(b"two").unwrap();
        let engine = engine_for(&pulp);
        run(
            &engine,
            &ArtifactArgs {
                file: None,
                sha256: None,
                state: None,
            },
        )
        .unwrap();
        assert_eq!(engine.result("artifacts").unwrap().as_array().unwrap().len(), 2);
    }
}
