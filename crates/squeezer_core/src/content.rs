//! Content units backed by an artifact.
//!
//! The caller identifies the content by the artifact digest. The server wants
//! the artifact reference instead, so the digest is resolved before create.

use crate::catalog;
use crate::entity::{Entity, NaturalKey};
use crate::error::{SqueezerError, SqueezerResult};
use crate::hooks::{CreateFlow, KindHooks};
use crate::transport::Attributes;
use serde_json::Value;
use tracing::debug;

/// Create strategy for content referencing an artifact by digest.
#[derive(Debug)]
pub struct ArtifactBackedContent;

impl KindHooks for ArtifactBackedContent {
    fn before_create(
        &self,
        entity: &mut Entity<'_>,
        body: &mut Attributes,
    ) -> SqueezerResult<CreateFlow> {
        let engine = entity.engine();
        let sha256 = match body.remove("sha256") {
            Some(Value::String(sha256)) => sha256,
            Some(other) => other.to_string(),
            None => return Err(SqueezerError::MissingParameter("sha256".to_string())),
        };

        let mut artifact = Entity::new(
            engine,
            &catalog::ARTIFACT,
            NaturalKey::new().with("sha256", sha256.clone()),
        );
        if artifact.find()? {
            body.insert("artifact".to_string(), Value::from(artifact.href()?));
        } else if engine.check_mode() {
            debug!(%sha256, "artifact missing, predicting content creation anyway");
        } else {
            return Err(SqueezerError::NotFound(format!("artifact {sha256}")));
        }
        Ok(CreateFlow::Continue)
    }

    fn after_create(&self, entity: &mut Entity<'_>) -> SqueezerResult<()> {
        if !entity.engine().check_mode() {
            return Ok(());
        }
        let sha256 = entity.natural_key().get("sha256").cloned();
        if let (Some(snapshot), Some(sha256)) = (entity.snapshot_mut(), sha256) {
            snapshot.remove("artifact");
            snapshot.insert("sha256".to_string(), sha256);
        }
        Ok(())
    }
}
