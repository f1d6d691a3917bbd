//! Binary artifacts.
//!
//! Small payloads are sent as the `file` upload of a plain create. Payloads
//! above the upload threshold go through the chunked upload protocol.

use crate::entity::{Entity, Payload};
use crate::error::{SqueezerError, SqueezerResult};
use crate::hooks::{CreateFlow, KindHooks};
use crate::transport::Attributes;
use crate::upload::ChunkedUpload;
use serde_json::Value;
use tracing::info;

/// Form field carrying the artifact payload.
pub const FILE_FIELD: &str = "file";

/// Create strategy for artifacts.
#[derive(Debug)]
pub struct ArtifactHooks;

impl KindHooks for ArtifactHooks {
    fn before_create(
        &self,
        entity: &mut Entity<'_>,
        _body: &mut Attributes,
    ) -> SqueezerResult<CreateFlow> {
        let engine = entity.engine();
        let payload: Payload = entity
            .payload(FILE_FIELD)
            .cloned()
            .ok_or_else(|| SqueezerError::MissingParameter(FILE_FIELD.to_string()))?;
        let size = payload.size()?;
        if size <= engine.config().upload_threshold {
            return Ok(CreateFlow::Continue);
        }

        if engine.check_mode() {
            entity.set_snapshot(Some(entity.natural_key().resolved()));
        } else {
            let sha256 = entity
                .natural_key()
                .get("sha256")
                .and_then(Value::as_str)
                .ok_or_else(|| SqueezerError::MissingParameter("sha256".to_string()))?
                .to_string();
            info!(size, "uploading artifact in chunks");
            let href = ChunkedUpload::new(engine).upload(&payload, &sha256)?;
            entity.set_href(&href);
            entity.read()?;
        }
        engine.set_changed();
        Ok(CreateFlow::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::config::{EngineConfig, PollPolicy};
    use crate::engine::Engine;
    use crate::entity::NaturalKey;
    use crate::transport::MockTransport;
    use bytes::Bytes;
    use serde_json::json;
    use std::sync::Arc;

    fn artifact<'e>(engine: &'e Engine, data: &'static [u8]) -> Entity<'e> {
        Entity::new(engine, &catalog::ARTIFACT, NaturalKey::new().with("sha256", "abc"))
            .with_payload(FILE_FIELD, Payload::Bytes(Bytes::from_static(data)))
    }

    #[test]
    fn small_payload_is_embedded() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "artifacts_create",
            json!({"pulp_href": "/a/1/", "sha256": "abc", "size": 3}),
        );
        let engine = Engine::shared(EngineConfig::new(), mock.clone());

        let mut entity = artifact(&engine, b"abc");
        entity.create().unwrap();

        assert!(engine.changed());
        let call = &mock.calls()[0];
        assert_eq!(call.upload_sizes["file"], 3);
        assert_eq!(call.body.as_ref().unwrap()["sha256"], "abc");
        assert!(mock.calls_to("uploads_create").is_empty());
    }

    #[test]
    fn large_payload_is_chunked() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("uploads_create", json!({"pulp_href": "/u/1/"}));
        mock.push_response("uploads_update", Value::Null);
        mock.push_response("uploads_update", Value::Null);
        mock.push_response("uploads_commit", json!({"task": "/t/1/"}));
        mock.push_response(
            "tasks_read",
            json!({"pulp_href": "/t/1/", "state": "completed", "created_resources": ["/a/1/"]}),
        );
        mock.push_response("artifacts_read", json!({"pulp_href": "/a/1/", "sha256": "abc"}));
        let config = EngineConfig::new()
            .with_chunk_size(4)
            .with_upload_threshold(4)
            .with_poll(PollPolicy::immediate());
        let engine = Engine::shared(config, mock.clone());

        let mut entity = artifact(&engine, b"abcdefg");
        entity.create().unwrap();

        assert!(engine.changed());
        assert_eq!(entity.href().unwrap(), "/a/1/");
        assert!(mock.calls_to("artifacts_create").is_empty());
        assert_eq!(mock.calls_to("uploads_update").len(), 2);
    }

    #[test]
    fn large_payload_in_check_mode() {
        let mock = Arc::new(MockTransport::new());
        let config = EngineConfig::new()
            .with_check_mode(true)
            .with_upload_threshold(2);
        let engine = Engine::shared(config, mock.clone());

        let mut entity = artifact(&engine, b"abcdefg");
        entity.create().unwrap();

        assert!(engine.changed());
        assert_eq!(mock.call_count(), 0);
        assert_eq!(Value::Object(entity.snapshot().cloned().unwrap()), json!({"sha256": "abc"}));
    }

    #[test]
    fn missing_payload() {
        let mock = Arc::new(MockTransport::new());
        let engine = Engine::shared(EngineConfig::new(), mock.clone());

        let mut entity =
            Entity::new(&engine, &catalog::ARTIFACT, NaturalKey::new().with("sha256", "abc"));
        let err = entity.create().unwrap_err();
        assert!(matches!(err, SqueezerError::MissingParameter(ref p) if p == "file"));
    }
}
