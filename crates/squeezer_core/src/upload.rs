//! Chunked upload protocol.
//!
//! Payloads larger than the upload threshold are sent in fixed-size chunks
//! through a temporary upload session:
//!
//! 1. create a session declaring the total size
//! 2. send each chunk with its `Content-Range`
//! 3. commit the session against the expected SHA-256 digest
//! 4. wait for the commit task; its first created resource is the artifact
//!
//! If anything fails after the session was created, the session is deleted
//! once and the original error is returned.

use crate::catalog;
use crate::engine::Engine;
use crate::entity::{Entity, NaturalKey, Payload};
use crate::error::SqueezerResult;
use crate::kind::Capability;
use crate::task::TaskState;
use crate::transport::{Attributes, Response, Uploads};
use bytes::Bytes;
use serde_json::Value;
use std::fmt;
use std::io::Read;
use tracing::{debug, info, warn};

/// An inclusive byte range within a payload of `total` bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte offset.
    pub start: u64,
    /// Last byte offset, inclusive.
    pub end: u64,
    /// Total payload size.
    pub total: u64,
}

impl ByteRange {
    /// Number of bytes covered.
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a range covers at least one byte.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The `Content-Range` header value.
    pub fn content_range(&self) -> String {
        format!("bytes {self}")
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}/{}", self.start, self.end, self.total)
    }
}

/// Iterator over the chunk ranges of a payload.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    size: u64,
    chunk_size: u64,
    offset: u64,
}

impl Iterator for ChunkPlan {
    type Item = ByteRange;

    fn next(&mut self) -> Option<ByteRange> {
        if self.offset >= self.size {
            return None;
        }
        let end = (self.offset + self.chunk_size).min(self.size) - 1;
        let range = ByteRange {
            start: self.offset,
            end,
            total: self.size,
        };
        self.offset = end + 1;
        Some(range)
    }
}

/// Splits `size` bytes into ranges of at most `chunk_size` bytes.
pub fn chunk_ranges(size: u64, chunk_size: u64) -> ChunkPlan {
    ChunkPlan {
        size,
        chunk_size: chunk_size.max(1),
        offset: 0,
    }
}

struct UploadSession<'e> {
    entity: Entity<'e>,
    size: u64,
    committed: u64,
}

/// Runs the chunked upload protocol.
#[derive(Debug, Clone, Copy)]
pub struct ChunkedUpload<'e> {
    engine: &'e Engine,
}

impl<'e> ChunkedUpload<'e> {
    /// Creates an uploader bound to `engine`.
    pub fn new(engine: &'e Engine) -> Self {
        Self { engine }
    }

    /// Uploads `payload` and returns the reference of the created artifact.
    ///
    /// `sha256` is the digest the server verifies on commit; it is not
    /// computed here.
    pub fn upload(&self, payload: &Payload, sha256: &str) -> SqueezerResult<String> {
        let size = payload.size()?;
        let mut entity = Entity::new(self.engine, &catalog::UPLOAD, NaturalKey::new())
            .with_attribute("size", size);
        entity.create()?;

        let mut session = UploadSession {
            entity,
            size,
            committed: 0,
        };
        info!(upload = %session.entity.href()?, size, "upload session created");

        match self.transfer(&mut session, payload, sha256) {
            Ok(artifact) => Ok(artifact),
            Err(error) => {
                warn!(
                    error = %error,
                    committed = session.committed,
                    "upload failed, deleting session"
                );
                if let Err(cleanup) = session.entity.delete() {
                    warn!(error = %cleanup, "failed to delete upload session");
                }
                Err(error)
            }
        }
    }

    fn transfer(
        &self,
        session: &mut UploadSession<'_>,
        payload: &Payload,
        sha256: &str,
    ) -> SqueezerResult<String> {
        let update_id = catalog::UPLOAD.require(Capability::Update)?;
        let commit_id = catalog::UPLOAD.require(Capability::Commit)?;
        let mut reader = payload.open()?;

        for range in chunk_ranges(session.size, self.engine.config().chunk_size) {
            let mut chunk = vec![0u8; range.len() as usize];
            reader.read_exact(&mut chunk)?;

            let mut parameters = session.entity.primary_key()?;
            parameters.insert("Content-Range".to_string(), Value::from(range.content_range()));
            let mut uploads = Uploads::new();
            uploads.insert("file".to_string(), Bytes::from(chunk));
            self.engine
                .invoke(&update_id, &parameters, None, &uploads)?;

            session.committed += range.len();
            debug!(range = %range, "chunk sent");
        }

        let mut body = Attributes::new();
        body.insert("sha256".to_string(), Value::from(sha256));
        let parameters = session.entity.primary_key()?;
        let response = self
            .engine
            .invoke(&commit_id, &parameters, Some(&body), &Uploads::new())?;
        let task_href = Response::classify(response)?.into_task(&commit_id)?;
        let task = self
            .engine
            .tasks()
            .wait_for(&task_href, TaskState::Completed)?;
        Ok(task.first_created_resource()?.to_string())
    }
}
