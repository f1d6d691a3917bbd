//! Transport layer abstraction.
//!
//! The engine speaks to the server exclusively through [`Transport::invoke`],
//! addressing calls by operation identifier. How an identifier maps to a wire
//! request is the transport's business; see [`crate::http`] for the REST
//! mapping.

use crate::error::{SqueezerError, SqueezerResult};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// A JSON object as exchanged with the server.
pub type Attributes = serde_json::Map<String, Value>;

/// Path, query and header parameters of a call.
pub type Parameters = Attributes;

/// Binary uploads of a call, by form field name.
pub type Uploads = BTreeMap<String, Bytes>;

/// Executes operations against the server.
///
/// Implementations must be safe to share between threads; the engine itself
/// issues one call at a time.
pub trait Transport: Send + Sync {
    /// Invokes `operation_id` and returns the decoded response body.
    ///
    /// An empty response body decodes to [`Value::Null`].
    fn invoke(
        &self,
        operation_id: &str,
        parameters: &Parameters,
        body: Option<&Attributes>,
        uploads: &Uploads,
    ) -> SqueezerResult<Value>;
}

/// The shape of a non-page response.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// A task envelope; the work continues asynchronously.
    Task(String),
    /// A resource object.
    Object(Attributes),
    /// No content.
    Empty,
}

impl Response {
    /// Classifies a decoded response body.
    pub fn classify(value: Value) -> SqueezerResult<Self> {
        match value {
            Value::Null => Ok(Response::Empty),
            Value::Object(mut map) => match map.remove("task") {
                Some(Value::String(href)) => Ok(Response::Task(href)),
                Some(other) => {
                    map.insert("task".to_string(), other);
                    Ok(Response::Object(map))
                }
                None => Ok(Response::Object(map)),
            },
            other => Err(SqueezerError::Protocol(format!(
                "expected an object, got {other}"
            ))),
        }
    }

    /// Returns the task reference, or a protocol error naming `operation_id`.
    pub fn into_task(self, operation_id: &str) -> SqueezerResult<String> {
        match self {
            Response::Task(href) => Ok(href),
            _ => Err(SqueezerError::Protocol(format!(
                "{operation_id} did not return a task"
            ))),
        }
    }
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page {
    /// Total number of matches.
    pub count: u64,
    /// Reference of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    /// The entities on this page.
    #[serde(default)]
    pub results: Vec<Attributes>,
}

impl Page {
    /// Decodes a page from a response body.
    pub fn from_value(value: Value) -> SqueezerResult<Self> {
        serde_json::from_value(value)
            .map_err(|e| SqueezerError::Protocol(format!("malformed page: {e}")))
    }
}

/// A call observed by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Operation identifier.
    pub operation_id: String,
    /// Parameters as passed.
    pub parameters: Parameters,
    /// Body as passed.
    pub body: Option<Attributes>,
    /// Size of each upload, by field name.
    pub upload_sizes: BTreeMap<String, usize>,
}

/// A scripted transport for unit tests.
///
/// Responses are queued per operation and consumed in order. A call without
/// a queued response fails with a protocol error.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<HashMap<String, VecDeque<SqueezerResult<Value>>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Creates a mock transport with no scripted responses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response for `operation_id`.
    pub fn push_response(&self, operation_id: &str, response: Value) {
        self.responses
            .lock()
            .entry(operation_id.to_string())
            .or_default()
            .push_back(Ok(response));
    }

    /// Queues an error for `operation_id`.
    pub fn push_error(&self, operation_id: &str, error: SqueezerError) {
        self.responses
            .lock()
            .entry(operation_id.to_string())
            .or_default()
            .push_back(Err(error));
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the calls made to `operation_id`.
    pub fn calls_to(&self, operation_id: &str) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation_id == operation_id)
            .cloned()
            .collect()
    }

    /// Returns the number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Transport for MockTransport {
    fn invoke(
        &self,
        operation_id: &str,
        parameters: &Parameters,
        body: Option<&Attributes>,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        self.calls.lock().push(RecordedCall {
            operation_id: operation_id.to_string(),
            parameters: parameters.clone(),
            body: body.cloned(),
            upload_sizes: uploads
                .iter()
                .map(|(name, data)| (name.clone(), data.len()))
                .collect(),
        });

        self.responses
            .lock()
            .get_mut(operation_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                Err(SqueezerError::Protocol(format!(
                    "no mock response for {operation_id}"
                )))
            })
    }
}
