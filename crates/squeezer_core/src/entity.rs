//! The generic entity model.
//!
//! An [`Entity`] pairs a kind's static configuration with one resource
//! instance: the natural key identifying it, the attributes the caller wants
//! it to have and the last known server representation (the snapshot).
//!
//! All kinds share the operations implemented here. Kind-specific behavior
//! enters through [`crate::hooks::KindHooks`].

use crate::engine::Engine;
use crate::error::{SqueezerError, SqueezerResult};
use crate::hooks::CreateFlow;
use crate::kind::{Capability, KindConfig, Lookup};
use crate::reconciler;
use crate::task::{Task, TaskState};
use crate::transport::{Page, Parameters, Response, Uploads};
use bytes::Bytes;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Cursor, Read};
use std::path::PathBuf;
use tracing::{debug, info};

pub use crate::transport::Attributes;

/// The business identity of a resource.
///
/// Fields keep their insertion order. A field without a value is unresolved;
/// an entity with an unresolved key enumerates instead of reconciling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NaturalKey {
    fields: Vec<(String, Option<Value>)>,
}

impl NaturalKey {
    /// Creates an empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resolved field.
    pub fn with(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.with_optional(field, Some(value))
    }

    /// Adds a field that may be unresolved.
    pub fn with_optional<V: Into<Value>>(
        mut self,
        field: impl Into<String>,
        value: Option<V>,
    ) -> Self {
        self.fields.push((field.into(), value.map(Into::into)));
        self
    }

    /// Returns true when every field has a value.
    pub fn is_resolved(&self) -> bool {
        self.fields.iter().all(|(_, value)| value.is_some())
    }

    /// Returns the resolved fields as an attribute map.
    pub fn resolved(&self) -> Attributes {
        self.fields
            .iter()
            .filter_map(|(field, value)| Some((field.clone(), value.clone()?)))
            .collect()
    }

    /// Returns the value of `field`, if resolved.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_ref())
    }
}

/// A binary payload attached to a create call.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Contents of a local file, read on demand.
    File(PathBuf),
    /// In-memory contents.
    Bytes(Bytes),
}

impl Payload {
    /// Returns the payload size in bytes.
    pub fn size(&self) -> SqueezerResult<u64> {
        match self {
            Payload::File(path) => Ok(std::fs::metadata(path)?.len()),
            Payload::Bytes(bytes) => Ok(bytes.len() as u64),
        }
    }

    /// Loads the whole payload into memory.
    pub fn load(&self) -> SqueezerResult<Bytes> {
        match self {
            Payload::File(path) => Ok(Bytes::from(std::fs::read(path)?)),
            Payload::Bytes(bytes) => Ok(bytes.clone()),
        }
    }

    /// Opens the payload for sequential reading.
    pub fn open(&self) -> SqueezerResult<Box<dyn Read + '_>> {
        match self {
            Payload::File(path) => Ok(Box::new(File::open(path)?)),
            Payload::Bytes(bytes) => Ok(Box::new(Cursor::new(bytes.as_ref()))),
        }
    }
}

/// Computes the fields of `desired` that differ from `snapshot`.
///
/// A field missing from the snapshot compares equal to `null`.
pub fn diff(snapshot: &Attributes, desired: &Attributes) -> Attributes {
    desired
        .iter()
        .filter(|(field, value)| snapshot.get(field.as_str()).unwrap_or(&Value::Null) != *value)
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// One resource instance of a given kind.
#[derive(Debug)]
pub struct Entity<'e> {
    engine: &'e Engine,
    kind: &'static KindConfig,
    natural_key: NaturalKey,
    desired: Attributes,
    payloads: BTreeMap<String, Payload>,
    snapshot: Option<Attributes>,
}

impl<'e> Entity<'e> {
    /// Creates an entity identified by `natural_key`.
    pub fn new(engine: &'e Engine, kind: &'static KindConfig, natural_key: NaturalKey) -> Self {
        Self {
            engine,
            kind,
            natural_key,
            desired: Attributes::new(),
            payloads: BTreeMap::new(),
            snapshot: None,
        }
    }

    /// Creates an entity known only by its reference.
    pub fn from_href(engine: &'e Engine, kind: &'static KindConfig, href: &str) -> Self {
        let mut entity = Self::new(engine, kind, NaturalKey::new());
        entity.set_href(href);
        entity
    }

    /// Sets the desired attributes.
    pub fn with_desired(mut self, desired: Attributes) -> Self {
        self.desired = desired;
        self
    }

    /// Sets one desired attribute.
    pub fn with_attribute(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.desired.insert(field.into(), value.into());
        self
    }

    /// Attaches a binary payload under form field `field`.
    pub fn with_payload(mut self, field: impl Into<String>, payload: Payload) -> Self {
        self.payloads.insert(field.into(), payload);
        self
    }

    /// Returns the engine the entity operates on.
    pub fn engine(&self) -> &'e Engine {
        self.engine
    }

    /// Returns the kind configuration.
    pub fn kind(&self) -> &'static KindConfig {
        self.kind
    }

    /// Returns the natural key.
    pub fn natural_key(&self) -> &NaturalKey {
        &self.natural_key
    }

    /// Returns the desired attributes.
    pub fn desired(&self) -> &Attributes {
        &self.desired
    }

    /// Returns the payload attached under `field`.
    pub fn payload(&self, field: &str) -> Option<&Payload> {
        self.payloads.get(field)
    }

    /// Returns the snapshot, if the entity exists.
    pub fn snapshot(&self) -> Option<&Attributes> {
        self.snapshot.as_ref()
    }

    /// Returns the snapshot mutably.
    pub fn snapshot_mut(&mut self) -> Option<&mut Attributes> {
        self.snapshot.as_mut()
    }

    /// Replaces the snapshot.
    pub fn set_snapshot(&mut self, snapshot: Option<Attributes>) {
        self.snapshot = snapshot;
    }

    /// Takes the snapshot out of the entity.
    pub fn into_snapshot(self) -> Option<Attributes> {
        self.snapshot
    }

    /// Returns true if the entity exists from the engine's point of view.
    pub fn exists(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Returns the reference of the entity.
    pub fn href(&self) -> SqueezerResult<&str> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| SqueezerError::NotFound(self.kind.name.to_string()))?;
        snapshot
            .get("pulp_href")
            .and_then(Value::as_str)
            .ok_or_else(|| SqueezerError::Protocol(format!("{} has no pulp_href", self.kind.name)))
    }

    /// Returns `{<href parameter>: pulp_href}`.
    pub fn primary_key(&self) -> SqueezerResult<Parameters> {
        let mut parameters = Parameters::new();
        parameters.insert(self.kind.href_param.to_string(), Value::from(self.href()?));
        Ok(parameters)
    }

    /// Replaces the snapshot by a bare reference, to be completed by `read()`.
    pub fn set_href(&mut self, href: &str) {
        let mut snapshot = Attributes::new();
        snapshot.insert("pulp_href".to_string(), Value::from(href));
        self.snapshot = Some(snapshot);
    }

    fn load_uploads(&self) -> SqueezerResult<Uploads> {
        self.payloads
            .iter()
            .map(|(field, payload)| Ok((field.clone(), payload.load()?)))
            .collect()
    }

    /// Looks the entity up by its natural key.
    ///
    /// The snapshot is set when exactly one entity matches and cleared
    /// otherwise. Returns whether the entity exists.
    pub fn find(&mut self) -> SqueezerResult<bool> {
        self.snapshot = match self.kind.lookup {
            Lookup::Filter => {
                let operation_id = self.kind.require(Capability::Enumerate)?;
                let mut parameters = Parameters::new();
                parameters.insert("limit".to_string(), Value::from(1));
                parameters.extend(self.natural_key.resolved());
                let value =
                    self.engine
                        .invoke(&operation_id, &parameters, None, &Uploads::new())?;
                let mut page = Page::from_value(value)?;
                if page.count == 1 && !page.results.is_empty() {
                    Some(page.results.swap_remove(0))
                } else {
                    None
                }
            }
            Lookup::Reference => {
                let operation_id = self.kind.require(Capability::Read)?;
                let href = self
                    .natural_key
                    .get("pulp_href")
                    .and_then(Value::as_str)
                    .ok_or_else(|| SqueezerError::MissingParameter("pulp_href".to_string()))?;
                let mut parameters = Parameters::new();
                parameters.insert(self.kind.href_param.to_string(), Value::from(href));
                match self
                    .engine
                    .invoke(&operation_id, &parameters, None, &Uploads::new())
                {
                    Ok(Value::Object(object)) => Some(object),
                    Ok(other) => {
                        return Err(SqueezerError::Protocol(format!(
                            "unexpected {} representation: {other}",
                            self.kind.name
                        )))
                    }
                    Err(e) if e.status() == Some(404) => None,
                    Err(e) => return Err(e),
                }
            }
        };
        debug!(kind = self.kind.name, found = self.exists(), "find");
        Ok(self.exists())
    }

    /// Lists all entities of the kind, following pagination.
    ///
    /// Resolved natural-key fields are passed as filters.
    pub fn list(&self) -> SqueezerResult<Vec<Attributes>> {
        let operation_id = self.kind.require(Capability::Enumerate)?;
        let page_size = self.engine.config().page_size.max(1);
        let mut entities = Vec::new();
        let mut offset = 0u64;
        loop {
            let mut parameters = self.natural_key.resolved();
            parameters.insert("limit".to_string(), Value::from(page_size));
            parameters.insert("offset".to_string(), Value::from(offset));
            let value = self
                .engine
                .invoke(&operation_id, &parameters, None, &Uploads::new())?;
            let page = Page::from_value(value)?;
            let received = page.results.len();
            entities.extend(page.results);
            if page.next.is_none() || received == 0 {
                break;
            }
            offset += u64::from(page_size);
        }
        debug!(kind = self.kind.name, count = entities.len(), "list");
        Ok(entities)
    }

    /// Re-reads the entity by its primary key.
    pub fn read(&mut self) -> SqueezerResult<()> {
        let operation_id = self.kind.require(Capability::Read)?;
        let parameters = self.primary_key()?;
        match self
            .engine
            .invoke(&operation_id, &parameters, None, &Uploads::new())?
        {
            Value::Object(object) => {
                self.snapshot = Some(object);
                Ok(())
            }
            other => Err(SqueezerError::Protocol(format!(
                "unexpected {} representation: {other}",
                self.kind.name
            ))),
        }
    }

    /// Creates the entity from its natural key and desired attributes.
    ///
    /// In check mode the candidate body becomes the snapshot and no call is
    /// made. The change flag is raised in both cases.
    pub fn create(&mut self) -> SqueezerResult<()> {
        let operation_id = self.kind.require(Capability::Create)?;
        let mut body = self.natural_key.resolved();
        body.extend(self.desired.clone());

        let hooks = self.kind.hooks;
        if hooks.before_create(self, &mut body)? == CreateFlow::Done {
            return Ok(());
        }

        if self.engine.check_mode() {
            self.snapshot = Some(body);
            self.engine.set_changed();
        } else {
            let uploads = self.load_uploads()?;
            let response =
                self.engine
                    .invoke(&operation_id, &Parameters::new(), Some(&body), &uploads)?;
            match Response::classify(response)? {
                Response::Task(task_href) => {
                    let task = self
                        .engine
                        .tasks()
                        .wait_for(&task_href, TaskState::Completed)?;
                    self.engine.set_changed();
                    self.set_href(task.first_created_resource()?);
                    self.read()?;
                }
                Response::Object(object) => {
                    self.snapshot = Some(object);
                    self.engine.set_changed();
                }
                Response::Empty => {
                    return Err(SqueezerError::Protocol(format!(
                        "{operation_id} returned no content"
                    )))
                }
            }
        }
        info!(kind = self.kind.name, check_mode = self.engine.check_mode(), "created");
        hooks.after_create(self)
    }

    /// Brings the existing entity in line with the desired attributes.
    ///
    /// Only desired fields that differ from the snapshot count as changes;
    /// without changes no call is made. The full merged representation is
    /// submitted otherwise.
    pub fn update(&mut self) -> SqueezerResult<()> {
        let snapshot = self
            .snapshot
            .as_ref()
            .ok_or_else(|| SqueezerError::NotFound(self.kind.name.to_string()))?;
        let changes = diff(snapshot, &self.desired);
        if changes.is_empty() {
            return Ok(());
        }
        let operation_id = self.kind.require(Capability::Update)?;
        let fields: Vec<&str> = changes.keys().map(String::as_str).collect();
        info!(kind = self.kind.name, ?fields, "updating");

        let mut body = snapshot.clone();
        body.extend(changes);
        if self.engine.check_mode() {
            self.snapshot = Some(body);
        } else {
            let parameters = self.primary_key()?;
            let response =
                self.engine
                    .invoke(&operation_id, &parameters, Some(&body), &Uploads::new())?;
            match Response::classify(response)? {
                Response::Task(task_href) => {
                    self.engine
                        .tasks()
                        .wait_for(&task_href, TaskState::Completed)?;
                    self.engine.set_changed();
                    self.read()?;
                }
                Response::Object(object) => self.snapshot = Some(object),
                Response::Empty => self.snapshot = Some(body),
            }
        }
        self.engine.set_changed();
        Ok(())
    }

    /// Deletes the entity.
    pub fn delete(&mut self) -> SqueezerResult<()> {
        let operation_id = self.kind.require(Capability::Delete)?;
        if !self.engine.check_mode() {
            let parameters = self.primary_key()?;
            let response = self
                .engine
                .invoke(&operation_id, &parameters, None, &Uploads::new())?;
            if let Response::Task(task_href) = Response::classify(response)? {
                self.engine
                    .tasks()
                    .wait_for(&task_href, TaskState::Completed)?;
            }
        }
        info!(kind = self.kind.name, check_mode = self.engine.check_mode(), "deleted");
        self.snapshot = None;
        self.engine.set_changed();
        Ok(())
    }

    /// Synchronizes the repository from `remote_href`.
    ///
    /// Returns the completed sync task, or `None` in check mode where no
    /// call is made.
    pub fn sync(&self, remote_href: &str) -> SqueezerResult<Option<Task>> {
        let operation_id = self.kind.require(Capability::Sync)?;
        if self.engine.check_mode() {
            return Ok(None);
        }
        let parameters = self.primary_key()?;
        let mut body = Attributes::new();
        body.insert("remote".to_string(), Value::from(remote_href));
        let response = self
            .engine
            .invoke(&operation_id, &parameters, Some(&body), &Uploads::new())?;
        let task_href = Response::classify(response)?.into_task(&operation_id)?;
        info!(kind = self.kind.name, task = %task_href, "sync started");
        self.engine
            .tasks()
            .wait_for(&task_href, TaskState::Completed)
            .map(Some)
    }

    /// Asks the server to cancel the entity. Only tasks support this.
    pub fn cancel(&self) -> SqueezerResult<()> {
        let operation_id = self.kind.require(Capability::Cancel)?;
        let parameters = self.primary_key()?;
        let mut body = Attributes::new();
        body.insert("state".to_string(), Value::from(TaskState::Canceled.as_str()));
        self.engine
            .invoke(&operation_id, &parameters, Some(&body), &Uploads::new())?;
        Ok(())
    }

    /// Reconciles the entity towards `state`. See [`reconciler::reconcile`].
    pub fn process(&mut self, state: Option<&str>) -> SqueezerResult<()> {
        reconciler::reconcile(self, state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::config::{EngineConfig, PollPolicy};
    use crate::transport::MockTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn engine(mock: &Arc<MockTransport>, check_mode: bool) -> Engine {
        let config = EngineConfig::new()
            .with_check_mode(check_mode)
            .with_poll(PollPolicy::immediate());
        Engine::shared(config, mock.clone())
    }

    fn object(value: Value) -> Attributes {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    const REMOTE: &str = "/pulp/api/v3/remotes/file/file/0001/";

    #[test]
    fn natural_key_resolution() {
        let key = NaturalKey::new()
            .with("name", "r1")
            .with_optional::<String>("base_path", None);
        assert!(!key.is_resolved());
        assert_eq!(key.resolved().len(), 1);
        assert_eq!(key.get("name").unwrap(), "r1");
        assert!(key.get("base_path").is_none());
        assert!(NaturalKey::new().is_resolved());
    }

    #[test]
    fn diff_treats_missing_as_null() {
        let snapshot = object(json!({"name": "r1", "url": "http://a/", "proxy_url": null}));
        let desired = object(json!({"url": "http://a/", "proxy_url": null, "ca_cert": null}));
        assert!(diff(&snapshot, &desired).is_empty());

        let desired = object(json!({"url": "http://b/", "policy": "immediate"}));
        let changes = diff(&snapshot, &desired);
        assert_eq!(changes.len(), 2);
        assert_eq!(changes["url"], "http://b/");
    }

    #[test]
    fn find_uses_limit_and_key() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "remotes_file_file_list",
            json!({"count": 1, "next": null, "results": [{"pulp_href": REMOTE, "name": "r1"}]}),
        );
        let engine = engine(&mock, false);

        let mut remote =
            Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new().with("name", "r1"));
        assert!(remote.find().unwrap());
        assert_eq!(remote.href().unwrap(), REMOTE);
        assert_eq!(remote.primary_key().unwrap()["file_remote_href"], REMOTE);

        let call = &mock.calls()[0];
        assert_eq!(call.parameters["limit"], 1);
        assert_eq!(call.parameters["name"], "r1");
    }

    #[test]
    fn find_ambiguous_is_absent() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "remotes_file_file_list",
            json!({"count": 2, "next": "x", "results": [{"pulp_href": REMOTE}]}),
        );
        let engine = engine(&mock, false);

        let mut remote =
            Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new().with("name", "r"));
        assert!(!remote.find().unwrap());
        assert!(remote.href().is_err());
    }

    #[test]
    fn list_advances_with_zero_page_size() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "remotes_file_file_list",
            json!({"count": 2, "next": "more", "results": [{"name": "a"}]}),
        );
        mock.push_response(
            "remotes_file_file_list",
            json!({"count": 2, "next": null, "results": [{"name": "b"}]}),
        );
        let mut config = EngineConfig::new();
        config.page_size = 0;
        let engine = Engine::shared(config, mock.clone());

        let listed = Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new())
            .list()
            .unwrap();

        assert_eq!(listed.len(), 2);
        let calls = mock.calls_to("remotes_file_file_list");
        assert_eq!(calls[0].parameters["limit"], 1);
        assert_eq!(calls[1].parameters["offset"], 1);
    }

    #[test]
    fn find_by_reference_treats_404_as_absent() {
        let mock = Arc::new(MockTransport::new());
        mock.push_error("tasks_read", SqueezerError::http_status(404, "Not found."));
        let engine = engine(&mock, false);

        let key = NaturalKey::new().with("pulp_href", "/pulp/api/v3/tasks/9/");
        let mut task = Entity::new(&engine, &catalog::TASK, key);
        assert!(!task.find().unwrap());
    }

    #[test]
    fn create_synchronous_response() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "remotes_file_file_create",
            json!({"pulp_href": REMOTE, "name": "r1", "url": "http://a/"}),
        );
        let engine = engine(&mock, false);

        let mut remote =
            Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new().with("name", "r1"))
                .with_attribute("url", "http://a/");
        remote.create().unwrap();

        assert!(engine.changed());
        assert_eq!(remote.href().unwrap(), REMOTE);
        let body = mock.calls()[0].body.clone().unwrap();
        assert_eq!(body, object(json!({"name": "r1", "url": "http://a/"})));
    }

    #[test]
    fn create_through_task_reads_back() {
        let mock = Arc::new(MockTransport::new());
        let repository = "/pulp/api/v3/repositories/file/file/0002/";
        mock.push_response("repositories_file_file_create", json!({"task": "/t/1/"}));
        mock.push_response(
            "tasks_read",
            json!({"pulp_href": "/t/1/", "state": "completed", "created_resources": [repository]}),
        );
        mock.push_response(
            "repositories_file_file_read",
            json!({"pulp_href": repository, "name": "repo"}),
        );
        let engine = engine(&mock, false);

        let mut entity = Entity::new(
            &engine,
            &catalog::FILE_REPOSITORY,
            NaturalKey::new().with("name", "repo"),
        );
        entity.create().unwrap();

        assert_eq!(entity.snapshot().unwrap()["name"], "repo");
        let read = &mock.calls_to("repositories_file_file_read")[0];
        assert_eq!(read.parameters["file_repository_href"], repository);
    }

    #[test]
    fn create_in_check_mode_makes_no_call() {
        let mock = Arc::new(MockTransport::new());
        let engine = engine(&mock, true);

        let mut remote =
            Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new().with("name", "r1"))
                .with_attribute("url", "http://a/");
        remote.create().unwrap();

        assert!(engine.changed());
        assert_eq!(mock.call_count(), 0);
        assert_eq!(
            remote.snapshot().cloned().unwrap(),
            object(json!({"name": "r1", "url": "http://a/"}))
        );
    }

    #[test]
    fn update_without_changes_is_noop() {
        let mock = Arc::new(MockTransport::new());
        let engine = engine(&mock, false);

        let mut remote =
            Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new().with("name", "r1"))
                .with_attribute("url", "http://a/");
        remote.set_snapshot(Some(object(
            json!({"pulp_href": REMOTE, "name": "r1", "url": "http://a/"}),
        )));
        remote.update().unwrap();

        assert!(!engine.changed());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn update_submits_full_body() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response(
            "remotes_file_file_update",
            json!({"pulp_href": REMOTE, "name": "r1", "url": "http://b/", "policy": "immediate"}),
        );
        let engine = engine(&mock, false);

        let mut remote =
            Entity::new(&engine, &catalog::FILE_REMOTE, NaturalKey::new().with("name", "r1"))
                .with_attribute("url", "http://b/");
        remote.set_snapshot(Some(object(json!({
            "pulp_href": REMOTE,
            "name": "r1",
            "url": "http://a/",
            "policy": "immediate"
        }))));
        remote.update().unwrap();

        assert!(engine.changed());
        let call = &mock.calls()[0];
        assert_eq!(call.parameters["file_remote_href"], REMOTE);
        let body = call.body.as_ref().unwrap();
        assert_eq!(body["url"], "http://b/");
        assert_eq!(body["policy"], "immediate");
    }

    #[test]
    fn immutable_kind_rejects_update_before_transport() {
        let mock = Arc::new(MockTransport::new());
        let engine = engine(&mock, false);

        let mut content = Entity::new(
            &engine,
            &catalog::FILE_CONTENT,
            NaturalKey::new().with("relative_path", "a.txt"),
        )
        .with_attribute("label", "x");
        content.set_snapshot(Some(object(json!({"pulp_href": "/c/", "relative_path": "a.txt"}))));

        let err = content.update().unwrap_err();
        assert_eq!(err.to_string(), "this file content is immutable");
        assert_eq!(mock.call_count(), 0);
        assert!(!engine.changed());
    }

    #[test]
    fn delete_awaits_task() {
        let mock = Arc::new(MockTransport::new());
        mock.push_response("remotes_file_file_delete", json!({"task": "/t/2/"}));
        mock.push_response(
            "tasks_read",
            json!({"pulp_href": "/t/2/", "state": "completed"}),
        );
        let engine = engine(&mock, false);

        let mut remote = Entity::from_href(&engine, &catalog::FILE_REMOTE, REMOTE);
        remote.delete().unwrap();

        assert!(!remote.exists());
        assert!(engine.changed());
        assert_eq!(mock.call_count(), 2);
    }

    #[test]
    fn sync_in_check_mode_returns_nothing() {
        let mock = Arc::new(MockTransport::new());
        let engine = engine(&mock, true);

        let repository = Entity::from_href(&engine, &catalog::FILE_REPOSITORY, "/r/");
        assert!(repository.sync(REMOTE).unwrap().is_none());
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn sync_rejected_for_remote() {
        let mock = Arc::new(MockTransport::new());
        let engine = engine(&mock, false);

        let remote = Entity::from_href(&engine, &catalog::FILE_REMOTE, REMOTE);
        let err = remote.sync(REMOTE).unwrap_err();
        assert_eq!(err.to_string(), "this file remote is not syncable");
        assert_eq!(mock.call_count(), 0);
    }

    #[test]
    fn payload_sources() {
        let bytes = Payload::Bytes(Bytes::from_static(b"hello"));
        assert_eq!(bytes.size().unwrap(), 5);
        let mut read = String::new();
        bytes.open().unwrap().read_to_string(&mut read).unwrap();
        assert_eq!(read, "hello");

        let missing = Payload::File(PathBuf::from("/nonexistent/payload.bin"));
        assert!(matches!(missing.size(), Err(SqueezerError::Io(_))));
    }
}
