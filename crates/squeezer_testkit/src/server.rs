//! In-memory fake of the Pulp 3 API.
//!
//! [`FakePulp`] implements `Transport` directly, resolving operation
//! identifiers through the kind catalogue. It keeps entities in memory,
//! answers asynchronous operations with scripted tasks and supports failure
//! injection, which makes it suitable for end-to-end tests of the engine.

use crate::fixtures::sha256_hex;
use parking_lot::Mutex;
use serde_json::{json, Value};
use squeezer_core::catalog::{self, by_operation};
use squeezer_core::http::API_ROOT;
use squeezer_core::{
    Attributes, Capability, KindConfig, Parameters, RecordedCall, SqueezerError, SqueezerResult,
    TaskState, Transport, Uploads,
};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Description of a commit whose digest does not match the uploaded bytes.
pub const DIGEST_MISMATCH: &str =
    "The provided sha256 value does not match the sha256 of the uploaded file.";

#[derive(Debug, Clone)]
struct Stored {
    kind: &'static str,
    attributes: Attributes,
}

#[derive(Debug)]
struct UploadBuffer {
    size: u64,
    data: Vec<u8>,
    received: u64,
}

#[derive(Debug)]
struct State {
    entities: HashMap<String, Stored>,
    order: Vec<String>,
    task_scripts: HashMap<String, VecDeque<TaskState>>,
    task_errors: HashMap<String, String>,
    uploads: HashMap<String, UploadBuffer>,
    calls: Vec<RecordedCall>,
    call_counts: HashMap<String, usize>,
    injected: HashMap<(String, usize), u16>,
    failing_tasks: HashMap<String, String>,
    async_overrides: HashMap<String, bool>,
    progression: Vec<TaskState>,
    repair_counts: (u64, u64),
    sync_creates_version: bool,
}

fn bad_request(message: impl Into<String>) -> SqueezerError {
    SqueezerError::http_status(400, message)
}

fn not_found() -> SqueezerError {
    SqueezerError::http_status(404, "Not found.")
}

fn parent_param(kind: &KindConfig) -> Option<&'static str> {
    kind.endpoint
        .strip_prefix('{')
        .and_then(|rest| rest.split_once('}'))
        .map(|(name, _)| name)
}

fn parse_content_range(value: &str) -> Option<(u64, u64, u64)> {
    let range = value.strip_prefix("bytes ")?;
    let (span, total) = range.split_once('/')?;
    let (start, end) = span.split_once('-')?;
    Some((start.parse().ok()?, end.parse().ok()?, total.parse().ok()?))
}

fn is_same_kind(stored: &Stored, kind: &KindConfig) -> bool {
    stored.kind == kind.operation_prefix
}

impl State {
    fn new() -> Self {
        Self {
            entities: HashMap::new(),
            order: Vec::new(),
            task_scripts: HashMap::new(),
            task_errors: HashMap::new(),
            uploads: HashMap::new(),
            calls: Vec::new(),
            call_counts: HashMap::new(),
            injected: HashMap::new(),
            failing_tasks: HashMap::new(),
            async_overrides: HashMap::new(),
            progression: Vec::new(),
            repair_counts: (0, 0),
            sync_creates_version: true,
        }
    }

    fn get(&self, kind: &KindConfig, href: &str) -> SqueezerResult<&Attributes> {
        match self.entities.get(href) {
            Some(stored) if is_same_kind(stored, kind) => Ok(&stored.attributes),
            _ => Err(not_found()),
        }
    }

    fn get_mut(&mut self, kind: &KindConfig, href: &str) -> SqueezerResult<&mut Attributes> {
        match self.entities.get_mut(href) {
            Some(stored) if is_same_kind(stored, kind) => Ok(&mut stored.attributes),
            _ => Err(not_found()),
        }
    }

    fn of_kind<'s>(&'s self, kind: &'s KindConfig) -> impl Iterator<Item = (&'s String, &'s Attributes)> + 's {
        self.order.iter().filter_map(move |href| {
            self.entities
                .get(href)
                .filter(|stored| is_same_kind(stored, kind))
                .map(|stored| (href, &stored.attributes))
        })
    }

    fn find_by(&self, kind: &KindConfig, field: &str, value: &Value) -> Option<String> {
        self.of_kind(kind)
            .find(|(_, attributes)| attributes.get(field) == Some(value))
            .map(|(href, _)| href.clone())
    }

    fn insert(&mut self, kind: &KindConfig, href: String, attributes: Attributes) {
        self.order.push(href.clone());
        self.entities.insert(
            href,
            Stored {
                kind: kind.operation_prefix,
                attributes,
            },
        );
    }

    fn remove(&mut self, href: &str) {
        self.entities.remove(href);
        self.order.retain(|h| h != href);
        self.uploads.remove(href);
    }

    fn is_async(&self, kind: &KindConfig, capability: Capability, operation_id: &str) -> bool {
        if let Some(forced) = self.async_overrides.get(operation_id) {
            return *forced;
        }
        let prefix = kind.operation_prefix;
        let plugin_object = ["remotes_", "repositories_", "distributions_"]
            .iter()
            .any(|p| prefix.starts_with(p));
        match capability {
            Capability::Sync | Capability::Commit | Capability::Repair => true,
            Capability::Create => {
                prefix.starts_with("distributions_") || prefix.starts_with("publications_")
            }
            Capability::Update => plugin_object,
            Capability::Delete => {
                plugin_object || prefix.starts_with("publications_") || kind.href_param.is_empty()
            }
            _ => false,
        }
    }

    fn spawn_task(
        &mut self,
        operation_id: &str,
        created: Vec<String>,
        progress: Vec<Value>,
    ) -> Value {
        let href = format!("{API_ROOT}tasks/{}/", Uuid::new_v4());
        let mut script: VecDeque<TaskState> = self.progression.iter().copied().collect();
        let failure = self.failing_tasks.get(operation_id).cloned();
        let (created, progress) = match failure {
            Some(description) => {
                script.push_back(TaskState::Failed);
                self.task_errors.insert(href.clone(), description);
                (Vec::new(), Vec::new())
            }
            None => {
                script.push_back(TaskState::Completed);
                (created, progress)
            }
        };
        let initial = script.front().copied().unwrap_or(TaskState::Completed);
        let attributes = json!({
            "pulp_href": href,
            "name": operation_id,
            "state": initial.as_str(),
            "created_resources": created,
            "progress_reports": progress,
            "error": null
        });
        if let Value::Object(attributes) = attributes {
            self.insert(&catalog::TASK, href.clone(), attributes);
        }
        self.task_scripts.insert(href.clone(), script);
        json!({ "task": href })
    }

    fn task_fails(&self, operation_id: &str) -> bool {
        self.failing_tasks.contains_key(operation_id)
    }

    fn advance_task(&mut self, href: &str) {
        let Some(next) = self.task_scripts.get_mut(href).and_then(VecDeque::pop_front) else {
            return;
        };
        let error = (next == TaskState::Failed)
            .then(|| self.task_errors.get(href).cloned())
            .flatten();
        if let Some(stored) = self.entities.get_mut(href) {
            stored
                .attributes
                .insert("state".to_string(), Value::from(next.as_str()));
            if let Some(description) = error {
                stored
                    .attributes
                    .insert("error".to_string(), json!({ "description": description }));
            }
        }
    }

    fn href_param<'p>(kind: &KindConfig, parameters: &'p Parameters) -> SqueezerResult<&'p str> {
        parameters
            .get(kind.href_param)
            .and_then(Value::as_str)
            .ok_or_else(|| bad_request(format!("{}: This field is required.", kind.href_param)))
    }

    fn list(&self, kind: &KindConfig, parameters: &Parameters) -> SqueezerResult<Value> {
        let limit = parameters.get("limit").and_then(Value::as_u64).unwrap_or(100) as usize;
        let offset = parameters.get("offset").and_then(Value::as_u64).unwrap_or(0) as usize;
        let parent = parent_param(kind);

        let matches: Vec<&Attributes> = self
            .of_kind(kind)
            .map(|(_, attributes)| attributes)
            .filter(|attributes| {
                parameters.iter().all(|(name, value)| match name.as_str() {
                    "limit" | "offset" => true,
                    name if Some(name) == parent => attributes.get("repository") == Some(value),
                    name => attributes.get(name) == Some(value),
                })
            })
            .collect();

        let count = matches.len();
        let results: Vec<Value> = matches
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|attributes| Value::Object(attributes.clone()))
            .collect();
        let next = (offset + limit < count)
            .then(|| format!("{API_ROOT}{}?limit={limit}&offset={}", kind.endpoint, offset + limit));
        Ok(json!({
            "count": count,
            "next": next,
            "previous": null,
            "results": results
        }))
    }

    fn read(&mut self, kind: &KindConfig, parameters: &Parameters) -> SqueezerResult<Value> {
        let href = Self::href_param(kind, parameters)?.to_string();
        if kind.operation_prefix == catalog::TASK.operation_prefix {
            self.advance_task(&href);
        }
        self.get(kind, &href).cloned().map(Value::Object)
    }

    fn create_entity(
        &mut self,
        kind: &'static KindConfig,
        body: &Attributes,
        uploads: &Uploads,
    ) -> SqueezerResult<(String, Attributes)> {
        if let Some(name) = body.get("name") {
            if self.find_by(kind, "name", name).is_some() {
                return Err(bad_request(format!(
                    "name: {} with this name already exists.",
                    kind.name
                )));
            }
        }

        let href = format!("{API_ROOT}{}{}/", kind.endpoint, Uuid::new_v4());
        let mut attributes = body.clone();
        attributes.insert("pulp_href".to_string(), Value::from(href.as_str()));

        if std::ptr::eq(kind, &catalog::ARTIFACT) {
            let file = uploads
                .get("file")
                .ok_or_else(|| bad_request("file: This field is required."))?;
            let digest = sha256_hex(file);
            if let Some(expected) = body.get("sha256").and_then(Value::as_str) {
                if expected != digest {
                    return Err(bad_request(DIGEST_MISMATCH));
                }
            }
            let digest = Value::from(digest);
            if self.find_by(kind, "sha256", &digest).is_some() {
                return Err(bad_request("sha256: This field must be unique."));
            }
            attributes.insert("sha256".to_string(), digest);
            attributes.insert("size".to_string(), Value::from(file.len()));
        } else if std::ptr::eq(kind, &catalog::UPLOAD) {
            let size = body
                .get("size")
                .and_then(Value::as_u64)
                .ok_or_else(|| bad_request("size: This field is required."))?;
            self.uploads.insert(
                href.clone(),
                UploadBuffer {
                    size,
                    data: vec![0; size as usize],
                    received: 0,
                },
            );
        } else if std::ptr::eq(kind, &catalog::FILE_CONTENT) {
            let artifact = body
                .get("artifact")
                .and_then(Value::as_str)
                .ok_or_else(|| bad_request("artifact: This field is required."))?;
            let sha256 = self
                .get(&catalog::ARTIFACT, artifact)
                .map_err(|_| bad_request("artifact: Invalid hyperlink - Object does not exist."))?
                .get("sha256")
                .cloned()
                .unwrap_or(Value::Null);
            attributes.insert("sha256".to_string(), sha256);
        } else if kind.supports(Capability::Sync) {
            let versions = format!("{href}versions/");
            attributes.insert("versions_href".to_string(), Value::from(versions.as_str()));
            attributes.insert(
                "latest_version_href".to_string(),
                Value::from(format!("{versions}0/")),
            );
        }

        self.insert(kind, href.clone(), attributes.clone());
        if std::ptr::eq(kind, &catalog::FILE_REPOSITORY) {
            self.insert_version(&href, 0);
        }
        Ok((href, attributes))
    }

    fn insert_version(&mut self, repository: &str, number: u64) -> String {
        let href = format!("{repository}versions/{number}/");
        let attributes = json!({
            "pulp_href": href,
            "number": number,
            "repository": repository,
            "content": []
        });
        if let Value::Object(attributes) = attributes {
            self.insert(&catalog::FILE_REPOSITORY_VERSION, href.clone(), attributes);
        }
        href
    }

    fn create(
        &mut self,
        kind: &'static KindConfig,
        operation_id: &str,
        body: &Attributes,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        let asynchronous = self.is_async(kind, Capability::Create, operation_id);
        if asynchronous && self.task_fails(operation_id) {
            return Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()));
        }
        let (href, attributes) = self.create_entity(kind, body, uploads)?;
        if asynchronous {
            Ok(self.spawn_task(operation_id, vec![href], Vec::new()))
        } else {
            Ok(Value::Object(attributes))
        }
    }

    fn update(
        &mut self,
        kind: &'static KindConfig,
        operation_id: &str,
        parameters: &Parameters,
        body: &Attributes,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        let href = Self::href_param(kind, parameters)?.to_string();
        if std::ptr::eq(kind, &catalog::UPLOAD) {
            return self.upload_chunk(&href, parameters, uploads);
        }
        self.get(kind, &href)?;
        let asynchronous = self.is_async(kind, Capability::Update, operation_id);
        if asynchronous && self.task_fails(operation_id) {
            return Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()));
        }

        let attributes = self.get_mut(kind, &href)?;
        for (field, value) in body {
            if field != "pulp_href" {
                attributes.insert(field.clone(), value.clone());
            }
        }
        let snapshot = attributes.clone();
        if asynchronous {
            Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()))
        } else {
            Ok(Value::Object(snapshot))
        }
    }

    fn upload_chunk(
        &mut self,
        href: &str,
        parameters: &Parameters,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        let header = parameters
            .get("Content-Range")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_request("Content-Range header is required."))?;
        let (start, end, total) = parse_content_range(header)
            .ok_or_else(|| bad_request(format!("Invalid Content-Range: {header}")))?;
        let chunk = uploads
            .get("file")
            .ok_or_else(|| bad_request("file: This field is required."))?;
        let buffer = self.uploads.get_mut(href).ok_or_else(not_found)?;

        if total != buffer.size
            || start > end
            || end >= total
            || end - start + 1 != chunk.len() as u64
        {
            return Err(bad_request(format!(
                "Chunk size does not match Content-Range: {header}"
            )));
        }
        buffer.data[start as usize..=end as usize].copy_from_slice(chunk);
        buffer.received += chunk.len() as u64;
        self.get(&catalog::UPLOAD, href).cloned().map(Value::Object)
    }

    fn delete(
        &mut self,
        kind: &'static KindConfig,
        operation_id: &str,
        parameters: &Parameters,
    ) -> SqueezerResult<Value> {
        if kind.href_param.is_empty() {
            return Ok(self.delete_orphans(operation_id));
        }
        let href = Self::href_param(kind, parameters)?.to_string();
        self.get(kind, &href)?;
        let asynchronous = self.is_async(kind, Capability::Delete, operation_id);
        if asynchronous && self.task_fails(operation_id) {
            return Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()));
        }

        self.remove(&href);
        let versions: Vec<String> = self
            .of_kind(&catalog::FILE_REPOSITORY_VERSION)
            .filter(|(_, attributes)| attributes.get("repository") == Some(&Value::from(href.as_str())))
            .map(|(version, _)| version.clone())
            .collect();
        for version in versions {
            self.remove(&version);
        }

        if asynchronous {
            Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()))
        } else {
            Ok(Value::Null)
        }
    }

    fn delete_orphans(&mut self, operation_id: &str) -> Value {
        if self.task_fails(operation_id) {
            return self.spawn_task(operation_id, Vec::new(), Vec::new());
        }
        let referenced: HashSet<String> = self
            .of_kind(&catalog::FILE_REPOSITORY_VERSION)
            .filter_map(|(_, attributes)| attributes.get("content").and_then(Value::as_array))
            .flatten()
            .filter_map(|content| content.as_str().map(str::to_string))
            .collect();
        let content: Vec<String> = self
            .of_kind(&catalog::FILE_CONTENT)
            .map(|(href, _)| href.clone())
            .filter(|href| !referenced.contains(href))
            .collect();
        for href in &content {
            self.remove(href);
        }

        let used: HashSet<String> = self
            .of_kind(&catalog::FILE_CONTENT)
            .filter_map(|(_, attributes)| attributes.get("artifact").and_then(Value::as_str))
            .map(str::to_string)
            .collect();
        let artifacts: Vec<String> = self
            .of_kind(&catalog::ARTIFACT)
            .map(|(href, _)| href.clone())
            .filter(|href| !used.contains(href))
            .collect();
        for href in &artifacts {
            self.remove(href);
        }

        let progress = vec![
            json!({
                "message": "Clean up orphan Content",
                "code": "clean-up.content",
                "total": content.len(),
                "done": content.len()
            }),
            json!({
                "message": "Clean up orphan Artifacts",
                "code": "clean-up.artifacts",
                "total": artifacts.len(),
                "done": artifacts.len()
            }),
        ];
        self.spawn_task(operation_id, Vec::new(), progress)
    }

    fn sync(
        &mut self,
        kind: &'static KindConfig,
        operation_id: &str,
        parameters: &Parameters,
        body: &Attributes,
    ) -> SqueezerResult<Value> {
        let href = Self::href_param(kind, parameters)?.to_string();
        let repository = self.get(kind, &href)?.clone();
        let remote = body
            .get("remote")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_request("remote: This field is required."))?;
        if !self.entities.contains_key(remote) {
            return Err(bad_request("remote: Invalid hyperlink - Object does not exist."));
        }
        if self.task_fails(operation_id) || !self.sync_creates_version {
            return Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()));
        }

        let latest = repository
            .get("latest_version_href")
            .and_then(Value::as_str)
            .and_then(|latest| latest.trim_end_matches('/').rsplit('/').next())
            .and_then(|number| number.parse::<u64>().ok())
            .unwrap_or(0);
        let number = latest + 1;
        let version = if std::ptr::eq(kind, &catalog::FILE_REPOSITORY) {
            self.insert_version(&href, number)
        } else {
            format!("{href}versions/{number}/")
        };
        self.get_mut(kind, &href)?
            .insert("latest_version_href".to_string(), Value::from(version.as_str()));
        Ok(self.spawn_task(operation_id, vec![version], Vec::new()))
    }

    fn cancel(&mut self, parameters: &Parameters) -> SqueezerResult<Value> {
        let href = Self::href_param(&catalog::TASK, parameters)?.to_string();
        let state = self
            .get(&catalog::TASK, &href)?
            .get("state")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse::<TaskState>()?;
        if state.is_terminal() {
            return Err(SqueezerError::http_status(
                409,
                format!("The task cannot be canceled because it is in the '{state}' state."),
            ));
        }
        self.task_scripts
            .insert(href.clone(), VecDeque::from([TaskState::Canceled]));
        let task = self.get_mut(&catalog::TASK, &href)?;
        task.insert(
            "state".to_string(),
            Value::from(TaskState::Canceling.as_str()),
        );
        Ok(Value::Object(task.clone()))
    }

    fn commit(
        &mut self,
        operation_id: &str,
        parameters: &Parameters,
        body: &Attributes,
    ) -> SqueezerResult<Value> {
        let href = Self::href_param(&catalog::UPLOAD, parameters)?.to_string();
        let expected = body
            .get("sha256")
            .and_then(Value::as_str)
            .ok_or_else(|| bad_request("sha256: This field is required."))?
            .to_string();
        let buffer = self.uploads.get(&href).ok_or_else(not_found)?;
        let complete = buffer.received >= buffer.size;
        let digest = sha256_hex(&buffer.data);
        let size = buffer.size;

        if self.task_fails(operation_id) {
            return Ok(self.spawn_task(operation_id, Vec::new(), Vec::new()));
        }
        if !complete || digest != expected {
            self.failing_tasks
                .insert(operation_id.to_string(), DIGEST_MISMATCH.to_string());
            let task = self.spawn_task(operation_id, Vec::new(), Vec::new());
            self.failing_tasks.remove(operation_id);
            return Ok(task);
        }

        let artifact = format!("{API_ROOT}{}{}/", catalog::ARTIFACT.endpoint, Uuid::new_v4());
        let attributes = json!({
            "pulp_href": artifact,
            "sha256": digest,
            "size": size
        });
        if let Value::Object(attributes) = attributes {
            self.insert(&catalog::ARTIFACT, artifact.clone(), attributes);
        }
        self.remove(&href);
        Ok(self.spawn_task(operation_id, vec![artifact], Vec::new()))
    }

    fn repair(
        &mut self,
        kind: &'static KindConfig,
        operation_id: &str,
        parameters: &Parameters,
    ) -> SqueezerResult<Value> {
        let href = Self::href_param(kind, parameters)?.to_string();
        self.get(kind, &href)?;
        let (corrupted, repaired) = self.repair_counts;
        let progress = vec![
            json!({"message": "Identify missing units", "code": "repair.missing", "done": 0}),
            json!({"message": "Identify corrupted units", "code": "repair.corrupted", "done": corrupted}),
            json!({"message": "Repair corrupted units", "code": "repair.repaired", "done": repaired}),
        ];
        Ok(self.spawn_task(operation_id, Vec::new(), progress))
    }
}

/// An in-memory Pulp 3 server.
///
/// Plugin objects (remotes, repositories, distributions) answer updates and
/// deletes with tasks, like the real server. Use
/// [`set_async`](Self::set_async) to force an operation either way.
#[derive(Debug)]
pub struct FakePulp {
    state: Mutex<State>,
}

impl Default for FakePulp {
    fn default() -> Self {
        Self::new()
    }
}

impl FakePulp {
    /// Creates an empty server.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::new()),
        }
    }

    /// Makes every new task pass through `states` before its final state.
    ///
    /// Each task read advances one step; the default reaches the final state
    /// on the first read.
    pub fn set_task_progression(&self, states: Vec<TaskState>) {
        self.state.lock().progression = states;
    }

    /// Forces `operation_id` to answer with a task (`true`) or directly.
    pub fn set_async(&self, operation_id: &str, asynchronous: bool) {
        self.state
            .lock()
            .async_overrides
            .insert(operation_id.to_string(), asynchronous);
    }

    /// Fails the `nth` call (1-based) of `operation_id` with `status`.
    pub fn fail_call(&self, operation_id: &str, nth: usize, status: u16) {
        self.state
            .lock()
            .injected
            .insert((operation_id.to_string(), nth), status);
    }

    /// Makes the tasks spawned by `operation_id` fail with `description`.
    pub fn fail_tasks(&self, operation_id: &str, description: &str) {
        self.state
            .lock()
            .failing_tasks
            .insert(operation_id.to_string(), description.to_string());
    }

    /// Sets the counters reported by repair tasks.
    pub fn set_repair_counts(&self, corrupted: u64, repaired: u64) {
        self.state.lock().repair_counts = (corrupted, repaired);
    }

    /// Controls whether syncs create a new repository version.
    pub fn set_sync_creates_version(&self, creates: bool) {
        self.state.lock().sync_creates_version = creates;
    }

    /// Stores an entity without recording a call. Returns its reference.
    pub fn seed(&self, kind: &'static KindConfig, attributes: Value) -> SqueezerResult<String> {
        let body = match attributes {
            Value::Object(body) => body,
            other => return Err(bad_request(format!("not an object: {other}"))),
        };
        let uploads = Uploads::new();
        self.state
            .lock()
            .create_entity(kind, &body, &uploads)
            .map(|(href, _)| href)
    }

    /// Stores an artifact with `data` as contents. Returns its reference.
    pub fn seed_artifact(&self, data: &[u8]) -> SqueezerResult<String> {
        let mut uploads = Uploads::new();
        uploads.insert("file".to_string(), bytes::Bytes::copy_from_slice(data));
        self.state
            .lock()
            .create_entity(&catalog::ARTIFACT, &Attributes::new(), &uploads)
            .map(|(href, _)| href)
    }

    /// Stores a task in `state` that stays there until canceled.
    pub fn seed_task(&self, state: TaskState) -> String {
        let href = format!("{API_ROOT}tasks/{}/", Uuid::new_v4());
        let attributes = json!({
            "pulp_href": href,
            "name": "seeded",
            "state": state.as_str(),
            "created_resources": [],
            "progress_reports": []
        });
        if let Value::Object(attributes) = attributes {
            self.state
                .lock()
                .insert(&catalog::TASK, href.clone(), attributes);
        }
        href
    }

    /// Returns the stored representation of `href`.
    pub fn get(&self, href: &str) -> Option<Attributes> {
        self.state
            .lock()
            .entities
            .get(href)
            .map(|stored| stored.attributes.clone())
    }

    /// Returns every entity of `kind`, in creation order.
    pub fn entities(&self, kind: &KindConfig) -> Vec<Attributes> {
        self.state
            .lock()
            .of_kind(kind)
            .map(|(_, attributes)| attributes.clone())
            .collect()
    }

    /// Number of open upload sessions.
    pub fn open_uploads(&self) -> usize {
        self.state.lock().uploads.len()
    }

    /// Returns every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the calls to `operation_id`.
    pub fn calls_to(&self, operation_id: &str) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation_id == operation_id)
            .cloned()
            .collect()
    }

    /// Returns the calls that may change server state.
    pub fn mutating_calls(&self) -> Vec<RecordedCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| {
                !matches!(
                    by_operation(&call.operation_id),
                    Some((_, Capability::Enumerate | Capability::Read))
                )
            })
            .cloned()
            .collect()
    }
}

impl Transport for FakePulp {
    fn invoke(
        &self,
        operation_id: &str,
        parameters: &Parameters,
        body: Option<&Attributes>,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        let mut state = self.state.lock();
        state.calls.push(RecordedCall {
            operation_id: operation_id.to_string(),
            parameters: parameters.clone(),
            body: body.cloned(),
            upload_sizes: uploads
                .iter()
                .map(|(name, data)| (name.clone(), data.len()))
                .collect(),
        });
        let nth = {
            let count = state.call_counts.entry(operation_id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(status) = state.injected.remove(&(operation_id.to_string(), nth)) {
            return Err(SqueezerError::http_status(
                status,
                format!("injected failure of {operation_id}"),
            ));
        }

        let (kind, capability) = by_operation(operation_id).ok_or_else(not_found)?;
        let empty = Attributes::new();
        let body = body.unwrap_or(&empty);
        match capability {
            Capability::Enumerate => state.list(kind, parameters),
            Capability::Read => state.read(kind, parameters),
            Capability::Create => state.create(kind, operation_id, body, uploads),
            Capability::Update => state.update(kind, operation_id, parameters, body, uploads),
            Capability::Delete => state.delete(kind, operation_id, parameters),
            Capability::Sync => state.sync(kind, operation_id, parameters, body),
            Capability::Cancel => state.cancel(parameters),
            Capability::Commit => state.commit(operation_id, parameters, body),
            Capability::Repair => state.repair(kind, operation_id, parameters),
        }
    }
}
