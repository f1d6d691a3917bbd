//! HTTP transport implementation.
//!
//! Maps operation identifiers to REST routes and executes them through an
//! abstract [`HttpClient`], so the engine stays independent of any HTTP
//! library. The default [`RouteTable`] is derived from the kind catalogue.

use crate::catalog;
use crate::error::{SqueezerError, SqueezerResult};
use crate::kind::{Capability, KindConfig};
use crate::transport::{Attributes, Parameters, Transport, Uploads};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Path prefix of the Pulp 3 REST API.
pub const API_ROOT: &str = "/pulp/api/v3/";

/// Header carrying the byte range of an upload chunk.
pub const CONTENT_RANGE: &str = "Content-Range";

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// PATCH
    Patch,
    /// DELETE
    Delete,
}

/// Where an operation goes on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    /// Request method.
    pub method: Method,
    /// Path template. `{name}` placeholders are replaced by parameters.
    pub path: String,
    /// Parameters sent as headers instead of query arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<String>,
}

impl Route {
    /// Creates a route without header parameters.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
        }
    }

    /// Declares `name` as a header parameter.
    pub fn with_header(mut self, name: impl Into<String>) -> Self {
        self.headers.push(name.into());
        self
    }
}

/// Operation identifier to route mapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteTable {
    routes: HashMap<String, Route>,
}

impl RouteTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derives the routes of every supported operation of `kinds`.
    pub fn from_catalog(kinds: &[&KindConfig]) -> Self {
        let mut table = Self::new();
        for kind in kinds {
            for capability in kind.capabilities.iter() {
                table.insert(kind.operation_id(capability), route_for(kind, capability));
            }
        }
        table
    }

    /// Routes for the whole catalogue.
    pub fn pulp_v3() -> Self {
        Self::from_catalog(catalog::ALL)
    }

    /// Parses a table from JSON: `{"<operation>": {"method": "GET", "path": "..."}}`.
    pub fn from_json(json: &str) -> SqueezerResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| SqueezerError::Protocol(format!("invalid route table: {e}")))
    }

    /// Adds or replaces a route.
    pub fn insert(&mut self, operation_id: impl Into<String>, route: Route) {
        self.routes.insert(operation_id.into(), route);
    }

    /// Adds every route of `other`, replacing existing ones.
    pub fn merge(&mut self, other: RouteTable) {
        self.routes.extend(other.routes);
    }

    /// Returns the route of `operation_id`.
    pub fn get(&self, operation_id: &str) -> Option<&Route> {
        self.routes.get(operation_id)
    }

    /// Number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if the table has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn route_for(kind: &KindConfig, capability: Capability) -> Route {
    let collection = if kind.endpoint.starts_with('{') {
        kind.endpoint.to_string()
    } else {
        format!("{API_ROOT}{}", kind.endpoint)
    };
    let instance = format!("{{{}}}", kind.href_param);
    match capability {
        Capability::Enumerate => Route::new(Method::Get, collection),
        Capability::Create => Route::new(Method::Post, collection),
        Capability::Read => Route::new(Method::Get, instance),
        Capability::Update if kind.supports(Capability::Commit) => {
            Route::new(Method::Put, instance).with_header(CONTENT_RANGE)
        }
        Capability::Update => Route::new(Method::Put, instance),
        Capability::Delete if kind.href_param.is_empty() => Route::new(Method::Delete, collection),
        Capability::Delete => Route::new(Method::Delete, instance),
        Capability::Cancel => Route::new(Method::Patch, instance),
        Capability::Sync | Capability::Commit | Capability::Repair => {
            Route::new(Method::Post, format!("{instance}{}/", capability.suffix()))
        }
    }
}

/// A request ready to be sent.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Request method.
    pub method: Method,
    /// Absolute URL without query string.
    pub url: String,
    /// Query arguments.
    pub query: Vec<(String, String)>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// JSON body, or the text fields of a multipart body when `files` is set.
    pub body: Option<Attributes>,
    /// File parts of a multipart body.
    pub files: Uploads,
}

/// A received response.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// Raw body.
    pub body: Bytes,
}

/// HTTP client abstraction.
///
/// Implement this trait to plug in an HTTP library. Network failures are
/// reported as `Err`; HTTP error statuses are regular responses.
pub trait HttpClient: Send + Sync {
    /// Sends `request` and returns the response.
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String>;
}

/// HTTP-based transport.
pub struct HttpTransport<C: HttpClient> {
    /// Server base URL, e.g. `https://pulp.example.com`.
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Operation routes.
    routes: RouteTable,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a transport using the catalogue routes.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self::with_routes(base_url, client, RouteTable::pulp_v3())
    }

    /// Creates a transport using `routes`.
    pub fn with_routes(base_url: impl Into<String>, client: C, routes: RouteTable) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client,
            routes,
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the route table.
    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Builds the request for `operation_id` without sending it.
    pub fn build_request(
        &self,
        operation_id: &str,
        parameters: &Parameters,
        body: Option<&Attributes>,
        uploads: &Uploads,
    ) -> SqueezerResult<HttpRequest> {
        let route = self
            .routes
            .get(operation_id)
            .ok_or_else(|| SqueezerError::Protocol(format!("no route for {operation_id}")))?;

        let mut used = Vec::new();
        let path = expand(&route.path, parameters, &mut used)?;

        let mut query = Vec::new();
        let mut headers = Vec::new();
        for (name, value) in parameters {
            if used.contains(&name.as_str()) || value.is_null() {
                continue;
            }
            let value = parameter_string(value);
            if route.headers.iter().any(|h| h == name) {
                headers.push((name.clone(), value));
            } else {
                query.push((name.clone(), value));
            }
        }

        Ok(HttpRequest {
            method: route.method,
            url: format!("{}{}", self.base_url, path),
            query,
            headers,
            body: body.cloned(),
            files: uploads.clone(),
        })
    }
}

impl<C: HttpClient> Transport for HttpTransport<C> {
    fn invoke(
        &self,
        operation_id: &str,
        parameters: &Parameters,
        body: Option<&Attributes>,
        uploads: &Uploads,
    ) -> SqueezerResult<Value> {
        let request = self.build_request(operation_id, parameters, body, uploads)?;
        trace!(method = ?request.method, url = %request.url, "sending request");

        let response = self
            .client
            .execute(request)
            .map_err(SqueezerError::transport)?;
        debug!(operation = operation_id, status = response.status, "response");

        if response.status >= 400 {
            return Err(SqueezerError::http_status(
                response.status,
                error_message(response.status, &response.body),
            ));
        }
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&response.body)
            .map_err(|e| SqueezerError::transport(format!("invalid JSON response: {e}")))
    }
}

fn expand<'p>(
    template: &str,
    parameters: &'p Parameters,
    used: &mut Vec<&'p str>,
) -> SqueezerResult<String> {
    let mut path = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        path.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            SqueezerError::Protocol(format!("unterminated placeholder in {template}"))
        })?;
        let name = &after[..end];
        let (key, value) = parameters
            .get_key_value(name)
            .ok_or_else(|| SqueezerError::MissingParameter(name.to_string()))?;
        path.push_str(&parameter_string(value));
        used.push(key.as_str());
        rest = &after[end + 1..];
    }
    path.push_str(rest);
    Ok(path)
}

fn parameter_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn error_message(status: u16, body: &[u8]) -> String {
    let detail = serde_json::from_slice::<Value>(body)
        .ok()
        .map(|value| match value.get("detail").and_then(Value::as_str) {
            Some(detail) => detail.to_string(),
            None => value.to_string(),
        })
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    if detail.is_empty() {
        format!("HTTP {status}")
    } else {
        format!("HTTP {status}: {detail}")
    }
}
