//! Blocking `reqwest` implementation of the engine's HTTP client.

use crate::error::CliError;
use crate::Connection;
use reqwest::blocking::{multipart, Client, RequestBuilder};
use serde_json::Value;
use squeezer_core::{Attributes, HttpClient, HttpRequest, HttpResponse, Method, Uploads};

/// HTTP client talking to a Pulp server with basic authentication.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    credentials: Option<(String, Option<String>)>,
}

impl ReqwestClient {
    /// Builds a client from the connection settings.
    pub fn new(connection: &Connection) -> Result<Self, CliError> {
        let client = Client::builder()
            .user_agent(concat!("squeezer/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(!connection.validate_certs)
            .timeout(None)
            .build()?;
        let credentials = connection
            .username
            .clone()
            .map(|username| (username, connection.password.clone()));
        Ok(Self {
            client,
            credentials,
        })
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };
        let builder = self.client.request(method, url);
        match &self.credentials {
            Some((username, password)) => builder.basic_auth(username, password.as_deref()),
            None => builder,
        }
    }
}

fn form_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn multipart_form(fields: Option<Attributes>, files: Uploads) -> multipart::Form {
    let form = fields
        .into_iter()
        .flatten()
        .filter(|(_, value)| !value.is_null())
        .fold(multipart::Form::new(), |form, (name, value)| {
            form.text(name, form_text(&value))
        });
    files.into_iter().fold(form, |form, (name, data)| {
        let part = multipart::Part::bytes(data.to_vec()).file_name(name.clone());
        form.part(name, part)
    })
}

impl HttpClient for ReqwestClient {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut builder = self.request(request.method, &request.url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = if !request.files.is_empty() {
            builder.multipart(multipart_form(request.body, request.files))
        } else if let Some(body) = &request.body {
            builder.json(body)
        } else {
            builder
        };

        let response = builder.send().map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(HttpResponse { status, body })
    }
}
