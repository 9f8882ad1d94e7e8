//! # Remote Query Client
//!
//! A small authenticated HTTP client for the GitHub APIs. The API kind selects
//! which token from [`Credentials`] is sent as the bearer token; a missing
//! token fails before any request is made.
//!
//! GraphQL responses are judged by their body, not only their status: a body
//! without a top-level `data` member (or with `data: null`) is a query-level
//! failure and is reported with the raw body, distinct from a transport
//! failure such as a refused connection.

use std::time::Duration;

use log::{debug, error};
use reqwest::blocking::Client;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use crate::config::{Credentials, ENV_GRAPHQL_TOKEN, ENV_REST_TOKEN};
use crate::error::{Error, Result};

/// Which API a client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    Graphql,
    Rest,
}

impl ApiKind {
    /// Environment variable the token for this API is read from.
    pub fn token_variable(self) -> &'static str {
        match self {
            ApiKind::Graphql => ENV_GRAPHQL_TOKEN,
            ApiKind::Rest => ENV_REST_TOKEN,
        }
    }

    /// The configured token for this API.
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` naming the variable when no token is set.
    pub fn token(self, credentials: &Credentials) -> Result<&str> {
        let token = match self {
            ApiKind::Graphql => credentials.graphql_token.as_deref(),
            ApiKind::Rest => credentials.rest_token.as_deref(),
        };
        token.ok_or_else(|| Error::MissingCredential {
            variable: self.token_variable().to_string(),
        })
    }
}

/// Something that can answer a GraphQL query with its `data` member.
///
/// The paginator depends only on this trait.
pub trait QueryTransport {
    fn query(&self, query: &str) -> Result<Value>;
}

/// Bearer-authenticated JSON client bound to one endpoint.
#[derive(Debug)]
pub struct ApiClient {
    kind: ApiKind,
    endpoint: String,
    token: String,
    http: Client,
}

impl ApiClient {
    /// # Errors
    ///
    /// Fails with `MissingCredential` if the token for `kind` is not set, or
    /// `Network` if the HTTP client cannot be built.
    pub fn new(
        kind: ApiKind,
        endpoint: impl Into<String>,
        credentials: &Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let token = kind.token(credentials)?.to_string();
        let http = Client::builder()
            .user_agent(concat!("sdss-install/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network {
                url: endpoint.clone(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            kind,
            endpoint,
            token,
            http,
        })
    }

    pub fn kind(&self) -> ApiKind {
        self.kind
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send a request and decode the JSON response.
    ///
    /// Non-success statuses are `Network` errors carrying the body.
    pub fn request(&self, method: Method, body: Option<&Value>) -> Result<Value> {
        let (status, text) = self.send(method, body)?;
        if !status.is_success() {
            return Err(Error::Network {
                url: self.endpoint.clone(),
                message: format!("HTTP {}: {}", status, text.trim()),
            });
        }
        serde_json::from_str(&text)
            .map_err(|e| Error::decode(format!("invalid JSON from {}: {}", self.endpoint, e)))
    }

    /// POST `{"query": query}` and return the response's `data` member.
    pub fn graphql(&self, query: &str) -> Result<Value> {
        let payload = json!({ "query": query });
        let (status, text) = self.send(Method::POST, Some(&payload))?;
        debug!("GraphQL response status {}", status);
        extract_data(&text)
    }

    fn send(&self, method: Method, body: Option<&Value>) -> Result<(StatusCode, String)> {
        let mut request = self
            .http
            .request(method, &self.endpoint)
            .bearer_auth(&self.token);
        if let Some(body) = body {
            request = request.json(body);
        }
        let network = |e: reqwest::Error| Error::Network {
            url: self.endpoint.clone(),
            message: e.to_string(),
        };
        let response = request.send().map_err(network)?;
        let status = response.status();
        let text = response.text().map_err(network)?;
        Ok((status, text))
    }
}

impl QueryTransport for ApiClient {
    fn query(&self, query: &str) -> Result<Value> {
        self.graphql(query)
    }
}

/// Pull the `data` member out of a raw GraphQL response body.
///
/// # Errors
///
/// `GraphqlQuery` with the raw body when `data` is absent, null, or the body
/// is not JSON at all. Any GraphQL `errors` messages are logged.
pub fn extract_data(body: &str) -> Result<Value> {
    let failure = || Error::GraphqlQuery {
        body: body.trim().to_string(),
    };
    let mut content: Value = serde_json::from_str(body).map_err(|_| failure())?;

    if let Some(errors) = content.get("errors").and_then(Value::as_array) {
        for message in errors.iter().filter_map(|e| e.get("message")).filter_map(Value::as_str) {
            error!("GraphQL error: {}", message);
        }
    }

    match content.get_mut("data").map(Value::take) {
        Some(data) if !data.is_null() => Ok(data),
        _ => Err(failure()),
    }
}
