//! Error types for the Vilocify SDK
//!
//! Remote failures carry the JSON:API error objects returned by the server;
//! local precondition failures are raised before any request is sent.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One member of a JSON:API `errors` array.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub source: Option<ErrorSource>,
}

/// Location of the input that caused an error (attribute pointer or query parameter).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ErrorSource {
    #[serde(default)]
    pub pointer: Option<String>,
    #[serde(default)]
    pub parameter: Option<String>,
}

impl ErrorObject {
    /// Render this error object as a single human-readable line.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
        }
        if let Some(detail) = &self.detail {
            if !out.is_empty() {
                out.push_str(": ");
            }
            out.push_str(detail);
        }
        if let Some(pointer) = self.source.as_ref().and_then(|s| s.pointer.as_deref()) {
            if out.is_empty() {
                out.push_str(pointer);
            } else {
                out.push_str(&format!(" ({pointer})"));
            }
        }
        if out.is_empty() {
            out.push_str("no details provided");
        }
        out
    }
}

fn summarize(errors: &[ErrorObject]) -> String {
    if errors.is_empty() {
        return "no details provided".to_string();
    }
    errors
        .iter()
        .map(ErrorObject::summary)
        .collect::<Vec<_>>()
        .join("; ")
}

/// All failure modes of the SDK.
#[derive(Debug, Error)]
pub enum Error {
    /// The server rejected the request payload or parameters (4xx other than 404/409).
    #[error("request rejected by the server (HTTP {status}): {}", summarize(errors))]
    Validation { status: u16, errors: Vec<ErrorObject> },

    /// The target resource does not exist (HTTP 404, or a fetch answered with null data).
    #[error("resource not found: {}", summarize(errors))]
    NotFound { errors: Vec<ErrorObject> },

    /// The server detected a conflicting concurrent change (HTTP 409).
    #[error("conflicting change rejected by the server: {}", summarize(errors))]
    Conflict { errors: Vec<ErrorObject> },

    /// Network failure, timeout, 5xx, or a non-JSON:API response.
    #[error("transport error: {message}")]
    Transport { status: Option<u16>, message: String },

    /// A response body that cannot be interpreted as a JSON:API document.
    #[error("malformed response document: {0}")]
    Document(String),

    /// A second sort key was requested; the API supports only one.
    #[error("sort key already set to \"{existing}\", the API supports a single sort attribute")]
    MultipleSortKeys { existing: String },

    /// A relationship with unsynced local changes would have been refetched.
    #[error("relationship \"{relationship}\" has pending changes, call update() first or force_resolve()")]
    PendingChanges { relationship: String },

    /// create() was called on an instance that already has an id.
    #[error("instance is already persisted with id {id}")]
    PersistedAlready { id: String },

    /// The instance was deleted and can no longer be synced.
    #[error("instance was deleted and can no longer be synced")]
    StaleInstance,

    /// The operation needs a persisted instance but the id is not set yet.
    #[error("instance has no id, create() it first")]
    Unpersisted,

    /// Page sizes below 1 are rejected before any request is sent.
    #[error("page size must be at least 1, got {size}")]
    InvalidPageSize { size: usize },

    /// Invalid configuration detected at client construction.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// The JSON:API error objects attached to a remote failure, if any.
    pub fn error_objects(&self) -> &[ErrorObject] {
        match self {
            Error::Validation { errors, .. }
            | Error::NotFound { errors }
            | Error::Conflict { errors } => errors,
            _ => &[],
        }
    }
}

/// Pull the `errors` array out of a response document.
pub(crate) fn parse_error_objects(document: Option<&Value>) -> Vec<ErrorObject> {
    let Some(errors) = document.and_then(|d| d.get("errors")).and_then(Value::as_array) else {
        return Vec::new();
    };
    errors
        .iter()
        .map(|e| serde_json::from_value(e.clone()).unwrap_or_default())
        .collect()
}

/// Map a non-success HTTP status and its document to the error taxonomy.
pub(crate) fn error_for_status(status: u16, document: Option<&Value>) -> Error {
    let errors = parse_error_objects(document);
    match status {
        404 => Error::NotFound { errors },
        409 => Error::Conflict { errors },
        400..=499 => Error::Validation { status, errors },
        _ => Error::Transport {
            status: Some(status),
            message: if errors.is_empty() {
                format!("server answered HTTP {status}")
            } else {
                format!("server answered HTTP {status}: {}", summarize(&errors))
            },
        },
    }
}
