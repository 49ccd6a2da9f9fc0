//! HTTP transport for the Vilocify JSON:API
//!
//! The [`Transport`] trait is the seam between the mapper and the network:
//! it takes a prepared request and answers with a status code plus the raw
//! response document. The production implementation wraps a blocking
//! `reqwest` client carrying the JSON:API headers and the bearer token.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;

/// The JSON:API media type, required in requests and validated in responses.
pub const MEDIA_TYPE: &str = "application/vnd.api+json";

const USER_AGENT_VALUE: &str = concat!("vilocify-sdk-rust/", env!("CARGO_PKG_VERSION"));

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and masks potentially sensitive patterns
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let cut = (0..=MAX_LOG_BODY_LENGTH)
            .rev()
            .find(|&i| body.is_char_boundary(i))
            .unwrap_or(0);
        format!(
            "{}... [truncated, {} bytes total]",
            &body[..cut],
            body.len()
        )
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// HTTP verbs used by the JSON:API protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prepared API request.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    /// Absolute URL, already joined with the configured base.
    pub url: String,
    /// Query parameters, appended URL-encoded.
    pub query: Vec<(String, String)>,
    /// JSON:API document to send, if the verb carries one.
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Status code and parsed body of an API response.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    /// The response document, `None` for bodyless responses such as 204.
    pub document: Option<Value>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Boundary between the object mapper and the network.
///
/// The mapper only ever builds [`Request`] values and interprets
/// [`Response`] values; everything TLS, pooling or proxy related lives
/// behind this trait.
pub trait Transport {
    fn send(&self, request: &Request) -> Result<Response>;
}

/// Production transport on a blocking `reqwest` client.
///
/// Token, media-type headers, user agent and timeout are baked into the
/// client at construction, so every request goes out identically.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|_| Error::Config("token contains characters invalid in a header".into()))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_TYPE));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Transport {
                status: None,
                message: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: &Request) -> Result<Response> {
        tracing::debug!(
            "{} {} params={:?}",
            request.method,
            request.url,
            request.query
        );

        let mut builder = self
            .client
            .request(request.method.into(), &request.url)
            .query(&request.query);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().map_err(|e| Error::Transport {
            status: None,
            message: format!("failed to send request: {e}"),
        })?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let server_timing = response
            .headers()
            .get("Server-Timing")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());

        let body = response.text().map_err(|e| Error::Transport {
            status: Some(status),
            message: format!("failed to read response body: {e}"),
        })?;

        tracing::debug!("status={} response={}", status, sanitize_for_log(&body));
        tracing::debug!("server-timing: {}", server_timing.as_deref().unwrap_or("n/a"));

        // The backend always answers with the JSON:API media type; anything
        // else on a success response is a proxy or a wrong endpoint.
        if (200..300).contains(&status) {
            if let Some(content_type) = &content_type {
                if !is_jsonapi_media_type(content_type) {
                    return Err(Error::Transport {
                        status: Some(status),
                        message: "Unsupported content type in server response.".to_string(),
                    });
                }
            }
        }

        let document = if body.is_empty() {
            None
        } else {
            Some(serde_json::from_str(&body).map_err(|e| Error::Transport {
                status: Some(status),
                message: format!("invalid JSON in response body: {e}"),
            })?)
        };

        Ok(Response { status, document })
    }
}

/// Accepts media-type parameters, e.g. `application/vnd.api+json; charset=utf-8`.
fn is_jsonapi_media_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|essence| essence.eq_ignore_ascii_case(MEDIA_TYPE))
}

#[cfg(test)]
pub(crate) use fake::FakeTransport;

#[cfg(test)]
mod fake {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct FakeInner {
        responses: RefCell<VecDeque<Result<Response>>>,
        requests: RefCell<Vec<Request>>,
    }

    /// Scripted transport for unit tests. Clones share the same script and
    /// request log, so a test can keep one handle and give the other to the
    /// client under test.
    #[derive(Clone, Default)]
    pub(crate) struct FakeTransport {
        inner: Rc<FakeInner>,
    }

    impl FakeTransport {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        /// Queue a response with the given status and document.
        pub(crate) fn respond(&self, status: u16, document: Value) {
            self.inner.responses.borrow_mut().push_back(Ok(Response {
                status,
                document: Some(document),
            }));
        }

        /// Queue a bodyless response, e.g. a 204.
        pub(crate) fn respond_empty(&self, status: u16) {
            self.inner.responses.borrow_mut().push_back(Ok(Response {
                status,
                document: None,
            }));
        }

        /// Queue a transport-level failure.
        pub(crate) fn fail(&self, error: Error) {
            self.inner.responses.borrow_mut().push_back(Err(error));
        }

        /// All requests seen so far, in order.
        pub(crate) fn requests(&self) -> Vec<Request> {
            self.inner.requests.borrow().clone()
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: &Request) -> Result<Response> {
            self.inner.requests.borrow_mut().push(request.clone());
            self.inner
                .responses
                .borrow_mut()
                .pop_front()
                .expect("FakeTransport ran out of scripted responses")
        }
    }
}
