//! API Session
//!
//! [`Api`] owns the configuration and the transport and is handed by
//! reference to every operation that touches the network. Responses are
//! mapped to the error taxonomy here, so callers only ever see decoded
//! documents or typed errors.

use crate::config::ApiConfig;
use crate::error::{error_for_status, Error, Result};
use crate::http::{HttpTransport, Method, Request, Response, Transport};
use serde_json::Value;

/// A configured connection to one APIv2 host.
pub struct Api {
    config: ApiConfig,
    transport: Box<dyn Transport>,
}

impl Api {
    /// Build a session over the blocking HTTP transport.
    pub fn new(config: ApiConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config)?;
        Ok(Self {
            config,
            transport: Box::new(transport),
        })
    }

    /// Build a session configured from the environment.
    pub fn from_env() -> Result<Self> {
        Self::new(ApiConfig::from_env()?)
    }

    /// Build a session over a caller-supplied transport.
    pub fn with_transport(config: ApiConfig, transport: Box<dyn Transport>) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Absolute URL for a path below the configured base.
    pub(crate) fn endpoint(&self, path: &str) -> String {
        self.config.endpoint(path)
    }

    /// Resolve a pagination link against the API host. The server hands out
    /// both absolute URLs and host-relative paths.
    pub(crate) fn resolve_link(&self, link: &str) -> Result<String> {
        let host = self.config.api_host()?;
        let url = host.join(link).map_err(|err| {
            Error::Document(format!("cannot resolve pagination link {link:?}: {err}"))
        })?;
        Ok(url.into())
    }

    pub fn get(&self, url: &str, query: Vec<(String, String)>) -> Result<Option<Value>> {
        self.dispatch(Request::new(Method::Get, url).with_query(query))
    }

    pub fn post(&self, url: &str, body: Value) -> Result<Option<Value>> {
        self.dispatch(Request::new(Method::Post, url).with_body(body))
    }

    pub fn patch(&self, url: &str, body: Value) -> Result<Option<Value>> {
        self.dispatch(Request::new(Method::Patch, url).with_body(body))
    }

    pub fn delete(&self, url: &str, body: Value) -> Result<Option<Value>> {
        self.dispatch(Request::new(Method::Delete, url).with_body(body))
    }

    fn dispatch(&self, request: Request) -> Result<Option<Value>> {
        let response = self.transport.send(&request)?;
        interpret(response)
    }
}

fn interpret(response: Response) -> Result<Option<Value>> {
    if response.is_success() {
        Ok(response.document)
    } else {
        Err(error_for_status(
            response.status,
            response.document.as_ref(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::FakeTransport;
    use serde_json::json;

    fn test_api(fake: &FakeTransport) -> Api {
        let config = ApiConfig::new("test-token").with_base_url("https://example.com/api/v2");
        Api::with_transport(config, Box::new(fake.clone()))
    }

    #[test]
    fn success_passes_the_document_through() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond(200, json!({"data": []}));
        let document = api.get("https://example.com/api/v2/components", Vec::new());
        assert_eq!(document.unwrap(), Some(json!({"data": []})));
    }

    #[test]
    fn bodyless_success_yields_none() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        fake.respond_empty(204);
        let document = api.delete(
            "https://example.com/api/v2/components/1",
            json!({"meta": {}}),
        );
        assert_eq!(document.unwrap(), None);
    }

    #[test]
    fn client_error_statuses_map_to_the_taxonomy() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        let url = "https://example.com/api/v2/components/1";

        fake.respond_empty(404);
        assert!(matches!(
            api.get(url, Vec::new()),
            Err(Error::NotFound { .. })
        ));

        fake.respond_empty(409);
        assert!(matches!(
            api.patch(url, json!({})),
            Err(Error::Conflict { .. })
        ));

        fake.respond(
            422,
            json!({"errors": [{"status": "422", "title": "Name can't be blank"}]}),
        );
        let err = api.post(url, json!({})).unwrap_err();
        match err {
            Error::Validation { status, errors } => {
                assert_eq!(status, 422);
                assert_eq!(errors[0].title.as_deref(), Some("Name can't be blank"));
            }
            other => panic!("expected a validation error, got {other:?}"),
        }

        fake.respond_empty(503);
        assert!(matches!(
            api.get(url, Vec::new()),
            Err(Error::Transport {
                status: Some(503),
                ..
            })
        ));
    }

    #[test]
    fn links_resolve_against_the_api_host() {
        let fake = FakeTransport::new();
        let api = test_api(&fake);
        assert_eq!(
            api.resolve_link("/api/v2/components?page[after]=9").unwrap(),
            "https://example.com/api/v2/components?page[after]=9"
        );
        assert_eq!(
            api.resolve_link("https://elsewhere.example/api/v2/components")
                .unwrap(),
            "https://elsewhere.example/api/v2/components"
        );
    }
}
