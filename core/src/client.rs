//! Transport client for the Prompt Pilot API.
//!
//! # Design
//! `PromptPilot` owns the immutable `ClientConfig` and a `Transport`. A call
//! is split in three steps so each can be exercised on its own:
//! `build_request` resolves the URL and injects the auth, content-type and
//! user-agent headers; the transport performs the round-trip;
//! `parse_response` classifies the result by status code. Nothing is retried
//! and no state changes between calls.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{ClientConfig, USER_AGENT};
use crate::error::{PromptPilotError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::prompts::Prompts;
use crate::transport::{Transport, UreqTransport};

/// Blocking client for the Prompt Pilot API.
///
/// ```no_run
/// use promptpilot::{ExecutionRequest, PromptPilot};
///
/// let client = PromptPilot::new("pp_live_your_api_key");
/// let result = client
///     .prompts()
///     .execute(&ExecutionRequest::new("prompt-uuid").variable("topic", "AI"))?;
/// println!("{result}");
/// # Ok::<(), promptpilot::PromptPilotError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PromptPilot<T = UreqTransport> {
    config: ClientConfig,
    transport: T,
}

impl PromptPilot<UreqTransport> {
    /// Client for the production endpoint with the default timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_config(ClientConfig::new(api_key))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        let transport = UreqTransport::new(config.timeout());
        Self { config, transport }
    }
}

impl<T: Transport> PromptPilot<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Self {
        Self { config, transport }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Operations on prompts.
    pub fn prompts(&self) -> Prompts<'_, T> {
        Prompts::new(self)
    }

    /// Send `method path` with an optional JSON body and return the decoded
    /// payload. `path` is relative to the base URL and starts with `/`.
    pub fn request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value> {
        let request = self.build_request(method, path, body)?;
        tracing::debug!(
            target: "promptpilot::http",
            method = %request.method,
            url = %request.url,
            "sending request"
        );

        let response = self.transport.send(request)?;
        tracing::debug!(target: "promptpilot::http", status = response.status, "response received");

        parse_response(response)
    }

    pub fn build_request<B: Serialize + ?Sized>(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<&B>,
    ) -> Result<HttpRequest> {
        let body = body
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| PromptPilotError::Request(format!("could not encode request body: {e}")))?;

        Ok(HttpRequest {
            method,
            url: format!("{}{path}", self.config.base_url()),
            headers: vec![
                ("Authorization".to_string(), format!("Bearer {}", self.config.api_key())),
                ("Content-Type".to_string(), "application/json".to_string()),
                ("User-Agent".to_string(), USER_AGENT.to_string()),
            ],
            body,
        })
    }
}

/// Classify a completed response by status code.
///
/// 401 and 429 ignore the body. Any other status >= 400 uses the body's
/// `error` field as the message when there is one, else `HTTP {status}`.
/// Below 400 the body is the payload; an empty body yields an empty object.
pub fn parse_response(response: HttpResponse) -> Result<Value> {
    match response.status {
        401 => Err(PromptPilotError::Authentication("Invalid API key".to_string())),
        429 => Err(PromptPilotError::RateLimit("Rate limit exceeded".to_string())),
        status if status >= 400 => Err(PromptPilotError::Api {
            status,
            message: error_message(&response.body).unwrap_or_else(|| format!("HTTP {status}")),
        }),
        _ if response.body.trim().is_empty() => Ok(Value::Object(Map::new())),
        _ => serde_json::from_str(&response.body)
            .map_err(|e| PromptPilotError::Request(format!("invalid JSON response: {e}"))),
    }
}

fn error_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    match payload.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;

    /// Records every request and replays queued responses in order.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) requests: Mutex<Vec<HttpRequest>>,
        responses: Mutex<VecDeque<Result<HttpResponse>>>,
    }

    impl RecordingTransport {
        pub(crate) fn replying(responses: impl IntoIterator<Item = Result<HttpResponse>>) -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(responses.into_iter().collect()),
            }
        }

        pub(crate) fn last_request(&self) -> HttpRequest {
            self.requests.lock().unwrap().last().cloned().expect("no request sent")
        }

        pub(crate) fn last_body(&self) -> Value {
            let request = self.last_request();
            serde_json::from_str(request.body.as_deref().expect("request has no body")).unwrap()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(200, "")))
        }
    }

    pub(crate) fn client_replying(
        responses: impl IntoIterator<Item = Result<HttpResponse>>,
    ) -> PromptPilot<RecordingTransport> {
        let config = ClientConfig::new("pp_test_key").with_base_url("http://localhost:3000/");
        PromptPilot::with_transport(config, RecordingTransport::replying(responses))
    }

    fn parse(status: u16, body: &str) -> Result<Value> {
        parse_response(HttpResponse::new(status, body))
    }

    #[test]
    fn build_request_injects_headers() {
        let client = client_replying([]);
        let req = client.build_request::<Value>(HttpMethod::Get, "/api/prompts/p-1", None).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url, "http://localhost:3000/api/prompts/p-1");
        assert_eq!(req.header("Authorization"), Some("Bearer pp_test_key"));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(req.header("User-Agent"), Some(USER_AGENT));
        assert!(req.body.is_none());
    }

    #[test]
    fn build_request_serializes_body() {
        let client = client_replying([]);
        let req = client
            .build_request(HttpMethod::Post, "/api/prompts", Some(&json!({"name": "x"})))
            .unwrap();
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "x"}));
    }

    #[test]
    fn request_sends_through_transport() {
        let client = client_replying([Ok(HttpResponse::new(200, r#"{"ok":true}"#))]);
        let payload = client.request::<Value>(HttpMethod::Get, "/api/prompts/p-1", None).unwrap();
        assert_eq!(payload, json!({"ok": true}));
        assert_eq!(client.transport.requests.lock().unwrap().len(), 1);
    }

    #[test]
    fn transport_errors_pass_through() {
        let client = client_replying([Err(PromptPilotError::Timeout)]);
        let err = client.request::<Value>(HttpMethod::Get, "/api/prompts", None).unwrap_err();
        assert_eq!(err, PromptPilotError::Timeout);
    }

    #[test]
    fn unauthorized_ignores_body() {
        let err = parse(401, r#"{"error":"token expired"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Authentication);
        assert_eq!(err.to_string(), "Invalid API key");
    }

    #[test]
    fn too_many_requests_ignores_body() {
        let err = parse(429, "slow down").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        assert_eq!(err.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn error_field_becomes_message() {
        let err = parse(404, r#"{"error":"Prompt not found"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Generic);
        assert_eq!(err.to_string(), "Prompt not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn missing_error_field_falls_back_to_status() {
        assert_eq!(parse(500, "").unwrap_err().to_string(), "HTTP 500");
        assert_eq!(parse(502, "<html>bad gateway</html>").unwrap_err().to_string(), "HTTP 502");
        assert_eq!(parse(400, r#"{"message":"nope"}"#).unwrap_err().to_string(), "HTTP 400");
        assert_eq!(parse(422, r#"{"error":null}"#).unwrap_err().to_string(), "HTTP 422");
    }

    #[test]
    fn empty_success_body_is_empty_object() {
        assert_eq!(parse(200, "").unwrap(), json!({}));
        assert_eq!(parse(204, "").unwrap(), json!({}));
    }

    #[test]
    fn invalid_success_json_is_request_failure() {
        let err = parse(200, "not json").unwrap_err();
        assert!(matches!(err, PromptPilotError::Request(_)));
        assert!(err.to_string().starts_with("Request failed: invalid JSON response"));
    }
}
