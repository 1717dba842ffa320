//! Executing `HttpRequest`s over the network.
//!
//! # Design
//! `Transport` is the only place that performs I/O. `UreqTransport` is the
//! blocking implementation used by default; tests substitute their own
//! implementation to capture requests and return canned responses.
//!
//! A transport reports a response for every status code. Turning 4xx/5xx
//! into errors is the client's job, so ureq's status-as-error behavior is
//! disabled. What a transport does map is the failure to get a response at
//! all: timeouts, unreachable hosts and anything else ureq reports.

use std::io;
use std::time::Duration;

use ureq::{Agent, RequestBuilder};

use crate::error::{PromptPilotError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Sends one request and waits for the complete response.
pub trait Transport: Send + Sync {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// Blocking transport backed by a pooled `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
}

impl UreqTransport {
    /// `timeout` bounds the whole call, from connecting to reading the body.
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let result = match (method, body) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(&url), &headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(&url), &headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => with_headers(self.agent.post(&url), &headers).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(&url), &headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(&url), &headers).send_empty(),
        };
        let mut response = result.map_err(classify)?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(classify)?;

        Ok(HttpResponse { status, headers, body })
    }
}

fn with_headers<B>(
    mut builder: RequestBuilder<B>,
    headers: &[(String, String)],
) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

/// Map a ureq failure onto the timeout / connection / other split.
fn classify(err: ureq::Error) -> PromptPilotError {
    let mapped = match &err {
        ureq::Error::Timeout(_) => PromptPilotError::Timeout,
        ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => PromptPilotError::Connection,
        ureq::Error::Io(io_err) => {
            classify_io(io_err).unwrap_or_else(|| PromptPilotError::Request(err.to_string()))
        }
        _ => PromptPilotError::Request(err.to_string()),
    };
    tracing::warn!(target: "promptpilot::http", err = %err, "transport failure");
    mapped
}

fn classify_io(err: &io::Error) -> Option<PromptPilotError> {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Some(PromptPilotError::Timeout),
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => Some(PromptPilotError::Connection),
        _ => None,
    }
}
