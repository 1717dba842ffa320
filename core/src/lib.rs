//! Blocking client for the Prompt Pilot prompt-execution API.
//!
//! # Overview
//! `PromptPilot` authenticates and sends requests; `Prompts` (from
//! `PromptPilot::prompts`) turns typed arguments into request bodies and
//! payloads into results. Every call is one synchronous round-trip that ends
//! in either a payload or exactly one `PromptPilotError`.
//!
//! # Design
//! - `ClientConfig` is immutable and owned by the client.
//! - Requests and responses are plain data (`HttpRequest`, `HttpResponse`);
//!   the `Transport` trait is the only I/O boundary, with `UreqTransport` as
//!   the default.
//! - Status classification happens once, in `parse_response`, and resource
//!   methods never catch or rewrite errors.
//! - No retries or backoff. A `RateLimit` error is surfaced as-is.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod prompts;
pub mod transport;
pub mod types;

pub use client::{parse_response, PromptPilot};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT, USER_AGENT};
pub use error::{ErrorKind, PromptPilotError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use prompts::Prompts;
pub use transport::{Transport, UreqTransport};
pub use types::{CreatePrompt, ExecutionRequest, ExecutionResult, DEFAULT_MODEL};
