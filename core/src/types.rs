//! Request payloads and results for the prompts API.
//!
//! # Design
//! Optional overrides are `Option`s and are left out of the JSON only when
//! `None`, so an explicit `temperature(0.0)` or `max_tokens(0)` still reaches
//! the server. Results keep the raw payload next to the typed fields because
//! the server may add fields this crate does not know about yet.

use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

/// Model sent by `CreatePrompt` unless the caller picks another one.
pub const DEFAULT_MODEL: &str = "gpt-4";

/// Body of `POST /api/prompts/execute`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionRequest {
    pub prompt_id: String,
    pub variables: Map<String, Value>,
    #[serde(skip_serializing_if = "is_unset_model")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn is_unset_model(model: &Option<String>) -> bool {
    model.as_deref().map_or(true, str::is_empty)
}

impl ExecutionRequest {
    pub fn new(prompt_id: impl Into<String>) -> Self {
        Self {
            prompt_id: prompt_id.into(),
            variables: Map::new(),
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set one substitution variable.
    pub fn variable(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Replace all substitution variables.
    pub fn variables(mut self, variables: Map<String, Value>) -> Self {
        self.variables = variables;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Outcome of a prompt execution. Missing fields fall back to zero values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub content: String,
    pub tokens_used: u64,
    pub cost_cents: f64,
    pub latency_ms: u64,
    pub model: String,
    pub provider: String,
    pub raw: Value,
}

impl ExecutionResult {
    /// Build a result from a response payload, keeping the payload as `raw`.
    ///
    /// Fields of the wrong type are treated like missing fields. Counts sent
    /// as floats are truncated; `cost_cents` keeps its fraction.
    pub fn from_payload(payload: Value) -> Self {
        let field = |name: &str| payload.get(name);
        let text = |name: &str| {
            field(name)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let count = |name: &str| field(name).map(count_of).unwrap_or_default();

        let (content, model, provider) = (text("content"), text("model"), text("provider"));
        let (tokens_used, latency_ms) = (count("tokens_used"), count("latency_ms"));
        let cost_cents = field("cost_cents")
            .and_then(Value::as_f64)
            .unwrap_or_default();

        Self {
            content,
            tokens_used,
            cost_cents,
            latency_ms,
            model,
            provider,
            raw: payload,
        }
    }

    pub fn cost_dollars(&self) -> f64 {
        self.cost_cents / 100.0
    }
}

fn count_of(value: &Value) -> u64 {
    match value.as_u64() {
        Some(n) => n,
        None => value
            .as_f64()
            .filter(|n| n.is_finite() && *n >= 0.0)
            .map_or(0, |n| n as u64),
    }
}

impl fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

/// Input for `POST /api/prompts`.
///
/// `extra` is copied into the body as-is. A key in `extra` that collides with
/// a named field is ignored; the named field wins.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatePrompt {
    pub organization_id: String,
    pub name: String,
    pub content: String,
    pub description: Option<String>,
    pub model: String,
    pub extra: Map<String, Value>,
}

impl CreatePrompt {
    pub fn new(
        organization_id: impl Into<String>,
        name: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            organization_id: organization_id.into(),
            name: name.into(),
            content: content.into(),
            description: None,
            model: DEFAULT_MODEL.to_string(),
            extra: Map::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Add a field that is passed through to the request body unchanged.
    pub fn extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// JSON body for the create request. `description` is sent as `null`
    /// when unset.
    pub fn to_body(&self) -> Value {
        let mut body = self.extra.clone();
        body.insert("organization_id".to_string(), Value::from(self.organization_id.as_str()));
        body.insert("name".to_string(), Value::from(self.name.as_str()));
        body.insert("content".to_string(), Value::from(self.content.as_str()));
        body.insert(
            "description".to_string(),
            self.description.as_deref().map_or(Value::Null, Value::from),
        );
        body.insert("model".to_string(), Value::from(self.model.as_str()));
        Value::Object(body)
    }
}
