//! Prompt operations: execute, list, get, create, update, delete.
//!
//! Each method builds the body for one endpoint, hands it to
//! `PromptPilot::request` and picks the interesting part out of the payload.
//! Errors from the client are returned unchanged.

use serde_json::{Map, Value};

use crate::client::PromptPilot;
use crate::error::Result;
use crate::http::HttpMethod;
use crate::transport::Transport;
use crate::types::{CreatePrompt, ExecutionRequest, ExecutionResult};

const PROMPTS_PATH: &str = "/api/prompts";
const EXECUTE_PATH: &str = "/api/prompts/execute";

/// Borrowed view of a client exposing the prompts endpoints.
#[derive(Debug)]
pub struct Prompts<'a, T> {
    client: &'a PromptPilot<T>,
}

impl<'a, T: Transport> Prompts<'a, T> {
    pub(crate) fn new(client: &'a PromptPilot<T>) -> Self {
        Self { client }
    }

    /// Run a prompt with the given variables and overrides.
    pub fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult> {
        let payload = self
            .client
            .request(HttpMethod::Post, EXECUTE_PATH, Some(request))?;
        Ok(ExecutionResult::from_payload(payload))
    }

    /// All prompts of an organization. A payload without `prompts` yields
    /// an empty list. The id is percent-encoded into the query string.
    pub fn list(&self, organization_id: &str) -> Result<Vec<Value>> {
        let path = format!(
            "{PROMPTS_PATH}?organizationId={}",
            urlencoding::encode(organization_id)
        );
        let payload = self.client.request::<Value>(HttpMethod::Get, &path, None)?;
        Ok(match take_field(payload, "prompts") {
            Some(Value::Array(prompts)) => prompts,
            _ => Vec::new(),
        })
    }

    pub fn get(&self, prompt_id: &str) -> Result<Map<String, Value>> {
        let payload = self
            .client
            .request::<Value>(HttpMethod::Get, &prompt_path(prompt_id), None)?;
        Ok(prompt_object(payload))
    }

    pub fn create(&self, prompt: &CreatePrompt) -> Result<Map<String, Value>> {
        let payload = self
            .client
            .request(HttpMethod::Post, PROMPTS_PATH, Some(&prompt.to_body()))?;
        Ok(prompt_object(payload))
    }

    /// Replace the given fields of a prompt.
    pub fn update(
        &self,
        prompt_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<Map<String, Value>> {
        let payload = self
            .client
            .request(HttpMethod::Put, &prompt_path(prompt_id), Some(fields))?;
        Ok(prompt_object(payload))
    }

    pub fn delete(&self, prompt_id: &str) -> Result<()> {
        self.client
            .request::<Value>(HttpMethod::Delete, &prompt_path(prompt_id), None)?;
        Ok(())
    }
}

/// Path of one prompt; the id is percent-encoded as a single segment.
fn prompt_path(prompt_id: &str) -> String {
    format!("{PROMPTS_PATH}/{}", urlencoding::encode(prompt_id))
}

fn take_field(payload: Value, name: &str) -> Option<Value> {
    match payload {
        Value::Object(mut fields) => fields.remove(name),
        _ => None,
    }
}

/// The `prompt` object of a payload, or an empty object.
fn prompt_object(payload: Value) -> Map<String, Value> {
    match take_field(payload, "prompt") {
        Some(Value::Object(prompt)) => prompt,
        _ => Map::new(),
    }
}
