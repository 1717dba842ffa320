use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Instant,
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const DEFAULT_MODEL: &str = "gpt-4";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub content: String,
    pub description: Option<String>,
    pub model: String,
    pub status: String,
    /// Fields the server does not interpret, kept as sent.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct CreatePrompt {
    pub organization_id: String,
    pub name: String,
    pub content: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

#[derive(Deserialize)]
pub struct ExecutePrompt {
    pub prompt_id: String,
    #[serde(default)]
    pub variables: Map<String, Value>,
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<usize>,
}

#[derive(Deserialize)]
pub struct ListParams {
    #[serde(rename = "organizationId")]
    pub organization_id: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, Prompt>>>;

/// Shared server state: the prompt store, the accepted API key and an
/// optional cap on executions. Only requests that pass lookup and validation
/// count against the cap; once it is used up `execute` answers 429.
#[derive(Clone)]
pub struct AppState {
    db: Db,
    api_key: Arc<str>,
    execute_limit: Option<usize>,
    executions: Arc<AtomicUsize>,
}

impl AppState {
    pub fn new(api_key: &str) -> Self {
        Self {
            db: Arc::new(RwLock::new(HashMap::new())),
            api_key: Arc::from(api_key),
            execute_limit: None,
            executions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_execute_limit(mut self, limit: usize) -> Self {
        self.execute_limit = Some(limit);
        self
    }
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

pub fn app(api_key: &str) -> Router {
    app_with_state(AppState::new(api_key))
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/api/prompts/execute", post(execute_prompt))
        .route("/api/prompts", get(list_prompts).post(create_prompt))
        .route("/api/prompts/{id}", get(get_prompt).put(update_prompt).delete(delete_prompt))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_api_key))
        .with_state(state)
}

pub async fn run(listener: TcpListener, app: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}

async fn require_api_key(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let expected = format!("Bearer {}", state.api_key);
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());
    if presented != Some(expected.as_str()) {
        tracing::debug!(path = %request.uri().path(), "rejecting request with bad credentials");
        return api_error(StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
    }
    next.run(request).await
}

async fn list_prompts(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Value>, ApiError> {
    let organization_id = params
        .organization_id
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "organizationId is required"))?;
    let prompts = state.db.read().await;
    let mut matching: Vec<&Prompt> = prompts
        .values()
        .filter(|prompt| prompt.organization_id == organization_id)
        .collect();
    matching.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(Json(json!({ "prompts": matching })))
}

async fn create_prompt(
    State(state): State<AppState>,
    Json(input): Json<CreatePrompt>,
) -> (StatusCode, Json<Value>) {
    let prompt = Prompt {
        id: Uuid::new_v4().to_string(),
        organization_id: input.organization_id,
        name: input.name,
        content: input.content,
        description: input.description,
        model: input.model,
        status: "draft".to_string(),
        extra: input.extra,
    };
    tracing::info!(id = %prompt.id, name = %prompt.name, "created prompt");
    state.db.write().await.insert(prompt.id.clone(), prompt.clone());
    (StatusCode::CREATED, Json(json!({ "prompt": prompt })))
}

async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let prompts = state.db.read().await;
    let prompt = prompts.get(&id).ok_or_else(not_found)?;
    Ok(Json(json!({ "prompt": prompt })))
}

async fn update_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> Result<Json<Value>, ApiError> {
    let mut prompts = state.db.write().await;
    let prompt = prompts.get_mut(&id).ok_or_else(not_found)?;

    let mut merged = match serde_json::to_value(&*prompt) {
        Ok(Value::Object(current)) => current,
        _ => return Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, "Could not encode prompt")),
    };
    for (key, value) in fields {
        if key != "id" && key != "organization_id" {
            merged.insert(key, value);
        }
    }
    *prompt = serde_json::from_value(Value::Object(merged))
        .map_err(|e| api_error(StatusCode::BAD_REQUEST, &format!("Invalid prompt fields: {e}")))?;
    Ok(Json(json!({ "prompt": prompt })))
}

async fn delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let mut prompts = state.db.write().await;
    prompts.remove(&id).ok_or_else(not_found)?;
    tracing::info!(%id, "deleted prompt");
    Ok(StatusCode::NO_CONTENT)
}

async fn execute_prompt(
    State(state): State<AppState>,
    Json(input): Json<ExecutePrompt>,
) -> Result<Json<Value>, ApiError> {
    let started = Instant::now();
    let prompts = state.db.read().await;
    let prompt = prompts.get(&input.prompt_id).ok_or_else(not_found)?;
    if input.temperature.is_some_and(|t| !(0.0..=2.0).contains(&t)) {
        return Err(api_error(
            StatusCode::BAD_REQUEST,
            "temperature must be between 0 and 2",
        ));
    }
    if let Some(limit) = state.execute_limit {
        if state.executions.fetch_add(1, Ordering::SeqCst) >= limit {
            return Err(api_error(StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded"));
        }
    }

    let rendered = render(&prompt.content, &input.variables);
    let mut words: Vec<&str> = rendered.split_whitespace().collect();
    if let Some(max_tokens) = input.max_tokens {
        words.truncate(max_tokens);
    }
    let model = input.model.filter(|m| !m.is_empty()).unwrap_or_else(|| prompt.model.clone());
    let tokens_used = words.len();

    Ok(Json(json!({
        "content": words.join(" "),
        "tokens_used": tokens_used,
        "cost_cents": tokens_used.div_ceil(10),
        "latency_ms": started.elapsed().as_millis() as u64,
        "provider": provider_for(&model),
        "model": model,
    })))
}

fn not_found() -> ApiError {
    api_error(StatusCode::NOT_FOUND, "Prompt not found")
}

/// Replace every `{{name}}` placeholder with the matching variable.
/// Placeholders without a variable are left in place.
pub fn render(template: &str, variables: &Map<String, Value>) -> String {
    let mut rendered = template.to_string();
    for (name, value) in variables {
        let text = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        rendered = rendered.replace(&format!("{{{{{name}}}}}"), &text);
    }
    rendered
}

pub fn provider_for(model: &str) -> &'static str {
    if model.starts_with("gpt") || model.starts_with("o1") {
        "openai"
    } else if model.starts_with("claude") {
        "anthropic"
    } else {
        "unknown"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_serializes_extra_fields_inline() {
        let mut extra = Map::new();
        extra.insert("tags".to_string(), json!(["a"]));
        let prompt = Prompt {
            id: "p-1".to_string(),
            organization_id: "org".to_string(),
            name: "Test".to_string(),
            content: "Hi".to_string(),
            description: None,
            model: DEFAULT_MODEL.to_string(),
            status: "draft".to_string(),
            extra,
        };
        let json = serde_json::to_value(&prompt).unwrap();
        assert_eq!(json["tags"], json!(["a"]));
        assert_eq!(json["description"], Value::Null);
        assert!(json.get("extra").is_none());
    }

    #[test]
    fn create_prompt_defaults_model() {
        let input: CreatePrompt =
            serde_json::from_str(r#"{"organization_id":"org","name":"n","content":"c"}"#).unwrap();
        assert_eq!(input.model, "gpt-4");
        assert!(input.description.is_none());
        assert!(input.extra.is_empty());
    }

    #[test]
    fn create_prompt_keeps_unknown_fields() {
        let input: CreatePrompt = serde_json::from_str(
            r#"{"organization_id":"org","name":"n","content":"c","category":"support"}"#,
        )
        .unwrap();
        assert_eq!(input.extra["category"], "support");
    }

    #[test]
    fn create_prompt_rejects_missing_name() {
        let result: Result<CreatePrompt, _> =
            serde_json::from_str(r#"{"organization_id":"org","content":"c"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn execute_prompt_variables_default_to_empty() {
        let input: ExecutePrompt = serde_json::from_str(r#"{"prompt_id":"p"}"#).unwrap();
        assert!(input.variables.is_empty());
        assert!(input.temperature.is_none());
    }

    #[test]
    fn render_substitutes_placeholders() {
        let mut variables = Map::new();
        variables.insert("topic".to_string(), json!("AI"));
        variables.insert("count".to_string(), json!(3));
        assert_eq!(
            render("Write {{count}} facts about {{topic}} for {{audience}}", &variables),
            "Write 3 facts about AI for {{audience}}"
        );
    }

    #[test]
    fn provider_follows_model_family() {
        assert_eq!(provider_for("gpt-4"), "openai");
        assert_eq!(provider_for("claude-3-opus"), "anthropic");
        assert_eq!(provider_for("mistral"), "unknown");
    }
}
