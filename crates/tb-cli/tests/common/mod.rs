use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Form, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Json;
use serde_json::{json, Value};

use tb_cli::credentials::StaticCredential;
use tb_cli::outbound::gemini::GeminiClient;
use tb_core::core::{ApiKey, Credential};

pub const TEST_API_KEY: &str = "AIzaSy-test-key-0000000";
pub const TEST_BEARER: &str = "ya29.mock-access-token";
pub const TUNABLE_MODEL: &str = "models/gemini-1.0-pro-001";

// ---------------------------------------------------------------------------
// MockGeminiServer: scripted stand-in for the Generative Language API
// ---------------------------------------------------------------------------

#[derive(Default)]
struct MockState {
    /// States returned by successive tuned model fetches; the last one repeats.
    states: Mutex<VecDeque<&'static str>>,
    created: Mutex<Option<(String, Value)>>,
    status_calls: AtomicUsize,
    list_calls: AtomicUsize,
    tuned_list_calls: AtomicUsize,
    refresh_calls: AtomicUsize,
}

pub struct MockGeminiServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    _handle: tokio::task::JoinHandle<()>,
}

impl MockGeminiServer {
    pub async fn start(states: &[&'static str]) -> Self {
        let state = Arc::new(MockState {
            states: Mutex::new(states.iter().copied().collect()),
            ..MockState::default()
        });

        let app = axum::Router::new()
            .route("/v1beta/models", get(list_models_handler))
            .route(
                "/v1beta/tunedModels",
                get(list_tuned_models_handler).post(create_tuned_model_handler),
            )
            .route(
                "/v1beta/tunedModels/{name}",
                get(get_tuned_model_handler).post(generate_content_handler),
            )
            .route("/token", post(token_handler))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        Self {
            addr,
            state,
            _handle: handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn api_base(&self) -> String {
        format!("{}/v1beta", self.url())
    }

    pub fn client(&self) -> GeminiClient {
        self.client_with_key(TEST_API_KEY)
    }

    pub fn client_with_key(&self, key: &str) -> GeminiClient {
        let credentials = Arc::new(StaticCredential::new(Credential::ApiKey(ApiKey::new(key))));
        GeminiClient::new(self.api_base(), Duration::from_secs(5), credentials)
            .expect("build client")
    }

    /// Tuned model id and request body of the last create call.
    pub fn created(&self) -> Option<(String, Value)> {
        self.state.created.lock().unwrap().clone()
    }

    pub fn status_calls(&self) -> usize {
        self.state.status_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn tuned_list_calls(&self) -> usize {
        self.state.tuned_list_calls.load(Ordering::SeqCst)
    }

    pub fn refresh_calls(&self) -> usize {
        self.state.refresh_calls.load(Ordering::SeqCst)
    }
}

impl Drop for MockGeminiServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}

fn authorized(headers: &HeaderMap) -> bool {
    let api_key = headers.get("x-goog-api-key").and_then(|v| v.to_str().ok());
    let bearer = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    api_key == Some(TEST_API_KEY) || bearer == Some(TEST_BEARER)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": status.as_u16(), "message": message}})),
    )
        .into_response()
}

async fn list_models_handler(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return error_response(StatusCode::FORBIDDEN, "API key not valid");
    }
    state.list_calls.fetch_add(1, Ordering::SeqCst);

    match query.get("pageToken").map(String::as_str) {
        None => Json(json!({
            "models": [{
                "name": "models/gemini-1.5-pro",
                "displayName": "Gemini 1.5 Pro",
                "supportedGenerationMethods": ["generateContent", "countTokens"]
            }],
            "nextPageToken": "page-2"
        }))
        .into_response(),
        Some("page-2") => Json(json!({
            "models": [{
                "name": TUNABLE_MODEL,
                "displayName": "Gemini 1.0 Pro 001 (Tuning)",
                "supportedGenerationMethods": ["generateContent", "createTunedModel"]
            }]
        }))
        .into_response(),
        Some(_) => error_response(StatusCode::BAD_REQUEST, "bad page token"),
    }
}

async fn list_tuned_models_handler(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return error_response(StatusCode::FORBIDDEN, "API key not valid");
    }
    state.tuned_list_calls.fetch_add(1, Ordering::SeqCst);

    match query.get("pageToken").map(String::as_str) {
        None => Json(json!({
            "tunedModels": [{
                "name": "tunedModels/number-generator",
                "displayName": "number generator",
                "baseModel": TUNABLE_MODEL,
                "state": "ACTIVE"
            }],
            "nextPageToken": "tuned-page-2"
        }))
        .into_response(),
        Some("tuned-page-2") => Json(json!({
            "tunedModels": [{
                "name": "tunedModels/support-bot-v1",
                "baseModel": TUNABLE_MODEL,
                "state": "CREATING"
            }]
        }))
        .into_response(),
        Some(_) => error_response(StatusCode::BAD_REQUEST, "bad page token"),
    }
}

async fn create_tuned_model_handler(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error_response(StatusCode::FORBIDDEN, "API key not valid");
    }
    let Some(id) = query.get("tunedModelId").cloned() else {
        return error_response(StatusCode::BAD_REQUEST, "tunedModelId required");
    };
    *state.created.lock().unwrap() = Some((id.clone(), body));

    Json(json!({
        "name": format!("tunedModels/{id}/operations/op-1"),
        "metadata": {
            "@type": "type.googleapis.com/google.ai.generativelanguage.v1beta.CreateTunedModelMetadata",
            "tunedModel": format!("tunedModels/{id}"),
            "totalSteps": 3
        }
    }))
    .into_response()
}

async fn get_tuned_model_handler(
    State(state): State<Arc<MockState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if !authorized(&headers) {
        return error_response(StatusCode::FORBIDDEN, "API key not valid");
    }
    if name == "missing" {
        return error_response(StatusCode::NOT_FOUND, "tuned model not found");
    }
    state.status_calls.fetch_add(1, Ordering::SeqCst);

    let current = {
        let mut states = state.states.lock().unwrap();
        if states.len() > 1 {
            states.pop_front().unwrap_or("CREATING")
        } else {
            states.front().copied().unwrap_or("CREATING")
        }
    };

    Json(json!({
        "name": format!("tunedModels/{name}"),
        "displayName": name,
        "baseModel": TUNABLE_MODEL,
        "state": current
    }))
    .into_response()
}

/// Echoes the prompt back as the model's answer.
async fn generate_content_handler(
    Path(name): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return error_response(StatusCode::FORBIDDEN, "API key not valid");
    }
    if !name.ends_with(":generateContent") {
        return error_response(StatusCode::NOT_FOUND, "unknown method");
    }
    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default()
        .to_owned();

    Json(json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": prompt}]},
            "finishReason": "STOP"
        }]
    }))
    .into_response()
}

async fn token_handler(
    State(state): State<Arc<MockState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if form.get("grant_type").map(String::as_str) != Some("refresh_token")
        || form.get("refresh_token").map(String::as_str) != Some("1//mock-refresh")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant"})),
        )
            .into_response();
    }
    Json(json!({
        "access_token": TEST_BEARER,
        "expires_in": 3599,
        "token_type": "Bearer"
    }))
    .into_response()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const TRAIN_RECORD: &str = r#"{"messages":[{"role":"system","content":"You are helpful."},{"role":"user","content":"Hi"},{"role":"assistant","content":"Hello!"}]}"#;

pub const TEST_RECORD: &str = r#"{"messages":[{"role":"user","content":"echo me"},{"role":"assistant","content":"echo me"}]}"#;

pub fn write_jsonl(dir: &std::path::Path, name: &str, lines: &[&str]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, lines.join("\n")).expect("write fixture");
    path
}
