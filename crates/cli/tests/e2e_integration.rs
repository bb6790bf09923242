//! End-to-end tests for the ToneShift binary's stack.
//!
//! These run the real gateway on a loopback port, backed by a SQLite file
//! and the Ollama client pointed at a stub `/api/generate` server, and
//! drive it over HTTP the way the mobile client does.

use std::sync::{Arc, Mutex};

use axum::{Json, Router, http::StatusCode, routing::post};
use serde_json::{Value, json};
use toneshift_config::AppConfig;

// ── Stub model server ────────────────────────────────────────────────────

/// Prompts received by the stub, in arrival order.
type Prompts = Arc<Mutex<Vec<String>>>;

/// Serve `router` on a loopback port and return its address.
async fn spawn(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// A stand-in for Ollama that echoes the requested tone back.
async fn spawn_model(prompts: Prompts, healthy: bool) -> String {
    let router = Router::new().route(
        "/api/generate",
        post(move |Json(body): Json<Value>| {
            let prompts = prompts.clone();
            async move {
                let prompt = body["prompt"].as_str().unwrap_or_default().to_string();
                let tone = prompt
                    .split("in a ")
                    .nth(1)
                    .and_then(|rest| rest.split(" tone.").next())
                    .unwrap_or("plain")
                    .to_string();
                prompts.lock().unwrap().push(prompt);
                if healthy {
                    (StatusCode::OK, Json(json!({"response": format!("[{tone}] reply"), "done": true})))
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "model not loaded"})))
                }
            }
        }),
    );
    format!("{}/api", spawn(router).await)
}

// ── Harness ──────────────────────────────────────────────────────────────

struct Harness {
    base: String,
    client: reqwest::Client,
    prompts: Prompts,
    _dir: tempfile::TempDir,
}

impl Harness {
    async fn start(healthy: bool) -> Self {
        let prompts = Prompts::default();
        let model_url = spawn_model(prompts.clone(), healthy).await;

        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.generation.api_url = model_url;
        config.generation.timeout_secs = 5;
        config.storage.backend = "sqlite".into();
        config.storage.path = dir.path().join("data").join("toneshift.db").to_string_lossy().into_owned();

        let state = toneshift_gateway::build_state(&config).await.unwrap();
        let app = toneshift_gateway::build_router(state, &config.gateway);
        let base = spawn(app).await;

        Self {
            base,
            client: reqwest::Client::new(),
            prompts,
            _dir: dir,
        }
    }

    async fn send(&self, method: reqwest::Method, path: &str, token: Option<&str>, body: Option<Value>) -> (u16, Value) {
        let mut req = self.client.request(method, format!("{}{path}", self.base));
        if let Some(token) = token {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let resp = req.send().await.unwrap();
        let status = resp.status().as_u16();
        let body = resp.json::<Value>().await.unwrap_or(Value::Null);
        (status, body)
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
        self.send(reqwest::Method::POST, path, token, Some(body)).await
    }

    async fn get(&self, path: &str, token: &str) -> (u16, Value) {
        self.send(reqwest::Method::GET, path, Some(token), None).await
    }

    async fn register(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/api/users/register",
                None,
                json!({
                    "username": name,
                    "email": format!("{name}@example.com"),
                    "password": "correct horse"
                }),
            )
            .await;
        assert_eq!(status, 201, "register failed: {body}");
        body["token"].as_str().unwrap().to_string()
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_and_auth_gate() {
    let h = Harness::start(true).await;

    let (status, body) = h.send(reqwest::Method::GET, "/health", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["status"], "ok");

    let (status, body) = h.send(reqwest::Method::GET, "/api/tones", None, None).await;
    assert_eq!(status, 401);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn system_tones_seeded_into_sqlite() {
    let h = Harness::start(true).await;
    let token = h.register("ada").await;

    let (status, body) = h.get("/api/tones", &token).await;
    assert_eq!(status, 200);
    let names: Vec<&str> = body["tones"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names.len(), 8);
    assert!(names.contains(&"Professional"));
    assert!(names.contains(&"Enthusiastic"));
}

#[tokio::test]
async fn single_tone_prompt_carries_catalog_parameters() {
    let h = Harness::start(true).await;
    let token = h.register("grace").await;

    let (status, body) = h
        .post(
            "/api/responses/generate",
            Some(&token),
            json!({"message": "Can we move the meeting?", "tone": "professional"}),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(body["tone"], "professional");
    assert_eq!(body["response"], "[Professional] reply");

    let prompts = h.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Someone said: \"Can we move the meeting?\""));
    assert!(prompts[0].contains("This tone has the following characteristics:"));
    assert!(prompts[0].contains("- formality: high"));
}

#[tokio::test]
async fn conversation_flow_persists_exchange_and_feeds_history() {
    let h = Harness::start(true).await;
    let token = h.register("linus").await;

    let (status, body) = h
        .post(
            "/api/relationships",
            Some(&token),
            json!({"name": "Manager", "category": "professional", "context": "Weekly one-on-ones"}),
        )
        .await;
    assert_eq!(status, 201, "{body}");
    let relationship_id = body["relationship"]["id"].as_str().unwrap().to_string();

    let (status, body) = h
        .post(
            "/api/conversations",
            Some(&token),
            json!({"title": "Planning", "context": "Quarter planning", "relationshipId": relationship_id}),
        )
        .await;
    assert_eq!(status, 201, "{body}");
    let conversation_id = body["conversation"]["id"].as_str().unwrap().to_string();

    for message in ["First draft is ready", "Shall I send it?"] {
        let (status, body) = h
            .post(
                "/api/responses/generate-and-save",
                Some(&token),
                json!({"message": message, "tone": "Friendly", "conversationId": conversation_id}),
            )
            .await;
        assert_eq!(status, 200, "{body}");
        assert_eq!(body["userMessage"]["sender"], "user");
        assert_eq!(body["aiMessage"]["sender"], "ai");
        assert_eq!(body["aiMessage"]["tone"], "Friendly");
    }

    let (status, body) = h.get(&format!("/api/conversations/{conversation_id}"), &token).await;
    assert_eq!(status, 200);
    let messages = body["conversation"]["messages"].as_array().unwrap();
    let log: Vec<(&str, &str)> = messages
        .iter()
        .map(|m| (m["sender"].as_str().unwrap(), m["content"].as_str().unwrap()))
        .collect();
    assert_eq!(
        log,
        vec![
            ("user", "First draft is ready"),
            ("ai", "[Friendly] reply"),
            ("user", "Shall I send it?"),
            ("ai", "[Friendly] reply"),
        ]
    );

    let prompts = h.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].contains("Quarter planning"));
    assert!(prompts[0].contains("Weekly one-on-ones"));
    assert!(prompts[1].contains("First draft is ready"));
}

#[tokio::test]
async fn multiple_tones_fall_back_to_user_defaults() {
    let h = Harness::start(true).await;
    let token = h.register("barbara").await;

    let (status, _) = h
        .send(
            reqwest::Method::PUT,
            "/api/tones/preferred",
            Some(&token),
            Some(json!({"tones": ["Casual", "Funny"]})),
        )
        .await;
    assert_eq!(status, 200);

    let (status, body) = h
        .post(
            "/api/responses/generate-multiple",
            Some(&token),
            json!({"message": "Lunch tomorrow?", "tones": []}),
        )
        .await;
    assert_eq!(status, 200, "{body}");
    assert_eq!(
        body["responses"],
        json!({"Casual": "[Casual] reply", "Funny": "[Funny] reply"})
    );
    assert_eq!(h.prompts().len(), 2);
}

#[tokio::test]
async fn model_failure_surfaces_as_bad_gateway_and_saves_nothing() {
    let h = Harness::start(false).await;
    let token = h.register("ken").await;

    let (_, body) = h
        .post("/api/conversations", Some(&token), json!({"title": "Ops"}))
        .await;
    let conversation_id = body["conversation"]["id"].as_str().unwrap().to_string();

    let (status, body) = h
        .post(
            "/api/responses/generate-and-save",
            Some(&token),
            json!({"message": "Server is down", "tone": "Empathetic", "conversationId": conversation_id}),
        )
        .await;
    assert_eq!(status, 502);
    assert!(body["error"].as_str().unwrap().starts_with("Failed to generate response"));

    let (_, body) = h.get(&format!("/api/conversations/{conversation_id}"), &token).await;
    assert!(body["conversation"]["messages"].as_array().unwrap().is_empty());
}
