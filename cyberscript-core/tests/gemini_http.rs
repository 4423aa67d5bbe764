//! Integration tests for the Gemini provider over real HTTP.
//!
//! A small axum server stands in for the `generateContent` endpoint so the
//! request shape, key handling, and response decoding are exercised through
//! reqwest exactly as in production.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use cyberscript_core::config::GenerationConfig;
use cyberscript_core::controller::RecordingCallback;
use cyberscript_core::error::GenerationError;
use cyberscript_core::image::decode_data_uri;
use cyberscript_core::providers::mock::TINY_PNG_B64;
use cyberscript_core::providers::{GeminiProvider, StoryboardProvider};
use cyberscript_core::types::Complexity;
use cyberscript_core::StoryboardController;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

const TEST_KEY: &str = "test-secret-key";

/// One request as seen by the fake server.
#[derive(Debug, Clone)]
struct SeenRequest {
    call: String,
    key: Option<String>,
    body: Value,
}

type Seen = Arc<Mutex<Vec<SeenRequest>>>;

fn scenario_text() -> String {
    json!({
        "threatActor": "Ransomware Affiliate",
        "attackVector": "Phishing to Ransomware",
        "summary": "A clinic loses access to patient records.",
        "steps": [
            {
                "phase": "Initial Access",
                "title": "Invoice Lure",
                "description": "A macro document is opened.",
                "mitreTechnique": "T1566.001",
                "visualPrompt": "glowing envelope on a desk"
            },
            {
                "phase": "Execution",
                "title": "Loader Runs",
                "description": "A loader beacons out.",
                "mitreTechnique": "T1204.002",
                "visualPrompt": "FAIL terminal with red text"
            },
            {
                "phase": "Impact",
                "title": "Encryption",
                "description": "File shares are encrypted.",
                "mitreTechnique": "T1486",
                "visualPrompt": "EMPTY locked folders"
            }
        ],
        "sampleLogs": "4688 powershell.exe -enc ...",
        "attackFlowDiagram": "Email -> Macro -> Loader -> Encrypt",
        "mitigationLessons": "Disable macros from the internet."
    })
    .to_string()
}

async fn generate_content(
    State(seen): State<Seen>,
    Path(call): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = query.get("key").cloned();
    seen.lock().unwrap().push(SeenRequest {
        call: call.clone(),
        key: key.clone(),
        body: body.clone(),
    });

    if key.as_deref() != Some(TEST_KEY) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": { "message": "API key not valid" } })),
        );
    }

    if call.starts_with("text-model") {
        return (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": scenario_text() }] }
                }]
            })),
        );
    }

    let prompt = body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap_or_default();
    if prompt.contains("FAIL") {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": { "message": "internal" } })),
        )
    } else if prompt.contains("EMPTY") {
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": { "parts": [{ "text": "I cannot draw that." }] }
                }]
            })),
        )
    } else {
        (
            StatusCode::OK,
            Json(json!({
                "candidates": [{
                    "content": { "parts": [
                        { "text": "Here is your image." },
                        { "inlineData": { "mimeType": "image/png", "data": TINY_PNG_B64 } }
                    ] }
                }]
            })),
        )
    }
}

async fn start_server() -> (SocketAddr, Seen) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let app = Router::new()
        .route("/v1beta/models/{call}", post(generate_content))
        .with_state(seen.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, seen)
}

fn config_for(addr: SocketAddr) -> GenerationConfig {
    GenerationConfig {
        text_model: "text-model".to_string(),
        image_model: "image-model".to_string(),
        base_url: Some(format!("http://{}/v1beta", addr)),
        request_timeout_secs: Some(10),
        ..GenerationConfig::default()
    }
}

#[tokio::test]
async fn test_scenario_request_shape_and_decode() {
    let (addr, seen) = start_server().await;
    let provider = GeminiProvider::new_with_key(&config_for(addr), TEST_KEY.to_string()).unwrap();

    let scenario = provider
        .generate_scenario(Complexity::Advanced, "A regional clinic")
        .await
        .unwrap();
    assert_eq!(scenario.attack_vector, "Phishing to Ransomware");
    assert_eq!(scenario.steps.len(), 3);
    assert_eq!(scenario.steps[2].mitre_technique, "T1486");

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.call, "text-model:generateContent");
    assert_eq!(request.key.as_deref(), Some(TEST_KEY));
    assert_eq!(
        request.body["generationConfig"]["responseMimeType"],
        "application/json"
    );
    assert_eq!(
        request.body["generationConfig"]["responseSchema"]["type"],
        "OBJECT"
    );
    let user_text = request.body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(user_text.contains("Difficulty Level: Advanced"));
    assert!(user_text.contains("A regional clinic"));
    assert!(request.body["system_instruction"]["parts"][0]["text"].is_string());
}

#[tokio::test]
async fn test_image_request_returns_data_uri() {
    let (addr, seen) = start_server().await;
    let provider = GeminiProvider::new_with_key(&config_for(addr), TEST_KEY.to_string()).unwrap();

    let uri = provider
        .generate_step_image("glowing envelope on a desk")
        .await
        .unwrap();
    let (mime, bytes) = decode_data_uri(&uri).unwrap();
    assert_eq!(mime, "image/png");
    assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));

    let requests = seen.lock().unwrap().clone();
    assert_eq!(requests[0].call, "image-model:generateContent");
    assert_eq!(
        requests[0].body["generationConfig"]["imageConfig"]["aspectRatio"],
        "16:9"
    );
    let prompt = requests[0].body["contents"][0]["parts"][0]["text"]
        .as_str()
        .unwrap();
    assert!(prompt.ends_with("glowing envelope on a desk"));
}

#[tokio::test]
async fn test_image_without_inline_data_is_missing_payload() {
    let (addr, _) = start_server().await;
    let provider = GeminiProvider::new_with_key(&config_for(addr), TEST_KEY.to_string()).unwrap();
    let err = provider.generate_step_image("EMPTY scene").await.unwrap_err();
    assert!(matches!(err, GenerationError::MissingImagePayload));
}

#[tokio::test]
async fn test_image_server_error_is_image_request() {
    let (addr, _) = start_server().await;
    let provider = GeminiProvider::new_with_key(&config_for(addr), TEST_KEY.to_string()).unwrap();
    let err = provider.generate_step_image("FAIL scene").await.unwrap_err();
    match err {
        GenerationError::ImageRequest { message } => assert!(message.contains("500")),
        other => panic!("Expected ImageRequest, got {:?}", other),
    }
}

#[tokio::test]
async fn test_rejected_key_is_auth_failed() {
    let (addr, _) = start_server().await;
    let provider = GeminiProvider::new_with_key(&config_for(addr), "wrong".to_string()).unwrap();
    let err = provider
        .generate_scenario(Complexity::Beginner, "A bank")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::AuthFailed { .. }));
}

#[tokio::test]
async fn test_transport_error_hides_key() {
    // Bind and immediately drop a listener to get a port nothing listens on.
    let addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };
    let provider = GeminiProvider::new_with_key(&config_for(addr), TEST_KEY.to_string()).unwrap();
    let err = provider
        .generate_scenario(Complexity::Beginner, "A bank")
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::ScenarioRequest { .. }));
    assert!(!err.to_string().contains(TEST_KEY));
}

#[tokio::test]
async fn test_controller_end_to_end_over_http() {
    let (addr, seen) = start_server().await;
    let provider = Arc::new(
        GeminiProvider::new_with_key(&config_for(addr), TEST_KEY.to_string()).unwrap(),
    );
    let callback = Arc::new(RecordingCallback::new());
    let controller = StoryboardController::new(provider, callback.clone());

    let scenario = controller
        .generate("A regional clinic", Complexity::Intermediate)
        .await
        .unwrap()
        .unwrap();

    assert!(scenario.steps[0].image_url.is_some());
    assert!(scenario.steps[1].image_url.is_none());
    assert!(scenario.steps[2].image_url.is_none());
    assert!(scenario.settled());
    assert!(callback.alerts().await.is_empty());

    let calls: Vec<String> = seen
        .lock()
        .unwrap()
        .iter()
        .map(|r| r.call.clone())
        .collect();
    assert_eq!(
        calls,
        vec![
            "text-model:generateContent",
            "image-model:generateContent",
            "image-model:generateContent",
            "image-model:generateContent",
        ]
    );
}
