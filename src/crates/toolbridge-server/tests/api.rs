//! REST API round-trip tests over an in-process router
//!
//! Requests go through the real router and handlers; only the outbound
//! HTTP transport is stubbed.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use toolbridge_dialogue::{ConversationStore, InMemoryConversationStore, SlotFillingEngine};
use toolbridge_exec::{HttpRequestSpec, HttpResponse, Transport};
use toolbridge_match::{MatchEngine, ToolIndex};
use toolbridge_server::create_router;
use toolbridge_spec::SpecCompiler;

const PETSTORE: &str = r#"{
    "openapi": "3.0.0",
    "info": {"title": "Petstore", "version": "1.0.0"},
    "servers": [{"url": "https://petstore.example.com/v1"}],
    "paths": {
        "/pets": {
            "post": {
                "operationId": "addPet",
                "summary": "Add a new pet to the store",
                "requestBody": {
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "object",
                                "properties": {
                                    "name": {"type": "string"},
                                    "photoUrls": {
                                        "type": "array",
                                        "items": {"type": "string"}
                                    }
                                },
                                "required": ["name", "photoUrls"]
                            }
                        }
                    }
                }
            }
        }
    }
}"#;

struct StubTransport;

#[async_trait]
impl Transport for StubTransport {
    async fn send(&self, _request: &HttpRequestSpec) -> toolbridge_exec::Result<HttpResponse> {
        Ok(HttpResponse {
            status: 201,
            headers: Default::default(),
            body: r#"{"id": 1}"#.to_string(),
        })
    }
}

fn test_router() -> Router {
    let tools = SpecCompiler::from_json_str(PETSTORE).unwrap();
    let index = Arc::new(ToolIndex::build(tools));
    let matcher = Arc::new(MatchEngine::new(index.clone()));
    let store: Arc<InMemoryConversationStore> = Arc::new(InMemoryConversationStore::new());
    let engine = Arc::new(SlotFillingEngine::new(
        matcher,
        Arc::new(StubTransport),
        store.clone() as Arc<dyn ConversationStore>,
    ));
    create_router(engine, index, store)
}

async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn post_json(router: &Router, uri: &str, payload: Value) -> (StatusCode, Value) {
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health_reports_tool_count() {
    let router = test_router();
    let (status, body) = get(&router, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
    assert_eq!(body["tool_count"], json!(1));
}

#[tokio::test]
async fn test_list_and_get_tool() {
    let router = test_router();

    let (status, body) = get(&router, "/api/v1/tools").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["name"], json!("addPet"));
    assert_eq!(body[0]["method"], json!("POST"));

    let (status, body) = get(&router, "/api/v1/tools/addPet").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"]["path"], json!("/pets"));

    let (status, body) = get(&router, "/api/v1/tools/nope").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("NOT_FOUND"));
}

#[tokio::test]
async fn test_chat_two_turn_round_trip() {
    let router = test_router();

    // Turn 1: no conversation_id; a new one is minted and a clarification
    // for photoUrls comes back.
    let (status, body) = post_json(
        &router,
        "/api/v1/chat",
        json!({"message": "add a new pet named Rex"}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let conversation_id = body["conversation_id"].as_str().unwrap().to_string();
    assert_eq!(body["tool"], json!("addPet"));
    assert_eq!(body["clarification"]["fields"][0]["name"], json!("photoUrls"));

    // Turn 2: supply the missing field; no optionals exist, so the call
    // executes against the stub transport.
    let (status, body) = post_json(
        &router,
        "/api/v1/chat",
        json!({
            "conversation_id": conversation_id,
            "message": "http://img.example.com/rex.jpg"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], json!("executed"));
    assert_eq!(body["execution"]["success"], json!(true));
    assert_eq!(body["execution"]["status_code"], json!(201));

    // The conversation is stored and queryable.
    let (status, body) = get(
        &router,
        &format!("/api/v1/conversations/{conversation_id}"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], json!(conversation_id));
    assert_eq!(body["messages"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let router = test_router();
    let (status, body) = post_json(&router, "/api/v1/chat", json!({"message": "  "})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("BAD_REQUEST"));
}

#[tokio::test]
async fn test_delete_conversation() {
    let router = test_router();
    post_json(&router, "/api/v1/chat", json!({"conversation_id": "c1", "message": "add a pet"}))
        .await;

    let (status, _) = get(&router, "/api/v1/conversations/c1").await;
    assert_eq!(status, StatusCode::OK);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/v1/conversations/c1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _) = get(&router, "/api/v1/conversations/c1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
