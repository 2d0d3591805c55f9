//! Backend proxy integration tests

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query},
    http::{HeaderMap, Request, StatusCode},
    routing::{get, post},
};
use herald::api::{ApiServer, ApiState};
use herald::transcription::{PollPolicy, TranscriptionClient};
use herald::ports::RecordedAudio;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

type Seen = Arc<Mutex<Vec<Value>>>;

async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Upstream news and transcription provider in one service
fn upstream(seen: Seen) -> Router {
    let news = {
        let seen = Arc::clone(&seen);
        move |Query(query): Query<HashMap<String, String>>| {
            let seen = Arc::clone(&seen);
            async move {
                if query.get("q").map(String::as_str) == Some("fail") {
                    return (StatusCode::BAD_GATEWAY, Json(json!({"status": "error"})));
                }
                seen.lock().unwrap().push(json!({"news": query}));
                (
                    StatusCode::OK,
                    Json(json!({"status": "ok", "totalResults": 1, "articles": [
                        {"title": "Storm hits coast", "url": "https://news.example/storm",
                         "source": {"name": "BBC News"}}
                    ]})),
                )
            }
        }
    };

    let upload = {
        let seen = Arc::clone(&seen);
        move |headers: HeaderMap, body: axum::body::Bytes| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(json!({
                    "upload_auth": headers.get("authorization").and_then(|v| v.to_str().ok()),
                    "bytes": body.len(),
                }));
                Json(json!({"upload_url": "https://cdn.example/a1"}))
            }
        }
    };

    let create = {
        let seen = Arc::clone(&seen);
        move |Json(body): Json<Value>| {
            let seen = Arc::clone(&seen);
            async move {
                seen.lock().unwrap().push(json!({"transcript": body}));
                Json(json!({"id": "t-9", "status": "queued", "audio_url": "https://cdn.example/a1"}))
            }
        }
    };

    Router::new()
        .route("/v2/top-headlines", get(news))
        .route("/v2/upload", post(upload))
        .route("/v2/transcript", post(create))
        .route(
            "/v2/transcript/{id}",
            get(|Path(id): Path<String>| async move {
                Json(json!({"id": id, "status": "completed", "text": "Markets.", "words": []}))
            }),
        )
}

fn state(base: &str, with_keys: bool, access_token: Option<&str>) -> ApiState {
    let key = |k: &str| with_keys.then(|| SecretString::from(k.to_string()));
    ApiState {
        client: reqwest::Client::new(),
        news_upstream: format!("{base}/v2/top-headlines"),
        transcription_upstream: format!("{base}/v2"),
        news_api_key: key("news-key"),
        transcription_api_key: key("aai-key"),
        access_token: access_token.map(|t| SecretString::from(t.to_string())),
    }
}

fn router(state: ApiState) -> Router {
    ApiServer::with_state(state, "127.0.0.1".to_string(), 0).router()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = router(state("http://127.0.0.1:9", false, None));

    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_news_forwards_query_with_key() {
    let seen = Seen::default();
    let base = spawn(upstream(Arc::clone(&seen))).await;
    let app = router(state(&base, true, None));

    let response = app
        .oneshot(get_request("/news?source=bbc-news&q=climate"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["articles"][0]["title"], "Storm hits coast");

    let seen = seen.lock().unwrap();
    let query = &seen[0]["news"];
    assert_eq!(query["language"], "en");
    assert_eq!(query["sources"], "bbc-news");
    assert_eq!(query["q"], "climate");
    assert_eq!(query["apiKey"], "news-key");
    assert!(query.get("country").is_none());
}

#[tokio::test]
async fn test_news_defaults_to_country() {
    let seen = Seen::default();
    let base = spawn(upstream(Arc::clone(&seen))).await;
    let app = router(state(&base, true, None));

    let response = app.oneshot(get_request("/news")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(seen.lock().unwrap()[0]["news"]["country"], "us");
}

#[tokio::test]
async fn test_news_upstream_failure() {
    let base = spawn(upstream(Seen::default())).await;
    let app = router(state(&base, true, None));

    let response = app.oneshot(get_request("/news?q=fail")).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["message"], "Failed to fetch news");
}

#[tokio::test]
async fn test_missing_keys_are_unavailable() {
    let app = router(state("http://127.0.0.1:9", false, None));

    let response = app.clone().oneshot(get_request("/news")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_json(response).await["error"]["code"], "not_configured");

    let response = app.oneshot(get_request("/transcript/t-1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_upload_requires_body() {
    let app = router(state("http://127.0.0.1:9", true, None));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/upload")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_transcript_requests_formatting() {
    let seen = Seen::default();
    let base = spawn(upstream(Arc::clone(&seen))).await;
    let app = router(state(&base, true, None));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/transcript")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"audio_url":"https://cdn.example/a1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"id": "t-9", "status": "queued"}));

    let seen = seen.lock().unwrap();
    let upstream_body = &seen[0]["transcript"];
    assert_eq!(upstream_body["audio_url"], "https://cdn.example/a1");
    assert_eq!(upstream_body["punctuate"], true);
    assert_eq!(upstream_body["format_text"], true);
}

#[tokio::test]
async fn test_access_token_guards_transcription() {
    let base = spawn(upstream(Seen::default())).await;
    let app = router(state(&base, true, Some("s3cret")));

    let response = app
        .clone()
        .oneshot(get_request("/transcript/t-9"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/transcript/t-9")
                .header("authorization", "Bearer s3cret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "completed");
    assert_eq!(json["text"], "Markets.");
    assert!(json.get("words").is_none());

    // news stays open
    let response = app.oneshot(get_request("/news")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_transcription_client_through_proxy() {
    let seen = Seen::default();
    let upstream_base = spawn(upstream(Arc::clone(&seen))).await;
    let proxy_base = spawn(router(state(&upstream_base, true, None))).await;

    let client = TranscriptionClient::with_base_url(&proxy_base).with_poll_policy(PollPolicy {
        interval: std::time::Duration::from_millis(1),
        max_attempts: 5,
    });
    let text = client
        .transcribe_audio(&RecordedAudio::wav(vec![7; 64]))
        .await
        .unwrap();

    assert_eq!(text, "Markets");
    let seen = seen.lock().unwrap();
    assert_eq!(seen[0]["upload_auth"], "aai-key");
    assert_eq!(seen[0]["bytes"], 64);
}
