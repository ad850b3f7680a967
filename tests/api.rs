//! API endpoint integration tests

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use smart_deck::api::{ApiServer, ApiState};
use smart_deck::clock::ClockSource;
use smart_deck::config::ServerConfig;
use smart_deck::inference::EngineStatus;
use smart_deck::DirectiveVocabulary;
use tokio::sync::watch;
use tower::ServiceExt;

mod common;
use common::{FakeBackend, Harness, spawn_assistant, wait_for_state};

/// Build a test API router around a running assistant
fn build_test_router(deck: &Harness) -> axum::Router {
    build_router_with_engine(deck, EngineStatus::ready("fake"))
}

fn build_router_with_engine(deck: &Harness, engine: EngineStatus) -> axum::Router {
    let (_clock_tx, clock) = watch::channel(ClockSource.tick());
    let (_engine_tx, engine) = watch::channel(engine);

    let state = ApiState {
        clock,
        snapshot: deck.weather.reader(),
        engine,
        assistant: deck.handle.clone(),
    };
    let config = ServerConfig {
        port: 0,
        static_dir: None,
    };

    ApiServer::new(state, &config).router()
}

fn test_deck(reply: &str) -> Harness {
    spawn_assistant(
        FakeBackend::replying(reply),
        None,
        DirectiveVocabulary::cloud(),
    )
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn post_json(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let deck = test_deck("Hi.");
    let app = build_test_router(&deck);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_ready_when_engine_loaded() {
    let deck = test_deck("Hi.");
    let app = build_test_router(&deck);

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["checks"]["engine"]["status"], "ok");
    assert_eq!(json["checks"]["weather"]["status"], "pending");
}

#[tokio::test]
async fn test_not_ready_while_engine_loads() {
    let deck = test_deck("Hi.");
    let app = build_router_with_engine(&deck, EngineStatus::starting("local"));

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json = json_body(response).await;
    assert_eq!(json["status"], "loading");
    assert_eq!(json["checks"]["engine"]["message"], "Loading...");
}

#[tokio::test]
async fn test_dashboard_endpoint() {
    let deck = test_deck("Hi.");
    deck.weather
        .update_weather("24°C".to_string(), "Partly Cloudy".to_string());
    let app = build_test_router(&deck);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/dashboard")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["weather"]["temperature_label"], "24°C");
    assert_eq!(json["weather"]["condition_label"], "Partly Cloudy");
    assert!(json["clock"]["time_label"].as_str().unwrap().ends_with('M'));
    assert!(json["clock"].get("prompt_time_label").is_none());
    assert_eq!(json["assistant"]["state"], "idle");
    assert_eq!(json["assistant"]["status_text"], "Tap mic to speak");
    assert_eq!(json["engine"]["ready"], true);
    assert_eq!(json["calendar"]["headers"][0], "S");
}

#[tokio::test]
async fn test_calendar_endpoint() {
    let deck = test_deck("Hi.");
    let app = build_test_router(&deck);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/calendar")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = json_body(response).await;
    let cells = json["cells"].as_array().unwrap();
    let blanks = json["leading_blanks"].as_u64().unwrap();
    let days = json["days_in_month"].as_u64().unwrap();
    assert_eq!(cells.len() as u64, blanks + days);
    assert_eq!(
        cells.iter().filter(|c| c["is_today"] == true).count(),
        1
    );
}

#[tokio::test]
async fn test_ask_runs_a_turn() {
    let deck = test_deck("[[SCREEN_OFF]] Okay, turning it off.");
    let app = build_test_router(&deck);

    let response = app
        .oneshot(post_json(
            "/api/assistant/ask",
            &serde_json::json!({ "text": "turn off the screen" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["outcome"], "started");

    deck.speech.wait_for_speech().await;
    wait_for_state(&deck.handle, smart_deck::CaptureState::Idle).await;
    assert_eq!(deck.speech.spoken(), vec!["Okay, turning it off.".to_string()]);
}

#[tokio::test]
async fn test_ask_rejects_empty_text() {
    let deck = test_deck("Hi.");
    let app = build_test_router(&deck);

    let response = app
        .oneshot(post_json(
            "/api/assistant/ask",
            &serde_json::json!({ "text": "  " }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_start_without_microphone() {
    let deck = test_deck("Hi.");
    let app = build_test_router(&deck);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/assistant/start")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["outcome"], "voice_unavailable");
    assert_eq!(json["status"]["listening"], false);
}

#[tokio::test]
async fn test_status_and_event_stream() {
    let deck = test_deck("Hi.");
    let app = build_test_router(&deck);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/assistant/status")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = json_body(response).await;
    assert_eq!(json["state"], "idle");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/assistant/events")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
}
