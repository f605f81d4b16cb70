use std::sync::mpsc::Receiver;
use std::time::Duration;

use serde_json::json;
use telemetry_engine::{EngineEvent, EngineHandle, FailureKind, FetchSettings, RequestTarget};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn next_event(rx: Receiver<EngineEvent>) -> (Receiver<EngineEvent>, EngineEvent) {
    tokio::task::spawn_blocking(move || {
        let event = rx
            .recv_timeout(Duration::from_secs(5))
            .expect("engine event");
        (rx, event)
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn fetch_completion_echoes_channel_and_seq() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sessions"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "success": true, "sessions": [] })),
        )
        .mount(&server)
        .await;

    let (engine, rx) = EngineHandle::connect(&server.uri(), FetchSettings::default()).unwrap();
    engine.fetch("session", 7, RequestTarget::get("/api/sessions"));

    let (_rx, event) = next_event(rx).await;
    match event {
        EngineEvent::FetchCompleted {
            channel,
            seq,
            generation,
            result,
        } => {
            assert_eq!(channel, "session");
            assert_eq!(seq, 7);
            assert_eq!(generation, 0);
            assert_eq!(result.unwrap().json["success"], true);
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn polling_emits_refresh_ticks_until_stopped() {
    let server = MockServer::start().await;
    let (engine, rx) = EngineHandle::connect(&server.uri(), FetchSettings::default()).unwrap();

    engine.start_polling("metrics", Duration::from_millis(50));
    let (rx, first) = next_event(rx).await;
    let (rx, second) = next_event(rx).await;
    let expected = EngineEvent::RefreshDue {
        channel: "metrics".to_string(),
        generation: 0,
    };
    assert_eq!(first, expected);
    assert_eq!(second, expected);

    engine.stop_polling("metrics");
    tokio::time::sleep(Duration::from_millis(100)).await;
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn post_reports_completion_by_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/redis/commands/clear"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let (engine, rx) = EngineHandle::connect(&server.uri(), FetchSettings::default()).unwrap();
    engine.post(RequestTarget::post(
        "/api/redis/commands/clear",
        json!({ "context": "session" }),
    ));

    let (_rx, event) = next_event(rx).await;
    let EngineEvent::PostCompleted { path, result } = event else {
        panic!("unexpected event {event:?}");
    };
    assert_eq!(path, "/api/redis/commands/clear");
    assert_eq!(result.unwrap().status, 200);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shutdown_cancels_in_flight_fetches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/assets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_json(json!({ "success": true, "assets": [] })),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_secs(30),
        ..FetchSettings::default()
    };
    let (engine, rx) = EngineHandle::connect(&server.uri(), settings).unwrap();
    engine.fetch("search", 1, RequestTarget::get("/api/search/assets?limit=50"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    tokio::task::spawn_blocking(move || engine.shutdown())
        .await
        .unwrap();

    let (_rx, event) = next_event(rx).await;
    let EngineEvent::FetchCompleted { seq, result, .. } = event else {
        panic!("unexpected event {event:?}");
    };
    assert_eq!(seq, 1);
    assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_generation_cancels_old_fetches_and_tags_new_ticks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/search/assets"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(10))
                .set_body_json(json!({ "success": true, "assets": [] })),
        )
        .mount(&server)
        .await;

    let settings = FetchSettings {
        request_timeout: Duration::from_secs(30),
        ..FetchSettings::default()
    };
    let (mut engine, rx) = EngineHandle::connect(&server.uri(), settings).unwrap();
    engine.fetch("search", 1, RequestTarget::get("/api/search/assets?limit=50"));
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(engine.begin_generation(), 1);
    assert_eq!(engine.generation(), 1);

    let (rx, event) = next_event(rx).await;
    let EngineEvent::FetchCompleted {
        seq,
        generation,
        result,
        ..
    } = event
    else {
        panic!("unexpected event {event:?}");
    };
    assert_eq!(seq, 1);
    assert_eq!(generation, 0);
    assert_eq!(result.unwrap_err().kind, FailureKind::Cancelled);

    engine.start_polling("search", Duration::from_secs(60));
    let (_rx, tick) = next_event(rx).await;
    assert_eq!(
        tick,
        EngineEvent::RefreshDue {
            channel: "search".to_string(),
            generation: 1,
        }
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn new_generation_stops_old_timers() {
    let server = MockServer::start().await;
    let (mut engine, rx) = EngineHandle::connect(&server.uri(), FetchSettings::default()).unwrap();

    engine.start_polling("session", Duration::from_millis(50));
    let (rx, _) = next_event(rx).await;
    engine.begin_generation();

    tokio::time::sleep(Duration::from_millis(100)).await;
    while rx.try_recv().is_ok() {}
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(rx.try_recv().is_err());
}
