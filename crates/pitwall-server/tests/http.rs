use std::sync::{Arc, Barrier};

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use pitwall_bridge::{
    Bridge, CellAddress, ConnectionManager, MemoryEngine, MemoryWorkbook, Sheet, WritePolicy,
};
use pitwall_schema::Layout;
use serde_json::{Value, json};
use tower::ServiceExt;

const PATH: &str = "data/calculadora.xlsx";

fn app(engine: &MemoryEngine, prefix: &str) -> Router {
    let manager = ConnectionManager::new(
        Box::new(engine.backend()),
        PATH,
        Layout::standard().required_sheets(),
    );
    let bridge = Bridge::new(manager, Layout::standard(), WritePolicy::Permissive);
    pitwall_server::router(Arc::new(bridge), prefix)
}

async fn call(app: &Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("JSON body")
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_connection_without_connecting() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");

    let (status, body) = call(&app, Method::GET, "/api/python/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "connection": "disconnected"}));
    assert_eq!(engine.launches(), 0);

    let (_, body) = call(&app, Method::GET, "/api/python/state", "").await;
    assert_eq!(body["success"], json!(true));
    let (_, body) = call(&app, Method::GET, "/api/python/health", "").await;
    assert_eq!(body["connection"], json!("connected"));
}

#[tokio::test]
async fn state_routes_share_one_snapshot() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");

    let (_, state) = call(&app, Method::GET, "/api/python/state", "").await;
    let (_, alias) = call(&app, Method::GET, "/api/python/strategy/state", "").await;
    assert_eq!(state, alias);

    let data = &state["data"];
    assert_eq!(data["car"].as_array().map(Vec::len), Some(11));
    assert_eq!(data["car"][0], json!({"name": "Chassi", "lvl": 1, "wear": 0}));
    assert_eq!(data["weather"]["weatherQ1"], json!("Dry"));
    assert_eq!(data["current_track"], Value::Null);
    assert_eq!(data["race_options"]["avg_temp"], Value::Null);
}

#[tokio::test]
async fn strategy_round_trip_over_http() {
    let engine = MemoryEngine::calculator(PATH);
    engine.on_recalculate(|book| {
        let laps = book.get(CellAddress::a1(Sheet::TyreFuel, "G21"));
        book.set(CellAddress::a1(Sheet::TyreFuel, "D18"), laps);
    });
    let app = app(&engine, "/api/python");

    let body = json!({
        "pista": "Monaco",
        "race_options": {"desgaste_pneu_percent": 5, "condicao": "Dry", "pitstops_num": 2},
        "personal_stint_voltas": {"stint1": 20, "stint2": 18}
    });
    let (status, out) = call(
        &app,
        Method::POST,
        "/api/python/strategy/calculate",
        &body.to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], json!(true), "{out}");

    let data = &out["data"];
    assert_eq!(data["stints_personal"]["voltas"]["stint1"].as_f64(), Some(20.0));
    assert_eq!(data["race_calculated_data"]["voltas"].as_f64(), Some(20.0));
    assert!(data["compound_details_outputs"]["Hard"].is_object());
    assert!(data["boost_laps_outputs"]["boost3"].is_object());
    assert!(data["boost_mini_stints_outputs"]["stint8"].is_object());
}

#[tokio::test]
async fn driver_update_and_setup_use_the_envelope() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");

    let (_, out) = call(
        &app,
        Method::POST,
        "/api/python/update_driver_car",
        r#"{"driver": {"concentracao": 90}, "car": [{"lvl": 2}]}"#,
    )
    .await;
    assert_eq!(out, json!({"success": true, "oa": null}));

    let (_, out) = call(&app, Method::POST, "/api/python/update_setup_weather", "").await;
    assert_eq!(out, json!({"success": true}));

    let (_, out) = call(
        &app,
        Method::POST,
        "/api/python/setup/calculate",
        r#"{"pista": "Selecionar Pista", "tempQ1": 22}"#,
    )
    .await;
    assert_eq!(out["success"], json!(true));
    assert_eq!(out["data"].as_object().map(|parts| parts.len()), Some(11));
    assert!(out["data"]["chassi"].get("q1").is_none());
    assert!(out["data"]["motor"].get("race").is_some());
}

#[tokio::test]
async fn setup_page_body_is_accepted() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");

    // The setup page posts its whole form: track, driver, car, weather.
    let body = json!({
        "pista": "Monza",
        "concentracao": 90,
        "talento": 85,
        "agressividade": 40,
        "car": [
            {"name": "Chassi", "lvl": 3, "wear": 12},
            {"name": "Motor", "lvl": 4, "wear": 0}
        ],
        "tempQ1": 21,
        "tempQ2": 22,
        "tempRace": 24,
        "weatherQ1": "Dry",
        "weatherQ2": "Dry",
        "weatherRace": "Wet",
        "avgTemp": 22.5,
        "desgasteModifier": 0
    });
    let (status, out) = call(
        &app,
        Method::POST,
        "/api/python/setup/calculate",
        &body.to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], json!(true), "{out}");
    assert_eq!(out["data"].as_object().map(|parts| parts.len()), Some(11));
}

#[tokio::test]
async fn wrong_typed_driver_field_only_clears_that_cell() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");
    let uri = "/api/python/update_driver_car";

    let (_, out) = call(&app, Method::POST, uri, r#"{"driver": {"talento": 70}}"#).await;
    assert_eq!(out["success"], json!(true), "{out}");
    let (_, out) = call(
        &app,
        Method::POST,
        uri,
        r#"{"driver": {"concentracao": 100, "talento": {"x": 1}}}"#,
    )
    .await;
    assert_eq!(out["success"], json!(true), "{out}");

    let (_, state) = call(&app, Method::GET, "/api/python/state", "").await;
    assert_eq!(state["data"]["driver"]["concentracao"], json!(100));
    assert_eq!(state["data"]["driver"]["talento"], Value::Null);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn health_answers_during_a_recalculation() {
    let engine = MemoryEngine::calculator(PATH);
    let gate = Arc::new(Barrier::new(2));
    let hook_gate = Arc::clone(&gate);
    engine.on_recalculate(move |_| {
        hook_gate.wait();
        hook_gate.wait();
    });
    let app = app(&engine, "/api/python");

    let busy_app = app.clone();
    let busy = tokio::spawn(async move {
        call(&busy_app, Method::POST, "/api/python/update_driver_car", "{}").await
    });
    let entered = Arc::clone(&gate);
    tokio::task::spawn_blocking(move || entered.wait())
        .await
        .expect("recalculation started");

    let (status, body) = call(&app, Method::GET, "/api/python/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "connection": "connected"}));

    let release = Arc::clone(&gate);
    tokio::task::spawn_blocking(move || release.wait())
        .await
        .expect("recalculation released");
    let (_, out) = busy.await.expect("busy request");
    assert_eq!(out["success"], json!(true), "{out}");
}

#[tokio::test]
async fn failures_are_reported_with_status_200() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");

    let (status, out) = call(
        &app,
        Method::POST,
        "/api/python/strategy/calculate",
        "{not json",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], json!(false));
    let message = out["message"].as_str().expect("message");
    assert!(message.starts_with("malformed request"), "{message}");
    assert_eq!(engine.launches(), 0);

    engine.fail_launches("no engine installed");
    let (status, out) = call(&app, Method::GET, "/api/python/tracks", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(out["success"], json!(false));
    assert!(
        out["message"]
            .as_str()
            .is_some_and(|m| m.contains("calculation engine unavailable")),
        "{out}"
    );
}

#[tokio::test]
async fn catalogue_routes() {
    let engine = MemoryEngine::calculator(PATH);
    engine.start_instance(vec![
        MemoryWorkbook::calculator("calculadora.xlsx")
            .with_cell(CellAddress::a1(Sheet::Tracks, "A4"), "Monaco")
            .with_cell(CellAddress::a1(Sheet::Tracks, "A5"), "Interlagos"),
    ]);
    let app = app(&engine, "/api/python");

    let (_, out) = call(&app, Method::GET, "/api/python/tracks", "").await;
    assert_eq!(out, json!({"success": true, "tracks": ["Monaco", "Interlagos"]}));

    let (_, out) = call(&app, Method::GET, "/api/python/tyre_suppliers", "").await;
    assert_eq!(out["suppliers"].as_array().map(Vec::len), Some(9));
    assert_eq!(out["suppliers"][0], json!("Pipirelli"));
}

#[tokio::test]
async fn prefix_is_configurable() {
    let engine = MemoryEngine::calculator(PATH);

    let root = app(&engine, "/");
    let (status, _) = call(&root, Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::OK);

    let nested = app(&engine, "/api/v2/");
    let (status, _) = call(&nested, Method::GET, "/api/v2/health", "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&nested, Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cors_allows_any_origin() {
    let engine = MemoryEngine::calculator(PATH);
    let app = app(&engine, "/api/python");

    let request = Request::builder()
        .uri("/api/python/tyre_suppliers")
        .header(header::ORIGIN, "http://localhost:5173")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );
}
