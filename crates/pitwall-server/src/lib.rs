//! HTTP surface of the race calculator.
//!
//! Every route answers `200 OK` with a JSON envelope: `{"success": true, ...}` on
//! success, `{"success": false, "message": ...}` on any failure. Engine work runs
//! on the blocking pool while the [`Bridge`] serializes access to the workbook.

pub mod config;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::{get, post};
use pitwall_bridge::payload::{DriverCarUpdate, SetupRequest, SetupWeatherUpdate, StrategyRequest};
use pitwall_bridge::{Bridge, BridgeError, orchestrator};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tower_http::cors::{Any, CorsLayer};

pub const DEFAULT_PREFIX: &str = "/api/python";

#[derive(Clone)]
pub struct AppState {
    bridge: Arc<Bridge>,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }

    /// Run a bridge call on the blocking pool inside a request span.
    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, BridgeError>
    where
        T: Send + 'static,
        F: FnOnce(&Bridge) -> Result<T, BridgeError> + Send + 'static,
    {
        let bridge = self.bridge.clone();
        let span = tracing::info_span!("request", op);
        tokio::task::spawn_blocking(move || span.in_scope(|| f(&bridge)))
            .await
            .unwrap_or_else(|err| {
                Err(BridgeError::ConnectionUnavailable {
                    message: format!("request worker failed: {err}"),
                    source: None,
                })
            })
    }
}

/// All routes, mounted under `prefix` (`""` or `"/"` mounts at the root).
pub fn router(bridge: Arc<Bridge>, prefix: &str) -> Router {
    let api = Router::new()
        .route("/state", get(state))
        .route("/strategy/state", get(state))
        .route("/update_driver_car", post(update_driver_car))
        .route("/update_setup_weather", post(update_setup_weather))
        .route("/setup/calculate", post(calculate_setup))
        .route("/strategy/calculate", post(calculate_strategy))
        .route("/tracks", get(tracks))
        .route("/tyre_suppliers", get(tyre_suppliers))
        .route("/health", get(health))
        .with_state(AppState::new(bridge));

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let prefix = prefix.trim_end_matches('/');
    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(prefix, api)
    };
    app.layer(cors)
}

/// Decode a request body; an empty body or `null` is the default payload.
fn decode<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, BridgeError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| BridgeError::malformed(e.to_string()))?;
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value).map_err(|e| BridgeError::malformed(e.to_string()))
}

/// Build the response envelope; `key` names the field carrying the payload.
fn envelope<T: Serialize>(op: &str, result: Result<T, BridgeError>, key: Option<&str>) -> Json<Value> {
    let mut body = Map::new();
    match result.and_then(|data| {
        serde_json::to_value(data).map_err(|e| BridgeError::malformed(format!("encoding response: {e}")))
    }) {
        Ok(data) => {
            body.insert("success".into(), Value::Bool(true));
            match (key, data) {
                (Some(key), data) => {
                    body.insert(key.into(), data);
                }
                (None, Value::Object(fields)) => body.extend(fields),
                (None, _) => {}
            }
        }
        Err(err) => {
            tracing::warn!(op, error = %err, "request failed");
            body.insert("success".into(), Value::Bool(false));
            body.insert("message".into(), Value::String(err.to_string()));
        }
    }
    Json(Value::Object(body))
}

async fn state(State(app): State<AppState>) -> Json<Value> {
    let result = app.run("state", |bridge| bridge.read_state()).await;
    envelope("state", result, Some("data"))
}

async fn update_driver_car(State(app): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<DriverCarUpdate>(&body) {
        Ok(update) => {
            app.run("update_driver_car", move |bridge| bridge.update_driver_car(&update))
                .await
        }
        Err(err) => Err(err),
    };
    envelope("update_driver_car", result, None)
}

async fn update_setup_weather(State(app): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<SetupWeatherUpdate>(&body) {
        Ok(update) => {
            app.run("update_setup_weather", move |bridge| {
                bridge.update_setup_weather(&update)
            })
            .await
        }
        Err(err) => Err(err),
    };
    envelope("update_setup_weather", result, None)
}

async fn calculate_setup(State(app): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<SetupRequest>(&body) {
        Ok(request) => {
            app.run("calculate_setup", move |bridge| bridge.calculate_setup(&request))
                .await
        }
        Err(err) => Err(err),
    };
    envelope("calculate_setup", result, Some("data"))
}

async fn calculate_strategy(State(app): State<AppState>, body: Bytes) -> Json<Value> {
    let result = match decode::<StrategyRequest>(&body) {
        Ok(request) => {
            app.run("calculate_strategy", move |bridge| {
                bridge.calculate_strategy(&request)
            })
            .await
        }
        Err(err) => Err(err),
    };
    envelope("calculate_strategy", result, Some("data"))
}

async fn tracks(State(app): State<AppState>) -> Json<Value> {
    let result = app.run("tracks", |bridge| bridge.list_tracks()).await;
    envelope("tracks", result, Some("tracks"))
}

async fn tyre_suppliers() -> Json<Value> {
    envelope("tyre_suppliers", Ok(orchestrator::tyre_suppliers()), Some("suppliers"))
}

/// Reads the published connection status; does not queue behind engine calls.
async fn health(State(app): State<AppState>) -> Json<Value> {
    Json(json!({"success": true, "connection": app.bridge.status()}))
}
