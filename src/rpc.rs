//! HTTP transport: JSON-RPC 2.0 on `/jsonrpc`, the book-and-confirm helper the
//! UI calls, and the static index page.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::services::ServeDir;
use tracing::{debug, error, warn};

use crate::confirm::Confirmer;
use crate::engine::{parse_day_arg, parse_timestamp_arg, Engine, EngineError};
use crate::model::*;
use crate::observability;

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const SERVER_ERROR: i64 = -32000;
/// Application code: a booking found nothing that fits.
pub const NO_SLOT_AVAILABLE: i64 = -32004;

const DEFAULT_DURATION_MINUTES: i64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<Engine>,
    pub confirmer: Arc<dyn Confirmer>,
    pub static_dir: PathBuf,
}

pub fn router(state: AppState) -> Router {
    let assets = ServeDir::new(&state.static_dir);
    Router::new()
        .route("/", get(index))
        .route("/jsonrpc", post(jsonrpc))
        .route("/api/book_and_confirm", post(book_and_confirm))
        .nest_service("/static", assets)
        .with_state(state)
}

// ── JSON-RPC envelope ────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RpcRequest {
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Value,
    #[serde(default)]
    id: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    fn with_data(mut self, data: impl Into<Value>) -> Self {
        self.data = Some(data.into());
        self
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Outcome {
    Result { result: Value },
    Error { error: RpcError },
}

#[derive(Debug, Serialize)]
struct RpcResponse {
    jsonrpc: &'static str,
    #[serde(flatten)]
    outcome: Outcome,
    id: Value,
}

impl RpcResponse {
    fn new(id: Value, outcome: Result<Value, RpcError>) -> Self {
        let outcome = match outcome {
            Ok(result) => Outcome::Result { result },
            Err(error) => Outcome::Error { error },
        };
        Self {
            jsonrpc: "2.0",
            outcome,
            id,
        }
    }
}

async fn jsonrpc(State(state): State<AppState>, body: Bytes) -> Json<RpcResponse> {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            let err = RpcError::new(PARSE_ERROR, "Parse error").with_data(e.to_string());
            return Json(RpcResponse::new(Value::Null, Err(err)));
        }
    };
    let rpc: RpcRequest = match serde_json::from_value(value) {
        Ok(rpc) => rpc,
        Err(e) => {
            let err = RpcError::new(INVALID_REQUEST, "Invalid Request").with_data(e.to_string());
            return Json(RpcResponse::new(Value::Null, Err(err)));
        }
    };
    if rpc.jsonrpc != "2.0" {
        let err = RpcError::new(INVALID_REQUEST, "Invalid Request")
            .with_data(format!("unsupported jsonrpc version {:?}", rpc.jsonrpc));
        return Json(RpcResponse::new(rpc.id, Err(err)));
    }

    let label = observability::method_label(&rpc.method);
    let started = Instant::now();
    debug!("rpc {} params={}", rpc.method, rpc.params);

    let outcome = dispatch(&state.engine, &rpc.method, &rpc.params).await;

    let status = match &outcome {
        Ok(_) => "ok",
        Err(e) if e.code == SERVER_ERROR => "error",
        Err(_) => "rejected",
    };
    metrics::counter!(observability::RPC_REQUESTS_TOTAL, "method" => label, "status" => status)
        .increment(1);
    metrics::histogram!(observability::RPC_DURATION_SECONDS, "method" => label)
        .record(started.elapsed().as_secs_f64());

    Json(RpcResponse::new(rpc.id, outcome))
}

async fn dispatch(engine: &Engine, method: &str, params: &Value) -> Result<Value, RpcError> {
    match method {
        "list_events" => to_result(&engine.list_events().await),

        "get_events_for_day" => {
            let day = require_str(params, "day", "Missing param 'day'")?;
            let day = parse_day_arg(day).map_err(engine_err)?;
            to_result(&engine.events_for_day(day).await)
        }

        "find_free_slot" => {
            let day = require_str(params, "day", "Missing param 'day'")?;
            let day = parse_day_arg(day).map_err(engine_err)?;
            let minutes = duration_param(params)?;
            let slot = engine.find_free_slot(day, minutes).await.map_err(engine_err)?;
            if slot.is_none() {
                metrics::counter!(observability::NO_SLOT_TOTAL).increment(1);
            }
            to_result(&slot)
        }

        "create_event" => {
            const MISSING: &str = "Missing title/start/end";
            let title = require_str(params, "title", MISSING)?;
            let start = require_str(params, "start", MISSING)?;
            let end = require_str(params, "end", MISSING)?;
            let new = NewEvent {
                title: title.to_string(),
                start: parse_timestamp_arg(start).map_err(engine_err)?,
                end: parse_timestamp_arg(end).map_err(engine_err)?,
                attendees: attendees_param(params)?,
                created_by: optional_str(params, "created_by")?.unwrap_or("client").to_string(),
            };
            let event = engine.create_event(new).await.map_err(engine_err)?;
            to_result(&event)
        }

        "book_slot" => {
            let day = require_str(params, "day", "Missing param 'day'")?;
            let day = parse_day_arg(day).map_err(engine_err)?;
            let minutes = duration_param(params)?;
            let title = optional_str(params, "title")?.unwrap_or("Meeting").to_string();
            let attendees = attendees_param(params)?;
            let created_by = optional_str(params, "created_by")?.unwrap_or("client").to_string();
            let event = engine
                .book_slot(day, minutes, title, attendees, created_by)
                .await
                .map_err(engine_err)?;
            metrics::counter!(observability::BOOKINGS_TOTAL).increment(1);
            to_result(&event)
        }

        other => {
            warn!("rpc method not found: {other:?}");
            Err(RpcError::new(METHOD_NOT_FOUND, "Method not found"))
        }
    }
}

fn to_result<T: Serialize>(value: &T) -> Result<Value, RpcError> {
    serde_json::to_value(value).map_err(|e| {
        error!("failed to encode rpc result: {e}");
        RpcError::new(SERVER_ERROR, "Server error").with_data(e.to_string())
    })
}

fn engine_err(e: EngineError) -> RpcError {
    if e.is_invalid_argument() {
        return RpcError::new(INVALID_PARAMS, e.to_string());
    }
    metrics::counter!(observability::NO_SLOT_TOTAL).increment(1);
    RpcError::new(NO_SLOT_AVAILABLE, "No free slot found").with_data(e.to_string())
}

// ── Params ───────────────────────────────────────────────

/// Present, non-empty string. Anything else is reported with `missing`.
fn require_str<'a>(params: &'a Value, key: &str, missing: &str) -> Result<&'a str, RpcError> {
    match params.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.as_str()),
        Some(Value::String(_)) | Some(Value::Null) | None => {
            Err(RpcError::new(INVALID_PARAMS, missing))
        }
        Some(other) => Err(RpcError::new(
            INVALID_PARAMS,
            format!("param '{key}' must be a string, got {other}"),
        )),
    }
}

fn optional_str<'a>(params: &'a Value, key: &str) -> Result<Option<&'a str>, RpcError> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(RpcError::new(
            INVALID_PARAMS,
            format!("param '{key}' must be a string, got {other}"),
        )),
    }
}

/// `duration_minutes`, defaulting to an hour. Integral strings are accepted.
fn duration_param(params: &Value) -> Result<i64, RpcError> {
    let invalid = |v: &Value| {
        RpcError::new(
            INVALID_PARAMS,
            format!("param 'duration_minutes' must be an integer, got {v}"),
        )
    };
    match params.get("duration_minutes") {
        None | Some(Value::Null) => Ok(DEFAULT_DURATION_MINUTES),
        Some(v @ Value::Number(n)) => n.as_i64().ok_or_else(|| invalid(v)),
        Some(v @ Value::String(s)) => s.trim().parse().map_err(|_| invalid(v)),
        Some(v) => Err(invalid(v)),
    }
}

fn attendees_param(params: &Value) -> Result<Vec<String>, RpcError> {
    match params.get("attendees") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(v) => serde_json::from_value(v.clone()).map_err(|_| {
            RpcError::new(INVALID_PARAMS, "param 'attendees' must be a list of strings")
        }),
    }
}

// ── REST helper ──────────────────────────────────────────

/// Error body for the REST routes: `{"detail": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn not_found(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<EngineError> for ApiError {
    fn from(e: EngineError) -> Self {
        if e.is_invalid_argument() {
            return Self::bad_request(e.to_string());
        }
        metrics::counter!(observability::NO_SLOT_TOTAL).increment(1);
        Self::not_found("No free slot found")
    }
}

/// Body that is not JSON, or not a valid booking request.
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub day: String,
    #[serde(default = "default_duration")]
    pub duration_minutes: i64,
    #[serde(default = "default_ui_title")]
    pub title: String,
    #[serde(default)]
    pub attendees: Vec<String>,
}

fn default_duration() -> i64 {
    DEFAULT_DURATION_MINUTES
}

fn default_ui_title() -> String {
    "Booked via UI".into()
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub event: Event,
    pub confirmation: String,
}

/// POST /api/book_and_confirm - book the earliest slot, then describe it.
async fn book_and_confirm(
    State(state): State<AppState>,
    req: Result<Json<BookRequest>, JsonRejection>,
) -> Result<Json<BookResponse>, ApiError> {
    let Json(req) = req?;
    let day = parse_day_arg(&req.day)?;
    let event = state
        .engine
        .book_slot(day, req.duration_minutes, req.title, req.attendees, "ui".into())
        .await?;
    metrics::counter!(observability::BOOKINGS_TOTAL).increment(1);

    // The day lock is already released; a slow model only delays this response.
    let confirmation = state.confirmer.confirm(&event).await;
    Ok(Json(BookResponse {
        event,
        confirmation,
    }))
}

/// GET / - the booking UI.
async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    let path = state.static_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Ok(Html(html)),
        Err(e) => {
            debug!("index unavailable at {}: {e}", path.display());
            Err(ApiError::not_found("Index not found"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_keeps_null_result() {
        let resp = RpcResponse::new(json!(7), Ok(Value::Null));
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(v, json!({"jsonrpc": "2.0", "result": null, "id": 7}));
    }

    #[test]
    fn response_error_shape() {
        let resp = RpcResponse::new(
            json!("a"),
            Err(RpcError::new(METHOD_NOT_FOUND, "Method not found")),
        );
        let v = serde_json::to_value(&resp).unwrap();
        assert_eq!(
            v,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32601, "message": "Method not found"},
                "id": "a"
            })
        );
    }

    #[test]
    fn duration_defaults_and_coerces() {
        assert_eq!(duration_param(&json!({})).unwrap(), 60);
        assert_eq!(duration_param(&json!({"duration_minutes": null})).unwrap(), 60);
        assert_eq!(duration_param(&json!({"duration_minutes": 45})).unwrap(), 45);
        assert_eq!(duration_param(&json!({"duration_minutes": "30"})).unwrap(), 30);
        assert_eq!(duration_param(&json!({"duration_minutes": -5})).unwrap(), -5);
        assert_eq!(
            duration_param(&json!({"duration_minutes": 1.5})).unwrap_err().code,
            INVALID_PARAMS
        );
        assert_eq!(
            duration_param(&json!({"duration_minutes": "soon"})).unwrap_err().code,
            INVALID_PARAMS
        );
    }

    #[test]
    fn require_str_cases() {
        let params = json!({"day": "2025-10-22", "empty": "", "num": 3});
        assert_eq!(require_str(&params, "day", "m").unwrap(), "2025-10-22");
        assert_eq!(require_str(&params, "empty", "m").unwrap_err().message, "m");
        assert_eq!(require_str(&params, "absent", "m").unwrap_err().message, "m");
        assert_eq!(
            require_str(&params, "num", "m").unwrap_err().code,
            INVALID_PARAMS
        );
        // Non-object params behave like an empty object.
        assert!(require_str(&Value::Null, "day", "m").is_err());
    }

    #[test]
    fn attendees_must_be_strings() {
        assert!(attendees_param(&json!({})).unwrap().is_empty());
        assert_eq!(
            attendees_param(&json!({"attendees": ["a@example.com"]})).unwrap(),
            vec!["a@example.com".to_string()]
        );
        assert!(attendees_param(&json!({"attendees": [1, 2]})).is_err());
        assert!(attendees_param(&json!({"attendees": "a@example.com"})).is_err());
    }

    #[test]
    fn engine_errors_map_to_codes() {
        let no_slot = EngineError::NoSlotAvailable {
            day: parse_day("2025-10-22").unwrap(),
            duration_minutes: 60,
        };
        let e = engine_err(no_slot);
        assert_eq!(e.code, NO_SLOT_AVAILABLE);
        assert_eq!(e.message, "No free slot found");

        let e = engine_err(EngineError::InvalidDuration(0));
        assert_eq!(e.code, INVALID_PARAMS);
    }

    #[test]
    fn engine_errors_map_to_statuses() {
        let no_slot = ApiError::from(EngineError::NoSlotAvailable {
            day: parse_day("2025-10-22").unwrap(),
            duration_minutes: 60,
        });
        assert_eq!(no_slot.status, StatusCode::NOT_FOUND);
        assert_eq!(no_slot.detail, "No free slot found");

        for e in [
            EngineError::InvalidDay("soon".into()),
            EngineError::InvalidDuration(-1),
            EngineError::LimitExceeded("title too long"),
        ] {
            assert!(e.is_invalid_argument());
            assert_eq!(ApiError::from(e.clone()).status, StatusCode::BAD_REQUEST);
            assert_eq!(engine_err(e).code, INVALID_PARAMS);
        }
    }

    #[tokio::test]
    async fn dispatch_unknown_method() {
        let engine = Engine::default();
        let err = dispatch(&engine, "delete_event", &json!({})).await.unwrap_err();
        assert_eq!(err.code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn dispatch_find_then_create() {
        let engine = Engine::default();
        let slot = dispatch(
            &engine,
            "find_free_slot",
            &json!({"day": "2025-10-22", "duration_minutes": 30}),
        )
        .await
        .unwrap();
        assert_eq!(
            slot,
            json!({"start": "2025-10-22T09:00:00", "end": "2025-10-22T09:30:00"})
        );

        let event = dispatch(
            &engine,
            "create_event",
            &json!({"title": "Sync", "start": slot["start"], "end": slot["end"]}),
        )
        .await
        .unwrap();
        assert_eq!(event["created_by"], "client");
        assert_eq!(event["attendees"], json!([]));

        let day = dispatch(&engine, "get_events_for_day", &json!({"day": "2025-10-22"}))
            .await
            .unwrap();
        assert_eq!(day.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn dispatch_create_missing_fields() {
        let engine = Engine::default();
        let err = dispatch(&engine, "create_event", &json!({"title": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.code, INVALID_PARAMS);
        assert_eq!(err.message, "Missing title/start/end");
    }
}
