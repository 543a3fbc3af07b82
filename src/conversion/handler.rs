use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::api::{ErrorResponse, MessageResponse};
use crate::handler::AppState;
use crate::model::NewConversion;
use crate::store::StoreError;
use crate::unpack_error;
use crate::validation::missing_fields;

const SAVE_FAILED: &str = "failed to save conversion";
const LOAD_FAILED: &str = "failed to load history";
const DELETE_FAILED: &str = "failed to delete conversion";
const DELETED: &str = "conversion deleted";
const INVALID_BODY: &str = "invalid JSON body";

fn success<T: Serialize>(data: T) -> Response {
    (StatusCode::OK, Json(data)).into_response()
}

fn bad_request(msg: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn internal_error(msg: &str) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: msg.to_string(),
        }),
    )
        .into_response()
}

fn store_failure(msg: &str, err: StoreError) -> Response {
    tracing::error!(error = %unpack_error(&err), "{}", msg);
    internal_error(msg)
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| {
            let mime = mime.trim().to_ascii_lowercase();
            mime == "application/json" || mime.ends_with("+json")
        })
        .unwrap_or(false)
}

/// Reads the request body as JSON only when it is declared as JSON. Any
/// other content type, or an empty body, reads as an empty object.
fn read_payload(headers: &HeaderMap, body: &Bytes) -> Result<JsonValue, serde_json::Error> {
    if !is_json(headers) || body.iter().all(u8::is_ascii_whitespace) {
        return Ok(JsonValue::Object(Default::default()));
    }
    serde_json::from_slice(body)
}

pub async fn create_conversion(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let payload = match read_payload(&headers, &body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(error = %e, "rejected malformed conversion body");
            return bad_request(INVALID_BODY);
        }
    };

    let input = match NewConversion::from_payload(&payload) {
        Ok(input) => input,
        Err(e) => return store_failure(SAVE_FAILED, e.into()),
    };

    let missing = missing_fields(&state.required_fields, &input);
    if !missing.is_empty() {
        tracing::warn!(?missing, "rejected conversion with missing fields");
        return bad_request(&format!("missing required fields: {}", missing.join(", ")));
    }

    match state.store.create(input).await {
        Ok(record) => {
            tracing::info!(id = %record.id, "saved conversion");
            success(record)
        }
        Err(e) => store_failure(SAVE_FAILED, e),
    }
}

pub async fn list_conversions(State(state): State<AppState>) -> Response {
    match state.store.list().await {
        Ok(records) => {
            tracing::info!(count = records.len(), "loaded history");
            success(records)
        }
        Err(e) => store_failure(LOAD_FAILED, e),
    }
}

/// Deletes unconditionally: an id that matches nothing gets the same
/// confirmation as one that removed a record.
pub async fn delete_conversion(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.store.delete(&id).await {
        Ok(removed) => {
            tracing::info!(%id, removed, "deleted conversion");
            success(MessageResponse {
                message: DELETED.to_string(),
            })
        }
        Err(e) => store_failure(DELETE_FAILED, e),
    }
}
