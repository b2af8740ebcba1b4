//! Typed upstream response bodies
//!
//! Bodies are decoded to `serde_json::Value` first and checked here once, so a
//! wrong shape is reported as a `Shape` error rather than a generic decode error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::FetchError;

pub const STATE_ENDPOINT: &str = "/api/state";
pub const MAPPINGS_ENDPOINT: &str = "/api/mappings";

/// `GET /api/state`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateResponse {
    pub odds: String,
}

/// `GET /api/mappings`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingsResponse {
    pub mappings: String,
}

/// A state/mapping pair fetched within the same attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedPayload {
    pub state: StateResponse,
    pub mappings: MappingsResponse,
}

pub fn validate_state_response(body: &Value) -> Result<StateResponse, FetchError> {
    string_field(body, "odds", STATE_ENDPOINT).map(|odds| StateResponse { odds })
}

pub fn validate_mappings_response(body: &Value) -> Result<MappingsResponse, FetchError> {
    string_field(body, "mappings", MAPPINGS_ENDPOINT).map(|mappings| MappingsResponse { mappings })
}

/// Both payloads must be non-empty to be worth decoding together
pub fn validate_consistency(
    state: &StateResponse,
    mappings: &MappingsResponse,
) -> Result<(), FetchError> {
    if state.odds.is_empty() {
        return Err(FetchError::Consistency("empty odds payload".to_string()));
    }
    if mappings.mappings.is_empty() {
        return Err(FetchError::Consistency("empty mappings payload".to_string()));
    }
    Ok(())
}

fn string_field(body: &Value, field: &str, endpoint: &'static str) -> Result<String, FetchError> {
    let object = body.as_object().ok_or_else(|| FetchError::Shape {
        endpoint,
        reason: "body is not a JSON object".to_string(),
    })?;

    match object.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(FetchError::Shape {
            endpoint,
            reason: format!("field `{field}` is not a string"),
        }),
        None => Err(FetchError::Shape {
            endpoint,
            reason: format!("missing field `{field}`"),
        }),
    }
}
