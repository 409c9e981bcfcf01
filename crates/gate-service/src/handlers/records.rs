//! Records API boundary.
//!
//! The verified subject is the only tenant key: records are listed and stored
//! for `claims.subject`, whatever the body says.

use crate::auth::Claims;
use crate::errors::GateError;
use crate::models::{CreateRecordRequest, Record, StatusResponse};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use std::sync::Arc;
use tracing::instrument;

/// Handler for GET /functions/v1/records
///
/// Returns the caller's records, newest first.
#[instrument(skip_all, name = "gate.handlers.records.list")]
pub async fn list_records(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<Record>>, GateError> {
    let records = state.record_store.list(&claims.subject).await?;
    tracing::debug!(target: "gate.handlers.records", count = records.len(), "Listed records");
    Ok(Json(records))
}

/// Handler for POST /functions/v1/records
///
/// Numeric fields accept numeric strings. An unparsable body is treated as
/// empty and fails validation, so every bad input yields
/// `400 {"error": "invalid payload"}`.
#[instrument(skip_all, name = "gate.handlers.records.create")]
pub async fn create_record(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
    body: Bytes,
) -> Result<Json<StatusResponse>, GateError> {
    let request: CreateRecordRequest = serde_json::from_slice(&body).unwrap_or_default();

    let record = request.validate().ok_or_else(|| {
        tracing::debug!(target: "gate.handlers.records", "Rejected invalid record payload");
        GateError::BadRequest("invalid payload".to_string())
    })?;

    let stored = state.record_store.insert(&claims.subject, record).await?;
    tracing::debug!(target: "gate.handlers.records", record_id = stored.id, "Stored record");

    Ok(Json(StatusResponse::ok()))
}
