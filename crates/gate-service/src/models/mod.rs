//! Gate service models.
//!
//! Request and response bodies of the function endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Maximum length of a food name, in characters.
pub const MAX_FOOD_NAME_CHARS: usize = 200;

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Error message (generic, no configuration details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Response for `/functions/v1/me`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeResponse {
    pub subject: String,
    pub privileged: bool,
    pub expires_at: i64,
}

/// Finite number from a JSON number or a numeric string.
fn coerce_number(value: Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?.and_then(coerce_number))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .and_then(coerce_number)
        .filter(|n| n.fract() == 0.0 && n.abs() < 9.0e15)
        .map(|n| n as i64))
}

/// Body of `POST /functions/v1/records`.
///
/// Every field is optional here and checked by
/// [`CreateRecordRequest::validate`]. Owner fields sent by the client are not
/// part of this type and are dropped on deserialization.
///
/// Numeric fields also accept numeric strings (`"0.5"`). A value that is not
/// a number counts as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateRecordRequest {
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub weight_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub intake_kcal: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub exercise_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub duration_minutes: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub burned_kcal: Option<f64>,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A validated record, ready to store.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub food_name: String,
    pub weight_kg: f64,
    pub intake_kcal: f64,
    pub exercise_id: Option<i64>,
    pub duration_minutes: Option<f64>,
    pub burned_kcal: Option<f64>,
    pub memo: Option<String>,
    pub image_url: Option<String>,
}

impl CreateRecordRequest {
    /// Validate and normalize the request.
    ///
    /// The food name is truncated to [`MAX_FOOD_NAME_CHARS`] characters and
    /// trimmed; it must then be non-empty. `weight_kg` must be positive and
    /// `intake_kcal` non-negative (a missing value counts as zero).
    pub fn validate(self) -> Option<NewRecord> {
        let food_name: String = self
            .food_name
            .unwrap_or_default()
            .chars()
            .take(MAX_FOOD_NAME_CHARS)
            .collect::<String>()
            .trim()
            .to_string();
        let weight_kg = self.weight_kg.unwrap_or(0.0);
        let intake_kcal = self.intake_kcal.unwrap_or(0.0);

        if food_name.is_empty() || weight_kg <= 0.0 || intake_kcal < 0.0 {
            return None;
        }

        Some(NewRecord {
            food_name,
            weight_kg,
            intake_kcal,
            exercise_id: self.exercise_id,
            duration_minutes: self.duration_minutes,
            burned_kcal: self.burned_kcal,
            memo: self.memo,
            image_url: self.image_url,
        })
    }
}

/// A stored record as returned by `GET /functions/v1/records`.
///
/// The owner is not serialized; it is always the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub food_name: String,
    pub weight_kg: f64,
    pub intake_kcal: f64,
    pub exercise_id: Option<i64>,
    pub duration_minutes: Option<f64>,
    pub burned_kcal: Option<f64>,
    pub memo: Option<String>,
    pub image_url: Option<String>,
    pub create_date: DateTime<Utc>,
}

/// Response for `POST /functions/v1/upload-image`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadImageResponse {
    pub success: bool,
    pub uuid: String,
    pub original_url: String,
    /// Equal to `original_url` when no thumbnail was produced.
    pub thumbnail_url: String,
    pub bucket: String,
}

/// Generic `{"status": "ok"}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

impl StatusResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}
