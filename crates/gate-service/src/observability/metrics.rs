//! Metrics definitions for the meal-log gate.
//!
//! All metrics follow Prometheus naming conventions:
//! - `gate_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `method`: HTTP methods
//! - `endpoint`: known function paths, `/page` for navigations, `/other`
//! - `outcome`: `success` or a `GateError` reason
//! - `policy` / `decision`: the route policy and decision enums
//!
//! Subjects and cookie values never appear in labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize the Prometheus recorder and return the handle used by
/// `/metrics`.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if the recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("gate_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.150, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Identity calls sit on every navigation
        .set_buckets_for_metric(
            Matcher::Prefix("gate_identity_request".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000, 5.000,
            ],
        )
        .map_err(|e| format!("Failed to set identity request buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion.
///
/// Metric: `gate_http_requests_total`, `gate_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("gate_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("gate_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code. Redirects are the gate's normal output.
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        300..=399 => "redirect",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Map a request path onto a bounded set of endpoint labels.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/functions/v1/me" => "/functions/v1/me",
        "/functions/v1/records" => "/functions/v1/records",
        "/functions/v1/auth-user-created" => "/functions/v1/auth-user-created",
        p if p.starts_with("/functions/") => "/other",
        _ => "/page",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record a bearer-token verification.
///
/// Metric: `gate_token_verifications_total`
/// Labels: `outcome` (`success`, `invalid_token`, `expired_token`,
/// `signature_mismatch`, `key_fetch_error`)
pub fn record_token_verification(outcome: &'static str) {
    counter!("gate_token_verifications_total", "outcome" => outcome).increment(1);
}

/// Record a JWKS refresh.
///
/// Metric: `gate_jwks_refresh_total`
/// Labels: `status` (`success`, `error`)
pub fn record_jwks_refresh(status: &'static str) {
    counter!("gate_jwks_refresh_total", "status" => status).increment(1);
}

/// Record an identity-service claims call.
///
/// Metric: `gate_identity_requests_total`, `gate_identity_request_duration_seconds`
/// Labels: `status` (`success`, `error`)
pub fn record_identity_request(status: &'static str, duration: Duration) {
    histogram!("gate_identity_request_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("gate_identity_requests_total", "status" => status).increment(1);
}

// ============================================================================
// Gate Metrics
// ============================================================================

/// Record a navigation decision.
///
/// Metric: `gate_decisions_total`
/// Labels: `policy`, `decision` (`allow`, `redirect`)
pub fn record_gate_decision(policy: &'static str, decision: &'static str) {
    counter!("gate_decisions_total", "policy" => policy, "decision" => decision).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    // These run against the global no-op recorder; they only check that the
    // recording functions do not panic.

    #[test]
    fn test_record_http_request() {
        record_http_request("GET", "/health", 200, Duration::from_millis(5));
        record_http_request("GET", "/record", 307, Duration::from_millis(40));
        record_http_request("GET", "/functions/v1/me", 401, Duration::from_millis(10));
        record_http_request("POST", "/functions/v1/records", 504, Duration::from_secs(30));
    }

    #[test]
    fn test_categorize_status_code() {
        assert_eq!(categorize_status_code(200), "success");
        assert_eq!(categorize_status_code(204), "success");
        assert_eq!(categorize_status_code(307), "redirect");
        assert_eq!(categorize_status_code(408), "timeout");
        assert_eq!(categorize_status_code(504), "timeout");
        assert_eq!(categorize_status_code(401), "error");
        assert_eq!(categorize_status_code(503), "error");
    }

    #[test]
    fn test_normalize_endpoint() {
        assert_eq!(normalize_endpoint("/health"), "/health");
        assert_eq!(normalize_endpoint("/functions/v1/records"), "/functions/v1/records");
        assert_eq!(normalize_endpoint("/functions/v1/upload-image"), "/other");
        assert_eq!(normalize_endpoint("/admin/lessons"), "/page");
        assert_eq!(normalize_endpoint("/record/2024-01-01"), "/page");
    }

    #[test]
    fn test_record_auth_and_gate_metrics() {
        record_token_verification("success");
        record_token_verification("key_fetch_error");
        record_jwks_refresh("success");
        record_jwks_refresh("error");
        record_identity_request("success", Duration::from_millis(30));
        record_identity_request("error", Duration::from_secs(10));
        record_gate_decision("admin", "redirect");
        record_gate_decision("public", "allow");
    }

    #[test]
    fn test_metric_names_reach_recorder() {
        use metrics_util::debugging::DebuggingRecorder;

        // Local recorder, so parallel tests do not share state
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();

        metrics::with_local_recorder(&recorder, || {
            record_http_request("GET", "/record", 307, Duration::from_millis(12));
            record_token_verification("expired_token");
            record_jwks_refresh("success");
            record_identity_request("success", Duration::from_millis(8));
            record_gate_decision("protected", "redirect");
        });

        let names: Vec<String> = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .map(|(key, _, _, _)| key.key().name().to_string())
            .collect();

        for expected in [
            "gate_http_requests_total",
            "gate_http_request_duration_seconds",
            "gate_token_verifications_total",
            "gate_jwks_refresh_total",
            "gate_identity_requests_total",
            "gate_identity_request_duration_seconds",
            "gate_decisions_total",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
    }
}
