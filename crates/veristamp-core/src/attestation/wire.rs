//! Request and response bodies of the attestation HTTP API.
//!
//! Field names are part of the service contract and must not change.

use serde::{Deserialize, Serialize};

use crate::types::{AttestationOutcome, CameraInfo, CaptureContext};

/// JSON request body: `{ "image_data": ..., "metadata": { ... } }`.
#[derive(Debug, Serialize)]
pub struct AttestationRequest<'a> {
    /// Base64-encoded JPEG, no line wraps
    pub image_data: &'a str,
    pub metadata: ImageMetadata<'a>,
}

/// Capture metadata as sent in JSON mode.
#[derive(Debug, Serialize)]
pub struct ImageMetadata<'a> {
    pub timestamp: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_model: &'a str,
    pub app_version: &'a str,
    /// Empty when the device has no provisioned identifier
    pub device_id: &'a str,
    pub camera_info: Option<&'a CameraInfo>,
}

impl<'a> ImageMetadata<'a> {
    pub fn from_context(context: &'a CaptureContext) -> Self {
        Self {
            timestamp: context.captured_at_epoch_millis,
            latitude: context.latitude,
            longitude: context.longitude,
            device_model: &context.device_model,
            app_version: &context.app_version,
            device_id: context.device_id.as_deref().unwrap_or_default(),
            camera_info: context.camera_info.as_ref(),
        }
    }
}

/// Body of a 2xx response.
///
/// Everything except `success` is optional at parse time so that a
/// `success: false` body still deserializes; required fields are checked
/// in [`interpret_response`].
#[derive(Debug, Deserialize)]
pub struct AttestationResponse {
    pub success: bool,
    #[serde(default)]
    pub attestation_id: Option<String>,
    #[serde(default)]
    pub qr_data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of a non-2xx response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<i64>,
}

impl ApiErrorResponse {
    fn describe(&self) -> String {
        let mut text = match self.message.as_deref() {
            Some(message) if !message.is_empty() => format!("{}: {}", self.error, message),
            _ => self.error.clone(),
        };
        if let Some(code) = self.code {
            text.push_str(&format!(" (code {code})"));
        }
        text
    }
}

/// Map an HTTP status and raw body to an outcome.
///
/// - 2xx with `success: true` and both identifiers present: `Attested`
///   (an empty `qr_data` is a rejection, never an attestation).
/// - 2xx with `success: false`: `Rejected`.
/// - 2xx with an unreadable body or missing fields: `TransportFailure`.
/// - 5xx and 429: `TransportFailure`, the service is not in a state to judge.
/// - Other non-2xx: `Rejected`, with the error body's text when it has one.
pub fn interpret_response(status: u16, body: &[u8]) -> AttestationOutcome {
    if (200..300).contains(&status) {
        return interpret_success_status(status, body);
    }

    let error_body = serde_json::from_slice::<ApiErrorResponse>(body).ok();
    let detail = error_body
        .as_ref()
        .map(ApiErrorResponse::describe)
        .unwrap_or_else(|| status_text(status));

    if status == 429 || (500..=599).contains(&status) {
        let cause = match error_body {
            Some(_) => format!("HTTP {status}: {detail}"),
            None => detail,
        };
        AttestationOutcome::TransportFailure { cause }
    } else {
        AttestationOutcome::Rejected {
            reason: detail,
            http_status: Some(status),
        }
    }
}

fn interpret_success_status(status: u16, body: &[u8]) -> AttestationOutcome {
    let response: AttestationResponse = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(e) => {
            return AttestationOutcome::TransportFailure {
                cause: format!("Malformed attestation response: {e}"),
            }
        }
    };

    if !response.success {
        let reason = response
            .error
            .or(response.message)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "Attestation declined".to_string());
        return AttestationOutcome::Rejected {
            reason,
            http_status: Some(status),
        };
    }

    let (attestation_id, qr_data) = match (response.attestation_id, response.qr_data) {
        (Some(id), Some(qr)) => (id, qr),
        _ => {
            return AttestationOutcome::TransportFailure {
                cause: "Malformed attestation response: missing attestation_id or qr_data"
                    .to_string(),
            }
        }
    };

    if qr_data.is_empty() {
        return AttestationOutcome::Rejected {
            reason: "Service attested the image but returned no code payload".to_string(),
            http_status: Some(status),
        };
    }

    AttestationOutcome::Attested {
        attestation_id,
        code_payload: qr_data,
        server_timestamp: response.timestamp,
        signature: response.signature,
        message: response.message,
    }
}

fn status_text(status: u16) -> String {
    match reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
    {
        Some(reason) => format!("HTTP {status} {reason}"),
        None => format!("HTTP {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CameraType;
    use std::path::PathBuf;

    fn context() -> CaptureContext {
        CaptureContext {
            image_path: PathBuf::from("/captures/a.jpg"),
            captured_at_epoch_millis: 1_700_000_000_123,
            latitude: None,
            longitude: Some(13.4),
            device_model: "Pixel 8".to_string(),
            app_version: "1.0".to_string(),
            device_id: None,
            camera_info: None,
        }
    }

    #[test]
    fn test_request_field_names() {
        let ctx = context();
        let request = AttestationRequest {
            image_data: "QUJD",
            metadata: ImageMetadata::from_context(&ctx),
        };
        let json: serde_json::Value = serde_json::to_value(&request).unwrap();
        assert_eq!(json["image_data"], "QUJD");
        let meta = &json["metadata"];
        assert_eq!(meta["timestamp"], 1_700_000_000_123i64);
        assert!(meta["latitude"].is_null());
        assert_eq!(meta["longitude"], 13.4);
        assert_eq!(meta["device_model"], "Pixel 8");
        assert_eq!(meta["app_version"], "1.0");
        assert_eq!(meta["device_id"], "");
        assert!(meta["camera_info"].is_null());
    }

    #[test]
    fn test_request_with_camera_info() {
        let mut ctx = context();
        ctx.camera_info = Some(CameraInfo {
            resolution: "4000x3000".to_string(),
            camera_type: CameraType::Back,
            flash_used: true,
        });
        let json = serde_json::to_value(ImageMetadata::from_context(&ctx)).unwrap();
        assert_eq!(json["camera_info"]["resolution"], "4000x3000");
        assert_eq!(json["camera_info"]["camera_type"], "back");
        assert_eq!(json["camera_info"]["flash_used"], true);
    }

    #[test]
    fn test_minimal_success() {
        let outcome = interpret_response(
            200,
            br#"{"success":true,"attestation_id":"abc","qr_data":"XYZ123"}"#,
        );
        assert_eq!(
            outcome,
            AttestationOutcome::Attested {
                attestation_id: "abc".to_string(),
                code_payload: "XYZ123".to_string(),
                server_timestamp: None,
                signature: None,
                message: None,
            }
        );
    }

    #[test]
    fn test_full_success() {
        let body = br#"{"success":true,"attestation_id":"abc","qr_data":"XYZ","message":"ok",
            "timestamp":1700000000999,"signature":"sig"}"#;
        match interpret_response(201, body) {
            AttestationOutcome::Attested {
                server_timestamp,
                signature,
                message,
                ..
            } => {
                assert_eq!(server_timestamp, Some(1_700_000_000_999));
                assert_eq!(signature.as_deref(), Some("sig"));
                assert_eq!(message.as_deref(), Some("ok"));
            }
            other => panic!("Expected Attested, got {other:?}"),
        }
    }

    #[test]
    fn test_success_false_is_rejected() {
        let body = br#"{"success":false,"message":"image already attested"}"#;
        assert_eq!(
            interpret_response(200, body),
            AttestationOutcome::Rejected {
                reason: "image already attested".to_string(),
                http_status: Some(200),
            }
        );
    }

    #[test]
    fn test_empty_qr_data_is_rejected() {
        let body = br#"{"success":true,"attestation_id":"abc","qr_data":""}"#;
        assert!(matches!(
            interpret_response(200, body),
            AttestationOutcome::Rejected { .. }
        ));
    }

    #[test]
    fn test_missing_fields_is_transport_failure() {
        let body = br#"{"success":true,"attestation_id":"abc"}"#;
        assert!(matches!(
            interpret_response(200, body),
            AttestationOutcome::TransportFailure { .. }
        ));
    }

    #[test]
    fn test_malformed_body_is_transport_failure() {
        match interpret_response(200, b"<html>gateway</html>") {
            AttestationOutcome::TransportFailure { cause } => {
                assert!(cause.contains("Malformed"));
            }
            other => panic!("Expected TransportFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_service_unavailable_is_transport_failure() {
        match interpret_response(503, b"") {
            AttestationOutcome::TransportFailure { cause } => {
                assert!(cause.contains("503"));
            }
            other => panic!("Expected TransportFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_rate_limit_is_transport_failure() {
        let body = br#"{"error":"rate_limited","message":"slow down"}"#;
        assert!(matches!(
            interpret_response(429, body),
            AttestationOutcome::TransportFailure { .. }
        ));
    }

    #[test]
    fn test_error_body_is_rejected() {
        let body = br#"{"error":"invalid_image","message":"no EXIF timestamp","code":42}"#;
        assert_eq!(
            interpret_response(422, body),
            AttestationOutcome::Rejected {
                reason: "invalid_image: no EXIF timestamp (code 42)".to_string(),
                http_status: Some(422),
            }
        );
    }

    #[test]
    fn test_client_error_without_body_is_rejected() {
        assert_eq!(
            interpret_response(404, b""),
            AttestationOutcome::Rejected {
                reason: "HTTP 404 Not Found".to_string(),
                http_status: Some(404),
            }
        );
    }
}
