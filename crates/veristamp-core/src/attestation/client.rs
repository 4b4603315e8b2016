//! HTTP client for the remote attestation service.
//!
//! Sends either a JSON body with the image embedded as base64 or a
//! multipart form with the image as a binary part, depending on the shape
//! of the payload the codec produced.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::{Duration, Instant};

use super::service::AttestationService;
use super::wire::{interpret_response, AttestationRequest, ImageMetadata};
use crate::config::AttestationConfig;
use crate::types::{AttestationOutcome, CaptureContext, EncodedPayload, PayloadBody};

/// Attestation over HTTP.
///
/// Cloning is cheap and clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpAttestationClient {
    endpoint: String,
    timeout: Duration,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpAttestationClient {
    pub fn new(config: &AttestationConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Use an existing `reqwest::Client` (and its connection pool).
    pub fn with_client(client: reqwest::Client, config: &AttestationConfig) -> Self {
        Self {
            endpoint: config.endpoint(),
            timeout: Duration::from_millis(config.timeout_ms),
            api_key: config.api_key.as_deref().and_then(resolve_env_var),
            client,
        }
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn multipart_form(
        payload_bytes: &[u8],
        mime_type: &str,
        file_name: &str,
        context: &CaptureContext,
    ) -> Result<Form, reqwest::Error> {
        let image = Part::bytes(payload_bytes.to_vec())
            .file_name(file_name.to_string())
            .mime_str(mime_type)?;

        let mut form = Form::new()
            .part("image", image)
            .text("timestamp", context.captured_at_epoch_millis.to_string());
        if let Some(latitude) = context.latitude {
            form = form.text("latitude", latitude.to_string());
        }
        if let Some(longitude) = context.longitude {
            form = form.text("longitude", longitude.to_string());
        }
        Ok(form
            .text("device_model", context.device_model.clone())
            .text("app_version", context.app_version.clone()))
    }
}

#[async_trait]
impl AttestationService for HttpAttestationClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit(
        &self,
        payload: &EncodedPayload,
        context: &CaptureContext,
    ) -> AttestationOutcome {
        let start = Instant::now();
        let mut request = self.client.post(&self.endpoint).timeout(self.timeout);
        if let Some(ref key) = self.api_key {
            request = request.bearer_auth(key);
        }

        let request = match &payload.body {
            PayloadBody::Base64 { data } => request.json(&AttestationRequest {
                image_data: data,
                metadata: ImageMetadata::from_context(context),
            }),
            PayloadBody::Binary {
                bytes,
                mime_type,
                file_name,
            } => match Self::multipart_form(bytes, mime_type, file_name, context) {
                Ok(form) => request.multipart(form),
                Err(e) => {
                    return AttestationOutcome::TransportFailure {
                        cause: format!("Failed to build multipart request: {e}"),
                    }
                }
            },
        };

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                let cause = if e.is_timeout() {
                    format!(
                        "Attestation request timed out after {}ms",
                        self.timeout.as_millis()
                    )
                } else if e.is_connect() {
                    format!("Cannot connect to attestation service: {e}")
                } else {
                    format!("Attestation request failed: {e}")
                };
                tracing::debug!("POST {} failed: {}", self.endpoint, cause);
                return AttestationOutcome::TransportFailure { cause };
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return AttestationOutcome::TransportFailure {
                    cause: format!("Failed to read attestation response: {e}"),
                }
            }
        };

        tracing::debug!(
            "POST {} -> {} in {:?}",
            self.endpoint,
            status,
            start.elapsed()
        );
        interpret_response(status.as_u16(), &body)
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok()
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
