//! Pipeline orchestration - wires together all stages for one capture.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::attestation::{AttestationService, HttpAttestationClient};
use crate::config::{Config, DeviceConfig};
use crate::error::{PipelineError, StageResult};
use crate::types::{
    AttestationOutcome, AttestedCapture, CameraInfo, EncodedPayload, FailureKind, Location,
    PipelineResult,
};

use super::cancel::CancelFlag;
use super::codec::ImageCodec;
use super::compositor::Compositor;
use super::metadata::MetadataBuilder;
use super::qr::CodeGenerator;

/// Runs captures through metadata, encoding, attestation, QR generation and
/// compositing.
///
/// Holds no per-capture state, so one instance can serve any number of
/// concurrent invocations; the only shared resource is the attestation
/// service's connection pool.
pub struct AttestationPipeline {
    codec: ImageCodec,
    code_generator: CodeGenerator,
    compositor: Compositor,
    service: Arc<dyn AttestationService>,
    device: DeviceConfig,
}

impl AttestationPipeline {
    /// Create a pipeline that talks to the configured HTTP service.
    pub fn new(config: &Config) -> Self {
        let client = HttpAttestationClient::new(&config.attestation);
        Self::with_service(config, Arc::new(client))
    }

    /// Create a pipeline around any attestation service.
    pub fn with_service(config: &Config, service: Arc<dyn AttestationService>) -> Self {
        Self {
            codec: ImageCodec::new(config.codec.clone(), config.attestation.transport),
            code_generator: CodeGenerator::new(&config.overlay),
            compositor: Compositor::new(&config.overlay),
            service,
            device: config.device.clone(),
        }
    }

    /// Attest the image at `image_path` and stamp it with its verification code.
    pub async fn attest_and_annotate(
        &self,
        image_path: &Path,
        location: Option<Location>,
    ) -> PipelineResult {
        self.attest_and_annotate_with_cancel(image_path, location, &CancelFlag::default())
            .await
    }

    /// Like [`attest_and_annotate`](Self::attest_and_annotate), stopping before
    /// the upload if `cancel` has been set.
    ///
    /// Every step short-circuits: the first failure is returned and no later
    /// stage runs. A `Success` is only produced for an attested image.
    pub async fn attest_and_annotate_with_cancel(
        &self,
        image_path: &Path,
        location: Option<Location>,
        cancel: &CancelFlag,
    ) -> PipelineResult {
        let start = Instant::now();
        tracing::debug!("Attesting: {:?}", image_path);

        // Metadata
        let context = MetadataBuilder::build(
            image_path,
            chrono::Utc::now().timestamp_millis(),
            location,
            self.device.model.clone(),
            self.device.app_version.clone(),
            self.device.device_id.clone(),
        );

        // Encode
        let encode_start = Instant::now();
        let (payload, camera_info) = match self.encode(image_path).await {
            Ok(encoded) => encoded,
            Err(e) => {
                tracing::warn!("Encoding failed for {:?}: {}", image_path, e);
                return PipelineResult::failure(
                    FailureKind::Encoding,
                    format!("Could not prepare the image: {e}"),
                );
            }
        };
        let context = match camera_info {
            Some(info) => context.with_camera_info(info),
            None => context,
        };
        tracing::trace!("  Encode: {:?}", encode_start.elapsed());

        if cancel.is_cancelled() {
            tracing::debug!("Cancelled before upload: {:?}", image_path);
            return PipelineResult::failure(
                FailureKind::Cancelled,
                "Cancelled before the image was sent",
            );
        }

        // Attest
        let submit_start = Instant::now();
        let outcome = self.service.submit(&payload, &context).await;
        tracing::trace!(
            "  Attest ({}): {:?}",
            self.service.name(),
            submit_start.elapsed()
        );

        let (attestation_id, code_payload, server_timestamp, signature) = match outcome {
            AttestationOutcome::Attested {
                attestation_id,
                code_payload,
                server_timestamp,
                signature,
                ..
            } => (attestation_id, code_payload, server_timestamp, signature),
            AttestationOutcome::Rejected {
                reason,
                http_status,
            } => {
                tracing::warn!(
                    "Attestation rejected for {:?} (status {:?}): {}",
                    image_path,
                    http_status,
                    reason
                );
                return PipelineResult::failure(
                    FailureKind::Rejected,
                    format!("Server rejected this image: {reason}"),
                );
            }
            AttestationOutcome::TransportFailure { cause } => {
                tracing::warn!("Attestation transport failure for {:?}: {}", image_path, cause);
                return PipelineResult::failure(
                    FailureKind::Transport,
                    format!("Network problem, try again: {cause}"),
                );
            }
        };

        // QR code
        let code = match self.code_generator.generate(&code_payload) {
            Ok(code) => code,
            Err(e) => {
                tracing::warn!("Code generation failed for {}: {}", attestation_id, e);
                return PipelineResult::failure(
                    FailureKind::CodeGeneration,
                    format!("Could not render the attestation code: {e}"),
                );
            }
        };

        // Reload the original and composite
        let composite_start = Instant::now();
        let codec = self.codec.clone();
        let compositor = self.compositor.clone();
        let path = image_path.to_path_buf();
        let composited = run_blocking("composite", move || {
            let original = codec.load(&path).map_err(|e| PipelineError::Composition {
                message: format!("Cannot reload original: {e}"),
            })?;
            compositor.composite(&original, &code)
        })
        .await;
        let composited_image = match composited {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!("Composition failed for {:?}: {}", image_path, e);
                return PipelineResult::failure(
                    FailureKind::Composition,
                    format!("Could not stamp the image: {e}"),
                );
            }
        };
        tracing::trace!("  Composite: {:?}", composite_start.elapsed());

        tracing::debug!(
            "Attested {:?} as {} in {:?} ({}x{})",
            image_path,
            attestation_id,
            start.elapsed(),
            composited_image.width(),
            composited_image.height()
        );

        PipelineResult::Success(Box::new(AttestedCapture {
            composited_image,
            human_message: format!("Image attested with QR code (attestation {attestation_id})"),
            attestation_id,
            server_timestamp,
            signature,
            payload_hash: payload.content_hash,
        }))
    }

    /// Encode on the blocking pool, reading camera info alongside if enabled.
    async fn encode(
        &self,
        image_path: &Path,
    ) -> StageResult<(EncodedPayload, Option<CameraInfo>)> {
        let codec = self.codec.clone();
        let path = image_path.to_path_buf();
        let camera_type = self.device.camera_type;
        let attach_camera_info = self.device.attach_camera_info;

        run_blocking("encode", move || {
            let payload = codec.encode(&path)?;
            let camera_info = attach_camera_info.then(|| {
                let (width, height) =
                    image::image_dimensions(&path).unwrap_or((payload.width, payload.height));
                MetadataBuilder::camera_info(&path, width, height, camera_type)
            });
            Ok((payload, camera_info))
        })
        .await
    }
}

/// Run a blocking stage on the tokio blocking pool.
async fn run_blocking<T, F>(stage: &str, f: F) -> StageResult<T>
where
    F: FnOnce() -> StageResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::Task {
            stage: stage.to_string(),
            message: e.to_string(),
        })?
}
