//! The attestation service seam.

use async_trait::async_trait;

use crate::types::{AttestationOutcome, CaptureContext, EncodedPayload};

/// Anything that can attest an encoded image.
///
/// Implementations must be safe to share between concurrent pipeline
/// invocations and must not retry internally: every call maps to exactly one
/// outcome. Uses `async_trait` so the pipeline can hold an
/// `Arc<dyn AttestationService>`.
#[async_trait]
pub trait AttestationService: Send + Sync {
    /// Service name for logging.
    fn name(&self) -> &str;

    /// Submit one image with its capture metadata.
    async fn submit(&self, payload: &EncodedPayload, context: &CaptureContext)
        -> AttestationOutcome;
}
