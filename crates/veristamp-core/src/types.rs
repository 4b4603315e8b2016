//! Core data types for the Veristamp attestation pipeline.
//!
//! These types carry a capture from its raw form, through the attestation
//! service, to the final stamped image handed to a persistence sink.

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// A geolocation fix supplied by the host.
///
/// Both coordinates are independently optional: a coarse or partial fix is
/// still forwarded as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: Some(latitude),
            longitude: Some(longitude),
        }
    }
}

/// Which camera took the photo.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraType {
    #[default]
    Back,
    Front,
}

/// Optional description of the capturing camera sent alongside the metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraInfo {
    /// Source resolution as `"<width>x<height>"`
    pub resolution: String,
    pub camera_type: CameraType,
    pub flash_used: bool,
}

/// Contextual metadata for a single capture.
///
/// Built once per pipeline invocation by
/// [`MetadataBuilder`](crate::pipeline::MetadataBuilder) and never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureContext {
    pub image_path: PathBuf,
    pub captured_at_epoch_millis: i64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub device_model: String,
    pub app_version: String,
    pub device_id: Option<String>,
    pub camera_info: Option<CameraInfo>,
}

impl CaptureContext {
    pub(crate) fn with_camera_info(self, camera_info: CameraInfo) -> Self {
        Self {
            camera_info: Some(camera_info),
            ..self
        }
    }
}

/// The re-encoded image, ready for transmission.
#[derive(Debug, Clone)]
pub struct EncodedPayload {
    /// Width of the (possibly downsampled) image
    pub width: u32,
    /// Height of the (possibly downsampled) image
    pub height: u32,
    /// BLAKE3 hash of the encoded bytes, hex
    pub content_hash: String,
    /// Wire representation of the bytes
    pub body: PayloadBody,
}

/// Wire representation of an encoded image. One variant is used per deployment.
#[derive(Clone)]
pub enum PayloadBody {
    /// Raw bytes for a multipart upload
    Binary {
        bytes: Vec<u8>,
        mime_type: String,
        file_name: String,
    },
    /// Standard base64 (no line wraps) for embedding in a JSON body
    Base64 { data: String },
}

impl fmt::Debug for PayloadBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadBody::Binary {
                bytes,
                mime_type,
                file_name,
            } => f
                .debug_struct("Binary")
                .field("len", &bytes.len())
                .field("mime_type", mime_type)
                .field("file_name", file_name)
                .finish(),
            PayloadBody::Base64 { data } => {
                f.debug_struct("Base64").field("len", &data.len()).finish()
            }
        }
    }
}

/// What the attestation service said about a submitted image.
#[derive(Debug, Clone, PartialEq)]
pub enum AttestationOutcome {
    /// The service verified the image. `code_payload` is never empty.
    Attested {
        attestation_id: String,
        code_payload: String,
        server_timestamp: Option<i64>,
        signature: Option<String>,
        message: Option<String>,
    },
    /// The service was reached and declined the request.
    Rejected {
        reason: String,
        http_status: Option<u16>,
    },
    /// No usable answer: unreachable, timed out, or an unreadable response.
    TransportFailure { cause: String },
}

impl AttestationOutcome {
    pub fn is_attested(&self) -> bool {
        matches!(self, AttestationOutcome::Attested { .. })
    }
}

/// The photo with its verification code drawn in, as a fresh pixel buffer.
#[derive(Debug, Clone)]
pub struct CompositedImage {
    pixels: RgbaImage,
}

impl CompositedImage {
    pub(crate) fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Read-only access to the pixels.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// Which stage a failed invocation stopped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    Encoding,
    Rejected,
    Transport,
    CodeGeneration,
    Composition,
    Cancelled,
    /// The stamped image could not be stored. Raised by the host after a
    /// successful pipeline run, never by the pipeline itself.
    Persistence,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Encoding => "encoding",
            FailureKind::Rejected => "rejected",
            FailureKind::Transport => "transport",
            FailureKind::CodeGeneration => "code-generation",
            FailureKind::Composition => "composition",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Persistence => "persistence",
        }
    }

    /// Whether re-running the same capture could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, FailureKind::Transport)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully attested and stamped capture.
#[derive(Debug, Clone)]
pub struct AttestedCapture {
    pub composited_image: CompositedImage,
    pub attestation_id: String,
    pub server_timestamp: Option<i64>,
    pub signature: Option<String>,
    /// BLAKE3 of the bytes that were uploaded
    pub payload_hash: String,
    pub human_message: String,
}

/// The single terminal result of one pipeline invocation.
#[derive(Debug, Clone)]
pub enum PipelineResult {
    Success(Box<AttestedCapture>),
    Failure {
        kind: FailureKind,
        human_message: String,
    },
}

impl PipelineResult {
    pub(crate) fn failure(kind: FailureKind, human_message: impl Into<String>) -> Self {
        PipelineResult::Failure {
            kind,
            human_message: human_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineResult::Success(_))
    }

    pub fn human_message(&self) -> &str {
        match self {
            PipelineResult::Success(capture) => &capture.human_message,
            PipelineResult::Failure { human_message, .. } => human_message,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PipelineResult::Success(_) => None,
            PipelineResult::Failure { kind, .. } => Some(*kind),
        }
    }
}

/// Per-capture record written by the CLI after each invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationReport {
    /// Source image
    pub file_path: PathBuf,

    /// "attested" or "failed"
    pub status: String,

    /// Failing stage, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<FailureKind>,

    /// Human-readable status line
    pub message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<i64>,

    /// BLAKE3 of the uploaded bytes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_hash: Option<String>,

    /// Where the stamped image was stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,

    /// Number of invocations it took (1 = no retries)
    pub attempts: u32,
}

impl AttestationReport {
    /// Build a report from a terminal pipeline result.
    pub fn from_result(file_path: PathBuf, result: &PipelineResult, attempts: u32) -> Self {
        match result {
            PipelineResult::Success(capture) => Self {
                file_path,
                status: "attested".to_string(),
                kind: None,
                message: capture.human_message.clone(),
                attestation_id: Some(capture.attestation_id.clone()),
                signature: capture.signature.clone(),
                server_timestamp: capture.server_timestamp,
                payload_hash: Some(capture.payload_hash.clone()),
                output_path: None,
                attempts,
            },
            PipelineResult::Failure {
                kind,
                human_message,
            } => Self {
                file_path,
                status: "failed".to_string(),
                kind: Some(*kind),
                message: human_message.clone(),
                attestation_id: None,
                signature: None,
                server_timestamp: None,
                payload_hash: None,
                output_path: None,
                attempts,
            },
        }
    }
}
