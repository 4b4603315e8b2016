//! Sub-configuration structs with their defaults.

use crate::types::CameraType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of the capturing device, sent with every attestation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Human-readable device model ("<manufacturer> <model>")
    pub model: String,

    /// Application version reported to the service
    pub app_version: String,

    /// Stable device identifier, if one has been provisioned
    pub device_id: Option<String>,

    /// Which camera the captures come from
    pub camera_type: CameraType,

    /// Attach a `camera_info` block (resolution, camera type, flash) to JSON requests
    pub attach_camera_info: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: format!("{} {}", std::env::consts::OS, std::env::consts::ARCH),
            app_version: crate::VERSION.to_string(),
            device_id: None,
            camera_type: CameraType::Back,
            attach_camera_info: false,
        }
    }
}

/// Limits and quality for the upload re-encode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Maximum width of the uploaded image
    pub max_width: u32,

    /// Maximum height of the uploaded image
    pub max_height: u32,

    /// JPEG quality (1-100)
    pub quality: u8,

    /// Maximum source file size in megabytes
    pub max_file_size_mb: u64,

    /// Input file extensions accepted by directory discovery
    pub supported_formats: Vec<String>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            quality: 85,
            max_file_size_mb: 50,
            supported_formats: vec![
                "jpg".to_string(),
                "jpeg".to_string(),
                "png".to_string(),
                "webp".to_string(),
            ],
        }
    }
}

/// How the image travels to the attestation service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// JSON body with the image embedded as base64
    #[default]
    Json,
    /// multipart/form-data with the image as a binary part
    Multipart,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Json => write!(f, "json"),
            Transport::Multipart => write!(f, "multipart"),
        }
    }
}

/// Attestation service connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttestationConfig {
    /// Service base URL
    pub base_url: String,

    /// Endpoint path (`/attest-image` or `/v1/attestation/create`)
    pub path: String,

    /// Request encoding used by this deployment
    pub transport: Transport,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// How many times the CLI re-runs a capture after a transport failure
    pub retry_attempts: u32,

    /// Base backoff delay between re-runs in milliseconds
    pub retry_delay_ms: u64,

    /// Bearer token (supports ${ENV_VAR} syntax)
    pub api_key: Option<String>,
}

impl Default for AttestationConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            path: "/attest-image".to_string(),
            transport: Transport::Json,
            timeout_ms: 30_000,
            retry_attempts: 0,
            retry_delay_ms: 1000,
            api_key: None,
        }
    }
}

impl AttestationConfig {
    /// Full endpoint URL.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.path.trim_start_matches('/')
        )
    }
}

/// QR rendering and placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Code side = min(width, height) / scale_divisor
    pub scale_divisor: u32,

    /// Gap between the code and the bottom/right edges, in pixels
    pub padding: u32,

    /// Pixels per QR module in the unscaled code image
    pub module_pixels: u32,

    /// Light border around the code, in modules
    pub quiet_zone: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            scale_divisor: 6,
            padding: 20,
            module_pixels: 8,
            quiet_zone: 4,
        }
    }
}

/// Where and how stamped images and reports are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory for stamped images
    pub dir: String,

    /// File name prefix; files are named `<prefix>_<epoch_millis>.jpg`
    pub file_prefix: String,

    /// JPEG quality for stored images
    pub jpeg_quality: u8,

    /// Report format ("json" or "jsonl")
    pub format: String,

    /// Pretty-print JSON reports
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: "~/Pictures/Veristamp".to_string(),
            file_prefix: "Veristamp".to_string(),
            jpeg_quality: 95,
            format: "json".to_string(),
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
