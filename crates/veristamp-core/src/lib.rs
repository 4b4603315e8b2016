//! Veristamp Core - Photo attestation and QR stamping library.
//!
//! Veristamp sends a captured photo plus its context (time, location, device)
//! to a remote attestation service. When the service vouches for the image,
//! its verification payload is rendered as a QR code and drawn into the
//! photo's bottom-right corner.
//!
//! # Architecture
//!
//! ```text
//! Image → Metadata → Encode (JPEG) → Attest (HTTP) → QR → Composite → PipelineResult
//! ```
//!
//! The pipeline never writes files; hosts hand the stamped image to a
//! [`PersistenceSink`] such as [`DirectorySink`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use veristamp_core::{AttestationPipeline, Config, Location, PipelineResult};
//!
//! #[tokio::main]
//! async fn main() -> veristamp_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = AttestationPipeline::new(&config);
//!
//!     let result = pipeline
//!         .attest_and_annotate("./photo.jpg".as_ref(), Some(Location::new(52.52, 13.40)))
//!         .await;
//!     println!("{}", result.human_message());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod attestation;
pub mod config;
pub mod error;
pub mod output;
pub mod persist;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use attestation::{AttestationService, HttpAttestationClient};
pub use config::Config;
pub use error::{
    ConfigError, PersistenceError, PipelineError, Result, StageResult, VeristampError,
};
pub use output::{BatchSummary, OutputFormat, OutputWriter};
pub use persist::{DirectorySink, PersistenceSink};
pub use pipeline::{AttestationPipeline, CancelFlag, DiscoveredFile, FileDiscovery};
pub use types::{
    AttestationOutcome, AttestationReport, AttestedCapture, CaptureContext, CompositedImage,
    EncodedPayload, FailureKind, Location, PipelineResult,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_config_builds_pipeline() {
        let config = Config::default();
        let _pipeline = AttestationPipeline::new(&config);
        assert_eq!(config.device.app_version, VERSION);
    }
}
