//! Attestation pipeline components.
//!
//! This module contains all the stages a capture passes through:
//! - **metadata**: Assemble the capture context (time, location, device)
//! - **codec**: Load, downsample and re-encode the source image
//! - **qr**: Render the server's verification payload as a QR code
//! - **compositor**: Stamp the code into the bottom-right corner
//! - **orchestrator**: Sequence the stages and map outcomes to one result
//! - **discovery**: Find image files in directories
//! - **cancel**: Cooperative cancellation shared with the host

pub mod cancel;
pub mod codec;
pub mod compositor;
pub mod discovery;
pub mod metadata;
pub mod orchestrator;
pub mod qr;

// Re-exports for convenient access
pub use cancel::CancelFlag;
pub use codec::{bounded_dimensions, ImageCodec};
pub use compositor::{placement, Compositor, Placement};
pub use discovery::{DiscoveredFile, FileDiscovery};
pub use metadata::MetadataBuilder;
pub use orchestrator::AttestationPipeline;
pub use qr::{CodeGenerator, CodeImage};
