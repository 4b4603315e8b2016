//! Remote attestation: wire contract, HTTP client and retry policy.

pub(crate) mod client;
pub(crate) mod retry;
pub(crate) mod service;
pub(crate) mod wire;

pub use client::{resolve_env_var, HttpAttestationClient};
pub use retry::{backoff_duration, is_retryable};
pub use service::AttestationService;
pub use wire::interpret_response;
