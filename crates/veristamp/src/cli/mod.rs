//! CLI command implementations.

pub mod attest;
pub mod config;
