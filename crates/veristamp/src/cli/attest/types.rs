//! CLI enum types for the attest command.

use clap::ValueEnum;
use veristamp_core::config::Transport;
use veristamp_core::types::CameraType;
use veristamp_core::OutputFormat;

/// Report formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// One JSON array
    Json,
    /// One JSON object per line
    Jsonl,
}

impl From<ReportFormat> for OutputFormat {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Json => OutputFormat::Json,
            ReportFormat::Jsonl => OutputFormat::JsonLines,
        }
    }
}

/// How the image travels to the attestation service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    /// JSON body with the image as base64
    Json,
    /// multipart/form-data with the image as a binary part
    Multipart,
}

impl From<TransportArg> for Transport {
    fn from(arg: TransportArg) -> Self {
        match arg {
            TransportArg::Json => Transport::Json,
            TransportArg::Multipart => Transport::Multipart,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CameraArg {
    Back,
    Front,
}

impl From<CameraArg> for CameraType {
    fn from(arg: CameraArg) -> Self {
        match arg {
            CameraArg::Back => CameraType::Back,
            CameraArg::Front => CameraType::Front,
        }
    }
}
