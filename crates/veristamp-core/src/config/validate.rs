//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::output::OutputFormat;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.codec.max_width == 0 || self.codec.max_height == 0 {
            return Err(ConfigError::ValidationError(
                "codec.max_width and codec.max_height must be > 0".into(),
            ));
        }
        if self.codec.quality == 0 || self.codec.quality > 100 {
            return Err(ConfigError::ValidationError(
                "codec.quality must be between 1 and 100".into(),
            ));
        }
        if self.codec.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "codec.max_file_size_mb must be > 0".into(),
            ));
        }
        if self.attestation.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "attestation.base_url must not be empty".into(),
            ));
        }
        if self.attestation.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "attestation.timeout_ms must be > 0".into(),
            ));
        }
        if self.overlay.scale_divisor == 0 {
            return Err(ConfigError::ValidationError(
                "overlay.scale_divisor must be > 0".into(),
            ));
        }
        if self.overlay.module_pixels == 0 {
            return Err(ConfigError::ValidationError(
                "overlay.module_pixels must be > 0".into(),
            ));
        }
        if self.output.jpeg_quality == 0 || self.output.jpeg_quality > 100 {
            return Err(ConfigError::ValidationError(
                "output.jpeg_quality must be between 1 and 100".into(),
            ));
        }
        if self.output.file_prefix.contains(['/', '\\']) {
            return Err(ConfigError::ValidationError(
                "output.file_prefix must not contain path separators".into(),
            ));
        }
        if OutputFormat::parse(&self.output.format).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "output.format must be \"json\" or \"jsonl\", got {:?}",
                self.output.format
            )));
        }
        Ok(())
    }
}
