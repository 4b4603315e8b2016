//! QR code rendering for attestation payloads.

use image::{GrayImage, Luma};
use qrcode::types::QrError;
use qrcode::{Color, EcLevel, QrCode};

use crate::config::OverlayConfig;
use crate::error::{PipelineError, StageResult};

const DARK: Luma<u8> = Luma([0]);
const LIGHT: Luma<u8> = Luma([255]);

/// A rendered, square QR code.
#[derive(Debug, Clone)]
pub struct CodeImage {
    pixels: GrayImage,
    modules: u32,
}

impl CodeImage {
    /// Side length in pixels, quiet zone included.
    pub fn side(&self) -> u32 {
        self.pixels.width()
    }

    /// Number of modules per side, quiet zone excluded.
    pub fn modules(&self) -> u32 {
        self.modules
    }

    pub fn pixels(&self) -> &GrayImage {
        &self.pixels
    }
}

/// Renders payload strings as QR codes.
///
/// Output is a pure function of the payload and the overlay settings: the
/// error-correction level, module size and quiet zone are fixed.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    module_pixels: u32,
    quiet_zone: u32,
}

impl CodeGenerator {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            module_pixels: config.module_pixels.max(1),
            quiet_zone: config.quiet_zone,
        }
    }

    /// Render `payload` as a QR code at error-correction level M.
    ///
    /// Fails if the payload is empty or does not fit in a version 40 symbol.
    pub fn generate(&self, payload: &str) -> StageResult<CodeImage> {
        if payload.is_empty() {
            return Err(PipelineError::CodeGeneration {
                message: "payload is empty".to_string(),
            });
        }

        let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M).map_err(
            |e| PipelineError::CodeGeneration {
                message: match e {
                    QrError::DataTooLong => {
                        format!("payload of {} bytes exceeds QR capacity", payload.len())
                    }
                    other => other.to_string(),
                },
            },
        )?;

        let modules = code.width() as u32;
        let colors = code.to_colors();
        let border = self.quiet_zone * self.module_pixels;
        let side = modules * self.module_pixels + 2 * border;

        let pixels = GrayImage::from_fn(side, side, |x, y| {
            if x < border || y < border {
                return LIGHT;
            }
            let mx = (x - border) / self.module_pixels;
            let my = (y - border) / self.module_pixels;
            if mx >= modules || my >= modules {
                return LIGHT;
            }
            match colors[(my * modules + mx) as usize] {
                Color::Dark => DARK,
                Color::Light => LIGHT,
            }
        });

        tracing::trace!("  QR: {} modules, {}px", modules, side);
        Ok(CodeImage { pixels, modules })
    }
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(&OverlayConfig::default())
    }
}
