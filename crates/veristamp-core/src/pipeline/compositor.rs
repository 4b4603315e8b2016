//! Overlay of the verification code onto the captured photo.

use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView};

use crate::config::OverlayConfig;
use crate::error::{PipelineError, StageResult};
use crate::types::CompositedImage;

use super::qr::CodeImage;

/// Where the code lands on a given frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Left edge of the code
    pub x: u32,
    /// Top edge of the code
    pub y: u32,
    /// Side length of the scaled, square code
    pub side: u32,
}

/// Compute the code placement for a `width` x `height` frame.
///
/// The code side is `min(width, height) / scale_divisor`. Its bottom-right
/// corner sits `padding` pixels inward from the frame's bottom-right corner,
/// pulled further in when the frame is too small for the full padding.
/// Returns `None` when the frame is too small to hold a code at all.
pub fn placement(width: u32, height: u32, scale_divisor: u32, padding: u32) -> Option<Placement> {
    let side = width.min(height) / scale_divisor.max(1);
    if side == 0 {
        return None;
    }
    Some(Placement {
        x: width.saturating_sub(side.saturating_add(padding)),
        y: height.saturating_sub(side.saturating_add(padding)),
        side,
    })
}

/// Draws codes onto photos.
#[derive(Debug, Clone)]
pub struct Compositor {
    scale_divisor: u32,
    padding: u32,
}

impl Compositor {
    pub fn new(config: &OverlayConfig) -> Self {
        Self {
            scale_divisor: config.scale_divisor,
            padding: config.padding,
        }
    }

    /// Produce a new image: `original` with `code` drawn in its bottom-right corner.
    ///
    /// `original` is only read; the result always lives in a freshly
    /// allocated buffer of the same dimensions.
    pub fn composite(
        &self,
        original: &DynamicImage,
        code: &CodeImage,
    ) -> StageResult<CompositedImage> {
        let (width, height) = original.dimensions();
        let spot = placement(width, height, self.scale_divisor, self.padding).ok_or_else(|| {
            PipelineError::Composition {
                message: format!("{width}x{height} image is too small to carry a code"),
            }
        })?;

        // Nearest keeps module edges sharp so the code stays scannable
        let scaled = imageops::resize(code.pixels(), spot.side, spot.side, FilterType::Nearest);
        let scaled = DynamicImage::ImageLuma8(scaled).to_rgba8();

        let mut canvas = original.to_rgba8();
        imageops::replace(&mut canvas, &scaled, spot.x as i64, spot.y as i64);

        tracing::trace!(
            "  Composite: {}px code at ({}, {}) on {}x{}",
            spot.side,
            spot.x,
            spot.y,
            width,
            height
        );
        Ok(CompositedImage::new(canvas))
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(&OverlayConfig::default())
    }
}
