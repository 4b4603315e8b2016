//! Image loading, bounded downsampling and lossy re-encoding for upload.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::{Cursor, Read};
use std::path::Path;

use crate::config::{CodecConfig, Transport};
use crate::error::{PipelineError, StageResult};
use crate::types::{EncodedPayload, PayloadBody};

/// MIME type of every re-encoded upload.
pub const UPLOAD_MIME_TYPE: &str = "image/jpeg";

/// Loads source images and produces the payload sent to the attestation service.
#[derive(Debug, Clone)]
pub struct ImageCodec {
    config: CodecConfig,
    transport: Transport,
}

impl ImageCodec {
    /// Create a codec with the given limits, producing bodies for `transport`.
    pub fn new(config: CodecConfig, transport: Transport) -> Self {
        Self { config, transport }
    }

    /// Encode using the configured bound and quality.
    pub fn encode(&self, path: &Path) -> StageResult<EncodedPayload> {
        self.encode_with(
            path,
            self.config.max_width,
            self.config.max_height,
            self.config.quality,
        )
    }

    /// Load `path`, shrink it to fit `max_width` x `max_height` and re-encode it
    /// as JPEG at `quality`.
    ///
    /// Images already within the bound keep their dimensions; images are never
    /// upscaled.
    pub fn encode_with(
        &self,
        path: &Path,
        max_width: u32,
        max_height: u32,
        quality: u8,
    ) -> StageResult<EncodedPayload> {
        let image = self.load(path)?;
        let (src_width, src_height) = image.dimensions();
        let (width, height) = bounded_dimensions(src_width, src_height, max_width, max_height);

        let image = if (width, height) == (src_width, src_height) {
            image
        } else {
            tracing::debug!(
                "Downsampling {:?} from {}x{} to {}x{}",
                path,
                src_width,
                src_height,
                width,
                height
            );
            image.resize_exact(width, height, FilterType::Triangle)
        };

        let bytes = encode_jpeg(&image, quality).map_err(|e| PipelineError::Codec {
            path: path.to_path_buf(),
            message: format!("JPEG encode failed: {e}"),
        })?;
        let content_hash = blake3::hash(&bytes).to_hex().to_string();
        tracing::trace!("  Encoded {} bytes at quality {}", bytes.len(), quality);

        let body = match self.transport {
            Transport::Json => PayloadBody::Base64 {
                data: BASE64.encode(&bytes),
            },
            Transport::Multipart => PayloadBody::Binary {
                bytes,
                mime_type: UPLOAD_MIME_TYPE.to_string(),
                file_name: upload_file_name(path),
            },
        };

        Ok(EncodedPayload {
            width,
            height,
            content_hash,
            body,
        })
    }

    /// Validate and decode a source image at full resolution.
    ///
    /// Checks that the file exists, is within the size limit and has a
    /// recognizable image format before decoding it.
    pub fn load(&self, path: &Path) -> StageResult<DynamicImage> {
        if !path.exists() {
            return Err(PipelineError::FileNotFound(path.to_path_buf()));
        }

        let metadata = std::fs::metadata(path).map_err(|e| PipelineError::Codec {
            path: path.to_path_buf(),
            message: format!("Cannot read metadata: {e}"),
        })?;
        let max_bytes = self.config.max_file_size_mb.saturating_mul(1024 * 1024);
        if metadata.len() > max_bytes {
            return Err(PipelineError::FileTooLarge {
                path: path.to_path_buf(),
                size_mb: metadata.len() / (1024 * 1024),
                max_mb: self.config.max_file_size_mb,
            });
        }

        let mut bytes = Vec::with_capacity(metadata.len() as usize);
        std::fs::File::open(path)
            .and_then(|mut f| f.read_to_end(&mut bytes))
            .map_err(|e| PipelineError::Codec {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {e}"),
            })?;

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Codec {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {e}"),
            })?;
        if reader.format().is_none() {
            return Err(PipelineError::Codec {
                path: path.to_path_buf(),
                message: "Unrecognized image format".to_string(),
            });
        }

        reader.decode().map_err(|e| PipelineError::Codec {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Which transport the produced bodies are shaped for.
    pub fn transport(&self) -> Transport {
        self.transport
    }
}

/// Dimensions after fitting `width` x `height` inside the bound.
///
/// A single uniform factor `min(max_width / width, max_height / height)`,
/// clamped to at most 1, is applied to both axes.
pub fn bounded_dimensions(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    )
    .min(1.0);

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (new_width, new_height)
}

/// Encode an image as baseline JPEG at the given quality.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let rgb = image.to_rgb8();
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality).encode_image(&rgb)?;
    Ok(buffer)
}

/// File name for the multipart `image` part: the source stem with a `.jpg` extension.
fn upload_file_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(|stem| format!("{stem}.jpg"))
        .unwrap_or_else(|| "capture.jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_test_image(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        let path = dir.join(name);
        img.save(&path).unwrap();
        path
    }

    fn decode_payload(payload: &EncodedPayload) -> DynamicImage {
        let bytes = match &payload.body {
            PayloadBody::Base64 { data } => BASE64.decode(data).unwrap(),
            PayloadBody::Binary { bytes, .. } => bytes.clone(),
        };
        image::load_from_memory(&bytes).unwrap()
    }

    #[test]
    fn test_bounded_dimensions_height_limited() {
        // 4000x3000 into 1920x1080: factor = min(0.48, 0.36) = 0.36
        assert_eq!(bounded_dimensions(4000, 3000, 1920, 1080), (1440, 1080));
    }

    #[test]
    fn test_bounded_dimensions_width_limited() {
        assert_eq!(bounded_dimensions(3840, 1080, 1920, 1080), (1920, 540));
    }

    #[test]
    fn test_bounded_dimensions_never_upscales() {
        assert_eq!(bounded_dimensions(640, 480, 1920, 1080), (640, 480));
        assert_eq!(bounded_dimensions(1920, 1080, 1920, 1080), (1920, 1080));
    }

    #[test]
    fn test_bounded_dimensions_respects_bound_for_many_shapes() {
        let shapes = [(4001, 2999), (10_000, 7), (7, 10_000), (1921, 1081), (3333, 3333)];
        for (w, h) in shapes {
            let (nw, nh) = bounded_dimensions(w, h, 1920, 1080);
            assert!(nw <= 1920 && nh <= 1080, "{w}x{h} -> {nw}x{nh}");
            assert!(nw <= w && nh <= h, "{w}x{h} upscaled to {nw}x{nh}");
            assert!(nw >= 1 && nh >= 1);
        }
    }

    #[test]
    fn test_encode_downsamples_to_bound() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "wide.png", 400, 300);
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);

        let payload = codec.encode_with(&path, 192, 108, 85).unwrap();
        assert_eq!((payload.width, payload.height), (144, 108));

        let decoded = decode_payload(&payload);
        assert_eq!(decoded.dimensions(), (144, 108));
    }

    #[test]
    fn test_encode_within_bound_keeps_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "small.png", 120, 80);
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);

        let payload = codec.encode(&path).unwrap();
        let decoded = decode_payload(&payload);
        assert_eq!(decoded.dimensions(), (120, 80));
    }

    #[test]
    fn test_json_transport_produces_unwrapped_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "a.png", 64, 64);
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);

        let payload = codec.encode(&path).unwrap();
        match &payload.body {
            PayloadBody::Base64 { data } => {
                assert!(!data.contains('\n'));
                let bytes = BASE64.decode(data).unwrap();
                // JPEG SOI marker
                assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
                assert_eq!(payload.content_hash, blake3::hash(&bytes).to_hex().to_string());
            }
            other => panic!("Expected Base64 body, got {other:?}"),
        }
    }

    #[test]
    fn test_multipart_transport_produces_jpeg_part() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "shot.png", 64, 32);
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Multipart);

        let payload = codec.encode(&path).unwrap();
        match &payload.body {
            PayloadBody::Binary {
                bytes,
                mime_type,
                file_name,
            } => {
                assert_eq!(mime_type, "image/jpeg");
                assert_eq!(file_name, "shot.jpg");
                assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
            }
            other => panic!("Expected Binary body, got {other:?}"),
        }
    }

    #[test]
    fn test_lower_quality_is_smaller() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "q.png", 256, 256);
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Multipart);

        let size = |q| match codec.encode_with(&path, 1920, 1080, q).unwrap().body {
            PayloadBody::Binary { bytes, .. } => bytes.len(),
            PayloadBody::Base64 { .. } => unreachable!(),
        };
        assert!(size(30) < size(95));
    }

    #[test]
    fn test_unbounded_size_limit_still_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_test_image(dir.path(), "tiny.png", 16, 16);
        let config = CodecConfig {
            max_file_size_mb: u64::MAX,
            ..CodecConfig::default()
        };
        let codec = ImageCodec::new(config, Transport::Json);

        let payload = codec.encode(&path).unwrap();
        assert_eq!((payload.width, payload.height), (16, 16));
    }

    #[test]
    fn test_missing_file_is_codec_error() {
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);
        let err = codec
            .encode(Path::new("/nonexistent/capture.jpg"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::FileNotFound(_)));
        assert!(err.is_codec());
    }

    #[test]
    fn test_garbage_file_is_codec_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_image.jpg");
        std::fs::write(&path, b"definitely not pixels").unwrap();
        let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);

        let err = codec.encode(&path).unwrap_err();
        assert!(matches!(err, PipelineError::Codec { .. }));
    }

    #[test]
    fn test_format_detected_by_content() {
        // A PNG saved under a .jpg name still decodes
        let dir = tempfile::tempdir().unwrap();
        let png = write_test_image(dir.path(), "real.png", 32, 16);
        let misnamed = dir.path().join("misnamed.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let codec = ImageCodec::new(CodecConfig::default(), Transport::Json);
        let image = codec.load(&misnamed).unwrap();
        assert_eq!(image.dimensions(), (32, 16));
    }
}
