//! Capture metadata assembly.

use exif::{In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::types::{CameraInfo, CameraType, CaptureContext, Location};

/// Builds the [`CaptureContext`] that accompanies an image to the service.
pub struct MetadataBuilder;

impl MetadataBuilder {
    /// Assemble the context for one capture.
    ///
    /// Never fails. A missing location, or a location with only one
    /// coordinate, simply leaves the corresponding fields empty.
    pub fn build(
        image_path: impl Into<PathBuf>,
        captured_at_epoch_millis: i64,
        location: Option<Location>,
        device_model: impl Into<String>,
        app_version: impl Into<String>,
        device_id: Option<String>,
    ) -> CaptureContext {
        let location = location.unwrap_or_default();
        CaptureContext {
            image_path: image_path.into(),
            captured_at_epoch_millis,
            latitude: location.latitude,
            longitude: location.longitude,
            device_model: device_model.into(),
            app_version: app_version.into(),
            device_id,
            camera_info: None,
        }
    }

    /// Describe the camera from the source dimensions and its EXIF flash tag.
    pub fn camera_info(path: &Path, width: u32, height: u32, camera_type: CameraType) -> CameraInfo {
        CameraInfo {
            resolution: format!("{width}x{height}"),
            camera_type,
            flash_used: Self::flash_fired(path).unwrap_or(false),
        }
    }

    /// Read bit 0 of the EXIF `Flash` tag ("flash fired").
    ///
    /// Returns `None` if the file has no EXIF data or no flash tag.
    fn flash_fired(path: &Path) -> Option<bool> {
        let file = File::open(path).ok()?;
        let mut reader = BufReader::new(file);
        let exif = Reader::new().read_from_container(&mut reader).ok()?;
        let field = exif.get_field(Tag::Flash, In::PRIMARY)?;
        match &field.value {
            Value::Short(v) => v.first().map(|&x| x & 0x1 == 1),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_location() {
        let ctx = MetadataBuilder::build(
            "/captures/a.jpg",
            1_700_000_000_000,
            Some(Location::new(52.52, 13.405)),
            "Pixel 8",
            "1.0",
            Some("device-1".to_string()),
        );
        assert_eq!(ctx.latitude, Some(52.52));
        assert_eq!(ctx.longitude, Some(13.405));
        assert_eq!(ctx.device_model, "Pixel 8");
        assert_eq!(ctx.device_id.as_deref(), Some("device-1"));
        assert!(ctx.camera_info.is_none());
    }

    #[test]
    fn test_build_without_location() {
        let ctx = MetadataBuilder::build("/captures/a.jpg", 1, None, "Pixel 8", "1.0", None);
        assert!(ctx.latitude.is_none());
        assert!(ctx.longitude.is_none());
        assert!(ctx.device_id.is_none());
    }

    #[test]
    fn test_build_with_partial_location() {
        let partial = Location {
            latitude: Some(10.0),
            longitude: None,
        };
        let ctx = MetadataBuilder::build("/captures/a.jpg", 1, Some(partial), "m", "v", None);
        assert_eq!(ctx.latitude, Some(10.0));
        assert!(ctx.longitude.is_none());
    }

    #[test]
    fn test_camera_info_without_exif() {
        let info = MetadataBuilder::camera_info(
            Path::new("/nonexistent/file.jpg"),
            4000,
            3000,
            CameraType::Front,
        );
        assert_eq!(info.resolution, "4000x3000");
        assert_eq!(info.camera_type, CameraType::Front);
        assert!(!info.flash_used);
    }
}
