//! Storage of stamped images.
//!
//! The pipeline never writes files itself; the host hands the final
//! [`CompositedImage`] to a [`PersistenceSink`].

use image::buffer::ConvertBuffer;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::PersistenceError;
use crate::types::CompositedImage;

/// Accepts a final image and returns an identifier for where it was stored.
pub trait PersistenceSink: Send + Sync {
    fn persist(&self, image: &CompositedImage, file_name: &str) -> Result<String, PersistenceError>;
}

/// Writes JPEG files into a directory.
///
/// Each file is written to a temporary file in the target directory and
/// renamed into place, so a reader never observes a partial image.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    jpeg_quality: u8,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>, jpeg_quality: u8) -> Self {
        Self {
            dir: dir.into(),
            jpeg_quality,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File stem for a capture stored at `epoch_millis`: `<prefix>_<epoch_millis>`.
    pub fn file_name(prefix: &str, epoch_millis: i64) -> String {
        format!("{prefix}_{epoch_millis}")
    }

    fn encode(&self, image: &CompositedImage) -> Result<Vec<u8>, PersistenceError> {
        let rgb: RgbImage = image.pixels().convert();
        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, self.jpeg_quality)
            .encode_image(&rgb)
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;
        Ok(buffer)
    }

    fn write_err(path: &Path) -> impl FnOnce(std::io::Error) -> PersistenceError + '_ {
        move |source| PersistenceError::Write {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl PersistenceSink for DirectorySink {
    fn persist(&self, image: &CompositedImage, file_name: &str) -> Result<String, PersistenceError> {
        std::fs::create_dir_all(&self.dir).map_err(Self::write_err(&self.dir))?;
        let bytes = self.encode(image)?;

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(Self::write_err(&self.dir))?;
        tmp.write_all(&bytes)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(Self::write_err(tmp.path()))?;

        // Never clobber an earlier capture that landed on the same millisecond
        let mut attempt = 0u32;
        loop {
            let name = if attempt == 0 {
                format!("{file_name}.jpg")
            } else {
                format!("{file_name}_{attempt}.jpg")
            };
            let target = self.dir.join(name);
            match tmp.persist_noclobber(&target) {
                Ok(_) => {
                    tracing::info!("Saved {}", target.display());
                    return Ok(target.to_string_lossy().into_owned());
                }
                Err(e) if e.error.kind() == ErrorKind::AlreadyExists && attempt < 1000 => {
                    tmp = e.file;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(PersistenceError::Write {
                        path: target,
                        source: e.error,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn sample() -> CompositedImage {
        CompositedImage::new(RgbaImage::from_pixel(64, 48, Rgba([10, 20, 30, 255])))
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(
            DirectorySink::file_name("Veristamp", 1_700_000_000_000),
            "Veristamp_1700000000000"
        );
    }

    #[test]
    fn test_persist_writes_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path().join("out"), 95);

        let location = sink.persist(&sample(), "Veristamp_1").unwrap();
        let path = PathBuf::from(&location);
        assert_eq!(path.file_name().unwrap(), "Veristamp_1.jpg");

        let stored = image::open(&path).unwrap();
        assert_eq!((stored.width(), stored.height()), (64, 48));
    }

    #[test]
    fn test_persist_does_not_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), 95);

        let first = sink.persist(&sample(), "same").unwrap();
        let second = sink.persist(&sample(), "same").unwrap();
        assert_ne!(first, second);
        assert!(second.ends_with("same_1.jpg"));
    }

    #[test]
    fn test_persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = DirectorySink::new(dir.path(), 90);
        sink.persist(&sample(), "only").unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["only.jpg".to_string()]);
    }

    #[test]
    fn test_persist_into_unwritable_location_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // A regular file where the directory should be
        let sink = DirectorySink::new(blocker.join("nested"), 95);

        let err = sink.persist(&sample(), "x").unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
    }
}
