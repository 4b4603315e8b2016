//! Input discovery: expands files and directories into a list of captures.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CodecConfig;

/// Finds supported image files among command-line inputs.
pub struct FileDiscovery {
    extensions: Vec<String>,
}

/// A capture found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredFile {
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
}

impl FileDiscovery {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            extensions: config
                .supported_formats
                .iter()
                .map(|ext| ext.to_lowercase())
                .collect(),
        }
    }

    /// Discover supported images at a single path.
    ///
    /// A file is returned as-is when its extension is supported; a directory
    /// is walked recursively. Results are sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<DiscoveredFile> {
        if path.is_file() {
            return match std::fs::metadata(path) {
                Ok(meta) if self.is_supported(path) => vec![DiscoveredFile {
                    path: path.to_path_buf(),
                    size: meta.len(),
                }],
                _ => vec![],
            };
        }

        let mut files: Vec<DiscoveredFile> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .filter_map(|entry| {
                let size = entry.metadata().ok()?.len();
                Some(DiscoveredFile {
                    path: entry.into_path(),
                    size,
                })
            })
            .collect();

        files.sort_by(|a, b| a.path.cmp(&b.path));
        files
    }

    /// Discover across several inputs, dropping duplicates while keeping
    /// the order in which inputs were given.
    pub fn discover_all(&self, inputs: &[PathBuf]) -> Vec<DiscoveredFile> {
        let mut seen = std::collections::HashSet::new();
        inputs
            .iter()
            .flat_map(|input| self.discover(input))
            .filter(|file| seen.insert(file.path.clone()))
            .collect()
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|known| *known == ext)
            })
            .unwrap_or(false)
    }
}
