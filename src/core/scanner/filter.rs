//! File classification logic for the scanner.

use super::{FileKind, ImageFormat, NonImageReason};
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Decides which files are images
pub struct ImageFilter {
    /// File extensions to accept as images
    extensions: HashSet<String>,
    /// Whether to include hidden files
    include_hidden: bool,
}

impl ImageFilter {
    /// Create a new filter with default supported extensions
    pub fn new() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "webp", "heic", "heif", "gif", "bmp", "tiff", "tif"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            include_hidden: false,
        }
    }

    /// Include hidden files (starting with .)
    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    /// Whether a file or directory name is hidden and should be skipped
    pub fn is_excluded_hidden(&self, path: &Path) -> bool {
        if self.include_hidden {
            return false;
        }
        path.file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }

    /// Get the image format implied by the extension
    pub fn get_format(&self, path: &Path) -> ImageFormat {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if self.extensions.contains(&ext.to_lowercase()) => {
                ImageFormat::from_extension(ext)
            }
            _ => ImageFormat::Unknown,
        }
    }

    /// Classify a file by extension, then confirm with its content signature
    pub fn classify(&self, path: &Path) -> io::Result<FileKind> {
        let format = self.get_format(path);
        if !format.is_supported() {
            return Ok(FileKind::NonImage(NonImageReason::UnrecognizedExtension));
        }

        let header = read_header(path)?;
        if format.matches_signature(&header) {
            Ok(FileKind::Image(format))
        } else {
            Ok(FileKind::NonImage(NonImageReason::SignatureMismatch(format)))
        }
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let mut header = Vec::with_capacity(ImageFormat::SIGNATURE_LEN);
    File::open(path)?
        .take(ImageFormat::SIGNATURE_LEN as u64)
        .read_to_end(&mut header)?;
    Ok(header)
}
