//! # Scanner Module
//!
//! Discovers files beneath a root directory and classifies them as images
//! or non-images.
//!
//! ## Supported Formats
//! - JPEG (.jpg, .jpeg)
//! - PNG (.png)
//! - WebP (.webp)
//! - HEIC (.heic, .heif) - iPhone photos
//! - GIF (.gif)
//! - BMP (.bmp)
//! - TIFF (.tiff, .tif)
//!
//! A file counts as an image only when its extension is one of the above
//! and its first bytes carry the matching signature.
//!
//! ## Example
//! ```rust,ignore
//! use photo_sorter::core::scanner::{ScanConfig, WalkDirScanner};
//!
//! let scanner = WalkDirScanner::new(ScanConfig::default());
//! for file in scanner.iter(Path::new("/Users/photos"))? {
//!     println!("{:?}", file?.kind);
//! }
//! ```

mod filter;
mod walker;

pub use filter::ImageFilter;
pub use walker::{ScanConfig, ScanIter, WalkDirScanner};

use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::SystemTime;

/// A file discovered beneath the root
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannedFile {
    /// Path to the file
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Last modified time, if the filesystem reports one
    pub modified: Option<SystemTime>,
    /// Image or non-image
    pub kind: FileKind,
}

impl ScannedFile {
    /// Image format, if this file is an image
    pub fn image_format(&self) -> Option<ImageFormat> {
        match self.kind {
            FileKind::Image(format) => Some(format),
            FileKind::NonImage(_) => None,
        }
    }
}

/// Classification of a scanned file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Image(ImageFormat),
    NonImage(NonImageReason),
}

/// Why a file was not considered an image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NonImageReason {
    /// Extension is not an image extension
    UnrecognizedExtension,
    /// Image extension, but the content does not start with its signature
    SignatureMismatch(ImageFormat),
}

/// Supported image formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Jpeg,
    Png,
    WebP,
    Heic,
    Gif,
    Bmp,
    Tiff,
    Unknown,
}

impl ImageFormat {
    /// Detect format from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => ImageFormat::Jpeg,
            "png" => ImageFormat::Png,
            "webp" => ImageFormat::WebP,
            "heic" | "heif" => ImageFormat::Heic,
            "gif" => ImageFormat::Gif,
            "bmp" => ImageFormat::Bmp,
            "tiff" | "tif" => ImageFormat::Tiff,
            _ => ImageFormat::Unknown,
        }
    }

    /// Check if this format is supported
    pub fn is_supported(&self) -> bool {
        !matches!(self, ImageFormat::Unknown)
    }

    /// Number of leading bytes needed by [`ImageFormat::matches_signature`]
    pub const SIGNATURE_LEN: usize = 12;

    /// Check the leading bytes of a file against this format's magic number
    pub fn matches_signature(&self, header: &[u8]) -> bool {
        match self {
            ImageFormat::Jpeg => header.starts_with(&[0xFF, 0xD8, 0xFF]),
            ImageFormat::Png => header.starts_with(b"\x89PNG\r\n\x1a\n"),
            ImageFormat::WebP => {
                header.len() >= 12 && &header[0..4] == b"RIFF" && &header[8..12] == b"WEBP"
            }
            ImageFormat::Heic => header.len() >= 8 && &header[4..8] == b"ftyp",
            ImageFormat::Gif => header.starts_with(b"GIF8"),
            ImageFormat::Bmp => header.starts_with(b"BM"),
            ImageFormat::Tiff => header.starts_with(b"II*\0") || header.starts_with(b"MM\0*"),
            ImageFormat::Unknown => false,
        }
    }

    /// Lowercase name used by the `{kind}` naming placeholder
    pub fn name(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::WebP => "webp",
            ImageFormat::Heic => "heic",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            ImageFormat::Unknown => "unknown",
        }
    }
}

/// Result of a scan operation
#[derive(Debug)]
pub struct ScanResult {
    /// Discovered files in walk order, images and non-images alike
    pub files: Vec<ScannedFile>,
    /// Entries that could not be read (non-fatal)
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    /// Number of files classified as images
    pub fn image_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| f.image_format().is_some())
            .count()
    }
}
