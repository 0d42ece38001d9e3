//! Capture-date write-back for JPEG files.
//!
//! The EXIF APP1 segment is rebuilt with kamadak-exif's writer: readable
//! primary-IFD fields are carried over, the date tags are replaced, and the
//! file is swapped in atomically through a temporary file next to it.

use super::EXIF_DATETIME_FORMAT;
use crate::error::MetadataError;
use chrono::NaiveDateTime;
use exif::experimental::Writer;
use exif::{Field, In, Reader, Tag, Value};
use std::fs;
use std::io::{Cursor, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const EXIF_HEADER: &[u8] = b"Exif\0\0";

/// Tags never copied from the old block: the dates being replaced, IFD
/// pointers and thumbnail offsets the writer recomputes, and maker notes
/// whose internal offsets would dangle.
const SKIPPED_TAGS: [Tag; 12] = [
    Tag::DateTime,
    Tag::DateTimeOriginal,
    Tag::ExifIFDPointer,
    Tag::GPSInfoIFDPointer,
    Tag::InteropIFDPointer,
    Tag::MakerNote,
    Tag::StripOffsets,
    Tag::StripByteCounts,
    Tag::TileOffsets,
    Tag::TileByteCounts,
    Tag::JPEGInterchangeFormat,
    Tag::JPEGInterchangeFormatLength,
];

/// Write `date` into the `DateTime` and `DateTimeOriginal` tags of a JPEG file
pub fn write_capture_date(path: &Path, date: NaiveDateTime) -> Result<(), MetadataError> {
    DatedJpeg::prepare(path, date)?.write_to(path)
}

/// A JPEG whose capture date has been rewritten in memory.
///
/// Preparing never touches the file, so the final bytes can be inspected
/// (and fingerprinted) before deciding whether to write them anywhere.
#[derive(Debug, Clone)]
pub struct DatedJpeg {
    bytes: Vec<u8>,
    date: NaiveDateTime,
}

impl DatedJpeg {
    /// Read the JPEG at `path` and rebuild its EXIF block around `date`
    pub fn prepare(path: &Path, date: NaiveDateTime) -> Result<Self, MetadataError> {
        let write_error = |reason: String| MetadataError::Write {
            path: path.to_path_buf(),
            reason,
        };

        let original = fs::read(path).map_err(|e| write_error(e.to_string()))?;
        if !original.starts_with(&[0xFF, 0xD8]) {
            return Err(MetadataError::Unsupported {
                path: path.to_path_buf(),
                format: path
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or("unknown")
                    .to_lowercase(),
            });
        }

        let tiff = build_exif_block(&original, date).map_err(write_error)?;
        let bytes = replace_exif_segment(&original, &tiff).map_err(write_error)?;
        Ok(Self { bytes, date })
    }

    /// The complete rewritten file
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Atomically replace the file at `path` with the rewritten bytes
    pub fn write_to(&self, path: &Path) -> Result<(), MetadataError> {
        replace_file(path, &self.bytes).map_err(|e| MetadataError::Write {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::debug!("{}: capture date set to {}", path.display(), self.date);
        Ok(())
    }
}

fn build_exif_block(jpeg: &[u8], date: NaiveDateTime) -> Result<Vec<u8>, String> {
    let existing = Reader::new()
        .read_from_container(&mut Cursor::new(jpeg))
        .ok();

    let stamp = date.format(EXIF_DATETIME_FORMAT).to_string();
    let date_fields: Vec<Field> = [Tag::DateTime, Tag::DateTimeOriginal]
        .into_iter()
        .map(|tag| Field {
            tag,
            ifd_num: In::PRIMARY,
            value: Value::Ascii(vec![stamp.clone().into_bytes()]),
        })
        .collect();

    let mut writer = Writer::new();
    if let Some(ref exif) = existing {
        for field in exif.fields().filter(|f| is_preserved(f)) {
            writer.push_field(field);
        }
    }
    for field in &date_fields {
        writer.push_field(field);
    }

    let mut tiff = Cursor::new(Vec::new());
    writer
        .write(&mut tiff, false)
        .map_err(|e| format!("cannot encode EXIF: {}", e))?;
    Ok(tiff.into_inner())
}

fn is_preserved(field: &Field) -> bool {
    field.ifd_num == In::PRIMARY
        && !SKIPPED_TAGS.contains(&field.tag)
        && !matches!(field.value, Value::Unknown(..))
}

/// Return a copy of `jpeg` whose EXIF APP1 segment holds `tiff`.
///
/// Any existing EXIF segment is dropped; the new one goes right after SOI
/// and any leading APP0 (JFIF) segments. Scan data is copied verbatim.
pub(crate) fn replace_exif_segment(jpeg: &[u8], tiff: &[u8]) -> Result<Vec<u8>, String> {
    if !jpeg.starts_with(&[0xFF, 0xD8]) {
        return Err("missing JPEG start-of-image marker".to_string());
    }

    let segment_len = EXIF_HEADER.len() + tiff.len() + 2;
    let segment_len =
        u16::try_from(segment_len).map_err(|_| "EXIF block too large for APP1".to_string())?;

    let mut app1 = Vec::with_capacity(segment_len as usize + 2);
    app1.extend_from_slice(&[0xFF, 0xE1]);
    app1.extend_from_slice(&segment_len.to_be_bytes());
    app1.extend_from_slice(EXIF_HEADER);
    app1.extend_from_slice(tiff);

    let mut out = Vec::with_capacity(jpeg.len() + app1.len());
    out.extend_from_slice(&jpeg[..2]);
    let mut inserted = false;
    let mut pos = 2;

    loop {
        if pos + 1 >= jpeg.len() {
            return Err("truncated JPEG: no start-of-scan".to_string());
        }
        if jpeg[pos] != 0xFF {
            return Err(format!("expected JPEG marker at offset {}", pos));
        }

        let marker = jpeg[pos + 1];
        match marker {
            // Fill byte before a marker
            0xFF => {
                pos += 1;
            }
            // Start of scan or end of image: the rest is entropy-coded data
            0xDA | 0xD9 => {
                if !inserted {
                    out.extend_from_slice(&app1);
                }
                out.extend_from_slice(&jpeg[pos..]);
                return Ok(out);
            }
            // Standalone markers carry no length
            0x01 | 0xD0..=0xD7 => {
                out.extend_from_slice(&jpeg[pos..pos + 2]);
                pos += 2;
            }
            _ => {
                if pos + 4 > jpeg.len() {
                    return Err("truncated JPEG segment header".to_string());
                }
                let len = u16::from_be_bytes([jpeg[pos + 2], jpeg[pos + 3]]) as usize;
                let end = pos + 2 + len;
                if len < 2 || end > jpeg.len() {
                    return Err(format!("invalid JPEG segment length at offset {}", pos));
                }

                let segment = &jpeg[pos..end];
                let is_exif = marker == 0xE1 && segment[4..].starts_with(EXIF_HEADER);

                if !inserted && marker != 0xE0 {
                    out.extend_from_slice(&app1);
                    inserted = true;
                }
                if !is_exif {
                    out.extend_from_slice(segment);
                }
                pos = end;
            }
        }
    }
}

fn replace_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    let permissions = fs::metadata(path)?.permissions();

    let mut temp = NamedTempFile::new_in(parent)?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    fs::set_permissions(temp.path(), permissions)?;
    temp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
