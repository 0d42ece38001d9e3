//! # Metadata Module
//!
//! Reads the EXIF capture date from photo files, and writes a resolved
//! date back into JPEG files that lack a usable one.
//!
//! ## Date Tags
//! Tried in order on the primary IFD:
//! - `DateTimeOriginal` (when the photo was taken)
//! - `DateTimeDigitized`
//! - `DateTime`
//!
//! EXIF is found in JPEG, TIFF, PNG, WebP and HEIF containers.
//! Writing is only supported for JPEG.

mod writer;

pub use writer::{write_capture_date, DatedJpeg};

use crate::error::MetadataError;
use chrono::{NaiveDate, NaiveDateTime};
use exif::{Exif, In, Reader, Tag, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// EXIF date/time text layout
pub const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Date tags in priority order
pub const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Read the capture date embedded in a file.
///
/// Returns `Ok(None)` when the file carries no EXIF block or no date tag.
/// Returns an error when the EXIF block cannot be parsed or every present
/// date tag holds an invalid value.
pub fn read_capture_date(path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
    let file = File::open(path).map_err(|e| MetadataError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut bufreader = BufReader::new(file);
    let exif = match Reader::new().read_from_container(&mut bufreader) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => {
            return Err(MetadataError::Read {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
        }
    };

    capture_date(&exif, path)
}

fn capture_date(exif: &Exif, path: &Path) -> Result<Option<NaiveDateTime>, MetadataError> {
    let mut malformed = None;

    for tag in DATE_TAGS {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };

        match parse_exif_datetime(&field.value) {
            Some(datetime) => return Ok(Some(datetime)),
            None => {
                tracing::debug!("{}: unusable {} {}", path.display(), tag, field.display_value());
                malformed.get_or_insert_with(|| MetadataError::Malformed {
                    path: path.to_path_buf(),
                    tag: tag.to_string(),
                    value: field.display_value().to_string(),
                });
            }
        }
    }

    match malformed {
        Some(error) => Err(error),
        None => Ok(None),
    }
}

/// Parse an EXIF ASCII date value, rejecting impossible calendar dates
/// such as the `0000:00:00 00:00:00` some cameras write.
fn parse_exif_datetime(value: &Value) -> Option<NaiveDateTime> {
    let Value::Ascii(ref vec) = value else {
        return None;
    };
    let bytes = vec.first()?;
    let dt = exif::DateTime::from_ascii(bytes).ok()?;

    NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?.and_hms_opt(
        dt.hour.into(),
        dt.minute.into(),
        dt.second.into(),
    )
}
