//! Filesystem moves for sorted files.

use crate::error::FileError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Upper bound on `_N` suffix attempts for one destination
pub const MAX_SUFFIX_ATTEMPTS: usize = 10_000;

/// Move `source` to `destination`, creating parent directories.
///
/// A plain rename is tried first. When that fails (for example across
/// filesystems) the file is copied, the copy's size is checked against the
/// source, and only then is the source removed.
pub fn move_file(source: &Path, destination: &Path) -> Result<(), FileError> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent).map_err(|e| FileError::io(parent, e))?;
    }

    fs::rename(source, destination)
        .or_else(|_| copy_then_remove(source, destination))
        .map_err(|e| FileError::io(source, e))
}

fn copy_then_remove(source: &Path, destination: &Path) -> io::Result<()> {
    let source_size = fs::metadata(source)?.len();
    fs::copy(source, destination)?;

    let dest_size = fs::metadata(destination)?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(destination);
        return Err(io::Error::other(format!(
            "copy verification failed: source {} bytes, destination {} bytes",
            source_size, dest_size
        )));
    }

    fs::remove_file(source)
}

/// Delete a duplicate
pub fn remove_file(path: &Path) -> Result<(), FileError> {
    fs::remove_file(path).map_err(|e| FileError::io(path, e))
}

/// `dir/stem.ext` becomes `dir/stem_<n>.ext`
pub fn with_numeric_suffix(path: &Path, n: usize) -> PathBuf {
    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let parent = path.parent().unwrap_or(Path::new(""));

    let name = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}_{}.{}", stem, n, ext),
        None => format!("{}_{}", stem, n),
    };
    parent.join(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn move_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.jpg");
        fs::write(&source, b"photo").unwrap();
        let dest = temp.path().join("2024/01/a.jpg");

        move_file(&source, &dest).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"photo");
    }

    #[test]
    fn move_missing_source_is_io_error() {
        let temp = TempDir::new().unwrap();
        let result = move_file(&temp.path().join("gone.jpg"), &temp.path().join("x.jpg"));
        assert!(matches!(result, Err(FileError::Io { .. })));
    }

    #[test]
    fn copy_fallback_removes_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("a.jpg");
        let dest = temp.path().join("b.jpg");
        fs::write(&source, b"photo bytes").unwrap();

        copy_then_remove(&source, &dest).unwrap();

        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"photo bytes");
    }

    #[test]
    fn numeric_suffix_goes_before_extension() {
        assert_eq!(
            with_numeric_suffix(Path::new("/out/2024/img.jpg"), 2),
            PathBuf::from("/out/2024/img_2.jpg")
        );
        assert_eq!(
            with_numeric_suffix(Path::new("/out/noext"), 1),
            PathBuf::from("/out/noext_1")
        );
    }
}
