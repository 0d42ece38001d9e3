//! Run-scoped map from fingerprint to the first file seen with it.

use super::Fingerprint;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Result of presenting a file to the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// First time this content is seen; the file is now registered
    New,
    /// Already registered under this very path
    Same,
    /// Identical content was seen first at the given path
    DuplicateOf(PathBuf),
}

/// Fingerprint index for one run.
///
/// Created empty, filled as files are processed, dropped when the run ends.
/// Entries follow files when they move so later duplicates point at the
/// surviving copy.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    entries: HashMap<Fingerprint, PathBuf>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up `fingerprint`, registering `path` when it is new
    pub fn check_or_register(&mut self, fingerprint: Fingerprint, path: &Path) -> Lookup {
        match self.entries.get(&fingerprint) {
            Some(first) if first == path => Lookup::Same,
            Some(first) => Lookup::DuplicateOf(first.clone()),
            None => {
                self.entries.insert(fingerprint, path.to_path_buf());
                Lookup::New
            }
        }
    }

    /// Register `path` for `fingerprint` unless it is already known
    pub fn register(&mut self, fingerprint: Fingerprint, path: &Path) {
        self.entries
            .entry(fingerprint)
            .or_insert_with(|| path.to_path_buf());
    }

    /// Point every entry for `from` at `to`
    pub fn relocate(&mut self, from: &Path, to: &Path) {
        for path in self.entries.values_mut() {
            if path == from {
                *path = to.to_path_buf();
            }
        }
    }

    /// Drop every entry pointing at `path` (its content was replaced)
    pub fn forget_path(&mut self, path: &Path) {
        self.entries.retain(|_, p| p != path);
    }

    /// First-seen path for `fingerprint`
    pub fn first_seen(&self, fingerprint: &Fingerprint) -> Option<&Path> {
        self.entries.get(fingerprint).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_seen_wins() {
        let mut index = FingerprintIndex::new();
        let fp = Fingerprint::of_bytes(b"photo");

        assert_eq!(index.check_or_register(fp, Path::new("/a.jpg")), Lookup::New);
        assert_eq!(
            index.check_or_register(fp, Path::new("/b.jpg")),
            Lookup::DuplicateOf(PathBuf::from("/a.jpg"))
        );
        assert_eq!(index.first_seen(&fp), Some(Path::new("/a.jpg")));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn same_path_is_not_a_duplicate() {
        let mut index = FingerprintIndex::new();
        let fp = Fingerprint::of_bytes(b"photo");

        index.check_or_register(fp, Path::new("/a.jpg"));
        assert_eq!(index.check_or_register(fp, Path::new("/a.jpg")), Lookup::Same);
    }

    #[test]
    fn relocate_follows_moves() {
        let mut index = FingerprintIndex::new();
        let fp = Fingerprint::of_bytes(b"photo");
        index.check_or_register(fp, Path::new("/in/a.jpg"));

        index.relocate(Path::new("/in/a.jpg"), Path::new("/out/2024/a.jpg"));

        assert_eq!(
            index.check_or_register(fp, Path::new("/in/b.jpg")),
            Lookup::DuplicateOf(PathBuf::from("/out/2024/a.jpg"))
        );
    }

    #[test]
    fn forget_path_drops_overwritten_content() {
        let mut index = FingerprintIndex::new();
        let fp = Fingerprint::of_bytes(b"old");
        index.register(fp, Path::new("/out/a.jpg"));

        index.forget_path(Path::new("/out/a.jpg"));

        assert!(index.is_empty());
        assert_eq!(index.check_or_register(fp, Path::new("/in/c.jpg")), Lookup::New);
    }
}
