use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use log::debug;
use sha2::{Digest, Sha256};

/// Outcome of destination resolution for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// A destination no file on disk or earlier in this run occupies.
    Unique(PathBuf),
    /// An identical copy already exists (on disk or planned) at this path.
    Duplicate(PathBuf),
}

/// Resolves proposed destinations against both the filesystem and the
/// paths reserved earlier in the run. Planned transfers are not on disk
/// yet, so each reservation keeps the source path that claimed it for
/// content comparison.
#[derive(Debug)]
pub struct DestResolver {
    reserved: HashMap<PathBuf, PathBuf>,
    remove_duplicates: bool,
    keep_filename: bool,
}

impl DestResolver {
    pub fn new(remove_duplicates: bool, keep_filename: bool) -> Self {
        Self {
            reserved: HashMap::new(),
            remove_duplicates,
            keep_filename,
        }
    }

    /// Find a collision-free name for `source` under `dir`, probing
    /// `name_1`, `name_2`, … until a free slot or an identical file is
    /// found.
    pub fn resolve(
        &mut self,
        dir: &Path,
        filename: &str,
        source: &Path,
    ) -> io::Result<Resolution> {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("file");
        let ext = Path::new(filename)
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        let mut candidate = dir.join(filename);
        let mut append = 1u32;

        loop {
            let occupant = match self.reserved.get(&candidate) {
                Some(prior_source) => Some(prior_source.clone()),
                None if candidate.is_file() => Some(candidate.clone()),
                None => None,
            };
            let Some(existing) = occupant else {
                self.reserved.insert(candidate.clone(), source.to_path_buf());
                return Ok(Resolution::Unique(candidate));
            };

            if self.remove_duplicates && same_content(source, &existing)? {
                debug!("{}: identical file already at {}", source.display(), candidate.display());
                return Ok(Resolution::Duplicate(candidate));
            }

            let name = if self.keep_filename {
                let original = source
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or("file");
                numbered(&format!("{stem}_{original}"), ext, append)
            } else {
                numbered(stem, ext, append)
            };
            debug!("{} taken, trying {name}", candidate.display());
            candidate = dir.join(name);
            append += 1;
        }
    }
}

fn numbered(stem: &str, ext: &str, n: u32) -> String {
    if ext.is_empty() {
        format!("{stem}_{n}")
    } else {
        format!("{stem}_{n}.{ext}")
    }
}

/// Byte-for-byte identity: equal length, then equal SHA-256 digest.
fn same_content(a: &Path, b: &Path) -> io::Result<bool> {
    if std::fs::metadata(a)?.len() != std::fs::metadata(b)?.len() {
        return Ok(false);
    }
    Ok(file_digest(a)? == file_digest(b)?)
}

fn file_digest(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_free_destination_accepted_as_is() {
        let tmp = tempfile::tempdir().unwrap();
        let src = write(tmp.path(), "src.jpg", "aaa");
        let mut resolver = DestResolver::new(true, false);
        let got = resolver.resolve(tmp.path(), "photo.jpg", &src).unwrap();
        assert_eq!(got, Resolution::Unique(tmp.path().join("photo.jpg")));
    }

    #[test]
    fn test_identical_existing_file_is_a_duplicate() {
        let tmp = tempfile::tempdir().unwrap();
        let src = write(tmp.path(), "src.jpg", "same bytes");
        write(tmp.path(), "photo.jpg", "same bytes");
        let mut resolver = DestResolver::new(true, false);
        let got = resolver.resolve(tmp.path(), "photo.jpg", &src).unwrap();
        assert_eq!(got, Resolution::Duplicate(tmp.path().join("photo.jpg")));
    }

    #[test]
    fn test_identical_file_suffixed_when_dedup_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let src = write(tmp.path(), "src.jpg", "same bytes");
        write(tmp.path(), "photo.jpg", "same bytes");
        let mut resolver = DestResolver::new(false, false);
        let got = resolver.resolve(tmp.path(), "photo.jpg", &src).unwrap();
        assert_eq!(got, Resolution::Unique(tmp.path().join("photo_1.jpg")));
    }

    #[test]
    fn test_different_content_gets_numeric_suffix() {
        let tmp = tempfile::tempdir().unwrap();
        let src = write(tmp.path(), "src.jpg", "new bytes");
        write(tmp.path(), "photo.jpg", "old bytes");
        let mut resolver = DestResolver::new(true, false);
        let got = resolver.resolve(tmp.path(), "photo.jpg", &src).unwrap();
        assert_eq!(got, Resolution::Unique(tmp.path().join("photo_1.jpg")));
    }

    #[test]
    fn test_linear_probing_over_reservations() {
        let tmp = tempfile::tempdir().unwrap();
        let a = write(tmp.path(), "a.jpg", "aaa");
        let b = write(tmp.path(), "b.jpg", "bbb");
        let c = write(tmp.path(), "c.jpg", "ccc");
        let mut resolver = DestResolver::new(true, false);
        assert_eq!(
            resolver.resolve(tmp.path(), "photo.jpg", &a).unwrap(),
            Resolution::Unique(tmp.path().join("photo.jpg"))
        );
        assert_eq!(
            resolver.resolve(tmp.path(), "photo.jpg", &b).unwrap(),
            Resolution::Unique(tmp.path().join("photo_1.jpg"))
        );
        assert_eq!(
            resolver.resolve(tmp.path(), "photo.jpg", &c).unwrap(),
            Resolution::Unique(tmp.path().join("photo_2.jpg"))
        );
    }

    #[test]
    fn test_duplicate_of_planned_but_unwritten_transfer() {
        // nothing at the destination on disk, only a reservation
        let tmp = tempfile::tempdir().unwrap();
        let dest_dir = tmp.path().join("out");
        fs::create_dir(&dest_dir).unwrap();
        let a = write(tmp.path(), "a.jpg", "same bytes");
        let b = write(tmp.path(), "b.jpg", "same bytes");
        let mut resolver = DestResolver::new(true, false);
        assert_eq!(
            resolver.resolve(&dest_dir, "photo.jpg", &a).unwrap(),
            Resolution::Unique(dest_dir.join("photo.jpg"))
        );
        assert_eq!(
            resolver.resolve(&dest_dir, "photo.jpg", &b).unwrap(),
            Resolution::Duplicate(dest_dir.join("photo.jpg"))
        );
    }

    #[test]
    fn test_keep_filename_suffix_scheme() {
        let tmp = tempfile::tempdir().unwrap();
        let src = write(tmp.path(), "IMG_4242.jpg", "new bytes");
        write(tmp.path(), "photo.jpg", "old bytes");
        let mut resolver = DestResolver::new(true, true);
        let got = resolver.resolve(tmp.path(), "photo.jpg", &src).unwrap();
        assert_eq!(got, Resolution::Unique(tmp.path().join("photo_IMG_4242_1.jpg")));
    }

    #[test]
    fn test_missing_source_is_an_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "photo.jpg", "old bytes");
        let mut resolver = DestResolver::new(true, false);
        let missing = tmp.path().join("gone.jpg");
        assert!(resolver.resolve(tmp.path(), "photo.jpg", &missing).is_err());
    }
}
