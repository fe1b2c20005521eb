//! Fixture store: blank audio files used as tune templates.
//!
//! The fixture directory holds one file per supported container, matched by
//! file extension (`blank.flac`, `blank.mp3`, `blank.ogg`). Fixtures are
//! never written to; tunes are copies.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use tagutil_tags::Container;
use walkdir::WalkDir;

use crate::error::{HarnessError, HarnessResult};

/// An immutable template file for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixture {
    /// Extension this fixture was found under.
    pub extension: String,
    /// Location in the fixture directory.
    pub path: PathBuf,
}

impl Fixture {
    /// Reads the template bytes.
    pub fn bytes(&self) -> HarnessResult<Vec<u8>> {
        Ok(fs::read(&self.path)?)
    }

    /// BLAKE3 digest of the template, hex encoded.
    pub fn digest(&self) -> HarnessResult<String> {
        Ok(blake3::hash(&self.bytes()?).to_hex().to_string())
    }
}

/// Fixtures discovered in a directory, grouped by extension.
#[derive(Debug, Clone)]
pub struct FixtureStore {
    dir: PathBuf,
    by_extension: BTreeMap<String, Vec<PathBuf>>,
}

impl FixtureStore {
    /// Scans `dir` (not recursively) for fixture files.
    pub fn open(dir: impl AsRef<Path>) -> HarnessResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        let mut by_extension: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();

        for entry in WalkDir::new(&dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| HarnessError::FixtureStoreUnreadable {
                path: dir.clone(),
                message: e.to_string(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension().and_then(|e| e.to_str()) else {
                continue;
            };
            by_extension
                .entry(ext.to_string())
                .or_default()
                .push(entry.into_path());
        }

        tracing::debug!(
            dir = %dir.display(),
            extensions = ?by_extension.keys().collect::<Vec<_>>(),
            "opened fixture store"
        );
        Ok(Self { dir, by_extension })
    }

    /// Fixture directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Extensions with at least one fixture.
    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.by_extension.keys().map(String::as_str)
    }

    /// Looks up the fixture for `ext`.
    ///
    /// Fails when no file, or more than one file, has that extension.
    pub fn fixture(&self, ext: &str) -> HarnessResult<Fixture> {
        match self.by_extension.get(ext).map(Vec::as_slice) {
            None | Some([]) => Err(HarnessError::unknown_extension(ext)),
            Some([path]) => Ok(Fixture {
                extension: ext.to_string(),
                path: path.clone(),
            }),
            Some(paths) => Err(HarnessError::AmbiguousFixture {
                ext: ext.to_string(),
                count: paths.len(),
            }),
        }
    }

    /// Fixture for a supported container.
    pub fn for_container(&self, container: Container) -> HarnessResult<Fixture> {
        self.fixture(container.extension())
    }

    /// Checks that every supported container has exactly one fixture.
    pub fn verify(&self) -> HarnessResult<()> {
        for container in Container::ALL {
            self.for_container(container)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HarnessConfig;
    use tempfile::TempDir;

    #[test]
    fn test_shipped_fixtures_are_complete() {
        let store = FixtureStore::open(HarnessConfig::default().fixtures_dir).unwrap();
        store.verify().unwrap();
        let exts: Vec<&str> = store.extensions().collect();
        assert_eq!(exts, vec!["flac", "mp3", "ogg"]);
    }

    #[test]
    fn test_shipped_fixtures_have_container_magic() {
        let store = FixtureStore::open(HarnessConfig::default().fixtures_dir).unwrap();

        let flac = store.for_container(Container::Flac).unwrap().bytes().unwrap();
        assert_eq!(&flac[..4], b"fLaC");

        let ogg = store.for_container(Container::Ogg).unwrap().bytes().unwrap();
        assert_eq!(&ogg[..4], b"OggS");

        let mp3 = store.for_container(Container::Mp3).unwrap().bytes().unwrap();
        assert_eq!(mp3[0], 0xFF);
        assert_eq!(mp3[1] & 0xE0, 0xE0);
    }

    #[test]
    fn test_unknown_extension() {
        let store = FixtureStore::open(HarnessConfig::default().fixtures_dir).unwrap();
        let err = store.fixture("wav").unwrap_err();
        assert!(matches!(err, HarnessError::UnknownExtension { ref ext } if ext == "wav"));
    }

    #[test]
    fn test_ambiguous_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.flac"), b"fLaC").unwrap();
        fs::write(dir.path().join("b.flac"), b"fLaC").unwrap();
        fs::write(dir.path().join("blank.ogg"), b"OggS").unwrap();

        let store = FixtureStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.fixture("flac"),
            Err(HarnessError::AmbiguousFixture { count: 2, .. })
        ));
        assert!(store.fixture("ogg").is_ok());
        assert!(store.verify().is_err());
    }

    #[test]
    fn test_subdirectories_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested.mp3")).unwrap();
        fs::create_dir(dir.path().join("more")).unwrap();
        fs::write(dir.path().join("more").join("deep.mp3"), b"ID3").unwrap();

        let store = FixtureStore::open(dir.path()).unwrap();
        assert!(store.fixture("mp3").is_err());
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = FixtureStore::open(dir.path().join("absent")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_digest_is_stable() {
        let store = FixtureStore::open(HarnessConfig::default().fixtures_dir).unwrap();
        let fixture = store.for_container(Container::Flac).unwrap();
        assert_eq!(fixture.digest().unwrap(), fixture.digest().unwrap());
        assert_eq!(fixture.digest().unwrap().len(), 64);
    }
}
