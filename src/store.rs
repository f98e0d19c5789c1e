use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use tempfile::{Builder, NamedTempFile};

use crate::config::ResolvedConfig;
use crate::domain::{CacheFileKind, Descriptor, ModelKind, parse_file_name};
use crate::error::NwpError;

const PARTIAL_DIR: &str = ".partial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListMode {
    /// Unparsable names are collected in `CacheListing::rejected`.
    #[default]
    Lenient,
    Strict,
}

#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheEntry {
    pub descriptor: Descriptor,
    pub path: Utf8PathBuf,
    pub file_kind: CacheFileKind,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CacheListing {
    pub entries: Vec<CacheEntry>,
    pub rejected: Vec<String>,
}

impl Store {
    pub fn new(config: &ResolvedConfig) -> Self {
        Self::new_with_root(config.cache_root.clone())
    }

    pub fn new_with_root(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn model_dir(&self, kind: ModelKind) -> Utf8PathBuf {
        self.cache_root.join(kind.prefix())
    }

    pub fn local_path(&self, descriptor: &Descriptor) -> Utf8PathBuf {
        descriptor.local_path(&self.cache_root)
    }

    pub fn subset_path(&self, descriptor: &Descriptor) -> Utf8PathBuf {
        self.model_dir(descriptor.kind())
            .join(descriptor.subset_file_name())
    }

    pub fn exists(&self, path: &Utf8Path) -> bool {
        path.as_std_path().is_file()
    }

    pub fn ensure_cache_root(&self) -> Result<(), NwpError> {
        fs::create_dir_all(self.cache_root.as_std_path())
            .map_err(|err| NwpError::Filesystem(err.to_string()))
    }

    // Temp files for cache paths live in `<cache_root>/.partial` so listings never see them.
    pub fn write_atomic<T, F>(&self, dest: &Utf8Path, fill: F) -> Result<T, NwpError>
    where
        F: FnOnce(&mut NamedTempFile) -> Result<T, NwpError>,
    {
        let parent = dest
            .parent()
            .filter(|parent| !parent.as_str().is_empty())
            .unwrap_or(Utf8Path::new("."));
        let temp_dir = if dest.starts_with(&self.cache_root) {
            self.cache_root.join(PARTIAL_DIR)
        } else {
            parent.to_path_buf()
        };
        for dir in [parent, temp_dir.as_path()] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| NwpError::Filesystem(err.to_string()))?;
        }
        let mut temp = Builder::new()
            .prefix(".nwp-cache")
            .tempfile_in(temp_dir.as_std_path())
            .map_err(|err| NwpError::Filesystem(err.to_string()))?;
        let value = fill(&mut temp)?;
        temp.persist(dest.as_std_path())
            .map_err(|err| NwpError::Filesystem(err.to_string()))?;
        Ok(value)
    }

    pub fn list(&self, kind: ModelKind, mode: ListMode) -> Result<CacheListing, NwpError> {
        let dir = self.model_dir(kind);
        let mut listing = CacheListing::default();
        if !dir.as_std_path().exists() {
            return Ok(listing);
        }

        let entries =
            fs::read_dir(dir.as_std_path()).map_err(|err| NwpError::Filesystem(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| NwpError::Filesystem(err.to_string()))?;
            let name = entry.file_name().to_string_lossy().to_string();
            let metadata = entry
                .metadata()
                .map_err(|err| NwpError::Filesystem(err.to_string()))?;
            let parsed = if metadata.is_file() {
                parse_file_name(&name)
                    .ok()
                    .filter(|(descriptor, _)| descriptor.kind() == kind)
            } else {
                None
            };
            match parsed {
                Some((descriptor, file_kind)) => listing.entries.push(CacheEntry {
                    descriptor,
                    path: dir.join(&name),
                    file_kind,
                    size_bytes: metadata.len(),
                }),
                None => match mode {
                    ListMode::Strict => return Err(NwpError::UnparsableCacheFilename(name)),
                    ListMode::Lenient => listing.rejected.push(name),
                },
            }
        }
        listing.entries.sort_by(|a, b| a.path.cmp(&b.path));
        listing.rejected.sort();
        Ok(listing)
    }

    pub fn list_all(&self, mode: ListMode) -> Result<CacheListing, NwpError> {
        let mut listing = CacheListing::default();
        for kind in ModelKind::ALL {
            let CacheListing { entries, rejected } = self.list(kind, mode)?;
            listing.entries.extend(entries);
            listing
                .rejected
                .extend(rejected.into_iter().map(|name| format!("{kind}/{name}")));
        }
        Ok(listing)
    }

    pub fn remove(&self, descriptor: &Descriptor) -> Result<bool, NwpError> {
        remove_if_present(&self.local_path(descriptor))
    }

    pub fn remove_subset(&self, descriptor: &Descriptor) -> Result<bool, NwpError> {
        remove_if_present(&self.subset_path(descriptor))
    }

    pub fn clear_model(&self, kind: ModelKind) -> Result<(), NwpError> {
        let dir = self.model_dir(kind);
        if dir.as_std_path().exists() {
            fs::remove_dir_all(dir.as_std_path())
                .map_err(|err| NwpError::Filesystem(err.to_string()))?;
        }
        fs::create_dir_all(dir.as_std_path()).map_err(|err| NwpError::Filesystem(err.to_string()))
    }

    pub fn clear_all(&self) -> Result<(), NwpError> {
        if self.cache_root.as_std_path().exists() {
            fs::remove_dir_all(self.cache_root.as_std_path())
                .map_err(|err| NwpError::Filesystem(err.to_string()))?;
        }
        self.ensure_cache_root()
    }
}

fn remove_if_present(path: &Utf8Path) -> Result<bool, NwpError> {
    match fs::remove_file(path.as_std_path()) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(NwpError::Filesystem(err.to_string())),
    }
}
