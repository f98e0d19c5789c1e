use std::io::Write;
use std::time::Instant;

use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::Serialize;

use crate::config::ResolvedConfig;
use crate::domain::{Descriptor, ModelKind};
use crate::error::NwpError;
use crate::index::{self, Band, ByteRange, ParseMode};
use crate::store::{CacheListing, ListMode, Store};
use crate::transport::Transport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchAction {
    Cache,
    Download,
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchResult {
    pub descriptor: Descriptor,
    pub url: String,
    pub path: Utf8PathBuf,
    pub action: FetchAction,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubsetResult {
    pub descriptor: Descriptor,
    pub url: String,
    pub path: Utf8PathBuf,
    pub action: FetchAction,
    pub ranges: Vec<ByteRange>,
    pub bytes: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemoveResult {
    pub path: Utf8PathBuf,
    pub removed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClearResult {
    pub cleared: String,
}

pub struct App<T: Transport> {
    store: Store,
    transport: T,
    index_mode: ParseMode,
    list_mode: ListMode,
}

impl<T: Transport> App<T> {
    pub fn new(store: Store, transport: T) -> Self {
        Self {
            store,
            transport,
            index_mode: ParseMode::default(),
            list_mode: ListMode::default(),
        }
    }

    pub fn from_config(config: &ResolvedConfig, transport: T) -> Self {
        Self::new(Store::new(config), transport).with_modes(config.index_mode, config.list_mode)
    }

    pub fn with_modes(mut self, index_mode: ParseMode, list_mode: ListMode) -> Self {
        self.index_mode = index_mode;
        self.list_mode = list_mode;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn fetch(&self, descriptor: &Descriptor) -> Result<FetchResult, NwpError> {
        let url = descriptor.url();
        let path = self.store.local_path(descriptor);

        if self.store.exists(&path) {
            tracing::debug!(%path, "cache hit");
            return Ok(FetchResult {
                descriptor: descriptor.clone(),
                url,
                path,
                action: FetchAction::Cache,
                bytes: None,
            });
        }

        tracing::debug!(%url, %path, "downloading");
        let start = Instant::now();
        let bytes = self
            .store
            .write_atomic(&path, |temp| self.transport.download(&url, temp.path()))?;
        tracing::debug!(bytes, latency_ms = start.elapsed().as_millis() as u64, "downloaded");

        Ok(FetchResult {
            descriptor: descriptor.clone(),
            url,
            path,
            action: FetchAction::Download,
            bytes: Some(bytes),
        })
    }

    pub fn bands(&self, descriptor: &Descriptor) -> Result<Vec<Band>, NwpError> {
        let url = descriptor.index_url();
        tracing::debug!(%url, "fetching index");
        let text = self.transport.fetch_text(&url)?;
        index::parse_index(&text, self.index_mode)
    }

    pub fn search(&self, descriptor: &Descriptor, pattern: &Regex) -> Result<Vec<Band>, NwpError> {
        Ok(index::search(&self.bands(descriptor)?, pattern))
    }

    /// Writes the selected bands, in the given order, into one file.
    pub fn subset(
        &self,
        descriptor: &Descriptor,
        selected: &[Band],
        output: Option<&Utf8Path>,
    ) -> Result<SubsetResult, NwpError> {
        if selected.is_empty() {
            return Err(NwpError::EmptySelection);
        }
        let path = self.subset_output(descriptor, output);
        if let Some(hit) = self.cached_subset(descriptor, &path) {
            return Ok(hit);
        }
        let reference = self.bands(descriptor)?;
        self.write_subset(descriptor, path, selected, &reference)
    }

    pub fn subset_lines(
        &self,
        descriptor: &Descriptor,
        lines: &[u32],
        output: Option<&Utf8Path>,
    ) -> Result<SubsetResult, NwpError> {
        if lines.is_empty() {
            return Err(NwpError::EmptySelection);
        }
        let path = self.subset_output(descriptor, output);
        if let Some(hit) = self.cached_subset(descriptor, &path) {
            return Ok(hit);
        }
        let reference = self.bands(descriptor)?;
        let selected = index::select_lines(&reference, lines)?;
        self.write_subset(descriptor, path, &selected, &reference)
    }

    pub fn subset_matching(
        &self,
        descriptor: &Descriptor,
        pattern: &Regex,
        output: Option<&Utf8Path>,
    ) -> Result<SubsetResult, NwpError> {
        let path = self.subset_output(descriptor, output);
        if let Some(hit) = self.cached_subset(descriptor, &path) {
            return Ok(hit);
        }
        let reference = self.bands(descriptor)?;
        let selected = index::search(&reference, pattern);
        self.write_subset(descriptor, path, &selected, &reference)
    }

    fn subset_output(&self, descriptor: &Descriptor, output: Option<&Utf8Path>) -> Utf8PathBuf {
        match output {
            Some(path) => path.to_path_buf(),
            None => self.store.subset_path(descriptor),
        }
    }

    fn cached_subset(&self, descriptor: &Descriptor, path: &Utf8Path) -> Option<SubsetResult> {
        if !self.store.exists(path) {
            return None;
        }
        tracing::debug!(%path, "cache hit");
        Some(SubsetResult {
            descriptor: descriptor.clone(),
            url: descriptor.url(),
            path: path.to_path_buf(),
            action: FetchAction::Cache,
            ranges: Vec::new(),
            bytes: None,
        })
    }

    fn write_subset(
        &self,
        descriptor: &Descriptor,
        path: Utf8PathBuf,
        selected: &[Band],
        reference: &[Band],
    ) -> Result<SubsetResult, NwpError> {
        let url = descriptor.url();
        let ranges = index::resolve_ranges(selected, reference)?;

        let bytes = self.store.write_atomic(&path, |temp| {
            let mut total = 0;
            for range in &ranges {
                if range.is_empty() {
                    continue;
                }
                tracing::debug!(%range, "fetching range");
                total += self.transport.fetch_range(&url, *range, &mut *temp)?;
            }
            temp.flush()
                .map_err(|err| NwpError::Filesystem(err.to_string()))?;
            Ok(total)
        })?;

        Ok(SubsetResult {
            descriptor: descriptor.clone(),
            url,
            path,
            action: FetchAction::Download,
            ranges,
            bytes: Some(bytes),
        })
    }

    pub fn list(&self, kind: Option<ModelKind>) -> Result<CacheListing, NwpError> {
        match kind {
            Some(kind) => self.store.list(kind, self.list_mode),
            None => self.store.list_all(self.list_mode),
        }
    }

    pub fn remove(&self, descriptor: &Descriptor, subset: bool) -> Result<RemoveResult, NwpError> {
        let (path, removed) = if subset {
            (
                self.store.subset_path(descriptor),
                self.store.remove_subset(descriptor)?,
            )
        } else {
            (
                self.store.local_path(descriptor),
                self.store.remove(descriptor)?,
            )
        };
        Ok(RemoveResult { path, removed })
    }

    pub fn clear(&self, kind: Option<ModelKind>) -> Result<ClearResult, NwpError> {
        let cleared = match kind {
            Some(kind) => {
                self.store.clear_model(kind)?;
                kind.to_string()
            }
            None => {
                self.store.clear_all()?;
                "all".to_string()
            }
        };
        Ok(ClearResult { cleared })
    }
}
