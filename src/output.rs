use std::io::{self, Write};

use serde::Serialize;

use crate::app::{ClearResult, FetchResult, RemoveResult, SubsetResult};
use crate::catalog::ModelCatalog;
use crate::domain::Descriptor;
use crate::index::Band;
use crate::store::CacheListing;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_fetch(result: &FetchResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_subset(result: &SubsetResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_bands(bands: &[Band]) -> io::Result<()> {
        Self::print_json(&bands)
    }

    pub fn print_list(listing: &CacheListing) -> io::Result<()> {
        Self::print_json(listing)
    }

    pub fn print_remove(result: &RemoveResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_clear(result: &ClearResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_catalog(catalog: &ModelCatalog) -> io::Result<()> {
        Self::print_json(catalog)
    }

    pub fn print_descriptor(descriptor: &Descriptor) -> io::Result<()> {
        #[derive(Serialize)]
        struct DescriptorView<'a> {
            descriptor: &'a Descriptor,
            url: String,
            index_url: String,
            file_name: String,
        }

        Self::print_json(&DescriptorView {
            descriptor,
            url: descriptor.url(),
            index_url: descriptor.index_url(),
            file_name: descriptor.file_name(),
        })
    }

    fn print_json<T: Serialize + ?Sized>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
