use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use reqwest::header::{HeaderMap, HeaderValue, RANGE, USER_AGENT};

use crate::error::NwpError;
use crate::index::ByteRange;

pub trait Transport: Send + Sync {
    fn fetch_text(&self, url: &str) -> Result<String, NwpError>;

    fn download(&self, url: &str, destination: &Path) -> Result<u64, NwpError>;

    fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
        sink: &mut dyn Write,
    ) -> Result<u64, NwpError>;
}

#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, NwpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("nwp-cache/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| NwpError::Transfer(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|err| NwpError::Transfer(err.to_string()))?;
        Ok(Self { client })
    }

    fn handle_status(response: Response, expected: StatusCode) -> Result<Response, NwpError> {
        if response.status() == expected {
            return Ok(response);
        }
        Err(NwpError::TransferStatus {
            status: response.status().as_u16(),
            url: response.url().to_string(),
        })
    }

    fn get(&self, url: &str) -> Result<Response, NwpError> {
        self.client
            .get(url)
            .send()
            .map_err(|err| NwpError::Transfer(err.to_string()))
    }
}

impl Transport for HttpTransport {
    fn fetch_text(&self, url: &str) -> Result<String, NwpError> {
        let response = Self::handle_status(self.get(url)?, StatusCode::OK)?;
        response
            .text()
            .map_err(|err| NwpError::Transfer(err.to_string()))
    }

    fn download(&self, url: &str, destination: &Path) -> Result<u64, NwpError> {
        let mut response = Self::handle_status(self.get(url)?, StatusCode::OK)?;
        let mut file =
            File::create(destination).map_err(|err| NwpError::Filesystem(err.to_string()))?;
        io::copy(&mut response, &mut file).map_err(|err| NwpError::Transfer(err.to_string()))
    }

    fn fetch_range(
        &self,
        url: &str,
        range: ByteRange,
        sink: &mut dyn Write,
    ) -> Result<u64, NwpError> {
        let response = self
            .client
            .get(url)
            .header(RANGE, range.header_value())
            .send()
            .map_err(|err| NwpError::Transfer(err.to_string()))?;
        // A 200 here would be the whole file.
        let mut response = Self::handle_status(response, StatusCode::PARTIAL_CONTENT)?;
        io::copy(&mut response, sink).map_err(|err| NwpError::Transfer(err.to_string()))
    }
}
