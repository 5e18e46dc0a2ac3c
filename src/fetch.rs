//! Blocking HTTP retrieval

use std::time::Duration;
use reqwest::Url;
use tracing::debug;
use crate::error::{Error, Result};

/// Source of remote bytes
///
/// The run driver only talks to the network through this trait so a batch can
/// be driven from memory in tests.
pub trait Fetch {
    /// GET `url` and return the full response body
    ///
    /// Non-success statuses are errors.
    fn fetch(&self, url: &Url) -> Result<Vec<u8>>;
}

/// `Fetch` implementation backed by a blocking reqwest client
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::blocking::Client,
}

impl HttpClient {
    /// Build a client, optionally bounding every request by `timeout`
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = reqwest::blocking::Client::builder()
            .user_agent(concat!("pdf-letterhead/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10));

        // reqwest's blocking client defaults to a 30s timeout; keep "no timeout" unless asked
        builder = builder.timeout(timeout);

        Ok(Self { client: builder.build()? })
    }
}

impl Fetch for HttpClient {
    fn fetch(&self, url: &Url) -> Result<Vec<u8>> {
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes()?;
        debug!(%url, bytes = body.len(), "response received");
        Ok(body.to_vec())
    }
}
