// src/fetch/mod.rs

use reqwest::blocking::Client;
use std::{fs, time::Duration};
use tracing::{debug, instrument};
use url::Url;

use crate::error::{error_chain, EtlError, Result};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Anything that can hand back the source document as text.
pub trait DocumentSource {
    fn fetch(&self, url: &Url) -> Result<String>;
}

impl<T: DocumentSource + ?Sized> DocumentSource for &T {
    fn fetch(&self, url: &Url) -> Result<String> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP(S) fetcher. `file://` URLs are read from disk so a saved
/// page can be replayed.
pub struct HttpSource {
    client: Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| EtlError::Config(format!("building HTTP client: {}", error_chain(&e))))?;
        Ok(Self { client })
    }

    fn get_text(&self, url: &Url) -> Result<String> {
        let fail = |e: reqwest::Error| {
            let reason = if e.is_timeout() {
                format!("timed out: {}", error_chain(&e))
            } else {
                error_chain(&e)
            };
            EtlError::Fetch {
                url: url.to_string(),
                reason,
            }
        };

        self.client
            .get(url.clone())
            .send()
            .map_err(fail)?
            .error_for_status()
            .map_err(fail)?
            .text()
            .map_err(fail)
    }
}

impl DocumentSource for HttpSource {
    #[instrument(level = "info", skip(self, url), fields(url = %url))]
    fn fetch(&self, url: &Url) -> Result<String> {
        let body = match url.scheme() {
            "http" | "https" => self.get_text(url)?,
            "file" => read_file_url(url)?,
            other => {
                return Err(EtlError::Fetch {
                    url: url.to_string(),
                    reason: format!("unsupported scheme `{}`", other),
                })
            }
        };
        debug!(bytes = body.len(), "fetched document");
        Ok(body)
    }
}

fn read_file_url(url: &Url) -> Result<String> {
    let path = url.to_file_path().map_err(|_| EtlError::Fetch {
        url: url.to_string(),
        reason: "not a local file path".into(),
    })?;
    fs::read_to_string(&path).map_err(|e| EtlError::Fetch {
        url: url.to_string(),
        reason: error_chain(&e),
    })
}
