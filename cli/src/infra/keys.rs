//! Infrastructure implementation of the `KeyProvider` port.
//!
//! Fetches an authorized_keys document over HTTP(S) with `ureq`, or reads it
//! from a local `file://` path.

use std::time::Duration;

use tracing::{debug, warn};

use crate::application::ports::KeyProvider;
use crate::domain::error::KeyProviderError;
use crate::domain::keys::parse_key_document;

const USER_AGENT: &str = concat!("rpi-provisioner/", env!("CARGO_PKG_VERSION"));

pub struct HttpKeyProvider {
    timeout: Duration,
}

impl HttpKeyProvider {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn download(&self, uri: &str) -> Result<String, KeyProviderError> {
        let fetch = |reason: String| KeyProviderError::Fetch {
            uri: uri.to_string(),
            reason,
        };
        match ureq::get(uri)
            .timeout(self.timeout)
            .set("User-Agent", USER_AGENT)
            .call()
        {
            Ok(resp) => resp
                .into_string()
                .map_err(|e| fetch(format!("reading response: {e}"))),
            Err(ureq::Error::Status(403, _)) => Err(fetch(
                "HTTP 403 (is the object publicly readable?)".to_string(),
            )),
            Err(ureq::Error::Status(code, _)) => Err(fetch(format!("HTTP {code}"))),
            Err(e) => Err(fetch(e.to_string())),
        }
    }
}

fn read_local(uri: &str, path: &str) -> Result<String, KeyProviderError> {
    std::fs::read_to_string(path).map_err(|e| KeyProviderError::Fetch {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

impl KeyProvider for HttpKeyProvider {
    fn fetch_keys(&self, uri: &str) -> Result<Vec<String>, KeyProviderError> {
        let body = if uri.starts_with("https://") || uri.starts_with("http://") {
            self.download(uri)?
        } else if let Some(path) = uri.strip_prefix("file://") {
            read_local(uri, path)?
        } else {
            return Err(KeyProviderError::UnsupportedScheme(uri.to_string()));
        };

        let (keys, rejected) = parse_key_document(&body);
        for (line, reason) in &rejected {
            warn!(%uri, line, %reason, "skipping unparseable key line");
        }
        if keys.is_empty() {
            return Err(KeyProviderError::Empty(uri.to_string()));
        }
        debug!(%uri, keys = keys.len(), "fetched authorized keys");
        Ok(keys)
    }
}
