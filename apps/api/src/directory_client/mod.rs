/// Directory client — the single point of entry for calls to the HR directory API.
///
/// The directory answers a bearer-authenticated GET with an XML document whose
/// item list sits at a configurable dotted path. No other module may call the
/// directory directly.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::recipient::RawDirectoryEntry;

pub mod xml;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("XML parse error: {0}")]
    Xml(String),

    #[error("item list not found at '{0}'")]
    MissingItems(String),
}

/// Source of raw directory records. Implemented over HTTP in production and
/// mocked in tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn fetch_entries(&self) -> Result<Vec<RawDirectoryEntry>, DirectoryError>;
}

#[derive(Clone)]
pub struct HttpDirectoryClient {
    client: Client,
    url: String,
    api_key: String,
    items_path: String,
}

impl HttpDirectoryClient {
    pub fn new(url: String, api_key: String, items_path: String) -> Result<Self, DirectoryError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            url,
            api_key,
            items_path,
        })
    }
}

#[async_trait]
impl DirectoryClient for HttpDirectoryClient {
    async fn fetch_entries(&self) -> Result<Vec<RawDirectoryEntry>, DirectoryError> {
        let response = self
            .client
            .get(&self.url)
            .bearer_auth(&self.api_key)
            .header("accept", "application/xml")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Directory API returned {}: {}", status, body);
            return Err(DirectoryError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = response.text().await?;
        let document = xml::parse_document(&body)?;
        let entries = xml::extract_items(&document, &self.items_path)?;

        debug!(
            "Directory fetch succeeded: {} bytes, {} entries",
            body.len(),
            entries.len()
        );

        Ok(entries)
    }
}
