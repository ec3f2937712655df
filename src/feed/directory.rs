use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::config::Config;

/// A podcast found by a directory search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub feed_url: String,
    pub name: String,
}

/// Errors that can occur while querying the directory service.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The configured endpoint is not a valid URL
    #[error("invalid directory URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// HTTP request failed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Directory answered with a non-2xx status
    #[error("directory returned status {0}")]
    Status(u16),
    /// Response was not the expected JSON shape
    #[error("invalid directory response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    feed_url: Option<String>,
    collection_name: Option<String>,
}

/// Client for an iTunes Search API compatible podcast directory.
///
/// The directory is an external service; this only forwards the query and
/// keeps results that carry both a feed URL and a display name.
#[derive(Clone)]
pub struct DirectoryClient {
    client: reqwest::Client,
    endpoint: String,
    limit: u32,
}

impl DirectoryClient {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, limit: u32) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            limit,
        }
    }

    pub fn from_config(client: reqwest::Client, config: &Config) -> Self {
        Self::new(client, config.directory_url.clone(), config.directory_limit)
    }

    /// Searches the directory for podcasts matching `query`.
    ///
    /// A blank query returns no results without contacting the service.
    pub async fn search(&self, query: &str) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut url = Url::parse(&self.endpoint)?;
        url.query_pairs_mut()
            .append_pair("term", query)
            .append_pair("media", "podcast")
            .append_pair("limit", &self.limit.to_string());

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(DirectoryError::Status(response.status().as_u16()));
        }

        let bytes = response.bytes().await?;
        let parsed: SearchResponse = serde_json::from_slice(&bytes)?;

        let entries: Vec<DirectoryEntry> = parsed
            .results
            .into_iter()
            .filter_map(|r| {
                let feed_url = r.feed_url.filter(|u| !u.trim().is_empty())?;
                let name = r.collection_name.filter(|n| !n.trim().is_empty())?;
                Some(DirectoryEntry { feed_url, name })
            })
            .collect();

        tracing::debug!(query = %query, results = entries.len(), "Directory search complete");
        Ok(entries)
    }
}
