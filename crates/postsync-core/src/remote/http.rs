//! HTTP page source backed by reqwest.

use reqwest::StatusCode;

use super::RemoteSource;
use crate::error::{Error, Result};
use crate::models::Post;
use crate::util::{compact_text, is_http_url, normalize_text_option};

/// Fetches `GET {base_url}/posts?_page={page}&_limit={page_size}` and decodes
/// the body as a JSON array of posts.
#[derive(Clone)]
pub struct HttpRemoteSource {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteSource {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_client(base_url, reqwest::Client::builder().build()?)
    }

    /// Use a preconfigured client (proxies, custom TLS, default headers).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url.into())?,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn posts_url(&self) -> String {
        format!("{}/posts", self.base_url)
    }
}

impl RemoteSource for HttpRemoteSource {
    async fn fetch_page(&self, page: u32, page_size: u32) -> Result<Vec<Post>> {
        let response = self
            .client
            .get(self.posts_url())
            .query(&[("_page", page), ("_limit", page_size)])
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Transport(describe_status(status, &body)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|error| Error::Transport(error.to_string()))?;
        let posts = serde_json::from_slice::<Vec<Post>>(&body)
            .map_err(|error| Error::Decode(format!("page {page}: {error}")))?;

        tracing::debug!(page, count = posts.len(), "Fetched remote page");
        Ok(posts)
    }
}

fn describe_status(status: StatusCode, body: &str) -> String {
    let body = compact_text(body);
    if body.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{body} ({})", status.as_u16())
    }
}

fn normalize_base_url(raw: String) -> Result<String> {
    let base_url = normalize_text_option(Some(raw))
        .ok_or_else(|| Error::InvalidConfig("API base URL must not be empty".to_string()))?;
    if is_http_url(&base_url) {
        Ok(base_url.trim_end_matches('/').to_string())
    } else {
        Err(Error::InvalidConfig(
            "API base URL must include http:// or https://".to_string(),
        ))
    }
}
