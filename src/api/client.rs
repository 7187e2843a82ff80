use async_trait::async_trait;
use log::{debug, info, warn};

use super::types::{ApiError, CollectionQuery, Format};

/// Fetches site collections. `path` is a site-relative URL such as `/work/`.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Returns the raw response body in the requested format.
    async fn collection(&self, path: &str, format: Format) -> Result<String, ApiError>;
}

/// `reqwest`-backed client for `GET {base_url}{path}?format=...`.
/// # Example
/// ```no_run
/// use pagerouter::api::{ApiClient, Format, HttpApiClient};
/// # async fn demo() -> Result<(), pagerouter::api::ApiError> {
/// let client = HttpApiClient::new("https://example.com");
/// let html = client.collection("/work/", Format::Html).await?;
/// println!("{} bytes", html.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn collection(&self, path: &str, format: Format) -> Result<String, ApiError> {
        let url = self.url_for(path);
        info!("Fetching collection {} as {}", url, format.as_str());

        let response = self
            .client
            .get(&url)
            .query(&CollectionQuery { format })
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        debug!("Collection response status: {}", response.status());

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Collection fetch failed: {} - {}", status, body);
            return Err(ApiError::Status { status, body });
        }

        response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))
    }
}
