//! HTTP client for fetching watch pages and player scripts

use crate::error::RysigError;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, ClientBuilder};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Browser identity presented to the video platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientType {
    Chrome,
    Firefox,
    Safari,
    Android,
}

impl ClientType {
    /// Get all available client types
    pub fn all() -> Vec<ClientType> {
        vec![
            ClientType::Chrome,
            ClientType::Firefox,
            ClientType::Safari,
            ClientType::Android,
        ]
    }

    /// Lowercase name accepted by [`ClientType::from_str`]
    pub fn name(&self) -> &'static str {
        match self {
            ClientType::Chrome => "chrome",
            ClientType::Firefox => "firefox",
            ClientType::Safari => "safari",
            ClientType::Android => "android",
        }
    }

    /// Default User-Agent for this client type
    pub fn user_agent(&self) -> &'static str {
        match self {
            ClientType::Chrome => "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            ClientType::Firefox => "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
            ClientType::Safari => "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
            ClientType::Android => "Mozilla/5.0 (Linux; Android 11; SM-G973F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Mobile Safari/537.36",
        }
    }
}

impl FromStr for ClientType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ClientType::all()
            .into_iter()
            .find(|client| client.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = ClientType::all().iter().map(|c| c.name()).collect();
                format!("unknown client `{}`, expected one of: {}", s, names.join(", "))
            })
    }
}

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout
    pub timeout: Duration,
    /// User agent override; the client type's agent is used otherwise
    pub user_agent: Option<String>,
    /// Proxy URL
    pub proxy_url: Option<String>,
    /// Identity to present
    pub client_type: ClientType,
    /// Accept-Language header value
    pub accept_language: String,
    /// Site root that relative player URLs and watch pages resolve against
    pub base_url: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: None,
            proxy_url: None,
            client_type: ClientType::Chrome,
            accept_language: "en-US,en;q=0.9".to_string(),
            base_url: "https://www.youtube.com".to_string(),
        }
    }
}

impl HttpClientConfig {
    /// Effective User-Agent
    pub fn user_agent(&self) -> &str {
        self.user_agent
            .as_deref()
            .unwrap_or_else(|| self.client_type.user_agent())
    }
}

/// Explicitly constructed HTTP client handle
///
/// Owned by whichever component performs network I/O; cloning is cheap and
/// shares the connection pool.
#[derive(Debug, Clone)]
pub struct VideoClient {
    client: Client,
    config: HttpClientConfig,
}

impl VideoClient {
    /// Create a client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, RysigError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        if let Ok(language) = HeaderValue::from_str(&config.accept_language) {
            headers.insert(ACCEPT_LANGUAGE, language);
        }

        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .gzip(true)
            .brotli(true)
            .cookie_store(true)
            .user_agent(config.user_agent())
            .default_headers(headers);

        if let Some(proxy_url) = &config.proxy_url {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        let client = builder.build()?;
        debug!(
            "Built HTTP client: {:?}, timeout {:?}",
            config.client_type, config.timeout
        );

        Ok(Self { client, config })
    }

    /// Get client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }

    /// GET a URL and return its body as text, failing on non-success status
    pub async fn get_text(&self, url: &str) -> Result<String, RysigError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(RysigError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}
