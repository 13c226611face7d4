use std::time::Duration;

use reqwest::{Client, Proxy, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use scopr_common::error::{ConfigError, FailureKind};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("scopr/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client for every web-backed plugin.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(proxy: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT);

        if let Some(proxy) = proxy {
            let proxy: Proxy = Proxy::all(proxy).map_err(|e| ConfigError::InvalidProxy {
                url: proxy.to_string(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
        }

        let client: Client = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }

    pub async fn get_text(&self, url: Url) -> Result<String, FailureKind> {
        let response = self.client.get(url).send().await.map_err(failure)?;

        let status: StatusCode = response.status();
        if !status.is_success() {
            return Err(FailureKind::Status(status.as_u16()));
        }
        response.text().await.map_err(failure)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, FailureKind> {
        let body: String = self.get_text(url).await?;
        parse_json(&body)
    }
}

/// Builds `base?k=v&...` with proper escaping.
pub fn endpoint(base: &str, params: &[(&str, &str)]) -> Result<Url, FailureKind> {
    Url::parse_with_params(base, params).map_err(|e| FailureKind::Malformed(e.to_string()))
}

pub fn parse_json<T: DeserializeOwned>(body: &str) -> Result<T, FailureKind> {
    serde_json::from_str(body).map_err(|e| FailureKind::Malformed(e.to_string()))
}

fn failure(err: reqwest::Error) -> FailureKind {
    if err.is_timeout() {
        FailureKind::Timeout
    } else if let Some(status) = err.status() {
        FailureKind::Status(status.as_u16())
    } else if err.is_decode() {
        FailureKind::Malformed(err.to_string())
    } else {
        FailureKind::Network(err.to_string())
    }
}
