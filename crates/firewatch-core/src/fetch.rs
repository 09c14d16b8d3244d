//! Retrieval of raw feed and boundary payloads.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::config::FirewatchConfig;
use crate::error::FetchError;
use crate::feeds::redact_credentials;

#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// One GET for `url`, returning the body as text.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &FirewatchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|source| FetchError::Transport {
                target: "http client".to_string(),
                source,
            })?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let target = redact_credentials(url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                target: target.clone(),
                source: source.without_url(),
            })?;

        let status = response.status();
        classify_status(&target, status)?;

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Transport {
                target: target.clone(),
                source: source.without_url(),
            })?;
        debug!(target_url = %target, bytes = bytes.len(), "fetched content");

        String::from_utf8(bytes.to_vec()).map_err(|err| FetchError::Decode {
            target,
            message: err.to_string(),
        })
    }
}

pub(crate) fn classify_status(target: &str, status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        return Ok(());
    }
    let code = status.as_u16();
    if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
        Err(FetchError::RateLimited {
            target: target.to_string(),
            status: code,
        })
    } else {
        Err(FetchError::Status {
            target: target.to_string(),
            status: code,
        })
    }
}
