use std::time::Duration;

use async_trait::async_trait;
use derive_more::{Display, Error};
use log::info;

#[derive(Debug, Display, Error)]
pub enum MediaError {
    #[display(fmt = "media store request failed: {}", _0)]
    Request(#[error(not(source))] String),

    #[display(fmt = "media store rejected destroy of {}: status {}", reference, status)]
    Rejected { reference: String, status: u16 },
}

/// External object storage holding event images and user photos.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn destroy(&self, reference: &str) -> Result<(), MediaError>;
}

/// Upper bound on a single destroy call, connect included.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Talks to an HTTP object store: `DELETE {base_url}/{reference}`.
pub struct HttpMediaStore {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpMediaStore {
    pub fn new(base_url: &str, api_key: Option<String>) -> Result<Self, MediaError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MediaError::Request(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl MediaStore for HttpMediaStore {
    async fn destroy(&self, reference: &str) -> Result<(), MediaError> {
        let mut request = self.client.delete(format!("{}/{}", self.base_url, reference));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request
            .send()
            .await
            .map_err(|e| MediaError::Request(e.to_string()))?;
        let status = response.status();
        // Already gone is as good as destroyed.
        if status.is_success() || status == reqwest::StatusCode::NOT_FOUND {
            info!("destroyed media asset {}", reference);
            Ok(())
        } else {
            Err(MediaError::Rejected {
                reference: reference.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

/// Used when no media store is configured; assets are only logged.
pub struct NoopMediaStore;

#[async_trait]
impl MediaStore for NoopMediaStore {
    async fn destroy(&self, reference: &str) -> Result<(), MediaError> {
        info!("no media store configured, skipping destroy of {}", reference);
        Ok(())
    }
}
