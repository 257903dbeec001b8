use super::{AllowList, Transport};
use crate::core::config::IngestConfig;
use crate::types::FetchedPayload;
use crate::{Result, SpurhundError};
use async_trait::async_trait;
use std::time::Duration;

/// HTTP(S) transport backed by `reqwest`.
///
/// Checks the allow-list before sending, applies a per-request timeout and reads the
/// `Content-Type` header as the declared type. Any non-2xx status is a transport
/// failure. There are no retries.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    allow_list: AllowList,
    timeout: Duration,
}

impl HttpTransport {
    /// # Errors
    ///
    /// Returns `SpurhundError::Transport` if the HTTP client cannot be built.
    pub fn new(allow_list: AllowList, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SpurhundError::transport_with_source("<client>", "Failed to create HTTP client", e))?;

        Ok(Self {
            client,
            allow_list,
            timeout,
        })
    }

    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        Self::new(
            AllowList::new(config.allow_list.iter().cloned()),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    pub fn allow_list(&self) -> &AllowList {
        &self.allow_list
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[tracing::instrument(skip_all, fields(target_url = %target))]
    async fn fetch(&self, target: &str) -> Result<FetchedPayload> {
        self.allow_list.check(target)?;

        let response = self.client.get(target).send().await.map_err(|e| {
            let message = if e.is_timeout() {
                format!("request timed out after {}s", self.timeout.as_secs())
            } else {
                "request failed".to_string()
            };
            SpurhundError::transport_with_source(target, message, e)
        })?;

        if !response.status().is_success() {
            return Err(SpurhundError::transport(
                target,
                format!("server returned status: {}", response.status()),
            ));
        }

        let declared_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SpurhundError::transport_with_source(target, "failed to read response body", e))?;

        tracing::debug!(target_url = target, size_bytes = bytes.len(), declared_type = ?declared_type, "fetched remote payload");

        Ok(FetchedPayload {
            bytes: bytes.to_vec(),
            declared_type,
        })
    }
}
