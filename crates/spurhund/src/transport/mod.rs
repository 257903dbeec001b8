//! Fetching remote payloads.
//!
//! The ingestion service never talks to the network directly. It asks a
//! [`Transport`] for the bytes behind a target and receives a [`FetchedPayload`]
//! holding the body and whatever content type the remote side declared.
//!
//! [`AllowList`] restricts which targets may be fetched at all. A target outside the
//! list fails with `SpurhundError::Rejected` before any request is made.

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpTransport;

use crate::types::FetchedPayload;
use crate::{Result, SpurhundError};
use async_trait::async_trait;

/// Source of remote bytes.
///
/// Implementations must be `Send + Sync`; the ingestion service shares one transport
/// across concurrent ingestions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Fetch the bytes behind `target`.
    ///
    /// # Errors
    ///
    /// - `SpurhundError::Rejected` if the target is not permitted
    /// - `SpurhundError::Transport` for network failures and unsuccessful responses
    async fn fetch(&self, target: &str) -> Result<FetchedPayload>;
}

/// Prefix allow-list for remote targets.
///
/// An empty list permits everything.
///
/// ```rust
/// use spurhund::transport::AllowList;
///
/// let allow = AllowList::new(["https://cdn.example.com/"]);
/// assert!(allow.permits("https://cdn.example.com/logo.png"));
/// assert!(!allow.permits("https://elsewhere.example.com/logo.png"));
/// assert!(AllowList::default().permits("anything"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    prefixes: Vec<String>,
}

impl AllowList {
    pub fn new<I, S>(prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefixes: prefixes.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_unrestricted(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn permits(&self, target: &str) -> bool {
        self.is_unrestricted() || self.prefixes.iter().any(|prefix| target.starts_with(prefix.as_str()))
    }

    /// Fail with `Rejected` unless `target` is permitted.
    pub fn check(&self, target: &str) -> Result<()> {
        if self.permits(target) {
            Ok(())
        } else {
            tracing::debug!(target_url = target, "target rejected by allow-list");
            Err(SpurhundError::Rejected {
                target: target.to_string(),
            })
        }
    }
}
