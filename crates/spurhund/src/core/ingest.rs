//! Content ingestion.
//!
//! [`Ingestor`] turns a [`Source`] into a [`ContentHandle`]:
//!
//! - **Remote** sources are fetched through the configured [`Transport`]. A declared
//!   content type is trusted unless it is missing or `application/octet-stream`, in
//!   which case the bytes are classified.
//! - **Inline** sources are decoded from a `data:` descriptor or a bare base64 blob,
//!   with the same trust-or-classify decision for the declared type.
//!
//! The resulting bytes are handed to the [`ResourceManager`], which returns an inline
//! handle for textual content and a managed handle for everything else.
//!
//! Allocation happens after the last await point, so dropping an `ingest` future
//! before the fetch resolves never leaves a handle behind.

use crate::core::classify::Classifier;
use crate::core::config::IngestConfig;
use crate::core::inline::decode_inline;
use crate::core::mime::trusted_declared_type;
use crate::store::ResourceManager;
use crate::transport::{AllowList, Transport};
use crate::types::{ContentHandle, Source};
use crate::{Result, SpurhundError};
use std::sync::Arc;

#[cfg(feature = "tokio-runtime")]
use once_cell::sync::Lazy;

/// Runtime backing the blocking wrappers.
///
/// Runtime creation only fails when the process is out of threads or memory, and
/// nothing else would work at that point either.
#[cfg(feature = "tokio-runtime")]
static GLOBAL_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create global Tokio runtime - system may be out of resources")
});

/// Fetches or decodes content, classifies it and allocates a handle.
///
/// Cloning is cheap; clones share the same resource manager and transport.
#[derive(Clone)]
pub struct Ingestor {
    config: Arc<IngestConfig>,
    allow_list: AllowList,
    classifier: Classifier,
    manager: Arc<ResourceManager>,
    transport: Option<Arc<dyn Transport>>,
}

impl Ingestor {
    /// Build an ingestor from configuration.
    ///
    /// With the `http` feature enabled, remote sources are fetched over HTTP(S).
    /// Without it, remote sources fail until a transport is supplied through
    /// [`Ingestor::with_transport`].
    ///
    /// # Errors
    ///
    /// Returns `SpurhundError::Validation` for invalid configuration.
    pub fn new(config: IngestConfig) -> Result<Self> {
        #[cfg(feature = "http")]
        let transport: Option<Arc<dyn Transport>> = Some(Arc::new(crate::transport::HttpTransport::from_config(&config)?));
        #[cfg(not(feature = "http"))]
        let transport: Option<Arc<dyn Transport>> = None;

        Self::build(config, transport)
    }

    /// Build an ingestor around an explicit transport.
    pub fn with_transport(config: IngestConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        Self::build(config, Some(transport))
    }

    fn build(config: IngestConfig, transport: Option<Arc<dyn Transport>>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            allow_list: AllowList::new(config.allow_list.iter().cloned()),
            classifier: Classifier::new(config.use_infer_detector),
            manager: Arc::new(ResourceManager::with_config(&config.store)),
            transport,
            config: Arc::new(config),
        })
    }

    /// Replace the classifier, e.g. to add custom signature detectors.
    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Share an existing resource manager instead of the one built from config.
    pub fn with_manager(mut self, manager: Arc<ResourceManager>) -> Self {
        self.manager = manager;
        self
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// The manager owning every managed handle this ingestor allocates.
    pub fn manager(&self) -> &Arc<ResourceManager> {
        &self.manager
    }

    /// Turn a source into a handle.
    ///
    /// # Errors
    ///
    /// - `Rejected` when a remote target fails the allow-list
    /// - `Transport` when the fetch fails (the cause is kept as the error source)
    /// - `EmptyResponse` when a fetch returns zero bytes
    /// - `MalformedInline` / `Decoding` for unusable inline input
    /// - `Validation` when the payload exceeds `max_payload_bytes`
    /// - `Io` when the disk store cannot spool the payload
    #[tracing::instrument(skip_all, fields(source = %source.describe()))]
    pub async fn ingest(&self, source: &Source) -> Result<ContentHandle> {
        match source {
            Source::Remote { target } => self.ingest_remote(target).await,
            Source::Inline { data } => self.ingest_inline(data),
        }
    }

    async fn ingest_remote(&self, target: &str) -> Result<ContentHandle> {
        self.allow_list.check(target)?;

        let transport = self
            .transport
            .as_ref()
            .ok_or_else(|| SpurhundError::transport(target, "no transport configured"))?;

        let payload = transport.fetch(target).await.map_err(|e| match e {
            SpurhundError::Transport { .. } | SpurhundError::Rejected { .. } => e,
            other => SpurhundError::transport_with_source(target, format!("{} transport failed", transport.name()), other),
        })?;

        if payload.bytes.is_empty() {
            return Err(SpurhundError::EmptyResponse {
                target: target.to_string(),
            });
        }
        self.check_size(payload.bytes.len())?;

        let mime_type = self.resolve_content_type(&payload.bytes, payload.declared_type.as_deref());
        self.manager.allocate(payload.bytes, &mime_type)
    }

    /// Decode and allocate an inline source. Never touches the transport.
    pub fn ingest_inline(&self, data: &str) -> Result<ContentHandle> {
        let decoded = decode_inline(data)?;
        self.check_size(decoded.bytes.len())?;

        let mime_type = self.resolve_content_type(&decoded.bytes, decoded.declared_type.as_deref());
        self.manager.allocate(decoded.bytes, &mime_type)
    }

    /// Trust a usable declared type, otherwise classify the bytes.
    pub fn resolve_content_type(&self, bytes: &[u8], declared_type: Option<&str>) -> String {
        match trusted_declared_type(declared_type) {
            Some(mime_type) => {
                tracing::trace!(mime_type = %mime_type, "trusting declared content type");
                mime_type
            }
            None => self.classifier.classify(bytes),
        }
    }

    fn check_size(&self, size: usize) -> Result<()> {
        match self.config.max_payload_bytes {
            Some(limit) if size > limit => Err(SpurhundError::validation(format!(
                "payload of {} bytes exceeds the {} byte limit",
                size, limit
            ))),
            _ => Ok(()),
        }
    }

    /// Ingest many sources with bounded concurrency.
    ///
    /// Results come back in input order. Per-source failures are returned in place,
    /// except `SpurhundError::Io`, which aborts the whole batch. An aborted batch
    /// releases every managed handle it had already allocated.
    #[cfg(feature = "tokio-runtime")]
    #[tracing::instrument(skip_all, fields(batch_size = sources.len()))]
    pub async fn batch_ingest(&self, sources: Vec<Source>) -> Result<Vec<Result<ContentHandle>>> {
        use tokio::sync::Semaphore;
        use tokio::task::JoinSet;

        if sources.is_empty() {
            return Ok(vec![]);
        }

        let semaphore = Arc::new(Semaphore::new(self.config.concurrency()));
        let mut tasks = JoinSet::new();

        for (index, source) in sources.into_iter().enumerate() {
            let ingestor = self.clone();
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, Err(SpurhundError::Other(format!("Batch semaphore closed: {}", e)))),
                };
                (index, ingestor.ingest(&source).await)
            });
        }

        let mut results: Vec<Option<Result<ContentHandle>>> = (0..tasks.len()).map(|_| None).collect();
        let mut fatal: Option<SpurhundError> = None;

        while let Some(task_result) = tasks.join_next().await {
            match task_result {
                Ok((_, Err(e))) if fatal.is_none() && matches!(e, SpurhundError::Io(_)) => {
                    fatal = Some(e);
                    tasks.abort_all();
                }
                Ok((index, result)) => {
                    results[index] = Some(result);
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    if fatal.is_none() {
                        fatal = Some(SpurhundError::Other(format!("Task panicked: {}", join_err)));
                        tasks.abort_all();
                    }
                }
            }
        }

        if let Some(error) = fatal {
            // Handles allocated before the abort never reach the caller.
            let mut released = 0usize;
            for handle in results.iter().flatten().filter_map(|result| result.as_ref().ok()) {
                if self.manager.release_handle(handle) {
                    released += 1;
                }
            }
            tracing::warn!(released, error = %error, "batch aborted, released allocated handles");
            return Err(error);
        }

        Ok(results
            .into_iter()
            .map(|result| result.unwrap_or_else(|| Err(SpurhundError::Other("Batch task produced no result".to_string()))))
            .collect())
    }

    /// Blocking wrapper for [`Ingestor::ingest`].
    ///
    /// Must not be called from inside an async runtime.
    #[cfg(feature = "tokio-runtime")]
    pub fn ingest_sync(&self, source: &Source) -> Result<ContentHandle> {
        GLOBAL_RUNTIME.block_on(self.ingest(source))
    }

    /// Blocking wrapper for [`Ingestor::batch_ingest`].
    #[cfg(feature = "tokio-runtime")]
    pub fn batch_ingest_sync(&self, sources: Vec<Source>) -> Result<Vec<Result<ContentHandle>>> {
        GLOBAL_RUNTIME.block_on(self.batch_ingest(sources))
    }
}

impl std::fmt::Debug for Ingestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ingestor")
            .field("config", &self.config)
            .field("classifier", &self.classifier)
            .field("transport", &self.transport.as_ref().map(|t| t.name().to_string()))
            .field("live_handles", &self.manager.count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FetchedPayload;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x02\0\0\0";

    struct StaticTransport {
        payload: FetchedPayload,
        calls: AtomicUsize,
    }

    impl StaticTransport {
        fn new(bytes: &[u8], declared_type: Option<&str>) -> Arc<Self> {
            Arc::new(Self {
                payload: FetchedPayload::new(bytes, declared_type),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transport for StaticTransport {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch(&self, _target: &str) -> Result<FetchedPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.payload.clone())
        }
    }

    struct BrokenTransport;

    #[async_trait]
    impl Transport for BrokenTransport {
        fn name(&self) -> &str {
            "broken"
        }

        async fn fetch(&self, _target: &str) -> Result<FetchedPayload> {
            Err(SpurhundError::validation("connection reset by peer"))
        }
    }

    fn ingestor_with(transport: Arc<dyn Transport>) -> Ingestor {
        Ingestor::with_transport(IngestConfig::default(), transport).unwrap()
    }

    #[tokio::test]
    async fn test_remote_binary_is_classified_and_managed() {
        let ingestor = ingestor_with(StaticTransport::new(PNG_BYTES, None));
        let handle = ingestor.ingest(&Source::remote("https://example.com/img")).await.unwrap();

        assert!(handle.is_managed());
        assert_eq!(handle.mime_type(), "image/png");
        assert_eq!(ingestor.manager().count(), 1);
    }

    #[tokio::test]
    async fn test_declared_type_is_trusted() {
        let ingestor = ingestor_with(StaticTransport::new(b"not really a pdf", Some("application/pdf; q=1")));
        let handle = ingestor.ingest(&Source::remote("https://example.com/doc")).await.unwrap();
        assert_eq!(handle.mime_type(), "application/pdf");
        assert!(handle.is_managed());
    }

    #[tokio::test]
    async fn test_generic_declared_type_is_ignored() {
        let ingestor = ingestor_with(StaticTransport::new(br#"{"key":"value"}"#, Some("application/octet-stream")));
        let handle = ingestor.ingest(&Source::remote("https://example.com/data")).await.unwrap();
        assert_eq!(handle.mime_type(), "application/json");
        assert!(!handle.is_managed());
        assert_eq!(ingestor.manager().count(), 0);
    }

    #[tokio::test]
    async fn test_empty_response() {
        let ingestor = ingestor_with(StaticTransport::new(b"", Some("image/png")));
        let err = ingestor.ingest(&Source::remote("https://example.com/empty")).await.unwrap_err();
        assert!(matches!(err, SpurhundError::EmptyResponse { .. }));
        assert_eq!(ingestor.manager().count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_transport_errors_become_transport_errors() {
        let ingestor = ingestor_with(Arc::new(BrokenTransport));
        let err = ingestor.ingest(&Source::remote("https://example.com/x")).await.unwrap_err();
        assert!(matches!(err, SpurhundError::Transport { .. }));
        assert_eq!(err.target(), Some("https://example.com/x"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[tokio::test]
    async fn test_allow_list_rejects_without_fetching() {
        let transport = StaticTransport::new(PNG_BYTES, None);
        let config = IngestConfig {
            allow_list: vec!["https://cdn.example.com/".to_string()],
            ..Default::default()
        };
        let ingestor = Ingestor::with_transport(config, transport.clone()).unwrap();

        let err = ingestor.ingest(&Source::remote("https://other.example.com/a.png")).await.unwrap_err();
        assert!(matches!(err, SpurhundError::Rejected { .. }));
        assert_eq!(transport.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_inline_pdf_is_managed() {
        let ingestor = ingestor_with(Arc::new(BrokenTransport));
        let handle = ingestor.ingest_inline("data:application/pdf;base64,JVBERi0xLjcK").unwrap();
        assert_eq!(handle.mime_type(), "application/pdf");
        assert!(handle.is_managed());
        assert_eq!(ingestor.manager().count(), 1);
    }

    #[test]
    fn test_inline_without_declared_type_is_classified() {
        let ingestor = ingestor_with(Arc::new(BrokenTransport));
        let handle = ingestor.ingest_inline("data:;base64,PGh0bWw+PC9odG1sPg==").unwrap();
        assert_eq!(handle.mime_type(), "text/html");
        assert!(!handle.is_managed());
    }

    #[test]
    fn test_malformed_inline() {
        let ingestor = ingestor_with(Arc::new(BrokenTransport));
        let err = ingestor.ingest_inline("data:invalid format").unwrap_err();
        assert!(matches!(err, SpurhundError::MalformedInline { .. }));
        assert_eq!(ingestor.manager().count(), 0);
    }

    #[test]
    fn test_payload_limit() {
        let config = IngestConfig {
            max_payload_bytes: Some(4),
            ..Default::default()
        };
        let ingestor = Ingestor::with_transport(config, Arc::new(BrokenTransport)).unwrap();
        let err = ingestor.ingest_inline("data:text/plain,too%20long").unwrap_err();
        assert!(matches!(err, SpurhundError::Validation { .. }));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = IngestConfig {
            fetch_timeout_secs: 0,
            ..Default::default()
        };
        assert!(Ingestor::with_transport(config, Arc::new(BrokenTransport)).is_err());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_batch_ingest_preserves_order() {
        let ingestor = ingestor_with(StaticTransport::new(PNG_BYTES, None));
        let sources = vec![
            Source::inline("data:text/plain,first"),
            Source::remote("https://example.com/img"),
            Source::inline("data:broken"),
            Source::inline("data:application/json,%5B1%5D"),
        ];

        let results = ingestor.batch_ingest(sources).await.unwrap();
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().mime_type(), "text/plain");
        assert_eq!(results[1].as_ref().unwrap().mime_type(), "image/png");
        assert!(matches!(results[2], Err(SpurhundError::MalformedInline { .. })));
        assert_eq!(results[3].as_ref().unwrap().mime_type(), "application/json");
        assert_eq!(ingestor.manager().count(), 1);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_batch_ingest_empty() {
        let ingestor = ingestor_with(Arc::new(BrokenTransport));
        assert!(ingestor.batch_ingest(vec![]).await.unwrap().is_empty());
    }

    #[cfg(feature = "tokio-runtime")]
    #[test]
    fn test_ingest_sync() {
        let ingestor = ingestor_with(StaticTransport::new(b"%PDF-1.4\n", None));
        let handle = ingestor.ingest_sync(&Source::remote("https://example.com/doc")).unwrap();
        assert_eq!(handle.mime_type(), "application/pdf");
        assert!(ingestor.manager().release_handle(&handle));
    }
}
