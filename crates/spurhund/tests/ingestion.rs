//! Content ingestion integration tests.
//!
//! Drives `Ingestor` with a scripted transport through the remote and inline paths,
//! checking both the resulting handle and the manager's live count.

use async_trait::async_trait;
use spurhund::types::{ContentHandle, FetchedPayload, Source};
use spurhund::{IngestConfig, Ingestor, SpurhundError, StoreBackend, StoreConfig, Transport, encode_inline};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

mod helpers;

use helpers::{JSON_BYTES, PDF_BYTES, PNG_BYTES, Reply, ScriptedTransport};

const PNG_URL: &str = "https://cdn.example.com/logo";
const JSON_URL: &str = "https://api.example.com/data";

fn ingestor(transport: Arc<ScriptedTransport>) -> Ingestor {
    Ingestor::with_transport(IngestConfig::default(), transport).unwrap()
}

/// Remote PNG without a declared type: classified from bytes, managed, count 1.
#[tokio::test]
async fn test_remote_png_becomes_managed() {
    let transport = ScriptedTransport::new()
        .reply(PNG_URL, Reply::bytes(PNG_BYTES, None))
        .into_arc();
    let ingestor = ingestor(transport.clone());

    let handle = ingestor.ingest(&Source::remote(PNG_URL)).await.unwrap();

    assert_eq!(handle.mime_type(), "image/png");
    assert!(handle.is_managed());
    assert_eq!(ingestor.manager().count(), 1);
    assert_eq!(transport.calls(), vec![PNG_URL.to_string()]);
}

/// JSON served as octet-stream: the declaration is ignored, the result is inline.
#[tokio::test]
async fn test_remote_json_with_generic_declaration_is_inline() {
    let transport = ScriptedTransport::new()
        .reply(JSON_URL, Reply::bytes(JSON_BYTES, Some("application/octet-stream")))
        .into_arc();
    let ingestor = ingestor(transport);
    let before = ingestor.manager().count();

    let handle = ingestor.ingest(&Source::remote(JSON_URL)).await.unwrap();

    assert_eq!(handle.mime_type(), "application/json");
    assert!(!handle.is_managed());
    assert_eq!(ingestor.manager().count(), before);
}

/// Inline base64 PDF descriptor: trusted type, managed, count +1.
#[tokio::test]
async fn test_inline_pdf_descriptor_is_managed() {
    let ingestor = ingestor(ScriptedTransport::new().into_arc());
    let before = ingestor.manager().count();

    let handle = ingestor
        .ingest(&Source::parse("data:application/pdf;base64,JVBERi0xLjcK"))
        .await
        .unwrap();

    assert_eq!(handle.mime_type(), "application/pdf");
    assert!(handle.is_managed());
    assert_eq!(ingestor.manager().count(), before + 1);
    assert_eq!(ingestor.manager().read(handle.token().unwrap()).unwrap(), b"%PDF-1.7\n");
}

#[tokio::test]
async fn test_malformed_inline_descriptor() {
    let ingestor = ingestor(ScriptedTransport::new().into_arc());

    let err = ingestor.ingest(&Source::inline("data:invalid format")).await.unwrap_err();

    assert!(matches!(err, SpurhundError::MalformedInline { .. }));
    assert_eq!(ingestor.manager().count(), 0);
}

#[tokio::test]
async fn test_transport_failure_carries_target_and_cause() {
    let transport = ScriptedTransport::new()
        .reply(PNG_URL, Reply::Fail("connection reset".to_string()))
        .into_arc();
    let ingestor = ingestor(transport);

    let err = ingestor.ingest(&Source::remote(PNG_URL)).await.unwrap_err();

    match &err {
        SpurhundError::Transport { target, .. } => assert_eq!(target, PNG_URL),
        other => panic!("expected Transport, got {other:?}"),
    }
    assert!(std::error::Error::source(&err).is_some());
    assert_eq!(ingestor.manager().count(), 0);
}

#[tokio::test]
async fn test_empty_remote_body() {
    let transport = ScriptedTransport::new()
        .reply(PNG_URL, Reply::bytes(b"", Some("image/png")))
        .into_arc();
    let ingestor = ingestor(transport);

    let err = ingestor.ingest(&Source::remote(PNG_URL)).await.unwrap_err();

    assert!(matches!(err, SpurhundError::EmptyResponse { .. }));
    assert_eq!(err.target(), Some(PNG_URL));
}

#[tokio::test]
async fn test_allow_list_rejection_is_distinct() {
    let transport = ScriptedTransport::new()
        .reply(PNG_URL, Reply::bytes(PNG_BYTES, None))
        .into_arc();
    let config = IngestConfig {
        allow_list: vec!["https://api.example.com/".to_string()],
        ..Default::default()
    };
    let ingestor = Ingestor::with_transport(config, transport.clone()).unwrap();

    let err = ingestor.ingest(&Source::remote(PNG_URL)).await.unwrap_err();

    assert!(matches!(err, SpurhundError::Rejected { .. }));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_declared_type_parameters_are_stripped() {
    let transport = ScriptedTransport::new()
        .reply(JSON_URL, Reply::bytes(b"hello", Some("Text/Plain; charset=UTF-8")))
        .into_arc();
    let ingestor = ingestor(transport);

    let handle = ingestor.ingest(&Source::remote(JSON_URL)).await.unwrap();
    assert_eq!(handle.mime_type(), "text/plain");
}

/// Bytes encoded inline come back unchanged, whatever their type.
#[tokio::test]
async fn test_inline_round_trip() {
    let ingestor = ingestor(ScriptedTransport::new().into_arc());

    for (bytes, mime_type) in [(PDF_BYTES, "application/pdf"), (JSON_BYTES, "application/json")] {
        let descriptor = encode_inline(bytes, mime_type);
        let handle = ingestor.ingest(&Source::inline(descriptor)).await.unwrap();
        assert_eq!(handle.mime_type(), mime_type);

        let recovered = match &handle {
            ContentHandle::Inline(inline) => inline.decode().unwrap(),
            ContentHandle::Managed(managed) => ingestor.manager().read(&managed.token).unwrap(),
        };
        assert_eq!(recovered, bytes);
    }
}

#[tokio::test]
async fn test_bare_base64_blob_is_classified() {
    let ingestor = ingestor(ScriptedTransport::new().into_arc());

    let handle = ingestor.ingest(&Source::parse("iVBORw0KGgoAAAANSUhEUg")).await.unwrap();

    assert_eq!(handle.mime_type(), "image/png");
    assert!(handle.is_managed());
}

#[tokio::test]
async fn test_invalid_base64_is_decoding_error() {
    let ingestor = ingestor(ScriptedTransport::new().into_arc());

    let err = ingestor
        .ingest(&Source::inline("data:image/png;base64,***"))
        .await
        .unwrap_err();

    assert!(matches!(err, SpurhundError::Decoding { .. }));
}

/// Dropping an in-flight ingestion never leaves a handle behind.
#[tokio::test]
async fn test_cancelled_ingest_allocates_nothing() {
    let transport = ScriptedTransport::new()
        .reply(
            PNG_URL,
            Reply::Delayed(Duration::from_secs(5), spurhund::types::FetchedPayload::new(PNG_BYTES, None)),
        )
        .into_arc();
    let ingestor = ingestor(transport);

    let result = timeout(Duration::from_millis(50), ingestor.ingest(&Source::remote(PNG_URL))).await;

    assert!(result.is_err(), "ingest should still be waiting on the transport");
    assert_eq!(ingestor.manager().count(), 0);
}

#[tokio::test]
async fn test_batch_ingest_mixed_sources() {
    let transport = ScriptedTransport::new()
        .reply(PNG_URL, Reply::bytes(PNG_BYTES, None))
        .reply(JSON_URL, Reply::bytes(JSON_BYTES, Some("application/json")))
        .into_arc();
    let ingestor = ingestor(transport);

    let sources = vec![
        Source::remote(PNG_URL),
        Source::remote("https://missing.example.com/"),
        Source::remote(JSON_URL),
        Source::inline("data:application/pdf;base64,JVBERi0xLjcK"),
    ];
    let results = ingestor.batch_ingest(sources).await.unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(results[0].as_ref().unwrap().mime_type(), "image/png");
    assert!(matches!(results[1], Err(SpurhundError::Transport { .. })));
    assert_eq!(results[2].as_ref().unwrap().mime_type(), "application/json");
    assert_eq!(results[3].as_ref().unwrap().mime_type(), "application/pdf");
    assert_eq!(ingestor.manager().count(), 2);

    assert_eq!(ingestor.manager().release_all(), 2);
}

/// Replaces the spool directory with a plain file before answering, so the next
/// spool write fails with `Io`.
struct SpoolBreakingTransport {
    spool_dir: PathBuf,
}

#[async_trait]
impl Transport for SpoolBreakingTransport {
    fn name(&self) -> &str {
        "spool-breaking"
    }

    async fn fetch(&self, _target: &str) -> spurhund::Result<FetchedPayload> {
        std::fs::remove_dir_all(&self.spool_dir)?;
        std::fs::write(&self.spool_dir, b"not a directory")?;
        Ok(FetchedPayload::new(PNG_BYTES, None))
    }
}

#[tokio::test]
async fn test_aborted_batch_releases_allocated_handles() {
    let temp_dir = tempfile::tempdir().unwrap();
    let spool_dir = temp_dir.path().join("spool");

    let config = IngestConfig {
        max_concurrent_ingests: Some(1),
        store: StoreConfig {
            backend: StoreBackend::Disk,
            spool_dir: Some(spool_dir.clone()),
        },
        ..Default::default()
    };
    let transport = Arc::new(SpoolBreakingTransport {
        spool_dir: spool_dir.clone(),
    });
    let ingestor = Ingestor::with_transport(config, transport).unwrap();

    let sources = vec![
        Source::inline(encode_inline(PDF_BYTES, "application/pdf")),
        Source::remote(PNG_URL),
    ];
    let result = ingestor.batch_ingest(sources).await;

    assert!(matches!(result, Err(SpurhundError::Io(_))));
    assert_eq!(ingestor.manager().count(), 0);
    assert_eq!(ingestor.manager().release_all(), 0);
}
