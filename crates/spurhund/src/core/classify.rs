//! Classification pipeline.
//!
//! Composes signature detection, the text heuristic and the text rule chain into a
//! single total function:
//!
//! 1. Ask every [`SignatureDetector`] in order. The first verdict wins, so binary
//!    signatures always beat textual heuristics.
//! 2. Otherwise, if the bytes look like text, refine the text sub-type.
//! 3. Otherwise fall back to `application/octet-stream`.
//!
//! Detector errors and panics are logged and treated as "no match". Classification
//! itself never fails.

use crate::core::heuristic::looks_like_text;
use crate::core::mime::OCTET_STREAM_MIME_TYPE;
use crate::core::refine::refine_text;
use crate::core::signature::{InferDetector, MagicTableDetector, SignatureDetector};
use once_cell::sync::Lazy;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(Classifier::default);

/// Classify `bytes` with the default detector chain.
///
/// ```rust
/// use spurhund::classify;
///
/// assert_eq!(classify(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), "image/png");
/// assert_eq!(classify(br#"{"key":"value"}"#), "application/json");
/// assert_eq!(classify(b""), "application/octet-stream");
/// ```
pub fn classify(bytes: &[u8]) -> String {
    DEFAULT_CLASSIFIER.classify(bytes)
}

/// An ordered chain of signature detectors followed by the text heuristics.
#[derive(Clone)]
pub struct Classifier {
    detectors: Vec<Arc<dyn SignatureDetector>>,
}

impl Classifier {
    /// Build a classifier around an explicit detector chain.
    ///
    /// An empty chain is allowed; every payload then goes straight to the text heuristic.
    pub fn with_detectors(detectors: Vec<Arc<dyn SignatureDetector>>) -> Self {
        Self { detectors }
    }

    /// Built-in table only, or built-in table followed by the `infer` detector.
    pub fn new(use_infer_detector: bool) -> Self {
        let mut detectors: Vec<Arc<dyn SignatureDetector>> = vec![Arc::new(MagicTableDetector)];
        if use_infer_detector {
            detectors.push(Arc::new(InferDetector));
        }
        Self { detectors }
    }

    /// Names of the configured detectors, in order.
    pub fn detector_names(&self) -> Vec<String> {
        self.detectors.iter().map(|d| d.name().to_string()).collect()
    }

    /// Classify `bytes`. Always returns a non-empty MIME type.
    pub fn classify(&self, bytes: &[u8]) -> String {
        if let Some(mime_type) = self.detect_signature(bytes) {
            return mime_type;
        }

        if looks_like_text(bytes) {
            return refine_text(bytes).to_string();
        }

        OCTET_STREAM_MIME_TYPE.to_string()
    }

    fn detect_signature(&self, bytes: &[u8]) -> Option<String> {
        for detector in &self.detectors {
            match catch_unwind(AssertUnwindSafe(|| detector.detect(bytes))) {
                Ok(Ok(Some(mime_type))) if !mime_type.trim().is_empty() => {
                    tracing::trace!(detector = detector.name(), mime_type = %mime_type, "signature matched");
                    return Some(mime_type);
                }
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    tracing::debug!(detector = detector.name(), error = %e, "signature detector failed, treating as no match");
                }
                Err(_) => {
                    tracing::debug!(detector = detector.name(), "signature detector panicked, treating as no match");
                }
            }
        }
        None
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl std::fmt::Debug for Classifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Classifier")
            .field("detectors", &self.detector_names())
            .finish()
    }
}
