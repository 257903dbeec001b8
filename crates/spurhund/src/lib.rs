//! Spurhund - Content Sniffing and Handle Lifecycle Library
//!
//! Spurhund decides what a byte payload actually is, without trusting whatever
//! metadata came with it, and hands the content out as either a self-contained inline
//! handle (textual content) or a managed handle that must be released.
//!
//! # Quick Start
//!
//! ```rust
//! use spurhund::{IngestConfig, Ingestor, Source};
//!
//! # fn main() -> spurhund::Result<()> {
//! let ingestor = Ingestor::new(IngestConfig::default())?;
//!
//! let handle = ingestor.ingest_sync(&Source::parse("data:;base64,eyJrZXkiOiJ2YWx1ZSJ9"))?;
//! assert_eq!(handle.mime_type(), "application/json");
//! assert!(!handle.is_managed());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core Module** (`core`): classification pipeline, inline decoding, ingestion, config loading
//! - **Store** (`store`): registry of managed handles and their backing storage
//! - **Transport** (`transport`): remote fetching and the target allow-list
//!
//! # Features
//!
//! - `tokio-runtime` (default): batch ingestion and blocking wrappers
//! - `http` (default): `reqwest`-backed [`transport::HttpTransport`]

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod store;
pub mod transport;
pub mod types;

pub use error::{Result, SpurhundError};
pub use types::*;

pub use core::classify::{Classifier, classify};
pub use core::config::{IngestConfig, StoreBackend, StoreConfig};
pub use core::ingest::Ingestor;
pub use core::inline::{decode_inline, encode_inline};
pub use core::mime::{
    JSON_MIME_TYPE, OCTET_STREAM_MIME_TYPE, PLAIN_TEXT_MIME_TYPE, is_textual_mime, trusted_declared_type,
};
pub use core::signature::{SignatureDetector, match_signature};
pub use store::ResourceManager;
pub use transport::{AllowList, Transport};

#[cfg(feature = "http")]
pub use transport::HttpTransport;
