//! Classification and ingestion core.
//!
//! # Architecture
//!
//! - **Signatures** (`signature`): magic-number table and pluggable detectors
//! - **Heuristic** (`heuristic`): printable/control ratio test for text-likeness
//! - **Refinement** (`refine`): ordered rule chain for textual sub-types
//! - **Pipeline** (`classify`): detectors, then heuristic, then fallback
//! - **Inline** (`inline`): `data:` descriptors and bare base64 blobs
//! - **Ingestion** (`ingest`): fetch or decode, classify, allocate a handle
//! - **Configuration** (`config`): loading `IngestConfig` from TOML, YAML or JSON
//!
//! # Example
//!
//! ```rust
//! use spurhund::core::config::IngestConfig;
//! use spurhund::core::ingest::Ingestor;
//!
//! # fn main() -> spurhund::Result<()> {
//! let ingestor = Ingestor::new(IngestConfig::default())?;
//! let handle = ingestor.ingest_inline("data:application/pdf;base64,JVBERi0xLjcK")?;
//! assert_eq!(handle.mime_type(), "application/pdf");
//! assert_eq!(ingestor.manager().count(), 1);
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod heuristic;
pub mod ingest;
pub mod inline;
pub mod mime;
pub mod refine;
pub mod signature;

pub use classify::{Classifier, classify};
pub use config::{IngestConfig, StoreBackend, StoreConfig};
pub use ingest::Ingestor;
