//! Resource lifecycle management for classified content.
//!
//! [`ResourceManager`] decides how classified bytes are handed to callers. Textual
//! content becomes a self-contained [`InlineHandle`] and is never registered. Binary
//! content is stored behind a fresh [`HandleToken`] and tracked until released.
//!
//! # Registry
//!
//! The registry is a `parking_lot::Mutex<HashMap>`. Every insert and removal happens
//! under that lock, and the live counter is adjusted inside the same critical section,
//! so [`ResourceManager::count`] always equals the number of registered tokens.
//! Teardown of a removed entry (dropping the buffer, deleting the spool file) runs
//! after the lock is released and happens exactly once, because only the caller that
//! removed the entry owns it.
//!
//! # Backends
//!
//! - [`StoreBackend::Memory`]: payloads live in reference-counted `Arc<[u8]>` buffers.
//! - [`StoreBackend::Disk`]: each payload is written to its own spool file, which is
//!   deleted on release.

use crate::core::config::{StoreBackend, StoreConfig};
use crate::core::inline::encode_inline;
use crate::core::mime::{OCTET_STREAM_MIME_TYPE, is_textual_mime, normalize_mime_type};
use crate::types::{ContentHandle, HANDLE_TOKEN_PREFIX, HandleToken, InlineHandle, ManagedHandle};
use crate::Result;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

const SPOOL_FILE_EXTENSION: &str = "spool";

#[derive(Debug)]
enum Body {
    Memory(Arc<[u8]>),
    Spooled(PathBuf),
}

#[derive(Debug)]
struct Entry {
    mime_type: String,
    body: Body,
}

/// Registry of live managed handles.
///
/// Dropping the manager releases every handle it still holds.
#[derive(Debug)]
pub struct ResourceManager {
    backend: StoreBackend,
    spool_dir: PathBuf,
    entries: Mutex<HashMap<HandleToken, Entry>>,
    live: AtomicUsize,
}

impl ResourceManager {
    /// In-memory manager.
    pub fn new() -> Self {
        Self::with_config(&StoreConfig::default())
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        let spool_dir = config
            .spool_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("spurhund"));

        Self {
            backend: config.backend,
            spool_dir,
            entries: Mutex::new(HashMap::new()),
            live: AtomicUsize::new(0),
        }
    }

    pub fn backend(&self) -> StoreBackend {
        self.backend
    }

    pub fn spool_dir(&self) -> &Path {
        &self.spool_dir
    }

    /// Wrap classified bytes in a handle.
    ///
    /// Textual types produce an inline handle and leave the registry untouched.
    /// Everything else is registered under a fresh token.
    ///
    /// # Errors
    ///
    /// Only the disk backend can fail, with `SpurhundError::Io` when the spool file
    /// cannot be written. The registry is unchanged in that case.
    pub fn allocate(&self, payload: Vec<u8>, mime_type: &str) -> Result<ContentHandle> {
        let mime_type = normalize_mime_type(mime_type).unwrap_or_else(|| OCTET_STREAM_MIME_TYPE.to_string());

        if is_textual_mime(&mime_type) {
            let data_url = encode_inline(&payload, &mime_type);
            return Ok(ContentHandle::Inline(InlineHandle { mime_type, data_url }));
        }

        let token = HandleToken::generate();
        let size_bytes = payload.len();
        let body = match self.backend {
            StoreBackend::Memory => Body::Memory(Arc::from(payload)),
            StoreBackend::Disk => Body::Spooled(self.spool(&token, &payload)?),
        };

        {
            let mut entries = self.entries.lock();
            entries.insert(
                token.clone(),
                Entry {
                    mime_type: mime_type.clone(),
                    body,
                },
            );
            self.live.fetch_add(1, Ordering::AcqRel);
        }

        tracing::debug!(token = %token, mime_type = %mime_type, size_bytes, "allocated managed handle");

        Ok(ContentHandle::Managed(ManagedHandle {
            mime_type,
            token,
            size_bytes,
        }))
    }

    fn spool(&self, token: &HandleToken, payload: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(&self.spool_dir)?;
        let file_name = token.as_str().trim_start_matches(HANDLE_TOKEN_PREFIX);
        let path = self.spool_dir.join(file_name).with_extension(SPOOL_FILE_EXTENSION);
        fs::write(&path, payload)?;
        Ok(path)
    }

    /// Release a managed handle.
    ///
    /// Returns `true` if the token was live. Unknown, foreign and already released
    /// tokens are ignored.
    pub fn release(&self, token: &HandleToken) -> bool {
        let removed = {
            let mut entries = self.entries.lock();
            let removed = entries.remove(token);
            if removed.is_some() {
                self.live.fetch_sub(1, Ordering::AcqRel);
            }
            removed
        };

        match removed {
            Some(entry) => {
                teardown(token, entry);
                true
            }
            None => {
                tracing::trace!(token = %token, "release of unknown token ignored");
                false
            }
        }
    }

    /// Release whatever `handle` refers to. Inline handles own nothing.
    pub fn release_handle(&self, handle: &ContentHandle) -> bool {
        match handle.token() {
            Some(token) => self.release(token),
            None => false,
        }
    }

    /// Release every live handle, returning how many were released.
    pub fn release_all(&self) -> usize {
        let drained: Vec<(HandleToken, Entry)> = {
            let mut entries = self.entries.lock();
            let drained: Vec<_> = entries.drain().collect();
            self.live.fetch_sub(drained.len(), Ordering::AcqRel);
            drained
        };

        let released = drained.len();
        for (token, entry) in drained {
            teardown(&token, entry);
        }

        if released > 0 {
            tracing::info!(released, "released all managed handles");
        }
        released
    }

    /// Number of live managed handles.
    pub fn count(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn is_live(&self, token: &HandleToken) -> bool {
        self.entries.lock().contains_key(token)
    }

    pub fn content_type(&self, token: &HandleToken) -> Option<String> {
        self.entries.lock().get(token).map(|entry| entry.mime_type.clone())
    }

    /// Read the bytes behind a live token.
    ///
    /// Returns `None` for tokens that are not live, or when a spool file has gone
    /// missing underneath the manager.
    pub fn read(&self, token: &HandleToken) -> Option<Vec<u8>> {
        let spooled = {
            let entries = self.entries.lock();
            match &entries.get(token)?.body {
                Body::Memory(buffer) => return Some(buffer.to_vec()),
                Body::Spooled(path) => path.clone(),
            }
        };

        match fs::read(&spooled) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::debug!("Failed to read spool file {:?}: {}", spooled, e);
                None
            }
        }
    }
}

fn teardown(token: &HandleToken, entry: Entry) {
    match entry.body {
        Body::Memory(buffer) => drop(buffer),
        Body::Spooled(path) => {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!(token = %token, "Failed to remove spool file {:?}: {}", path, e);
            }
        }
    }
    tracing::debug!(token = %token, mime_type = %entry.mime_type, "released managed handle");
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
