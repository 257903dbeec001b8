//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use spurhund::types::FetchedPayload;
use spurhund::{Result, SpurhundError, Transport};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Smallest PNG header plus the start of an IHDR chunk.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01\x08\x02\0\0\0\x90wS\xde";

pub const PDF_BYTES: &[u8] = b"%PDF-1.7\n1 0 obj\n<< /Type /Catalog >>\nendobj\n";

pub const GIF_BYTES: &[u8] = b"GIF89a\x01\0\x01\0\x80\0\0\0\0\0\xff\xff\xff!\xf9\x04\x01\0\0\0\0";

pub const JSON_BYTES: &[u8] = br#"{"key":"value"}"#;

/// Canned behaviour for one target.
#[derive(Debug, Clone)]
pub enum Reply {
    Payload(FetchedPayload),
    Fail(String),
    Delayed(Duration, FetchedPayload),
}

impl Reply {
    pub fn bytes(bytes: &[u8], declared_type: Option<&str>) -> Self {
        Self::Payload(FetchedPayload::new(bytes, declared_type))
    }
}

/// In-memory transport answering from a fixed script.
///
/// Unknown targets fail with a transport error. Every call is recorded.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, target: &str, reply: Reply) -> Self {
        self.replies.insert(target.to_string(), reply);
        self
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch(&self, target: &str) -> Result<FetchedPayload> {
        self.calls.lock().push(target.to_string());

        match self.replies.get(target) {
            Some(Reply::Payload(payload)) => Ok(payload.clone()),
            Some(Reply::Delayed(delay, payload)) => {
                tokio::time::sleep(*delay).await;
                Ok(payload.clone())
            }
            Some(Reply::Fail(message)) => Err(SpurhundError::transport_with_source(
                target,
                message.clone(),
                std::io::Error::new(std::io::ErrorKind::ConnectionReset, message.clone()),
            )),
            None => Err(SpurhundError::transport(target, "no scripted reply")),
        }
    }
}

/// Bytes that no detector recognises and the heuristic rejects.
pub fn opaque_binary(len: usize) -> Vec<u8> {
    (0..len).map(|i| [0x00, 0x01, 0x02, 0x03, 0x7f, 0x10][i % 6]).collect()
}
