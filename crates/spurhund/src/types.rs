use serde::{Deserialize, Serialize};
use std::fmt;

use crate::Result;
use crate::core::inline::{decode_inline, is_data_descriptor};

/// Prefix of every managed handle token.
pub const HANDLE_TOKEN_PREFIX: &str = "spurhund:";

/// Opaque token naming a managed resource.
///
/// Tokens are only meaningful to the `ResourceManager` that issued them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandleToken(String);

impl HandleToken {
    pub(crate) fn generate() -> Self {
        Self(format!("{}{}", HANDLE_TOKEN_PREFIX, uuid::Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for HandleToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for HandleToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for HandleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Self-contained textual content; never needs releasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineHandle {
    pub mime_type: String,
    /// `data:<type>;base64,<payload>` descriptor carrying the content.
    pub data_url: String,
}

impl InlineHandle {
    /// Decode the embedded payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        Ok(decode_inline(&self.data_url)?.bytes)
    }
}

/// Content stored behind a token; must be released exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManagedHandle {
    pub mime_type: String,
    pub token: HandleToken,
    pub size_bytes: usize,
}

/// A reference to classified content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentHandle {
    Inline(InlineHandle),
    Managed(ManagedHandle),
}

impl ContentHandle {
    pub fn mime_type(&self) -> &str {
        match self {
            Self::Inline(inline) => &inline.mime_type,
            Self::Managed(managed) => &managed.mime_type,
        }
    }

    pub fn is_managed(&self) -> bool {
        matches!(self, Self::Managed(_))
    }

    pub fn token(&self) -> Option<&HandleToken> {
        match self {
            Self::Inline(_) => None,
            Self::Managed(managed) => Some(&managed.token),
        }
    }

    /// The string a caller dereferences: the data URL, or the managed token.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Inline(inline) => &inline.data_url,
            Self::Managed(managed) => managed.token.as_str(),
        }
    }
}

/// Where ingested bytes come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    /// Fetched through the configured transport.
    Remote { target: String },
    /// A `data:` descriptor or a bare base64 blob.
    Inline { data: String },
}

impl Source {
    pub fn remote(target: impl Into<String>) -> Self {
        Self::Remote { target: target.into() }
    }

    pub fn inline(data: impl Into<String>) -> Self {
        Self::Inline { data: data.into() }
    }

    /// Pick the source kind from a raw string.
    ///
    /// `data:` descriptors are inline; anything with a `scheme://` prefix is remote;
    /// everything else is treated as a bare inline blob.
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if is_data_descriptor(trimmed) {
            return Self::inline(trimmed);
        }
        match trimmed.split_once("://") {
            Some((scheme, _))
                if !scheme.is_empty()
                    && scheme
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
            {
                Self::remote(trimmed)
            }
            _ => Self::inline(trimmed),
        }
    }

    /// Identifier used in logs and errors. Inline payloads are abbreviated.
    pub fn describe(&self) -> String {
        const PREVIEW: usize = 32;
        match self {
            Self::Remote { target } => target.clone(),
            Self::Inline { data } => {
                let preview: String = data.chars().take(PREVIEW).collect();
                if data.chars().count() > PREVIEW {
                    format!("{}...", preview)
                } else {
                    preview
                }
            }
        }
    }
}

/// Bytes and metadata returned by a transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchedPayload {
    pub bytes: Vec<u8>,
    /// Raw `Content-Type` as sent by the server, parameters included.
    pub declared_type: Option<String>,
}

impl FetchedPayload {
    pub fn new(bytes: impl Into<Vec<u8>>, declared_type: Option<&str>) -> Self {
        Self {
            bytes: bytes.into(),
            declared_type: declared_type.map(str::to_string),
        }
    }
}
