//! Inline payload descriptors.
//!
//! Inline content arrives in one of two shapes:
//!
//! - a `data:<type>[;param]*[;base64],<payload>` descriptor, or
//! - a bare base64 blob with no metadata at all.
//!
//! Base64 payloads are decoded directly. Payloads without the `base64` marker are
//! percent-escaped text and are unescaped into raw bytes. Either way the result is the
//! common byte representation that the classifier and the resource store work with.

use crate::core::mime::normalize_mime_type;
use crate::{Result, SpurhundError};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::prelude::*;

const DATA_SCHEME: &str = "data:";
const BASE64_MARKER: &str = "base64";

/// Accepts payloads with or without trailing `=` padding.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// A parsed `data:` descriptor borrowing its payload from the input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineDescriptor<'a> {
    /// Declared type with parameters stripped, if one was given.
    pub declared_type: Option<String>,
    /// Whether the payload is base64 rather than percent-escaped text.
    pub is_base64: bool,
    pub payload: &'a str,
}

/// Either shape of inline input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InlineInput<'a> {
    Descriptor(InlineDescriptor<'a>),
    Blob(&'a str),
}

/// Inline input decoded to bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedInline {
    pub declared_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Whether `input` uses the `data:` descriptor form.
pub fn is_data_descriptor(input: &str) -> bool {
    let trimmed = input.trim_start();
    trimmed
        .get(..DATA_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(DATA_SCHEME))
}

/// Parse inline input without decoding the payload.
///
/// # Errors
///
/// Returns `SpurhundError::MalformedInline` when a `data:` descriptor lacks the `,`
/// separating metadata from payload.
pub fn parse_inline(input: &str) -> Result<InlineInput<'_>> {
    let trimmed = input.trim();
    if !is_data_descriptor(trimmed) {
        return Ok(InlineInput::Blob(trimmed));
    }

    let rest = &trimmed[DATA_SCHEME.len()..];
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| SpurhundError::malformed_inline("missing ',' between metadata and payload"))?;

    let mut segments = meta.split(';');
    let declared_type = segments.next().and_then(normalize_mime_type);
    let is_base64 = segments.any(|segment| segment.trim().eq_ignore_ascii_case(BASE64_MARKER));

    Ok(InlineInput::Descriptor(InlineDescriptor {
        declared_type,
        is_base64,
        payload,
    }))
}

fn decode_base64(payload: &str) -> Result<Vec<u8>> {
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let compact = if compact.contains('%') {
        urlencoding::decode(&compact)
            .map_err(|e| SpurhundError::decoding_with_source("base64 payload has invalid percent-escapes", e))?
            .into_owned()
    } else {
        compact
    };
    Ok(LENIENT_BASE64.decode(compact.as_bytes())?)
}

impl InlineDescriptor<'_> {
    /// Decode the payload into bytes.
    ///
    /// # Errors
    ///
    /// Returns `SpurhundError::Decoding` for invalid base64.
    pub fn decode(&self) -> Result<Vec<u8>> {
        if self.is_base64 {
            decode_base64(self.payload)
        } else {
            Ok(urlencoding::decode_binary(self.payload.as_bytes()).into_owned())
        }
    }
}

impl InlineInput<'_> {
    pub fn declared_type(&self) -> Option<&str> {
        match self {
            Self::Descriptor(descriptor) => descriptor.declared_type.as_deref(),
            Self::Blob(_) => None,
        }
    }

    /// Decode the payload into bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        match self {
            Self::Descriptor(descriptor) => descriptor.decode(),
            Self::Blob(blob) => decode_base64(blob),
        }
    }
}

/// Parse and decode inline input in one step.
///
/// ```rust
/// use spurhund::core::inline::decode_inline;
///
/// let decoded = decode_inline("data:text/plain;charset=utf-8,hello%20world").unwrap();
/// assert_eq!(decoded.declared_type.as_deref(), Some("text/plain"));
/// assert_eq!(decoded.bytes, b"hello world");
/// ```
pub fn decode_inline(input: &str) -> Result<DecodedInline> {
    let parsed = parse_inline(input)?;
    Ok(DecodedInline {
        declared_type: parsed.declared_type().map(str::to_string),
        bytes: parsed.decode()?,
    })
}

/// Encode bytes as a base64 `data:` descriptor.
///
/// ```rust
/// use spurhund::core::inline::encode_inline;
///
/// assert_eq!(encode_inline(b"hi", "text/plain"), "data:text/plain;base64,aGk=");
/// ```
pub fn encode_inline(bytes: &[u8], mime_type: &str) -> String {
    format!("{}{};{},{}", DATA_SCHEME, mime_type, BASE64_MARKER, BASE64_STANDARD.encode(bytes))
}
