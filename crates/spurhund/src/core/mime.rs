//! MIME type constants and normalization.
//!
//! Content types handled by Spurhund are bare, lower-case MIME essences such as
//! `image/png`. Externally declared types (HTTP `Content-Type` headers, `data:`
//! descriptors) are normalized with [`normalize_mime_type`] before any trust
//! decision is made.

pub const OCTET_STREAM_MIME_TYPE: &str = "application/octet-stream";
pub const PLAIN_TEXT_MIME_TYPE: &str = "text/plain";
pub const HTML_MIME_TYPE: &str = "text/html";
pub const CSV_MIME_TYPE: &str = "text/csv";
pub const SOURCE_CODE_MIME_TYPE: &str = "text/x-source";
pub const JSON_MIME_TYPE: &str = "application/json";
pub const XML_MIME_TYPE: &str = "application/xml";
pub const JAVASCRIPT_MIME_TYPE: &str = "application/javascript";
pub const XHTML_MIME_TYPE: &str = "application/xhtml+xml";

pub const PDF_MIME_TYPE: &str = "application/pdf";
pub const PNG_MIME_TYPE: &str = "image/png";
pub const JPEG_MIME_TYPE: &str = "image/jpeg";
pub const GIF_MIME_TYPE: &str = "image/gif";
pub const WEBP_MIME_TYPE: &str = "image/webp";
pub const ZIP_MIME_TYPE: &str = "application/zip";

/// Non-`text/*` types that are still delivered inline.
const TEXTUAL_APPLICATION_TYPES: &[&str] = &[JSON_MIME_TYPE, XML_MIME_TYPE, JAVASCRIPT_MIME_TYPE, XHTML_MIME_TYPE];

/// Strip parameters (`; charset=utf-8`, `; boundary=...`) from a MIME type.
///
/// ```rust
/// use spurhund::core::mime::strip_parameters;
///
/// assert_eq!(strip_parameters("text/html; charset=utf-8"), "text/html");
/// assert_eq!(strip_parameters("image/png"), "image/png");
/// ```
pub fn strip_parameters(mime_type: &str) -> &str {
    match mime_type.split_once(';') {
        Some((essence, _)) => essence.trim(),
        None => mime_type.trim(),
    }
}

/// Normalize a declared MIME type into a bare, lower-case essence.
///
/// Returns `None` when nothing usable remains (empty string, parameters only).
pub fn normalize_mime_type(mime_type: &str) -> Option<String> {
    let essence = strip_parameters(mime_type);
    if essence.is_empty() {
        return None;
    }
    Some(essence.to_ascii_lowercase())
}

/// Whether `mime_type` is the generic binary fallback that says nothing about content.
pub fn is_generic_binary(mime_type: &str) -> bool {
    strip_parameters(mime_type).eq_ignore_ascii_case(OCTET_STREAM_MIME_TYPE)
}

/// Normalize a declared type and keep it only if it can be trusted as-is.
///
/// Absent, empty and generic-binary declarations all yield `None`, meaning the
/// payload must be classified from its bytes.
pub fn trusted_declared_type(declared: Option<&str>) -> Option<String> {
    let normalized = normalize_mime_type(declared?)?;
    if is_generic_binary(&normalized) {
        return None;
    }
    Some(normalized)
}

/// Whether content of this type is textual and can be delivered inline.
///
/// Everything under `text/` plus the JSON, XML, JavaScript and XHTML tokens is
/// textual; every other type is binary and gets a managed handle.
pub fn is_textual_mime(mime_type: &str) -> bool {
    let essence = strip_parameters(mime_type);
    let lowered = essence.to_ascii_lowercase();
    lowered.starts_with("text/") || TEXTUAL_APPLICATION_TYPES.contains(&lowered.as_str())
}
