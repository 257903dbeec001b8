//! Magic-number signature matching.
//!
//! A fixed, ordered table maps byte patterns at known offsets to MIME types.
//! The first entry whose every segment matches wins, so longer and more specific
//! signatures sit above short generic ones. Matching only ever looks at the first
//! [`MAX_SIGNATURE_LEN`] bytes.
//!
//! Detection is exposed both as the pure [`match_signature`] function and through the
//! [`SignatureDetector`] trait, which lets the classification pipeline chain the
//! built-in table with broader (and possibly fallible) detectors such as
//! [`InferDetector`].

use crate::Result;
use crate::core::mime::{GIF_MIME_TYPE, JPEG_MIME_TYPE, PDF_MIME_TYPE, PNG_MIME_TYPE, WEBP_MIME_TYPE, ZIP_MIME_TYPE};

/// A binary format signature: every `(offset, bytes)` segment must match.
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub segments: &'static [(usize, &'static [u8])],
    pub mime_type: &'static str,
}

impl Signature {
    const fn new(segments: &'static [(usize, &'static [u8])], mime_type: &'static str) -> Self {
        Self { segments, mime_type }
    }

    /// Number of leading bytes this signature needs to be decidable.
    pub const fn required_len(&self) -> usize {
        let mut max = 0;
        let mut i = 0;
        while i < self.segments.len() {
            let (offset, magic) = self.segments[i];
            if offset + magic.len() > max {
                max = offset + magic.len();
            }
            i += 1;
        }
        max
    }

    /// Whether `bytes` carries this signature. Short input never matches.
    pub fn matches(&self, bytes: &[u8]) -> bool {
        self.segments
            .iter()
            .all(|(offset, magic)| bytes.get(*offset..offset + magic.len()) == Some(*magic))
    }
}

/// Known signatures in priority order.
pub const SIGNATURES: &[Signature] = &[
    Signature::new(&[(0, b"SQLite format 3\0")], "application/vnd.sqlite3"),
    Signature::new(&[(0, b"RIFF"), (8, b"WEBP")], WEBP_MIME_TYPE),
    Signature::new(&[(0, b"RIFF"), (8, b"WAVE")], "audio/wav"),
    Signature::new(&[(0, b"RIFF"), (8, b"AVI ")], "video/x-msvideo"),
    Signature::new(&[(0, b"\x89PNG\r\n\x1a\n")], PNG_MIME_TYPE),
    Signature::new(&[(0, b"Rar!\x1a\x07")], "application/vnd.rar"),
    Signature::new(&[(0, &[0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C])], "application/x-7z-compressed"),
    Signature::new(&[(0, &[0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00])], "application/x-xz"),
    Signature::new(&[(0, b"GIF87a")], GIF_MIME_TYPE),
    Signature::new(&[(0, b"GIF89a")], GIF_MIME_TYPE),
    Signature::new(&[(0, b"%PDF-")], PDF_MIME_TYPE),
    Signature::new(&[(4, b"ftyp")], "video/mp4"),
    Signature::new(&[(0, b"PK\x03\x04")], ZIP_MIME_TYPE),
    Signature::new(&[(0, b"PK\x05\x06")], ZIP_MIME_TYPE),
    Signature::new(&[(0, b"PK\x07\x08")], ZIP_MIME_TYPE),
    Signature::new(&[(0, &[0x28, 0xB5, 0x2F, 0xFD])], "application/zstd"),
    Signature::new(&[(0, b"II*\0")], "image/tiff"),
    Signature::new(&[(0, b"MM\0*")], "image/tiff"),
    Signature::new(&[(0, &[0x00, 0x00, 0x01, 0x00])], "image/vnd.microsoft.icon"),
    Signature::new(&[(0, b"8BPS")], "image/vnd.adobe.photoshop"),
    Signature::new(&[(0, b"OggS")], "audio/ogg"),
    Signature::new(&[(0, b"fLaC")], "audio/flac"),
    Signature::new(&[(0, b"wOFF")], "font/woff"),
    Signature::new(&[(0, b"wOF2")], "font/woff2"),
    Signature::new(&[(0, b"\0asm")], "application/wasm"),
    Signature::new(&[(0, b"\x7fELF")], "application/x-elf"),
    Signature::new(&[(0, &[0xFE, 0xED, 0xFA, 0xCE])], "application/x-mach-binary"),
    Signature::new(&[(0, &[0xFE, 0xED, 0xFA, 0xCF])], "application/x-mach-binary"),
    Signature::new(&[(0, &[0xCE, 0xFA, 0xED, 0xFE])], "application/x-mach-binary"),
    Signature::new(&[(0, &[0xCF, 0xFA, 0xED, 0xFE])], "application/x-mach-binary"),
    Signature::new(&[(0, b"BM"), (6, &[0, 0, 0, 0])], "image/bmp"),
    Signature::new(&[(0, &[0xFF, 0xD8, 0xFF])], JPEG_MIME_TYPE),
    Signature::new(&[(0, b"ID3")], "audio/mpeg"),
    Signature::new(&[(0, b"BZh")], "application/x-bzip2"),
    Signature::new(&[(0, &[0x1F, 0x8B])], "application/gzip"),
    Signature::new(&[(0, b"MZ")], "application/vnd.microsoft.portable-executable"),
];

const fn max_signature_len(table: &[Signature]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < table.len() {
        let len = table[i].required_len();
        if len > max {
            max = len;
        }
        i += 1;
    }
    max
}

/// Longest prefix any signature inspects.
pub const MAX_SIGNATURE_LEN: usize = max_signature_len(SIGNATURES);

/// Match the leading bytes of `bytes` against [`SIGNATURES`].
///
/// Total for any input length; returns `None` when nothing matches.
///
/// ```rust
/// use spurhund::core::signature::match_signature;
///
/// assert_eq!(match_signature(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"), Some("image/png"));
/// assert_eq!(match_signature(b"hello"), None);
/// assert_eq!(match_signature(b""), None);
/// ```
pub fn match_signature(bytes: &[u8]) -> Option<&'static str> {
    let prefix = &bytes[..bytes.len().min(MAX_SIGNATURE_LEN)];
    SIGNATURES
        .iter()
        .find(|signature| signature.matches(prefix))
        .map(|signature| signature.mime_type)
}

/// A source of binary format verdicts.
///
/// Implementations may fail; the classification pipeline treats an error (or a
/// panic) as "no match" and moves on to the text heuristics.
pub trait SignatureDetector: Send + Sync {
    /// Detector name used in log output.
    fn name(&self) -> &str;

    /// Detect the binary format of `bytes`, if recognized.
    fn detect(&self, bytes: &[u8]) -> Result<Option<String>>;
}

/// Detector backed by the built-in [`SIGNATURES`] table.
#[derive(Debug, Default, Clone, Copy)]
pub struct MagicTableDetector;

impl SignatureDetector for MagicTableDetector {
    fn name(&self) -> &str {
        "magic-table"
    }

    fn detect(&self, bytes: &[u8]) -> Result<Option<String>> {
        Ok(match_signature(bytes).map(str::to_string))
    }
}

/// Bytes handed to the `infer` matchers.
const INFER_SCAN_LIMIT: usize = 8192;

/// Secondary detector backed by the `infer` crate.
///
/// Covers formats the built-in table does not list. Text matchers (HTML, XML,
/// shell scripts) are ignored so textual payloads always reach the text rule chain.
#[derive(Debug, Default, Clone, Copy)]
pub struct InferDetector;

impl SignatureDetector for InferDetector {
    fn name(&self) -> &str {
        "infer"
    }

    fn detect(&self, bytes: &[u8]) -> Result<Option<String>> {
        let window = &bytes[..bytes.len().min(INFER_SCAN_LIMIT)];
        Ok(infer::get(window)
            .filter(|kind| kind.matcher_type() != infer::MatcherType::Text)
            .map(|kind| kind.mime_type().to_string()))
    }
}
