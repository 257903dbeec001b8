//! Binary-versus-text heuristic.
//!
//! Looks at a bounded sample and measures how much of it is printable ASCII and how
//! much is C0 control bytes. Short or adversarial inputs can fool it in both
//! directions; that is accepted, since binary formats with a known signature never
//! get this far.

/// Maximum number of leading bytes sampled.
pub const TEXT_SAMPLE_SIZE: usize = 512;

/// Printable share a sample must exceed to count as text.
pub const MIN_PRINTABLE_RATIO: f64 = 0.7;

/// Control share a sample must stay below to count as text.
pub const MAX_CONTROL_RATIO: f64 = 0.3;

#[inline]
fn is_text_whitespace(byte: u8) -> bool {
    matches!(byte, b'\t' | b'\n' | b'\r')
}

/// Printable and control byte counts for a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleStats {
    pub sample_size: usize,
    pub printable: usize,
    pub control: usize,
}

impl SampleStats {
    /// Count the first [`TEXT_SAMPLE_SIZE`] bytes of `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        let sample = &bytes[..bytes.len().min(TEXT_SAMPLE_SIZE)];
        let mut printable = 0;
        let mut control = 0;

        for &byte in sample {
            if (0x20..=0x7E).contains(&byte) || is_text_whitespace(byte) {
                printable += 1;
            } else if byte < 0x20 {
                control += 1;
            }
        }

        Self {
            sample_size: sample.len(),
            printable,
            control,
        }
    }

    pub fn printable_ratio(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.printable as f64 / self.sample_size as f64
    }

    pub fn control_ratio(&self) -> f64 {
        if self.sample_size == 0 {
            return 0.0;
        }
        self.control as f64 / self.sample_size as f64
    }
}

/// Whether `bytes` looks like text.
///
/// Empty input is not text.
///
/// ```rust
/// use spurhund::core::heuristic::looks_like_text;
///
/// assert!(looks_like_text(b"plain old text\n"));
/// assert!(!looks_like_text(&[0u8, 1, 2, 3, 4, 5]));
/// assert!(!looks_like_text(b""));
/// ```
pub fn looks_like_text(bytes: &[u8]) -> bool {
    let stats = SampleStats::of(bytes);
    if stats.sample_size == 0 {
        return false;
    }
    stats.printable_ratio() > MIN_PRINTABLE_RATIO && stats.control_ratio() < MAX_CONTROL_RATIO
}
