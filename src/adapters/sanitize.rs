//! Log sanitization for subject and transcript data.
//!
//! String-based scrubbing applied to formatted log output before it
//! reaches a sink. Targets the material this system must never leak
//! through logs:
//! - Subject identifiers (UUIDs, MRNs, SSN-like strings, emails)
//! - Raw marker symbol lists
//! - Protocol transcript values (blinded elements are huge decimal
//!   integers; secrets and digests show up as long hex runs)
//!
//! # Important: prefer redaction-by-type
//!
//! Sanitizing strings is a defense-in-depth fallback. The primary
//! protection is that session secrets have redacting `Debug` output and
//! the services log counts, never symbols. This layer catches what slips
//! past that.
//!
//! # Performance
//!
//! `sanitize()` caps input size (see `GENOSCREEN_SANITIZE_MAX_BYTES`) so
//! a runaway log line cannot turn scrubbing into a hot spot.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PATTERNS: OnceLock<ScrubPatterns> = OnceLock::new();

/// Maximum number of bytes to sanitize per call.
///
/// Defaults to 16 KiB; can be overridden via `GENOSCREEN_SANITIZE_MAX_BYTES`.
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct ScrubPattern {
    regex: Regex,
    replacement: &'static str,
}

struct ScrubPatterns {
    set: RegexSet,
    patterns: Vec<ScrubPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes.min(input.len());
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var("GENOSCREEN_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static ScrubPatterns {
    PATTERNS.get_or_init(|| {
        let rules: Vec<(&'static str, &'static str)> = vec![
            // UUIDs (screening and subject ids)
            (
                r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
                "[REDACTED-UUID]",
            ),
            // SSN-like patterns (xxx-xx-xxxx)
            (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
            // MRN patterns (common formats)
            (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
            // Email patterns (bounded labels; case-insensitive)
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            // Marker symbol lists in key=value shape
            (
                r"(?i)\b(?:marker|gene|panel)s?\s*[:=]\s*\[[^\]]{0,512}\]",
                "[REDACTED-MARKERS]",
            ),
            // Contextual secrets (reduce false positives vs. raw base64/hex)
            (
                r"(?i)\b(?:secret|password|passwd|pwd|token|key|seed|exponent)\b\s*[:=]\s*[A-Za-z0-9+/]{32,}={0,2}\b",
                "[REDACTED-SECRET]",
            ),
            (
                r"(?i)\b(?:secret|password|passwd|pwd|token|key|seed|exponent)\b\s*[:=]\s*[0-9a-fA-F]{16,}\b",
                "[REDACTED-SECRET]",
            ),
            // Blinded group elements are decimal integers of hundreds of
            // digits; nothing legitimate in a log line is this long.
            (r"\b[0-9]{40,}\b", "[REDACTED-ELEMENT]"),
            // Broad hex material (digests, raw secret bytes)
            (r"\b[0-9a-fA-F]{32,}\b", "[REDACTED-KEY]"),
        ];

        let set = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let patterns = rules
            .into_iter()
            .map(|(pattern, replacement)| ScrubPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        ScrubPatterns { set, patterns }
    })
}

/// Sanitize a string by replacing sensitive patterns.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();

    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    // Fast path: single scan for "any match".
    if !patterns.set.is_match(prefix) {
        let mut out = prefix.to_string();
        if truncated {
            out.push_str(" [TRUNCATED]");
        }
        return out;
    }

    // Only apply patterns that matched the original prefix.
    let matched: Vec<usize> = patterns.set.matches(prefix).into_iter().collect();
    let mut result = prefix.to_string();
    for idx in matched {
        let pattern = &patterns.patterns[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .to_string();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// A `tracing_subscriber` writer wrapper that sanitizes formatted log
/// output before it reaches the underlying sink.
///
/// Keeps scrubbing centralized instead of relying on every callsite to
/// remember what not to log.
#[derive(Debug)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<M> Clone for SanitizingMakeWriter<M>
where
    M: Clone,
{
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line = self.buffer.drain(..=pos).collect::<Vec<u8>>();
            let line_str = String::from_utf8_lossy(&line);
            let sanitized = sanitize(&line_str);
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A formatter writing one huge line with no newline must not buffer
        // without bound; past twice the sanitize cap the buffer is scrubbed
        // and flushed as is.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if hard_cap > 0 && self.buffer.len() > hard_cap {
            let s = String::from_utf8_lossy(&self.buffer).to_string();
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n[TRUNCATED]\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let s = String::from_utf8_lossy(&self.buffer);
            let sanitized = sanitize(&s);
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_sanitize_uuid() {
        let input = "Subject ID: 550e8400-e29b-41d4-a716-446655440000 processed";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-UUID]"));
        assert!(!sanitized.contains("550e8400"));
    }

    #[test]
    fn test_sanitize_mrn() {
        let input = "MRN:12345678 screened";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-MRN]"));
    }

    #[test]
    fn test_sanitize_email() {
        let input = "Contact: subject@clinic.org";
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-EMAIL]"));
    }

    #[test]
    fn test_sanitize_blinded_element() {
        let element = "9".repeat(120);
        let input = format!("exchange carried {element} onward");
        let sanitized = sanitize(&input);
        assert!(sanitized.contains("[REDACTED-ELEMENT]"));
        assert!(!sanitized.contains(&element));
    }

    #[test]
    fn test_short_numbers_survive() {
        let input = "matched 2 of 3 markers in 17 ms";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_sanitize_marker_list() {
        let input = r#"markers=[BRCA1, TP53, ERBB2]"#;
        let sanitized = sanitize(input);
        assert!(sanitized.contains("[REDACTED-MARKERS]"));
        assert!(!sanitized.contains("BRCA1"));
    }

    #[test]
    fn test_sanitize_contextual_secret() {
        let input = "exponent=0123456789abcdef0123456789abcdef";
        let sanitized = sanitize(input);
        assert!(
            sanitized.contains("[REDACTED-SECRET]") || sanitized.contains("[REDACTED-KEY]")
        );
        assert!(!sanitized.contains("0123456789abcdef"));
    }

    #[test]
    fn test_fingerprints_survive() {
        // List fingerprints are 16 hex chars, below the hex redaction floor.
        let input = "cache keyed by fingerprint 6fa1d2e3b4c5a697";
        assert_eq!(sanitize(input), input);
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let input = "prefix 0123456789abcdef0123456789abcdef suffix";
        let sanitized = sanitize_with_limit(input, 16);
        assert!(sanitized.contains("[TRUNCATED]"));
    }

    #[test]
    fn test_writer_sanitizes_complete_lines() {
        let mut out: Vec<u8> = Vec::new();
        {
            let mut writer = SanitizingWriter::new(&mut out);
            let element = "7".repeat(80);
            writeln!(writer, "sending element {element}").expect("Should write");
            writer.flush().expect("Should flush");
        }
        let text = String::from_utf8(out).expect("utf-8 output");
        assert!(text.contains("[REDACTED-ELEMENT]"));
        assert!(!text.contains("7777777777"));
    }
}
