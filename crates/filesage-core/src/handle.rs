//! Resource handles and byte ranges.

use crate::error::ReadError;
use std::fmt;
use std::path::PathBuf;

/// Where a resource lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Local(PathBuf),
    Remote(url::Url),
}

/// Identifies one side of a comparison, plus any metadata the caller already
/// knows about it (used as the expected value by the metadata strategies).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    origin: Origin,
    known_size: Option<u64>,
    known_fingerprint: Option<String>,
}

impl FileHandle {
    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self {
            origin: Origin::Local(path.into()),
            known_size: None,
            known_fingerprint: None,
        }
    }

    pub fn remote(url: &str) -> Result<Self, ReadError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| ReadError::InvalidState(format!("invalid URL {:?}: {}", url, e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(Self {
                origin: Origin::Remote(parsed),
                known_size: None,
                known_fingerprint: None,
            }),
            other => Err(ReadError::InvalidState(format!(
                "unsupported URL scheme {:?}",
                other
            ))),
        }
    }

    /// `http://` and `https://` locators are remote; anything else is a local path.
    pub fn parse(s: &str) -> Result<Self, ReadError> {
        let lower = s.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::remote(s)
        } else {
            Ok(Self::local(s))
        }
    }

    pub fn with_known_size(mut self, size: u64) -> Self {
        self.known_size = Some(size);
        self
    }

    pub fn with_known_fingerprint(mut self, token: &str) -> Self {
        self.known_fingerprint = Some(normalize_fingerprint(token));
        self
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn is_remote(&self) -> bool {
        matches!(self.origin, Origin::Remote(_))
    }

    pub fn known_size(&self) -> Option<u64> {
        self.known_size
    }

    pub fn known_fingerprint(&self) -> Option<&str> {
        self.known_fingerprint.as_deref()
    }
}

impl fmt::Display for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin {
            Origin::Local(p) => write!(f, "{}", p.display()),
            Origin::Remote(u) => write!(f, "{}", u),
        }
    }
}

/// Strip a weak-validator prefix and surrounding quotes: `W/"abc"` -> `abc`.
pub fn normalize_fingerprint(raw: &str) -> String {
    let t = raw.trim();
    let t = t
        .strip_prefix("W/")
        .or_else(|| t.strip_prefix("w/"))
        .unwrap_or(t);
    t.trim_matches('"').to_string()
}

/// A byte range `[start, end)` (half-open, never empty).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    /// Start offset (inclusive).
    pub start: u64,
    /// End offset (exclusive).
    pub end: u64,
}

impl Range {
    /// Builds a range that satisfies `start < end <= size`.
    pub fn checked(start: u64, end: u64, size: u64) -> Result<Self, ReadError> {
        if start >= end || end > size {
            return Err(ReadError::InvalidState(format!(
                "range {}..{} invalid for size {}",
                start, end, size
            )));
        }
        Ok(Range { start, end })
    }

    /// First `min(k, size)` bytes, or `None` for an empty resource.
    pub fn head(size: u64, k: u64) -> Option<Self> {
        let n = k.min(size);
        (n > 0).then_some(Range { start: 0, end: n })
    }

    /// Last `min(k, size)` bytes, or `None` for an empty resource.
    pub fn tail(size: u64, k: u64) -> Option<Self> {
        let n = k.min(size);
        (n > 0).then_some(Range {
            start: size - n,
            end: size,
        })
    }

    /// Length of this range in bytes.
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value for curl's `range` option and the inclusive form used by HTTP: `start-(end-1)`.
    pub fn http_spec(&self) -> String {
        format!("{}-{}", self.start, self.end.saturating_sub(1))
    }

    /// Full `Range` header value: `bytes=start-(end-1)`.
    pub fn header_value(&self) -> String {
        format!("bytes={}", self.http_spec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_classifies_locators() {
        assert!(FileHandle::parse("https://example.com/a.bin").unwrap().is_remote());
        assert!(FileHandle::parse("HTTP://example.com/a.bin").unwrap().is_remote());
        assert!(!FileHandle::parse("/tmp/a.bin").unwrap().is_remote());
        assert!(!FileHandle::parse("relative/a.bin").unwrap().is_remote());
    }

    #[test]
    fn remote_rejects_non_http_scheme() {
        assert!(FileHandle::remote("ftp://example.com/a").is_err());
        assert!(FileHandle::remote("not a url").is_err());
    }

    #[test]
    fn known_metadata_is_attached() {
        let h = FileHandle::local("/tmp/x")
            .with_known_size(1024)
            .with_known_fingerprint("W/\"abc\"");
        assert_eq!(h.known_size(), Some(1024));
        assert_eq!(h.known_fingerprint(), Some("abc"));
    }

    #[test]
    fn fingerprint_normalization() {
        assert_eq!(normalize_fingerprint("\"abc-123\""), "abc-123");
        assert_eq!(normalize_fingerprint("W/\"abc\""), "abc");
        assert_eq!(normalize_fingerprint("  plain "), "plain");
    }

    #[test]
    fn checked_range_bounds() {
        assert!(Range::checked(0, 10, 10).is_ok());
        assert!(Range::checked(5, 5, 10).is_err());
        assert!(Range::checked(0, 11, 10).is_err());
        assert!(Range::checked(7, 3, 10).is_err());
    }

    #[test]
    fn head_and_tail_windows() {
        assert_eq!(Range::head(100, 64), Some(Range { start: 0, end: 64 }));
        assert_eq!(Range::tail(100, 64), Some(Range { start: 36, end: 100 }));
        assert_eq!(Range::head(10, 64), Some(Range { start: 0, end: 10 }));
        assert_eq!(Range::tail(10, 64), Some(Range { start: 0, end: 10 }));
        assert_eq!(Range::head(0, 64), None);
        assert_eq!(Range::tail(0, 64), None);
    }

    #[test]
    fn range_header() {
        let r = Range { start: 0, end: 99 };
        assert_eq!(r.header_value(), "bytes=0-98");
        assert_eq!(r.http_spec(), "0-98");
        assert_eq!(r.len(), 99);
        let single = Range { start: 42, end: 43 };
        assert_eq!(single.header_value(), "bytes=42-42");
    }
}
