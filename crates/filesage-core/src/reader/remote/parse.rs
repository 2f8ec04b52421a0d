//! Parse HTTP response header lines.

use crate::error::ReadError;
use crate::handle::normalize_fingerprint;

/// `Content-Range` value: `bytes a-b/total`, `bytes a-b/*` or `bytes */total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ContentRange {
    /// Inclusive `(first, last)` byte positions; `None` for the unsatisfied form.
    pub span: Option<(u64, u64)>,
    pub total: Option<u64>,
}

/// Headers of the final response (after redirects).
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseHeaders {
    pub status: Option<u32>,
    pub content_length: Option<u64>,
    pub etag: Option<String>,
    pub content_range: Option<ContentRange>,
    pub content_encoding: Option<String>,
}

impl ResponseHeaders {
    /// True when the body is not identity-encoded.
    pub fn is_encoded(&self) -> bool {
        match self.content_encoding.as_deref() {
            None => false,
            Some(v) => !v.trim().is_empty() && !v.trim().eq_ignore_ascii_case("identity"),
        }
    }
}

/// Status code from the status line (`HTTP/1.1 206 Partial Content`).
pub(crate) fn parse_http_status(lines: &[String]) -> Option<u32> {
    lines
        .iter()
        .find(|l| l.starts_with("HTTP/"))
        .and_then(|l| l.split_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
}

pub(crate) fn parse_content_range(value: &str) -> Option<ContentRange> {
    let rest = value.trim();
    let rest = rest
        .strip_prefix("bytes")
        .or_else(|| rest.strip_prefix("Bytes"))?
        .trim_start();
    let (span, total) = rest.split_once('/')?;
    let total = match total.trim() {
        "*" => None,
        t => Some(t.parse::<u64>().ok()?),
    };
    let span = match span.trim() {
        "*" => None,
        s => {
            let (a, b) = s.split_once('-')?;
            let a = a.trim().parse::<u64>().ok()?;
            let b = b.trim().parse::<u64>().ok()?;
            if b < a {
                return None;
            }
            Some((a, b))
        }
    };
    Some(ContentRange { span, total })
}

/// Parse collected header lines of one response.
pub(crate) fn parse_headers(lines: &[String]) -> ResponseHeaders {
    let mut out = ResponseHeaders {
        status: parse_http_status(lines),
        ..ResponseHeaders::default()
    };

    for line in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            let name = name.trim();
            let value = value.trim();
            if name.eq_ignore_ascii_case("content-length") {
                out.content_length = value.parse::<u64>().ok();
            } else if name.eq_ignore_ascii_case("etag") {
                let tag = normalize_fingerprint(value);
                if !tag.is_empty() {
                    out.etag = Some(tag);
                }
            } else if name.eq_ignore_ascii_case("content-range") {
                out.content_range = parse_content_range(value);
            } else if name.eq_ignore_ascii_case("content-encoding") {
                out.content_encoding = Some(value.to_string());
            }
        }
    }

    out
}

/// Map a non-success status to the failure taxonomy.
pub(crate) fn status_error(code: u32, url: &str) -> ReadError {
    match code {
        404 | 410 => ReadError::NotFound(format!("{} (HTTP {})", url, code)),
        416 => ReadError::ProtocolViolation(format!("{} answered 416 Range Not Satisfiable", url)),
        _ => ReadError::Unreachable(format!("{} returned HTTP {}", url, code)),
    }
}

pub(crate) fn is_success(code: u32) -> bool {
    (200..300).contains(&code)
}
