//! Easy2 handler shared by every remote request.
//!
//! Collects the final response's headers, refuses the body of non-2xx or
//! non-identity responses, enforces the byte limit of ranged requests, and
//! either buffers the body or forwards it chunk by chunk to a stream.

use std::str;
use std::sync::mpsc::SyncSender;

use super::parse::{self, ResponseHeaders};
use crate::cancel::CancelToken;
use crate::error::ReadError;

/// Message carried from a transfer thread to its `RemoteStream`.
pub(super) type StreamItem = Result<Option<Vec<u8>>, ReadError>;

pub(super) enum Sink {
    Buffer(Vec<u8>),
    Channel(SyncSender<StreamItem>),
}

pub(super) struct Collector {
    url: String,
    response_headers: Vec<String>,
    /// None = body not yet inspected; Some(true) = forwarding; Some(false) = refused.
    accepted: Option<bool>,
    sink: Sink,
    received: u64,
    limit: Option<u64>,
    cancel: Option<CancelToken>,
    /// Reason the transfer was aborted from inside a callback.
    abort: Option<ReadError>,
}

impl Collector {
    pub(super) fn buffer(url: &str, limit: Option<u64>) -> Self {
        Self::with_sink(url, Sink::Buffer(Vec::new()), limit, None)
    }

    pub(super) fn channel(url: &str, tx: SyncSender<StreamItem>, cancel: CancelToken) -> Self {
        Self::with_sink(url, Sink::Channel(tx), None, Some(cancel))
    }

    fn with_sink(url: &str, sink: Sink, limit: Option<u64>, cancel: Option<CancelToken>) -> Self {
        Self {
            url: url.to_string(),
            response_headers: Vec::new(),
            accepted: None,
            sink,
            received: 0,
            limit,
            cancel,
            abort: None,
        }
    }

    pub(super) fn headers(&self) -> ResponseHeaders {
        parse::parse_headers(&self.response_headers)
    }

    pub(super) fn take_abort(&mut self) -> Option<ReadError> {
        self.abort.take()
    }

    /// True when the body was refused because of the status code; the caller maps the status.
    pub(super) fn refused_status(&self) -> bool {
        self.accepted == Some(false) && self.abort.is_none()
    }

    pub(super) fn take_body(&mut self) -> Vec<u8> {
        match &mut self.sink {
            Sink::Buffer(b) => std::mem::take(b),
            Sink::Channel(_) => Vec::new(),
        }
    }

    pub(super) fn received(&self) -> u64 {
        self.received
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().map(|c| c.is_cancelled()).unwrap_or(false)
    }

    /// Decide once, on the first body bytes, whether this response may be consumed.
    fn inspect(&mut self) -> bool {
        let headers = self.headers();
        let status = headers.status.unwrap_or(0);
        if !parse::is_success(status) {
            return false;
        }
        if headers.is_encoded() {
            self.abort = Some(ReadError::ProtocolViolation(format!(
                "{} sent Content-Encoding {:?} despite identity request",
                self.url,
                headers.content_encoding.unwrap_or_default()
            )));
            return false;
        }
        true
    }
}

impl curl::easy::Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            if line.starts_with("HTTP/") {
                // New response (redirect hop or interim 1xx): keep only the latest.
                self.response_headers.clear();
            }
            if !line.is_empty() {
                self.response_headers.push(line.to_string());
            }
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, curl::easy::WriteError> {
        if self.accepted.is_none() {
            let ok = self.inspect();
            self.accepted = Some(ok);
        }
        if self.accepted == Some(false) || self.cancelled() {
            return Ok(0);
        }
        let n = data.len() as u64;
        if let Some(limit) = self.limit {
            if self.received + n > limit {
                self.abort = Some(ReadError::ProtocolViolation(format!(
                    "{} sent more than the {} bytes requested (Range ignored?)",
                    self.url, limit
                )));
                return Ok(0);
            }
        }
        match &mut self.sink {
            Sink::Buffer(b) => b.extend_from_slice(data),
            Sink::Channel(tx) => {
                if tx.send(Ok(Some(data.to_vec()))).is_err() {
                    // Receiver dropped: the stream was abandoned.
                    return Ok(0);
                }
            }
        }
        self.received += n;
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        !self.cancelled()
    }
}
