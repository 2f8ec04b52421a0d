//! HTTP reader over libcurl.
//!
//! HEAD for metadata (falling back to a one-byte Range probe when HEAD is
//! refused or omits the length), GET for whole bodies, GET + Range for exact
//! byte ranges, and a threaded GET feeding a bounded channel for streams.
//! Every body request asks for identity encoding so byte counts are exact.

mod handler;
mod parse;

use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use curl::easy::{Easy2, List};

use self::handler::{Collector, StreamItem};
use self::parse::{is_success, status_error, ResponseHeaders};
use super::{ChunkSource, ChunkStream, Metadata, Reader};
use crate::cancel::CancelToken;
use crate::error::ReadError;
use crate::handle::Range;

/// Transfer settings for remote reads.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub connect_timeout: Duration,
    /// Abort when throughput stays below this many bytes/s for `low_speed_time`.
    pub low_speed_limit: u32,
    pub low_speed_time: Duration,
    pub user_agent: Option<String>,
    /// Chunks buffered between a transfer thread and its stream consumer.
    pub stream_backlog: usize,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            low_speed_limit: 1024,
            low_speed_time: Duration::from_secs(60),
            user_agent: None,
            stream_backlog: 2,
        }
    }
}

/// Completed request: final status plus parsed headers and (for buffered sinks) the body.
struct Response {
    status: u32,
    headers: ResponseHeaders,
    body: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RemoteReader {
    url: String,
    opts: HttpOptions,
}

impl RemoteReader {
    pub fn new(url: &str, opts: HttpOptions) -> Self {
        Self {
            url: url.to_string(),
            opts,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// HEAD request: size and normalized ETag, no body.
    pub fn head_metadata(&self) -> Result<Metadata, ReadError> {
        let mut easy = self.easy(Collector::buffer(&self.url, Some(0)))?;
        easy.nobody(true).map_err(|e| self.transport(e))?;
        let resp = self.perform(easy)?;
        match resp.status {
            405 | 501 => {
                tracing::debug!(url = %self.url, status = resp.status, "HEAD refused, probing size with Range");
                return self.probe_by_range();
            }
            code if !is_success(code) => return Err(status_error(code, &self.url)),
            _ => {}
        }
        match resp.headers.content_length {
            Some(size) => Ok(Metadata {
                size,
                fingerprint: resp.headers.etag,
            }),
            None => {
                tracing::debug!(url = %self.url, "HEAD without Content-Length, probing size with Range");
                self.probe_by_range()
            }
        }
    }

    /// `Range: bytes=0-0` GET; the total comes from `Content-Range`.
    fn probe_by_range(&self) -> Result<Metadata, ReadError> {
        let mut easy = self.easy(Collector::buffer(&self.url, Some(1)))?;
        easy.range("0-0").map_err(|e| self.transport(e))?;
        self.identity(&mut easy)?;
        let resp = self.perform(easy)?;
        let total = resp.headers.content_range.and_then(|cr| cr.total);
        match (resp.status, total) {
            (206, Some(size)) | (416, Some(size)) => Ok(Metadata {
                size,
                fingerprint: resp.headers.etag,
            }),
            (code, _) if code == 404 || code == 410 => Err(status_error(code, &self.url)),
            (code, _) if is_success(code) => Err(ReadError::ProtocolViolation(format!(
                "{} answered size probe with HTTP {} and no usable Content-Range",
                self.url, code
            ))),
            (code, _) => Err(status_error(code, &self.url)),
        }
    }

    fn transport(&self, e: curl::Error) -> ReadError {
        ReadError::Unreachable(format!("{}: {}", self.url, e))
    }

    fn easy(&self, collector: Collector) -> Result<Easy2<Collector>, ReadError> {
        let mut easy = Easy2::new(collector);
        easy.url(&self.url).map_err(|e| self.transport(e))?;
        easy.follow_location(true).map_err(|e| self.transport(e))?;
        easy.max_redirections(10).map_err(|e| self.transport(e))?;
        easy.connect_timeout(self.opts.connect_timeout)
            .map_err(|e| self.transport(e))?;
        easy.low_speed_limit(self.opts.low_speed_limit)
            .map_err(|e| self.transport(e))?;
        easy.low_speed_time(self.opts.low_speed_time)
            .map_err(|e| self.transport(e))?;
        if let Some(ua) = &self.opts.user_agent {
            easy.useragent(ua).map_err(|e| self.transport(e))?;
        }
        Ok(easy)
    }

    fn identity(&self, easy: &mut Easy2<Collector>) -> Result<(), ReadError> {
        let mut list = List::new();
        list.append("Accept-Encoding: identity")
            .map_err(|e| self.transport(e))?;
        easy.http_headers(list).map_err(|e| self.transport(e))
    }

    fn perform(&self, easy: Easy2<Collector>) -> Result<Response, ReadError> {
        let mut easy = easy;
        let result = easy.perform();
        if let Some(err) = easy.get_mut().take_abort() {
            tracing::warn!(url = %self.url, error = %err, "transfer aborted");
            return Err(err);
        }
        if let Err(e) = result {
            // A refused error body shows up as a write error; the status explains it.
            if !(e.is_write_error() && easy.get_ref().refused_status()) {
                return Err(self.transport(e));
            }
        }
        let status = easy.response_code().map_err(|e| self.transport(e))?;
        let headers = easy.get_ref().headers();
        let body = easy.get_mut().take_body();
        tracing::debug!(url = %self.url, status, bytes = body.len(), "request complete");
        Ok(Response {
            status,
            headers,
            body,
        })
    }
}

impl Reader for RemoteReader {
    fn describe(&self) -> String {
        self.url.clone()
    }

    fn metadata(&self) -> Result<Metadata, ReadError> {
        self.head_metadata()
    }

    fn read_all(&self) -> Result<Vec<u8>, ReadError> {
        let mut easy = self.easy(Collector::buffer(&self.url, None))?;
        self.identity(&mut easy)?;
        let resp = self.perform(easy)?;
        if !is_success(resp.status) {
            return Err(status_error(resp.status, &self.url));
        }
        if let Some(expected) = resp.headers.content_length {
            if expected != resp.body.len() as u64 {
                return Err(ReadError::ProtocolViolation(format!(
                    "{} declared {} bytes but sent {}",
                    self.url,
                    expected,
                    resp.body.len()
                )));
            }
        }
        Ok(resp.body)
    }

    fn read_range(&self, range: Range) -> Result<Vec<u8>, ReadError> {
        if range.is_empty() {
            return Err(ReadError::InvalidState(format!(
                "empty range {}..{}",
                range.start, range.end
            )));
        }
        let mut easy = self.easy(Collector::buffer(&self.url, Some(range.len())))?;
        easy.range(&range.http_spec())
            .map_err(|e| self.transport(e))?;
        self.identity(&mut easy)?;
        let resp = self.perform(easy)?;
        match resp.status {
            206 => {
                let span = resp.headers.content_range.and_then(|cr| cr.span);
                if span != Some((range.start, range.end - 1)) {
                    return Err(ReadError::ProtocolViolation(format!(
                        "{} answered {} with Content-Range {:?}",
                        self.url,
                        range.header_value(),
                        span
                    )));
                }
            }
            // A whole-body answer is only correct when the range is the whole resource.
            200 if range.start == 0 => {}
            200 => {
                return Err(ReadError::ProtocolViolation(format!(
                    "{} ignored {} and returned the full body",
                    self.url,
                    range.header_value()
                )))
            }
            code => return Err(status_error(code, &self.url)),
        }
        if resp.body.len() as u64 != range.len() {
            return Err(ReadError::ProtocolViolation(format!(
                "{} returned {} bytes for {}",
                self.url,
                resp.body.len(),
                range.header_value()
            )));
        }
        Ok(resp.body)
    }

    fn open_stream(&self) -> Result<ChunkStream, ReadError> {
        let (tx, rx) = mpsc::sync_channel::<StreamItem>(self.opts.stream_backlog.max(1));
        let abort = CancelToken::new();
        let mut easy = self.easy(Collector::channel(&self.url, tx.clone(), abort.clone()))?;
        self.identity(&mut easy)?;
        easy.progress(true).map_err(|e| self.transport(e))?;

        let reader = self.clone();
        let thread_abort = abort.clone();
        let worker = thread::Builder::new()
            .name("filesage-http-stream".to_string())
            .spawn(move || {
                let outcome = match reader.perform(easy) {
                    Ok(resp) if is_success(resp.status) => Ok(None),
                    Ok(resp) => Err(status_error(resp.status, &reader.url)),
                    Err(e) => Err(e),
                };
                if thread_abort.is_cancelled() {
                    tracing::debug!(url = %reader.url, "stream transfer cancelled");
                    return;
                }
                let _ = tx.send(outcome);
            })
            .map_err(|e| ReadError::Unreachable(format!("spawn transfer thread: {}", e)))?;

        Ok(ChunkStream::with_abort(
            RemoteStream {
                rx: Some(rx),
                worker: Some(worker),
                abort: abort.clone(),
            },
            abort,
        ))
    }
}

/// Consumer side of a streaming transfer.
struct RemoteStream {
    rx: Option<Receiver<StreamItem>>,
    worker: Option<JoinHandle<()>>,
    abort: CancelToken,
}

impl ChunkSource for RemoteStream {
    fn next_chunk(&mut self) -> Result<Option<Vec<u8>>, ReadError> {
        let rx = self
            .rx
            .as_ref()
            .ok_or_else(|| ReadError::InvalidState("stream closed".to_string()))?;
        match rx.recv() {
            Ok(item) => item,
            Err(_) => Err(ReadError::Unreachable(
                "transfer ended without completing".to_string(),
            )),
        }
    }
}

impl Drop for RemoteStream {
    fn drop(&mut self) {
        self.abort.cancel();
        // Drop the receiver first so a transfer blocked on a full channel wakes up.
        self.rx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
