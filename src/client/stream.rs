//! Stream Reader
//!
//! Pull-based reader over a streaming completion body. Each `data: <json>`
//! line yields one event, `data: [DONE]` or end of body ends the stream, and
//! other lines are skipped.
//!
//! A reader owns its body and a [`CancellationToken`]. Cancelling the token
//! from any task unblocks a pending [`EventStream::recv`], which then reports
//! [`DeepseekError::Cancelled`].

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::io;
use std::marker::PhantomData;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::api::fim::FimStreamChunk;
use crate::api::streaming::{parse_sse_line, SseLine, StreamAccumulator, StreamChunk};
use crate::api::Message;
use crate::error::{DeepseekError, Result};

/// Longest line the reader buffers while waiting for its `\n`
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Leading bytes of an oversized line kept in its error
const OVERSIZED_LINE_PREFIX: usize = 256;

type ByteStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

/// Chat completion event stream
pub type ChatCompletionStream = EventStream<StreamChunk>;

/// Fill-in-the-middle event stream
pub type FimCompletionStream = EventStream<FimStreamChunk>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    /// Sentinel or end of body seen
    Finished,
    /// Closed by the caller or cancelled
    Closed,
}

/// Reader yielding one decoded event per `data:` line.
///
/// Meant for a single consumer calling [`recv`](Self::recv) in a loop.
/// Dropping the reader cancels its token and releases the connection.
pub struct EventStream<T> {
    body: Option<ByteStream>,
    buffer: BytesMut,
    token: CancellationToken,
    state: State,
    _event: PhantomData<fn() -> T>,
}

impl<T: DeserializeOwned> EventStream<T> {
    /// Wrap a byte stream. The reader stops once `token` is cancelled.
    pub fn new<S>(body: S, token: CancellationToken) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self {
            body: Some(Box::pin(body)),
            buffer: BytesMut::new(),
            token,
            state: State::Open,
            _event: PhantomData,
        }
    }

    /// Wrap the body of a successful streaming response
    pub fn from_response(response: reqwest::Response, token: CancellationToken) -> Self {
        let body = response.bytes_stream().map(|chunk| chunk.map_err(io::Error::other));
        Self::new(body, token)
    }

    /// Next event.
    ///
    /// Returns `Ok(None)` once the stream has ended, whether by the
    /// `[DONE]` sentinel or the body closing, and on every call after that.
    /// A read failure leaves the reader open; a cancelled or closed reader
    /// returns [`DeepseekError::Cancelled`].
    pub async fn recv(&mut self) -> Result<Option<T>> {
        loop {
            match self.state {
                State::Finished => return Ok(None),
                State::Closed => return Err(DeepseekError::Cancelled),
                State::Open => {}
            }
            if self.token.is_cancelled() {
                return Err(self.cancelled());
            }

            if let Some(line) = self.next_line() {
                let line = String::from_utf8_lossy(&line);
                trace!(line = %line, "stream line");

                match parse_sse_line::<T>(&line)? {
                    SseLine::Event(event) => return Ok(Some(event)),
                    SseLine::Done => {
                        debug!("stream finished with [DONE]");
                        self.finish();
                        return Ok(None);
                    }
                    SseLine::Ignored => continue,
                }
            }

            if self.buffer.len() > MAX_LINE_BYTES {
                return Err(self.oversized_line());
            }

            let Some(body) = self.body.as_mut() else {
                debug!("stream body ended without [DONE]");
                self.finish();
                return Ok(None);
            };

            let next = tokio::select! {
                biased;
                _ = self.token.cancelled() => None,
                next = body.next() => Some(next),
            };

            match next {
                None => return Err(self.cancelled()),
                Some(Some(Ok(bytes))) => self.buffer.extend_from_slice(&bytes),
                Some(Some(Err(e))) => return Err(DeepseekError::StreamRead(e)),
                // end of body; whatever is buffered is the last line
                Some(None) => self.body = None,
            }
        }
    }

    /// Cancel the reader and release the body. Safe to call more than once.
    pub fn close(&mut self) {
        if self.state != State::Closed {
            debug!("stream closed");
        }
        self.state = State::Closed;
        self.release();
    }

    /// Token that cancels this reader, for use from another task
    pub fn cancel_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Adapt into a [`Stream`]. The stream ends after the first error.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<T>> + Send
    where
        T: Send + 'static,
    {
        async_stream::try_stream! {
            while let Some(event) = self.recv().await? {
                yield event;
            }
        }
    }

    /// Complete line from the buffer, without its `\n`. After the body has
    /// ended an unterminated remainder also counts as a line.
    fn next_line(&mut self) -> Option<BytesMut> {
        if let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line = self.buffer.split_to(pos + 1);
            line.truncate(pos);
            return Some(line);
        }

        if self.body.is_none() && !self.buffer.is_empty() {
            return Some(self.buffer.split());
        }

        None
    }

    fn oversized_line(&mut self) -> DeepseekError {
        let prefix = &self.buffer[..OVERSIZED_LINE_PREFIX.min(self.buffer.len())];
        let err = DeepseekError::decode(
            format!("stream line exceeds {} bytes", MAX_LINE_BYTES),
            String::from_utf8_lossy(prefix),
        );
        debug!(buffered = self.buffer.len(), "stream line too long, closing");
        self.state = State::Closed;
        self.release();
        err
    }

    fn finish(&mut self) {
        self.state = State::Finished;
        self.release();
    }

    fn cancelled(&mut self) -> DeepseekError {
        debug!("stream cancelled");
        self.state = State::Closed;
        self.release();
        DeepseekError::Cancelled
    }

    fn release(&mut self) {
        self.token.cancel();
        self.body = None;
        self.buffer.clear();
    }
}

impl ChatCompletionStream {
    /// Drain the stream into the assistant message it describes
    pub async fn collect_message(&mut self) -> Result<Message> {
        let mut accumulator = StreamAccumulator::new();
        while let Some(chunk) = self.recv().await? {
            accumulator.process_chunk(&chunk);
        }
        Ok(accumulator.into_message())
    }
}

impl<T> Drop for EventStream<T> {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl<T> std::fmt::Debug for EventStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("state", &self.state)
            .field("buffered", &self.buffer.len())
            .finish()
    }
}
