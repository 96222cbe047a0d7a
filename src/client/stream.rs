//! Fragment Stream
//!
//! Pull-based stream of content fragments over a response body. Owns the
//! byte source and drops it exactly once, whether the stream finishes,
//! fails, is closed, or its cancellation token fires.

use crate::api::streaming::SseDecoder;
use crate::error::Result;
use bytes::Bytes;
use futures::stream::FusedStream;
use futures::{Stream, StreamExt};
use pin_project_lite::pin_project;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Boxed response body byte stream
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Fragment stream over a live HTTP response
pub type ResponseStream = FragmentStream<ByteStream>;

/// Lifecycle of a fragment stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Reading from the source
    Streaming,

    /// `[DONE]` seen or the source ended
    Done,

    /// Closed by the consumer or by cancellation
    Cancelled,

    /// The source failed mid-stream
    Failed,
}

pin_project! {
    /// Lazy, finite, non-restartable sequence of content fragments
    pub struct FragmentStream<S> {
        #[pin]
        source: Option<S>,
        decoder: SseDecoder,
        pending: VecDeque<String>,
        cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
        state: StreamState,
    }
}

impl<S> FragmentStream<S>
where
    S: Stream<Item = Result<Bytes>>,
{
    /// Wrap a byte source
    pub fn new(source: S) -> Self {
        Self {
            source: Some(source),
            decoder: SseDecoder::new(),
            pending: VecDeque::new(),
            cancelled: None,
            state: StreamState::Streaming,
        }
    }

    /// Stop reading and release the source once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }

    /// Current lifecycle state
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Stop reading, drop any undelivered fragments, and release the source
    pub fn close(self: Pin<&mut Self>) {
        let this = self.project();
        this.pending.clear();
        release(this.source, this.state, StreamState::Cancelled);
    }
}

impl<S> FragmentStream<S>
where
    S: Stream<Item = Result<Bytes>> + Unpin,
{
    /// Next fragment, or `None` once the stream has ended
    pub async fn next_fragment(&mut self) -> Option<Result<String>> {
        self.next().await
    }

    /// [`close`](Self::close) for unpinned streams
    pub fn cancel(&mut self) {
        Pin::new(self).close();
    }

    /// Drain the remaining fragments into one string
    pub async fn collect_text(mut self) -> Result<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next_fragment().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

/// Drop the source if still held and leave the streaming state
fn release<S>(mut source: Pin<&mut Option<S>>, state: &mut StreamState, next: StreamState) {
    if source.is_some() {
        source.set(None);
        tracing::debug!(reason = ?next, "released response body");
    }

    if *state == StreamState::Streaming {
        *state = next;
    }
}

impl<S> Stream for FragmentStream<S>
where
    S: Stream<Item = Result<Bytes>>,
{
    type Item = Result<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.state == StreamState::Streaming {
                if let Some(cancelled) = this.cancelled.as_mut() {
                    if cancelled.as_mut().poll(cx).is_ready() {
                        this.pending.clear();
                        release(this.source.as_mut(), this.state, StreamState::Cancelled);
                        return Poll::Ready(None);
                    }
                }
            }

            if let Some(fragment) = this.pending.pop_front() {
                return Poll::Ready(Some(Ok(fragment)));
            }

            if *this.state != StreamState::Streaming {
                return Poll::Ready(None);
            }

            let Some(source) = this.source.as_mut().as_pin_mut() else {
                *this.state = StreamState::Done;
                return Poll::Ready(None);
            };

            match ready!(source.poll_next(cx)) {
                Some(Ok(bytes)) => {
                    this.pending.extend(this.decoder.decode(&bytes));
                    if this.decoder.is_done() {
                        release(this.source.as_mut(), this.state, StreamState::Done);
                    }
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "response body failed mid-stream");
                    release(this.source.as_mut(), this.state, StreamState::Failed);
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.pending.extend(this.decoder.finish());
                    release(this.source.as_mut(), this.state, StreamState::Done);
                }
            }
        }
    }
}

impl<S> FusedStream for FragmentStream<S>
where
    S: Stream<Item = Result<Bytes>>,
{
    fn is_terminated(&self) -> bool {
        self.state != StreamState::Streaming && self.pending.is_empty()
    }
}
