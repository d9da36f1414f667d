//! Request Body.
//!
//! - [`Body`] the streamed request body, read at most once
//! - [`BodyReader`] replaceable strategy the parsers use to read it
//! - [`Incoming`] the default reader, bounded by length and read timeout
//!
use bytes::Bytes;
use futures_core::Stream;
use http_body::Frame;
use std::{
    fmt, io,
    pin::Pin,
    task::{Context, Poll, ready},
};
use tokio::sync::mpsc;

mod error;
mod reader;

pub use error::BodyError;
pub use reader::{BodyReader, Incoming, Read, ReadOptions, read_incoming};

type BoxStream = Pin<Box<dyn Stream<Item = io::Result<Bytes>> + Send>>;

// ===== Body =====

/// Streamed request body.
pub struct Body {
    repr: Repr,
    /// Bytes read past a limit, returned first on the next read.
    pending: Option<Bytes>,
}

enum Repr {
    Empty,
    Full(Bytes),
    Stream(BoxStream),
    Channel(mpsc::Receiver<io::Result<Bytes>>),
}

impl Body {
    /// Create an empty body.
    #[inline]
    pub const fn empty() -> Self {
        Self { repr: Repr::Empty, pending: None }
    }

    /// Create a body from a stream of chunks.
    pub fn from_stream<S>(stream: S) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self { repr: Repr::Stream(Box::pin(stream)), pending: None }
    }

    /// Create a body fed by a [`Sender`].
    ///
    /// `buffer` is the number of chunks that can be queued before
    /// [`Sender::send`] waits.
    pub fn channel(buffer: usize) -> (Sender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (Sender { tx }, Self { repr: Repr::Channel(rx), pending: None })
    }

    /// Returns the next chunk, or `None` at the end of the body.
    pub async fn chunk(&mut self) -> Option<io::Result<Bytes>> {
        std::future::poll_fn(|cx| self.poll_chunk(cx)).await
    }

    /// Put back bytes that were read but not consumed.
    pub(crate) fn unread(&mut self, bytes: Bytes) {
        debug_assert!(self.pending.is_none());
        if !bytes.is_empty() {
            self.pending = Some(bytes);
        }
    }

    fn poll_chunk(&mut self, cx: &mut Context<'_>) -> Poll<Option<io::Result<Bytes>>> {
        if let Some(pending) = self.pending.take() {
            return Poll::Ready(Some(Ok(pending)));
        }

        match &mut self.repr {
            Repr::Empty => Poll::Ready(None),
            Repr::Full(_) => match std::mem::replace(&mut self.repr, Repr::Empty) {
                Repr::Full(bytes) if !bytes.is_empty() => Poll::Ready(Some(Ok(bytes))),
                _ => Poll::Ready(None),
            },
            Repr::Stream(stream) => {
                let chunk = ready!(stream.as_mut().poll_next(cx));
                if chunk.is_none() {
                    self.repr = Repr::Empty;
                }
                Poll::Ready(chunk)
            }
            Repr::Channel(rx) => {
                let chunk = ready!(rx.poll_recv(cx));
                if chunk.is_none() {
                    self.repr = Repr::Empty;
                }
                Poll::Ready(chunk)
            }
        }
    }
}

impl http_body::Body for Body {
    type Data = Bytes;

    type Error = io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let chunk = ready!(self.get_mut().poll_chunk(cx));
        Poll::Ready(chunk.map(|e| e.map(Frame::data)))
    }

    fn is_end_stream(&self) -> bool {
        self.pending.is_none() && matches!(self.repr, Repr::Empty)
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_chunk(cx)
    }
}

impl Default for Body {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match &self.repr {
            Repr::Empty => "Empty",
            Repr::Full(_) => "Full",
            Repr::Stream(_) => "Stream",
            Repr::Channel(_) => "Channel",
        };
        f.debug_tuple("Body").field(&repr).finish()
    }
}

macro_rules! from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Body {
                #[inline]
                fn from(value: $ty) -> Self {
                    Self { repr: Repr::Full(Bytes::from(value)), pending: None }
                }
            }
        )*
    };
}

from!(Bytes, Vec<u8>, String, &'static [u8], &'static str);

// ===== Sender =====

/// Feeds chunks into a [`Body::channel`].
#[derive(Debug, Clone)]
pub struct Sender {
    tx: mpsc::Sender<io::Result<Bytes>>,
}

impl Sender {
    /// Send a chunk, waiting for capacity.
    ///
    /// Returns an error if the body was dropped.
    pub async fn send(&self, data: impl Into<Bytes>) -> io::Result<()> {
        self.tx
            .send(Ok(data.into()))
            .await
            .map_err(|_| io::Error::from(io::ErrorKind::BrokenPipe))
    }

    /// Fail the body with `err`.
    pub async fn abort(&self, err: io::Error) {
        let _ = self.tx.send(Err(err)).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test]
    async fn full_body_is_read_once() {
        let mut body = Body::from("hello");
        assert_eq!(body.chunk().await.unwrap().unwrap(), "hello");
        assert!(body.chunk().await.is_none());
        assert!(http_body::Body::is_end_stream(&body));
    }

    #[tokio::test]
    async fn channel_body() {
        let (tx, mut body) = Body::channel(4);
        tx.send("a").await.unwrap();
        tx.send("b").await.unwrap();
        drop(tx);

        assert_eq!(body.chunk().await.unwrap().unwrap(), "a");
        assert_eq!(body.chunk().await.unwrap().unwrap(), "b");
        assert!(body.chunk().await.is_none());
    }

    #[tokio::test]
    async fn unread_comes_first() {
        let mut body = Body::from("tail");
        body.unread(Bytes::from_static(b"head"));
        assert_eq!(body.chunk().await.unwrap().unwrap(), "head");
        assert_eq!(body.chunk().await.unwrap().unwrap(), "tail");
    }

    #[tokio::test]
    async fn abort_surfaces_error() {
        let (tx, mut body) = Body::channel(1);
        tx.abort(io::Error::other("reset")).await;
        assert!(body.chunk().await.unwrap().is_err());
    }
}
