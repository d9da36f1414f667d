use bytes::{Bytes, BytesMut};
use futures_core::future::BoxFuture;
use std::time::Duration;

use super::{Body, BodyError};
use crate::request::Request;

/// Default maximum number of bytes read by [`Incoming`].
pub const DEFAULT_LENGTH: usize = 8_000_000;

/// Default time to wait for each chunk.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Limits applied when reading a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Maximum number of bytes to read.
    pub length: usize,
    /// Maximum time to wait for each chunk, `None` waits forever.
    pub read_timeout: Option<Duration>,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { length: DEFAULT_LENGTH, read_timeout: Some(DEFAULT_READ_TIMEOUT) }
    }
}

/// Result of a bounded body read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Read {
    /// The whole body was read.
    Done(Bytes),
    /// Reading stopped at the length limit, more data remains.
    More(Bytes),
}

/// Strategy parsers use to obtain the raw body.
///
/// Replace the default [`Incoming`] reader to observe the raw bytes, for
/// example to verify a signature later, without changing any parser.
pub trait BodyReader: Send + Sync + 'static {
    fn read_body<'a>(
        &'a self,
        req: &'a mut Request,
        options: &'a ReadOptions,
    ) -> BoxFuture<'a, Result<Read, BodyError>>;
}

/// Reads the request [`Body`] as streamed by the transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct Incoming;

impl BodyReader for Incoming {
    fn read_body<'a>(
        &'a self,
        req: &'a mut Request,
        options: &'a ReadOptions,
    ) -> BoxFuture<'a, Result<Read, BodyError>> {
        Box::pin(read_incoming(req.body_mut(), options))
    }
}

/// Read `body` until its end or until `options.length` bytes.
///
/// The limit is checked on every chunk, so at most `length` bytes are ever
/// buffered. Bytes past the limit stay in the body.
pub async fn read_incoming(body: &mut Body, options: &ReadOptions) -> Result<Read, BodyError> {
    let mut buffer = BytesMut::new();

    loop {
        let chunk = match options.read_timeout {
            Some(timeout) => tokio::time::timeout(timeout, body.chunk())
                .await
                .map_err(|_| BodyError::Timeout)?,
            None => body.chunk().await,
        };

        let Some(chunk) = chunk else {
            return Ok(Read::Done(buffer.freeze()));
        };
        let mut chunk = chunk?;

        let room = options.length - buffer.len();
        if chunk.len() > room {
            let rest = chunk.split_off(room);
            buffer.extend_from_slice(&chunk);
            body.unread(rest);
            return Ok(Read::More(buffer.freeze()));
        }

        buffer.extend_from_slice(&chunk);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn options(length: usize) -> ReadOptions {
        ReadOptions { length, read_timeout: Some(Duration::from_millis(200)) }
    }

    #[tokio::test]
    async fn read_within_limit() {
        let mut body = Body::from("a=1&b=2");
        let read = read_incoming(&mut body, &options(7)).await.unwrap();
        assert_eq!(read, Read::Done(Bytes::from_static(b"a=1&b=2")));
    }

    #[tokio::test]
    async fn stops_at_limit() {
        let mut body = Body::from("0123456789");
        let read = read_incoming(&mut body, &options(4)).await.unwrap();
        assert_eq!(read, Read::More(Bytes::from_static(b"0123")));

        let rest = read_incoming(&mut body, &options(100)).await.unwrap();
        assert_eq!(rest, Read::Done(Bytes::from_static(b"456789")));
    }

    #[tokio::test]
    async fn stops_mid_stream_without_waiting_for_end() {
        let (tx, mut body) = Body::channel(8);
        tx.send("aaaa").await.unwrap();
        tx.send("bbbb").await.unwrap();
        tx.send("cccc").await.unwrap();

        // `tx` is still alive, the read must not wait for the end of body
        let read = read_incoming(&mut body, &options(6)).await.unwrap();
        assert_eq!(read, Read::More(Bytes::from_static(b"aaaabb")));
        drop(tx);
    }

    #[tokio::test]
    async fn timeout() {
        let (_tx, mut body) = Body::channel(1);
        let err = read_incoming(&mut body, &options(10)).await.unwrap_err();
        assert!(matches!(err, BodyError::Timeout));
    }

    #[tokio::test]
    async fn transport_error() {
        let (tx, mut body) = Body::channel(2);
        tx.send("ok").await.unwrap();
        tx.abort(std::io::Error::other("reset")).await;
        let err = read_incoming(&mut body, &options(10)).await.unwrap_err();
        assert!(matches!(err, BodyError::Io(_)));
    }
}
