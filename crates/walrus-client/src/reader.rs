//! `AsyncRead` over a blob chunk stream

use crate::transport::ByteStream;
use bytes::{Buf, Bytes};
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, ReadBuf};

/// Reads a blob as it arrives.
///
/// Holds at most one chunk of the underlying stream. A read returns whatever
/// the current chunk still has (possibly less than asked for); a read of
/// zero bytes means the blob is exhausted.
pub struct BlobReader {
    stream: ByteStream,
    chunk: Bytes,
    done: bool,
}

impl BlobReader {
    pub fn new(stream: ByteStream) -> Self {
        Self {
            stream,
            chunk: Bytes::new(),
            done: false,
        }
    }
}

impl AsyncRead for BlobReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        loop {
            if !this.chunk.is_empty() {
                let n = this.chunk.len().min(buf.remaining());
                buf.put_slice(&this.chunk[..n]);
                this.chunk.advance(n);
                return Poll::Ready(Ok(()));
            }

            if this.done {
                return Poll::Ready(Ok(()));
            }

            match ready!(this.stream.as_mut().poll_next(cx)) {
                Some(Ok(chunk)) => this.chunk = chunk,
                Some(Err(e)) => {
                    this.done = true;
                    return Poll::Ready(Err(io::Error::other(e)));
                }
                None => this.done = true,
            }
        }
    }
}
