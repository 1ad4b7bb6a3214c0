use std::marker::Unpin;
use std::pin::Pin;
use std::task::{Context, Poll};

use digest::{Digest, Output as DigestOutput};
use tokio::io::{AsyncRead, ReadBuf};

/// AsyncRead filter that hashes the bytes that have been read.
///
/// The digest is finalized when EOF is reached and can be taken
/// out with [`HashReader::finish`].
pub struct HashReader<R, D>
where
    R: AsyncRead + Unpin,
    D: Digest + Unpin,
{
    inner: R,
    digest: Option<D>,
    finalized: Option<DigestOutput<D>>,
}

// Nothing is structurally pinned
impl<R, D> Unpin for HashReader<R, D>
where
    R: AsyncRead + Unpin,
    D: Digest + Unpin,
{
}

impl<R, D> HashReader<R, D>
where
    R: AsyncRead + Unpin,
    D: Digest + Unpin,
{
    pub fn new(inner: R, digest: D) -> Self {
        Self {
            inner,
            digest: Some(digest),
            finalized: None,
        }
    }

    /// Consumes the reader, returning the digest.
    ///
    /// Returns `None` if EOF hasn't been reached.
    pub fn finish(self) -> Option<DigestOutput<D>> {
        self.finalized
    }
}

impl<R, D> AsyncRead for HashReader<R, D>
where
    R: AsyncRead + Unpin,
    D: Digest + Unpin,
{
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<tokio::io::Result<()>> {
        let old_filled = buf.filled().len();
        let r = Pin::new(&mut self.inner).poll_read(cx, buf);
        let read_len = buf.filled().len() - old_filled;

        if let Poll::Ready(Ok(())) = r {
            if read_len == 0 {
                // EOF
                if let Some(digest) = self.digest.take() {
                    self.finalized = Some(digest.finalize());
                }
            } else if let Some(digest) = self.digest.as_mut() {
                let filled = buf.filled();
                digest.update(&filled[filled.len() - read_len..]);
            }
        }

        r
    }
}
