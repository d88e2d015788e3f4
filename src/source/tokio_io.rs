//! tokio I/O objects seen through the suspending capability contract.

use std::io::{self, SeekFrom};

use tokio::io::{AsyncRead, AsyncReadExt, AsyncSeek, AsyncSeekExt, AsyncWrite, AsyncWriteExt};

use crate::capability::{
    AsyncBasicInput, AsyncBasicOutput, AsyncClose, AsyncResizable, AsyncSeekable, Positioned,
};
use crate::error::{Result, StreamError};

/// Wraps a tokio reader / writer / seeker, tracking a `u64` position.
///
/// `close` drops the wrapped value.  Callers writing through a bare
/// `TokioStream` should `flush` first; the decorators in this crate do.
#[derive(Debug)]
pub struct TokioStream<T> {
    inner:    Option<T>,
    position: u64,
}

impl<T> TokioStream<T> {
    pub fn new(inner: T) -> Self {
        Self::at(inner, 0)
    }

    pub fn at(inner: T, position: u64) -> Self {
        Self { inner: Some(inner), position }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get_ref(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    pub fn into_inner(self) -> Option<T> {
        self.inner
    }

    fn inner_mut(&mut self) -> Result<&mut T> {
        self.inner.as_mut().ok_or(StreamError::Closed)
    }

    fn advance(&mut self, n: usize) -> Result<()> {
        self.position = self.position.checked_add(n as u64).ok_or(StreamError::Overflow)?;
        Ok(())
    }
}

impl<T: AsyncSeek + Unpin> TokioStream<T> {
    pub async fn from_seekable(mut inner: T) -> Result<Self> {
        let position = inner.stream_position().await?;
        Ok(Self::at(inner, position))
    }
}

impl<T> AsyncClose for TokioStream<T> {
    async fn close(&mut self) -> Result<()> {
        self.inner.take();
        Ok(())
    }
}

impl<T: AsyncRead + Unpin> AsyncBasicInput for TokioStream<T> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = loop {
            match self.inner_mut()?.read(buf).await {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.advance(n)?;
        Ok(n)
    }
}

impl<T: AsyncWrite + Unpin> AsyncBasicOutput for TokioStream<T> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let n = loop {
            match self.inner_mut()?.write(buf).await {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.advance(n)?;
        Ok(n)
    }

    async fn flush(&mut self) -> Result<()> {
        Ok(self.inner_mut()?.flush().await?)
    }
}

impl<T> Positioned for TokioStream<T> {
    type Position = u64;

    fn position(&self) -> u64 {
        self.position
    }
}

impl<T: AsyncSeek + Unpin> AsyncSeekable for TokioStream<T> {
    async fn seek(&mut self, pos: u64) -> Result<()> {
        self.position = self.inner_mut()?.seek(SeekFrom::Start(pos)).await?;
        Ok(())
    }

    async fn length(&mut self) -> Result<u64> {
        let current = self.position;
        let inner = self.inner_mut()?;
        let end = inner.seek(SeekFrom::End(0)).await?;
        if end != current {
            inner.seek(SeekFrom::Start(current)).await?;
        }
        Ok(end)
    }
}

impl AsyncResizable for TokioStream<tokio::fs::File> {
    async fn set_length(&mut self, len: u64) -> Result<()> {
        Ok(self.inner_mut()?.set_len(len).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn cursor_round_trip() {
        let mut s = TokioStream::new(Cursor::new(Vec::<u8>::new()));
        s.write_all(b"async bytes").await.unwrap();
        assert_eq!(s.length().await.unwrap(), 11);
        s.seek(6).await.unwrap();
        let mut buf = [0u8; 5];
        s.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"bytes");
        s.close().await.unwrap();
        assert!(s.is_closed());
    }
}
