//! Suspending mirror of the capability contract.
//!
//! Same shapes and semantics as the blocking traits; every call into a
//! stream is a suspension point.  Futures are not required to be `Send`:
//! a stream instance is driven by one logical caller at a time.
//!
//! # Cancellation
//! Dropping a returned future cancels the operation.  Implementations update
//! their bookkeeping only after the inner call has completed, so a dropped
//! future never leaves a position counter ahead of the bytes actually moved.
#![allow(async_fn_in_trait)]

use log::warn;

use crate::capability::{write_zero, Positioned};
use crate::error::{Result, StreamError};

pub trait AsyncClose {
    async fn close(&mut self) -> Result<()>;
}

pub trait AsyncBasicInput: AsyncClose {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    async fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.read(&mut buf[filled..]).await? {
                0 => return Err(StreamError::UnexpectedEof),
                n => filled += n,
            }
        }
        Ok(())
    }
}

pub trait AsyncBasicOutput: AsyncClose {
    async fn write(&mut self, buf: &[u8]) -> Result<usize>;

    async fn flush(&mut self) -> Result<()>;

    async fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut done = 0usize;
        while done < buf.len() {
            match self.write(&buf[done..]).await? {
                0 => return Err(write_zero()),
                n => done += n,
            }
        }
        Ok(())
    }
}

pub trait AsyncSeekable: Positioned {
    async fn seek(&mut self, pos: Self::Position) -> Result<()>;

    async fn length(&mut self) -> Result<Self::Position>;

    fn can_seek(&self) -> bool {
        true
    }
}

pub trait AsyncResizable: AsyncSeekable {
    async fn set_length(&mut self, len: Self::Position) -> Result<()>;
}

pub trait AsyncSequentialInput: AsyncBasicInput + Positioned {}
impl<T: AsyncBasicInput + Positioned + ?Sized> AsyncSequentialInput for T {}

pub trait AsyncSequentialOutput: AsyncBasicOutput + Positioned {}
impl<T: AsyncBasicOutput + Positioned + ?Sized> AsyncSequentialOutput for T {}

pub trait AsyncRandomInput: AsyncSequentialInput + AsyncSeekable {}
impl<T: AsyncSequentialInput + AsyncSeekable + ?Sized> AsyncRandomInput for T {}

pub trait AsyncRandomOutput: AsyncSequentialOutput + AsyncResizable {}
impl<T: AsyncSequentialOutput + AsyncResizable + ?Sized> AsyncRandomOutput for T {}

pub(crate) async fn release_inner_async<S: AsyncClose>(mut inner: S, leave_open: bool, err: StreamError) -> StreamError {
    if !leave_open {
        if let Err(e) = inner.close().await {
            warn!("closing inner stream after failed construction: {e}");
        }
    }
    err
}

impl<S: AsyncClose + ?Sized> AsyncClose for &mut S {
    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

impl<S: AsyncBasicInput + ?Sized> AsyncBasicInput for &mut S {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf).await
    }
}

impl<S: AsyncBasicOutput + ?Sized> AsyncBasicOutput for &mut S {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf).await
    }

    async fn flush(&mut self) -> Result<()> {
        (**self).flush().await
    }
}

impl<S: AsyncSeekable + ?Sized> AsyncSeekable for &mut S {
    async fn seek(&mut self, pos: S::Position) -> Result<()> {
        (**self).seek(pos).await
    }

    async fn length(&mut self) -> Result<S::Position> {
        (**self).length().await
    }

    fn can_seek(&self) -> bool {
        (**self).can_seek()
    }
}

impl<S: AsyncResizable + ?Sized> AsyncResizable for &mut S {
    async fn set_length(&mut self, len: S::Position) -> Result<()> {
        (**self).set_length(len).await
    }
}

impl<S: AsyncClose + ?Sized> AsyncClose for Box<S> {
    async fn close(&mut self) -> Result<()> {
        (**self).close().await
    }
}

impl<S: AsyncBasicInput + ?Sized> AsyncBasicInput for Box<S> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        (**self).read(buf).await
    }
}

impl<S: AsyncBasicOutput + ?Sized> AsyncBasicOutput for Box<S> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write(buf).await
    }

    async fn flush(&mut self) -> Result<()> {
        (**self).flush().await
    }
}

impl<S: AsyncSeekable + ?Sized> AsyncSeekable for Box<S> {
    async fn seek(&mut self, pos: S::Position) -> Result<()> {
        (**self).seek(pos).await
    }

    async fn length(&mut self) -> Result<S::Position> {
        (**self).length().await
    }

    fn can_seek(&self) -> bool {
        (**self).can_seek()
    }
}

impl<S: AsyncResizable + ?Sized> AsyncResizable for Box<S> {
    async fn set_length(&mut self, len: S::Position) -> Result<()> {
        (**self).set_length(len).await
    }
}
