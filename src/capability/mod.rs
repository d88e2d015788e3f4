//! The capability contract every stream and decorator is written against.
//!
//! # Shapes
//!
//! | Capability | Operations |
//! |------------|------------|
//! | [`BasicInput`] / [`BasicOutput`] | read / write, flush, close |
//! | [`SequentialInput`] / [`SequentialOutput`] | basic + read-only [`Positioned::position`] |
//! | [`RandomInput`] / [`RandomOutput`] | sequential + seek, length (and `set_length` for output) |
//!
//! The shapes are orthogonal traits combined through blanket "alias" traits,
//! not a hierarchy of concrete types.  A decorator asks for exactly the
//! capability it needs and re-exposes whatever its inner stream offers.
//!
//! Reading a position never performs I/O, so [`Positioned`] is shared by the
//! blocking traits here and the suspending ones in [`asynchronous`].
//!
//! # End of stream
//! `read` returning `Ok(0)` for a non-empty buffer is the only end-of-stream
//! signal.  Concrete streams must never report ordinary EOF as an error.

pub mod asynchronous;

use std::io;

use log::warn;

use crate::error::{Result, StreamError};
use crate::numeric::Position;

pub(crate) use asynchronous::release_inner_async;
pub use asynchronous::{
    AsyncBasicInput, AsyncBasicOutput, AsyncClose, AsyncRandomInput, AsyncRandomOutput,
    AsyncResizable, AsyncSeekable, AsyncSequentialInput, AsyncSequentialOutput,
};

// ── Core traits ───────────────────────────────────────────────────────────────

/// Release of the underlying resource.  Must be idempotent.
pub trait Close {
    fn close(&mut self) -> Result<()>;
}

pub trait BasicInput: Close {
    /// Read up to `buf.len()` bytes.  `Ok(0)` means end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Fill `buf` completely or fail with [`StreamError::UnexpectedEof`].
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0usize;
        while filled < buf.len() {
            match self.read(&mut buf[filled..])? {
                0 => return Err(StreamError::UnexpectedEof),
                n => filled += n,
            }
        }
        Ok(())
    }
}

pub trait BasicOutput: Close {
    /// Write up to `buf.len()` bytes, returning how many were accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    fn flush(&mut self) -> Result<()>;

    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        let mut done = 0usize;
        while done < buf.len() {
            match self.write(&buf[done..])? {
                0 => return Err(write_zero()),
                n => done += n,
            }
        }
        Ok(())
    }
}

/// The offset type paired with a stream's position type.
pub type OffsetOf<S> = <<S as Positioned>::Position as Position>::Offset;

/// Exposes the stream's current position.
pub trait Positioned {
    type Position: Position;

    fn position(&self) -> Self::Position;
}

pub trait Seekable: Positioned {
    fn seek(&mut self, pos: Self::Position) -> Result<()>;

    /// Position one past the last byte.
    fn length(&mut self) -> Result<Self::Position>;

    /// Runtime capability check.  Sources that only sometimes support
    /// random access (pipes behind a generic handle) report `false`.
    fn can_seek(&self) -> bool {
        true
    }
}

pub trait Resizable: Seekable {
    fn set_length(&mut self, len: Self::Position) -> Result<()>;
}

// ── Capability aliases ────────────────────────────────────────────────────────

pub trait SequentialInput: BasicInput + Positioned {}
impl<T: BasicInput + Positioned + ?Sized> SequentialInput for T {}

pub trait SequentialOutput: BasicOutput + Positioned {}
impl<T: BasicOutput + Positioned + ?Sized> SequentialOutput for T {}

pub trait RandomInput: SequentialInput + Seekable {}
impl<T: SequentialInput + Seekable + ?Sized> RandomInput for T {}

pub trait RandomOutput: SequentialOutput + Resizable {}
impl<T: SequentialOutput + Resizable + ?Sized> RandomOutput for T {}

pub(crate) fn write_zero() -> StreamError {
    io::Error::new(io::ErrorKind::WriteZero, "failed to write whole buffer").into()
}

/// Release an inner stream taken by a constructor that is about to fail
/// with `err`.  Left alone when the caller asked to keep it open.
pub(crate) fn release_inner<S: Close>(mut inner: S, leave_open: bool, err: StreamError) -> StreamError {
    if !leave_open {
        if let Err(e) = inner.close() {
            warn!("closing inner stream after failed construction: {e}");
        }
    }
    err
}

// ── Borrowed and boxed streams ────────────────────────────────────────────────
//
// A decorator either owns its inner stream or borrows it for its lifetime;
// both cases go through these forwarding impls.

impl<S: Close + ?Sized> Close for &mut S {
    fn close(&mut self) -> Result<()> { (**self).close() }
}

impl<S: BasicInput + ?Sized> BasicInput for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> { (**self).read(buf) }
}

impl<S: BasicOutput + ?Sized> BasicOutput for &mut S {
    fn write(&mut self, buf: &[u8]) -> Result<usize> { (**self).write(buf) }
    fn flush(&mut self) -> Result<()> { (**self).flush() }
}

impl<S: Positioned + ?Sized> Positioned for &mut S {
    type Position = S::Position;
    fn position(&self) -> S::Position { (**self).position() }
}

impl<S: Seekable + ?Sized> Seekable for &mut S {
    fn seek(&mut self, pos: S::Position) -> Result<()> { (**self).seek(pos) }
    fn length(&mut self) -> Result<S::Position> { (**self).length() }
    fn can_seek(&self) -> bool { (**self).can_seek() }
}

impl<S: Resizable + ?Sized> Resizable for &mut S {
    fn set_length(&mut self, len: S::Position) -> Result<()> { (**self).set_length(len) }
}

impl<S: Close + ?Sized> Close for Box<S> {
    fn close(&mut self) -> Result<()> { (**self).close() }
}

impl<S: BasicInput + ?Sized> BasicInput for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> { (**self).read(buf) }
}

impl<S: BasicOutput + ?Sized> BasicOutput for Box<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> { (**self).write(buf) }
    fn flush(&mut self) -> Result<()> { (**self).flush() }
}

impl<S: Positioned + ?Sized> Positioned for Box<S> {
    type Position = S::Position;
    fn position(&self) -> S::Position { (**self).position() }
}

impl<S: Seekable + ?Sized> Seekable for Box<S> {
    fn seek(&mut self, pos: S::Position) -> Result<()> { (**self).seek(pos) }
    fn length(&mut self) -> Result<S::Position> { (**self).length() }
    fn can_seek(&self) -> bool { (**self).can_seek() }
}

impl<S: Resizable + ?Sized> Resizable for Box<S> {
    fn set_length(&mut self, len: S::Position) -> Result<()> { (**self).set_length(len) }
}
