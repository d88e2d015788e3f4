//! Bridges between `std::io` and the capability contract.
//!
//! [`StdStream`] lifts any `Read` / `Write` / `Seek` value (files, cursors,
//! stdio handles) into a capability stream.  [`IoAdapter`] goes the other
//! way, letting a decorated stream be handed to code that expects
//! `std::io` traits.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::capability::{BasicInput, BasicOutput, Close, Positioned, Resizable, Seekable};
use crate::error::{Result, StreamError};

// ── StdStream ─────────────────────────────────────────────────────────────────

/// A `std::io` value seen through the capability contract.
///
/// The position is tracked locally, starting at the value given on
/// construction.  `close` drops the wrapped value, which is how files and
/// sockets release their handle.
#[derive(Debug)]
pub struct StdStream<T> {
    inner:    Option<T>,
    position: u64,
}

impl<T> StdStream<T> {
    pub fn new(inner: T) -> Self {
        Self::at(inner, 0)
    }

    /// Wrap a value whose cursor is already at `position`.
    pub fn at(inner: T, position: u64) -> Self {
        Self { inner: Some(inner), position }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    pub fn get_ref(&self) -> Option<&T> {
        self.inner.as_ref()
    }

    /// Returns the wrapped value, or `None` once the stream was closed.
    pub fn into_inner(self) -> Option<T> {
        self.inner
    }

    fn inner_mut(&mut self) -> Result<&mut T> {
        self.inner.as_mut().ok_or(StreamError::Closed)
    }
}

impl<T: Seek> StdStream<T> {
    /// Wrap a seekable value, picking up its current cursor.
    pub fn from_seekable(mut inner: T) -> Result<Self> {
        let position = inner.stream_position()?;
        Ok(Self::at(inner, position))
    }
}

impl StdStream<File> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }

    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<T> Close for StdStream<T> {
    fn close(&mut self) -> Result<()> {
        self.inner.take();
        Ok(())
    }
}

impl<T: Read> BasicInput for StdStream<T> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let inner = self.inner_mut()?;
        let n = loop {
            match inner.read(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.position = self.position.checked_add(n as u64).ok_or(StreamError::Overflow)?;
        Ok(n)
    }
}

impl<T: Write> BasicOutput for StdStream<T> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let inner = self.inner_mut()?;
        let n = loop {
            match inner.write(buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };
        self.position = self.position.checked_add(n as u64).ok_or(StreamError::Overflow)?;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(self.inner_mut()?.flush()?)
    }
}

impl<T> Positioned for StdStream<T> {
    type Position = u64;

    fn position(&self) -> u64 {
        self.position
    }
}

impl<T: Seek> Seekable for StdStream<T> {
    fn seek(&mut self, pos: u64) -> Result<()> {
        self.position = self.inner_mut()?.seek(SeekFrom::Start(pos))?;
        Ok(())
    }

    fn length(&mut self) -> Result<u64> {
        let current = self.position;
        let inner = self.inner_mut()?;
        let end = inner.seek(SeekFrom::End(0))?;
        if end != current {
            inner.seek(SeekFrom::Start(current))?;
        }
        Ok(end)
    }
}

impl Resizable for StdStream<File> {
    fn set_length(&mut self, len: u64) -> Result<()> {
        Ok(self.inner_mut()?.set_len(len)?)
    }
}

// ── IoAdapter ─────────────────────────────────────────────────────────────────

/// Presents a capability stream as `std::io::{Read, Write, Seek}`.
pub struct IoAdapter<S>(pub S);

impl<S> IoAdapter<S> {
    pub fn into_inner(self) -> S {
        self.0
    }
}

impl<S: BasicInput> Read for IoAdapter<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.0.read(buf)?)
    }
}

impl<S: BasicOutput> Write for IoAdapter<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.0.write(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.0.flush()?)
    }
}

impl<S: Seekable<Position = u64>> Seek for IoAdapter<S> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let target = match pos {
            SeekFrom::Start(n)   => Some(n),
            SeekFrom::End(d)     => self.0.length()?.checked_add_signed(d),
            SeekFrom::Current(d) => self.0.position().checked_add_signed(d),
        };
        let target = target.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "invalid seek to a negative or overflowing position")
        })?;
        self.0.seek(target)?;
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn cursor_round_trip() {
        let mut s = StdStream::new(Cursor::new(Vec::new()));
        s.write_all(b"0123456789").unwrap();
        assert_eq!(s.position(), 10);
        assert_eq!(s.length().unwrap(), 10);
        s.seek(4).unwrap();
        let mut buf = [0u8; 3];
        s.read_exact(&mut buf).unwrap();
        assert_eq!(&buf, b"456");
        assert_eq!(s.position(), 7);
    }

    #[test]
    fn close_releases_once() {
        let mut s = StdStream::new(Cursor::new(vec![1u8, 2, 3]));
        s.close().unwrap();
        s.close().unwrap();
        assert!(s.is_closed());
        assert!(matches!(s.read(&mut [0u8; 1]), Err(StreamError::Closed)));
    }

    #[test]
    fn adapter_supports_std_consumers() {
        let s = StdStream::new(Cursor::new(b"abcdef".to_vec()));
        let mut io = IoAdapter(s);
        io.seek(SeekFrom::End(-2)).unwrap();
        let mut out = String::new();
        io.read_to_string(&mut out).unwrap();
        assert_eq!(out, "ef");
        assert!(io.seek(SeekFrom::Current(-10)).is_err());
    }
}
