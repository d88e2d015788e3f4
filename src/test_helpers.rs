//! Instrumented stream wrapper shared by the unit tests.

use crate::capability::{BasicInput, BasicOutput, Close, Positioned, Resizable, Seekable};
use crate::error::Result;
use crate::numeric::Position;
use crate::source::MemoryStream;
use std::io;

/// Records every call that reaches the wrapped stream and can be told to
/// fail writes or flushes.
#[derive(Debug)]
pub struct Probe<S> {
    pub inner:       S,
    pub reads:       Vec<usize>,
    pub writes:      Vec<usize>,
    pub flushes:     usize,
    pub closes:      usize,
    pub fail_writes: bool,
    pub fail_flush:  bool,
}

impl<S> Probe<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            reads:       Vec::new(),
            writes:      Vec::new(),
            flushes:     0,
            closes:      0,
            fail_writes: false,
            fail_flush:  false,
        }
    }
}

impl<P: Position> Probe<MemoryStream<P>> {
    pub fn memory(data: impl Into<Vec<u8>>) -> Self {
        Self::new(MemoryStream::new(data))
    }
}

pub fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn injected() -> crate::error::StreamError {
    io::Error::new(io::ErrorKind::Other, "injected failure").into()
}

impl<S: Close> Close for Probe<S> {
    fn close(&mut self) -> Result<()> {
        self.closes += 1;
        self.inner.close()
    }
}

impl<S: BasicInput> BasicInput for Probe<S> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        self.reads.push(buf.len());
        self.inner.read(buf)
    }
}

impl<S: BasicOutput> BasicOutput for Probe<S> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.fail_writes {
            return Err(injected());
        }
        self.writes.push(buf.len());
        self.inner.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        if self.fail_flush {
            return Err(injected());
        }
        self.flushes += 1;
        self.inner.flush()
    }
}

impl<S: Positioned> Positioned for Probe<S> {
    type Position = S::Position;

    fn position(&self) -> S::Position {
        self.inner.position()
    }
}

impl<S: Seekable> Seekable for Probe<S> {
    fn seek(&mut self, pos: S::Position) -> Result<()> {
        self.inner.seek(pos)
    }

    fn length(&mut self) -> Result<S::Position> {
        self.inner.length()
    }

    fn can_seek(&self) -> bool {
        self.inner.can_seek()
    }
}

impl<S: Resizable> Resizable for Probe<S> {
    fn set_length(&mut self, len: S::Position) -> Result<()> {
        self.inner.set_length(len)
    }
}
